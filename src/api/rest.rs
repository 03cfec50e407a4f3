use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{
        DailyTotalType, EcoTier, InstitutionDetailType, LeaderboardEntryType, LocationDetailType, RecommendationsOutputType, SummaryOutputType, TrendClassification, WasteRecordAddInputType,
    },
};

/***************** Institution models *********************/

/**
 * Request structure for selecting or creating an institution.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionSelectRequest {
    pub name: String,
}

/**
 * Response structure for a single institution.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionResponse {
    pub id: i64,
    pub name: String,
}

impl From<InstitutionDetailType> for InstitutionResponse {
    fn from(institution: InstitutionDetailType) -> Self {
        InstitutionResponse { id: institution.id, name: institution.name }
    }
}

/**
 * Response structure for listing institutions.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionListResponse {
    pub institutions: Vec<InstitutionResponse>,
}

impl From<Vec<InstitutionDetailType>> for InstitutionListResponse {
    fn from(institutions: Vec<InstitutionDetailType>) -> Self {
        InstitutionListResponse { institutions: institutions.into_iter().map(InstitutionResponse::from).collect() }
    }
}

/***************** Location models *********************/

/**
 * Represents a single location in the location list response.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationElement {
    pub id: i64,
    pub institution_id: i64,
    pub name: String,
}

impl From<LocationDetailType> for LocationElement {
    fn from(location: LocationDetailType) -> Self {
        LocationElement { id: location.id, institution_id: location.institution_id, name: location.name }
    }
}

/**
 * Response structure for listing the locations of an institution.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationListResponse {
    pub locations: Vec<LocationElement>,
}

impl From<Vec<LocationDetailType>> for LocationListResponse {
    fn from(locations: Vec<LocationDetailType>) -> Self {
        LocationListResponse { locations: locations.into_iter().map(LocationElement::from).collect() }
    }
}

/***************** Waste record models *********************/

/**
 * Request structure for adding a waste record.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteRecordAddRequest {
    pub location_id: i64,
    pub plastic_kg: f64,
    pub organic_kg: f64,
    pub record_date: NaiveDate,
}

impl From<WasteRecordAddRequest> for WasteRecordAddInputType {
    fn from(request: WasteRecordAddRequest) -> Self {
        WasteRecordAddInputType::new(request.location_id, request.plastic_kg, request.organic_kg, request.record_date)
    }
}

/**
 * Response structure for a successfully added waste record.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteRecordAddResponse {
    pub id: i64,
}

/***************** Summary models *********************/

/**
 * One chartable series in the summary response.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesElement {
    pub label: String,
    pub data: Vec<f64>,
}

/**
 * Response structure for the summary of an institution. Labels and every
 * series have equal length with matching index-to-date correspondence.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub labels: Vec<String>,
    pub series: Vec<SeriesElement>,
    pub trend: String,
    pub trend_message: String,
    pub no_data: bool,
}

impl From<SummaryOutputType> for SummaryResponse {
    fn from(output: SummaryOutputType) -> Self {
        let labels: Vec<String> = output.daily_totals.iter().map(|total: &DailyTotalType| total.record_date.format("%Y-%m-%d").to_string()).collect();
        let plastic_data: Vec<f64> = output.daily_totals.iter().map(|total| total.total_plastic).collect();
        let organic_data: Vec<f64> = output.daily_totals.iter().map(|total| total.total_organic).collect();
        let no_data = output.daily_totals.is_empty();
        SummaryResponse {
            labels,
            series: vec![SeriesElement { label: "Plastic".to_string(), data: plastic_data }, SeriesElement { label: "Organic".to_string(), data: organic_data }],
            trend: trend_tag(output.trend).to_string(),
            trend_message: trend_message(output.trend).to_string(),
            no_data,
        }
    }
}

/**
 * Maps a trend classification to its response tag.
 */
fn trend_tag(trend: TrendClassification) -> &'static str {
    match trend {
        TrendClassification::PlasticRising => "PLASTIC_RISING",
        TrendClassification::OrganicRising => "ORGANIC_RISING",
        TrendClassification::Stable => "STABLE",
    }
}

/**
 * Maps a trend classification to its fixed human-readable message.
 */
fn trend_message(trend: TrendClassification) -> &'static str {
    match trend {
        TrendClassification::PlasticRising => "Plastic waste is increasing faster - urgent reduction needed!",
        TrendClassification::OrganicRising => "Organic waste is increasing faster - good composting potential!",
        TrendClassification::Stable => "Waste levels stable - keep monitoring regularly.",
    }
}

/***************** Recommendation models *********************/

/**
 * Response structure for the recommendations of an institution.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResponse {
    pub eco_score: f64,
    pub tier: String,
    pub recommendations: Vec<String>,
}

impl From<RecommendationsOutputType> for RecommendationsResponse {
    fn from(output: RecommendationsOutputType) -> Self {
        let mut recommendations = Vec::new();
        if output.has_records {
            recommendations.push(tier_recommendation(output.tier).to_string());
            recommendations.push(format!("Current Eco Score: {}%", output.eco_score));
        } else {
            recommendations.push("No data available. Please add waste records.".to_string());
        }
        RecommendationsResponse { eco_score: output.eco_score, tier: tier_tag(output.tier).to_string(), recommendations }
    }
}

/**
 * Maps an eco tier to its response tag.
 */
fn tier_tag(tier: EcoTier) -> &'static str {
    match tier {
        EcoTier::HighPlasticAlert => "HIGH_PLASTIC_ALERT",
        EcoTier::Moderate => "MODERATE",
        EcoTier::Excellent => "EXCELLENT",
    }
}

/**
 * Maps an eco tier to its fixed recommendation message.
 */
fn tier_recommendation(tier: EcoTier) -> &'static str {
    match tier {
        EcoTier::HighPlasticAlert => "Plastic levels high - initiate awareness and switch to biodegradable materials.",
        EcoTier::Moderate => "Moderate eco score - enhance composting and segregation techniques.",
        EcoTier::Excellent => "Excellent eco score - maintain sustainable practices!",
    }
}

/***************** Leaderboard models *********************/

/**
 * Represents a single row in the leaderboard response.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryElement {
    pub institution_name: String,
    pub avg_plastic: f64,
    pub avg_organic: f64,
    pub avg_eco: f64,
}

impl From<LeaderboardEntryType> for LeaderboardEntryElement {
    fn from(entry: LeaderboardEntryType) -> Self {
        LeaderboardEntryElement { institution_name: entry.institution_name, avg_plastic: entry.avg_plastic, avg_organic: entry.avg_organic, avg_eco: entry.avg_eco }
    }
}

/**
 * Response structure for the leaderboard, ordered descending by average eco
 * score.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntryElement>,
}

impl From<Vec<LeaderboardEntryType>> for LeaderboardResponse {
    fn from(entries: Vec<LeaderboardEntryType>) -> Self {
        LeaderboardResponse { entries: entries.into_iter().map(LeaderboardEntryElement::from).collect() }
    }
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    /**
     * Generates an error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(get_statuscode(&self.error_type.clone())).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::ConstraintViolation => StatusCode::CONFLICT,
        ErrorType::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::Initialization => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Validation => 1000,
        ErrorType::NotFound => 1001,
        ErrorType::ConstraintViolation => 1002,
        ErrorType::DatabaseError => 1003,
        ErrorType::Application => 1004,
        ErrorType::Initialization => 1005,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_statuscode_mapping() {
        assert_eq!(get_statuscode(&ErrorType::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(get_statuscode(&ErrorType::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(get_statuscode(&ErrorType::ConstraintViolation), StatusCode::CONFLICT);
        assert_eq!(get_statuscode(&ErrorType::DatabaseError), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_summary_response_labels_match_series_length() {
        let daily_totals = vec![
            DailyTotalType::new(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), 1.0, 2.0),
            DailyTotalType::new(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(), 3.0, 4.0),
        ];
        let response = SummaryResponse::from(SummaryOutputType::new(daily_totals, TrendClassification::Stable));
        assert_eq!(response.labels, vec!["2025-06-01", "2025-06-02"]);
        assert_eq!(response.series.len(), 2);
        assert_eq!(response.series[0].label, "Plastic");
        assert_eq!(response.series[0].data, vec![1.0, 3.0]);
        assert_eq!(response.series[1].label, "Organic");
        assert_eq!(response.series[1].data, vec![2.0, 4.0]);
        assert!(!response.no_data);
    }

    #[test]
    fn test_summary_response_without_data() {
        let response = SummaryResponse::from(SummaryOutputType::new(vec![], TrendClassification::Stable));
        assert!(response.no_data);
        assert!(response.labels.is_empty());
        assert_eq!(response.trend, "STABLE");
    }

    #[test]
    fn test_recommendations_response_with_records() {
        let response = RecommendationsResponse::from(RecommendationsOutputType::new(87.5, EcoTier::Excellent, true));
        assert_eq!(response.tier, "EXCELLENT");
        assert_eq!(response.recommendations.len(), 2);
        assert_eq!(response.recommendations[1], "Current Eco Score: 87.5%");
    }

    #[test]
    fn test_recommendations_response_without_records() {
        let response = RecommendationsResponse::from(RecommendationsOutputType::new(100.0, EcoTier::Excellent, false));
        assert_eq!(response.eco_score, 100.0);
        assert_eq!(response.recommendations, vec!["No data available. Please add waste records.".to_string()]);
    }
}
