use chrono::NaiveDate;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Input type for selecting or creating an institution.
 */
#[derive(Debug, Clone)]
pub struct InstitutionSelectInputType {
    /**
     * Name of the institution.
     */
    pub name: String,
}

impl InstitutionSelectInputType {
    pub fn new(name: String) -> Self {
        InstitutionSelectInputType { name }
    }

    /**
     * Validates the input. The name is trimmed and must be non-empty afterwards.
     *
     * # Returns
     * The validated input with a trimmed name or an `ApplicationError`.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "Institution name must not be empty".to_string()));
        }
        Ok(InstitutionSelectInputType { name: trimmed.to_string() })
    }
}

/**
 * Details of a single institution.
 */
#[derive(Debug, Clone)]
pub struct InstitutionDetailType {
    pub id: i64,
    pub name: String,
}

impl InstitutionDetailType {
    pub fn new(id: i64, name: String) -> Self {
        InstitutionDetailType { id, name }
    }
}

/**
 * Details of a single location belonging to an institution.
 */
#[derive(Debug, Clone)]
pub struct LocationDetailType {
    pub id: i64,
    pub institution_id: i64,
    pub name: String,
}

impl LocationDetailType {
    pub fn new(id: i64, institution_id: i64, name: String) -> Self {
        LocationDetailType { id, institution_id, name }
    }
}

/**
 * Input type for adding a waste record.
 */
#[derive(Debug, Clone)]
pub struct WasteRecordAddInputType {
    pub location_id: i64,
    pub plastic_kg: f64,
    pub organic_kg: f64,
    pub record_date: NaiveDate,
}

impl WasteRecordAddInputType {
    pub fn new(location_id: i64, plastic_kg: f64, organic_kg: f64, record_date: NaiveDate) -> Self {
        WasteRecordAddInputType { location_id, plastic_kg, organic_kg, record_date }
    }

    /**
     * Validates the input. Quantities must be finite and non-negative. The
     * referenced location is not checked here, foreign key integrity is left
     * to the store.
     *
     * # Returns
     * The validated input or an `ApplicationError`.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if !self.plastic_kg.is_finite() || !self.organic_kg.is_finite() {
            return Err(ApplicationError::new(ErrorType::Validation, "Quantities must be finite numbers".to_string()));
        }
        if self.plastic_kg < 0.0 || self.organic_kg < 0.0 {
            return Err(ApplicationError::new(ErrorType::Validation, "Quantities must not be negative".to_string()));
        }
        Ok(self)
    }
}

/**
 * Summed plastic and organic quantities for one calendar date.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTotalType {
    pub record_date: NaiveDate,
    pub total_plastic: f64,
    pub total_organic: f64,
}

impl DailyTotalType {
    pub fn new(record_date: NaiveDate, total_plastic: f64, total_organic: f64) -> Self {
        DailyTotalType { record_date, total_plastic, total_organic }
    }
}

/**
 * Date-ordered daily totals for an institution together with the trend
 * classification derived from them.
 */
#[derive(Debug, Clone)]
pub struct SummaryOutputType {
    pub daily_totals: Vec<DailyTotalType>,
    pub trend: TrendClassification,
}

impl SummaryOutputType {
    pub fn new(daily_totals: Vec<DailyTotalType>, trend: TrendClassification) -> Self {
        SummaryOutputType { daily_totals, trend }
    }
}

/**
 * Trend classification of the plastic series against the organic series.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendClassification {
    PlasticRising,
    OrganicRising,
    Stable,
}

/**
 * Total quantities recorded for an institution across its full history.
 */
#[derive(Debug, Clone)]
pub struct InstitutionTotalsType {
    pub total_plastic: f64,
    pub total_organic: f64,
    /**
     * False when the institution has no waste records at all.
     */
    pub has_records: bool,
}

impl InstitutionTotalsType {
    pub fn new(total_plastic: f64, total_organic: f64, has_records: bool) -> Self {
        InstitutionTotalsType { total_plastic, total_organic, has_records }
    }
}

/**
 * Eco score tier. Scores below 60 are a high plastic alert, scores below 80
 * are moderate, 80 and above is excellent. The boundary values belong to the
 * higher tier.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcoTier {
    HighPlasticAlert,
    Moderate,
    Excellent,
}

/**
 * Eco score and tier for a single institution.
 */
#[derive(Debug, Clone)]
pub struct RecommendationsOutputType {
    pub eco_score: f64,
    pub tier: EcoTier,
    pub has_records: bool,
}

impl RecommendationsOutputType {
    pub fn new(eco_score: f64, tier: EcoTier, has_records: bool) -> Self {
        RecommendationsOutputType { eco_score, tier, has_records }
    }
}

/**
 * Per-institution averages as read from the store, before scoring.
 */
#[derive(Debug, Clone)]
pub struct LeaderboardAverageType {
    pub institution_name: String,
    pub avg_plastic: f64,
    pub avg_organic: f64,
}

impl LeaderboardAverageType {
    pub fn new(institution_name: String, avg_plastic: f64, avg_organic: f64) -> Self {
        LeaderboardAverageType { institution_name, avg_plastic, avg_organic }
    }
}

/**
 * One leaderboard row. Averages and the score are rounded to two decimals.
 */
#[derive(Debug, Clone)]
pub struct LeaderboardEntryType {
    pub institution_name: String,
    pub avg_plastic: f64,
    pub avg_organic: f64,
    pub avg_eco: f64,
}

impl LeaderboardEntryType {
    pub fn new(institution_name: String, avg_plastic: f64, avg_organic: f64, avg_eco: f64) -> Self {
        LeaderboardEntryType { institution_name, avg_plastic, avg_organic, avg_eco }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_institution_select_input_trims_name() {
        let input = InstitutionSelectInputType::new("  Green College  ".to_string()).validate().unwrap();
        assert_eq!(input.name, "Green College");
    }

    #[test]
    fn test_institution_select_input_rejects_whitespace_only() {
        let result = InstitutionSelectInputType::new("   ".to_string()).validate();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().error_type, ErrorType::Validation);
    }

    #[test]
    fn test_waste_record_input_accepts_zero_quantities() {
        let input = WasteRecordAddInputType::new(1, 0.0, 0.0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_waste_record_input_rejects_negative_plastic() {
        let input = WasteRecordAddInputType::new(1, -0.5, 2.0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let result = input.validate();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().error_type, ErrorType::Validation);
    }

    #[test]
    fn test_waste_record_input_rejects_negative_organic() {
        let input = WasteRecordAddInputType::new(1, 0.5, -2.0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_waste_record_input_rejects_nan() {
        let input = WasteRecordAddInputType::new(1, f64::NAN, 2.0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(input.validate().is_err());
    }
}
