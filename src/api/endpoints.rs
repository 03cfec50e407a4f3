use actix_web::{
    HttpRequest, HttpResponse, get, post,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        rest::{InstitutionListResponse, InstitutionResponse, InstitutionSelectRequest, LeaderboardResponse, LocationListResponse, RecommendationsResponse, SummaryResponse, WasteRecordAddRequest, WasteRecordAddResponse},
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{InstitutionSelectInputType, WasteRecordAddInputType},
    },
};

/**
 * Endpoint to select an institution by name, creating it together with its
 * default locations when absent.
 */
#[instrument(level = "info", skip(http_request, app_state, request_body), fields(service = "selectInstitution", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/institutions")]
pub async fn institution_select(http_request: HttpRequest, request_body: web::Json<InstitutionSelectRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let institution_select_input = InstitutionSelectInputType::new(request_body.into_inner().name).validate()?;
    let institution = app_state.waste_service.select_or_create_institution(institution_select_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(InstitutionResponse::from(institution)))
}

/**
 * Endpoint to retrieve all institutions ordered by name.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listInstitutions", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/institutions")]
pub async fn institution_list(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let institutions = app_state.waste_service.get_institution_list().instrument(span).await?;
    Ok(HttpResponse::Ok().json(InstitutionListResponse::from(institutions)))
}

/**
 * Endpoint to retrieve the locations of an institution.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listLocations", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/institutions/{institutionId}/locations")]
pub async fn location_list(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let institution_id = path.into_inner();
    let locations = app_state.waste_service.get_location_list(institution_id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(LocationListResponse::from(locations)))
}

/**
 * Endpoint to add a waste record for a location.
 */
#[instrument(level = "info", skip(http_request, app_state, request_body), fields(service = "addRecord", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/records")]
pub async fn record_add(http_request: HttpRequest, request_body: web::Json<WasteRecordAddRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let record_add_input = WasteRecordAddInputType::from(request_body.into_inner()).validate()?;
    let record_id = app_state.waste_service.add_record(record_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(WasteRecordAddResponse { id: record_id }))
}

/**
 * Endpoint to retrieve the daily totals and trend classification of an
 * institution.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "getSummary", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/institutions/{institutionId}/summary")]
pub async fn summary_get(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let institution_id = path.into_inner();
    let summary = app_state.waste_service.get_summary(institution_id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(SummaryResponse::from(summary)))
}

/**
 * Endpoint to retrieve the eco score and recommendations of an institution.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "getRecommendations", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/institutions/{institutionId}/recommendations")]
pub async fn recommendations_get(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let institution_id = path.into_inner();
    let recommendations = app_state.waste_service.get_recommendations(institution_id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(RecommendationsResponse::from(recommendations)))
}

/**
 * Endpoint to retrieve the cross-institution leaderboard.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "getLeaderboard", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/leaderboard")]
pub async fn leaderboard_get(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let entries = app_state.waste_service.get_leaderboard().instrument(span).await?;
    Ok(HttpResponse::Ok().json(LeaderboardResponse::from(entries)))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID")
        .and_then(|v| v.to_str().ok().map(std::string::ToString::to_string))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[actix_web::test]
    async fn test_get_trace_id_exists() {
        let request = TestRequest::default()
            .insert_header(("X-Trace-ID", "test"))
            .to_http_request();
        let trace_id = get_trace_id(&request);
        assert_eq!(trace_id, "test");
    }


    #[actix_web::test]
    async fn test_get_trace_id_not_exists() {
        let request = TestRequest::default()
            .to_http_request();
        let trace_id = get_trace_id(&request);
        assert!(!trace_id.is_empty());
    }
}
