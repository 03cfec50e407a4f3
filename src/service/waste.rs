use sqlx::{Pool, Sqlite};

use crate::{
    dao::waste::WasteDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{
            InstitutionDetailType, InstitutionSelectInputType, LeaderboardEntryType, LocationDetailType, RecommendationsOutputType, SummaryOutputType, WasteRecordAddInputType,
        },
    },
    service::analysis,
};

/**
 * Represents the service for managing waste tracking.
 */
pub struct WasteService {
    /**
     * The DAO for waste tracking operations.
     */
    waste_dao: WasteDao,
    /**
     * Connection pool for database operations.
     */
    connection_pool: Pool<Sqlite>,
}

impl WasteService {
    /**
     * Creates a new instance of `WasteService`.
     *
     * # Arguments
     * `waste_dao`: The DAO for waste tracking operations.
     * `connection_pool`: Connection pool for database operations.
     *
     * # Returns
     * A new instance of `WasteService`.
     */
    pub fn new(waste_dao: WasteDao, connection_pool: Pool<Sqlite>) -> Self {
        WasteService { waste_dao, connection_pool }
    }

    /**
     * Creates the schema if it does not exist yet. Invoked once at startup.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    pub async fn ensure_schema(&self) -> Result<(), ApplicationError> {
        let mut connection = self.acquire().await?;
        self.waste_dao.ensure_schema(&mut connection).await
    }

    /**
     * Selects an institution by name, creating it together with its default
     * locations when absent. Idempotent: repeated calls with the same name
     * return the same institution and provision the default locations once.
     *
     * # Arguments
     * `institution_select_input`: The validated input containing the name.
     *
     * # Returns
     * A Result containing the institution or an `ApplicationError`.
     */
    pub async fn select_or_create_institution(&self, institution_select_input: InstitutionSelectInputType) -> Result<InstitutionDetailType, ApplicationError> {
        let mut transaction = self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let created = self.waste_dao.insert_institution_if_absent(&mut transaction, &institution_select_input.name).await?;
        let institution = self
            .waste_dao
            .get_institution_by_name(&mut transaction, &institution_select_input.name)
            .await?
            .ok_or_else(|| ApplicationError::new(ErrorType::Application, "Institution missing after upsert".to_string()))?;
        if created {
            self.waste_dao.insert_default_locations(&mut transaction, institution.id).await?;
            tracing::info!("Created institution {} with default locations", institution.name);
        }
        transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
        Ok(institution)
    }

    /**
     * Retrieves all institutions ordered ascending by name.
     *
     * # Returns
     * A Result containing the institutions or an `ApplicationError`.
     */
    pub async fn get_institution_list(&self) -> Result<Vec<InstitutionDetailType>, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.waste_dao.get_institution_list(&mut connection).await
    }

    /**
     * Retrieves the locations of an institution.
     *
     * # Arguments
     * `institution_id`: The institution id.
     *
     * # Returns
     * A Result containing the locations or an `ApplicationError`. Unknown
     * institutions yield a not found error.
     */
    pub async fn get_location_list(&self, institution_id: i64) -> Result<Vec<LocationDetailType>, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.require_institution(&mut connection, institution_id).await?;
        self.waste_dao.get_location_list(&mut connection, institution_id).await
    }

    /**
     * Adds a waste record for a location.
     *
     * # Arguments
     * `record_add_input`: The validated input containing the record details.
     *
     * # Returns
     * A Result containing the id of the new record or an `ApplicationError`.
     * Nothing is persisted on failure.
     */
    pub async fn add_record(&self, record_add_input: WasteRecordAddInputType) -> Result<i64, ApplicationError> {
        let mut transaction = self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let record_id = match self.waste_dao.insert_record(&mut transaction, record_add_input).await {
            Ok(record_id) => record_id,
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        };
        transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
        Ok(record_id)
    }

    /**
     * Retrieves the date-ordered daily totals of an institution together with
     * the trend classification of the plastic series against the organic
     * series.
     *
     * # Arguments
     * `institution_id`: The institution id.
     *
     * # Returns
     * A Result containing the summary or an `ApplicationError`. An
     * institution without records yields empty totals and a stable trend.
     */
    pub async fn get_summary(&self, institution_id: i64) -> Result<SummaryOutputType, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.require_institution(&mut connection, institution_id).await?;
        let daily_totals = self.waste_dao.get_daily_totals(&mut connection, institution_id).await?;
        let plastic_series: Vec<f64> = daily_totals.iter().map(|total| total.total_plastic).collect();
        let organic_series: Vec<f64> = daily_totals.iter().map(|total| total.total_organic).collect();
        let plastic_slope = analysis::estimate_trend(&plastic_series);
        let organic_slope = analysis::estimate_trend(&organic_series);
        let trend = analysis::classify_trend(plastic_slope, organic_slope);
        Ok(SummaryOutputType::new(daily_totals, trend))
    }

    /**
     * Retrieves the eco score and tier of an institution, computed over its
     * full recorded history.
     *
     * # Arguments
     * `institution_id`: The institution id.
     *
     * # Returns
     * A Result containing the recommendations output or an
     * `ApplicationError`. An institution without records scores exactly 100.
     */
    pub async fn get_recommendations(&self, institution_id: i64) -> Result<RecommendationsOutputType, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.require_institution(&mut connection, institution_id).await?;
        let totals = self.waste_dao.get_institution_totals(&mut connection, institution_id).await?;
        let eco_score = analysis::eco_score(totals.total_plastic, totals.total_organic);
        let tier = analysis::score_tier(eco_score);
        Ok(RecommendationsOutputType::new(eco_score, tier, totals.has_records))
    }

    /**
     * Retrieves the leaderboard: one entry per institution with at least one
     * waste record, ordered descending by average eco score. Ties keep the
     * store's institution insertion order.
     *
     * # Returns
     * A Result containing the leaderboard entries or an `ApplicationError`.
     */
    pub async fn get_leaderboard(&self) -> Result<Vec<LeaderboardEntryType>, ApplicationError> {
        let mut connection = self.acquire().await?;
        let averages = self.waste_dao.get_leaderboard_averages(&mut connection).await?;
        let mut entries: Vec<LeaderboardEntryType> = averages
            .into_iter()
            .map(|average| {
                let avg_eco = analysis::eco_score(average.avg_plastic, average.avg_organic);
                LeaderboardEntryType::new(average.institution_name, analysis::round2(average.avg_plastic), analysis::round2(average.avg_organic), avg_eco)
            })
            .collect();
        // Stable sort keeps input order for equal scores.
        entries.sort_by(|a, b| b.avg_eco.partial_cmp(&a.avg_eco).unwrap_or(std::cmp::Ordering::Equal));
        Ok(entries)
    }

    /**
     * Acquires a connection from the pool.
     *
     * # Returns
     * A Result containing the connection or an `ApplicationError`.
     */
    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<Sqlite>, ApplicationError> {
        self.connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))
    }

    /**
     * Verifies that an institution exists.
     *
     * # Arguments
     * `connection`: The database connection.
     * `institution_id`: The institution id.
     *
     * # Returns
     * A Result containing the institution or a not found error.
     */
    async fn require_institution(&self, connection: &mut sqlx::SqliteConnection, institution_id: i64) -> Result<InstitutionDetailType, ApplicationError> {
        self.waste_dao
            .get_institution_by_id(connection, institution_id)
            .await?
            .ok_or_else(|| ApplicationError::new(ErrorType::NotFound, "Institution not found".to_string()))
    }
}
