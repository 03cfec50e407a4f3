use std::borrow::Cow;

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{DailyTotalType, InstitutionDetailType, InstitutionTotalsType, LeaderboardAverageType, LocationDetailType, WasteRecordAddInputType},
};

/**
 * Database response type for querying an institution.
 */
pub type QueryInstitutionDbResp = (i64, String);

/**
 * Database response type for querying a location.
 */
pub type QueryLocationDbResp = (i64, i64, String);

/**
 * Database response type for querying daily totals.
 */
pub type QueryDailyTotalsDbResp = (NaiveDate, f64, f64);

/**
 * Database response type for querying institution totals. Both sums are null
 * when the institution has no waste records.
 */
pub type QueryInstitutionTotalsDbResp = (Option<f64>, Option<f64>);

/**
 * Database response type for querying leaderboard averages.
 */
pub type QueryLeaderboardDbResp = (String, f64, f64);

/**
 * The three locations provisioned for every newly created institution.
 */
pub const DEFAULT_LOCATIONS: [&str; 3] = ["Admin Block", "Hostel", "Canteen"];

/**
 * SQL statement creating the institutions table.
 */
const CREATE_INSTITUTIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS institutions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )";

/**
 * SQL statement creating the locations table. The unique pair constraint is
 * what makes default location provisioning idempotent.
 */
const CREATE_LOCATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        institution_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        UNIQUE (institution_id, name),
        FOREIGN KEY (institution_id) REFERENCES institutions (id) ON DELETE CASCADE
    )";

/**
 * SQL statement creating the waste records table. The check constraints are
 * the last line of defense, negative quantities are rejected at the API
 * boundary before they reach the store.
 */
const CREATE_WASTE_RECORDS_TABLE: &str = "CREATE TABLE IF NOT EXISTS waste_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        location_id INTEGER NOT NULL,
        plastic_kg REAL NOT NULL CHECK (plastic_kg >= 0),
        organic_kg REAL NOT NULL CHECK (organic_kg >= 0),
        record_date DATE NOT NULL,
        FOREIGN KEY (location_id) REFERENCES locations (id) ON DELETE CASCADE
    )";

/**
 * SQL query to insert an institution unless the name already exists.
 */
const INSERT_INSTITUTION_IF_ABSENT: &str = "INSERT OR IGNORE INTO institutions (name) VALUES (?1)";

/**
 * SQL query to retrieve an institution by name.
 */
const QUERY_INSTITUTION_BY_NAME: &str = "SELECT id, name FROM institutions WHERE name = ?1";

/**
 * SQL query to retrieve an institution by id.
 */
const QUERY_INSTITUTION_BY_ID: &str = "SELECT id, name FROM institutions WHERE id = ?1";

/**
 * SQL query to retrieve all institutions ordered by name.
 */
const QUERY_INSTITUTION_LIST: &str = "SELECT id, name FROM institutions ORDER BY name";

/**
 * SQL query to insert a location unless the institution already has one with
 * that name.
 */
const INSERT_LOCATION_IF_ABSENT: &str = "INSERT OR IGNORE INTO locations (institution_id, name) VALUES (?1, ?2)";

/**
 * SQL query to retrieve the locations of an institution.
 */
const QUERY_LOCATION_LIST: &str = "SELECT id, institution_id, name FROM locations WHERE institution_id = ?1 ORDER BY id";

/**
 * SQL query to insert a waste record.
 */
const INSERT_WASTE_RECORD: &str = "INSERT INTO waste_records (location_id, plastic_kg, organic_kg, record_date) VALUES (?1, ?2, ?3, ?4)";

/**
 * SQL query to retrieve per-date sums across all locations of an institution,
 * ascending by date.
 */
const QUERY_DAILY_TOTALS: &str = "SELECT wr.record_date, SUM(wr.plastic_kg), SUM(wr.organic_kg)
                                  FROM waste_records wr
                                  JOIN locations l ON wr.location_id = l.id
                                  WHERE l.institution_id = ?1
                                  GROUP BY wr.record_date
                                  ORDER BY wr.record_date";

/**
 * SQL query to retrieve the total sums for an institution across its full
 * history. Returns a single row with null sums when there are no records.
 */
const QUERY_INSTITUTION_TOTALS: &str = "SELECT SUM(wr.plastic_kg), SUM(wr.organic_kg)
                                        FROM waste_records wr
                                        JOIN locations l ON wr.location_id = l.id
                                        WHERE l.institution_id = ?1";

/**
 * SQL query to retrieve per-institution averages. Inner joins exclude
 * institutions without any waste records.
 */
const QUERY_LEADERBOARD_AVERAGES: &str = "SELECT i.name, AVG(wr.plastic_kg), AVG(wr.organic_kg)
                                          FROM institutions i
                                          JOIN locations l ON l.institution_id = i.id
                                          JOIN waste_records wr ON wr.location_id = l.id
                                          GROUP BY i.id
                                          ORDER BY i.id";

/**
 * DAO for waste tracking database operations.
 */
pub struct WasteDao {}

impl WasteDao {
    /**
     * Creates a new instance of `WasteDao`.
     *
     * # Returns
     * A new instance of `WasteDao`.
     */
    pub fn new() -> Self {
        WasteDao {}
    }

    /**
     * Creates the schema if it does not exist yet. Invoked once at startup,
     * safe to call repeatedly.
     *
     * # Arguments
     * `connection`: The database connection.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn ensure_schema(&self, connection: &mut SqliteConnection) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        for statement in [CREATE_INSTITUTIONS_TABLE, CREATE_LOCATIONS_TABLE, CREATE_WASTE_RECORDS_TABLE] {
            sqlx::query(statement)
                .execute(&mut *connection)
                .instrument(span.clone())
                .await
                .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create schema: {err}")))?;
        }
        Ok(())
    }

    /**
     * Inserts an institution unless one with the same name already exists.
     *
     * # Arguments
     * `transaction`: The database transaction.
     * `name`: The trimmed institution name.
     *
     * # Returns
     * A result containing true if a new row was inserted, false if the name
     * already existed.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn insert_institution_if_absent(&self, transaction: &mut SqliteConnection, name: &str) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(INSERT_INSTITUTION_IF_ABSENT)
            .bind(name)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        Ok(result.rows_affected() > 0)
    }

    /**
     * Retrieves an institution by name.
     *
     * # Arguments
     * `connection`: The database connection.
     * `name`: The institution name.
     *
     * # Returns
     * A result containing the institution if present.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_institution_by_name(&self, connection: &mut SqliteConnection, name: &str) -> Result<Option<InstitutionDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryInstitutionDbResp> = sqlx::query_as(QUERY_INSTITUTION_BY_NAME)
            .bind(name)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get institution by name: {err}")))?;
        Ok(result.map(|(id, name)| InstitutionDetailType::new(id, name)))
    }

    /**
     * Retrieves an institution by id.
     *
     * # Arguments
     * `connection`: The database connection.
     * `institution_id`: The institution id.
     *
     * # Returns
     * A result containing the institution if present.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_institution_by_id(&self, connection: &mut SqliteConnection, institution_id: i64) -> Result<Option<InstitutionDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryInstitutionDbResp> = sqlx::query_as(QUERY_INSTITUTION_BY_ID)
            .bind(institution_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get institution by id: {err}")))?;
        Ok(result.map(|(id, name)| InstitutionDetailType::new(id, name)))
    }

    /**
     * Retrieves all institutions ordered ascending by name.
     *
     * # Arguments
     * `connection`: The database connection.
     *
     * # Returns
     * A result containing the list of institutions.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_institution_list(&self, connection: &mut SqliteConnection) -> Result<Vec<InstitutionDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryInstitutionDbResp> = sqlx::query_as(QUERY_INSTITUTION_LIST)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get institution list: {err}")))?;
        Ok(results.into_iter().map(|(id, name)| InstitutionDetailType::new(id, name)).collect())
    }

    /**
     * Provisions the default locations for an institution. Locations the
     * institution already has are left untouched.
     *
     * # Arguments
     * `transaction`: The database transaction.
     * `institution_id`: The institution id.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn insert_default_locations(&self, transaction: &mut SqliteConnection, institution_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        for location_name in DEFAULT_LOCATIONS {
            sqlx::query(INSERT_LOCATION_IF_ABSENT)
                .bind(institution_id)
                .bind(location_name)
                .execute(&mut *transaction)
                .instrument(span.clone())
                .await
                .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        }
        Ok(())
    }

    /**
     * Retrieves the locations of an institution.
     *
     * # Arguments
     * `connection`: The database connection.
     * `institution_id`: The institution id.
     *
     * # Returns
     * A result containing the list of locations.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_location_list(&self, connection: &mut SqliteConnection, institution_id: i64) -> Result<Vec<LocationDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryLocationDbResp> = sqlx::query_as(QUERY_LOCATION_LIST)
            .bind(institution_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get location list: {err}")))?;
        Ok(results.into_iter().map(|(id, institution_id, name)| LocationDetailType::new(id, institution_id, name)).collect())
    }

    /**
     * Inserts a waste record.
     *
     * # Arguments
     * `transaction`: The database transaction.
     * `record_add_input`: The validated input containing the record details.
     *
     * # Returns
     * A result containing the id of the inserted record.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn insert_record(&self, transaction: &mut SqliteConnection, record_add_input: WasteRecordAddInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(INSERT_WASTE_RECORD)
            .bind(record_add_input.location_id)
            .bind(record_add_input.plastic_kg)
            .bind(record_add_input.organic_kg)
            .bind(record_add_input.record_date)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        Ok(result.last_insert_rowid())
    }

    /**
     * Retrieves per-date plastic and organic sums for an institution, ordered
     * ascending by date.
     *
     * # Arguments
     * `connection`: The database connection.
     * `institution_id`: The institution id.
     *
     * # Returns
     * A result containing the daily totals. Empty when the institution has no
     * records.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_daily_totals(&self, connection: &mut SqliteConnection, institution_id: i64) -> Result<Vec<DailyTotalType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryDailyTotalsDbResp> = sqlx::query_as(QUERY_DAILY_TOTALS)
            .bind(institution_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get daily totals: {err}")))?;
        Ok(results.into_iter().map(|(record_date, total_plastic, total_organic)| DailyTotalType::new(record_date, total_plastic, total_organic)).collect())
    }

    /**
     * Retrieves the total plastic and organic sums for an institution across
     * its full history.
     *
     * # Arguments
     * `connection`: The database connection.
     * `institution_id`: The institution id.
     *
     * # Returns
     * A result containing the totals. `has_records` is false when the
     * institution has no waste records.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_institution_totals(&self, connection: &mut SqliteConnection, institution_id: i64) -> Result<InstitutionTotalsType, ApplicationError> {
        let span = tracing::Span::current();
        let result: QueryInstitutionTotalsDbResp = sqlx::query_as(QUERY_INSTITUTION_TOTALS)
            .bind(institution_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get institution totals: {err}")))?;
        let has_records = result.0.is_some() || result.1.is_some();
        Ok(InstitutionTotalsType::new(result.0.unwrap_or(0.0), result.1.unwrap_or(0.0), has_records))
    }

    /**
     * Retrieves per-institution average quantities. Institutions without any
     * waste records are excluded by the inner joins.
     *
     * # Arguments
     * `connection`: The database connection.
     *
     * # Returns
     * A result containing the averages in institution insertion order.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_leaderboard_averages(&self, connection: &mut SqliteConnection) -> Result<Vec<LeaderboardAverageType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryLeaderboardDbResp> = sqlx::query_as(QUERY_LEADERBOARD_AVERAGES)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get leaderboard averages: {err}")))?;
        Ok(results.into_iter().map(|(institution_name, avg_plastic, avg_organic)| LeaderboardAverageType::new(institution_name, avg_plastic, avg_organic)).collect())
    }

    /**
     * Handles database errors and maps them to application errors.
     *
     * # Arguments
     * `error`: The database error to handle.
     *
     * # Returns
     * An `ApplicationError` corresponding to the database error.
     */
    fn handle_database_error(error: Option<&dyn sqlx::error::DatabaseError>) -> ApplicationError {
        if let Some(db_error) = error {
            tracing::debug!("Database error: {}", db_error);
            if db_error.code() == Some(Cow::Borrowed("2067")) || db_error.code() == Some(Cow::Borrowed("1555")) {
                // Unique violation
                return ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string());
            } else if db_error.code() == Some(Cow::Borrowed("787")) {
                // Foreign key violation
                return ApplicationError::new(ErrorType::ConstraintViolation, "Missing parent row".to_string());
            } else if db_error.code() == Some(Cow::Borrowed("275")) {
                // Check constraint violation
                return ApplicationError::new(ErrorType::Validation, "Rejected by store constraint".to_string());
            }
            tracing::error!("Unhandled database error: {}", db_error);
            return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
        }
        ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use sqlx::SqlitePool;

    async fn init_schema(pool: &SqlitePool) {
        let dao = WasteDao::new();
        let mut connection = pool.acquire().await.unwrap();
        dao.ensure_schema(&mut connection).await.unwrap();
    }

    #[sqlx::test]
    async fn test_ensure_schema_is_idempotent(pool: SqlitePool) {
        let dao = WasteDao::new();
        let mut connection = pool.acquire().await.unwrap();
        dao.ensure_schema(&mut connection).await.unwrap();
        dao.ensure_schema(&mut connection).await.unwrap();
    }

    #[sqlx::test]
    async fn test_insert_institution_if_absent(pool: SqlitePool) {
        init_schema(&pool).await;
        let dao = WasteDao::new();
        let mut connection = pool.acquire().await.unwrap();
        let created = dao.insert_institution_if_absent(&mut connection, "Green College").await.unwrap();
        assert!(created);
        let created_again = dao.insert_institution_if_absent(&mut connection, "Green College").await.unwrap();
        assert!(!created_again);
        let institutions = dao.get_institution_list(&mut connection).await.unwrap();
        assert_eq!(institutions.len(), 1);
    }

    #[sqlx::test]
    async fn test_default_locations_provisioned_once(pool: SqlitePool) {
        init_schema(&pool).await;
        let dao = WasteDao::new();
        let mut connection = pool.acquire().await.unwrap();
        dao.insert_institution_if_absent(&mut connection, "Green College").await.unwrap();
        let institution = dao.get_institution_by_name(&mut connection, "Green College").await.unwrap().unwrap();
        dao.insert_default_locations(&mut connection, institution.id).await.unwrap();
        dao.insert_default_locations(&mut connection, institution.id).await.unwrap();
        let locations = dao.get_location_list(&mut connection, institution.id).await.unwrap();
        assert_eq!(locations.len(), 3);
        let names: Vec<&str> = locations.iter().map(|location| location.name.as_str()).collect();
        assert_eq!(names, vec!["Admin Block", "Hostel", "Canteen"]);
    }

    #[sqlx::test]
    async fn test_insert_record_rejects_unknown_location(pool: SqlitePool) {
        init_schema(&pool).await;
        let dao = WasteDao::new();
        let mut connection = pool.acquire().await.unwrap();
        let input = WasteRecordAddInputType::new(999, 1.0, 2.0, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        let result = dao.insert_record(&mut connection, input).await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().error_type, ErrorType::ConstraintViolation);
    }

    #[sqlx::test]
    async fn test_daily_totals_grouped_and_ordered(pool: SqlitePool) {
        init_schema(&pool).await;
        let dao = WasteDao::new();
        let mut connection = pool.acquire().await.unwrap();
        dao.insert_institution_if_absent(&mut connection, "Green College").await.unwrap();
        let institution = dao.get_institution_by_name(&mut connection, "Green College").await.unwrap().unwrap();
        dao.insert_default_locations(&mut connection, institution.id).await.unwrap();
        let locations = dao.get_location_list(&mut connection, institution.id).await.unwrap();
        let day1 = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        dao.insert_record(&mut connection, WasteRecordAddInputType::new(locations[0].id, 1.0, 2.0, day1)).await.unwrap();
        dao.insert_record(&mut connection, WasteRecordAddInputType::new(locations[1].id, 3.0, 4.0, day1)).await.unwrap();
        dao.insert_record(&mut connection, WasteRecordAddInputType::new(locations[2].id, 5.0, 6.0, day2)).await.unwrap();
        let totals = dao.get_daily_totals(&mut connection, institution.id).await.unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].record_date, day2);
        assert_eq!(totals[0].total_plastic, 5.0);
        assert_eq!(totals[0].total_organic, 6.0);
        assert_eq!(totals[1].record_date, day1);
        assert_eq!(totals[1].total_plastic, 4.0);
        assert_eq!(totals[1].total_organic, 6.0);
    }

    #[sqlx::test]
    async fn test_institution_totals_without_records(pool: SqlitePool) {
        init_schema(&pool).await;
        let dao = WasteDao::new();
        let mut connection = pool.acquire().await.unwrap();
        dao.insert_institution_if_absent(&mut connection, "Green College").await.unwrap();
        let institution = dao.get_institution_by_name(&mut connection, "Green College").await.unwrap().unwrap();
        let totals = dao.get_institution_totals(&mut connection, institution.id).await.unwrap();
        assert!(!totals.has_records);
        assert_eq!(totals.total_plastic, 0.0);
        assert_eq!(totals.total_organic, 0.0);
    }

    #[sqlx::test]
    async fn test_leaderboard_averages_exclude_empty_institutions(pool: SqlitePool) {
        init_schema(&pool).await;
        let dao = WasteDao::new();
        let mut connection = pool.acquire().await.unwrap();
        dao.insert_institution_if_absent(&mut connection, "Green College").await.unwrap();
        dao.insert_institution_if_absent(&mut connection, "Empty College").await.unwrap();
        let institution = dao.get_institution_by_name(&mut connection, "Green College").await.unwrap().unwrap();
        dao.insert_default_locations(&mut connection, institution.id).await.unwrap();
        let locations = dao.get_location_list(&mut connection, institution.id).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        dao.insert_record(&mut connection, WasteRecordAddInputType::new(locations[0].id, 10.0, 90.0, day)).await.unwrap();
        dao.insert_record(&mut connection, WasteRecordAddInputType::new(locations[1].id, 20.0, 80.0, day)).await.unwrap();
        let averages = dao.get_leaderboard_averages(&mut connection).await.unwrap();
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].institution_name, "Green College");
        assert_eq!(averages[0].avg_plastic, 15.0);
        assert_eq!(averages[0].avg_organic, 85.0);
    }
}
