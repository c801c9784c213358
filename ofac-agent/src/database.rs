use async_trait::async_trait;
use chrono::Utc;
use screening_core::{MasterRecord, Person, PersonId, PersonResult, PersonStore, StoreError};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

/// One row of the pending-persons join, before categorization
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow {
    pub person_id: i64,
    pub name: Option<String>,
    pub master_id: Option<i64>,
    pub address: Option<String>,
    pub country: Option<String>,
}

impl PendingRow {
    /// A missing join partner means no master record, whatever the other columns hold
    pub fn into_person(self) -> Person {
        let master = self.master_id.map(|master_id| MasterRecord {
            master_id,
            address: self.address,
            country: self.country,
        });
        Person {
            id: PersonId(self.person_id),
            name: self.name.unwrap_or_default(),
            master,
        }
    }
}

/// Connection-level failures end the run; anything else is scoped to the statement
fn classify_sqlx_error(e: sqlx::Error, statement_error: fn(String) -> StoreError) -> StoreError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
        other => statement_error(other.to_string()),
    }
}

pub struct PgStore {
    pool: PgPool,
    fetch_sql: String,
    insert_sql: String,
    process_flag: String,
    evidence_columns: bool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        health_check(&pool).await?;
        debug!(max_connections = config.max_connections, "Database pool ready");

        Ok(Self {
            pool,
            fetch_sql: fetch_pending_sql(config),
            insert_sql: insert_result_sql(config),
            process_flag: config.process_flag.clone(),
            evidence_columns: config.evidence_columns,
        })
    }
}

pub async fn health_check(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| StoreError::Unavailable(format!("Database health check failed: {}", e)))
}

fn fetch_pending_sql(config: &DatabaseConfig) -> String {
    format!(
        r#"SELECT
            p."idPersona"::BIGINT AS person_id,
            p."nombrePersona"::TEXT AS name,
            m."idPersona"::BIGINT AS master_id,
            m."direccion"::TEXT AS address,
            m."pais"::TEXT AS country
        FROM {persons} p
        LEFT JOIN {master} m ON p."idPersona" = m."idPersona"
        WHERE p."aConsultar" = $1
        ORDER BY p."idPersona""#,
        persons = config.persons_table,
        master = config.master_table,
    )
}

fn insert_result_sql(config: &DatabaseConfig) -> String {
    let (extra_columns, extra_params) = if config.evidence_columns {
        (r#", "rutaEvidencia", "fechaConsulta""#, ", $6, $7")
    } else {
        ("", "")
    };
    format!(
        r#"INSERT INTO {results}
            ("idPersona", "nombrePersona", "pais", "cantidadDeResultados",
             "estadoTransaccion"{extra_columns})
        VALUES ($1, $2, $3, $4, $5{extra_params})"#,
        results = config.results_table,
    )
}

#[async_trait]
impl PersonStore for PgStore {
    async fn fetch_pending(&mut self) -> Result<Vec<Person>, StoreError> {
        let rows = sqlx::query(&self.fetch_sql)
            .bind(&self.process_flag)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error(e, StoreError::Query))?;

        let persons = rows
            .iter()
            .map(|row| -> Result<Person, sqlx::Error> {
                Ok(PendingRow {
                    person_id: row.try_get("person_id")?,
                    name: row.try_get("name")?,
                    master_id: row.try_get("master_id")?,
                    address: row.try_get("address")?,
                    country: row.try_get("country")?,
                }
                .into_person())
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))?;

        info!(count = persons.len(), "Fetched persons pending OFAC check");
        Ok(persons)
    }

    async fn record_outcome(&mut self, result: &PersonResult, status_code: &str) -> Result<(), StoreError> {
        let hits = result
            .hit_count()
            .map(|h| i32::try_from(h).unwrap_or(i32::MAX));
        let evidence = result.evidence().map(|p| p.display().to_string());
        let checked_at = result
            .outcome
            .as_ref()
            .map(|o| o.searched_at)
            .unwrap_or_else(Utc::now);

        let mut insert = sqlx::query(&self.insert_sql)
            .bind(result.person_id.0)
            .bind(&result.name)
            .bind(result.country.as_deref())
            .bind(hits)
            .bind(status_code);
        if self.evidence_columns {
            insert = insert.bind(evidence).bind(checked_at);
        }

        insert
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error(e, StoreError::Write))?;

        debug!(person_id = %result.person_id, status = status_code, "Recorded result");
        Ok(())
    }

    async fn close(&mut self) {
        self.pool.close().await;
    }
}
