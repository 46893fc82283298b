use crate::config::MysqlProbeConfig;
use crate::retry::{retry_connect, RetryOutcome, RetryPolicy};
use crate::service::{ProbeError, ProbeResult, ServiceProbe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Connection, FromRow, Row};
use tracing::{debug, info};

const SERVICE: &str = "mysql";

/// Columns the seeded `results` table must expose.
pub const REQUIRED_COLUMNS: [&str; 4] = ["id", "test_id", "status", "executed_at"];

/// Test id of the row seeded into the `results` table.
pub const SEEDED_TEST_ID: &str = "VAFT-001";

/// One row of the external `results` table.
#[derive(Debug, Clone, FromRow)]
pub struct ResultRecord {
    pub id: i64,
    pub test_id: String,
    pub status: String,
    pub executed_at: DateTime<Utc>,
}

/// Probe for the relational database exposed on the MySQL NodePort.
pub struct MysqlProbe {
    config: MysqlProbeConfig,
    retry: RetryPolicy,
}

impl MysqlProbe {
    pub fn new(config: MysqlProbeConfig) -> ProbeResult<Self> {
        config
            .validate()
            .map_err(|message| ProbeError::InvalidConfig { message })?;

        Ok(Self {
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &MysqlProbeConfig {
        &self.config
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.database)
    }

    /// Single connection attempt, bounded by the configured connect timeout.
    pub async fn connect(&self) -> ProbeResult<MySqlConnection> {
        let options = self.connect_options();
        let connection = tokio::time::timeout(
            self.config.connect_timeout,
            MySqlConnection::connect_with(&options),
        )
        .await
        .map_err(|_| ProbeError::Unexpected {
            message: format!(
                "connect to {}:{} timed out after {:?}",
                self.config.host, self.config.port, self.config.connect_timeout
            ),
        })??;

        debug!(
            "Connected to mysql at {}:{}",
            self.config.host, self.config.port
        );
        Ok(connection)
    }

    /// Connect with the probe's bounded retry budget.
    pub async fn connect_with_retry(&self) -> ProbeResult<MySqlConnection> {
        match retry_connect(&self.retry, SERVICE, || self.connect()).await {
            RetryOutcome::Connected { value, attempts } => {
                info!("mysql reachable after {} attempt(s)", attempts);
                Ok(value)
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => Err(ProbeError::RetriesExhausted {
                service: SERVICE,
                attempts,
                last_error: last_error.to_string(),
            }),
        }
    }

    /// `SELECT 1` reachability query.
    pub async fn select_one(&self, conn: &mut MySqlConnection) -> ProbeResult<i64> {
        let value: i64 = sqlx::query_scalar("SELECT 1").fetch_one(conn).await?;
        Ok(value)
    }

    /// Whether the configured database is visible to this connection.
    pub async fn database_exists(&self, conn: &mut MySqlConnection) -> ProbeResult<bool> {
        let query = format!("SHOW DATABASES LIKE '{}'", self.config.database);
        let row = sqlx::query(&query).fetch_optional(conn).await?;
        Ok(row.is_some())
    }

    /// Whether the seeded `results` table exists.
    pub async fn table_exists(&self, conn: &mut MySqlConnection) -> ProbeResult<bool> {
        let row = sqlx::query("SHOW TABLES LIKE 'results'")
            .fetch_optional(conn)
            .await?;
        Ok(row.is_some())
    }

    /// Column names of the `results` table, in table order.
    pub async fn table_columns(&self, conn: &mut MySqlConnection) -> ProbeResult<Vec<String>> {
        let rows = sqlx::query("DESCRIBE results").fetch_all(conn).await?;
        let columns = rows
            .iter()
            .map(|row| row.try_get::<String, _>("Field"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Fetch one seeded result row by test id.
    pub async fn fetch_result(
        &self,
        conn: &mut MySqlConnection,
        test_id: &str,
    ) -> ProbeResult<Option<ResultRecord>> {
        let record = sqlx::query_as::<_, ResultRecord>(
            "SELECT id, test_id, status, executed_at FROM results WHERE test_id = ?",
        )
        .bind(test_id)
        .fetch_optional(conn)
        .await?;
        Ok(record)
    }
}

/// Required columns absent from an observed column list.
pub fn missing_columns(observed: &[String]) -> Vec<&'static str> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !observed.iter().any(|col| col == *required))
        .copied()
        .collect()
}

#[async_trait]
impl ServiceProbe for MysqlProbe {
    fn service_name(&self) -> &'static str {
        SERVICE
    }

    async fn health_check(&self) -> ProbeResult<()> {
        let mut conn = self.connect_with_retry().await?;
        let value = self.select_one(&mut conn).await?;
        if value != 1 {
            return Err(ProbeError::Unexpected {
                message: format!("SELECT 1 returned {}", value),
            });
        }
        Ok(())
    }

    async fn verify_seed_data(&self) -> ProbeResult<()> {
        let mut conn = self.connect_with_retry().await?;

        if !self.database_exists(&mut conn).await? {
            return Err(ProbeError::SeedData {
                service: SERVICE,
                detail: format!("database '{}' not found", self.config.database),
            });
        }

        if !self.table_exists(&mut conn).await? {
            return Err(ProbeError::SeedData {
                service: SERVICE,
                detail: "table 'results' not found".to_string(),
            });
        }

        let columns = self.table_columns(&mut conn).await?;
        let missing = missing_columns(&columns);
        if !missing.is_empty() {
            return Err(ProbeError::SeedData {
                service: SERVICE,
                detail: format!("table 'results' is missing columns: {}", missing.join(", ")),
            });
        }

        let record = self
            .fetch_result(&mut conn, SEEDED_TEST_ID)
            .await?
            .ok_or_else(|| ProbeError::SeedData {
                service: SERVICE,
                detail: format!("no row with test_id = '{}'", SEEDED_TEST_ID),
            })?;

        if record.status != "pass" {
            return Err(ProbeError::SeedData {
                service: SERVICE,
                detail: format!(
                    "row '{}' has status '{}', expected 'pass'",
                    SEEDED_TEST_ID, record.status
                ),
            });
        }

        info!(
            "mysql seed row '{}' verified (id {}, executed at {})",
            record.test_id, record.id, record.executed_at
        );
        Ok(())
    }
}
