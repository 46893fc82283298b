use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Search error: {0}")]
    Search(#[from] elasticsearch::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} unreachable after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        service: &'static str,
        attempts: u32,
        last_error: String,
    },

    #[error("Seed data check failed for {service}: {detail}")]
    SeedData {
        service: &'static str,
        detail: String,
    },

    #[error("Unexpected response: {message}")]
    Unexpected { message: String },
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// A probe establishes connectivity to one external service and asserts
/// expected state against seed data.
///
/// Reachability and seed-data verification are separate so a CLI can report
/// them independently; `run` chains both. One probe failing never affects a
/// sibling probe.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    fn service_name(&self) -> &'static str;

    /// Establish connectivity, retrying per the probe's retry policy.
    async fn health_check(&self) -> ProbeResult<()>;

    /// Run the probe's fixed-query assertions against seed data.
    async fn verify_seed_data(&self) -> ProbeResult<()>;

    async fn run(&self) -> ProbeResult<()> {
        self.health_check().await?;
        self.verify_seed_data().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockProbe {
        reachable: bool,
        seeded: bool,
    }

    #[async_trait]
    impl ServiceProbe for MockProbe {
        fn service_name(&self) -> &'static str {
            "mock"
        }

        async fn health_check(&self) -> ProbeResult<()> {
            if self.reachable {
                Ok(())
            } else {
                Err(ProbeError::RetriesExhausted {
                    service: "mock",
                    attempts: 30,
                    last_error: "connection refused".to_string(),
                })
            }
        }

        async fn verify_seed_data(&self) -> ProbeResult<()> {
            if self.seeded {
                Ok(())
            } else {
                Err(ProbeError::SeedData {
                    service: "mock",
                    detail: "expected row missing".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_run_chains_health_then_seed() {
        let probe = MockProbe {
            reachable: true,
            seeded: true,
        };
        probe.run().await.unwrap();
        assert_eq!(probe.service_name(), "mock");
    }

    #[tokio::test]
    async fn test_run_stops_at_unreachable() {
        let probe = MockProbe {
            reachable: false,
            seeded: true,
        };
        let err = probe.run().await.unwrap_err();
        assert!(matches!(err, ProbeError::RetriesExhausted { attempts: 30, .. }));
    }

    #[tokio::test]
    async fn test_seed_failure_surfaces_detail() {
        let probe = MockProbe {
            reachable: true,
            seeded: false,
        };
        let err = probe.run().await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("mock"));
        assert!(message.contains("expected row missing"));
    }
}
