use crate::config::WebProbeConfig;
use crate::retry::{retry_connect, RetryOutcome, RetryPolicy};
use crate::service::{ProbeError, ProbeResult, ServiceProbe};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info};

const SERVICE: &str = "nginx";

/// Literal the default page must contain.
pub const WELCOME_MARKER: &str = "Welcome to nginx";

/// Probe for the web server exposed on the nginx NodePort.
pub struct WebProbe {
    client: reqwest::Client,
    config: WebProbeConfig,
    retry: RetryPolicy,
}

impl WebProbe {
    pub fn new(config: WebProbeConfig) -> ProbeResult<Self> {
        config
            .validate()
            .map_err(|message| ProbeError::InvalidConfig { message })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &WebProbeConfig {
        &self.config
    }

    /// GET the default page, returning its status and body.
    pub async fn fetch_default_page(&self) -> ProbeResult<(StatusCode, String)> {
        let response = self.client.get(&self.config.base_url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("GET {} -> {}", self.config.base_url, status);
        Ok((status, body))
    }

    /// One availability attempt: the page must answer with status 200.
    async fn check_available(&self) -> ProbeResult<()> {
        let (status, _body) = self.fetch_default_page().await?;
        if status != StatusCode::OK {
            return Err(ProbeError::Unexpected {
                message: format!("Expected status 200, got {}", status),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceProbe for WebProbe {
    fn service_name(&self) -> &'static str {
        SERVICE
    }

    async fn health_check(&self) -> ProbeResult<()> {
        match retry_connect(&self.retry, SERVICE, || self.check_available()).await {
            RetryOutcome::Connected { attempts, .. } => {
                info!("nginx reachable after {} attempt(s)", attempts);
                Ok(())
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

    async fn verify_seed_data(&self) -> ProbeResult<()> {
        let (status, body) = self.fetch_default_page().await?;

        if status != StatusCode::OK {
            return Err(ProbeError::SeedData {
                service: SERVICE,
                detail: format!("expected status 200, got {}", status),
            });
        }

        if !body.contains(WELCOME_MARKER) {
            return Err(ProbeError::SeedData {
                service: SERVICE,
                detail: format!("default page does not contain '{}'", WELCOME_MARKER),
            });
        }

        info!("nginx default page verified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const WELCOME_PAGE: &str =
        "<html><head><title>Welcome to nginx!</title></head><body>ok</body></html>";

    fn quick_retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(10))
    }

    #[test]
    fn test_probe_creation_rejects_invalid_config() {
        let config = WebProbeConfig::default().with_base_url("ftp://host");
        let result = WebProbe::new(config);
        assert!(matches!(result, Err(ProbeError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_run_passes_on_welcome_page() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(WELCOME_PAGE)
            .expect_at_least(2)
            .create_async()
            .await;

        let config = WebProbeConfig::default().with_base_url(server.url());
        let probe = WebProbe::new(config).unwrap().with_retry_policy(quick_retry());
        probe.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_health_check_retries_until_exhaustion_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let config = WebProbeConfig::default().with_base_url(server.url());
        let probe = WebProbe::new(config).unwrap().with_retry_policy(quick_retry());

        let err = probe.health_check().await.unwrap_err();
        match err {
            ProbeError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_fails_without_welcome_marker() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html><body>It works!</body></html>")
            .create_async()
            .await;

        let config = WebProbeConfig::default().with_base_url(server.url());
        let probe = WebProbe::new(config).unwrap().with_retry_policy(quick_retry());

        let err = probe.verify_seed_data().await.unwrap_err();
        match err {
            ProbeError::SeedData { detail, .. } => {
                assert!(detail.contains(WELCOME_MARKER));
            }
            other => panic!("expected SeedData, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_fails_on_non_200_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let config = WebProbeConfig::default().with_base_url(server.url());
        let probe = WebProbe::new(config).unwrap();

        let err = probe.verify_seed_data().await.unwrap_err();
        assert!(matches!(err, ProbeError::SeedData { .. }));
    }

    #[tokio::test]
    async fn test_fetch_default_page_returns_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(WELCOME_PAGE)
            .create_async()
            .await;

        let config = WebProbeConfig::default().with_base_url(server.url());
        let probe = WebProbe::new(config).unwrap();

        let (status, body) = probe.fetch_default_page().await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(WELCOME_MARKER));
    }
}
