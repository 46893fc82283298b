use crate::config::SearchProbeConfig;
use crate::retry::{retry_connect, RetryOutcome, RetryPolicy};
use crate::service::{ProbeError, ProbeResult, ServiceProbe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::{IndicesCreateParts, IndicesExistsParts, IndicesRefreshParts};
use elasticsearch::{Elasticsearch, IndexParts, SearchParts};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

const SERVICE: &str = "elasticsearch";

/// Test id of the seeded document the probe queries for.
pub const QUERIED_TEST_ID: &str = "VAFT-004";

/// One document of the `test-results` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    pub test_id: String,
    pub name: String,
    pub status: String,
    pub duration_ms: i64,
    pub timestamp: DateTime<Utc>,
}

/// Index mapping for the `test-results` index.
pub fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "test_id": { "type": "keyword" },
                "name": { "type": "text" },
                "status": { "type": "keyword" },
                "duration_ms": { "type": "integer" },
                "timestamp": { "type": "date" }
            }
        }
    })
}

/// The three fixture documents inserted during setup, in id order (1..=3).
pub fn seed_documents() -> Vec<Value> {
    vec![
        json!({
            "test_id": "VAFT-002",
            "name": "Test Case 2",
            "status": "fail",
            "duration_ms": 150,
            "timestamp": "2024-01-01T10:00:00Z"
        }),
        json!({
            "test_id": "VAFT-003",
            "name": "Test Case 3",
            "status": "pass",
            "duration_ms": 200,
            "timestamp": "2024-01-01T10:01:00Z"
        }),
        json!({
            "test_id": "VAFT-004",
            "name": "Test Case 4",
            "status": "pass",
            "duration_ms": 180,
            "timestamp": "2024-01-01T10:02:00Z"
        }),
    ]
}

/// Term query body for an exact test-id lookup.
pub fn term_query(test_id: &str) -> Value {
    json!({
        "query": {
            "term": {
                "test_id": test_id
            }
        }
    })
}

/// Extract the total hit count and decoded documents from a search response.
pub fn parse_hits(body: &Value) -> ProbeResult<(u64, Vec<ResultDocument>)> {
    let total = body["hits"]["total"]["value"].as_u64().unwrap_or(0);

    let hits = body["hits"]["hits"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|hit| {
            serde_json::from_value::<ResultDocument>(hit["_source"].clone()).map_err(|e| {
                ProbeError::Unexpected {
                    message: format!("Failed to decode search hit: {}", e),
                }
            })
        })
        .collect::<ProbeResult<Vec<_>>>()?;

    Ok((total, hits))
}

/// Probe for the search service exposed on the Elasticsearch NodePort.
///
/// The client is built once at construction; every operation has a single
/// call signature.
pub struct ElasticProbe {
    client: Elasticsearch,
    config: SearchProbeConfig,
    retry: RetryPolicy,
}

impl ElasticProbe {
    pub fn new(config: SearchProbeConfig) -> ProbeResult<Self> {
        config
            .validate()
            .map_err(|message| ProbeError::InvalidConfig { message })?;

        let client = Self::build_client(&config)?;

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

    pub fn config(&self) -> &SearchProbeConfig {
        &self.config
    }

    fn build_client(config: &SearchProbeConfig) -> ProbeResult<Elasticsearch> {
        let url: elasticsearch::http::Url =
            config
                .base_url
                .parse()
                .map_err(|e| ProbeError::InvalidConfig {
                    message: format!("Invalid base URL: {}", e),
                })?;

        let pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(pool)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProbeError::InvalidConfig {
                message: format!("Failed to build transport: {}", e),
            })?;

        Ok(Elasticsearch::new(transport))
    }

    /// Single reachability check.
    pub async fn ping(&self) -> ProbeResult<()> {
        let response = self.client.ping().send().await?;
        let status = response.status_code();
        if !status.is_success() {
            return Err(ProbeError::Unexpected {
                message: format!("Ping returned status {}", status),
            });
        }
        debug!("elasticsearch ping ok at {}", self.config.base_url);
        Ok(())
    }

    pub async fn index_exists(&self) -> ProbeResult<bool> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[&self.config.index]))
            .send()
            .await?;
        Ok(response.status_code().is_success())
    }

    /// Create the index with its mapping when absent.
    pub async fn ensure_index(&self) -> ProbeResult<()> {
        if self.index_exists().await? {
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&self.config.index))
            .body(index_mapping())
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // A concurrent creator winning the race is fine.
            if body.contains("resource_already_exists_exception") {
                return Ok(());
            }
            return Err(ProbeError::Unexpected {
                message: format!(
                    "Failed to create index '{}' (status {}): {}",
                    self.config.index, status, body
                ),
            });
        }

        info!("created index '{}'", self.config.index);
        Ok(())
    }

    /// Insert the fixture documents and refresh so they are searchable.
    pub async fn seed_index(&self) -> ProbeResult<()> {
        for (i, doc) in seed_documents().into_iter().enumerate() {
            let doc_id = (i + 1).to_string();
            let response = self
                .client
                .index(IndexParts::IndexId(&self.config.index, &doc_id))
                .body(doc)
                .send()
                .await?;

            let status = response.status_code();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProbeError::Unexpected {
                    message: format!(
                        "Failed to index document {} (status {}): {}",
                        doc_id, status, body
                    ),
                });
            }
        }

        self.refresh().await
    }

    pub async fn refresh(&self) -> ProbeResult<()> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[&self.config.index]))
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(ProbeError::Unexpected {
                message: format!(
                    "Failed to refresh index '{}' (status {})",
                    self.config.index, status
                ),
            });
        }
        Ok(())
    }

    /// Exact-match search on `test_id`.
    pub async fn search_by_test_id(
        &self,
        test_id: &str,
    ) -> ProbeResult<(u64, Vec<ResultDocument>)> {
        let response = self
            .client
            .search(SearchParts::Index(&[&self.config.index]))
            .body(term_query(test_id))
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProbeError::Unexpected {
                message: format!("Search failed (status {}): {}", status, body),
            });
        }

        let body: Value = response.json().await?;
        parse_hits(&body)
    }
}

#[async_trait]
impl ServiceProbe for ElasticProbe {
    fn service_name(&self) -> &'static str {
        SERVICE
    }

    async fn health_check(&self) -> ProbeResult<()> {
        match retry_connect(&self.retry, SERVICE, || self.ping()).await {
            RetryOutcome::Connected { attempts, .. } => {
                info!("elasticsearch reachable after {} attempt(s)", attempts);
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
        self.ensure_index().await?;
        self.seed_index().await?;

        let (total, hits) = self.search_by_test_id(QUERIED_TEST_ID).await?;

        if total == 0 || hits.is_empty() {
            return Err(ProbeError::SeedData {
                service: SERVICE,
                detail: format!("no document with test_id = '{}'", QUERIED_TEST_ID),
            });
        }

        let document = &hits[0];
        if document.test_id != QUERIED_TEST_ID {
            return Err(ProbeError::SeedData {
                service: SERVICE,
                detail: format!(
                    "hit has test_id '{}', expected '{}'",
                    document.test_id, QUERIED_TEST_ID
                ),
            });
        }

        if document.status != "pass" {
            return Err(ProbeError::SeedData {
                service: SERVICE,
                detail: format!(
                    "document '{}' has status '{}', expected 'pass'",
                    QUERIED_TEST_ID, document.status
                ),
            });
        }

        info!(
            "elasticsearch seed document '{}' verified ({} hit(s))",
            QUERIED_TEST_ID, total
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_index_mapping_field_types() {
        let mapping = index_mapping();
        let props = &mapping["mappings"]["properties"];

        assert_eq!(props["test_id"]["type"], "keyword");
        assert_eq!(props["name"]["type"], "text");
        assert_eq!(props["status"]["type"], "keyword");
        assert_eq!(props["duration_ms"]["type"], "integer");
        assert_eq!(props["timestamp"]["type"], "date");
    }

    #[test]
    fn test_term_query_shape() {
        let query = term_query("VAFT-004");
        assert_eq!(query["query"]["term"]["test_id"], "VAFT-004");
    }

    #[test]
    fn test_seed_documents_fixture() {
        let docs = seed_documents();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0]["test_id"], "VAFT-002");
        assert_eq!(docs[0]["status"], "fail");
        assert_eq!(docs[1]["test_id"], "VAFT-003");
        assert_eq!(docs[1]["status"], "pass");
        assert_eq!(docs[2]["test_id"], "VAFT-004");
        assert_eq!(docs[2]["status"], "pass");
    }

    #[test]
    fn test_parse_hits_decodes_documents() {
        let body = json!({
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [
                    {
                        "_index": "test-results",
                        "_id": "3",
                        "_source": {
                            "test_id": "VAFT-004",
                            "name": "Test Case 4",
                            "status": "pass",
                            "duration_ms": 180,
                            "timestamp": "2024-01-01T10:02:00Z"
                        }
                    }
                ]
            }
        });

        let (total, hits) = parse_hits(&body).unwrap();
        assert_eq!(total, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].test_id, "VAFT-004");
        assert_eq!(hits[0].status, "pass");
        assert_eq!(hits[0].duration_ms, 180);
        assert_eq!(
            hits[0].timestamp,
            "2024-01-01T10:02:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_parse_hits_empty_response() {
        let body = json!({
            "hits": { "total": { "value": 0, "relation": "eq" }, "hits": [] }
        });
        let (total, hits) = parse_hits(&body).unwrap();
        assert_eq!(total, 0);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_parse_hits_rejects_malformed_source() {
        let body = json!({
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [ { "_source": { "test_id": 7 } } ]
            }
        });
        let result = parse_hits(&body);
        assert!(matches!(result, Err(ProbeError::Unexpected { .. })));
    }

    #[test]
    fn test_probe_creation_rejects_invalid_config() {
        let config = SearchProbeConfig::default().with_base_url("not-a-url");
        let result = ElasticProbe::new(config);
        assert!(matches!(result, Err(ProbeError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_ping_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("HEAD", "/")
            .with_status(200)
            .create_async()
            .await;

        let config = SearchProbeConfig::default().with_base_url(server.url());
        let probe = ElasticProbe::new(config).unwrap();
        probe.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_search_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let response_body = json!({
            "took": 2,
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [
                    {
                        "_source": {
                            "test_id": "VAFT-004",
                            "name": "Test Case 4",
                            "status": "pass",
                            "duration_ms": 180,
                            "timestamp": "2024-01-01T10:02:00Z"
                        }
                    }
                ]
            }
        });
        let _mock = server
            .mock("POST", "/test-results/_search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body.to_string())
            .create_async()
            .await;

        let config = SearchProbeConfig::default().with_base_url(server.url());
        let probe = ElasticProbe::new(config).unwrap();
        let (total, hits) = probe.search_by_test_id("VAFT-004").await.unwrap();

        assert_eq!(total, 1);
        assert_eq!(hits[0].status, "pass");
    }

    #[tokio::test]
    async fn test_health_check_exhausts_retries_against_closed_port() {
        // Reserved TEST-NET address; connections fail fast.
        let config = SearchProbeConfig::default()
            .with_base_url("http://192.0.2.1:30200")
            .with_request_timeout(Duration::from_millis(250));
        let probe = ElasticProbe::new(config)
            .unwrap()
            .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(10)));

        let err = probe.health_check().await.unwrap_err();
        match err {
            ProbeError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }
}
