use serde::{Deserialize, Serialize};
use std::time::Duration;

/// NodePort the MySQL service is exposed on.
pub const MYSQL_NODE_PORT: u16 = 30306;
/// NodePort the Elasticsearch service is exposed on.
pub const ELASTICSEARCH_NODE_PORT: u16 = 30200;
/// NodePort the nginx service is exposed on.
pub const NGINX_NODE_PORT: u16 = 30080;

/// Environment variable holding the cluster node IP.
pub const NODE_IP_ENV: &str = "KUBERNETES_NODE_IP";

/// Connection target for the cluster, resolved once at startup.
///
/// Probes never read the environment themselves; they receive a config
/// derived from this snapshot at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub node_ip: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_ip: "localhost".to_string(),
        }
    }
}

impl ClusterConfig {
    /// Resolve the node IP from `KUBERNETES_NODE_IP`, falling back to
    /// `localhost` when unset or empty.
    pub fn from_env() -> Self {
        let node_ip = std::env::var(NODE_IP_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        Self { node_ip }
    }

    pub fn with_node_ip(mut self, node_ip: impl Into<String>) -> Self {
        self.node_ip = node_ip.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MysqlProbeConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub connect_timeout: Duration,
}

impl Default for MysqlProbeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: MYSQL_NODE_PORT,
            user: "root".to_string(),
            password: "rootpassword".to_string(),
            database: "testdb".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl MysqlProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the config for a resolved cluster target.
    pub fn for_cluster(cluster: &ClusterConfig) -> Self {
        Self::default().with_host(cluster.node_ip.clone())
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host cannot be empty".to_string());
        }

        if self.port == 0 {
            return Err("Port must be greater than 0".to_string());
        }

        if self.user.is_empty() {
            return Err("User cannot be empty".to_string());
        }

        if self.database.is_empty() {
            return Err("Database name cannot be empty".to_string());
        }

        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProbeConfig {
    pub base_url: String,
    pub index: String,
    pub request_timeout: Duration,
}

impl Default for SearchProbeConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://localhost:{}", ELASTICSEARCH_NODE_PORT),
            index: "test-results".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SearchProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_cluster(cluster: &ClusterConfig) -> Self {
        Self::default().with_base_url(format!(
            "http://{}:{}",
            cluster.node_ip, ELASTICSEARCH_NODE_PORT
        ))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if self.index.trim().is_empty() {
            return Err("Index name cannot be empty".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebProbeConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for WebProbeConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://localhost:{}", NGINX_NODE_PORT),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl WebProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_cluster(cluster: &ClusterConfig) -> Self {
        Self::default().with_base_url(format!("http://{}:{}", cluster.node_ip, NGINX_NODE_PORT))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}
