pub mod config;
pub mod elastic;
pub mod mysql;
pub mod retry;
pub mod service;
pub mod web;

pub use config::{
    ClusterConfig, MysqlProbeConfig, SearchProbeConfig, WebProbeConfig, ELASTICSEARCH_NODE_PORT,
    MYSQL_NODE_PORT, NGINX_NODE_PORT, NODE_IP_ENV,
};
pub use elastic::{ElasticProbe, ResultDocument, QUERIED_TEST_ID};
pub use mysql::{MysqlProbe, ResultRecord, REQUIRED_COLUMNS, SEEDED_TEST_ID};
pub use retry::{retry_connect, RetryOutcome, RetryPolicy};
pub use service::{ProbeError, ProbeResult, ServiceProbe};
pub use web::{WebProbe, WELCOME_MARKER};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::elastic::*;
    pub use crate::mysql::*;
    pub use crate::retry::*;
    pub use crate::service::*;
    pub use crate::web::*;
}
