//! Pre-push validation for the smoke-test repository.
//!
//! Statically inspects the repository's own files: test sources must parse,
//! Kubernetes manifests must be well-formed YAML, the container build file
//! and dependency list must exist, required packages must be resolved, and
//! the test runner must be able to discover tests.

pub mod checks;
pub mod report;

pub use checks::{
    check_rust_syntax, check_yaml_syntax, count_dependencies, count_discovered_tests,
    discover_tests, missing_packages, DiscoveryOutcome,
};
pub use report::ValidationReport;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Packages the probes need at runtime; their absence from the lockfile is
/// a warning, not an error (the CI image resolves them).
const REQUIRED_PACKAGES: [&str; 5] = ["tokio", "reqwest", "sqlx", "elasticsearch", "serde_yaml"];

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub repo_root: PathBuf,
    /// Test sources checked for Rust syntax, relative to the repo root.
    pub test_files: Vec<PathBuf>,
    /// Manifests checked for YAML well-formedness, relative to the repo root.
    pub manifest_files: Vec<PathBuf>,
    /// Container build file checked for presence.
    pub build_file: PathBuf,
    /// Dependency list checked for presence and non-emptiness.
    pub cargo_manifest: PathBuf,
    /// Lockfile scanned for required packages.
    pub lockfile: PathBuf,
    pub required_packages: Vec<String>,
    pub run_discovery: bool,
    pub discovery_timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("."),
            test_files: vec![
                PathBuf::from("probe/tests/mysql_probe.rs"),
                PathBuf::from("probe/tests/elasticsearch_probe.rs"),
                PathBuf::from("probe/tests/nginx_probe.rs"),
            ],
            manifest_files: vec![
                PathBuf::from(".gitlab-ci.yml"),
                PathBuf::from("deployments/mysql-deployment.yaml"),
                PathBuf::from("deployments/elasticsearch-deployment.yaml"),
                PathBuf::from("deployments/nginx-deployment.yaml"),
            ],
            build_file: PathBuf::from("Dockerfile"),
            cargo_manifest: PathBuf::from("Cargo.toml"),
            lockfile: PathBuf::from("Cargo.lock"),
            required_packages: REQUIRED_PACKAGES.iter().map(|s| s.to_string()).collect(),
            run_discovery: true,
            discovery_timeout: Duration::from_secs(120),
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo_root(mut self, repo_root: impl Into<PathBuf>) -> Self {
        self.repo_root = repo_root.into();
        self
    }

    pub fn without_discovery(mut self) -> Self {
        self.run_discovery = false;
        self
    }
}

pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        let root = &self.config.repo_root;

        info!("validating repository at {}", root.display());

        self.check_test_sources(root, &mut report);
        self.check_manifests(root, &mut report);
        self.check_build_file(root, &mut report);
        self.check_dependency_list(root, &mut report);
        self.check_required_packages(root, &mut report);
        self.check_discovery(root, &mut report).await;

        report
    }

    fn check_test_sources(&self, root: &Path, report: &mut ValidationReport) {
        report.section("[1/6] Checking test sources...");
        for rel in &self.config.test_files {
            let path = root.join(rel);
            if !path.exists() {
                report.fail(rel.display(), "File not found");
                continue;
            }
            match check_rust_syntax(&path) {
                Ok(()) => report.pass(rel.display().to_string()),
                Err(error) => report.fail(rel.display(), error),
            }
        }
    }

    fn check_manifests(&self, root: &Path, report: &mut ValidationReport) {
        report.section("[2/6] Checking manifests...");
        for rel in &self.config.manifest_files {
            let path = root.join(rel);
            if !path.exists() {
                report.fail(rel.display(), "File not found");
                continue;
            }
            match check_yaml_syntax(&path) {
                Ok(()) => report.pass(rel.display().to_string()),
                Err(error) => report.fail(rel.display(), error),
            }
        }
    }

    fn check_build_file(&self, root: &Path, report: &mut ValidationReport) {
        report.section("[3/6] Checking container build file...");
        let rel = &self.config.build_file;
        if root.join(rel).exists() {
            report.pass(format!("{} exists", rel.display()));
        } else {
            report.fail(rel.display(), "File not found");
        }
    }

    fn check_dependency_list(&self, root: &Path, report: &mut ValidationReport) {
        report.section("[4/6] Checking dependency list...");
        let rel = &self.config.cargo_manifest;
        let path = root.join(rel);
        if !path.exists() {
            report.fail(rel.display(), "File not found");
            return;
        }

        match count_dependencies(&path) {
            Ok(0) => {
                report.pass(format!("{} exists", rel.display()));
                report.warn("Cargo.toml declares no dependencies");
            }
            Ok(count) => {
                report.pass(format!("{} declares {} dependencies", rel.display(), count));
            }
            Err(error) => report.fail(rel.display(), error),
        }
    }

    fn check_required_packages(&self, root: &Path, report: &mut ValidationReport) {
        report.section("[5/6] Checking required packages...");
        let rel = &self.config.lockfile;
        let path = root.join(rel);
        if !path.exists() {
            report.warn(format!(
                "{} not found; required packages not verified",
                rel.display()
            ));
            return;
        }

        match missing_packages(&path, &self.config.required_packages) {
            Ok(missing) if missing.is_empty() => {
                report.pass("All required packages are resolved");
            }
            Ok(missing) => {
                report.warn(format!("Missing packages: {}", missing.join(", ")));
            }
            Err(error) => report.warn(format!("{}: {}", rel.display(), error)),
        }
    }

    async fn check_discovery(&self, root: &Path, report: &mut ValidationReport) {
        report.section("[6/6] Checking test discovery...");
        if !self.config.run_discovery {
            report.note("skipped");
            return;
        }

        match discover_tests(root, self.config.discovery_timeout).await {
            Ok(outcome) if outcome.succeeded => {
                report.pass(format!(
                    "test runner discovered {} test functions",
                    outcome.test_count
                ));
                report.discovered_tests = Some(outcome.test_count);
            }
            Ok(outcome) => {
                report.warn(format!(
                    "test discovery failed: {}",
                    truncate(&outcome.output, 200)
                ));
            }
            Err(error) => report.warn(format!("test discovery failed: {}", error)),
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(limit).collect();
        format!("{}...", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_lists() {
        let config = ValidatorConfig::default();
        assert_eq!(config.test_files.len(), 3);
        assert_eq!(config.manifest_files.len(), 4);
        assert!(config
            .manifest_files
            .contains(&PathBuf::from(".gitlab-ci.yml")));
        assert!(config.run_discovery);
        assert!(config
            .required_packages
            .contains(&"elasticsearch".to_string()));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ValidatorConfig::new()
            .with_repo_root("/tmp/somewhere")
            .without_discovery();
        assert_eq!(config.repo_root, PathBuf::from("/tmp/somewhere"));
        assert!(!config.run_discovery);
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate("short", 200), "short");
    }

    #[test]
    fn test_truncate_clips_long_text() {
        let long = "x".repeat(300);
        let clipped = truncate(&long, 200);
        assert_eq!(clipped.chars().count(), 203);
        assert!(clipped.ends_with("..."));
    }
}
