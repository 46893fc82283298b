use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Parse a Rust source file without executing anything.
pub fn check_rust_syntax(path: &Path) -> Result<(), String> {
    let code = std::fs::read_to_string(path).map_err(|e| format!("Error: {}", e))?;
    syn::parse_file(&code).map_err(|e| format!("Syntax error: {}", e))?;
    Ok(())
}

/// Parse a YAML file, accepting multi-document manifests.
pub fn check_yaml_syntax(path: &Path) -> Result<(), String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("Error: {}", e))?;
    for document in serde_yaml::Deserializer::from_str(&content) {
        serde_yaml::Value::deserialize(document).map_err(|e| format!("YAML error: {}", e))?;
    }
    Ok(())
}

/// Count declared dependencies across a manifest and its literal workspace
/// members.
///
/// Glob member entries are skipped; the workspaces this validator targets
/// list members explicitly.
pub fn count_dependencies(manifest_path: &Path) -> Result<usize, String> {
    let root = parse_toml(manifest_path)?;
    let mut count = table_dependency_count(&root);

    if let Some(members) = root
        .get("workspace")
        .and_then(|w| w.get("members"))
        .and_then(|m| m.as_array())
    {
        let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        for member in members.iter().filter_map(|m| m.as_str()) {
            if member.contains('*') {
                debug!("skipping glob workspace member '{}'", member);
                continue;
            }
            let member_manifest = base.join(member).join("Cargo.toml");
            if member_manifest.exists() {
                count += table_dependency_count(&parse_toml(&member_manifest)?);
            }
        }
    }

    Ok(count)
}

/// Required packages absent from the lockfile's resolved dependency graph.
pub fn missing_packages(lockfile_path: &Path, required: &[String]) -> Result<Vec<String>, String> {
    let lock = parse_toml(lockfile_path)?;

    let resolved: Vec<&str> = lock
        .get("package")
        .and_then(|p| p.as_array())
        .map(|packages| {
            packages
                .iter()
                .filter_map(|pkg| pkg.get("name").and_then(|n| n.as_str()))
                .collect()
        })
        .unwrap_or_default();

    Ok(required
        .iter()
        .filter(|name| !resolved.contains(&name.as_str()))
        .cloned()
        .collect())
}

fn parse_toml(path: &Path) -> Result<toml::Value, String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("Error: {}", e))?;
    content
        .parse::<toml::Value>()
        .map_err(|e| format!("TOML error: {}", e))
}

fn table_dependency_count(manifest: &toml::Value) -> usize {
    ["dependencies", "dev-dependencies", "build-dependencies"]
        .iter()
        .filter_map(|table| manifest.get(table))
        .filter_map(|table| table.as_table())
        .map(|table| table.len())
        .sum()
}

/// Result of asking the test runner to list tests without running them.
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub succeeded: bool,
    pub test_count: usize,
    pub output: String,
}

/// Run `cargo test --workspace -- --list` and inspect the listing.
pub async fn discover_tests(
    repo_root: &Path,
    timeout: Duration,
) -> Result<DiscoveryOutcome, String> {
    let run = tokio::process::Command::new("cargo")
        .args(["test", "--workspace", "--quiet", "--", "--list"])
        .current_dir(repo_root)
        .output();

    let output = tokio::time::timeout(timeout, run)
        .await
        .map_err(|_| format!("test discovery timed out after {:?}", timeout))?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                "cargo not found. Install the Rust toolchain.".to_string()
            } else {
                format!("Error: {}", e)
            }
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}{}", stdout, stderr);

    Ok(DiscoveryOutcome {
        succeeded: output.status.success(),
        test_count: count_discovered_tests(&stdout),
        output: combined,
    })
}

/// Count test entries in libtest `--list` output.
pub fn count_discovered_tests(output: &str) -> usize {
    output
        .lines()
        .filter(|line| line.trim_end().ends_with(": test"))
        .count()
}
