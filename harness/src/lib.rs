pub mod validate;

pub use validate::{
    check_rust_syntax, check_yaml_syntax, count_dependencies, count_discovered_tests,
    discover_tests, missing_packages, DiscoveryOutcome, ValidationReport, Validator,
    ValidatorConfig,
};
