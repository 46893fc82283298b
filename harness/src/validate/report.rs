use std::fmt;

/// Accumulated outcome of a validation run.
///
/// Errors block a successful run (missing required file, syntax failure);
/// warnings do not (missing optional package, discovery anomaly).
#[derive(Debug, Default, Clone)]
pub struct ValidationReport {
    lines: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub discovered_tests: Option<usize>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&mut self, title: impl Into<String>) {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.lines.push(title.into());
    }

    pub fn pass(&mut self, label: impl Into<String>) {
        self.lines.push(format!("  ✓ {}", label.into()));
    }

    pub fn note(&mut self, text: impl Into<String>) {
        self.lines.push(format!("    {}", text.into()));
    }

    /// Record a fatal failure.
    pub fn fail(&mut self, label: impl fmt::Display, detail: impl fmt::Display) {
        self.lines.push(format!("  ✗ {}: {}", label, detail));
        self.errors.push(format!("{}: {}", label, detail));
    }

    /// Record a non-fatal anomaly.
    pub fn warn(&mut self, detail: impl fmt::Display) {
        self.lines.push(format!("  ⚠ {}", detail));
        self.warnings.push(detail.to_string());
    }

    pub fn is_passing(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_passing() {
            0
        } else {
            1
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("============================================================\n");
        out.push_str("Pre-Push Validation\n");
        out.push_str("============================================================\n");

        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }

        out.push_str("\n============================================================\n");
        out.push_str("Validation Summary\n");
        out.push_str("============================================================\n");

        if self.errors.is_empty() {
            out.push_str("\n✓ No errors found.\n");
        } else {
            out.push_str(&format!("\n✗ ERRORS ({}):\n", self.errors.len()));
            for error in &self.errors {
                out.push_str(&format!("  - {}\n", error));
            }
        }

        if !self.warnings.is_empty() {
            out.push_str(&format!("\n⚠ WARNINGS ({}):\n", self.warnings.len()));
            for warning in &self.warnings {
                out.push_str(&format!("  - {}\n", warning));
            }
        }

        if let Some(count) = self.discovered_tests {
            out.push_str(&format!("\nDiscovered tests: {}\n", count));
        }

        if self.is_passing() {
            out.push_str("\nValidation PASSED. Code is ready to push.\n");
        } else {
            out.push_str("\nValidation FAILED. Fix the errors before pushing.\n");
        }

        out
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
