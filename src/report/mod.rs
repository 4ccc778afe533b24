//! Report generation with multiple output formats
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ValidationReport (domain) is converted to various external representations
//! - Each formatter encapsulates the rules for its specific output format
//! - Domain logic remains pure while supporting multiple presentation needs

use crate::domain::classification::{
    RuleDescriptor, MARKER_ON_CLOSED_CLASS_RULE, MISSING_MARKER_RULE,
};
use crate::domain::violations::{
    GuardianError, GuardianResult, Severity, ValidationReport, Violation,
};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

const TOOL_NAME: &str = "sealed-guardian";

/// Supported output formats for validation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format with colors and context
    Human,
    /// JSON format for programmatic consumption
    Json,
    /// JUnit XML format for CI/CD integration
    Junit,
    /// SARIF format for code scanning tools
    Sarif,
    /// GitHub Actions format for workflow integration
    GitHub,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "junit" => Some(Self::Junit),
            "sarif" => Some(Self::Sarif),
            "github" => Some(Self::GitHub),
            _ => None,
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json", "junit", "sarif", "github"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Whether to show the source line of each violation
    pub show_context: bool,
    /// Whether to show violation suggestions
    pub show_suggestions: bool,
    /// Maximum number of violations to include
    pub max_violations: Option<usize>,
    /// Minimum severity level to include
    pub min_severity: Option<Severity>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            use_colors: true,
            show_context: true,
            show_suggestions: true,
            max_violations: None,
            min_severity: None,
        }
    }
}

/// Main report formatter that dispatches to specific formatters
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a validation report in the specified format
    pub fn format_report(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
    ) -> GuardianResult<String> {
        let filtered_violations = self.filter_violations(&report.violations);

        match format {
            OutputFormat::Human => Ok(self.format_human(report, &filtered_violations)),
            OutputFormat::Json => self.format_json(report, &filtered_violations),
            OutputFormat::Junit => Ok(self.format_junit(report, &filtered_violations)),
            OutputFormat::Sarif => self.format_sarif(&filtered_violations),
            OutputFormat::GitHub => Ok(self.format_github(&filtered_violations)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        mut writer: W,
    ) -> GuardianResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn filter_violations<'a>(&self, violations: &'a [Violation]) -> Vec<&'a Violation> {
        let mut filtered: Vec<&Violation> = violations
            .iter()
            .filter(|v| self.options.min_severity.map_or(true, |min| v.severity >= min))
            .collect();

        if let Some(max) = self.options.max_violations {
            filtered.truncate(max);
        }

        filtered
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.options.use_colors {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn format_human(&self, report: &ValidationReport, violations: &[&Violation]) -> String {
        let mut output = String::new();

        if violations.is_empty() {
            output.push_str(&format!(
                "✅ {}\n",
                self.paint("32", "All classes are sealed, abstract, static or designed for inheritance")
            ));
        } else {
            let (icon, color) = if report.has_errors() {
                ("❌", "31")
            } else {
                ("⚠️", "33")
            };
            output.push_str(&format!(
                "{} {}\n\n",
                icon,
                self.paint(color, "Inheritance Violations Found")
            ));

            let mut by_file: BTreeMap<&Path, Vec<&Violation>> = BTreeMap::new();
            for violation in violations {
                by_file.entry(&violation.file_path).or_default().push(violation);
            }

            for (file_path, file_violations) in by_file {
                output.push_str(&format!("📁 {}\n", file_path.display()));

                for violation in file_violations {
                    let severity_color = match violation.severity {
                        Severity::Error => "31",
                        Severity::Warning => "33",
                        Severity::Info => "36",
                    };

                    let position = match (violation.line_number, violation.column_number) {
                        (Some(line), Some(col)) => format!("{line}:{col}"),
                        (Some(line), None) => line.to_string(),
                        _ => "?".to_string(),
                    };

                    output.push_str(&format!(
                        "  {} [{}] {}\n",
                        self.paint("2", &format!("{position}:{}", violation.rule_id)),
                        self.paint(severity_color, violation.severity.as_str()),
                        violation.message
                    ));

                    if self.options.show_context {
                        if let Some(context) = &violation.context {
                            output.push_str(&format!(
                                "    {}\n",
                                self.paint("2", &format!("│ {}", context.trim()))
                            ));
                        }
                    }

                    if self.options.show_suggestions {
                        if let Some(suggestion) = &violation.suggested_fix {
                            output.push_str(&format!(
                                "    {}\n",
                                self.paint("32", &format!("💡 {suggestion}"))
                            ));
                        }
                    }

                    output.push('\n');
                }
            }
        }

        output.push_str(&self.format_summary(report));
        output
    }

    fn format_json(
        &self,
        report: &ValidationReport,
        violations: &[&Violation],
    ) -> GuardianResult<String> {
        let json_violations: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "rule_id": v.rule_id,
                    "severity": v.severity.as_str(),
                    "file_path": v.file_path.display().to_string(),
                    "line_number": v.line_number,
                    "column_number": v.column_number,
                    "class_name": v.class_name,
                    "message": v.message,
                    "context": v.context,
                    "suggested_fix": v.suggested_fix,
                    "detected_at": v.detected_at.to_rfc3339()
                })
            })
            .collect();

        let json_report = serde_json::json!({
            "violations": json_violations,
            "summary": {
                "total_files": report.summary.total_files,
                "total_classes": report.summary.total_classes,
                "violations_by_severity": {
                    "error": report.summary.violations_by_severity.error,
                    "warning": report.summary.violations_by_severity.warning,
                    "info": report.summary.violations_by_severity.info
                },
                "execution_time_ms": report.summary.execution_time_ms,
                "validated_at": report.summary.validated_at.to_rfc3339()
            },
            "config_fingerprint": report.config_fingerprint
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| GuardianError::validation(format!("JSON serialization failed: {e}")))
    }

    fn format_junit(&self, report: &ValidationReport, violations: &[&Violation]) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let failures = violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
            .count();
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;

        xml.push_str(&format!(
            "<testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"0\" time=\"{:.3}\">\n",
            TOOL_NAME,
            violations.len(),
            failures,
            execution_time
        ));

        for violation in violations {
            let name = match &violation.class_name {
                Some(class) => format!("{} ({})", violation.file_path.display(), class),
                None => violation.file_path.display().to_string(),
            };
            xml.push_str(&format!(
                "  <testcase classname=\"{}\" name=\"{}\">\n",
                violation.rule_id,
                escape_xml(&name)
            ));

            if violation.severity == Severity::Error {
                xml.push_str(&format!(
                    "    <failure message=\"{}\">\n",
                    escape_xml(&violation.message)
                ));
                xml.push_str(&format!(
                    "      File: {}:{}:{}\n",
                    escape_xml(&violation.file_path.display().to_string()),
                    violation.line_number.unwrap_or(0),
                    violation.column_number.unwrap_or(0)
                ));
                if let Some(context) = &violation.context {
                    xml.push_str(&format!("      Context: {}\n", escape_xml(context.trim())));
                }
                xml.push_str("    </failure>\n");
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    fn format_sarif(&self, violations: &[&Violation]) -> GuardianResult<String> {
        let sarif_results: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                let level = match v.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                    Severity::Info => "note",
                };

                serde_json::json!({
                    "ruleId": v.rule_id,
                    "level": level,
                    "message": {
                        "text": v.message
                    },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": {
                                "uri": v.file_path.display().to_string()
                            },
                            "region": {
                                "startLine": v.line_number.unwrap_or(1),
                                "startColumn": v.column_number.unwrap_or(1)
                            },
                            "contextRegion": v.context.as_ref().map(|c| serde_json::json!({
                                "snippet": {
                                    "text": c
                                }
                            }))
                        }
                    }]
                })
            })
            .collect();

        let sarif_report = serde_json::json!({
            "version": "2.1.0",
            "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": TOOL_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                        "rules": [
                            sarif_rule(&MISSING_MARKER_RULE),
                            sarif_rule(&MARKER_ON_CLOSED_CLASS_RULE)
                        ]
                    }
                },
                "results": sarif_results
            }]
        });

        serde_json::to_string_pretty(&sarif_report)
            .map_err(|e| GuardianError::validation(format!("SARIF serialization failed: {e}")))
    }

    fn format_github(&self, violations: &[&Violation]) -> String {
        let mut output = String::new();

        for violation in violations {
            let level = match violation.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "notice",
            };

            let position = match (violation.line_number, violation.column_number) {
                (Some(line), Some(col)) => format!(",line={line},col={col}"),
                (Some(line), None) => format!(",line={line}"),
                _ => String::new(),
            };

            output.push_str(&format!(
                "::{} file={}{},title={}::{}\n",
                level,
                violation.file_path.display(),
                position,
                violation.rule_id,
                violation.message
            ));
        }

        output
    }

    fn format_summary(&self, report: &ValidationReport) -> String {
        let counts = &report.summary.violations_by_severity;
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;
        let scope = format!(
            "in {} classes across {} files ({:.1}s)",
            report.summary.total_classes, report.summary.total_files, execution_time
        );

        let mut parts = Vec::new();
        if counts.error > 0 {
            let text = format!("{} error{}", counts.error, plural(counts.error));
            parts.push(self.paint("31", &text));
        }
        if counts.warning > 0 {
            let text = format!("{} warning{}", counts.warning, plural(counts.warning));
            parts.push(self.paint("33", &text));
        }
        if counts.info > 0 {
            parts.push(self.paint("36", &format!("{} info", counts.info)));
        }
        if parts.is_empty() {
            parts.push(self.paint("32", "0 violations"));
        }

        format!(
            "📊 {} {} {}\n",
            self.paint("1", "Summary:"),
            parts.join(", "),
            scope
        )
    }
}

fn sarif_rule(descriptor: &RuleDescriptor) -> JsonValue {
    serde_json::json!({
        "id": descriptor.id,
        "shortDescription": { "text": descriptor.title },
        "help": { "text": descriptor.remedy },
        "properties": { "category": descriptor.category }
    })
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
