//! Sealed Guardian - inheritance-scope enforcement for C# classes
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Every class must be abstract, sealed or static, or carry `[DesignedForInheritance]`
//! - Pure classification and fix logic separated from file system concerns
//! - Agent integration API provides validation workflows

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod fix;
pub mod paths;
pub mod report;
pub mod semantic;
pub mod syntax;

// Re-export main types for convenient access
pub use domain::violations::{
    GuardianError, GuardianResult, Severity, ValidationReport, ValidationSummary, Violation,
};

pub use domain::classification::{ClassificationKind, ClassificationResult, FixKind};
pub use domain::marker::{MarkerIdentity, DESIGNED_FOR_INHERITANCE};

pub use config::{ConfigBuilder, GuardianConfig, RuleConfig};

pub use analyzer::{AnalysisOptions, Analyzer, Classifier, MarkerResolver, ProjectAnalysis};

pub use fix::{BatchFixer, CodeFix, TextEdit, Transformer};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use semantic::{ResolvedType, SemanticModel, TypeIndex};

pub use syntax::{CSharpParser, SourceDocument};

use std::path::{Path, PathBuf};

/// Main Guardian validator providing high-level validation operations
pub struct GuardianValidator {
    analyzer: Analyzer,
    report_formatter: ReportFormatter,
}

/// Options for agent validation workflows
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Output format for results
    pub output_format: OutputFormat,
    /// Report options
    pub report_options: ReportOptions,
    /// Analysis options
    pub analysis_options: AnalysisOptions,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Human,
            report_options: ReportOptions::default(),
            analysis_options: AnalysisOptions::default(),
        }
    }
}

/// Options for applying fixes to files
#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Compute fixes without writing files
    pub dry_run: bool,
    /// Restrict to one kind of fix
    pub only: Option<FixKind>,
    pub analysis_options: AnalysisOptions,
}

/// Fixes applied (or planned) for one file
#[derive(Debug, Clone)]
pub struct FixedFile {
    pub path: PathBuf,
    /// Class name and the fix applied to it
    pub fixes: Vec<(String, FixKind)>,
}

/// Outcome of a fix run
#[derive(Debug, Clone, Default)]
pub struct FixSummary {
    pub files: Vec<FixedFile>,
    /// Violations with no automated fix
    pub skipped: usize,
    pub dry_run: bool,
}

impl FixSummary {
    pub fn total_fixes(&self) -> usize {
        self.files.iter().map(|f| f.fixes.len()).sum()
    }
}

impl GuardianValidator {
    /// Create a new validator with the given configuration
    pub fn new_with_config(config: GuardianConfig) -> GuardianResult<Self> {
        let analyzer = Analyzer::new(config)?;
        let report_formatter = ReportFormatter::default();

        Ok(Self {
            analyzer,
            report_formatter,
        })
    }

    /// Create a validator with default configuration
    pub fn new() -> GuardianResult<Self> {
        Self::new_with_config(GuardianConfig::default())
    }

    /// Create a validator loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> GuardianResult<Self> {
        let config = GuardianConfig::load_from_file(path)?;
        Self::new_with_config(config)
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Validate files for agent workflows - primary API for autonomous agents
    pub async fn validate_for_agent<P: AsRef<Path>>(
        &self,
        paths: Vec<P>,
    ) -> GuardianResult<ValidationReport> {
        self.validate_with_options(paths, &ValidationOptions::default())
            .await
    }

    /// Validate files with custom options
    pub async fn validate_with_options<P: AsRef<Path>>(
        &self,
        paths: Vec<P>,
        options: &ValidationOptions,
    ) -> GuardianResult<ValidationReport> {
        let paths: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        self.analyzer
            .analyze_paths(&paths, &options.analysis_options)
    }

    /// Validate a single file
    ///
    /// Attribute types declared in other files are unknown here; only the
    /// configured metadata references and this file's own types resolve.
    pub fn validate_file<P: AsRef<Path>>(&self, file_path: P) -> GuardianResult<ValidationReport> {
        let options = AnalysisOptions {
            parallel: false,
            fail_fast: true,
            ..Default::default()
        };
        self.analyzer.analyze_paths(&[file_path.as_ref()], &options)
    }

    /// Validate entire directory tree
    pub fn validate_directory<P: AsRef<Path>>(
        &self,
        root: P,
        options: &AnalysisOptions,
    ) -> GuardianResult<ValidationReport> {
        self.analyzer.analyze_directory(root, options)
    }

    /// Apply the preferred fix to every fixable violation under `paths`
    pub async fn fix_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &FixOptions,
    ) -> GuardianResult<FixSummary> {
        let analysis = self
            .analyzer
            .analyze_project(paths, &options.analysis_options)?;
        let mut fixer = BatchFixer::new(Transformer::new(DESIGNED_FOR_INHERITANCE));
        if let Some(kind) = options.only {
            fixer = fixer.only(kind);
        }

        let mut summary = FixSummary {
            dry_run: options.dry_run,
            ..Default::default()
        };
        for file in &analysis.files {
            let outcome = fixer.fix_document(&file.document, &file.classifications)?;
            summary.skipped += outcome.skipped;

            let Some(fixed) = outcome.document else {
                continue;
            };
            if !options.dry_run {
                tokio::fs::write(&fixed.path, fixed.text.as_bytes()).await?;
                tracing::debug!("Wrote {}", fixed.path.display());
            }

            summary.files.push(FixedFile {
                path: fixed.path.clone(),
                fixes: outcome
                    .fixes
                    .iter()
                    .map(|fix| (fix.class_name.clone(), fix.kind))
                    .collect(),
            });
        }

        Ok(summary)
    }

    /// Format a validation report for output
    pub fn format_report(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
    ) -> GuardianResult<String> {
        self.report_formatter.format_report(report, format)
    }
}

/// Convenience function to create a validator with default settings
pub fn create_validator() -> GuardianResult<GuardianValidator> {
    GuardianValidator::new()
}

/// Convenience function to validate files with default settings
pub async fn validate_files<P: AsRef<Path>>(files: Vec<P>) -> GuardianResult<ValidationReport> {
    let validator = GuardianValidator::new()?;
    validator.validate_for_agent(files).await
}

/// Convenience function to validate a directory with default settings
pub fn validate_directory<P: AsRef<Path>>(directory: P) -> GuardianResult<ValidationReport> {
    let validator = GuardianValidator::new()?;
    validator.validate_directory(directory, &AnalysisOptions::default())
}

/// Agent integration utilities
pub mod agent {
    use super::*;

    /// Pre-commit validation for autonomous agents
    ///
    /// Returns an error if any blocking violations are found. With the default
    /// warning severity nothing blocks; configure `rule.severity: error` to gate commits.
    pub async fn pre_commit_check<P: AsRef<Path>>(modified_files: Vec<P>) -> GuardianResult<()> {
        let validator = GuardianValidator::new()?;
        check_blocking(validator.validate_for_agent(modified_files).await?)
    }

    /// Same as [`pre_commit_check`] with an explicit configuration
    pub async fn pre_commit_check_with_config<P: AsRef<Path>>(
        config: GuardianConfig,
        modified_files: Vec<P>,
    ) -> GuardianResult<()> {
        let validator = GuardianValidator::new_with_config(config)?;
        check_blocking(validator.validate_for_agent(modified_files).await?)
    }

    fn check_blocking(report: ValidationReport) -> GuardianResult<()> {
        if report.has_errors() {
            let error_count = report.summary.violations_by_severity.error;
            return Err(GuardianError::validation(format!(
                "Pre-commit check failed: {} blocking violation{} found",
                error_count,
                if error_count == 1 { "" } else { "s" }
            )));
        }
        Ok(())
    }

    /// Strict validation for CI/CD pipelines, failing on any violation
    pub async fn production_check<P: AsRef<Path>>(
        files: Vec<P>,
    ) -> GuardianResult<ValidationReport> {
        let options = ValidationOptions {
            analysis_options: AnalysisOptions {
                fail_fast: true,
                parallel: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let validator = GuardianValidator::new()?;
        let report = validator.validate_with_options(files, &options).await?;

        if report.has_violations() {
            return Err(GuardianError::validation(format!(
                "Production validation failed: {} violations found",
                report.violations.len()
            )));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const OPEN_CLASS: &str = "namespace TestCase\n{\n    public class Example { }\n}\n";
    const SEALED_CLASS: &str = "namespace TestCase\n{\n    public sealed class Example { }\n}\n";

    #[tokio::test]
    async fn test_validate_for_agent() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("Example.cs");
        fs::write(&test_file, OPEN_CLASS).unwrap();

        let validator = GuardianValidator::new().unwrap();
        let report = validator.validate_for_agent(vec![test_file]).await.unwrap();

        assert!(report.has_violations());
        assert_eq!(report.violations[0].rule_id, "DesignedForInheritance");
        assert!(!report.has_errors());
    }

    #[test]
    fn test_single_file_validation() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("Example.cs");
        fs::write(&test_file, SEALED_CLASS).unwrap();

        let validator = GuardianValidator::new().unwrap();
        let report = validator.validate_file(&test_file).unwrap();

        assert!(!report.has_violations());
        assert_eq!(report.summary.total_files, 1);
        assert_eq!(report.summary.total_classes, 1);
    }

    #[test]
    fn test_report_formatting() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("Example.cs");
        fs::write(&test_file, OPEN_CLASS).unwrap();

        let validator = GuardianValidator::new().unwrap().with_report_formatter(
            ReportFormatter::new(ReportOptions {
                use_colors: false,
                ..Default::default()
            }),
        );
        let report = validator.validate_file(&test_file).unwrap();

        let human = validator.format_report(&report, OutputFormat::Human).unwrap();
        assert!(human.contains("Inheritance Violations Found"));
        assert!(human.contains("Seal class"));

        let json = validator.format_report(&report, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["violations"][0]["class_name"], "Example");
    }

    #[tokio::test]
    async fn test_fix_paths_writes_unless_dry_run() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("Example.cs");
        fs::write(&test_file, OPEN_CLASS).unwrap();
        let validator = GuardianValidator::new().unwrap();

        let dry = FixOptions {
            dry_run: true,
            ..Default::default()
        };
        let planned = validator.fix_paths(&[temp_dir.path()], &dry).await.unwrap();
        assert_eq!(planned.total_fixes(), 1);
        assert_eq!(fs::read_to_string(&test_file).unwrap(), OPEN_CLASS);

        let applied = validator
            .fix_paths(&[temp_dir.path()], &FixOptions::default())
            .await
            .unwrap();
        assert_eq!(applied.files[0].fixes, vec![("Example".to_string(), FixKind::Seal)]);
        assert_eq!(fs::read_to_string(&test_file).unwrap(), SEALED_CLASS);

        let report = validator.validate_directory(temp_dir.path(), &AnalysisOptions::default()).unwrap();
        assert!(!report.has_violations());
    }

    #[tokio::test]
    async fn test_agent_pre_commit_check() {
        let temp_dir = TempDir::new().unwrap();
        let open_file = temp_dir.path().join("Open.cs");
        fs::write(&open_file, OPEN_CLASS).unwrap();

        assert!(agent::pre_commit_check(vec![&open_file]).await.is_ok());

        let strict = ConfigBuilder::new().severity(Severity::Error).build().unwrap();
        assert!(agent::pre_commit_check_with_config(strict, vec![&open_file])
            .await
            .is_err());
        assert!(agent::production_check(vec![&open_file]).await.is_err());
    }

    #[test]
    fn test_convenience_functions() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Example.cs"), SEALED_CLASS).unwrap();

        assert!(create_validator().is_ok());
        let report = validate_directory(temp_dir.path()).unwrap();
        assert_eq!(report.summary.total_files, 1);
    }
}
