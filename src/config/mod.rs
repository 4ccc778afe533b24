//! Configuration loading and management for Sealed Guardian
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to clean domain objects
//! - Default configurations are embedded in the domain, not infrastructure
//! - Metadata references stand in for types the project consumes but does not declare

use crate::domain::classification::ClassificationKind;
use crate::domain::marker::DESIGNED_FOR_INHERITANCE;
use crate::domain::violations::{GuardianError, GuardianResult, Severity};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File names searched for when no configuration path is given, in order
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "sealed_guardian.yaml",
    "sealed_guardian.yml",
    ".sealed_guardian.yaml",
];

const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Main configuration structure for Sealed Guardian
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianConfig {
    /// Configuration format version
    pub version: String,
    /// Path filtering configuration
    pub paths: PathConfig,
    /// Settings for the inheritance rule
    #[serde(default)]
    pub rule: RuleConfig,
    /// Fully-qualified names of attribute types provided by referenced assemblies
    #[serde(default = "default_metadata_references")]
    pub metadata_references: Vec<String>,
}

/// Path filtering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// Include/exclude patterns (gitignore-style)
    pub patterns: Vec<String>,
    /// Optional per-directory ignore file name
    pub ignore_file: Option<String>,
}

/// Settings for the inheritance rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Severity of a class missing both a closing modifier and the marker
    #[serde(default = "default_severity")]
    pub severity: Severity,
    /// Severity of a closed class carrying the marker; defaults to `severity`
    #[serde(default)]
    pub closed_class_severity: Option<Severity>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: default_severity(),
            closed_class_severity: None,
        }
    }
}

impl GuardianConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GuardianResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            GuardianError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            GuardianError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> GuardianResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| GuardianError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// First configuration file found in `dir`
    pub fn discover<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Get default configuration
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            paths: PathConfig {
                patterns: vec![
                    // Build output and generated code
                    "**/bin/**".to_string(),
                    "**/obj/**".to_string(),
                    "**/.git/**".to_string(),
                    "**/*.g.cs".to_string(),
                    "**/*.Designer.cs".to_string(),
                ],
                ignore_file: Some(".sealedignore".to_string()),
            },
            rule: RuleConfig::default(),
            metadata_references: default_metadata_references(),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> GuardianResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(GuardianError::config(format!(
                "Unsupported configuration version: {}. Supported versions: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }

        for pattern in &self.paths.patterns {
            let glob = pattern.strip_prefix('!').unwrap_or(pattern);
            glob::Pattern::new(glob).map_err(|e| {
                GuardianError::config(format!("Invalid path pattern '{pattern}': {e}"))
            })?;
        }

        for reference in &self.metadata_references {
            if !is_qualified_name(reference) {
                return Err(GuardianError::config(format!(
                    "Invalid metadata reference '{reference}': expected a dotted type name"
                )));
            }
        }

        Ok(())
    }

    /// Severity a violation of `kind` is reported with
    pub fn severity_for(&self, kind: ClassificationKind) -> Severity {
        match kind {
            ClassificationKind::MarkerOnClosedClass => self
                .rule
                .closed_class_severity
                .unwrap_or(self.rule.severity),
            _ => self.rule.severity,
        }
    }

    /// Convert to JSON for serialization
    pub fn to_json(&self) -> GuardianResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GuardianError::config(format!("Failed to serialize config: {e}")))
    }

    /// Convert to YAML, the on-disk format
    pub fn to_yaml(&self) -> GuardianResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| GuardianError::config(format!("Failed to serialize config: {e}")))
    }

    /// Stable fingerprint of the configuration, recorded in reports
    pub fn fingerprint(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        self.version.hash(&mut hasher);
        self.paths.patterns.hash(&mut hasher);
        self.paths.ignore_file.hash(&mut hasher);

        self.rule.enabled.hash(&mut hasher);
        self.rule.severity.hash(&mut hasher);
        self.rule.closed_class_severity.hash(&mut hasher);

        // Order of references does not change resolution
        let mut references = self.metadata_references.clone();
        references.sort();
        references.hash(&mut hasher);

        format!("{:x}", hasher.finish())
    }
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_true() -> bool {
    true
}

fn default_severity() -> Severity {
    Severity::Warning
}

fn default_metadata_references() -> Vec<String> {
    vec![DESIGNED_FOR_INHERITANCE.full_type_name()]
}

fn is_qualified_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|first| first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: GuardianConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: GuardianConfig::default(),
        }
    }

    /// Add a path pattern
    pub fn add_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.paths.patterns.push(pattern.into());
        self
    }

    /// Set the ignore file name
    pub fn ignore_file(mut self, filename: impl Into<String>) -> Self {
        self.config.paths.ignore_file = Some(filename.into());
        self
    }

    pub fn rule_enabled(mut self, enabled: bool) -> Self {
        self.config.rule.enabled = enabled;
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.config.rule.severity = severity;
        self
    }

    pub fn closed_class_severity(mut self, severity: Severity) -> Self {
        self.config.rule.closed_class_severity = Some(severity);
        self
    }

    /// Add a type provided by a referenced assembly
    pub fn metadata_reference(mut self, full_name: impl Into<String>) -> Self {
        self.config.metadata_references.push(full_name.into());
        self
    }

    /// Build the final configuration
    pub fn build(self) -> GuardianResult<GuardianConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
