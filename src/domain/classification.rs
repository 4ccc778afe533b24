//! Classification outcomes and the diagnostics they map to

use crate::domain::violations::Severity;
use crate::syntax::Location;
use serde::{Deserialize, Serialize};

/// Rule identifier shared by both diagnostics
pub const RULE_ID: &str = "DesignedForInheritance";

/// Category both diagnostics are reported under
pub const RULE_CATEGORY: &str = "Design";

/// Outcome of classifying one class declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationKind {
    /// Closed by a modifier, or open and carrying the genuine marker
    Pass,
    /// No closing modifier and no marker
    MissingMarker,
    /// Closing modifier and marker together
    MarkerOnClosedClass,
}

impl ClassificationKind {
    /// Decision table for a class's closing modifiers against its resolved marker
    pub fn decide(has_closing_modifier: bool, has_marker: bool) -> Self {
        match (has_closing_modifier, has_marker) {
            (true, false) | (false, true) => Self::Pass,
            (true, true) => Self::MarkerOnClosedClass,
            (false, false) => Self::MissingMarker,
        }
    }

    pub fn is_violation(self) -> bool {
        !matches!(self, Self::Pass)
    }

    /// Descriptor used to report this outcome, if it is a violation
    pub fn descriptor(self) -> Option<&'static RuleDescriptor> {
        match self {
            Self::Pass => None,
            Self::MissingMarker => Some(&MISSING_MARKER_RULE),
            Self::MarkerOnClosedClass => Some(&MARKER_ON_CLOSED_CLASS_RULE),
        }
    }
}

/// Classification of one class, carrying where it was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub kind: ClassificationKind,
    /// Identifier text of the classified class
    pub class_name: String,
    /// Location of the identifier token, where diagnostics are reported
    pub identifier: Location,
    /// Location of the whole declaration, attributes included
    pub declaration: Location,
}

impl ClassificationResult {
    pub fn is_violation(&self) -> bool {
        self.kind.is_violation()
    }

    /// Rendered diagnostic message, if this result is a violation
    pub fn message(&self) -> Option<String> {
        self.kind
            .descriptor()
            .map(|descriptor| descriptor.format_message(&self.class_name))
    }
}

/// Fixed description of one diagnostic the rule can raise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDescriptor {
    pub id: &'static str,
    pub category: &'static str,
    pub title: &'static str,
    /// Message template; `{name}` is replaced by the class identifier
    pub message_format: &'static str,
    pub default_severity: Severity,
    /// Manual remedy shown when no automated fix applies
    pub remedy: &'static str,
}

impl RuleDescriptor {
    pub fn format_message(&self, class_name: &str) -> String {
        self.message_format.replace("{name}", class_name)
    }
}

pub static MISSING_MARKER_RULE: RuleDescriptor = RuleDescriptor {
    id: RULE_ID,
    category: RULE_CATEGORY,
    title: "Classes must be abstract, sealed or static, or be marked with [DesignedForInheritance]",
    message_format:
        "Class '{name}' must be abstract, sealed or static, or be marked with [DesignedForInheritance]",
    default_severity: Severity::Warning,
    remedy: "Seal the class, or mark it with [DesignedForInheritance] if it is meant to be derived from",
};

pub static MARKER_ON_CLOSED_CLASS_RULE: RuleDescriptor = RuleDescriptor {
    id: RULE_ID,
    category: RULE_CATEGORY,
    title: "[DesignedForInheritance] must not be used on abstract, sealed or static classes",
    message_format:
        "Class '{name}' is abstract, sealed or static and must not be marked with [DesignedForInheritance]",
    default_severity: Severity::Warning,
    remedy: "Remove either the [DesignedForInheritance] attribute or the abstract/sealed/static modifier",
};

/// The two automated corrections for a missing marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    /// Add a `sealed` modifier
    Seal,
    /// Add the marker attribute and, if needed, an import of its namespace
    AddMarker,
}

impl FixKind {
    /// Title offered to the user
    pub fn title(self) -> &'static str {
        match self {
            Self::Seal => "Seal class",
            Self::AddMarker => "Add [DesignedForInheritance] attribute",
        }
    }

    /// Stable key used to group equivalent fixes in a batch
    pub fn equivalence_key(self) -> &'static str {
        match self {
            Self::Seal => "seal",
            Self::AddMarker => "add-attribute",
        }
    }
}
