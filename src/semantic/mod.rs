//! Semantic resolution capability consumed by the marker check
//!
//! Architecture: Anti-Corruption Layer - Type identity is asked for, never computed by the rule
//! - `SemanticModel` is the one seam between the rule and whatever knows declared types
//! - Symbols expose only the containing-namespace chain the rule needs
//! - Closures implement the trait so tests can stub resolution inline

pub mod index;

pub use index::TypeIndex;

use crate::syntax::AttributeReference;
use std::sync::Arc;

/// A namespace, linked outward to the unnamed global namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSymbol {
    /// Single segment name; empty for the global namespace
    pub name: String,
    pub containing: Option<Arc<NamespaceSymbol>>,
}

impl NamespaceSymbol {
    pub fn global() -> Arc<Self> {
        Arc::new(Self {
            name: String::new(),
            containing: None,
        })
    }

    /// Build the chain for a dotted path, returning the innermost namespace
    pub fn from_path(path: &str) -> Arc<Self> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .fold(Self::global(), |containing, segment| {
                Arc::new(Self {
                    name: segment.to_string(),
                    containing: Some(containing),
                })
            })
    }

    pub fn is_global(&self) -> bool {
        self.containing.is_none() && self.name.is_empty()
    }

    /// Iterate from this namespace outward
    pub fn chain(&self) -> impl Iterator<Item = &NamespaceSymbol> {
        std::iter::successors(Some(self), |ns| ns.containing.as_deref())
    }

    /// Dotted path in declaration order, skipping empty segments
    pub fn path(&self) -> String {
        let mut segments: Vec<&str> = self
            .chain()
            .map(|ns| ns.name.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        segments.reverse();
        segments.join(".")
    }
}

/// A resolved declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSymbol {
    pub name: String,
    /// Dotted name including namespace and containing types
    pub full_name: String,
    pub containing_namespace: Arc<NamespaceSymbol>,
}

impl TypeSymbol {
    pub fn new(
        name: impl Into<String>,
        full_name: impl Into<String>,
        containing_namespace: Arc<NamespaceSymbol>,
    ) -> Self {
        Self {
            name: name.into(),
            full_name: full_name.into(),
            containing_namespace,
        }
    }

    /// Dotted path of the containing namespace
    pub fn namespace_path(&self) -> String {
        self.containing_namespace.path()
    }
}

/// Result of resolving an attribute reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    Type(TypeSymbol),
    /// Unknown or ambiguous reference
    Error,
}

impl ResolvedType {
    pub fn symbol(&self) -> Option<&TypeSymbol> {
        match self {
            Self::Type(symbol) => Some(symbol),
            Self::Error => None,
        }
    }
}

/// Resolves the type an attribute usage denotes
pub trait SemanticModel {
    fn resolve_type(&self, attribute: &AttributeReference) -> ResolvedType;
}

impl<F> SemanticModel for F
where
    F: Fn(&AttributeReference) -> ResolvedType,
{
    fn resolve_type(&self, attribute: &AttributeReference) -> ResolvedType {
        self(attribute)
    }
}
