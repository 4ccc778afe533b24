//! Marker resolution: a cheap name filter, then semantic confirmation
//!
//! Only attributes whose last name segment looks like the marker reach the
//! semantic model; everything else is rejected on text alone.

use crate::domain::marker::{MarkerIdentity, DESIGNED_FOR_INHERITANCE};
use crate::semantic::{ResolvedType, SemanticModel};
use crate::syntax::{AttributeReference, TypeDeclaration};

/// Decides whether a class carries the genuine marker attribute
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerResolver {
    marker: MarkerIdentity,
}

impl MarkerResolver {
    pub fn new(marker: MarkerIdentity) -> Self {
        Self { marker }
    }

    pub fn marker(&self) -> MarkerIdentity {
        self.marker
    }

    /// Attributes that pass the short-name filter
    pub fn candidates<'d>(
        &self,
        declaration: &'d TypeDeclaration,
    ) -> impl Iterator<Item = &'d AttributeReference> + 'd {
        let marker = self.marker;
        declaration
            .attributes()
            .filter(move |attribute| marker.matches_short_name(attribute.short_name()))
    }

    /// Whether `attribute` resolves to a type declared in the marker's namespace
    pub fn confirms<M>(&self, attribute: &AttributeReference, model: &M) -> bool
    where
        M: SemanticModel + ?Sized,
    {
        match model.resolve_type(attribute) {
            ResolvedType::Type(symbol) => {
                let namespace = symbol.namespace_path();
                let confirmed = namespace == self.marker.namespace;
                tracing::trace!(
                    "Attribute '{}' resolved to {} (namespace '{}', marker: {})",
                    attribute.name,
                    symbol.full_name,
                    namespace,
                    confirmed
                );
                confirmed
            }
            ResolvedType::Error => {
                tracing::trace!("Attribute '{}' did not resolve", attribute.name);
                false
            }
        }
    }

    /// Whether any candidate attribute is confirmed as the marker
    pub fn is_marked<M>(&self, declaration: &TypeDeclaration, model: &M) -> bool
    where
        M: SemanticModel + ?Sized,
    {
        self.candidates(declaration)
            .any(|attribute| self.confirms(attribute, model))
    }
}

impl From<MarkerIdentity> for MarkerResolver {
    fn from(marker: MarkerIdentity) -> Self {
        Self::new(marker)
    }
}

/// Resolver for the standard `DesignedForInheritance` marker
pub fn designed_for_inheritance() -> MarkerResolver {
    MarkerResolver::new(DESIGNED_FOR_INHERITANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{NamespaceSymbol, TypeSymbol};
    use std::cell::Cell;

    fn resolves_to(namespace: &'static str) -> impl Fn(&AttributeReference) -> ResolvedType {
        move |attribute| {
            ResolvedType::Type(TypeSymbol::new(
                attribute.short_name(),
                format!("{namespace}.{}", attribute.short_name()),
                NamespaceSymbol::from_path(namespace),
            ))
        }
    }

    #[test]
    fn test_no_candidates_means_no_lookup() {
        let calls = Cell::new(0);
        let model = |_: &AttributeReference| {
            calls.set(calls.get() + 1);
            ResolvedType::Error
        };
        let declaration = TypeDeclaration::class("Example")
            .with_attribute("Serializable")
            .with_attribute("Obsolete");

        assert!(!designed_for_inheritance().is_marked(&declaration, &model));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_no_attributes_is_unmarked() {
        let model = resolves_to("ProductiveRage.SealedClassVerification");
        assert!(!designed_for_inheritance().is_marked(&TypeDeclaration::class("Example"), &model));
    }

    #[test]
    fn test_confirmed_by_exact_namespace() {
        let resolver = designed_for_inheritance();
        let declaration = TypeDeclaration::class("Example").with_attribute("DesignedForInheritance");

        assert!(resolver.is_marked(&declaration, &resolves_to("ProductiveRage.SealedClassVerification")));
        assert!(!resolver.is_marked(&declaration, &resolves_to("TestCase")));
        assert!(!resolver.is_marked(&declaration, &resolves_to("ProductiveRage")));
        assert!(!resolver.is_marked(
            &declaration,
            &resolves_to("ProductiveRage.SealedClassVerification.Extra")
        ));
        assert!(!resolver.is_marked(
            &declaration,
            &resolves_to("Company.ProductiveRage.SealedClassVerification")
        ));
    }

    #[test]
    fn test_unresolved_candidate_is_discarded() {
        let declaration = TypeDeclaration::class("Example").with_attribute("DesignedForInheritance");
        let model = |_: &AttributeReference| ResolvedType::Error;

        assert!(!designed_for_inheritance().is_marked(&declaration, &model));
    }

    #[test]
    fn test_any_confirmed_candidate_suffices() {
        let declaration = TypeDeclaration::class("Example")
            .with_attribute("Local.DesignedForInheritance")
            .with_attribute("ProductiveRage.SealedClassVerification.DesignedForInheritanceAttribute");
        let model = |attribute: &AttributeReference| {
            let namespace = if attribute.name.starts_with("Local.") {
                "Local"
            } else {
                "ProductiveRage.SealedClassVerification"
            };
            resolves_to(namespace)(attribute)
        };

        let resolver = designed_for_inheritance();
        assert_eq!(resolver.candidates(&declaration).count(), 2);
        assert!(resolver.is_marked(&declaration, &model));
    }

    #[test]
    fn test_works_through_trait_objects() {
        let declaration = TypeDeclaration::class("Example").with_attribute("DesignedForInheritance");
        let model = resolves_to("ProductiveRage.SealedClassVerification");
        let dynamic: &dyn SemanticModel = &model;

        assert!(designed_for_inheritance().is_marked(&declaration, dynamic));
    }
}
