//! Classification of a single class declaration

use crate::analyzer::marker::MarkerResolver;
use crate::domain::classification::{ClassificationKind, ClassificationResult};
use crate::domain::marker::MarkerIdentity;
use crate::semantic::SemanticModel;
use crate::syntax::TypeDeclaration;

/// Applies the inheritance-scope rule to class declarations
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    resolver: MarkerResolver,
}

impl Classifier {
    pub fn new(marker: MarkerIdentity) -> Self {
        Self {
            resolver: MarkerResolver::new(marker),
        }
    }

    pub fn resolver(&self) -> &MarkerResolver {
        &self.resolver
    }

    /// Classify one declaration; anything that is not a class yields `None`
    pub fn classify<M>(&self, declaration: &TypeDeclaration, model: &M) -> Option<ClassificationResult>
    where
        M: SemanticModel + ?Sized,
    {
        if !declaration.is_class() {
            return None;
        }

        let closed = declaration.has_closing_modifier();
        let marked = self.resolver.is_marked(declaration, model);
        let kind = ClassificationKind::decide(closed, marked);

        tracing::trace!(
            "Class '{}' (closed: {}, marked: {}) -> {:?}",
            declaration.full_name,
            closed,
            marked,
            kind
        );

        Some(ClassificationResult {
            kind,
            class_name: declaration.name.clone(),
            identifier: declaration.identifier,
            declaration: declaration.location,
        })
    }
}
