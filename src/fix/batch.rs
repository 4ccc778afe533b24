//! "Fix all" over one document
//!
//! Every fix is computed against the same original document, then the edits
//! are merged and applied once. The shared import insertion is identical
//! across fixes, so it collapses to a single directive.

use crate::domain::classification::{ClassificationResult, FixKind};
use crate::domain::violations::GuardianResult;
use crate::fix::{apply_edits, CodeFix, Transformer};
use crate::syntax::SourceDocument;

/// Result of fixing one document
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Fixed document, or `None` when nothing applied
    pub document: Option<SourceDocument>,
    pub fixes: Vec<CodeFix>,
    /// Violations that have no automated fix
    pub skipped: usize,
}

impl BatchOutcome {
    pub fn is_changed(&self) -> bool {
        self.document.is_some()
    }
}

/// Applies every available fix in a document in one pass
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchFixer {
    transformer: Transformer,
    /// Restrict to one kind of fix, as an equivalence-key scoped "fix all"
    only: Option<FixKind>,
}

impl BatchFixer {
    pub fn new(transformer: Transformer) -> Self {
        Self {
            transformer,
            only: None,
        }
    }

    pub fn only(mut self, kind: FixKind) -> Self {
        self.only = Some(kind);
        self
    }

    /// One fix per violation, all computed against `document`
    pub fn collect(
        &self,
        document: &SourceDocument,
        classifications: &[ClassificationResult],
    ) -> (Vec<CodeFix>, usize) {
        let mut fixes = Vec::new();
        let mut skipped = 0;
        for classification in classifications.iter().filter(|c| c.is_violation()) {
            match self.transformer.code_fix_for(document, classification) {
                Some(fix) if self.only.map_or(true, |kind| kind == fix.kind) => fixes.push(fix),
                Some(_) => {}
                None => skipped += 1,
            }
        }
        (fixes, skipped)
    }

    pub fn fix_document(
        &self,
        document: &SourceDocument,
        classifications: &[ClassificationResult],
    ) -> GuardianResult<BatchOutcome> {
        let (fixes, skipped) = self.collect(document, classifications);
        if fixes.is_empty() {
            return Ok(BatchOutcome {
                document: None,
                fixes,
                skipped,
            });
        }

        let edits: Vec<_> = fixes.iter().flat_map(|fix| fix.edits.iter().cloned()).collect();
        let text = apply_edits(&document.text, &edits)?;
        tracing::debug!(
            "Applied {} fixes ({} edits) to {}",
            fixes.len(),
            edits.len(),
            document.path.display()
        );

        Ok(BatchOutcome {
            document: Some(SourceDocument::parse(&document.path, &text)?),
            fixes,
            skipped,
        })
    }
}
