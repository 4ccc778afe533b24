//! Automated corrections for classes missing the inheritance marker
//!
//! Architecture: Functional Core - Fixes are computed, never performed in place
//! - A fix is a set of text edits against one immutable document
//! - Applying a fix produces a new document and leaves the original untouched
//! - Edits only insert text, so formatting and unrelated declarations survive

pub mod batch;

pub use batch::{BatchFixer, BatchOutcome};

use crate::domain::classification::{ClassificationKind, ClassificationResult, FixKind};
use crate::domain::marker::{MarkerIdentity, DESIGNED_FOR_INHERITANCE};
use crate::domain::violations::{GuardianError, GuardianResult};
use crate::syntax::{ModifierKind, SourceDocument, TextSpan, TypeDeclaration};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Replacement of one byte span
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextEdit {
    pub span: TextSpan,
    pub new_text: String,
}

impl TextEdit {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            span: TextSpan::empty(offset),
            new_text: text.into(),
        }
    }

    pub fn replace(span: TextSpan, text: impl Into<String>) -> Self {
        Self {
            span,
            new_text: text.into(),
        }
    }
}

/// A titled correction for one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFix {
    pub kind: FixKind,
    pub title: &'static str,
    pub class_name: String,
    pub edits: Vec<TextEdit>,
}

impl CodeFix {
    /// Key grouping equivalent fixes for "fix all"
    pub fn equivalence_key(&self) -> &'static str {
        self.kind.equivalence_key()
    }

    /// Apply to `document`, producing a freshly parsed document
    pub fn apply(&self, document: &SourceDocument) -> GuardianResult<SourceDocument> {
        let text = apply_edits(&document.text, &self.edits)?;
        SourceDocument::parse(&document.path, &text)
    }
}

/// Apply edits computed against `text`
///
/// Identical edits collapse to one. Insertions at the same offset keep their
/// given order. Overlapping edits are rejected.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> GuardianResult<String> {
    let mut seen = HashSet::new();
    let mut ordered: Vec<&TextEdit> = edits.iter().filter(|edit| seen.insert(*edit)).collect();
    ordered.sort_by_key(|edit| (edit.span.start, edit.span.end));

    let mut output = String::with_capacity(text.len() + 64);
    let mut cursor = 0;
    for edit in ordered {
        let TextSpan { start, end } = edit.span;
        if start < cursor {
            return Err(GuardianError::fix(format!(
                "Overlapping edits at byte {start}"
            )));
        }
        if end < start || end > text.len() {
            return Err(GuardianError::fix(format!(
                "Edit span {start}..{end} is outside the document"
            )));
        }
        let unchanged = text.get(cursor..start).ok_or_else(|| {
            GuardianError::fix(format!("Edit at byte {start} splits a character"))
        })?;
        output.push_str(unchanged);
        output.push_str(&edit.new_text);
        cursor = end;
    }
    output.push_str(text.get(cursor..).unwrap_or_default());

    Ok(output)
}

/// Fix selection heuristic: any overridable member means the class was designed
/// to be extended, so mark it; otherwise seal it.
pub fn preferred_fix(declaration: &TypeDeclaration) -> FixKind {
    if declaration.members.iter().any(|member| member.is_overridable()) {
        FixKind::AddMarker
    } else {
        FixKind::Seal
    }
}

/// Builds the two corrections for one marker identity
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    marker: MarkerIdentity,
}

impl Transformer {
    pub fn new(marker: MarkerIdentity) -> Self {
        Self { marker }
    }

    pub fn marker(&self) -> MarkerIdentity {
        self.marker
    }

    /// Fix for a reported classification, if one exists
    ///
    /// Only a missing marker has an automated fix. Marker-on-closed-class needs
    /// the user to decide which of the two to drop.
    pub fn code_fix_for(
        &self,
        document: &SourceDocument,
        classification: &ClassificationResult,
    ) -> Option<CodeFix> {
        if classification.kind != ClassificationKind::MissingMarker {
            return None;
        }
        let declaration = document
            .root
            .find_class_at(classification.identifier.span.start)?;

        Some(match preferred_fix(&declaration) {
            FixKind::Seal => self.seal(&declaration),
            FixKind::AddMarker => self.add_marker(document, &declaration),
        })
    }

    /// Insert `sealed` before `partial` if present, otherwise before the `class` keyword
    pub fn seal(&self, declaration: &TypeDeclaration) -> CodeFix {
        let offset = declaration
            .modifiers
            .iter()
            .find(|modifier| modifier.kind == ModifierKind::Partial)
            .map_or(declaration.keyword_span.start, |partial| partial.span.start);

        CodeFix {
            kind: FixKind::Seal,
            title: FixKind::Seal.title(),
            class_name: declaration.name.clone(),
            edits: vec![TextEdit::insert(offset, "sealed ")],
        }
    }

    /// Attach the marker attribute and import its namespace unless already imported
    pub fn add_marker(&self, document: &SourceDocument, declaration: &TypeDeclaration) -> CodeFix {
        let mut edits = Vec::with_capacity(2);
        if let Some(import) = self.import_edit(document) {
            edits.push(import);
        }
        edits.push(self.attribute_edit(document, declaration));

        CodeFix {
            kind: FixKind::AddMarker,
            title: FixKind::AddMarker.title(),
            class_name: declaration.name.clone(),
            edits,
        }
    }

    fn attribute_edit(&self, document: &SourceDocument, declaration: &TypeDeclaration) -> TextEdit {
        let newline = document.newline();
        let attribute = self.marker.attribute_list_text();

        match declaration.attribute_lists.last() {
            None => {
                let offset = declaration.span.start;
                match document.indentation_at(offset) {
                    Some(indent) => TextEdit::insert(offset, format!("{attribute}{newline}{indent}")),
                    None => TextEdit::insert(offset, format!("{attribute} ")),
                }
            }
            Some(last) => {
                let offset = last.span.end;
                if ends_line(&document.text, offset) {
                    let indent = line_indent(&document.text, last.span.start);
                    TextEdit::insert(offset, format!("{newline}{indent}{attribute}"))
                } else {
                    TextEdit::insert(offset, format!(" {attribute}"))
                }
            }
        }
    }

    /// The using directive edit, or `None` when the namespace is already imported
    fn import_edit(&self, document: &SourceDocument) -> Option<TextEdit> {
        let namespace = self.marker.namespace;
        if document.root.imports_namespace(namespace) {
            return None;
        }

        let newline = document.newline();
        let directive = self.marker.using_directive_text();
        // Usings inside #if branches may be compiled out, so they never anchor the insert.
        let edit = match (
            document.root.last_unconditional_using(),
            document.root.import_anchor,
        ) {
            (Some(last), _) => {
                let indent = line_indent(&document.text, last.span.start);
                TextEdit::insert(last.span.end, format!("{newline}{indent}{directive}"))
            }
            (None, Some(anchor)) => {
                let indent = document.indentation_at(anchor.span.start).unwrap_or("");
                TextEdit::insert(
                    anchor.span.start,
                    format!("{directive}{newline}{newline}{indent}"),
                )
            }
            (None, None) => TextEdit::insert(0, format!("{directive}{newline}")),
        };
        Some(edit)
    }
}

impl From<MarkerIdentity> for Transformer {
    fn from(marker: MarkerIdentity) -> Self {
        Self::new(marker)
    }
}

/// Transformer for the standard `DesignedForInheritance` marker
pub fn designed_for_inheritance() -> Transformer {
    Transformer::new(DESIGNED_FOR_INHERITANCE)
}

/// Leading whitespace of the line containing `offset`
fn line_indent(text: &str, offset: usize) -> &str {
    let offset = offset.min(text.len());
    let start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[start..];
    let width = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..width]
}

/// Whether only spaces or tabs separate `offset` from the end of its line
fn ends_line(text: &str, offset: usize) -> bool {
    text.get(offset..)
        .map(|rest| rest.trim_start_matches([' ', '\t']))
        .map_or(true, |rest| {
            rest.is_empty() || rest.starts_with('\n') || rest.starts_with('\r')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Location, MemberDeclaration, MemberKind};

    fn document(text: &str) -> SourceDocument {
        SourceDocument::parse("Test0.cs", text).unwrap()
    }

    fn missing_marker(document: &SourceDocument, name: &str) -> ClassificationResult {
        let declaration = document
            .root
            .classes()
            .into_iter()
            .find(|c| c.name == name)
            .unwrap();
        ClassificationResult {
            kind: ClassificationKind::MissingMarker,
            class_name: name.to_string(),
            identifier: declaration.identifier,
            declaration: declaration.location,
        }
    }

    fn fix(text: &str) -> String {
        let document = document(text);
        let classification = missing_marker(&document, "Example");
        let fix = designed_for_inheritance()
            .code_fix_for(&document, &classification)
            .unwrap();
        fix.apply(&document).unwrap().text.to_string()
    }

    #[test]
    fn test_seal_is_default_fix() {
        assert_eq!(
            fix("namespace TestCase\n{\n    public class Example { }\n}\n"),
            "namespace TestCase\n{\n    public sealed class Example { }\n}\n"
        );
    }

    #[test]
    fn test_seal_goes_before_partial() {
        assert_eq!(
            fix("public partial class Example { }\n"),
            "public sealed partial class Example { }\n"
        );
        assert_eq!(fix("class Example { }"), "sealed class Example { }");
    }

    #[test]
    fn test_virtual_member_adds_marker_and_import() {
        let input = r#"namespace TestCase
{
    public class Example
    {
        public virtual string GetName()
        {
            return "Default";
        }
    }
}
"#;
        let expected = r#"using ProductiveRage.SealedClassVerification;

namespace TestCase
{
    [DesignedForInheritance]
    public class Example
    {
        public virtual string GetName()
        {
            return "Default";
        }
    }
}
"#;
        assert_eq!(fix(input), expected);
    }

    #[test]
    fn test_existing_import_is_not_duplicated() {
        let input = "using ProductiveRage.SealedClassVerification;\n\nnamespace TestCase\n{\n    public class Example\n    {\n        public virtual int Count { get; set; }\n    }\n}\n";
        let expected = "using ProductiveRage.SealedClassVerification;\n\nnamespace TestCase\n{\n    [DesignedForInheritance]\n    public class Example\n    {\n        public virtual int Count { get; set; }\n    }\n}\n";
        assert_eq!(fix(input), expected);
    }

    #[test]
    fn test_aliased_import_does_not_count() {
        let input = "using Sealing = ProductiveRage.SealedClassVerification;\n\npublic class Example { public virtual void M() { } }\n";
        let output = fix(input);

        assert!(output.starts_with(
            "using Sealing = ProductiveRage.SealedClassVerification;\nusing ProductiveRage.SealedClassVerification;\n"
        ));
    }

    #[test]
    fn test_import_follows_last_using_and_keeps_crlf() {
        let input = "using System;\r\n\r\nnamespace TestCase\r\n{\r\n    public class Example\r\n    {\r\n        public virtual void M() { }\r\n    }\r\n}\r\n";
        let expected = "using System;\r\nusing ProductiveRage.SealedClassVerification;\r\n\r\nnamespace TestCase\r\n{\r\n    [DesignedForInheritance]\r\n    public class Example\r\n    {\r\n        public virtual void M() { }\r\n    }\r\n}\r\n";
        assert_eq!(fix(input), expected);
    }

    #[test]
    fn test_marker_follows_existing_attribute_lists() {
        let own_line = "using ProductiveRage.SealedClassVerification;\n\nnamespace TestCase\n{\n    [Serializable]\n    public class Example\n    {\n        public virtual void M() { }\n    }\n}\n";
        assert!(fix(own_line).contains("    [Serializable]\n    [DesignedForInheritance]\n    public class Example"));

        let inline = "[Serializable] public class Example { public virtual void M() { } }";
        assert_eq!(
            fix(inline),
            "using ProductiveRage.SealedClassVerification;\n\n[Serializable] [DesignedForInheritance] public class Example { public virtual void M() { } }"
        );
    }

    #[test]
    fn test_marker_and_import_at_same_offset_keep_order() {
        assert_eq!(
            fix("public class Example { public virtual void M() { } }"),
            "using ProductiveRage.SealedClassVerification;\n\n[DesignedForInheritance]\npublic class Example { public virtual void M() { } }"
        );
    }

    #[test]
    fn test_import_stays_out_of_conditional_block() {
        let input = "#if DEBUG\nusing System.Diagnostics;\n#endif\n\npublic class Example { public virtual void M() { } }\n";
        assert_eq!(
            fix(input),
            "#if DEBUG\nusing System.Diagnostics;\n#endif\n\nusing ProductiveRage.SealedClassVerification;\n\n[DesignedForInheritance]\npublic class Example { public virtual void M() { } }\n"
        );

        // An unconditional using still anchors the insert, even before an #if block
        let mixed = "using System;\n#if DEBUG\nusing ProductiveRage.SealedClassVerification;\n#endif\n\npublic class Example { public virtual void M() { } }\n";
        assert!(fix(mixed).starts_with(
            "using System;\nusing ProductiveRage.SealedClassVerification;\n#if DEBUG\n"
        ));
    }

    #[test]
    fn test_import_goes_above_doc_comment() {
        let input = "/// <summary>x</summary>\npublic class Example\n{\n    public virtual void M() { }\n}\n";
        assert_eq!(
            fix(input),
            "using ProductiveRage.SealedClassVerification;\n\n/// <summary>x</summary>\n[DesignedForInheritance]\npublic class Example\n{\n    public virtual void M() { }\n}\n"
        );

        let header = "// Copyright\n\n/// <summary>x</summary>\npublic class Example { public virtual void M() { } }\n";
        assert!(fix(header).starts_with(
            "// Copyright\n\nusing ProductiveRage.SealedClassVerification;\n\n/// <summary>x</summary>\n[DesignedForInheritance]\n"
        ));
    }

    #[test]
    fn test_import_precedes_file_scoped_namespace() {
        let input = "namespace TestCase;\n\npublic class Example\n{\n    public virtual void M() { }\n}\n";
        assert_eq!(
            fix(input),
            "using ProductiveRage.SealedClassVerification;\n\nnamespace TestCase;\n\n[DesignedForInheritance]\npublic class Example\n{\n    public virtual void M() { }\n}\n"
        );

        let after_usings = "using System;\n\nnamespace TestCase;\n\npublic class Example { public virtual void M() { } }\n";
        assert!(fix(after_usings).starts_with(
            "using System;\nusing ProductiveRage.SealedClassVerification;\n\nnamespace TestCase;\n"
        ));
    }

    #[test]
    fn test_define_directives_stay_first() {
        let input = "#define TRACE\n\npublic class Example { public virtual void M() { } }\n";
        assert!(fix(input).starts_with(
            "#define TRACE\n\nusing ProductiveRage.SealedClassVerification;\n\n[DesignedForInheritance]\n"
        ));
    }

    #[test]
    fn test_marker_on_closed_class_has_no_fix() {
        let document = document("[DesignedForInheritance] public abstract class Example { }");
        let mut classification = missing_marker(&document, "Example");
        classification.kind = ClassificationKind::MarkerOnClosedClass;

        assert!(designed_for_inheritance()
            .code_fix_for(&document, &classification)
            .is_none());
    }

    #[test]
    fn test_unknown_location_has_no_fix() {
        let document = document("public class Example { }");
        let mut classification = missing_marker(&document, "Example");
        classification.identifier = Location::default();

        assert!(designed_for_inheritance()
            .code_fix_for(&document, &classification)
            .is_none());
    }

    #[test]
    fn test_original_document_is_unchanged() {
        let original = document("public class Example { }");
        let classification = missing_marker(&original, "Example");
        let fixed = designed_for_inheritance()
            .code_fix_for(&original, &classification)
            .unwrap()
            .apply(&original)
            .unwrap();

        assert_eq!(&*original.text, "public class Example { }");
        assert!(fixed.root.classes()[0].has_closing_modifier());
        assert!(!original.root.classes()[0].has_closing_modifier());
    }

    #[test]
    fn test_preferred_fix_heuristic() {
        let plain = TypeDeclaration::class("Example")
            .with_member(MemberDeclaration::new(MemberKind::Method, Some("Run".into())).with_modifier("public"))
            .with_member(MemberDeclaration::new(MemberKind::Constructor, None).with_modifier("virtual"));
        assert_eq!(preferred_fix(&plain), FixKind::Seal);

        for kind in [
            MemberKind::Method,
            MemberKind::Property,
            MemberKind::Indexer,
            MemberKind::Event,
        ] {
            let open = TypeDeclaration::class("Example")
                .with_member(MemberDeclaration::new(kind, None).with_modifier("virtual"));
            assert_eq!(preferred_fix(&open), FixKind::AddMarker, "{kind:?}");
        }

        // Fields cannot be overridden, even when the source wrongly says so
        let field = TypeDeclaration::class("Example")
            .with_member(MemberDeclaration::new(MemberKind::Field, None).with_modifier("virtual"));
        assert_eq!(preferred_fix(&field), FixKind::Seal);
    }

    #[test]
    fn test_apply_edits_rejects_overlap() {
        let edits = vec![
            TextEdit::replace(TextSpan::new(0, 5), "a"),
            TextEdit::replace(TextSpan::new(3, 6), "b"),
        ];
        assert!(apply_edits("0123456789", &edits).is_err());
    }

    #[test]
    fn test_apply_edits_collapses_duplicates() {
        let edits = vec![
            TextEdit::insert(2, "x"),
            TextEdit::insert(0, ">"),
            TextEdit::insert(2, "x"),
        ];
        assert_eq!(apply_edits("abcd", &edits).unwrap(), ">abxcd");
    }
}
