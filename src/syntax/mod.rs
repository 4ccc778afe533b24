//! Read-only declaration model consumed by the classifier and the fixes
//!
//! Architecture: Published Language - The model is the contract between any front-end and the rule
//! - Nodes are immutable and shared through `Arc`, so an edit never disturbs other holders
//! - Spans are byte offsets into the owning document's text
//! - `csharp` is the bundled front-end; hosts with their own parser build the same types

pub mod csharp;

pub use csharp::CSharpParser;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Half-open byte range `[start, end)` into a document's text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`
    pub fn empty(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// A span plus the 1-based line/column of its start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub span: TextSpan,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(span: TextSpan, line: u32, column: u32) -> Self {
        Self { span, line, column }
    }
}

/// Modifier keywords the rule cares about; everything else is `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    Abstract,
    Sealed,
    Static,
    Partial,
    Virtual,
    Override,
    Other,
}

impl ModifierKind {
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "abstract" => Self::Abstract,
            "sealed" => Self::Sealed,
            "static" => Self::Static,
            "partial" => Self::Partial,
            "virtual" => Self::Virtual,
            "override" => Self::Override,
            _ => Self::Other,
        }
    }

    /// Abstract, sealed and static settle whether a class may be extended
    pub fn is_closing(self) -> bool {
        matches!(self, Self::Abstract | Self::Sealed | Self::Static)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub kind: ModifierKind,
    /// Keyword as written
    pub text: String,
    pub span: TextSpan,
}

impl Modifier {
    pub fn new(text: impl Into<String>, span: TextSpan) -> Self {
        let text = text.into();
        Self {
            kind: ModifierKind::from_keyword(&text),
            text,
            span,
        }
    }
}

/// Lexical scope an attribute name is bound in
///
/// Scopes form a persistent list from the innermost namespace or type outward to
/// the compilation unit, so sibling declarations share their common tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexicalScope {
    /// Dotted name of the namespace or type this scope opens; empty for the compilation unit
    pub container: String,
    /// Using directives declared directly in this scope
    pub usings: Vec<UsingDirective>,
    pub parent: Option<Arc<LexicalScope>>,
}

impl LexicalScope {
    /// Outermost scope of a compilation unit
    pub fn root(usings: Vec<UsingDirective>) -> Arc<Self> {
        Arc::new(Self {
            container: String::new(),
            usings,
            parent: None,
        })
    }

    /// Nested scope for `container` inside `parent`
    pub fn nested(
        parent: &Arc<Self>,
        container: impl Into<String>,
        usings: Vec<UsingDirective>,
    ) -> Arc<Self> {
        Arc::new(Self {
            container: container.into(),
            usings,
            parent: Some(Arc::clone(parent)),
        })
    }

    /// Iterate from this scope outward
    pub fn ancestors(&self) -> impl Iterator<Item = &LexicalScope> {
        std::iter::successors(Some(self), |scope| scope.parent.as_deref())
    }
}

/// `using` directive as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingDirective {
    /// Imported namespace (or aliased target) with whitespace removed
    pub path: String,
    pub alias: Option<String>,
    pub is_static: bool,
    pub is_global: bool,
    /// Declared inside an `#if` branch, so it may be compiled out
    pub conditional: bool,
    pub span: TextSpan,
}

impl UsingDirective {
    /// Plain namespace import: `using A.B;`
    pub fn namespace(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: None,
            is_static: false,
            is_global: false,
            conditional: false,
            span: TextSpan::default(),
        }
    }

    /// Alias directive: `using Alias = A.B;`
    pub fn alias(alias: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::namespace(path)
        }
    }

    pub fn with_span(mut self, span: TextSpan) -> Self {
        self.span = span;
        self
    }

    /// Whether this directive imports the namespace `path` without an alias
    pub fn imports_namespace(&self, path: &str) -> bool {
        self.alias.is_none() && !self.is_static && self.path == path
    }
}

/// One attribute usage attached to a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeReference {
    /// Written name, possibly dotted or alias-qualified, without whitespace
    pub name: String,
    pub span: TextSpan,
    /// Scope the name is bound in
    pub scope: Arc<LexicalScope>,
}

impl AttributeReference {
    pub fn new(name: impl Into<String>, span: TextSpan, scope: Arc<LexicalScope>) -> Self {
        Self {
            name: name.into(),
            span,
            scope,
        }
    }

    /// Last dot-separated segment of the written name
    pub fn short_name(&self) -> &str {
        let name = self
            .name
            .rsplit_once("::")
            .map_or(self.name.as_str(), |(_, rest)| rest);
        name.rsplit('.').next().unwrap_or(name)
    }
}

/// `[...]` attribute section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeList {
    pub span: TextSpan,
    /// Explicit target such as `type` in `[type: X]`
    pub target: Option<String>,
    pub attributes: Vec<AttributeReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Property,
    Indexer,
    Event,
    Field,
    Constructor,
    Other,
}

impl MemberKind {
    /// Members that share the method/property modifier shape and may be overridable
    pub fn can_be_overridable(self) -> bool {
        matches!(
            self,
            Self::Method | Self::Property | Self::Indexer | Self::Event
        )
    }
}

/// Direct member of a type body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDeclaration {
    pub kind: MemberKind,
    pub name: Option<String>,
    pub modifiers: Vec<Modifier>,
    pub span: TextSpan,
}

impl MemberDeclaration {
    pub fn new(kind: MemberKind, name: Option<String>) -> Self {
        Self {
            kind,
            name,
            modifiers: Vec::new(),
            span: TextSpan::default(),
        }
    }

    pub fn with_modifier(mut self, keyword: &str) -> Self {
        self.modifiers.push(Modifier::new(keyword, TextSpan::default()));
        self
    }

    pub fn has_modifier(&self, kind: ModifierKind) -> bool {
        self.modifiers.iter().any(|m| m.kind == kind)
    }

    pub fn is_overridable(&self) -> bool {
        self.kind.can_be_overridable() && self.has_modifier(ModifierKind::Virtual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Record,
    RecordStruct,
    Enum,
}

/// Class-shaped (or other type) declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    pub kind: TypeKind,
    pub name: String,
    pub identifier: Location,
    /// Start of the declaration, attribute lists included
    pub location: Location,
    pub span: TextSpan,
    /// Span of the `class`/`struct`/... keyword
    pub keyword_span: TextSpan,
    pub modifiers: Vec<Modifier>,
    pub attribute_lists: Vec<AttributeList>,
    pub members: Vec<MemberDeclaration>,
    pub nested: Vec<Arc<TypeDeclaration>>,
    /// Dotted containing namespace; empty for the global namespace
    pub namespace: String,
    /// Dotted name including namespace and containing types
    pub full_name: String,
    /// Scope the declaration's attributes are bound in
    pub scope: Arc<LexicalScope>,
}

impl TypeDeclaration {
    /// Declaration with no modifiers, attributes or members, in the global namespace
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind,
            full_name: name.clone(),
            name,
            identifier: Location::default(),
            location: Location::default(),
            span: TextSpan::default(),
            keyword_span: TextSpan::default(),
            modifiers: Vec::new(),
            attribute_lists: Vec::new(),
            members: Vec::new(),
            nested: Vec::new(),
            namespace: String::new(),
            scope: LexicalScope::root(Vec::new()),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Class, name)
    }

    pub fn with_modifier(mut self, keyword: &str) -> Self {
        self.modifiers.push(Modifier::new(keyword, TextSpan::default()));
        self
    }

    /// Add a single-attribute list bound in the declaration's scope
    pub fn with_attribute(mut self, name: &str) -> Self {
        let attribute = AttributeReference::new(name, TextSpan::default(), Arc::clone(&self.scope));
        self.attribute_lists.push(AttributeList {
            span: TextSpan::default(),
            target: None,
            attributes: vec![attribute],
        });
        self
    }

    pub fn with_member(mut self, member: MemberDeclaration) -> Self {
        self.members.push(member);
        self
    }

    /// Place the declaration in `scope`, re-binding any attributes already added
    pub fn in_scope(mut self, namespace: &str, scope: Arc<LexicalScope>) -> Self {
        self.namespace = namespace.to_string();
        self.full_name = qualify(namespace, &self.name);
        for list in &mut self.attribute_lists {
            for attribute in &mut list.attributes {
                attribute.scope = Arc::clone(&scope);
            }
        }
        self.scope = scope;
        self
    }

    pub fn is_class(&self) -> bool {
        self.kind == TypeKind::Class
    }

    pub fn has_modifier(&self, kind: ModifierKind) -> bool {
        self.modifiers.iter().any(|m| m.kind == kind)
    }

    pub fn has_closing_modifier(&self) -> bool {
        self.modifiers.iter().any(|m| m.kind.is_closing())
    }

    /// All attribute usages across every attribute list
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeReference> {
        self.attribute_lists.iter().flat_map(|list| list.attributes.iter())
    }

    /// This declaration followed by every nested declaration, depth first
    pub fn descendants_and_self(self: &Arc<Self>) -> Vec<Arc<TypeDeclaration>> {
        let mut out = vec![Arc::clone(self)];
        for nested in &self.nested {
            out.extend(nested.descendants_and_self());
        }
        out
    }
}

/// Join a dotted prefix and a name
pub fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Root of one parsed source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationUnit {
    /// Using directives declared at the top of the file
    pub usings: Vec<UsingDirective>,
    /// Top-level type declarations in source order, across namespaces
    pub types: Vec<Arc<TypeDeclaration>>,
    /// First top-level item a new using directive must precede
    pub import_anchor: Option<Location>,
    /// Whether the front-end recovered from syntax errors
    pub has_errors: bool,
}

impl CompilationUnit {
    /// Every type declaration, nested ones included, depth first
    pub fn all_types(&self) -> Vec<Arc<TypeDeclaration>> {
        self.types
            .iter()
            .flat_map(|declaration| declaration.descendants_and_self())
            .collect()
    }

    /// Every class declaration, nested ones included
    pub fn classes(&self) -> Vec<Arc<TypeDeclaration>> {
        self.all_types()
            .into_iter()
            .filter(|declaration| declaration.is_class())
            .collect()
    }

    /// Class whose identifier token starts at `offset`
    pub fn find_class_at(&self, offset: usize) -> Option<Arc<TypeDeclaration>> {
        self.classes()
            .into_iter()
            .find(|declaration| declaration.identifier.span.start == offset)
    }

    /// Whether an unconditional top-level using already imports `namespace` without an alias
    pub fn imports_namespace(&self, namespace: &str) -> bool {
        self.usings
            .iter()
            .any(|using| !using.conditional && using.imports_namespace(namespace))
    }

    /// Last top-level using outside any preprocessor branch
    pub fn last_unconditional_using(&self) -> Option<&UsingDirective> {
        self.usings.iter().rev().find(|using| !using.conditional)
    }
}

/// Immutable pairing of a file's text and its parsed tree
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub text: Arc<str>,
    pub root: Arc<CompilationUnit>,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<Arc<str>>, root: CompilationUnit) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            root: Arc::new(root),
        }
    }

    /// Parse `text` with a fresh front-end
    pub fn parse(path: impl AsRef<Path>, text: &str) -> crate::GuardianResult<Self> {
        CSharpParser::new()?.parse_document(path, text)
    }

    /// Source line containing `offset`, without its line terminator
    pub fn line_at(&self, offset: usize) -> &str {
        let offset = offset.min(self.text.len());
        let start = self.text[..offset].rfind('\n').map_or(0, |i| i + 1);
        let end = self.text[offset..]
            .find('\n')
            .map_or(self.text.len(), |i| offset + i);
        self.text[start..end].trim_end_matches('\r')
    }

    /// Whitespace between the start of the line and `offset`, if nothing else precedes it
    pub fn indentation_at(&self, offset: usize) -> Option<&str> {
        let offset = offset.min(self.text.len());
        let start = self.text[..offset].rfind('\n').map_or(0, |i| i + 1);
        let prefix = &self.text[start..offset];
        prefix
            .chars()
            .all(|c| c == ' ' || c == '\t')
            .then_some(prefix)
    }

    /// Line terminator used by the document
    pub fn newline(&self) -> &'static str {
        if self.text.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }
}
