//! C# front-end built on tree-sitter
//!
//! Code Quality Principle: Specialized Analysis Services - the front-end owns all grammar knowledge
//! - Translates tree-sitter nodes into the declaration model and nothing more
//! - Tolerates malformed input: error nodes are skipped, never reported as failures
//! - Binds every attribute to the lexical scope it is written in

use crate::domain::violations::{GuardianError, GuardianResult};
use crate::syntax::{
    qualify, AttributeList, AttributeReference, CompilationUnit, LexicalScope, Location,
    MemberDeclaration, MemberKind, Modifier, SourceDocument, TextSpan, TypeDeclaration, TypeKind,
    UsingDirective,
};
use std::path::Path;
use std::sync::Arc;
use tree_sitter::{Node, Parser};

/// Reusable C# parser; one per thread
pub struct CSharpParser {
    parser: Parser,
}

impl CSharpParser {
    /// Create a parser with the C# grammar loaded
    pub fn new() -> GuardianResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .map_err(|e| GuardianError::parse("<grammar>", format!("{e}")))?;
        Ok(Self { parser })
    }

    /// Parse source text into a compilation unit
    pub fn parse(&mut self, source: &str) -> GuardianResult<CompilationUnit> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| GuardianError::parse("<source>", "parser produced no tree"))?;
        let root = tree.root_node();

        let mut unit = Builder { source }.compilation_unit(root);
        unit.has_errors = root.has_error();
        Ok(unit)
    }

    /// Parse a file's text into a document
    pub fn parse_document(
        &mut self,
        path: impl AsRef<Path>,
        source: &str,
    ) -> GuardianResult<SourceDocument> {
        let path = path.as_ref();
        let unit = self.parse(source).map_err(|e| match e {
            GuardianError::Parse { message, .. } => {
                GuardianError::parse(path.display().to_string(), message)
            }
            other => other,
        })?;
        if unit.has_errors {
            tracing::debug!("Recovered from syntax errors in {}", path.display());
        }
        Ok(SourceDocument::new(path, source, unit))
    }
}

struct Builder<'s> {
    source: &'s str,
}

impl<'s> Builder<'s> {
    fn compilation_unit(&self, root: Node<'_>) -> CompilationUnit {
        let usings = self.usings_in(root);
        let root_scope = LexicalScope::root(usings.clone());
        let mut types = Vec::new();
        let mut import_anchor = None;

        // A file-scoped namespace applies to every sibling after it.
        let mut scope = Arc::clone(&root_scope);
        let mut namespace = String::new();

        // Doc comments belong to the item they precede, so the anchor moves up to them.
        let mut leading_doc = None;
        for i in 0..root.named_child_count() {
            let Some(child) = root.named_child(i) else { continue };
            match child.kind() {
                "comment" => {
                    if is_doc_comment(self.text(child)) {
                        leading_doc.get_or_insert(child);
                    }
                }
                "extern_alias_directive" | "using_directive" | "shebang_directive" => {
                    leading_doc = None;
                }
                "preproc_if" if self.only_directives(child) => {
                    leading_doc = None;
                }
                // Line directives such as #define must stay ahead of any using.
                kind if kind.starts_with("preproc_") && kind != "preproc_if" => {}
                _ => {
                    import_anchor = Some(location(leading_doc.unwrap_or(child)));
                    break;
                }
            }
        }

        for child in self.members_of(root) {
            match child.kind() {
                "file_scoped_namespace_declaration" => {
                    let name = self.name_field(child);
                    let mut scoped_usings = self.usings_in(child);
                    scoped_usings.extend(self.usings_after(root, child));
                    scope = open_namespace(&root_scope, "", &name, scoped_usings);
                    namespace = name;
                    self.collect_types(child, &scope, &namespace, &mut types);
                }
                _ => self.collect_item(child, &scope, &namespace, &mut types),
            }
        }

        CompilationUnit {
            usings,
            types,
            import_anchor,
            has_errors: false,
        }
    }

    /// Walk namespace members of `container`, appending type declarations
    fn collect_types(
        &self,
        container: Node<'_>,
        scope: &Arc<LexicalScope>,
        namespace: &str,
        out: &mut Vec<Arc<TypeDeclaration>>,
    ) {
        for child in self.members_of(container) {
            self.collect_item(child, scope, namespace, out);
        }
    }

    fn collect_item(
        &self,
        node: Node<'_>,
        scope: &Arc<LexicalScope>,
        namespace: &str,
        out: &mut Vec<Arc<TypeDeclaration>>,
    ) {
        match node.kind() {
            "namespace_declaration" => {
                let name = self.name_field(node);
                let Some(body) = node.child_by_field_name("body") else {
                    return;
                };
                let inner = open_namespace(scope, namespace, &name, self.usings_in(body));
                self.collect_types(body, &inner, &qualify(namespace, &name), out);
            }
            kind if type_kind(node, kind).is_some() => {
                if let Some(declaration) = self.type_declaration(node, scope, namespace, "") {
                    out.push(Arc::new(declaration));
                }
            }
            _ => {}
        }
    }

    fn type_declaration(
        &self,
        node: Node<'_>,
        scope: &Arc<LexicalScope>,
        namespace: &str,
        containing_type: &str,
    ) -> Option<TypeDeclaration> {
        let kind = type_kind(node, node.kind())?;
        let identifier = node.child_by_field_name("name")?;
        let name = self.text(identifier).to_string();
        let prefix = if containing_type.is_empty() {
            namespace.to_string()
        } else {
            containing_type.to_string()
        };
        let full_name = qualify(&prefix, &name);

        let mut modifiers = Vec::new();
        let mut attribute_lists = Vec::new();
        let mut keyword_span = None;
        for i in 0..node.child_count() {
            let Some(child) = node.child(i) else { continue };
            match child.kind() {
                "attribute_list" => attribute_lists.push(self.attribute_list(child, scope)),
                "modifier" => modifiers.push(Modifier::new(self.text(child), span(child))),
                "class" | "struct" | "interface" | "record" | "enum" if !child.is_named() => {
                    keyword_span.get_or_insert(span(child));
                }
                _ => {}
            }
        }

        let mut members = Vec::new();
        let mut nested = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            if body.kind() == "declaration_list" {
                let type_scope = LexicalScope::nested(scope, full_name.clone(), Vec::new());
                for member in self.members_of(body) {
                    if type_kind(member, member.kind()).is_some() {
                        if let Some(inner) =
                            self.type_declaration(member, &type_scope, namespace, &full_name)
                        {
                            nested.push(Arc::new(inner));
                        }
                    } else if let Some(declaration) = self.member(member) {
                        members.push(declaration);
                    }
                }
            }
        }

        Some(TypeDeclaration {
            kind,
            name,
            identifier: location(identifier),
            location: location(node),
            span: span(node),
            keyword_span: keyword_span.unwrap_or_else(|| TextSpan::empty(identifier.start_byte())),
            modifiers,
            attribute_lists,
            members,
            nested,
            namespace: namespace.to_string(),
            full_name,
            scope: Arc::clone(scope),
        })
    }

    fn member(&self, node: Node<'_>) -> Option<MemberDeclaration> {
        let kind = match node.kind() {
            "method_declaration" => MemberKind::Method,
            "property_declaration" => MemberKind::Property,
            "indexer_declaration" => MemberKind::Indexer,
            "event_declaration" | "event_field_declaration" => MemberKind::Event,
            "field_declaration" => MemberKind::Field,
            "constructor_declaration" => MemberKind::Constructor,
            "destructor_declaration" | "operator_declaration"
            | "conversion_operator_declaration" => MemberKind::Other,
            _ => return None,
        };

        let modifiers = (0..node.child_count())
            .filter_map(|i| node.child(i))
            .filter(|child| child.kind() == "modifier")
            .map(|child| Modifier::new(self.text(child), span(child)))
            .collect();

        Some(MemberDeclaration {
            kind,
            name: node
                .child_by_field_name("name")
                .map(|name| self.text(name).to_string()),
            modifiers,
            span: span(node),
        })
    }

    fn attribute_list(&self, node: Node<'_>, scope: &Arc<LexicalScope>) -> AttributeList {
        let mut target = None;
        let mut attributes = Vec::new();
        for i in 0..node.named_child_count() {
            let Some(child) = node.named_child(i) else { continue };
            match child.kind() {
                "attribute_target_specifier" => {
                    target = Some(self.text(child).trim_end_matches(':').trim().to_string());
                }
                "attribute" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        attributes.push(AttributeReference::new(
                            strip_whitespace(self.text(name)),
                            span(child),
                            Arc::clone(scope),
                        ));
                    }
                }
                _ => {}
            }
        }

        AttributeList {
            span: span(node),
            target,
            attributes,
        }
    }

    /// Using directives that are direct members of `container`
    fn usings_in(&self, container: Node<'_>) -> Vec<UsingDirective> {
        self.members_of(container)
            .into_iter()
            .filter(|child| child.kind() == "using_directive")
            .map(|child| self.using_directive(child))
            .collect()
    }

    /// Using directives following `marker` among the members of `container`
    fn usings_after(&self, container: Node<'_>, marker: Node<'_>) -> Vec<UsingDirective> {
        self.members_of(container)
            .into_iter()
            .filter(|child| child.start_byte() > marker.start_byte())
            .filter(|child| child.kind() == "using_directive")
            .map(|child| self.using_directive(child))
            .collect()
    }

    /// Whether a preprocessor block holds nothing but directives and comments
    fn only_directives(&self, node: Node<'_>) -> bool {
        self.members_of(node).iter().all(|child| {
            matches!(
                child.kind(),
                "comment" | "extern_alias_directive" | "using_directive"
            ) || child.kind().starts_with("preproc_")
        })
    }

    fn using_directive(&self, node: Node<'_>) -> UsingDirective {
        let mut is_global = false;
        let mut is_static = false;
        let mut has_equals = false;
        let mut alias = None;
        let mut named = Vec::new();

        for i in 0..node.child_count() {
            let Some(child) = node.child(i) else { continue };
            match child.kind() {
                "global" if !child.is_named() => is_global = true,
                "static" if !child.is_named() => is_static = true,
                "=" => has_equals = true,
                "name_equals" => {
                    alias = child
                        .named_child(0)
                        .map(|identifier| self.text(identifier).to_string());
                }
                _ if child.is_named() && child.kind() != "comment" => named.push(child),
                _ => {}
            }
        }

        if alias.is_none() && has_equals && named.len() > 1 {
            alias = Some(self.text(named[0]).to_string());
        }

        UsingDirective {
            path: named
                .last()
                .map(|path| strip_whitespace(self.text(*path)))
                .unwrap_or_default(),
            alias,
            is_static,
            is_global,
            conditional: in_preprocessor_block(node),
            span: span(node),
        }
    }

    /// Named children of a container, with `#if` blocks flattened
    fn members_of<'t>(&self, container: Node<'t>) -> Vec<Node<'t>> {
        let mut out = Vec::new();
        let condition = container.child_by_field_name("condition");
        for i in 0..container.named_child_count() {
            let Some(child) = container.named_child(i) else { continue };
            if Some(child) == condition {
                continue;
            }
            if child.kind().starts_with("preproc_if")
                || child.kind().starts_with("preproc_elif")
                || child.kind().starts_with("preproc_else")
            {
                out.extend(self.members_of(child));
            } else {
                out.push(child);
            }
        }
        out
    }

    fn name_field(&self, node: Node<'_>) -> String {
        node.child_by_field_name("name")
            .map(|name| strip_whitespace(self.text(name)))
            .unwrap_or_default()
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }
}

/// Open one scope per dotted segment of `name`, the innermost carrying `usings`
fn open_namespace(
    parent: &Arc<LexicalScope>,
    enclosing: &str,
    name: &str,
    usings: Vec<UsingDirective>,
) -> Arc<LexicalScope> {
    let segments: Vec<&str> = name.split('.').filter(|s| !s.is_empty()).collect();
    let mut scope = Arc::clone(parent);
    let mut container = enclosing.to_string();
    let mut usings = Some(usings);
    for (i, segment) in segments.iter().enumerate() {
        container = qualify(&container, segment);
        let declared = if i + 1 == segments.len() {
            usings.take().unwrap_or_default()
        } else {
            Vec::new()
        };
        scope = LexicalScope::nested(&scope, container.clone(), declared);
    }
    scope
}

fn type_kind(node: Node<'_>, kind: &str) -> Option<TypeKind> {
    match kind {
        "class_declaration" => Some(TypeKind::Class),
        "struct_declaration" => Some(TypeKind::Struct),
        "interface_declaration" => Some(TypeKind::Interface),
        "enum_declaration" => Some(TypeKind::Enum),
        "record_struct_declaration" => Some(TypeKind::RecordStruct),
        "record_declaration" => {
            let is_struct = (0..node.child_count())
                .filter_map(|i| node.child(i))
                .any(|child| !child.is_named() && child.kind() == "struct");
            Some(if is_struct {
                TypeKind::RecordStruct
            } else {
                TypeKind::Record
            })
        }
        _ => None,
    }
}

fn is_doc_comment(text: &str) -> bool {
    (text.starts_with("///") && !text.starts_with("////"))
        || (text.starts_with("/**") && text != "/**/")
}

/// Whether `node` sits inside an `#if`, `#elif` or `#else` branch
fn in_preprocessor_block(node: Node<'_>) -> bool {
    std::iter::successors(node.parent(), |parent| parent.parent()).any(|ancestor| {
        matches!(
            ancestor.kind(),
            "preproc_if" | "preproc_elif" | "preproc_else"
        )
    })
}

fn span(node: Node<'_>) -> TextSpan {
    TextSpan::new(node.start_byte(), node.end_byte())
}

fn location(node: Node<'_>) -> Location {
    let start = node.start_position();
    Location::new(span(node), start.row as u32 + 1, start.column as u32 + 1)
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
