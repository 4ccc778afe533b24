//! Project-wide table of declared types
//!
//! Binds attribute names the way C# does for the cases the rule can meet:
//! enclosing namespaces and types first, then aliases, then imported namespaces,
//! innermost scope outward. Two distinct candidates at one level are ambiguous.
//! `global using` directives from any indexed document join every file's outermost scope.

use crate::domain::marker::ATTRIBUTE_SUFFIX;
use crate::domain::violations::{GuardianError, GuardianResult};
use crate::semantic::{NamespaceSymbol, ResolvedType, SemanticModel, TypeSymbol};
use crate::syntax::{
    qualify, AttributeReference, LexicalScope, SourceDocument, TypeDeclaration, UsingDirective,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Declared types keyed by full dotted name
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    types: HashMap<String, TypeSymbol>,
    namespaces: HashMap<String, Arc<NamespaceSymbol>>,
    /// Project-wide `global using` directives
    global_usings: Vec<UsingDirective>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every type declared in `documents`, plus `references` from outside the project
    pub fn from_documents<'a>(
        documents: impl IntoIterator<Item = &'a SourceDocument>,
        references: &[String],
    ) -> GuardianResult<Self> {
        let mut index = Self::new();
        for reference in references {
            index.add_reference(reference)?;
        }
        for document in documents {
            index.add_document(document);
        }
        tracing::debug!("Indexed {} declared types", index.len());
        Ok(index)
    }

    /// Register a type known only by its full name, such as one from a referenced assembly
    pub fn add_reference(&mut self, full_name: &str) -> GuardianResult<()> {
        let (namespace, name) = match full_name.rsplit_once('.') {
            Some((namespace, name)) => (namespace, name),
            None => ("", full_name),
        };
        if name.is_empty() || full_name.split('.').any(str::is_empty) {
            return Err(GuardianError::validation(format!(
                "Invalid type reference '{full_name}'"
            )));
        }

        let symbol = TypeSymbol::new(name, full_name, self.namespace(namespace));
        self.types.insert(full_name.to_string(), symbol);
        Ok(())
    }

    /// Register every type declared in a parsed document, nested types included,
    /// along with its `global using` directives
    pub fn add_document(&mut self, document: &SourceDocument) {
        for declaration in document.root.all_types() {
            self.add_declaration(&declaration);
        }
        self.global_usings.extend(
            document
                .root
                .usings
                .iter()
                .filter(|using| using.is_global)
                .cloned(),
        );
    }

    pub fn add_declaration(&mut self, declaration: &TypeDeclaration) {
        let namespace = self.namespace(&declaration.namespace);
        self.types.insert(
            declaration.full_name.clone(),
            TypeSymbol::new(
                declaration.name.clone(),
                declaration.full_name.clone(),
                namespace,
            ),
        );
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Look up a type by its exact full name
    pub fn lookup(&self, full_name: &str) -> Option<&TypeSymbol> {
        self.types.get(full_name)
    }

    /// Shared namespace chain for a dotted path
    fn namespace(&mut self, path: &str) -> Arc<NamespaceSymbol> {
        if let Some(existing) = self.namespaces.get(path) {
            return Arc::clone(existing);
        }
        let symbol = match path.rsplit_once('.') {
            Some((outer, name)) => Arc::new(NamespaceSymbol {
                name: name.to_string(),
                containing: Some(self.namespace(outer)),
            }),
            None if path.is_empty() => NamespaceSymbol::global(),
            None => Arc::new(NamespaceSymbol {
                name: path.to_string(),
                containing: Some(self.namespace("")),
            }),
        };
        self.namespaces.insert(path.to_string(), Arc::clone(&symbol));
        symbol
    }

    /// Types named `name` or `name` + `Attribute` under `prefix`
    fn attribute_candidates<'s>(&'s self, prefix: &str, name: &str, out: &mut Vec<&'s TypeSymbol>) {
        let direct = qualify(prefix, name);
        let suffixed = format!("{direct}{ATTRIBUTE_SUFFIX}");
        out.extend(self.lookup(&direct));
        out.extend(self.lookup(&suffixed));
    }

    /// Usings in effect at one scope level; the outermost level also sees global usings
    fn usings_at<'s>(&'s self, level: &'s LexicalScope) -> impl Iterator<Item = &'s UsingDirective> {
        let globals: &[UsingDirective] = if level.parent.is_none() {
            self.global_usings.as_slice()
        } else {
            &[]
        };
        level.usings.iter().chain(globals)
    }

    fn resolve_in_scopes(&self, name: &str, scope: &LexicalScope) -> ResolvedType {
        let first_segment = name.split('.').next().unwrap_or(name);
        let is_simple = !name.contains('.');

        for level in scope.ancestors() {
            let mut found = Vec::new();
            self.attribute_candidates(&level.container, name, &mut found);
            if !found.is_empty() {
                return unique(found);
            }

            // An alias hides same-named types from imported namespaces at its level.
            for using in self.usings_at(level) {
                if using.alias.as_deref() != Some(first_segment) {
                    continue;
                }
                let rest = name[first_segment.len()..].trim_start_matches('.');
                if rest.is_empty() {
                    // alias naming a type directly
                    self.attribute_candidates("", &using.path, &mut found);
                } else {
                    self.attribute_candidates(&using.path, rest, &mut found);
                }
            }
            if !found.is_empty() {
                return unique(found);
            }

            if is_simple {
                for using in self.usings_at(level) {
                    if using.alias.is_none() && !using.is_static {
                        self.attribute_candidates(&using.path, name, &mut found);
                    }
                }
                if !found.is_empty() {
                    return unique(found);
                }
            }
        }

        ResolvedType::Error
    }

    fn resolve_alias_qualified(&self, alias: &str, name: &str, scope: &LexicalScope) -> ResolvedType {
        let target = scope
            .ancestors()
            .flat_map(|level| self.usings_at(level))
            .find(|using| using.alias.as_deref() == Some(alias));

        match target {
            Some(using) => {
                let mut found = Vec::new();
                self.attribute_candidates(&using.path, name, &mut found);
                unique(found)
            }
            None => ResolvedType::Error,
        }
    }
}

/// Single distinct symbol, or an error when none or several were found
fn unique(found: Vec<&TypeSymbol>) -> ResolvedType {
    let distinct: BTreeSet<&str> = found.iter().map(|s| s.full_name.as_str()).collect();
    match (distinct.len(), found.first()) {
        (1, Some(symbol)) => ResolvedType::Type((*symbol).clone()),
        (n, _) => {
            if n > 1 {
                tracing::trace!("Ambiguous attribute reference: {:?}", distinct);
            }
            ResolvedType::Error
        }
    }
}

impl SemanticModel for TypeIndex {
    fn resolve_type(&self, attribute: &AttributeReference) -> ResolvedType {
        match attribute.name.split_once("::") {
            Some(("global", rest)) => {
                let mut found = Vec::new();
                self.attribute_candidates("", rest, &mut found);
                unique(found)
            }
            Some((alias, rest)) => self.resolve_alias_qualified(alias, rest, &attribute.scope),
            None => self.resolve_in_scopes(&attribute.name, &attribute.scope),
        }
    }
}
