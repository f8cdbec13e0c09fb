//! Declaration index built from a syntax tree
//!
//! Records every named declaration (functions, variables, fields, types,
//! macros) with its type so identifiers can be classified, hovered and
//! completed without a semantic analyzer.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::model::{CompletionSuggestion, SymbolKind};

/// A declared name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub kind: SymbolKind,
    /// Declared type; the result type for functions
    pub type_name: Option<String>,
    /// Parameter list without the parentheses, for functions and function macros
    pub params: Option<String>,
    /// Enclosing struct, class or namespace
    pub owner: Option<String>,
    /// Byte offset in the primary file; `None` for declarations from includes
    pub offset: Option<usize>,
}

impl Declaration {
    fn new(name: &str, kind: SymbolKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            type_name: None,
            params: None,
            owner: None,
            offset: None,
        }
    }

    /// Type shown on hover: `int`, or `int (char *)` for functions
    pub fn type_info(&self) -> Option<String> {
        match self.kind {
            SymbolKind::Macro | SymbolKind::Namespace | SymbolKind::Label => None,
            SymbolKind::Function => self.type_name.as_ref().map(|result| {
                format!("{} ({})", result, self.params.as_deref().unwrap_or(""))
            }),
            _ => self.type_name.clone(),
        }
    }

    /// Completion entry for this declaration
    pub fn suggestion(&self) -> CompletionSuggestion {
        match self.kind {
            SymbolKind::Function => {
                let params = self.params.as_deref().unwrap_or("");
                CompletionSuggestion::from_parts(
                    &format!("{}({})", self.name, params),
                    self.type_name.as_deref(),
                )
            }
            SymbolKind::Variable | SymbolKind::Field | SymbolKind::Parameter => {
                CompletionSuggestion::from_parts(&self.name, self.type_name.as_deref())
            }
            _ => CompletionSuggestion::from_parts(&self.name, None),
        }
    }

    fn is_member(&self) -> bool {
        matches!(self.kind, SymbolKind::Field)
            || (self.kind == SymbolKind::Function && self.owner.is_some())
    }
}

/// All declarations of a translation unit, by name
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    by_name: HashMap<String, Vec<Declaration>>,
}

impl Declarations {
    /// Index the declarations under `root`.
    ///
    /// `primary` records byte offsets so lookups can prefer the nearest
    /// preceding declaration; included files index without offsets.
    pub fn collect(root: Node<'_>, source: &str, primary: bool) -> Self {
        let mut index = Self::default();
        let mut collector = Collector {
            source,
            primary,
            out: &mut index,
        };
        // Explicit stack: nesting depth follows user input
        let mut stack: Vec<(Node<'_>, Option<String>)> = vec![(root, None)];
        while let Some((node, owner)) = stack.pop() {
            let Descend::Into(child_owner) = collector.visit(node, owner.as_deref()) else {
                continue;
            };
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
            stack.extend(
                children
                    .into_iter()
                    .rev()
                    .map(|child| (child, child_owner.clone())),
            );
        }
        index
    }

    pub fn insert(&mut self, declaration: Declaration) {
        self.by_name
            .entry(declaration.name.clone())
            .or_default()
            .push(declaration);
    }

    pub fn extend(&mut self, other: Declarations) {
        for (name, decls) in other.by_name {
            self.by_name.entry(name).or_default().extend(decls);
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.by_name.values().flatten()
    }

    /// Declaration of `name` visible at byte `offset` of the primary file.
    ///
    /// Picks the last declaration at or before `offset`, counting included
    /// declarations as preceding everything. Falls back to the first one.
    pub fn resolve(&self, name: &str, offset: usize) -> Option<&Declaration> {
        let candidates = self.by_name.get(name)?;
        candidates
            .iter()
            .filter(|d| d.offset.is_none_or(|o| o <= offset))
            .max_by_key(|d| d.offset.map_or(0, |o| o + 1))
            .or_else(|| candidates.first())
    }

    /// Fields and methods, optionally restricted to one owner
    pub fn members<'a>(
        &'a self,
        owner: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Declaration> + 'a {
        self.iter().filter(move |d| {
            d.is_member() && owner.is_none_or(|owner| d.owner.as_deref() == Some(owner))
        })
    }

    /// True if something owns members under `name`
    pub fn has_members(&self, name: &str) -> bool {
        self.iter().any(|d| d.owner.as_deref() == Some(name))
    }
}

struct Collector<'s, 'o> {
    source: &'s str,
    primary: bool,
    out: &'o mut Declarations,
}

/// What to do with a node's children after visiting it
enum Descend {
    Skip,
    Into(Option<String>),
}

impl Collector<'_, '_> {
    fn visit(&mut self, node: Node<'_>, owner: Option<&str>) -> Descend {
        match node.kind() {
            "function_definition" | "declaration" | "field_declaration" => {
                self.typed_declaration(node, owner, SymbolKind::Variable);
            }
            "parameter_declaration" | "optional_parameter_declaration" => {
                self.typed_declaration(node, None, SymbolKind::Parameter);
                return Descend::Skip;
            }
            "type_definition" => {
                self.typed_declaration(node, owner, SymbolKind::Type);
                // `typedef struct { ... } Alias;` owns its fields under the alias
                if let Some(alias) = anonymous_aggregate_alias(node, self.source) {
                    return Descend::Into(Some(alias));
                }
            }
            kind if is_aggregate(kind) => {
                if let Some(name) = self.aggregate(node, owner) {
                    return Descend::Into(Some(name));
                }
            }
            "namespace_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = text(name_node, self.source).to_string();
                    self.push(name_node, Declaration::new(&name, SymbolKind::Namespace));
                    return Descend::Into(Some(name));
                }
            }
            "enumerator" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let mut decl = Declaration::new(text(name_node, self.source), SymbolKind::Variable);
                    decl.type_name = owner.map(|o| format!("enum {o}"));
                    self.push(name_node, decl);
                }
                return Descend::Skip;
            }
            "preproc_def" | "preproc_function_def" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let mut decl = Declaration::new(text(name_node, self.source), SymbolKind::Macro);
                    decl.params = node
                        .child_by_field_name("parameters")
                        .map(|p| strip_parens(text(p, self.source)));
                    self.push(name_node, decl);
                }
            }
            "labeled_statement" => {
                if let Some(label) = node.child_by_field_name("label") {
                    self.push(label, Declaration::new(text(label, self.source), SymbolKind::Label));
                }
            }
            _ => {}
        }
        Descend::Into(owner.map(str::to_string))
    }

    /// Struct, union, class or enum with a body
    fn aggregate(&mut self, node: Node<'_>, owner: Option<&str>) -> Option<String> {
        let name_node = node.child_by_field_name("name")?;
        node.child_by_field_name("body")?;

        let name = text(name_node, self.source).to_string();
        let keyword = node.kind().trim_end_matches("_specifier");
        let mut decl = Declaration::new(&name, SymbolKind::Type);
        decl.type_name = Some(format!("{keyword} {name}"));
        decl.owner = owner.map(str::to_string);
        self.push(name_node, decl);
        Some(name)
    }

    /// Declarations of the form `<type> <declarator>, <declarator>...`
    fn typed_declaration(&mut self, node: Node<'_>, owner: Option<&str>, default_kind: SymbolKind) {
        let base = base_type(node, self.source);
        let mut cursor = node.walk();
        let declarators: Vec<Node<'_>> = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();

        for declarator in declarators {
            let Some(shape) = unwrap_declarator(declarator, self.source) else {
                continue;
            };

            let is_function = shape.params.is_some() && default_kind != SymbolKind::Parameter;
            let kind = if is_function {
                SymbolKind::Function
            } else if node.kind() == "field_declaration" {
                SymbolKind::Field
            } else {
                default_kind
            };

            let mut decl = Declaration::new(text(shape.name, self.source), kind);
            decl.type_name = base.as_deref().map(|base| join_type(base, &shape.suffix));
            decl.params = if is_function { shape.params } else { None };
            decl.owner = shape.scope.or_else(|| owner.map(str::to_string));
            self.push(shape.name, decl);
        }
    }

    fn push(&mut self, name_node: Node<'_>, mut decl: Declaration) {
        if decl.name.is_empty() {
            return;
        }
        if self.primary {
            decl.offset = Some(name_node.start_byte());
        }
        self.out.insert(decl);
    }
}

/// The parts of a declarator that matter for indexing
struct DeclaratorShape<'tree> {
    name: Node<'tree>,
    /// Pointer, reference and array decorations, e.g. `*` or `[4]`
    suffix: String,
    /// Parameter list text when the declarator declares a function
    params: Option<String>,
    /// Qualifier of an out-of-line definition (`Foo` in `Foo::bar`)
    scope: Option<String>,
}

fn unwrap_declarator<'tree>(mut node: Node<'tree>, source: &str) -> Option<DeclaratorShape<'tree>> {
    let mut suffix = String::new();
    let mut params = None;
    let mut scope = None;

    loop {
        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
            | "operator_name" => break,
            "qualified_identifier" => {
                scope = node
                    .child_by_field_name("scope")
                    .map(|s| text(s, source).to_string());
                node = node.child_by_field_name("name")?;
            }
            "pointer_declarator" => {
                suffix.push('*');
                node = node.child_by_field_name("declarator")?;
            }
            "reference_declarator" => {
                suffix.push('&');
                node = last_named_child(node)?;
            }
            "array_declarator" => {
                let size = node
                    .child_by_field_name("size")
                    .map(|s| text(s, source))
                    .unwrap_or("");
                suffix.push_str(&format!("[{size}]"));
                node = node.child_by_field_name("declarator")?;
            }
            "function_declarator" => {
                if params.is_none() {
                    params = node
                        .child_by_field_name("parameters")
                        .map(|p| strip_parens(text(p, source)));
                }
                node = node.child_by_field_name("declarator")?;
            }
            "init_declarator" => node = node.child_by_field_name("declarator")?,
            "parenthesized_declarator" => node = first_named_child(node)?,
            _ => return None,
        }
    }

    Some(DeclaratorShape {
        name: node,
        suffix,
        params,
        scope,
    })
}

fn first_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let child = node.named_children(&mut cursor).next();
    child
}

fn last_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let child = node.named_children(&mut cursor).last();
    child
}

fn is_aggregate(kind: &str) -> bool {
    matches!(
        kind,
        "struct_specifier" | "union_specifier" | "class_specifier" | "enum_specifier"
    )
}

fn anonymous_aggregate_alias(node: Node<'_>, source: &str) -> Option<String> {
    let type_node = node.child_by_field_name("type")?;
    if !is_aggregate(type_node.kind()) || type_node.child_by_field_name("name").is_some() {
        return None;
    }
    let alias = node.child_by_field_name("declarator")?;
    (alias.kind() == "type_identifier").then(|| text(alias, source).to_string())
}

/// Type specifier text with its qualifiers, whitespace collapsed
fn base_type(node: Node<'_>, source: &str) -> Option<String> {
    let type_node = node.child_by_field_name("type")?;
    let mut parts: Vec<String> = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "type_qualifier" && child.start_byte() < type_node.start_byte() {
            parts.push(text(child, source).to_string());
        }
    }
    let type_text = if is_aggregate(type_node.kind()) {
        let keyword = type_node.kind().trim_end_matches("_specifier");
        match type_node.child_by_field_name("name") {
            Some(name) => format!("{keyword} {}", text(name, source)),
            None => keyword.to_string(),
        }
    } else {
        collapse_whitespace(text(type_node, source))
    };
    parts.push(type_text);
    Some(parts.join(" "))
}

fn join_type(base: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        base.to_string()
    } else {
        format!("{base} {suffix}")
    }
}

fn strip_parens(params: &str) -> String {
    let inner = params
        .trim()
        .strip_prefix('(')
        .and_then(|p| p.strip_suffix(')'))
        .unwrap_or(params);
    collapse_whitespace(inner)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Source text of a node
pub(crate) fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::LanguageId;
    use tree_sitter::Parser;

    fn index(language: LanguageId, source: &str) -> Declarations {
        let mut parser = Parser::new();
        parser.set_language(&language.grammar()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        Declarations::collect(tree.root_node(), source, true)
    }

    #[test]
    fn test_function_and_variables() {
        let decls = index(
            LanguageId::C,
            "int add(int a, int b) { return a + b; }\nchar *name, buf[4];\n",
        );

        let add = decls.resolve("add", 100).unwrap();
        assert_eq!(add.kind, SymbolKind::Function);
        assert_eq!(add.type_info().as_deref(), Some("int (int a, int b)"));
        assert_eq!(add.suggestion().display_text, "add(int a, int b) --> int");

        let a = decls.resolve("a", 100).unwrap();
        assert_eq!(a.kind, SymbolKind::Parameter);
        assert_eq!(a.type_name.as_deref(), Some("int"));

        assert_eq!(
            decls.resolve("name", 100).unwrap().type_name.as_deref(),
            Some("char *")
        );
        assert_eq!(
            decls.resolve("buf", 100).unwrap().type_name.as_deref(),
            Some("char [4]")
        );
    }

    #[test]
    fn test_struct_members_have_owner() {
        let decls = index(
            LanguageId::C,
            "struct point { int x; int y; };\ntypedef unsigned long size;\n#define MAX 10\n",
        );

        let point = decls.resolve("point", 0).unwrap();
        assert_eq!(point.kind, SymbolKind::Type);
        assert_eq!(point.type_name.as_deref(), Some("struct point"));

        let x = decls.resolve("x", 0).unwrap();
        assert_eq!(x.kind, SymbolKind::Field);
        assert_eq!(x.owner.as_deref(), Some("point"));
        assert_eq!(decls.members(Some("point")).count(), 2);
        assert!(decls.has_members("point"));

        assert_eq!(decls.resolve("size", 0).unwrap().kind, SymbolKind::Type);
        assert_eq!(
            decls.resolve("size", 0).unwrap().type_name.as_deref(),
            Some("unsigned long")
        );
        assert_eq!(decls.resolve("MAX", 0).unwrap().kind, SymbolKind::Macro);
    }

    #[test]
    fn test_class_methods_are_members() {
        let decls = index(
            LanguageId::Cpp,
            "namespace geo {\nclass Shape {\npublic:\n  double area() const;\n  int sides;\n};\n}\n",
        );

        let area = decls.resolve("area", 0).unwrap();
        assert_eq!(area.kind, SymbolKind::Function);
        assert_eq!(area.owner.as_deref(), Some("Shape"));
        assert_eq!(decls.resolve("Shape", 0).unwrap().owner.as_deref(), Some("geo"));
        assert_eq!(decls.resolve("geo", 0).unwrap().kind, SymbolKind::Namespace);

        let mut members: Vec<&str> = decls.members(Some("Shape")).map(|d| d.name.as_str()).collect();
        members.sort();
        assert_eq!(members, vec!["area", "sides"]);
    }

    #[test]
    fn test_anonymous_typedef_owns_fields() {
        let decls = index(
            LanguageId::C,
            "typedef struct { float re; float im; } complex;\ncomplex z;\n",
        );
        assert_eq!(decls.members(Some("complex")).count(), 2);
        assert_eq!(
            decls.resolve("z", 100).unwrap().type_name.as_deref(),
            Some("complex")
        );
        assert_eq!(
            decls.resolve("complex", 0).unwrap().type_name.as_deref(),
            Some("struct")
        );
    }

    #[test]
    fn test_resolve_prefers_nearest_preceding() {
        let source = "void f() { int v; }\nvoid g() { double v; }\n";
        let decls = index(LanguageId::C, source);
        let second_fn = source.find("void g").unwrap();

        assert_eq!(decls.resolve("v", 0).unwrap().type_name.as_deref(), Some("int"));
        assert_eq!(
            decls.resolve("v", source.len()).unwrap().type_name.as_deref(),
            Some("double")
        );
        assert_eq!(
            decls.resolve("v", second_fn).unwrap().type_name.as_deref(),
            Some("int")
        );
    }

    #[test]
    fn test_deeply_nested_expression_is_indexed() {
        let depth = 20_000;
        let source = format!("int x = {}1{};\nint y;\n", "(".repeat(depth), ")".repeat(depth));
        let decls = index(LanguageId::C, &source);
        assert_eq!(decls.resolve("x", 0).unwrap().type_name.as_deref(), Some("int"));
        assert!(decls.resolve("y", source.len()).is_some());
    }
}
