//! Best-effort function naming from syntactic context.
//!
//! A callable's name is whatever a reader would call it: the declaration
//! identifier, the variable it is assigned to, the property key it sits
//! under, and so on. The context is classified once into a tagged variant
//! and resolved in a single place, so the priority order is enumerable and
//! testable instead of being spread across call sites.

use tree_sitter::Node;

/// The synthetic name for a default-exported callable with no identifier.
pub const DEFAULT_EXPORT_NAME: &str = "default";
/// The fallback when no context yields a name.
pub const ANONYMOUS_NAME: &str = "anonymous";
/// The fallback for a class member whose key is not a plain name.
pub const METHOD_FALLBACK_NAME: &str = "method";

/// The syntactic context a callable was found in, in resolution priority
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingContext {
    /// `function myFunc() {}`
    Declaration(String),
    /// `const myFunc = () => {}`
    Variable(String),
    /// `{ myFunc: () => {} }` or a class field initializer
    Property(String),
    /// A class method, constructor, getter or setter.
    ClassMember {
        class: Option<String>,
        member: String,
    },
    /// `myFunc = () => {}`
    Assignment(String),
    /// `export default function () {}`
    DefaultExport,
    Anonymous,
}

impl NamingContext {
    pub fn resolve(&self) -> String {
        match self {
            NamingContext::Declaration(name)
            | NamingContext::Variable(name)
            | NamingContext::Property(name)
            | NamingContext::Assignment(name) => name.clone(),
            NamingContext::ClassMember { class, member } => match class {
                Some(class) => format!("{class}.{member}"),
                None => member.clone(),
            },
            NamingContext::DefaultExport => DEFAULT_EXPORT_NAME.to_string(),
            NamingContext::Anonymous => ANONYMOUS_NAME.to_string(),
        }
    }
}

/// Classify the context of a callable node.
pub fn naming_context(node: Node, source: &str) -> NamingContext {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                return NamingContext::Declaration(node_text(name, source));
            }
            if node.parent().is_some_and(is_default_export) {
                return NamingContext::DefaultExport;
            }
            NamingContext::Anonymous
        }
        "method_definition" => {
            let member = node
                .child_by_field_name("name")
                .and_then(|key| key_name(key, source))
                .unwrap_or_else(|| METHOD_FALLBACK_NAME.to_string());
            NamingContext::ClassMember {
                class: enclosing_class_name(node, source),
                member,
            }
        }
        _ => expression_context(node, source),
    }
}

/// Context for function expressions and arrow functions: the parent node
/// decides the name.
fn expression_context(node: Node, source: &str) -> NamingContext {
    let Some(parent) = node.parent() else {
        return NamingContext::Anonymous;
    };

    match parent.kind() {
        "variable_declarator" => parent
            .child_by_field_name("name")
            .filter(|name| name.kind() == "identifier")
            .map(|name| NamingContext::Variable(node_text(name, source)))
            .unwrap_or(NamingContext::Anonymous),
        "pair" => parent
            .child_by_field_name("key")
            .and_then(|key| key_name(key, source))
            .map(NamingContext::Property)
            .unwrap_or(NamingContext::Anonymous),
        // The JS grammar calls the key "property", the TS grammar "name".
        "field_definition" | "public_field_definition" => parent
            .child_by_field_name("property")
            .or_else(|| parent.child_by_field_name("name"))
            .and_then(|key| key_name(key, source))
            .map(NamingContext::Property)
            .unwrap_or(NamingContext::Anonymous),
        "assignment_expression" => parent
            .child_by_field_name("left")
            .filter(|left| left.kind() == "identifier")
            .map(|left| NamingContext::Assignment(node_text(left, source)))
            .unwrap_or(NamingContext::Anonymous),
        "export_statement" if is_default_export(parent) => NamingContext::DefaultExport,
        _ => NamingContext::Anonymous,
    }
}

/// A property key yields a name when it is a plain identifier or a string
/// literal; computed and numeric keys do not.
fn key_name(key: Node, source: &str) -> Option<String> {
    match key.kind() {
        "property_identifier" | "private_property_identifier" | "identifier" => {
            Some(node_text(key, source))
        }
        "string" => Some(string_literal_value(key, source)),
        _ => None,
    }
}

fn is_default_export(node: Node) -> bool {
    if node.kind() != "export_statement" {
        return false;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|child| child.kind() == "default")
}

/// The nearest enclosing class's name: the declaration identifier, a class
/// expression's own name, or the variable a class expression is bound to.
fn enclosing_class_name(node: Node, source: &str) -> Option<String> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        match ancestor.kind() {
            "class_declaration" => {
                return ancestor
                    .child_by_field_name("name")
                    .map(|name| node_text(name, source));
            }
            "class" => {
                if let Some(name) = ancestor.child_by_field_name("name") {
                    return Some(node_text(name, source));
                }
                return ancestor
                    .parent()
                    .filter(|parent| parent.kind() == "variable_declarator")
                    .and_then(|parent| parent.child_by_field_name("name"))
                    .filter(|name| name.kind() == "identifier")
                    .map(|name| node_text(name, source));
            }
            _ => current = ancestor.parent(),
        }
    }
    None
}

pub(crate) fn node_text(node: Node, source: &str) -> String {
    node.utf8_text(source.as_bytes()).unwrap_or_default().to_string()
}

/// The inner value of a string literal node, without its quotes.
pub(crate) fn string_literal_value(node: Node, source: &str) -> String {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "string_fragment" {
            return node_text(child, source);
        }
    }
    String::new()
}
