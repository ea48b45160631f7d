//! Namespace handling.
//!
//! Path resolution cannot locate namespace-qualified names unless every
//! prefix used in the document has been registered first. The binder here
//! walks a tree once and collects all `xmlns` declarations into a flat
//! [`NamespaceBindings`] map, registering each element's declarations before
//! descending into its children so that descendants always see their
//! ancestors' prefixes.

use rustc_hash::FxHashMap;

use super::{NodeRef, XmlContent};

/// Checks if an attribute name is a namespace declaration.
pub fn is_xmlns_attr(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

/// Returns the prefix declared by a namespace-declaration attribute.
///
/// `xmlns:foo` declares the prefix `foo`; bare `xmlns` declares the default
/// namespace, represented as the empty prefix.
pub fn declared_prefix(attr_name: &str) -> &str {
    attr_name.strip_prefix("xmlns:").unwrap_or("")
}

/// Splits a qualified name into prefix and local name.
///
/// Returns (Some(prefix), local) for "prefix:local"
/// Returns (None, name) for "name" without prefix
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some(pos) = qname.find(':') {
        (Some(&qname[..pos]), &qname[pos + 1..])
    } else {
        (None, qname)
    }
}

/// Prefix-to-URI bindings collected from one tree.
#[derive(Debug, Clone, Default)]
pub struct NamespaceBindings {
    bindings: FxHashMap<String, String>,
}

impl NamespaceBindings {
    /// Creates an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a prefix to a URI. A later declaration of the same prefix wins.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        self.bindings.insert(prefix.to_string(), uri.to_string());
    }

    /// Resolves a prefix to its URI.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Registers every namespace declaration carried by an element.
    pub fn bind_from(&mut self, element: &super::XmlElement) {
        for name in element.sorted_attr_names() {
            if is_xmlns_attr(&name) {
                if let Some(uri) = element.attribute(&name) {
                    self.bind(declared_prefix(&name), uri);
                }
            }
        }
    }

    /// Returns the number of registered prefixes.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if no prefixes are registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Walks a tree and registers every namespace declaration it carries.
///
/// Declarations on an element are registered before its children are
/// visited, so a prefix is always known by the time anything beneath its
/// declaration site could need it.
pub fn bind_namespaces(root: &NodeRef) -> NamespaceBindings {
    let mut bindings = NamespaceBindings::new();
    bind_recursive(root, &mut bindings);
    bindings
}

fn bind_recursive(node: &NodeRef, bindings: &mut NamespaceBindings) {
    let children: Vec<NodeRef> = {
        let borrowed = node.borrow();
        if let Some(XmlContent::Element(e)) = borrowed.content() {
            bindings.bind_from(e);
        }
        borrowed.children().to_vec()
    };
    for child in children {
        bind_recursive(&child, bindings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_str;

    #[test]
    fn test_is_xmlns_attr() {
        assert!(is_xmlns_attr("xmlns"));
        assert!(is_xmlns_attr("xmlns:svg"));
        assert!(!is_xmlns_attr("xmlnsish"));
        assert!(!is_xmlns_attr("id"));
    }

    #[test]
    fn test_declared_prefix() {
        assert_eq!(declared_prefix("xmlns:svg"), "svg");
        assert_eq!(declared_prefix("xmlns"), "");
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("svg:rect"), (Some("svg"), "rect"));
        assert_eq!(split_qname("rect"), (None, "rect"));
    }

    #[test]
    fn test_bind_namespaces_walks_whole_tree() {
        let xml = r#"<root xmlns:a="http://example.com/a">
            <child xmlns:b="http://example.com/b" xmlns="http://example.com/def"/>
        </root>"#;
        let tree = parse_str(xml).unwrap();
        let ns = bind_namespaces(&tree);

        assert_eq!(ns.resolve("a"), Some("http://example.com/a"));
        assert_eq!(ns.resolve("b"), Some("http://example.com/b"));
        assert_eq!(ns.resolve(""), Some("http://example.com/def"));
        assert_eq!(ns.resolve("c"), None);
    }
}
