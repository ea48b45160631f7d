//! Stable-identity path construction.
//!
//! Every node and attribute can be reduced to an absolute, human-readable
//! path expression that locates the equivalent node in a structurally
//! similar tree. Two nodes compared across trees are "the same" exactly
//! when their computed paths are textually identical, so paths are always
//! recomputed from the tree at hand and never cached across instances.
//!
//! A segment prefers an identifier attribute (`Tag[@id='v']`); failing
//! that, a 1-based ordinal among same-named siblings (`Tag[2]`), omitted
//! when the tag name is unique among its siblings.

use crate::node::{NodeRef, XmlElement};

/// Ordered list of attribute names that confer stable identity on an
/// element.
///
/// The first name present on an element wins. The default list is
/// `name`, `id`, `key`; callers with other conventions supply their own.
#[derive(Debug, Clone)]
pub struct IdentifierSet {
    names: Vec<String>,
}

impl Default for IdentifierSet {
    fn default() -> Self {
        IdentifierSet::new(["name", "id", "key"])
    }
}

impl IdentifierSet {
    /// Creates an identifier set from an ordered list of attribute names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IdentifierSet {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `name` is one of the identifier attribute names.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Returns the first identifier attribute present on an element, in
    /// priority order, as a `(name, value)` pair.
    pub fn first_present<'a>(&'a self, element: &'a XmlElement) -> Option<(&'a str, &'a str)> {
        self.names
            .iter()
            .find_map(|n| element.attribute(n).map(|v| (n.as_str(), v)))
    }

    /// Returns the identifier attribute names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Computes the path expression of an element node.
///
/// Identifier-attribute values are embedded verbatim; values containing
/// `'`, `[` or `]` produce malformed paths, which is the caller's
/// responsibility to avoid.
pub fn path_of(node: &NodeRef, identifiers: &IdentifierSet) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current = node.clone();

    loop {
        if current.borrow().is_document() {
            break;
        }
        segments.push(segment_of(&current, identifiers));
        let parent = current.borrow().parent().upgrade();
        match parent {
            Some(p) => current = p,
            None => break,
        }
    }

    let mut path = String::new();
    for segment in segments.iter().rev() {
        path.push('/');
        path.push_str(segment);
    }
    path
}

/// Computes the path expression of an attribute: the owner element's path
/// followed by `/@name`.
pub fn attr_path_of(owner: &NodeRef, attr_name: &str, identifiers: &IdentifierSet) -> String {
    format!("{}/@{}", path_of(owner, identifiers), attr_name)
}

/// Computes one path segment for an element node.
fn segment_of(node: &NodeRef, identifiers: &IdentifierSet) -> String {
    let borrowed = node.borrow();
    let element = match borrowed.as_element() {
        Some(e) => e,
        // Text and comment nodes never appear in generated paths
        None => return String::new(),
    };
    let name = element.qname();

    if let Some((id_name, id_value)) = identifiers.first_present(element) {
        return format!("{}[@{}='{}']", name, id_name, id_value);
    }

    match sibling_ordinal(node, name) {
        Some(ordinal) => format!("{}[{}]", name, ordinal),
        None => name.to_string(),
    }
}

/// Returns the 1-based ordinal of a node among same-named element siblings,
/// or `None` when the tag name is unique among its siblings.
fn sibling_ordinal(node: &NodeRef, name: &str) -> Option<usize> {
    let parent = node.borrow().parent().upgrade()?;
    let parent_borrowed = parent.borrow();

    let same_named = parent_borrowed
        .children()
        .iter()
        .filter(|sibling| sibling.borrow().qname() == Some(name))
        .count();
    if same_named <= 1 {
        return None;
    }

    let id = node.borrow().id();
    let mut ordinal = 0;
    for sibling in parent_borrowed.children() {
        if sibling.borrow().qname() != Some(name) {
            continue;
        }
        ordinal += 1;
        if sibling.borrow().id() == id {
            break;
        }
    }
    Some(ordinal)
}

/// Finds an element in a tree by walking a recursive predicate. Used by
/// hook callbacks and tests; the engines themselves resolve by path.
pub fn find_elements_by_name(root: &NodeRef, name: &str) -> Vec<NodeRef> {
    let mut found = Vec::new();
    collect_by_name(root, name, &mut found);
    found
}

fn collect_by_name(node: &NodeRef, name: &str, found: &mut Vec<NodeRef>) {
    let children: Vec<NodeRef> = {
        let borrowed = node.borrow();
        if borrowed.qname() == Some(name) {
            found.push(node.clone());
        }
        borrowed.children().to_vec()
    };
    for child in children {
        collect_by_name(&child, name, found);
    }
}
