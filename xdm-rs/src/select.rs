//! Restricted path evaluation.
//!
//! Resolves the path expressions the path builder emits — child steps with
//! an optional ordinal or single `[@attr='value']` predicate, plus a
//! trailing attribute step — against a tree. Selection never mutates; the
//! patch engine's resolve-or-create machinery builds on top of it.
//!
//! A malformed or unsupported expression simply fails to resolve (`None`):
//! during Remove/Change application an unresolved path means the target has
//! already diverged, which is not an error.

use crate::node::{
    is_xmlns_attr, split_qname, NamespaceBindings, NodeInner, NodeRef, XmlContent,
};

/// The result of resolving a path: an element node, or an attribute
/// addressed as `(owner, name)`.
#[derive(Debug, Clone)]
pub enum Selected {
    /// An element node.
    Element(NodeRef),
    /// An attribute of an element.
    Attribute {
        /// The element owning the attribute.
        owner: NodeRef,
        /// The qualified attribute name.
        name: String,
    },
}

impl Selected {
    /// Returns the selected node's value.
    pub fn value(&self) -> Option<String> {
        match self {
            Selected::Element(node) => node.borrow().value(),
            Selected::Attribute { owner, name } => owner
                .borrow()
                .as_element()
                .and_then(|e| e.attribute(name))
                .map(str::to_string),
        }
    }

    /// Sets the selected node's value.
    pub fn set_value(&self, value: &str) {
        match self {
            Selected::Element(node) => NodeInner::set_value_of_ref(node, value),
            Selected::Attribute { owner, name } => {
                if let Some(e) = owner.borrow_mut().as_element_mut() {
                    e.set_attribute(name.clone(), value);
                }
            }
        }
    }

    /// Returns the element node, if this selects an element.
    pub fn as_element(&self) -> Option<&NodeRef> {
        match self {
            Selected::Element(node) => Some(node),
            Selected::Attribute { .. } => None,
        }
    }
}

/// One parsed step of a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Child {
        name: String,
        /// 1-based position among same-named siblings.
        ordinal: Option<usize>,
        /// `[@attr='value']` identity predicate.
        key: Option<(String, String)>,
    },
    Attribute(String),
}

/// Resolves a path expression against a context node.
///
/// A leading `/` rebases the context to the document root. The first match
/// in document order wins. Namespace-qualified names resolve only when
/// their prefix is bound in `ns`; namespace-declaration attributes are
/// never selectable.
pub fn select(context: &NodeRef, path: &str, ns: &NamespaceBindings) -> Option<Selected> {
    let trimmed = path.trim();
    let start = if trimmed.starts_with('/') {
        NodeInner::document_of_ref(context)
    } else {
        context.clone()
    };

    let steps = parse_steps(trimmed, ns)?;
    if steps.is_empty() {
        return Some(Selected::Element(start));
    }

    let mut current = start;
    let last = steps.len() - 1;
    for (i, step) in steps.iter().enumerate() {
        match step {
            Step::Attribute(name) => {
                if i != last {
                    return None;
                }
                let present = current
                    .borrow()
                    .as_element()
                    .map(|e| e.attribute(name).is_some())
                    .unwrap_or(false);
                if !present {
                    return None;
                }
                return Some(Selected::Attribute {
                    owner: current,
                    name: name.clone(),
                });
            }
            Step::Child { name, ordinal, key } => {
                current = match_child(&current, name, *ordinal, key.as_ref())?;
            }
        }
    }
    Some(Selected::Element(current))
}

/// Finds the matching element child for one child step.
fn match_child(
    node: &NodeRef,
    name: &str,
    ordinal: Option<usize>,
    key: Option<&(String, String)>,
) -> Option<NodeRef> {
    let borrowed = node.borrow();
    let mut seen = 0usize;
    for child in borrowed.children() {
        let child_borrowed = child.borrow();
        let element = match child_borrowed.content() {
            Some(XmlContent::Element(e)) if e.qname() == name => e,
            _ => continue,
        };
        if let Some((attr, value)) = key {
            if element.attribute(attr) == Some(value.as_str()) {
                return Some(child.clone());
            }
            continue;
        }
        seen += 1;
        if seen == ordinal.unwrap_or(1) {
            return Some(child.clone());
        }
    }
    None
}

/// Parses a path into steps. Returns `None` for anything outside the
/// restricted grammar, which callers treat as a resolution miss.
fn parse_steps(path: &str, ns: &NamespaceBindings) -> Option<Vec<Step>> {
    let mut steps = Vec::new();
    for raw in split_top_level(path)? {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        steps.push(parse_step(raw, ns)?);
    }
    Some(steps)
}

fn parse_step(raw: &str, ns: &NamespaceBindings) -> Option<Step> {
    if let Some(attr) = raw.strip_prefix('@') {
        // Namespace-declaration attributes are not addressable by path
        if is_xmlns_attr(attr) {
            return None;
        }
        check_prefix(attr, ns)?;
        return Some(Step::Attribute(attr.to_string()));
    }

    let (name, predicate) = match raw.find('[') {
        Some(open) => {
            let inner = raw[open + 1..].strip_suffix(']')?;
            (&raw[..open], Some(inner))
        }
        None => (raw, None),
    };
    if name.is_empty() {
        return None;
    }
    check_prefix(name, ns)?;

    let Some(inner) = predicate else {
        return Some(Step::Child {
            name: name.to_string(),
            ordinal: None,
            key: None,
        });
    };

    if inner.chars().all(|c| c.is_ascii_digit()) {
        let ordinal: usize = inner.parse().ok()?;
        if ordinal == 0 {
            return None;
        }
        return Some(Step::Child {
            name: name.to_string(),
            ordinal: Some(ordinal),
            key: None,
        });
    }

    // Identity predicate: @attr='value' (either quote style)
    let inner = inner.strip_prefix('@')?;
    let eq = inner.find('=')?;
    let attr = inner[..eq].trim();
    let literal = inner[eq + 1..].trim();
    let value = literal
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| literal.strip_prefix('"').and_then(|v| v.strip_suffix('"')))?;
    if attr.is_empty() {
        return None;
    }
    check_prefix(attr, ns)?;
    Some(Step::Child {
        name: name.to_string(),
        ordinal: None,
        key: Some((attr.to_string(), value.to_string())),
    })
}

/// Splits a path on `/` outside brackets and quotes.
fn split_top_level(path: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;

    for (i, c) in path.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' => depth += 1,
                ']' => depth = depth.checked_sub(1)?,
                '/' if depth == 0 => {
                    parts.push(&path[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    parts.push(&path[start..]);
    Some(parts)
}

/// Rejects steps whose namespace prefix is not bound.
///
/// Paths that mention an undeclared prefix cannot resolve, even though
/// they are textually well-formed.
fn check_prefix(name: &str, ns: &NamespaceBindings) -> Option<()> {
    match split_qname(name) {
        (Some(prefix), _) if ns.resolve(prefix).is_none() => None,
        _ => Some(()),
    }
}
