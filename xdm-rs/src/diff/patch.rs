//! Patch application.
//!
//! Applies a delta to a target tree that has evolved independently of the
//! original/modified pair: removes first, then changes, then adds, each
//! entry re-resolved against the target as it currently stands. Paths that
//! no longer resolve during removes and changes are skipped (the target has
//! already diverged); adds synthesize any missing structure through
//! [`resolve_or_create`].

use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::node::{bind_namespaces, new_element, NamespaceBindings, NodeInner, NodeRef};
use crate::select::{select, Selected};
use crate::xml::{parse_file, write_file};

use super::{PrepareTargetHook, XmlDelta};

impl XmlDelta {
    /// Applies the delta to a target XML file and saves the result in
    /// place, with comments preserved, two-space indentation and
    /// normalized newlines.
    ///
    /// `pre_process` runs after parsing and before path resolution; it must
    /// mirror whatever temporary identity attributes the diff-time hook
    /// assigned. `post_process` runs after application, before saving.
    ///
    /// Returns `Ok(true)` without touching the file when the delta is
    /// empty.
    pub fn apply_to_file<P: AsRef<Path>>(
        &self,
        target: P,
        pre_process: Option<PrepareTargetHook<'_>>,
        post_process: Option<PrepareTargetHook<'_>>,
    ) -> Result<bool> {
        if !self.is_different() {
            return Ok(true);
        }

        let tree = parse_file(&target)?;
        let ns = bind_namespaces(&tree);
        if let Some(prepare) = pre_process {
            prepare(&tree);
        }

        self.apply_entries(&tree, &ns)?;

        if let Some(finish) = post_process {
            finish(&tree);
        }
        write_file(target, &tree)?;
        Ok(true)
    }

    /// Applies the delta to an already-parsed target tree, mutating it in
    /// place. No-op when the delta is empty.
    pub fn apply_to_tree(&self, target: &NodeRef) -> Result<bool> {
        if !self.is_different() {
            return Ok(true);
        }
        let ns = bind_namespaces(target);
        self.apply_entries(target, &ns)?;
        Ok(true)
    }

    fn apply_entries(&self, target: &NodeRef, ns: &NamespaceBindings) -> Result<()> {
        for entry in &self.removes {
            match select(target, &entry.path, ns) {
                Some(Selected::Attribute { owner, name }) => {
                    if let Some(e) = owner.borrow_mut().as_element_mut() {
                        e.remove_attribute(&name);
                    }
                }
                Some(Selected::Element(node)) => {
                    NodeInner::detach_from_parent(&node);
                }
                None => {
                    debug!("remove {} not present in target, skipping", entry.path);
                }
            }
        }

        for entry in &self.changes {
            match select(target, &entry.path, ns) {
                Some(found) => found.set_value(&entry.new_value),
                None => {
                    debug!("change {} not present in target, skipping", entry.path);
                }
            }
        }

        for entry in &self.adds {
            let created = resolve_or_create(target, &entry.path, ns)?;
            created.set_value(&entry.new_value);
        }

        Ok(())
    }
}

/// Characters that delimit tokens of the restricted path grammar.
const DELIMITERS: &[char] = &['/', '[', ']', '=', '"', '\''];

/// Resolves a path expression against a context node, creating any
/// elements or attributes it denotes that do not yet exist.
///
/// A leading `/` rebases the context to the document root. When the whole
/// path already resolves, the existing node is returned and nothing is
/// mutated. Grammar defects (an unterminated quote or bracket) are fatal.
pub fn resolve_or_create(
    context: &NodeRef,
    path: &str,
    ns: &NamespaceBindings,
) -> Result<Selected> {
    let trimmed = path.trim();
    let start = if trimmed.starts_with('/') {
        NodeInner::document_of_ref(context)
    } else {
        context.clone()
    };

    let mut rest = trimmed.trim_matches('/').to_string();
    if rest.is_empty() {
        return Ok(Selected::Element(start));
    }
    if let Some(found) = select(&start, &rest, ns) {
        return Ok(found);
    }

    let mut current = Selected::Element(start);
    loop {
        if rest.is_empty() {
            return Ok(current);
        }

        let Some(idx) = rest.find(DELIMITERS) else {
            let context = require_element(&current, path)?;
            return Ok(if let Some(attr) = rest.strip_prefix('@') {
                get_or_create_attr(&context, attr)
            } else {
                Selected::Element(get_or_create_child(&context, &rest, ns))
            });
        };

        let delim = rest[idx..].chars().next().unwrap_or('\0');
        let item = rest[..idx].trim().to_string();
        rest = rest[idx + 1..].trim().to_string();

        match delim {
            '[' => {
                let context = require_element(&current, path)?;
                // Depth-counted scan: predicates may nest brackets
                let mut depth = 1usize;
                let mut close = None;
                for (i, c) in rest.char_indices() {
                    match c {
                        '[' => depth += 1,
                        ']' => {
                            depth -= 1;
                            if depth == 0 {
                                close = Some(i);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let close =
                    close.ok_or_else(|| Error::path_format(path, "missing closing bracket"))?;
                let predicate = rest[..close].to_string();

                let selector = format!("{}[{}]", item, predicate);
                let next = match select(&context, &selector, ns)
                    .and_then(|s| s.as_element().cloned())
                {
                    Some(existing) => existing,
                    None => {
                        let created = new_element(item.clone());
                        NodeInner::add_child_to_ref(&context, created.clone());
                        // An identity predicate is materialized on the new
                        // element; an ordinal predicate is satisfied by the
                        // element's own position.
                        if !predicate.chars().all(|c| c.is_ascii_digit()) {
                            resolve_or_create(&created, &predicate, ns).map_err(|e| match e {
                                Error::PathFormat { reason, .. } => Error::path_format(path, reason),
                                other => other,
                            })?;
                        }
                        created
                    }
                };

                // Skip the closing bracket and the step separator after it
                rest = rest
                    .get(close + 2..)
                    .map(|r| r.trim().to_string())
                    .unwrap_or_default();
                current = Selected::Element(next);
            }
            '/' => {
                let context = require_element(&current, path)?;
                if item.is_empty() {
                    current = Selected::Element(NodeInner::document_of_ref(&context));
                    continue;
                }
                current = get_or_create_step(&context, &item, ns);
            }
            '=' => {
                if item.is_empty() {
                    continue;
                }
                let context = require_element(&current, path)?;
                current = get_or_create_step(&context, &item, ns);
            }
            quote @ ('"' | '\'') => {
                let end = rest
                    .find(quote)
                    .ok_or_else(|| Error::path_format(path, "missing trailing quote"))?;
                let literal = rest[..end].trim().to_string();
                current.set_value(&literal);
                rest = rest[end + 1..].trim().to_string();
            }
            // A stray closing bracket carries no step of its own
            _ => {}
        }
    }
}

/// Resolves one bare step (`name` or `@name`) under an element, creating
/// it when missing.
fn get_or_create_step(context: &NodeRef, item: &str, ns: &NamespaceBindings) -> Selected {
    if let Some(attr) = item.strip_prefix('@') {
        get_or_create_attr(context, attr)
    } else {
        Selected::Element(get_or_create_child(context, item, ns))
    }
}

fn get_or_create_child(context: &NodeRef, name: &str, ns: &NamespaceBindings) -> NodeRef {
    if let Some(existing) = select(context, name, ns).and_then(|s| s.as_element().cloned()) {
        return existing;
    }
    let created = new_element(name);
    NodeInner::add_child_to_ref(context, created.clone());
    created
}

fn get_or_create_attr(owner: &NodeRef, name: &str) -> Selected {
    let missing = owner
        .borrow()
        .as_element()
        .map(|e| e.attribute(name).is_none())
        .unwrap_or(false);
    if missing {
        if let Some(e) = owner.borrow_mut().as_element_mut() {
            e.set_attribute(name, "");
        }
    }
    Selected::Attribute {
        owner: owner.clone(),
        name: name.to_string(),
    }
}

fn require_element(current: &Selected, path: &str) -> Result<NodeRef> {
    current
        .as_element()
        .cloned()
        .ok_or_else(|| Error::path_format(path, "attribute step must be terminal"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffEntry;
    use crate::xml::{parse_str, print_to_string};

    fn ns() -> NamespaceBindings {
        NamespaceBindings::new()
    }

    #[test]
    fn test_resolve_existing_path_does_not_mutate() {
        let tree = parse_str(r#"<a><b x="1"/></a>"#).unwrap();
        let before = print_to_string(&tree).unwrap();

        let found = resolve_or_create(&tree, "/a/b/@x", &ns()).unwrap();
        assert_eq!(found.value(), Some("1".to_string()));
        assert_eq!(print_to_string(&tree).unwrap(), before);
    }

    #[test]
    fn test_create_missing_chain() {
        let tree = parse_str("<a/>").unwrap();
        let found = resolve_or_create(&tree, "/a/b/c", &ns()).unwrap();
        found.set_value("v");
        assert_eq!(print_to_string(&tree).unwrap(), "<a><b><c>v</c></b></a>");
    }

    #[test]
    fn test_create_attribute() {
        let tree = parse_str("<a><b/></a>").unwrap();
        let found = resolve_or_create(&tree, "/a/b/@x", &ns()).unwrap();
        found.set_value("1");
        assert_eq!(print_to_string(&tree).unwrap(), r#"<a><b x="1" /></a>"#);
    }

    #[test]
    fn test_create_identity_keyed_element() {
        let tree = parse_str("<a/>").unwrap();
        let found = resolve_or_create(&tree, "/a/b[@id='v']/@x", &ns()).unwrap();
        found.set_value("1");
        assert_eq!(
            print_to_string(&tree).unwrap(),
            r#"<a><b id="v" x="1" /></a>"#
        );
    }

    #[test]
    fn test_existing_identity_keyed_element_is_reused() {
        let tree = parse_str(r#"<a><b id="v"/></a>"#).unwrap();
        let found = resolve_or_create(&tree, "/a/b[@id='v']/@x", &ns()).unwrap();
        found.set_value("1");
        assert_eq!(
            print_to_string(&tree).unwrap(),
            r#"<a><b id="v" x="1" /></a>"#
        );
    }

    #[test]
    fn test_ordinal_predicate_creates_plain_element() {
        let tree = parse_str("<a><b>one</b></a>").unwrap();
        let found = resolve_or_create(&tree, "/a/b[2]", &ns()).unwrap();
        found.set_value("two");
        assert_eq!(
            print_to_string(&tree).unwrap(),
            "<a><b>one</b><b>two</b></a>"
        );
    }

    #[test]
    fn test_unterminated_quote_is_fatal() {
        let tree = parse_str("<a/>").unwrap();
        let err = resolve_or_create(&tree, "/a/b[@id='v]/@x", &ns()).unwrap_err();
        match err {
            Error::PathFormat { path, .. } => assert_eq!(path, "/a/b[@id='v]/@x"),
            other => panic!("expected PathFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_bracket_is_fatal() {
        let tree = parse_str("<a/>").unwrap();
        assert!(matches!(
            resolve_or_create(&tree, "/a/b[@id", &ns()),
            Err(Error::PathFormat { .. })
        ));
    }

    #[test]
    fn test_apply_remove_change_add() {
        let delta = XmlDelta {
            removes: vec![DiffEntry::new("/a/b/@y", "", "9")],
            changes: vec![DiffEntry::new("/a/b/@x", "2", "1")],
            adds: vec![DiffEntry::new("/a/c", "v", "")],
            ..XmlDelta::default()
        };

        let target = parse_str(r#"<a><b x="1" y="9"/></a>"#).unwrap();
        assert!(delta.apply_to_tree(&target).unwrap());
        assert_eq!(
            print_to_string(&target).unwrap(),
            r#"<a><b x="2" /><c>v</c></a>"#
        );
    }

    #[test]
    fn test_apply_skips_diverged_paths() {
        let delta = XmlDelta {
            removes: vec![DiffEntry::new("/a/gone", "", "")],
            changes: vec![DiffEntry::new("/a/missing/@x", "2", "1")],
            ..XmlDelta::default()
        };

        let target = parse_str("<a><keep/></a>").unwrap();
        assert!(delta.apply_to_tree(&target).unwrap());
        assert_eq!(print_to_string(&target).unwrap(), "<a><keep /></a>");
    }

    #[test]
    fn test_apply_remove_element() {
        let delta = XmlDelta {
            removes: vec![DiffEntry::new("/a/b[@id='2']", "", "")],
            ..XmlDelta::default()
        };

        let target = parse_str(r#"<a><b id="1"/><b id="2"/></a>"#).unwrap();
        assert!(delta.apply_to_tree(&target).unwrap());
        assert_eq!(
            print_to_string(&target).unwrap(),
            r#"<a><b id="1" /></a>"#
        );
    }

    #[test]
    fn test_apply_is_idempotent() {
        let delta = XmlDelta {
            removes: vec![DiffEntry::new("/a/b/@y", "", "9")],
            changes: vec![DiffEntry::new("/a/b/@x", "2", "1")],
            adds: vec![DiffEntry::new("/a/c", "v", "")],
            ..XmlDelta::default()
        };

        let target = parse_str(r#"<a><b x="1" y="9"/></a>"#).unwrap();
        delta.apply_to_tree(&target).unwrap();
        let once = print_to_string(&target).unwrap();
        delta.apply_to_tree(&target).unwrap();
        let twice = print_to_string(&target).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_delta_is_a_noop() {
        let delta = XmlDelta::new();
        let target = parse_str("<a><b/></a>").unwrap();
        let before = print_to_string(&target).unwrap();
        assert!(delta.apply_to_tree(&target).unwrap());
        assert_eq!(print_to_string(&target).unwrap(), before);
    }
}
