//! xdm - Structural XML Diff and Merge
//!
//! This library computes the differences between two similar XML documents
//! and applies them to a third, independently-evolved one: a three-way
//! merge restricted to additive and positional changes. The target's own
//! divergence from the original is left untouched; only the
//! original-to-modified delta is grafted onto it.
//!
//! # How nodes are identified
//!
//! Every element and attribute is reduced to a stable path expression built
//! from ancestor tag names plus either an identifier-attribute predicate
//! (`add[@key='timeout']`) or a sibling ordinal (`section[2]`). Two nodes
//! in different trees are "the same" exactly when their paths are
//! textually identical, so each element must be unique at its depth:
//! repeating siblings should carry one of the identifier attributes
//! (`name`, `id` or `key` by default).
//!
//! # Example
//!
//! ```
//! use xml_xdm::{parse_str, print_to_string, IdentifierSet, XmlDelta};
//!
//! let original = parse_str(r#"<a><b x="1"/></a>"#).unwrap();
//! let modified = parse_str(r#"<a><b x="2"/></a>"#).unwrap();
//! let delta = XmlDelta::between_trees(&original, &modified, &IdentifierSet::default());
//! assert!(delta.is_different());
//!
//! // The target has diverged (it grew y="9"), but the delta still applies.
//! let target = parse_str(r#"<a><b x="1" y="9"/></a>"#).unwrap();
//! delta.apply_to_tree(&target).unwrap();
//! assert_eq!(
//!     print_to_string(&target).unwrap(),
//!     r#"<a><b x="2" y="9" /></a>"#
//! );
//! ```
//!
//! Deltas survive a lossless text round-trip ([`XmlDelta::serialize`] /
//! [`XmlDelta::deserialize`]), so a diff computed in one process can be
//! inspected, stored, and applied elsewhere.
//!
//! Moved or reordered nodes are not detected as moves (they surface as a
//! remove plus an add), concurrent edits to the same value are not
//! reconciled (the modified side wins), and no schema awareness is
//! involved.

pub mod diff;
pub mod error;
pub mod node;
pub mod path;
pub mod select;
pub mod xml;

// Re-export commonly used types
pub use diff::{
    resolve_or_create, DiffEntry, PrepareTargetHook, PrepareTreesHook, XmlDelta,
};
pub use error::{Error, Result};
pub use node::{
    bind_namespaces, is_xmlns_attr, new_document, new_element, new_node, new_text, split_qname,
    NamespaceBindings, NodeInner, NodeRef, WeakNodeRef, XmlComment, XmlContent, XmlElement,
    XmlText,
};
pub use path::{attr_path_of, find_elements_by_name, path_of, IdentifierSet};
pub use select::{select, Selected};
pub use xml::{
    parse_file, parse_str, print_to_string, print_to_string_pretty, print_with_options,
    write_file, XmlParser, XmlPrinter, XmlPrinterOptions,
};
