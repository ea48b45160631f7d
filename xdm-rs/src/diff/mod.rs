//! The diff model and the engines that populate and apply it.
//!
//! An [`XmlDelta`] holds the ordered Add/Remove/Change entry lists computed
//! by aligning a modified tree against an original. It serializes to a
//! self-describing XML form and applies to a third, independently-evolved
//! target tree: removes first, then changes, then adds, each against
//! freshly resolved paths.

mod align;
mod patch;
mod serialize;

pub use patch::resolve_or_create;

use std::path::Path;

use crate::error::Result;
use crate::node::NodeRef;
use crate::path::IdentifierSet;
use crate::xml::parse_file;

/// Root tag of the serialized diff document.
pub const DELTA_ROOT_TAG: &str = "XmlDelta";

/// Group tags.
pub const DELTA_ADDS_TAG: &str = "Adds";
pub const DELTA_REMOVES_TAG: &str = "Removes";
pub const DELTA_CHANGES_TAG: &str = "Changes";

/// Entry tag.
pub const DELTA_ENTRY_TAG: &str = "Diff";

/// Attribute names on the root record.
pub const DELTA_ORIGINAL_ATTR: &str = "OriginalFile";
pub const DELTA_MODIFIED_ATTR: &str = "ModifiedFile";

/// Attribute names on entry records.
pub const DELTA_XPATH_ATTR: &str = "XPath";
pub const DELTA_NEWVALUE_ATTR: &str = "NewValue";
pub const DELTA_OLDVALUE_ATTR: &str = "OldValue";

/// One add/remove/change record, keyed by path.
///
/// Empty strings mean "not applicable": an Add has no old value, a Remove
/// has no new value, and an element Remove may have no old value either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    /// Path expression locating the node or attribute.
    pub path: String,
    /// The value after the change (empty for removes).
    pub new_value: String,
    /// The value before the change (empty when not applicable).
    pub old_value: String,
}

impl DiffEntry {
    /// Creates a new entry.
    pub fn new(
        path: impl Into<String>,
        new_value: impl Into<String>,
        old_value: impl Into<String>,
    ) -> Self {
        DiffEntry {
            path: path.into(),
            new_value: new_value.into(),
            old_value: old_value.into(),
        }
    }
}

/// Hook invoked on the original and modified trees before alignment.
pub type PrepareTreesHook<'a> = &'a dyn Fn(&NodeRef, &NodeRef);
/// Hook invoked on the target tree before or after patch application.
pub type PrepareTargetHook<'a> = &'a dyn Fn(&NodeRef);

/// The differences between two similar XML documents, applicable to a
/// third.
///
/// Every element addressed by an entry must be uniquely locatable at its
/// depth: repeating sibling elements need an identifier attribute (by
/// default `name`, `id` or `key`) or a stable position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDelta {
    /// Source file of the original tree; provenance only.
    pub original_file: String,
    /// Source file of the modified tree; provenance only.
    pub modified_file: String,
    /// Paths present in modified but absent (or valueless) in original.
    pub adds: Vec<DiffEntry>,
    /// Paths present in original but absent in modified.
    pub removes: Vec<DiffEntry>,
    /// Paths present in both whose values differ.
    pub changes: Vec<DiffEntry>,
}

impl XmlDelta {
    /// Creates an empty delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any entries were recorded.
    pub fn is_different(&self) -> bool {
        self.adds.len() + self.removes.len() + self.changes.len() > 0
    }

    /// Computes the differences between two already-parsed trees.
    pub fn between_trees(
        original: &NodeRef,
        modified: &NodeRef,
        identifiers: &IdentifierSet,
    ) -> Self {
        let alignment = align::align(original, modified, identifiers);
        XmlDelta {
            original_file: String::new(),
            modified_file: String::new(),
            adds: alignment.adds,
            removes: alignment.removes,
            changes: alignment.changes,
        }
    }

    /// Computes the differences between two XML files using the default
    /// identifier attributes.
    pub fn between_files<P: AsRef<Path>>(original: P, modified: P) -> Result<Self> {
        Self::between_files_with(original, modified, &IdentifierSet::default(), None)
    }

    /// Computes the differences between two XML files.
    ///
    /// `pre_process` may mutate both trees before comparison, e.g. to assign
    /// temporary identity attributes to repeating sibling elements that
    /// carry none. The same fixup must then be mirrored on the target in
    /// [`apply_to_file`]'s pre-process step.
    ///
    /// [`apply_to_file`]: XmlDelta::apply_to_file
    pub fn between_files_with<P: AsRef<Path>>(
        original: P,
        modified: P,
        identifiers: &IdentifierSet,
        pre_process: Option<PrepareTreesHook<'_>>,
    ) -> Result<Self> {
        let original_file = original.as_ref().display().to_string();
        let modified_file = modified.as_ref().display().to_string();

        let original_tree = parse_file(original)?;
        let modified_tree = parse_file(modified)?;

        if let Some(prepare) = pre_process {
            prepare(&original_tree, &modified_tree);
        }

        let mut delta = Self::between_trees(&original_tree, &modified_tree, identifiers);
        delta.original_file = original_file;
        delta.modified_file = modified_file;
        Ok(delta)
    }
}
