//! Text round-trip for the diff model.
//!
//! A delta serializes to a self-describing document whose root names the
//! two source files and whose three groups hold one literal record per
//! entry. Compact form is undecorated but carries the XML declaration;
//! readable form is indented and omits it. Both deserialize identically.

use crate::error::{Error, Result};
use crate::node::{new_document, new_element, NodeInner, NodeRef, XmlContent};
use crate::xml::{parse_str, print_with_options, XmlPrinterOptions};

use super::{
    DiffEntry, XmlDelta, DELTA_ADDS_TAG, DELTA_CHANGES_TAG, DELTA_ENTRY_TAG, DELTA_MODIFIED_ATTR,
    DELTA_NEWVALUE_ATTR, DELTA_OLDVALUE_ATTR, DELTA_ORIGINAL_ATTR, DELTA_REMOVES_TAG,
    DELTA_ROOT_TAG, DELTA_XPATH_ATTR,
};

impl XmlDelta {
    /// Serializes the delta to its text form.
    ///
    /// Compact output is single-line and includes the XML declaration;
    /// readable output is indented and omits it.
    pub fn serialize(&self, compact: bool) -> Result<String> {
        let doc = new_document();
        let root = new_element(DELTA_ROOT_TAG);
        {
            let mut borrowed = root.borrow_mut();
            if let Some(e) = borrowed.as_element_mut() {
                e.set_attribute(DELTA_ORIGINAL_ATTR, self.original_file.clone());
                e.set_attribute(DELTA_MODIFIED_ATTR, self.modified_file.clone());
            }
        }
        NodeInner::add_child_to_ref(&doc, root.clone());

        for (tag, entries) in [
            (DELTA_ADDS_TAG, &self.adds),
            (DELTA_REMOVES_TAG, &self.removes),
            (DELTA_CHANGES_TAG, &self.changes),
        ] {
            let group = new_element(tag);
            for entry in entries {
                let record = new_element(DELTA_ENTRY_TAG);
                {
                    let mut borrowed = record.borrow_mut();
                    if let Some(e) = borrowed.as_element_mut() {
                        e.set_attribute(DELTA_XPATH_ATTR, entry.path.clone());
                        e.set_attribute(DELTA_NEWVALUE_ATTR, entry.new_value.clone());
                        e.set_attribute(DELTA_OLDVALUE_ATTR, entry.old_value.clone());
                    }
                }
                NodeInner::add_child_to_ref(&group, record);
            }
            NodeInner::add_child_to_ref(&root, group);
        }

        let options = if compact {
            XmlPrinterOptions {
                pretty: false,
                declaration: true,
            }
        } else {
            XmlPrinterOptions {
                pretty: true,
                declaration: false,
            }
        };
        Ok(print_with_options(&doc, options)?)
    }

    /// Reconstructs a delta from its text form.
    pub fn deserialize(xml: &str) -> Result<Self> {
        let doc = parse_str(xml)?;
        let root = first_element_child(&doc)
            .ok_or_else(|| Error::Parse("empty delta document".to_string()))?;

        {
            let borrowed = root.borrow();
            match borrowed.qname() {
                Some(DELTA_ROOT_TAG) => {}
                Some(other) => {
                    return Err(Error::Parse(format!(
                        "invalid root tag for delta document: {}",
                        other
                    )))
                }
                None => return Err(Error::Parse("invalid delta document".to_string())),
            }
        }

        let mut delta = XmlDelta {
            original_file: attr_or_default(&root, DELTA_ORIGINAL_ATTR),
            modified_file: attr_or_default(&root, DELTA_MODIFIED_ATTR),
            ..XmlDelta::default()
        };

        let groups: Vec<NodeRef> = element_children(&root);
        for group in groups {
            let tag = group.borrow().qname().unwrap_or_default().to_string();
            let entries = match tag.as_str() {
                DELTA_ADDS_TAG => &mut delta.adds,
                DELTA_REMOVES_TAG => &mut delta.removes,
                DELTA_CHANGES_TAG => &mut delta.changes,
                other => {
                    return Err(Error::Parse(format!(
                        "unexpected element <{}> in delta document",
                        other
                    )))
                }
            };
            for record in element_children(&group) {
                let qname = record.borrow().qname().unwrap_or_default().to_string();
                if qname != DELTA_ENTRY_TAG {
                    return Err(Error::Parse(format!(
                        "unexpected element <{}> in <{}>",
                        qname, tag
                    )));
                }
                entries.push(DiffEntry::new(
                    attr_or_default(&record, DELTA_XPATH_ATTR),
                    attr_or_default(&record, DELTA_NEWVALUE_ATTR),
                    attr_or_default(&record, DELTA_OLDVALUE_ATTR),
                ));
            }
        }

        Ok(delta)
    }
}

fn first_element_child(node: &NodeRef) -> Option<NodeRef> {
    node.borrow()
        .children()
        .iter()
        .find(|c| c.borrow().is_element())
        .cloned()
}

fn element_children(node: &NodeRef) -> Vec<NodeRef> {
    node.borrow()
        .children()
        .iter()
        .filter(|c| matches!(c.borrow().content(), Some(XmlContent::Element(_))))
        .cloned()
        .collect()
}

fn attr_or_default(node: &NodeRef, name: &str) -> String {
    node.borrow()
        .as_element()
        .and_then(|e| e.attribute(name))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> XmlDelta {
        XmlDelta {
            original_file: "original.config".to_string(),
            modified_file: "modified.config".to_string(),
            adds: vec![DiffEntry::new("/a/b/@x", "2", "")],
            removes: vec![
                DiffEntry::new("/a/c[@id='1']", "", ""),
                DiffEntry::new("/a/d/@y", "", "9"),
            ],
            changes: vec![DiffEntry::new("/a/e", "new", "old")],
        }
    }

    #[test]
    fn test_round_trip_compact() {
        let delta = sample();
        let text = delta.serialize(true).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(!text.contains('\n'));

        let restored = XmlDelta::deserialize(&text).unwrap();
        assert_eq!(delta, restored);
    }

    #[test]
    fn test_round_trip_readable() {
        let delta = sample();
        let text = delta.serialize(false).unwrap();
        assert!(!text.starts_with("<?xml"));
        assert!(text.contains("\n  <Adds>"));

        let restored = XmlDelta::deserialize(&text).unwrap();
        assert_eq!(delta, restored);
    }

    #[test]
    fn test_round_trip_empty() {
        let delta = XmlDelta::new();
        for compact in [true, false] {
            let restored = XmlDelta::deserialize(&delta.serialize(compact).unwrap()).unwrap();
            assert_eq!(delta, restored);
            assert!(!restored.is_different());
        }
    }

    #[test]
    fn test_special_characters_survive() {
        let mut delta = XmlDelta::new();
        delta
            .adds
            .push(DiffEntry::new("/a/b/@x", "a&b<c>\"d'", "prior & value"));
        let restored = XmlDelta::deserialize(&delta.serialize(true).unwrap()).unwrap();
        assert_eq!(delta, restored);
    }

    #[test]
    fn test_missing_entry_attributes_default_to_empty() {
        let xml = r#"<XmlDelta><Adds><Diff XPath="/a"/></Adds><Removes/><Changes/></XmlDelta>"#;
        let delta = XmlDelta::deserialize(xml).unwrap();
        assert_eq!(delta.adds.len(), 1);
        assert_eq!(delta.adds[0].new_value, "");
        assert_eq!(delta.adds[0].old_value, "");
    }

    #[test]
    fn test_invalid_root_is_rejected() {
        assert!(XmlDelta::deserialize("<NotADelta/>").is_err());
        assert!(XmlDelta::deserialize("").is_err());
        assert!(XmlDelta::deserialize("<XmlDelta><Bogus/></XmlDelta>").is_err());
    }
}
