//! Example: Merge the differences between two documents into a third
//!
//! Repeating sibling elements without an identifier attribute are only
//! addressable by position, which breaks when the target lists them in a
//! different order. This example shows the temporary-key pattern: a
//! pre-process hook assigns a `name` attribute derived from content before
//! comparison, the same hook runs on the target before application, and a
//! post-process hook strips the keys again before the result is saved.
//!
//! Usage: cargo run --example merge <original.xml> <modified.xml> <target.xml>

use std::env;

use xml_xdm::{find_elements_by_name, NodeRef, XmlDelta};

/// Element name whose repeating instances get temporary keys.
const KEYED_ELEMENT: &str = "server";

fn insert_name_attributes(tree: &NodeRef) {
    for element in find_elements_by_name(tree, KEYED_ELEMENT) {
        let key = element
            .borrow()
            .children()
            .iter()
            .find_map(|c| c.borrow().qname().map(str::to_string));
        if let Some(key) = key {
            let mut borrowed = element.borrow_mut();
            if let Some(e) = borrowed.as_element_mut() {
                if e.attribute("name").is_none() {
                    e.set_attribute("name", key);
                }
            }
        }
    }
}

fn remove_name_attributes(tree: &NodeRef) {
    for element in find_elements_by_name(tree, KEYED_ELEMENT) {
        let mut borrowed = element.borrow_mut();
        if let Some(e) = borrowed.as_element_mut() {
            e.remove_attribute("name");
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 4 {
        eprintln!(
            "Usage: {} <original.xml> <modified.xml> <target.xml>",
            args[0]
        );
        std::process::exit(1);
    }

    let delta = XmlDelta::between_files_with(
        &args[1],
        &args[2],
        &xml_xdm::IdentifierSet::default(),
        Some(&|original, modified| {
            insert_name_attributes(original);
            insert_name_attributes(modified);
        }),
    )?;

    if !delta.is_different() {
        eprintln!("Nothing to merge.");
        return Ok(());
    }

    eprintln!("{}", delta.serialize(false)?);

    delta.apply_to_file(
        &args[3],
        Some(&insert_name_attributes),
        Some(&remove_name_attributes),
    )?;

    eprintln!("Merged into {}", args[3]);
    Ok(())
}
