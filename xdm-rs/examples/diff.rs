//! Example: Compute the differences between two XML documents
//!
//! Usage: cargo run --example diff <original.xml> <modified.xml>

use std::env;

use xml_xdm::XmlDelta;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: {} <original.xml> <modified.xml>", args[0]);
        std::process::exit(1);
    }

    let delta = XmlDelta::between_files(&args[1], &args[2])?;

    if delta.is_different() {
        print!("{}", delta.serialize(false)?);
        eprintln!(
            "{} adds, {} removes, {} changes",
            delta.adds.len(),
            delta.removes.len(),
            delta.changes.len()
        );
    } else {
        eprintln!("Documents are structurally identical.");
    }

    Ok(())
}
