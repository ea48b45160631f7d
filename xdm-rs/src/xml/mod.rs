//! XML parsing and output.
//!
//! Documents are read with whitespace-only text and processing instructions
//! stripped and comments preserved, and written back with two-space
//! indentation and normalized newlines, matching what the diff and patch
//! engines expect of persisted targets.

mod parser;
mod printer;

pub use parser::{parse_file, parse_str, XmlParser};
pub use printer::{
    print_to_string, print_to_string_pretty, print_with_options, write_file, XmlPrinter,
    XmlPrinterOptions,
};
