//! XML printer that outputs node trees.
//!
//! Two layouts are supported: a compact single-line form and a pretty form
//! with two-space indentation. Newlines are always `\n`, regardless of
//! platform, and attributes print in sorted order so output is
//! deterministic.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::node::{NodeRef, XmlContent};

/// Options for XML printing.
#[derive(Debug, Clone, Default)]
pub struct XmlPrinterOptions {
    /// Whether to pretty-print with two-space indentation.
    pub pretty: bool,
    /// Whether to emit the XML declaration.
    pub declaration: bool,
}

/// XML printer that outputs node trees.
pub struct XmlPrinter<W: Write> {
    writer: W,
    options: XmlPrinterOptions,
}

impl<W: Write> XmlPrinter<W> {
    /// Creates a new printer with default options.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, XmlPrinterOptions::default())
    }

    /// Creates a new printer with the given options.
    pub fn with_options(writer: W, options: XmlPrinterOptions) -> Self {
        XmlPrinter { writer, options }
    }

    /// Prints a node tree to the output.
    pub fn print(&mut self, root: &NodeRef) -> std::io::Result<()> {
        if self.options.declaration {
            write!(self.writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
            self.newline()?;
        }
        self.print_node(root, 0)?;
        self.writer.flush()
    }

    fn print_node(&mut self, node: &NodeRef, indent: usize) -> std::io::Result<()> {
        let borrowed = node.borrow();
        match borrowed.content() {
            None => {
                // Document root: print children only
                for child in borrowed.children() {
                    self.print_node(child, indent)?;
                }
            }
            Some(XmlContent::Text(text)) => {
                self.indent(indent)?;
                write!(self.writer, "{}", to_entities(text.text()))?;
                self.newline()?;
            }
            Some(XmlContent::Comment(comment)) => {
                self.indent(indent)?;
                write!(self.writer, "<!--{}-->", comment.text())?;
                self.newline()?;
            }
            Some(XmlContent::Element(element)) => {
                self.indent(indent)?;
                write!(self.writer, "<{}", element.qname())?;
                for name in element.sorted_attr_names() {
                    let value = element.attribute(&name).unwrap_or_default();
                    write!(self.writer, " {}=\"{}\"", name, to_entities(value))?;
                }

                let text_only = borrowed.child_count() > 0
                    && borrowed
                        .children()
                        .iter()
                        .all(|c| matches!(c.borrow().content(), Some(XmlContent::Text(_))));

                if borrowed.child_count() == 0 {
                    write!(self.writer, " />")?;
                    self.newline()?;
                } else if text_only {
                    // Keep simple values on one line, even when pretty-printing
                    write!(self.writer, ">")?;
                    for child in borrowed.children() {
                        if let Some(XmlContent::Text(t)) = child.borrow().content() {
                            write!(self.writer, "{}", to_entities(t.text()))?;
                        }
                    }
                    write!(self.writer, "</{}>", element.qname())?;
                    self.newline()?;
                } else {
                    write!(self.writer, ">")?;
                    self.newline()?;
                    for child in borrowed.children() {
                        self.print_node(child, indent + 1)?;
                    }
                    self.indent(indent)?;
                    write!(self.writer, "</{}>", element.qname())?;
                    self.newline()?;
                }
            }
        }
        Ok(())
    }

    fn indent(&mut self, level: usize) -> std::io::Result<()> {
        if self.options.pretty {
            write!(self.writer, "{}", "  ".repeat(level))?;
        }
        Ok(())
    }

    fn newline(&mut self) -> std::io::Result<()> {
        if self.options.pretty {
            writeln!(self.writer)?;
        }
        Ok(())
    }
}

/// Converts special characters to XML entities.
fn to_entities(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '\'' => result.push_str("&apos;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Prints a node tree to a compact string without a declaration.
pub fn print_to_string(root: &NodeRef) -> std::io::Result<String> {
    print_with_options(
        root,
        XmlPrinterOptions {
            pretty: false,
            declaration: false,
        },
    )
}

/// Prints a node tree to an indented string without a declaration.
pub fn print_to_string_pretty(root: &NodeRef) -> std::io::Result<String> {
    print_with_options(
        root,
        XmlPrinterOptions {
            pretty: true,
            declaration: false,
        },
    )
}

/// Prints a node tree to a string with the given options.
pub fn print_with_options(root: &NodeRef, options: XmlPrinterOptions) -> std::io::Result<String> {
    let mut output = Vec::new();
    {
        let mut printer = XmlPrinter::with_options(&mut output, options);
        printer.print(root)?;
    }
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// Writes a node tree to a file with declaration and two-space indentation.
pub fn write_file<P: AsRef<Path>>(path: P, root: &NodeRef) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut printer = XmlPrinter::with_options(
        BufWriter::new(file),
        XmlPrinterOptions {
            pretty: true,
            declaration: true,
        },
    );
    printer.print(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_str;

    #[test]
    fn test_print_simple() {
        let root = parse_str("<root>text</root>").unwrap();
        let output = print_to_string(&root).unwrap();
        assert_eq!(output, "<root>text</root>");
    }

    #[test]
    fn test_print_with_sorted_attributes() {
        let root = parse_str(r#"<root b="2" a="1" />"#).unwrap();
        let output = print_to_string(&root).unwrap();
        assert_eq!(output, r#"<root a="1" b="2" />"#);
    }

    #[test]
    fn test_pretty_layout() {
        let root = parse_str("<root><child>text</child><empty/></root>").unwrap();
        let output = print_to_string_pretty(&root).unwrap();
        assert_eq!(output, "<root>\n  <child>text</child>\n  <empty />\n</root>\n");
    }

    #[test]
    fn test_declaration() {
        let root = parse_str("<root />").unwrap();
        let output = print_with_options(
            &root,
            XmlPrinterOptions {
                pretty: false,
                declaration: true,
            },
        )
        .unwrap();
        assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    }

    #[test]
    fn test_entity_escaping() {
        let root = parse_str(r#"<root attr="a&amp;b">x &lt; y</root>"#).unwrap();
        let output = print_to_string(&root).unwrap();
        assert_eq!(output, r#"<root attr="a&amp;b">x &lt; y</root>"#);
    }

    #[test]
    fn test_comments_survive() {
        let root = parse_str("<root><!-- note --><a/></root>").unwrap();
        let output = print_to_string(&root).unwrap();
        assert!(output.contains("<!-- note -->"));
    }

    #[test]
    fn test_round_trip_stable() {
        let xml = r#"<doc><section id="s1"><para>First.</para><para>Second.</para></section></doc>"#;
        let tree1 = parse_str(xml).unwrap();
        let output1 = print_to_string(&tree1).unwrap();
        let tree2 = parse_str(&output1).unwrap();
        let output2 = print_to_string(&tree2).unwrap();
        assert_eq!(output1, output2);
    }

    #[test]
    fn test_pretty_round_trip_structure() {
        let xml = r#"<a><b x="1">v</b><c><!-- k --><d/></c></a>"#;
        let tree1 = parse_str(xml).unwrap();
        let pretty = print_to_string_pretty(&tree1).unwrap();
        let tree2 = parse_str(&pretty).unwrap();
        assert_eq!(
            print_to_string(&tree1).unwrap(),
            print_to_string(&tree2).unwrap()
        );
    }
}
