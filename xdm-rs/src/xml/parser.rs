//! XML parser that builds node trees.
//!
//! The parser uses quick-xml's streaming API. Whitespace-only text and
//! processing instructions are stripped, CDATA is treated as text, and
//! comments are kept as nodes so they survive a diff/patch cycle.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::node::{new_node, NodeInner, NodeRef, XmlComment, XmlContent, XmlElement, XmlText};

/// XML parser that builds node trees.
pub struct XmlParser;

impl XmlParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        XmlParser
    }

    /// Parses XML from a string.
    pub fn parse_str(&self, xml: &str) -> Result<NodeRef> {
        let mut reader = Reader::from_str(xml);
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<NodeRef> {
        let file = File::open(path)?;
        let buf_reader = BufReader::new(file);
        let mut reader = Reader::from_reader(buf_reader);
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a quick-xml Reader.
    fn parse_reader<R: BufRead>(&self, reader: &mut Reader<R>) -> Result<NodeRef> {
        let root = new_node(None);

        let mut node_stack: Vec<NodeRef> = vec![root.clone()];
        let mut current_text: Option<String> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    Self::flush_text(&mut current_text, &node_stack);

                    let element = self.parse_element(e, reader)?;
                    let node = new_node(Some(XmlContent::Element(element)));

                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, node.clone());
                    }
                    node_stack.push(node);
                }
                Ok(Event::End(_)) => {
                    Self::flush_text(&mut current_text, &node_stack);
                    node_stack.pop();
                }
                Ok(Event::Empty(ref e)) => {
                    // Self-closing tag, handled like Start + End
                    Self::flush_text(&mut current_text, &node_stack);

                    let element = self.parse_element(e, reader)?;
                    let node = new_node(Some(XmlContent::Element(element)));

                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, node);
                    }
                }
                Ok(Event::Text(e)) => {
                    let raw =
                        std::str::from_utf8(e.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
                    let text = unescape(raw).map_err(|e| Error::Parse(e.to_string()))?;
                    Self::accumulate(&mut current_text, &text);
                }
                Ok(Event::CData(ref e)) => {
                    // CDATA is character data like any other
                    let text = String::from_utf8_lossy(e.as_ref());
                    Self::accumulate(&mut current_text, &text);
                }
                Ok(Event::Comment(ref e)) => {
                    Self::flush_text(&mut current_text, &node_stack);

                    let comment_text = String::from_utf8_lossy(e.as_ref()).to_string();
                    let node = new_node(Some(XmlContent::Comment(XmlComment::new(comment_text))));
                    if let Some(parent) = node_stack.last() {
                        NodeInner::add_child_to_ref(parent, node);
                    }
                }
                Ok(Event::Decl(_)) | Ok(Event::PI(_)) => {
                    // Declaration and processing instructions are stripped
                }
                Ok(Event::DocType(_)) => {
                    // Ignore DOCTYPE
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Parse(format!("XML parse error: {}", e))),
            }
            buf.clear();
        }

        Ok(root)
    }

    /// Parses an element's name and attributes.
    fn parse_element<R: BufRead>(&self, e: &BytesStart, reader: &Reader<R>) -> Result<XmlElement> {
        let name = reader
            .decoder()
            .decode(e.name().as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .to_string();

        let mut attributes = HashMap::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| Error::Parse(format!("Attribute error: {}", e)))?;
            let key = reader
                .decoder()
                .decode(attr.key.as_ref())
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            attributes.insert(key, value);
        }

        Ok(XmlElement::new(name, attributes))
    }

    fn accumulate(current: &mut Option<String>, text: &str) {
        match current {
            Some(existing) => existing.push_str(text),
            None => *current = Some(text.to_string()),
        }
    }

    /// Appends accumulated text as a node, dropping whitespace-only runs.
    fn flush_text(current: &mut Option<String>, node_stack: &[NodeRef]) {
        if let Some(text) = current.take() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                let node = new_node(Some(XmlContent::Text(XmlText::new(trimmed))));
                if let Some(parent) = node_stack.last() {
                    NodeInner::add_child_to_ref(parent, node);
                }
            }
        }
    }
}

impl Default for XmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses XML from a file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<NodeRef> {
    XmlParser::new().parse_file(path)
}

/// Parses XML from a string.
pub fn parse_str(xml: &str) -> Result<NodeRef> {
    XmlParser::new().parse_str(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let root = parse_str(xml).unwrap();

        let root_borrowed = root.borrow();
        assert!(root_borrowed.is_document());
        assert_eq!(root_borrowed.child_count(), 1);

        let root_elem = root_borrowed.children()[0].clone();
        assert_eq!(root_elem.borrow().qname(), Some("root"));

        let child = root_elem.borrow().children()[0].clone();
        assert_eq!(child.borrow().qname(), Some("child"));
        assert_eq!(child.borrow().value(), Some("text".to_string()));
    }

    #[test]
    fn test_parse_with_attributes() {
        let xml = r#"<root id="foo" class="bar">content</root>"#;
        let root = parse_str(xml).unwrap();

        let root_elem = root.borrow().children()[0].clone();
        let borrowed = root_elem.borrow();
        let elem = borrowed.as_element().unwrap();
        assert_eq!(elem.attribute("id"), Some("foo"));
        assert_eq!(elem.attribute("class"), Some("bar"));
    }

    #[test]
    fn test_whitespace_only_text_is_stripped() {
        let xml = "<root>\n  <a/>\n  <b/>\n</root>";
        let root = parse_str(xml).unwrap();

        let root_elem = root.borrow().children()[0].clone();
        assert_eq!(root_elem.borrow().child_count(), 2);
    }

    #[test]
    fn test_comments_are_kept() {
        let xml = r#"<root><!-- keep me --><a/></root>"#;
        let root = parse_str(xml).unwrap();

        let root_elem = root.borrow().children()[0].clone();
        let borrowed = root_elem.borrow();
        assert_eq!(borrowed.child_count(), 2);
        assert!(matches!(
            borrowed.children()[0].borrow().content(),
            Some(XmlContent::Comment(_))
        ));
    }

    #[test]
    fn test_processing_instructions_are_stripped() {
        let xml = r#"<?xml version="1.0"?><?pi data?><root><?other?></root>"#;
        let root = parse_str(xml).unwrap();

        let root_elem = root.borrow().children()[0].clone();
        assert_eq!(root.borrow().child_count(), 1);
        assert_eq!(root_elem.borrow().child_count(), 0);
    }

    #[test]
    fn test_cdata_is_text() {
        let xml = r#"<root><![CDATA[raw <text>]]></root>"#;
        let root = parse_str(xml).unwrap();

        let root_elem = root.borrow().children()[0].clone();
        assert_eq!(root_elem.borrow().value(), Some("raw <text>".to_string()));
    }

    #[test]
    fn test_entities_are_unescaped() {
        let xml = r#"<root attr="a&amp;b">x &lt; y</root>"#;
        let root = parse_str(xml).unwrap();

        let root_elem = root.borrow().children()[0].clone();
        let borrowed = root_elem.borrow();
        assert_eq!(borrowed.as_element().unwrap().attribute("attr"), Some("a&b"));
        assert_eq!(borrowed.value(), Some("x < y".to_string()));
    }

    #[test]
    fn test_nested_elements() {
        let xml = r#"<a><b><c>deep</c></b></a>"#;
        let root = parse_str(xml).unwrap();

        let a = root.borrow().children()[0].clone();
        let b = a.borrow().children()[0].clone();
        let c = b.borrow().children()[0].clone();
        assert_eq!(c.borrow().value(), Some("deep".to_string()));
    }
}
