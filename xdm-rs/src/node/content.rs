//! XML content types for tree nodes.
//!
//! This module provides `XmlContent`, which represents the payload of a tree
//! node: an element (tag with attributes), character data, or a comment.
//! Processing instructions and whitespace-only text are stripped at parse
//! time and have no content variant.

use std::collections::HashMap;

/// Represents the content of an XML node.
///
/// The document root carries no content at all (`NodeInner::content()` is
/// `None` for it), so there is no `Document` variant here.
#[derive(Debug, Clone)]
pub enum XmlContent {
    /// An XML element with a qualified name and attributes.
    Element(XmlElement),
    /// Character data (text or CDATA).
    Text(XmlText),
    /// An XML comment.
    Comment(XmlComment),
}

impl XmlContent {
    /// Returns true if this is an element node.
    pub fn is_element(&self) -> bool {
        matches!(self, XmlContent::Element(_))
    }

    /// Returns true if this is a text node.
    pub fn is_text(&self) -> bool {
        matches!(self, XmlContent::Text(_))
    }

    /// Returns true if this is a comment node.
    pub fn is_comment(&self) -> bool {
        matches!(self, XmlContent::Comment(_))
    }

    /// Returns a reference to the element, if this is an element node.
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlContent::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Returns a mutable reference to the element, if this is an element node.
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlContent::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Returns a reference to the text, if this is a text node.
    pub fn as_text(&self) -> Option<&XmlText> {
        match self {
            XmlContent::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// An XML element with a qualified name and attributes.
///
/// Attribute storage is unordered; callers that need deterministic iteration
/// (the alignment engine, the printer) go through [`sorted_attr_names`].
///
/// [`sorted_attr_names`]: XmlElement::sorted_attr_names
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// The qualified name of the element (e.g., "add", "ns:settings").
    name: String,
    /// Attributes as key-value pairs, keyed by qualified attribute name.
    attributes: HashMap<String, String>,
}

impl XmlElement {
    /// Creates a new XML element with the given name and attributes.
    pub fn new(name: impl Into<String>, attributes: HashMap<String, String>) -> Self {
        XmlElement {
            name: name.into(),
            attributes,
        }
    }

    /// Creates an element with no attributes.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, HashMap::new())
    }

    /// Returns the qualified name of the element.
    pub fn qname(&self) -> &str {
        &self.name
    }

    /// Returns the attributes.
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Returns the value of the named attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    /// Returns attribute names in sorted order for deterministic iteration.
    pub fn sorted_attr_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attributes.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Display for XmlElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}", self.name)?;
        for name in self.sorted_attr_names() {
            write!(f, " {}=\"{}\"", name, self.attributes[&name])?;
        }
        write!(f, ">")
    }
}

/// Character data content.
#[derive(Debug, Clone)]
pub struct XmlText {
    text: String,
}

impl XmlText {
    /// Creates a new text node.
    pub fn new(text: impl Into<String>) -> Self {
        XmlText { text: text.into() }
    }

    /// Returns the text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text content.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl std::fmt::Display for XmlText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// XML comment content (without the `<!--` and `-->` markers).
#[derive(Debug, Clone)]
pub struct XmlComment {
    text: String,
}

impl XmlComment {
    /// Creates a new comment node.
    pub fn new(text: impl Into<String>) -> Self {
        XmlComment { text: text.into() }
    }

    /// Returns the comment text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for XmlComment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<!--{}-->", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_attributes() {
        let mut e = XmlElement::named("add");
        assert_eq!(e.attribute("key"), None);

        e.set_attribute("key", "timeout");
        e.set_attribute("value", "30");
        assert_eq!(e.attribute("key"), Some("timeout"));
        assert_eq!(e.sorted_attr_names(), vec!["key", "value"]);

        assert_eq!(e.remove_attribute("key"), Some("timeout".to_string()));
        assert_eq!(e.attribute("key"), None);
    }

    #[test]
    fn test_content_accessors() {
        let elem = XmlContent::Element(XmlElement::named("div"));
        let text = XmlContent::Text(XmlText::new("hello"));
        let comment = XmlContent::Comment(XmlComment::new(" note "));

        assert!(elem.is_element());
        assert!(!elem.is_text());
        assert!(text.is_text());
        assert!(comment.is_comment());

        assert!(elem.as_element().is_some());
        assert!(elem.as_text().is_none());
        assert_eq!(text.as_text().unwrap().text(), "hello");
    }
}
