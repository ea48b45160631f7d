//! Node structures for XML tree representation.
//!
//! A document is a tree of [`NodeRef`]s. The root node carries no content
//! and stands for the document itself; every other node carries an
//! [`XmlContent`]. Attributes are not nodes: they live in their owner
//! element's attribute map and are addressed as `(owner, name)` pairs.

mod content;
pub mod namespace;

pub use content::{XmlComment, XmlContent, XmlElement, XmlText};
pub use namespace::{bind_namespaces, is_xmlns_attr, split_qname, NamespaceBindings};

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique node IDs.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique node ID.
fn next_node_id() -> u64 {
    NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reference-counted pointer to a node.
pub type NodeRef = Rc<RefCell<NodeInner>>;

/// A weak reference to a node.
pub type WeakNodeRef = Weak<RefCell<NodeInner>>;

/// The inner data of a node in a document tree.
///
/// Each node has:
/// - 0 or more children
/// - XML content (`None` for the document root)
/// - A parent (except for the root)
/// - A position among siblings
#[derive(Debug)]
pub struct NodeInner {
    /// Unique identifier for this node, assigned once at creation.
    id: u64,
    /// Child nodes.
    children: Vec<NodeRef>,
    /// XML content of this node; `None` marks the document root.
    content: Option<XmlContent>,
    /// Weak reference to parent node.
    parent: WeakNodeRef,
    /// Zero-based position among siblings (-1 for the root).
    child_pos: i32,
}

impl NodeInner {
    fn new(content: Option<XmlContent>) -> Self {
        NodeInner {
            id: next_node_id(),
            children: Vec::new(),
            content,
            parent: Weak::new(),
            child_pos: -1,
        }
    }

    /// Returns the unique ID of this node.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the content of this node.
    pub fn content(&self) -> Option<&XmlContent> {
        self.content.as_ref()
    }

    /// Returns a mutable reference to the content.
    pub fn content_mut(&mut self) -> Option<&mut XmlContent> {
        self.content.as_mut()
    }

    /// Returns true if this is the document root (no content).
    pub fn is_document(&self) -> bool {
        self.content.is_none()
    }

    /// Returns true if this node is an element.
    pub fn is_element(&self) -> bool {
        matches!(self.content, Some(XmlContent::Element(_)))
    }

    /// Returns the element content, if this node is an element.
    pub fn as_element(&self) -> Option<&XmlElement> {
        self.content.as_ref().and_then(XmlContent::as_element)
    }

    /// Returns the mutable element content, if this node is an element.
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        self.content.as_mut().and_then(XmlContent::as_element_mut)
    }

    /// Returns the element's qualified name, if this node is an element.
    pub fn qname(&self) -> Option<&str> {
        self.as_element().map(XmlElement::qname)
    }

    /// Returns the number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns a reference to the child at the given index.
    pub fn child(&self, index: usize) -> Option<&NodeRef> {
        self.children.get(index)
    }

    /// Returns the children as a slice.
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Returns a weak reference to the parent.
    pub fn parent(&self) -> &WeakNodeRef {
        &self.parent
    }

    /// Returns the child position (0-based index among siblings, -1 for the root).
    pub fn child_pos(&self) -> i32 {
        self.child_pos
    }

    /// Returns the node's value.
    ///
    /// Text and comment nodes yield their stored literal. An element yields
    /// the text of its first text child, or `None` when it has no directly
    /// comparable value (e.g. an element containing only sub-elements).
    pub fn value(&self) -> Option<String> {
        match self.content() {
            Some(XmlContent::Text(t)) => Some(t.text().to_string()),
            Some(XmlContent::Comment(c)) => Some(c.text().to_string()),
            Some(XmlContent::Element(_)) => self.children.iter().find_map(|child| {
                let borrowed = child.borrow();
                match borrowed.content() {
                    Some(XmlContent::Text(t)) => Some(t.text().to_string()),
                    _ => None,
                }
            }),
            None => None,
        }
    }
}

/// Helper functions that work with NodeRef.
impl NodeInner {
    /// Adds a child node. Must be called on the NodeRef wrapper.
    pub fn add_child_to_ref(parent_ref: &NodeRef, child_ref: NodeRef) {
        {
            let mut child = child_ref.borrow_mut();
            child.parent = Rc::downgrade(parent_ref);
            child.child_pos = parent_ref.borrow().children.len() as i32;
        }
        parent_ref.borrow_mut().children.push(child_ref);
    }

    /// Inserts a child at the given index.
    pub fn add_child_at_to_ref(parent_ref: &NodeRef, index: usize, child_ref: NodeRef) {
        {
            let mut child = child_ref.borrow_mut();
            child.parent = Rc::downgrade(parent_ref);
            child.child_pos = index as i32;
        }
        {
            let mut parent = parent_ref.borrow_mut();
            parent.children.insert(index, child_ref);
            for i in (index + 1)..parent.children.len() {
                parent.children[i].borrow_mut().child_pos = i as i32;
            }
        }
    }

    /// Removes the child at the given index.
    pub fn remove_child_to_ref(parent_ref: &NodeRef, index: usize) {
        let mut parent = parent_ref.borrow_mut();
        if index < parent.children.len() {
            parent.children.remove(index);
            for i in index..parent.children.len() {
                parent.children[i].borrow_mut().child_pos = i as i32;
            }
        }
    }

    /// Detaches a node from its parent, if it has one.
    pub fn detach_from_parent(node_ref: &NodeRef) {
        let (parent, pos) = {
            let node = node_ref.borrow();
            (node.parent.upgrade(), node.child_pos)
        };
        if let Some(parent) = parent {
            if pos >= 0 {
                Self::remove_child_to_ref(&parent, pos as usize);
            }
        }
        let mut node = node_ref.borrow_mut();
        node.parent = Weak::new();
        node.child_pos = -1;
    }

    /// Walks up to the document root of the tree containing this node.
    pub fn document_of_ref(node_ref: &NodeRef) -> NodeRef {
        let mut current = node_ref.clone();
        loop {
            let parent = current.borrow().parent.upgrade();
            match parent {
                Some(p) => current = p,
                None => return current,
            }
        }
    }

    /// Sets a node's value.
    ///
    /// For text and comment nodes the literal is replaced. For an element,
    /// the first text child is updated; an empty value removes it, and a
    /// missing one is inserted before the element's first child.
    pub fn set_value_of_ref(node_ref: &NodeRef, value: &str) {
        let is_element = node_ref.borrow().is_element();
        if !is_element {
            let mut node = node_ref.borrow_mut();
            match node.content_mut() {
                Some(XmlContent::Text(t)) => t.set_text(value),
                Some(_) | None => {}
            }
            return;
        }

        let text_index = node_ref.borrow().children.iter().position(|child| {
            matches!(child.borrow().content(), Some(XmlContent::Text(_)))
        });

        if value.trim().is_empty() {
            if let Some(index) = text_index {
                Self::remove_child_to_ref(node_ref, index);
            }
        } else if let Some(index) = text_index {
            let child = node_ref.borrow().children[index].clone();
            let mut borrowed = child.borrow_mut();
            if let Some(XmlContent::Text(t)) = borrowed.content_mut() {
                t.set_text(value);
            }
        } else {
            Self::add_child_at_to_ref(node_ref, 0, new_text(value));
        }
    }
}

/// Creates a new node with the given content.
pub fn new_node(content: Option<XmlContent>) -> NodeRef {
    Rc::new(RefCell::new(NodeInner::new(content)))
}

/// Creates a new, empty document root node.
pub fn new_document() -> NodeRef {
    new_node(None)
}

/// Creates a new element node with no attributes.
pub fn new_element(name: impl Into<String>) -> NodeRef {
    new_node(Some(XmlContent::Element(XmlElement::named(name))))
}

/// Creates a new text node.
pub fn new_text(text: impl Into<String>) -> NodeRef {
    new_node(Some(XmlContent::Text(XmlText::new(text))))
}
