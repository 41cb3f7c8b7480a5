// crates/mindmap-core/src/node.rs
//
// The generic attributed tree that sits between raw XML and the typed
// element tree. A GenericNode is deliberately untyped: a tag, an ordered
// attribute map, ordered children and the text runs around them, exactly
// what the parser produces and the serializer consumes. Trees of these are
// ephemeral; they live for one conversion pass.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Distinguishes real elements from comment nodes. Comments only exist so
/// the encode pipeline can insert the standard document boilerplate; the
/// decode pipeline skips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenericKind {
    Element,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericNode {
    pub kind: GenericKind,

    pub tag: String,

    /// Attribute keys are case-sensitive and unique; insertion order is
    /// preserved all the way to the serialized output.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<GenericNode>,

    /// Text between the start tag and the first child. For comment nodes
    /// this holds the comment body instead.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub leading_text: String,

    /// Text after the end tag, before the next sibling.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trailing_text: String,
}

impl GenericNode {
    pub fn new(tag: impl Into<String>) -> Self {
        GenericNode {
            kind: GenericKind::Element,
            tag: tag.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            leading_text: String::new(),
            trailing_text: String::new(),
        }
    }

    pub fn comment(body: impl Into<String>) -> Self {
        GenericNode {
            kind: GenericKind::Comment,
            tag: String::new(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            leading_text: body.into(),
            trailing_text: String::new(),
        }
    }

    pub fn is_comment(&self) -> bool {
        self.kind == GenericKind::Comment
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// First child with the given tag, comments excluded.
    pub fn find_tag(&self, tag: &str) -> Option<&GenericNode> {
        self.children
            .iter()
            .find(|c| !c.is_comment() && c.tag == tag)
    }
}
