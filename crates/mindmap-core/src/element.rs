// crates/mindmap-core/src/element.rs
//
// The typed element tree: the long-lived, application-facing form of a
// mind-map document. Every node is one of a closed set of element kinds,
// carries a typed attribute map and ordered children, and owns its subtree
// outright. Elements are created by the decode pipeline or constructed
// fresh (in which case the schema defaults apply), freely mutated, and
// consumed by the encode pipeline.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

use crate::schema;

/// The closed set of element kinds a Freeplane document is made of.
///
/// `Unknown` is both the catch-all for undeclared tags (tag and attributes
/// preserved verbatim for faithful round-trips) and the root of the variant
/// hierarchy: every other kind's ancestor chain terminates at it. `Custom`
/// lets callers declare additional variants against their own registry
/// without touching this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementKind {
    Map,
    Node,
    Cloud,
    Hook,
    EmbeddedImage,
    MapConfig,
    Equation,
    AutomaticEdgeColor,
    MapStyles,
    StyleNode,
    Font,
    Icon,
    Edge,
    Attribute,
    AttributeLayout,
    AttributeRegistry,
    Properties,
    Arrow,
    RichContent,
    NodeText,
    NodeNote,
    NodeDetails,
    Unknown,
    Custom(&'static str),
}

/// A typed attribute value. Decode coerces raw strings into these using the
/// per-kind attribute spec; encode stringifies them back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Sentinel: the key is dropped when encoding. Assign this to suppress
    /// an attribute without removing it from the map.
    Absent,
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            // Keep a trailing ".0" on integral floats so values like
            // zoom="1.0" survive a round-trip unchanged.
            AttrValue::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{v:.1}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Absent => Ok(()),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Insertion-ordered typed attribute map.
pub type AttrMap = IndexMap<String, AttrValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub kind: ElementKind,

    /// The generic-node tag this element encodes to. Equal to the schema
    /// tag for declared kinds; preserved verbatim for `Unknown`.
    pub tag: String,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: AttrMap,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,

    /// Raw-markup escape hatch for leaf content models (rich content).
    /// Holds the embedded markup verbatim, bypassing attribute coercion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// The implicit key/value table Freeplane displays beneath a node.
    /// During decode, `attribute` children fold into this map; encode
    /// synthesizes them back.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub table: IndexMap<String, String>,

    #[serde(skip)]
    pub leading_text: String,

    #[serde(skip)]
    pub trailing_text: String,
}

impl Element {
    /// Construct a fresh element of a standard kind, with the schema's
    /// default attributes copied in (never aliased). A new `Node` also gets
    /// a generated `ID`, matching what Freeplane itself would assign.
    /// Kinds declared only against a custom registry are unknown here and
    /// fall back to the catch-all; construct those through
    /// `Registry::new_element`.
    pub fn new(kind: ElementKind) -> Self {
        match schema::standard_variant(kind) {
            Some(decl) => Element::from_variant(decl),
            None => Element::unknown(""),
        }
    }

    /// Construct a fresh element from a specific variant declaration.
    pub fn from_variant(decl: &schema::VariantDecl) -> Self {
        let mut attributes = AttrMap::new();
        for (key, value) in &decl.defaults {
            attributes.insert((*key).to_string(), value.clone());
        }
        let mut elem = Element {
            kind: decl.kind,
            tag: decl.tag.to_string(),
            attributes,
            children: Vec::new(),
            content: None,
            table: IndexMap::new(),
            leading_text: String::new(),
            trailing_text: String::new(),
        };
        if decl.kind == ElementKind::Node {
            elem.attributes.insert(
                "ID".to_string(),
                AttrValue::Text(format!("ID_{}", Uuid::new_v4().simple())),
            );
        }
        elem
    }

    /// An element with no schema backing: tag kept verbatim, attributes
    /// accepted as plain strings.
    pub fn unknown(tag: impl Into<String>) -> Self {
        Element {
            kind: ElementKind::Unknown,
            tag: tag.into(),
            attributes: AttrMap::new(),
            children: Vec::new(),
            content: None,
            table: IndexMap::new(),
            leading_text: String::new(),
            trailing_text: String::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// The node's `TEXT` attribute as a string, empty if unset.
    pub fn text(&self) -> String {
        match self.attributes.get("TEXT") {
            Some(v) => v.to_string(),
            None => String::new(),
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.attributes
            .insert("TEXT".to_string(), AttrValue::Text(text.into()));
    }

    pub fn find_child(&self, kind: ElementKind) -> Option<&Element> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn find_child_mut(&mut self, kind: ElementKind) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.kind == kind)
    }

    pub fn children_of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &Element> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// First child with the given tag.
    pub fn find_tag(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Value from the node's implicit attribute table.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.table.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.table.insert(name.into(), value.into());
    }
}

/// Heuristic the encoder uses to decide whether a node's `TEXT` needs to be
/// carried as embedded rich-content markup instead of a plain attribute.
pub(crate) fn looks_like_markup(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('<') && text.contains('>')
}
