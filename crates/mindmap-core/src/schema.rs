// crates/mindmap-core/src/schema.rs
//
// Per-element-kind schema: tag, default attributes, attribute spec,
// discriminators, child ordering and the variant hierarchy. This is
// build-once, read-only data; typed elements copy defaults out of it and
// never alias it. The contents follow the Freeplane 1.x file format.
// http://freeplane.sourceforge.net/wiki/index.php/Current_Freeplane_File_Format

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::element::{AttrValue, ElementKind};

/// Fn-pointer form of a custom attribute coercion.
pub type CoerceFn = fn(&str) -> Option<AttrValue>;

/// One entry of an attribute spec. Entries are tried in order during
/// coercion; the first one that succeeds wins.
#[derive(Debug, Clone, Copy)]
pub enum SpecEntry {
    /// Exact allowed string value.
    Value(&'static str),
    Bool,
    Int,
    Float,
    Text,
    Custom(CoerceFn),
}

impl PartialEq for SpecEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SpecEntry::Value(a), SpecEntry::Value(b)) => a == b,
            (SpecEntry::Bool, SpecEntry::Bool)
            | (SpecEntry::Int, SpecEntry::Int)
            | (SpecEntry::Float, SpecEntry::Float)
            | (SpecEntry::Text, SpecEntry::Text) => true,
            // Custom coercions are equal only when they are the same
            // function; compared by address, not by behavior.
            (SpecEntry::Custom(a), SpecEntry::Custom(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => false,
        }
    }
}

/// Coerce a raw attribute string against spec entries. Returns `None` when
/// every entry fails, in which case the caller keeps the raw string and
/// records a warning. Boolean parsing is deliberately loose to match the
/// looseness of real documents.
pub fn coerce(value: &str, entries: &[SpecEntry]) -> Option<AttrValue> {
    for entry in entries {
        match entry {
            SpecEntry::Value(fixed) => {
                if *fixed == value {
                    return Some(AttrValue::Text(value.to_string()));
                }
            }
            SpecEntry::Bool => return Some(AttrValue::Bool(parse_loose_bool(value))),
            SpecEntry::Int => {
                if let Ok(i) = value.parse::<i64>() {
                    return Some(AttrValue::Int(i));
                }
            }
            SpecEntry::Float => {
                if let Ok(f) = value.parse::<f64>() {
                    return Some(AttrValue::Float(f));
                }
            }
            SpecEntry::Text => return Some(AttrValue::Text(value.to_string())),
            SpecEntry::Custom(f) => {
                if let Some(v) = f(value) {
                    return Some(v);
                }
            }
        }
    }
    None
}

/// `"false"`, `"False"`, `"FALSE"`, `"0"` and the empty string are false;
/// anything else is true.
pub fn parse_loose_bool(value: &str) -> bool {
    !matches!(value, "" | "0" | "false" | "False" | "FALSE")
}

/// Static description of one element variant. Declaration order matters:
/// when several variants could claim the same generic node, the
/// most-recently-declared one wins.
#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub kind: ElementKind,

    /// Generic-node tag this variant decodes from and encodes to. The
    /// catch-all has no tag of its own.
    pub tag: &'static str,

    /// Supertype in the variant hierarchy; `None` only for the root
    /// catch-all. Handler resolution walks this chain.
    pub parent: Option<ElementKind>,

    /// Applied when constructing a fresh element, not during decode.
    pub defaults: Vec<(&'static str, AttrValue)>,

    /// Allowed types / enumerated values per attribute key. A key missing
    /// from a non-empty spec is accepted as a string with a warning.
    pub spec: Vec<(&'static str, Vec<SpecEntry>)>,

    /// Attribute key/value patterns (full-match regex) that identify this
    /// variant among others sharing its tag.
    pub discriminator: Vec<(&'static str, &'static str)>,

    /// Relative tag ordering applied to children during encode.
    pub child_order: &'static [&'static str],

    /// Tags forced to the very end of the child list; the first listed tag
    /// ends up last.
    pub last_child_order: &'static [&'static str],

    /// Leaf content model: children are captured as raw markup in
    /// `Element::content` instead of being decoded, and re-emitted verbatim
    /// on encode.
    pub raw_content: bool,
}

impl VariantDecl {
    pub fn new(kind: ElementKind, tag: &'static str) -> Self {
        VariantDecl {
            kind,
            tag,
            parent: Some(ElementKind::Unknown),
            defaults: Vec::new(),
            spec: Vec::new(),
            discriminator: Vec::new(),
            child_order: DEFAULT_CHILD_ORDER,
            last_child_order: &[],
            raw_content: false,
        }
    }

    pub fn parent(mut self, kind: ElementKind) -> Self {
        self.parent = Some(kind);
        self
    }

    pub fn root(mut self) -> Self {
        self.parent = None;
        self
    }

    pub fn default_attr(mut self, key: &'static str, value: impl Into<AttrValue>) -> Self {
        self.defaults.push((key, value.into()));
        self
    }

    pub fn spec_entry(mut self, key: &'static str, entries: &[SpecEntry]) -> Self {
        self.spec.push((key, entries.to_vec()));
        self
    }

    pub fn discriminator(mut self, key: &'static str, value: &'static str) -> Self {
        self.discriminator.push((key, value));
        self
    }

    pub fn child_order(mut self, order: &'static [&'static str]) -> Self {
        self.child_order = order;
        self
    }

    pub fn raw_content(mut self) -> Self {
        self.raw_content = true;
        self
    }

    pub fn spec_entries(&self, key: &str) -> Option<&[SpecEntry]> {
        self.spec
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, entries)| entries.as_slice())
    }
}

/// Child ordering shared by most variants: unlisted tags keep their
/// relative order at the front, listed tags follow in this order.
pub const DEFAULT_CHILD_ORDER: &[&str] = &[
    "arrowlink",
    "cloud",
    "edge",
    "properties",
    "map_styles",
    "icon",
    "attribute_layout",
    "attribute",
    "hook",
    "font",
    "stylenode",
    "richcontent",
    "node",
];

/// Node children are written in a different order: visual decorations
/// first, sub-nodes and the attribute table last.
pub const NODE_CHILD_ORDER: &[&str] = &[
    "arrowlink",
    "cloud",
    "edge",
    "font",
    "hook",
    "properties",
    "richcontent",
    "icon",
    "node",
    "attribute_layout",
    "attribute",
];

const ICON_BUILTINS: &[&str] = &[
    "help",
    "bookmark",
    "yes",
    "button_ok",
    "button_cancel",
    "idea",
    "messagebox_warning",
    "stop-sign",
    "closed",
    "info",
    "clanbomber",
    "checked",
    "unchecked",
    "wizard",
    "gohome",
    "knotify",
    "password",
    "pencil",
    "xmag",
    "bell",
    "launch",
    "broken-line",
    "stop",
    "prepare",
    "go",
    "very_negative",
    "negative",
    "neutral",
    "positive",
    "very_positive",
    "full-1",
    "full-2",
    "full-3",
    "full-4",
    "full-5",
    "full-6",
    "full-7",
    "full-8",
    "full-9",
    "full-0",
    "0%",
    "25%",
    "50%",
    "75%",
    "100%",
    "attach",
    "desktop_new",
    "list",
    "edit",
    "kaddressbook",
    "folder",
    "kmail",
    "Mail",
    "revision",
    "video",
    "audio",
    "executable",
    "image",
    "internet",
    "internet_warning",
    "mindmap",
    "narrative",
    "flag-black",
    "flag-blue",
    "flag-green",
    "flag-orange",
    "flag-pink",
    "flag",
    "flag-yellow",
    "clock",
    "clock2",
    "hourglass",
    "calendar",
    "family",
    "female1",
    "female2",
    "females",
    "male1",
    "male2",
    "males",
    "fema",
    "group",
    "ksmiletris",
    "smiley-neutral",
    "smiley-oh",
    "smiley-angry",
    "smiley_bad",
    "licq",
    "penguin",
    "freemind_butterfly",
    "bee",
    "forward",
    "back",
    "up",
    "down",
    "addition",
    "subtraction",
    "multiplication",
    "division",
];

use SpecEntry::{Bool, Float, Int, Text, Value};

fn build_standard_variants() -> Vec<VariantDecl> {
    use ElementKind::*;

    let mut variants = vec![
        // The catch-all doubles as the root of the variant hierarchy.
        VariantDecl::new(Unknown, "").root(),
        VariantDecl::new(Node, "node")
            .child_order(NODE_CHILD_ORDER)
            .default_attr("TEXT", "")
            .spec_entry("BACKGROUND_COLOR", &[Text])
            .spec_entry("COLOR", &[Text])
            .spec_entry("FOLDED", &[Bool])
            .spec_entry("ID", &[Text])
            .spec_entry("LINK", &[Text])
            .spec_entry("POSITION", &[Value("left"), Value("right")])
            .spec_entry("STYLE", &[Text])
            .spec_entry("TEXT", &[Text])
            .spec_entry("LOCALIZED_TEXT", &[Text])
            .spec_entry("TYPE", &[Text])
            .spec_entry("CREATED", &[Int])
            .spec_entry("MODIFIED", &[Int])
            .spec_entry("HGAP", &[Int])
            .spec_entry("VGAP", &[Int])
            .spec_entry("VSHIFT", &[Int])
            .spec_entry("ENCRYPTED_CONTENT", &[Text])
            .spec_entry("OBJECT", &[Text])
            .spec_entry("MIN_WIDTH", &[Int])
            .spec_entry("MAX_WIDTH", &[Int]),
        VariantDecl::new(Map, "map")
            .default_attr("version", "freeplane 1.3.0")
            .spec_entry("version", &[Text]),
        VariantDecl::new(Cloud, "cloud")
            .default_attr("COLOR", "#f0f0f0")
            .default_attr("SHAPE", "ARC")
            .spec_entry("COLOR", &[Text])
            .spec_entry("WIDTH", &[Text])
            .spec_entry(
                "SHAPE",
                &[Value("ARC"), Value("STAR"), Value("RECT"), Value("ROUND_RECT")],
            ),
        VariantDecl::new(Hook, "hook").spec_entry("NAME", &[Text]),
        VariantDecl::new(EmbeddedImage, "hook")
            .parent(Hook)
            .discriminator("NAME", "ExternalObject")
            .default_attr("NAME", "ExternalObject")
            .spec_entry("NAME", &[Text])
            .spec_entry("URI", &[Text])
            .spec_entry("SIZE", &[Float]),
        VariantDecl::new(MapConfig, "hook")
            .parent(Hook)
            .discriminator("NAME", "MapStyle")
            .default_attr("NAME", "MapStyle")
            .default_attr("zoom", 1.0)
            .spec_entry("NAME", &[Text])
            .spec_entry("max_node_width", &[Int])
            .spec_entry("zoom", &[Float]),
        VariantDecl::new(Equation, "hook")
            .parent(Hook)
            .discriminator("NAME", "plugins/latex/LatexNodeHook\\.properties")
            .default_attr("NAME", "plugins/latex/LatexNodeHook.properties")
            .spec_entry("NAME", &[Text])
            .spec_entry("EQUATION", &[Text]),
        VariantDecl::new(AutomaticEdgeColor, "hook")
            .parent(Hook)
            .discriminator("NAME", "AutomaticEdgeColor")
            .default_attr("NAME", "AutomaticEdgeColor")
            .default_attr("COUNTER", 0i64)
            .spec_entry("NAME", &[Text])
            .spec_entry("COUNTER", &[Int]),
        VariantDecl::new(MapStyles, "map_styles"),
        VariantDecl::new(StyleNode, "stylenode")
            .spec_entry("LOCALIZED_TEXT", &[Text])
            .spec_entry("POSITION", &[Value("left"), Value("right")])
            .spec_entry("COLOR", &[Text])
            .spec_entry("MAX_WIDTH", &[Int])
            .spec_entry("STYLE", &[Text]),
        VariantDecl::new(Font, "font")
            .default_attr("BOLD", false)
            .default_attr("ITALIC", false)
            .default_attr("NAME", "SansSerif")
            .default_attr("SIZE", 10i64)
            .spec_entry("BOLD", &[Bool])
            .spec_entry("ITALIC", &[Bool])
            .spec_entry("NAME", &[Text])
            .spec_entry("SIZE", &[Int]),
        VariantDecl::new(Edge, "edge")
            .spec_entry("COLOR", &[Text])
            .spec_entry("WIDTH", &[Value("thin"), Int])
            .spec_entry(
                "STYLE",
                &[
                    Value("linear"),
                    Value("bezier"),
                    Value("sharp_linear"),
                    Value("sharp_bezier"),
                    Value("horizontal"),
                    Value("hide_edge"),
                ],
            ),
        VariantDecl::new(Attribute, "attribute")
            .default_attr("NAME", "")
            .default_attr("VALUE", "")
            .spec_entry("NAME", &[Text])
            .spec_entry("VALUE", &[Text])
            .spec_entry("OBJECT", &[Text]),
        VariantDecl::new(Properties, "properties")
            .default_attr("show_icon_for_attributes", true)
            .default_attr("show_note_icons", true)
            .default_attr("show_notes_in_map", true)
            .spec_entry("show_icon_for_attributes", &[Bool])
            .spec_entry("show_note_icons", &[Bool])
            .spec_entry("show_notes_in_map", &[Bool]),
        VariantDecl::new(Arrow, "arrowlink")
            .default_attr("DESTINATION", "")
            .spec_entry("COLOR", &[Text])
            .spec_entry("DESTINATION", &[Text])
            .spec_entry("STARTARROW", &[Text])
            .spec_entry("ENDARROW", &[Text])
            .spec_entry("STARTINCLINATION", &[Text])
            .spec_entry("ENDINCLINATION", &[Text])
            .spec_entry("SOURCE_LABEL", &[Text])
            .spec_entry("MIDDLE_LABEL", &[Text])
            .spec_entry("TARGET_LABEL", &[Text])
            .spec_entry("EDGE_LIKE", &[Bool])
            .spec_entry("ID", &[Text])
            .spec_entry("WIDTH", &[Int])
            .spec_entry("TRANSPARENCY", &[Int])
            .spec_entry(
                "SHAPE",
                &[
                    Value("CUBIC_CURVE"),
                    Value("LINE"),
                    Value("LINEAR_PATH"),
                    Value("EDGE_LIKE"),
                ],
            )
            .spec_entry("FONT_SIZE", &[Int])
            .spec_entry("FONT_FAMILY", &[Text]),
        VariantDecl::new(AttributeLayout, "attribute_layout"),
        VariantDecl::new(AttributeRegistry, "attribute_registry")
            .default_attr("SHOW_ATTRIBUTES", "all")
            .spec_entry(
                "SHOW_ATTRIBUTES",
                &[Value("selected"), Value("all"), Value("hide")],
            ),
        VariantDecl::new(RichContent, "richcontent")
            .raw_content()
            .spec_entry("TYPE", &[Text]),
        VariantDecl::new(NodeText, "richcontent")
            .parent(RichContent)
            .raw_content()
            .discriminator("TYPE", "NODE")
            .default_attr("TYPE", "NODE")
            .spec_entry("TYPE", &[Text]),
        VariantDecl::new(NodeNote, "richcontent")
            .parent(RichContent)
            .raw_content()
            .discriminator("TYPE", "NOTE")
            .default_attr("TYPE", "NOTE")
            .spec_entry("TYPE", &[Text]),
        VariantDecl::new(NodeDetails, "richcontent")
            .parent(RichContent)
            .raw_content()
            .discriminator("TYPE", "DETAILS")
            .default_attr("TYPE", "DETAILS")
            .spec_entry("TYPE", &[Text]),
    ];

    // The icon builtin list is long; attach it after the fact to keep the
    // declarations above readable.
    let mut icon = VariantDecl::new(ElementKind::Icon, "icon").default_attr("BUILTIN", "bookmark");
    icon.spec.push((
        "BUILTIN",
        ICON_BUILTINS.iter().copied().map(Value).collect(),
    ));
    // Icons sit between Font and Edge in the original declaration order.
    let edge_pos = variants
        .iter()
        .position(|v| v.kind == ElementKind::Edge)
        .unwrap_or(variants.len());
    variants.insert(edge_pos, icon);

    variants
}

static STANDARD_VARIANTS: LazyLock<Vec<VariantDecl>> = LazyLock::new(build_standard_variants);

static STANDARD_BY_KIND: LazyLock<HashMap<ElementKind, usize>> = LazyLock::new(|| {
    STANDARD_VARIANTS
        .iter()
        .enumerate()
        .map(|(i, v)| (v.kind, i))
        .collect()
});

/// The standard Freeplane variant set, in declaration order.
pub fn standard_variants() -> &'static [VariantDecl] {
    &STANDARD_VARIANTS
}

/// Look up a standard variant by kind.
pub fn standard_variant(kind: ElementKind) -> Option<&'static VariantDecl> {
    STANDARD_BY_KIND.get(&kind).map(|&i| &STANDARD_VARIANTS[i])
}
