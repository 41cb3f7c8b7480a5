// crates/mindmap-core/src/convert.rs
//
// The conversion engine: decode (generic -> typed) and encode (typed ->
// generic), each as two breadth-first passes driven by work queues so
// stack depth stays constant no matter how deep the document is. Mind-map
// trees are routinely deep and wide; call-stack recursion is not an option
// here.
//
// Pass structure mirrors in both directions:
//   decode: structural (resolve kind, coerce attributes, attach children)
//           then finishing (post_decode hooks, root to leaves)
//   encode: pre_encode hooks over a working clone, structural (effective
//           children/attributes, stringify), then finishing (child
//           ordering, boilerplate, readability whitespace)

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::mem;

use indexmap::IndexMap;
use serde::Serialize;

use crate::element::{AttrMap, AttrValue, Element, ElementKind};
use crate::node::GenericNode;
use crate::registry::{HookOutcome, Registry, Resolution, TypedHookFn};
use crate::schema::{self, VariantDecl};
use crate::xml;

/// Non-fatal diagnostics raised during a conversion. These never abort the
/// pass; values are recovered best-effort and the condition is recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Warning {
    /// No variant is declared for this tag; the element round-trips
    /// verbatim through the catch-all. Raised once per distinct tag per
    /// conversion.
    NoVariant { tag: String },

    /// An attribute value failed every spec entry (or its key is missing
    /// from a non-empty spec); the raw string is kept.
    OutOfSpec {
        tag: String,
        key: String,
        value: String,
    },

    /// More than one discriminator matched; the most-recently-declared
    /// variant was chosen.
    AmbiguousDiscriminator { tag: String, chosen: ElementKind },

    /// Stored rich-content markup no longer parses; it is written back as
    /// escaped text so nothing is lost.
    UnparsedContent { tag: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NoVariant { tag } => {
                write!(
                    f,
                    "<{tag}> has no declared variant; importing and exporting verbatim"
                )
            }
            Warning::OutOfSpec { tag, key, value } => {
                write!(f, "<{tag}> {key}=\"{value}\" does not match the attribute spec")
            }
            Warning::AmbiguousDiscriminator { tag, chosen } => {
                write!(
                    f,
                    "<{tag}> matches more than one discriminator; using {chosen:?}"
                )
            }
            Warning::UnparsedContent { tag } => {
                write!(
                    f,
                    "<{tag}> embedded markup no longer parses; keeping it as text"
                )
            }
        }
    }
}

/// Collects warnings for one conversion pass, deduplicating the
/// once-per-tag diagnostics and mirroring everything to `tracing`.
#[derive(Default)]
pub struct Warnings {
    items: Vec<Warning>,
    undeclared_tags: HashSet<String>,
}

impl Warnings {
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.items.push(warning);
    }

    pub(crate) fn no_variant(&mut self, tag: &str) {
        if self.undeclared_tags.insert(tag.to_string()) {
            self.push(Warning::NoVariant {
                tag: tag.to_string(),
            });
        }
    }

    pub fn items(&self) -> &[Warning] {
        &self.items
    }

    fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A structural invariant of the document failed (for example a map
    /// without exactly one root node). Fatal; the conversion is aborted.
    #[error("document structure: {0}")]
    Structure(String),
}

#[derive(Clone, Copy)]
enum TypedSlot {
    PostDecode,
    PreEncode,
}

/// Converts between generic and typed trees against one registry. The
/// converter itself is stateless; every call gets private work queues, so
/// separate documents can be converted concurrently from the same
/// registry.
pub struct Converter<'r> {
    registry: &'r Registry,
}

impl<'r> Converter<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Converter { registry }
    }

    /// A converter over the standard Freeplane registry.
    pub fn standard() -> Converter<'static> {
        Converter {
            registry: Registry::standard(),
        }
    }

    /// Decode a generic tree into the typed element tree. Returns the root
    /// element and the warnings gathered along the way.
    pub fn decode(&self, root: &GenericNode) -> Result<(Element, Vec<Warning>), ConvertError> {
        let mut warnings = Warnings::default();
        if root.is_comment() {
            return Err(ConvertError::Structure(
                "document root is a comment".to_string(),
            ));
        }
        let Some((mut typed, generic_children)) = self.decode_one(root.clone(), &mut warnings)
        else {
            return Err(ConvertError::Structure(
                "root element was dropped by its handler".to_string(),
            ));
        };

        let mut queue: VecDeque<(&mut Element, Vec<GenericNode>)> = VecDeque::new();
        queue.push_back((&mut typed, generic_children));
        while let Some((parent, generic_children)) = queue.pop_front() {
            // The parent's pre_decode hook may have appended typed children
            // of its own; the generic child lists pair only with elements
            // attached below.
            let start = parent.children.len();
            let mut pending = Vec::new();
            for gchild in generic_children {
                if gchild.is_comment() {
                    continue;
                }
                if let Some((elem, gkids)) = self.decode_one(gchild, &mut warnings) {
                    parent.children.push(elem);
                    pending.push(gkids);
                }
            }
            queue.extend(parent.children[start..].iter_mut().zip(pending));
        }

        self.typed_pass(&mut typed, TypedSlot::PostDecode, &mut warnings);
        self.check_root_contract(&typed)?;
        Ok((typed, warnings.into_vec()))
    }

    /// Encode a typed element tree into a generic tree ready for
    /// serialization. The caller's tree is left untouched; pre-encode
    /// hooks run on an internal clone.
    pub fn encode(&self, element: &Element) -> Result<(GenericNode, Vec<Warning>), ConvertError> {
        let mut warnings = Warnings::default();
        let mut work = element.clone();
        self.typed_pass(&mut work, TypedSlot::PreEncode, &mut warnings);
        self.check_root_contract(&work)?;

        let (mut generic_root, typed_children) = self.encode_one(&work, &mut warnings);
        let mut queue: VecDeque<(&mut GenericNode, Vec<Element>)> = VecDeque::new();
        queue.push_back((&mut generic_root, typed_children));
        while let Some((parent, typed_children)) = queue.pop_front() {
            let mut pending = Vec::new();
            for telem in &typed_children {
                let (gnode, tkids) = self.encode_one(telem, &mut warnings);
                parent.children.push(gnode);
                pending.push(tkids);
            }
            queue.extend(parent.children.iter_mut().zip(pending));
        }

        self.finish_encode(&mut generic_root, &mut warnings);
        Ok((generic_root, warnings.into_vec()))
    }

    /// Structural decode of a single node: resolve the variant, coerce
    /// attributes, capture raw content, run the pre_decode hook. Children
    /// come back still generic; the caller owns attaching and recursing.
    /// `None` means the subtree is dropped.
    fn decode_one(
        &self,
        mut gnode: GenericNode,
        warnings: &mut Warnings,
    ) -> Option<(Element, Vec<GenericNode>)> {
        let mut generic_children = mem::take(&mut gnode.children);
        let resolution = self.registry.resolve_kind(&gnode.tag, &gnode.attributes);
        match &resolution {
            Resolution::Unresolved => warnings.no_variant(&gnode.tag),
            Resolution::Ambiguous { chosen, .. } => warnings.push(Warning::AmbiguousDiscriminator {
                tag: gnode.tag.clone(),
                chosen: *chosen,
            }),
            Resolution::Exact(_) => {}
        }
        let kind = resolution.kind();
        let decl = self.registry.variant(kind);
        let attributes = self.decode_attributes(decl, &gnode.tag, &gnode.attributes, warnings);

        let mut elem = Element {
            kind,
            tag: gnode.tag,
            attributes,
            children: Vec::new(),
            content: None,
            table: IndexMap::new(),
            leading_text: gnode.leading_text,
            trailing_text: gnode.trailing_text,
        };

        if decl.is_some_and(|d| d.raw_content) {
            let mut markup = String::new();
            for gchild in generic_children.drain(..) {
                match xml::write_fragment(&gchild) {
                    Ok(fragment) => markup.push_str(&fragment),
                    Err(_) => warnings.push(Warning::UnparsedContent {
                        tag: elem.tag.clone(),
                    }),
                }
            }
            if !markup.is_empty() {
                elem.content = Some(markup);
            }
            // Formatting around captured markup is meaningless; drop it so
            // re-decoding an encoded document yields an identical element.
            elem.leading_text.clear();
        }

        if let Some(hook) = self.registry.hooks(kind).pre_decode {
            if hook(&mut elem, &mut generic_children, warnings) == HookOutcome::Detach {
                return None;
            }
        }
        Some((elem, generic_children))
    }

    /// Structural encode of a single element: effective children and
    /// attributes via the get_children/get_attributes hooks, attributes
    /// stringified with the spec validated once more, raw content emitted
    /// into the leading text slot for the finishing pass to expand.
    fn encode_one(&self, elem: &Element, warnings: &mut Warnings) -> (GenericNode, Vec<Element>) {
        let hooks = self.registry.hooks(elem.kind);
        let children = match hooks.get_children {
            Some(hook) => hook(elem),
            None => elem.children.clone(),
        };
        let attributes = match hooks.get_attributes {
            Some(hook) => hook(elem),
            None => elem.attributes.clone(),
        };
        let decl = self.registry.variant(elem.kind);
        let encoded = self.encode_attributes(decl, &elem.tag, &attributes, warnings);

        let mut gnode = GenericNode::new(elem.tag.clone());
        gnode.attributes = encoded;
        gnode.leading_text = elem.leading_text.clone();
        gnode.trailing_text = elem.trailing_text.clone();
        if let Some(content) = &elem.content {
            gnode.leading_text = content.clone();
        }
        (gnode, children)
    }

    fn decode_attributes(
        &self,
        decl: Option<&VariantDecl>,
        tag: &str,
        raw: &IndexMap<String, String>,
        warnings: &mut Warnings,
    ) -> AttrMap {
        let spec_is_empty = decl.is_none_or(|d| d.spec.is_empty());
        let mut out = AttrMap::new();
        for (key, value) in raw {
            let coerced = match decl.and_then(|d| d.spec_entries(key)) {
                Some(entries) => match schema::coerce(value, entries) {
                    Some(typed) => typed,
                    None => {
                        warnings.push(Warning::OutOfSpec {
                            tag: tag.to_string(),
                            key: key.clone(),
                            value: value.clone(),
                        });
                        AttrValue::Text(value.clone())
                    }
                },
                None => {
                    if !spec_is_empty {
                        warnings.push(Warning::OutOfSpec {
                            tag: tag.to_string(),
                            key: key.clone(),
                            value: value.clone(),
                        });
                    }
                    AttrValue::Text(value.clone())
                }
            };
            out.insert(key.clone(), coerced);
        }
        out
    }

    fn encode_attributes(
        &self,
        decl: Option<&VariantDecl>,
        tag: &str,
        attributes: &AttrMap,
        warnings: &mut Warnings,
    ) -> IndexMap<String, String> {
        let mut out = IndexMap::new();
        for (key, value) in attributes {
            if matches!(value, AttrValue::Absent) {
                continue;
            }
            let raw = value.to_string();
            if let Some(entries) = decl.and_then(|d| d.spec_entries(key)) {
                if schema::coerce(&raw, entries).is_none() {
                    warnings.push(Warning::OutOfSpec {
                        tag: tag.to_string(),
                        key: key.clone(),
                        value: raw.clone(),
                    });
                }
            }
            out.insert(key.clone(), raw);
        }
        out
    }

    /// Breadth-first hook pass over a typed tree, root to leaves. Each
    /// child is detached from its parent while its hook runs, so the hook
    /// sees the parent (and siblings) without aliasing the element itself.
    fn typed_pass(&self, root: &mut Element, slot: TypedSlot, warnings: &mut Warnings) {
        if let Some(hook) = self.typed_hook(root.kind, slot) {
            // Detaching the root is meaningless; the outcome is ignored.
            let _ = hook(root, None, warnings);
        }
        let mut queue: VecDeque<&mut Element> = VecDeque::new();
        queue.push_back(root);
        while let Some(parent) = queue.pop_front() {
            let mut i = 0;
            while i < parent.children.len() {
                let kind = parent.children[i].kind;
                match self.typed_hook(kind, slot) {
                    None => i += 1,
                    Some(hook) => {
                        let mut child = mem::replace(&mut parent.children[i], Element::unknown(""));
                        match hook(&mut child, Some(parent), warnings) {
                            HookOutcome::Keep => {
                                parent.children[i] = child;
                                i += 1;
                            }
                            HookOutcome::Detach => {
                                parent.children.remove(i);
                            }
                        }
                    }
                }
            }
            queue.extend(parent.children.iter_mut());
        }
    }

    fn typed_hook(&self, kind: ElementKind, slot: TypedSlot) -> Option<TypedHookFn> {
        let hooks = self.registry.hooks(kind);
        match slot {
            TypedSlot::PostDecode => hooks.post_decode,
            TypedSlot::PreEncode => hooks.pre_encode,
        }
    }

    /// Encode finishing pass: canonical child ordering, post_encode hooks
    /// (document boilerplate), raw-content expansion, and readability
    /// whitespace. Children expanded from raw content are emitted verbatim
    /// and never revisited.
    fn finish_encode(&self, root: &mut GenericNode, warnings: &mut Warnings) {
        let mut queue: VecDeque<&mut GenericNode> = VecDeque::new();
        queue.push_back(root);
        while let Some(gnode) = queue.pop_front() {
            if gnode.is_comment() {
                continue;
            }
            let kind = self
                .registry
                .resolve_kind(&gnode.tag, &gnode.attributes)
                .kind();
            let decl = self.registry.variant(kind);
            if let Some(decl) = decl {
                sort_children(gnode, decl.child_order, decl.last_child_order);
            }
            let raw_content = decl.is_some_and(|d| d.raw_content);
            if !raw_content && !gnode.children.is_empty() && gnode.leading_text.is_empty() {
                gnode.leading_text = "\n".to_string();
            }
            if gnode.trailing_text.is_empty() {
                gnode.trailing_text = "\n".to_string();
            }
            if let Some(hook) = self.registry.hooks(kind).post_encode {
                hook(gnode, warnings);
            }
            if raw_content {
                self.expand_raw_content(gnode, warnings);
                continue;
            }
            queue.extend(gnode.children.iter_mut());
        }
    }

    /// Re-parse markup captured in the leading-text slot back into child
    /// nodes. On failure the markup stays as text (escaped on write) so no
    /// content is lost, and the condition is reported.
    fn expand_raw_content(&self, gnode: &mut GenericNode, warnings: &mut Warnings) {
        let markup = mem::take(&mut gnode.leading_text);
        if markup.trim().is_empty() {
            gnode.leading_text = markup;
            return;
        }
        match xml::parse_fragment(&markup) {
            Ok(nodes) => {
                gnode.leading_text = "\n".to_string();
                gnode.children.extend(nodes);
            }
            Err(_) => {
                warnings.push(Warning::UnparsedContent {
                    tag: gnode.tag.clone(),
                });
                gnode.leading_text = markup;
            }
        }
    }

    /// The document-level root contract: a map holds exactly one root
    /// node. Checked on both conversion directions; fragments rooted at
    /// any other element are exempt.
    fn check_root_contract(&self, root: &Element) -> Result<(), ConvertError> {
        if root.kind != ElementKind::Map {
            return Ok(());
        }
        let nodes = root
            .children
            .iter()
            .filter(|c| c.kind == ElementKind::Node)
            .count();
        if nodes != 1 {
            return Err(ConvertError::Structure(format!(
                "a map must hold exactly one root node, found {nodes}"
            )));
        }
        Ok(())
    }
}

/// Stable child ordering for output determinism: tags listed in `order`
/// are moved to the back in list order, so unlisted tags keep their
/// relative order at the front. Tags in `last` are then forced to the very
/// end, first-listed last.
fn sort_children(gnode: &mut GenericNode, order: &[&str], last: &[&str]) {
    for tag in order {
        move_tag_to_back(&mut gnode.children, tag);
    }
    for tag in last.iter().rev() {
        move_tag_to_back(&mut gnode.children, tag);
    }
}

fn move_tag_to_back(children: &mut Vec<GenericNode>, tag: &str) {
    let mut i = 0;
    let mut remaining = children.len();
    while i < remaining {
        if !children[i].is_comment() && children[i].tag == tag {
            let child = children.remove(i);
            children.push(child);
            remaining -= 1;
        } else {
            i += 1;
        }
    }
}
