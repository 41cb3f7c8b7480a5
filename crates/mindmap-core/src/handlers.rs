// crates/mindmap-core/src/handlers.rs
//
// Hook implementations for the standard variant set. Only a handful of
// variants need behavior beyond the engine defaults; everything else
// inherits through handler resolution.

use crate::convert::Warnings;
use crate::element::{looks_like_markup, AttrMap, AttrValue, Element, ElementKind};
use crate::node::GenericNode;
use crate::registry::{HandlerDecl, Hook, HookOutcome};

/// Comment prepended to every encoded map, matching what Freeplane writes.
pub const MAP_COMMENT: &str = "To view this file, download free mind mapping software Freeplane \
                               from http://freeplane.sourceforge.net";

/// Edge colors assigned round-robin by the AutomaticEdgeColor hook.
const COLOR_ROTATION: &[&str] = &[
    "#ff0000", "#0000ff", "#00ff00", "#ff00ff", "#00ffff", "#ffff00", "#7c0000", "#00007c",
    "#007c00", "#7c007c", "#007c7c", "#7c7c00",
];

pub fn standard_handlers() -> Vec<HandlerDecl> {
    vec![
        HandlerDecl::new(ElementKind::Node)
            .hook(Hook::PostDecode(node_post_decode))
            .hook(Hook::GetChildren(node_get_children))
            .hook(Hook::GetAttributes(node_get_attributes)),
        HandlerDecl::new(ElementKind::Map).hook(Hook::PostEncode(map_post_encode)),
        HandlerDecl::new(ElementKind::Attribute).hook(Hook::PostDecode(attribute_post_decode)),
        HandlerDecl::new(ElementKind::AutomaticEdgeColor)
            .hook(Hook::PreEncode(colorize_sibling_edges)),
    ]
}

/// Normalize a freshly decoded node: the root node of real documents
/// carries `LOCALIZED_TEXT` instead of `TEXT`, and rich node text arrives
/// as a `richcontent TYPE=NODE` child rather than an attribute. Both fold
/// into the `TEXT` attribute so callers see one consistent shape.
fn node_post_decode(
    elem: &mut Element,
    _parent: Option<&mut Element>,
    _warnings: &mut Warnings,
) -> HookOutcome {
    if let Some(value) = elem.attributes.shift_remove("LOCALIZED_TEXT") {
        elem.attributes.insert("TEXT".to_string(), value);
    }
    let mut i = 0;
    while i < elem.children.len() {
        if elem.children[i].kind == ElementKind::NodeText {
            let child = elem.children.remove(i);
            if let Some(markup) = child.content {
                elem.attributes
                    .insert("TEXT".to_string(), AttrValue::Text(markup));
            }
        } else {
            i += 1;
        }
    }
    HookOutcome::Keep
}

/// The encode-side mirror of the node folds: synthesize `attribute`
/// children from the implicit table, and carry markup-bearing `TEXT` as a
/// `richcontent TYPE=NODE` child.
fn node_get_children(elem: &Element) -> Vec<Element> {
    let mut children = elem.children.clone();
    for (name, value) in &elem.table {
        let mut attribute = Element::new(ElementKind::Attribute);
        attribute.set_attr("NAME", name.as_str());
        attribute.set_attr("VALUE", value.as_str());
        children.push(attribute);
    }
    let text = elem.text();
    if looks_like_markup(&text) {
        let mut rich = Element::new(ElementKind::NodeText);
        rich.content = Some(text);
        children.push(rich);
    }
    children
}

fn node_get_attributes(elem: &Element) -> AttrMap {
    let mut attributes = elem.attributes.clone();
    if let Some(text) = attributes.get("TEXT") {
        // Markup moved into the richcontent child by get_children.
        if looks_like_markup(&text.to_string()) {
            attributes.shift_remove("TEXT");
        }
    }
    attributes
}

/// An `attribute` child is really a key/value entry of its parent node:
/// move it into the node's table and detach it from the children list.
fn attribute_post_decode(
    elem: &mut Element,
    parent: Option<&mut Element>,
    _warnings: &mut Warnings,
) -> HookOutcome {
    let Some(parent) = parent else {
        return HookOutcome::Keep;
    };
    if parent.kind != ElementKind::Node {
        return HookOutcome::Keep;
    }
    if let (Some(name), Some(value)) = (elem.attr("NAME"), elem.attr("VALUE")) {
        parent.table.insert(name.to_string(), value.to_string());
    }
    HookOutcome::Detach
}

/// Before encoding, give every sibling node that lacks an edge a freshly
/// colored one, advancing the COUNTER attribute through the rotation. The
/// hook's parent is normally the root node, which itself has no edge.
fn colorize_sibling_edges(
    elem: &mut Element,
    parent: Option<&mut Element>,
    _warnings: &mut Warnings,
) -> HookOutcome {
    let Some(parent) = parent else {
        return HookOutcome::Keep;
    };
    if parent.kind != ElementKind::Node || parent.find_tag("edge").is_some() {
        return HookOutcome::Keep;
    }
    let rotation = COLOR_ROTATION.len() as i64;
    let mut counter = elem
        .attr("COUNTER")
        .and_then(AttrValue::as_int)
        .unwrap_or(0)
        .rem_euclid(rotation);
    for child in parent.children.iter_mut() {
        if child.kind != ElementKind::Node {
            continue;
        }
        if child.children.iter().any(|c| c.kind == ElementKind::Edge) {
            continue;
        }
        let mut edge = Element::new(ElementKind::Edge);
        edge.set_attr("COLOR", COLOR_ROTATION[counter as usize]);
        child.children.push(edge);
        counter = (counter + 1) % rotation;
    }
    elem.set_attr("COUNTER", counter);
    HookOutcome::Keep
}

/// Prepend the standard Freeplane boilerplate comment to the encoded map.
fn map_post_encode(gnode: &mut GenericNode, _warnings: &mut Warnings) {
    let mut comment = GenericNode::comment(MAP_COMMENT);
    comment.trailing_text = "\n".to_string();
    gnode.children.insert(0, comment);
}
