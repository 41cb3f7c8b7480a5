// Full-pipeline tests: markup -> generic tree -> typed tree and back.

use mindmap_core::{
    AttrValue, ConvertError, Converter, Element, ElementKind, Error, Warning, decode_str,
    encode_string,
};
use similar::TextDiff;

/// A document already in canonical output form: newline separated, children
/// in canonical order, every sibling node carrying an edge.
const SAMPLE: &str = "\
<map version=\"freeplane 1.3.0\">
<!--To view this file, download free mind mapping software Freeplane from http://freeplane.sourceforge.net-->
<hook NAME=\"MapStyle\" zoom=\"1.0\"/>
<node ID=\"ID_1704089215\" TEXT=\"Plans\" FOLDED=\"false\" CREATED=\"1436208793908\" MODIFIED=\"1436208793908\">
<edge COLOR=\"#ff0000\"/>
<font BOLD=\"false\" ITALIC=\"false\" NAME=\"SansSerif\" SIZE=\"10\"/>
<node ID=\"ID_2\" TEXT=\"groceries\" POSITION=\"right\">
<edge COLOR=\"#0000ff\"/>
</node>
<node ID=\"ID_3\" POSITION=\"left\">
<edge COLOR=\"#00ff00\"/>
<richcontent TYPE=\"NODE\">
<html>
<head/>
<body>
<p>errands</p>
</body>
</html>
</richcontent>
</node>
<attribute NAME=\"owner\" VALUE=\"me\"/>
</node>
</map>
";

fn assert_same(expected: &str, actual: &str) {
    if expected != actual {
        let diff = TextDiff::from_lines(expected, actual);
        panic!("documents differ:\n{}", diff.unified_diff());
    }
}

#[test]
fn decode_builds_typed_tree() {
    let (map, warnings) = decode_str(SAMPLE).expect("decode sample");
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    assert_eq!(map.kind, ElementKind::Map);
    assert_eq!(map.attr("version"), Some(&AttrValue::Text("freeplane 1.3.0".into())));

    let config = map.find_child(ElementKind::MapConfig).expect("map config");
    assert_eq!(config.attr("zoom"), Some(&AttrValue::Float(1.0)));

    let root = map.find_child(ElementKind::Node).expect("root node");
    assert_eq!(root.text(), "Plans");
    assert_eq!(root.attr("FOLDED"), Some(&AttrValue::Bool(false)));
    assert_eq!(root.attr("CREATED"), Some(&AttrValue::Int(1436208793908)));
    assert_eq!(root.children_of_kind(ElementKind::Node).count(), 2);

    let font = root.find_child(ElementKind::Font).expect("font");
    assert_eq!(font.attr("SIZE"), Some(&AttrValue::Int(10)));
    assert_eq!(font.attr("BOLD"), Some(&AttrValue::Bool(false)));
}

#[test]
fn attribute_children_fold_into_table() {
    let (map, _) = decode_str(SAMPLE).expect("decode sample");
    let root = map.find_child(ElementKind::Node).expect("root node");
    assert_eq!(root.attribute("owner"), Some("me"));
    // The attribute child itself is gone; it lives in the table now.
    assert!(root.find_child(ElementKind::Attribute).is_none());
}

#[test]
fn rich_node_text_folds_into_text_attribute() {
    let (map, _) = decode_str(SAMPLE).expect("decode sample");
    let root = map.find_child(ElementKind::Node).expect("root node");
    let errands = root
        .children_of_kind(ElementKind::Node)
        .find(|n| n.text().contains("errands"))
        .expect("rich text node");
    assert!(errands.text().starts_with("<html>"));
    assert!(errands.find_child(ElementKind::NodeText).is_none());
}

#[test]
fn round_trip_is_byte_stable() {
    let (map, _) = decode_str(SAMPLE).expect("decode sample");
    let (encoded, warnings) = encode_string(&map).expect("encode sample");
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    assert_same(SAMPLE, &encoded);

    // Decoding the output again yields an equal element tree.
    let (again, warnings) = decode_str(&encoded).expect("re-decode");
    assert!(warnings.is_empty());
    assert_eq!(map, again);
}

#[test]
fn typed_attributes_round_trip_as_strings() {
    let doc = "<map version=\"freeplane 1.3.0\">\
               <node TEXT=\"hi\" FOLDED=\"true\"/>\
               </map>";
    let (map, _) = decode_str(doc).expect("decode");
    let root = map.find_child(ElementKind::Node).expect("root node");
    assert_eq!(root.attr("TEXT"), Some(&AttrValue::Text("hi".into())));
    assert_eq!(root.attr("FOLDED"), Some(&AttrValue::Bool(true)));

    let (encoded, _) = encode_string(&map).expect("encode");
    assert!(encoded.contains("<node TEXT=\"hi\" FOLDED=\"true\"/>"));
}

#[test]
fn discriminated_hooks_decode_to_their_subtype() {
    let doc = "<map version=\"freeplane 1.3.0\">\
               <node TEXT=\"r\"><hook NAME=\"AutomaticEdgeColor\" COUNTER=\"3\"/></node>\
               </map>";
    let (map, warnings) = decode_str(doc).expect("decode");
    assert!(warnings.is_empty());
    let root = map.find_child(ElementKind::Node).expect("root node");
    let hook = root
        .find_child(ElementKind::AutomaticEdgeColor)
        .expect("edge color hook");
    assert_eq!(hook.attr("COUNTER"), Some(&AttrValue::Int(3)));
    assert!(root.find_child(ElementKind::Hook).is_none());
}

#[test]
fn localized_text_becomes_text() {
    let doc = "<map version=\"freeplane 1.3.0\">\
               <node LOCALIZED_TEXT=\"new_mindmap\"/>\
               </map>";
    let (map, _) = decode_str(doc).expect("decode");
    let root = map.find_child(ElementKind::Node).expect("root node");
    assert_eq!(root.text(), "new_mindmap");
    assert!(root.attr("LOCALIZED_TEXT").is_none());
}

#[test]
fn encoded_map_carries_boilerplate_comment() {
    let mut map = Element::new(ElementKind::Map);
    let mut root = Element::new(ElementKind::Node);
    root.set_text("fresh");
    map.children.push(root);
    let (encoded, _) = encode_string(&map).expect("encode");
    assert!(encoded.starts_with("<map version=\"freeplane 1.3.0\">\n<!--"));
    assert!(encoded.contains("download free mind mapping software Freeplane"));
}

#[test]
fn map_requires_exactly_one_root_node() {
    let doc = "<map version=\"freeplane 1.3.0\">\
               <node TEXT=\"a\"/><node TEXT=\"b\"/>\
               </map>";
    let err = decode_str(doc).expect_err("two root nodes");
    assert!(matches!(err, Error::Convert(ConvertError::Structure(_))));

    let empty = Element::new(ElementKind::Map);
    let err = encode_string(&empty).expect_err("no root node");
    assert!(matches!(err, Error::Convert(ConvertError::Structure(_))));
}

#[test]
fn undeclared_tags_round_trip_verbatim() {
    let doc = "<map version=\"freeplane 1.3.0\">\
               <node TEXT=\"r\"><widget a=\"1\"/><widget a=\"2\"/></node>\
               </map>";
    let (map, warnings) = decode_str(doc).expect("decode");
    // One diagnostic per distinct tag, not per occurrence.
    assert_eq!(
        warnings,
        vec![Warning::NoVariant {
            tag: "widget".into()
        }]
    );
    let root = map.find_child(ElementKind::Node).expect("root node");
    let widgets: Vec<_> = root
        .children
        .iter()
        .filter(|c| c.kind == ElementKind::Unknown)
        .collect();
    assert_eq!(widgets.len(), 2);
    assert_eq!(widgets[0].tag, "widget");
    assert_eq!(widgets[0].attr("a"), Some(&AttrValue::Text("1".into())));

    let (encoded, _) = encode_string(&map).expect("encode");
    assert!(encoded.contains("<widget a=\"1\"/>"));
    assert!(encoded.contains("<widget a=\"2\"/>"));
}

#[test]
fn out_of_spec_values_warn_and_survive() {
    let doc = "<map version=\"freeplane 1.3.0\">\
               <node TEXT=\"r\"><font SIZE=\"huge\"/></node>\
               </map>";
    let (map, warnings) = decode_str(doc).expect("decode");
    assert_eq!(
        warnings,
        vec![Warning::OutOfSpec {
            tag: "font".into(),
            key: "SIZE".into(),
            value: "huge".into(),
        }]
    );
    let root = map.find_child(ElementKind::Node).expect("root node");
    let font = root.find_child(ElementKind::Font).expect("font");
    assert_eq!(font.attr("SIZE"), Some(&AttrValue::Text("huge".into())));

    let (encoded, _) = encode_string(&map).expect("encode");
    assert!(encoded.contains("SIZE=\"huge\""));
}

#[test]
fn automatic_edge_color_assigns_missing_edges() {
    let mut map = Element::new(ElementKind::Map);
    let mut root = Element::new(ElementKind::Node);
    root.set_text("root");
    let hook = Element::new(ElementKind::AutomaticEdgeColor);
    let mut a = Element::new(ElementKind::Node);
    a.set_text("a");
    let mut b = Element::new(ElementKind::Node);
    b.set_text("b");
    root.children = vec![hook, a, b];
    map.children.push(root);

    let converter = Converter::standard();
    let (generic, warnings) = converter.encode(&map).expect("encode");
    assert!(warnings.is_empty());
    let encoded = mindmap_core::xml::write_document(&generic).expect("write");
    assert!(encoded.contains("COLOR=\"#ff0000\""));
    assert!(encoded.contains("COLOR=\"#0000ff\""));
    assert!(encoded.contains("COUNTER=\"2\""));

    // Encode works on a clone; the caller's tree gains no edges.
    let root = map.find_child(ElementKind::Node).expect("root node");
    assert!(root
        .children_of_kind(ElementKind::Node)
        .all(|n| n.find_child(ElementKind::Edge).is_none()));
}

#[test]
fn fresh_nodes_get_generated_ids() {
    let a = Element::new(ElementKind::Node);
    let b = Element::new(ElementKind::Node);
    let id_a = a.attr("ID").and_then(AttrValue::as_str).expect("id");
    let id_b = b.attr("ID").and_then(AttrValue::as_str).expect("id");
    assert!(id_a.starts_with("ID_"));
    assert_ne!(id_a, id_b);
}
