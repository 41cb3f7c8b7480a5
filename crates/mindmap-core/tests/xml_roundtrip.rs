// Generic boundary tests: markup to GenericNode trees and back, with
// whitespace, comments and escaping preserved.

use mindmap_core::xml::{XmlError, parse_document, parse_fragment, write_document, write_fragment};

#[test]
fn document_maps_text_runs_onto_nodes() {
    let doc = "<a x=\"1\" y=\"2\">\n<b>inner</b>\ntail\n</a>\n";
    let root = parse_document(doc).expect("parse");
    assert_eq!(root.tag, "a");
    assert_eq!(root.attr("x"), Some("1"));
    assert_eq!(root.attr("y"), Some("2"));
    assert_eq!(root.leading_text, "\n");
    assert_eq!(root.trailing_text, "\n");

    let b = &root.children[0];
    assert_eq!(b.leading_text, "inner");
    assert_eq!(b.trailing_text, "\ntail\n");

    assert_eq!(write_document(&root).expect("write"), doc);
}

#[test]
fn attribute_order_is_preserved() {
    let doc = "<a zeta=\"1\" alpha=\"2\" mid=\"3\"/>";
    let root = parse_document(doc).expect("parse");
    let keys: Vec<_> = root.attributes.keys().cloned().collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    assert_eq!(write_document(&root).expect("write"), doc);
}

#[test]
fn comments_survive_a_round_trip() {
    let doc = "<a>\n<!--note to self-->\n<b/>\n</a>\n";
    let root = parse_document(doc).expect("parse");
    assert!(root.children[0].is_comment());
    assert_eq!(root.children[0].leading_text, "note to self");
    assert_eq!(write_document(&root).expect("write"), doc);
}

#[test]
fn escaped_content_round_trips() {
    let doc = "<a name=\"q&amp;a\">x &lt; y &amp; z</a>";
    let root = parse_document(doc).expect("parse");
    assert_eq!(root.attr("name"), Some("q&a"));
    assert_eq!(root.leading_text, "x < y & z");
    let out = write_document(&root).expect("write");
    let again = parse_document(&out).expect("reparse");
    assert_eq!(root, again);
}

#[test]
fn empty_elements_stay_self_closing() {
    let doc = "<a><b/><c></c></a>";
    let root = parse_document(doc).expect("parse");
    // <c></c> carries no text, so it collapses to the self-closing form.
    assert_eq!(write_document(&root).expect("write"), "<a><b/><c/></a>");
}

#[test]
fn fragments_hold_sibling_nodes() {
    let markup = "<html>\n<body>\n<p>one</p>\n</body>\n</html>\n<notes/>\n";
    let nodes = parse_fragment(markup).expect("parse fragment");
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].tag, "html");
    assert_eq!(nodes[1].tag, "notes");

    let rebuilt: String = nodes
        .iter()
        .map(|n| write_fragment(n).expect("write fragment"))
        .collect();
    assert_eq!(rebuilt, markup);
}

#[test]
fn structural_errors_are_reported() {
    let err = parse_document("<a/><b/>").expect_err("two roots");
    assert!(matches!(err, XmlError::Structure(_)));

    let err = parse_document("   ").expect_err("no root");
    assert!(matches!(err, XmlError::Structure(_)));

    assert!(parse_document("<a><b></a>").is_err());
}
