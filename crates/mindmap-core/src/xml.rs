// crates/mindmap-core/src/xml.rs
//
// quick-xml 0.38.4 compatible boundary between raw markup and the generic
// node tree. The reader builds GenericNodes with an explicit open-element
// stack; the writer walks the tree with an explicit frame stack. Neither
// side recurses, so document depth never threatens the call stack.
//
// Text policy:
// - DO NOT globally trim text events; formatting whitespace is captured
//   into leading_text/trailing_text and round-trips byte-for-byte
// - leading_text is the run between a start tag and the first child,
//   trailing_text the run between an end tag and the next sibling
// - comments are kept as nodes so boilerplate survives a round-trip

use std::str;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::node::GenericNode;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("utf8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("utf8 error: {0}")]
    FromUtf8(#[from] std::string::FromUtf8Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    #[error("escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("write error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected structure: {0}")]
    Structure(String),
}

pub type XmlResult<T> = Result<T, XmlError>;

/// Parse a whole document: exactly one root element, with any comments and
/// surrounding whitespace preserved on the tree.
pub fn parse_document(xml: &str) -> XmlResult<GenericNode> {
    let nodes = parse_nodes(xml)?;
    let mut roots = nodes.into_iter().filter(|n| !n.is_comment());
    let root = roots
        .next()
        .ok_or_else(|| XmlError::Structure("no root element found".into()))?;
    if roots.next().is_some() {
        return Err(XmlError::Structure(
            "more than one root element found".into(),
        ));
    }
    Ok(root)
}

/// Parse a markup fragment: zero or more sibling elements and comments,
/// as stored rich content holds them.
pub fn parse_fragment(xml: &str) -> XmlResult<Vec<GenericNode>> {
    parse_nodes(xml)
}

fn parse_nodes(xml: &str) -> XmlResult<Vec<GenericNode>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut roots: Vec<GenericNode> = Vec::new();
    let mut stack: Vec<GenericNode> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                stack.push(node_from_start(&e)?);
            }
            Event::Empty(e) => {
                let node = node_from_start(&e)?;
                attach(&mut stack, &mut roots, node);
            }
            Event::End(_) => {
                // quick-xml checks tag balance; an End event always closes
                // the innermost open element.
                let node = stack.pop().ok_or_else(|| {
                    XmlError::Structure("closing tag with no open element".into())
                })?;
                attach(&mut stack, &mut roots, node);
            }
            Event::Text(t) => {
                let raw = t.decode()?.into_owned();
                let txt = quick_xml::escape::unescape(&raw)?.into_owned();
                append_text(&mut stack, &mut roots, &txt)?;
            }
            Event::CData(c) => {
                let txt = c.decode()?.into_owned();
                append_text(&mut stack, &mut roots, &txt)?;
            }
            Event::Comment(c) => {
                let body = c.decode()?.into_owned();
                attach(&mut stack, &mut roots, GenericNode::comment(body));
            }
            // quick-xml reports entity references in text as separate
            // events; fold them back into the surrounding text run.
            Event::GeneralRef(r) => {
                let resolved = match r.resolve_char_ref()? {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = r.decode()?;
                        resolve_entity(&name)
                            .ok_or_else(|| {
                                XmlError::Structure(format!("unknown entity reference &{name};"))
                            })?
                            .to_string()
                    }
                };
                append_text(&mut stack, &mut roots, &resolved)?;
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(XmlError::Structure("unclosed element at end of input".into()));
    }
    Ok(roots)
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => None,
    }
}

fn node_from_start(e: &BytesStart<'_>) -> XmlResult<GenericNode> {
    let mut node = GenericNode::new(str::from_utf8(e.name().as_ref())?.to_string());
    for a in e.attributes() {
        let a = a?;
        let key = str::from_utf8(a.key.as_ref())?.to_string();
        let val = a.unescape_value()?.to_string();
        node.attributes.insert(key, val);
    }
    Ok(node)
}

fn attach(stack: &mut [GenericNode], roots: &mut Vec<GenericNode>, node: GenericNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn append_text(
    stack: &mut [GenericNode],
    roots: &mut Vec<GenericNode>,
    txt: &str,
) -> XmlResult<()> {
    if let Some(open) = stack.last_mut() {
        match open.children.last_mut() {
            Some(last_child) => last_child.trailing_text.push_str(txt),
            None => open.leading_text.push_str(txt),
        }
        return Ok(());
    }
    match roots.last_mut() {
        Some(last) => last.trailing_text.push_str(txt),
        None if txt.trim().is_empty() => {}
        None => {
            return Err(XmlError::Structure(
                "text content before the first element".into(),
            ));
        }
    }
    Ok(())
}

/// Serialize a document tree. No XML declaration is emitted; the format
/// being produced starts directly at its root element.
pub fn write_document(root: &GenericNode) -> XmlResult<String> {
    let mut writer = Writer::new(Vec::new());
    write_node(&mut writer, root)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Serialize one node (and its trailing text) as a standalone fragment.
pub fn write_fragment(node: &GenericNode) -> XmlResult<String> {
    let mut writer = Writer::new(Vec::new());
    write_node(&mut writer, node)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

enum Frame<'a> {
    Open(&'a GenericNode),
    Close(&'a GenericNode),
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &GenericNode) -> XmlResult<()> {
    let mut stack = vec![Frame::Open(node)];
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Open(n) if n.is_comment() => {
                // Comment bodies are emitted verbatim, not escaped.
                writer.write_event(Event::Comment(BytesText::from_escaped(
                    n.leading_text.as_str(),
                )))?;
                write_text(writer, &n.trailing_text)?;
            }
            Frame::Open(n) => {
                let mut start = BytesStart::new(n.tag.as_str());
                for (key, value) in &n.attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if n.children.is_empty() && n.leading_text.is_empty() {
                    writer.write_event(Event::Empty(start))?;
                    write_text(writer, &n.trailing_text)?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    write_text(writer, &n.leading_text)?;
                    stack.push(Frame::Close(n));
                    for child in n.children.iter().rev() {
                        stack.push(Frame::Open(child));
                    }
                }
            }
            Frame::Close(n) => {
                writer.write_event(Event::End(BytesEnd::new(n.tag.as_str())))?;
                write_text(writer, &n.trailing_text)?;
            }
        }
    }
    Ok(())
}

fn write_text(writer: &mut Writer<Vec<u8>>, text: &str) -> XmlResult<()> {
    if !text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    Ok(())
}
