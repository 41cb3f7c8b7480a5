pub mod convert;
pub mod element;
pub mod handlers;
pub mod node;
pub mod registry;
pub mod schema;
pub mod xml;

pub use convert::{ConvertError, Converter, Warning, Warnings};
pub use element::{AttrMap, AttrValue, Element, ElementKind};
pub use node::{GenericKind, GenericNode};
pub use registry::{HandlerDecl, Hook, HookOutcome, HookTable, Registry, RegistryError, Resolution};
pub use schema::{SpecEntry, VariantDecl};
pub use xml::{XmlError, XmlResult};

use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Xml(#[from] xml::XmlError),

    #[error(transparent)]
    Convert(#[from] convert::ConvertError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode a mind-map document from markup using the standard registry.
pub fn decode_str(xml_text: &str) -> Result<(Element, Vec<Warning>), Error> {
    let generic = xml::parse_document(xml_text)?;
    let (element, warnings) = Converter::standard().decode(&generic)?;
    Ok((element, warnings))
}

/// Encode an element tree back to markup using the standard registry.
pub fn encode_string(element: &Element) -> Result<(String, Vec<Warning>), Error> {
    let (generic, warnings) = Converter::standard().encode(element)?;
    let text = xml::write_document(&generic)?;
    Ok((text, warnings))
}

pub fn read(path: impl AsRef<Path>) -> Result<(Element, Vec<Warning>), Error> {
    let text = fs::read_to_string(path)?;
    decode_str(&text)
}

pub fn write(path: impl AsRef<Path>, element: &Element) -> Result<Vec<Warning>, Error> {
    let (text, warnings) = encode_string(element)?;
    fs::write(path, text)?;
    Ok(warnings)
}
