use std::fs;
use std::path::PathBuf;

use mindmap_core::{Converter, Element, Warning, xml};
use serde::Serialize;

#[derive(Serialize)]
struct DumpReport {
    element: Element,
    warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reencoded: Option<String>,
}

fn run() -> Result<(), mindmap_core::Error> {
    let mut args = std::env::args().skip(1);
    let mut reencode = false;
    let mut path: Option<PathBuf> = None;
    for arg in args.by_ref() {
        if arg == "--reencode" {
            reencode = true;
        } else {
            path = Some(PathBuf::from(arg));
        }
    }
    let Some(path) = path else {
        eprintln!("usage: mm_dump [--reencode] <file.mm>");
        std::process::exit(2);
    };

    let text = fs::read_to_string(&path)?;
    let generic = xml::parse_document(&text)?;
    let converter = Converter::standard();
    let (element, warnings) = converter.decode(&generic)?;

    let reencoded = if reencode {
        let (generic_out, _) = converter.encode(&element)?;
        Some(xml::write_document(&generic_out)?)
    } else {
        None
    };

    let report = DumpReport {
        element,
        warnings,
        reencoded,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("error: failed to serialize report: {err}");
            std::process::exit(1);
        }
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
