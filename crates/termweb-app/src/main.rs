//! `termweb-dump`: render a document at a fixed width and print it.
//!
//! Reads an HTML or plain-text file (or stdin), lays it out with the
//! termweb core, and prints the buffer followed by numbered link and
//! image lists. Set `RUST_LOG=debug` to see render-pass summaries.

mod args;

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

use args::{Args, USAGE};
use termweb_core::{Document, Reference, RenderConfig, SourceKind};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    let columns = args.width.unwrap_or(config.columns);
    let kind = if args.is_plain() {
        SourceKind::PlainText
    } else {
        SourceKind::Html
    };

    let uri = args
        .base
        .clone()
        .or_else(|| args.input.as_deref().and_then(file_uri));
    let reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let mut doc = Document::from_reader(reader, kind, uri.as_deref(), config)?;
    doc.redraw(columns);
    log::info!("rendered {} lines at {} columns", doc.lines().len(), doc.columns());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    dump(&doc, &mut out)?;
    out.flush()?;
    Ok(())
}

/// `file://` URI of an existing path, used as the default base.
fn file_uri(path: &Path) -> Option<String> {
    let absolute = std::fs::canonicalize(path).ok()?;
    Some(format!("file://{}", absolute.to_string_lossy()))
}

/// Write the buffer, then the link and image lists.
fn dump(doc: &Document, out: &mut impl Write) -> io::Result<()> {
    if let Some(title) = doc.title() {
        writeln!(out, "{title}")?;
        writeln!(out)?;
    }
    for line in doc.lines() {
        writeln!(out, "{}", line.text())?;
    }
    write_references(out, "Links", doc.links())?;
    write_references(out, "Images", doc.images())?;
    Ok(())
}

fn write_references(out: &mut impl Write, heading: &str, refs: &[Reference]) -> io::Result<()> {
    if refs.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{heading}:")?;
    for (i, reference) in refs.iter().enumerate() {
        writeln!(out, "{:>4}. {}", i + 1, reference.url)?;
    }
    Ok(())
}
