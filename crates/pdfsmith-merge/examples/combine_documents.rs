//! Merges PDF files given on the command line into one document.
//!
//! Usage: cargo run --example combine_documents -- out.pdf a.pdf b.pdf ...

use anyhow::{Context, Result};
use pdfsmith_merge::{get_page_count, merge_documents};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let output = args
        .next()
        .context("usage: combine_documents <out.pdf> <in.pdf>...")?;

    let mut documents = Vec::new();
    for path in args {
        let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path))?;
        println!("{}: {} pages", path, get_page_count(&bytes)?);
        documents.push(bytes);
    }

    let merged = merge_documents(documents)?;
    println!("merged: {} pages", get_page_count(&merged)?);
    std::fs::write(&output, merged).with_context(|| format!("writing {}", output))?;
    println!("Wrote {}", output);
    Ok(())
}
