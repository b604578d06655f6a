//! Builds a one-page Hello World document.
//!
//! Usage: cargo run --example simple_document -- [output.pdf]

use anyhow::Result;
use pdfsmith_core::{DocumentBuilder, DocumentInfo, PageSize, StandardFont};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hello_world.pdf".to_string());

    let mut builder = DocumentBuilder::new("1.7");
    builder.set_info(
        DocumentInfo::new()
            .title("Hello World")
            .author("pdfsmith")
            .creator("simple_document example"),
    );

    let helvetica = builder.add_font(StandardFont::Helvetica);
    let bold = builder.add_font(StandardFont::HelveticaBold);

    let page = builder.add_page(PageSize::A4);
    builder.add_text(page, bold, 24.0, 72.0, 770.0, "Hello World")?;
    builder.add_paragraph(
        page,
        helvetica,
        12.0,
        72.0,
        730.0,
        450.0,
        16.0,
        "This document was assembled from scratch: a page, two standard \
         fonts, and a word-wrapped paragraph. Open it in any viewer to \
         check the layout.",
    )?;

    builder.save(&output)?;
    println!("Wrote {}", output);
    Ok(())
}
