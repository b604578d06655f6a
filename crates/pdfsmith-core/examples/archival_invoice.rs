//! Builds a PDF/A-2b style invoice with an sRGB output intent and XMP
//! metadata.
//!
//! Usage: cargo run --example archival_invoice -- <srgb.icc> [output.pdf]

use anyhow::{Context, Result};
use pdfsmith_core::{
    ArchivalProfile, DocumentBuilder, DocumentInfo, OutputIntent, PageSize, StandardFont,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let icc_path = args
        .next()
        .context("usage: archival_invoice <srgb.icc> [output.pdf]")?;
    let output = args.next().unwrap_or_else(|| "invoice.pdf".to_string());

    let icc_profile = std::fs::read(&icc_path)
        .with_context(|| format!("reading ICC profile {}", icc_path))?;

    let mut builder = DocumentBuilder::new("1.7");
    builder.set_info(
        DocumentInfo::new()
            .title("Invoice 2026-001")
            .author("Acme GmbH"),
    );
    builder.set_archival_profile(ArchivalProfile::a2b(OutputIntent::srgb(icc_profile)));

    let helvetica = builder.add_font(StandardFont::Helvetica);
    let bold = builder.add_font(StandardFont::HelveticaBold);

    let page = builder.add_page(PageSize::A4);
    builder.add_text(page, bold, 18.0, 72.0, 780.0, "Invoice 2026-001")?;
    builder.add_text(page, helvetica, 12.0, 72.0, 750.0, "Acme GmbH")?;
    builder.add_text(page, helvetica, 12.0, 72.0, 700.0, "1x Widget ........ 49.00 EUR")?;
    builder.add_text(page, helvetica, 12.0, 72.0, 684.0, "VAT 19% .......... 9.31 EUR")?;
    builder.add_text(page, bold, 12.0, 72.0, 660.0, "Total ............ 58.31 EUR")?;

    builder.save(&output)?;
    println!("Wrote {}", output);
    Ok(())
}
