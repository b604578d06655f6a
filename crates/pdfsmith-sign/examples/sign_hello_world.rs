//! Builds a small document, signs it with a freshly generated key, and
//! verifies the result.
//!
//! Usage: cargo run --example sign_hello_world -- [output.pdf]

use anyhow::Result;
use pdfsmith_core::{DocumentBuilder, DocumentInfo, PageSize, StandardFont};
use pdfsmith_sign::{read_signatures, EphemeralIdentity, PdfSigner, SignatureOptions};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hello_signed.pdf".to_string());

    let mut builder = DocumentBuilder::new("1.7");
    builder.set_info(DocumentInfo::new().title("Signed Hello World"));
    let font = builder.add_font(StandardFont::Helvetica);
    let page = builder.add_page(PageSize::A4);
    builder.add_text(page, font, 16.0, 72.0, 770.0, "Hello World")?;
    let document = builder.finish()?;

    let identity = EphemeralIdentity::generate("Alice Example");
    let options = SignatureOptions::new()
        .field_name("Signature1")
        .reason("I approve this document")
        .location("Ghent")
        .placement(1, [400.0, 720.0, 150.0, 60.0]);

    let signed = PdfSigner::new(&identity, options).sign(&document)?;
    std::fs::write(&output, &signed)?;

    for sig in read_signatures(&signed)? {
        println!(
            "{}: signed by {:?}, digest intact: {}, covers whole file: {}",
            sig.field_name, sig.signer_name, sig.digest_intact, sig.covers_whole_document
        );
    }
    println!("Wrote {}", output);
    Ok(())
}
