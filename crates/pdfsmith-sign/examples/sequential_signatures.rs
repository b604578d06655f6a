//! Applies two signatures to the same document, one after the other.
//!
//! Each pass rewrites the file, so only the most recent signature still
//! covers the bytes on disk. The verification report shows both fields
//! with their current digest status.
//!
//! Usage: cargo run --example sequential_signatures -- [output.pdf]

use anyhow::Result;
use pdfsmith_core::{DocumentBuilder, DocumentInfo, PageSize, StandardFont};
use pdfsmith_sign::{read_signatures, EphemeralIdentity, PdfSigner, SignatureOptions};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "twice_signed.pdf".to_string());

    let mut builder = DocumentBuilder::new("1.7");
    builder.set_info(DocumentInfo::new().title("Countersigned Agreement"));
    let font = builder.add_font(StandardFont::Helvetica);
    let page = builder.add_page(PageSize::A4);
    builder.add_text(page, font, 14.0, 72.0, 770.0, "Agreement between Alice and Bob")?;
    let document = builder.finish()?;

    let alice = EphemeralIdentity::generate("Alice");
    let once = PdfSigner::new(
        &alice,
        SignatureOptions::new()
            .field_name("AliceSignature")
            .reason("Author"),
    )
    .sign(&document)?;

    let bob = EphemeralIdentity::generate("Bob");
    let twice = PdfSigner::new(
        &bob,
        SignatureOptions::new()
            .field_name("BobSignature")
            .reason("Countersignature"),
    )
    .sign(&once)?;

    std::fs::write(&output, &twice)?;

    for sig in read_signatures(&twice)? {
        println!(
            "{}: digest intact: {}, covers whole file: {}",
            sig.field_name, sig.digest_intact, sig.covers_whole_document
        );
    }
    println!("Wrote {}", output);
    Ok(())
}
