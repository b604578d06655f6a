//! Prints the datasets packet of an XFA form, pretty-printed, along with
//! the AcroForm field values.
//!
//! Usage: cargo run --example read_xfa -- form.pdf [node]

use anyhow::{Context, Result};
use pdfsmith_forms::{find_node, pretty_print, read_fields, FormError, XfaForm};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: read_xfa <form.pdf> [node]")?;
    let node = args.next();

    let pdf = std::fs::read(&path).with_context(|| format!("reading {}", path))?;

    for field in read_fields(&pdf)? {
        println!(
            "{} ({:?}): {}",
            field.name,
            field.kind,
            field.value.as_deref().unwrap_or("<empty>")
        );
    }

    match XfaForm::from_pdf(&pdf) {
        Ok(xfa) => {
            let datasets = xfa
                .datasets()
                .or_else(|| xfa.packet("xdp"))
                .context("XFA form has no datasets packet")?;
            match node {
                Some(name) => match find_node(datasets, &name)? {
                    Some(subtree) => println!("{}", subtree),
                    None => println!("No element named {}", name),
                },
                None => println!("{}", pretty_print(datasets)?),
            }
        }
        Err(FormError::NoXfa) => println!("Document has no XFA form"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
