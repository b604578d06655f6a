//! PDF document assembly
//!
//! This crate builds PDF documents from scratch using lopdf: pages, text in
//! built-in or embedded TrueType fonts, JPEG and PNG images, document
//! metadata, and archival (PDF/A-style) output intents.
//!
//! Typical flow: create a [`DocumentBuilder`], register fonts and images,
//! place content on pages, then [`DocumentBuilder::finish`] or
//! [`DocumentBuilder::save`].

pub mod archival;
pub mod builder;
pub mod error;
pub mod fonts;
pub mod images;
pub mod page;

pub use archival::{ArchivalProfile, OutputIntent};
pub use builder::{DocumentBuilder, FontId, ImageId};
pub use error::CoreError;
pub use fonts::{Font, StandardFont, TrueTypeFont};
pub use images::{ColorSpace, ImageData};
pub use page::{DocumentInfo, PageSize};
