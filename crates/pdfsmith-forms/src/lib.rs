//! AcroForm and XFA form data access
//!
//! Reads and fills interactive form fields (AcroForm) and extracts the
//! XML packets of XFA forms. Field names are fully qualified with dots,
//! matching how nested field hierarchies are addressed.

pub mod error;
pub mod fields;
pub mod xfa;

pub use error::FormError;
pub use fields::{fill_text_field, read_fields, FieldKind, FormField};
pub use xfa::{find_node, pretty_print, XfaForm};
