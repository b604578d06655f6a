//! Reference-output comparison for generated PDFs
//!
//! Sample programs write a document and check it against a reference
//! file stored next to it. The comparisons here report every difference
//! they find rather than stopping at the first one.
//!
//! # Example
//!
//! ```no_run
//! use compare_harness::{fixtures, CompareTool};
//!
//! # fn example(output: &[u8]) -> anyhow::Result<()> {
//! let dest = "out/hello.pdf";
//! fixtures::ensure_parent_dir(dest)?;
//! std::fs::write(dest, output)?;
//!
//! let reference = std::fs::read(fixtures::cmp_path_for(dest))?;
//! let report = CompareTool::compare_by_content(output, &reference)?;
//! assert!(report.is_match(), "{}", report);
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod error;
pub mod fixtures;
pub mod report;

pub use compare::CompareTool;
pub use error::CompareError;
pub use report::CompareReport;
