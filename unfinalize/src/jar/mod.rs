//! Running the transformer over whole jar files
//!
//! The host normally feeds classes one at a time as it loads them. For
//! offline use the same [`ClassTransformer`] can be applied to every class
//! of a jar ahead of time:
//!
//! - `io`: reading a jar and writing the rewritten copy
//! - `types`: progress events and the per-jar report
//!
//! # Example Usage
//!
//! ```no_run
//! use unfinalize::{jar::transform_jar, transform::ClassTransformer};
//!
//! let transformer = ClassTransformer::default();
//! let report = transform_jar("in.jar", "out.jar", &transformer, |_| {})?;
//! println!("{} classes modified", report.classes_modified);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! [`ClassTransformer`]: crate::transform::ClassTransformer

pub mod io;
pub mod types;

// Re-export the most commonly used functionality for convenience
pub use io::{class_name_for_entry, transform_archive, transform_jar};
pub use types::{JarEvent, JarReport, Stage, StageProgress};
