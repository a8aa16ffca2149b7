//! Type definitions for the jar pass
//!
//! Progress events are reported while a jar is rewritten, and a
//! [`JarReport`] sums up what happened once it is done.

pub mod progress;
pub mod report;

// Re-export commonly used types for convenience
pub use progress::{JarEvent, Stage, StageProgress};
pub use report::JarReport;
