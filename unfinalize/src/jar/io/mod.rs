//! Reading and rewriting jar files
//!
//! Every `.class` entry goes through a [`ClassTransformer`]; everything
//! else, and every class the transformer leaves alone, is copied raw so its
//! compressed bytes and metadata survive untouched.
//!
//! [`ClassTransformer`]: crate::transform::ClassTransformer

pub mod writer;

// Re-export commonly used I/O functionality
pub use writer::{class_name_for_entry, transform_archive, transform_jar};
