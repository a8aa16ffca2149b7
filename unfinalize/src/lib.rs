//! Load-time class rewriting for holder fields and extensible enums
//!
//! A [`ClassTransformer`] takes the bytes of one class as the host loads it
//! and hands back either the same bytes or a rewritten class:
//!
//! - fields injected after registration (holder fields, and every field of
//!   the allow-listed registry classes) lose their `final` flag;
//! - enum classes get public constructors, a non-final values array and a
//!   synthetic `$addEnumValue` method so constants can be added later.
//!
//! The crate is organised bottom-up:
//!
//! - `classfile`: class container reader, writer and model
//! - `matcher`: allow-list and annotation-marker predicates
//! - `transform`: the rules and the per-class pass
//! - `jar`: applying the pass to a whole jar
//! - `config` / `summary`: settings and a serializable class overview

pub mod classfile;
pub mod config;
pub mod jar;
pub mod matcher;
pub mod summary;
pub mod transform;

// Re-export commonly used items
pub use config::TransformerConfig;
pub use matcher::{HolderMarker, HolderMatcher};
pub use transform::{ClassTransformer, Mutation, Mutations, TransformError, TransformResult};
