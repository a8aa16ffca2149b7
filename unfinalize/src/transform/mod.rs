//! The per-class transform pass
//!
//! [`ClassTransformer`] is built once from a [`TransformerConfig`] and then
//! called for every class the host loads. Each call parses the bytes into a
//! private [`ClassModel`], runs the holder-field rule and the enum rule, and
//! serializes only when one of them changed something.

use std::borrow::Cow;

use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, IntoStaticStr};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
    classfile::{self, ClassFileError, ClassModel},
    config::TransformerConfig,
    matcher::HolderMatcher,
};

pub mod bytecode;
pub mod enums;
pub mod unfinalize;

// Re-export commonly used items
pub use enums::{make_extensible, EnumPatch, EnumShape};
pub use unfinalize::unfinalize_holder_fields;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("malformed class container: {0}")]
    MalformedContainer(#[from] ClassFileError),
    #[error("mutation of {class} left it inconsistent: {reason}")]
    InconsistentMutation { class: String, reason: String },
}

/// The kinds of edit the pass makes, for reports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Mutation {
    HolderFieldUnfinalized,
    EnumValuesUnfinalized,
    EnumConstructorOpened,
    EnumAppendMethodAdded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutations {
    pub holder_fields: usize,
    pub enum_patch: EnumPatch,
}

impl Mutations {
    pub fn count(&self, mutation: Mutation) -> usize {
        match mutation {
            Mutation::HolderFieldUnfinalized => self.holder_fields,
            Mutation::EnumValuesUnfinalized => self.enum_patch.values_unfinalized as usize,
            Mutation::EnumConstructorOpened => self.enum_patch.constructors_opened,
            Mutation::EnumAppendMethodAdded => self.enum_patch.append_method_added as usize,
        }
    }

    pub fn total(&self) -> usize {
        Mutation::iter().map(|mutation| self.count(mutation)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Non-zero counts, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Mutation, usize)> + '_ {
        Mutation::iter()
            .map(|mutation| (mutation, self.count(mutation)))
            .filter(|(_, count)| *count > 0)
    }
}

impl Serialize for Mutations {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        for (mutation, count) in self.iter() {
            map.serialize_entry(<&'static str>::from(mutation), &count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformResult {
    /// Nothing to do. The caller keeps its original bytes.
    Unchanged,
    Modified { bytes: Vec<u8>, mutations: Mutations },
}

impl TransformResult {
    pub fn mutation_count(&self) -> usize {
        match self {
            TransformResult::Unchanged => 0,
            TransformResult::Modified { mutations, .. } => mutations.total(),
        }
    }

    pub fn is_modified(&self) -> bool {
        matches!(self, TransformResult::Modified { .. })
    }
}

/// Rewrites holder fields and enum classes. Holds only read-only
/// configuration, so one instance can serve any number of loading threads.
#[derive(Debug)]
pub struct ClassTransformer {
    matcher: HolderMatcher,
    extensible_enums: bool,
}

impl Default for ClassTransformer {
    fn default() -> Self {
        Self::new(&TransformerConfig::default())
    }
}

impl ClassTransformer {
    pub fn new(config: &TransformerConfig) -> Self {
        Self {
            matcher: HolderMatcher::new(config),
            extensible_enums: config.extensible_enums,
        }
    }

    pub fn with_matcher(matcher: HolderMatcher, extensible_enums: bool) -> Self {
        Self {
            matcher,
            extensible_enums,
        }
    }

    pub fn matcher(&self) -> &HolderMatcher {
        &self.matcher
    }

    /// Loader-facing entry point.
    ///
    /// `name` is the raw name the loader asked for, `transformed_name` the
    /// dotted deobfuscated one the rules match on. Returns `None` for `None`,
    /// the original slice when nothing changed or anything went wrong, and
    /// freshly serialized bytes otherwise. Never fails.
    pub fn transform<'a>(
        &self,
        name: &str,
        transformed_name: &str,
        bytes: Option<&'a [u8]>,
    ) -> Option<Cow<'a, [u8]>> {
        let bytes = bytes?;
        Some(match self.transform_or_original(name, transformed_name, bytes) {
            TransformResult::Unchanged => Cow::Borrowed(bytes),
            TransformResult::Modified { bytes, .. } => Cow::Owned(bytes),
        })
    }

    /// Like [`Self::transform`] for present bytes, keeping the mutation
    /// counts. Errors are logged and turn into `Unchanged`.
    pub fn transform_or_original(
        &self,
        name: &str,
        transformed_name: &str,
        bytes: &[u8],
    ) -> TransformResult {
        match self.transform_class(transformed_name, bytes) {
            Ok(result) => result,
            Err(err) => {
                log_failure(name, transformed_name, &err);
                TransformResult::Unchanged
            }
        }
    }

    /// The pass itself, with errors surfaced.
    pub fn transform_class(
        &self,
        transformed_name: &str,
        bytes: &[u8],
    ) -> Result<TransformResult, TransformError> {
        let mut class = classfile::parse(bytes)?;
        let mutations = self.apply(&mut class, transformed_name)?;
        if mutations.is_empty() {
            debug!("No changes to {}", transformed_name);
            return Ok(TransformResult::Unchanged);
        }

        class
            .validate()
            .map_err(|err| TransformError::InconsistentMutation {
                class: transformed_name.to_owned(),
                reason: err.to_string(),
            })?;
        let bytes = classfile::writer::write_class(&class)?;
        Ok(TransformResult::Modified { bytes, mutations })
    }

    /// Runs both rules on an already parsed model.
    pub fn apply(
        &self,
        class: &mut ClassModel,
        transformed_name: &str,
    ) -> Result<Mutations, TransformError> {
        let mut mutations = Mutations::default();

        mutations.holder_fields = unfinalize_holder_fields(class, transformed_name, &self.matcher)?;
        if mutations.holder_fields > 0 {
            info!(
                "Unfinalized {} Holder fields in {}",
                mutations.holder_fields, transformed_name
            );
        }

        if self.extensible_enums {
            mutations.enum_patch = make_extensible(class)?;
            if !mutations.enum_patch.is_empty() {
                info!("Dynamicized enum {}", transformed_name);
            }
        }

        Ok(mutations)
    }
}

pub(crate) fn log_failure(name: &str, transformed_name: &str, err: &TransformError) {
    error!(
        "Error when unfinalizing ObjectHolder transformer for {} ({}): {}",
        transformed_name, name, err
    );
}
