use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

pub const BLOCKS_CLASS: &str = "net.minecraft.init.Blocks";
pub const ITEMS_CLASS: &str = "net.minecraft.init.Items";
pub const OBJECT_HOLDER_MARKER: &str = "cpw/mods/fml/common/registry/GameRegistry/ObjectHolder";
pub const ITEM_STACK_HOLDER_MARKER: &str =
    "cpw/mods/fml/common/registry/GameRegistry/ItemStackHolder";

/// How annotation descriptors are compared with the marker fragments.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchMode {
    /// The descriptor contains the fragment anywhere.
    #[default]
    Substring,
    /// The descriptor names exactly the fragment's type, treating `$` and
    /// `/` as the same separator.
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Dotted class names whose fields are all unfinalized.
    pub forced_classes: Vec<String>,
    pub object_holder_marker: String,
    pub item_stack_holder_marker: String,
    pub match_mode: MatchMode,
    /// Run the enum-extensibility rule.
    pub extensible_enums: bool,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            forced_classes: vec![BLOCKS_CLASS.to_owned(), ITEMS_CLASS.to_owned()],
            object_holder_marker: OBJECT_HOLDER_MARKER.to_owned(),
            item_stack_holder_marker: ITEM_STACK_HOLDER_MARKER.to_owned(),
            match_mode: MatchMode::Substring,
            extensible_enums: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid transformer config: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransformerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }
}
