//! Artifact kinds produced by the external pipeline stages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An artifact a record may reference.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Translated script file
    Script,
    /// Rendered video file
    Video,
    /// Thumbnail image
    Thumbnail,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Script => "script",
            AssetKind::Video => "video",
            AssetKind::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
