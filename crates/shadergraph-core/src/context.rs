//! Scene-level settings the passes consult.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What an AOV pass stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AovKind {
    Color,
    Value,
}

/// Read-only scene state handed to `simplify` and `finalize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneContext {
    /// AOV passes registered with the film, by name.
    #[serde(default)]
    pub aovs: IndexMap<String, AovKind>,
}

impl SceneContext {
    pub fn with_aov(mut self, name: impl Into<String>, kind: AovKind) -> Self {
        self.aovs.insert(name.into(), kind);
        self
    }

    pub fn aov(&self, name: &str) -> Option<AovKind> {
        self.aovs.get(name).copied()
    }
}
