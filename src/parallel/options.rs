//! Plugin configuration

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::errors::{ParallelError, Result};
use crate::dom::SelectorList;
use crate::visit::AnimationPhase;

/// How many previous generations of a container to retain after a swap
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keep {
    Count(i64),
    PerSelector(HashMap<String, i64>),
}

impl Default for Keep {
    fn default() -> Self {
        Keep::Count(0)
    }
}

impl Keep {
    /// Retention count for a selector. Negative and missing entries count as 0.
    pub fn for_selector(&self, selector: &str) -> usize {
        let count = match self {
            Keep::Count(count) => *count,
            Keep::PerSelector(counts) => counts.get(selector).copied().unwrap_or(0),
        };
        count.max(0) as usize
    }
}

/// Options for [`ParallelPlugin`](crate::parallel::ParallelPlugin)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginOptions {
    /// Containers to animate in parallel. Empty means all engine containers.
    pub containers: Vec<String>,
    pub keep: Keep,
    /// Phase whose await is skipped on parallel visits
    pub animation_phase: AnimationPhase,
    /// Carry the outgoing container's scroll offset over to the incoming one
    pub preserve_scroll: bool,
}

impl PluginOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| ParallelError::serialization("json", e))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let options: Self =
            serde_yaml::from_str(yaml).map_err(|e| ParallelError::serialization("yaml", e))?;
        options.validate()?;
        Ok(options)
    }

    /// Check that every configured container is a usable selector
    pub fn validate(&self) -> Result<()> {
        for selector in &self.containers {
            if selector.trim().is_empty() {
                return Err(ParallelError::configuration_field(
                    "container selector must not be empty",
                    "containers",
                ));
            }
            SelectorList::parse(selector)?;
        }
        Ok(())
    }

    pub fn with_containers<S: Into<String>>(mut self, containers: impl IntoIterator<Item = S>) -> Self {
        self.containers = containers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keep(mut self, keep: i64) -> Self {
        self.keep = Keep::Count(keep);
        self
    }

    /// Set the retention count for one selector, switching to per-selector counts
    pub fn with_keep_for(mut self, selector: impl Into<String>, keep: i64) -> Self {
        match &mut self.keep {
            Keep::PerSelector(counts) => {
                counts.insert(selector.into(), keep);
            }
            Keep::Count(_) => {
                self.keep = Keep::PerSelector(HashMap::from([(selector.into(), keep)]));
            }
        }
        self
    }

    pub fn with_animation_phase(mut self, phase: AnimationPhase) -> Self {
        self.animation_phase = phase;
        self
    }

    pub fn with_preserve_scroll(mut self, preserve: bool) -> Self {
        self.preserve_scroll = preserve;
        self
    }
}
