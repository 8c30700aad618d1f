//! The visit record passed through every lifecycle hook
//!
//! A visit is created by the engine when navigation starts and dropped once
//! `visit:end` has run. Field ownership by stage:
//!
//! - `animation.parallel` may be set by integrator hooks before `visit:start`
//!   completes; the parallel plugin writes it once, during `visit:start`.
//! - `animation.wait` is written by the plugin during `visit:start` only.
//! - `containers` may be narrowed during `content:replace` and must be restored
//!   before that hook's `on` handlers see it.
//! - `to.document` is written by the engine between `visit:start` and
//!   `animation:out:await`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dom::Document;

/// Animation phase the engine can await
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPhase {
    In,
    #[default]
    Out,
}

impl fmt::Display for AnimationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationPhase::In => write!(f, "in"),
            AnimationPhase::Out => write!(f, "out"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitAnimation {
    /// Whether any animation runs for this visit
    pub animate: bool,
    /// Unset: auto-detect. `Some(false)`: disabled by the caller. `Some(true)`: parallel.
    pub parallel: Option<bool>,
    /// The engine must await both phases before considering the visit idle
    pub wait: bool,
    pub name: Option<String>,
}

impl Default for VisitAnimation {
    fn default() -> Self {
        Self {
            animate: true,
            parallel: None,
            wait: false,
            name: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct VisitFrom {
    pub url: String,
}

#[derive(Clone, Debug, Default)]
pub struct VisitTo {
    pub url: String,
    pub html: Option<String>,
    /// Parsed incoming page
    pub document: Option<Document>,
}

#[derive(Clone, Debug)]
pub struct Visit {
    pub id: String,
    pub from: VisitFrom,
    pub to: VisitTo,
    /// Selectors of the containers this visit replaces, in order
    pub containers: Vec<String>,
    pub animation: VisitAnimation,
}

impl Visit {
    pub fn new(from: impl Into<String>, to: impl Into<String>, containers: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: VisitFrom { url: from.into() },
            to: VisitTo {
                url: to.into(),
                ..Default::default()
            },
            containers,
            animation: VisitAnimation::default(),
        }
    }

    pub fn with_animate(mut self, animate: bool) -> Self {
        self.animation.animate = animate;
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.to.html = Some(html.into());
        self
    }

    /// Whether this visit has been marked for parallel animation
    pub fn is_parallel(&self) -> bool {
        self.animation.parallel == Some(true)
    }
}
