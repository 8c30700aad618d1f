//! Parallel page transitions for a client-side transition engine.
//!
//! [`TransitionEngine`] runs each visit through a fixed set of lifecycle hooks
//! on a [`HookBus`]. Mounting a [`ParallelPlugin`] onto it keeps the outgoing
//! and incoming versions of selected containers in the document at the same
//! time, so their animations run together instead of one after the other.

pub mod core {
    pub mod errors;
}

pub mod dom; // arena document, selectors, html parsing
pub mod engine; // reference transition engine
pub mod hooks; // lifecycle hook bus
pub mod parallel; // the parallel visit plugin
pub mod visit;

pub use core::errors::{ParallelError, Result};
pub use dom::{Document, NodeId};
pub use engine::{Animator, EngineOptions, InstantAnimator, Plugin, TimedAnimator, TransitionEngine};
pub use hooks::{Handler, HookArgs, HookBus, HookContext, HookName, HookOptions, ReplaceHandler};
pub use parallel::{ContainerSet, Keep, ParallelPlugin, PluginOptions};
pub use visit::{AnimationPhase, Visit};
