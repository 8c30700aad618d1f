//! Host transition engine driving the visit lifecycle

pub mod animator;
pub mod transition;

pub use animator::{Animator, AwaitAnimation, InstantAnimator, TimedAnimator};
pub use transition::{EngineOptions, Plugin, ReplaceContent, TransitionEngine};
