//! Lifecycle hook bus
//!
//! Handlers observe or replace the engine's behavior at each named point of a
//! visit. Handlers never own the visit; they mutate it through the context
//! passed to each call.

pub mod bus;
pub mod types;

pub use bus::{FnHandler, Handler, HookBus, HookId, HookOptions, Next, ReplaceHandler};
pub use types::{AnimationArgs, ContentArgs, HookArgs, HookContext, HookName};
