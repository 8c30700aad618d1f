//! Hook names, arguments and the per-call context

use std::fmt;

use crate::dom::Document;
use crate::parallel::ContainerSet;
use crate::visit::{AnimationPhase, Visit};

/// Named lifecycle points of a visit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookName {
    VisitStart,
    AnimationOutAwait,
    ContentReplace,
    AnimationInAwait,
    VisitEnd,
    /// Created by the parallel plugin around its own container insertion
    ContentInsert,
    /// Created by the parallel plugin around its own container removal
    ContentRemove,
}

impl HookName {
    /// Hooks every engine provides, in firing order
    pub const LIFECYCLE: [HookName; 5] = [
        HookName::VisitStart,
        HookName::AnimationOutAwait,
        HookName::ContentReplace,
        HookName::AnimationInAwait,
        HookName::VisitEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookName::VisitStart => "visit:start",
            HookName::AnimationOutAwait => "animation:out:await",
            HookName::ContentReplace => "content:replace",
            HookName::AnimationInAwait => "animation:in:await",
            HookName::VisitEnd => "visit:end",
            HookName::ContentInsert => "content:insert",
            HookName::ContentRemove => "content:remove",
        }
    }

    /// The await hook for an animation phase
    pub fn animation_await(phase: AnimationPhase) -> Self {
        match phase {
            AnimationPhase::In => HookName::AnimationInAwait,
            AnimationPhase::Out => HookName::AnimationOutAwait,
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationArgs {
    pub phase: AnimationPhase,
    /// Set by handlers to tell the default routine not to wait
    pub skip: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentArgs {
    pub containers: Vec<ContainerSet>,
}

/// Hook-specific arguments
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HookArgs {
    #[default]
    None,
    Animation(AnimationArgs),
    Content(ContentArgs),
}

impl HookArgs {
    pub fn animation(phase: AnimationPhase) -> Self {
        HookArgs::Animation(AnimationArgs { phase, skip: false })
    }

    pub fn content(containers: Vec<ContainerSet>) -> Self {
        HookArgs::Content(ContentArgs { containers })
    }

    pub fn as_animation(&self) -> Option<&AnimationArgs> {
        match self {
            HookArgs::Animation(args) => Some(args),
            _ => None,
        }
    }

    pub fn as_animation_mut(&mut self) -> Option<&mut AnimationArgs> {
        match self {
            HookArgs::Animation(args) => Some(args),
            _ => None,
        }
    }

    pub fn as_content(&self) -> Option<&ContentArgs> {
        match self {
            HookArgs::Content(args) => Some(args),
            _ => None,
        }
    }
}

/// Everything a handler may read or write during one hook call
pub struct HookContext<'a> {
    pub visit: &'a mut Visit,
    /// The live document
    pub document: &'a mut Document,
    pub args: &'a mut HookArgs,
}

impl<'a> HookContext<'a> {
    pub fn new(visit: &'a mut Visit, document: &'a mut Document, args: &'a mut HookArgs) -> Self {
        Self {
            visit,
            document,
            args,
        }
    }
}
