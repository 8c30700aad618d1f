//! Animation waiting and the engine's default await routine

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::core::errors::Result;
use crate::dom::Document;
use crate::hooks::{Handler, HookContext};
use crate::visit::{AnimationPhase, Visit};

/// Waits for the animations of one phase to finish
#[async_trait]
pub trait Animator: Send + Sync {
    async fn await_phase(&self, phase: AnimationPhase, visit: &Visit, document: &Document) -> Result<()>;
}

/// Animator for pages without timed animations: every phase is done at once
pub struct InstantAnimator;

#[async_trait]
impl Animator for InstantAnimator {
    async fn await_phase(&self, _phase: AnimationPhase, _visit: &Visit, _document: &Document) -> Result<()> {
        Ok(())
    }
}

/// Animator with a fixed duration per phase, for pages whose transitions are
/// known up front
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimedAnimator {
    pub leave: Duration,
    pub enter: Duration,
}

impl TimedAnimator {
    pub fn new(leave: Duration, enter: Duration) -> Self {
        Self { leave, enter }
    }

    pub fn duration(&self, phase: AnimationPhase) -> Duration {
        match phase {
            AnimationPhase::Out => self.leave,
            AnimationPhase::In => self.enter,
        }
    }
}

#[async_trait]
impl Animator for TimedAnimator {
    async fn await_phase(&self, phase: AnimationPhase, _visit: &Visit, _document: &Document) -> Result<()> {
        let duration = self.duration(phase);
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }
}

/// Default behavior of `animation:in:await` and `animation:out:await`
pub struct AwaitAnimation {
    animator: Arc<dyn Animator>,
}

impl AwaitAnimation {
    pub fn new(animator: Arc<dyn Animator>) -> Self {
        Self { animator }
    }
}

#[async_trait]
impl Handler for AwaitAnimation {
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        let Some(args) = ctx.args.as_animation() else {
            return Ok(());
        };
        if args.skip || !ctx.visit.animation.animate {
            return Ok(());
        }
        let phase = args.phase;
        debug!("Awaiting {} animation for visit {}", phase, ctx.visit.id);
        self.animator.await_phase(phase, ctx.visit, ctx.document).await
    }
}
