//! Skips the engine's wait on one animation phase for parallel visits

use async_trait::async_trait;
use tracing::debug;

use crate::core::errors::{ParallelError, Result};
use crate::hooks::{HookContext, Next, ReplaceHandler};
use crate::visit::AnimationPhase;

/// Replace handler for an `animation:*:await` hook. On parallel visits the
/// configured phase resolves immediately so both animations overlap; every
/// other call falls through to the engine's own wait.
pub struct PhaseGate {
    phase: AnimationPhase,
}

impl PhaseGate {
    pub fn new(phase: AnimationPhase) -> Self {
        Self { phase }
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }
}

#[async_trait]
impl ReplaceHandler for PhaseGate {
    async fn handle(&self, ctx: &mut HookContext<'_>, next: Next<'_>) -> Result<()> {
        if !next.is_available() {
            return Err(ParallelError::missing_default(next.hook()));
        }
        let awaited = ctx.args.as_animation().map(|args| args.phase);
        if ctx.visit.is_parallel() && awaited == Some(self.phase) {
            if let Some(args) = ctx.args.as_animation_mut() {
                args.skip = true;
            }
            debug!("Skipping {} animation wait for visit {}", self.phase, ctx.visit.id);
            return Ok(());
        }
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::hooks::{FnHandler, HookArgs, HookBus, HookName, HookOptions};
    use crate::visit::Visit;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn bus_with_gate() -> HookBus {
        let bus = HookBus::new();
        bus.create(HookName::AnimationOutAwait);
        bus.replace(
            HookName::AnimationOutAwait,
            Arc::new(PhaseGate::new(AnimationPhase::Out)),
            HookOptions::default(),
        )
        .unwrap();
        bus
    }

    #[tokio::test]
    async fn test_parallel_visit_skips_default() {
        let bus = bus_with_gate();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let default = FnHandler::new(move |_ctx: &mut HookContext<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut visit = Visit::new("/", "/b", vec![]);
        visit.animation.parallel = Some(true);
        let mut doc = Document::new();
        let mut args = HookArgs::animation(AnimationPhase::Out);
        let mut ctx = HookContext::new(&mut visit, &mut doc, &mut args);
        bus.call(HookName::AnimationOutAwait, &mut ctx, Some(&default)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(args.as_animation().unwrap().skip);

        // Sequential visits wait as usual
        let mut visit = Visit::new("/", "/b", vec![]);
        let mut args = HookArgs::animation(AnimationPhase::Out);
        let mut ctx = HookContext::new(&mut visit, &mut doc, &mut args);
        bus.call(HookName::AnimationOutAwait, &mut ctx, Some(&default)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!args.as_animation().unwrap().skip);
    }

    #[tokio::test]
    async fn test_other_phase_is_delegated() {
        let bus = bus_with_gate();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let default = FnHandler::new(move |_ctx: &mut HookContext<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut visit = Visit::new("/", "/b", vec![]);
        visit.animation.parallel = Some(true);
        let mut doc = Document::new();
        let mut args = HookArgs::animation(AnimationPhase::In);
        let mut ctx = HookContext::new(&mut visit, &mut doc, &mut args);
        bus.call(HookName::AnimationOutAwait, &mut ctx, Some(&default)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_default_is_fatal() {
        let bus = bus_with_gate();
        let mut visit = Visit::new("/", "/b", vec![]);
        visit.animation.parallel = Some(true);
        let mut doc = Document::new();
        let mut args = HookArgs::animation(AnimationPhase::Out);
        let mut ctx = HookContext::new(&mut visit, &mut doc, &mut args);
        let err = bus
            .call(HookName::AnimationOutAwait, &mut ctx, None)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            ParallelError::MissingDefaultHandler { hook: HookName::AnimationOutAwait }
        ));
    }
}
