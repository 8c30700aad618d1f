//! Hook bus for the visit lifecycle
//!
//! Handlers are registered per hook in one of three modes. A call runs all
//! `before` handlers, then the main handler, then all `on` handlers, each group
//! in ascending priority with ties broken by registration order. The main
//! handler is the newest `replace` handler if there is one; it receives a
//! [`Next`] that chains to older replace handlers and finally to the default
//! handler supplied by the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::types::{HookContext, HookName};
use crate::core::errors::{ParallelError, Result};

/// Handler that observes or mutates a hook call
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()>;
}

/// Handler that supersedes the default behavior of a hook
#[async_trait]
pub trait ReplaceHandler: Send + Sync {
    /// `next` runs whatever this handler replaced. Skipping it skips the
    /// default behavior.
    async fn handle(&self, ctx: &mut HookContext<'_>, next: Next<'_>) -> Result<()>;
}

/// The rest of a replace chain
#[derive(Clone, Copy)]
pub struct Next<'a> {
    hook: HookName,
    replacers: &'a [Arc<dyn ReplaceHandler>],
    default: Option<&'a dyn Handler>,
}

impl<'a> Next<'a> {
    pub fn new(hook: HookName, default: Option<&'a dyn Handler>) -> Self {
        Self {
            hook,
            replacers: &[],
            default,
        }
    }

    pub fn hook(&self) -> HookName {
        self.hook
    }

    /// Whether anything is left to run
    pub fn is_available(&self) -> bool {
        !self.replacers.is_empty() || self.default.is_some()
    }

    /// Run the rest of the chain. Does nothing when the chain is empty.
    pub async fn run(self, ctx: &mut HookContext<'_>) -> Result<()> {
        match self.replacers.split_last() {
            Some((last, rest)) => {
                let next = Next {
                    hook: self.hook,
                    replacers: rest,
                    default: self.default,
                };
                last.handle(ctx, next).await
            }
            None => match self.default {
                Some(default) => default.handle(ctx).await,
                None => Ok(()),
            },
        }
    }
}

/// Adapter for plain closures
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync,
{
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        (self.0)(ctx)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HookOptions {
    /// Lower runs first
    pub priority: i32,
    /// Unregister after the first call
    pub once: bool,
}

impl HookOptions {
    pub fn priority(priority: i32) -> Self {
        Self {
            priority,
            once: false,
        }
    }

    pub fn once() -> Self {
        Self {
            priority: 0,
            once: true,
        }
    }
}

/// Handle returned by registration, used to unregister
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

#[derive(Clone)]
enum HandlerKind {
    Before(Arc<dyn Handler>),
    On(Arc<dyn Handler>),
    Replace(Arc<dyn ReplaceHandler>),
}

#[derive(Clone)]
struct Registration {
    id: HookId,
    options: HookOptions,
    kind: HandlerKind,
}

/// Registry of hook handlers
pub struct HookBus {
    registry: RwLock<HashMap<HookName, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl Default for HookBus {
    fn default() -> Self {
        Self::new()
    }
}

impl HookBus {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Make a hook available. Creating an existing hook is a no-op.
    pub fn create(&self, name: HookName) {
        self.registry.write().entry(name).or_default();
    }

    pub fn exists(&self, name: HookName) -> bool {
        self.registry.read().contains_key(&name)
    }

    /// Number of handlers currently registered on a hook
    pub fn handler_count(&self, name: HookName) -> usize {
        self.registry.read().get(&name).map_or(0, Vec::len)
    }

    fn register(&self, name: HookName, kind: HandlerKind, options: HookOptions) -> Result<HookId> {
        let mut registry = self.registry.write();
        let registrations = registry
            .get_mut(&name)
            .ok_or_else(|| ParallelError::unknown_hook(name))?;
        let id = HookId(self.next_id.fetch_add(1, Ordering::SeqCst));
        registrations.push(Registration { id, options, kind });
        Ok(id)
    }

    pub fn before(&self, name: HookName, handler: Arc<dyn Handler>, options: HookOptions) -> Result<HookId> {
        self.register(name, HandlerKind::Before(handler), options)
    }

    pub fn on(&self, name: HookName, handler: Arc<dyn Handler>, options: HookOptions) -> Result<HookId> {
        self.register(name, HandlerKind::On(handler), options)
    }

    pub fn replace(
        &self,
        name: HookName,
        handler: Arc<dyn ReplaceHandler>,
        options: HookOptions,
    ) -> Result<HookId> {
        self.register(name, HandlerKind::Replace(handler), options)
    }

    pub fn before_fn<F>(&self, name: HookName, options: HookOptions, f: F) -> Result<HookId>
    where
        F: Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.before(name, Arc::new(FnHandler::new(f)), options)
    }

    pub fn on_fn<F>(&self, name: HookName, options: HookOptions, f: F) -> Result<HookId>
    where
        F: Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.on(name, Arc::new(FnHandler::new(f)), options)
    }

    /// Unregister a handler; returns whether it was registered
    pub fn off(&self, id: HookId) -> bool {
        let mut registry = self.registry.write();
        for registrations in registry.values_mut() {
            let before = registrations.len();
            registrations.retain(|r| r.id != id);
            if registrations.len() != before {
                return true;
            }
        }
        false
    }

    /// Run a hook. `default` is the engine's own behavior for this hook, if any.
    pub async fn call(
        &self,
        name: HookName,
        ctx: &mut HookContext<'_>,
        default: Option<&dyn Handler>,
    ) -> Result<()> {
        let mut registrations = {
            let registry = self.registry.read();
            registry
                .get(&name)
                .ok_or_else(|| ParallelError::unknown_hook(name))?
                .clone()
        };
        // Snapshot is taken so handlers can (un)register without holding the lock
        registrations.sort_by_key(|r| (r.options.priority, r.id));

        let once: Vec<HookId> = registrations
            .iter()
            .filter(|r| r.options.once)
            .map(|r| r.id)
            .collect();
        for id in once {
            self.off(id);
        }

        let mut before = Vec::new();
        let mut on = Vec::new();
        let mut replacers = Vec::new();
        for registration in registrations {
            match registration.kind {
                HandlerKind::Before(h) => before.push(h),
                HandlerKind::On(h) => on.push(h),
                HandlerKind::Replace(h) => replacers.push(h),
            }
        }

        debug!(
            "Calling hook {} ({} before, {} replace, {} on)",
            name,
            before.len(),
            replacers.len(),
            on.len()
        );

        for handler in &before {
            handler.handle(ctx).await?;
        }
        Next {
            hook: name,
            replacers: &replacers,
            default,
        }
        .run(ctx)
        .await?;
        for handler in &on {
            handler.handle(ctx).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::hooks::types::HookArgs;
    use crate::visit::Visit;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
        label: &'static str,
    }

    #[async_trait]
    impl Handler for Recorder {
        async fn handle(&self, _ctx: &mut HookContext<'_>) -> Result<()> {
            self.log.lock().push(self.label.to_string());
            Ok(())
        }
    }

    struct Wrapping {
        log: Arc<Mutex<Vec<String>>>,
        label: &'static str,
        delegate: bool,
    }

    #[async_trait]
    impl ReplaceHandler for Wrapping {
        async fn handle(&self, ctx: &mut HookContext<'_>, next: Next<'_>) -> Result<()> {
            self.log.lock().push(format!("{}:enter", self.label));
            if self.delegate {
                next.run(ctx).await?;
            }
            self.log.lock().push(format!("{}:exit", self.label));
            Ok(())
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> Arc<dyn Handler> {
        Arc::new(Recorder {
            log: log.clone(),
            label,
        })
    }

    #[tokio::test]
    async fn test_call_order_and_replace_chain() {
        let bus = HookBus::new();
        bus.create(HookName::ContentReplace);
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.on(HookName::ContentReplace, recorder(&log, "on"), HookOptions::default()).unwrap();
        bus.before(HookName::ContentReplace, recorder(&log, "before-late"), HookOptions::priority(1)).unwrap();
        bus.before(HookName::ContentReplace, recorder(&log, "before"), HookOptions::default()).unwrap();
        for (label, delegate) in [("outer", true), ("inner", true)] {
            bus.replace(
                HookName::ContentReplace,
                Arc::new(Wrapping { log: log.clone(), label, delegate }),
                HookOptions::default(),
            )
            .unwrap();
        }

        let default = Recorder { log: log.clone(), label: "default" };
        let mut visit = Visit::new("/a", "/b", vec![]);
        let mut doc = Document::new();
        let mut args = HookArgs::None;
        let mut ctx = HookContext::new(&mut visit, &mut doc, &mut args);
        bus.call(HookName::ContentReplace, &mut ctx, Some(&default)).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "before",
                "before-late",
                "inner:enter",
                "outer:enter",
                "default",
                "outer:exit",
                "inner:exit",
                "on"
            ]
        );
    }

    #[tokio::test]
    async fn test_replace_without_delegation_skips_default() {
        let bus = HookBus::new();
        bus.create(HookName::VisitEnd);
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.replace(
            HookName::VisitEnd,
            Arc::new(Wrapping { log: log.clone(), label: "only", delegate: false }),
            HookOptions::default(),
        )
        .unwrap();

        let default = Recorder { log: log.clone(), label: "default" };
        let mut visit = Visit::new("/a", "/b", vec![]);
        let mut doc = Document::new();
        let mut args = HookArgs::None;
        let mut ctx = HookContext::new(&mut visit, &mut doc, &mut args);
        bus.call(HookName::VisitEnd, &mut ctx, Some(&default)).await.unwrap();

        assert_eq!(*log.lock(), vec!["only:enter", "only:exit"]);
    }

    #[tokio::test]
    async fn test_unknown_hook_and_off() {
        let bus = HookBus::new();
        let err = bus
            .on_fn(HookName::ContentInsert, HookOptions::default(), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, ParallelError::UnknownHook { hook: HookName::ContentInsert }));

        bus.create(HookName::VisitStart);
        let id = bus
            .on_fn(HookName::VisitStart, HookOptions::default(), |ctx| {
                ctx.visit.animation.parallel = Some(false);
                Ok(())
            })
            .unwrap();
        assert_eq!(bus.handler_count(HookName::VisitStart), 1);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        assert_eq!(bus.handler_count(HookName::VisitStart), 0);

        let mut visit = Visit::new("/a", "/b", vec![]);
        let mut doc = Document::new();
        let mut args = HookArgs::None;
        let mut ctx = HookContext::new(&mut visit, &mut doc, &mut args);
        bus.call(HookName::VisitStart, &mut ctx, None).await.unwrap();
        assert_eq!(visit.animation.parallel, None);
    }

    #[tokio::test]
    async fn test_once_handlers_run_once() {
        let bus = HookBus::new();
        bus.create(HookName::VisitEnd);
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.on(HookName::VisitEnd, recorder(&log, "once"), HookOptions::once()).unwrap();

        let mut visit = Visit::new("/a", "/b", vec![]);
        let mut doc = Document::new();
        let mut args = HookArgs::None;
        for _ in 0..2 {
            let mut ctx = HookContext::new(&mut visit, &mut doc, &mut args);
            bus.call(HookName::VisitEnd, &mut ctx, None).await.unwrap();
        }
        assert_eq!(*log.lock(), vec!["once"]);
        assert_eq!(bus.handler_count(HookName::VisitEnd), 0);
    }
}
