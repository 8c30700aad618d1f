//! Wires the parallel visit components into the engine's lifecycle
//!
//! | hook                  | mode    | priority | work                                 |
//! |-----------------------|---------|----------|--------------------------------------|
//! | `visit:start`         | before  | 0        | clean up an interrupted visit        |
//! | `visit:start`         | on      | 1        | eligibility, after integrator hooks  |
//! | `animation:*:await`   | replace | 0        | skip the configured phase            |
//! | `content:replace`     | before  | 1        | match, insert, narrow containers     |
//! | `content:replace`     | on      | min      | restore containers                   |
//! | `visit:end`           | on      | 0        | remove old generations               |

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::core::errors::{ParallelError, Result};
use crate::engine::{Plugin, TransitionEngine};
use crate::hooks::{Handler, HookArgs, HookBus, HookContext, HookId, HookName, HookOptions};
use crate::parallel::cleanup::{remove_containers, CleanupRegistry, RemoveContainers};
use crate::parallel::eligibility;
use crate::parallel::gate::PhaseGate;
use crate::parallel::matcher::{match_containers, ContainerSet};
use crate::parallel::options::PluginOptions;
use crate::parallel::router::PipelineRouter;
use crate::parallel::swap::InsertContainers;

pub const PLUGIN_NAME: &str = "ParallelPlugin";

/// Runs before every other `on` handler of `content:replace`
const RESTORE_PRIORITY: i32 = i32::MIN;

#[derive(Default)]
struct VisitState {
    router: PipelineRouter,
    cleanup: CleanupRegistry,
}

struct Shared {
    /// Options with containers resolved against the engine at mount time
    options: PluginOptions,
    state: Mutex<VisitState>,
    bus: Weak<HookBus>,
}

impl Shared {
    fn bus(&self, hook: HookName) -> Result<Arc<HookBus>> {
        self.bus
            .upgrade()
            .ok_or_else(|| ParallelError::hook(hook, "hook bus was dropped while the plugin is mounted"))
    }
}

/// Animates selected containers in and out at the same time
pub struct ParallelPlugin {
    options: PluginOptions,
    shared: Option<Arc<Shared>>,
    hook_ids: Vec<HookId>,
}

impl ParallelPlugin {
    pub fn new(options: PluginOptions) -> Self {
        Self {
            options,
            shared: None,
            hook_ids: Vec::new(),
        }
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// Containers treated in parallel; resolved once mounted
    pub fn containers(&self) -> &[String] {
        match &self.shared {
            Some(shared) => &shared.options.containers,
            None => &self.options.containers,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.is_some()
    }

    /// Container sets swapped during the visit in flight
    pub fn pending_containers(&self) -> Vec<ContainerSet> {
        self.shared
            .as_ref()
            .map(|shared| shared.state.lock().cleanup.sets().to_vec())
            .unwrap_or_default()
    }

    fn register(&mut self, bus: &HookBus, shared: &Arc<Shared>) -> Result<()> {
        let phase = shared.options.animation_phase;
        self.hook_ids.push(bus.before(
            HookName::VisitStart,
            Arc::new(FlushInterruptedVisit(shared.clone())),
            HookOptions::default(),
        )?);
        self.hook_ids.push(bus.on(
            HookName::VisitStart,
            Arc::new(StartVisit(shared.clone())),
            HookOptions::priority(1),
        )?);
        self.hook_ids.push(bus.replace(
            HookName::animation_await(phase),
            Arc::new(PhaseGate::new(phase)),
            HookOptions::default(),
        )?);
        self.hook_ids.push(bus.before(
            HookName::ContentReplace,
            Arc::new(InsertParallelContainers(shared.clone())),
            HookOptions::priority(1),
        )?);
        self.hook_ids.push(bus.on(
            HookName::ContentReplace,
            Arc::new(RestoreContainers(shared.clone())),
            HookOptions::priority(RESTORE_PRIORITY),
        )?);
        self.hook_ids.push(bus.on(
            HookName::VisitEnd,
            Arc::new(CleanupContainers(shared.clone())),
            HookOptions::default(),
        )?);
        Ok(())
    }
}

impl Plugin for ParallelPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn mount(&mut self, engine: &mut TransitionEngine) -> Result<()> {
        if self.is_mounted() {
            return Err(ParallelError::configuration("parallel plugin is already mounted"));
        }
        self.options.validate()?;

        let mut options = self.options.clone();
        // No containers configured: treat every engine container in parallel
        if options.containers.is_empty() {
            options.containers = engine.options().containers.clone();
        }

        let bus = engine.hooks();
        bus.create(HookName::ContentInsert);
        bus.create(HookName::ContentRemove);

        let shared = Arc::new(Shared {
            options,
            state: Mutex::new(VisitState::default()),
            bus: Arc::downgrade(&bus),
        });
        if let Err(e) = self.register(&bus, &shared) {
            for id in self.hook_ids.drain(..) {
                bus.off(id);
            }
            return Err(e);
        }
        self.shared = Some(shared);
        Ok(())
    }

    fn unmount(&mut self, engine: &mut TransitionEngine) -> Result<()> {
        let bus = engine.hooks();
        for id in self.hook_ids.drain(..) {
            bus.off(id);
        }
        let Some(shared) = self.shared.take() else {
            return Ok(());
        };
        let sets = {
            let mut state = shared.state.lock();
            state.router.reset();
            state.cleanup.take()
        };
        if !sets.is_empty() {
            remove_containers(engine.document_mut(), &sets)?;
        }
        Ok(())
    }
}

/// Cleans up after a visit that never reached `visit:end`
struct FlushInterruptedVisit(Arc<Shared>);

#[async_trait]
impl Handler for FlushInterruptedVisit {
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        let sets = {
            let mut state = self.0.state.lock();
            state.router.reset();
            state.cleanup.take()
        };
        if !sets.is_empty() {
            warn!(
                "Previous visit ended without cleanup, removing {} parallel container sets",
                sets.len()
            );
            remove_containers(ctx.document, &sets)?;
        }
        Ok(())
    }
}

/// Marks the visit as parallel if it qualifies
struct StartVisit(Arc<Shared>);

#[async_trait]
impl Handler for StartVisit {
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        let eligible = eligibility::evaluate(ctx.visit, &self.0.options.containers, ctx.document)?;
        if eligible {
            info!("Visit {} to {} runs in parallel", ctx.visit.id, ctx.visit.to.url);
        }
        Ok(())
    }
}

/// Inserts the incoming parallel containers and hides them from the engine's
/// own replacement
struct InsertParallelContainers(Arc<Shared>);

#[async_trait]
impl Handler for InsertParallelContainers {
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        if !ctx.visit.is_parallel() {
            return Ok(());
        }
        let bus = self.0.bus(HookName::ContentReplace)?;
        let options = &self.0.options;

        let sets = match ctx.visit.to.document.as_ref() {
            Some(incoming) => match_containers(
                &options.containers,
                &options.keep,
                &ctx.visit.containers,
                ctx.document,
                incoming,
            )?,
            None => {
                warn!("Visit {} has no incoming document to take containers from", ctx.visit.id);
                Vec::new()
            }
        };

        // Tracked before insertion so a failed insert is still cleaned up
        self.0.state.lock().cleanup.track(&sets);

        let mut args = HookArgs::content(sets.clone());
        {
            let mut inner = HookContext::new(&mut *ctx.visit, &mut *ctx.document, &mut args);
            let insert = InsertContainers {
                preserve_scroll: options.preserve_scroll,
            };
            bus.call(HookName::ContentInsert, &mut inner, Some(&insert)).await?;
        }
        let inserted = match args {
            HookArgs::Content(content) => content.containers,
            _ => sets.clone(),
        };

        let mut state = self.0.state.lock();
        if inserted != sets {
            state.cleanup.clear();
            state.cleanup.track(&inserted);
        }
        let handled: Vec<String> = inserted.iter().map(|set| set.selector.clone()).collect();
        state.router.narrow(ctx.visit, &handled);
        Ok(())
    }
}

/// Puts the visit's full container list back once the engine has replaced
/// the series containers
struct RestoreContainers(Arc<Shared>);

#[async_trait]
impl Handler for RestoreContainers {
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        self.0.state.lock().router.restore(ctx.visit);
        Ok(())
    }
}

/// Removes previous generations once the visit is over
struct CleanupContainers(Arc<Shared>);

#[async_trait]
impl Handler for CleanupContainers {
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        let sets = {
            let mut state = self.0.state.lock();
            state.router.restore(ctx.visit);
            state.cleanup.take()
        };
        if sets.is_empty() {
            return Ok(());
        }
        let bus = self.0.bus(HookName::VisitEnd)?;
        let mut args = HookArgs::content(sets);
        let mut inner = HookContext::new(&mut *ctx.visit, &mut *ctx.document, &mut args);
        bus.call(HookName::ContentRemove, &mut inner, Some(&RemoveContainers)).await
    }
}
