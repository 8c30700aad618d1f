//! Reference transition engine
//!
//! Drives one visit through `visit:start`, `animation:out:await`,
//! `content:replace`, `animation:in:await` and `visit:end`, supplying the
//! default behavior for the await and replace hooks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::core::errors::{ParallelError, Result};
use crate::dom::{parse_html, Document};
use crate::engine::animator::{Animator, AwaitAnimation, InstantAnimator};
use crate::hooks::{Handler, HookArgs, HookBus, HookContext, HookName};
use crate::visit::{AnimationPhase, Visit};

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Containers replaced on every visit, in order
    pub containers: Vec<String>,
    pub animate: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            containers: vec!["#content".to_string()],
            animate: true,
        }
    }
}

/// Extension mounted onto an engine
pub trait Plugin: Send {
    fn name(&self) -> &str;
    fn mount(&mut self, engine: &mut TransitionEngine) -> Result<()>;
    fn unmount(&mut self, engine: &mut TransitionEngine) -> Result<()>;
}

/// Default behavior of `content:replace`: swap each container for its
/// counterpart from the incoming page
pub struct ReplaceContent;

#[async_trait]
impl Handler for ReplaceContent {
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        let Some(incoming) = ctx.visit.to.document.as_ref() else {
            warn!("Visit {} has no incoming document, nothing replaced", ctx.visit.id);
            return Ok(());
        };
        for selector in &ctx.visit.containers {
            let current = ctx.document.query_selector(selector)?;
            let next = incoming.query_selector(selector)?;
            match (current, next) {
                (Some(current), Some(next)) => {
                    let imported = ctx.document.import_node(incoming, next)?;
                    ctx.document.replace_with(current, imported)?;
                }
                _ => warn!("Container {} not found, not replaced", selector),
            }
        }
        Ok(())
    }
}

pub struct TransitionEngine {
    hooks: Arc<HookBus>,
    document: Document,
    options: EngineOptions,
    animator: Arc<dyn Animator>,
    plugins: Vec<Box<dyn Plugin>>,
    current_url: String,
}

impl TransitionEngine {
    pub fn new(document: Document, options: EngineOptions) -> Self {
        let hooks = Arc::new(HookBus::new());
        for name in HookName::LIFECYCLE {
            hooks.create(name);
        }
        Self {
            hooks,
            document,
            options,
            animator: Arc::new(InstantAnimator),
            plugins: Vec::new(),
            current_url: "/".to_string(),
        }
    }

    pub fn with_animator(mut self, animator: Arc<dyn Animator>) -> Self {
        self.animator = animator;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.current_url = url.into();
        self
    }

    pub fn hooks(&self) -> Arc<HookBus> {
        self.hooks.clone()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    pub fn use_plugin(&mut self, mut plugin: Box<dyn Plugin>) -> Result<()> {
        if self.has_plugin(plugin.name()) {
            return Err(ParallelError::configuration(format!(
                "plugin {} is already mounted",
                plugin.name()
            )));
        }
        plugin.mount(self)?;
        debug!("Mounted plugin {}", plugin.name());
        self.plugins.push(plugin);
        Ok(())
    }

    /// Unmount and drop a plugin; returns whether it was mounted
    pub fn unuse_plugin(&mut self, name: &str) -> Result<bool> {
        let Some(index) = self.plugins.iter().position(|p| p.name() == name) else {
            return Ok(false);
        };
        let mut plugin = self.plugins.remove(index);
        plugin.unmount(self)?;
        Ok(true)
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// Navigate to `url`, whose page content is `html`
    pub async fn visit(&mut self, url: &str, html: &str) -> Result<Visit> {
        let visit = Visit::new(self.current_url.clone(), url, self.options.containers.clone())
            .with_animate(self.options.animate)
            .with_html(html);
        self.run_visit(visit).await
    }

    /// Run a prepared visit through the lifecycle. `visit:end` fires even if
    /// an earlier stage fails.
    pub async fn run_visit(&mut self, mut visit: Visit) -> Result<Visit> {
        // Layout flushes are reported per visit
        self.document.take_layout_flushes();
        let outcome = self.run_stages(&mut visit).await;
        if let Err(e) = &outcome {
            error!("Visit {} failed: {}", visit.id, e);
        }
        let ended = self.call(HookName::VisitEnd, &mut visit, HookArgs::None, None).await;
        outcome?;
        ended?;
        self.current_url = visit.to.url.clone();
        Ok(visit)
    }

    async fn run_stages(&mut self, visit: &mut Visit) -> Result<()> {
        self.call(HookName::VisitStart, visit, HookArgs::None, None).await?;

        if visit.to.document.is_none() {
            let html = visit.to.html.as_deref().unwrap_or_default();
            visit.to.document = Some(parse_html(html));
        }

        let await_animation = AwaitAnimation::new(self.animator.clone());
        self.call(
            HookName::AnimationOutAwait,
            visit,
            HookArgs::animation(AnimationPhase::Out),
            Some(&await_animation),
        )
        .await?;
        self.call(HookName::ContentReplace, visit, HookArgs::None, Some(&ReplaceContent))
            .await?;
        self.call(
            HookName::AnimationInAwait,
            visit,
            HookArgs::animation(AnimationPhase::In),
            Some(&await_animation),
        )
        .await?;
        Ok(())
    }

    async fn call(
        &mut self,
        name: HookName,
        visit: &mut Visit,
        mut args: HookArgs,
        default: Option<&dyn Handler>,
    ) -> Result<()> {
        let hooks = self.hooks.clone();
        let mut ctx = HookContext::new(visit, &mut self.document, &mut args);
        hooks.call(name, &mut ctx, default).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookOptions;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    const PAGE_ONE: &str = r#"<body><header id="header">one</header><div id="content">first</div></body>"#;
    const PAGE_TWO: &str = r#"<body><header id="header">two</header><div id="content">second</div></body>"#;

    struct PhaseLog(Mutex<Vec<AnimationPhase>>);

    #[async_trait]
    impl Animator for PhaseLog {
        async fn await_phase(&self, phase: AnimationPhase, _visit: &Visit, _document: &Document) -> Result<()> {
            self.0.lock().push(phase);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_visit_replaces_containers() {
        let animator = Arc::new(PhaseLog(Mutex::new(Vec::new())));
        let options = EngineOptions {
            containers: vec!["#content".to_string(), "#header".to_string()],
            animate: true,
        };
        let mut engine = TransitionEngine::new(Document::parse(PAGE_ONE), options).with_animator(animator.clone());

        let visit = engine.visit("/two", PAGE_TWO).await.unwrap();
        assert_eq!(visit.from.url, "/");
        assert_eq!(engine.current_url(), "/two");

        let doc = engine.document();
        assert_eq!(doc.text_content(doc.query_selector("#content").unwrap().unwrap()), "second");
        assert_eq!(doc.text_content(doc.query_selector("#header").unwrap().unwrap()), "two");
        assert_eq!(doc.query_selector_all("#content").unwrap().len(), 1);
        assert_eq!(*animator.0.lock(), vec![AnimationPhase::Out, AnimationPhase::In]);
    }

    #[tokio::test]
    async fn test_visit_without_animation_does_not_wait() {
        let animator = Arc::new(PhaseLog(Mutex::new(Vec::new())));
        let options = EngineOptions {
            animate: false,
            ..Default::default()
        };
        let mut engine = TransitionEngine::new(Document::parse(PAGE_ONE), options).with_animator(animator.clone());
        engine.visit("/two", PAGE_TWO).await.unwrap();
        assert!(animator.0.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failed_stage_still_ends_visit() {
        let mut engine = TransitionEngine::new(Document::parse(PAGE_ONE), EngineOptions::default());
        let ended = Arc::new(Mutex::new(0));
        let counter = ended.clone();
        let hooks = engine.hooks();
        hooks
            .on_fn(HookName::VisitEnd, HookOptions::default(), move |_| {
                *counter.lock() += 1;
                Ok(())
            })
            .unwrap();
        hooks
            .before_fn(HookName::ContentReplace, HookOptions::default(), |_| {
                Err(anyhow::anyhow!("network went away").into())
            })
            .unwrap();

        let err = engine.visit("/two", PAGE_TWO).await.unwrap_err();
        assert_eq!(err.to_string(), "network went away");
        assert_eq!(*ended.lock(), 1);
        assert_eq!(engine.current_url(), "/");
        let doc = engine.document();
        assert_eq!(doc.text_content(doc.query_selector("#content").unwrap().unwrap()), "first");
    }

    struct Named(&'static str, Arc<Mutex<Vec<String>>>);

    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn mount(&mut self, _engine: &mut TransitionEngine) -> Result<()> {
            self.1.lock().push(format!("mount {}", self.0));
            Ok(())
        }

        fn unmount(&mut self, _engine: &mut TransitionEngine) -> Result<()> {
            self.1.lock().push(format!("unmount {}", self.0));
            Ok(())
        }
    }

    #[test]
    fn test_plugin_registration() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = TransitionEngine::new(Document::new(), EngineOptions::default());
        engine.use_plugin(Box::new(Named("a", log.clone()))).unwrap();
        assert!(engine.has_plugin("a"));

        let err = engine.use_plugin(Box::new(Named("a", log.clone()))).unwrap_err();
        assert_eq!(err.category(), "configuration");

        assert!(engine.unuse_plugin("a").unwrap());
        assert!(!engine.unuse_plugin("a").unwrap());
        assert_eq!(*log.lock(), vec!["mount a", "unmount a"]);
    }
}
