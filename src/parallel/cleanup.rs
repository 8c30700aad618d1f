//! Per-visit tracking of swap artifacts and their removal at visit end

use async_trait::async_trait;
use tracing::debug;

use crate::core::errors::Result;
use crate::dom::{Document, NodeId};
use crate::hooks::{Handler, HookContext};
use crate::parallel::matcher::ContainerSet;
use crate::parallel::swap::NEXT_CLASS;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub untagged: usize,
}

/// Elements created or marked during the current visit
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    pending_removal: Vec<NodeId>,
    pending_untag: Vec<NodeId>,
    sets: Vec<ContainerSet>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, sets: &[ContainerSet]) {
        for set in sets {
            self.pending_removal.extend(set.remove.iter().copied());
            self.pending_untag.push(set.next);
            self.sets.push(set.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.pending_removal.is_empty() && self.pending_untag.is_empty()
    }

    pub fn pending_removal(&self) -> &[NodeId] {
        &self.pending_removal
    }

    pub fn pending_untag(&self) -> &[NodeId] {
        &self.pending_untag
    }

    pub fn sets(&self) -> &[ContainerSet] {
        &self.sets
    }

    /// Hand over the tracked sets and forget everything
    pub fn take(&mut self) -> Vec<ContainerSet> {
        self.pending_removal.clear();
        self.pending_untag.clear();
        std::mem::take(&mut self.sets)
    }

    pub fn clear(&mut self) {
        self.take();
    }
}

/// Remove the `remove` generation of every set and strip the transient class
/// from every incoming container
pub fn remove_containers(document: &mut Document, sets: &[ContainerSet]) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();
    for set in sets {
        for element in &set.remove {
            if document.parent(*element).is_some() {
                document.remove(*element)?;
                report.removed += 1;
            }
        }
        if document.remove_class(set.next, NEXT_CLASS)? {
            report.untagged += 1;
        }
    }
    debug!(
        "Removed {} previous containers, untagged {} incoming containers",
        report.removed,
        report.untagged
    );
    Ok(report)
}

/// Default behavior of `content:remove`
pub struct RemoveContainers;

#[async_trait]
impl Handler for RemoveContainers {
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        if let Some(content) = ctx.args.as_content() {
            remove_containers(ctx.document, &content.containers)?;
        }
        Ok(())
    }
}
