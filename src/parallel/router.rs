//! Narrows the engine's container list to the series containers while the
//! engine replaces content, and restores it afterwards

use crate::visit::Visit;

#[derive(Debug, Default)]
pub struct PipelineRouter {
    original: Option<Vec<String>>,
}

impl PipelineRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `handled` selectors from the visit's containers, remembering
    /// the full list
    pub fn narrow(&mut self, visit: &mut Visit, handled: &[String]) {
        if self.original.is_none() {
            self.original = Some(visit.containers.clone());
        }
        visit.containers.retain(|selector| !handled.contains(selector));
    }

    /// Put the full list back. Returns whether anything was restored.
    pub fn restore(&mut self, visit: &mut Visit) -> bool {
        match self.original.take() {
            Some(original) => {
                visit.containers = original;
                true
            }
            None => false,
        }
    }

    pub fn is_narrowed(&self) -> bool {
        self.original.is_some()
    }

    pub fn reset(&mut self) {
        self.original = None;
    }
}
