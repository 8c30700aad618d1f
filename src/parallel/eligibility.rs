//! Per-visit decision whether to run in parallel mode

use tracing::debug;

use crate::core::errors::Result;
use crate::dom::{matches_selector, Document, SelectorList};
use crate::visit::Visit;

/// Whether any configured container's first live match is one of the
/// containers the visit replaces
pub fn has_parallel_containers(
    configured: &[String],
    visit_containers: &[String],
    document: &Document,
) -> Result<bool> {
    if visit_containers.is_empty() {
        return Ok(false);
    }
    let replaced = SelectorList::parse_all(visit_containers)?;
    for selector in configured {
        if let Some(container) = document.query_selector(selector)? {
            if matches_selector(document, container, &replaced) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Eligibility without side effects. Checking `parallel != Some(false)` lets
/// integrator hooks disable parallel mode before this runs.
pub fn is_eligible(visit: &Visit, configured: &[String], document: &Document) -> Result<bool> {
    if !visit.animation.animate || visit.animation.parallel == Some(false) {
        return Ok(false);
    }
    has_parallel_containers(configured, &visit.containers, document)
}

/// Evaluate and record the decision on the visit. Only `animation.parallel`
/// and `animation.wait` are written.
pub fn evaluate(visit: &mut Visit, configured: &[String], document: &Document) -> Result<bool> {
    let eligible = is_eligible(visit, configured, document)?;
    if eligible {
        visit.animation.wait = true;
        visit.animation.parallel = Some(true);
    } else if visit.animation.parallel == Some(true) {
        debug!("Visit {} requested parallel mode but is not eligible", visit.id);
        visit.animation.parallel = None;
    }
    Ok(eligible)
}
