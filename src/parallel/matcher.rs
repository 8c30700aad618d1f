//! Container matching between the live document and the incoming page

use indexmap::IndexSet;
use tracing::warn;

use crate::core::errors::Result;
use crate::dom::{Document, NodeId};
use crate::parallel::options::Keep;

/// Elements involved in the parallel swap of one selector
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerSet {
    /// Selector to match this container
    pub selector: String,
    /// Incoming container, imported into the live document but not yet attached
    pub next: NodeId,
    /// Outgoing container: the first live match
    pub previous: NodeId,
    /// Parent of `previous` when it was matched
    pub parent: Option<NodeId>,
    /// Live matches retained after the visit, newest first
    pub keep: Vec<NodeId>,
    /// Live matches removed once the visit ends
    pub remove: Vec<NodeId>,
    /// `next`, `previous`, `keep` and `remove` without duplicates, in that order
    pub all: Vec<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    MissingInCurrentDocument,
    MissingInIncomingDocument,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(ContainerSet),
    Dropped { selector: String, reason: DropReason },
}

/// Configured parallel selectors that this visit actually replaces, in
/// configured order
pub fn parallel_selectors(configured: &[String], visit_containers: &[String]) -> Vec<String> {
    configured
        .iter()
        .filter(|selector| visit_containers.contains(selector))
        .cloned()
        .collect()
}

/// Resolve one selector against both documents. The incoming element is only
/// imported when both sides match.
pub fn resolve_container(
    selector: &str,
    keep: &Keep,
    document: &mut Document,
    incoming: &Document,
) -> Result<MatchOutcome> {
    let previous_all = document.query_selector_all(selector)?;
    let Some(&previous) = previous_all.first() else {
        return Ok(MatchOutcome::Dropped {
            selector: selector.to_string(),
            reason: DropReason::MissingInCurrentDocument,
        });
    };
    let Some(incoming_next) = incoming.query_selector(selector)? else {
        return Ok(MatchOutcome::Dropped {
            selector: selector.to_string(),
            reason: DropReason::MissingInIncomingDocument,
        });
    };
    let next = document.import_node(incoming, incoming_next)?;

    let keep_count = keep.for_selector(selector).min(previous_all.len());
    let (kept, removed) = previous_all.split_at(keep_count);

    let mut all = IndexSet::new();
    all.insert(next);
    all.insert(previous);
    all.extend(kept.iter().copied());
    all.extend(removed.iter().copied());

    Ok(MatchOutcome::Matched(ContainerSet {
        selector: selector.to_string(),
        next,
        previous,
        parent: document.parent(previous),
        keep: kept.to_vec(),
        remove: removed.to_vec(),
        all: all.into_iter().collect(),
    }))
}

/// Build the container sets for a visit. Selectors that cannot be matched on
/// both sides are dropped with a warning; the rest proceed.
pub fn match_containers(
    configured: &[String],
    keep: &Keep,
    visit_containers: &[String],
    document: &mut Document,
    incoming: &Document,
) -> Result<Vec<ContainerSet>> {
    let selectors = parallel_selectors(configured, visit_containers);
    if selectors.is_empty() {
        warn!("No parallel containers found in list of replaced containers");
        return Ok(Vec::new());
    }

    let mut sets = Vec::with_capacity(selectors.len());
    for selector in &selectors {
        match resolve_container(selector, keep, document, incoming)? {
            MatchOutcome::Matched(set) => sets.push(set),
            MatchOutcome::Dropped { selector, reason } => {
                warn!("Parallel container {} not found ({:?})", selector, reason);
            }
        }
    }
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selectors(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parallel_selectors_keeps_configured_order() {
        assert_eq!(
            parallel_selectors(&selectors(&["#b", "#a", "#x"]), &selectors(&["#a", "#b", "#c"])),
            selectors(&["#b", "#a"])
        );
        assert!(parallel_selectors(&selectors(&["#x"]), &selectors(&["#a"])).is_empty());
    }

    #[test]
    fn test_resolve_splits_generations() {
        let mut doc = Document::parse(
            r#"<body><main id="m" class="gen3"></main><main id="m" class="gen2"></main><main id="m" class="gen1"></main></body>"#,
        );
        let incoming = Document::parse(r#"<body><main id="m" class="gen4">new</main></body>"#);
        let live = doc.query_selector_all("#m").unwrap();

        let MatchOutcome::Matched(set) = resolve_container("#m", &Keep::Count(1), &mut doc, &incoming).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(set.previous, live[0]);
        assert_eq!(set.keep, vec![live[0]]);
        assert_eq!(set.remove, vec![live[1], live[2]]);
        assert_eq!(set.all, vec![set.next, live[0], live[1], live[2]]);
        assert_eq!(set.parent, doc.parent(live[0]));
        assert_eq!(doc.text_content(set.next), "new");
        assert!(!doc.is_connected(set.next));
    }

    #[test]
    fn test_resolve_keep_larger_than_matches() {
        let mut doc = Document::parse(r#"<main id="m"></main>"#);
        let incoming = Document::parse(r#"<main id="m"></main>"#);
        let MatchOutcome::Matched(set) = resolve_container("#m", &Keep::Count(5), &mut doc, &incoming).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(set.keep, vec![set.previous]);
        assert!(set.remove.is_empty());
    }

    #[test]
    fn test_match_containers_drops_missing() {
        let mut doc = Document::parse(r#"<main id="main"></main><nav id="nav"></nav>"#);
        let incoming = Document::parse(r#"<main id="main"></main><aside id="aside"></aside>"#);
        let before = doc.node_count();

        let outcome = resolve_container("#aside", &Keep::default(), &mut doc, &incoming).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Dropped {
                selector: "#aside".to_string(),
                reason: DropReason::MissingInCurrentDocument
            }
        );
        let outcome = resolve_container("#nav", &Keep::default(), &mut doc, &incoming).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Dropped {
                selector: "#nav".to_string(),
                reason: DropReason::MissingInIncomingDocument
            }
        );
        // Nothing imported for dropped selectors
        assert_eq!(doc.node_count(), before);

        let sets = match_containers(
            &selectors(&["#main", "#nav", "#aside"]),
            &Keep::default(),
            &selectors(&["#main", "#nav", "#aside"]),
            &mut doc,
            &incoming,
        )
        .unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].selector, "#main");
        assert_eq!(sets[0].remove, vec![sets[0].previous]);
        assert!(sets[0].keep.is_empty());
    }

    #[test]
    fn test_match_containers_outside_visit_is_noop() {
        let mut doc = Document::parse(r#"<main id="main"></main>"#);
        let incoming = Document::parse(r#"<main id="main"></main>"#);
        let sets = match_containers(
            &selectors(&["#main"]),
            &Keep::default(),
            &selectors(&["#other"]),
            &mut doc,
            &incoming,
        )
        .unwrap();
        assert!(sets.is_empty());
    }
}
