//! DOM insertion and state tagging for matched containers

use async_trait::async_trait;
use tracing::warn;

use crate::core::errors::{ParallelError, Result};
use crate::dom::Document;
use crate::hooks::{Handler, HookContext};
use crate::parallel::matcher::ContainerSet;

/// Custom property carrying each container's position within its set
pub const CONTAINER_INDEX_PROPERTY: &str = "--parallel-container";
/// Transient class on the incoming container
pub const NEXT_CLASS: &str = "is-next-container";
pub const PREVIOUS_CLASS: &str = "is-previous-container";
pub const KEPT_CLASS: &str = "is-kept-container";
pub const REMOVING_CLASS: &str = "is-removing-container";

/// Insert every incoming container in front of its outgoing one and tag all
/// generations. Not idempotent: a second call inserts `next` again.
pub fn insert_containers(
    document: &mut Document,
    sets: &[ContainerSet],
    animate: bool,
    preserve_scroll: bool,
) -> Result<()> {
    for set in sets {
        for (index, element) in set.all.iter().enumerate() {
            document.set_style_property(*element, CONTAINER_INDEX_PROPERTY, index.to_string())?;
        }
        document.set_attribute(set.previous, "aria-hidden", "true")?;
        if preserve_scroll {
            let offset = document.scroll_top(set.previous);
            document.set_scroll_top(set.next, offset)?;
        }

        insert_next(document, set)?;

        if animate {
            // The class must be applied in a layout pass before it is removed,
            // otherwise the transition bound to it never starts
            document.add_class(set.next, NEXT_CLASS)?;
            document.force_reflow(set.next)?;
            document.remove_class(set.next, NEXT_CLASS)?;
        }

        document.add_class(set.previous, PREVIOUS_CLASS)?;
        for element in &set.keep {
            document.add_class(*element, KEPT_CLASS)?;
        }
        for element in &set.remove {
            document.add_class(*element, REMOVING_CLASS)?;
        }
    }
    Ok(())
}

fn insert_next(document: &mut Document, set: &ContainerSet) -> Result<()> {
    match (document.parent(set.previous), set.parent) {
        (Some(parent), _) => document.insert_before(parent, set.next, Some(set.previous)),
        (None, Some(last_known)) => {
            warn!(
                "Outgoing container {} was detached, appending incoming container instead",
                set.selector
            );
            document.append_child(last_known, set.next)
        }
        (None, None) => Err(ParallelError::dom(
            "insert_containers",
            format!("container {} has no parent to insert into", set.selector),
        )),
    }
}

/// Default behavior of `content:insert`
pub struct InsertContainers {
    pub preserve_scroll: bool,
}

#[async_trait]
impl Handler for InsertContainers {
    async fn handle(&self, ctx: &mut HookContext<'_>) -> Result<()> {
        let Some(content) = ctx.args.as_content() else {
            return Ok(());
        };
        insert_containers(
            ctx.document,
            &content.containers,
            ctx.visit.animation.animate,
            self.preserve_scroll,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LayoutFlush;
    use crate::parallel::matcher::{resolve_container, MatchOutcome};
    use crate::parallel::options::Keep;
    use pretty_assertions::assert_eq;

    fn matched(doc: &mut Document, incoming: &Document, keep: i64) -> ContainerSet {
        match resolve_container("#main", &Keep::Count(keep), doc, incoming).unwrap() {
            MatchOutcome::Matched(set) => set,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_insert_places_next_before_previous() {
        let mut doc = Document::parse(r#"<body><header></header><main id="main">old</main></body>"#);
        let incoming = Document::parse(r#"<body><main id="main">new</main></body>"#);
        let set = matched(&mut doc, &incoming, 0);

        insert_containers(&mut doc, std::slice::from_ref(&set), true, false).unwrap();

        let parent = set.parent.unwrap();
        let children = doc.children(parent);
        let at = children.iter().position(|c| *c == set.previous).unwrap();
        assert_eq!(children[at - 1], set.next);

        assert_eq!(doc.attribute(set.previous, "aria-hidden"), Some("true"));
        assert!(doc.has_class(set.previous, PREVIOUS_CLASS));
        assert!(doc.has_class(set.previous, REMOVING_CLASS));
        assert!(!doc.has_class(set.next, NEXT_CLASS));
        assert_eq!(doc.style_property(set.next, CONTAINER_INDEX_PROPERTY), Some("0"));
        assert_eq!(doc.style_property(set.previous, CONTAINER_INDEX_PROPERTY), Some("1"));
        assert_eq!(
            doc.layout_flushes(),
            &[LayoutFlush {
                node: set.next,
                classes: vec![NEXT_CLASS.to_string()]
            }]
        );
    }

    #[test]
    fn test_insert_without_animation_skips_reflow() {
        let mut doc = Document::parse(r#"<main id="main"></main>"#);
        let incoming = Document::parse(r#"<main id="main"></main>"#);
        let set = matched(&mut doc, &incoming, 1);

        insert_containers(&mut doc, std::slice::from_ref(&set), false, false).unwrap();
        assert!(doc.layout_flushes().is_empty());
        assert!(doc.has_class(set.previous, KEPT_CLASS));
        assert!(!doc.has_class(set.previous, REMOVING_CLASS));
    }

    #[test]
    fn test_detached_previous_falls_back_to_parent() {
        let mut doc = Document::parse(r#"<body><main id="main"></main><footer></footer></body>"#);
        let incoming = Document::parse(r#"<main id="main"></main>"#);
        let set = matched(&mut doc, &incoming, 0);
        let parent = set.parent.unwrap();

        doc.remove(set.previous).unwrap();
        insert_containers(&mut doc, std::slice::from_ref(&set), true, false).unwrap();
        assert_eq!(doc.children(parent).last(), Some(&set.next));
        assert!(doc.is_connected(set.next));
    }

    #[test]
    fn test_preserve_scroll() {
        let mut doc = Document::parse(r#"<main id="main"></main>"#);
        let incoming = Document::parse(r#"<main id="main"></main>"#);
        let set = matched(&mut doc, &incoming, 0);
        doc.set_scroll_top(set.previous, 240).unwrap();

        insert_containers(&mut doc, std::slice::from_ref(&set), true, true).unwrap();
        assert_eq!(doc.scroll_top(set.next), 240);
    }
}
