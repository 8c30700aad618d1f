//! HTML parsing for incoming pages

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

use crate::dom::document::{Document, ElementData, NodeId};

/// Parse an HTML string into a [`Document`]. Parsing follows the HTML5
/// algorithm, so malformed markup is recovered rather than rejected.
pub fn parse_html(html: &str) -> Document {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    let mut doc = Document::new();
    let root = doc.root();
    let mut stack: Vec<(Handle, NodeId)> = dom
        .document
        .children
        .borrow()
        .iter()
        .rev()
        .map(|child| (child.clone(), root))
        .collect();

    while let Some((handle, parent)) = stack.pop() {
        let id = match &handle.data {
            NodeData::Element { name, attrs, .. } => {
                let mut data = ElementData::new(&*name.local);
                data.attributes.extend(
                    attrs
                        .borrow()
                        .iter()
                        .map(|attr| (attr.name.local.to_string(), attr.value.to_string())),
                );
                doc.create_element_with(data)
            }
            NodeData::Text { contents } => doc.create_text(contents.borrow().to_string()),
            NodeData::Comment { contents } => doc.create_comment(contents.to_string()),
            NodeData::Document | NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {
                continue
            }
        };
        if let Err(e) = doc.append_child(parent, id) {
            debug!("Dropping unparented node from incoming document: {}", e);
            continue;
        }
        for child in handle.children.borrow().iter().rev() {
            stack.push((child.clone(), id));
        }
    }

    doc
}
