//! Document model, selector matching and HTML parsing

pub mod document;
pub mod parse;
pub mod selector;

pub use document::{Document, ElementData, LayoutFlush, Node, NodeId, NodeKind};
pub use parse::parse_html;
pub use selector::{matches_compound, matches_selector, matches_simple, SelectorList};
