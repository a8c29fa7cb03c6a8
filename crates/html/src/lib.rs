//! Markup plumbing for formkit: a lenient fragment parser, a serializer, a small CSS
//! selector engine and the node helpers the sanitizer, template and form layers use.

pub mod debug;
pub mod dom_utils;
pub mod select;

mod dom_builder;
mod entities;
mod serialize;
mod tokenizer;
mod types;

pub use crate::dom_builder::{build_fragment, parse_document, parse_fragment};
pub use crate::dom_utils::{DataValue, data_attributes, text_content};
pub use crate::entities::{escape_attr, escape_text};
pub use crate::select::{Selector, SelectorError, find_all, find_one};
pub use crate::serialize::{inner_html, serialize_children, to_html};
pub use crate::tokenizer::tokenize;
pub use crate::types::{Id, Node, NodeId, Token};
