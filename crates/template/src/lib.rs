//! Markup templates populated with sanitized content.

mod append;
mod config;
mod content;
mod error;
mod factory;
pub mod typecheck;

pub use crate::append::AppendTarget;
pub use crate::config::{DEFAULT_TYPE, ExtraClass, NAME, SanitizeFn, TemplateConfig};
pub use crate::content::{Content, ContentEntry, DeferredFn, MAX_DEFERRED_STEPS};
pub use crate::error::{ConfigTypeError, ShapeError, TemplateError, TemplateResult};
pub use crate::factory::TemplateFactory;
pub use crate::typecheck::Options;
