use html::SelectorError;
use sanitizer::AllowlistError;
use thiserror::Error;

pub type TemplateResult<T> = Result<T, TemplateError>;

/// A recognized option whose value matches none of its documented types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{}: Option \"{option}\" provided type \"{found}\" but expected type \"{expected}\".",
    .component.to_uppercase()
)]
pub struct ConfigTypeError {
    pub component: String,
    pub option: String,
    pub expected: String,
    pub found: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("template must yield exactly one root element, found {found}")]
    RootCount { found: usize },

    #[error("deferred content did not settle within {limit} steps")]
    DeferredTooDeep { limit: usize },
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error(transparent)]
    ConfigType(#[from] ConfigTypeError),

    #[error("Template shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("Invalid content selector: {0}")]
    InvalidSelector(#[from] SelectorError),

    #[error("Invalid allowList option: {0}")]
    AllowList(#[from] AllowlistError),
}
