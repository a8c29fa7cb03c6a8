use template::{ConfigTypeError, TemplateError};
use thiserror::Error;

pub type FormResult<T> = Result<T, FormError>;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("Need to be initialized in form elements. \"{given}\" given")]
    TypeMismatch { given: String },

    #[error(transparent)]
    ConfigType(#[from] ConfigTypeError),

    #[error("Feedback template error: {0}")]
    Template(#[from] TemplateError),
}
