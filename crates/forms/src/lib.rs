//! Form validation feedback: discovers the controls of a form, runs constraint
//! validation and renders per-field feedback through templates.

pub mod controls;
mod error;
mod events;
mod field;
mod form_validation;
mod messages;
pub mod validity;

pub use crate::error::{FormError, FormResult};
pub use crate::events::{EventOutcome, FormEvent};
pub use crate::field::{DEFAULT_MESSAGE, FeedbackType, Field, FieldSlot};
pub use crate::form_validation::{
    CLASS_VALIDATED, FormValidation, FormValidationConfig, NAME, SELECTOR_DATA_TOGGLE, anonymous_key,
};
pub use crate::messages::{MESSAGE_SELECTOR, Messages};
pub use crate::validity::{Flag, Validity};
pub use template::Options;
