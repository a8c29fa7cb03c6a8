/// Form-level signals the integrator forwards to [`crate::FormValidation::handle_event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormEvent {
    Submit,
    Reset,
}

/// What the caller should do with the event after it was handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventOutcome {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventOutcome {
    pub fn cancel() -> Self {
        Self {
            prevent_default: true,
            stop_propagation: true,
        }
    }
}
