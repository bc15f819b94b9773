//! Contact form: local validation and delivery through the site's email relay.
//!
//! The relay is a callable HTTP function. Requests carry the form inside a
//! `{"data": ...}` envelope; replies carry either `{"result": ...}` or
//! `{"error": {"status", "message"}}`. Forms that fail validation are never
//! sent.

mod form;
mod relay;

pub use form::{ContactForm, Field, ValidForm, ValidationErrors};
pub use relay::{Receipt, RelayClient, RelayErrorKind, SendError, SubmitStatus};
