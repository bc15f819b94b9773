//! Utility functions shared by the store client, the relay client and the CLI.
//!
//! - **URL validation**: base URLs for the document store and the functions endpoint
//! - **HTTP bodies**: size-limited response reading
//! - **Text processing**: width-aware truncation and control character stripping
//!
//! # Examples
//!
//! ```
//! use folio::util::{strip_control_chars, truncate_to_width, validate_base_url};
//!
//! let base = validate_base_url("https://firestore.googleapis.com").unwrap();
//! assert_eq!(base.scheme(), "https");
//!
//! assert_eq!(truncate_to_width("Consejos de Rust", 10), "Consejo...");
//! assert_eq!(strip_control_chars("\x1b[1mhola\x1b[0m"), "hola");
//! ```

mod http;
mod text;
mod url_validator;

pub use http::{read_limited_text, BodyError};
#[cfg(test)]
pub(crate) use http::stalled_body_server;
pub use text::{indent, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_base_url, UrlValidationError};
