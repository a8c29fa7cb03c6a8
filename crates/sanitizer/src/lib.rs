//! Allowlist-driven HTML sanitizer.
//!
//! Markup is parsed into a detached tree, rebuilt bottom-up keeping only allowlisted
//! elements and attributes, and serialized back. Elements outside the allowlist are
//! dropped together with their contents. URL-bearing attributes must also pass the
//! safe-URL check unless a custom filter decides for them.

mod allowlist;
mod sanitize;
mod url;

pub use allowlist::{AllowlistError, Allowlist, AttrRule};
pub use sanitize::{AttributeFilter, sanitize, sanitize_fragment};
pub use url::{URI_ATTRIBUTES, is_safe_url, is_uri_attribute};
