//! Locating secret literals in caller source text.
//!
//! A call is the balanced-parenthesis span starting at the caller's line,
//! and a keyword line is split at the first `=` or `:`. That covers struct
//! literal fields (`key: "value"`), `json!` entries (`"key": "value"`) and
//! macro-style arguments (`key = "value"`). Literals may be ordinary
//! strings, matched in their escaped source form, or raw strings.

mod block;
mod caller;
mod kwarg;

pub use block::extract_block;
pub use caller::{first_external_caller, CallerContext};
pub use kwarg::{
    escape_literal, find_kwarg_line, find_literal, kwarg_pattern, separate_kwarg_line, KwargLine,
    LiteralSpan,
};
