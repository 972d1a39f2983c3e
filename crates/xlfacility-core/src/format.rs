//! Message formatting shim
//!
//! Format arguments are only rendered after the level check passed. A
//! `Display` implementation that reports an error yields the placeholder.

use std::fmt;

/// Message substituted when rendering format arguments fails
pub const FORMAT_PLACEHOLDER: &str = "<FAILED FORMATTING MESSAGE>";

/// Render format arguments, returning `None` if any formatter failed
pub fn render(args: fmt::Arguments<'_>) -> Option<String> {
    if let Some(literal) = args.as_str() {
        return Some(literal.to_string());
    }
    let mut message = String::new();
    fmt::write(&mut message, args).ok().map(|_| message)
}
