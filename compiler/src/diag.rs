// diag.rs — Syntax error diagnostics
//
// The only user-visible failure of this crate is a parse error: malformed
// internal states are programming errors and are not modeled here.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

/// A parse failure in user formula source.
///
/// Carries the first reported error message and its byte span; follow-on
/// errors from the same parse are folded into `extra_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    /// Byte offsets into the pre-processed source, if known.
    pub span: Option<(usize, usize)>,
    /// How many further errors the parser reported after the first.
    pub extra_count: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Option<(usize, usize)>) -> Self {
        Self {
            message: message.into(),
            span,
            extra_count: 0,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some((start, end)) => {
                write!(f, "syntax error at {start}..{end}: {}", self.message)?
            }
            None => write!(f, "syntax error: {}", self.message)?,
        }
        if self.extra_count > 0 {
            write!(f, " (and {} more)", self.extra_count)?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_span() {
        let e = SyntaxError::new("unexpected token", Some((4, 5)));
        assert_eq!(format!("{e}"), "syntax error at 4..5: unexpected token");
    }

    #[test]
    fn display_folds_extra_errors() {
        let mut e = SyntaxError::new("unexpected token", None);
        e.extra_count = 2;
        assert_eq!(format!("{e}"), "syntax error: unexpected token (and 2 more)");
    }
}
