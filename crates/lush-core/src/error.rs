use std::fmt;

/// A source location: where a token (or the construct built from it) began.
///
/// `text` holds the source line up to, but not including, the terminating
/// newline, so errors can show the offending line verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Loc {
    pub name: String,
    pub line: usize,
    pub char: usize,
    pub text: String,
}

impl Loc {
    pub fn start(name: impl Into<String>) -> Self {
        Loc {
            name: name.into(),
            line: 1,
            char: 1,
            text: String::new(),
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.line, self.char)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ShellError {
    #[error("{location}: {message}")]
    Syntax { message: String, location: Loc },

    #[error("{location}: incomplete input")]
    Incomplete { location: Loc },

    #[error("'{0}' is not a valid number")]
    Number(String),

    #[error("expected {expected}, passed {got}")]
    Arity { expected: String, got: usize },

    #[error("invalid escape: {0}")]
    Escape(String),
}

impl ShellError {
    pub fn syntax(message: impl Into<String>, location: Loc) -> Self {
        ShellError::Syntax {
            message: message.into(),
            location,
        }
    }

    /// True if this error means "the input ended too soon" rather than
    /// "the input is wrong". Interactive callers use this to decide
    /// between a continuation prompt and an error message.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ShellError::Incomplete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loc_display() {
        let loc = Loc {
            name: "stdin".into(),
            line: 3,
            char: 7,
            text: "echo hi".into(),
        };
        assert_eq!(loc.to_string(), "stdin:3:7");
    }

    #[test]
    fn test_syntax_error_shape() {
        let e = ShellError::syntax(
            "unexpected ')'",
            Loc {
                name: "script".into(),
                line: 2,
                char: 5,
                text: ")".into(),
            },
        );
        assert_eq!(e.to_string(), "script:2:5: unexpected ')'");
    }

    #[test]
    fn test_number_error_shape() {
        let e = ShellError::Number("bogus".into());
        assert_eq!(e.to_string(), "'bogus' is not a valid number");
    }

    #[test]
    fn test_incomplete_is_incomplete() {
        let e = ShellError::Incomplete {
            location: Loc::start("stdin"),
        };
        assert!(e.is_incomplete());
        assert!(!ShellError::Number("x".into()).is_incomplete());
    }
}
