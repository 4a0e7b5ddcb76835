//! Argument-shape checking for commands.

use crate::error::ShellError;
use crate::list;
use crate::value::Cell;

/// Check that `actual` holds at least `min` arguments, returning up to
/// `max` leading elements plus whatever remains.
pub fn variadic(actual: &Cell, min: usize, max: usize) -> Result<(Vec<Cell>, Cell), ShellError> {
    let mut expected = Vec::with_capacity(max);
    let mut rest = actual.clone();

    for i in 0..max {
        if rest.is_null() {
            if i < min {
                return Err(ShellError::Arity {
                    expected: count(min, "argument", "s"),
                    got: i,
                });
            }
            break;
        }
        expected.push(rest.car());
        rest = rest.cdr();
    }

    Ok((expected, rest))
}

/// Like [`variadic`], but the argument list must hold no more than `max`
/// elements.
pub fn fixed(actual: &Cell, min: usize, max: usize) -> Result<Vec<Cell>, ShellError> {
    let (expected, rest) = variadic(actual, min, max)?;
    if !rest.is_null() {
        return Err(ShellError::Arity {
            expected: count(max, "argument", "s"),
            got: list::length(actual),
        });
    }
    Ok(expected)
}

/// A human-readable count: `count(1, "argument", "s")` is "1 argument".
pub fn count(n: usize, label: &str, plural: &str) -> String {
    let suffix = if n == 1 { "" } else { plural };
    format!("{n} {label}{suffix}")
}
