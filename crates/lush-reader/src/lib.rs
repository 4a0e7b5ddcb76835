pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::Lexer;
pub use parser::{Parser, TokenFn, TokenSource};
pub use token::{Class, Token};

use lush_core::{Cell, ShellError};

/// Parse a complete buffer, returning one cell per top-level form.
///
/// The label names the source in error messages (a file name, or
/// something like `stdin`).
pub fn read_program(label: &str, text: &str) -> Result<Vec<Cell>, ShellError> {
    let mut lexer = Lexer::new(label);
    lexer.scan(text);
    if !text.ends_with('\n') {
        lexer.scan("\n");
    }

    let mut parser = Parser::new(lexer);
    let mut forms = Vec::new();
    parser.parse(&mut |c| forms.push(c))?;

    // The token stream ran dry but input remains: a quoted literal or
    // escape is still open.
    if parser.source().pending() {
        return Err(ShellError::Incomplete {
            location: parser.source().location(),
        });
    }

    Ok(forms)
}
