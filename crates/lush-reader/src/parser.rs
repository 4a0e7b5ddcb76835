//! A recursive descent parser for the lush command language.
//!
//! The parser pulls tokens from a [`TokenSource`] with one token of
//! lookahead and hands each completed top-level form to an emit callback.
//! Every descent function returns a `Result`; running out of tokens inside
//! a construct is reported as [`ShellError::Incomplete`] so interactive
//! callers can ask for another line.

use lush_core::{escape, list, Cell, Loc, ShellError};

use crate::lexer::Lexer;
use crate::token::{Class, Token};

/// Anything that can feed tokens to the parser.
pub trait TokenSource {
    fn next_token(&mut self) -> Option<Token>;
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Option<Token> {
        self.token()
    }
}

/// Adapter for driving the parser from a plain callback.
pub struct TokenFn<F>(pub F);

impl<F: FnMut() -> Option<Token>> TokenSource for TokenFn<F> {
    fn next_token(&mut self) -> Option<Token> {
        (self.0)()
    }
}

fn sym_token(t: &Token) -> Cell {
    Cell::symbol_at(t.value(), t.source().clone())
}

// A brace group is an explicit block form; one produced by a sequence
// already carries the block head.
fn make_block(c: Cell) -> Cell {
    if c.is_pair() && !c.is_null() && c.car().symbol_text().as_deref() == Some("block") {
        return c;
    }
    list::new(&[Cell::symbol("block"), c])
}

// The textual form of a meta command argument. Adjacent lexemes arrive
// joined as (mend "" e1 e2 ...); their static concatenation is the text,
// which is how (|number 3/4|) survives '/' being its own symbol.
fn meta_text(arg: &Cell) -> Option<String> {
    if arg.is_pair() && !arg.is_null() {
        if arg.car().symbol_text().as_deref() != Some("mend") {
            return None;
        }
        let mut out = String::new();
        let mut rest = arg.cddr();
        while !rest.is_null() {
            out.push_str(&rest.car().text_form()?);
            rest = rest.cdr();
        }
        return Some(out);
    }
    arg.text_form()
}

/// The parser. Create one over a token source and call
/// [`parse`](Parser::parse).
pub struct Parser<S: TokenSource> {
    source: S,
    ahead: Option<Token>,
    current: Cell,
    last: Loc,
}

type Parse<T> = Result<T, ShellError>;

impl<S: TokenSource> Parser<S> {
    pub fn new(source: S) -> Self {
        Parser {
            source,
            ahead: None,
            current: Cell::Null,
            last: Loc::default(),
        }
    }

    /// The command parsed so far. (Command completion.)
    pub fn current(&self) -> Cell {
        self.current.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consume tokens and emit one cell per top-level form until the token
    /// source runs dry.
    pub fn parse(&mut self, emit: &mut dyn FnMut(Cell)) -> Parse<()> {
        loop {
            let Some(class) = self.peek_class() else {
                return Ok(());
            };

            if class == Class::Char('\n') {
                self.consume();
                continue;
            }

            let c = self.possible_background()?;
            emit(c);
        }
    }

    // ── Lookahead ─────────────────────────────────────────────────

    fn peek(&mut self) -> Option<&Token> {
        if self.ahead.is_none() {
            self.ahead = self.source.next_token();
            if let Some(t) = &self.ahead {
                self.last = t.source().clone();
            }
        }
        self.ahead.as_ref()
    }

    fn peek_class(&mut self) -> Option<Class> {
        self.peek().map(|t| t.class())
    }

    fn peek_is(&mut self, class: Class) -> bool {
        self.peek().is_some_and(|t| t.is(class))
    }

    fn peek_symbol_eq(&mut self, text: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.is(Class::Symbol) && t.value() == text)
    }

    fn consume(&mut self) -> Token {
        self.ahead.take().expect("consume without lookahead")
    }

    fn skip_spaces(&mut self) {
        while self.peek_is(Class::Space) {
            self.consume();
        }
    }

    // ── Errors ────────────────────────────────────────────────────

    fn incomplete(&self) -> ShellError {
        ShellError::Incomplete {
            location: self.last.clone(),
        }
    }

    fn unexpected(&mut self) -> ShellError {
        if self.peek().is_none() {
            return self.incomplete();
        }

        let t = self.peek().expect("token present");
        ShellError::syntax(
            format!("unexpected '{}'", t.source().text),
            t.source().clone(),
        )
    }

    fn check(&mut self, c: Option<Cell>) -> Parse<Cell> {
        match c {
            Some(c) => Ok(c),
            None => Err(self.unexpected()),
        }
    }

    fn expect(&mut self, classes: &[Class]) -> Parse<()> {
        let found = self
            .peek()
            .map(|t| classes.iter().any(|c| t.is(*c)));

        match found {
            None => Err(self.incomplete()),
            Some(true) => {
                self.consume();
                Ok(())
            }
            Some(false) => {
                let t = self.peek().expect("token present");
                let value = t.value().to_string();
                let location = t.source().clone();

                let names: Vec<String> = classes.iter().map(|c| c.to_string()).collect();
                let wanted = match names.as_slice() {
                    [one] => one.clone(),
                    [a, b] => format!("{a} or {b}"),
                    _ => {
                        let (tail, init) = names.split_last().expect("non-empty");
                        format!("{}, or {}", init.join(", "), tail)
                    }
                };

                Err(ShellError::syntax(
                    format!("expected {wanted} got \"{value}\""),
                    location,
                ))
            }
        }
    }

    // ── Grammar ───────────────────────────────────────────────────

    // <possibleBackground> ::= <command> '&'?
    fn possible_background(&mut self) -> Parse<Cell> {
        let c = self.command()?;
        let mut c = self.check(c)?;

        if self.peek_is(Class::Background) {
            let t = self.consume();
            c = list::new(&[sym_token(&t), c]);
        }

        Ok(c)
    }

    // <command> ::= <possibleAndf> (Orf <possibleAndf>)*
    fn command(&mut self) -> Parse<Option<Cell>> {
        let Some(mut c) = self.possible_andf()? else {
            return Ok(None);
        };

        while self.peek_is(Class::Orf) {
            let t = self.consume();
            let rhs = self.possible_andf()?;
            let rhs = self.check(rhs)?;
            c = list::new(&[sym_token(&t), c, rhs]);
        }

        Ok(Some(c))
    }

    // <possibleAndf> ::= <possiblePipeline> (Andf <possiblePipeline>)*
    fn possible_andf(&mut self) -> Parse<Option<Cell>> {
        let Some(mut c) = self.possible_pipeline()? else {
            return Ok(None);
        };

        while self.peek_is(Class::Andf) {
            let t = self.consume();
            let rhs = self.possible_pipeline()?;
            let rhs = self.check(rhs)?;
            c = list::new(&[sym_token(&t), c, rhs]);
        }

        Ok(Some(c))
    }

    // <possiblePipeline> ::= <possibleSequence> (Pipe <possiblePipeline>)?
    //
    // Pipe is right-associative.
    fn possible_pipeline(&mut self) -> Parse<Option<Cell>> {
        let Some(c) = self.possible_sequence()? else {
            return Ok(None);
        };

        if self.peek_is(Class::Pipe) {
            let t = self.consume();
            let rhs = self.possible_pipeline()?;
            let rhs = self.check(rhs)?;
            return Ok(Some(list::new(&[sym_token(&t), c, rhs])));
        }

        Ok(Some(c))
    }

    // <possibleSequence> ::= <possibleRedirection> (';' <possibleRedirection>)*
    fn possible_sequence(&mut self) -> Parse<Option<Cell>> {
        let Some(first) = self.possible_redirection()? else {
            return Ok(None);
        };

        if !self.peek_is(Class::Char(';')) {
            return Ok(Some(first));
        }

        let mut items = vec![Cell::symbol("block"), first];
        while self.peek_is(Class::Char(';')) {
            self.consume();
            self.skip_spaces();

            // A separator may trail the last command.
            match self.peek_class() {
                None | Some(Class::Char('\n' | '}' | ')')) => break,
                _ => {}
            }

            let c = self.possible_redirection()?;
            items.push(self.check(c)?);
        }

        Ok(Some(list::new(&items)))
    }

    // <possibleRedirection> ::= <possibleSubstitution> (Redirect <expression>)*
    fn possible_redirection(&mut self) -> Parse<Option<Cell>> {
        let Some(mut c) = self.possible_substitution()? else {
            return Ok(None);
        };

        while self.peek_is(Class::Redirect) {
            let t = self.consume();
            self.skip_spaces();

            let e = self.element()?;
            let e = self.check(e)?;
            let e = self.implicit_join(e)?;
            c = list::new(&[sym_token(&t), c, e]);

            self.skip_spaces();
        }

        Ok(Some(c))
    }

    // <possibleSubstitution> ::= <statement> (Substitute <expression> <statement>?)*
    fn possible_substitution(&mut self) -> Parse<Option<Cell>> {
        let Some(c) = self.statement()? else {
            return Ok(None);
        };

        if !self.peek_is(Class::Substitute) {
            return Ok(Some(c));
        }

        let mut form = Cell::cons(Cell::symbol("process-substitution"), c);
        while self.peek_is(Class::Substitute) {
            let t = self.consume();

            let e = self.element()?;
            let e = self.check(e)?;
            form = list::append(&form, &[Cell::cons(sym_token(&t), e)]);

            if !self.peek_is(Class::Substitute) {
                if let Some(s) = self.statement()? {
                    form = list::join(&form, &s);
                }
            }
        }

        Ok(Some(form))
    }

    // <statement> ::= (assignment* (braces | joined)?)+
    //
    // A statement is emitted as the proper list of its elements. One or
    // more leading assignments wrap the whole thing in a block of export
    // forms; a statement that is exactly one brace group emits the block
    // form itself.
    fn statement(&mut self) -> Parse<Option<Cell>> {
        self.current = Cell::Null;

        let (first, first_is_braces, exports) = self.assignments()?;

        let Some(first) = first else {
            if exports.is_empty() {
                return Ok(None);
            }
            let mut items = vec![Cell::symbol("block")];
            items.extend(exports);
            return Ok(Some(list::new(&items)));
        };

        let mut items = vec![first];
        loop {
            self.current = list::new(&items);

            if self.peek_is(Class::Space) {
                self.consume();
                continue;
            }

            if let Some(b) = self.braces()? {
                items.push(b);
                continue;
            }

            let Some(e) = self.element()? else {
                break;
            };
            items.push(self.implicit_join(e)?);
        }

        if exports.is_empty() && first_is_braces && items.len() == 1 {
            let b = items.pop().expect("one item");
            return Ok(Some(b));
        }

        let cmd = list::new(&items);
        self.current = cmd.clone();

        if exports.is_empty() {
            return Ok(Some(cmd));
        }

        let mut block = vec![Cell::symbol("block")];
        block.extend(exports);
        block.push(cmd);
        Ok(Some(list::new(&block)))
    }

    // Leading NAME = VALUE pairs, each rewritten to (export NAME VALUE).
    // Returns the first non-assignment item, whether it was a brace
    // group, and the collected exports.
    fn assignments(&mut self) -> Parse<(Option<Cell>, bool, Vec<Cell>)> {
        let mut exports = Vec::new();

        loop {
            self.skip_spaces();

            if let Some(b) = self.braces()? {
                return Ok((Some(b), true, exports));
            }

            let Some(c) = self.element()? else {
                return Ok((None, false, exports));
            };

            if c.is_symbol() {
                let mut saw_space = false;
                while self.peek_is(Class::Space) {
                    self.consume();
                    saw_space = true;
                }

                if self.peek_symbol_eq("=") {
                    self.consume();
                    self.skip_spaces();

                    let v = self.element()?;
                    let v = self.check(v)?;
                    let v = self.implicit_join(v)?;
                    exports.push(list::new(&[Cell::symbol("export"), c, v]));
                    continue;
                }

                if saw_space {
                    // Not an assignment; the space ended the element.
                    return Ok((Some(c), false, exports));
                }
            }

            let c = self.implicit_join(c)?;
            return Ok((Some(c), false, exports));
        }
    }

    // <braces> ::= '{' ('\n' <block> '}' | <braces> '}' | <command> '}')
    fn braces(&mut self) -> Parse<Option<Cell>> {
        if !self.peek_is(Class::Char('{')) {
            return Ok(None);
        }
        self.consume();

        if self.peek_is(Class::Char('\n')) {
            self.consume();
            let members = self.block_members()?;
            self.expect(&[Class::Char('}')])?;

            let mut items = vec![Cell::symbol("block")];
            items.extend(members);
            return Ok(Some(list::new(&items)));
        }

        self.skip_spaces();

        if self.peek_is(Class::Char('{')) {
            let inner = self.braces()?;
            let inner = self.check(inner)?;
            self.expect(&[Class::Char('}')])?;
            return Ok(Some(inner));
        }

        let c = self.command()?;
        let c = self.check(c)?;
        self.skip_spaces();
        self.expect(&[Class::Char('}')])?;
        Ok(Some(make_block(c)))
    }

    // <block> ::= (<command> | '\n')*
    fn block_members(&mut self) -> Parse<Vec<Cell>> {
        let mut members = Vec::new();

        loop {
            self.skip_spaces();

            let Some(class) = self.peek_class() else {
                return Err(self.incomplete());
            };

            match class {
                Class::Char('\n') => {
                    self.consume();
                }
                Class::Char('}') => return Ok(members),
                _ => members.push(self.possible_background()?),
            }
        }
    }

    // Adjacent elements with no intervening space are joined into a
    // single (mend "" e1 e2 ...) form.
    fn implicit_join(&mut self, c: Cell) -> Parse<Cell> {
        let mut parts = vec![c];
        while let Some(e) = self.element()? {
            parts.push(e);
        }

        if parts.len() == 1 {
            return Ok(parts.pop().expect("one part"));
        }

        let mut items = vec![Cell::symbol("mend"), Cell::string("")];
        items.extend(parts);
        Ok(list::new(&items))
    }

    // <element> ::= '`' <value> | <expression>
    fn element(&mut self) -> Parse<Option<Cell>> {
        if self.peek_is(Class::Char('`')) {
            self.consume();

            let v = self.value()?;
            let v = self.check(v)?;
            let cmd = if v.is_pair() && !v.is_null() {
                v
            } else {
                list::new(&[v])
            };

            return Ok(Some(list::new(&[
                Cell::symbol("splice"),
                list::new(&[Cell::symbol("capture"), cmd]),
            ])));
        }

        self.expression()
    }

    // <expression> ::= '$' ('{' <element> '}' | <expression>) | <value>
    fn expression(&mut self) -> Parse<Option<Cell>> {
        if !self.peek_is(Class::Char('$')) {
            return self.value();
        }
        self.consume();

        let c = if self.peek_is(Class::Char('{')) {
            self.consume();
            self.skip_spaces();

            let e = self.element()?;
            let e = self.check(e)?;
            let e = self.implicit_join(e)?;

            self.skip_spaces();
            self.expect(&[Class::Char('}')])?;
            e
        } else {
            let e = self.expression()?;
            self.check(e)?
        };

        Ok(Some(list::new(&[Cell::symbol("resolve"), c])))
    }

    // <value> ::= '(' <command> ')' | MetaOpen <command> MetaClose | <word>
    fn value(&mut self) -> Parse<Option<Cell>> {
        let meta = self.peek_is(Class::MetaOpen);
        if !meta && !self.peek_is(Class::Char('(')) {
            return self.word();
        }
        self.consume();

        let c = self.command()?;

        let Some(c) = c else {
            if !meta && self.peek_is(Class::Char(')')) {
                self.consume();
                return Ok(Some(Cell::Null));
            }
            return Err(self.unexpected());
        };

        if meta {
            self.expect(&[Class::MetaClose])?;
            return Ok(Some(self.meta(c)?));
        }

        self.expect(&[Class::Char(')')])?;
        Ok(Some(c))
    }

    // (| head arg |), evaluated at parse time.
    fn meta(&mut self, c: Cell) -> Parse<Cell> {
        let head = c.car();
        let Some(name) = head.symbol_text() else {
            return Err(ShellError::syntax(
                format!(
                    "meta command must start with a symbol not {}",
                    head.type_name()
                ),
                self.last.clone(),
            ));
        };

        match name.as_str() {
            "cons" => return Ok(Cell::cons(c.cadr(), c.caddr())),
            "number" | "status" | "symbol" => {}
            _ => {
                return Err(ShellError::syntax(
                    "invalid meta command",
                    self.last.clone(),
                ));
            }
        }

        let arg = c.cadr();
        let Some(text) = meta_text(&arg) else {
            return Err(ShellError::syntax(
                "invalid meta command argument",
                self.last.clone(),
            ));
        };

        match name.as_str() {
            "number" => Cell::number(&text),
            "status" => Cell::status(&text),
            _ => Ok(Cell::symbol(&text)),
        }
    }

    // <word> ::= DollarSingleQuoted | DoubleQuoted | SingleQuoted | Symbol
    fn word(&mut self) -> Parse<Option<Cell>> {
        let Some(class) = self.peek_class() else {
            return Ok(None);
        };

        match class {
            Class::DollarSingleQuoted => {
                let t = self.consume();
                let v = t.value();
                let s = escape::unescape(&v[2..v.len() - 1])?;
                Ok(Some(Cell::string(s)))
            }
            Class::DoubleQuoted => {
                let t = self.consume();
                let v = t.value();
                let s = escape::unescape(&v[1..v.len() - 1])?;
                Ok(Some(list::new(&[
                    Cell::symbol("interpolate"),
                    Cell::string(s),
                ])))
            }
            Class::SingleQuoted => {
                let t = self.consume();
                let v = t.value();
                Ok(Some(Cell::string(&v[1..v.len() - 1])))
            }
            Class::Symbol => {
                let t = self.consume();
                Ok(Some(sym_token(&t)))
            }
            _ => Ok(None),
        }
    }
}
