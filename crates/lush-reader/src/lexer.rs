//! A streaming scanner for the lush command language.
//!
//! The scanner is a state machine fed incrementally through [`Lexer::scan`]:
//! each state consumes runes until it emits a token or runs out of buffered
//! input, then names the state to continue in. Running out of input mid
//! construct is not an error; the machine picks up where it left off once
//! more text arrives. Each state also records the lexemes that could
//! validly come next, for use by completion code.

use std::collections::VecDeque;

use lush_core::Loc;

use crate::token::{Class, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SkipWhitespace,
    SkipHorizontalSpace,
    CollectHorizontalSpace,
    SkipComment,
    ScanSymbol,
    ScanSingleQuoted,
    ScanDoubleQuoted,
    ScanDollarSingleQuoted,
    AfterAmpersand,
    AfterDollar,
    AfterGreaterThan,
    AfterDoubleGreaterThan,
    AfterGreaterThanAmpersand,
    AfterOpenParen,
    AfterPipe,
    EscapeNewline,
    EscapeNextCharacter,
}

/// Rewrite an operator lexeme to its command-language name.
fn operator(lexeme: &str) -> String {
    match lexeme {
        "&" => "spawn",
        "&&" => "and",
        "<" => "input-from",
        ">" => "output-to",
        ">&" => "output-errors-to",
        ">&|" => "output-errors-clobbers",
        ">>" => "append-output-to",
        ">>&" => "append-output-errors-to",
        ">|" => "output-clobbers",
        "|" => "pipe-output-to",
        "|&" => "pipe-output-errors-to",
        "|<" => "-named-pipe-input-from",
        "|>" => "-named-pipe-output-to",
        "||" => "or",
        other => other,
    }
    .to_string()
}

/// The scanner. Feed it text with [`scan`](Lexer::scan), pull tokens with
/// [`token`](Lexer::token).
#[derive(Debug, Clone)]
pub struct Lexer {
    expected: Vec<&'static str>,

    bytes: String,      // Buffer being scanned.
    first: usize,       // Byte index of the current token's first byte.
    index: usize,       // Byte index of the current byte.
    queue: Vec<String>, // Buffers waiting to be scanned.
    runes: usize,       // Runes scanned on the current line.
    saved: Option<State>,
    state: State,

    source: Loc,

    tokens: VecDeque<Token>,
}

impl Lexer {
    /// Create a new scanner. The label can be a file name or any other
    /// identifier for error messages.
    pub fn new(label: &str) -> Self {
        Lexer {
            expected: Vec::new(),
            bytes: String::new(),
            first: 0,
            index: 0,
            queue: Vec::new(),
            runes: 1,
            saved: None,
            state: State::SkipWhitespace,
            source: Loc::start(label),
            tokens: VecDeque::new(),
        }
    }

    /// Queue a buffer of text for scanning.
    pub fn scan(&mut self, text: &str) {
        self.queue.push(text.to_string());
    }

    /// The lexemes that could validly come next. (Command completion.)
    pub fn expected(&self) -> &[&'static str] {
        &self.expected
    }

    /// The text of the token being scanned.
    pub fn text(&self) -> String {
        self.bytes[self.first..self.index].to_string()
    }

    /// True when buffered input remains unconsumed — a construct (quoted
    /// literal, escape, partial token) is still waiting for more text.
    pub fn pending(&self) -> bool {
        !self.queue.is_empty() || self.first < self.bytes.len()
    }

    /// The location scanning has reached.
    pub fn location(&self) -> Loc {
        self.source.clone()
    }

    /// The next token, or None when no more tokens can be produced from
    /// the input buffered so far. Scanner state is preserved across None
    /// returns; feed more text with [`scan`](Lexer::scan) and call again.
    pub fn token(&mut self) -> Option<Token> {
        loop {
            self.gather();

            if self.bytes.is_empty() {
                return None;
            }

            if let Some(t) = self.tokens.pop_front() {
                return Some(t);
            }

            match self.run(self.state) {
                Some(next) => self.state = next,
                None => return self.tokens.pop_front(),
            }
        }
    }

    // Fold queued buffers into the working buffer, rebasing indices so the
    // unconsumed tail of the old buffer comes first.
    fn gather(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let mut bytes = self.queue.concat();
        self.queue.clear();

        if !self.bytes.is_empty() && self.first < self.bytes.len() {
            bytes.insert_str(0, &self.bytes[self.first..]);
        }

        self.bytes = bytes;
        self.index -= self.first;
        self.first = 0;
    }

    fn peek(&self) -> Option<(char, usize)> {
        let r = self.bytes[self.index..].chars().next()?;
        Some((r, r.len_utf8()))
    }

    fn accept(&mut self, r: char, w: usize) {
        if r == '\n' {
            self.source.line += 1;
            self.runes = 1;
        } else {
            self.runes += 1;
        }

        self.index += w;
    }

    fn next(&mut self) -> Option<char> {
        let (r, w) = self.peek()?;
        self.accept(r, w);
        Some(r)
    }

    fn emit(&mut self, class: Class, value: String) {
        let mut source = self.source.clone();
        if class == Class::Char('\n') {
            // Report a newline as part of the line it terminates.
            source.line -= 1;
        }

        source.text = self.bytes[self.first..].trim_end_matches('\n').to_string();

        self.tokens.push_back(Token::new(class, value, source));
        self.skip();
    }

    fn skip(&mut self) {
        self.source.char = self.runes;
        self.first = self.index;
    }

    fn escape(&mut self, escaped: State, next: State) -> State {
        self.saved = Some(escaped);
        next
    }

    fn resume(&mut self) -> State {
        self.saved.take().expect("resume without saved state")
    }

    // ── States ────────────────────────────────────────────────────

    fn run(&mut self, state: State) -> Option<State> {
        match state {
            State::SkipWhitespace => self.start_state(State::SkipWhitespace, "\n\t "),
            State::SkipHorizontalSpace => self.start_state(State::SkipHorizontalSpace, "\t "),
            State::CollectHorizontalSpace => self.collect_horizontal_space(),
            State::SkipComment => self.skip_comment(),
            State::ScanSymbol => self.scan_symbol(),
            State::ScanSingleQuoted => {
                self.scan_quoted(State::ScanSingleQuoted, '\'', Class::SingleQuoted, false)
            }
            State::ScanDoubleQuoted => {
                self.scan_quoted(State::ScanDoubleQuoted, '"', Class::DoubleQuoted, true)
            }
            State::ScanDollarSingleQuoted => self.scan_quoted(
                State::ScanDollarSingleQuoted,
                '\'',
                Class::DollarSingleQuoted,
                true,
            ),
            State::AfterAmpersand => self.after_ampersand(),
            State::AfterDollar => self.after_dollar(),
            State::AfterGreaterThan => self.after_greater_than(),
            State::AfterDoubleGreaterThan => self.after_double_greater_than(),
            State::AfterGreaterThanAmpersand => self.after_greater_than_ampersand(),
            State::AfterOpenParen => self.after_open_paren(),
            State::AfterPipe => self.after_pipe(),
            State::EscapeNewline => self.escape_newline(),
            State::EscapeNextCharacter => self.escape_next_character(),
        }
    }

    fn start_state(&mut self, state: State, ignore: &str) -> Option<State> {
        self.expected = Vec::new();

        loop {
            let (r, w) = self.peek()?;
            self.accept(r, w);

            if ignore.contains(r) {
                self.skip();
                continue;
            }

            return Some(match r {
                '\n' | ')' | ';' | '`' | '{' | '}' => {
                    let t = self.text();
                    self.emit(Class::Char(r), t);

                    State::CollectHorizontalSpace
                }
                '<' => {
                    let v = operator(&self.text());
                    self.emit(Class::Redirect, v);

                    State::SkipHorizontalSpace
                }
                '\\' => self.escape(state, State::EscapeNewline),
                ',' | '.' | '/' | ':' | '=' | '@' | '~' => {
                    let t = self.text();
                    self.emit(Class::Symbol, t);

                    State::CollectHorizontalSpace
                }
                '"' => State::ScanDoubleQuoted,
                '#' => State::SkipComment,
                '$' => State::AfterDollar,
                '&' => State::AfterAmpersand,
                '\'' => State::ScanSingleQuoted,
                '(' => State::AfterOpenParen,
                '>' => State::AfterGreaterThan,
                '|' => State::AfterPipe,
                _ => State::ScanSymbol,
            });
        }
    }

    fn collect_horizontal_space(&mut self) -> Option<State> {
        loop {
            let (r, w) = self.peek()?;

            match r {
                '\n' => {
                    self.accept(r, w);
                    let t = self.text();
                    self.emit(Class::Char('\n'), t);

                    return Some(State::SkipWhitespace);
                }
                '#' => {
                    self.accept(r, w);

                    return Some(State::SkipComment);
                }
                '\t' | ' ' => self.accept(r, w),
                _ => {
                    let t = self.text();
                    if !t.is_empty() {
                        self.emit(Class::Space, t);
                    }

                    return Some(State::SkipHorizontalSpace);
                }
            }
        }
    }

    fn skip_comment(&mut self) -> Option<State> {
        loop {
            let r = self.next()?;

            if r == '\n' {
                let t = self.text();
                self.emit(Class::Char('\n'), t);

                return Some(State::SkipWhitespace);
            }
        }
    }

    fn scan_symbol(&mut self) -> Option<State> {
        // A symbol runs until a delimiter. The characters , . / : = @ ~
        // are symbols of exactly one character, and a trailing $ hands
        // off to AfterDollar.
        loop {
            let (r, w) = self.peek()?;

            match r {
                '\t' | '\n' | ' ' | '"' | '#' | '&' | '\'' | '(' | ')' | ';' | '<' | '>'
                | '`' | '{' | '|' | '}' => {
                    let t = self.text();
                    self.emit(Class::Symbol, t);

                    return Some(State::CollectHorizontalSpace);
                }
                ',' | '.' | '/' | ':' | '=' | '@' | '~' => {
                    let t = self.text();
                    if !t.is_empty() {
                        self.emit(Class::Symbol, t);
                    }

                    self.accept(r, w);
                    let t = self.text();
                    self.emit(Class::Symbol, t);

                    return Some(State::CollectHorizontalSpace);
                }
                '$' => {
                    let t = self.text();
                    if !t.is_empty() {
                        self.emit(Class::Symbol, t);
                    }

                    self.accept(r, w);

                    return Some(State::AfterDollar);
                }
                '\\' => {
                    self.accept(r, w);

                    return Some(self.escape(State::ScanSymbol, State::EscapeNextCharacter));
                }
                _ => self.accept(r, w),
            }
        }
    }

    fn scan_quoted(
        &mut self,
        state: State,
        quote: char,
        class: Class,
        escapes: bool,
    ) -> Option<State> {
        loop {
            let r = self.next()?;

            if r == quote {
                let t = self.text();
                self.emit(class, t);

                return Some(State::CollectHorizontalSpace);
            }

            if escapes && r == '\\' {
                return Some(self.escape(state, State::EscapeNextCharacter));
            }
        }
    }

    fn after_ampersand(&mut self) -> Option<State> {
        let pk = self.peek();

        self.expected = vec![" ", "& "];

        let (r, w) = pk?;

        if r == '&' {
            self.accept(r, w);
            let v = operator(&self.text());
            self.emit(Class::Andf, v);

            Some(State::SkipWhitespace)
        } else {
            let v = operator(&self.text());
            self.emit(Class::Background, v);

            Some(State::CollectHorizontalSpace)
        }
    }

    fn after_dollar(&mut self) -> Option<State> {
        let pk = self.peek();

        self.expected = vec!["'"];

        let (r, w) = pk?;

        match r {
            '$' => {
                // Special-case to recognize $$.
                let t = self.text();
                self.emit(Class::Char('$'), t);
                self.accept(r, w);
                let t = self.text();
                self.emit(Class::Symbol, t);
            }
            '\'' => {
                self.accept(r, w);

                return Some(State::ScanDollarSingleQuoted);
            }
            '\t' | '\n' | ' ' | '"' | '#' | '&' | '(' | ')' | ';' | '<' | '>' | '`' | '|'
            | '}' => {
                let t = self.text();
                self.emit(Class::Symbol, t);
            }
            _ => {
                let t = self.text();
                self.emit(Class::Char('$'), t);
            }
        }

        Some(State::CollectHorizontalSpace)
    }

    fn after_greater_than(&mut self) -> Option<State> {
        let pk = self.peek();

        self.expected = vec![" ", "& ", "> ", ">& ", ">&| ", "| "];

        let (r, w) = pk?;

        match r {
            '&' => {
                self.accept(r, w);

                return Some(State::AfterGreaterThanAmpersand);
            }
            '>' => {
                self.accept(r, w);

                return Some(State::AfterDoubleGreaterThan);
            }
            '|' => {
                self.accept(r, w);
                let v = operator(&self.text());
                self.emit(Class::Redirect, v);
            }
            _ => {
                let v = operator(&self.text());
                self.emit(Class::Redirect, v);
            }
        }

        Some(State::SkipHorizontalSpace)
    }

    fn after_double_greater_than(&mut self) -> Option<State> {
        let pk = self.peek();

        self.expected = vec![" ", "& "];

        let (r, w) = pk?;

        if r == '&' {
            self.accept(r, w);
        }
        let v = operator(&self.text());
        self.emit(Class::Redirect, v);

        Some(State::SkipHorizontalSpace)
    }

    fn after_greater_than_ampersand(&mut self) -> Option<State> {
        let pk = self.peek();

        self.expected = vec![" ", "| "];

        let (r, w) = pk?;

        if r == '|' {
            self.accept(r, w);
        }
        let v = operator(&self.text());
        self.emit(Class::Redirect, v);

        Some(State::SkipHorizontalSpace)
    }

    fn after_open_paren(&mut self) -> Option<State> {
        let (r, w) = self.peek()?;

        if r == '|' {
            self.accept(r, w);
            let t = self.text();
            self.emit(Class::MetaOpen, t);
        } else {
            let t = self.text();
            self.emit(Class::Char('('), t);
        }

        Some(State::SkipWhitespace)
    }

    fn after_pipe(&mut self) -> Option<State> {
        let pk = self.peek();

        self.expected = vec![" ", "& ", "<(", ">(", "| "];

        let (r, w) = pk?;

        match r {
            '&' => {
                self.accept(r, w);
                let v = operator(&self.text());
                self.emit(Class::Pipe, v);

                Some(State::SkipWhitespace)
            }
            ')' => {
                self.accept(r, w);
                let t = self.text();
                self.emit(Class::MetaClose, t);

                Some(State::CollectHorizontalSpace)
            }
            '<' | '>' => {
                self.accept(r, w);
                let v = operator(&self.text());
                self.emit(Class::Substitute, v);

                Some(State::SkipHorizontalSpace)
            }
            '|' => {
                self.accept(r, w);
                let v = operator(&self.text());
                self.emit(Class::Orf, v);

                Some(State::SkipWhitespace)
            }
            _ => {
                let v = operator(&self.text());
                self.emit(Class::Pipe, v);

                Some(State::SkipWhitespace)
            }
        }
    }

    // A backslash at top level: immediately before a newline it elides
    // both; otherwise the backslash is literal and scanning resumes as a
    // symbol.
    fn escape_newline(&mut self) -> Option<State> {
        let (r, w) = self.peek()?;

        if r == '\n' {
            self.accept(r, w);
            self.skip();

            Some(self.resume())
        } else {
            self.accept(r, w);
            self.saved = None;

            Some(State::ScanSymbol)
        }
    }

    fn escape_next_character(&mut self) -> Option<State> {
        self.next()?;

        Some(self.resume())
    }
}
