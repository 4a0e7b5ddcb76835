use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use lasso::{Rodeo, Spur};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

use crate::conduit::{Channel, Pipe};
use crate::error::{Loc, ShellError};
use crate::escape;
use crate::scope::Env;

// ── Symbol interning ──────────────────────────────────────────────

thread_local! {
    static INTERNER: RefCell<Rodeo> = RefCell::new(Rodeo::default());
}

/// Intern a string, returning a Spur key.
pub fn intern(s: &str) -> Spur {
    INTERNER.with(|r| r.borrow_mut().get_or_intern(s))
}

/// Resolve a Spur key back to a String.
pub fn resolve(spur: Spur) -> String {
    INTERNER.with(|r| r.borrow().resolve(&spur).to_string())
}

/// Resolve a Spur and call f with the &str, avoiding allocation.
pub fn with_resolved<F, R>(spur: Spur, f: F) -> R
where
    F: FnOnce(&str) -> R,
{
    INTERNER.with(|r| {
        let interner = r.borrow();
        f(interner.resolve(&spur))
    })
}

// ── Supporting types ──────────────────────────────────────────────

/// A cons cell. Both slots are mutable in place.
#[derive(Debug)]
pub struct Pair {
    head: RefCell<Cell>,
    tail: RefCell<Cell>,
}

/// An interned identifier, optionally decorated with the source location
/// where the parser saw it. Decoration never affects equality.
#[derive(Debug)]
pub struct Sym {
    name: Spur,
    source: Option<Loc>,
}

impl Sym {
    pub fn text(&self) -> String {
        resolve(self.name)
    }

    pub fn source(&self) -> Option<&Loc> {
        self.source.as_ref()
    }
}

/// An arbitrary-precision rational number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Number(BigRational);

impl Number {
    pub fn rat(&self) -> &BigRational {
        &self.0
    }
}

/// A process exit code. Stored exactly like a number but truthy when zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status(BigRational);

impl Status {
    pub fn rat(&self) -> &BigRational {
        &self.0
    }
}

/// The opcode tag for a user-defined routine: methods evaluate their
/// arguments, syntax receives them unevaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Method,
    Syntax,
}

/// Parameter labels for a user-defined routine.
#[derive(Debug, Clone)]
pub struct Labels {
    pub env: Cell,
    pub params: Cell,
    pub self_label: Cell,
}

/// A user-defined routine: a body, its labels, and the lexical scope
/// captured at definition.
#[derive(Debug)]
pub struct Closure {
    pub body: Cell,
    pub labels: Labels,
    pub op: Op,
    pub scope: Rc<Env>,
}

// ── The Cell type ─────────────────────────────────────────────────

/// Any runtime value. Cloning is cheap: heap payloads are Rc-shared.
///
/// `Null` is the empty list and the list terminator. It answers pair
/// operations with itself, so walking off the end of a list never faults.
#[derive(Debug, Clone)]
pub enum Cell {
    Null,
    Pair(Rc<Pair>),
    Symbol(Rc<Sym>),
    String(Rc<str>),
    Number(Rc<Number>),
    Status(Rc<Status>),
    Scope(Rc<Env>),
    Closure(Rc<Closure>),
    Pipe(Rc<Pipe>),
    Channel(Rc<Channel>),
}

// ── Constructors ──────────────────────────────────────────────────

impl Cell {
    pub fn cons(head: Cell, tail: Cell) -> Cell {
        Cell::Pair(Rc::new(Pair {
            head: RefCell::new(head),
            tail: RefCell::new(tail),
        }))
    }

    pub fn symbol(text: &str) -> Cell {
        Cell::Symbol(Rc::new(Sym {
            name: intern(text),
            source: None,
        }))
    }

    /// A symbol decorated with the location where it was read.
    pub fn symbol_at(text: &str, source: Loc) -> Cell {
        Cell::Symbol(Rc::new(Sym {
            name: intern(text),
            source: Some(source),
        }))
    }

    pub fn string(text: impl AsRef<str>) -> Cell {
        Cell::String(Rc::from(text.as_ref()))
    }

    pub fn int(i: i64) -> Cell {
        Cell::Number(Rc::new(Number(BigRational::from_integer(BigInt::from(i)))))
    }

    /// Parse a number from its textual form: integer, `N/D`, decimal, or
    /// exponent notation.
    pub fn number(text: &str) -> Result<Cell, ShellError> {
        let rat =
            parse_rational(text).ok_or_else(|| ShellError::Number(text.to_string()))?;
        Ok(Cell::Number(Rc::new(Number(rat))))
    }

    pub fn status(text: &str) -> Result<Cell, ShellError> {
        let rat =
            parse_rational(text).ok_or_else(|| ShellError::Number(text.to_string()))?;
        Ok(Cell::Status(Rc::new(Status(rat))))
    }

    pub fn status_int(i: i64) -> Cell {
        Cell::Status(Rc::new(Status(BigRational::from_integer(BigInt::from(i)))))
    }

    /// The canonical truth witness is the symbol `true`; falsehood is Null.
    pub fn from_bool(b: bool) -> Cell {
        if b {
            Cell::symbol("true")
        } else {
            Cell::Null
        }
    }
}

// ── Pair operations ───────────────────────────────────────────────

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Null counts as a pair: it is the zero-length list.
    pub fn is_pair(&self) -> bool {
        matches!(self, Cell::Null | Cell::Pair(_))
    }

    pub fn car(&self) -> Cell {
        match self {
            Cell::Null => Cell::Null,
            Cell::Pair(p) => p.head.borrow().clone(),
            other => panic!("{} is not a pair", other.type_name()),
        }
    }

    pub fn cdr(&self) -> Cell {
        match self {
            Cell::Null => Cell::Null,
            Cell::Pair(p) => p.tail.borrow().clone(),
            other => panic!("{} is not a pair", other.type_name()),
        }
    }

    pub fn caar(&self) -> Cell {
        self.car().car()
    }

    pub fn cadr(&self) -> Cell {
        self.cdr().car()
    }

    pub fn cdar(&self) -> Cell {
        self.car().cdr()
    }

    pub fn cddr(&self) -> Cell {
        self.cdr().cdr()
    }

    pub fn caddr(&self) -> Cell {
        self.cdr().cdr().car()
    }

    pub fn set_car(&self, value: Cell) {
        match self {
            Cell::Pair(p) => *p.head.borrow_mut() = value,
            Cell::Null => panic!("cannot modify ()"),
            other => panic!("{} is not a pair", other.type_name()),
        }
    }

    pub fn set_cdr(&self, value: Cell) {
        match self {
            Cell::Pair(p) => *p.tail.borrow_mut() = value,
            Cell::Null => panic!("cannot modify ()"),
            other => panic!("{} is not a pair", other.type_name()),
        }
    }
}

// ── Capabilities ──────────────────────────────────────────────────

impl Cell {
    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Null | Cell::Pair(_) => "cons",
            Cell::Symbol(_) => "symbol",
            Cell::String(_) => "string",
            Cell::Number(_) => "number",
            Cell::Status(_) => "status",
            Cell::Scope(_) => "environment",
            Cell::Closure(_) => "closure",
            Cell::Pipe(_) => "pipe",
            Cell::Channel(_) => "channel",
        }
    }

    /// The truth value. Numbers are truthy when non-zero, statuses when
    /// zero (success); every other cell is truthy unless it is Null.
    pub fn is_truthy(&self) -> bool {
        match self {
            Cell::Number(n) => !n.0.is_zero(),
            Cell::Status(s) => s.0.is_zero(),
            Cell::Null => false,
            _ => true,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Cell::Symbol(_))
    }

    /// The symbol's text, if this cell is a symbol.
    pub fn symbol_text(&self) -> Option<String> {
        match self {
            Cell::Symbol(s) => Some(s.text()),
            _ => None,
        }
    }

    /// The textual form used by meta commands: symbols and strings give
    /// their text, numbers and statuses their rational form.
    pub fn text_form(&self) -> Option<String> {
        match self {
            Cell::Symbol(s) => Some(s.text()),
            Cell::String(s) => Some(s.to_string()),
            Cell::Number(n) => Some(n.0.to_string()),
            Cell::Status(s) => Some(s.0.to_string()),
            _ => None,
        }
    }

    pub fn as_rational(&self) -> Option<BigRational> {
        match self {
            Cell::Number(n) => Some(n.0.clone()),
            Cell::Status(s) => Some(s.0.clone()),
            _ => None,
        }
    }

    /// An exact integer value, when this cell is a rational with
    /// denominator one.
    pub fn as_integer(&self) -> Option<BigInt> {
        let rat = self.as_rational()?;
        rat.is_integer().then(|| rat.to_integer())
    }

    pub fn is_conduit(&self) -> bool {
        matches!(self, Cell::Pipe(_) | Cell::Channel(_))
    }

    pub fn as_scope(&self) -> Option<Rc<Env>> {
        match self {
            Cell::Scope(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// The re-parseable form, for cells that have one.
    pub fn literal(&self) -> Option<String> {
        text(self, true)
    }
}

// ── Equality ──────────────────────────────────────────────────────

impl Cell {
    /// Structural equality for pairs, value equality for atoms, identity
    /// for scopes, closures, and conduits. Symbols and strings with the
    /// same text are never equal to each other.
    pub fn equal(&self, other: &Cell) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Pair(a), Cell::Pair(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                self.car().equal(&other.car()) && self.cdr().equal(&other.cdr())
            }
            (Cell::Symbol(a), Cell::Symbol(b)) => a.name == b.name,
            (Cell::String(a), Cell::String(b)) => a == b,
            (Cell::Number(a), Cell::Number(b)) => a.0 == b.0,
            (Cell::Status(a), Cell::Status(b)) => a.0 == b.0,
            (Cell::Scope(a), Cell::Scope(b)) => Rc::ptr_eq(a, b),
            (Cell::Closure(a), Cell::Closure(b)) => Rc::ptr_eq(a, b),
            (Cell::Pipe(a), Cell::Pipe(b)) => Rc::ptr_eq(a, b),
            (Cell::Channel(a), Cell::Channel(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ── Rendering ─────────────────────────────────────────────────────

// Renders a cell in display form (lit = false) or literal form
// (lit = true). Returns None when a literal form is requested for a cell
// that has none.
fn text(cell: &Cell, lit: bool) -> Option<String> {
    match cell {
        Cell::Null => Some("()".to_string()),
        Cell::Pair(_) => pair_text(cell, lit),
        Cell::Symbol(s) => Some(s.text()),
        Cell::String(s) => Some(if lit {
            escape::quote(s)
        } else {
            s.to_string()
        }),
        Cell::Number(n) => Some(if lit {
            format!("(|number {}|)", n.0)
        } else {
            n.0.to_string()
        }),
        Cell::Status(s) => Some(if lit {
            format!("(|status {}|)", s.0)
        } else {
            s.0.to_string()
        }),
        Cell::Scope(_) | Cell::Closure(_) | Cell::Pipe(_) | Cell::Channel(_) => {
            if lit {
                None
            } else {
                Some(format!("<{}>", cell.type_name()))
            }
        }
    }
}

// A proper list renders as its elements separated by spaces; an improper
// boundary renders as (|cons head tail|); a sublist whose tail is a pair
// is parenthesized. A Null head contributes nothing inside its parens,
// which is how () falls out of the general case.
fn pair_text(cell: &Cell, lit: bool) -> Option<String> {
    let head = cell.car();
    let tail = cell.cdr();

    let mut s = String::new();

    let improper = !tail.is_pair();
    if improper {
        s.push_str("(|cons ");
    }

    let sublist = head.is_pair() && head.cdr().is_pair();
    if sublist {
        s.push('(');
    }

    if !head.is_null() {
        s.push_str(&text(&head, lit)?);
    }

    if sublist {
        s.push(')');
    }

    if !improper && tail.is_null() {
        return Some(s);
    }

    s.push(' ');
    s.push_str(&text(&tail, lit)?);

    if improper {
        s.push_str("|)");
    }

    Some(s)
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display form always exists.
        write!(f, "{}", text(self, false).unwrap())
    }
}

// ── Number parsing ────────────────────────────────────────────────

fn parse_rational(text: &str) -> Option<BigRational> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some((numer, denom)) = text.split_once('/') {
        let n: BigInt = numer.parse().ok()?;
        let d: BigInt = denom.parse().ok()?;
        if d.is_zero() {
            return None;
        }
        return Some(BigRational::new(n, d));
    }

    let (mantissa, exponent) = match text.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e.parse::<i32>().ok()?)),
        None => (text, None),
    };

    let mut rat = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => {
            if frac_part.is_empty() || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let negative = int_part.starts_with('-');
            let int: BigInt = if int_part.is_empty() || int_part == "-" || int_part == "+" {
                BigInt::zero()
            } else {
                int_part.parse().ok()?
            };
            let frac: BigInt = frac_part.parse().ok()?;
            let scale = num_traits::pow(BigInt::from(10), frac_part.len());
            let mut whole = int.abs() * &scale + frac;
            if negative {
                whole = -whole;
            }
            BigRational::new(whole, scale)
        }
        None => {
            let n: BigInt = mantissa.parse().ok()?;
            BigRational::from_integer(n)
        }
    };

    if let Some(exp) = exponent {
        let factor = BigRational::from_integer(num_traits::pow(
            BigInt::from(10),
            exp.unsigned_abs() as usize,
        ));
        if exp < 0 {
            rat /= factor;
        } else {
            rat *= factor;
        }
    }

    Some(rat)
}
