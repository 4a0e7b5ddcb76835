//! Helpers for working with cons-cell lists.

use crate::value::Cell;

/// Build a list from elements.
pub fn new(elements: &[Cell]) -> Cell {
    let mut l = Cell::Null;
    for e in elements.iter().rev() {
        l = Cell::cons(e.clone(), l);
    }
    l
}

/// A new list with `elements` added to the end of `l`. The original list
/// is not modified.
pub fn append(l: &Cell, elements: &[Cell]) -> Cell {
    let mut collected: Vec<Cell> = Vec::new();
    let mut current = l.clone();
    while !current.is_null() {
        collected.push(current.car());
        current = current.cdr();
    }
    collected.extend_from_slice(elements);
    new(&collected)
}

/// Concatenate two lists. The spine of `a` is copied; the cells of `b`
/// are shared with the result.
pub fn join(a: &Cell, b: &Cell) -> Cell {
    let mut spine: Vec<Cell> = Vec::new();
    let mut current = a.clone();
    while !current.is_null() {
        spine.push(current.car());
        current = current.cdr();
    }
    let mut l = b.clone();
    for e in spine.into_iter().rev() {
        l = Cell::cons(e, l);
    }
    l
}

pub fn length(l: &Cell) -> usize {
    let mut n = 0;
    let mut current = l.clone();
    while current.is_pair() && !current.is_null() {
        n += 1;
        current = current.cdr();
    }
    n
}

pub fn reverse(l: &Cell) -> Cell {
    let mut out = Cell::Null;
    let mut current = l.clone();
    while !current.is_null() {
        out = Cell::cons(current.car(), out);
        current = current.cdr();
    }
    out
}

/// Elements `[start, end)` as a new list. Indices are clamped to the
/// list's length.
pub fn slice(l: &Cell, start: usize, end: usize) -> Cell {
    let mut collected: Vec<Cell> = Vec::new();
    let mut current = l.clone();
    let mut i = 0;
    while !current.is_null() && i < end {
        if i >= start {
            collected.push(current.car());
        }
        current = current.cdr();
        i += 1;
    }
    new(&collected)
}

/// The i-th cdr of `l`, or `default` when the list is too short.
pub fn tail(l: &Cell, i: usize, default: Cell) -> Cell {
    let mut current = l.clone();
    for _ in 0..i {
        if current.is_null() {
            return default;
        }
        current = current.cdr();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syms(names: &[&str]) -> Vec<Cell> {
        names.iter().map(|n| Cell::symbol(n)).collect()
    }

    #[test]
    fn test_new_and_length() {
        let l = new(&syms(&["a", "b", "c"]));
        assert_eq!(length(&l), 3);
        assert_eq!(l.to_string(), "a b c");
        assert_eq!(length(&Cell::Null), 0);
    }

    #[test]
    fn test_append_leaves_original() {
        let l = new(&syms(&["a"]));
        let extended = append(&l, &syms(&["b", "c"]));
        assert_eq!(extended.to_string(), "a b c");
        assert_eq!(l.to_string(), "a");
    }

    #[test]
    fn test_join_shares_second_list() {
        let a = new(&syms(&["a", "b"]));
        let b = new(&syms(&["c", "d"]));
        let joined = join(&a, &b);
        assert_eq!(joined.to_string(), "a b c d");

        // Mutating b is seen through the joined list.
        b.set_car(Cell::symbol("x"));
        assert_eq!(joined.to_string(), "a b x d");
        // But a's spine was copied.
        a.set_car(Cell::symbol("y"));
        assert_eq!(joined.to_string(), "a b x d");
    }

    #[test]
    fn test_join_null_cases() {
        let l = new(&syms(&["a"]));
        assert_eq!(join(&Cell::Null, &l).to_string(), "a");
        assert_eq!(join(&l, &Cell::Null).to_string(), "a");
    }

    #[test]
    fn test_reverse_round_trip() {
        let l = new(&syms(&["a", "b", "c"]));
        assert_eq!(reverse(&l).to_string(), "c b a");
        let twice = reverse(&reverse(&l));
        assert_eq!(length(&twice), length(&l));
        assert!(twice.equal(&l));
        assert!(reverse(&Cell::Null).is_null());
    }

    #[test]
    fn test_slice() {
        let l = new(&syms(&["a", "b", "c", "d"]));
        assert_eq!(slice(&l, 1, 3).to_string(), "b c");
        assert_eq!(slice(&l, 0, 99).to_string(), "a b c d");
        assert!(slice(&l, 3, 3).is_null());
    }

    #[test]
    fn test_tail() {
        let l = new(&syms(&["a", "b", "c"]));
        assert_eq!(tail(&l, 1, Cell::Null).to_string(), "b c");
        assert!(tail(&l, 3, Cell::Null).is_null());
        let fallback = tail(&l, 9, Cell::symbol("none"));
        assert!(fallback.equal(&Cell::symbol("none")));
    }

}
