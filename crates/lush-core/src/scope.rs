//! Name resolution: reference slots, the public/private environment type,
//! and call-stack frames with lexical-then-dynamic lookup.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::error::Loc;
use crate::value::Cell;

// ── Reference ─────────────────────────────────────────────────────

/// A mutable slot holding one cell. Cloning shares the slot; `copy`
/// produces a fresh slot with the same contents.
#[derive(Debug, Clone)]
pub struct Reference(Rc<RefCell<Cell>>);

impl Reference {
    pub fn new(v: Cell) -> Self {
        Reference(Rc::new(RefCell::new(v)))
    }

    pub fn get(&self) -> Cell {
        self.0.borrow().clone()
    }

    pub fn set(&self, v: Cell) {
        *self.0.borrow_mut() = v;
    }

    pub fn copy(&self) -> Self {
        Reference::new(self.get())
    }
}

// ── Dict ──────────────────────────────────────────────────────────

/// An unordered mapping from string keys to reference slots. This is the
/// storage behind each environment's public and private halves.
#[derive(Debug, Default)]
pub struct Dict {
    map: RefCell<HashMap<String, Reference>>,
}

impl Dict {
    pub fn new() -> Self {
        Dict::default()
    }

    /// A copy with fresh slots: later writes through either dict are not
    /// seen by the other.
    pub fn copy(&self) -> Self {
        let map = self
            .map
            .borrow()
            .iter()
            .map(|(k, r)| (k.clone(), r.copy()))
            .collect();
        Dict {
            map: RefCell::new(map),
        }
    }

    pub fn get(&self, k: &str) -> Option<Reference> {
        self.map.borrow().get(k).cloned()
    }

    pub fn set(&self, k: &str, v: Cell) {
        match self.map.borrow_mut().entry(k.to_string()) {
            hashbrown::hash_map::Entry::Occupied(e) => e.get().set(v),
            hashbrown::hash_map::Entry::Vacant(e) => {
                e.insert(Reference::new(v));
            }
        }
    }

    pub fn del(&self, k: &str) -> bool {
        self.map.borrow_mut().remove(k).is_some()
    }

    pub fn size(&self) -> usize {
        self.map.borrow().len()
    }
}

// ── Env ───────────────────────────────────────────────────────────

/// A lexical environment: private and public name maps plus a link to the
/// enclosing scope. Only the public half is reachable through dynamic
/// resolution (see [`Frame::resolve`]).
#[derive(Debug, Default)]
pub struct Env {
    previous: Option<Rc<Env>>,
    private: Dict,
    public: Dict,
}

impl Env {
    pub fn new(previous: Option<Rc<Env>>) -> Self {
        Env {
            previous,
            private: Dict::new(),
            public: Dict::new(),
        }
    }

    /// A clone of this scope with the same enclosing link and fresh slots.
    pub fn clone_env(&self) -> Self {
        Env {
            previous: self.previous.clone(),
            private: self.private.copy(),
            public: self.public.copy(),
        }
    }

    pub fn define(&self, k: &str, v: Cell) {
        self.private.set(k, v);
    }

    pub fn export(&self, k: &str, v: Cell) {
        self.public.set(k, v);
    }

    /// The number of exported names.
    pub fn exported(&self) -> usize {
        self.public.size()
    }

    pub fn enclosing(&self) -> Option<Rc<Env>> {
        self.previous.clone()
    }

    pub fn public(&self) -> &Dict {
        &self.public
    }

    /// Private first, then public, then the enclosing scope.
    pub fn lookup(&self, k: &str) -> Option<Reference> {
        self.private
            .get(k)
            .or_else(|| self.public.get(k))
            .or_else(|| self.previous.as_ref().and_then(|p| p.lookup(k)))
    }

    /// Remove the nearest binding for k, searching the enclosing chain.
    pub fn remove(&self, k: &str) -> bool {
        if self.private.del(k) || self.public.del(k) {
            return true;
        }
        match &self.previous {
            Some(p) => p.remove(k),
            None => false,
        }
    }

    /// True when exported names in `other` are reachable from this scope:
    /// walking both chains to the nearest scope with at least one export
    /// must land on the same scope. A scope chain with no exports at all
    /// is visible from anywhere.
    pub fn visible(self: &Rc<Env>, other: &Rc<Env>) -> bool {
        let Some(theirs) = first_exporting(other) else {
            return true;
        };
        let Some(ours) = first_exporting(self) else {
            return false;
        };
        Rc::ptr_eq(&theirs, &ours)
    }
}

fn first_exporting(env: &Rc<Env>) -> Option<Rc<Env>> {
    let mut current = Some(env.clone());
    while let Some(e) = current {
        if e.exported() > 0 {
            return Some(e);
        }
        current = e.enclosing();
    }
    None
}

// ── Frame ─────────────────────────────────────────────────────────

/// A call-stack activation record: a scope, a link to the caller's frame,
/// and the current source location (mutable as evaluation advances).
#[derive(Debug)]
pub struct Frame {
    scope: Rc<Env>,
    previous: Option<Rc<Frame>>,
    source: RefCell<Loc>,
}

impl Frame {
    pub fn new(scope: Rc<Env>, previous: Option<Rc<Frame>>) -> Self {
        let source = previous
            .as_ref()
            .map(|p| p.loc())
            .unwrap_or_default();
        Frame {
            scope,
            previous,
            source: RefCell::new(source),
        }
    }

    /// A duplicate of `f` with a new scope but the same caller and location.
    pub fn dup(scope: Rc<Env>, f: &Frame) -> Self {
        Frame {
            scope,
            previous: f.previous.clone(),
            source: RefCell::new(f.loc()),
        }
    }

    pub fn scope(&self) -> Rc<Env> {
        self.scope.clone()
    }

    pub fn previous(&self) -> Option<Rc<Frame>> {
        self.previous.clone()
    }

    pub fn loc(&self) -> Loc {
        self.source.borrow().clone()
    }

    pub fn update(&self, source: Loc) {
        *self.source.borrow_mut() = source;
    }

    /// Lexical resolution through this frame's scope chain first; failing
    /// that, dynamic resolution: walk caller frames, scanning only the
    /// public half of each scope in their chains. Returns the scope the
    /// reference was found in.
    pub fn resolve(&self, k: &str) -> Option<(Rc<Env>, Reference)> {
        if let Some(r) = self.scope.lookup(k) {
            return Some((self.scope.clone(), r));
        }

        let mut frame = self.previous.clone();
        while let Some(f) = frame {
            let mut scope = Some(f.scope());
            while let Some(s) = scope {
                if let Some(r) = s.public().get(k) {
                    return Some((s, r));
                }
                scope = s.enclosing();
            }
            frame = f.previous.clone();
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_shares_and_copies() {
        let r = Reference::new(Cell::int(1));
        let shared = r.clone();
        shared.set(Cell::int(2));
        assert!(r.get().equal(&Cell::int(2)));

        let copied = r.copy();
        copied.set(Cell::int(3));
        assert!(r.get().equal(&Cell::int(2)));
    }

    #[test]
    fn test_dict_operations() {
        let d = Dict::new();
        assert_eq!(d.size(), 0);
        d.set("x", Cell::int(1));
        d.set("y", Cell::int(2));
        assert_eq!(d.size(), 2);
        assert!(d.get("x").unwrap().get().equal(&Cell::int(1)));
        d.set("x", Cell::int(9));
        assert!(d.get("x").unwrap().get().equal(&Cell::int(9)));
        assert!(d.del("x"));
        assert!(!d.del("x"));
        assert!(d.get("x").is_none());
    }

    #[test]
    fn test_dict_copy_is_independent() {
        let d = Dict::new();
        d.set("k", Cell::int(1));
        let c = d.copy();
        c.get("k").unwrap().set(Cell::int(2));
        assert!(d.get("k").unwrap().get().equal(&Cell::int(1)));
    }

    #[test]
    fn test_lookup_precedence_and_chain() {
        let outer = Rc::new(Env::new(None));
        outer.define("a", Cell::int(1));
        outer.export("b", Cell::int(2));

        let inner = Rc::new(Env::new(Some(outer.clone())));
        inner.define("shadow", Cell::int(10));
        inner.export("shadow", Cell::int(20));

        // Private wins over public in the same scope.
        assert!(inner.lookup("shadow").unwrap().get().equal(&Cell::int(10)));
        // Both halves of the enclosing scope are reachable lexically.
        assert!(inner.lookup("a").unwrap().get().equal(&Cell::int(1)));
        assert!(inner.lookup("b").unwrap().get().equal(&Cell::int(2)));
        assert!(inner.lookup("missing").is_none());
    }

    #[test]
    fn test_remove_walks_chain() {
        let outer = Rc::new(Env::new(None));
        outer.define("k", Cell::int(1));
        let inner = Rc::new(Env::new(Some(outer.clone())));
        assert!(inner.remove("k"));
        assert!(outer.lookup("k").is_none());
        assert!(!inner.remove("k"));
    }

    #[test]
    fn test_exported_counts_public_only() {
        let e = Rc::new(Env::new(None));
        e.define("private", Cell::int(1));
        assert_eq!(e.exported(), 0);
        e.export("public", Cell::int(2));
        assert_eq!(e.exported(), 1);
    }

    #[test]
    fn test_visible_reflexive_and_shared() {
        let root = Rc::new(Env::new(None));
        root.export("x", Cell::int(1));

        let a = Rc::new(Env::new(Some(root.clone())));
        let b = Rc::new(Env::new(Some(root.clone())));

        // Both chains land on root.
        assert!(a.visible(&b));
        assert!(b.visible(&a));
        assert!(root.visible(&root));
    }

    #[test]
    fn test_visible_disjoint_exports() {
        let a = Rc::new(Env::new(None));
        a.export("x", Cell::int(1));
        let b = Rc::new(Env::new(None));
        b.export("y", Cell::int(2));
        assert!(!a.visible(&b));
    }

    #[test]
    fn test_visible_no_exports_anywhere() {
        let bare = Rc::new(Env::new(None));
        let exporting = Rc::new(Env::new(None));
        exporting.export("x", Cell::int(1));
        // A chain with no exports is visible from anywhere...
        assert!(exporting.visible(&bare));
        // ...but cannot see exported names itself.
        assert!(!bare.visible(&exporting));
    }

    #[test]
    fn test_frame_resolve_lexical() {
        let scope = Rc::new(Env::new(None));
        scope.define("x", Cell::int(42));
        let frame = Frame::new(scope.clone(), None);

        let (found_in, r) = frame.resolve("x").unwrap();
        assert!(Rc::ptr_eq(&found_in, &scope));
        assert!(r.get().equal(&Cell::int(42)));
    }

    #[test]
    fn test_frame_resolve_dynamic_public_only() {
        let caller_scope = Rc::new(Env::new(None));
        caller_scope.define("hidden", Cell::int(1));
        caller_scope.export("shared", Cell::int(2));
        let caller = Rc::new(Frame::new(caller_scope.clone(), None));

        let callee_scope = Rc::new(Env::new(None));
        let callee = Frame::new(callee_scope, Some(caller));

        // Private names of caller frames are not dynamically visible.
        assert!(callee.resolve("hidden").is_none());

        let (found_in, r) = callee.resolve("shared").unwrap();
        assert!(Rc::ptr_eq(&found_in, &caller_scope));
        assert!(r.get().equal(&Cell::int(2)));
    }

    #[test]
    fn test_frame_dup_and_loc() {
        let scope = Rc::new(Env::new(None));
        let frame = Frame::new(scope, None);
        let loc = Loc {
            name: "stdin".into(),
            line: 4,
            char: 2,
            text: "x".into(),
        };
        frame.update(loc.clone());
        assert_eq!(frame.loc(), loc);

        let other = Rc::new(Env::new(None));
        let dup = Frame::dup(other.clone(), &frame);
        assert_eq!(dup.loc(), loc);
        assert!(Rc::ptr_eq(&dup.scope(), &other));
    }
}
