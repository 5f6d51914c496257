//! The term table and target-slice identity from spec.md §3.
use crate::cond::PathCond;
use crate::dataflow::DfNode;
use fg_utils::{GetName, Id};
use std::rc::Rc;

/// What a [`Term`] denotes in the elaborated design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Input,
    Output,
    Inout,
    Wire,
    /// Driven exclusively by nonblocking assigns under a clock edge; the
    /// per-bit dff/non-dff classification (spec.md §4.C) only ever applies
    /// within a `Reg` term's width.
    Reg,
    Parameter,
    /// A synthetic name introduced by the importer to stand in for a
    /// sub-expression (spec.md §4.F: "Rename" terms), expanded away before
    /// any [`DfNode`] names it.
    Rename,
    GenVar,
}

/// A signal in the elaborated design: a name, a bit width, an optional array
/// dimension, and a kind (spec.md §3: "W >= 1", "D >= 1 when present").
#[derive(Debug, Clone)]
pub struct Term {
    pub name: Id,
    pub width: u64,
    pub array_dim: Option<u64>,
    pub signed: bool,
    pub kind: TermKind,
    /// Set by the width visitor (spec.md §4.D) once every term's width is
    /// known; `None` until then.
    pub msb: Option<i64>,
    pub lsb: Option<i64>,
}

impl Term {
    pub fn new(name: impl Into<Id>, width: u64, kind: TermKind) -> Self {
        assert!(width >= 1, "term width must be >= 1");
        Self {
            name: name.into(),
            width,
            array_dim: None,
            signed: false,
            kind,
            msb: None,
            lsb: None,
        }
    }

    pub fn with_array_dim(mut self, dim: u64) -> Self {
        assert!(dim >= 1, "array dimension must be >= 1");
        self.array_dim = Some(dim);
        self
    }

    pub fn is_array(&self) -> bool {
        self.array_dim.is_some()
    }

    pub fn is_register(&self) -> bool {
        self.kind == TermKind::Reg
    }
}

impl GetName for Term {
    fn name(&self) -> Id {
        self.name
    }
}

/// Whether a write binding assigns with blocking (`=`) or nonblocking (`<=`)
/// semantics, or is the output of a registered black-box model
/// (spec.md §4.I) standing in for nonblocking semantics the model's
/// combinational body doesn't literally express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignType {
    Blocking,
    Nonblocking,
    /// Names the model (e.g. `altsyncram`) that produced this binding.
    Model(Id),
}

impl AssignType {
    pub fn is_register_like(self) -> bool {
        matches!(self, AssignType::Nonblocking | AssignType::Model(_))
    }
}

/// A dynamic array index: either resolved to a compile-time constant or, if
/// not, identified by the name of the signal driving it (spec.md §3: "if
/// both are non-constant, report the read index as `rd_ptr`"). We use the
/// driver's name rather than its full expression for identity purposes,
/// which is sufficient to tell two pointer reads/writes apart or recognize
/// them as the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PtrIndex {
    Const(u64),
    Dynamic(Id),
}

/// One assignment to (a slice of) a term: the slice written, the source
/// expression tree, and the semantics of the write.
#[derive(Debug, Clone)]
pub struct Binding {
    pub dst: Id,
    pub msb: Option<u64>,
    pub lsb: Option<u64>,
    pub ptr: Option<PtrIndex>,
    pub tree: Rc<DfNode>,
    pub assigntype: AssignType,
    /// The clock this binding is synchronous to, when `assigntype` is
    /// `Nonblocking` or `Model`; `None` for combinational (blocking) writes.
    pub clock: Option<Id>,
    /// The enclosing `always` block's sensitivity list, carried so an
    /// injected shadow `always` can be given an identical one
    /// (spec.md §8 invariant 7).
    pub senslist: Vec<Id>,
    /// The `if`-statement path this write site is nested under (spec.md §3,
    /// §4.G): a write inside `if (c) ... else ...` only fires under `c`'s
    /// corresponding polarity. Distinct from any `Branch` a ternary in the
    /// right-hand side expression contributes, which `precise_dep` folds in
    /// separately when it walks `tree`.
    pub path: PathCond,
}

/// The read- or write-side identity of a bit-slice of a term
/// (spec.md §3: "TargetEntry identity is exactly `(term, msb, lsb, ptr)`").
///
/// `rd_ptr`, `rd_subling`, and `wr_subling` are non-identity hints: two
/// entries differing only in those fields are still the same `TargetEntry`.
#[derive(Debug, Clone)]
pub struct TargetEntry {
    pub term: Id,
    pub msb: Option<u64>,
    pub lsb: Option<u64>,
    pub ptr: Option<PtrIndex>,
    /// The non-constant index driving a *read* of this slice, when distinct
    /// from `ptr`'s write-side index.
    pub rd_ptr: Option<PtrIndex>,
    /// Other entries known to alias the same underlying storage read from a
    /// different index (array fan-out siblings, spec.md §4.E).
    pub rd_subling: Vec<TargetEntry>,
    pub wr_subling: Vec<TargetEntry>,
}

impl TargetEntry {
    pub fn new(term: impl Into<Id>, msb: Option<u64>, lsb: Option<u64>, ptr: Option<PtrIndex>) -> Self {
        Self {
            term: term.into(),
            msb,
            lsb,
            ptr,
            rd_ptr: None,
            rd_subling: Vec::new(),
            wr_subling: Vec::new(),
        }
    }

    /// The identity key, ignoring all hint fields.
    fn key(&self) -> (Id, Option<u64>, Option<u64>, &Option<PtrIndex>) {
        (self.term, self.msb, self.lsb, &self.ptr)
    }
}

impl PartialEq for TargetEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for TargetEntry {}

impl std::hash::Hash for TargetEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.term.hash(state);
        self.msb.hash(state);
        self.lsb.hash(state);
        self.ptr.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_hints() {
        let mut a = TargetEntry::new("top.r", Some(7), Some(0), None);
        let b = TargetEntry::new("top.r", Some(7), Some(0), None);
        a.rd_ptr = Some(PtrIndex::Const(3));
        assert_eq!(a, b);
    }

    #[test]
    fn identity_differs_on_ptr() {
        let a = TargetEntry::new("top.mem", None, None, Some(PtrIndex::Const(0)));
        let b = TargetEntry::new("top.mem", None, None, Some(PtrIndex::Const(1)));
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic]
    fn zero_width_term_panics() {
        Term::new("top.bad", 0, TermKind::Wire);
    }
}
