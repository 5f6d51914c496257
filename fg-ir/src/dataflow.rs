//! The data-flow graph node types from spec.md §4.F.
//!
//! A binding tree is a DAG of `DfNode`s rooted at the source expression of a
//! [`crate::term::Binding`]. Terminals name other [`crate::term::Term`]s;
//! everything else is structure the precise bit-slice dependency visitor
//! (`fg-opt::analysis::precise_dep`) walks to find which bits of the tree
//! equal a target slice.
use crate::cond::PathCond;
use crate::term::{AssignType, TargetEntry};
use baa::BitVecValue;
use fg_utils::Id;
use std::collections::HashMap;
use std::rc::Rc;

/// Operators that the precise bit-slice dependency visitor understands
/// (spec.md §4.G: "only these produce partial slices"). Anything else
/// reaching [`DfNode::Operator`] aborts with `UnsupportedSyntax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DfOp {
    And,
    Or,
    Xor,
    Plus,
    Minus,
    Eq,
    Neq,
    Gt,
    Lt,
    Geq,
    Leq,
    /// Logical shift right by a *constant* amount; the constant is carried
    /// on the node itself rather than as a second operand since the visitor
    /// needs it to be statically known.
    Srl(u64),
    Unot,
}

impl DfOp {
    /// Operators whose dependency result spans the full width of whichever
    /// operand depends on the target (spec.md §4.G: `And`, `Or`, `Xor`,
    /// `Plus`, `Minus`).
    pub fn is_full_width_passthrough(self) -> bool {
        matches!(self, DfOp::And | DfOp::Or | DfOp::Xor | DfOp::Plus | DfOp::Minus)
    }

    /// Comparison operators collapse any dependency to a single bit.
    pub fn is_compare(self) -> bool {
        matches!(
            self,
            DfOp::Eq | DfOp::Neq | DfOp::Gt | DfOp::Lt | DfOp::Geq | DfOp::Leq
        )
    }
}

/// A node in a data-flow binding tree.
#[derive(Debug, Clone)]
pub enum DfNode {
    /// Names a [`crate::term::Term`] in full (no slice narrowing applied
    /// yet); a `Rename` term (see spec.md §4.F) is transparently expanded by
    /// the builder before this node is ever produced, so this always names a
    /// concrete, non-renamed term.
    Terminal(Id),
    Partselect {
        var: Rc<DfNode>,
        msb: u64,
        lsb: u64,
    },
    Pointer {
        var: Rc<DfNode>,
        /// `None` index means the pointer's index is not a compile-time
        /// constant; the expression driving it is tracked separately by the
        /// caller as the `rd_ptr`/write-index hint (spec.md §3).
        index: Rc<DfNode>,
    },
    Branch {
        cond: Rc<DfNode>,
        truenode: Option<Rc<DfNode>>,
        falsenode: Option<Rc<DfNode>>,
    },
    /// Ordered most-significant-child-first, matching the Verilog `{a, b, c}`
    /// source order (spec.md §4.G: "walk children right-to-left accumulating
    /// width" treats this list as written left (msb) to right (lsb)).
    Concat(Vec<Rc<DfNode>>),
    Operator {
        op: DfOp,
        operands: Vec<Rc<DfNode>>,
    },
    /// Raw, unevaluated literal text as it appeared in the elaborator dump
    /// (e.g. `"8'hFF"`), used when the builder does not need the concrete
    /// value, only its presence.
    IntConst(String),
    /// A fully evaluated constant of a known width (spec.md §4.F:
    /// "Evaluating a concrete value uses ... `DFEvalValue` (width +
    /// integer)"). Arbitrary-width per Verilog's 32-bit-default/unbounded
    /// integer literals, hence `baa::BitVecValue` rather than a native int.
    EvalValue(BitVecValue),
}

impl DfNode {
    pub fn terminal(id: impl Into<Id>) -> Rc<DfNode> {
        Rc::new(DfNode::Terminal(id.into()))
    }

    /// The term this node ultimately names, if it names exactly one
    /// (`Terminal`, or a `Partselect`/`Pointer` directly over one).
    pub fn root_term(&self) -> Option<Id> {
        match self {
            DfNode::Terminal(id) => Some(*id),
            DfNode::Partselect { var, .. } => var.root_term(),
            DfNode::Pointer { var, .. } => var.root_term(),
            _ => None,
        }
    }
}

/// Structural equality used by the path-condition de-duplication rule
/// (spec.md §3, §9 Design Notes: "use interned node identity to make
/// equality O(size)"). We approximate true interning with `Rc::ptr_eq` for
/// shared subtrees and fall back to by-name comparison for terminals so two
/// independently-built references to the same signal still compare equal.
impl PartialEq for DfNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DfNode::Terminal(a), DfNode::Terminal(b)) => a == b,
            (DfNode::IntConst(a), DfNode::IntConst(b)) => a == b,
            (DfNode::EvalValue(a), DfNode::EvalValue(b)) => a == b,
            (
                DfNode::Partselect { var: va, msb: ma, lsb: la },
                DfNode::Partselect { var: vb, msb: mb, lsb: lb },
            ) => ma == mb && la == lb && (Rc::ptr_eq(va, vb) || va == vb),
            (
                DfNode::Pointer { var: va, index: ia },
                DfNode::Pointer { var: vb, index: ib },
            ) => (Rc::ptr_eq(va, vb) || va == vb) && (Rc::ptr_eq(ia, ib) || ia == ib),
            (
                DfNode::Branch { cond: ca, truenode: ta, falsenode: fa },
                DfNode::Branch { cond: cb, truenode: tb, falsenode: fb },
            ) => {
                (Rc::ptr_eq(ca, cb) || ca == cb)
                    && opt_rc_eq(ta, tb)
                    && opt_rc_eq(fa, fb)
            }
            (DfNode::Concat(a), DfNode::Concat(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| Rc::ptr_eq(x, y) || x == y)
            }
            (
                DfNode::Operator { op: oa, operands: a },
                DfNode::Operator { op: ob, operands: b },
            ) => {
                oa == ob
                    && a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| Rc::ptr_eq(x, y) || x == y)
            }
            _ => false,
        }
    }
}
impl Eq for DfNode {}

/// One edge of the sink-rooted reverse-reachability graph built in Phase 1
/// (spec.md §3: "reverse(dst) -> list of (src slice, path-condition,
/// assigntype, clock)").
#[derive(Debug, Clone)]
pub struct ReverseEdge {
    pub src: TargetEntry,
    pub path: PathCond,
    pub assigntype: AssignType,
    pub clock: Option<Id>,
}

/// The Phase 2 counterpart, keyed the other way round once the precise
/// visitor has narrowed each edge to the bits of the destination it
/// actually drives.
#[derive(Debug, Clone)]
pub struct ForwardEdge {
    pub dst: TargetEntry,
    pub path: PathCond,
    pub assigntype: AssignType,
    pub clock: Option<Id>,
}

pub type ReverseMap = HashMap<TargetEntry, Vec<ReverseEdge>>;
pub type ForwardMap = HashMap<TargetEntry, Vec<ForwardEdge>>;

fn opt_rc_eq(a: &Option<Rc<DfNode>>, b: &Option<Rc<DfNode>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => Rc::ptr_eq(x, y) || x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminals_compare_by_name_not_identity() {
        let a = DfNode::terminal("top.r");
        let b = DfNode::terminal("top.r");
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(*a, *b);
    }

    #[test]
    fn root_term_sees_through_partselect_and_pointer() {
        let t = DfNode::terminal("top.mem");
        let sel = Rc::new(DfNode::Partselect { var: Rc::clone(&t), msb: 7, lsb: 0 });
        assert_eq!(sel.root_term(), Some(Id::from("top.mem")));
    }
}
