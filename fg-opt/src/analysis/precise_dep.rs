//! The precise bit-slice dependency visitor from spec.md §4.G, ported from
//! `FlowGuardInstrumentationPass.py`'s `DFDataDepVisitor` plus the bit
//! interval arithmetic inlined in `dataflowpass.py`. Given a binding's
//! source tree and the destination bit range it's assigned to, walks the
//! tree narrowing the requested range through part-selects, concatenation,
//! and the small set of operators the core understands, and returns the
//! leaf [`TargetEntry`] set the requested range actually depends on.
//!
//! A pure constant subtree (`IntConst`/`EvalValue`) contributes no entry at
//! all — the `__CONST__` sentinel behavior named in spec.md §3's
//! supplemental notes is simply "no edge", since an edgeless dependency and
//! an edge to a synthetic always-live term behave identically everywhere
//! this function's result is consumed.
use fg_ir::{DfNode, DfOp, PathCond, PtrIndex, TargetEntry, Term};
use fg_utils::{Error, FgResult, Id};
use std::collections::HashMap;
use std::rc::Rc;

/// A dependency tagged with the path condition (spec.md §3) under which it
/// applies: for a leaf reached through no `Branch`, this is always-true.
pub type PathedDep = (TargetEntry, PathCond);

pub fn dependencies(
    tree: &DfNode,
    msb: u64,
    lsb: u64,
    terms: &HashMap<Id, Term>,
) -> FgResult<Vec<PathedDep>> {
    if msb < lsb {
        return Err(Error::width_mismatch("dependency range msb < lsb"));
    }
    walk(tree, msb, lsb, terms, &PathCond::new())
}

fn node_width(node: &DfNode, terms: &HashMap<Id, Term>) -> FgResult<u64> {
    Ok(match node {
        DfNode::Terminal(id) => terms.get(id).ok_or_else(|| Error::unresolved_term(*id))?.width,
        DfNode::Partselect { msb, lsb, .. } => msb - lsb + 1,
        DfNode::Pointer { var, .. } => node_width(var, terms)?,
        DfNode::Branch { truenode, falsenode, .. } => match (truenode, falsenode) {
            (Some(t), _) => node_width(t, terms)?,
            (None, Some(f)) => node_width(f, terms)?,
            (None, None) => 0,
        },
        DfNode::Concat(items) => items.iter().try_fold(0u64, |acc, n| Ok(acc + node_width(n, terms)?))?,
        DfNode::Operator { op, operands } => {
            if op.is_compare() {
                1
            } else {
                operands.iter().map(|n| node_width(n, terms)).collect::<FgResult<Vec<_>>>()?.into_iter().max().unwrap_or(0)
            }
        }
        DfNode::IntConst(_) => 32,
        DfNode::EvalValue(v) => v.width() as u64,
    })
}

fn walk(node: &DfNode, msb: u64, lsb: u64, terms: &HashMap<Id, Term>, path: &PathCond) -> FgResult<Vec<PathedDep>> {
    match node {
        DfNode::Terminal(id) => Ok(vec![(TargetEntry::new(*id, Some(msb), Some(lsb), None), path.clone())]),

        DfNode::Partselect { var, msb: node_msb, lsb: node_lsb } => {
            let abs_lsb = node_lsb + lsb;
            let abs_msb = node_lsb + msb;
            if abs_msb > *node_msb {
                return Err(Error::width_mismatch("part-select dependency request exceeds its own width"));
            }
            walk(var, abs_msb, abs_lsb, terms, path)
        }

        DfNode::Pointer { var, index } => {
            let root = var.root_term().ok_or_else(|| Error::unsupported_syntax("pointer base is not a term"))?;
            let ptr = match &**index {
                DfNode::EvalValue(v) => PtrIndex::Const(v.to_u64().unwrap_or(0)),
                DfNode::IntConst(text) => text.parse().map(PtrIndex::Const).unwrap_or(PtrIndex::Const(0)),
                other => PtrIndex::Dynamic(other.root_term().unwrap_or(root)),
            };
            let mut entry = TargetEntry::new(root, None, None, Some(ptr.clone()));
            if let PtrIndex::Dynamic(driver) = &ptr {
                if *driver != root {
                    entry.rd_ptr = Some(PtrIndex::Dynamic(*driver));
                }
            }
            Ok(vec![(entry, path.clone())])
        }

        // The condition gates which branch is live (spec.md §4.G); it is not
        // itself a data dependency of the destination. Each arm is walked
        // under its own polarity, and a branch whose polarity contradicts an
        // already-established link on this path contributes nothing (spec.md
        // §3's "the containing path contributes nothing").
        DfNode::Branch { cond, truenode, falsenode } => {
            let mut out = Vec::new();
            if let Some(t) = truenode {
                if let Ok(true_path) = path.push(Rc::clone(cond), true) {
                    out.extend(walk(t, msb, lsb, terms, &true_path)?);
                }
            }
            if let Some(f) = falsenode {
                if let Ok(false_path) = path.push(Rc::clone(cond), false) {
                    out.extend(walk(f, msb, lsb, terms, &false_path)?);
                }
            }
            Ok(out)
        }

        DfNode::Concat(items) => {
            // Children are ordered msb-first; walk right-to-left accumulating
            // each child's width so we know its [lo, hi] offset from bit 0.
            let mut out = Vec::new();
            let mut offset = 0u64;
            for child in items.iter().rev() {
                let w = node_width(child, terms)?;
                let child_lo = offset;
                let child_hi = offset + w - 1;
                let overlap_lo = lsb.max(child_lo);
                let overlap_hi = msb.min(child_hi);
                if overlap_lo <= overlap_hi {
                    out.extend(walk(child, overlap_hi - child_lo, overlap_lo - child_lo, terms, path)?);
                }
                offset += w;
            }
            Ok(out)
        }

        DfNode::Operator { op, operands } => match op {
            DfOp::And | DfOp::Or | DfOp::Xor | DfOp::Unot => {
                let mut out = Vec::new();
                for operand in operands {
                    let w = node_width(operand, terms)?;
                    if w == 0 {
                        continue;
                    }
                    let hi = msb.min(w - 1);
                    if lsb <= hi {
                        out.extend(walk(operand, hi, lsb.min(hi), terms, path)?);
                    }
                }
                Ok(out)
            }
            DfOp::Plus | DfOp::Minus => {
                // Carry propagation makes every output bit potentially
                // depend on every lower bit of both operands.
                let mut out = Vec::new();
                for operand in operands {
                    let w = node_width(operand, terms)?;
                    if w > 0 {
                        out.extend(walk(operand, w - 1, 0, terms, path)?);
                    }
                }
                Ok(out)
            }
            DfOp::Srl(n) => {
                let operand = operands.first().ok_or_else(|| Error::unsupported_syntax("shift missing operand"))?;
                let w = node_width(operand, terms)?;
                let shifted_lo = lsb + n;
                let shifted_hi = msb + n;
                if shifted_lo >= w {
                    return Ok(Vec::new());
                }
                walk(operand, shifted_hi.min(w - 1), shifted_lo, terms, path)
            }
            DfOp::Eq | DfOp::Neq | DfOp::Gt | DfOp::Lt | DfOp::Geq | DfOp::Leq => {
                let mut out = Vec::new();
                for operand in operands {
                    let w = node_width(operand, terms)?;
                    if w > 0 {
                        out.extend(walk(operand, w - 1, 0, terms, path)?);
                    }
                }
                Ok(out)
            }
        },

        DfNode::IntConst(_) | DfNode::EvalValue(_) => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::TermKind;
    use std::rc::Rc;

    fn terms() -> HashMap<Id, Term> {
        let mut m = HashMap::new();
        m.insert(Id::from("top.a"), Term::new("top.a", 8, TermKind::Wire));
        m.insert(Id::from("top.b"), Term::new("top.b", 8, TermKind::Wire));
        m
    }

    #[test]
    fn terminal_depends_on_requested_range() {
        let t = DfNode::terminal("top.a");
        let deps = dependencies(&t, 3, 0, &terms()).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0, TargetEntry::new("top.a", Some(3), Some(0), None));
        assert_eq!(deps[0].1, PathCond::new());
    }

    #[test]
    fn partselect_offsets_into_parent() {
        let inner = DfNode::Partselect { var: DfNode::terminal("top.a"), msb: 7, lsb: 4 };
        let deps = dependencies(&inner, 1, 0, &terms()).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0, TargetEntry::new("top.a", Some(5), Some(4), None));
    }

    #[test]
    fn constants_contribute_no_dependency() {
        let c = DfNode::IntConst("8'hFF".into());
        assert!(dependencies(&c, 7, 0, &terms()).unwrap().is_empty());
    }

    #[test]
    fn concat_splits_across_children() {
        let node = DfNode::Concat(vec![DfNode::terminal("top.a"), DfNode::terminal("top.b")]);
        let deps = dependencies(&node, 15, 0, &terms()).unwrap();
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn bitwise_and_narrows_both_operands() {
        let node = DfNode::Operator {
            op: DfOp::And,
            operands: vec![DfNode::terminal("top.a"), DfNode::terminal("top.b")],
        };
        let deps = dependencies(&node, 2, 1, &terms()).unwrap();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|(d, _)| d.msb == Some(2) && d.lsb == Some(1)));
    }

    #[test]
    fn plus_depends_on_entire_operands() {
        let node = DfNode::Operator {
            op: DfOp::Plus,
            operands: vec![DfNode::terminal("top.a"), DfNode::terminal("top.b")],
        };
        let deps = dependencies(&node, 0, 0, &terms()).unwrap();
        assert!(deps.iter().all(|(d, _)| d.msb == Some(7) && d.lsb == Some(0)));
    }

    #[test]
    fn rejects_inverted_range() {
        let t = DfNode::terminal("top.a");
        assert!(dependencies(&t, 0, 3, &terms()).is_err());
    }

    /// Covers the fix for the Branch arm (spec.md §4.G): the condition
    /// itself must not appear as a dependency, and each arm's dependencies
    /// carry the opposite polarity on the same node.
    #[test]
    fn branch_gates_each_arm_with_opposite_polarity() {
        let cond = DfNode::terminal("top.sel");
        let node = DfNode::Branch {
            cond: Rc::clone(&cond),
            truenode: Some(DfNode::terminal("top.a")),
            falsenode: Some(DfNode::terminal("top.b")),
        };
        let deps = dependencies(&node, 7, 0, &terms()).unwrap();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|(d, _)| d.term != Id::from("top.sel")));

        let (true_dep, true_path) = deps.iter().find(|(d, _)| d.term == Id::from("top.a")).unwrap();
        assert_eq!(true_dep.msb, Some(7));
        assert_eq!(true_path.links(), &[fg_ir::PathLink { node: Rc::clone(&cond), polarity: true }]);

        let (_, false_path) = deps.iter().find(|(d, _)| d.term == Id::from("top.b")).unwrap();
        assert_eq!(false_path.links(), &[fg_ir::PathLink { node: Rc::clone(&cond), polarity: false }]);
    }

    #[test]
    fn branch_with_no_falsenode_only_contributes_true_arm() {
        let node = DfNode::Branch {
            cond: DfNode::terminal("top.sel"),
            truenode: Some(DfNode::terminal("top.a")),
            falsenode: None,
        };
        let deps = dependencies(&node, 7, 0, &terms()).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0.term, Id::from("top.a"));
    }
}
