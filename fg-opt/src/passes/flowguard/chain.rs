//! Phase 3 (spec.md §4.H): propagation-chain restriction. Walks the Phase 2
//! forward map backward from `target_output`, keeping only the slices that
//! lie on some path reaching both the source and the sink; everything else
//! Phase 2 touched but that dead-ends before the sink is discarded here.
use super::forward_refine::ForwardRefine;
use fg_ir::{AssignType, Binding, Context, DfNode, Id, TargetEntry};
use std::collections::{HashMap, HashSet, VecDeque};

pub fn restrict(refine: &ForwardRefine) -> HashSet<TargetEntry> {
    let mut predecessors: HashMap<TargetEntry, Vec<TargetEntry>> = HashMap::new();
    for (src, edges) in &refine.map {
        for e in edges {
            predecessors.entry(e.dst.clone()).or_default().push(src.clone());
        }
    }

    let mut chain: HashSet<TargetEntry> = HashSet::new();
    let mut queue: VecDeque<TargetEntry> = VecDeque::new();
    for t in &refine.target_output {
        if chain.insert(t.clone()) {
            queue.push_back(t.clone());
        }
    }

    while let Some(t) = queue.pop_front() {
        let Some(preds) = predecessors.get(&t) else { continue };
        for p in preds {
            if chain.insert(p.clone()) {
                queue.push_back(p.clone());
            }
        }
    }
    chain
}

/// The subset of the chain that is a flip-flop output: either every bit in
/// the slice is classified `Dff` in `ctx.term_table` (spec.md §4.B's per-bit
/// classification, built while lowering bindings — see
/// `fg-opt::analysis::build_dataflow`), or it is an input or output of a
/// registered black-box model instance, with a null clock in both cases
/// (spec.md §3's DFF set definition: "black-box inputs and outputs are both
/// injected into the DFF set").
pub fn dff_set(chain: &HashSet<TargetEntry>, ctx: &Context, bindings: &[Binding]) -> HashSet<TargetEntry> {
    chain
        .iter()
        .filter(|t| {
            let width = ctx.term(t.term).map(|term| term.width).unwrap_or(0);
            let msb = t.msb.unwrap_or(width.saturating_sub(1));
            let lsb = t.lsb.unwrap_or(0);
            ctx.term_table.is_dff_slice(t.term, msb, lsb) || is_model_edge_endpoint(t.term, bindings)
        })
        .cloned()
        .collect()
}

fn is_model_edge_endpoint(term: Id, bindings: &[Binding]) -> bool {
    bindings.iter().filter(|b| matches!(b.assigntype, AssignType::Model(_))).any(|b| {
        b.dst == term || tree_names_term(&b.tree, term)
    })
}

fn tree_names_term(tree: &DfNode, term: Id) -> bool {
    match tree {
        DfNode::Terminal(id) => *id == term,
        DfNode::Concat(items) => items.iter().any(|n| tree_names_term(n, term)),
        DfNode::Partselect { var, .. } | DfNode::Pointer { var, .. } => tree_names_term(var, term),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::{ForwardEdge, PathCond};

    fn entry(term: &str) -> TargetEntry {
        TargetEntry::new(term, Some(0), Some(0), None)
    }

    /// Underlies invariant 1 (spec.md §8): only slices actually on the path
    /// to a target output are in the propagation chain, so `av`/`assign`
    /// are only ever synthesized (and can only ever imply one another) for
    /// entries this restriction keeps.
    #[test]
    fn restricts_to_the_path_reaching_target_output() {
        let mut map = HashMap::new();
        map.insert(
            entry("top.a"),
            vec![ForwardEdge { dst: entry("top.b"), path: PathCond::new(), assigntype: AssignType::Blocking, clock: None }],
        );
        map.insert(
            entry("top.dead_end"),
            vec![ForwardEdge { dst: entry("top.unreached"), path: PathCond::new(), assigntype: AssignType::Blocking, clock: None }],
        );
        let mut target_output = HashSet::new();
        target_output.insert(entry("top.b"));
        let refine = ForwardRefine { map, target_output };

        let chain = restrict(&refine);
        assert!(chain.contains(&entry("top.a")));
        assert!(chain.contains(&entry("top.b")));
        assert!(!chain.contains(&entry("top.dead_end")));
        assert!(!chain.contains(&entry("top.unreached")));
    }
}
