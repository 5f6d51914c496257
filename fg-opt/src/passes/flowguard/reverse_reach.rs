//! Phase 1 (spec.md §4.H): sink-rooted reverse reachability. Starting from
//! the declared sink term, a breadth-first search follows every
//! [`fg_ir::Binding`] backward through [`crate::analysis::precise_dep`],
//! recording one [`fg_ir::ReverseEdge`] per discovered source slice.
use fg_ir::{Binding, Context, ReverseEdge, ReverseMap, TargetEntry};
use fg_utils::{FgResult, Id};
use std::collections::{HashMap, HashSet, VecDeque};

/// The result of Phase 1: the reverse adjacency map (dst -> incoming edges)
/// and the set of terms the search actually reached, which Phase 2 seeds its
/// own search with.
pub struct ReverseReach {
    pub map: ReverseMap,
    pub visited_terms: HashSet<Id>,
}

/// Walks `bindings` backward from `sink`. A term with no binding (a primary
/// input, or a term nothing in this module drives) simply has no entry in
/// `by_dst` and the search dead-ends there, matching spec.md §4.H's "a
/// missing reverse-map entry when walking forward is ignored" for the
/// symmetric case on this side.
pub fn run(ctx: &Context, bindings: &[Binding], sink: Id) -> FgResult<ReverseReach> {
    let mut by_dst: HashMap<Id, Vec<&Binding>> = HashMap::new();
    for b in bindings {
        by_dst.entry(b.dst).or_default().push(b);
    }

    let mut map: ReverseMap = HashMap::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(sink);
    visited.insert(sink);

    while let Some(term) = queue.pop_front() {
        let Some(writes) = by_dst.get(&term) else { continue };
        for b in writes {
            let width = ctx.term(b.dst)?.width;
            let msb = b.msb.unwrap_or(width - 1);
            let lsb = b.lsb.unwrap_or(0);
            let dst_entry = TargetEntry::new(b.dst, Some(msb), Some(lsb), b.ptr.clone());
            let deps = crate::analysis::precise_dep::dependencies(&b.tree, msb, lsb, &ctx.terms)?;

            let entries = map.entry(dst_entry).or_default();
            for (dep, dep_path) in deps {
                // Combine the statement-level `if` path this write sits
                // under with the ternary path found inside its own tree; a
                // combination that contradicts itself reaches no live state
                // and contributes nothing (spec.md §3).
                let Ok(path) = b.path.merge(&dep_path) else { continue };
                if visited.insert(dep.term) {
                    queue.push_back(dep.term);
                }
                let edge = ReverseEdge {
                    src: dep,
                    path,
                    assigntype: b.assigntype,
                    clock: b.clock,
                };
                if !entries.iter().any(|e: &ReverseEdge| {
                    e.src == edge.src && e.assigntype == edge.assigntype && e.clock == edge.clock && e.path == edge.path
                }) {
                    entries.push(edge);
                }
            }
        }
    }
    Ok(ReverseReach { map, visited_terms: visited })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::{AssignType, DfNode, Term, TermKind};

    fn binding(dst: &str, src: &str) -> Binding {
        Binding {
            dst: Id::from(dst),
            msb: None,
            lsb: None,
            ptr: None,
            tree: DfNode::terminal(src),
            assigntype: AssignType::Blocking,
            clock: None,
            senslist: vec![],
            path: fg_ir::PathCond::new(),
        }
    }

    fn ctx_with(terms: &[(&str, u64)]) -> Context {
        let module = fg_ir::ModuleDef { name: Id::from("top"), params: vec![], ports: vec![], items: vec![] };
        let mut ctx = Context::new(module, fg_ir::Config::default());
        for (name, width) in terms {
            ctx.insert_term(Term::new(*name, *width, TermKind::Wire));
        }
        ctx
    }

    #[test]
    fn reaches_a_single_hop_source() {
        let ctx = ctx_with(&[("top.src", 1), ("top.sink", 1)]);
        let bindings = vec![binding("top.sink", "top.src")];
        let reach = run(&ctx, &bindings, Id::from("top.sink")).unwrap();
        assert!(reach.visited_terms.contains(&Id::from("top.src")));
        let edges = reach.map.values().next().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].src.term, Id::from("top.src"));
    }

    #[test]
    fn unreachable_term_has_no_entry() {
        let ctx = ctx_with(&[("top.src", 1), ("top.sink", 1), ("top.unrelated", 1)]);
        let bindings = vec![binding("top.sink", "top.src")];
        let reach = run(&ctx, &bindings, Id::from("top.sink")).unwrap();
        assert!(!reach.visited_terms.contains(&Id::from("top.unrelated")));
    }

    /// Covers the fix for the hardcoded `PathCond::default()` bug: an edge
    /// reached through a `Branch` must carry the branch's condition, and the
    /// two arms must carry opposite polarities rather than the same
    /// always-true path.
    #[test]
    fn branch_arms_carry_distinct_paths() {
        let ctx = ctx_with(&[("top.sel", 1), ("top.a", 1), ("top.b", 1), ("top.sink", 1)]);
        let tree = std::rc::Rc::new(DfNode::Branch {
            cond: DfNode::terminal("top.sel"),
            truenode: Some(DfNode::terminal("top.a")),
            falsenode: Some(DfNode::terminal("top.b")),
        });
        let bindings = vec![Binding {
            dst: Id::from("top.sink"),
            msb: None,
            lsb: None,
            ptr: None,
            tree,
            assigntype: AssignType::Blocking,
            clock: None,
            senslist: vec![],
            path: fg_ir::PathCond::new(),
        }];
        let reach = run(&ctx, &bindings, Id::from("top.sink")).unwrap();
        let edges = reach.map.values().next().unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.src.term != Id::from("top.sel")));
        let a_edge = edges.iter().find(|e| e.src.term == Id::from("top.a")).unwrap();
        let b_edge = edges.iter().find(|e| e.src.term == Id::from("top.b")).unwrap();
        assert_ne!(a_edge.path, b_edge.path);
        assert_ne!(a_edge.path, fg_ir::PathCond::new());
    }
}
