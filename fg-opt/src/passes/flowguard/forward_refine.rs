//! Phase 2 (spec.md §4.H): source-rooted forward refinement. Walks forward
//! from the declared source, following [`fg_ir::ReverseEdge`]s discovered in
//! Phase 1 in the opposite direction, merging contiguous same-path slices
//! along the way (spec.md §3 "mergable"/"mergable_array").
use super::reverse_reach::ReverseReach;
use fg_ir::{AssignType, ForwardEdge, ForwardMap, Id, PtrIndex, ReverseEdge, TargetEntry};
use fg_utils::FgResult;
use std::collections::{HashMap, HashSet, VecDeque};

pub struct ForwardRefine {
    pub map: ForwardMap,
    /// Destinations the forward walk reached that are also the declared
    /// sink: the seeds Phase 3 restricts the propagation chain from.
    pub target_output: HashSet<TargetEntry>,
}

pub fn run(reach: &ReverseReach, source: Id, sink: Id) -> FgResult<ForwardRefine> {
    // Index Phase 1's edges by the source term they name so the forward
    // walk can find "what does writing to term T feed into" in O(1).
    let mut by_src_term: HashMap<Id, Vec<(&TargetEntry, &ReverseEdge)>> = HashMap::new();
    for (dst, edges) in &reach.map {
        for e in edges {
            by_src_term.entry(e.src.term).or_default().push((dst, e));
        }
    }

    let mut map: ForwardMap = HashMap::new();
    let mut target_output = HashSet::new();
    let mut enqueued_terms = HashSet::new();
    let mut queue = VecDeque::new();

    let seed = TargetEntry::new(source, None, None, None);
    enqueued_terms.insert(seed.term);
    queue.push_back(seed);

    while let Some(t) = queue.pop_front() {
        let Some(edges) = by_src_term.get(&t.term) else { continue };
        for (dst, edge) in edges {
            // A narrowed read through a dynamic pointer only matches the
            // reverse edge that named the same driver; otherwise this is a
            // different array element and the edge does not apply here.
            if let (Some(PtrIndex::Dynamic(a)), Some(PtrIndex::Dynamic(b))) = (&t.ptr, &edge.src.ptr) {
                if a != b {
                    continue;
                }
            }

            let fwd = ForwardEdge {
                dst: (*dst).clone(),
                path: edge.path.clone(),
                assigntype: edge.assigntype,
                clock: edge.clock,
            };
            let list = map.entry(t.clone()).or_default();
            if !list.iter().any(|f: &ForwardEdge| {
                f.dst == fwd.dst && f.assigntype == fwd.assigntype && f.clock == fwd.clock && f.path == fwd.path
            }) {
                list.push(fwd);
            }

            if dst.term == sink {
                target_output.insert((*dst).clone());
            }
            if enqueued_terms.insert(dst.term) {
                queue.push_back((*dst).clone());
            }
        }
    }

    for edges in map.values_mut() {
        *edges = merge_contiguous(std::mem::take(edges));
    }

    Ok(ForwardRefine { map, target_output })
}

/// Merges adjacent edges in a single source's edge list that drive
/// contiguous bits of the same destination term under the same assign type
/// and clock (spec.md §3 "mergable"): e.g. two edges writing `dst[3:0]` and
/// `dst[7:4]` collapse into one writing `dst[7:0]`.
fn merge_contiguous(edges: Vec<ForwardEdge>) -> Vec<ForwardEdge> {
    let mut groups: Vec<(Id, Option<PtrIndex>, AssignType, Option<Id>, fg_ir::PathCond, Vec<ForwardEdge>)> = Vec::new();
    for e in edges {
        let found = groups.iter_mut().find(|(term, ptr, at, clock, path, _)| {
            *term == e.dst.term && *ptr == e.dst.ptr && *at == e.assigntype && *clock == e.clock && *path == e.path
        });
        match found {
            Some((.., group)) => group.push(e),
            None => groups.push((e.dst.term, e.dst.ptr.clone(), e.assigntype, e.clock, e.path.clone(), vec![e])),
        }
    }

    let mut out = Vec::new();
    for (.., mut group) in groups {
        group.sort_by_key(|e| e.dst.lsb.unwrap_or(0));
        for e in group {
            match out.last_mut() {
                Some(last) if is_contiguous(last, &e) => extend_msb(last, e.dst.msb),
                _ => out.push(e),
            }
        }
    }
    out
}

fn is_contiguous(last: &ForwardEdge, next: &ForwardEdge) -> bool {
    last.dst.term == next.dst.term
        && last.dst.ptr == next.dst.ptr
        && last.assigntype == next.assigntype
        && last.clock == next.clock
        && last.path == next.path
        && matches!((last.dst.msb, next.dst.lsb), (Some(m), Some(l)) if l == m + 1)
}

fn extend_msb(last: &mut ForwardEdge, new_msb: Option<u64>) {
    if let (Some(cur), Some(new)) = (last.dst.msb, new_msb) {
        last.dst.msb = Some(cur.max(new));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::PathCond;

    fn entry(term: &str, msb: u64, lsb: u64) -> TargetEntry {
        TargetEntry::new(term, Some(msb), Some(lsb), None)
    }

    #[test]
    fn merges_two_contiguous_byte_edges() {
        let edges = vec![
            ForwardEdge { dst: entry("top.dst", 3, 0), path: PathCond::new(), assigntype: AssignType::Blocking, clock: None },
            ForwardEdge { dst: entry("top.dst", 7, 4), path: PathCond::new(), assigntype: AssignType::Blocking, clock: None },
        ];
        let merged = merge_contiguous(edges);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].dst.msb, Some(7));
        assert_eq!(merged[0].dst.lsb, Some(0));
    }

    #[test]
    fn distinct_clocks_are_not_merged() {
        let edges = vec![
            ForwardEdge { dst: entry("top.dst", 3, 0), path: PathCond::new(), assigntype: AssignType::Nonblocking, clock: Some(Id::from("clk1")) },
            ForwardEdge { dst: entry("top.dst", 7, 4), path: PathCond::new(), assigntype: AssignType::Nonblocking, clock: Some(Id::from("clk2")) },
        ];
        assert_eq!(merge_contiguous(edges).len(), 2);
    }

    /// Invariant 5 (spec.md §8): merging is idempotent — applying it again
    /// to its own output is a no-op.
    #[test]
    fn merge_contiguous_is_idempotent() {
        let edges = vec![
            ForwardEdge { dst: entry("top.dst", 3, 0), path: PathCond::new(), assigntype: AssignType::Blocking, clock: None },
            ForwardEdge { dst: entry("top.dst", 7, 4), path: PathCond::new(), assigntype: AssignType::Blocking, clock: None },
            ForwardEdge { dst: entry("top.dst", 15, 8), path: PathCond::new(), assigntype: AssignType::Blocking, clock: None },
        ];
        let once = merge_contiguous(edges);
        let twice = merge_contiguous(once.clone());
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.dst.msb, b.dst.msb);
            assert_eq!(a.dst.lsb, b.dst.lsb);
        }
    }
}
