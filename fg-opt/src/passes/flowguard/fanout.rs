//! Phase 6 (spec.md §4.H): array fan-out. A chain slice whose `ptr` is a
//! non-constant index doesn't correspond to one physical bit of storage, it
//! aliases every element of the array; this phase gives each element its
//! own gated copy of the slice's `good` (or `av`, for a combinational slice)
//! signal so a waveform viewer can show "which element was this" instead of
//! a single signal that's true whenever *any* element is live.
use super::synth::SynthMap;
use fg_ir::{Cond, Context, Decl, Expr, Id, ModuleItem, PtrIndex, TargetEntry, Term, TermKind};
use fg_utils::FgResult;
use std::collections::HashSet;

pub fn expand(ctx: &mut Context, chain: &HashSet<TargetEntry>, synth: &SynthMap) -> FgResult<()> {
    for entry in chain {
        let Some(PtrIndex::Dynamic(index_signal)) = &entry.ptr else { continue };
        let Some(signals) = synth.get(&entry.term) else { continue };
        let Ok(term) = ctx.term(entry.term) else { continue };
        let Some(dim) = term.array_dim else { continue };

        let base = signals.good.unwrap_or(signals.av);
        for k in 0..dim {
            let name = Id::new(format!("{}__dim{k}", entry.term));
            ctx.module.items.push(ModuleItem::Decl(Decl {
                name,
                width: Some((
                    Expr::IntConst { width: None, signed: false, text: "0".into() },
                    Expr::IntConst { width: None, signed: false, text: "0".into() },
                )),
                array_dim: None,
                signed: false,
                is_reg: false,
                annotation: None,
            }));
            ctx.insert_term(Term::new(name, 1, TermKind::Wire));

            let index_matches = Cond::leaf(std::rc::Rc::new(fg_ir::DfNode::Operator {
                op: fg_ir::DfOp::Eq,
                operands: vec![fg_ir::DfNode::terminal(*index_signal), const_node(k)],
            }));
            let gated = Cond::leaf(fg_ir::DfNode::terminal(base)).and(index_matches);
            ctx.module.items.push(ModuleItem::ContAssign {
                lvalue: Expr::Ident(name),
                rvalue: cond_to_expr(&gated),
            });
        }
    }
    Ok(())
}

fn const_node(k: u64) -> std::rc::Rc<fg_ir::DfNode> {
    std::rc::Rc::new(fg_ir::DfNode::EvalValue(baa::BitVecValue::from_u64(k, 32)))
}

fn cond_to_expr(cond: &Cond) -> Expr {
    match cond {
        Cond::True => Expr::IntConst { width: Some(1), signed: false, text: "1".into() },
        Cond::False => Expr::IntConst { width: Some(1), signed: false, text: "0".into() },
        Cond::Leaf(node) => df_node_to_expr(node),
        Cond::Not(inner) => Expr::Unary { op: fg_ir::UnaryOp::Not, operand: std::rc::Rc::new(cond_to_expr(inner)) },
        Cond::And(a, b) => Expr::Logical { op: fg_ir::LogicalOp::And, lhs: std::rc::Rc::new(cond_to_expr(a)), rhs: std::rc::Rc::new(cond_to_expr(b)) },
        Cond::Or(a, b) => Expr::Logical { op: fg_ir::LogicalOp::Or, lhs: std::rc::Rc::new(cond_to_expr(a)), rhs: std::rc::Rc::new(cond_to_expr(b)) },
    }
}

fn df_node_to_expr(node: &fg_ir::DfNode) -> Expr {
    match node {
        fg_ir::DfNode::Terminal(id) => Expr::Ident(*id),
        fg_ir::DfNode::Operator { op: fg_ir::DfOp::Eq, operands } if operands.len() == 2 => Expr::Compare {
            op: fg_ir::CompareOp::Eq,
            lhs: std::rc::Rc::new(df_node_to_expr(&operands[0])),
            rhs: std::rc::Rc::new(df_node_to_expr(&operands[1])),
        },
        fg_ir::DfNode::EvalValue(v) => Expr::IntConst { width: Some(v.width() as u64), signed: false, text: v.to_u64().unwrap_or(0).to_string() },
        other => Expr::Ident(other.root_term().unwrap_or(Id::from("1'b0"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::{Config, ModuleDef};

    #[test]
    fn constant_indexed_entries_get_no_dim_signals() {
        let module = ModuleDef { name: Id::from("top"), params: vec![], ports: vec![], items: vec![] };
        let mut ctx = Context::new(module, Config::default());
        ctx.insert_term(Term::new("top.mem", 8, TermKind::Reg).with_array_dim(4));
        let chain: HashSet<TargetEntry> =
            [TargetEntry::new("top.mem", Some(7), Some(0), Some(PtrIndex::Const(0)))].into_iter().collect();
        expand(&mut ctx, &chain, &SynthMap::new()).unwrap();
        assert!(ctx.terms.get(&Id::from("top.mem__dim0")).is_none());
    }
}
