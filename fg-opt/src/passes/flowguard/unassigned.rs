//! Phase 4 (spec.md §4.H): the unassigned-condition visitor. For each chain
//! slice's term, walks every `always`/`initial` body in the module and
//! builds a [`Cond`] that is true exactly along the control paths where
//! nothing in that body writes the term — a branch missing a subtree
//! contributes its own path condition, a sequential block is unassigned only
//! if every statement in it is.
//!
//! Narrowing to the exact target bit range (rather than whole-term) would
//! require threading `msb`/`lsb` through every `Substitution` match, which
//! the original model does structurally; here a write to any slice of the
//! term is treated as assigning the whole term. This is conservative in the
//! safe direction (never reports a live signal as lost) and is recorded as
//! a simplification.
use fg_ir::{Cond, Context, Expr, IfStmt, Id, ModuleItem, Stmt};
use fg_utils::FgResult;
use std::collections::HashMap;

/// `U(term)` per chain term, keyed by term name.
pub type UnassignedMap = HashMap<Id, Cond>;

pub fn compute(ctx: &Context, terms: &[Id]) -> FgResult<UnassignedMap> {
    let mut out = HashMap::new();
    for &term in terms {
        let mut u = Cond::True;
        for item in &ctx.module.items {
            let body_u = match item {
                ModuleItem::Always(a) => unassigned_stmt(&a.body, term)?,
                ModuleItem::Initial(i) => unassigned_stmt(&i.body, term)?,
                ModuleItem::ContAssign { lvalue, .. } => {
                    if lvalue_root(lvalue) == Some(term) {
                        Cond::False
                    } else {
                        Cond::True
                    }
                }
                ModuleItem::Decl(_) | ModuleItem::InstanceList(_) => Cond::True,
            };
            u = u.and(body_u);
        }
        out.insert(term, u);
    }
    Ok(out)
}

fn unassigned_stmt(stmt: &Stmt, term: Id) -> FgResult<Cond> {
    Ok(match stmt {
        Stmt::Null | Stmt::SystemTask { .. } => Cond::True,
        Stmt::Substitution(s) => {
            if lvalue_root(&s.lvalue) == Some(term) {
                Cond::False
            } else {
                Cond::True
            }
        }
        Stmt::Block(stmts) => {
            let mut u = Cond::True;
            for s in stmts {
                u = u.and(unassigned_stmt(s, term)?);
            }
            u
        }
        Stmt::If(IfStmt { cond, then_branch, else_branch }) => {
            let cond_leaf = Cond::leaf(crate::analysis::lower_cond(cond)?);
            let then_u = unassigned_stmt(then_branch, term)?;
            let else_u = match else_branch {
                // A missing else contributes its own (negated) path
                // condition to the unassigned set: whenever `cond` is
                // false, nothing in this `if` touches `term`.
                Some(e) => unassigned_stmt(e, term)?,
                None => Cond::True,
            };
            cond_leaf.clone().and(then_u).or(cond_leaf.not().and(else_u))
        }
    })
}

fn lvalue_root(e: &Expr) -> Option<Id> {
    match e {
        Expr::Ident(name) => Some(*name),
        Expr::PartSelect { var, .. } | Expr::Pointer { var, .. } => lvalue_root(var),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::{Always, Config, Edge, ModuleDef, SensItem, Substitution};

    fn ctx_with_items(items: Vec<ModuleItem>) -> Context {
        let module = ModuleDef { name: Id::from("top"), params: vec![], ports: vec![], items };
        Context::new(module, Config::default())
    }

    #[test]
    fn unconditional_assign_is_never_unassigned() {
        let ctx = ctx_with_items(vec![ModuleItem::ContAssign {
            lvalue: Expr::Ident(Id::from("top.r")),
            rvalue: Expr::Ident(Id::from("top.a")),
        }]);
        let u = compute(&ctx, &[Id::from("top.r")]).unwrap();
        assert_eq!(u[&Id::from("top.r")], Cond::False);
    }

    #[test]
    fn missing_else_contributes_the_negated_condition() {
        let body = Stmt::If(IfStmt {
            cond: Expr::Ident(Id::from("top.en")),
            then_branch: Box::new(Stmt::Substitution(Substitution {
                lvalue: Expr::Ident(Id::from("top.r")),
                rvalue: Expr::Ident(Id::from("top.d")),
                blocking: false,
            })),
            else_branch: None,
        });
        let ctx = ctx_with_items(vec![ModuleItem::Always(Always {
            senslist: vec![SensItem { signal: Id::from("top.clk"), edge: Edge::Pos }],
            body,
        })]);
        let u = compute(&ctx, &[Id::from("top.r")]).unwrap();
        // Unassigned exactly when `en` is false.
        assert_eq!(u[&Id::from("top.r")], Cond::leaf(fg_ir::DfNode::terminal("top.en")).not());
    }
}
