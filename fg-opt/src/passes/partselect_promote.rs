//! Grounded on `CanonicalFormPass.py`: part-selects taken from anything
//! other than a plain signal or array element (e.g. `{a,b}[7:4]`) get their
//! base hoisted into a freshly declared wire driven by a continuous assign,
//! leaving every remaining `PartSelect` with an `Ident`/`Pointer` base. The
//! rest of the compiler (`fg-opt::analysis::build_dataflow`,
//! `fg-opt::analysis::precise_dep`) assumes exactly that shape.
use crate::analysis::width::expr_width;
use fg_ir::{Context, Decl, Expr, IfStmt, Initial, ModuleItem, Stmt, Substitution, Term, TermKind};
use fg_utils::{FgResult, Id};
use std::collections::HashMap;
use std::rc::Rc;

pub fn run(ctx: &mut Context) -> FgResult<()> {
    let widths: HashMap<Id, u64> = ctx.terms.iter().map(|(id, t)| (*id, t.width)).collect();
    let mut promoted: Vec<(Id, Expr, u64)> = Vec::new();

    let items = std::mem::take(&mut ctx.module.items);
    let mut body_items = Vec::with_capacity(items.len());
    for item in items {
        body_items.push(match item {
            ModuleItem::ContAssign { lvalue, rvalue } => ModuleItem::ContAssign {
                lvalue: promote_expr(lvalue, &mut promoted, &widths)?,
                rvalue: promote_expr(rvalue, &mut promoted, &widths)?,
            },
            ModuleItem::Always(a) => ModuleItem::Always(fg_ir::Always {
                senslist: a.senslist,
                body: promote_stmt(a.body, &mut promoted, &widths)?,
            }),
            ModuleItem::Initial(i) => {
                ModuleItem::Initial(Initial { body: promote_stmt(i.body, &mut promoted, &widths)? })
            }
            other => other,
        });
    }

    let mut decls = Vec::with_capacity(promoted.len());
    let mut assigns = Vec::with_capacity(promoted.len());
    for (name, expr, width) in promoted {
        decls.push(ModuleItem::Decl(Decl {
            name,
            width: Some((
                Expr::IntConst { width: None, signed: false, text: (width - 1).to_string() },
                Expr::IntConst { width: None, signed: false, text: "0".into() },
            )),
            array_dim: None,
            signed: false,
            is_reg: false,
            annotation: None,
        }));
        ctx.insert_term(Term::new(name, width, TermKind::Wire));
        assigns.push(ModuleItem::ContAssign { lvalue: Expr::Ident(name), rvalue: expr });
    }

    let mut new_items = decls;
    new_items.extend(body_items);
    new_items.extend(assigns);
    ctx.module.items = new_items;
    Ok(())
}

fn promote_expr(e: Expr, promoted: &mut Vec<(Id, Expr, u64)>, widths: &HashMap<Id, u64>) -> FgResult<Expr> {
    Ok(match e {
        Expr::PartSelect { var, msb, lsb } => {
            let var = promote_expr(unwrap_rc(var), promoted, widths)?;
            let msb = promote_expr(unwrap_rc(msb), promoted, widths)?;
            let lsb = promote_expr(unwrap_rc(lsb), promoted, widths)?;
            if matches!(var, Expr::Ident(_) | Expr::Pointer { .. }) {
                Expr::PartSelect { var: Rc::new(var), msb: Rc::new(msb), lsb: Rc::new(lsb) }
            } else {
                let width = expr_width(&var, widths)?;
                let name = Id::new(format!("partselect_promoted_{}", promoted.len()));
                promoted.push((name, var, width));
                Expr::PartSelect { var: Rc::new(Expr::Ident(name)), msb: Rc::new(msb), lsb: Rc::new(lsb) }
            }
        }
        Expr::Pointer { var, index } => Expr::Pointer {
            var: Rc::new(promote_expr(unwrap_rc(var), promoted, widths)?),
            index: Rc::new(promote_expr(unwrap_rc(index), promoted, widths)?),
        },
        Expr::Concat(items) => {
            Expr::Concat(items.into_iter().map(|i| promote_expr(i, promoted, widths)).collect::<FgResult<_>>()?)
        }
        Expr::Repeat { times, value } => Expr::Repeat {
            times: Rc::new(promote_expr(unwrap_rc(times), promoted, widths)?),
            value: Rc::new(promote_expr(unwrap_rc(value), promoted, widths)?),
        },
        Expr::Unary { op, operand } => {
            Expr::Unary { op, operand: Rc::new(promote_expr(unwrap_rc(operand), promoted, widths)?) }
        }
        Expr::Binary { op, lhs, rhs } => Expr::Binary {
            op,
            lhs: Rc::new(promote_expr(unwrap_rc(lhs), promoted, widths)?),
            rhs: Rc::new(promote_expr(unwrap_rc(rhs), promoted, widths)?),
        },
        Expr::Compare { op, lhs, rhs } => Expr::Compare {
            op,
            lhs: Rc::new(promote_expr(unwrap_rc(lhs), promoted, widths)?),
            rhs: Rc::new(promote_expr(unwrap_rc(rhs), promoted, widths)?),
        },
        Expr::Shift { op, value, amount } => Expr::Shift {
            op,
            value: Rc::new(promote_expr(unwrap_rc(value), promoted, widths)?),
            amount: Rc::new(promote_expr(unwrap_rc(amount), promoted, widths)?),
        },
        Expr::Logical { op, lhs, rhs } => Expr::Logical {
            op,
            lhs: Rc::new(promote_expr(unwrap_rc(lhs), promoted, widths)?),
            rhs: Rc::new(promote_expr(unwrap_rc(rhs), promoted, widths)?),
        },
        Expr::Cond { cond, then_val, else_val } => Expr::Cond {
            cond: Rc::new(promote_expr(unwrap_rc(cond), promoted, widths)?),
            then_val: Rc::new(promote_expr(unwrap_rc(then_val), promoted, widths)?),
            else_val: Rc::new(promote_expr(unwrap_rc(else_val), promoted, widths)?),
        },
        Expr::SystemCall { name, args } => Expr::SystemCall {
            name,
            args: args.into_iter().map(|a| promote_expr(a, promoted, widths)).collect::<FgResult<_>>()?,
        },
        other => other,
    })
}

fn promote_stmt(s: Stmt, promoted: &mut Vec<(Id, Expr, u64)>, widths: &HashMap<Id, u64>) -> FgResult<Stmt> {
    Ok(match s {
        Stmt::Substitution(sub) => Stmt::Substitution(Substitution {
            lvalue: promote_expr(sub.lvalue, promoted, widths)?,
            rvalue: promote_expr(sub.rvalue, promoted, widths)?,
            blocking: sub.blocking,
        }),
        Stmt::If(i) => Stmt::If(IfStmt {
            cond: promote_expr(i.cond, promoted, widths)?,
            then_branch: Box::new(promote_stmt(*i.then_branch, promoted, widths)?),
            else_branch: match i.else_branch {
                Some(e) => Some(Box::new(promote_stmt(*e, promoted, widths)?)),
                None => None,
            },
        }),
        Stmt::Block(stmts) => {
            Stmt::Block(stmts.into_iter().map(|s| promote_stmt(s, promoted, widths)).collect::<FgResult<_>>()?)
        }
        Stmt::SystemTask { name, args } => Stmt::SystemTask {
            name,
            args: args.into_iter().map(|a| promote_expr(a, promoted, widths)).collect::<FgResult<_>>()?,
        },
        Stmt::Null => Stmt::Null,
    })
}

fn unwrap_rc(rc: Rc<Expr>) -> Expr {
    Rc::try_unwrap(rc).unwrap_or_else(|rc| (*rc).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::{BinaryOp, Config, ModuleDef};

    #[test]
    fn promotes_partselect_over_a_binary_expr() {
        let module = ModuleDef {
            name: Id::from("top"),
            params: vec![],
            ports: vec![],
            items: vec![ModuleItem::ContAssign {
                lvalue: Expr::Ident(Id::from("top.out")),
                rvalue: Expr::PartSelect {
                    var: Rc::new(Expr::Binary {
                        op: BinaryOp::And,
                        lhs: Rc::new(Expr::Ident(Id::from("top.a"))),
                        rhs: Rc::new(Expr::Ident(Id::from("top.b"))),
                    }),
                    msb: Rc::new(Expr::IntConst { width: None, signed: false, text: "3".into() }),
                    lsb: Rc::new(Expr::IntConst { width: None, signed: false, text: "0".into() }),
                },
            }],
        };
        let mut ctx = Context::new(module, Config::default());
        ctx.insert_term(Term::new("top.a", 8, TermKind::Wire));
        ctx.insert_term(Term::new("top.b", 8, TermKind::Wire));
        run(&mut ctx).unwrap();
        assert!(ctx.term(Id::from("partselect_promoted_0")).is_ok());
        let has_assign = ctx.module.items.iter().any(|item| {
            matches!(item, ModuleItem::ContAssign { lvalue: Expr::Ident(name), .. } if *name == Id::from("partselect_promoted_0"))
        });
        assert!(has_assign);
    }

    #[test]
    fn leaves_simple_partselect_alone() {
        let module = ModuleDef {
            name: Id::from("top"),
            params: vec![],
            ports: vec![],
            items: vec![ModuleItem::ContAssign {
                lvalue: Expr::Ident(Id::from("top.out")),
                rvalue: Expr::PartSelect {
                    var: Rc::new(Expr::Ident(Id::from("top.a"))),
                    msb: Rc::new(Expr::IntConst { width: None, signed: false, text: "3".into() }),
                    lsb: Rc::new(Expr::IntConst { width: None, signed: false, text: "0".into() }),
                },
            }],
        };
        let mut ctx = Context::new(module, Config::default());
        ctx.insert_term(Term::new("top.a", 8, TermKind::Wire));
        run(&mut ctx).unwrap();
        assert!(ctx.terms.get(&Id::from("partselect_promoted_0")).is_none());
    }
}
