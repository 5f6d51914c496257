//! Grounded on `ArraySplitPass.py`'s two-stage design: an info pass records
//! which arrays are accessed only through constant indices, then a split
//! pass replaces each eligible array with one independent scalar term per
//! index, substituting `arr[k]` with `arr__k` everywhere. An array is only
//! a full-split candidate when every `Pointer` naming it carries a constant
//! index; arrays with even one dynamic index are left alone for the
//! black-box/fan-out machinery (spec.md §4.I, §Phase 6) to handle instead.
use fg_ir::{
    Decl, Expr, IfStmt, Instance, InstanceList, ModuleItem, Stmt, Substitution, Term, TermKind,
};
use fg_utils::{FgResult, Id};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub fn run(ctx: &mut fg_ir::Context) -> FgResult<()> {
    let eligible = find_eligible(ctx);
    if eligible.is_empty() {
        return Ok(());
    }

    let items = std::mem::take(&mut ctx.module.items);
    let mut new_items = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ModuleItem::Decl(d) if eligible.contains_key(&d.name) => {
                let dim = eligible[&d.name];
                for i in 0..dim {
                    new_items.push(ModuleItem::Decl(Decl {
                        name: Id::new(format!("{}__{i}", d.name)),
                        array_dim: None,
                        ..d.clone()
                    }));
                }
            }
            ModuleItem::ContAssign { lvalue, rvalue } => new_items.push(ModuleItem::ContAssign {
                lvalue: rewrite_expr(lvalue, &eligible),
                rvalue: rewrite_expr(rvalue, &eligible),
            }),
            ModuleItem::Always(a) => new_items.push(ModuleItem::Always(fg_ir::Always {
                senslist: a.senslist,
                body: rewrite_stmt(a.body, &eligible),
            })),
            ModuleItem::Initial(i) => new_items.push(ModuleItem::Initial(fg_ir::Initial {
                body: rewrite_stmt(i.body, &eligible),
            })),
            ModuleItem::InstanceList(l) => {
                new_items.push(ModuleItem::InstanceList(rewrite_instance_list(l, &eligible)))
            }
            other => new_items.push(other),
        }
    }
    ctx.module.items = new_items;

    for (name, dim) in &eligible {
        if let Some(term) = ctx.terms.remove(name) {
            for i in 0..*dim {
                let mut scalar = Term::new(format!("{name}__{i}"), term.width, term.kind);
                scalar.signed = term.signed;
                ctx.insert_term(scalar);
            }
        }
    }
    Ok(())
}

fn find_eligible(ctx: &fg_ir::Context) -> HashMap<Id, u64> {
    let mut eligible: HashMap<Id, u64> = ctx
        .terms
        .values()
        .filter(|t| t.is_array())
        .map(|t| (t.name, t.array_dim.unwrap()))
        .collect();
    let mut disqualified = HashSet::new();

    let mut check = |e: &Expr| {
        if let Expr::Pointer { var, index } = e {
            if let Expr::Ident(name) = &**var {
                if eligible.contains_key(name) && !matches!(&**index, Expr::IntConst { .. }) {
                    disqualified.insert(*name);
                }
            }
        }
    };
    for item in &ctx.module.items {
        match item {
            ModuleItem::ContAssign { lvalue, rvalue } => {
                for_each_expr(lvalue, &mut check);
                for_each_expr(rvalue, &mut check);
            }
            ModuleItem::Always(a) => for_each_expr_in_stmt(&a.body, &mut check),
            ModuleItem::Initial(i) => for_each_expr_in_stmt(&i.body, &mut check),
            ModuleItem::InstanceList(l) => {
                for inst in &l.instances {
                    inst.params.iter().for_each(|(_, e)| for_each_expr(e, &mut check));
                    inst.port_bindings.iter().for_each(|(_, e)| for_each_expr(e, &mut check));
                }
            }
            ModuleItem::Decl(_) => {}
        }
    }
    for name in disqualified {
        eligible.remove(&name);
    }
    eligible
}

fn for_each_expr(e: &Expr, f: &mut impl FnMut(&Expr)) {
    f(e);
    match e {
        Expr::PartSelect { var, msb, lsb } => {
            for_each_expr(var, f);
            for_each_expr(msb, f);
            for_each_expr(lsb, f);
        }
        Expr::Pointer { var, index } => {
            for_each_expr(var, f);
            for_each_expr(index, f);
        }
        Expr::Concat(items) => items.iter().for_each(|i| for_each_expr(i, f)),
        Expr::Repeat { times, value } => {
            for_each_expr(times, f);
            for_each_expr(value, f);
        }
        Expr::Unary { operand, .. } => for_each_expr(operand, f),
        Expr::Binary { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
            for_each_expr(lhs, f);
            for_each_expr(rhs, f);
        }
        Expr::Shift { value, amount, .. } => {
            for_each_expr(value, f);
            for_each_expr(amount, f);
        }
        Expr::Cond { cond, then_val, else_val } => {
            for_each_expr(cond, f);
            for_each_expr(then_val, f);
            for_each_expr(else_val, f);
        }
        Expr::SystemCall { args, .. } => args.iter().for_each(|a| for_each_expr(a, f)),
        Expr::Ident(_) | Expr::IntConst { .. } | Expr::StrConst(_) => {}
    }
}

fn for_each_expr_in_stmt(s: &Stmt, f: &mut impl FnMut(&Expr)) {
    match s {
        Stmt::Substitution(sub) => {
            for_each_expr(&sub.lvalue, f);
            for_each_expr(&sub.rvalue, f);
        }
        Stmt::If(i) => {
            for_each_expr(&i.cond, f);
            for_each_expr_in_stmt(&i.then_branch, f);
            if let Some(e) = &i.else_branch {
                for_each_expr_in_stmt(e, f);
            }
        }
        Stmt::Block(stmts) => stmts.iter().for_each(|s| for_each_expr_in_stmt(s, f)),
        Stmt::SystemTask { args, .. } => args.iter().for_each(|a| for_each_expr(a, f)),
        Stmt::Null => {}
    }
}

fn rewrite_expr(e: Expr, eligible: &HashMap<Id, u64>) -> Expr {
    match e {
        Expr::Pointer { var, index } => {
            if let (Expr::Ident(name), Expr::IntConst { text, .. }) = (&*var, &*index) {
                if eligible.contains_key(name) {
                    if let Some(idx) = const_index(text) {
                        return Expr::Ident(Id::new(format!("{name}__{idx}")));
                    }
                }
            }
            Expr::Pointer {
                var: Rc::new(rewrite_expr(unwrap_rc(var), eligible)),
                index: Rc::new(rewrite_expr(unwrap_rc(index), eligible)),
            }
        }
        Expr::PartSelect { var, msb, lsb } => Expr::PartSelect {
            var: Rc::new(rewrite_expr(unwrap_rc(var), eligible)),
            msb: Rc::new(rewrite_expr(unwrap_rc(msb), eligible)),
            lsb: Rc::new(rewrite_expr(unwrap_rc(lsb), eligible)),
        },
        Expr::Concat(items) => Expr::Concat(items.into_iter().map(|i| rewrite_expr(i, eligible)).collect()),
        Expr::Repeat { times, value } => Expr::Repeat {
            times: Rc::new(rewrite_expr(unwrap_rc(times), eligible)),
            value: Rc::new(rewrite_expr(unwrap_rc(value), eligible)),
        },
        Expr::Unary { op, operand } => Expr::Unary { op, operand: Rc::new(rewrite_expr(unwrap_rc(operand), eligible)) },
        Expr::Binary { op, lhs, rhs } => Expr::Binary {
            op,
            lhs: Rc::new(rewrite_expr(unwrap_rc(lhs), eligible)),
            rhs: Rc::new(rewrite_expr(unwrap_rc(rhs), eligible)),
        },
        Expr::Compare { op, lhs, rhs } => Expr::Compare {
            op,
            lhs: Rc::new(rewrite_expr(unwrap_rc(lhs), eligible)),
            rhs: Rc::new(rewrite_expr(unwrap_rc(rhs), eligible)),
        },
        Expr::Shift { op, value, amount } => Expr::Shift {
            op,
            value: Rc::new(rewrite_expr(unwrap_rc(value), eligible)),
            amount: Rc::new(rewrite_expr(unwrap_rc(amount), eligible)),
        },
        Expr::Logical { op, lhs, rhs } => Expr::Logical {
            op,
            lhs: Rc::new(rewrite_expr(unwrap_rc(lhs), eligible)),
            rhs: Rc::new(rewrite_expr(unwrap_rc(rhs), eligible)),
        },
        Expr::Cond { cond, then_val, else_val } => Expr::Cond {
            cond: Rc::new(rewrite_expr(unwrap_rc(cond), eligible)),
            then_val: Rc::new(rewrite_expr(unwrap_rc(then_val), eligible)),
            else_val: Rc::new(rewrite_expr(unwrap_rc(else_val), eligible)),
        },
        Expr::SystemCall { name, args } => {
            Expr::SystemCall { name, args: args.into_iter().map(|a| rewrite_expr(a, eligible)).collect() }
        }
        other => other,
    }
}

fn rewrite_stmt(s: Stmt, eligible: &HashMap<Id, u64>) -> Stmt {
    match s {
        Stmt::Substitution(sub) => Stmt::Substitution(Substitution {
            lvalue: rewrite_expr(sub.lvalue, eligible),
            rvalue: rewrite_expr(sub.rvalue, eligible),
            blocking: sub.blocking,
        }),
        Stmt::If(i) => Stmt::If(IfStmt {
            cond: rewrite_expr(i.cond, eligible),
            then_branch: Box::new(rewrite_stmt(*i.then_branch, eligible)),
            else_branch: i.else_branch.map(|e| Box::new(rewrite_stmt(*e, eligible))),
        }),
        Stmt::Block(stmts) => Stmt::Block(stmts.into_iter().map(|s| rewrite_stmt(s, eligible)).collect()),
        Stmt::SystemTask { name, args } => {
            Stmt::SystemTask { name, args: args.into_iter().map(|a| rewrite_expr(a, eligible)).collect() }
        }
        Stmt::Null => Stmt::Null,
    }
}

fn rewrite_instance_list(l: InstanceList, eligible: &HashMap<Id, u64>) -> InstanceList {
    InstanceList {
        module: l.module,
        instances: l
            .instances
            .into_iter()
            .map(|inst| Instance {
                name: inst.name,
                params: inst.params.into_iter().map(|(n, e)| (n, rewrite_expr(e, eligible))).collect(),
                port_bindings: inst
                    .port_bindings
                    .into_iter()
                    .map(|(n, e)| (n, rewrite_expr(e, eligible)))
                    .collect(),
            })
            .collect(),
    }
}

fn unwrap_rc(rc: Rc<Expr>) -> Expr {
    Rc::try_unwrap(rc).unwrap_or_else(|rc| (*rc).clone())
}

fn const_index(text: &str) -> Option<u64> {
    text.rsplit(|c: char| !c.is_ascii_hexdigit())
        .next()
        .and_then(|digits| u64::from_str_radix(digits, 16).ok())
        .or_else(|| text.parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::Config;

    #[test]
    fn constant_only_array_is_fully_split() {
        let module = fg_ir::ModuleDef {
            name: Id::from("top"),
            params: vec![],
            ports: vec![],
            items: vec![ModuleItem::ContAssign {
                lvalue: Expr::Ident(Id::from("top.out")),
                rvalue: Expr::Pointer {
                    var: Rc::new(Expr::Ident(Id::from("top.mem"))),
                    index: Rc::new(Expr::IntConst { width: None, signed: false, text: "1".into() }),
                },
            }],
        };
        let mut ctx = fg_ir::Context::new(module, Config::default());
        ctx.insert_term(Term::new("top.mem", 8, TermKind::Reg).with_array_dim(4));
        run(&mut ctx).unwrap();
        assert!(ctx.term(Id::from("top.mem__1")).is_ok());
        assert!(ctx.term(Id::from("top.mem")).is_err());
    }

    #[test]
    fn dynamically_indexed_array_is_left_alone() {
        let module = fg_ir::ModuleDef {
            name: Id::from("top"),
            params: vec![],
            ports: vec![],
            items: vec![ModuleItem::ContAssign {
                lvalue: Expr::Ident(Id::from("top.out")),
                rvalue: Expr::Pointer {
                    var: Rc::new(Expr::Ident(Id::from("top.mem"))),
                    index: Rc::new(Expr::Ident(Id::from("top.idx"))),
                },
            }],
        };
        let mut ctx = fg_ir::Context::new(module, Config::default());
        ctx.insert_term(Term::new("top.mem", 8, TermKind::Reg).with_array_dim(4));
        run(&mut ctx).unwrap();
        assert!(ctx.term(Id::from("top.mem")).is_ok());
    }
}
