//! Grounded on `Logic2RegPass.py`: that pass resolved SystemVerilog's
//! ambiguous `logic` declarations to `wire` or `reg` depending on where they
//! appeared. Our importer never produces an ambiguous kind, so this pass
//! generalizes to the same underlying decision: a term is reg-like exactly
//! when some `always` block drives it with a nonblocking assign, and its
//! `Decl`/`Term::kind` are normalized to agree with that, regardless of what
//! the elaborator dump originally tagged it as.
use fg_ir::{Context, Expr, ModuleItem, Stmt, TermKind};
use fg_utils::{FgResult, Id};
use std::collections::HashSet;

pub fn run(ctx: &mut Context) -> FgResult<()> {
    let mut nonblocking_targets = HashSet::new();
    for a in ctx.module.always_blocks() {
        collect_nonblocking(&a.body, &mut nonblocking_targets);
    }

    for item in &mut ctx.module.items {
        if let ModuleItem::Decl(d) = item {
            d.is_reg = nonblocking_targets.contains(&d.name);
        }
    }
    for (name, term) in ctx.terms.iter_mut() {
        match term.kind {
            TermKind::Wire if nonblocking_targets.contains(name) => term.kind = TermKind::Reg,
            TermKind::Reg if !nonblocking_targets.contains(name) => term.kind = TermKind::Wire,
            _ => {}
        }
    }
    Ok(())
}

fn collect_nonblocking(stmt: &Stmt, out: &mut HashSet<Id>) {
    match stmt {
        Stmt::Substitution(s) if !s.blocking => {
            if let Some(id) = lvalue_root(&s.lvalue) {
                out.insert(id);
            }
        }
        Stmt::Substitution(_) => {}
        Stmt::If(s) => {
            collect_nonblocking(&s.then_branch, out);
            if let Some(e) = &s.else_branch {
                collect_nonblocking(e, out);
            }
        }
        Stmt::Block(stmts) => stmts.iter().for_each(|s| collect_nonblocking(s, out)),
        Stmt::SystemTask { .. } | Stmt::Null => {}
    }
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
    use fg_ir::{Always, Config, Edge, ModuleDef, SensItem, Substitution, Term};

    #[test]
    fn wire_driven_nonblocking_becomes_reg() {
        let module = ModuleDef {
            name: Id::from("top"),
            params: vec![],
            ports: vec![],
            items: vec![ModuleItem::Always(Always {
                senslist: vec![SensItem { signal: Id::from("clk"), edge: Edge::Pos }],
                body: Stmt::Substitution(Substitution {
                    lvalue: Expr::Ident(Id::from("top.q")),
                    rvalue: Expr::Ident(Id::from("top.d")),
                    blocking: false,
                }),
            })],
        };
        let mut ctx = Context::new(module, Config::default());
        ctx.insert_term(Term::new("top.q", 1, TermKind::Wire));
        run(&mut ctx).unwrap();
        assert_eq!(ctx.term(Id::from("top.q")).unwrap().kind, TermKind::Reg);
    }

    #[test]
    fn reg_never_driven_nonblocking_becomes_wire() {
        let module = ModuleDef { name: Id::from("top"), params: vec![], ports: vec![], items: vec![] };
        let mut ctx = Context::new(module, Config::default());
        ctx.insert_term(Term::new("top.stale_reg", 1, TermKind::Reg));
        run(&mut ctx).unwrap();
        assert_eq!(ctx.term(Id::from("top.stale_reg")).unwrap().kind, TermKind::Wire);
    }
}
