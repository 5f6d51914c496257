//! A free-running counter gated by a tracked valid bit, ported in spirit
//! from `original_source/autocnt.py`'s `InsertCountingPass`/`ValidBitTarget`:
//! counts the cycles a named signal (typically one of FlowGuard's own
//! synthesized `valid` wires) is high, so a waveform viewer can read off
//! "how many times was this live" instead of eyeballing a pulse train.
use fg_ir::{Always, Context, Decl, Edge, Expr, IfStmt, ModuleItem, SensItem, Stmt, Substitution};
use fg_ir::{Term, TermKind};
use fg_utils::{FgResult, Id};

/// Counter width when the caller doesn't have a reason to pick a narrower
/// one (spec.md §4.J).
pub const DEFAULT_WIDTH: u64 = 64;

/// Declares a `width`-bit counter register that increments on every posedge
/// of `clock` where `valid_signal` is high, resetting to zero when
/// `reset_signal` is asserted (if given). Returns the counter's name.
pub fn insert(
    ctx: &mut Context,
    valid_signal: Id,
    reset_signal: Option<Id>,
    clock: Id,
    width: u64,
) -> FgResult<Id> {
    let counter = Id::new(format!("{valid_signal}__cycle_count"));

    ctx.module.items.push(ModuleItem::Decl(Decl {
        name: counter,
        width: Some((
            Expr::IntConst { width: None, signed: false, text: (width - 1).to_string() },
            Expr::IntConst { width: None, signed: false, text: "0".into() },
        )),
        array_dim: None,
        signed: false,
        is_reg: true,
        annotation: None,
    }));
    ctx.insert_term(Term::new(counter, width, TermKind::Reg));

    let increment = Stmt::Substitution(Substitution {
        lvalue: Expr::Ident(counter),
        rvalue: Expr::Binary {
            op: fg_ir::BinaryOp::Plus,
            lhs: std::rc::Rc::new(Expr::Ident(counter)),
            rhs: std::rc::Rc::new(Expr::IntConst { width: None, signed: false, text: "1".into() }),
        },
        blocking: false,
    });
    let count_when_valid = Stmt::If(IfStmt {
        cond: Expr::Ident(valid_signal),
        then_branch: Box::new(increment),
        else_branch: None,
    });

    let body = match reset_signal {
        Some(reset) => Stmt::If(IfStmt {
            cond: Expr::Ident(reset),
            then_branch: Box::new(Stmt::Substitution(Substitution {
                lvalue: Expr::Ident(counter),
                rvalue: Expr::IntConst { width: None, signed: false, text: "0".into() },
                blocking: false,
            })),
            else_branch: Some(Box::new(count_when_valid)),
        }),
        None => count_when_valid,
    };

    ctx.module.items.push(ModuleItem::Always(Always {
        senslist: vec![SensItem { signal: clock, edge: Edge::Pos }],
        body,
    }));
    Ok(counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::{Config, ModuleDef};

    #[test]
    fn declares_a_reg_sized_to_the_requested_width() {
        let module = ModuleDef { name: Id::from("top"), params: vec![], ports: vec![], items: vec![] };
        let mut ctx = Context::new(module, Config::default());
        let name =
            insert(&mut ctx, Id::from("top.en__valid"), Some(Id::from("top.rst")), Id::from("top.clk"), 16)
                .unwrap();
        assert_eq!(ctx.term(name).unwrap().width, 16);
        assert!(matches!(ctx.term(name).unwrap().kind, TermKind::Reg));
    }
}
