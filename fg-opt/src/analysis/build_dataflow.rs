//! Builds the per-binding [`fg_ir::DfNode`] tree from the AST (spec.md §4.F),
//! grounded on the original `BindVisitor`/`dataflowpass.py` driver named in
//! spec.md's Data Model section. Collects one [`fg_ir::Binding`] per write
//! site (continuous assign, blocking/nonblocking substitution) in the
//! module, transparently inlining `Rename` terms (synthetic names the
//! importer may introduce for a shared subexpression) so no `DfNode` ever
//! names one.
use baa::BitVecValue;
use fg_ir::{
    AssignType, Binding, CompareOp, Context, DfNode, DfOp, Expr, ModuleItem, PathCond, PtrIndex,
    ShiftOp, Stmt, TermKind,
};
use fg_utils::{Error, FgResult, Id};
use std::collections::HashMap;
use std::rc::Rc;

/// Collects every write site in the module into a flat list of bindings,
/// and feeds each one into `ctx.term_table` so later phases can query the
/// per-bit DFF/comb classification (spec.md §4.B) instead of a term's
/// declared kind. `renames` maps a `Rename`-kind term to the expression it
/// stands for, so a reference to it expands inline rather than terminating
/// at a synthetic name.
pub fn build(ctx: &mut Context) -> FgResult<Vec<Binding>> {
    let renames: HashMap<Id, &Expr> = HashMap::new();
    let mut out = Vec::new();
    let path = PathCond::new();

    for item in &ctx.module.items {
        match item {
            ModuleItem::ContAssign { lvalue, rvalue } => {
                out.push(lower_binding(lvalue, rvalue, AssignType::Blocking, None, &[], &renames, &path)?);
            }
            ModuleItem::Always(a) => {
                let clock = a.senslist.iter().find(|s| s.edge == fg_ir::Edge::Pos).map(|s| s.signal);
                let senslist: Vec<Id> = a.senslist.iter().map(|s| s.signal).collect();
                collect_stmt(&a.body, clock, &senslist, &renames, &path, &mut out)?;
            }
            ModuleItem::Initial(i) => {
                collect_stmt(&i.body, None, &[], &renames, &path, &mut out)?;
            }
            ModuleItem::InstanceList(list) => {
                if let Some(model) = crate::models::lookup(list.module) {
                    for inst in &list.instances {
                        out.extend(model.bind(inst));
                    }
                }
            }
            ModuleItem::Decl(_) => {}
        }
    }

    for b in &out {
        classify_binding(ctx, b)?;
    }
    Ok(out)
}

/// Feeds one discovered write site into the per-bit classifier (spec.md
/// §4.B): a bit is a flip-flop output only if every binding that writes it
/// uses a nonblocking assign. Black-box model edges aren't a Verilog assign
/// at all; `chain::dff_set` classifies those directly off `AssignType::Model`.
fn classify_binding(ctx: &mut Context, b: &Binding) -> FgResult<()> {
    let nonblocking = match b.assigntype {
        AssignType::Blocking => false,
        AssignType::Nonblocking => true,
        AssignType::Model(_) => return Ok(()),
    };
    let Some(term) = ctx.terms.get(&b.dst) else { return Ok(()) };
    if !term.is_register() {
        return Ok(());
    }
    let width = term.width;
    let msb = b.msb.unwrap_or(width - 1);
    let lsb = b.lsb.unwrap_or(0);
    ctx.term_table.register(b.dst, width);
    ctx.term_table.classify(b.dst, msb, lsb, nonblocking)
}

fn collect_stmt(
    stmt: &Stmt,
    clock: Option<Id>,
    senslist: &[Id],
    renames: &HashMap<Id, &Expr>,
    path: &PathCond,
    out: &mut Vec<Binding>,
) -> FgResult<()> {
    match stmt {
        Stmt::Substitution(s) => {
            let assigntype = if s.blocking { AssignType::Blocking } else { AssignType::Nonblocking };
            out.push(lower_binding(&s.lvalue, &s.rvalue, assigntype, clock, senslist, renames, path)?);
            Ok(())
        }
        Stmt::If(s) => {
            let cond = expr_to_df(&s.cond, renames)?;
            if let Ok(then_path) = path.push(Rc::clone(&cond), true) {
                collect_stmt(&s.then_branch, clock, senslist, renames, &then_path, out)?;
            }
            if let Some(e) = &s.else_branch {
                if let Ok(else_path) = path.push(cond, false) {
                    collect_stmt(e, clock, senslist, renames, &else_path, out)?;
                }
            }
            Ok(())
        }
        Stmt::Block(stmts) => stmts.iter().try_for_each(|s| collect_stmt(s, clock, senslist, renames, path, out)),
        Stmt::SystemTask { .. } | Stmt::Null => Ok(()),
    }
}

fn lower_binding(
    lvalue: &Expr,
    rvalue: &Expr,
    assigntype: AssignType,
    clock: Option<Id>,
    senslist: &[Id],
    renames: &HashMap<Id, &Expr>,
    path: &PathCond,
) -> FgResult<Binding> {
    let (dst, msb, lsb, ptr) = lower_lvalue(lvalue)?;
    let tree = expr_to_df(rvalue, renames)?;
    Ok(Binding { dst, msb, lsb, ptr, tree, assigntype, clock, senslist: senslist.to_vec(), path: path.clone() })
}

fn lower_lvalue(lvalue: &Expr) -> FgResult<(Id, Option<u64>, Option<u64>, Option<PtrIndex>)> {
    match lvalue {
        Expr::Ident(name) => Ok((*name, None, None, None)),
        Expr::PartSelect { var, msb, lsb } => {
            let (name, ..) = lower_lvalue(var)?;
            Ok((name, Some(const_u64(msb)?), Some(const_u64(lsb)?), None))
        }
        Expr::Pointer { var, index } => {
            let (name, ..) = lower_lvalue(var)?;
            let ptr = match const_u64(index) {
                Ok(v) => PtrIndex::Const(v),
                Err(_) => PtrIndex::Dynamic(index_driver(index)?),
            };
            Ok((name, None, None, Some(ptr)))
        }
        other => Err(Error::unsupported_syntax(format!("unsupported lvalue form {other:?}"))),
    }
}

fn index_driver(expr: &Expr) -> FgResult<Id> {
    match expr {
        Expr::Ident(name) => Ok(*name),
        Expr::PartSelect { var, .. } | Expr::Pointer { var, .. } => index_driver(var),
        other => Err(Error::unsupported_syntax(format!("non-constant index driver {other:?}"))),
    }
}

fn const_u64(expr: &Expr) -> FgResult<u64> {
    match expr {
        Expr::IntConst { text, .. } => parse_literal(text)
            .map(|v| v.to_u64().unwrap_or(0))
            .ok_or_else(|| Error::width_mismatch(format!("non-constant literal `{text}'"))),
        other => Err(Error::unsupported_syntax(format!("expected constant, got {other:?}"))),
    }
}

/// Lowers a bare expression (e.g. an `if` condition) to a [`DfNode`] outside
/// the context of any binding, for callers that only need it as a `Cond`
/// leaf (spec.md §4.H Phase 4's unassigned-condition visitor).
pub fn lower_cond(expr: &Expr) -> FgResult<Rc<DfNode>> {
    expr_to_df(expr, &HashMap::new())
}

fn expr_to_df(expr: &Expr, renames: &HashMap<Id, &Expr>) -> FgResult<Rc<DfNode>> {
    Ok(match expr {
        Expr::Ident(name) => match renames.get(name) {
            Some(inner) => expr_to_df(inner, renames)?,
            None => DfNode::terminal(*name),
        },
        Expr::IntConst { text, width, .. } => match parse_literal(text) {
            Some(v) => Rc::new(DfNode::EvalValue(v)),
            None => {
                let _ = width;
                Rc::new(DfNode::IntConst(text.clone()))
            }
        },
        Expr::StrConst(s) => Rc::new(DfNode::IntConst(s.clone())),
        Expr::PartSelect { var, msb, lsb } => Rc::new(DfNode::Partselect {
            var: expr_to_df(var, renames)?,
            msb: const_u64(msb)?,
            lsb: const_u64(lsb)?,
        }),
        Expr::Pointer { var, index } => Rc::new(DfNode::Pointer {
            var: expr_to_df(var, renames)?,
            index: expr_to_df(index, renames)?,
        }),
        Expr::Concat(items) => {
            Rc::new(DfNode::Concat(items.iter().map(|e| expr_to_df(e, renames)).collect::<FgResult<_>>()?))
        }
        Expr::Repeat { times, value } => {
            let n = const_u64(times)?;
            let child = expr_to_df(value, renames)?;
            Rc::new(DfNode::Concat(std::iter::repeat(child).take(n as usize).collect()))
        }
        Expr::Unary { op, operand } => {
            let df_op = match op {
                fg_ir::UnaryOp::ReduceAnd => DfOp::And,
                fg_ir::UnaryOp::ReduceOr => DfOp::Or,
                fg_ir::UnaryOp::ReduceXor => DfOp::Xor,
                fg_ir::UnaryOp::Not | fg_ir::UnaryOp::BitNot => DfOp::Unot,
                other => return Err(Error::unsupported_syntax(format!("unary op {other:?}"))),
            };
            Rc::new(DfNode::Operator { op: df_op, operands: vec![expr_to_df(operand, renames)?] })
        }
        Expr::Binary { op, lhs, rhs } => {
            let df_op = match op {
                fg_ir::BinaryOp::And => DfOp::And,
                fg_ir::BinaryOp::Or => DfOp::Or,
                fg_ir::BinaryOp::Xor | fg_ir::BinaryOp::Xnor => DfOp::Xor,
                fg_ir::BinaryOp::Plus => DfOp::Plus,
                fg_ir::BinaryOp::Minus => DfOp::Minus,
                other => return Err(Error::unsupported_syntax(format!("binary op {other:?} not supported by the precise dependency visitor"))),
            };
            Rc::new(DfNode::Operator { op: df_op, operands: vec![expr_to_df(lhs, renames)?, expr_to_df(rhs, renames)?] })
        }
        Expr::Compare { op, lhs, rhs } => {
            let df_op = match op {
                CompareOp::Eq | CompareOp::CaseEq => DfOp::Eq,
                CompareOp::Neq | CompareOp::CaseNeq => DfOp::Neq,
                CompareOp::Gt => DfOp::Gt,
                CompareOp::Lt => DfOp::Lt,
                CompareOp::Geq => DfOp::Geq,
                CompareOp::Leq => DfOp::Leq,
            };
            Rc::new(DfNode::Operator { op: df_op, operands: vec![expr_to_df(lhs, renames)?, expr_to_df(rhs, renames)?] })
        }
        Expr::Shift { op, value, amount } => {
            if *op != ShiftOp::Srl {
                return Err(Error::unsupported_syntax(format!("shift op {op:?} not supported by the precise dependency visitor")));
            }
            let n = const_u64(amount)?;
            Rc::new(DfNode::Operator { op: DfOp::Srl(n), operands: vec![expr_to_df(value, renames)?] })
        }
        Expr::Logical { op, lhs, rhs } => {
            let df_op = if *op == fg_ir::LogicalOp::And { DfOp::And } else { DfOp::Or };
            Rc::new(DfNode::Operator { op: df_op, operands: vec![expr_to_df(lhs, renames)?, expr_to_df(rhs, renames)?] })
        }
        Expr::Cond { cond, then_val, else_val } => Rc::new(DfNode::Branch {
            cond: expr_to_df(cond, renames)?,
            truenode: Some(expr_to_df(then_val, renames)?),
            falsenode: Some(expr_to_df(else_val, renames)?),
        }),
        Expr::SystemCall { .. } => return Err(Error::unsupported_syntax("system call in a dependency expression")),
    })
}

fn parse_literal(text: &str) -> Option<BitVecValue> {
    let (width, rest) = match text.split_once('\'') {
        Some((w, r)) => (w.trim().parse::<u32>().ok(), r),
        None => (None, text),
    };
    let (radix, digits) = match rest.as_bytes().first().map(|b| b.to_ascii_lowercase()) {
        Some(b'h') => (16, &rest[1..]),
        Some(b'b') => (2, &rest[1..]),
        Some(b'o') => (8, &rest[1..]),
        Some(b'd') => (10, &rest[1..]),
        _ => (10, rest),
    };
    let digits = digits.replace('_', "");
    let value = u128::from_str_radix(&digits, radix).ok()?;
    let width = width.unwrap_or(32);
    Some(BitVecValue::from_u64(value as u64, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sized_hex_literal() {
        let v = parse_literal("8'hFF").unwrap();
        assert_eq!(v.width(), 8);
    }

    #[test]
    fn parses_unsized_decimal_literal() {
        let v = parse_literal("42").unwrap();
        assert_eq!(v.width(), 32);
    }
}
