//! Implements a visitor for the statement tree inside one elaborated module.
//! Ported from `calyx-opt/src/traversal/visitor.rs`: the same `Named`,
//! `ConstructVisitor`, `Visitor` split, with the `start_*`/`finish_*`
//! pair-per-node-kind shape. Generalized from Calyx's `ir::Control`
//! (`Seq`/`Par`/`While`/`Enable`/`Invoke`) to this compiler's flat AST
//! (`Stmt::{If,Block,Substitution,Null}` plus the per-`ModuleItem` entry
//! points `always`/`initial`/`cont_assign`/`instance_list`), and from a
//! multi-component traversal to a single `Context` holding one module.
use super::action::{Action, VisResult};
use fg_ir::{Always, Context, IfStmt, Initial, InstanceList, Stmt, Substitution};
use fg_utils::FgResult;
use itertools::Itertools;
use std::collections::HashSet;

pub trait Named {
    fn name() -> &'static str;
    fn description() -> &'static str;
    fn opts() -> &'static [(&'static str, &'static str)] {
        &[]
    }
}

/// Extra, free-form `name:option` pass flags, parsed the way
/// `ConstructVisitor::get_opts` parses `ctx.extra_opts` (spec.md §2 ambient
/// stack note).
pub trait ConstructVisitor {
    fn get_opts(ctx: &Context) -> Vec<bool>
    where
        Self: Named,
    {
        let opts = Self::opts();
        let n = Self::name();
        let given: HashSet<_> = ctx
            .config
            .extra_opts
            .iter()
            .filter_map(|opt| {
                let mut splits = opt.splitn(2, ':');
                if splits.next() == Some(n) {
                    splits.next().map(str::to_string)
                } else {
                    None
                }
            })
            .collect();
        let values = opts.iter().map(|(o, _)| given.contains(*o)).collect_vec();
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Extra options for {}: {}",
                Self::name(),
                opts.iter().zip(values.iter()).map(|((o, _), v)| format!("{o}->{v}")).join(", ")
            );
        }
        values
    }

    fn from(_ctx: &Context) -> FgResult<Self>
    where
        Self: Sized;

    fn clear_data(&mut self);
}

impl<T: Default + Sized + Visitor> ConstructVisitor for T {
    fn from(_ctx: &Context) -> FgResult<Self> {
        Ok(T::default())
    }
    fn clear_data(&mut self) {
        *self = T::default();
    }
}

/// The visiting interface for one module's statement tree and top-level
/// items.
pub trait Visitor {
    /// If this returns `Some(reason)`, the pass is skipped entirely.
    fn precondition(_ctx: &Context) -> Option<String>
    where
        Self: Sized,
    {
        None
    }

    /// Runs the pass over the whole module: `start`, every `always`/
    /// `initial`/continuous-assign/instance-list item, `finish`.
    fn do_pass(&mut self, ctx: &mut Context) -> FgResult<()>
    where
        Self: Sized + ConstructVisitor + Named,
    {
        if let Some(msg) = Self::precondition(ctx) {
            log::info!("Skipping `{}': {msg}", Self::name());
            return Ok(());
        }
        self.start(ctx)?.and_then(|| {
            let mut always = std::mem::take(&mut ctx.module.items);
            for item in &mut always {
                match item {
                    fg_ir::ModuleItem::Always(a) => {
                        self.always(a, ctx)?.and_then(|| a.body.visit(self, ctx))?.pop();
                    }
                    fg_ir::ModuleItem::Initial(i) => {
                        self.initial(i, ctx)?.and_then(|| i.body.visit(self, ctx))?.pop();
                    }
                    fg_ir::ModuleItem::ContAssign { lvalue, rvalue } => {
                        self.cont_assign(lvalue, rvalue, ctx)?;
                    }
                    fg_ir::ModuleItem::InstanceList(l) => {
                        self.instance_list(l, ctx)?;
                    }
                    fg_ir::ModuleItem::Decl(_) => {}
                }
            }
            ctx.module.items = always;
            Ok(Action::Continue)
        })?;
        self.finish(ctx)?;
        self.clear_data();
        Ok(())
    }

    fn do_pass_default(ctx: &mut Context) -> FgResult<Self>
    where
        Self: ConstructVisitor + Sized + Named,
    {
        let mut visitor = Self::from(ctx)?;
        visitor.do_pass(ctx)?;
        Ok(visitor)
    }

    fn start(&mut self, _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }
    fn finish(&mut self, _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }

    fn always(&mut self, _a: &mut Always, _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }
    fn initial(&mut self, _i: &mut Initial, _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }
    fn cont_assign(
        &mut self,
        _lvalue: &mut fg_ir::Expr,
        _rvalue: &mut fg_ir::Expr,
        _ctx: &mut Context,
    ) -> VisResult {
        Ok(Action::Continue)
    }
    fn instance_list(&mut self, _l: &mut InstanceList, _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }

    fn start_if(&mut self, _s: &mut IfStmt, _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }
    fn finish_if(&mut self, _s: &mut IfStmt, _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }
    fn start_block(&mut self, _s: &mut [Stmt], _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }
    fn finish_block(&mut self, _s: &mut [Stmt], _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }
    fn substitution(&mut self, _s: &mut Substitution, _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }
    fn null(&mut self, _ctx: &mut Context) -> VisResult {
        Ok(Action::Continue)
    }
}

/// Performs the recursive walk over a [`Stmt`], calling `start_*` on the way
/// down and `finish_*` on the way up.
pub trait Visitable {
    fn visit(&mut self, visitor: &mut dyn Visitor, ctx: &mut Context) -> VisResult;
}

impl Visitable for Stmt {
    fn visit(&mut self, visitor: &mut dyn Visitor, ctx: &mut Context) -> VisResult {
        let res = match self {
            Stmt::If(s) => visitor
                .start_if(s, ctx)?
                .and_then(|| s.then_branch.visit(visitor, ctx))?
                .and_then(|| match &mut s.else_branch {
                    Some(e) => e.visit(visitor, ctx),
                    None => Ok(Action::Continue),
                })?
                .pop()
                .and_then(|| visitor.finish_if(s, ctx))?,
            Stmt::Block(stmts) => visitor
                .start_block(stmts, ctx)?
                .and_then(|| stmts.visit(visitor, ctx))?
                .pop()
                .and_then(|| visitor.finish_block(stmts, ctx))?,
            Stmt::Substitution(s) => visitor.substitution(s, ctx)?,
            Stmt::Null => visitor.null(ctx)?,
        };
        Ok(res.apply_change(self))
    }
}

impl Visitable for Vec<Stmt> {
    fn visit(&mut self, visitor: &mut dyn Visitor, ctx: &mut Context) -> VisResult {
        for s in self {
            match s.visit(visitor, ctx)? {
                Action::Continue | Action::SkipChildren | Action::Change(_) => continue,
                Action::Stop => return Ok(Action::Stop),
            }
        }
        Ok(Action::Continue)
    }
}
