//! Runs the fixed sequence a design needs before and during instrumentation
//! (spec.md §4.E, §5): width canonicalization, then the AST-rewriting
//! canonicalization passes, then the `flowguard` core itself through a
//! [`PassManager`]. The canonicalization passes are plain functions rather
//! than [`crate::traversal::Visitor`] impls (`width::run`'s own doc comment
//! explains why: it needs a first pass over every declaration before it can
//! check a single binding), so they can't be registered into the manager and
//! are called directly here instead.
use crate::{analysis::width, pass_manager::PassManager, passes};
use fg_ir::Context;
use fg_utils::FgResult;

pub fn run(ctx: &mut Context) -> FgResult<()> {
    width::run(ctx)?;
    passes::logic_to_reg::run(ctx)?;
    passes::array_split::run(ctx)?;
    passes::partselect_promote::run(ctx)?;

    let pm = PassManager::default_passes()?;
    pm.execute_plan(ctx, &["all".to_string()], &[])
}
