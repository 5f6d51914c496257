//! The FlowGuard core (spec.md §4.H): the data-flow liveness checker this
//! whole compiler exists to synthesize. Runs as a single [`crate::traversal::Visitor`]
//! pass whose `start` hook drives all seven phases directly against the
//! `Context` and then stops the traversal, since none of this operates
//! statement-by-statement the way the ordinary `Visitor` walk assumes.
pub mod blackbox;
pub mod chain;
pub mod fanout;
pub mod forward_refine;
pub mod reverse_reach;
pub mod synth;
pub mod unassigned;

use crate::traversal::{Action, Named, VisResult, Visitor};
use fg_ir::{Context, TargetEntry};
use std::collections::HashSet;

/// Accumulates the state later phases (and, eventually, a backend emitter
/// inspecting side files) need after the pass has run.
#[derive(Default)]
pub struct FlowGuardCore {
    pub chain: HashSet<TargetEntry>,
    pub dff: HashSet<TargetEntry>,
    pub synth: synth::SynthMap,
}

impl Named for FlowGuardCore {
    fn name() -> &'static str {
        "flowguard"
    }
    fn description() -> &'static str {
        "synthesize the av/ai/assign/valid/prop/good liveness signals between the declared source and sink"
    }
}

impl Visitor for FlowGuardCore {
    fn precondition(ctx: &Context) -> Option<String> {
        let d = &ctx.config.directives;
        if d.sources.is_empty() {
            Some("no --source terminal configured".to_string())
        } else if d.sinks.is_empty() {
            Some("no --sink terminal configured".to_string())
        } else {
            None
        }
    }

    fn start(&mut self, ctx: &mut Context) -> VisResult {
        self.execute(ctx)?;
        Ok(Action::Stop)
    }
}

impl FlowGuardCore {
    pub fn execute(&mut self, ctx: &mut Context) -> fg_utils::FgResult<()> {
        let bindings = crate::analysis::build_dataflow(ctx)?;

        for &sink in ctx.config.directives.sinks.clone().iter() {
            let reach = reverse_reach::run(ctx, &bindings, sink)?;

            for &source in ctx.config.directives.sources.clone().iter() {
                let refine = forward_refine::run(&reach, source, sink)?;
                if refine.target_output.is_empty() {
                    log::warn!("`{source}' does not reach `{sink}'; skipping");
                    continue;
                }

                let chain = chain::restrict(&refine);
                let dff = chain::dff_set(&chain, ctx, &bindings);

                let terms: Vec<fg_utils::Id> = chain.iter().map(|t| t.term).collect();
                let unassigned = unassigned::compute(ctx, &terms)?;

                let synth = synth::synthesize(ctx, &chain, &dff, &unassigned, &refine, &bindings, source)?;
                fanout::expand(ctx, &chain, &synth)?;
                blackbox::instrument(ctx, &synth)?;

                self.chain.extend(chain);
                self.dff.extend(dff);
                self.synth.extend(synth);
            }
        }
        Ok(())
    }
}
