//! Phase 7 (spec.md §4.H): black-box memory model replacement. Altsyncram and
//! scfifo/dcfifo instances hide their storage from the data-flow graph
//! entirely (§4.I), so instead of trying to see through them, every
//! instance of a registered black box gets a second, narrowed companion
//! instance spliced in beside it: its input ports are driven from the
//! already-synthesized `valid` wire of whatever feeds the real data port,
//! and its output port drives a fresh `valid`/`av`/`ai`/`assign` chain (with
//! one-cycle shadow registers, since the companion's output lags the real
//! read by the storage's own latency) local to this phase, namespaced
//! `__bb_*` so it never collides with the generic chain signals Phase 5
//! already declared for the same term.
use super::synth::SynthMap;
use crate::models::{self, MemoryModel};
use fg_ir::{
    Always, Context, Decl, Edge, Expr, Id, Instance, InstanceList, ModuleItem, SensItem, Stmt,
    Substitution,
};
use fg_utils::FgResult;

pub fn instrument(ctx: &mut Context, synth: &SynthMap) -> FgResult<()> {
    let targets: Vec<(Instance, &'static dyn MemoryModel)> = ctx
        .module
        .items
        .iter()
        .filter_map(|item| match item {
            ModuleItem::InstanceList(list) => models::lookup(list.module)
                .map(|model| list.instances.iter().cloned().map(move |inst| (inst, model)).collect::<Vec<_>>()),
            _ => None,
        })
        .flatten()
        .collect();

    for (instance, model) in targets {
        instrument_one(ctx, &instance, model, synth)?;
    }
    Ok(())
}

fn instrument_one(
    ctx: &mut Context,
    instance: &Instance,
    model: &'static dyn MemoryModel,
    synth: &SynthMap,
) -> FgResult<()> {
    let clock_expr = instance
        .port_bindings
        .iter()
        .find(|(port, _)| *port == model.clock_port())
        .map(|(_, expr)| expr.clone());

    let carried_ports: Vec<(Id, Expr)> = instance
        .port_bindings
        .iter()
        .filter(|(port, _)| {
            !model.input_ports().contains(&port.as_ref()) && !model.output_ports().contains(&port.as_ref())
        })
        .cloned()
        .collect();

    let mut companion_ports = carried_ports;
    let mut extra_items = Vec::new();
    let mut any_tracked = false;

    for &port in model.input_ports() {
        let Some(signals) = bound_signals(instance, port, synth) else { continue };
        any_tracked = true;
        companion_ports.push((Id::new(port), Expr::Ident(signals.valid)));
    }

    for &port in model.output_ports() {
        let Some((_, Expr::Ident(sig))) = instance.port_bindings.iter().find(|(p, _)| *p == port) else {
            continue;
        };
        if synth.get(sig).is_none() {
            continue;
        }
        any_tracked = true;
        let bb_valid = Id::new(format!("{sig}__bb_valid"));
        let bb_av = Id::new(format!("{sig}__bb_av"));
        let bb_ai = Id::new(format!("{sig}__bb_ai"));
        let bb_assign = Id::new(format!("{sig}__bb_assign"));
        let bb_valid_q = Id::new(format!("{sig}__bb_valid_q"));
        let bb_av_q = Id::new(format!("{sig}__bb_av_q"));
        let bb_ai_q = Id::new(format!("{sig}__bb_ai_q"));
        let bb_assign_q = Id::new(format!("{sig}__bb_assign_q"));

        for name in [bb_valid, bb_av, bb_ai, bb_assign, bb_valid_q, bb_av_q, bb_ai_q, bb_assign_q] {
            declare_wire(ctx, name);
        }

        companion_ports.push((Id::new(port), Expr::Ident(bb_valid)));
        extra_items.push(cont_assign(bb_av, Expr::Ident(bb_valid)));
        extra_items.push(cont_assign(
            bb_ai,
            Expr::Unary { op: fg_ir::UnaryOp::Not, operand: std::rc::Rc::new(Expr::Ident(bb_valid)) },
        ));
        // This black box drove new, valid data this cycle.
        extra_items.push(cont_assign(bb_assign, Expr::Ident(bb_valid)));

        if let Some(clock) = &clock_expr {
            if let Expr::Ident(clock_sig) = clock {
                extra_items.push(shadow_reg_block(
                    *clock_sig,
                    &[(bb_valid_q, bb_valid), (bb_av_q, bb_av), (bb_ai_q, bb_ai), (bb_assign_q, bb_assign)],
                ));
            }
        }
    }

    if !any_tracked {
        return Ok(());
    }

    let mut params = instance.params.clone();
    for &(name, value) in model.narrowed_params() {
        let value_expr = Expr::IntConst { width: None, signed: false, text: value.into() };
        if let Some(slot) = params.iter_mut().find(|(p, _)| *p == name) {
            slot.1 = value_expr;
        } else {
            params.push((Id::new(name), value_expr));
        }
    }

    ctx.module.items.push(ModuleItem::InstanceList(InstanceList {
        module: Id::new(model.companion_module()),
        instances: vec![Instance {
            name: Id::new(format!("{}__flowguard", instance.name)),
            params,
            port_bindings: companion_ports,
        }],
    }));
    ctx.module.items.extend(extra_items);
    Ok(())
}

fn bound_signals<'a>(
    instance: &Instance,
    port: &str,
    synth: &'a SynthMap,
) -> Option<&'a super::synth::SynthSignals> {
    let (_, expr) = instance.port_bindings.iter().find(|(p, _)| *p == port)?;
    let Expr::Ident(sig) = expr else { return None };
    synth.get(sig)
}

fn declare_wire(ctx: &mut Context, name: Id) {
    if ctx.terms.contains_key(&name) {
        return;
    }
    ctx.module.items.push(ModuleItem::Decl(Decl {
        name,
        width: None,
        array_dim: None,
        signed: false,
        is_reg: false,
        annotation: None,
    }));
    ctx.insert_term(fg_ir::Term::new(name, 1, fg_ir::TermKind::Wire));
}

fn cont_assign(lvalue: Id, rvalue: Expr) -> ModuleItem {
    ModuleItem::ContAssign { lvalue: Expr::Ident(lvalue), rvalue }
}

fn shadow_reg_block(clock: Id, pairs: &[(Id, Id)]) -> ModuleItem {
    let subs = pairs
        .iter()
        .map(|(dst, src)| {
            Stmt::Substitution(Substitution {
                lvalue: Expr::Ident(*dst),
                rvalue: Expr::Ident(*src),
                blocking: false,
            })
        })
        .collect();
    ModuleItem::Always(Always {
        senslist: vec![SensItem { signal: clock, edge: Edge::Pos }],
        body: Stmt::Block(subs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::flowguard::synth::SynthSignals;
    use fg_ir::{Config, ModuleDef};

    #[test]
    fn untracked_instance_is_left_alone() {
        let module = ModuleDef {
            name: Id::from("top"),
            params: vec![],
            ports: vec![],
            items: vec![ModuleItem::InstanceList(InstanceList {
                module: Id::from("not_a_memory"),
                instances: vec![Instance { name: Id::from("u0"), params: vec![], port_bindings: vec![] }],
            })],
        };
        let mut ctx = Context::new(module, Config::default());
        instrument(&mut ctx, &SynthMap::new()).unwrap();
        assert_eq!(ctx.module.items.len(), 1);
    }

    #[test]
    fn scfifo_output_port_gets_a_companion_instance() {
        let module = ModuleDef {
            name: Id::from("top"),
            params: vec![],
            ports: vec![],
            items: vec![ModuleItem::InstanceList(InstanceList {
                module: Id::from("scfifo"),
                instances: vec![Instance {
                    name: Id::from("fifo0"),
                    params: vec![],
                    port_bindings: vec![
                        (Id::from("clock"), Expr::Ident(Id::from("top.clk"))),
                        (Id::from("q"), Expr::Ident(Id::from("top.q"))),
                    ],
                }],
            })],
        };
        let mut ctx = Context::new(module, Config::default());
        let mut synth = SynthMap::new();
        synth.insert(
            Id::from("top.q"),
            SynthSignals {
                assign: Id::from("top.q__assign"),
                av: Id::from("top.q__av"),
                ai: Id::from("top.q__ai"),
                valid: Id::from("top.q__valid"),
                prop: None,
                good: None,
                loss: None,
            },
        );
        instrument(&mut ctx, &synth).unwrap();
        assert!(ctx.terms.contains_key(&Id::from("top.q__bb_valid")));
        let companions: Vec<_> = ctx
            .module
            .items
            .iter()
            .filter_map(|item| match item {
                ModuleItem::InstanceList(list) if list.module == "scfifo_simple_model" => Some(list),
                _ => None,
            })
            .collect();
        assert_eq!(companions.len(), 1);
    }
}
