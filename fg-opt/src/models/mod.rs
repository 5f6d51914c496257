//! Black-box memory models (spec.md §4.I): small lookup table, keyed by the
//! Verilog module name of an instantiated black box, of how to splice a
//! liveness-tracking companion instance alongside it. Altsyncram and scfifo
//! hide their storage from FlowGuard's bit-level data-flow graph entirely, so
//! rather than trying to see through them, the instrumented design gets a
//! second, narrowed instance of a hand-written companion module that
//! receives the already-synthesized `av`/`ai`/`assign`/`valid` signals on its
//! data ports and reproduces the RAM/FIFO's propagation behavior on one bit.
//!
//! Model registrations are a static table keyed by module name, the same
//! shape `default_passes.rs` uses to register the ordinary pass table.
mod altsyncram;
mod scfifo;

use fg_ir::{AssignType, Binding, DfNode, Expr, Id, Instance, PathCond};
use std::rc::Rc;

/// One black-box memory model. A model recognizes a subset of the ports on
/// instances of [`Self::target_module`] and knows how to wire a narrowed
/// companion instance of [`Self::companion_module`] that reproduces the
/// black box's propagation behavior for FlowGuard's one-bit signals.
pub trait MemoryModel: Send + Sync {
    /// The black-boxed Verilog module name, e.g. `"altsyncram"`.
    fn target_module(&self) -> &'static str;

    /// The companion module this model instantiates alongside the original.
    fn companion_module(&self) -> &'static str;

    /// The port the companion's shadow registers should clock on.
    fn clock_port(&self) -> &'static str;

    /// Ports whose bound signal writes into the storage: the companion's
    /// same-named port is bound to that signal's already-synthesized
    /// `valid` wire.
    fn input_ports(&self) -> &'static [&'static str];

    /// Ports whose bound signal reads out of the storage: the companion
    /// gets a fresh output wire here, and `av`/`ai`/`assign` are re-derived
    /// from it and registered on [`Self::clock_port`].
    fn output_ports(&self) -> &'static [&'static str];

    /// `(param_name, narrowed_value)` overrides applied to the companion
    /// instance's parameter list, since the companion only needs to carry
    /// one bit per tracked port regardless of the original's data width.
    fn narrowed_params(&self) -> &'static [(&'static str, &'static str)];

    /// Synthesizes the zero-delay memory edge spec.md §3/§4.I names for a
    /// black-boxed instance: the data-flow graph can't see through the
    /// instance, so every bound output port is treated as driven by the
    /// concatenation of every bound input port, directly, on the clock the
    /// instance binds to [`Self::clock_port`].
    fn bind(&self, instance: &Instance) -> Vec<Binding> {
        let bound = |port: &'static str| instance.port_bindings.iter().find(|(p, _)| *p == port).map(|(_, e)| e);

        let clock = bound(self.clock_port()).and_then(|e| match e {
            Expr::Ident(id) => Some(*id),
            _ => None,
        });

        let inputs: Vec<Rc<DfNode>> = self
            .input_ports()
            .iter()
            .filter_map(|port| bound(port))
            .filter_map(|e| match e {
                Expr::Ident(id) => Some(DfNode::terminal(*id)),
                _ => None,
            })
            .collect();
        if inputs.is_empty() {
            return Vec::new();
        }
        let tree = if inputs.len() == 1 { Rc::clone(&inputs[0]) } else { Rc::new(DfNode::Concat(inputs)) };

        self.output_ports()
            .iter()
            .filter_map(|port| bound(port))
            .filter_map(|e| match e {
                Expr::Ident(dst) => Some(*dst),
                _ => None,
            })
            .map(|dst| Binding {
                dst,
                msb: None,
                lsb: None,
                ptr: None,
                tree: Rc::clone(&tree),
                assigntype: AssignType::Model(Id::new(self.target_module())),
                clock,
                senslist: clock.into_iter().collect(),
                path: PathCond::new(),
            })
            .collect()
    }
}

lazy_static::lazy_static! {
    static ref REGISTRY: Vec<Box<dyn MemoryModel>> = vec![
        Box::new(altsyncram::AltsyncramModel),
        Box::new(scfifo::ScfifoModel::dcfifo()),
        Box::new(scfifo::ScfifoModel::scfifo()),
    ];
}

/// Looks up the model registered for a black-box module name, if any.
pub fn lookup(module: Id) -> Option<&'static dyn MemoryModel> {
    REGISTRY.iter().find(|m| module == m.target_module()).map(|m| m.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn altsyncram_is_registered() {
        assert!(lookup(Id::from("altsyncram")).is_some());
    }

    #[test]
    fn unknown_module_has_no_model() {
        assert!(lookup(Id::from("not_a_memory")).is_none());
    }

    #[test]
    fn altsyncram_bind_produces_a_memory_edge_per_output_port() {
        let model = lookup(Id::from("altsyncram")).unwrap();
        let instance = Instance {
            name: Id::from("top.ram0"),
            params: vec![],
            port_bindings: vec![
                (Id::from("clock0"), Expr::Ident(Id::from("top.clk"))),
                (Id::from("data_a"), Expr::Ident(Id::from("top.din"))),
                (Id::from("q_a"), Expr::Ident(Id::from("top.dout"))),
            ],
        };
        let bindings = model.bind(&instance);
        assert_eq!(bindings.len(), 1);
        let b = &bindings[0];
        assert_eq!(b.dst, Id::from("top.dout"));
        assert_eq!(b.clock, Some(Id::from("top.clk")));
        assert!(matches!(&b.assigntype, AssignType::Model(name) if *name == Id::from("altsyncram")));
        assert_eq!(b.tree.root_term(), Some(Id::from("top.din")));
    }

    #[test]
    fn bind_with_no_bound_inputs_produces_no_edges() {
        let model = lookup(Id::from("altsyncram")).unwrap();
        let instance = Instance {
            name: Id::from("top.ram0"),
            params: vec![],
            port_bindings: vec![(Id::from("q_a"), Expr::Ident(Id::from("top.dout")))],
        };
        assert!(model.bind(&instance).is_empty());
    }
}
