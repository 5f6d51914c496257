//! # fg-opt
//!
//! The pass framework and analyses that turn an imported Verilog/SystemVerilog
//! design into its FlowGuard-instrumented form: a [`traversal::Visitor`] walk
//! over the AST, a small set of canonicalization passes (array splitting,
//! part-select promotion, `logic`-to-`reg` rewriting) that run ahead of the
//! [`passes::flowguard`] core, and the black-box memory models ([`models`])
//! that stand in for storage the data-flow graph can't see through.
//!
//! [`pipeline::run`] wires these together in the order a design actually
//! needs them: width canonicalization first (it has no `Visitor` impl, since
//! it needs a pass over every declaration before it can check a single
//! binding), then the other canonicalization passes, then the registered
//! [`pass_manager::PassManager`] plan that runs `flowguard` itself.
pub mod analysis;
pub mod default_passes;
pub mod helpers;
pub mod models;
pub mod pass_manager;
pub mod passes;
pub mod pipeline;
pub mod traversal;
