//! The intermediate representation of the instrumentation compiler: the
//! elaborated-design AST (spec.md §4.A), the term table and target-slice
//! identity (§3), the data-flow binding graph (§4.F), path conditions and
//! synthesized Boolean signal definitions (§4.H), and the per-run context.
pub mod ast;
pub mod cond;
pub mod context;
pub mod dataflow;
pub mod term;
pub mod term_table;

pub use ast::{
    Always, BinaryOp, CompareOp, Decl, Edge, Expr, IfStmt, Initial, Instance, InstanceList,
    LogicalOp, ModuleDef, ModuleItem, PortDecl, PortDirection, SensItem, ShiftOp, Stmt,
    Substitution, UnaryOp,
};
pub use cond::{Cond, PathCond, PathLink};
pub use context::{Config, Context, Directives};
pub use dataflow::{DfNode, DfOp, ForwardEdge, ForwardMap, ReverseEdge, ReverseMap};
pub use fg_utils::{GetName, Id};
pub use term::{AssignType, Binding, PtrIndex, TargetEntry, Term, TermKind};
pub use term_table::TermTable;
