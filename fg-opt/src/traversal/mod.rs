//! Helpers for traversing a module's statement tree.
mod action;
mod diagnostics;
mod visitor;

pub use action::{Action, VisResult};
pub use diagnostics::{DiagnosticContext, DiagnosticPass, DiagnosticResult};
pub use visitor::{ConstructVisitor, Named, Visitable, Visitor};
