//! Instrumentation helpers (spec.md §4.J): name escaping, the cycle counter,
//! and the SignalTap/ILA wrapper. Each is ported in spirit from a
//! standalone script in the original tool rather than a pass proper, so none
//! of these are [`crate::traversal::Visitor`]s.
pub mod cycle_counter;
pub mod escape;
pub mod ila;
