//! Shared utilities for the FlowGuard instrumentation compiler.
mod errors;
mod id;
mod namegen;
mod out_file;

mod math;

pub use errors::{Error, FgResult};
pub use id::{GSym, GetName, Id};
pub use math::bits_needed_for;
pub use namegen::NameGenerator;
pub use out_file::OutputFile;
