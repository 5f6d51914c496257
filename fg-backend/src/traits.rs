//! Interface for a FlowGuard backend. Only one implementation ships
//! ([`crate::verilog::VerilogEmitter`]); the trait exists so the CLI driver
//! can dispatch on it the way `calyxc` dispatches on `calyx_backend::Backend`,
//! without hard-wiring the binary to a single emitter type.
use fg_ir::Context;
use fg_utils::{FgResult, OutputFile};

/// A backend that turns an instrumented [`Context`] into its output form.
pub trait Emitter {
    /// The name used to select this backend on the command line.
    fn name(&self) -> &'static str;

    /// Checks that `ctx` is in a state this backend can emit (e.g. every
    /// term's width has been resolved). Returns `Err` rather than panicking
    /// so the CLI can report a clean error.
    fn validate(ctx: &Context) -> FgResult<()>
    where
        Self: Sized;

    /// Writes the emitted program to `write`.
    fn emit(ctx: &Context, write: &mut OutputFile) -> FgResult<()>
    where
        Self: Sized;

    /// Validates, then emits.
    fn run(&self, ctx: &Context, mut file: OutputFile) -> FgResult<()>
    where
        Self: Sized,
    {
        Self::validate(ctx)?;
        Self::emit(ctx, &mut file)
    }
}
