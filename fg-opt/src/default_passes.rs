//! Defines the default passes available to [PassManager]. `flowguard` is the
//! only [`crate::traversal::Visitor`] in this compiler; the canonicalization
//! passes that run before it (spec.md §4.E) are plain functions instead, so
//! [`crate::pipeline::run`] calls them directly rather than through here.
use crate::passes::flowguard::FlowGuardCore;
use crate::traversal::Named;
use crate::{pass_manager::PassManager, register_alias};
use fg_utils::FgResult;

impl PassManager {
    pub fn default_passes() -> FgResult<Self> {
        let mut pm = PassManager::default();

        pm.register_pass::<FlowGuardCore>()?;

        register_alias!(pm, "all", [FlowGuardCore]);
        register_alias!(pm, "none", []);

        Ok(pm)
    }
}
