//! Registers and runs the sequence of passes that turn an imported elaborated
//! module into an instrumented one. Ported near-verbatim from
//! `calyx-opt/src/pass_manager.rs`: same registration, aliasing, and
//! plan-execution model, generalized from a library of `ir::Component`s to
//! the single `fg_ir::Context` this compiler operates on.
use crate::traversal;
use fg_ir::Context;
use fg_utils::{Error, FgResult};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::time::Instant;

pub type PassClosure = Box<dyn Fn(&mut Context) -> FgResult<()>>;

#[derive(Default)]
pub struct PassManager {
    passes: HashMap<String, PassClosure>,
    aliases: HashMap<String, Vec<String>>,
    help: HashMap<String, String>,
}

impl PassManager {
    /// Registers a pass, erroring if another pass with the same name is
    /// already registered.
    pub fn register_pass<Pass>(&mut self) -> FgResult<()>
    where
        Pass: traversal::Visitor + traversal::ConstructVisitor + traversal::Named,
    {
        let name = Pass::name().to_string();
        if self.passes.contains_key(&name) {
            return Err(Error::misc(format!("Pass with name '{name}' is already registered.")));
        }
        let pass_closure: PassClosure = Box::new(|ctx| {
            Pass::do_pass_default(ctx)?;
            Ok(())
        });
        self.passes.insert(name.clone(), pass_closure);
        let mut help = format!("- {}: {}", name, Pass::description());
        for (opt, desc) in Pass::opts() {
            write!(&mut help, "\n  * {opt}: {desc}").unwrap();
        }
        self.help.insert(name, help);
        Ok(())
    }

    pub fn add_alias(&mut self, name: String, passes: Vec<String>) -> FgResult<()> {
        if self.aliases.contains_key(&name) {
            return Err(Error::misc(format!("Alias with name '{name}' already registered.")));
        }
        let all_passes = passes
            .into_iter()
            .flat_map(|pass| {
                if self.aliases.contains_key(&pass) {
                    self.aliases[&pass].clone()
                } else if self.passes.contains_key(&pass) {
                    vec![pass]
                } else {
                    panic!("No pass or alias named: {pass}")
                }
            })
            .collect();
        self.aliases.insert(name, all_passes);
        Ok(())
    }

    pub fn specific_help(&self, pass: &str) -> Option<String> {
        self.help.get(pass).cloned().or_else(|| {
            self.aliases.get(pass).map(|passes| {
                let pass_str = passes.iter().map(|p| format!("- {p}")).collect::<Vec<_>>().join("\n");
                format!("`{pass}' is an alias for pass pipeline:\n{pass_str}")
            })
        })
    }

    pub fn complete_help(&self) -> String {
        let mut ret = String::with_capacity(1000);
        let mut pass_names = self.passes.keys().collect::<Vec<_>>();
        pass_names.sort();
        ret.push_str("Passes:\n");
        pass_names.iter().for_each(|&pass| {
            writeln!(ret, "{}", self.help[pass]).unwrap();
        });
        let mut aliases = self.aliases.iter().collect::<Vec<_>>();
        aliases.sort_by(|kv1, kv2| kv1.0.cmp(kv2.0));
        ret.push_str("\nAliases:\n");
        aliases.iter().for_each(|(alias, passes)| {
            writeln!(ret, "- {}: {}", alias, passes.join(", ")).unwrap();
        });
        ret
    }

    fn resolve_alias(&self, maybe_alias: &str) -> Vec<String> {
        self.aliases.get(maybe_alias).cloned().unwrap_or_else(|| vec![maybe_alias.to_string()])
    }

    fn create_plan(&self, incls: &[String], excls: &[String]) -> FgResult<(Vec<String>, HashSet<String>)> {
        let passes = incls.iter().flat_map(|maybe_alias| self.resolve_alias(maybe_alias)).collect::<Vec<_>>();
        let excl_set = excls.iter().flat_map(|maybe_alias| self.resolve_alias(maybe_alias)).collect::<HashSet<_>>();
        passes.iter().chain(excl_set.iter()).try_for_each(|pass| {
            if !self.passes.contains_key(pass) {
                Err(Error::misc(format!("Unknown pass: {pass}. Run with --pass-help to view registered passes.")))
            } else {
                Ok(())
            }
        })?;
        Ok((passes, excl_set))
    }

    /// Executes passes strictly in registration order
    /// (spec.md §5: "single-threaded, deterministic, single-pass tree
    /// rewrites"), logging each pass's wall-clock time.
    pub fn execute_plan(&self, ctx: &mut Context, incl: &[String], excl: &[String]) -> FgResult<()> {
        let (passes, excl_set) = self.create_plan(incl, excl)?;
        for name in passes {
            let pass = &self.passes[&name];
            if excl_set.contains(&name) {
                log::info!("{name}: ignored");
                continue;
            }
            let start = Instant::now();
            pass(ctx)?;
            let elapsed = start.elapsed();
            if elapsed.as_secs() > 5 {
                log::warn!("{name}: {}ms (slow)", elapsed.as_millis());
            } else {
                log::info!("{name}: {}ms", elapsed.as_millis());
            }
        }
        Ok(())
    }
}

/// Registers an alias for a group of passes.
#[macro_export]
macro_rules! register_alias {
    (@unwrap_name $pass:ident) => {
        $pass::name().to_string()
    };
    (@unwrap_name $pass:literal) => {
        $pass.to_string()
    };
    ($manager:expr, $alias:literal, [ $($pass:tt),* $(,)? ]) => {
        $manager.add_alias($alias.to_string(), vec![
            $(register_alias!(@unwrap_name $pass)),*
        ])?;
    };
}
