//! The per-run context: the elaborated top module, its term table, and the
//! directives controlling instrumentation (spec.md §6 external interfaces).
//! Grounded on the teacher's `Context`/`BackendConf` split: configuration
//! that's fixed for the whole run versus state that's built up while the
//! passes execute.
use crate::ast::ModuleDef;
use crate::term::Term;
use crate::term_table::TermTable;
use fg_utils::{Error, FgResult, Id, OutputFile};
use std::collections::HashMap;

/// The terminals named on the command line (spec.md §6): which signals the
/// liveness checker treats as sources, sinks, and the reset/valid qualifier.
#[derive(Debug, Clone, Default)]
pub struct Directives {
    pub top: Option<Id>,
    pub sources: Vec<Id>,
    pub sinks: Vec<Id>,
    pub valid_signal: Option<Id>,
    pub reset_signal: Option<Id>,
    /// Names excluded from instrumentation even if otherwise reachable
    /// (spec.md §6: `--filtered-list`).
    pub filtered: Vec<Id>,
}

/// Run-wide, read-mostly configuration (grounded on the teacher's
/// `BackendConf`).
#[derive(Debug, Clone)]
pub struct Config {
    pub directives: Directives,
    pub output: OutputFile,
    /// Write the `.displayinfo.txt`/`.widthinfo.txt` side files alongside
    /// the instrumented source (spec.md §6).
    pub emit_side_files: bool,
    /// Free-form `pass:option` flags, parsed per pass by
    /// `ConstructVisitor::get_opts`.
    pub extra_opts: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directives: Directives::default(),
            output: OutputFile::Stdout,
            emit_side_files: true,
            extra_opts: Vec::new(),
        }
    }
}

/// Everything one compilation run needs: the elaborated module, its term
/// table keyed by name, the per-bit DFF/comb classification table (spec.md
/// §4.B), and the directives/config steering the core passes.
pub struct Context {
    pub module: ModuleDef,
    pub terms: HashMap<Id, Term>,
    pub config: Config,
    pub term_table: TermTable,
}

impl Context {
    pub fn new(module: ModuleDef, config: Config) -> Self {
        Self {
            module,
            terms: HashMap::new(),
            config,
            term_table: TermTable::new(),
        }
    }

    pub fn term(&self, name: Id) -> FgResult<&Term> {
        self.terms.get(&name).ok_or_else(|| Error::unresolved_term(name))
    }

    pub fn term_mut(&mut self, name: Id) -> FgResult<&mut Term> {
        self.terms.get_mut(&name).ok_or_else(|| Error::unresolved_term(name))
    }

    pub fn insert_term(&mut self, term: Term) {
        self.terms.insert(term.name, term);
    }

    pub fn resolve(&self, directives: &[Id]) -> FgResult<Vec<Id>> {
        directives
            .iter()
            .map(|name| self.term(*name).map(|t| t.name))
            .collect()
    }
}
