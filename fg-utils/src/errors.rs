//! Errors generated by the instrumentation compiler.
use crate::Id;

/// Convenience wrapper to represent success or a meaningful compiler error.
pub type FgResult<T> = std::result::Result<T, Error>;

/// Errors generated anywhere in the compiler. Carries an optional textual
/// context (the fully-qualified term an error concerns) since the importer
/// reads a flattened elaborator dump rather than original source text, so we
/// have no line/column spans to report the way a text-based frontend would.
#[derive(Clone)]
pub struct Error {
    kind: Box<ErrorKind>,
    context: Option<String>,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, " (at {ctx})")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn with_context<S: ToString>(mut self, ctx: S) -> Self {
        self.context = Some(ctx.to_string());
        self
    }

    /// Whether this error kind is a structural-invariant violation (fatal,
    /// per spec.md §7: "structural invariants ... are fatal") as opposed to a
    /// graph-shape anomaly that a pass recovers from locally.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            &*self.kind,
            ErrorKind::ContradictoryPath(_) | ErrorKind::MissingBinding(_)
        )
    }

    pub fn unsupported_syntax<S: ToString>(node: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::UnsupportedSyntax(node.to_string())),
            context: None,
        }
    }
    pub fn width_mismatch<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::WidthMismatch(msg.to_string())),
            context: None,
        }
    }
    pub fn unresolved_term(name: Id) -> Self {
        Self {
            kind: Box::new(ErrorKind::UnresolvedTerm(name)),
            context: None,
        }
    }
    pub fn contradictory_path<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::ContradictoryPath(msg.to_string())),
            context: None,
        }
    }
    pub fn missing_binding<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::MissingBinding(msg.to_string())),
            context: None,
        }
    }
    pub fn inconsistent_classification(bit: u64, term: Id) -> Self {
        Self {
            kind: Box::new(ErrorKind::InconsistentClassification(bit, term)),
            context: None,
        }
    }
    pub fn config<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::ConfigError(msg.to_string())),
            context: None,
        }
    }
    pub fn name_collision<S: ToString>(name: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::NameCollision(name.to_string())),
            context: None,
        }
    }
    pub fn misc<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::Misc(msg.to_string())),
            context: None,
        }
    }
    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::InvalidFile(msg.to_string())),
            context: None,
        }
    }
    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::WriteError(msg.to_string())),
            context: None,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// The error kinds named in spec.md §7. `NameCollision`, `InvalidFile`,
/// `WriteError`, and `Misc` are ambient additions for CLI/IO plumbing that
/// every complete compiler needs but a data-flow spec wouldn't enumerate.
#[derive(Clone)]
enum ErrorKind {
    /// An AST variant the core doesn't model.
    UnsupportedSyntax(String),
    /// Equal-width contract violated.
    WidthMismatch(String),
    /// A referenced name is not in the term table.
    UnresolvedTerm(Id),
    /// Recovered locally: the subtree's contribution is dropped.
    ContradictoryPath(String),
    /// Recovered locally: the edge is discarded.
    MissingBinding(String),
    /// A bit's dff classification flipped within one import.
    InconsistentClassification(u64, Id),
    /// E.g. sink not reachable from source; emits unchanged output with a warning.
    ConfigError(String),
    /// Two escaped names collided in the same module (see Design Notes).
    NameCollision(String),
    /// Miscellaneous error message.
    Misc(String),
    /// The input file is invalid (does not exist).
    InvalidFile(String),
    /// Failed to write the output.
    WriteError(String),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use ErrorKind::*;
        match self {
            UnsupportedSyntax(node) => {
                write!(f, "[UnsupportedSyntax] unhandled AST node: {node}")
            }
            WidthMismatch(msg) => write!(f, "[WidthMismatch] {msg}"),
            UnresolvedTerm(name) => {
                write!(f, "[UnresolvedTerm] undefined name: {name}")
            }
            ContradictoryPath(msg) => write!(f, "[ContradictoryPath] {msg}"),
            MissingBinding(msg) => write!(f, "[MissingBinding] {msg}"),
            InconsistentClassification(bit, term) => write!(
                f,
                "[InconsistentClassification] bit {bit} of `{term}' changed dff classification during import"
            ),
            ConfigError(msg) => write!(f, "[ConfigError] {msg}"),
            NameCollision(name) => write!(
                f,
                "[NameCollision] shadow name `{name}' already chosen in this module"
            ),
            Misc(msg) | InvalidFile(msg) | WriteError(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::write_error(format!("IO error: {e}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::write_error(format!("serde_json error: {e}"))
    }
}
