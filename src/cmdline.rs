//! Command-line surface for `flowguardc` (spec.md §6 external interfaces).
//! Structured the way `cider`'s `Opts`/`Command` split separates run
//! configuration from a verb, except FlowGuard has exactly one verb
//! (instrument-and-emit) so everything lives on one flat `Opts`.
use argh::FromArgs;
use fg_utils::OutputFile;
use std::path::PathBuf;

#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help"))]
/// instrument an elaborated Verilog/SystemVerilog design with data-flow
/// liveness checks.
pub struct Opts {
    /// elaborated-design XML file(s) to import (mutually exclusive with
    /// --file-list; only the first is imported, see DESIGN.md)
    #[argh(positional)]
    pub files: Vec<PathBuf>,

    /// a description file listing input files one per line
    #[argh(option, short = 'F', long = "file-list")]
    pub file_list: Option<PathBuf>,

    /// the top module name
    #[argh(option, short = 't', long = "top")]
    pub top: String,

    /// fully-qualified source terminal to track liveness from
    #[argh(option, long = "source")]
    pub source: Vec<String>,

    /// fully-qualified source-valid terminal gating the source
    #[argh(option, long = "source-valid")]
    pub source_valid: Option<String>,

    /// fully-qualified sink terminal liveness must reach
    #[argh(option, long = "sink")]
    pub sink: Vec<String>,

    /// fully-qualified synchronous reset terminal
    #[argh(option, long = "reset")]
    pub reset: Option<String>,

    /// file of fully-qualified terminal names excluded from instrumentation
    #[argh(option, short = 'f', long = "filter-list")]
    pub filter_list: Option<PathBuf>,

    /// output file, default is stdout
    #[argh(option, short = 'o', long = "output", default = "OutputFile::Stdout")]
    pub output: OutputFile,

    /// don't write the `.displayinfo.txt`/`.widthinfo.txt` side files
    #[argh(switch, long = "no-side-files")]
    pub no_side_files: bool,

    /// only run these passes (see fg-opt's pass manager); default is all
    #[argh(option, long = "pass")]
    pub passes: Vec<String>,

    /// skip these passes
    #[argh(option, long = "skip-pass")]
    pub skip_passes: Vec<String>,

    /// `pass:option=value` flags forwarded to individual passes verbatim
    #[argh(option, long = "opt")]
    pub extra_opts: Vec<String>,

    /// enable debug-level logging
    #[argh(switch, long = "debug-logging")]
    pub debug_logging: bool,
}
