//! Entry point for `flowguardc`: reads an elaborated design, runs the
//! FlowGuard liveness instrumentation pipeline, and emits the instrumented
//! source plus its side files (spec.md §6).
mod cmdline;

use fg_backend::{write_side_files, Emitter, VerilogEmitter};
use fg_frontend::{read_filter_list, DescriptionFile, Importer, TermTable, XmlImporter};
use fg_ir::{Config, Context, Directives};
use fg_utils::{Error, FgResult, Id};

fn main() {
    let opts: cmdline::Opts = argh::from_env();
    init_logger(opts.debug_logging);

    if let Err(e) = run(opts) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn init_logger(debug: bool) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if debug { "debug" } else { "warn" }),
    );
    builder.format_timestamp(None).init();
}

fn run(opts: cmdline::Opts) -> FgResult<()> {
    let sources = resolve_sources(&opts)?;
    let xml = std::fs::read_to_string(&sources[0])
        .map_err(|e| Error::invalid_file(format!("{}: {e}", sources[0].display())))?;
    if sources.len() > 1 {
        log::warn!(
            "{} input files given; only `{}' is imported, the rest are ignored (one top module per run)",
            sources.len(),
            sources[0].display()
        );
    }

    let mut term_table = TermTable::new();
    let (module, terms) = XmlImporter.import(&xml, &mut term_table)?;

    let filtered = match &opts.filter_list {
        Some(path) => read_filter_list(path)?.into_iter().map(Id::new).collect(),
        None => Vec::new(),
    };

    let directives = Directives {
        top: Some(Id::new(opts.top.clone())),
        sources: opts.source.iter().map(Id::new).collect(),
        sinks: opts.sink.iter().map(Id::new).collect(),
        valid_signal: opts.source_valid.as_ref().map(Id::new),
        reset_signal: opts.reset.as_ref().map(Id::new),
        filtered,
    };

    let config = Config {
        directives,
        output: opts.output.clone(),
        emit_side_files: !opts.no_side_files,
        extra_opts: opts.extra_opts.clone(),
    };

    let mut ctx = Context::new(module, config);
    ctx.term_table = term_table;
    for term in terms {
        ctx.insert_term(term);
    }

    if opts.passes.is_empty() && opts.skip_passes.is_empty() {
        fg_opt::pipeline::run(&mut ctx)?;
    } else {
        fg_opt::analysis::width::run(&mut ctx)?;
        let incl = if opts.passes.is_empty() { vec!["all".to_string()] } else { opts.passes.clone() };
        fg_opt::pass_manager::PassManager::default_passes()?
            .execute_plan(&mut ctx, &incl, &opts.skip_passes)?;
    }

    VerilogEmitter.run(&ctx, opts.output.clone())?;
    write_side_files(&ctx, &opts.output)
}

fn resolve_sources(opts: &cmdline::Opts) -> FgResult<Vec<std::path::PathBuf>> {
    let sources = if let Some(list) = &opts.file_list {
        DescriptionFile::read(list)?.sources
    } else {
        opts.files.clone()
    };
    if sources.is_empty() {
        return Err(Error::config("no input files given; pass a path or --file-list"));
    }
    Ok(sources)
}
