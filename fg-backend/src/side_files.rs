//! Side-file writers (spec.md §6): `<out>.displayinfo.txt` records one
//! `cond_name format-string` line per injected `$display` (the loss-check
//! call synth.rs wires onto each DFF chain slice), and `<out>.widthinfo.txt`
//! records one `name width` line per signal FlowGuard itself declared,
//! distinguished from the imported design's own terms by the `__` naming
//! convention every synthesized signal follows (`{term}__av`, `{term}__loss`,
//! `{term}__bb_valid`, `{valid}__cycle_count`, ...).
use fg_ir::{Context, Expr, ModuleItem, Stmt};
use fg_utils::{FgResult, OutputFile};
use std::io::Write as _;

/// Writes `<out>.displayinfo.txt` and `<out>.widthinfo.txt` next to `out`,
/// when `ctx.config.emit_side_files` is set.
pub fn write(ctx: &Context, out: &OutputFile) -> FgResult<()> {
    if !ctx.config.emit_side_files {
        return Ok(());
    }
    let base = match out {
        OutputFile::File { path, .. } => path.clone(),
        _ => return Ok(()),
    };

    write_display_info(ctx, &with_suffix(&base, "displayinfo.txt"))?;
    write_width_info(ctx, &with_suffix(&base, "widthinfo.txt"))?;
    Ok(())
}

fn with_suffix(base: &std::path::Path, suffix: &str) -> std::path::PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    std::path::PathBuf::from(name)
}

fn write_display_info(ctx: &Context, path: &std::path::Path) -> FgResult<()> {
    let mut entries = Vec::new();
    for item in &ctx.module.items {
        if let ModuleItem::Always(always) = item {
            collect_displays(&always.body, &mut entries);
        }
    }
    let mut file = std::fs::File::create(path)?;
    for (cond_name, format_string) in entries {
        writeln!(file, "{cond_name} {format_string}")?;
    }
    Ok(())
}

/// Walks an `if (cond) $display(fmt, ...)` shape, the only one the core
/// injects (synth.rs's loss check); other `$display` calls, if any design
/// ever carried one in through the importer, are silently skipped since
/// there is no guarding condition to report.
fn collect_displays(stmt: &Stmt, out: &mut Vec<(String, String)>) {
    match stmt {
        Stmt::If(s) => {
            if let Stmt::SystemTask { name, args } = s.then_branch.as_ref() {
                if name.as_ref() == "$display" {
                    if let (Expr::Ident(cond), Some(Expr::StrConst(fmt))) =
                        (&s.cond, args.first())
                    {
                        out.push((cond.to_string(), fmt.clone()));
                    }
                }
            }
            collect_displays(&s.then_branch, out);
            if let Some(e) = &s.else_branch {
                collect_displays(e, out);
            }
        }
        Stmt::Block(stmts) => stmts.iter().for_each(|s| collect_displays(s, out)),
        _ => {}
    }
}

fn write_width_info(ctx: &Context, path: &std::path::Path) -> FgResult<()> {
    let mut terms: Vec<_> = ctx.terms.values().filter(|t| t.name.as_ref().contains("__")).collect();
    terms.sort_by_key(|t| t.name);
    let mut file = std::fs::File::create(path)?;
    for term in terms {
        writeln!(file, "{} {}", term.name, term.width)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_ir::{Config, Directives, ModuleDef, Term, TermKind};

    #[test]
    fn skips_entirely_when_side_files_disabled() {
        let module = ModuleDef { name: fg_utils::Id::from("top"), params: vec![], ports: vec![], items: vec![] };
        let config = Config { directives: Directives::default(), output: OutputFile::Stdout, emit_side_files: false, extra_opts: vec![] };
        let ctx = Context::new(module, config);
        assert!(write(&ctx, &OutputFile::Stdout).is_ok());
    }

    #[test]
    fn width_info_filters_to_synthesized_names() {
        let module = ModuleDef { name: fg_utils::Id::from("top"), params: vec![], ports: vec![], items: vec![] };
        let mut ctx = Context::new(module, Config::default());
        ctx.insert_term(Term::new(fg_utils::Id::from("top.r"), 8, TermKind::Reg));
        ctx.insert_term(Term::new(fg_utils::Id::from("top.r__av"), 1, TermKind::Wire));

        let dir = std::env::temp_dir().join("flowguard_widthinfo_test.v");
        write_width_info(&ctx, &with_suffix(&dir, "widthinfo.txt")).unwrap();
        let contents = std::fs::read_to_string(with_suffix(&dir, "widthinfo.txt")).unwrap();
        assert!(contents.contains("top.r__av 1"));
        assert!(!contents.contains("top.r "));
    }
}
