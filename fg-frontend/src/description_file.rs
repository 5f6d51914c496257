//! The `-F`/`--filtered-list` description-file format from spec.md §6: a
//! flat, one-path-per-line list of elaborated-design XML files to merge into
//! a single [`crate::xml_importer::import`] call, plus an optional filter
//! list of terminal names to exclude from instrumentation regardless of
//! reachability. Grounded on `flowguard.py`'s `-F` driver flag in
//! `original_source/flowguard.py`, reshaped into the line-oriented file list
//! the teacher's own `Workspace` used for `.futil` imports.
use fg_utils::{Error, FgResult};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct DescriptionFile {
    pub sources: Vec<PathBuf>,
}

impl DescriptionFile {
    /// Reads a description file: one source path per line, blank lines and
    /// lines starting with `#` ignored. Relative paths are resolved against
    /// the description file's own parent directory, matching the original
    /// driver's behavior of resolving `-F` entries relative to the list file
    /// rather than the current working directory.
    pub fn read(path: impl AsRef<Path>) -> FgResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::invalid_file(format!("{}: {e}", path.display())))?;
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let mut sources = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let p = PathBuf::from(line);
            sources.push(if p.is_absolute() { p } else { parent.join(p) });
        }
        Ok(Self { sources })
    }

    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self { sources: paths.into_iter().collect() }
    }
}

/// Reads the `--filtered-list` file: one fully-qualified signal name per
/// line, excluded from instrumentation regardless of reachability
/// (spec.md §6).
pub fn read_filter_list(path: impl AsRef<Path>) -> FgResult<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::invalid_file(format!("{}: {e}", path.display())))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn skips_blank_and_comment_lines() {
        let mut f = tempfile_with("a.xml\n# comment\n\nb.xml\n");
        let desc = DescriptionFile::read(f.path()).unwrap();
        assert_eq!(desc.sources.len(), 2);
        f.flush().unwrap();
    }

    fn tempfile_with(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }
}
