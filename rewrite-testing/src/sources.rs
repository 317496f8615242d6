//! Running recipes over files on disk.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ParseError, SourceError};
use crate::parse::JavaParser;
use crate::recipe::{parse_sources, RecipeRun, RecipeRunner, RunConfig};

/// Outcome of [`run_files`].
#[derive(Debug)]
pub struct FileRun {
    pub run: RecipeRun,
    /// Files that could not be parsed; they take no part in the run.
    pub parse_errors: Vec<ParseError>,
}

fn is_java(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("java")
}

fn is_pattern(path: &str) -> bool {
    path.contains('*') || path.contains('?') || path.contains('[')
}

/// Expand files, directories and glob patterns into the `.java` files they
/// name, sorted and without the excluded ones.
pub fn collect_java_files(paths: &[PathBuf], exclusions: &[glob::Pattern]) -> Result<Vec<PathBuf>, SourceError> {
    let mut files = Vec::new();

    for path in paths {
        let path_str = path.to_string_lossy();
        if is_pattern(&path_str) {
            let entries = glob::glob(&path_str).map_err(|e| SourceError::Pattern {
                pattern: path_str.to_string(),
                reason: e.to_string(),
            })?;
            for entry in entries {
                match entry {
                    Ok(file) if file.is_file() && is_java(&file) => files.push(file),
                    Ok(_) => {}
                    Err(e) => warn!("skipping unreadable glob entry: {e}"),
                }
            }
        } else if path.is_file() {
            if is_java(path) {
                files.push(path.clone());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path) {
                let entry = entry?;
                if entry.file_type().is_file() && is_java(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            warn!(path = %path.display(), "no such file or directory");
        }
    }

    files.retain(|file| !RunConfig::is_excluded(exclusions, file));
    files.sort();
    files.dedup();
    Ok(files)
}

/// Parse `paths` and run the configured recipes over them to a fixed point.
/// Nothing is written; see [`write_changes`].
pub fn run_files(config: &RunConfig, paths: &[PathBuf]) -> Result<FileRun, SourceError> {
    let ctx = config.context();
    let registry = config.registry()?;
    let recipes = config
        .recipes
        .iter()
        .map(|id| registry.build(id, &ctx))
        .collect::<Result<Vec<_>, _>>()?;

    let files = collect_java_files(paths, &config.exclusions()?)?;
    info!(files = files.len(), recipes = recipes.len(), "starting run");

    let sources = files
        .into_iter()
        .map(|path| match std::fs::read_to_string(&path) {
            Ok(text) => Ok((path, text)),
            Err(source) => Err(SourceError::Read { path, source }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let parser = JavaParser::builder()
        .classpath_from_resources(&ctx, config.classpath.as_slice())
        .build()?;
    let mut units = Vec::with_capacity(sources.len());
    let mut parse_errors = Vec::new();
    for parsed in parse_sources(&parser, &sources) {
        match parsed {
            Ok(unit) => units.push(unit),
            Err(err) => {
                warn!("{err}");
                parse_errors.push(err);
            }
        }
    }

    let run = RecipeRunner::new(recipes).max_cycles(config.max_cycles).run(units, &ctx);
    debug!(cycles = run.cycles, changed = run.changed().count(), "run finished");
    Ok(FileRun { run, parse_errors })
}

/// Write every changed unit back to its source path. Returns the number of
/// files written.
pub fn write_changes(run: &RecipeRun) -> Result<usize, SourceError> {
    let mut written = 0;
    for result in run.changed() {
        let path = result.source_path();
        std::fs::write(path, result.after.print()).map_err(|source| SourceError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        written += 1;
    }
    Ok(written)
}
