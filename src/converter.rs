use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::exporter::{Exporter, HtmlExporter};
use crate::notebook;
use crate::paths::{self, Input};
use crate::resources;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// A written HTML file and the markup it contains
#[derive(Debug)]
pub struct Converted {
    pub output_path: PathBuf,
    pub html: String,
}

/// Tallies for one run over all command-line paths
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub converted: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Convert every path given on the command line. Failures are logged per
/// notebook and the remaining inputs are still processed.
pub fn run(cli: &Cli) -> RunSummary {
    let exporter = HtmlExporter;
    let mut summary = RunSummary::default();

    for path in &cli.paths {
        let input = match paths::resolve(path) {
            Ok(input) => input,
            Err(e) => {
                warn!("{e}");
                summary.skipped += 1;
                continue;
            }
        };
        debug!(
            "Writing output for {} to {}",
            path.display(),
            input.output_dir().display()
        );

        match input {
            Input::File { path, output_dir } => {
                let result = convert_with_resources(&path, &output_dir, None, &exporter);
                record(&mut summary, &path, result);
            }
            Input::Directory { path, output_dir } => {
                let notebooks = match paths::list_notebooks(&path) {
                    Ok(notebooks) => notebooks,
                    Err(e) => {
                        error!("{:#}", anyhow::Error::from(e));
                        summary.failed += 1;
                        continue;
                    }
                };
                if notebooks.is_empty() {
                    info!("No notebooks found in {}", path.display());
                }
                for notebook in notebooks {
                    let result = convert_with_resources(
                        &notebook,
                        &output_dir,
                        Some(path.as_path()),
                        &exporter,
                    );
                    record(&mut summary, &notebook, result);
                }
            }
        }
    }

    info!(
        "Done: {} converted, {} failed, {} skipped",
        summary.converted, summary.failed, summary.skipped
    );
    summary
}

fn record(summary: &mut RunSummary, input: &Path, result: Result<Converted>) {
    match result {
        Ok(_) => summary.converted += 1,
        Err(e) => {
            error!("{:#}", anyhow::Error::from(e));
            debug!("Conversion of {} abandoned", input.display());
            summary.failed += 1;
        }
    }
}

/// Convert one notebook, then copy the local files its HTML links to.
/// Resources land next to the written HTML, mirroring the notebook's directory.
pub fn convert_with_resources(
    input: &Path,
    output_dir: &Path,
    root: Option<&Path>,
    exporter: &dyn Exporter,
) -> Result<Converted> {
    let converted = convert(input, output_dir, root, exporter)?;

    let source_dir = match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let resource_dir = converted.output_path.parent().unwrap_or(output_dir);
    let copied = resources::copy_resources(&converted.html, resource_dir, source_dir);
    debug!(
        "Resources for {}: {} copied, {} missing, {} failed, {} skipped",
        input.display(),
        copied.copied,
        copied.missing,
        copied.failed,
        copied.skipped
    );

    Ok(converted)
}

/// Render `input` to HTML and write it under `output_dir`.
///
/// The file is named after the input with an `.html` extension. With a
/// `root`, the input's path relative to that root is kept instead of just
/// its file name.
pub fn convert(
    input: &Path,
    output_dir: &Path,
    root: Option<&Path>,
    exporter: &dyn Exporter,
) -> Result<Converted> {
    let notebook = notebook::read_notebook(input)?;
    debug!(
        "Parsed {} (nbformat {}.{}, {} cells)",
        input.display(),
        notebook.nbformat,
        notebook.nbformat_minor,
        notebook.cells.len()
    );

    let title = notebook
        .metadata
        .title
        .clone()
        .unwrap_or_else(|| file_stem(input));
    let html = exporter
        .export(&notebook, &title)
        .map_err(|source| Error::Export {
            path: input.to_path_buf(),
            source,
        })?;

    let output_path = output_dir.join(output_relative_path(input, root)?);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&output_path, &html).map_err(|source| Error::Write {
        path: output_path.clone(),
        source,
    })?;

    info!(
        "Converted notebook to HTML: {} -> {}",
        input.display(),
        output_path.display()
    );

    Ok(Converted { output_path, html })
}

fn output_relative_path(input: &Path, root: Option<&Path>) -> Result<PathBuf> {
    let relative = match root.and_then(|r| input.strip_prefix(r).ok()) {
        Some(rel) => rel.to_path_buf(),
        None => PathBuf::from(input.file_name().ok_or_else(|| Error::InvalidPath {
            path: input.to_path_buf(),
        })?),
    };
    Ok(relative.with_extension("html"))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Notebook".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::ExportError;
    use crate::notebook::Notebook;

    const NOTEBOOK: &str = r#"{
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {},
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": "![plot](fig.png)"}
        ]
    }"#;

    struct FailingExporter;

    impl Exporter for FailingExporter {
        fn export(&self, _: &Notebook, _: &str) -> std::result::Result<String, ExportError> {
            Err(ExportError::InvalidMimeData {
                mime: "text/html".to_string(),
            })
        }
    }

    #[test]
    fn writes_html_named_after_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.ipynb");
        fs::write(&input, NOTEBOOK).unwrap();
        let out = dir.path().join("html");

        let converted = convert(&input, &out, None, &HtmlExporter).unwrap();

        assert_eq!(converted.output_path, out.join("report.html"));
        let written = fs::read_to_string(&converted.output_path).unwrap();
        assert_eq!(written, converted.html);
        assert!(written.contains("<title>report</title>"));
    }

    #[test]
    fn keeps_path_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("chapter1");
        fs::create_dir_all(&sub).unwrap();
        let input = sub.join("intro.ipynb");
        fs::write(&input, NOTEBOOK).unwrap();
        let out = dir.path().join("html");

        let converted = convert(&input, &out, Some(dir.path()), &HtmlExporter).unwrap();
        assert_eq!(converted.output_path, out.join("chapter1").join("intro.html"));
        assert!(converted.output_path.is_file());
    }

    #[test]
    fn overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("nb.ipynb");
        fs::write(&input, NOTEBOOK).unwrap();
        let out = dir.path().join("html");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("nb.html"), "stale content that is much longer than nothing").unwrap();

        let converted = convert(&input, &out, None, &HtmlExporter).unwrap();
        let written = fs::read_to_string(&converted.output_path).unwrap();
        assert!(!written.contains("stale content"));
        assert_eq!(written, converted.html);
    }

    #[test]
    fn export_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("nb.ipynb");
        fs::write(&input, NOTEBOOK).unwrap();
        let out = dir.path().join("html");

        let err = convert(&input, &out, None, &FailingExporter).unwrap_err();
        assert!(matches!(err, Error::Export { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn copies_resources_next_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.ipynb");
        fs::write(&input, NOTEBOOK).unwrap();
        fs::write(dir.path().join("fig.png"), b"png").unwrap();
        let out = dir.path().join("html");

        convert_with_resources(&input, &out, None, &HtmlExporter).unwrap();

        assert!(out.join("a.html").is_file());
        assert_eq!(fs::read(out.join("fig.png")).unwrap(), b"png");
    }

    #[test]
    fn run_continues_after_bad_notebook() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.ipynb"), NOTEBOOK).unwrap();
        fs::write(dir.path().join("bad.ipynb"), "not json").unwrap();
        fs::write(dir.path().join("readme.txt"), "text").unwrap();

        let cli = Cli {
            paths: vec![dir.path().to_path_buf(), dir.path().join("missing.ipynb")],
            verbose: 0,
            quiet: false,
        };
        let summary = run(&cli);

        assert_eq!(
            summary,
            RunSummary {
                converted: 1,
                failed: 1,
                skipped: 1,
            }
        );
        assert!(dir.path().join("html/good.html").is_file());
        assert!(!dir.path().join("html/bad.html").exists());
        assert!(!dir.path().join("html/readme.html").exists());
    }
}
