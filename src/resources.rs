use crate::error::Error;
use percent_encoding::percent_decode_str;
use scraper::{Html, Selector};
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Elements that load a local file, with the attribute naming it
const RESOURCE_ATTRS: &[(&str, &str)] = &[
    ("img[src]", "src"),
    ("script[src]", "src"),
    ("link[href]", "href"),
];

const REMOTE_PREFIXES: &[&str] = &["http:", "https:", "ftp:", "//", "data:"];

/// Outcome counts of one `copy_resources` call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopySummary {
    pub copied: usize,
    pub missing: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// What a reference points at, as far as copying is concerned
#[derive(Debug, PartialEq, Eq)]
enum Target {
    /// Relative path inside the notebook directory
    Local(PathBuf),
    /// Network or inline data reference
    Remote,
    /// Nothing left once the query, fragment and `.` segments are removed
    Empty,
    /// Absolute, or climbs above the notebook directory
    Outside,
}

/// Attribute values of every resource-bearing element, in document order per kind
pub fn resource_references(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut refs = Vec::new();

    for (selector, attr) in RESOURCE_ATTRS {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                refs.push(value.to_string());
            }
        }
    }

    refs
}

fn is_remote(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    REMOTE_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn classify(reference: &str) -> Target {
    let reference = reference.trim();
    if is_remote(reference) {
        return Target::Remote;
    }

    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    let decoded = percent_decode_str(&reference[..end]).decode_utf8_lossy();

    let mut relative = PathBuf::new();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return Target::Outside;
                }
            }
            Component::RootDir | Component::Prefix(_) => return Target::Outside,
        }
    }

    if relative.as_os_str().is_empty() {
        Target::Empty
    } else {
        Target::Local(relative)
    }
}

/// Copy every local file referenced by `html` from `source_dir` into `output_dir`,
/// keeping its relative location. Missing or uncopyable files are reported and
/// skipped; they never fail the document.
pub fn copy_resources(html: &str, output_dir: &Path, source_dir: &Path) -> CopySummary {
    let mut summary = CopySummary::default();

    for reference in resource_references(html) {
        let relative = match classify(&reference) {
            Target::Local(relative) => relative,
            Target::Remote => {
                debug!("Leaving remote reference: {}", truncate(&reference));
                summary.skipped += 1;
                continue;
            }
            Target::Empty => {
                debug!("Ignoring reference without a file path: {reference:?}");
                summary.skipped += 1;
                continue;
            }
            Target::Outside => {
                warn!("Skipping resource outside the notebook directory: {reference}");
                summary.skipped += 1;
                continue;
            }
        };

        let source = source_dir.join(&relative);
        let dest = output_dir.join(&relative);

        if !source.is_file() {
            warn!("{}", Error::MissingResource { path: source });
            summary.missing += 1;
            continue;
        }

        match copy_preserving_metadata(&source, &dest) {
            Ok(()) => {
                info!("Copied resource: {} -> {}", source.display(), dest.display());
                summary.copied += 1;
            }
            Err(e) => {
                let err = Error::CopyResource {
                    source_path: source,
                    dest,
                    source: e,
                };
                warn!("{:#}", anyhow::Error::from(err));
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Copy contents, then times through the open handle, then permissions last,
/// so read-only sources do not block the timestamp update.
fn copy_preserving_metadata(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let metadata = fs::metadata(source)?;

    // A read-only copy from an earlier run cannot be truncated in place
    match fs::remove_file(dest) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut reader = File::open(source)?;
    let mut writer = File::create(dest)?;
    io::copy(&mut reader, &mut writer)?;

    let mut times = FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Err(e) = writer.set_times(times) {
        debug!("Could not preserve times on {}: {e}", dest.display());
    }
    drop(writer);

    if let Err(e) = fs::set_permissions(dest, metadata.permissions()) {
        debug!("Could not preserve permissions on {}: {e}", dest.display());
    }

    Ok(())
}

fn truncate(reference: &str) -> &str {
    match reference.char_indices().nth(80) {
        Some((idx, _)) => &reference[..idx],
        None => reference,
    }
}
