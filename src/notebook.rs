//! Typed model of the nbformat v4 notebook document

use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Only this major version of the format is understood
pub const SUPPORTED_MAJOR: u32 = 4;

/// Mime type -> payload. Payloads are a string or a list of lines,
/// except JSON mime types which may hold arbitrary values.
pub type MimeBundle = BTreeMap<String, Value>;

#[derive(Debug, Clone, Deserialize)]
pub struct Notebook {
    pub nbformat: u32,
    pub nbformat_minor: u32,
    #[serde(default)]
    pub metadata: NotebookMetadata,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotebookMetadata {
    pub kernelspec: Option<KernelSpec>,
    pub language_info: Option<LanguageInfo>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KernelSpec {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageInfo {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Markdown {
        source: MultilineString,
        #[serde(default)]
        attachments: BTreeMap<String, MimeBundle>,
    },
    Code {
        source: MultilineString,
        #[serde(default)]
        execution_count: Option<u64>,
        #[serde(default)]
        outputs: Vec<Output>,
    },
    Raw {
        source: MultilineString,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    Stream {
        #[serde(default = "default_stream_name")]
        name: String,
        text: MultilineString,
    },
    DisplayData {
        #[serde(default)]
        data: MimeBundle,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
    ExecuteResult {
        #[serde(default)]
        execution_count: Option<u64>,
        #[serde(default)]
        data: MimeBundle,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

fn default_stream_name() -> String {
    "stdout".to_string()
}

/// Text stored either whole or split into lines
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MultilineString {
    Text(String),
    Lines(Vec<String>),
}

impl MultilineString {
    /// Lines already carry their own newlines, so they are joined as-is
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Lines(lines) => lines.concat(),
        }
    }
}

impl NotebookMetadata {
    /// Language used for code cell highlighting classes
    pub fn language(&self) -> Option<&str> {
        self.language_info
            .as_ref()
            .map(|li| li.name.as_str())
            .or_else(|| self.kernelspec.as_ref()?.language.as_deref())
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    nbformat: u32,
    #[serde(default)]
    nbformat_minor: u32,
}

/// Read and parse a notebook file
pub fn read_notebook(path: &Path) -> Result<Notebook> {
    let content = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_notebook(&content, path)
}

/// Parse notebook JSON. `path` is only used in error messages.
pub fn parse_notebook(content: &str, path: &Path) -> Result<Notebook> {
    let parse_err = |source| Error::Parse {
        path: path.to_path_buf(),
        source,
    };

    // Older formats have a different layout, so check before the full parse
    let probe: VersionProbe = serde_json::from_str(content).map_err(parse_err)?;
    if probe.nbformat != SUPPORTED_MAJOR {
        return Err(Error::UnsupportedVersion {
            path: path.to_path_buf(),
            major: probe.nbformat,
            minor: probe.nbformat_minor,
        });
    }

    serde_json::from_str(content).map_err(parse_err)
}
