use crate::notebook::{Cell, MimeBundle, MultilineString, Notebook, Output};
use html_escape::{encode_double_quoted_attribute, encode_text};
use pulldown_cmark::{html, Options, Parser};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write;
use thiserror::Error;

const MATHJAX_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.7/MathJax.js?config=TeX-AMS_CHTML-full";

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 0; padding: 2em; line-height: 1.5; }
main { max-width: 1000px; margin: 0 auto; }
.cell { display: flex; margin: 0.5em 0; }
.prompt { flex: 0 0 6em; font-family: monospace; font-size: 0.9em; color: #303f9f; text-align: right; padding: 0.4em 0.5em 0 0; }
.prompt.output-prompt { color: #d84315; }
.cell-body { flex: 1; min-width: 0; }
.input pre { background: #f7f7f7; border: 1px solid #cfcfcf; border-radius: 2px; padding: 0.4em; overflow-x: auto; margin: 0; }
.output pre { padding: 0.4em; overflow-x: auto; margin: 0; }
.output-stderr pre { background: #fdd; }
.output-error pre { background: #fdd; color: #a00; }
.output img { max-width: 100%; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ddd; padding: 0.3em 0.6em; }
"#;

/// Representations tried in order when an output carries several
const MIME_PRIORITY: &[&str] = &[
    "text/html",
    "image/svg+xml",
    "image/png",
    "image/jpeg",
    "image/gif",
    "text/markdown",
    "text/latex",
    "application/javascript",
    "text/plain",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("output payload for {mime} is not text")]
    InvalidMimeData { mime: String },
}

/// Renders a parsed notebook into a complete HTML document
pub trait Exporter {
    fn export(&self, notebook: &Notebook, title: &str) -> Result<String, ExportError>;
}

/// Standalone HTML with embedded styles and MathJax
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExporter;

impl Exporter for HtmlExporter {
    fn export(&self, notebook: &Notebook, title: &str) -> Result<String, ExportError> {
        let language = notebook.metadata.language().unwrap_or("text");
        let mut body = String::new();

        for cell in &notebook.cells {
            match cell {
                Cell::Markdown {
                    source,
                    attachments,
                } => render_markdown_cell(&mut body, source, attachments)?,
                Cell::Code {
                    source,
                    execution_count,
                    outputs,
                } => render_code_cell(&mut body, source, *execution_count, outputs, language)?,
                Cell::Raw { source, metadata } => render_raw_cell(&mut body, source, metadata),
            }
        }

        let mut doc = String::with_capacity(body.len() + STYLE.len() + 512);
        doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        doc.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        let _ = writeln!(doc, "<title>{}</title>", encode_text(title));
        let _ = writeln!(doc, "<style>{STYLE}</style>");
        let _ = writeln!(doc, "<script src=\"{MATHJAX_URL}\"></script>");
        doc.push_str("</head>\n<body>\n<main>\n");
        doc.push_str(&body);
        doc.push_str("</main>\n</body>\n</html>\n");

        Ok(doc)
    }
}

fn render_markdown_cell(
    out: &mut String,
    source: &MultilineString,
    attachments: &BTreeMap<String, MimeBundle>,
) -> Result<(), ExportError> {
    let text = inline_attachments(&source.to_text(), attachments)?;
    out.push_str("<div class=\"cell markdown-cell\">\n<div class=\"prompt\"></div>\n");
    out.push_str("<div class=\"cell-body\">\n");
    out.push_str(&markdown_to_html(&text));
    out.push_str("</div>\n</div>\n");
    Ok(())
}

fn render_code_cell(
    out: &mut String,
    source: &MultilineString,
    execution_count: Option<u64>,
    outputs: &[Output],
    language: &str,
) -> Result<(), ExportError> {
    let _ = write!(
        out,
        "<div class=\"cell code-cell\">\n<div class=\"prompt input-prompt\">{}</div>\n",
        prompt("In", execution_count)
    );
    let _ = writeln!(
        out,
        "<div class=\"cell-body input\"><pre><code class=\"language-{}\">{}</code></pre></div>\n</div>",
        encode_double_quoted_attribute(language),
        encode_text(&source.to_text())
    );

    for output in outputs {
        render_output(out, output)?;
    }
    Ok(())
}

fn render_raw_cell(out: &mut String, source: &MultilineString, metadata: &Map<String, Value>) {
    let format = metadata
        .get("raw_mimetype")
        .or_else(|| metadata.get("format"))
        .and_then(Value::as_str);

    // Raw cells targeting other formats (LaTeX, reST) are dropped
    if format == Some("text/html") {
        out.push_str(&source.to_text());
        out.push('\n');
    }
}

fn render_output(out: &mut String, output: &Output) -> Result<(), ExportError> {
    match output {
        Output::Stream { name, text } => {
            let class = if name == "stderr" {
                "output-stderr"
            } else {
                "output-stream"
            };
            let body = format!("<pre>{}</pre>", encode_text(&text.to_text()));
            write_output(out, class, "", &body);
        }
        Output::Error {
            ename,
            evalue,
            traceback,
        } => {
            let text = if traceback.is_empty() {
                format!("{ename}: {evalue}")
            } else {
                traceback.join("\n")
            };
            let body = format!("<pre>{}</pre>", encode_text(&strip_ansi(&text)));
            write_output(out, "output-error", "", &body);
        }
        Output::DisplayData { data, metadata } => {
            if let Some(body) = render_mime_bundle(data, metadata)? {
                write_output(out, "output-display", "", &body);
            }
        }
        Output::ExecuteResult {
            execution_count,
            data,
            metadata,
        } => {
            if let Some(body) = render_mime_bundle(data, metadata)? {
                write_output(
                    out,
                    "output-result",
                    &prompt("Out", *execution_count),
                    &body,
                );
            }
        }
    }
    Ok(())
}

fn write_output(out: &mut String, class: &str, prompt: &str, body: &str) {
    let _ = writeln!(
        out,
        "<div class=\"cell output {class}\">\n<div class=\"prompt output-prompt\">{prompt}</div>\n<div class=\"cell-body\">\n{body}\n</div>\n</div>"
    );
}

fn render_mime_bundle(
    data: &MimeBundle,
    metadata: &Map<String, Value>,
) -> Result<Option<String>, ExportError> {
    let Some((mime, value)) = MIME_PRIORITY
        .iter()
        .find_map(|mime| data.get_key_value(*mime))
    else {
        return Ok(None);
    };
    let text = mime_text(mime, value)?;

    let html = match mime.as_str() {
        "text/html" | "image/svg+xml" => text,
        "image/png" | "image/jpeg" | "image/gif" => {
            let mut img = format!("<img src=\"data:{mime};base64,{}\"", strip_whitespace(&text));
            if let Some(dims) = metadata.get(mime.as_str()) {
                for attr in ["width", "height"] {
                    if let Some(n) = dims.get(attr).and_then(Value::as_u64) {
                        let _ = write!(img, " {attr}=\"{n}\"");
                    }
                }
            }
            img.push('>');
            img
        }
        "text/markdown" => markdown_to_html(&text),
        // MathJax typesets the delimited source in place
        "text/latex" => format!("<div class=\"latex\">{}</div>", encode_text(&text)),
        "application/javascript" => format!("<script>\n{text}\n</script>"),
        _ => format!("<pre>{}</pre>", encode_text(&text)),
    };
    Ok(Some(html))
}

fn mime_text(mime: &str, value: &Value) -> Result<String, ExportError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Array(lines) => lines
            .iter()
            .map(|line| line.as_str())
            .collect::<Option<Vec<_>>>()
            .map(|lines| lines.concat())
            .ok_or_else(|| ExportError::InvalidMimeData {
                mime: mime.to_string(),
            }),
        _ => Err(ExportError::InvalidMimeData {
            mime: mime.to_string(),
        }),
    }
}

/// Replace `attachment:<name>` references with inline data URIs
fn inline_attachments(
    text: &str,
    attachments: &BTreeMap<String, MimeBundle>,
) -> Result<String, ExportError> {
    let mut result = text.to_string();
    for (name, bundle) in attachments {
        let Some((mime, value)) = bundle.iter().next() else {
            continue;
        };
        let payload = strip_whitespace(&mime_text(mime, value)?);
        result = result.replace(
            &format!("attachment:{name}"),
            &format!("data:{mime};base64,{payload}"),
        );
    }
    Ok(result)
}

fn markdown_to_html(text: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(text, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

fn prompt(label: &str, execution_count: Option<u64>) -> String {
    match execution_count {
        Some(n) => format!("{label}&nbsp;[{n}]:"),
        None => format!("{label}&nbsp;[&nbsp;]:"),
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Drop terminal color sequences (`ESC [ ... letter`) from tracebacks
fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            result.push(c);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        }
    }
    result
}
