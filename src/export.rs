//! Single-note export to JSON, plain text, HTML, PDF and XML files.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::backup;
use crate::config::DateFormatter;
use crate::models::{ListItem, Note, NoteType, Span, SpanStyle};

const MAX_FILE_NAME_CHARS: usize = 64;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not start document renderer '{program}': {source}")]
    RendererUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("document renderer '{program}' failed with {status}")]
    RendererFailed { program: String, status: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Txt,
    Html,
    Pdf,
    Xml,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Txt => "txt",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Xml => "xml",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "txt" | "text" => Some(Self::Txt),
            "html" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

/// Turns HTML into a paginated document.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, html: &str, dest: &Path) -> Result<(), ExportError>;
}

/// Renders through an external HTML-to-PDF program:
/// `<program> <args..> <input.html> <output.pdf>`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["--quiet".to_string()],
        }
    }

    pub fn with_args(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl DocumentRenderer for CommandRenderer {
    fn render(&self, html: &str, dest: &Path) -> Result<(), ExportError> {
        let input = dest.with_extension("render.html");
        fs::write(&input, html)?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&input)
            .arg(dest)
            .output();
        let _ = fs::remove_file(&input);

        let output = output.map_err(|source| ExportError::RendererUnavailable {
            program: self.program.clone(),
            source,
        })?;
        if !output.status.success() {
            debug!(stderr = %String::from_utf8_lossy(&output.stderr), "Renderer output");
            return Err(ExportError::RendererFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
            });
        }
        Ok(())
    }
}

pub struct Exporter {
    dir: PathBuf,
    formatter: DateFormatter,
    renderer: Arc<dyn DocumentRenderer>,
}

impl Exporter {
    pub fn new(dir: PathBuf, formatter: DateFormatter, renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self {
            dir,
            formatter,
            renderer,
        }
    }

    pub fn formatter(&self) -> &DateFormatter {
        &self.formatter
    }

    /// Write `note` as `<name>.<ext>` into a freshly emptied scratch directory.
    /// `show_date` is ignored by JSON and XML, which always carry the timestamp.
    pub fn export(&self, note: &Note, format: ExportFormat, show_date: bool) -> Result<PathBuf> {
        let dir = self.prepare_dir()?;
        let path = dir.join(format!("{}.{}", file_name(note), format.extension()));

        match format {
            ExportFormat::Json => fs::write(&path, to_json(note)?)?,
            ExportFormat::Txt => fs::write(&path, to_txt(note, show_date, &self.formatter))?,
            ExportFormat::Html => fs::write(&path, to_html(note, show_date, &self.formatter))?,
            ExportFormat::Pdf => {
                let html = to_html(note, show_date, &self.formatter);
                self.renderer.render(&html, &path)?;
            }
            ExportFormat::Xml => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                backup::write_note(note, file)?;
            }
        }

        info!(path = %path.display(), format = format.extension(), "Note exported");
        Ok(path)
    }

    /// Create the scratch directory and remove anything a previous export left.
    fn prepare_dir(&self) -> Result<&Path> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        Ok(&self.dir)
    }
}

/// Title, or the first two words of the text, capped at 64 chars, path separators removed.
pub fn file_name(note: &Note) -> String {
    let name = if note.title.is_empty() {
        note.text()
            .split(' ')
            .take(2)
            .map(|word| format!("{} ", word))
            .collect()
    } else {
        note.title.clone()
    };

    name.chars()
        .take(MAX_FILE_NAME_CHARS)
        .filter(|c| *c != '/' && *c != '\\')
        .collect()
}

#[derive(Serialize)]
struct JsonNote<'a> {
    #[serde(rename = "type")]
    note_type: &'static str,
    title: &'a str,
    pinned: bool,
    // Same name as the backup tag
    #[serde(rename = "date-created")]
    timestamp: i64,
    labels: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spans: Option<&'a [Span]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<&'a [ListItem]>,
}

pub fn to_json(note: &Note) -> Result<String> {
    let (body, spans, items) = match note.note_type {
        NoteType::PlainNote => (Some(note.body.as_str()), Some(note.spans.as_slice()), None),
        NoteType::ChecklistNote => (None, None, Some(note.items.as_slice())),
        NoteType::PhoneNumberNote => (Some(note.body.as_str()), None, None),
    };

    let json = JsonNote {
        note_type: note.note_type.as_str(),
        title: &note.title,
        pinned: note.pinned,
        timestamp: note.timestamp,
        labels: &note.labels,
        body,
        spans,
        items,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

pub fn to_txt(note: &Note, show_date: bool, formatter: &DateFormatter) -> String {
    let mut out = String::new();
    if !note.title.is_empty() {
        out.push_str(&note.title);
        out.push_str("\n\n");
    }
    if show_date {
        out.push_str(&formatter.format(note.timestamp));
        out.push_str("\n\n");
    }
    out.push_str(&note.text());
    out
}

pub fn to_html(note: &Note, show_date: bool, formatter: &DateFormatter) -> String {
    let title = escape_html(&note.title);

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>");
    out.push_str("<html><head>");
    out.push_str(&format!("<meta charset=\"UTF-8\"><title>{}</title>", title));
    out.push_str("</head><body>");
    out.push_str(&format!("<h2>{}</h2>", title));

    if show_date {
        out.push_str(&format!("<p>{}</p>", escape_html(&formatter.format(note.timestamp))));
    }

    match note.note_type {
        NoteType::PlainNote => out.push_str(&spans_to_html(&note.body, &note.spans)),
        // Checked state is not rendered
        NoteType::ChecklistNote => {
            out.push_str("<ol>");
            for item in &note.items {
                out.push_str(&format!("<li>{}</li>", escape_html(&item.body)));
            }
            out.push_str("</ol>");
        }
        NoteType::PhoneNumberNote => {
            out.push_str(&format!("<p>{}</p>", escape_html(&note.body)));
        }
    }
    out.push_str("</body></html>");
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn open_tag(span: &Span, chars: &[char]) -> String {
    match span.style {
        SpanStyle::Bold => "<b>".to_string(),
        SpanStyle::Italic => "<i>".to_string(),
        SpanStyle::Monospace => "<tt>".to_string(),
        SpanStyle::Strikethrough => "<strike>".to_string(),
        SpanStyle::Link => {
            let target: String = chars[span.start..span.end].iter().collect();
            format!("<a href=\"{}\">", escape_html(&target))
        }
    }
}

fn close_tag(style: SpanStyle) -> &'static str {
    match style {
        SpanStyle::Bold => "</b>",
        SpanStyle::Italic => "</i>",
        SpanStyle::Monospace => "</tt>",
        SpanStyle::Strikethrough => "</strike>",
        SpanStyle::Link => "</a>",
    }
}

/// Body as one paragraph with spans applied as inline tags.
/// Overlapping spans are split at every boundary so tags always nest.
fn spans_to_html(body: &str, spans: &[Span]) -> String {
    if body.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = body.chars().collect();
    let len = chars.len();
    let spans: Vec<Span> = spans
        .iter()
        .map(|s| Span::new(s.start.min(len), s.end.min(len), s.style))
        .filter(|s| s.start < s.end)
        .collect();

    let mut boundaries: Vec<usize> = vec![0, len];
    for span in &spans {
        boundaries.push(span.start);
        boundaries.push(span.end);
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut out = String::from("<p dir=\"ltr\">");
    for window in boundaries.windows(2) {
        let (from, to) = (window[0], window[1]);
        let active: Vec<&Span> = spans
            .iter()
            .filter(|s| s.start <= from && s.end >= to)
            .collect();

        for span in &active {
            out.push_str(&open_tag(span, &chars));
        }
        for c in &chars[from..to] {
            match c {
                '\n' => out.push_str("<br>"),
                c => out.push_str(&escape_html(&c.to_string())),
            }
        }
        for span in active.iter().rev() {
            out.push_str(close_tag(span.style));
        }
    }
    out.push_str("</p>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Folder;
    use std::sync::Mutex;

    struct RecordingRenderer {
        html: Mutex<Option<String>>,
    }

    impl DocumentRenderer for RecordingRenderer {
        fn render(&self, html: &str, dest: &Path) -> Result<(), ExportError> {
            *self.html.lock().unwrap() = Some(html.to_string());
            fs::write(dest, b"%PDF-1.4")?;
            Ok(())
        }
    }

    fn exporter(dir: &Path) -> Exporter {
        Exporter::new(
            dir.to_path_buf(),
            DateFormatter::default(),
            Arc::new(CommandRenderer::new("notecmd-test-missing-renderer")),
        )
    }

    #[test]
    fn test_file_name_uses_title() {
        assert_eq!(file_name(&Note::plain("Groceries", "Buy milk")), "Groceries");
    }

    #[test]
    fn test_file_name_falls_back_to_two_words() {
        assert_eq!(file_name(&Note::plain("", "Buy milk and eggs")), "Buy milk ");
        let list = Note::checklist("", vec![ListItem::new("Call mom today", false)]);
        assert_eq!(file_name(&list), "Call mom ");
    }

    #[test]
    fn test_file_name_is_truncated_and_stripped() {
        let long = "a".repeat(100);
        assert_eq!(file_name(&Note::plain(long.as_str(), "")).chars().count(), 64);
        assert_eq!(file_name(&Note::plain("2024/01/02 plan", "")), "20240102 plan");
    }

    #[test]
    fn test_json_checklist_keeps_order_and_checked_state() {
        let note = Note::checklist(
            "",
            vec![ListItem::new("Buy milk", false), ListItem::new("Call mom", true)],
        );

        let value: serde_json::Value = serde_json::from_str(&to_json(&note).unwrap()).unwrap();
        let items = value["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["body"], "Buy milk");
        assert_eq!(items[0]["checked"], false);
        assert_eq!(items[1]["body"], "Call mom");
        assert_eq!(items[1]["checked"], true);
        assert_eq!(value["type"], "LIST");
        assert!(value.get("body").is_none());
    }

    #[test]
    fn test_json_plain_note_fields() {
        let mut note = Note::plain("T", "Hello");
        note.spans = vec![Span::new(0, 5, SpanStyle::Bold)];
        note.labels.insert("work".to_string());
        note.timestamp = 42;

        let json = to_json(&note).unwrap();
        assert!(json.contains("\n  \"type\": \"NOTE\""));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["title"], "T");
        assert_eq!(value["pinned"], false);
        assert_eq!(value["date-created"], 42);
        assert_eq!(value["labels"][0], "work");
        assert_eq!(value["body"], "Hello");
        assert_eq!(value["spans"][0]["start"], 0);
        assert_eq!(value["spans"][0]["end"], 5);
        assert_eq!(value["spans"][0]["style"], "bold");
        assert!(value.get("items").is_none());
    }

    #[test]
    fn test_txt_layout() {
        let formatter = DateFormatter::default();
        let mut note = Note::plain("Title", "Body");
        note.timestamp = 1_625_000_000_000;

        assert_eq!(to_txt(&note, false, &formatter), "Title\n\nBody");
        assert_eq!(
            to_txt(&note, true, &formatter),
            format!("Title\n\n{}\n\nBody", formatter.format(note.timestamp))
        );
        assert_eq!(to_txt(&Note::plain("", "Body"), false, &formatter), "Body");

        let list = Note::checklist("", vec![ListItem::new("a", true), ListItem::new("b", false)]);
        assert_eq!(to_txt(&list, false, &formatter), "a\nb");
    }

    #[test]
    fn test_html_escapes_title() {
        let html = to_html(&Note::plain("a < b & c", ""), false, &DateFormatter::default());
        assert!(html.contains("<title>a &lt; b &amp; c</title>"));
        assert!(html.contains("<h2>a &lt; b &amp; c</h2>"));
        assert!(!html.contains("a < b"));
    }

    #[test]
    fn test_html_checklist_is_ordered_list() {
        let note = Note::checklist(
            "",
            vec![ListItem::new("<milk>", true), ListItem::new("eggs", false)],
        );
        let html = to_html(&note, false, &DateFormatter::default());
        assert!(html.contains("<ol><li>&lt;milk&gt;</li><li>eggs</li></ol>"));
    }

    #[test]
    fn test_html_date_only_when_requested() {
        let formatter = DateFormatter::default();
        let note = Note::plain("t", "");
        let date = formatter.format(note.timestamp);

        assert!(to_html(&note, true, &formatter).contains(&format!("<p>{}</p>", date)));
        assert!(!to_html(&note, false, &formatter).contains(&date));
    }

    #[test]
    fn test_spans_become_nested_tags() {
        let html = spans_to_html(
            "bold and link",
            &[Span::new(0, 8, SpanStyle::Bold), Span::new(5, 13, SpanStyle::Link)],
        );
        assert_eq!(
            html,
            "<p dir=\"ltr\"><b>bold </b><b><a href=\"and link\">and</a></b><a href=\"and link\"> link</a></p>"
        );
    }

    #[test]
    fn test_spans_out_of_range_are_clamped() {
        let html = spans_to_html("a<b\nc", &[Span::new(2, 99, SpanStyle::Italic)]);
        assert_eq!(html, "<p dir=\"ltr\">a&lt;<i>b<br>c</i></p>");
    }

    #[test]
    fn test_export_clears_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter(dir.path());

        let first = exporter
            .export(&Note::plain("first", "x"), ExportFormat::Txt, false)
            .unwrap();
        let second = exporter
            .export(&Note::plain("second", "y"), ExportFormat::Json, false)
            .unwrap();

        assert!(!first.exists());
        assert_eq!(second, dir.path().join("second.json"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_export_xml_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut note = Note::phone_number("Mom", "555-0100");
        note.timestamp = 9;

        let path = exporter(dir.path())
            .export(&note, ExportFormat::Xml, false)
            .unwrap();
        let read = backup::read_note(
            std::io::BufReader::new(File::open(path).unwrap()),
            Folder::Active,
        )
        .unwrap();
        assert_eq!(read, note);
    }

    #[test]
    fn test_pdf_delegates_html_to_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(RecordingRenderer {
            html: Mutex::new(None),
        });
        let exporter = Exporter::new(
            dir.path().to_path_buf(),
            DateFormatter::default(),
            renderer.clone(),
        );
        let note = Note::plain("Report", "body");

        let path = exporter.export(&note, ExportFormat::Pdf, false).unwrap();

        assert_eq!(path, dir.path().join("Report.pdf"));
        assert!(path.exists());
        let html = renderer.html.lock().unwrap().clone().unwrap();
        assert_eq!(html, to_html(&note, false, &DateFormatter::default()));
    }

    #[test]
    fn test_pdf_with_missing_renderer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = exporter(dir.path())
            .export(&Note::plain("x", ""), ExportFormat::Pdf, false)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExportError>(),
            Some(ExportError::RendererUnavailable { .. })
        ));
    }
}
