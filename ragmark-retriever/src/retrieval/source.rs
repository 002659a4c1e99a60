//! Document sources feeding the indexer.
//!
//! A [`DocumentSource`] lists its documents first ([`SourceEntry`]: path and
//! modification time) and loads text only on request. The indexer loads only
//! the entries it finds stale, so an up-to-date corpus costs one directory walk.
//!
//! - [`DirectorySource`] walks a directory tree of `.md`/`.txt` files.
//! - [`StaticSource`] serves documents already held in memory.
//!
//! Markdown bodies are reduced to their text content before indexing: markup,
//! link targets and list markers are dropped, and block boundaries become
//! blank lines. A front matter `lastMod` overrides the file modification time.

use crate::error::{RagError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pulldown_cmark::{Event, Parser, TagEnd};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// A document known to a source, before its text is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: String,
    pub mtime: DateTime<Utc>,
}

/// A loaded document: extracted plain text plus display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: String,
    pub mtime: DateTime<Utc>,
    pub text: String,
    pub title: String,
    pub summary: String,
}

impl SourceDocument {
    pub fn new<P: Into<String>, T: Into<String>>(path: P, mtime: DateTime<Utc>, text: T) -> Self {
        Self {
            path: path.into(),
            mtime,
            text: text.into(),
            title: String::new(),
            summary: String::new(),
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_summary<S: Into<String>>(mut self, summary: S) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn entry(&self) -> SourceEntry {
        SourceEntry {
            path: self.path.clone(),
            mtime: self.mtime,
        }
    }
}

/// A finite, restartable, path-ordered collection of documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// The documents for one sweep, ordered by path.
    async fn entries(&self) -> Result<Vec<SourceEntry>>;

    /// Load the text and metadata for an entry returned by [`entries`](Self::entries).
    async fn load(&self, entry: &SourceEntry) -> Result<SourceDocument>;
}

/// Serves a fixed set of in-memory documents.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    documents: Vec<SourceDocument>,
}

impl StaticSource {
    pub fn new(mut documents: Vec<SourceDocument>) -> Self {
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Self { documents }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    async fn entries(&self) -> Result<Vec<SourceEntry>> {
        Ok(self.documents.iter().map(SourceDocument::entry).collect())
    }

    async fn load(&self, entry: &SourceEntry) -> Result<SourceDocument> {
        self.documents
            .iter()
            .find(|document| document.path == entry.path)
            .cloned()
            .ok_or_else(|| RagError::Source {
                path: entry.path.clone(),
                message: "document is not part of this source".to_string(),
            })
    }
}

/// Walks a directory for text documents, honouring `.gitignore` and hidden-file rules.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectorySource {
    /// Indexes `.md` and `.txt` files under `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            extensions: vec!["md".to_string(), "txt".to_string()],
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn has_indexed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    fn walk(&self) -> Vec<SourceEntry> {
        let mut entries = Vec::new();
        for result in ignore::WalkBuilder::new(&self.root).build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file())
                || !self.has_indexed_extension(entry.path())
            {
                continue;
            }

            let modified = match entry.metadata().map(|m| m.modified()) {
                Ok(Ok(modified)) => DateTime::<Utc>::from(modified),
                Ok(Err(e)) => {
                    tracing::warn!("No modification time for {}: {}", entry.path().display(), e);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("No metadata for {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            let mtime = declared_last_mod(entry.path()).unwrap_or(modified);

            if let Some(path) = relative_path(&self.root, entry.path()) {
                entries.push(SourceEntry { path, mtime });
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    async fn entries(&self) -> Result<Vec<SourceEntry>> {
        let source = self.clone();
        let entries = tokio::task::spawn_blocking(move || source.walk())
            .await
            .map_err(|e| RagError::Source {
                path: self.root.display().to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(
            "Found {} documents under {}",
            entries.len(),
            self.root.display()
        );
        Ok(entries)
    }

    async fn load(&self, entry: &SourceEntry) -> Result<SourceDocument> {
        let raw = tokio::fs::read_to_string(self.root.join(&entry.path))
            .await
            .map_err(|e| RagError::Source {
                path: entry.path.clone(),
                message: e.to_string(),
            })?;

        let (front_matter, body) = split_front_matter(&raw);
        let title = front_matter_value(front_matter, "title")
            .map(str::to_string)
            .or_else(|| first_heading(body))
            .unwrap_or_else(|| file_stem(&entry.path));
        let summary = front_matter_value(front_matter, "summary")
            .or_else(|| front_matter_value(front_matter, "description"))
            .unwrap_or_default()
            .to_string();

        let text = if is_markdown(&entry.path) {
            markdown_text(body)
        } else {
            body.to_string()
        };

        Ok(SourceDocument {
            path: entry.path.clone(),
            mtime: entry.mtime,
            text,
            title,
            summary,
        })
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        let Some(part) = component.as_os_str().to_str() else {
            tracing::warn!("Skipping {}: path is not valid UTF-8", path.display());
            return None;
        };
        parts.push(part);
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn is_markdown(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Reads only the front matter block of `path` and returns its `lastMod`, if any.
fn declared_last_mod(path: &Path) -> Option<DateTime<Utc>> {
    let file = std::fs::File::open(path).ok()?;
    let mut lines = BufReader::new(file).lines();
    if lines.next()?.ok()?.trim_end() != "---" {
        return None;
    }

    let mut front_matter = String::new();
    for line in lines {
        let line = line.ok()?;
        if line.trim_end() == "---" {
            let value = front_matter_value(&front_matter, "lastMod")?;
            let parsed = parse_timestamp(value);
            if parsed.is_none() {
                tracing::warn!("Ignoring unparseable lastMod {:?} in {}", value, path.display());
            }
            return parsed;
        }
        front_matter.push_str(&line);
        front_matter.push('\n');
    }
    None
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// Text content of a markdown document, one block per paragraph.
fn markdown_text(markdown: &str) -> String {
    let mut text = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Text(content) | Event::Code(content) => text.push_str(&content),
            Event::SoftBreak | Event::HardBreak | Event::End(TagEnd::Item) => text.push('\n'),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading { .. }
                | TagEnd::BlockQuote(_)
                | TagEnd::CodeBlock
                | TagEnd::List(_)
                | TagEnd::Table
                | TagEnd::TableRow,
            ) => text.push_str("\n\n"),
            Event::End(TagEnd::TableCell) => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Splits a leading `---` delimited YAML-style block from the document body.
fn split_front_matter(raw: &str) -> (&str, &str) {
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return ("", raw);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (&rest[..offset], &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    ("", raw)
}

fn front_matter_value<'a>(front_matter: &'a str, key: &str) -> Option<&'a str> {
    front_matter.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        if k.trim() != key {
            return None;
        }
        let value = v.trim().trim_matches('"').trim_matches('\'').trim();
        (!value.is_empty()).then_some(value)
    })
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|title| !title.is_empty())
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}
