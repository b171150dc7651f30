//! Planning the "complete todo" workflow.
//!
//! [`plan_completion`] parses the document once, detects the todo under the
//! cursor, collects its metadata and prepares both the edited document and the
//! note its body moves into. Nothing is written; callers apply the plan.

use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use relative_path::RelativePathBuf;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::metadata::{
    MetadataOptions, MetadataRecord, MetadataValue, encode_front_matter, extract_metadata, keys,
};
use crate::parsing::{LineSource, ParsedDocument};
use crate::rewrite::rewrite_urls;
use crate::todo::{Detection, DetectionOptions, TodoRange, detect_todo};

fn header_regex() -> &'static Regex {
    static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();
    HEADER_REGEX.get_or_init(|| {
        Regex::new(r"^(?P<prefix>[ \t]*(?:>[ \t]*)*(?:[-*+]|\d{1,9}[.)])[ \t]+)\[ \](?P<rest>.*)$")
            .expect("Invalid todo header regex")
    })
}

/// What to do when the note file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppendMode {
    /// Add the new body after the existing note.
    Append,
    #[default]
    Overwrite,
    /// Pick the first free `name (n).md`.
    Increment,
}

impl FromStr for AppendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(AppendMode::Append),
            "overwrite" => Ok(AppendMode::Overwrite),
            "increment" => Ok(AppendMode::Increment),
            other => Err(format!(
                "Unknown append mode '{other}', expected 'append', 'overwrite' or 'increment'"
            )),
        }
    }
}

impl fmt::Display for AppendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppendMode::Append => "append",
            AppendMode::Overwrite => "overwrite",
            AppendMode::Increment => "increment",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOptions {
    pub detection: DetectionOptions,
    pub metadata: MetadataOptions,
    /// Notes are written below this directory.
    pub workspace_root: PathBuf,
    /// Directory of the document being edited, the base of its relative image links.
    pub document_dir: PathBuf,
    /// Folder used when a todo has no `FolderPath`.
    pub default_folder: RelativePathBuf,
    pub append_mode: AppendMode,
    /// Stamped as `CompletedDate` when present.
    pub completed_date: Option<String>,
    pub eol: String,
}

impl CompletionOptions {
    pub fn new(workspace_root: impl Into<PathBuf>, document_dir: impl Into<PathBuf>) -> Self {
        Self {
            detection: DetectionOptions::default(),
            metadata: MetadataOptions::default(),
            workspace_root: workspace_root.into(),
            document_dir: document_dir.into(),
            default_folder: RelativePathBuf::new(),
            append_mode: AppendMode::default(),
            completed_date: None,
            eol: "\n".to_string(),
        }
    }
}

/// The note a completed todo's body moves into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePlan {
    pub folder: RelativePathBuf,
    pub file_name: String,
    pub title: String,
    pub metadata: MetadataRecord,
    /// Extracted body with metadata removed and image links re-rooted.
    pub body: String,
    /// Full note text: front matter, title heading and body.
    pub text: String,
    pub append_mode: AppendMode,
}

impl NotePlan {
    pub fn path(&self, workspace_root: &Path) -> PathBuf {
        self.folder.join(&self.file_name).to_path(workspace_root)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPlan {
    pub range: TodoRange,
    /// 0-indexed line of the todo header.
    pub header_line: usize,
    pub new_header: String,
    /// 0-indexed body lines removed from the document, `None` for a header-only todo.
    pub delete_range: Option<RangeInclusive<usize>>,
    pub note: Option<NotePlan>,
    pub is_child_todo_completed: bool,
}

impl CompletionPlan {
    /// The document with the header checked and the body lines removed.
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for (index, piece) in text.split_inclusive('\n').enumerate() {
            if self
                .delete_range
                .as_ref()
                .is_some_and(|range| range.contains(&index))
            {
                continue;
            }
            if index == self.header_line {
                let content = piece.trim_end_matches(['\n', '\r']);
                out.push_str(&self.new_header);
                out.push_str(&piece[content.len()..]);
            } else {
                out.push_str(piece);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Planned(CompletionPlan),
    NoEnclosingTodo,
    AlreadyCompleted,
}

/// Plans completion of the todo enclosing the 0-indexed `cursor_line`.
pub fn plan_completion(
    text: &str,
    cursor_line: usize,
    options: &CompletionOptions,
) -> Result<Completion, CoreError> {
    let doc = ParsedDocument::parse(text)?;
    let lines = doc.source();

    let todo = match detect_todo(doc.flattened(), cursor_line + 1, lines, &options.detection) {
        Detection::Found(todo) => todo,
        Detection::NoEnclosingTodo => return Ok(Completion::NoEnclosingTodo),
        Detection::AlreadyCompleted => return Ok(Completion::AlreadyCompleted),
    };
    let range = todo.range;

    let header_text = lines.line_at(range.start_line).unwrap_or_default();
    let quote_depth = header_text
        .chars()
        .take_while(|c| matches!(c, ' ' | '\t' | '>'))
        .filter(|&c| c == '>')
        .count();
    let (new_header, header_title) = match header_regex().captures(header_text) {
        Some(captures) => {
            let prefix = captures.name("prefix").map_or("", |m| m.as_str());
            let rest = captures.name("rest").map_or("", |m| m.as_str());
            (format!("{prefix}[x]{rest}"), rest.trim().to_string())
        }
        None => {
            log::warn!("no task marker found on line {}", range.start_line + 1);
            (header_text.to_string(), header_text.trim().to_string())
        }
    };

    let mut plan = CompletionPlan {
        range,
        header_line: range.start_line,
        new_header,
        delete_range: None,
        note: None,
        is_child_todo_completed: todo.is_child_todo_completed,
    };
    if range.is_header_only() {
        return Ok(Completion::Planned(plan));
    }
    plan.delete_range = Some(range.body_lines());

    let extracted = extract_metadata(doc.flattened(), &range, &options.metadata)?;
    let body_lines: Vec<&str> = range
        .body_lines()
        .filter(|line| !extracted.is_consumed(*line))
        .filter_map(|line| lines.line_at(line))
        .map(|line| strip_quote_markers(line, quote_depth))
        .collect();
    let body = dedent(trim_blank_lines(&body_lines)).join(options.eol.as_str());

    let mut record = extracted.record;
    if body.trim().is_empty() && record.is_empty() {
        log::debug!("todo on line {} has nothing to export", range.start_line + 1);
        return Ok(Completion::Planned(plan));
    }

    let title = record
        .text(keys::TITLE)
        .map(str::to_string)
        .unwrap_or(header_title);
    let folder = record
        .text(keys::FOLDER_PATH)
        .map(|folder| RelativePathBuf::from(folder).normalize())
        .unwrap_or_else(|| options.default_folder.normalize());
    let file_name = sanitize_file_name(
        &record
            .text(keys::FILE_NAME)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{title}.md")),
    );
    let append_mode = match record.text(keys::APPEND_MODE) {
        Some(mode) => mode.parse().unwrap_or_else(|e| {
            log::warn!("{e}, using {}", options.append_mode);
            options.append_mode
        }),
        None => options.append_mode,
    };
    if let Some(date) = &options.completed_date {
        record.insert(keys::COMPLETED_DATE, MetadataValue::Text(date.clone()));
    }

    let note_dir = folder.to_path(&options.workspace_root);
    let body = rewrite_urls(&body, &options.document_dir, &note_dir)?;

    let eol = options.eol.as_str();
    let mut note_text = encode_front_matter(&record, eol)?;
    note_text.push_str(&format!("# {title}{eol}"));
    if !body.is_empty() {
        note_text.push_str(&body);
        note_text.push_str(eol);
    }

    plan.note = Some(NotePlan {
        folder,
        file_name,
        title,
        metadata: record,
        body,
        text: note_text,
        append_mode,
    });
    Ok(Completion::Planned(plan))
}

fn trim_blank_lines<'a, 'b>(lines: &'b [&'a str]) -> &'b [&'a str] {
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |last| last + 1);
    &lines[start..end]
}

/// Removes up to `depth` block quote markers from the start of `line`.
///
/// Lazy continuation lines without markers are returned unchanged.
fn strip_quote_markers(line: &str, depth: usize) -> &str {
    let mut rest = line;
    for _ in 0..depth {
        match rest.trim_start_matches([' ', '\t']).strip_prefix('>') {
            Some(inner) => rest = inner,
            None => break,
        }
    }
    rest
}

/// Strips the indentation shared by every non-blank line.
pub fn dedent<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let common = lines
        .iter()
        .copied()
        .filter(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start_matches([' ', '\t']).len()])
        .reduce(|common, indent| {
            let shared = common
                .bytes()
                .zip(indent.bytes())
                .take_while(|(a, b)| a == b)
                .count();
            &common[..shared]
        })
        .unwrap_or("");

    lines
        .iter()
        .map(|&line| line.strip_prefix(common).unwrap_or_else(|| line.trim_start()))
        .collect()
}

const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const MAX_FILE_NAME_BYTES: usize = 255;

/// Makes `name` safe as a single file name on every common platform.
pub fn sanitize_file_name(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*'))
        .collect();

    let trimmed_len = cleaned.trim_end_matches(['.', ' ']).len();
    cleaned.truncate(trimmed_len);

    let stem = cleaned.split('.').next().unwrap_or_default();
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem.trim_end()))
    {
        cleaned.clear();
    }

    if cleaned.len() > MAX_FILE_NAME_BYTES {
        let mut cut = MAX_FILE_NAME_BYTES;
        while !cleaned.is_char_boundary(cut) {
            cut -= 1;
        }
        cleaned.truncate(cut);
    }

    if cleaned.trim().is_empty() {
        "untitled.md".to_string()
    } else {
        cleaned
    }
}
