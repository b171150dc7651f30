use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDateTime};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use todo_notes_config::Config;
use todo_notes_engine::{
    Completion, CompletionPlan, Detection, LineSource, ParsedDocument, SourceText, detect_todo,
    plan_completion, todo_template,
};

use crate::notes;

fn read_document(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

/// 0-indexed line for a 1-indexed command line argument.
fn cursor_line(line: usize) -> Result<usize> {
    line.checked_sub(1)
        .ok_or_else(|| anyhow!("Line numbers start at 1"))
}

pub fn format_date(format: &str, now: NaiveDateTime) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", now.format(format))
        .map_err(|_| anyhow!("Invalid date_format '{format}'"))?;
    Ok(out)
}

fn today(config: &Config) -> Result<String> {
    format_date(&config.date_format, Local::now().naive_local())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve {}", path.display()))
}

/// Checks the todo enclosing `line`, moves its body into a note and rewrites `file`.
pub fn complete(config: &Config, file: &Path, line: usize, dry_run: bool) -> Result<String> {
    let text = read_document(file)?;
    let cursor = cursor_line(line)?;

    let document_path = absolute(file)?;
    let document_dir = document_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let workspace_root = absolute(&config.workspace_root)?;

    let mut options = config.completion_options(document_dir, Some(today(config)?));
    options.workspace_root = workspace_root.clone();

    let plan = match plan_completion(&text, cursor, &options)
        .map_err(|e| anyhow!(e.user_message()))?
    {
        Completion::Planned(plan) => plan,
        Completion::NoEnclosingTodo => return Ok(format!("No open todo at line {line}")),
        Completion::AlreadyCompleted => {
            return Ok(format!("Todo at line {line} is already completed"));
        }
    };

    if dry_run {
        return Ok(describe_plan(&plan, &workspace_root));
    }

    let mut summary = format!("Completed todo on line {}", plan.header_line + 1);
    if let Some(note) = &plan.note {
        let written = notes::write_note(&workspace_root, note, &options.eol)
            .context("Failed to write note")?;
        write!(summary, ", note saved to {}", written.display())?;
    }

    std::fs::write(file, plan.apply(&text))
        .with_context(|| format!("Failed to update {}", file.display()))?;
    log::info!("{summary}");
    Ok(summary)
}

fn describe_plan(plan: &CompletionPlan, workspace_root: &Path) -> String {
    let mut out = format!(
        "Header (line {}): {}\n",
        plan.header_line + 1,
        plan.new_header
    );
    if let Some(range) = &plan.delete_range {
        out.push_str(&format!(
            "Remove lines {}-{}\n",
            range.start() + 1,
            range.end() + 1
        ));
    }
    match &plan.note {
        Some(note) => {
            out.push_str(&format!(
                "Note ({}): {}\n\n",
                note.append_mode,
                note.path(workspace_root).display()
            ));
            out.push_str(&note.text);
        }
        None => out.push_str("No note to write\n"),
    }
    out
}

/// Inserts a new todo with a metadata template after the indentation of `line`.
pub fn add(config: &Config, file: &Path, line: usize) -> Result<String> {
    let text = read_document(file)?;
    let cursor = cursor_line(line)?;

    let source = SourceText::new(text.as_str());
    let (Some(current), Some(line_start)) = (source.line_at(cursor), source.line_start(cursor))
    else {
        bail!("Line {line} is past the end of {}", file.display());
    };
    let indent = current.len() - current.trim_start_matches([' ', '\t']).len();
    let offset = line_start + indent;

    let template = todo_template(
        current,
        &config.indent_unit(),
        &today(config)?,
        config.eol.as_str(),
    );
    let mut updated = String::with_capacity(text.len() + template.len());
    updated.push_str(&text[..offset]);
    updated.push_str(&template);
    updated.push_str(&text[offset..]);

    std::fs::write(file, updated)
        .with_context(|| format!("Failed to update {}", file.display()))?;
    Ok(format!("Added todo at line {line}"))
}

/// Reports the todo block enclosing `line`.
pub fn range(config: &Config, file: &Path, line: usize) -> Result<String> {
    let text = read_document(file)?;
    let cursor = cursor_line(line)?;

    let doc = ParsedDocument::parse(&text)
        .map_err(|e| anyhow!("Failed to extract todo: {e}"))?;
    let options = config.detection_options();
    let message = match detect_todo(doc.flattened(), cursor + 1, doc.source(), &options) {
        Detection::Found(todo) => {
            let range = todo.range;
            let mut message = format!(
                "Todo at lines {}-{} ({} mode)",
                range.start_line + 1,
                range.end_line + 1,
                options.mode
            );
            if range.is_header_only() {
                message.push_str(", header only");
            } else if todo.is_child_todo_completed {
                message.push_str(", all child todos completed");
            }
            message
        }
        Detection::NoEnclosingTodo => format!("No open todo at line {line}"),
        Detection::AlreadyCompleted => format!("Todo at line {line} is already completed"),
    };
    Ok(message)
}
