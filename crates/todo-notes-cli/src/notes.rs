use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use todo_notes_engine::{AppendMode, NotePlan};

/// Writes `note` below `workspace_root`, honoring its append mode.
///
/// Returns the path actually written.
pub fn write_note(workspace_root: &Path, note: &NotePlan, eol: &str) -> Result<PathBuf> {
    let path = note.path(workspace_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create folder {}", parent.display()))?;
    }

    let (path, contents) = match note.append_mode {
        AppendMode::Append if path.exists() => {
            let existing = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let mut contents = existing;
            if !contents.is_empty() && !contents.ends_with('\n') {
                contents.push_str(eol);
            }
            contents.push_str(eol);
            contents.push_str(&note.body);
            contents.push_str(eol);
            (path, contents)
        }
        AppendMode::Increment => (free_path(&path), note.text.clone()),
        AppendMode::Append | AppendMode::Overwrite => (path, note.text.clone()),
    };

    log::info!("writing note to {}", path.display());
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// `path` if unused, otherwise the first free `stem (n).ext`.
pub fn free_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| path.with_file_name(format!("{stem} ({n}){extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
