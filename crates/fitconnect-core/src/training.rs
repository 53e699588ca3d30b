//! Training content as seen by operators: grouped knowledge-base entries
//! from the replica API and the local training text files.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use crate::ai::TrainingItem;

pub const CONTENT_LIMIT: u32 = 50;
const PREVIEW_CHARS: usize = 200;
const UNKNOWN_REPLICA: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingGroup {
    pub replica_uuid: String,
    pub items: Vec<TrainingItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingContent {
    pub groups: Vec<TrainingGroup>,
    pub total_items: usize,
}

fn preview(text: Option<String>) -> Option<String> {
    text.map(|t| {
        if t.chars().count() > PREVIEW_CHARS {
            let cut: String = t.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", cut)
        } else {
            t
        }
    })
}

/// Group entries by replica in order of first appearance, shortening their
/// text for display. With `replica_uuid` set, other replicas are dropped.
pub fn group_training(items: Vec<TrainingItem>, replica_uuid: Option<&str>) -> TrainingContent {
    let mut groups: Vec<TrainingGroup> = Vec::new();
    let mut total_items = 0;

    for mut item in items {
        if let Some(wanted) = replica_uuid {
            if item.replica_uuid.as_deref() != Some(wanted) {
                continue;
            }
        }
        total_items += 1;

        let key = item
            .replica_uuid
            .clone()
            .unwrap_or_else(|| UNKNOWN_REPLICA.to_string());
        item.raw_text = preview(item.raw_text.take());
        item.processed_text = preview(item.processed_text.take());

        match groups.iter_mut().find(|g| g.replica_uuid == key) {
            Some(group) => group.items.push(item),
            None => groups.push(TrainingGroup {
                replica_uuid: key,
                items: vec![item],
            }),
        }
    }

    TrainingContent {
        groups,
        total_items,
    }
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingFile {
    pub name: String,
    pub path: String,
    /// Human readable, e.g. `"1.50 KB"`.
    pub size: String,
    /// `dd/mm/yyyy` in local time.
    pub modified: String,
}

pub fn format_size(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// Regular files directly inside `dir`, sorted by name. A missing directory
/// has no files.
pub fn list_training_files(dir: &Path) -> Result<Vec<TrainingFile>, FileError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified: DateTime<Local> = metadata.modified()?.into();
        files.push(TrainingFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path().display().to_string(),
            size: format_size(metadata.len()),
            modified: modified.format("%d/%m/%Y").to_string(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Join a relative path onto `root`, refusing anything that could leave it.
pub fn resolve_in(root: &Path, relative: &str) -> Result<PathBuf, FileError> {
    let relative = relative.trim();
    let candidate = Path::new(relative);
    let mut resolved = root.to_path_buf();
    let mut depth = 0;

    for component in candidate.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            _ => return Err(FileError::InvalidPath(relative.to_string())),
        }
    }

    if depth == 0 {
        return Err(FileError::InvalidPath(relative.to_string()));
    }
    Ok(resolved)
}

pub fn read_training_file(root: &Path, relative: &str) -> Result<String, FileError> {
    let path = resolve_in(root, relative)?;
    match fs::read_to_string(&path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(FileError::NotFound(relative.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Write a file under `root`, creating parent directories as needed.
pub fn write_training_file(root: &Path, relative: &str, content: &str) -> Result<PathBuf, FileError> {
    let path = resolve_in(root, relative)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(path)
}
