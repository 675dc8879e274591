//! C# file collection and snapshot persistence.

use std::fs;
use std::io;
use std::path::Path;

use overcheck_core::snapshot::ProjectSnapshot;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::provider::CSharpProvider;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum FileError {
    #[error("directory not found: {path}")]
    NotFound { path: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type FileResult<T> = Result<T, FileError>;

/// Build output and tooling directories that never hold project sources.
const EXCLUDED_DIRS: &[&str] = &["bin", "obj", "node_modules", "packages"];

// ============================================================================
// File Collection
// ============================================================================

/// Collect `.cs` files under `root` as `(relative_path, content)` pairs,
/// sorted by path.
///
/// Hidden directories and build output (`bin`, `obj`, ...) are skipped.
/// Paths use `/` separators regardless of platform.
pub fn collect_csharp_files(root: &Path) -> FileResult<Vec<(String, String)>> {
    if !root.is_dir() {
        return Err(FileError::NotFound {
            path: root.display().to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let Ok(rel_path) = path.strip_prefix(root) else {
            continue;
        };
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "cs") {
            continue;
        }
        let skipped = rel_path.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_ref())
        });
        if skipped {
            continue;
        }

        let rel_path_str = rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let content = fs::read_to_string(path)?;
        files.push((rel_path_str, content));
    }

    files.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(files)
}

/// Build a snapshot from every `.cs` file under `root`.
pub fn load_dir(root: &Path) -> FileResult<ProjectSnapshot> {
    let files = collect_csharp_files(root)?;
    debug!(root = %root.display(), files = files.len(), "loading project");
    Ok(ProjectSnapshot::build(&CSharpProvider, files))
}

/// Write every unit whose content differs between `base` and `next` back
/// under `root`. Returns the written paths in order.
pub fn write_changes(
    root: &Path,
    base: &ProjectSnapshot,
    next: &ProjectSnapshot,
) -> FileResult<Vec<String>> {
    let mut written = Vec::new();
    for unit in next.units() {
        let unchanged = base
            .unit_by_path(&unit.path)
            .is_some_and(|old| old.content_hash == unit.content_hash);
        if unchanged {
            continue;
        }
        fs::write(root.join(&unit.path), &unit.text)?;
        written.push(unit.path.clone());
    }
    debug!(files = written.len(), "wrote changed units");
    Ok(written)
}
