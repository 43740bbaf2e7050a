// ─── Path Safety Guard ───
// Manifest and archive entries name their own destinations, so every write
// target is resolved and checked against its root before any IO happens.

use std::path::{Component, Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

/// Symlink hops followed before giving up, as the OS does.
const MAX_SYMLINK_HOPS: usize = 40;

/// Resolve `path` to an absolute form with symlinks and `..` removed.
///
/// The deepest existing ancestor is canonicalized by the OS; the remaining,
/// not-yet-created components are applied lexically on top of it. A dangling
/// symlink counts as existing and is followed to wherever it points.
pub fn resolve_path(path: &Path) -> LauncherResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| LauncherError::io(path, e))?
            .join(path)
    };
    resolve_absolute(&absolute, 0)
}

fn resolve_absolute(absolute: &Path, hops: usize) -> LauncherResult<PathBuf> {
    let mut existing = absolute;
    loop {
        // `symlink_metadata` does not follow links, so a dangling one stops here.
        if std::fs::symlink_metadata(existing).is_ok() {
            break;
        }
        match existing.parent() {
            Some(parent) => existing = parent,
            None => break,
        }
    }

    let mut resolved = match existing.canonicalize() {
        Ok(resolved) => resolved,
        Err(e) if is_symlink(existing) => {
            if hops >= MAX_SYMLINK_HOPS {
                return Err(LauncherError::io(existing, e));
            }
            let target = std::fs::read_link(existing)
                .map_err(|e| LauncherError::io(existing, e))?;
            let target = match existing.parent() {
                Some(parent) if target.is_relative() => parent.join(target),
                _ => target,
            };
            resolve_absolute(&target, hops + 1)?
        }
        Err(e) => return Err(LauncherError::io(existing, e)),
    };

    let remainder = absolute.strip_prefix(existing).unwrap_or(Path::new(""));
    for component in remainder.components() {
        match component {
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => resolved.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    Ok(resolved)
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
}

/// Fail with `PathEscapesRoot` unless `candidate` resolves to `base` or a
/// descendant of it. Returns the resolved candidate.
pub fn ensure_inside_root(base: &Path, candidate: &Path) -> LauncherResult<PathBuf> {
    let resolved_base = resolve_path(base)?;
    let resolved = resolve_path(candidate)?;

    if !resolved.starts_with(&resolved_base) {
        return Err(LauncherError::PathEscapesRoot {
            root: base.to_path_buf(),
            path: candidate.to_path_buf(),
        });
    }

    Ok(resolved)
}

/// Join a manifest-relative path onto `base` and guard the result.
/// Absolute or drive-prefixed paths are treated as escapes.
pub fn join_inside_root(base: &Path, relative: &str) -> LauncherResult<PathBuf> {
    let rel = Path::new(relative);
    if rel
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        return Err(LauncherError::PathEscapesRoot {
            root: base.to_path_buf(),
            path: rel.to_path_buf(),
        });
    }

    ensure_inside_root(base, &base.join(rel))
}
