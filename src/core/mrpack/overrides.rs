use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::index::open_archive;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::join_inside_root;
use crate::core::progress::ProgressCallback;

const OVERRIDES: &str = "overrides/";
const CLIENT_OVERRIDES: &str = "client-overrides/";

/// One archive entry chosen for a destination.
struct PlannedOverride {
    index: usize,
    entry_name: String,
    dest: PathBuf,
    client: bool,
}

/// Copy `overrides/` and `client-overrides/` entries of the archive into
/// `target_root`. Directory markers and empty entries are skipped.
///
/// When both prefixes carry the same relative path the `client-overrides/`
/// entry is written, whatever the archive order; every destination is
/// written once. All destinations are guarded before the first write.
/// Returns the number of files written.
pub fn extract_overrides(
    archive_path: &Path,
    target_root: &Path,
    callback: &ProgressCallback,
) -> LauncherResult<usize> {
    let mut archive = open_archive(archive_path)?;
    callback.set_status("Extract overrides");

    let mut plan: Vec<PlannedOverride> = Vec::new();
    let mut by_relative: HashMap<String, usize> = HashMap::new();

    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_dir() || entry.size() == 0 {
            continue;
        }
        let name = entry.name().to_string();
        let (relative, client) = if let Some(rest) = name.strip_prefix(CLIENT_OVERRIDES) {
            (rest.to_string(), true)
        } else if let Some(rest) = name.strip_prefix(OVERRIDES) {
            (rest.to_string(), false)
        } else {
            continue;
        };

        let dest = join_inside_root(target_root, &relative)?;
        let planned = PlannedOverride {
            index: i,
            entry_name: name,
            dest,
            client,
        };

        match by_relative.get(&relative).copied() {
            Some(slot) if plan[slot].client && !client => {
                debug!("{} shadowed by {}", planned.entry_name, plan[slot].entry_name);
            }
            Some(slot) => plan[slot] = planned,
            None => {
                by_relative.insert(relative, plan.len());
                plan.push(planned);
            }
        }
    }

    for planned in &plan {
        callback.set_status(&format!("Extract {}", planned.entry_name));

        let mut entry = archive.by_index(planned.index)?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;

        if let Some(parent) = planned.dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        std::fs::write(&planned.dest, bytes).map_err(|e| LauncherError::io(&planned.dest, e))?;
    }

    Ok(plan.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{recording_callback, write_mrpack};

    fn index() -> serde_json::Value {
        serde_json::json!({
            "formatVersion": 1,
            "versionId": "1",
            "name": "Overrides",
            "files": [],
            "dependencies": {"minecraft": "1.20.1"}
        })
    }

    #[test]
    fn extracts_both_prefixes_and_skips_markers() {
        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("pack.mrpack");
        write_mrpack(
            &pack,
            &index(),
            &[
                ("overrides/", b""),
                ("overrides/config/", b""),
                ("overrides/config/a.toml", b"a = 1"),
                ("overrides/empty.txt", b""),
                ("client-overrides/options.txt", b"fov:90"),
                ("other/ignored.txt", b"nope"),
            ],
        );
        let root = dir.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        let (callback, events) = recording_callback();

        let written = extract_overrides(&pack, &root, &callback).unwrap();

        assert_eq!(written, 2);
        assert_eq!(std::fs::read(root.join("config/a.toml")).unwrap(), b"a = 1");
        assert_eq!(std::fs::read(root.join("options.txt")).unwrap(), b"fov:90");
        assert!(!root.join("empty.txt").exists());
        assert!(!root.join("ignored.txt").exists());
        assert_eq!(
            events.lock().unwrap().clone(),
            [
                "status:Extract overrides",
                "status:Extract overrides/config/a.toml",
                "status:Extract client-overrides/options.txt",
            ]
        );
    }

    #[test]
    fn client_overrides_win_in_either_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir_all(&root).unwrap();

        for (n, entries) in [
            [("overrides/options.txt", b"common"), ("client-overrides/options.txt", b"client")],
            [("client-overrides/options.txt", b"client"), ("overrides/options.txt", b"common")],
        ]
        .iter()
        .enumerate()
        {
            let pack = dir.path().join(format!("pack{n}.mrpack"));
            let entries: Vec<(&str, &[u8])> =
                entries.iter().map(|(name, bytes)| (*name, &bytes[..])).collect();
            write_mrpack(&pack, &index(), &entries);

            let written = extract_overrides(&pack, &root, &ProgressCallback::new()).unwrap();

            assert_eq!(written, 1);
            assert_eq!(std::fs::read(root.join("options.txt")).unwrap(), b"client");
        }
    }

    #[test]
    fn escaping_override_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("pack.mrpack");
        write_mrpack(
            &pack,
            &index(),
            &[
                ("overrides/fine.txt", b"fine"),
                ("overrides/../../escape.txt", b"evil"),
            ],
        );
        let root = dir.path().join("a/b/root");
        std::fs::create_dir_all(&root).unwrap();

        let err = extract_overrides(&pack, &root, &ProgressCallback::new()).unwrap_err();

        assert!(matches!(err, LauncherError::PathEscapesRoot { .. }));
        assert!(!root.join("fine.txt").exists());
        assert!(!dir.path().join("a/escape.txt").exists());
    }
}
