use super::index::{EnvSupport, InstallOptions, ManifestFile};

/// Files to download for a client install, in manifest order.
///
/// Required files (including those without an `env` block) are always kept,
/// optional ones only when selected, unsupported ones never.
pub fn filter_files<'a>(files: &'a [ManifestFile], options: &InstallOptions) -> Vec<&'a ManifestFile> {
    files
        .iter()
        .filter(|file| match file.client_support() {
            EnvSupport::Required => true,
            EnvSupport::Optional => options.optional_files.contains(&file.path),
            EnvSupport::Unsupported => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, env: Option<serde_json::Value>) -> ManifestFile {
        let mut value = serde_json::json!({
            "path": path,
            "hashes": {"sha1": "00"},
            "downloads": [format!("https://cdn/{path}")]
        });
        if let Some(env) = env {
            value["env"] = env;
        }
        serde_json::from_value(value).unwrap()
    }

    fn paths(files: &[&ManifestFile]) -> Vec<String> {
        files.iter().map(|f| f.path.clone()).collect()
    }

    fn sample() -> Vec<ManifestFile> {
        vec![
            file("mods/a.jar", None),
            file("mods/b.jar", Some(serde_json::json!({"client": "optional", "server": "required"}))),
            file("mods/c.jar", Some(serde_json::json!({"client": "required", "server": "optional"}))),
            file("mods/d.jar", Some(serde_json::json!({"client": "unsupported", "server": "required"}))),
            file("mods/e.jar", Some(serde_json::json!({"server": "required"}))),
        ]
    }

    #[test]
    fn required_and_envless_files_are_kept_in_order() {
        let files = sample();
        let kept = filter_files(&files, &InstallOptions::default());
        assert_eq!(paths(&kept), ["mods/a.jar", "mods/c.jar", "mods/e.jar"]);
    }

    #[test]
    fn selected_optional_file_keeps_its_position() {
        let files = sample();
        let options = InstallOptions::default().with_optional_file("mods/b.jar");
        let kept = filter_files(&files, &options);
        assert_eq!(
            paths(&kept),
            ["mods/a.jar", "mods/b.jar", "mods/c.jar", "mods/e.jar"]
        );
    }

    #[test]
    fn unsupported_is_never_selected() {
        let files = sample();
        let options = InstallOptions::default().with_optional_file("mods/d.jar");
        assert!(!paths(&filter_files(&files, &options)).contains(&"mods/d.jar".to_string()));
    }

    #[test]
    fn output_is_a_subset_of_input() {
        let files = sample();
        let options = InstallOptions::default()
            .with_optional_file("mods/b.jar")
            .with_optional_file("mods/not-in-pack.jar");
        let kept = filter_files(&files, &options);
        assert!(kept.len() <= files.len());
        assert!(kept
            .iter()
            .all(|k| files.iter().any(|f| std::ptr::eq(f, *k))));
    }
}
