pub mod manifest;
pub mod version_file;

pub use manifest::{LatestVersions, VersionEntry, VersionManifest};
pub use version_file::{
    current_os_name, rules_allow, version_jar_path, version_json_path, versions_dir, Argument,
    ArgumentValue, Arguments, AssetIndexInfo, DownloadArtifact, LaunchFeatures, LibraryEntry,
    Rule, RuleAction, VersionJson,
};
