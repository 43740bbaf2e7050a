use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use super::context::InstallContext;
use super::vanilla::VanillaInstaller;
use crate::core::downloader::write_file;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::HttpFetch;
use crate::core::launch::get_classpath_separator;
use crate::core::maven::MavenArtifact;
use crate::core::paths::join_inside_root;
use crate::core::version::{version_jar_path, version_json_path, LibraryEntry, VersionJson};

/// Installs Forge from the official installer jar without running its GUI:
/// the embedded version JSON and libraries are unpacked directly and the
/// client-side processors are run with the configured Java.
pub struct ForgeInstaller;

/// `<maven>/net/minecraftforge/forge/<v>/forge-<v>-installer.jar`
pub fn forge_installer_url(forge_maven: &str, forge_version: &str) -> String {
    format!(
        "{}/net/minecraftforge/forge/{v}/forge-{v}-installer.jar",
        forge_maven.trim_end_matches('/'),
        v = forge_version
    )
}

/// Every Forge version published to `forge_maven`, as `<mc>-<forge>` strings.
pub async fn list_forge_versions(
    fetcher: &dyn HttpFetch,
    forge_maven: &str,
) -> LauncherResult<Vec<String>> {
    let url = format!(
        "{}/net/minecraftforge/forge/maven-metadata.xml",
        forge_maven.trim_end_matches('/')
    );
    let bytes = fetcher.get_bytes(&url).await?;
    let text = String::from_utf8(bytes)
        .map_err(|e| LauncherError::LoaderApi(format!("{} is not UTF-8: {}", url, e)))?;
    let metadata: MavenMetadata = quick_xml::de::from_str(&text)?;
    Ok(metadata.versioning.versions.version)
}

#[derive(Debug, Deserialize)]
struct MavenMetadata {
    versioning: Versioning,
}

#[derive(Debug, Deserialize)]
struct Versioning {
    versions: VersionList,
}

#[derive(Debug, Deserialize)]
struct VersionList {
    #[serde(default)]
    version: Vec<String>,
}

/// `install_profile.json` of installers from 1.12.2-14.23.5.2851 onwards.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModernInstallProfile {
    /// Entry holding the version JSON, e.g. `/version.json`.
    #[serde(default)]
    json: Option<String>,
    minecraft: String,
    #[serde(default)]
    libraries: Vec<LibraryEntry>,
    #[serde(default)]
    processors: Vec<ForgeProcessor>,
    #[serde(default)]
    data: HashMap<String, SidedValue>,
}

#[derive(Debug, Deserialize)]
struct SidedValue {
    client: String,
}

#[derive(Debug, Deserialize)]
struct ForgeProcessor {
    #[serde(default)]
    sides: Option<Vec<String>>,
    jar: String,
    #[serde(default)]
    classpath: Vec<String>,
    #[serde(default)]
    args: Vec<String>,
}

/// Older installers ship the version JSON inline plus a universal jar.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyInstallProfile {
    install: LegacyInstall,
    version_info: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyInstall {
    /// Maven coordinate the universal jar is stored under.
    path: String,
    /// Entry name of the universal jar inside the installer.
    file_path: String,
    #[serde(default)]
    minecraft: Option<String>,
}

impl ForgeInstaller {
    /// Install `forge_version` (`<mc>-<forge>[-<mc>]`). Returns the version
    /// id declared by the installer.
    pub async fn install(&self, ctx: &InstallContext<'_>, forge_version: &str) -> LauncherResult<String> {
        info!("Installing Forge {}", forge_version);

        let temp = tempfile::tempdir().map_err(|e| LauncherError::io(std::env::temp_dir(), e))?;
        let installer = temp
            .path()
            .join(format!("forge-{}-installer.jar", forge_version));
        let url = forge_installer_url(&ctx.config.endpoints.forge_maven, forge_version);
        ctx.downloader.download_file(&url, &installer, None).await?;

        let profile: serde_json::Value =
            serde_json::from_slice(&read_installer_entry(&installer, "install_profile.json")?)?;

        let version_id = if profile.get("versionInfo").is_some() {
            self.install_legacy(ctx, &installer, serde_json::from_value(profile)?)
                .await?
        } else {
            self.install_modern(ctx, &installer, temp.path(), serde_json::from_value(profile)?)
                .await?
        };

        info!("Forge {} installed successfully as {}", forge_version, version_id);
        Ok(version_id)
    }

    async fn install_modern(
        &self,
        ctx: &InstallContext<'_>,
        installer: &Path,
        work_dir: &Path,
        profile: ModernInstallProfile,
    ) -> LauncherResult<String> {
        let json_entry = profile
            .json
            .as_deref()
            .unwrap_or("/version.json")
            .trim_start_matches('/');
        let version_raw = read_installer_entry(installer, json_entry)?;
        let version: VersionJson = serde_json::from_slice(&version_raw)?;
        write_file(&version_json_path(ctx.minecraft_dir, &version.id), &version_raw).await?;

        let libs_dir = ctx.libraries_dir();
        let bundled = extract_prefix(installer, "maven/", &libs_dir)?;
        debug!("Extracted {} bundled Forge libraries", bundled);

        let mut entries = Vec::new();
        for lib in &profile.libraries {
            if let Some(job) = lib.artifact_download(&libs_dir, &ctx.config.endpoints.libraries)? {
                entries.push(job);
            }
        }
        entries.retain(|e| e.sha1.is_some() || !e.dest.exists());
        ctx.callback.set_status("Download Libraries");
        ctx.callback.set_max(entries.len() as u64);
        ctx.callback.set_progress(0);
        ctx.downloader.download_batch(entries, ctx.callback).await?;

        VanillaInstaller.install_local(ctx, &version.id).await?;

        extract_prefix(installer, "data/", &work_dir.join("data"))?;

        let mut vars = HashMap::new();
        for (key, value) in &profile.data {
            vars.insert(
                key.clone(),
                resolve_data_value(&value.client, &libs_dir, work_dir)?,
            );
        }
        let path_var = |p: PathBuf| p.to_string_lossy().to_string();
        vars.insert("SIDE".into(), "client".into());
        vars.insert(
            "MINECRAFT_JAR".into(),
            path_var(version_jar_path(ctx.minecraft_dir, &profile.minecraft)),
        );
        vars.insert("MINECRAFT_VERSION".into(), profile.minecraft.clone());
        vars.insert("INSTALLER".into(), path_var(installer.to_path_buf()));
        vars.insert("ROOT".into(), path_var(ctx.minecraft_dir.to_path_buf()));
        vars.insert("LIBRARY_DIR".into(), path_var(libs_dir.clone()));

        run_processors(ctx, &profile.processors, &vars, &libs_dir).await?;

        Ok(version.id)
    }

    async fn install_legacy(
        &self,
        ctx: &InstallContext<'_>,
        installer: &Path,
        profile: LegacyInstallProfile,
    ) -> LauncherResult<String> {
        let mut version_info = profile.version_info;
        let version_id = version_info
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| LauncherError::Loader("Forge versionInfo has no id".into()))?;

        // Full-jar installers do not inherit; point them at the vanilla jar.
        if let (Some(minecraft), Some(obj)) =
            (profile.install.minecraft.as_deref(), version_info.as_object_mut())
        {
            if !obj.contains_key("inheritsFrom") {
                obj.insert("inheritsFrom".into(), minecraft.into());
                obj.insert("jar".into(), minecraft.into());
            }
        }

        write_file(
            &version_json_path(ctx.minecraft_dir, &version_id),
            &serde_json::to_vec_pretty(&version_info)?,
        )
        .await?;

        let universal = read_installer_entry(installer, &profile.install.file_path)?;
        let dest = MavenArtifact::parse(&profile.install.path)?.library_path(&ctx.libraries_dir());
        write_file(&dest, &universal).await?;

        VanillaInstaller.install_local(ctx, &version_id).await?;
        Ok(version_id)
    }
}

async fn run_processors(
    ctx: &InstallContext<'_>,
    processors: &[ForgeProcessor],
    vars: &HashMap<String, String>,
    libs_dir: &Path,
) -> LauncherResult<()> {
    let client_side: Vec<&ForgeProcessor> = processors
        .iter()
        .filter(|p| {
            p.sides
                .as_ref()
                .map_or(true, |sides| sides.iter().any(|s| s == "client"))
        })
        .collect();
    if client_side.is_empty() {
        return Ok(());
    }

    let java = ctx.config.java_executable();
    ctx.callback.set_max(client_side.len() as u64);

    for (i, processor) in client_side.iter().enumerate() {
        ctx.callback
            .set_status(&format!("Running Processor {}", processor.jar));

        let jar_path = MavenArtifact::parse(&processor.jar)?.library_path(libs_dir);
        if !jar_path.exists() {
            return Err(LauncherError::Loader(format!(
                "Missing Forge processor JAR: {}",
                jar_path.display()
            )));
        }

        let mut classpath = vec![jar_path.to_string_lossy().to_string()];
        for coord in &processor.classpath {
            let path = MavenArtifact::parse(coord)?.library_path(libs_dir);
            classpath.push(path.to_string_lossy().to_string());
        }
        let classpath = classpath.join(get_classpath_separator());
        let main_class = read_main_class_from_jar(&jar_path)?;
        let args = processor
            .args
            .iter()
            .map(|arg| resolve_processor_arg(arg, vars, libs_dir))
            .collect::<LauncherResult<Vec<_>>>()?;

        info!("Running Forge processor {} ({})", processor.jar, main_class);

        let output = tokio::process::Command::new(&java)
            .arg("-cp")
            .arg(&classpath)
            .arg(&main_class)
            .args(&args)
            .current_dir(ctx.minecraft_dir)
            .output()
            .await
            .map_err(|e| LauncherError::JavaExecution(format!("{}: {}", java.display(), e)))?;

        if !output.status.success() {
            return Err(LauncherError::Loader(format!(
                "Forge processor {} failed (code {:?})\nSTDOUT:\n{}\nSTDERR:\n{}",
                processor.jar,
                output.status.code(),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        ctx.callback.set_progress(i as u64 + 1);
    }

    Ok(())
}

fn read_installer_entry(installer: &Path, name: &str) -> LauncherResult<Vec<u8>> {
    let file = std::fs::File::open(installer).map_err(|e| LauncherError::io(installer, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive
        .by_name(name)
        .map_err(|e| LauncherError::Loader(format!("Forge installer has no {}: {}", name, e)))?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Copy every file under `prefix` in the installer to `dest_root`, keeping the
/// relative layout. Returns how many files were written.
fn extract_prefix(installer: &Path, prefix: &str, dest_root: &Path) -> LauncherResult<usize> {
    let file = std::fs::File::open(installer).map_err(|e| LauncherError::io(installer, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.name().strip_prefix(prefix).map(str::to_string) else {
            continue;
        };

        let dest = join_inside_root(dest_root, &relative)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        std::fs::write(&dest, bytes).map_err(|e| LauncherError::io(&dest, e))?;
        written += 1;
    }

    Ok(written)
}

/// `[coord]` → library path, `'literal'` → literal, `/entry` → file extracted
/// from the installer into `work_dir`, anything else unchanged.
fn resolve_data_value(value: &str, libs_dir: &Path, work_dir: &Path) -> LauncherResult<String> {
    if let Some(coord) = value.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let path = MavenArtifact::parse(coord)?.library_path(libs_dir);
        return Ok(path.to_string_lossy().to_string());
    }
    if let Some(literal) = value.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return Ok(literal.to_string());
    }
    if let Some(entry) = value.strip_prefix('/') {
        let path = join_inside_root(work_dir, entry)?;
        return Ok(path.to_string_lossy().to_string());
    }
    Ok(value.to_string())
}

fn resolve_processor_arg(
    arg: &str,
    vars: &HashMap<String, String>,
    libs_dir: &Path,
) -> LauncherResult<String> {
    if let Some(coord) = arg.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let path = MavenArtifact::parse(coord)?.library_path(libs_dir);
        return Ok(path.to_string_lossy().to_string());
    }

    let mut out = arg.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    Ok(out)
}

fn read_main_class_from_jar(path: &Path) -> LauncherResult<String> {
    let file = std::fs::File::open(path).map_err(|e| LauncherError::io(path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut manifest = archive.by_name("META-INF/MANIFEST.MF").map_err(|e| {
        LauncherError::Loader(format!("Manifest not found in {}: {}", path.display(), e))
    })?;

    let mut text = String::new();
    manifest.read_to_string(&mut text)?;

    let mut main_class: Option<String> = None;
    let mut current_key: Option<String> = None;
    for line in text.lines() {
        // Manifest continuation lines start with a single space.
        if let Some(rest) = line.strip_prefix(' ') {
            if current_key.as_deref() == Some("Main-Class") {
                if let Some(value) = &mut main_class {
                    value.push_str(rest.trim_end());
                }
            }
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            current_key = Some(key.trim().to_string());
            if key.trim() == "Main-Class" {
                main_class = Some(value.trim().to_string());
            }
        }
    }

    main_class.ok_or_else(|| {
        LauncherError::Loader(format!(
            "Main-Class missing in processor jar {}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LauncherConfig;
    use crate::core::downloader::{sha1_hex, Downloader};
    use crate::core::progress::ProgressCallback;
    use crate::core::testing::{write_zip, MockFetcher};
    use std::sync::Arc;

    fn vanilla_fixture(fetcher: MockFetcher, id: &str) -> MockFetcher {
        let version = serde_json::json!({
            "id": id,
            "mainClass": "net.minecraft.client.main.Main",
            "libraries": []
        });
        let version_bytes = serde_json::to_vec(&version).unwrap();
        fetcher
            .with_json(
                "https://meta/manifest.json",
                &serde_json::json!({
                    "latest": {"release": id, "snapshot": id},
                    "versions": [{
                        "id": id, "type": "release",
                        "releaseTime": "2023-06-12T00:00:00+00:00",
                        "url": format!("https://meta/{id}.json"),
                        "sha1": sha1_hex(&version_bytes)
                    }]
                }),
            )
            .with_file(&format!("https://meta/{id}.json"), &version_bytes)
    }

    fn config() -> LauncherConfig {
        let mut config = LauncherConfig::default();
        config.endpoints.version_manifest = "https://meta/manifest.json".into();
        config.endpoints.forge_maven = "https://forge".into();
        config
    }

    #[test]
    fn installer_url_layout() {
        assert_eq!(
            forge_installer_url("https://maven.minecraftforge.net/", "1.20.1-47.1.0"),
            "https://maven.minecraftforge.net/net/minecraftforge/forge/1.20.1-47.1.0/forge-1.20.1-47.1.0-installer.jar"
        );
    }

    #[tokio::test]
    async fn lists_versions_from_maven_metadata() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>net.minecraftforge</groupId>
  <artifactId>forge</artifactId>
  <versioning>
    <latest>1.20.1-47.1.0</latest>
    <release>1.20.1-47.1.0</release>
    <versions>
      <version>1.20.1-47.1.0</version>
      <version>1.7.10-10.13.4.1614-1.7.10</version>
    </versions>
    <lastUpdated>20230801000000</lastUpdated>
  </versioning>
</metadata>"#;
        let fetcher = MockFetcher::new().with_file(
            "https://forge/net/minecraftforge/forge/maven-metadata.xml",
            xml.as_bytes(),
        );

        let versions = list_forge_versions(&fetcher, "https://forge").await.unwrap();
        assert_eq!(versions, ["1.20.1-47.1.0", "1.7.10-10.13.4.1614-1.7.10"]);
    }

    #[test]
    fn data_values_and_processor_args() {
        let libs = Path::new("/mc/libraries");
        let work = tempfile::tempdir().unwrap();

        let mapped = resolve_data_value(
            "[de.oceanlabs.mcp:mcp_config:1.20.1@zip]",
            libs,
            work.path(),
        )
        .unwrap();
        assert_eq!(
            PathBuf::from(mapped),
            libs.join("de/oceanlabs/mcp/mcp_config/1.20.1/mcp_config-1.20.1.zip")
        );
        assert_eq!(resolve_data_value("'abc123'", libs, work.path()).unwrap(), "abc123");
        assert!(resolve_data_value("/data/client.lzma", libs, work.path())
            .unwrap()
            .ends_with("client.lzma"));
        assert!(matches!(
            resolve_data_value("/../escape", libs, work.path()),
            Err(LauncherError::PathEscapesRoot { .. })
        ));

        let vars = HashMap::from([("SIDE".to_string(), "client".to_string())]);
        assert_eq!(
            resolve_processor_arg("--side={SIDE}", &vars, libs).unwrap(),
            "--side=client"
        );
        assert_eq!(
            PathBuf::from(resolve_processor_arg("[net.minecraftforge:installertools:1.3.0]", &vars, libs).unwrap()),
            libs.join("net/minecraftforge/installertools/1.3.0/installertools-1.3.0.jar")
        );
    }

    #[test]
    fn main_class_with_continuation_line() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("tool.jar");
        write_zip(
            &jar,
            &[(
                "META-INF/MANIFEST.MF",
                b"Manifest-Version: 1.0\r\nMain-Class: net.minecraftforge.installertools.Con\r\n soleTool\r\n",
            )],
        );

        assert_eq!(
            read_main_class_from_jar(&jar).unwrap(),
            "net.minecraftforge.installertools.ConsoleTool"
        );
    }

    #[tokio::test]
    async fn modern_installer_without_processors() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = tempfile::tempdir().unwrap();
        let installer = fixtures.path().join("installer.jar");

        let version = serde_json::json!({
            "id": "1.20.1-forge-47.1.0",
            "inheritsFrom": "1.20.1",
            "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
            "libraries": [{
                "name": "net.minecraftforge:forge:1.20.1-47.1.0:universal",
                "downloads": {"artifact": {
                    "path": "net/minecraftforge/forge/1.20.1-47.1.0/forge-1.20.1-47.1.0-universal.jar",
                    "url": "", "sha1": "", "size": 0
                }}
            }]
        });
        let profile = serde_json::json!({
            "json": "/version.json",
            "minecraft": "1.20.1",
            "libraries": [],
            "processors": [],
            "data": {}
        });
        write_zip(
            &installer,
            &[
                ("install_profile.json", &serde_json::to_vec(&profile).unwrap()),
                ("version.json", &serde_json::to_vec(&version).unwrap()),
                ("maven/", b""),
                (
                    "maven/net/minecraftforge/forge/1.20.1-47.1.0/forge-1.20.1-47.1.0-universal.jar",
                    b"universal",
                ),
            ],
        );

        let fetcher = vanilla_fixture(MockFetcher::new(), "1.20.1").with_file(
            "https://forge/net/minecraftforge/forge/1.20.1-47.1.0/forge-1.20.1-47.1.0-installer.jar",
            &std::fs::read(&installer).unwrap(),
        );
        let downloader = Downloader::new(Arc::new(fetcher));
        let config = config();
        let callback = ProgressCallback::new();
        let ctx = InstallContext {
            minecraft_dir: dir.path(),
            downloader: &downloader,
            config: &config,
            callback: &callback,
        };

        let id = ForgeInstaller.install(&ctx, "1.20.1-47.1.0").await.unwrap();

        assert_eq!(id, "1.20.1-forge-47.1.0");
        assert!(version_json_path(dir.path(), "1.20.1-forge-47.1.0").is_file());
        assert!(version_json_path(dir.path(), "1.20.1").is_file());
        assert_eq!(
            std::fs::read(dir.path().join(
                "libraries/net/minecraftforge/forge/1.20.1-47.1.0/forge-1.20.1-47.1.0-universal.jar"
            ))
            .unwrap(),
            b"universal"
        );
    }

    #[tokio::test]
    async fn legacy_installer_extracts_universal_jar() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = tempfile::tempdir().unwrap();
        let installer = fixtures.path().join("installer.jar");

        let profile = serde_json::json!({
            "install": {
                "path": "net.minecraftforge:forge:1.7.10-10.13.4.1614-1.7.10",
                "filePath": "forge-1.7.10-10.13.4.1614-1.7.10-universal.jar",
                "minecraft": "1.7.10"
            },
            "versionInfo": {
                "id": "1.7.10-Forge10.13.4.1614-1.7.10",
                "mainClass": "net.minecraft.launchwrapper.Launch",
                "minecraftArguments": "--username ${auth_player_name} --tweakClass cpw.mods.fml.common.launcher.FMLTweaker",
                "libraries": [{
                    "name": "net.minecraftforge:forge:1.7.10-10.13.4.1614-1.7.10",
                    "url": "https://forge/"
                }]
            }
        });
        write_zip(
            &installer,
            &[
                ("install_profile.json", &serde_json::to_vec(&profile).unwrap()),
                ("forge-1.7.10-10.13.4.1614-1.7.10-universal.jar", b"universal"),
            ],
        );

        let fetcher = vanilla_fixture(MockFetcher::new(), "1.7.10").with_file(
            "https://forge/net/minecraftforge/forge/1.7.10-10.13.4.1614-1.7.10/forge-1.7.10-10.13.4.1614-1.7.10-installer.jar",
            &std::fs::read(&installer).unwrap(),
        );
        let downloader = Downloader::new(Arc::new(fetcher));
        let config = config();
        let callback = ProgressCallback::new();
        let ctx = InstallContext {
            minecraft_dir: dir.path(),
            downloader: &downloader,
            config: &config,
            callback: &callback,
        };

        let id = ForgeInstaller
            .install(&ctx, "1.7.10-10.13.4.1614-1.7.10")
            .await
            .unwrap();

        assert_eq!(id, "1.7.10-Forge10.13.4.1614-1.7.10");
        assert_eq!(
            std::fs::read(dir.path().join(
                "libraries/net/minecraftforge/forge/1.7.10-10.13.4.1614-1.7.10/forge-1.7.10-10.13.4.1614-1.7.10.jar"
            ))
            .unwrap(),
            b"universal"
        );
        let merged = VersionJson::load_installed(dir.path(), &id).unwrap();
        assert_eq!(merged.jar_id(), "1.7.10");
        assert_eq!(merged.main_class, "net.minecraft.launchwrapper.Launch");
    }
}
