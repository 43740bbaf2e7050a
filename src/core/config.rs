// ─── Launcher Config ───
// Runtime settings persisted as JSON. Missing file → defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::APP_USER_AGENT;

pub const CONFIG_FILE: &str = "launcher_core.json";

/// Remote services the installers talk to. Overridable for mirrors and tests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub version_manifest: String,
    pub resources: String,
    pub libraries: String,
    pub fabric_meta: String,
    pub quilt_meta: String,
    pub forge_maven: String,
    pub microsoft_authorize: String,
    pub microsoft_token: String,
    pub xbox_live_auth: String,
    pub xsts_authorize: String,
    pub minecraft_services: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            version_manifest: "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json"
                .into(),
            resources: "https://resources.download.minecraft.net".into(),
            libraries: "https://libraries.minecraft.net".into(),
            fabric_meta: "https://meta.fabricmc.net/v2".into(),
            quilt_meta: "https://meta.quiltmc.org/v3".into(),
            forge_maven: "https://maven.minecraftforge.net".into(),
            microsoft_authorize: "https://login.live.com/oauth20_authorize.srf".into(),
            microsoft_token: "https://login.live.com/oauth20_token.srf".into(),
            xbox_live_auth: "https://user.auth.xboxlive.com/user/authenticate".into(),
            xsts_authorize: "https://xsts.auth.xboxlive.com/xsts/authorize".into(),
            minecraft_services: "https://api.minecraftservices.com".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherConfig {
    pub user_agent: String,
    /// Maximum number of parallel library / asset downloads.
    pub concurrency: usize,
    /// Java used for Forge processors. `None` → `java` from `PATH`.
    pub java_executable: Option<PathBuf>,
    pub endpoints: Endpoints,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            user_agent: APP_USER_AGENT.into(),
            concurrency: 8,
            java_executable: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl LauncherConfig {
    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load_from(path: &Path) -> LauncherResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(LauncherError::io(path, e)),
        };

        serde_json::from_str(&raw).map_err(|e| LauncherError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn save_to(&self, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| LauncherError::io(path, e))
    }

    pub fn java_executable(&self) -> PathBuf {
        self.java_executable
            .clone()
            .unwrap_or_else(|| PathBuf::from("java"))
    }
}

/// The platform's default `.minecraft` directory.
pub fn default_minecraft_directory() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft")
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("minecraft")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft")
    }
}
