// ─── Accounts ───
// The identity handed to the launch command: offline profiles derived from a
// player name, or Microsoft sessions obtained through `microsoft`.

pub mod microsoft;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

pub use microsoft::{MicrosoftAuthenticator, MicrosoftSession, MicrosoftToken, XboxToken};

pub const AZURE_CLIENT_ID_FALLBACK: &str = "00000000402b5328";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    Offline,
    Microsoft,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaunchAccountProfile {
    pub mode: AccountMode,
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub xuid: String,
    pub user_type: String,
    pub client_id: String,
}

impl Default for LaunchAccountProfile {
    fn default() -> Self {
        Self::offline("Player")
    }
}

/// Name-based (MD5, version 3) UUID of `OfflinePlayer:<name>`, the id a
/// vanilla server in offline mode assigns to that player.
pub fn offline_uuid(username: &str) -> uuid::Uuid {
    let digest: [u8; 16] = Md5::digest(format!("OfflinePlayer:{}", username).as_bytes()).into();
    uuid::Builder::from_md5_bytes(digest).into_uuid()
}

impl LaunchAccountProfile {
    pub fn offline(username: &str) -> Self {
        let username = username.trim();
        Self {
            mode: AccountMode::Offline,
            username: username.to_string(),
            uuid: offline_uuid(username).to_string(),
            access_token: "offline_access_token".into(),
            xuid: "0".into(),
            user_type: "legacy".into(),
            client_id: AZURE_CLIENT_ID_FALLBACK.into(),
        }
    }

    /// Fill blank fields with values the game accepts.
    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = "Player".into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = offline_uuid(&self.username).to_string();
        }
        if self.access_token.trim().is_empty() {
            self.access_token = "offline_access_token".into();
        }
        if self.xuid.trim().is_empty() {
            self.xuid = "0".into();
        }
        if self.user_type.trim().is_empty() {
            self.user_type = match self.mode {
                AccountMode::Offline => "legacy".into(),
                AccountMode::Microsoft => "msa".into(),
            };
        }
        if self.client_id.trim().is_empty() {
            self.client_id = AZURE_CLIENT_ID_FALLBACK.into();
        }
        self
    }
}
