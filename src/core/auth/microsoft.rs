// ─── Microsoft account ───
// OAuth code → Microsoft token → Xbox Live → XSTS → Minecraft services.
// The caller opens `login_url()` and hands back the redirect URL.

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::{AccountMode, LaunchAccountProfile, AZURE_CLIENT_ID_FALLBACK};
use crate::core::config::{Endpoints, LauncherConfig};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;

pub const DESKTOP_REDIRECT_URI: &str = "https://login.live.com/oauth20_desktop.srf";
const SCOPE: &str = "service::user.auth.xboxlive.com::MBI_SSL";

#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XboxToken {
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "DisplayClaims")]
    pub display_claims: DisplayClaims,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayClaims {
    #[serde(default)]
    pub xui: Vec<XuiClaim>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XuiClaim {
    pub uhs: String,
    #[serde(default)]
    pub xid: Option<String>,
}

impl XboxToken {
    pub fn user_hash(&self) -> LauncherResult<&str> {
        self.display_claims
            .xui
            .first()
            .map(|claim| claim.uhs.as_str())
            .ok_or_else(|| LauncherError::Auth("Xbox response carries no user hash".into()))
    }

    fn xuid(&self) -> Option<&str> {
        self.display_claims
            .xui
            .first()
            .and_then(|claim| claim.xid.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinecraftToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinecraftProfile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct Entitlements {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Result of a complete login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MicrosoftSession {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    /// Microsoft refresh token; feed it to `MicrosoftAuthenticator::complete_refresh`.
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub xuid: String,
}

impl MicrosoftSession {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl From<&MicrosoftSession> for LaunchAccountProfile {
    fn from(session: &MicrosoftSession) -> Self {
        LaunchAccountProfile {
            mode: AccountMode::Microsoft,
            username: session.username.clone(),
            uuid: session.uuid.clone(),
            access_token: session.access_token.clone(),
            xuid: session.xuid.clone(),
            user_type: "msa".into(),
            client_id: AZURE_CLIENT_ID_FALLBACK.into(),
        }
        .sanitized()
    }
}

pub struct MicrosoftAuthenticator {
    client: Client,
    endpoints: Endpoints,
    client_id: String,
    redirect_uri: String,
}

impl MicrosoftAuthenticator {
    pub fn new(config: &LauncherConfig) -> LauncherResult<Self> {
        Ok(Self::with_client(
            build_http_client(&config.user_agent)?,
            config.endpoints.clone(),
        ))
    }

    pub fn with_client(client: Client, endpoints: Endpoints) -> Self {
        Self {
            client,
            endpoints,
            client_id: AZURE_CLIENT_ID_FALLBACK.into(),
            redirect_uri: DESKTOP_REDIRECT_URI.into(),
        }
    }

    /// Use a registered Azure application instead of the public client id.
    pub fn with_application(mut self, client_id: &str, redirect_uri: &str) -> Self {
        self.client_id = client_id.to_string();
        self.redirect_uri = redirect_uri.to_string();
        self
    }

    /// The page the user signs in on.
    pub fn login_url(&self) -> LauncherResult<String> {
        let url = url::Url::parse_with_params(
            &self.endpoints.microsoft_authorize,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_mode", "query"),
                ("scope", SCOPE),
            ],
        )
        .map_err(|e| LauncherError::Auth(format!("invalid authorize endpoint: {}", e)))?;
        Ok(url.into())
    }

    /// Pull the `code` query parameter out of the redirect URL.
    pub fn extract_code(redirect_url: &str) -> LauncherResult<String> {
        let url = url::Url::parse(redirect_url)
            .map_err(|e| LauncherError::Auth(format!("invalid redirect URL: {}", e)))?;
        url.query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| LauncherError::Auth("redirect URL carries no code".into()))
    }

    pub async fn exchange_code(&self, code: &str) -> LauncherResult<MicrosoftToken> {
        self.token_request(&[("code", code), ("grant_type", "authorization_code")])
            .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> LauncherResult<MicrosoftToken> {
        self.token_request(&[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn token_request(&self, grant: &[(&str, &str)]) -> LauncherResult<MicrosoftToken> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", SCOPE),
        ];
        form.extend_from_slice(grant);

        let response = self
            .client
            .post(&self.endpoints.microsoft_token)
            .form(&form)
            .send()
            .await?;
        read_json(response, "Microsoft token").await
    }

    pub async fn xbox_live(&self, ms_access_token: &str) -> LauncherResult<XboxToken> {
        let body = json!({
            "Properties": {
                "AuthMethod": "RPS",
                "SiteName": "user.auth.xboxlive.com",
                "RpsTicket": ms_access_token
            },
            "RelyingParty": "http://auth.xboxlive.com",
            "TokenType": "JWT"
        });
        let response = self
            .client
            .post(&self.endpoints.xbox_live_auth)
            .json(&body)
            .send()
            .await?;
        read_json(response, "Xbox Live").await
    }

    pub async fn xsts(&self, xbl_token: &str) -> LauncherResult<XboxToken> {
        let body = json!({
            "Properties": {
                "SandboxId": "RETAIL",
                "UserTokens": [xbl_token]
            },
            "RelyingParty": "rp://api.minecraftservices.com/",
            "TokenType": "JWT"
        });
        let response = self
            .client
            .post(&self.endpoints.xsts_authorize)
            .json(&body)
            .send()
            .await?;
        read_json(response, "XSTS").await
    }

    pub async fn minecraft_login(&self, xsts_token: &str, uhs: &str) -> LauncherResult<MinecraftToken> {
        let body = json!({ "identityToken": format!("XBL3.0 x={};{}", uhs, xsts_token) });
        let response = self
            .client
            .post(self.services_url("/authentication/login_with_xbox"))
            .json(&body)
            .send()
            .await?;
        read_json(response, "Minecraft login").await
    }

    /// `AccountNotOwnMinecraft` when the store lists no entitlement.
    pub async fn ensure_owns_minecraft(&self, minecraft_token: &str) -> LauncherResult<()> {
        let response = self
            .client
            .get(self.services_url("/entitlements/mcstore"))
            .bearer_auth(minecraft_token)
            .send()
            .await?;
        let entitlements: Entitlements = read_json(response, "Entitlements").await?;
        if entitlements.items.is_empty() {
            return Err(LauncherError::AccountNotOwnMinecraft);
        }
        Ok(())
    }

    pub async fn profile(&self, minecraft_token: &str) -> LauncherResult<MinecraftProfile> {
        let response = self
            .client
            .get(self.services_url("/minecraft/profile"))
            .bearer_auth(minecraft_token)
            .send()
            .await?;
        read_json(response, "Minecraft profile").await
    }

    /// Run the whole chain for an authorization code.
    pub async fn complete_login(&self, code: &str) -> LauncherResult<MicrosoftSession> {
        let token = self.exchange_code(code).await?;
        self.finish(token).await
    }

    /// Run the whole chain again from a stored refresh token.
    pub async fn complete_refresh(&self, refresh_token: &str) -> LauncherResult<MicrosoftSession> {
        let mut token = self.refresh(refresh_token).await?;
        if token.refresh_token.is_empty() {
            token.refresh_token = refresh_token.to_string();
        }
        self.finish(token).await
    }

    async fn finish(&self, token: MicrosoftToken) -> LauncherResult<MicrosoftSession> {
        let xbl = self.xbox_live(&token.access_token).await?;
        let uhs = xbl.user_hash()?.to_string();
        let xsts = self.xsts(&xbl.token).await?;
        debug!("XSTS token obtained");

        let minecraft = self.minecraft_login(&xsts.token, &uhs).await?;
        self.ensure_owns_minecraft(&minecraft.access_token).await?;
        let profile = self.profile(&minecraft.access_token).await?;
        info!("Signed in as {}", profile.name);

        let uuid = uuid::Uuid::parse_str(&profile.id)
            .map(|id| id.to_string())
            .unwrap_or(profile.id);

        Ok(MicrosoftSession {
            username: profile.name,
            uuid,
            access_token: minecraft.access_token,
            refresh_token: token.refresh_token,
            expires_at: expiry_after(Utc::now(), minecraft.expires_in),
            xuid: xsts.xuid().or(xbl.xuid()).unwrap_or("0").to_string(),
        })
    }

    fn services_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.minecraft_services.trim_end_matches('/'), path)
    }
}

/// `now + expires_in` seconds, saturating at the latest representable time.
fn expiry_after(now: DateTime<Utc>, expires_in: u64) -> DateTime<Utc> {
    i64::try_from(expires_in)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

async fn read_json<T: DeserializeOwned>(response: Response, step: &str) -> LauncherResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LauncherError::Auth(format!(
            "{} request failed with HTTP {}: {}",
            step,
            status.as_u16(),
            body
        )));
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    fn authenticator(server: &ServerGuard) -> MicrosoftAuthenticator {
        let base = server.url();
        let endpoints = Endpoints {
            microsoft_authorize: format!("{base}/authorize"),
            microsoft_token: format!("{base}/token"),
            xbox_live_auth: format!("{base}/xbl"),
            xsts_authorize: format!("{base}/xsts"),
            minecraft_services: base.clone(),
            ..Endpoints::default()
        };
        MicrosoftAuthenticator::with_client(Client::new(), endpoints)
    }

    async fn mock_xbox(server: &mut ServerGuard) {
        server
            .mock("POST", "/xbl")
            .match_body(Matcher::PartialJson(json!({
                "Properties": {"RpsTicket": "ms-access"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Token":"xbl-token","DisplayClaims":{"xui":[{"uhs":"hash"}]}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/xsts")
            .match_body(Matcher::PartialJson(json!({
                "Properties": {"UserTokens": ["xbl-token"]}
            })))
            .with_status(200)
            .with_body(r#"{"Token":"xsts-token","DisplayClaims":{"xui":[{"uhs":"hash","xid":"2535"}]}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/authentication/login_with_xbox")
            .match_body(Matcher::Json(json!({"identityToken": "XBL3.0 x=hash;xsts-token"})))
            .with_status(200)
            .with_body(r#"{"access_token":"mc-token","expires_in":86400}"#)
            .create_async()
            .await;
    }

    #[test]
    fn login_url_carries_client_and_redirect() {
        let auth = MicrosoftAuthenticator::with_client(Client::new(), Endpoints::default());
        let url = url::Url::parse(&auth.login_url().unwrap()).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(params["client_id"], AZURE_CLIENT_ID_FALLBACK);
        assert_eq!(params["redirect_uri"], DESKTOP_REDIRECT_URI);
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], SCOPE);
    }

    #[test]
    fn extract_code_from_redirect() {
        let code = MicrosoftAuthenticator::extract_code(
            "https://login.live.com/oauth20_desktop.srf?code=M.R3_abc&lc=1033",
        )
        .unwrap();
        assert_eq!(code, "M.R3_abc");

        assert!(matches!(
            MicrosoftAuthenticator::extract_code("https://login.live.com/oauth20_desktop.srf?error=access_denied"),
            Err(LauncherError::Auth(_))
        ));
    }

    #[test]
    fn expiry_saturates_on_huge_lifetimes() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, 86400), now + Duration::hours(24));
        assert_eq!(expiry_after(now, i64::MAX as u64), DateTime::<Utc>::MAX_UTC);
        assert_eq!(expiry_after(now, u64::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test]
    async fn complete_login_builds_session() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("code".into(), "auth-code".into()),
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"ms-access","refresh_token":"ms-refresh","expires_in":3600}"#)
            .create_async()
            .await;
        mock_xbox(&mut server).await;
        server
            .mock("GET", "/entitlements/mcstore")
            .match_header("authorization", "Bearer mc-token")
            .with_status(200)
            .with_body(r#"{"items":[{"name":"game_minecraft"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/minecraft/profile")
            .match_header("authorization", "Bearer mc-token")
            .with_status(200)
            .with_body(r#"{"id":"069a79f444e94726a5befca90e38aaf5","name":"Notch"}"#)
            .create_async()
            .await;

        let session = authenticator(&server).complete_login("auth-code").await.unwrap();

        assert_eq!(session.username, "Notch");
        assert_eq!(session.uuid, "069a79f4-44e9-4726-a5be-fca90e38aaf5");
        assert_eq!(session.access_token, "mc-token");
        assert_eq!(session.refresh_token, "ms-refresh");
        assert_eq!(session.xuid, "2535");
        assert!(!session.is_expired());

        let profile = LaunchAccountProfile::from(&session);
        assert_eq!(profile.mode, AccountMode::Microsoft);
        assert_eq!(profile.user_type, "msa");
        assert_eq!(profile.access_token, "mc-token");
    }

    #[tokio::test]
    async fn empty_entitlements_means_not_owned() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/entitlements/mcstore")
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create_async()
            .await;

        let err = authenticator(&server)
            .ensure_owns_minecraft("mc-token")
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::AccountNotOwnMinecraft));
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token_when_none_returned() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
            .with_status(200)
            .with_body(r#"{"access_token":"ms-access","expires_in":3600}"#)
            .create_async()
            .await;
        mock_xbox(&mut server).await;
        server
            .mock("GET", "/entitlements/mcstore")
            .with_status(200)
            .with_body(r#"{"items":[{}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/minecraft/profile")
            .with_status(200)
            .with_body(r#"{"id":"069a79f444e94726a5befca90e38aaf5","name":"Notch"}"#)
            .create_async()
            .await;

        let session = authenticator(&server).complete_refresh("old-refresh").await.unwrap();
        assert_eq!(session.refresh_token, "old-refresh");
    }

    #[tokio::test]
    async fn rejected_xsts_is_auth_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/xsts")
            .with_status(401)
            .with_body(r#"{"XErr":2148916233}"#)
            .create_async()
            .await;

        let err = authenticator(&server).xsts("xbl-token").await.unwrap_err();
        match err {
            LauncherError::Auth(reason) => assert!(reason.contains("2148916233")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
