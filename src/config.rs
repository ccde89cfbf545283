use anyhow::Context;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

/// OAuth provider credentials. The sign-in callback verifies identity
/// assertions against `client_secret` with `aud = client_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub issuer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub providers: Vec<ProviderConfig>,
    /// Origin of the image CDN; variant URLs must point here.
    pub cdn_base_url: Url,
    pub size_probe_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "nimbus".into()),
            audience: std::env::var("SESSION_AUDIENCE").unwrap_or_else(|_| "nimbus-web".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 30),
            cookie_name: std::env::var("SESSION_COOKIE")
                .unwrap_or_else(|_| "nimbus_session".into()),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };

        let providers = [
            ("github", "GITHUB_ID", "GITHUB_SECRET", "https://github.com"),
            ("google", "GOOGLE_ID", "GOOGLE_SECRET", "https://accounts.google.com"),
        ]
        .into_iter()
        .filter_map(|(name, id_var, secret_var, issuer)| {
            provider_from_env(name, id_var, secret_var, issuer)
        })
        .collect();

        let cdn_base_url = std::env::var("CDN_BASE_URL")?;
        let cdn_base_url = Url::parse(&cdn_base_url)
            .with_context(|| format!("invalid CDN_BASE_URL {}", cdn_base_url))?;

        let size_probe_timeout_secs = std::env::var("SIZE_PROBE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5);

        Ok(Self {
            database_url,
            session,
            providers,
            cdn_base_url,
            size_probe_timeout_secs,
        })
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }
}

// A provider is enabled only when both its id and secret are set and non-empty.
fn provider_from_env(
    name: &str,
    id_var: &str,
    secret_var: &str,
    default_issuer: &str,
) -> Option<ProviderConfig> {
    let client_id = std::env::var(id_var).ok().filter(|v| !v.is_empty())?;
    let client_secret = std::env::var(secret_var).ok().filter(|v| !v.is_empty())?;
    let issuer_var = format!("{}_ISSUER", name.to_uppercase());
    Some(ProviderConfig {
        name: name.to_string(),
        client_id,
        client_secret,
        issuer: std::env::var(issuer_var).unwrap_or_else(|_| default_issuer.into()),
    })
}
