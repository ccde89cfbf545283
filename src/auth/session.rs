use axum::extract::FromRef;
use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::{IdentityClaims, SessionClaims};
use crate::config::{ProviderConfig, SessionConfig};
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Signing keys and cookie settings for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl SessionKeys {
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
            cookie_name: cfg.cookie_name.clone(),
            cookie_secure: cfg.cookie_secure,
        }
    }

    pub fn sign(&self, email: &str, name: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + self.ttl;
        let claims = SessionClaims {
            sub: email.to_string(),
            name: name.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(email = %email, "session signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(self.ttl)
            .build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), "")).path("/").build()
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        SessionKeys::from_config(&state.config.session)
    }
}

/// Validate a provider identity assertion (HS256 over the client secret).
pub fn verify_identity(provider: &ProviderConfig, token: &str) -> anyhow::Result<IdentityClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(std::slice::from_ref(&provider.client_id));
    validation.set_issuer(std::slice::from_ref(&provider.issuer));
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
    let data = decode::<IdentityClaims>(
        token,
        &DecodingKey::from_secret(provider.client_secret.as_bytes()),
        &validation,
    )?;
    debug!(provider = %provider.name, sub = %data.claims.sub, "identity assertion verified");
    Ok(data.claims)
}


#[cfg(test)]
mod tests {
    use super::test_support::identity_token;
    use super::*;

    fn session_config(secret: &str, issuer: &str, audience: &str) -> SessionConfig {
        SessionConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
            cookie_name: "nimbus_session".into(),
            cookie_secure: false,
        }
    }

    fn provider() -> ProviderConfig {
        ProviderConfig {
            name: "github".into(),
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            issuer: "https://github.com".into(),
        }
    }

    #[test]
    fn sign_and_verify_session() {
        let keys = SessionKeys::from_config(&session_config("dev", "iss", "aud"));
        let token = keys.sign("ada@example.com", "Ada").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "ada@example.com");
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.iss, "iss");
        assert_eq!(claims.aud, "aud");
    }

    #[test]
    fn verify_rejects_other_audience() {
        let good = SessionKeys::from_config(&session_config("same", "iss", "aud"));
        let bad = SessionKeys::from_config(&session_config("same", "iss", "other-aud"));
        let token = good.sign("ada@example.com", "").expect("sign");
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_other_secret() {
        let good = SessionKeys::from_config(&session_config("one", "iss", "aud"));
        let bad = SessionKeys::from_config(&session_config("two", "iss", "aud"));
        let token = good.sign("ada@example.com", "").expect("sign");
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn session_cookie_is_http_only() {
        let keys = SessionKeys::from_config(&session_config("dev", "iss", "aud"));
        let cookie = keys.session_cookie("tok".into());
        assert_eq!(cookie.name(), "nimbus_session");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn identity_assertion_roundtrip() {
        let p = provider();
        let token = identity_token(&p, "client-secret", Some("ada@example.com"), Some("Ada"));
        let claims = verify_identity(&p, &token).expect("verify identity");
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
        assert_eq!(claims.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn identity_assertion_with_wrong_secret_is_rejected() {
        let p = provider();
        let token = identity_token(&p, "not-the-secret", Some("ada@example.com"), None);
        assert!(verify_identity(&p, &token).is_err());
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("ada @example.com"));
    }
}
