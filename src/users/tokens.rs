use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::{AccessClaims, RefreshClaims, TokenKind};
use super::model::User;
use crate::{config::TokenConfig, state::AppState};

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeyPair {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Signs and verifies bearer tokens; access and refresh use separate secrets.
#[derive(Clone)]
pub struct TokenIssuer {
    access: KeyPair,
    refresh: KeyPair,
    issuer: String,
    audience: String,
}

impl From<&TokenConfig> for TokenIssuer {
    fn from(cfg: &TokenConfig) -> Self {
        Self {
            access: KeyPair::new(&cfg.access_token_secret, cfg.access_token_expiry),
            refresh: KeyPair::new(&cfg.refresh_token_secret, cfg.refresh_token_expiry),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.tokens)
    }
}

impl TokenIssuer {
    fn window(ttl: Duration) -> (usize, usize) {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        (now.unix_timestamp() as usize, exp.unix_timestamp() as usize)
    }

    pub fn sign_access(&self, user: &User) -> anyhow::Result<String> {
        let (iat, exp) = Self::window(self.access.ttl);
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind: TokenKind::Access,
        };
        let token = encode(&Header::default(), &claims, &self.access.encoding)?;
        debug!(user_id = %user.id, "access token signed");
        Ok(token)
    }

    pub fn sign_refresh(&self, user: &User) -> anyhow::Result<String> {
        let (iat, exp) = Self::window(self.refresh.ttl);
        let claims = RefreshClaims {
            sub: user.id,
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind: TokenKind::Refresh,
        };
        let token = encode(&Header::default(), &claims, &self.refresh.encoding)?;
        debug!(user_id = %user.id, "refresh token signed");
        Ok(token)
    }

    fn verify<C: DeserializeOwned>(&self, token: &str, key: &DecodingKey) -> anyhow::Result<C> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        Ok(decode::<C>(token, key, &validation)?.claims)
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<AccessClaims> {
        let claims: AccessClaims = self.verify(token, &self.access.decoding)?;
        if claims.kind != TokenKind::Access {
            anyhow::bail!("not an access token");
        }
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<RefreshClaims> {
        let claims: RefreshClaims = self.verify(token, &self.refresh.decoding)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}
