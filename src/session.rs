// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Who is logged in.
//!
//! The bearer token and a snapshot of the identity it was issued to are kept
//! in two separate storage records. The token's expiry claim is read without
//! verifying its signature; the server remains the only trust boundary.

use chrono::{DateTime, TimeZone as _, Utc};
use log::{debug, info, warn};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    api::model::{AuthResponse, Role},
    error::{self, Result},
    storage::Storage,
};

#[derive(Clone, Debug, Deserialize)]
#[serde(transparent)]
pub(crate) struct Token(SecretString);

impl Token {
    pub(crate) const fn secret(&self) -> &SecretString {
        &self.0
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.expose_secret())
    }
}

/// The identity snapshot persisted next to the token.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct Identity {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) role: Role,
}

#[derive(Clone, Debug)]
pub(crate) struct Session {
    pub(crate) subject_id: i64,
    pub(crate) display_name: String,
    pub(crate) email_address: String,
    pub(crate) role: Role,
    pub(crate) expires_at: DateTime<Utc>,
    token: Token,
}

impl Session {
    fn new(identity: Identity, token: Token, expires_at: DateTime<Utc>) -> Self {
        Self {
            subject_id: identity.id,
            display_name: identity.name,
            email_address: identity.email,
            role: identity.role,
            expires_at,
            token,
        }
    }

    pub(crate) fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub(crate) const fn token(&self) -> &SecretString {
        self.token.secret()
    }
}

/// Reads the `exp` claim from the payload segment of a JWT.
pub(crate) fn decode_expiry(token: &str) -> Result<DateTime<Utc>> {
    #[derive(Deserialize)]
    struct Claims {
        exp: Option<f64>,
    }

    let payload = token
        .split('.')
        .nth(1)
        .ok_or(error::Session::MalformedToken)?;
    let bytes = base64::decode_config(payload.trim_end_matches('='), base64::URL_SAFE_NO_PAD)
        .map_err(|e| {
            debug!("Token payload is not base64url: {}", e);
            error::Session::MalformedToken
        })?;
    let claims: Claims = serde_json::from_slice(&bytes).map_err(|e| {
        debug!("Token payload is not a JSON claim set: {}", e);
        error::Session::MalformedToken
    })?;

    // NumericDate may carry a fraction of a second.
    let exp = claims
        .exp
        .filter(|exp| exp.is_finite())
        .ok_or(error::Session::MissingClaim)?;
    // LINT: Out-of-range values are rejected by `timestamp_opt` below.
    #[allow(clippy::cast_possible_truncation)]
    let seconds = exp.trunc() as i64;
    Ok(Utc
        .timestamp_opt(seconds, 0)
        .single()
        .ok_or(error::Session::MissingClaim)?)
}

pub(crate) struct Store<T, U> {
    token: T,
    identity: U,
}

impl<T: Storage<Token>, U: Storage<Identity>> Store<T, U> {
    pub(crate) const fn new(token: T, identity: U) -> Self {
        Self { token, identity }
    }

    /// Whether the session will outlive this process.
    pub(crate) fn is_persistent(&self) -> bool {
        self.token.is_persistent() && self.identity.is_persistent()
    }

    /// Persists the result of a register or login exchange.
    ///
    /// Nothing is written unless the token's expiry can be read.
    pub(crate) async fn login(&mut self, auth: &AuthResponse) -> Result<Session> {
        let expires_at = decode_expiry(auth.token.expose_secret())?;
        let token = Token(auth.token.clone());
        let identity = Identity {
            id: auth.user_id,
            name: auth.name.clone(),
            email: auth.email.clone(),
            role: auth.role,
        };

        self.token.update(&token).await?;
        if let Err(e) = self.identity.update(&identity).await {
            if let Err(e) = self.token.clear().await {
                warn!("We could not remove a partially stored session: {}", e);
            }
            return Err(e);
        }

        info!("Logged in as {} until {}", identity.email, expires_at);
        Ok(Session::new(identity, token, expires_at))
    }

    pub(crate) async fn logout(&mut self) -> Result<()> {
        let token = self.token.clear().await;
        let identity = self.identity.clear().await;
        token.and(identity)
    }

    async fn read(&mut self) -> Result<Option<Session>> {
        let token = match self.token.get().await? {
            Some(token) => token,
            None => return Ok(None),
        };
        let expires_at = decode_expiry(token.secret().expose_secret())?;
        let identity = self
            .identity
            .get()
            .await?
            .ok_or(error::Session::MissingIdentity)?;

        Ok(Some(Session::new(identity, token, expires_at)))
    }

    /// The stored session, whether or not it has expired. Anything that
    /// prevents reading it is reported as no session.
    pub(crate) async fn current_session(&mut self) -> Option<Session> {
        self.read().await.unwrap_or_else(|e| {
            warn!("Ignoring unreadable stored session: {}", e);
            None
        })
    }

    pub(crate) async fn is_expired(&mut self) -> bool {
        self.is_expired_at(Utc::now()).await
    }

    pub(crate) async fn is_expired_at(&mut self, now: DateTime<Utc>) -> bool {
        self.current_session()
            .await
            .map_or(true, |session| session.is_expired_at(now))
    }

    pub(crate) async fn restore(&mut self) -> Option<Session> {
        self.restore_at(Utc::now()).await
    }

    /// Adopts the stored session if it is still valid at `now`, purging it
    /// otherwise.
    async fn adopt(&mut self, now: DateTime<Utc>) -> Result<Session> {
        let session = self
            .current_session()
            .await
            .ok_or(error::Session::NotAuthenticated)?;
        if !session.is_expired_at(now) {
            return Ok(session);
        }

        info!("Session expired at {}", session.expires_at);
        if let Err(e) = self.logout().await {
            warn!("We could not purge the expired session: {}", e);
        }
        Err(error::Session::Expired.into())
    }

    pub(crate) async fn restore_at(&mut self, now: DateTime<Utc>) -> Option<Session> {
        self.adopt(now).await.ok()
    }

    /// Like [`Store::restore`], but says why there is no session.
    pub(crate) async fn require(&mut self) -> Result<Session> {
        self.adopt(Utc::now()).await
    }
}
