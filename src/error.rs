// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::BTreeMap, convert::Infallible, io, result};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::channel::stomp;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("WebSocket error: {0}")]
    Websocket(tokio_tungstenite::tungstenite::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("data conversion error: {0}")]
    Conversion(#[from] Conversion),
    #[error("API error: {0}")]
    Api(#[from] Api),
    #[error("session error: {0}")]
    Session(#[from] Session),
    #[error("STOMP framing error: {0}")]
    Stomp(#[from] Stomp),
    #[error("live update channel error: {0}")]
    Channel(#[from] Channel),
    #[error("storage error: {0}")]
    Storage(#[from] Storage),
    #[error("password retrieval error: {0}")]
    Password(#[from] Password),
    #[error("internal communication error: {0}")]
    Internal(#[from] Internal),
    #[error("command execution failed")]
    Command,
    #[error("operation cancelled")]
    Cancelled,
}

impl From<pinentry::Error> for Error {
    fn from(value: pinentry::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(
            clippy::wildcard_enum_match_arm,
            clippy::match_wildcard_for_single_variants
        )]
        match value {
            pinentry::Error::Cancelled | pinentry::Error::Timeout => Self::Cancelled,
            pinentry::Error::Io(e) => Self::Io(e),
            pinentry::Error::Encoding(e) => Self::Conversion(Conversion::Encoding(e)),
            _ => Self::Password(Password::Pinentry(value)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value {
            tokio_tungstenite::tungstenite::Error::Io(e) => Self::Io(e),
            _ => Self::Websocket(value),
        }
    }
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

#[derive(Error, Debug)]
pub(crate) enum Conversion {
    #[error("unexpected non-UTF-8-encoded bytes in input: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("URL {0} cannot be used as a base for API requests")]
    BaseUrl(url::Url),
}

#[derive(Error, Debug)]
pub(crate) enum Api {
    #[error("{message}: {}", Self::join_fields(.fields))]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },
    #[error("server responded with status {status}: {message}")]
    Server { status: u16, message: String },
    #[error("server declined the request: {0}")]
    Rejected(String),
    #[error("server response did not contain any data")]
    MissingData,
}

impl Api {
    /// Joins field-level validation errors into a single line, in field name
    /// order.
    pub(crate) fn join_fields(fields: &BTreeMap<String, String>) -> String {
        fields.values().map(String::as_str).collect::<Vec<_>>().join(", ")
    }

    /// The message the server gave for the failure, without any HTTP status
    /// decoration.
    pub(crate) fn server_message(&self) -> Option<&str> {
        match *self {
            Self::Validation { ref message, .. }
            | Self::Server { ref message, .. }
            | Self::Rejected(ref message) => Some(message),
            Self::MissingData => None,
        }
    }
}

#[derive(Error, Debug)]
pub(crate) enum Session {
    #[error("token is not a well-formed JWT")]
    MalformedToken,
    #[error("token payload has no usable expiry claim")]
    MissingClaim,
    #[error("no identity is stored alongside the token")]
    MissingIdentity,
    #[error("you are not logged in")]
    NotAuthenticated,
    #[error("your session has expired, please log in again")]
    Expired,
}

#[derive(Error, Debug)]
pub(crate) enum Stomp {
    #[error("frame has no command line")]
    MissingCommand,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("malformed header line {0:?}")]
    MalformedHeader(String),
    #[error("invalid escape sequence in header {0:?}")]
    InvalidEscape(String),
    #[error("frame is not terminated by a NUL octet")]
    MissingTerminator,
    #[error("content-length header {0:?} does not match the frame body")]
    ContentLength(String),
}

#[derive(Error, Debug)]
pub(crate) enum Channel {
    #[error("server stream terminated")]
    StreamEnded,
    #[error("server rejected the connection: {0}")]
    Rejected(String),
    #[error("server sent a frame that we did not expect to receive: {0}")]
    UnexpectedFrame(stomp::Command),
}

#[derive(Error, Debug)]
pub(crate) enum Storage {
    #[error("no per-user data directory is available on this system")]
    NoProjectDirs,
    #[cfg(feature = "secret-service")]
    #[error("secret service error: {0}")]
    SecretService(#[from] oo7::Error),
    #[cfg(feature = "keychain")]
    #[error("keychain error: {0}")]
    Keychain(#[from] security_framework::base::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Password {
    #[error("no password prompt available")]
    NoPrompt,
    #[error("the passwords do not match")]
    Mismatch,
    #[error("Pinentry implementation error: {0}")]
    Pinentry(pinentry::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Internal {
    #[error("channel is closed")]
    ChannelClosed,
}

impl<T> From<mpsc::error::SendError<T>> for Internal {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        Self::ChannelClosed
    }
}
