// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Typed access to the order management REST API.
//!
//! Every endpoint is a plain value that converts into a [`Request`] and
//! implements [`Executor`] to name the type found in the `data` field of the
//! response envelope.

pub(crate) mod auth;
pub(crate) mod model;
pub(crate) mod orders;
pub(crate) mod partners;

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::debug;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::{
    error::{self, Result},
    metadata,
};

/// Page size used when the caller does not ask for one.
pub(crate) const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Request {
    method: Method,
    path: Vec<String>,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
}

impl Request {
    pub(crate) fn new<I, S>(method: Method, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            method,
            path: path.into_iter().map(|segment| segment.to_string()).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Adds a query parameter, skipping it entirely when there is no value.
    pub(crate) fn with_query<V: ToString>(mut self, name: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.query.push((name, v.to_string()));
        }
        self
    }

    pub(crate) fn with_body<B: Serialize>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub(crate) fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) const fn method(&self) -> &Method {
        &self.method
    }

    pub(crate) fn path(&self) -> &[String] {
        &self.path
    }

    pub(crate) fn query(&self) -> &[(&'static str, String)] {
        &self.query
    }

    pub(crate) const fn body(&self) -> &Option<serde_json::Value> {
        &self.body
    }
}

/// The `{ success, message, data }` wrapper around every successful response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    message: Option<String>,
    data: Option<T>,
}

/// The body of a failed response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Failure {
    error: Option<String>,
    message: Option<String>,
    field_errors: Option<BTreeMap<String, String>>,
}

impl Failure {
    fn into_error(self, status: StatusCode) -> error::Api {
        match self.field_errors {
            Some(fields) if !fields.is_empty() => error::Api::Validation {
                message: self
                    .message
                    .unwrap_or_else(|| "One or more fields have validation errors".to_owned()),
                fields,
            },
            _ => error::Api::Server {
                status: status.as_u16(),
                message: self
                    .message
                    .or(self.error)
                    .or_else(|| status.canonical_reason().map(str::to_owned))
                    .unwrap_or_else(|| "request failed".to_owned()),
            },
        }
    }
}

fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    if !status.is_success() {
        let failure = serde_json::from_slice::<Failure>(body).unwrap_or_else(|e| {
            debug!("Error response body is not an error envelope: {}", e);
            Failure::default()
        });
        return Err(failure.into_error(status).into());
    }

    let envelope: Envelope<T> = serde_json::from_slice(body)?;
    if !envelope.success {
        return Err(error::Api::Rejected(envelope.message.unwrap_or_default()).into());
    }
    Ok(envelope.data.ok_or(error::Api::MissingData)?)
}

pub(crate) struct Client {
    http: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl Client {
    pub(crate) fn new(base_url: Url) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(error::Conversion::BaseUrl(base_url).into());
        }

        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(metadata::USER_AGENT.as_str())
                .build()?,
            base_url,
            token: None,
        })
    }

    /// Attaches the bearer token to every subsequent request.
    pub(crate) fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    fn url_for(&self, req: &Request) -> Result<Url> {
        let mut url = self.base_url.clone();
        let _ = url
            .path_segments_mut()
            .map_err(|()| error::Conversion::BaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(req.path());
        Ok(url)
    }

    pub(crate) async fn send<T: DeserializeOwned>(&self, req: Request) -> Result<T> {
        let url = self.url_for(&req)?;
        debug!("Sending {} {}", req.method(), url);

        let mut builder = self.http.request(req.method().clone(), url);
        if !req.query().is_empty() {
            builder = builder.query(req.query());
        }
        if let Some(token) = self.token.as_ref() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = req.body().as_ref() {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        debug!("Received {} with {} bytes", status, body.len());
        decode(status, &body)
    }
}

#[async_trait]
pub(crate) trait Executor {
    type Response;

    async fn execute(self, client: &Client) -> Result<Self::Response>
    where
        Self: TryInto<Request> + Send + Sized,
        error::Error: From<<Self as TryInto<Request>>::Error>,
        Self::Response: for<'de> Deserialize<'de>,
    {
        let req = self.try_into()?;
        client.send(req).await
    }
}
