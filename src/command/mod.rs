// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use secrecy::SecretString;
use tabled::{settings::Style, Table, Tabled};
use url::Url;

use crate::{
    api::{self, model::Page},
    error::{self, Result},
    password,
    session::{self, Identity, Token},
    storage::Storage,
};

pub(crate) mod auth;
pub(crate) mod orders;
pub(crate) mod partners;
pub(crate) mod watch;

pub(crate) type SessionStore =
    session::Store<Box<dyn Storage<Token>>, Box<dyn Storage<Identity>>>;

/// Everything a command needs from the outside world.
pub(crate) struct Context {
    pub(crate) api_url: Url,
    pub(crate) ws_url: Url,
    pub(crate) store: SessionStore,
    pub(crate) prompt: Box<dyn password::Prompt>,
}

impl Context {
    pub(crate) fn client(&self) -> Result<api::Client> {
        api::Client::new(self.api_url.clone())
    }

    /// A client carrying the bearer token of the restored session.
    pub(crate) async fn authorized_client(&mut self) -> Result<api::Client> {
        let session = self.store.require().await?;
        Ok(self.client()?.with_token(session.token().clone()))
    }

    pub(crate) async fn password(
        &self,
        given: Option<SecretString>,
        req: password::Request,
    ) -> Result<SecretString> {
        if let Some(password) = given {
            return Ok(password);
        }

        Ok(self
            .prompt
            .prompt(req)
            .await?
            .ok_or(error::Password::NoPrompt)?)
    }
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, ctx: &mut Context) -> Result<()>;
}

pub(crate) fn print_table<T: Tabled>(rows: impl IntoIterator<Item = T>) {
    println!("{}", Table::new(rows).with(Style::rounded()));
}

pub(crate) fn print_page<T: Tabled>(page: &Page<T>) {
    if page.content.is_empty() {
        println!("Nothing found.");
        return;
    }

    print_table(&page.content);
    println!(
        "Page {} of {} ({} total)",
        page.page.map_or(1, |p| p + 1),
        page.total_pages.max(1),
        page.total_elements
    );
    if page.last == Some(false) {
        println!("Use --page {} for more.", page.page.map_or(1, |p| p + 1));
    }
}
