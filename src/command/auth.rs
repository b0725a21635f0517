// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::{error, info, warn};
use secrecy::SecretString;

use crate::{
    api::{self, model::Role, Executor as _},
    error::{self, Result},
    password,
    session::Session,
};

use super::Context;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn report(session: &Session, persistent: bool) {
    println!(
        "Logged in as {} <{}> ({})",
        session.display_name, session.email_address, session.role
    );
    if !persistent {
        warn!("The session will be forgotten when this process exits");
    }
}

/// Create an account and log in with it.
#[derive(Debug, Parser)]
pub(crate) struct Register {
    /// Your full name.
    #[arg(long)]
    name: String,

    /// The email address to log in with.
    #[arg(long)]
    email: String,

    /// The role to request. The server decides the default.
    #[arg(long, value_enum)]
    role: Option<Role>,

    /// The new account's password. If not given, you will be prompted for
    /// it.
    #[arg(long, env = "ORDERDESK_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[async_trait]
impl super::Command for Register {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let password = ctx
            .password(
                self.password.map(SecretString::new),
                password::RequestBuilder::new()
                    .with_account(&self.email)
                    .with_confirmation()
                    .into_request(),
            )
            .await?;

        let auth = api::auth::Register {
            name: self.name,
            email: self.email,
            password,
            role: self.role,
        }
        .execute(&ctx.client()?)
        .await?;

        let session = ctx.store.login(&auth).await?;
        report(&session, ctx.store.is_persistent());
        Ok(())
    }
}

/// Log in to an existing account.
#[derive(Debug, Parser)]
pub(crate) struct Login {
    /// The email address of the account.
    #[arg(long)]
    email: String,

    /// The account's password. If not given, you will be prompted for it.
    #[arg(long, env = "ORDERDESK_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[async_trait]
impl super::Command for Login {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        if !ctx.store.is_expired().await {
            info!("Replacing the current session");
        }

        let password = ctx
            .password(
                self.password.map(SecretString::new),
                password::RequestBuilder::new()
                    .with_account(&self.email)
                    .into_request(),
            )
            .await?;

        let req = api::auth::Login {
            email: self.email,
            password,
        };
        let auth = match req.execute(&ctx.client()?).await {
            Ok(auth) => auth,
            Err(error::Error::Api(ref e)) => {
                error!("{}", e.server_message().unwrap_or(INVALID_CREDENTIALS));
                return Err(error::Error::Command);
            }
            Err(e) => return Err(e),
        };

        let session = ctx.store.login(&auth).await?;
        report(&session, ctx.store.is_persistent());
        Ok(())
    }
}

/// Forget the current session.
#[derive(Debug, Parser)]
pub(crate) struct Logout;

#[async_trait]
impl super::Command for Logout {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        ctx.store.logout().await?;
        println!("Logged out");
        Ok(())
    }
}

/// Show who is logged in.
#[derive(Debug, Parser)]
pub(crate) struct Whoami;

#[async_trait]
impl super::Command for Whoami {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        match ctx.store.restore().await {
            Some(session) => {
                println!(
                    "{} <{}>\nRole: {}\nUser ID: {}\nSession expires: {}",
                    session.display_name,
                    session.email_address,
                    session.role,
                    session.subject_id,
                    session.expires_at.to_rfc2822()
                );
                Ok(())
            }
            None => Err(error::Session::NotAuthenticated.into()),
        }
    }
}
