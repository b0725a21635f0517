// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod api;
mod channel;
mod command;
mod error;
mod metadata;
mod notification;
mod password;
mod session;
mod storage;

use std::{path::PathBuf, process};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use command::{Context, SessionStore};
use error::Result;
use log::{error, warn};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    Register(command::auth::Register),
    Login(command::auth::Login),
    Logout(command::auth::Logout),
    Whoami(command::auth::Whoami),
    /// Work with orders.
    #[command(subcommand)]
    Orders(command::orders::Command),
    /// Work with delivery partners.
    #[command(subcommand)]
    Partners(command::partners::Command),
    Watch(command::watch::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        match self {
            Self::Register(cmd) => cmd.execute(ctx).await,
            Self::Login(cmd) => cmd.execute(ctx).await,
            Self::Logout(cmd) => cmd.execute(ctx).await,
            Self::Whoami(cmd) => cmd.execute(ctx).await,
            Self::Orders(cmd) => cmd.execute(ctx).await,
            Self::Partners(cmd) => cmd.execute(ctx).await,
            Self::Watch(cmd) => cmd.execute(ctx).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the order management REST API.
    #[arg(long, env = "ORDERDESK_API_URL", default_value = "http://localhost:8080/api/v1", value_parser = Url::parse)]
    api_url: Url,

    /// The WebSocket URL of the STOMP endpoint that publishes order events.
    #[arg(long, env = "ORDERDESK_WS_URL", default_value = "ws://localhost:8080/ws", value_parser = Url::parse)]
    ws_url: Url,

    /// Keep the session in memory only. You will need to log in again for
    /// every command.
    #[arg(long)]
    no_persist_session: bool,

    /// The path to the Pinentry program to use when asking for your
    /// password.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

async fn get_storage<
    T: Send + Serialize + Sync + for<'de> Deserialize<'de> + Clone + 'static,
>(
    args: &Args,
    key: &str,
) -> Box<dyn storage::Storage<T>> {
    if !args.no_persist_session {
        #[cfg(feature = "secret-service")]
        match storage::SecretService::new(&args.api_url, key).await {
            Ok(secret_service_storage) => return Box::new(secret_service_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to the secret service: {}", e);
            }
        }

        #[cfg(feature = "keychain")]
        match storage::Keychain::new(&args.api_url, key) {
            Ok(keychain_storage) => return Box::new(keychain_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to Keychain: {}", e);
            }
        }

        match storage::File::new(key) {
            Ok(file_storage) => return Box::new(file_storage),
            Err(e) => warn!("The session will not be saved: {}", e),
        }
    }

    Box::new(storage::Memory::<T>::new())
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(args.pinentry_program.clone().map_or_else(
            password::PinentryPrompt::new,
            password::PinentryPrompt::new_with_executable,
        )),
        Box::new(password::RpasswordPrompt),
    ];

    let store = SessionStore::new(
        get_storage(&args, storage::TOKEN_KEY).await,
        get_storage(&args, storage::USER_KEY).await,
    );

    let mut ctx = Context {
        api_url: args.api_url,
        ws_url: args.ws_url,
        store,
        prompt: Box::new(prompt),
    };

    command::Command::execute(args.command, &mut ctx).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("ORDERDESK_LOG", "warn")
        .write_style("ORDERDESK_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
