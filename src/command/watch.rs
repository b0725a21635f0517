// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    io::{self, BufRead as _},
    thread,
};

use async_trait::async_trait;
use clap::Parser;
use log::debug;
use tokio::{
    select, signal,
    sync::mpsc,
    time::{self, Instant},
};

use crate::{
    channel::{transport::WebSocketConnector, Channel, State},
    error::Result,
    notification::{OrderEvent, Tray},
};

use super::Context;

/// Reads stdin on its own thread so a pending read never holds up shutdown.
fn read_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let _ = thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn handle_input(tray: &mut Tray, line: &str, online: bool) {
    let line = line.trim();
    if line.is_empty() {
        println!("Live updates are {}.", if online { "online" } else { "offline" });
        if tray.len() == 0 {
            println!("No notifications.");
        }
        for notification in tray.iter() {
            println!("#{} {}", notification.id, notification);
        }
        return;
    }

    match line.trim_start_matches('#').parse() {
        Ok(id) => {
            if tray.dismiss(id).is_none() {
                println!("No notification #{id} is shown.");
            }
        }
        Err(_) => println!("Press Enter to list notifications, or type a number to dismiss one."),
    }
}

/// Follow order events as they happen, until interrupted.
///
/// Press Enter to list the notifications still shown, or type a
/// notification's number to dismiss it.
#[derive(Debug, Parser)]
pub(crate) struct Command;

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let session = ctx.store.require().await?;
        println!(
            "Watching order events as {}. Press Ctrl-C to stop.",
            session.display_name
        );

        let (events_tx, mut events) = mpsc::unbounded_channel();
        let channel = Channel::open(
            WebSocketConnector::new(ctx.ws_url.clone()),
            move |event: OrderEvent| {
                let _ = events_tx.send(event);
            },
        );
        let mut state = channel.state();
        let mut online = None;
        let mut tray = Tray::new();
        let mut input = read_lines();

        let shutdown = signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            let deadline = tray.next_deadline();
            select! {
                result = &mut shutdown => {
                    result?;
                    break;
                }
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let now_online = match *state.borrow_and_update() {
                        State::Connected => true,
                        State::Disconnected => false,
                        State::Connecting => continue,
                    };
                    if online != Some(now_online) {
                        println!("{}", if now_online { "Online" } else { "Offline" });
                        online = Some(now_online);
                    }
                }
                Some(event) = events.recv() => {
                    let notification = tray.push(event, Instant::now());
                    println!("#{} {}", notification.id, notification);
                }
                Some(line) = input.recv() => handle_input(&mut tray, &line, channel.is_connected()),
                () = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let expired = tray.expire(Instant::now());
                    debug!("{} notifications expired, {} still shown", expired, tray.len());
                }
            }
        }

        channel.close().await
    }
}

#[cfg(test)]
mod tests {
    use crate::notification::Kind;

    use super::*;

    #[test]
    fn typed_number_dismisses_notification() {
        let mut tray = Tray::new();
        let id = tray
            .push(
                OrderEvent {
                    kind: Kind::OrderCreated,
                    order_id: Some(1),
                    order_number: Some("ORD-1".to_owned()),
                    message: None,
                    old_status: None,
                    new_status: None,
                    partner_name: None,
                    timestamp: None,
                },
                Instant::now(),
            )
            .id;

        handle_input(&mut tray, "", false);
        handle_input(&mut tray, "bogus", false);
        assert_eq!(tray.len(), 1);
        handle_input(&mut tray, &format!("#{id}\n"), true);
        assert_eq!(tray.len(), 0);
    }
}
