// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! The live-update channel.
//!
//! A background task keeps a STOMP subscription to the order events topic
//! open and hands every event to a single handler in arrival order. Any
//! failure puts the channel back in [`State::Disconnected`] and schedules one
//! reconnect after a fixed delay, forever, until the channel is closed.

pub(crate) mod stomp;
pub(crate) mod transport;

use std::time::Duration;

use futures_util::{SinkExt as _, StreamExt as _};
use log::{debug, info, warn};
use tokio::{select, sync::watch, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{self, Result},
    notification::OrderEvent,
};

use self::{
    stomp::{Command, Frame},
    transport::Connector,
};

pub(crate) const RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub(crate) const TOPIC: &str = "/topic/orders";
const SUBSCRIPTION_ID: &str = "sub-0";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Disconnected,
    Connecting,
    Connected,
}

pub(crate) trait Handler: Send + 'static {
    fn handle(&mut self, event: OrderEvent);
}

impl<F: FnMut(OrderEvent) + Send + 'static> Handler for F {
    fn handle(&mut self, event: OrderEvent) {
        self(event);
    }
}

fn rejection(frame: &Frame) -> error::Error {
    let reason = frame.header("message").unwrap_or_else(|| frame.body());
    error::Channel::Rejected(reason.to_owned()).into()
}

struct Worker<C, H> {
    connector: C,
    handler: H,
    state: watch::Sender<State>,
    cancel: CancellationToken,
}

impl<C: Connector, H: Handler> Worker<C, H> {
    fn set(&self, state: State) {
        debug!("Live update channel is now {:?}", state);
        let _ = self.state.send(state);
    }

    async fn run(mut self) {
        loop {
            self.set(State::Connecting);
            match self.session().await {
                Ok(()) => break,
                Err(e) => warn!(
                    "Live updates unavailable, retrying in {} seconds: {}",
                    RECONNECT_DELAY.as_secs(),
                    e
                ),
            }

            self.set(State::Disconnected);
            select! {
                () = self.cancel.cancelled() => break,
                () = time::sleep(RECONNECT_DELAY) => {}
            }
        }

        self.set(State::Disconnected);
        debug!("Live update channel closed");
    }

    /// Runs one connection to completion. Returns `Ok` only when the channel
    /// was closed.
    async fn session(&mut self) -> Result<()> {
        let cancel = self.cancel.clone();
        let host = self.connector.host();

        let mut transport = select! {
            () = cancel.cancelled() => return Ok(()),
            candidate = self.connector.connect() => candidate?,
        };

        select! {
            () = cancel.cancelled() => {
                if let Err(e) = transport.close().await {
                    debug!("Closing the transport failed: {}", e);
                }
                return Ok(());
            }
            candidate = Self::handshake(&mut transport, &host) => candidate?,
        }

        self.set(State::Connected);
        info!("Live updates connected");
        transport
            .send(Frame::subscribe(SUBSCRIPTION_ID, TOPIC))
            .await?;

        loop {
            select! {
                () = cancel.cancelled() => {
                    Self::disconnect(&mut transport).await;
                    return Ok(());
                }
                candidate = transport.next() => {
                    let frame = candidate.ok_or(error::Channel::StreamEnded)??;
                    self.dispatch(&frame)?;
                }
            }
        }
    }

    async fn handshake(transport: &mut C::Transport, host: &str) -> Result<()> {
        transport.send(Frame::connect(host)).await?;
        let frame = transport.next().await.ok_or(error::Channel::StreamEnded)??;

        // LINT: Anything other than the two replies to CONNECT is a protocol
        // violation.
        #[allow(clippy::wildcard_enum_match_arm)]
        match frame.command() {
            Command::Connected => {
                debug!(
                    "STOMP session established with version {}",
                    frame.header("version").unwrap_or("1.0")
                );
                Ok(())
            }
            Command::Error => Err(rejection(&frame)),
            command => Err(error::Channel::UnexpectedFrame(command).into()),
        }
    }

    fn dispatch(&mut self, frame: &Frame) -> Result<()> {
        // LINT: Brokers may send receipts or other frames we have no use for.
        #[allow(clippy::wildcard_enum_match_arm)]
        match frame.command() {
            Command::Message => match serde_json::from_str::<serde_json::Value>(frame.body()) {
                Ok(value) => self.handler.handle(OrderEvent::from(value)),
                Err(e) => warn!("Dropping unreadable order event: {}", e),
            },
            Command::Error => return Err(rejection(frame)),
            command => debug!("Ignoring {} frame", command),
        }
        Ok(())
    }

    async fn disconnect(transport: &mut C::Transport) {
        if let Err(e) = transport.send(Frame::disconnect()).await {
            debug!("Sending DISCONNECT failed: {}", e);
        }
        if let Err(e) = transport.close().await {
            debug!("Closing the transport failed: {}", e);
        }
    }
}

/// A handle to the background connection. Dropping it tears the connection
/// down without waiting.
pub(crate) struct Channel {
    state: watch::Receiver<State>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Channel {
    pub(crate) fn open<C: Connector + 'static, H: Handler>(connector: C, handler: H) -> Self {
        let (state_tx, state) = watch::channel(State::Disconnected);
        let cancel = CancellationToken::new();
        let worker = Worker {
            connector,
            handler,
            state: state_tx,
            cancel: cancel.clone(),
        };

        Self {
            state,
            cancel,
            task: tokio::spawn(worker.run()),
        }
    }

    pub(crate) fn state(&self) -> watch::Receiver<State> {
        self.state.clone()
    }

    pub(crate) fn is_connected(&self) -> bool {
        *self.state.borrow() == State::Connected
    }

    /// Cancels any pending reconnect, closes the active connection, and waits
    /// for the background task to finish.
    pub(crate) async fn close(mut self) -> Result<()> {
        self.cancel.cancel();
        (&mut self.task).await?;
        Ok(())
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        io,
        pin::Pin,
        sync::Mutex,
        task::{Context, Poll},
    };

    use async_trait::async_trait;
    use tokio::{sync::mpsc, time::Instant};
    use tokio_stream::wrappers::ReceiverStream;

    use super::*;

    struct MockTransport {
        inbound: ReceiverStream<Result<Frame>>,
        outbound: mpsc::UnboundedSender<Frame>,
    }

    impl futures_util::Stream for MockTransport {
        type Item = Result<Frame>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Pin::new(&mut self.inbound).poll_next(cx)
        }
    }

    impl futures_util::Sink<Frame> for MockTransport {
        type Error = error::Error;

        fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Frame) -> Result<()> {
            self.outbound.send(item).map_err(error::Internal::from)?;
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// The test's ends of one scripted connection.
    struct Peer {
        inbound: mpsc::Sender<Result<Frame>>,
        outbound: mpsc::UnboundedReceiver<Frame>,
    }

    /// Hands out scripted transports in order, then refuses to connect.
    struct MockConnector {
        scripts: Mutex<VecDeque<MockTransport>>,
        attempts: mpsc::UnboundedSender<Instant>,
    }

    impl MockConnector {
        fn new(connections: usize) -> (Self, Vec<Peer>, mpsc::UnboundedReceiver<Instant>) {
            let mut scripts = VecDeque::new();
            let mut peers = Vec::new();
            for _ in 0..connections {
                let (inbound_tx, inbound_rx) = mpsc::channel(16);
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                scripts.push_back(MockTransport {
                    inbound: ReceiverStream::new(inbound_rx),
                    outbound: outbound_tx,
                });
                peers.push(Peer {
                    inbound: inbound_tx,
                    outbound: outbound_rx,
                });
            }

            let (attempts_tx, attempts_rx) = mpsc::unbounded_channel();
            (
                Self {
                    scripts: Mutex::new(scripts),
                    attempts: attempts_tx,
                },
                peers,
                attempts_rx,
            )
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Transport = MockTransport;

        async fn connect(&self) -> Result<Self::Transport> {
            let _ = self.attempts.send(Instant::now());
            let next = self
                .scripts
                .lock()
                .map_err(|_| error::Internal::ChannelClosed)?
                .pop_front();
            next.ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused).into())
        }

        fn host(&self) -> String {
            "localhost".to_owned()
        }
    }

    fn frame(text: &str) -> Result<Frame> {
        Ok(Frame::decode(text)?.ok_or(error::Stomp::MissingCommand)?)
    }

    fn message(body: &str) -> Result<Frame> {
        frame(&format!(
            "MESSAGE\ndestination:/topic/orders\nsubscription:sub-0\n\n{body}\0"
        ))
    }

    fn connected() -> Frame {
        Frame::new(Command::Connected).with_header("version", "1.2")
    }

    #[tokio::test]
    async fn handler_sees_each_wellformed_event_in_order() -> Result<()> {
        let (connector, mut peers, _attempts) = MockConnector::new(1);
        let peer = &mut peers[0];
        for candidate in [
            Ok(connected()),
            message(r#"{"type":"ORDER_CREATED","orderNumber":"ORD-1"}"#),
            message("{not json"),
            message(r#"{"type":"STATUS_CHANGED","orderNumber":"ORD-2","newStatus":"PICKED"}"#),
            message(r#"{"orderNumber":"ORD-untyped"}"#),
            message(
                r#"{"type":"STATUS_CHANGED","orderNumber":"ORD-3","newStatus":"RETURNED","timestamp":"2024-03-01T09:30:15Z"}"#,
            ),
            message(r#"{"type":"SOMETHING_NEW","orderNumber":"ORD-4"}"#),
            message("[1,2]"),
        ] {
            peer.inbound.send(Ok(candidate?)).await.map_err(error::Internal::from)?;
        }

        let (events_tx, mut events) = mpsc::unbounded_channel();
        let channel = Channel::open(connector, move |event: OrderEvent| {
            let _ = events_tx.send(event.order_number);
        });

        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(events.recv().await.flatten());
        }
        assert!(channel.is_connected());
        channel.close().await?;

        assert_eq!(
            seen,
            [
                Some("ORD-1".to_owned()),
                Some("ORD-2".to_owned()),
                Some("ORD-untyped".to_owned()),
                Some("ORD-3".to_owned()),
                Some("ORD-4".to_owned()),
                None,
            ]
        );
        assert_eq!(events.recv().await, None);

        let sent: Vec<_> = std::iter::from_fn(|| peer.outbound.try_recv().ok())
            .map(|f| f.command())
            .collect();
        assert_eq!(
            sent,
            [Command::Connect, Command::Subscribe, Command::Disconnect]
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn one_reconnect_after_fixed_delay() -> Result<()> {
        let (connector, mut peers, mut attempts) = MockConnector::new(1);
        let peer = peers.remove(0);
        peer.inbound
            .send(Ok(connected()))
            .await
            .map_err(error::Internal::from)?;
        drop(peer.inbound);

        let channel = Channel::open(connector, |_: OrderEvent| {});
        let first = attempts.recv().await.ok_or(error::Internal::ChannelClosed)?;

        time::sleep(RECONNECT_DELAY - Duration::from_millis(1)).await;
        assert!(attempts.try_recv().is_err());
        assert_eq!(*channel.state().borrow(), State::Disconnected);

        time::sleep(Duration::from_millis(2)).await;
        let second = attempts.try_recv().map_err(|_| error::Internal::ChannelClosed)?;
        assert!(second - first >= RECONNECT_DELAY);
        assert!(attempts.try_recv().is_err());

        channel.close().await
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_reconnect() -> Result<()> {
        let (connector, _peers, mut attempts) = MockConnector::new(0);
        let channel = Channel::open(connector, |_: OrderEvent| {});
        let mut state = channel.state();
        let _first = attempts.recv().await;

        time::sleep(Duration::from_secs(1)).await;
        channel.close().await?;
        time::sleep(RECONNECT_DELAY * 2).await;

        assert!(attempts.try_recv().is_err());
        assert_eq!(*state.borrow_and_update(), State::Disconnected);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn broker_error_is_retried() -> Result<()> {
        let (connector, peers, mut attempts) = MockConnector::new(2);
        peers[0]
            .inbound
            .send(frame("ERROR\nmessage:no such host\n\n\0"))
            .await
            .map_err(error::Internal::from)?;
        peers[1]
            .inbound
            .send(Ok(connected()))
            .await
            .map_err(error::Internal::from)?;

        let channel = Channel::open(connector, |_: OrderEvent| {});
        let mut state = channel.state();
        let first = attempts.recv().await.ok_or(error::Internal::ChannelClosed)?;
        let second = attempts.recv().await.ok_or(error::Internal::ChannelClosed)?;
        assert!(second - first >= RECONNECT_DELAY);

        while *state.borrow_and_update() != State::Connected {
            state.changed().await.map_err(|_| error::Internal::ChannelClosed)?;
        }
        channel.close().await
    }

    #[tokio::test(start_paused = true)]
    async fn broker_error_after_connecting_is_retried_once() -> Result<()> {
        let (connector, mut peers, mut attempts) = MockConnector::new(2);
        for candidate in [Ok(connected()), frame("ERROR\nmessage:broker restarting\n\n\0")] {
            peers[0]
                .inbound
                .send(candidate)
                .await
                .map_err(error::Internal::from)?;
        }
        peers[1]
            .inbound
            .send(Ok(connected()))
            .await
            .map_err(error::Internal::from)?;

        let channel = Channel::open(connector, |_: OrderEvent| {});
        let mut state = channel.state();
        let first = attempts.recv().await.ok_or(error::Internal::ChannelClosed)?;
        let second = attempts.recv().await.ok_or(error::Internal::ChannelClosed)?;
        assert!(second - first >= RECONNECT_DELAY);

        while *state.borrow_and_update() != State::Connected {
            state.changed().await.map_err(|_| error::Internal::ChannelClosed)?;
        }
        assert!(attempts.try_recv().is_err());

        let sent: Vec<_> = std::iter::from_fn(|| peers[0].outbound.try_recv().ok())
            .map(|f| f.command())
            .collect();
        assert_eq!(sent, [Command::Connect, Command::Subscribe]);
        channel.close().await
    }
}
