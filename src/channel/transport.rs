// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream};
use url::Url;

use crate::error::{self, Result};

use super::stomp::Frame;

/// A bidirectional stream of STOMP frames.
pub(crate) trait Transport:
    futures_util::Sink<Frame, Error = error::Error>
    + futures_util::Stream<Item = Result<Frame>>
    + Send
    + Unpin
{
}

impl<
        T: futures_util::Sink<Frame, Error = error::Error>
            + futures_util::Stream<Item = Result<Frame>>
            + Send
            + Unpin,
    > Transport for T
{
}

/// Opens a fresh transport for every connection attempt.
#[async_trait]
pub(crate) trait Connector: Send + Sync {
    type Transport: Transport;

    async fn connect(&self) -> Result<Self::Transport>;

    /// The virtual host named in the `CONNECT` frame.
    fn host(&self) -> String;
}

pub(crate) struct WebSocketTransport<S>(tokio_tungstenite::WebSocketStream<S>);

impl<S: AsyncRead + AsyncWrite + Unpin> futures_util::Stream for WebSocketTransport<S> {
    type Item = Result<Frame>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let msg = match Pin::new(&mut self.0).poll_next(cx) {
                Poll::Ready(Some(Ok(msg))) => msg,
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e.into()))),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            };

            // LINT: Binary, ping, and pong messages carry no frames.
            #[allow(clippy::wildcard_enum_match_arm)]
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(close) => {
                    debug!("Server closed the socket: {:?}", close);
                    return Poll::Ready(None);
                }
                _ => continue,
            };

            debug!("Received raw frame: {:?}", text);
            match Frame::decode(&text) {
                Ok(Some(frame)) => return Poll::Ready(Some(Ok(frame))),
                Ok(None) => {}
                Err(e) => warn!("Dropping undecodable frame: {}", e),
            }
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> futures_util::Sink<Frame> for WebSocketTransport<S> {
    type Error = error::Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.0).poll_ready(cx).map_err(Into::into)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        debug!("Sending {} frame", item.command());
        Pin::new(&mut self.0)
            .start_send(Message::Text(item.to_string()))
            .map_err(Into::into)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.0).poll_flush(cx).map_err(Into::into)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.0).poll_close(cx).map_err(Into::into)
    }
}

impl<S: AsyncRead + AsyncWrite + Send + Sync + Unpin> From<tokio_tungstenite::WebSocketStream<S>>
    for WebSocketTransport<S>
{
    fn from(s: tokio_tungstenite::WebSocketStream<S>) -> Self {
        Self(s)
    }
}

pub(crate) struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    pub(crate) const fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport<MaybeTlsStream<TcpStream>>;

    async fn connect(&self) -> Result<Self::Transport> {
        debug!("Connecting to {}", self.url);
        let (stream, resp) = tokio_tungstenite::connect_async(&self.url).await?;
        debug!("WebSocket handshake completed with status {}", resp.status());
        Ok(stream.into())
    }

    fn host(&self) -> String {
        self.url.host_str().unwrap_or("localhost").to_owned()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt as _, StreamExt as _};
    use tokio::io::{duplex, DuplexStream};
    use tokio_tungstenite::{tungstenite::protocol::Role, WebSocketStream};

    use crate::channel::stomp::Command;

    use super::*;

    async fn pair() -> (WebSocketTransport<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (client, server) = duplex(64 * 1024);
        (
            WebSocketStream::from_raw_socket(client, Role::Client, None)
                .await
                .into(),
            WebSocketStream::from_raw_socket(server, Role::Server, None).await,
        )
    }

    #[tokio::test]
    async fn only_stomp_frames_come_through() -> Result<()> {
        let (mut transport, mut server) = pair().await;
        for msg in [
            Message::Text("\n".to_owned()),
            Message::Text("\r\n\r\n".to_owned()),
            Message::Binary(vec![0, 1, 2]),
            Message::Ping(b"are you there".to_vec()),
            Message::Pong(Vec::new()),
            Message::Text("TELEPORT\n\n\0".to_owned()),
            Message::Text("MESSAGE\ndestination:/topic/orders\n\n{}\0".to_owned()),
            Message::Close(None),
        ] {
            server.send(msg).await?;
        }

        let frame = transport
            .next()
            .await
            .ok_or(error::Channel::StreamEnded)??;
        assert_eq!(frame.command(), Command::Message);
        assert_eq!(frame.header("destination"), Some("/topic/orders"));
        assert_eq!(frame.body(), "{}");
        assert!(transport.next().await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn frames_are_sent_as_text() -> Result<()> {
        let (mut transport, mut server) = pair().await;
        transport.send(Frame::connect("localhost")).await?;

        let msg = server.next().await.ok_or(error::Channel::StreamEnded)??;
        let Message::Text(text) = msg else {
            panic!("expected a text message, got {msg:?}");
        };
        assert_eq!(
            Frame::decode(&text)?.map(|frame| frame.command()),
            Some(Command::Connect)
        );
        Ok(())
    }
}
