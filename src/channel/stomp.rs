// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! STOMP 1.2 frames, one per WebSocket text message.

use std::{fmt, str::FromStr};

use crate::error::{self, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Header values of the connection frames are sent verbatim.
    const fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl FromStr for Command {
    type Err = error::Stomp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "BEGIN" => Self::Begin,
            "COMMIT" => Self::Commit,
            "ABORT" => Self::Abort,
            "DISCONNECT" => Self::Disconnect,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            "" => return Err(error::Stomp::MissingCommand),
            _ => return Err(error::Stomp::UnknownCommand(s.to_owned())),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '\r' => f.write_str("\\r")?,
                '\n' => f.write_str("\\n")?,
                ':' => f.write_str("\\c")?,
                _ => write!(f, "{c}")?,
            }
        }
        Ok(())
    }
}

fn unescape(raw: &str) -> Result<String, error::Stomp> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        out.push(match chars.next() {
            Some('r') => '\r',
            Some('n') => '\n',
            Some('c') => ':',
            Some('\\') => '\\',
            _ => return Err(error::Stomp::InvalidEscape(raw.to_owned())),
        });
    }
    Ok(out)
}

/// Splits off one line, accepting either LF or CRLF.
fn split_line(s: &str) -> Option<(&str, &str)> {
    let (line, rest) = s.split_once('\n')?;
    Some((line.strip_suffix('\r').unwrap_or(line), rest))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Frame {
    command: Command,
    headers: Vec<(String, String)>,
    body: String,
}

impl Frame {
    pub(crate) const fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub(crate) fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub(crate) fn connect(host: &str) -> Self {
        Self::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("heart-beat", "0,0")
    }

    pub(crate) fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    pub(crate) const fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    pub(crate) const fn command(&self) -> Command {
        self.command
    }

    /// The first value given for the header. Later repeats are ignored.
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn body(&self) -> &str {
        &self.body
    }

    /// Parses a single frame. Returns `None` for a heart-beat, which is
    /// nothing but line endings.
    pub(crate) fn decode(text: &str) -> Result<Option<Self>> {
        let text = text.trim_start_matches(&['\r', '\n'][..]);
        if text.is_empty() {
            return Ok(None);
        }

        let (command_line, mut rest) = split_line(text).ok_or(error::Stomp::MissingTerminator)?;
        let command: Command = command_line.parse()?;

        let mut headers = Vec::new();
        loop {
            let (line, next) = split_line(rest).ok_or(error::Stomp::MissingTerminator)?;
            rest = next;
            if line.is_empty() {
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| error::Stomp::MalformedHeader(line.to_owned()))?;
            headers.push(if command.escapes_headers() {
                (unescape(name)?, unescape(value)?)
            } else {
                (name.to_owned(), value.to_owned())
            });
        }

        let mut frame = Self {
            command,
            headers,
            body: String::new(),
        };

        let body = match frame.header("content-length") {
            Some(declared) => {
                let invalid = || error::Stomp::ContentLength(declared.to_owned());
                let len: usize = declared.trim().parse().map_err(|_| invalid())?;
                let body = rest.get(..len).ok_or_else(invalid)?;
                if !rest[len..].starts_with('\0') {
                    return Err(error::Stomp::MissingTerminator.into());
                }
                body
            }
            None => {
                rest.split_once('\0')
                    .ok_or(error::Stomp::MissingTerminator)?
                    .0
            }
        };
        frame.body = body.to_owned();

        Ok(Some(frame))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.command)?;
        for (name, value) in &self.headers {
            if self.command.escapes_headers() {
                writeln!(f, "{}:{}", Escaped(name), Escaped(value))?;
            } else {
                writeln!(f, "{name}:{value}")?;
            }
        }
        writeln!(f)?;
        write!(f, "{}\0", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_frame_encoding() {
        assert_eq!(
            Frame::connect("localhost").to_string(),
            "CONNECT\naccept-version:1.2\nhost:localhost\nheart-beat:0,0\n\n\0"
        );
    }

    #[test]
    fn subscribe_headers_are_escaped() {
        assert_eq!(
            Frame::subscribe("sub-0", "/topic/a:b").to_string(),
            "SUBSCRIBE\nid:sub-0\ndestination:/topic/a\\cb\nack:auto\n\n\0"
        );
    }

    #[test]
    fn message_frame_is_decoded() -> Result<()> {
        let frame = Frame::decode(
            "MESSAGE\r\ndestination:/topic/orders\r\nmessage-id:a\\cb\r\nsubscription:sub-0\r\n\r\n{\"type\":\"ORDER_CREATED\"}\0\n",
        )?
        .ok_or(error::Stomp::MissingCommand)?;

        assert_eq!(frame.command(), Command::Message);
        assert_eq!(frame.header("destination"), Some("/topic/orders"));
        assert_eq!(frame.header("message-id"), Some("a:b"));
        assert_eq!(frame.body(), r#"{"type":"ORDER_CREATED"}"#);
        Ok(())
    }

    #[test]
    fn connected_headers_are_not_unescaped() -> Result<()> {
        let frame = Frame::decode("CONNECTED\nversion:1.2\nserver:broker\\1\n\n\0")?
            .ok_or(error::Stomp::MissingCommand)?;
        assert_eq!(frame.header("server"), Some("broker\\1"));
        Ok(())
    }

    #[test]
    fn content_length_allows_embedded_nul() -> Result<()> {
        let frame = Frame::decode("MESSAGE\ncontent-length:3\n\na\0b\0")?
            .ok_or(error::Stomp::MissingCommand)?;
        assert_eq!(frame.body(), "a\0b");
        Ok(())
    }

    #[test]
    fn first_repeated_header_wins() -> Result<()> {
        let frame = Frame::decode("MESSAGE\nfoo:1\nfoo:2\n\n\0")?
            .ok_or(error::Stomp::MissingCommand)?;
        assert_eq!(frame.header("foo"), Some("1"));
        Ok(())
    }

    #[test]
    fn heartbeat_is_not_a_frame() -> Result<()> {
        assert_eq!(Frame::decode("\n")?, None);
        assert_eq!(Frame::decode("\r\n\r\n")?, None);
        Ok(())
    }

    #[test]
    fn malformed_frames_are_rejected() {
        assert!(matches!(
            Frame::decode("MESSAGE\n\nbody"),
            Err(error::Error::Stomp(error::Stomp::MissingTerminator))
        ));
        assert!(matches!(
            Frame::decode("HELLO\n\n\0"),
            Err(error::Error::Stomp(error::Stomp::UnknownCommand(ref c))) if c == "HELLO"
        ));
        assert!(matches!(
            Frame::decode("MESSAGE\nno-colon\n\n\0"),
            Err(error::Error::Stomp(error::Stomp::MalformedHeader(_)))
        ));
        assert!(matches!(
            Frame::decode("MESSAGE\nbad:\\t\n\n\0"),
            Err(error::Error::Stomp(error::Stomp::InvalidEscape(_)))
        ));
        assert!(matches!(
            Frame::decode("MESSAGE\ncontent-length:10\n\nshort\0"),
            Err(error::Error::Stomp(error::Stomp::ContentLength(_)))
        ));
    }
}
