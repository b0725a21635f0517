// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::VecDeque, fmt, time::Duration};

use chrono::NaiveDateTime;
use inflector::Inflector as _;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::time::Instant;

/// Most notifications shown at once.
pub(crate) const TRAY_CAPACITY: usize = 5;
/// How long a notification stays up unless dismissed.
pub(crate) const TRAY_LIFETIME: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub(crate) enum Kind {
    OrderCreated,
    StatusChanged,
    PartnerAssigned,
    OrderCancelled,
    Unrecognized(String),
}

impl Default for Kind {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl From<String> for Kind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ORDER_CREATED" => Self::OrderCreated,
            "STATUS_CHANGED" => Self::StatusChanged,
            "PARTNER_ASSIGNED" => Self::PartnerAssigned,
            "ORDER_CANCELLED" => Self::OrderCancelled,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<Kind> for String {
    fn from(value: Kind) -> Self {
        match value {
            Kind::OrderCreated => "ORDER_CREATED".to_owned(),
            Kind::StatusChanged => "STATUS_CHANGED".to_owned(),
            Kind::PartnerAssigned => "PARTNER_ASSIGNED".to_owned(),
            Kind::OrderCancelled => "ORDER_CANCELLED".to_owned(),
            Kind::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::default() {
            return f.write_str("Update");
        }
        f.write_str(&String::from(self.clone()).to_title_case())
    }
}

/// Takes whatever the field holds if it fits `T`, and the default otherwise,
/// so one odd field never costs the whole event.
fn lenient<'de, D: Deserializer<'de>, T: DeserializeOwned + Default>(
    deserializer: D,
) -> Result<T, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A push message from the order events topic.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderEvent {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub(crate) kind: Kind,
    #[allow(dead_code)]
    #[serde(default, deserialize_with = "lenient")]
    pub(crate) order_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub(crate) order_number: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub(crate) message: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub(crate) old_status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub(crate) new_status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub(crate) partner_name: Option<String>,
    #[allow(dead_code)]
    #[serde(default, deserialize_with = "lenient")]
    pub(crate) timestamp: Option<NaiveDateTime>,
}

/// Any JSON document is an event. Anything but an object carries no fields
/// we know, so it is kept whole as the message.
impl From<Value> for OrderEvent {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            other => Self {
                message: Some(other.to_string()),
                ..Self::default()
            },
        }
    }
}

impl OrderEvent {
    /// A message built from the structured fields, for events that arrive
    /// without one.
    fn summary(&self) -> String {
        match (
            &self.kind,
            &self.old_status,
            &self.new_status,
            &self.partner_name,
        ) {
            (Kind::StatusChanged, Some(old), Some(new), _) => {
                format!("Status changed from {old} to {new}")
            }
            (Kind::PartnerAssigned, _, _, Some(partner)) => format!("Assigned to {partner}"),
            (kind, ..) => kind.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Notification {
    pub(crate) id: u64,
    pub(crate) kind: Kind,
    pub(crate) message: String,
    pub(crate) order_number: Option<String>,
    pub(crate) arrived_at: Instant,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(number) = self.order_number.as_ref() {
            write!(f, " ({number})")?;
        }
        Ok(())
    }
}

/// The bounded, self-expiring list of notifications on screen, oldest first.
pub(crate) struct Tray {
    entries: VecDeque<Notification>,
    capacity: usize,
    lifetime: Duration,
    next_id: u64,
}

impl Tray {
    pub(crate) fn new() -> Self {
        Self::with_limits(TRAY_CAPACITY, TRAY_LIFETIME)
    }

    pub(crate) fn with_limits(capacity: usize, lifetime: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            lifetime,
            next_id: 0,
        }
    }

    pub(crate) fn push(&mut self, event: OrderEvent, now: Instant) -> &Notification {
        while self.entries.len() >= self.capacity.max(1) {
            let _ = self.entries.pop_front();
        }

        let id = self.next_id;
        self.next_id += 1;
        let message = event.message.clone().unwrap_or_else(|| event.summary());
        self.entries.push_back(Notification {
            id,
            message,
            kind: event.kind,
            order_number: event.order_number,
            arrived_at: now,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub(crate) fn dismiss(&mut self, id: u64) -> Option<Notification> {
        let index = self.entries.iter().position(|n| n.id == id)?;
        self.entries.remove(index)
    }

    /// Drops every notification that has been up for the full lifetime.
    /// Returns how many were removed.
    pub(crate) fn expire(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let lifetime = self.lifetime;
        self.entries
            .retain(|n| now.saturating_duration_since(n.arrived_at) < lifetime);
        before - self.entries.len()
    }

    /// When the oldest notification is due to disappear.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.entries.front().map(|n| n.arrived_at + self.lifetime)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }
}

impl Default for Tray {
    fn default() -> Self {
        Self::new()
    }
}
