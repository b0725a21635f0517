// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use inflector::Inflector as _;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

fn format_timestamp(value: &Option<NaiveDateTime>) -> String {
    value
        .as_ref()
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn format_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum Role {
    Customer,
    Partner,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.to_possible_value().ok_or(fmt::Error)?;
        write!(f, "{}", value.get_name().to_title_case())
    }
}

/// The `data` of a successful register or login exchange.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthResponse {
    pub(crate) token: SecretString,
    #[allow(dead_code)]
    #[serde(rename = "type", default)]
    pub(crate) token_type: Option<String>,
    pub(crate) user_id: i64,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) role: Role,
}

/// Order lifecycle. Transitions are decided by the server; the helpers here
/// only describe the forward path for display and defaults.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum OrderStatus {
    Placed,
    Assigned,
    Picked,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub(crate) const fn next(self) -> Option<Self> {
        match self {
            Self::Placed => Some(Self::Assigned),
            Self::Assigned => Some(Self::Picked),
            Self::Picked => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    pub(crate) const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "PLACED",
            Self::Assigned => "ASSIGNED",
            Self::Picked => "PICKED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum PartnerStatus {
    Available,
    Busy,
    Offline,
}

impl fmt::Display for PartnerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::Available => "AVAILABLE",
            Self::Busy => "BUSY",
            Self::Offline => "OFFLINE",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum VehicleType {
    Bike,
    Scooter,
    Car,
    Van,
    Truck,
}

#[derive(Clone, Debug, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Partner {
    #[tabled(rename = "ID")]
    pub(crate) id: i64,
    #[tabled(rename = "Name")]
    pub(crate) name: String,
    #[tabled(rename = "Phone")]
    pub(crate) phone: String,
    #[tabled(rename = "Email", display_with = "format_text")]
    pub(crate) email: Option<String>,
    #[tabled(rename = "City")]
    pub(crate) city: String,
    #[tabled(rename = "Status")]
    pub(crate) status: PartnerStatus,
    #[tabled(rename = "Vehicle", display_with = "format_text")]
    pub(crate) vehicle_type: Option<String>,
    #[allow(dead_code)]
    #[tabled(skip)]
    pub(crate) created_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Order {
    #[tabled(rename = "ID")]
    pub(crate) id: i64,
    #[tabled(rename = "Number")]
    pub(crate) order_number: String,
    #[tabled(rename = "Customer")]
    pub(crate) customer_name: String,
    #[tabled(skip)]
    pub(crate) customer_phone: String,
    #[tabled(skip)]
    pub(crate) pickup_address: String,
    #[tabled(skip)]
    pub(crate) delivery_address: String,
    #[tabled(rename = "City")]
    pub(crate) city: String,
    #[tabled(rename = "Status")]
    pub(crate) status: OrderStatus,
    #[tabled(rename = "Partner", display_with = "Self::format_partner")]
    pub(crate) delivery_partner: Option<Partner>,
    #[tabled(skip)]
    pub(crate) cancellation_reason: Option<String>,
    #[tabled(skip)]
    pub(crate) cancelled_at: Option<NaiveDateTime>,
    #[tabled(rename = "Created", display_with = "format_timestamp")]
    pub(crate) created_at: Option<NaiveDateTime>,
    #[allow(dead_code)]
    #[tabled(skip)]
    pub(crate) updated_at: Option<NaiveDateTime>,
}

impl Order {
    fn format_partner(partner: &Option<Partner>) -> String {
        partner
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuditEntry {
    #[allow(dead_code)]
    #[tabled(skip)]
    pub(crate) id: i64,
    #[allow(dead_code)]
    #[tabled(skip)]
    pub(crate) order_id: i64,
    #[allow(dead_code)]
    #[tabled(skip)]
    pub(crate) order_number: String,
    #[tabled(rename = "When", display_with = "format_timestamp")]
    pub(crate) created_at: Option<NaiveDateTime>,
    #[tabled(rename = "Action")]
    pub(crate) action: String,
    #[tabled(rename = "Field", display_with = "format_text")]
    pub(crate) field_name: Option<String>,
    #[tabled(rename = "From", display_with = "format_text")]
    pub(crate) old_value: Option<String>,
    #[tabled(rename = "To", display_with = "format_text")]
    pub(crate) new_value: Option<String>,
    #[tabled(rename = "By", display_with = "format_text")]
    pub(crate) performed_by: Option<String>,
    #[tabled(rename = "Notes", display_with = "format_text")]
    pub(crate) notes: Option<String>,
}

/// One page of a listing. Pages are numbered from zero.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    pub(crate) content: Vec<T>,
    #[serde(default)]
    pub(crate) page: Option<u32>,
    #[allow(dead_code)]
    #[serde(default)]
    pub(crate) size: Option<u32>,
    pub(crate) total_elements: u64,
    pub(crate) total_pages: u32,
    #[serde(default)]
    pub(crate) last: Option<bool>,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use serde_test::{assert_tokens, Token};

    use crate::error::Result;

    use super::*;

    #[test]
    fn order_status_wire_names() {
        assert_tokens(
            &OrderStatus::Picked,
            &[Token::UnitVariant {
                name: "OrderStatus",
                variant: "PICKED",
            }],
        );
        assert_tokens(
            &PartnerStatus::Offline,
            &[Token::UnitVariant {
                name: "PartnerStatus",
                variant: "OFFLINE",
            }],
        );
        assert_tokens(
            &VehicleType::Scooter,
            &[Token::UnitVariant {
                name: "VehicleType",
                variant: "scooter",
            }],
        );
    }

    #[test]
    fn forward_path_ends_at_delivered() {
        let mut status = OrderStatus::Placed;
        let mut path = vec![status];
        while let Some(next) = status.next() {
            path.push(next);
            status = next;
        }

        assert_eq!(
            path,
            [
                OrderStatus::Placed,
                OrderStatus::Assigned,
                OrderStatus::Picked,
                OrderStatus::Delivered,
            ]
        );
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert_eq!(OrderStatus::Cancelled.next(), None);
        assert!(!OrderStatus::Picked.is_terminal());
    }

    #[test]
    fn role_is_title_cased_for_display() {
        assert_eq!(Role::Admin.to_string(), "Admin");
    }

    #[test]
    fn order_with_partner_and_local_timestamps() -> Result<()> {
        let order: Order = serde_json::from_value(json!({
            "id": 7,
            "orderNumber": "ORD-A1B2C3D4",
            "customerName": "Asha",
            "customerPhone": "9876543210",
            "pickupAddress": "1 Depot Road",
            "deliveryAddress": "22 Lake View",
            "city": "Pune",
            "status": "ASSIGNED",
            "deliveryPartner": {
                "id": 3,
                "name": "Ravi",
                "phone": "9000000000",
                "city": "Pune",
                "status": "BUSY",
                "vehicleType": "bike",
            },
            "createdAt": "2024-03-01T09:30:15.123456",
        }))?;

        assert_eq!(order.status, OrderStatus::Assigned);
        assert_eq!(Order::format_partner(&order.delivery_partner), "Ravi");
        assert_eq!(order.cancellation_reason, None);
        assert_eq!(
            order.created_at.map(|ts| ts.date()),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(format_timestamp(&order.created_at), "2024-03-01 09:30");
        Ok(())
    }

    #[test]
    fn page_tolerates_missing_paging_details() -> Result<()> {
        let page: Page<Partner> = serde_json::from_value(json!({
            "content": [],
            "totalElements": 0,
            "totalPages": 0,
        }))?;
        assert!(page.content.is_empty());
        assert_eq!(page.page, None);
        Ok(())
    }
}
