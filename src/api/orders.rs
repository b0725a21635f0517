// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use reqwest::Method;
use serde::Serialize;
use serde_json::json;

use crate::error;

use super::{
    model::{AuditEntry, Order, OrderStatus, Page},
    Executor, Request,
};

pub(crate) struct ListOrders {
    pub(crate) city: Option<String>,
    pub(crate) status: Option<OrderStatus>,
    pub(crate) page: u32,
    pub(crate) size: u32,
}

impl From<ListOrders> for Request {
    fn from(value: ListOrders) -> Self {
        Self::new(Method::GET, ["orders"])
            .with_query("city", value.city)
            .with_query("status", value.status)
            .with_query("page", Some(value.page))
            .with_query("size", Some(value.size))
    }
}

impl Executor for ListOrders {
    type Response = Page<Order>;
}

pub(crate) struct GetOrder {
    pub(crate) id: i64,
}

impl From<GetOrder> for Request {
    fn from(value: GetOrder) -> Self {
        Self::new(Method::GET, ["orders".to_owned(), value.id.to_string()])
    }
}

impl Executor for GetOrder {
    type Response = Order;
}

pub(crate) struct FindOrder {
    pub(crate) order_number: String,
}

impl From<FindOrder> for Request {
    fn from(value: FindOrder) -> Self {
        Self::new(Method::GET, ["orders", "number", value.order_number.as_str()])
    }
}

impl Executor for FindOrder {
    type Response = Order;
}

/// With `auto_assign` the server picks a partner if one is available in the
/// city. The order is created either way.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateOrder {
    pub(crate) customer_name: String,
    pub(crate) customer_phone: String,
    pub(crate) pickup_address: String,
    pub(crate) delivery_address: String,
    pub(crate) city: String,
    pub(crate) auto_assign: bool,
}

impl TryFrom<CreateOrder> for Request {
    type Error = error::Error;

    fn try_from(value: CreateOrder) -> Result<Self, Self::Error> {
        Self::new(Method::POST, ["orders"]).with_body(&value)
    }
}

impl Executor for CreateOrder {
    type Response = Order;
}

pub(crate) struct AssignPartner {
    pub(crate) order_id: i64,
    pub(crate) partner_id: i64,
}

impl From<AssignPartner> for Request {
    fn from(value: AssignPartner) -> Self {
        Self::new(
            Method::PUT,
            ["orders".to_owned(), value.order_id.to_string(), "assign".to_owned()],
        )
        .with_json(json!({ "deliveryPartnerId": value.partner_id }))
    }
}

impl Executor for AssignPartner {
    type Response = Order;
}

pub(crate) struct UpdateOrderStatus {
    pub(crate) order_id: i64,
    pub(crate) status: OrderStatus,
}

impl From<UpdateOrderStatus> for Request {
    fn from(value: UpdateOrderStatus) -> Self {
        Self::new(
            Method::PUT,
            ["orders".to_owned(), value.order_id.to_string(), "status".to_owned()],
        )
        .with_json(json!({ "status": value.status }))
    }
}

impl Executor for UpdateOrderStatus {
    type Response = Order;
}

pub(crate) struct CancelOrder {
    pub(crate) order_id: i64,
    pub(crate) reason: String,
}

impl From<CancelOrder> for Request {
    fn from(value: CancelOrder) -> Self {
        Self::new(
            Method::PUT,
            ["orders".to_owned(), value.order_id.to_string(), "cancel".to_owned()],
        )
        .with_json(json!({ "reason": value.reason }))
    }
}

impl Executor for CancelOrder {
    type Response = Order;
}

pub(crate) struct OrderHistory {
    pub(crate) order_id: i64,
}

impl From<OrderHistory> for Request {
    fn from(value: OrderHistory) -> Self {
        Self::new(
            Method::GET,
            ["orders".to_owned(), value.order_id.to_string(), "history".to_owned()],
        )
    }
}

impl Executor for OrderHistory {
    type Response = Vec<AuditEntry>;
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use url::Url;

    use crate::{api::Client, error::Result};

    use super::*;

    fn order_json(number: &str, status: &str) -> serde_json::Value {
        json!({
            "id": 41,
            "orderNumber": number,
            "customerName": "Asha",
            "customerPhone": "9876543210",
            "pickupAddress": "1 Depot Road",
            "deliveryAddress": "22 Lake View",
            "city": "Nowhere",
            "status": status,
            "deliveryPartner": null,
            "createdAt": "2024-03-01T09:30:15",
        })
    }

    #[test]
    fn list_filters_are_sent_as_query() {
        let req: Request = ListOrders {
            city: Some("Pune".to_owned()),
            status: Some(OrderStatus::Picked),
            page: 2,
            size: 10,
        }
        .into();

        assert_eq!(
            req.query(),
            &[
                ("city", "Pune".to_owned()),
                ("status", "PICKED".to_owned()),
                ("page", "2".to_owned()),
                ("size", "10".to_owned()),
            ]
        );
    }

    #[test]
    fn status_transition_body_uses_wire_name() {
        let req: Request = UpdateOrderStatus {
            order_id: 5,
            status: OrderStatus::Delivered,
        }
        .into();

        assert_eq!(req.method(), &Method::PUT);
        assert_eq!(req.path(), ["orders", "5", "status"]);
        assert_eq!(req.body(), &Some(json!({ "status": "DELIVERED" })));
    }

    #[tokio::test]
    async fn auto_assign_without_available_partners_still_creates() -> Result<()> {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/orders").json_body(json!({
                    "customerName": "Asha",
                    "customerPhone": "9876543210",
                    "pickupAddress": "1 Depot Road",
                    "deliveryAddress": "22 Lake View",
                    "city": "Nowhere",
                    "autoAssign": true,
                }));
                then.status(201).json_body(json!({
                    "success": true,
                    "message": "Order created successfully",
                    "data": order_json("ORD-00000001", "PLACED"),
                }));
            })
            .await;
        let availability = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/delivery-partners/available");
                then.status(200)
                    .json_body(json!({ "success": true, "data": [] }));
            })
            .await;

        let client = Client::new(Url::parse(&server.url("/api/v1"))?)?;
        let order = CreateOrder {
            customer_name: "Asha".to_owned(),
            customer_phone: "9876543210".to_owned(),
            pickup_address: "1 Depot Road".to_owned(),
            delivery_address: "22 Lake View".to_owned(),
            city: "Nowhere".to_owned(),
            auto_assign: true,
        }
        .execute(&client)
        .await?;

        create.assert_async().await;
        assert_eq!(availability.hits_async().await, 0);
        assert_eq!(order.order_number, "ORD-00000001");
        assert_eq!(order.status, OrderStatus::Placed);
        assert!(order.delivery_partner.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn order_number_lookup_hits_number_path() -> Result<()> {
        let server = MockServer::start_async().await;
        let lookup = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/orders/number/ORD-ABC");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": order_json("ORD-ABC", "PICKED"),
                }));
            })
            .await;

        let client = Client::new(Url::parse(&server.url("/api/v1"))?)?;
        let order = FindOrder {
            order_number: "ORD-ABC".to_owned(),
        }
        .execute(&client)
        .await?;

        lookup.assert_async().await;
        assert_eq!(order.status.next(), Some(OrderStatus::Delivered));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_transition_reports_server_message() -> Result<()> {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(PUT).path("/api/v1/orders/9/status");
                then.status(400).json_body(json!({
                    "success": false,
                    "error": "Invalid Status Transition",
                    "message": "Cannot transition from PLACED to DELIVERED",
                }));
            })
            .await;

        let client = Client::new(Url::parse(&server.url("/api/v1"))?)?;
        let result = UpdateOrderStatus {
            order_id: 9,
            status: OrderStatus::Delivered,
        }
        .execute(&client)
        .await;

        match result {
            Err(error::Error::Api(ref api)) => assert_eq!(
                api.server_message(),
                Some("Cannot transition from PLACED to DELIVERED")
            ),
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }
}
