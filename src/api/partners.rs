// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use reqwest::Method;
use serde::Serialize;
use serde_json::json;

use crate::error;

use super::{
    model::{Page, Partner, PartnerStatus, VehicleType},
    Executor, Request,
};

const RESOURCE: &str = "delivery-partners";

pub(crate) struct ListPartners {
    pub(crate) city: Option<String>,
    pub(crate) status: Option<PartnerStatus>,
    pub(crate) page: u32,
    pub(crate) size: u32,
}

impl From<ListPartners> for Request {
    fn from(value: ListPartners) -> Self {
        Self::new(Method::GET, [RESOURCE])
            .with_query("city", value.city)
            .with_query("status", value.status)
            .with_query("page", Some(value.page))
            .with_query("size", Some(value.size))
    }
}

impl Executor for ListPartners {
    type Response = Page<Partner>;
}

pub(crate) struct GetPartner {
    pub(crate) id: i64,
}

impl From<GetPartner> for Request {
    fn from(value: GetPartner) -> Self {
        Self::new(Method::GET, [RESOURCE.to_owned(), value.id.to_string()])
    }
}

impl Executor for GetPartner {
    type Response = Partner;
}

pub(crate) struct AvailablePartners {
    pub(crate) city: String,
}

impl From<AvailablePartners> for Request {
    fn from(value: AvailablePartners) -> Self {
        Self::new(Method::GET, [RESOURCE, "available"]).with_query("city", Some(value.city))
    }
}

impl Executor for AvailablePartners {
    type Response = Vec<Partner>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePartner {
    pub(crate) name: String,
    pub(crate) phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) email: Option<String>,
    pub(crate) city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) vehicle_type: Option<VehicleType>,
}

impl TryFrom<CreatePartner> for Request {
    type Error = error::Error;

    fn try_from(value: CreatePartner) -> Result<Self, Self::Error> {
        Self::new(Method::POST, [RESOURCE]).with_body(&value)
    }
}

impl Executor for CreatePartner {
    type Response = Partner;
}

pub(crate) struct UpdatePartnerStatus {
    pub(crate) partner_id: i64,
    pub(crate) status: PartnerStatus,
}

impl From<UpdatePartnerStatus> for Request {
    fn from(value: UpdatePartnerStatus) -> Self {
        Self::new(
            Method::PUT,
            [RESOURCE.to_owned(), value.partner_id.to_string(), "status".to_owned()],
        )
        .with_json(json!({ "status": value.status }))
    }
}

impl Executor for UpdatePartnerStatus {
    type Response = Partner;
}
