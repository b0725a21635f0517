// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::{Parser, Subcommand};

use crate::{
    api::{
        self,
        model::{PartnerStatus, VehicleType},
        Executor as _, DEFAULT_PAGE_SIZE,
    },
    error::Result,
};

use super::{print_page, print_table, Context};

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    List(List),
    Get(Get),
    Available(Available),
    Create(Create),
    Status(Status),
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        match self {
            Self::List(cmd) => cmd.execute(ctx).await,
            Self::Get(cmd) => cmd.execute(ctx).await,
            Self::Available(cmd) => cmd.execute(ctx).await,
            Self::Create(cmd) => cmd.execute(ctx).await,
            Self::Status(cmd) => cmd.execute(ctx).await,
        }
    }
}

/// List delivery partners.
#[derive(Debug, Parser)]
pub(crate) struct List {
    #[arg(long)]
    city: Option<String>,

    #[arg(long, value_enum)]
    status: Option<PartnerStatus>,

    #[arg(long, default_value_t = 0)]
    page: u32,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    size: u32,
}

#[async_trait]
impl super::Command for List {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let page = api::partners::ListPartners {
            city: self.city,
            status: self.status,
            page: self.page,
            size: self.size,
        }
        .execute(&ctx.authorized_client().await?)
        .await?;

        print_page(&page);
        Ok(())
    }
}

/// Show a single delivery partner.
#[derive(Debug, Parser)]
pub(crate) struct Get {
    id: i64,
}

#[async_trait]
impl super::Command for Get {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let partner = api::partners::GetPartner { id: self.id }
            .execute(&ctx.authorized_client().await?)
            .await?;
        print_table([partner]);
        Ok(())
    }
}

/// List the partners in a city who can take an order right now.
#[derive(Debug, Parser)]
pub(crate) struct Available {
    city: String,
}

#[async_trait]
impl super::Command for Available {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let partners = api::partners::AvailablePartners { city: self.city }
            .execute(&ctx.authorized_client().await?)
            .await?;

        if partners.is_empty() {
            println!("Nobody is available.");
        } else {
            print_table(partners);
        }
        Ok(())
    }
}

/// Register a new delivery partner.
#[derive(Debug, Parser)]
pub(crate) struct Create {
    #[arg(long)]
    name: String,

    #[arg(long)]
    phone: String,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    city: String,

    #[arg(long, value_enum)]
    vehicle: Option<VehicleType>,
}

#[async_trait]
impl super::Command for Create {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let partner = api::partners::CreatePartner {
            name: self.name,
            phone: self.phone,
            email: self.email,
            city: self.city,
            vehicle_type: self.vehicle,
        }
        .execute(&ctx.authorized_client().await?)
        .await?;
        print_table([partner]);
        Ok(())
    }
}

/// Change a partner's availability.
#[derive(Debug, Parser)]
pub(crate) struct Status {
    id: i64,

    #[arg(value_enum)]
    status: PartnerStatus,
}

#[async_trait]
impl super::Command for Status {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let partner = api::partners::UpdatePartnerStatus {
            partner_id: self.id,
            status: self.status,
        }
        .execute(&ctx.authorized_client().await?)
        .await?;
        print_table([partner]);
        Ok(())
    }
}
