// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use log::error;

use crate::{
    api::{
        self,
        model::{Order, OrderStatus},
        Executor as _, DEFAULT_PAGE_SIZE,
    },
    error::{self, Result},
};

use super::{print_page, print_table, Context};

fn print_order(order: &Order) {
    print_table([order]);
    println!("Customer phone: {}", order.customer_phone);
    println!("Pickup: {}", order.pickup_address);
    println!("Delivery: {}", order.delivery_address);
    if let Some(reason) = order.cancellation_reason.as_ref() {
        match order.cancelled_at {
            Some(at) => println!("Cancelled {}: {reason}", at.format("%Y-%m-%d %H:%M")),
            None => println!("Cancelled: {reason}"),
        }
    }
    if order.status.is_terminal() {
        println!("This order is closed.");
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    List(List),
    Get(Get),
    Find(Find),
    Create(Create),
    Assign(Assign),
    Advance(Advance),
    Status(Status),
    Cancel(Cancel),
    History(History),
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        match self {
            Self::List(cmd) => cmd.execute(ctx).await,
            Self::Get(cmd) => cmd.execute(ctx).await,
            Self::Find(cmd) => cmd.execute(ctx).await,
            Self::Create(cmd) => cmd.execute(ctx).await,
            Self::Assign(cmd) => cmd.execute(ctx).await,
            Self::Advance(cmd) => cmd.execute(ctx).await,
            Self::Status(cmd) => cmd.execute(ctx).await,
            Self::Cancel(cmd) => cmd.execute(ctx).await,
            Self::History(cmd) => cmd.execute(ctx).await,
        }
    }
}

/// List orders, newest first.
#[derive(Debug, Parser)]
pub(crate) struct List {
    /// Only show orders in this city.
    #[arg(long)]
    city: Option<String>,

    /// Only show orders with this status.
    #[arg(long, value_enum)]
    status: Option<OrderStatus>,

    /// The page to show, starting from 0.
    #[arg(long, default_value_t = 0)]
    page: u32,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    size: u32,
}

#[async_trait]
impl super::Command for List {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let page = api::orders::ListOrders {
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

/// Show a single order.
#[derive(Debug, Parser)]
pub(crate) struct Get {
    id: i64,
}

#[async_trait]
impl super::Command for Get {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let order = api::orders::GetOrder { id: self.id }
            .execute(&ctx.authorized_client().await?)
            .await?;
        print_order(&order);
        Ok(())
    }
}

/// Look an order up by its order number.
#[derive(Debug, Parser)]
pub(crate) struct Find {
    order_number: String,
}

#[async_trait]
impl super::Command for Find {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let order = api::orders::FindOrder {
            order_number: self.order_number,
        }
        .execute(&ctx.authorized_client().await?)
        .await?;
        print_order(&order);
        Ok(())
    }
}

/// Place a new order.
#[derive(Debug, Parser)]
pub(crate) struct Create {
    #[arg(long)]
    customer_name: String,

    #[arg(long)]
    customer_phone: String,

    #[arg(long)]
    pickup_address: String,

    #[arg(long)]
    delivery_address: String,

    #[arg(long)]
    city: String,

    /// Ask the server to assign an available partner in the same city. The
    /// order is placed even if nobody is available.
    #[arg(long)]
    auto_assign: bool,
}

#[async_trait]
impl super::Command for Create {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let auto_assign = self.auto_assign;
        let order = api::orders::CreateOrder {
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            pickup_address: self.pickup_address,
            delivery_address: self.delivery_address,
            city: self.city,
            auto_assign,
        }
        .execute(&ctx.authorized_client().await?)
        .await?;

        print_order(&order);
        if auto_assign && order.delivery_partner.is_none() {
            println!("No partner was available. The order is waiting for assignment.");
        }
        Ok(())
    }
}

/// Assign a delivery partner to an order. Without a partner, lists who is
/// available in the order's city.
#[derive(Debug, Parser)]
pub(crate) struct Assign {
    order_id: i64,

    #[arg(long)]
    partner: Option<i64>,
}

#[async_trait]
impl super::Command for Assign {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let client = ctx.authorized_client().await?;

        let partner_id = match self.partner {
            Some(id) => id,
            None => {
                let order = api::orders::GetOrder { id: self.order_id }
                    .execute(&client)
                    .await?;
                let partners = api::partners::AvailablePartners {
                    city: order.city.clone(),
                }
                .execute(&client)
                .await?;

                if partners.is_empty() {
                    println!("Nobody is available in {}.", order.city);
                } else {
                    print_table(&partners);
                    println!("Pick one with --partner <ID>.");
                }
                return Ok(());
            }
        };

        let order = api::orders::AssignPartner {
            order_id: self.order_id,
            partner_id,
        }
        .execute(&client)
        .await?;
        print_order(&order);
        Ok(())
    }
}

/// Move an order one step along PLACED, ASSIGNED, PICKED, DELIVERED.
#[derive(Debug, Parser)]
pub(crate) struct Advance {
    order_id: i64,
}

#[async_trait]
impl super::Command for Advance {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let client = ctx.authorized_client().await?;
        let order = api::orders::GetOrder { id: self.order_id }
            .execute(&client)
            .await?;

        let Some(status) = order.status.next() else {
            error!(
                "Order {} is {} and cannot move forward",
                order.order_number, order.status
            );
            return Err(error::Error::Command);
        };

        let order = api::orders::UpdateOrderStatus {
            order_id: self.order_id,
            status,
        }
        .execute(&client)
        .await?;
        print_order(&order);
        Ok(())
    }
}

/// Request a specific status. The server decides whether the transition is
/// allowed.
#[derive(Debug, Parser)]
pub(crate) struct Status {
    order_id: i64,

    #[arg(value_enum)]
    status: OrderStatus,
}

#[async_trait]
impl super::Command for Status {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let order = api::orders::UpdateOrderStatus {
            order_id: self.order_id,
            status: self.status,
        }
        .execute(&ctx.authorized_client().await?)
        .await?;
        print_order(&order);
        Ok(())
    }
}

/// Cancel an order.
#[derive(Debug, Parser)]
pub(crate) struct Cancel {
    order_id: i64,

    /// Why the order is being cancelled.
    #[arg(long)]
    reason: String,
}

#[async_trait]
impl super::Command for Cancel {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let order = api::orders::CancelOrder {
            order_id: self.order_id,
            reason: self.reason,
        }
        .execute(&ctx.authorized_client().await?)
        .await?;
        print_order(&order);
        Ok(())
    }
}

/// Show the audit trail of an order.
#[derive(Debug, Parser)]
pub(crate) struct History {
    order_id: i64,
}

#[async_trait]
impl super::Command for History {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let entries = api::orders::OrderHistory {
            order_id: self.order_id,
        }
        .execute(&ctx.authorized_client().await?)
        .await?;

        if entries.is_empty() {
            println!("No history recorded.");
        } else {
            print_table(&entries);
        }
        Ok(())
    }
}
