//! Migration to create the trading_plans table
//!
//! One row per parsed channel message. `message_id` is the upstream id and
//! the deduplication key, so it carries a unique index.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TradingPlans::Table)
                    .if_not_exists()
                    .col(pk_auto(TradingPlans::Id))
                    .col(big_integer(TradingPlans::MessageId).not_null())
                    .col(timestamp(TradingPlans::Datetime).not_null())
                    .col(string(TradingPlans::Name).not_null())
                    .col(json(TradingPlans::Buy).not_null())
                    .col(json(TradingPlans::Tp).not_null())
                    .col(big_integer(TradingPlans::Sl).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_trading_plans_message_id")
                    .table(TradingPlans::Table)
                    .col(TradingPlans::MessageId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // History is always ordered by datetime, and the previous-plan lookup
        // filters on name + datetime
        manager
            .create_index(
                Index::create()
                    .name("ix_trading_plans_datetime")
                    .table(TradingPlans::Table)
                    .col(TradingPlans::Datetime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_trading_plans_name_datetime")
                    .table(TradingPlans::Table)
                    .col(TradingPlans::Name)
                    .col(TradingPlans::Datetime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TradingPlans::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TradingPlans {
    Table,
    Id,
    MessageId,
    Datetime,
    Name,
    Buy,
    Tp,
    Sl,
}
