use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CandleData::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CandleData::Id).big_unsigned().auto_increment().primary_key())
                    .col(ColumnDef::new(CandleData::Symbol).string_len(32).not_null())
                    .col(ColumnDef::new(CandleData::IntervalCode).string_len(8).not_null())
                    .col(ColumnDef::new(CandleData::OpenTime).big_integer().not_null()) // epoch millis
                    .col(ColumnDef::new(CandleData::OpenPrice).decimal_len(38, 18).not_null())
                    .col(ColumnDef::new(CandleData::HighPrice).decimal_len(38, 18).not_null())
                    .col(ColumnDef::new(CandleData::LowPrice).decimal_len(38, 18).not_null())
                    .col(ColumnDef::new(CandleData::ClosePrice).decimal_len(38, 18).not_null())
                    .col(ColumnDef::new(CandleData::Volume).decimal_len(38, 18).not_null())
                    .col(ColumnDef::new(CandleData::CloseTime).big_integer().not_null())
                    .col(ColumnDef::new(CandleData::Exchange).string_len(32).not_null())
                    .to_owned(),
            )
            .await?;

        // Final backstop against a lost exists-then-insert race.
        manager
            .create_index(
                Index::create()
                    .name("uq_candle")
                    .table(CandleData::Table)
                    .col(CandleData::Symbol)
                    .col(CandleData::IntervalCode)
                    .col(CandleData::OpenTime)
                    .col(CandleData::Exchange)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_candle_symbol_interval_time")
                    .table(CandleData::Table)
                    .col(CandleData::Symbol)
                    .col(CandleData::IntervalCode)
                    .col(CandleData::OpenTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CandleData::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CandleData {
    Table,
    Id,
    Symbol,
    IntervalCode,
    OpenTime,
    OpenPrice,
    HighPrice,
    LowPrice,
    ClosePrice,
    Volume,
    CloseTime,
    Exchange,
}
