//! `SeaORM` Entity, @generated manually

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// One stored OHLCV candle. `(symbol, interval_code, open_time, exchange)` is unique.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "candle_data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: u64,
    pub symbol: String,        // upper-cased, e.g. "BTCUSDT"
    pub interval_code: String, // "1m", "1h", "1M", ...
    pub open_time: i64,        // epoch millis
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub open_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub high_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub low_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub close_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub volume: Decimal,
    pub close_time: i64, // open_time + interval duration
    pub exchange: String, // lower-cased, e.g. "binance"
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
