//! MySQL candle storage through sea-orm

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::prelude::*;
use sea_orm::{QueryOrder, QuerySelect, SqlErr};
use shared::entity::candle_data;
use tracing::debug;

use crate::data::{CandleKey, StoredCandle};
use crate::store::{CandleFilter, CandleStore, InsertOutcome};
use crate::Result;

fn is_duplicate_key(err: &SqlErr) -> bool {
    matches!(err, SqlErr::UniqueConstraintViolation(_))
}

pub struct SeaOrmCandleStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmCandleStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CandleStore for SeaOrmCandleStore {
    async fn exists(&self, key: &CandleKey) -> Result<bool> {
        let count = candle_data::Entity::find()
            .filter(candle_data::Column::Symbol.eq(key.symbol.as_str()))
            .filter(candle_data::Column::IntervalCode.eq(key.interval_code.as_str()))
            .filter(candle_data::Column::OpenTime.eq(key.open_time))
            .filter(candle_data::Column::Exchange.eq(key.exchange.as_str()))
            .count(self.db.as_ref())
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, candle: StoredCandle) -> Result<InsertOutcome> {
        let key = candle.key();
        match candle_data::Entity::insert(candle.into_active_model())
            .exec(self.db.as_ref())
            .await
        {
            Ok(_) => Ok(InsertOutcome::Inserted),
            // Lost the race against a concurrent ingestion of the same candle.
            Err(e) if e.sql_err().as_ref().is_some_and(is_duplicate_key) => {
                debug!(?key, "unique key already present, insert skipped");
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_range(&self, filter: &CandleFilter) -> Result<Vec<StoredCandle>> {
        let mut query = candle_data::Entity::find()
            .filter(candle_data::Column::Symbol.eq(filter.symbol.as_str()))
            .filter(candle_data::Column::IntervalCode.eq(filter.interval_code.as_str()))
            .filter(candle_data::Column::OpenTime.between(filter.start_time, filter.end_time));
        if let Some(exchange) = &filter.exchange {
            query = query.filter(candle_data::Column::Exchange.eq(exchange.as_str()));
        }

        let rows = query
            .order_by_desc(candle_data::Column::OpenTime)
            .limit(filter.limit)
            .all(self.db.as_ref())
            .await?;
        Ok(rows.into_iter().map(StoredCandle::from).collect())
    }

    async fn distinct_intervals(&self, symbol: &str) -> Result<Vec<String>> {
        let intervals: Vec<String> = candle_data::Entity::find()
            .select_only()
            .column(candle_data::Column::IntervalCode)
            .distinct()
            .filter(candle_data::Column::Symbol.eq(symbol))
            .order_by_asc(candle_data::Column::IntervalCode)
            .into_tuple()
            .all(self.db.as_ref())
            .await?;
        Ok(intervals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MarketError;
    use rust_decimal::Decimal;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn record() -> StoredCandle {
        StoredCandle {
            symbol: "BTCUSDT".into(),
            interval_code: "1m".into(),
            open_time: 60_000,
            open_price: Decimal::from(100),
            high_price: Decimal::from(110),
            low_price: Decimal::from(90),
            close_price: Decimal::from(105),
            volume: Decimal::from(3),
            close_time: 120_000,
            exchange: "binance".into(),
        }
    }

    fn store(db: MockDatabase) -> SeaOrmCandleStore {
        SeaOrmCandleStore::new(Arc::new(db.into_connection()))
    }

    #[test]
    fn only_unique_violations_are_duplicates() {
        assert!(is_duplicate_key(&SqlErr::UniqueConstraintViolation(
            "Duplicate entry 'BTCUSDT-1m-60000-binance' for key 'uq_candle'".into()
        )));
        assert!(!is_duplicate_key(&SqlErr::ForeignKeyConstraintViolation("fk".into())));
    }

    #[tokio::test]
    async fn insert_reports_inserted() {
        let db = MockDatabase::new(DatabaseBackend::MySql).append_exec_results([MockExecResult {
            last_insert_id: 7,
            rows_affected: 1,
        }]);
        let outcome = store(db).insert(record()).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);
    }

    #[tokio::test]
    async fn other_insert_failures_are_storage_errors() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_errors([DbErr::Custom("connection reset".into())]);
        let err = store(db).insert(record()).await.unwrap_err();
        assert!(matches!(err, MarketError::Storage(ref msg) if msg.contains("connection reset")));
    }

    #[tokio::test]
    async fn exists_counts_matching_rows() {
        let db = MockDatabase::new(DatabaseBackend::MySql).append_query_results([
            vec![BTreeMap::from([("num_items", Value::Int(Some(1)))])],
            vec![BTreeMap::from([("num_items", Value::Int(Some(0)))])],
        ]);
        let store = store(db);
        let key = record().key();
        assert!(store.exists(&key).await.unwrap());
        assert!(!store.exists(&key).await.unwrap());
    }
}
