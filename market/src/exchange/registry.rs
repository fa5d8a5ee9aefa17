//! Exchange id to provider resolution

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::exchange::{ExchangeKind, ExchangeProvider};
use crate::{MarketError, Result};

/// Maps every [`ExchangeKind`] to its provider.
pub struct ProviderRegistry {
    providers: HashMap<ExchangeKind, Arc<dyn ExchangeProvider>>,
    testing_mode: bool,
}

impl ProviderRegistry {
    /// Fails unless every exchange kind has exactly one provider.
    pub fn new(providers: Vec<Arc<dyn ExchangeProvider>>, testing_mode: bool) -> Result<Self> {
        let mut by_kind: HashMap<ExchangeKind, Arc<dyn ExchangeProvider>> = HashMap::new();
        for provider in providers {
            let kind = provider.exchange();
            if by_kind.insert(kind, provider).is_some() {
                return Err(MarketError::Configuration(format!(
                    "more than one provider registered for {kind}"
                )));
            }
        }
        if let Some(missing) = ExchangeKind::ALL.iter().find(|kind| !by_kind.contains_key(kind)) {
            return Err(MarketError::Configuration(format!("no provider registered for {missing}")));
        }

        Ok(Self {
            providers: by_kind,
            testing_mode,
        })
    }

    pub fn testing_mode(&self) -> bool {
        self.testing_mode
    }

    /// In testing mode every id resolves to the test provider. Otherwise the id
    /// is matched case-insensitively against the live exchanges.
    pub fn resolve(&self, exchange_id: &str) -> Result<Arc<dyn ExchangeProvider>> {
        let kind = if self.testing_mode {
            ExchangeKind::Test
        } else {
            match ExchangeKind::from_code(exchange_id) {
                Some(kind) if kind != ExchangeKind::Test => kind,
                _ => return Err(MarketError::UnsupportedExchange(exchange_id.to_string())),
            }
        };
        debug!(exchange_id, resolved = %kind, "resolved exchange provider");

        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| MarketError::UnsupportedExchange(exchange_id.to_string()))
    }
}
