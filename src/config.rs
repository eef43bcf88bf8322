use serde::{Deserialize, Serialize};

use crate::decimal::Money;

/// ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LedgerConfig {
    pub suspense: SuspensePolicy,
}

/// policy for advance credit accumulated from over-payment
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SuspensePolicy {
    /// maximum suspense balance a single loan may hold; None means uncapped
    pub limit: Option<Money>,
}

impl SuspensePolicy {
    pub fn capped(limit: Money) -> Self {
        Self { limit: Some(limit) }
    }

    /// check a prospective balance against the policy
    pub fn allows(&self, balance: Money) -> bool {
        match self.limit {
            Some(limit) => balance <= limit,
            None => true,
        }
    }
}
