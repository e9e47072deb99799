//! Invocation context

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surety_common::AccountId;

/// Caller identity and the value attached to a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: AccountId,
    /// Native value sent with payable calls, zero otherwise
    pub value: Decimal,
}

impl CallContext {
    pub fn new(caller: AccountId) -> Self {
        Self {
            caller,
            value: Decimal::ZERO,
        }
    }

    pub fn with_value(mut self, value: Decimal) -> Self {
        self.value = value;
        self
    }
}

impl From<AccountId> for CallContext {
    fn from(caller: AccountId) -> Self {
        Self::new(caller)
    }
}
