use serde::{Deserialize, Serialize};

use crate::calendar::MAX_INSTALLMENTS;
use crate::errors::{DebtError, Result};

/// ledger-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// currency assigned when a request carries none
    pub default_currency: String,
    /// window for the due-soon and upcoming-payments views
    pub due_soon_window_days: u32,
    /// upper bound on derived installment counts
    pub max_installments: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_currency: "Php".to_string(),
            due_soon_window_days: 7,
            max_installments: MAX_INSTALLMENTS,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_currency.trim().is_empty() {
            return Err(DebtError::InvalidConfiguration {
                message: "default_currency must not be empty".to_string(),
            });
        }
        if self.due_soon_window_days == 0 {
            return Err(DebtError::InvalidConfiguration {
                message: "due_soon_window_days must be positive".to_string(),
            });
        }
        if self.max_installments == 0 || self.max_installments > MAX_INSTALLMENTS {
            return Err(DebtError::InvalidConfiguration {
                message: format!("max_installments must be in 1..={MAX_INSTALLMENTS}"),
            });
        }
        Ok(())
    }
}
