//! Payment configuration and method types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::Amount;

/// Settlement channel of a payment method. Charge and refund behaviour is
/// dispatched on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Cash,
    Card,
    EWallet,
}

impl PaymentMethodKind {
    /// Simulated processing latency of the charge step.
    #[must_use]
    pub fn settlement_latency(self) -> Duration {
        match self {
            Self::Cash => Duration::from_millis(1000),
            Self::Card => Duration::from_millis(2000),
            Self::EWallet => Duration::from_millis(1500),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::EWallet => "e_wallet",
        }
    }
}

impl fmt::Display for PaymentMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub kind: PaymentMethodKind,
    pub enabled: bool,
}

impl PaymentMethod {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: PaymentMethodKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            enabled: true,
        }
    }
}

/// How `amount + tax` is rounded to whole minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    Up,
    Down,
    #[default]
    Nearest,
}

/// Transaction Processor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub methods: Vec<PaymentMethod>,
    /// Tax rate in basis points (1000 = 10%).
    pub tax_rate_bps: u32,
    pub rounding: RoundingPolicy,
    pub min_amount: Amount,
    pub max_amount: Amount,
    /// Upper bound on a single charge or refund step.
    pub charge_timeout_ms: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            methods: vec![
                PaymentMethod::new("cash", "Cash", PaymentMethodKind::Cash),
                PaymentMethod::new("card", "Credit/Debit Card", PaymentMethodKind::Card),
                PaymentMethod::new("ewallet", "E-Wallet", PaymentMethodKind::EWallet),
            ],
            tax_rate_bps: 1000,
            rounding: RoundingPolicy::Nearest,
            min_amount: 100,
            max_amount: 10_000_000,
            charge_timeout_ms: 5000,
        }
    }
}

impl PaymentConfig {
    /// Enabled method with this id.
    pub fn method(&self, method_id: &str) -> Option<&PaymentMethod> {
        self.methods
            .iter()
            .find(|method| method.id == method_id && method.enabled)
    }

    pub fn charge_timeout(&self) -> Duration {
        Duration::from_millis(self.charge_timeout_ms)
    }
}
