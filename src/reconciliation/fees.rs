use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fixed processing fee charged once per transaction
pub const PROCESSING_FEE: Decimal = dec!(0.44);
/// Fixed fee for transferring the proceeds
pub const TRANSFER_FEE: Decimal = dec!(3.67);
/// Flat boleto fee
pub const BOLETO_FEE: Decimal = dec!(2.99);
/// Pix fee (0.95% of the total)
pub const PIX_FEE_PERCENTAGE: Decimal = dec!(0.0095);
/// Anticipation discount per 30 days advanced (1.90%)
pub const ANTICIPATION_RATE: Decimal = dec!(0.019);

pub const CARD_BRANDS: [&str; 5] = ["visa", "mastercard", "elo", "amex", "hipercard"];

/// MDR tiers for one card brand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardRates {
    pub single: Decimal,
    pub two_to_six: Decimal,
    pub seven_plus: Decimal,
}

impl CardRates {
    pub fn for_installments(&self, installments: u32) -> Decimal {
        match installments {
            0 | 1 => self.single,
            2..=6 => self.two_to_six,
            _ => self.seven_plus,
        }
    }
}

impl Default for CardRates {
    fn default() -> Self {
        Self {
            single: dec!(0.0160),
            two_to_six: dec!(0.0211),
            seven_plus: dec!(0.0211),
        }
    }
}

/// Per-brand MDR lookup
#[derive(Debug, Clone)]
pub struct CardRateTable {
    brands: HashMap<String, CardRates>,
    /// Used for unknown brands and for affiliate payouts
    fallback: Decimal,
}

impl Default for CardRateTable {
    fn default() -> Self {
        let rates = CardRates::default();
        let brands = CARD_BRANDS
            .iter()
            .map(|brand| (brand.to_string(), rates))
            .collect();

        Self {
            brands,
            fallback: rates.seven_plus,
        }
    }
}

impl CardRateTable {
    pub fn fallback(&self) -> Decimal {
        self.fallback
    }

    /// MDR for `brand` at `installments`. Missing or unknown brands get the
    /// fallback rate; this never fails.
    pub fn rate_for(&self, brand: Option<&str>, installments: u32) -> Decimal {
        let brand = match brand.map(str::trim).filter(|b| !b.is_empty()) {
            Some(brand) => brand,
            None => {
                warn!("Card brand not provided, using default rate");
                return self.fallback;
            }
        };

        match self.brands.get(&brand.to_lowercase()) {
            Some(rates) => rates.for_installments(installments),
            None => {
                warn!("Card brand {} not recognized, using default rate", brand);
                self.fallback
            }
        }
    }
}

/// Configured choice of anticipation model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnticipationPolicyKind {
    #[default]
    PerInstallment,
    InstallmentTable,
}

/// How the anticipation discount on card sales is computed.
#[derive(Debug, Clone, PartialEq)]
pub enum AnticipationPolicy {
    /// Parcel `i` is discounted `ANTICIPATION_RATE * i` of its value.
    PerInstallment,
    /// A single percentage of the post-MDR amount, by installment count.
    /// Counts past the last entry use the last entry.
    InstallmentTable(BTreeMap<u32, Decimal>),
}

impl AnticipationPolicy {
    pub fn from_kind(kind: AnticipationPolicyKind) -> Self {
        match kind {
            AnticipationPolicyKind::PerInstallment => AnticipationPolicy::PerInstallment,
            AnticipationPolicyKind::InstallmentTable => {
                AnticipationPolicy::InstallmentTable(default_installment_table())
            }
        }
    }
}

/// 1x → 1.90%, 2x → 2.85%, ... 12x → 12.35%
pub fn default_installment_table() -> BTreeMap<u32, Decimal> {
    (1..=12u32)
        .map(|n| (n, ANTICIPATION_RATE * Decimal::from(n + 1) / Decimal::TWO))
        .collect()
}

pub(crate) fn table_rate(table: &BTreeMap<u32, Decimal>, installments: u32) -> Decimal {
    table
        .range(..=installments)
        .next_back()
        .or_else(|| table.iter().next())
        .map(|(_, rate)| *rate)
        .unwrap_or(Decimal::ZERO)
}

/// Every rate and fixed fee the reconciler applies
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    pub processing_fee: Decimal,
    pub transfer_fee: Decimal,
    pub boleto_fee: Decimal,
    pub pix_fee_percentage: Decimal,
    pub anticipation_rate: Decimal,
    pub card_rates: CardRateTable,
    pub anticipation: AnticipationPolicy,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            processing_fee: PROCESSING_FEE,
            transfer_fee: TRANSFER_FEE,
            boleto_fee: BOLETO_FEE,
            pix_fee_percentage: PIX_FEE_PERCENTAGE,
            anticipation_rate: ANTICIPATION_RATE,
            card_rates: CardRateTable::default(),
            anticipation: AnticipationPolicy::PerInstallment,
        }
    }
}

impl FeeSchedule {
    pub fn with_anticipation(mut self, anticipation: AnticipationPolicy) -> Self {
        self.anticipation = anticipation;
        self
    }

    /// Processing plus transfer fee
    pub fn fixed_fees(&self) -> Decimal {
        self.processing_fee + self.transfer_fee
    }
}
