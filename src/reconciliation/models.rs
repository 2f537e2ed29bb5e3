use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::upstream::TransactionRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentMethod {
    CreditCard,
    Boleto,
    Pix,
    Other(String),
}

impl PaymentMethod {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Other(method) => method,
        }
    }
}

impl From<String> for PaymentMethod {
    fn from(method: String) -> Self {
        match method.as_str() {
            "credit_card" => PaymentMethod::CreditCard,
            "boleto" => PaymentMethod::Boleto,
            "pix" => PaymentMethod::Pix,
            _ => PaymentMethod::Other(method),
        }
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Other(method) => method,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Installments {
    #[serde(default, deserialize_with = "deserialize_count")]
    pub qty: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CardDetails {
    #[serde(default)]
    pub brand: Option<String>,
}

/// Typed view of a record's `payment` object
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub total: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub net: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub affiliate_value: Option<Decimal>,
    #[serde(default)]
    pub installments: Option<Installments>,
    #[serde(default)]
    pub credit_card: Option<CardDetails>,
}

impl Payment {
    /// Installment count, reading an absent or zero quantity as one.
    pub fn installment_count(&self) -> u32 {
        self.installments
            .as_ref()
            .and_then(|i| i.qty)
            .filter(|qty| *qty > 0)
            .unwrap_or(1)
    }

    pub fn card_brand(&self) -> Option<&str> {
        self.credit_card.as_ref().and_then(|c| c.brand.as_deref())
    }
}

/// Amounts arrive as JSON numbers or numeric strings.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_decimal(Option::<Value>::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}

/// Counts follow the same coercion as amounts but must be whole and
/// non-negative: `3`, `3.0` and `"3"` all read as 3.
fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match parse_decimal(Option::<Value>::deserialize(deserializer)?)
        .map_err(serde::de::Error::custom)?
    {
        Some(value) => value,
        None => return Ok(None),
    };

    if !value.fract().is_zero() {
        return Err(serde::de::Error::custom(format!("expected a whole count, found {}", value)));
    }
    value
        .to_u32()
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("count out of range: {}", value)))
}

fn parse_decimal(value: Option<Value>) -> Result<Option<Decimal>, String> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => return Err(format!("expected a number, found {}", other)),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|e| format!("invalid number {:?}: {}", text, e))
}

/// Itemized fees; the field set depends on the payment method.
///
/// Serializes as a flat `fee_name -> amount` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Discounts {
    CreditCard {
        mdr_fee: Decimal,
        anticipation_fee: Decimal,
        processing_fee: Decimal,
        transfer_fee: Decimal,
    },
    Boleto {
        boleto_fee: Decimal,
        processing_fee: Decimal,
        transfer_fee: Decimal,
    },
    Pix {
        pix_fee: Decimal,
        processing_fee: Decimal,
        transfer_fee: Decimal,
    },
    Other {
        processing_fee: Decimal,
        transfer_fee: Decimal,
    },
}

impl Discounts {
    /// Flattened `(fee_name, amount)` pairs, in serialization order.
    pub fn entries(&self) -> Vec<(&'static str, Decimal)> {
        match *self {
            Discounts::CreditCard {
                mdr_fee,
                anticipation_fee,
                processing_fee,
                transfer_fee,
            } => vec![
                ("mdr_fee", mdr_fee),
                ("anticipation_fee", anticipation_fee),
                ("processing_fee", processing_fee),
                ("transfer_fee", transfer_fee),
            ],
            Discounts::Boleto {
                boleto_fee,
                processing_fee,
                transfer_fee,
            } => vec![
                ("boleto_fee", boleto_fee),
                ("processing_fee", processing_fee),
                ("transfer_fee", transfer_fee),
            ],
            Discounts::Pix {
                pix_fee,
                processing_fee,
                transfer_fee,
            } => vec![
                ("pix_fee", pix_fee),
                ("processing_fee", processing_fee),
                ("transfer_fee", transfer_fee),
            ],
            Discounts::Other {
                processing_fee,
                transfer_fee,
            } => vec![
                ("processing_fee", processing_fee),
                ("transfer_fee", transfer_fee),
            ],
        }
    }

    pub fn get(&self, fee: &str) -> Option<Decimal> {
        self.entries()
            .into_iter()
            .find(|(name, _)| *name == fee)
            .map(|(_, amount)| amount)
    }
}

/// Net decomposition attached to a reconciled record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationDetails {
    pub payment_method: Option<PaymentMethod>,
    pub total_amount: Decimal,
    /// Net payable to the seller after the affiliate's share. Not clamped.
    pub net_amount: Decimal,
    pub discounts: Discounts,
    pub gross_affiliate_value: Decimal,
    pub net_affiliate_value: Decimal,
}

/// An upstream record plus its calculation, or the record untouched when
/// its payment data could not be reconciled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledTransaction {
    #[serde(flatten)]
    pub record: TransactionRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation_details: Option<CalculationDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_affiliate_value: Option<Decimal>,
}

impl ReconciledTransaction {
    pub fn calculated(record: TransactionRecord, details: CalculationDetails) -> Self {
        Self {
            net_affiliate_value: Some(details.net_affiliate_value),
            calculation_details: Some(details),
            record,
        }
    }

    pub fn passthrough(record: TransactionRecord) -> Self {
        Self {
            record,
            calculation_details: None,
            net_affiliate_value: None,
        }
    }
}
