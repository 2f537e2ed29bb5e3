use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{error, info};

use super::fees::{table_rate, AnticipationPolicy, FeeSchedule};
use super::models::{CalculationDetails, Discounts, Payment, PaymentMethod, ReconciledTransaction};
use super::totals::AggregateTotals;
use crate::error::{MalformedRecordError, ReconcileError};
use crate::upstream::TransactionRecord;

/// Largest amount accepted on a single record
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000_000);
/// Largest installment count accepted on a single record
pub const MAX_INSTALLMENTS: u32 = 1_000;

/// Reconciled records plus batch totals
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub transactions: Vec<ReconciledTransaction>,
    pub totals: AggregateTotals,
}

/// Turns raw gateway records into net settlement amounts.
///
/// Holds no state between calls: the same input always produces the same
/// output.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    fees: FeeSchedule,
}

impl Reconciler {
    pub fn new(fees: FeeSchedule) -> Self {
        Self { fees }
    }

    /// Reconcile a batch. Records with unusable payment data are logged and
    /// passed through without `calculation_details`; only a failure of the
    /// totals fold aborts the call.
    pub fn reconcile(&self, records: &[TransactionRecord]) -> Result<Reconciliation, ReconcileError> {
        let transactions: Vec<ReconciledTransaction> = records
            .iter()
            .map(|record| match self.calculate(record) {
                Ok(details) => ReconciledTransaction::calculated(record.clone(), details),
                Err(err) => {
                    error!("Failed to reconcile transaction {}: {}", record.id_label(), err);
                    ReconciledTransaction::passthrough(record.clone())
                }
            })
            .collect();

        let totals = AggregateTotals::from_transactions(&transactions)?;

        info!(
            "Totals computed: {} transactions, net {}, affiliate net {}",
            totals.total_transactions, totals.total_net_amount, totals.total_net_affiliate_value
        );

        Ok(Reconciliation {
            transactions,
            totals,
        })
    }

    /// Net decomposition of a single record.
    pub fn calculate(&self, record: &TransactionRecord) -> Result<CalculationDetails, MalformedRecordError> {
        let payment = decode_payment(record)?;
        let id = record.id_label();

        let total_amount = checked_amount(&id, "total", payment.total.unwrap_or(Decimal::ZERO))?;
        let gross_affiliate_value = payment.affiliate_value.unwrap_or(Decimal::ZERO);
        if gross_affiliate_value.abs() > MAX_AMOUNT {
            return Err(MalformedRecordError::Overflow(id));
        }
        let net_affiliate_value = self.net_affiliate_value(gross_affiliate_value);

        let (net_amount, discounts) = match &payment.method {
            Some(PaymentMethod::CreditCard) => self.credit_card(&id, &payment, total_amount)?,
            Some(PaymentMethod::Boleto) => self.boleto(total_amount),
            Some(PaymentMethod::Pix) => self.pix(total_amount),
            Some(PaymentMethod::Other(_)) | None => self.reported_net(&id, &payment, total_amount)?,
        };

        Ok(CalculationDetails {
            payment_method: payment.method,
            total_amount,
            net_amount: net_amount - net_affiliate_value,
            discounts,
            gross_affiliate_value,
            net_affiliate_value,
        })
    }

    fn credit_card(
        &self,
        id: &str,
        payment: &Payment,
        total_amount: Decimal,
    ) -> Result<(Decimal, Discounts), MalformedRecordError> {
        let installments = payment.installment_count();
        if installments > MAX_INSTALLMENTS {
            return Err(MalformedRecordError::InvalidPayment {
                id: id.to_string(),
                message: format!("installment count {} out of range", installments),
            });
        }

        let card_rate = self.fees.card_rates.rate_for(payment.card_brand(), installments);
        let gross_amount = total_amount * (Decimal::ONE - card_rate);
        let net_after_anticipation = self.anticipate(gross_amount, installments);

        let net_amount = net_after_anticipation - self.fees.fixed_fees();
        let discounts = Discounts::CreditCard {
            mdr_fee: total_amount * card_rate,
            anticipation_fee: gross_amount - net_after_anticipation,
            processing_fee: self.fees.processing_fee,
            transfer_fee: self.fees.transfer_fee,
        };

        Ok((net_amount, discounts))
    }

    /// Amount left from `gross_amount` once the installments are advanced.
    fn anticipate(&self, gross_amount: Decimal, installments: u32) -> Decimal {
        match &self.fees.anticipation {
            AnticipationPolicy::PerInstallment => {
                let parcel = gross_amount / Decimal::from(installments);
                (1..=installments)
                    .map(|i| {
                        let months_advanced = Decimal::from(30 * i) / Decimal::from(30);
                        parcel - parcel * self.fees.anticipation_rate * months_advanced
                    })
                    .sum()
            }
            AnticipationPolicy::InstallmentTable(table) => {
                gross_amount - gross_amount * table_rate(table, installments)
            }
        }
    }

    fn boleto(&self, total_amount: Decimal) -> (Decimal, Discounts) {
        let net_amount = total_amount - self.fees.boleto_fee - self.fees.fixed_fees();
        let discounts = Discounts::Boleto {
            boleto_fee: self.fees.boleto_fee,
            processing_fee: self.fees.processing_fee,
            transfer_fee: self.fees.transfer_fee,
        };
        (net_amount, discounts)
    }

    fn pix(&self, total_amount: Decimal) -> (Decimal, Discounts) {
        let pix_fee = total_amount * self.fees.pix_fee_percentage;
        let net_amount = total_amount - pix_fee - self.fees.fixed_fees();
        let discounts = Discounts::Pix {
            pix_fee,
            processing_fee: self.fees.processing_fee,
            transfer_fee: self.fees.transfer_fee,
        };
        (net_amount, discounts)
    }

    /// Methods without a fee model keep the gateway's own net figure.
    fn reported_net(
        &self,
        id: &str,
        payment: &Payment,
        total_amount: Decimal,
    ) -> Result<(Decimal, Discounts), MalformedRecordError> {
        let net_amount = match payment.net {
            Some(net) if net.abs() > MAX_AMOUNT => {
                return Err(MalformedRecordError::Overflow(id.to_string()))
            }
            Some(net) => net,
            None => total_amount,
        };
        let discounts = Discounts::Other {
            processing_fee: self.fees.processing_fee,
            transfer_fee: self.fees.transfer_fee,
        };
        Ok((net_amount, discounts))
    }

    /// Affiliate payout net of the same card costs: default MDR, one
    /// anticipation period and the fixed fees. Never negative.
    pub fn net_affiliate_value(&self, affiliate_value: Decimal) -> Decimal {
        if affiliate_value <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let mdr_fee = affiliate_value * self.fees.card_rates.fallback();
        let anticipation_fee = (affiliate_value - mdr_fee) * self.fees.anticipation_rate;
        let net = affiliate_value - mdr_fee - anticipation_fee - self.fees.fixed_fees();

        net.max(Decimal::ZERO)
    }
}

fn decode_payment(record: &TransactionRecord) -> Result<Payment, MalformedRecordError> {
    let raw = match &record.payment {
        Some(raw) if raw.is_object() => raw.clone(),
        _ => return Err(MalformedRecordError::MissingPayment(record.id_label())),
    };

    serde_json::from_value(raw).map_err(|e| MalformedRecordError::InvalidPayment {
        id: record.id_label(),
        message: e.to_string(),
    })
}

fn checked_amount(id: &str, field: &'static str, value: Decimal) -> Result<Decimal, MalformedRecordError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MalformedRecordError::NegativeAmount {
            id: id.to_string(),
            field,
            value: value.to_string(),
        });
    }
    if value > MAX_AMOUNT {
        return Err(MalformedRecordError::Overflow(id.to_string()));
    }
    Ok(value)
}
