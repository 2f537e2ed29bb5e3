use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::retrieval::DateRange;

// ========== REQUEST MODELS ==========

/// Body of `POST /api/transactions` and `POST /api/refunds`. Both bounds
/// are optional `YYYY-MM-DD` dates.
#[derive(Debug, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_date_order"))]
pub struct SettlementRequest {
    #[serde(default)]
    pub ordered_at_ini: Option<NaiveDate>,
    #[serde(default)]
    pub ordered_at_end: Option<NaiveDate>,
}

fn validate_date_order(request: &SettlementRequest) -> Result<(), ValidationError> {
    match (request.ordered_at_ini, request.ordered_at_end) {
        (Some(ini), Some(end)) if ini > end => {
            let mut error = ValidationError::new("date_order");
            error.message = Some("ordered_at_ini must not be after ordered_at_end".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

impl SettlementRequest {
    /// Parse a raw request body. An empty body means "no filters".
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let request: Self = serde_json::from_slice(body)
            .map_err(|e| AppError::InvalidInput(format!("Invalid JSON: {}", e)))?;
        request.validate()?;
        Ok(request)
    }

    pub fn date_range(&self, today: NaiveDate, lookback_days: u32) -> AppResult<DateRange> {
        DateRange::from_bounds(self.ordered_at_ini, self.ordered_at_end, today, lookback_days)
    }
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
