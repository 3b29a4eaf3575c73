//! Payment records against bookings.

use chrono::{DateTime, Utc};
use common::{BookingId, PaymentId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{HotelError, Result};
use crate::money::Money;

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = HotelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "cash" => Ok(PaymentMethod::Cash),
            "transfer" => Ok(PaymentMethod::Transfer),
            other => Err(HotelError::validation(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

/// A payment recorded against a booking. Recording one never mutates the
/// booking or room status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub recorded_by: UserId,
    pub recorded_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a payment record; the amount must be strictly positive.
    pub fn new(
        booking_id: BookingId,
        amount: Money,
        method: PaymentMethod,
        recorded_by: UserId,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self> {
        if !amount.is_positive() {
            return Err(HotelError::validation(format!(
                "payment amount must be positive, got {amount}"
            )));
        }
        Ok(Self {
            id: PaymentId::new(),
            booking_id,
            amount,
            method,
            recorded_by,
            recorded_at,
        })
    }
}
