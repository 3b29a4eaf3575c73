//! Stay date arithmetic: spans, nights, and quoting.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{HotelError, Result};
use crate::money::Money;

/// A half-open stay interval `[check_in, check_out)`.
///
/// The check-out date is exclusive: a stay ending on a given day does not
/// claim that night, so a checkout day may coincide with the next guest's
/// check-in day without conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaySpan {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StaySpan {
    /// Creates a span, rejecting `check_out <= check_in`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self> {
        if check_out <= check_in {
            return Err(HotelError::validation(format!(
                "check-out ({check_out}) must be after check-in ({check_in})"
            )));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of nights in the stay (calendar-day difference).
    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days() as u32
    }

    /// The authoritative half-open overlap test.
    ///
    /// `a.check_in < b.check_out && a.check_out > b.check_in` — spans that
    /// merely touch at a boundary do not overlap.
    pub fn overlaps(&self, other: &StaySpan) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }
}

/// A priced stay: what a reservation for a span would cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub nights: u32,
    pub total: Money,
}

impl Quote {
    /// Prices a span at the given nightly rate.
    pub fn for_stay(nightly_rate: Money, span: &StaySpan) -> Self {
        let nights = span.nights();
        Self {
            nights,
            total: nightly_rate.multiply(nights),
        }
    }
}
