use chrono::NaiveDate;
use serde::Serialize;

pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// `None` when the total leaves the `i64` cent range.
pub fn room_total_cents(nights: i64, price_per_night_cents: i64) -> Option<i64> {
    nights.checked_mul(price_per_night_cents)
}

pub fn days_late(check_out_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - check_out_date).num_days().max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckOutBill {
    pub room_total_cents: i64,
    pub additional_charges_cents: i64,
    pub days_late: i64,
    pub late_fee_per_day_cents: i64,
    pub late_fee_cents: i64,
    pub total_cents: i64,
}

impl CheckOutBill {
    pub fn compute(
        room_total_cents: i64,
        additional_charges_cents: i64,
        check_out_date: NaiveDate,
        today: NaiveDate,
        late_fee_per_day_cents: i64,
    ) -> Option<Self> {
        let days_late = days_late(check_out_date, today);
        let late_fee_cents = days_late.checked_mul(late_fee_per_day_cents)?;
        let total_cents = room_total_cents
            .checked_add(additional_charges_cents)?
            .checked_add(late_fee_cents)?;
        Some(Self {
            room_total_cents,
            additional_charges_cents,
            days_late,
            late_fee_per_day_cents,
            late_fee_cents,
            total_cents,
        })
    }
}

/// Percentage with one decimal; zero when there is nothing to divide by.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 1000.0).round() / 10.0
}
