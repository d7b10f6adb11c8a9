use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::db::{BookingFilter, Payment};
use crate::domain::billing::percentage;
use crate::domain::{BookingStatus, PaymentStatus, RoomStatus};

use super::payments::{day_window, PaymentSummary};
use super::{HotelCore, HotelError, HotelResult};

pub const MAX_REVENUE_DAYS: i64 = 366;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub total_rooms: i64,
    pub occupied_rooms: i64,
    pub occupancy_rate: f64,
    pub rooms_by_status: BTreeMap<RoomStatus, i64>,
    pub arrivals_today: i64,
    pub departures_today: i64,
    pub bookings_by_status: BTreeMap<BookingStatus, i64>,
    pub open_complaints: i64,
    pub unread_messages: i64,
    pub month_revenue: PaymentSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevenuePoint {
    pub date: NaiveDate,
    pub net_cents: i64,
}

/// Net takings per calendar day of `from..=to`, zero-filled.
pub fn daily_revenue(payments: &[Payment], from: NaiveDate, to: NaiveDate) -> Vec<RevenuePoint> {
    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for payment in payments {
        if payment.status == PaymentStatus::Completed {
            *per_day.entry(payment.created_at.date_naive()).or_default() += payment.amount_cents;
        }
    }
    from.iter_days()
        .take_while(|day| *day <= to)
        .map(|date| RevenuePoint {
            date,
            net_cents: per_day.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

impl HotelCore {
    pub async fn dashboard_summary(&self, today: NaiveDate) -> HotelResult<DashboardSummary> {
        let rooms_by_status = self.db().room_store().count_rooms_by_status().await?;
        let total_rooms: i64 = rooms_by_status.values().sum();
        let occupied_rooms = rooms_by_status
            .get(&RoomStatus::Occupied)
            .copied()
            .unwrap_or(0);

        let arrivals_today = self
            .check_in_list(today)
            .await?
            .iter()
            .filter(|booking| booking.check_in_date == today)
            .count() as i64;
        let departures_today = self
            .db()
            .booking_store()
            .list_bookings(&BookingFilter {
                status: Some(BookingStatus::CheckedIn),
                ..Default::default()
            })
            .await?
            .iter()
            .filter(|booking| booking.check_out_date == today)
            .count() as i64;

        let month_start = today.with_day(1).unwrap_or(today);
        let month_revenue = self.payment_summary(month_start, today).await?;

        Ok(DashboardSummary {
            date: today,
            total_rooms,
            occupied_rooms,
            occupancy_rate: percentage(occupied_rooms, total_rooms),
            rooms_by_status,
            arrivals_today,
            departures_today,
            bookings_by_status: self.db().booking_store().count_bookings_by_status().await?,
            open_complaints: self.db().complaint_store().count_open_complaints().await?,
            unread_messages: self.db().chat_store().count_unread().await?,
            month_revenue,
        })
    }

    pub async fn revenue(&self, from: NaiveDate, to: NaiveDate) -> HotelResult<Vec<RevenuePoint>> {
        let (start, until) = day_window(from, to)?;
        if (to - from).num_days() + 1 > MAX_REVENUE_DAYS {
            return Err(HotelError::Validation(format!(
                "revenue ranges are limited to {MAX_REVENUE_DAYS} days"
            )));
        }
        let payments = self
            .db()
            .payment_store()
            .list_payments(&crate::db::PaymentFilter {
                status: Some(PaymentStatus::Completed),
                from: Some(start),
                until: Some(until),
                ..Default::default()
            })
            .await?;
        Ok(daily_revenue(&payments, from, to))
    }
}
