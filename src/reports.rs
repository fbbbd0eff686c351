//! Dashboard aggregations.
//!
//! Pure functions over already-fetched rows. The stores own fetching and
//! caching; these helpers only fold, so they are trivially testable and
//! never hit the backend. Pending ledger rows are excluded everywhere —
//! only confirmed money counts.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::enums::{AppointmentStatus, TransactionKind, TransactionStatus};
use crate::models::{Appointment, Transaction};

fn confirmed_on(transactions: &[Transaction], kind: TransactionKind, day: NaiveDate) -> f64 {
    transactions
        .iter()
        .filter(|t| t.status == TransactionStatus::Confirmed && t.kind == kind && t.date == day)
        .map(|t| t.value)
        .sum()
}

/// Confirmed revenue booked on `day`.
pub fn daily_revenue(transactions: &[Transaction], day: NaiveDate) -> f64 {
    confirmed_on(transactions, TransactionKind::Revenue, day)
}

/// Confirmed expenses booked on `day`.
pub fn daily_expense(transactions: &[Transaction], day: NaiveDate) -> f64 {
    confirmed_on(transactions, TransactionKind::Expense, day)
}

/// Net of confirmed revenue and expenses on `day`.
pub fn daily_profit(transactions: &[Transaction], day: NaiveDate) -> f64 {
    daily_revenue(transactions, day) - daily_expense(transactions, day)
}

/// Confirmed revenue grouped by date, ordered chronologically. Days with
/// no confirmed revenue are absent, not zero.
pub fn revenue_by_day(transactions: &[Transaction]) -> BTreeMap<NaiveDate, f64> {
    let mut days = BTreeMap::new();
    for t in transactions {
        if t.status == TransactionStatus::Confirmed && t.kind == TransactionKind::Revenue {
            *days.entry(t.date).or_insert(0.0) += t.value;
        }
    }
    days
}

/// Appointment totals broken out by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub scheduled: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.scheduled + self.confirmed + self.completed + self.cancelled
    }
}

pub fn appointment_counts(appointments: &[Appointment]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for a in appointments {
        match a.status {
            AppointmentStatus::Scheduled => counts.scheduled += 1,
            AppointmentStatus::Confirmed => counts.confirmed += 1,
            AppointmentStatus::Completed => counts.completed += 1,
            AppointmentStatus::Cancelled => counts.cancelled += 1,
        }
    }
    counts
}

/// Share of the monthly goal reached, in percent. A clinic that has not
/// set a goal (zero or negative) reads as 0%, never as a division error.
pub fn goal_progress_percent(monthly_revenue: f64, monthly_goal: f64) -> f64 {
    if monthly_goal <= 0.0 {
        return 0.0;
    }
    (monthly_revenue / monthly_goal) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn tx(
        kind: TransactionKind,
        value: f64,
        date: NaiveDate,
        status: TransactionStatus,
    ) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            kind,
            value,
            category: "Consultas".into(),
            description: None,
            date,
            status,
            patient_id: None,
            appointment_id: None,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn daily_profit_nets_confirmed_rows_only() {
        let rows = vec![
            tx(TransactionKind::Revenue, 100.0, day(14), TransactionStatus::Confirmed),
            tx(TransactionKind::Expense, 30.0, day(14), TransactionStatus::Confirmed),
            tx(TransactionKind::Revenue, 999.0, day(14), TransactionStatus::Pending),
            tx(TransactionKind::Revenue, 80.0, day(15), TransactionStatus::Confirmed),
        ];
        assert_eq!(daily_revenue(&rows, day(14)), 100.0);
        assert_eq!(daily_expense(&rows, day(14)), 30.0);
        assert_eq!(daily_profit(&rows, day(14)), 70.0);
    }

    #[test]
    fn empty_ledger_profits_zero() {
        assert_eq!(daily_profit(&[], day(1)), 0.0);
    }

    #[test]
    fn revenue_by_day_groups_and_orders() {
        let rows = vec![
            tx(TransactionKind::Revenue, 80.0, day(15), TransactionStatus::Confirmed),
            tx(TransactionKind::Revenue, 100.0, day(14), TransactionStatus::Confirmed),
            tx(TransactionKind::Revenue, 50.0, day(14), TransactionStatus::Confirmed),
            tx(TransactionKind::Expense, 30.0, day(14), TransactionStatus::Confirmed),
            tx(TransactionKind::Revenue, 999.0, day(16), TransactionStatus::Pending),
        ];
        let by_day = revenue_by_day(&rows);
        let days: Vec<_> = by_day.keys().copied().collect();
        assert_eq!(days, vec![day(14), day(15)]);
        assert_eq!(by_day[&day(14)], 150.0);
        assert_eq!(by_day[&day(15)], 80.0);
    }

    #[test]
    fn goal_progress_guards_unset_goal() {
        assert_eq!(goal_progress_percent(0.0, 650.0), 0.0);
        assert_eq!(goal_progress_percent(5_000.0, 0.0), 0.0);
        assert_eq!(goal_progress_percent(5_000.0, -1.0), 0.0);
        assert_eq!(goal_progress_percent(5_000.0, 10_000.0), 50.0);
        assert_eq!(goal_progress_percent(12_000.0, 10_000.0), 120.0);
    }

    #[test]
    fn appointment_counts_cover_all_statuses() {
        fn appt(status: AppointmentStatus) -> Appointment {
            Appointment {
                id: Uuid::new_v4(),
                patient_id: Uuid::new_v4(),
                doctor_id: Uuid::new_v4(),
                patient_name: "Maria Silva".into(),
                doctor_name: "Dr. Lima".into(),
                date: day(14),
                time: "14:30".into(),
                service: "Consulta".into(),
                service_value: 150.0,
                status,
                notes: None,
                created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            }
        }
        let rows = vec![
            appt(AppointmentStatus::Scheduled),
            appt(AppointmentStatus::Scheduled),
            appt(AppointmentStatus::Completed),
            appt(AppointmentStatus::Cancelled),
        ];
        let counts = appointment_counts(&rows);
        assert_eq!(counts.scheduled, 2);
        assert_eq!(counts.confirmed, 0);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.cancelled, 1);
        assert_eq!(counts.total(), 4);
    }
}
