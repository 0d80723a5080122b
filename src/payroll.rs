// Payroll scheduling over the payroll_schedule slice

use crate::models::{keys, Employee, PayrollSchedule, Shift};
use crate::sync::SyncSession;
use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayrollError {
    #[error("No such shift")]
    UnknownShift,
}

/// Minutes a shift spans. An end at or before the start wraps past
/// midnight.
fn shift_minutes(shift: &Shift) -> i64 {
    let span = shift.end - shift.start;
    if span <= Duration::zero() {
        (span + Duration::hours(24)).num_minutes()
    } else {
        span.num_minutes()
    }
}

pub struct Payroll {
    session: Arc<SyncSession>,
}

impl Payroll {
    pub fn new(session: Arc<SyncSession>) -> Self {
        Self { session }
    }

    pub async fn schedule(&self) -> PayrollSchedule {
        self.session
            .load(keys::PAYROLL_SCHEDULE, PayrollSchedule::default())
            .await
    }

    /// Insert or replace a shift by id, stamping the week the schedule
    /// covers
    pub async fn put_shift(&self, week_of: NaiveDate, shift: Shift) {
        let mut schedule = self.schedule().await;
        schedule.week_of = Some(week_of);
        match schedule.shifts.iter_mut().find(|s| s.id == shift.id) {
            Some(slot) => *slot = shift,
            None => schedule.shifts.push(shift),
        }
        self.session.save(keys::PAYROLL_SCHEDULE, &schedule);
    }

    pub async fn remove_shift(&self, shift_id: &str) -> Result<(), PayrollError> {
        let mut schedule = self.schedule().await;
        let before = schedule.shifts.len();
        schedule.shifts.retain(|s| s.id != shift_id);
        if schedule.shifts.len() == before {
            return Err(PayrollError::UnknownShift);
        }
        self.session.save(keys::PAYROLL_SCHEDULE, &schedule);
        Ok(())
    }

    pub async fn shifts_for(&self, employee_id: &str) -> Vec<Shift> {
        self.schedule()
            .await
            .shifts
            .into_iter()
            .filter(|s| s.employee_id == employee_id)
            .collect()
    }

    /// Scheduled hours for one employee across the stored week
    pub async fn hours_for(&self, employee_id: &str) -> f64 {
        let minutes: i64 = self
            .shifts_for(employee_id)
            .await
            .iter()
            .map(shift_minutes)
            .sum();
        minutes as f64 / 60.0
    }

    /// Total scheduled labor cost in cents for the stored week, priced
    /// against the given roster. Shifts for employees not on the
    /// roster are skipped.
    pub async fn week_labor_cost(&self, roster: &[Employee]) -> i64 {
        let schedule = self.schedule().await;
        schedule
            .shifts
            .iter()
            .filter_map(|shift| {
                roster
                    .iter()
                    .find(|e| e.id == shift.employee_id)
                    .map(|e| e.wage_cents * shift_minutes(shift) / 60)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalStore;
    use crate::models::StaffStation;
    use chrono::NaiveTime;

    fn payroll() -> Payroll {
        let local = Arc::new(LocalStore::in_memory().unwrap());
        Payroll::new(Arc::new(SyncSession::new(local)))
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    fn shift(employee_id: &str, start: &str, end: &str) -> Shift {
        Shift::new(
            employee_id.to_string(),
            day("2026-08-03"),
            time(start),
            time(end),
            StaffStation::Server,
        )
    }

    #[test]
    fn shift_minutes_spans_the_clock() {
        assert_eq!(shift_minutes(&shift("e", "09:00:00", "17:30:00")), 510);
    }

    #[test]
    fn shift_minutes_wraps_past_midnight() {
        assert_eq!(shift_minutes(&shift("e", "22:00:00", "02:00:00")), 240);
    }

    #[tokio::test]
    async fn empty_schedule_by_default() {
        let payroll = payroll();
        let schedule = payroll.schedule().await;
        assert!(schedule.week_of.is_none());
        assert!(schedule.shifts.is_empty());
    }

    #[tokio::test]
    async fn put_shift_inserts_then_replaces() {
        let payroll = payroll();
        let week = day("2026-08-03");
        let mut s = shift("ana", "09:00:00", "17:00:00");
        payroll.put_shift(week, s.clone()).await;

        s.end = time("15:00:00");
        payroll.put_shift(week, s.clone()).await;

        let schedule = payroll.schedule().await;
        assert_eq!(schedule.week_of, Some(week));
        assert_eq!(schedule.shifts.len(), 1);
        assert_eq!(schedule.shifts[0].end, time("15:00:00"));
    }

    #[tokio::test]
    async fn remove_shift_deletes_by_id() {
        let payroll = payroll();
        let week = day("2026-08-03");
        let s = shift("ana", "09:00:00", "17:00:00");
        payroll.put_shift(week, s.clone()).await;

        payroll.remove_shift(&s.id).await.unwrap();
        assert!(payroll.schedule().await.shifts.is_empty());
        assert!(matches!(
            payroll.remove_shift(&s.id).await.unwrap_err(),
            PayrollError::UnknownShift
        ));
    }

    #[tokio::test]
    async fn hours_sum_per_employee() {
        let payroll = payroll();
        let week = day("2026-08-03");
        payroll.put_shift(week, shift("ana", "09:00:00", "17:00:00")).await;
        payroll.put_shift(week, shift("ana", "18:00:00", "22:30:00")).await;
        payroll.put_shift(week, shift("ben", "09:00:00", "12:00:00")).await;

        assert_eq!(payroll.shifts_for("ana").await.len(), 2);
        assert!((payroll.hours_for("ana").await - 12.5).abs() < f64::EPSILON);
        assert!((payroll.hours_for("ben").await - 3.0).abs() < f64::EPSILON);
        assert_eq!(payroll.hours_for("ghost").await, 0.0);
    }

    #[tokio::test]
    async fn labor_cost_prices_shifts_against_the_roster() {
        let payroll = payroll();
        let week = day("2026-08-03");

        let mut ana = Employee::new("Ana".into(), StaffStation::Chef, 3000, day("2026-01-12"));
        ana.id = "ana".into();

        payroll.put_shift(week, shift("ana", "09:00:00", "17:00:00")).await;
        payroll.put_shift(week, shift("ghost", "09:00:00", "17:00:00")).await;

        // 8h at 30.00/h, the unknown employee's shift is skipped
        assert_eq!(payroll.week_labor_cost(&[ana]).await, 24_000);
    }
}
