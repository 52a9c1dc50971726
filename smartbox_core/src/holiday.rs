//! Holiday suppression: pure functions over persisted `HolidayPeriod`s.
//!
//! Overlapping periods form a union. Company-wide periods (no box scope)
//! apply to every box of the company; box-scoped periods only to their box.

use chrono::{DateTime, Days, NaiveDate, Utc};
use smartbox_traits::model::{BoxId, HolidayPeriod};

const SECS_PER_DAY: f64 = 86_400.0;

/// Whether `date` falls inside any applicable holiday period for the box.
pub fn is_suppressed(periods: &[HolidayPeriod], box_id: BoxId, date: NaiveDate) -> bool {
    periods.iter().any(|p| p.covers(box_id, date))
}

/// How much of the interval `[from, to]` falls on suppressed calendar days,
/// in (fractional) days. Used by the estimator to excise holidays from the
/// time axis.
pub fn suppressed_overlap_days(
    periods: &[HolidayPeriod],
    box_id: BoxId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> f64 {
    if to <= from {
        return 0.0;
    }
    let mut total = 0.0;
    let mut day = from.date_naive();
    let last = to.date_naive();
    while day <= last {
        if is_suppressed(periods, box_id, day) {
            // UTC day boundaries; midnight always exists in UTC.
            let day_start = day
                .and_hms_opt(0, 0, 0)
                .map(|t| t.and_utc())
                .unwrap_or(from);
            let day_end = day_start + chrono::Duration::days(1);
            let lo = from.max(day_start);
            let hi = to.min(day_end);
            if hi > lo {
                total += (hi - lo).num_seconds() as f64 / SECS_PER_DAY;
            }
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use smartbox_traits::model::{CompanyId, HolidayId};

    fn period(
        company: CompanyId,
        scope: Option<BoxId>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HolidayPeriod {
        HolidayPeriod {
            id: HolidayId::new(),
            company_id: company,
            box_id: scope,
            start,
            end,
            reason: "closure".into(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn company_wide_period_covers_any_box() {
        let company = CompanyId::new();
        let p = period(company, None, d(2025, 12, 24), d(2025, 12, 26));
        assert!(is_suppressed(
            std::slice::from_ref(&p),
            BoxId::new(),
            d(2025, 12, 25)
        ));
        assert!(!is_suppressed(&[p], BoxId::new(), d(2025, 12, 27)));
    }

    #[test]
    fn box_scoped_period_only_covers_its_box() {
        let company = CompanyId::new();
        let scoped = BoxId::new();
        let p = period(company, Some(scoped), d(2025, 7, 1), d(2025, 7, 14));
        assert!(is_suppressed(
            std::slice::from_ref(&p),
            scoped,
            d(2025, 7, 7)
        ));
        assert!(!is_suppressed(&[p], BoxId::new(), d(2025, 7, 7)));
    }

    #[test]
    fn overlapping_periods_are_a_union() {
        let company = CompanyId::new();
        let b = BoxId::new();
        let periods = vec![
            period(company, None, d(2025, 1, 1), d(2025, 1, 5)),
            period(company, None, d(2025, 1, 4), d(2025, 1, 8)),
        ];
        // Fully suppressed span counts each day once.
        let from = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap();
        let overlap = suppressed_overlap_days(&periods, b, from, to);
        assert!((overlap - 8.0).abs() < 1e-9, "union overlap {overlap}");
    }

    #[test]
    fn partial_day_overlap_is_fractional() {
        let company = CompanyId::new();
        let b = BoxId::new();
        let p = period(company, None, d(2025, 3, 10), d(2025, 3, 10));
        let from = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 3, 11, 12, 0, 0).unwrap();
        let overlap = suppressed_overlap_days(&[p], b, from, to);
        assert!((overlap - 0.5).abs() < 1e-9, "half-day overlap {overlap}");
    }

    #[test]
    fn empty_or_inverted_interval_has_no_overlap() {
        let company = CompanyId::new();
        let b = BoxId::new();
        let p = period(company, None, d(2025, 3, 10), d(2025, 3, 10));
        let t = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(suppressed_overlap_days(&[p.clone()], b, t, t), 0.0);
        assert_eq!(
            suppressed_overlap_days(&[p], b, t, t - chrono::Duration::hours(1)),
            0.0
        );
    }
}
