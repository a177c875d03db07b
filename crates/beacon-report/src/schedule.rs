//! 다음 실행 시각 계산.
//!
//! 순수 함수. 스케줄의 `HH:mm`은 `now`의 시간대 기준 벽시계 시각으로 해석한다.

use beacon_core::config::ScheduleTimezone;
use beacon_core::error::CoreError;
use beacon_core::models::report::{Frequency, Schedule};
use chrono::{
    DateTime, Datelike, Days, Local, LocalResult, Months, NaiveDate, NaiveDateTime, TimeZone,
    Utc,
};

/// 스케줄과 현재 시각으로 다음 실행 시각 계산 (항상 `now` 이후)
pub fn compute_next_run<Tz: TimeZone>(
    schedule: &Schedule,
    now: &DateTime<Tz>,
) -> Result<DateTime<Utc>, CoreError> {
    schedule.validate()?;
    let time = schedule.time_of_day()?;
    let tz = now.timezone();
    let today = now.date_naive();
    let now_utc = now.with_timezone(&Utc);
    let is_future = |date: NaiveDate| -> Result<Option<DateTime<Utc>>, CoreError> {
        let at = resolve_local(&tz, date.and_time(time))?;
        Ok((at > now_utc).then_some(at))
    };

    match schedule.frequency {
        Frequency::Daily => {
            if let Some(at) = is_future(today)? {
                return Ok(at);
            }
            resolve_local(&tz, add_days(today, 1)?.and_time(time))
        }
        Frequency::Weekly => {
            let target = schedule.day_of_week.unwrap_or(0);
            let current = today.weekday().num_days_from_sunday();
            let ahead = (target + 7 - current) % 7;
            let date = add_days(today, u64::from(ahead))?;
            if let Some(at) = is_future(date)? {
                return Ok(at);
            }
            resolve_local(&tz, add_days(date, 7)?.and_time(time))
        }
        Frequency::Monthly => {
            let day = schedule.day_of_month.unwrap_or(1);
            let this_month = clamp_day(today.year(), today.month(), day)?;
            if let Some(at) = is_future(this_month)? {
                return Ok(at);
            }
            let next = today
                .with_day(1)
                .and_then(|first| first.checked_add_months(Months::new(1)))
                .ok_or_else(|| overflow("다음 달"))?;
            resolve_local(&tz, clamp_day(next.year(), next.month(), day)?.and_time(time))
        }
    }
}

/// 설정된 시간대 기준으로 다음 실행 시각 계산
pub fn next_run_in(
    schedule: &Schedule,
    now: DateTime<Utc>,
    timezone: ScheduleTimezone,
) -> Result<DateTime<Utc>, CoreError> {
    match timezone {
        ScheduleTimezone::Utc => compute_next_run(schedule, &now),
        ScheduleTimezone::Local => compute_next_run(schedule, &now.with_timezone(&Local)),
    }
}

fn overflow(what: &str) -> CoreError {
    CoreError::validation("schedule", format!("{what} 날짜 계산 범위 초과"))
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate, CoreError> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| overflow("다음"))
}

/// `day`를 해당 월의 말일로 보정
fn clamp_day(year: i32, month: u32, day: u32) -> Result<NaiveDate, CoreError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| overflow("월초"))?;
    let last_day = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .ok_or_else(|| overflow("월말"))?;
    NaiveDate::from_ymd_opt(year, month, day.min(last_day)).ok_or_else(|| overflow("월중"))
}

/// 벽시계 시각을 UTC로 변환. 모호하면 이른 쪽, 서머타임 공백이면 한 시간 뒤
fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, CoreError> {
    let resolved = match tz.from_local_datetime(&local) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(local + chrono::Duration::hours(1)))
            .earliest(),
    };
    resolved
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| overflow("현지 시각"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn daily_later_today() {
        let now = utc(2024, 1, 1, 7, 0, 0);
        let next = compute_next_run(&Schedule::daily("08:00"), &now).unwrap();
        assert_eq!(next, utc(2024, 1, 1, 8, 0, 0));
    }

    #[test]
    fn daily_exact_time_rolls_to_tomorrow() {
        let now = utc(2024, 1, 1, 8, 0, 0);
        let next = compute_next_run(&Schedule::daily("08:00"), &now).unwrap();
        assert_eq!(next, utc(2024, 1, 2, 8, 0, 0));
    }

    #[test]
    fn weekly_same_day_passed_goes_to_next_week() {
        // 2024-01-01은 월요일
        let now = utc(2024, 1, 1, 9, 0, 0);
        let next = compute_next_run(&Schedule::weekly(1, "08:00"), &now).unwrap();
        assert_eq!(next, utc(2024, 1, 8, 8, 0, 0));
    }

    #[test]
    fn weekly_same_day_before_time() {
        let now = utc(2024, 1, 1, 7, 59, 0);
        let next = compute_next_run(&Schedule::weekly(1, "08:00"), &now).unwrap();
        assert_eq!(next, utc(2024, 1, 1, 8, 0, 0));
    }

    #[test]
    fn weekly_advances_to_target_day() {
        // 월요일 → 일요일(0)
        let now = utc(2024, 1, 1, 9, 0, 0);
        let next = compute_next_run(&Schedule::weekly(0, "10:30"), &now).unwrap();
        assert_eq!(next, utc(2024, 1, 7, 10, 30, 0));
        // 월요일 → 수요일(3)
        let next = compute_next_run(&Schedule::weekly(3, "10:30"), &now).unwrap();
        assert_eq!(next, utc(2024, 1, 3, 10, 30, 0));
    }

    #[test]
    fn monthly_clamps_to_last_day() {
        let now = utc(2024, 2, 10, 0, 0, 0);
        let next = compute_next_run(&Schedule::monthly(31, "08:00"), &now).unwrap();
        assert_eq!(next, utc(2024, 2, 29, 8, 0, 0));

        let now = utc(2023, 4, 1, 0, 0, 0);
        let next = compute_next_run(&Schedule::monthly(31, "08:00"), &now).unwrap();
        assert_eq!(next, utc(2023, 4, 30, 8, 0, 0));
    }

    #[test]
    fn monthly_rolls_into_next_month_and_year() {
        let now = utc(2024, 1, 31, 9, 0, 0);
        let next = compute_next_run(&Schedule::monthly(31, "08:00"), &now).unwrap();
        assert_eq!(next, utc(2024, 2, 29, 8, 0, 0));

        let now = utc(2024, 12, 20, 0, 0, 0);
        let next = compute_next_run(&Schedule::monthly(15, "06:00"), &now).unwrap();
        assert_eq!(next, utc(2025, 1, 15, 6, 0, 0));
    }

    #[test]
    fn interprets_time_in_given_offset() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        // KST 2024-01-01 07:00 = UTC 2023-12-31 22:00
        let now = kst.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap();
        let next = compute_next_run(&Schedule::daily("08:00"), &now).unwrap();
        assert_eq!(next, utc(2023, 12, 31, 23, 0, 0));
    }

    #[test]
    fn invalid_schedule_is_rejected() {
        let now = utc(2024, 1, 1, 0, 0, 0);
        let err = compute_next_run(&Schedule::daily("25:00"), &now).unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        let mut weekly = Schedule::weekly(1, "08:00");
        weekly.day_of_week = None;
        assert!(compute_next_run(&weekly, &now).is_err());
    }

    #[test]
    fn always_strictly_after_now() {
        let now = utc(2024, 3, 15, 12, 0, 0);
        for schedule in [
            Schedule::daily("12:00"),
            Schedule::weekly(5, "12:00"),
            Schedule::monthly(15, "12:00"),
        ] {
            assert!(compute_next_run(&schedule, &now).unwrap() > now);
        }
    }

    #[test]
    fn utc_timezone_setting() {
        let now = utc(2024, 1, 1, 7, 0, 0);
        let next = next_run_in(&Schedule::daily("08:00"), now, ScheduleTimezone::Utc).unwrap();
        assert_eq!(next, utc(2024, 1, 1, 8, 0, 0));
        assert!(next_run_in(&Schedule::daily("08:00"), now, ScheduleTimezone::Local).unwrap() > now);
    }
}
