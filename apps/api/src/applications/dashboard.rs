//! Dashboard metrics over the signed-in user's applications.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::applications::tracker::ApplicationCard;
use crate::errors::AppError;
use crate::models::application::{ApplicationStatus, AutomatedApplication};
use crate::notify::Toasts;
use crate::remote::DataBackend;
use crate::session::{require_identity, SessionState};

pub const WEEKLY_TARGET: usize = 18;
const RECENT_LIMIT: usize = 5;
const WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub total: usize,
    pub by_status: Vec<StatusCount>,
    pub this_week: usize,
    pub weekly_target: usize,
    /// Percent of the weekly target reached, capped at 100.
    pub weekly_progress: u8,
    /// Oldest day first, ending today.
    pub daily: Vec<DailyCount>,
    pub average_match: Option<u8>,
    /// Completed share of finished applications, in percent.
    pub completion_rate: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub summary: DashboardSummary,
    pub recent: Vec<ApplicationCard>,
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part * 100 + whole / 2) / whole).min(100) as u8
}

pub fn summarize(rows: &[AutomatedApplication], today: NaiveDate) -> DashboardSummary {
    let count_of = |status: ApplicationStatus| {
        rows.iter().filter(|r| r.status() == status).count()
    };
    let by_status = ApplicationStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            label: status.label(),
            count: count_of(status),
        })
        .collect();

    let first_day = today - Duration::days(WINDOW_DAYS - 1);
    let daily: Vec<DailyCount> = (0..WINDOW_DAYS)
        .map(|offset| {
            let date = first_day + Duration::days(offset);
            let count = rows
                .iter()
                .filter(|r| r.created_at.date_naive() == date)
                .count();
            DailyCount { date, count }
        })
        .collect();
    let this_week = daily.iter().map(|d| d.count).sum();

    let matches: Vec<i32> = rows.iter().filter_map(|r| r.match_percentage).collect();
    let average_match = (!matches.is_empty()).then(|| {
        let sum: i64 = matches.iter().map(|&m| i64::from(m.clamp(0, 100))).sum();
        (sum as f64 / matches.len() as f64).round() as u8
    });

    let completed = count_of(ApplicationStatus::Completed);
    let finished = completed + count_of(ApplicationStatus::Failed);
    let completion_rate = (finished > 0).then(|| percent(completed, finished));

    DashboardSummary {
        total: rows.len(),
        by_status,
        this_week,
        weekly_target: WEEKLY_TARGET,
        weekly_progress: percent(this_week, WEEKLY_TARGET),
        daily,
        average_match,
        completion_rate,
    }
}

pub async fn load_dashboard(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
) -> Result<DashboardView, AppError> {
    require_identity(session, toasts, "You must be logged in to view the dashboard")?;
    let rows = data
        .list_applications()
        .await
        .map_err(|e| toasts.remote_failure("Failed to load applications", e))?;

    let summary = summarize(&rows, Utc::now().date_naive());
    let recent = rows
        .iter()
        .take(RECENT_LIMIT)
        .map(ApplicationCard::from)
        .collect();
    Ok(DashboardView { summary, recent })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::remote::fake::FakeRemote;

    fn row(status: ApplicationStatus, match_pct: Option<i32>, day: u32) -> AutomatedApplication {
        let created_at = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        AutomatedApplication {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            job_url: format!("https://x.test/job/{day}"),
            company_name: None,
            job_title: None,
            job_description: None,
            status: Some(status),
            error_message: None,
            match_percentage: match_pct,
            cover_letter_sent: None,
            application_method: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], today());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.this_week, 0);
        assert_eq!(summary.weekly_progress, 0);
        assert_eq!(summary.daily.len(), 7);
        assert_eq!(summary.average_match, None);
        assert_eq!(summary.completion_rate, None);
    }

    #[test]
    fn test_counts_and_window() {
        let rows = vec![
            row(ApplicationStatus::Completed, Some(90), 10),
            row(ApplicationStatus::Completed, Some(80), 9),
            row(ApplicationStatus::Failed, None, 4),
            row(ApplicationStatus::Pending, Some(71), 1),
        ];
        let summary = summarize(&rows, today());

        assert_eq!(summary.total, 4);
        assert_eq!(summary.by_status[0].count, 1);
        assert_eq!(summary.by_status[2].count, 2);
        assert_eq!(summary.by_status[1].label, "in progress");
        // Day 4 through day 10.
        assert_eq!(summary.this_week, 3);
        assert_eq!(summary.daily[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(summary.daily[6].count, 1);
        assert_eq!(summary.average_match, Some(80));
        assert_eq!(summary.completion_rate, Some(67));
    }

    #[test]
    fn test_weekly_progress_is_capped() {
        let rows: Vec<_> = (0..20)
            .map(|_| row(ApplicationStatus::Pending, None, 10))
            .collect();
        let summary = summarize(&rows, today());
        assert_eq!(summary.this_week, 20);
        assert_eq!(summary.weekly_progress, 100);

        let summary = summarize(&rows[..12], today());
        assert_eq!(summary.weekly_progress, 67);
    }

    #[tokio::test]
    async fn test_load_dashboard_recent_is_newest_first() {
        let remote = FakeRemote::default();
        let identity = remote.add_account("u1@x.test", "pw");
        remote.set_session(&identity);
        for age in 0..7 {
            remote.seed_application(
                identity.id,
                &format!("https://x.test/job/{age}"),
                ApplicationStatus::Pending,
                None,
                age,
            );
        }
        let session = SessionState::Authenticated {
            identity,
            profile: None,
        };

        let view = load_dashboard(&remote, &session, &Toasts::default())
            .await
            .unwrap();

        assert_eq!(view.summary.total, 7);
        assert_eq!(view.recent.len(), 5);
        assert_eq!(view.recent[0].job_url, "https://x.test/job/0");
    }

    #[tokio::test]
    async fn test_load_dashboard_requires_sign_in() {
        let remote = FakeRemote::default();
        let err = load_dashboard(&remote, &SessionState::Anonymous, &Toasts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
