use chrono::{DateTime, Local, NaiveDate, Utc};

use super::PageMeta;
use serde::{Deserialize, Serialize};

/// Notes sent when clocking in without any.
pub const DEFAULT_CLOCK_IN_NOTES: &str = "Working from home";

/// Notes sent when clocking out without any.
pub const DEFAULT_CLOCK_OUT_NOTES: &str = "Finished work";

/// Date format for range query parameters.
pub const DATE_PARAM_FORMAT: &str = "%Y-%m-%d";

/// Page size of the admin listings.
pub const ADMIN_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// Body of `POST /attendances/clock-in` and `/clock-out`.
#[derive(Debug, Clone, Serialize)]
pub struct ClockRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub notes: String,
}

impl ClockRequest {
    /// Blank notes fall back to `default_notes`.
    pub fn new(location: Location, notes: Option<&str>, default_notes: &str) -> Self {
        let notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(default_notes);
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            notes: notes.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "clockInTime", default)]
    pub clock_in_time: Option<DateTime<Utc>>,
    #[serde(rename = "clockOutTime", default)]
    pub clock_out_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(rename = "workDurationFormatted", default)]
    pub work_duration_formatted: Option<String>,
}

/// Format a timestamp as local `HH:MM`, or `--:--` when missing.
pub fn format_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

impl Attendance {
    pub fn clock_in_display(&self) -> String {
        format_time(self.clock_in_time)
    }

    pub fn clock_out_display(&self) -> String {
        format_time(self.clock_out_time)
    }
}

/// `data` of `GET /attendances/me/today`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodayStatus {
    #[serde(rename = "hasClockIn", default)]
    pub has_clock_in: bool,
    #[serde(rename = "hasClockOut", default)]
    pub has_clock_out: bool,
    #[serde(default)]
    pub attendance: Option<Attendance>,
}

impl TodayStatus {
    pub fn can_clock_in(&self) -> bool {
        !self.has_clock_in
    }

    pub fn can_clock_out(&self) -> bool {
        self.has_clock_in && !self.has_clock_out
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceSummary {
    #[serde(rename = "presentDays", default)]
    pub present_days: u32,
    #[serde(rename = "totalWorkFormatted", default)]
    pub total_work_formatted: Option<String>,
}

/// `data` of `GET /attendances/me`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceHistory {
    #[serde(default)]
    pub attendances: Vec<Attendance>,
    #[serde(default)]
    pub summary: Option<AttendanceSummary>,
}

/// Who an attendance row belongs to, as embedded by `GET /attendances`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceEmployee {
    #[serde(rename = "fullName", default)]
    pub full_name: String,
    #[serde(default)]
    pub position: Option<String>,
}

/// One row of the admin attendance monitor.
#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceRecord {
    #[serde(flatten)]
    pub attendance: Attendance,
    #[serde(default)]
    pub employee: Option<AttendanceEmployee>,
}

impl AttendanceRecord {
    /// "Hadir" once clocked out, "Aktif" while still working.
    pub fn status_label(&self) -> &'static str {
        if self.attendance.clock_out_time.is_some() {
            "Hadir"
        } else {
            "Aktif"
        }
    }

    pub fn employee_name(&self) -> &str {
        self.employee.as_ref().map(|e| e.full_name.as_str()).unwrap_or("-")
    }
}

/// `data` of `GET /attendances`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendancePage {
    #[serde(default)]
    pub attendances: Vec<AttendanceRecord>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

/// Filters for the admin attendance monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceFilter {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for AttendanceFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: ADMIN_PAGE_SIZE,
            search: None,
            start_date: None,
            end_date: None,
        }
    }
}

impl AttendanceFilter {
    /// Query parameters; blank search and missing dates are left out.
    pub fn query_params(&self) -> Vec<(&'static str, Option<String>)> {
        let fmt = |d: NaiveDate| d.format(DATE_PARAM_FORMAT).to_string();
        vec![
            ("page", Some(self.page.to_string())),
            ("limit", Some(self.limit.to_string())),
            (
                "search",
                self.search
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
            ("startDate", self.start_date.map(fmt)),
            ("endDate", self.end_date.map(fmt)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_bounds() {
        assert!(Location::new(-6.2, 106.8).is_some());
        assert!(Location::new(91.0, 0.0).is_none());
        assert!(Location::new(0.0, -180.5).is_none());
    }

    #[test]
    fn test_clock_request_default_notes() {
        let loc = Location::new(-6.2, 106.8).unwrap();
        let req = ClockRequest::new(loc, None, DEFAULT_CLOCK_IN_NOTES);
        assert_eq!(req.notes, "Working from home");

        let req = ClockRequest::new(loc, Some("   "), DEFAULT_CLOCK_OUT_NOTES);
        assert_eq!(req.notes, "Finished work");

        let req = ClockRequest::new(loc, Some(" Sprint review "), DEFAULT_CLOCK_OUT_NOTES);
        assert_eq!(req.notes, "Sprint review");

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["latitude"], -6.2);
        assert_eq!(json["longitude"], 106.8);
    }

    #[test]
    fn test_today_status_transitions() {
        let json = r#"{"hasClockIn":true,"hasClockOut":false,"attendance":{"id":"a1","clockInTime":"2026-10-16T01:02:00Z"}}"#;
        let status: TodayStatus = serde_json::from_str(json).unwrap();
        assert!(!status.can_clock_in());
        assert!(status.can_clock_out());
        let att = status.attendance.unwrap();
        assert_ne!(att.clock_in_display(), "--:--");
        assert_eq!(att.clock_out_display(), "--:--");

        let empty: TodayStatus = serde_json::from_str("{}").unwrap();
        assert!(empty.can_clock_in());
        assert!(!empty.can_clock_out());
    }

    #[test]
    fn test_parse_history() {
        let json = r#"{"attendances":[{"id":"a1","date":"2026-10-15","clockInTime":"2026-10-15T01:00:00Z","clockOutTime":"2026-10-15T10:00:00Z","notes":"WFH","workDurationFormatted":"9j 0m"}],"summary":{"presentDays":1,"totalWorkFormatted":"9j 0m"}}"#;
        let history: AttendanceHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.attendances.len(), 1);
        assert_eq!(history.summary.unwrap().present_days, 1);
    }

    #[test]
    fn test_parse_monitoring_page() {
        let json = r#"{"attendances":[{"id":"a9","date":"2026-10-16","clockInTime":"2026-10-16T01:00:00Z","clockOutTime":null,"employee":{"fullName":"Budi","position":"Engineer"}},{"id":"a8","date":"2026-10-15","clockInTime":"2026-10-15T01:00:00Z","clockOutTime":"2026-10-15T10:00:00Z"}],"meta":{"page":1,"limit":10,"total":12,"totalPages":2}}"#;
        let page: AttendancePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.attendances.len(), 2);

        let first = &page.attendances[0];
        assert_eq!(first.attendance.id.as_deref(), Some("a9"));
        assert_eq!(first.employee_name(), "Budi");
        assert_eq!(first.status_label(), "Aktif");

        let second = &page.attendances[1];
        assert_eq!(second.employee_name(), "-");
        assert_eq!(second.status_label(), "Hadir");
        assert!(page.meta.unwrap().has_next());
    }

    #[test]
    fn test_filter_query_params_skip_blank_values() {
        let filter = AttendanceFilter {
            search: Some("  ".to_string()),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..Default::default()
        };
        let params = filter.query_params();
        assert_eq!(params[0], ("page", Some("1".to_string())));
        assert_eq!(params[1], ("limit", Some("10".to_string())));
        assert_eq!(params[2], ("search", None));
        assert_eq!(params[3], ("startDate", Some("2026-01-01".to_string())));
        assert_eq!(params[4], ("endDate", None));
    }
}
