//! Data models for the attendance API.
//!
//! This module contains the request and response shapes used by the
//! session client:
//!
//! - `User`, `Role`, `LoginResponse`: authentication payloads
//! - `TodayStatus`, `Attendance`, `AttendanceHistory`: attendance records
//! - `AttendanceRecord`, `AttendancePage`: admin attendance monitoring
//! - `Employee`, `NewEmployee`, `EmployeeUpdate`: employee management
//! - `Notification`, `NotificationPage`: the cursor-paginated feed
//! - `Envelope`: the `{ data, message }` wrapper most endpoints use

pub mod attendance;
pub mod employee;
pub mod notification;
pub mod user;

pub use attendance::{
    Attendance, AttendanceEmployee, AttendanceFilter, AttendanceHistory, AttendancePage,
    AttendanceRecord, AttendanceSummary, ClockRequest, Location, TodayStatus,
};
pub use employee::{Employee, EmployeePage, EmployeeUpdate, NewEmployee};
pub use notification::{Notification, NotificationPage, Pagination, UnreadCount};
pub use user::{LoginRequest, LoginResponse, Profile, Role, User};

use serde::Deserialize;

/// Standard response wrapper: `{ "data": ..., "message": ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

/// Page-numbered listing metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
}

impl PageMeta {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
