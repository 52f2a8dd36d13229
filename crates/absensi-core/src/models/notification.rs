use serde::{Deserialize, Serialize};

/// Page size the feed is requested with.
pub const NOTIFICATION_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "isRead", default)]
    pub is_read: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

impl Notification {
    pub fn title_display(&self) -> &str {
        self.title.as_deref().unwrap_or("Notifikasi Baru")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
}

/// `data` of `GET /notifications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationPage {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl NotificationPage {
    /// Cursor for the following page, only when the server says there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .filter(|p| p.has_more)
            .and_then(|p| p.next_cursor.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UnreadCount {
    #[serde(rename = "unreadCount", default)]
    pub unread_count: u64,
}
