//! Session client for the attendance REST API.
//!
//! `ApiClient` attaches the stored bearer token to every request, detects
//! the expired-token response and recovers from it with exactly one
//! refresh-and-retry. When the refresh itself fails the local session is
//! torn down and the login redirect hook fires.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::{current_auth, AuthData, CredentialStore};
use crate::models::attendance::{DATE_PARAM_FORMAT, DEFAULT_CLOCK_IN_NOTES, DEFAULT_CLOCK_OUT_NOTES};
use crate::models::notification::NOTIFICATION_PAGE_SIZE;
use crate::models::{
    AttendanceFilter, AttendanceHistory, AttendancePage, ClockRequest, Employee, EmployeePage,
    EmployeeUpdate, Envelope, Location, LoginRequest, LoginResponse, NewEmployee,
    NotificationPage, Profile, TodayStatus, UnreadCount,
};

use super::transport::{ApiResponse, FileUpload, HttpTransport, PendingRequest, Transport};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Requests to this endpoint never trigger a refresh.
pub const LOGIN_ENDPOINT: &str = "/auth/login";

const REFRESH_ENDPOINT: &str = "/auth/refresh";

const LOGOUT_ENDPOINT: &str = "/auth/logout";

/// Push token de-registration, followed by the url-encoded token.
const PUSH_TOKEN_ENDPOINT: &str = "/notifications/token";

const REGISTER_PUSH_TOKEN_ENDPOINT: &str = "/notifications/register-token";

const EMPLOYEES_ENDPOINT: &str = "/employees";

const PHOTO_UPLOAD_ENDPOINT: &str = "/profile/upload-photo";

/// Multipart field the photo is sent in.
const PHOTO_FIELD: &str = "photo";

#[derive(Debug, Deserialize)]
struct RefreshData {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// What the UI layer does once the session has been forcibly ended.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

/// Redirect hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRedirect;

impl LoginRedirect for NoRedirect {
    fn redirect_to_login(&self) {}
}

/// Outcome of an explicit logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// The server acknowledged the logout.
    Clean,
    /// The server call failed; local state was cleared anyway.
    LocalOnly,
}

/// Authenticated API client.
/// Clone is cheap - transport, store and redirect are shared.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    redirect: Arc<dyn LoginRedirect>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            store,
            redirect: Arc::new(NoRedirect),
        }
    }

    /// Client over HTTP with a cookie store, rooted at `base_url`.
    pub fn http(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(base_url, timeout)?;
        Ok(Self::new(Arc::new(transport), store))
    }

    pub fn with_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = redirect;
        self
    }

    // ===== Core request path =====

    /// Send a request with the stored credentials.
    ///
    /// On the expired-token response the request is retried once after a
    /// refresh. Every other failure is returned as-is.
    pub async fn send(&self, request: PendingRequest) -> Result<ApiResponse, ApiError> {
        let token = self.stored_token();
        let err = match self.dispatch_as(&request, token.as_deref()).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        if !Self::should_recover(&request, &err) {
            return Err(err);
        }

        let mut request = request;
        request.retried = true;
        self.recover(request, err).await
    }

    /// Send and decode a `{ data: T }` envelope.
    pub async fn send_json<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let envelope: Envelope<T> = response.json()?;
        Ok(envelope.data)
    }

    /// An unreadable store counts as logged out.
    fn stored_token(&self) -> Option<String> {
        match self.store.access_token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session, sending without a token");
                None
            }
        }
    }

    fn should_recover(request: &PendingRequest, err: &ApiError) -> bool {
        err.is_token_expired() && !request.retried && !request.targets(LOGIN_ENDPOINT)
    }

    /// One wire call with an explicit bearer token (none if `None`).
    async fn dispatch_as(
        &self,
        request: &PendingRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let response = match token {
            Some(token) => {
                let outgoing = request.clone().with_bearer(token);
                self.transport.dispatch(&outgoing).await?
            }
            None => self.transport.dispatch(request).await?,
        };
        response.error_for_status()
    }

    async fn recover(&self, request: PendingRequest, expired: ApiError) -> Result<ApiResponse, ApiError> {
        debug!(path = %request.path, "Access token expired, refreshing");

        match self.refresh().await {
            Ok(Some(token)) => {
                self.store.set_access_token(&token)?;
                info!(path = %request.path, "Access token refreshed, retrying request");
                // Single retry; a second expiry is returned to the caller.
                self.dispatch_as(&request, Some(&token)).await
            }
            Ok(None) => Err(expired),
            Err(refresh_err) => {
                warn!(error = %refresh_err, "Token refresh failed, ending session");
                self.end_session().await;
                Err(ApiError::RecoveryFailed(Box::new(refresh_err)))
            }
        }
    }

    /// Exchange the refresh cookie for a new access token.
    ///
    /// `Ok(None)` means the server answered 2xx but not 200/201.
    ///
    /// Concurrent expiries each call this independently; the endpoint
    /// tolerates redundant calls. Sharing one in-flight refresh future
    /// between callers would remove the duplicate calls without changing
    /// any outcome.
    async fn refresh(&self) -> Result<Option<String>, ApiError> {
        let request = PendingRequest::post(REFRESH_ENDPOINT).json(&serde_json::json!({}))?;
        let response = self.transport.dispatch(&request).await?.error_for_status()?;

        if !matches!(response.status, 200 | 201) {
            warn!(status = response.status, "Unexpected refresh status, not retrying");
            return Ok(None);
        }

        let body: Envelope<RefreshData> = response.json()?;
        Ok(Some(body.data.access_token))
    }

    /// Forced teardown: de-register the push token, log out, wipe local
    /// state and send the user to login. Never fails.
    pub async fn end_session(&self) {
        let session = match self.store.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session during teardown");
                Default::default()
            }
        };

        match session.push_token {
            Some(ref push_token) => {
                best_effort(
                    "push token de-registration",
                    self.deregister_push_token(push_token, session.access_token.as_deref()),
                )
                .await;
            }
            None => debug!("No push token stored, skipping de-registration"),
        }

        best_effort("logout", self.post_logout()).await;

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
        self.redirect.redirect_to_login();
    }

    /// Outside the recovery path so a failure here cannot recurse.
    async fn deregister_push_token(
        &self,
        push_token: &str,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let request = PendingRequest::delete(push_token_path(push_token));
        self.dispatch_as(&request, access_token).await
    }

    async fn post_logout(&self) -> Result<ApiResponse, ApiError> {
        let request = PendingRequest::post(LOGOUT_ENDPOINT).json(&serde_json::json!({}))?;
        self.dispatch_as(&request, None).await
    }

    // ===== Session =====

    /// Log in and store the returned token and user snapshot.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.send(PendingRequest::post(LOGIN_ENDPOINT).json(&body)?).await?;
        let login: LoginResponse = response.json()?;

        if let Err(e) = self.store.load() {
            warn!(error = %e, "Discarding unreadable stored session");
            self.store.clear()?;
        }
        self.store.set_access_token(&login.access_token)?;
        self.store.set_user(&login.user)?;
        info!(email = email, "Logged in");

        Ok(login)
    }

    /// Explicit logout. Local state is cleared whatever the server says.
    pub async fn logout(&self) -> Result<LogoutOutcome, ApiError> {
        let push_token = match self.store.push_token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session, skipping de-registration");
                None
            }
        };
        let mut outcome = LogoutOutcome::Clean;

        let logout = PendingRequest::post(LOGOUT_ENDPOINT).json(&serde_json::json!({}))?;
        match self.send(logout).await {
            Ok(_) => {}
            // The teardown already de-registered and cleared everything.
            Err(e) if e.is_session_terminated() => return Ok(LogoutOutcome::LocalOnly),
            Err(e) => {
                warn!(error = %e, "Server logout failed");
                outcome = LogoutOutcome::LocalOnly;
            }
        }

        if let Some(push_token) = push_token {
            if let Err(e) = self.send(PendingRequest::delete(push_token_path(&push_token))).await {
                warn!(error = %e, "Push token de-registration failed");
                outcome = LogoutOutcome::LocalOnly;
            }
        }

        self.store.clear()?;
        info!(?outcome, "Logged out");
        Ok(outcome)
    }

    /// Register this device for push notifications.
    ///
    /// The token is stored locally before the server call so logout can
    /// de-register it even if registration fails halfway.
    pub async fn register_push_token(&self, token: &str, device_type: &str) -> Result<(), ApiError> {
        self.store.set_push_token(token)?;
        let body = serde_json::json!({
            "token": token,
            "deviceType": device_type,
        });
        self.send(PendingRequest::post(REGISTER_PUSH_TOKEN_ENDPOINT).json(&body)?)
            .await?;
        debug!(device_type = device_type, "Push token registered");
        Ok(())
    }

    /// Claims of the stored token; drops it if already expired.
    pub fn auth_data(&self) -> Result<Option<AuthData>, ApiError> {
        Ok(current_auth(self.store.as_ref())?)
    }

    // ===== Attendance =====

    pub async fn today_attendance(&self) -> Result<TodayStatus, ApiError> {
        self.send_json(PendingRequest::get("/attendances/me/today")).await
    }

    pub async fn clock_in(&self, location: Location, notes: Option<&str>) -> Result<serde_json::Value, ApiError> {
        let body = ClockRequest::new(location, notes, DEFAULT_CLOCK_IN_NOTES);
        let response = self
            .send(PendingRequest::post("/attendances/clock-in").json(&body)?)
            .await?;
        response.json()
    }

    pub async fn clock_out(&self, location: Location, notes: Option<&str>) -> Result<serde_json::Value, ApiError> {
        let body = ClockRequest::new(location, notes, DEFAULT_CLOCK_OUT_NOTES);
        let response = self
            .send(PendingRequest::post("/attendances/clock-out").json(&body)?)
            .await?;
        response.json()
    }

    pub async fn attendance_history(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<AttendanceHistory, ApiError> {
        let fmt = |d: NaiveDate| d.format(DATE_PARAM_FORMAT).to_string();
        let request = PendingRequest::get("/attendances/me").query(&[
            ("startDate", start_date.map(fmt)),
            ("endDate", end_date.map(fmt)),
        ]);
        self.send_json(request).await
    }

    // ===== Profile =====

    pub async fn profile(&self) -> Result<Profile, ApiError> {
        self.send_json(PendingRequest::get("/profile")).await
    }

    pub async fn update_phone(&self, phone_number: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "phoneNumber": phone_number });
        self.send(PendingRequest::patch("/profile").json(&body)?).await?;
        Ok(())
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "currentPassword": current_password,
            "newPassword": new_password,
        });
        self.send(PendingRequest::post("/profile/change-password").json(&body)?)
            .await?;
        Ok(())
    }

    /// Upload a new profile photo; `file_name` decides the content type.
    pub async fn upload_profile_photo(&self, file_name: &str, bytes: Vec<u8>) -> Result<serde_json::Value, ApiError> {
        let upload = FileUpload::image(PHOTO_FIELD, file_name, bytes)?;
        let response = self
            .send(PendingRequest::post(PHOTO_UPLOAD_ENDPOINT).multipart(upload))
            .await?;
        response.json()
    }

    // ===== Admin =====

    pub async fn admin_dashboard(&self) -> Result<serde_json::Value, ApiError> {
        self.send_json(PendingRequest::get("/attendances/admin/dashboard")).await
    }

    /// Attendance of all employees, filtered and paged.
    pub async fn attendances(&self, filter: &AttendanceFilter) -> Result<AttendancePage, ApiError> {
        let request = PendingRequest::get("/attendances").query(&filter.query_params());
        self.send_json(request).await
    }

    pub async fn employees(&self, page: u32, limit: u32, search: Option<&str>) -> Result<EmployeePage, ApiError> {
        let request = PendingRequest::get(EMPLOYEES_ENDPOINT).query(&[
            ("page", Some(page.to_string())),
            ("limit", Some(limit.to_string())),
            ("search", search.filter(|s| !s.is_empty()).map(str::to_string)),
        ]);
        self.send_json(request).await
    }

    pub async fn employee(&self, id: &str) -> Result<Employee, ApiError> {
        self.send_json(PendingRequest::get(employee_path(id))).await
    }

    pub async fn create_employee(&self, employee: &NewEmployee) -> Result<serde_json::Value, ApiError> {
        employee.validate().map_err(ApiError::InvalidInput)?;
        let response = self
            .send(PendingRequest::post(EMPLOYEES_ENDPOINT).json(employee)?)
            .await?;
        response.json()
    }

    pub async fn update_employee(&self, id: &str, update: &EmployeeUpdate) -> Result<serde_json::Value, ApiError> {
        update.validate().map_err(ApiError::InvalidInput)?;
        let response = self
            .send(PendingRequest::patch(employee_path(id)).json(update)?)
            .await?;
        response.json()
    }

    // ===== Notifications =====

    pub async fn unread_notification_count(&self) -> Result<u64, ApiError> {
        let count: UnreadCount = self
            .send_json(PendingRequest::get("/notifications/unread-count"))
            .await?;
        Ok(count.unread_count)
    }

    /// One page of unread notifications, starting after `cursor`.
    pub async fn notifications(&self, cursor: Option<&str>) -> Result<NotificationPage, ApiError> {
        let request = PendingRequest::get("/notifications").query(&[
            ("limit", Some(NOTIFICATION_PAGE_SIZE.to_string())),
            ("isRead", Some("false".to_string())),
            ("cursor", cursor.map(str::to_string)),
        ]);
        self.send_json(request).await
    }
}

fn employee_path(id: &str) -> String {
    format!("{}/{}", EMPLOYEES_ENDPOINT, urlencoding::encode(id))
}

fn push_token_path(push_token: &str) -> String {
    format!("{}/{}", PUSH_TOKEN_ENDPOINT, urlencoding::encode(push_token))
}

/// Run a cleanup call whose outcome must not affect the caller.
async fn best_effort<F>(what: &str, call: F)
where
    F: Future<Output = Result<ApiResponse, ApiError>>,
{
    match call.await {
        Ok(response) => debug!(call = what, status = response.status, "Best-effort call succeeded"),
        Err(e) => debug!(call = what, error = %e, "Best-effort call failed, ignoring"),
    }
}
