//! Command handlers for the absensi CLI.
//!
//! `App` owns the configuration and the session client. Each handler makes
//! one or more API calls and prints the result; errors are turned into the
//! server's own message where there is one.

use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, warn};

use absensi_core::api::{ApiClient, ApiError, LoginRedirect, LogoutOutcome};
use absensi_core::config::{Config, CredentialBackend};
use absensi_core::models::{AttendanceFilter, Employee, EmployeeUpdate, Location, NewEmployee, PageMeta};
use absensi_core::utils::{device_type, format_date, format_optional, truncate_string};

/// Notification messages longer than this are shortened in the list.
const MAX_NOTIFICATION_WIDTH: usize = 72;

/// Safety stop when following notification cursors.
const MAX_NOTIFICATION_PAGES: usize = 50;

/// The CLI's "go to login": tell the user once per run.
#[derive(Default)]
pub struct CliRedirect {
    notified: AtomicBool,
}

impl LoginRedirect for CliRedirect {
    fn redirect_to_login(&self) {
        if !self.notified.swap(true, Ordering::SeqCst) {
            eprintln!("Your session has ended. Run `absensi login` to sign in again.");
        }
    }
}

/// Turn an API error into what the user should read.
fn user_error(err: ApiError) -> anyhow::Error {
    if err.is_session_terminated() {
        return anyhow::anyhow!("Session expired");
    }
    match (err.status(), err.message()) {
        (Some(status), Some(message)) => anyhow::anyhow!("{} (HTTP {})", message, status),
        _ => anyhow::Error::new(err),
    }
}

/// Edits from the command line; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct EmployeeChanges {
    pub full_name: Option<String>,
    pub position: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: Option<bool>,
}

impl EmployeeChanges {
    fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.position.is_none()
            && self.phone_number.is_none()
            && self.is_active.is_none()
    }

    fn apply_to(self, employee: &Employee) -> EmployeeUpdate {
        let mut update = EmployeeUpdate::from(employee);
        if let Some(name) = self.full_name {
            update.full_name = name;
        }
        if let Some(position) = self.position {
            update.position = position;
        }
        if let Some(phone) = self.phone_number {
            update.phone_number = phone;
        }
        if let Some(active) = self.is_active {
            update.is_active = active;
        }
        update
    }
}

fn print_page_footer(meta: Option<&PageMeta>) {
    if let Some(meta) = meta {
        println!("\nPage {} of {}", meta.page, meta.total_pages.max(1));
    }
}

pub struct App {
    config: Config,
    client: ApiClient,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let store = config.credential_store()?;
        let client = ApiClient::http(&config.api_url()?, config.request_timeout(), store)?
            .with_redirect(Arc::new(CliRedirect::default()));
        Ok(Self { config, client })
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub async fn login(mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => Self::prompt_email()?,
        };
        if email.is_empty() {
            return Err(anyhow::anyhow!("Email is required"));
        }
        let password = rpassword::prompt_password(format!("Password for {}: ", email))?;

        let login = self.client.login(&email, &password).await.map_err(user_error)?;
        let name = login.user().map(|u| u.name).unwrap_or_else(|| email.clone());

        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        match self.client.auth_data()? {
            Some(auth) => println!("Logged in as {} ({}), landing at {}", name, auth.role, auth.home_path()),
            None => println!("Logged in as {}", name),
        }
        Ok(())
    }

    fn prompt_email() -> Result<String> {
        print!("Email: ");
        io::stdout().flush()?;

        let mut email = String::new();
        io::stdin().read_line(&mut email)?;
        Ok(email.trim().to_string())
    }

    pub async fn logout(self) -> Result<()> {
        match self.client.logout().await.map_err(user_error)? {
            LogoutOutcome::Clean => println!("Logged out"),
            LogoutOutcome::LocalOnly => {
                println!("Server logout failed, local session cleared")
            }
        }
        Ok(())
    }

    pub fn status(self) -> Result<()> {
        match self.client.auth_data()? {
            Some(auth) => {
                println!("Email:   {}", auth.email);
                println!("Role:    {}", auth.role);
                println!("Expires: in {} min", auth.minutes_until_expiry());
            }
            None => println!("Not logged in"),
        }
        Ok(())
    }

    pub async fn register_push(self, token: &str) -> Result<()> {
        let device = device_type();
        self.client
            .register_push_token(token, &device)
            .await
            .map_err(user_error)?;
        println!("Registered {} for notifications", device);
        Ok(())
    }

    // =========================================================================
    // Attendance
    // =========================================================================

    pub async fn today(self) -> Result<()> {
        let status = self.client.today_attendance().await.map_err(user_error)?;
        let (clock_in, clock_out) = status
            .attendance
            .as_ref()
            .map(|a| (a.clock_in_display(), a.clock_out_display()))
            .unwrap_or_else(|| ("--:--".to_string(), "--:--".to_string()));

        println!("Clock in:  {}", clock_in);
        println!("Clock out: {}", clock_out);
        if status.can_clock_in() {
            println!("You have not clocked in yet today.");
        } else if status.can_clock_out() {
            println!("You are clocked in.");
        } else {
            println!("Done for today.");
        }
        Ok(())
    }

    pub async fn clock(self, clock_in: bool, lat: f64, lng: f64, notes: Option<String>) -> Result<()> {
        let location = Location::new(lat, lng)
            .ok_or_else(|| anyhow::anyhow!("Invalid location: {}, {}", lat, lng))?;

        let response = if clock_in {
            self.client.clock_in(location, notes.as_deref()).await
        } else {
            self.client.clock_out(location, notes.as_deref()).await
        }
        .map_err(user_error)?;

        debug!(?response, "Clock response");
        let fallback = if clock_in { "Clocked in" } else { "Clocked out" };
        println!(
            "{}",
            response
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or(fallback)
        );
        Ok(())
    }

    pub async fn history(self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
        let history = self
            .client
            .attendance_history(start, end)
            .await
            .map_err(user_error)?;

        if history.attendances.is_empty() {
            println!("No attendance records in this range.");
        }
        for a in &history.attendances {
            println!(
                "{:<18} {} - {}  {:<10} {}",
                a.date.as_deref().map(format_date).unwrap_or_default(),
                a.clock_in_display(),
                a.clock_out_display(),
                format_optional(&a.work_duration_formatted, "-"),
                format_optional(&a.notes, ""),
            );
        }
        if let Some(summary) = history.summary {
            println!(
                "\nDays present: {}   Total work: {}",
                summary.present_days,
                format_optional(&summary.total_work_formatted, "-")
            );
        }
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    pub async fn profile(self) -> Result<()> {
        let profile = self.client.profile().await.map_err(user_error)?;
        println!("Name:     {}", profile.full_name);
        println!("Email:    {}", profile.email);
        println!("Position: {}", format_optional(&profile.position, "-"));
        println!("Phone:    {}", format_optional(&profile.phone_number, "-"));
        Ok(())
    }

    pub async fn set_phone(self, phone: &str) -> Result<()> {
        self.client.update_phone(phone).await.map_err(user_error)?;
        println!("Phone number updated");
        Ok(())
    }

    pub async fn change_password(self) -> Result<()> {
        let current = rpassword::prompt_password("Current password: ")?;
        let new = rpassword::prompt_password("New password: ")?;
        let confirm = rpassword::prompt_password("Repeat new password: ")?;
        if new != confirm {
            return Err(anyhow::anyhow!("Passwords do not match"));
        }
        self.client
            .change_password(&current, &new)
            .await
            .map_err(user_error)?;
        println!("Password changed");
        Ok(())
    }

    pub async fn upload_photo(self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", path.display()))?;

        self.client
            .upload_profile_photo(file_name, bytes)
            .await
            .map_err(user_error)?;
        println!("Profile photo updated");
        Ok(())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    pub async fn notifications(self, all: bool) -> Result<()> {
        let unread = self
            .client
            .unread_notification_count()
            .await
            .map_err(user_error)?;
        println!("{} unread", unread);

        let mut cursor: Option<String> = None;
        for _ in 0..MAX_NOTIFICATION_PAGES {
            let page = self
                .client
                .notifications(cursor.as_deref())
                .await
                .map_err(user_error)?;

            for n in &page.notifications {
                println!(
                    "[{}] {}: {}",
                    n.created_at.as_deref().map(format_date).unwrap_or_default(),
                    n.title_display(),
                    truncate_string(n.message.as_deref().unwrap_or(""), MAX_NOTIFICATION_WIDTH)
                );
            }

            cursor = page.next_cursor().map(str::to_string);
            if !all || cursor.is_none() {
                break;
            }
        }
        if cursor.is_some() && !all {
            println!("(more available, use --all)");
        }
        Ok(())
    }

    // =========================================================================
    // Admin
    // =========================================================================

    pub async fn dashboard(self) -> Result<()> {
        let data = self.client.admin_dashboard().await.map_err(user_error)?;
        println!("{}", serde_json::to_string_pretty(&data)?);
        Ok(())
    }

    pub async fn attendances(self, filter: &AttendanceFilter) -> Result<()> {
        let page = self.client.attendances(filter).await.map_err(user_error)?;
        if page.attendances.is_empty() {
            println!("No attendance records match these filters.");
        }
        for record in &page.attendances {
            let a = &record.attendance;
            println!(
                "{:<24} {:<18} {} - {}  {}",
                truncate_string(record.employee_name(), 24),
                a.date.as_deref().map(format_date).unwrap_or_default(),
                a.clock_in_display(),
                a.clock_out_display(),
                record.status_label(),
            );
        }
        print_page_footer(page.meta.as_ref());
        Ok(())
    }

    pub async fn employees(self, page: u32, limit: u32, search: Option<&str>) -> Result<()> {
        let page = self
            .client
            .employees(page, limit, search)
            .await
            .map_err(user_error)?;
        for e in &page.data {
            println!(
                "{:<12} {:<24} {:<28} {:<16} {}",
                e.id,
                truncate_string(&e.full_name, 24),
                e.email,
                format_optional(&e.position, "-"),
                e.status_label(),
            );
        }
        print_page_footer(page.meta.as_ref());
        Ok(())
    }

    pub async fn employee(self, id: &str) -> Result<()> {
        let e = self.client.employee(id).await.map_err(user_error)?;
        println!("Name:     {}", e.full_name);
        println!("Email:    {}", e.email);
        println!("Position: {}", format_optional(&e.position, "-"));
        println!("Phone:    {}", format_optional(&e.phone_number, "-"));
        println!("Role:     {}", format_optional(&e.role, "-"));
        println!("Status:   {}", e.status_label());
        Ok(())
    }

    pub async fn add_employee(self, mut employee: NewEmployee, set_password: bool) -> Result<()> {
        employee.validate().map_err(anyhow::Error::msg)?;
        if set_password {
            let password = rpassword::prompt_password("Initial password: ")?;
            employee.password = Some(password).filter(|p| !p.is_empty());
        }
        self.client
            .create_employee(&employee)
            .await
            .map_err(user_error)?;
        println!("Created {} <{}>", employee.full_name, employee.email);
        Ok(())
    }

    pub async fn edit_employee(self, id: &str, changes: EmployeeChanges) -> Result<()> {
        if changes.is_empty() {
            return Err(anyhow::anyhow!("Nothing to change"));
        }
        let current = self.client.employee(id).await.map_err(user_error)?;
        let update = changes.apply_to(&current);
        self.client
            .update_employee(id, &update)
            .await
            .map_err(user_error)?;
        println!("Updated {}", update.full_name);
        Ok(())
    }
}

/// `absensi config`: update whatever was given, then print the result.
pub fn configure(
    mut config: Config,
    base_url: Option<String>,
    backend: Option<CredentialBackend>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let changed = base_url.is_some() || backend.is_some() || timeout_secs.is_some();
    if let Some(url) = base_url {
        config.api_base_url = Some(url);
    }
    if let Some(backend) = backend {
        config.credential_backend = backend;
    }
    if let Some(secs) = timeout_secs {
        config.request_timeout_secs = Some(secs);
    }
    if changed {
        config.save()?;
    }

    println!("API URL:     {}", config.api_url().unwrap_or_else(|_| "(not set)".to_string()));
    println!("Credentials: {:?}", config.credential_backend);
    println!("Timeout:     {}s", config.request_timeout().as_secs());
    Ok(())
}
