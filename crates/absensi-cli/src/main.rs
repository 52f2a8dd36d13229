//! Absensi - a command-line client for work-from-home attendance.
//!
//! Employees clock in and out with a location, check today's status and
//! their history; administrators can monitor attendance and manage
//! employee records.
//! All calls go through the core session client, which renews an expired
//! token once and otherwise ends the session.

mod app;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use absensi_core::config::{Config, CredentialBackend};
use absensi_core::models::{AttendanceFilter, NewEmployee};
use app::{App, EmployeeChanges};

/// Set to write a daily log file into the cache directory
const LOG_FILE_ENV: &str = "ABSENSI_LOG_FILE";

#[derive(Parser)]
#[command(name = "absensi", version, about = "Work-from-home attendance client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with your company email
    Login {
        /// Defaults to the last email used
        email: Option<String>,
    },
    /// Log out and clear the local session
    Logout,
    /// Show who is logged in
    Status,
    /// Show today's clock-in/clock-out status
    Today,
    /// Clock in at the given location
    ClockIn {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Clock out at the given location
    ClockOut {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Attendance history (dates as YYYY-MM-DD)
    History {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Show your profile
    Profile,
    /// Update your phone number
    SetPhone { phone: String },
    /// Change your password (prompts for both)
    ChangePassword,
    /// Upload a new profile photo (jpg, png, webp or gif)
    UploadPhoto { path: PathBuf },
    /// List unread notifications
    Notifications {
        /// Follow the cursor through every page
        #[arg(long)]
        all: bool,
    },
    /// Register a push-notification token for this device
    RegisterPush { token: String },
    /// Admin dashboard summary
    Dashboard,
    /// Admin employee list
    Employees {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        search: Option<String>,
    },
    /// Admin attendance monitor for all employees
    Attendances {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Employee name or email
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Show one employee record
    Employee { id: String },
    /// Create an employee account
    AddEmployee {
        #[arg(long)]
        name: String,
        /// Must be a company address
        #[arg(long)]
        email: String,
        #[arg(long)]
        position: String,
        #[arg(long)]
        phone: String,
        #[arg(long, default_value = "employee")]
        role: String,
        /// Prompt for an initial password instead of letting the server pick
        #[arg(long)]
        set_password: bool,
    },
    /// Edit an employee record; unset fields keep their current value
    EditEmployee {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Show or change configuration
    Config {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        backend: Option<CredentialBackend>,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_dir = std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|v| v == "1")
        .and_then(|_| config.cache_dir().ok());

    match file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "absensi.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load()?;
    let _guard = init_tracing(&config);
    info!("absensi starting");

    let result = match cli.command {
        Command::Config {
            base_url,
            backend,
            timeout_secs,
        } => app::configure(config, base_url, backend, timeout_secs),
        command => run(App::new(config)?, command).await,
    };

    info!("absensi finished");
    result
}

async fn run(app: App, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => app.login(email).await,
        Command::Logout => app.logout().await,
        Command::Status => app.status(),
        Command::Today => app.today().await,
        Command::ClockIn { lat, lng, notes } => app.clock(true, lat, lng, notes).await,
        Command::ClockOut { lat, lng, notes } => app.clock(false, lat, lng, notes).await,
        Command::History { start, end } => app.history(start, end).await,
        Command::Profile => app.profile().await,
        Command::SetPhone { phone } => app.set_phone(&phone).await,
        Command::ChangePassword => app.change_password().await,
        Command::UploadPhoto { path } => app.upload_photo(&path).await,
        Command::Notifications { all } => app.notifications(all).await,
        Command::RegisterPush { token } => app.register_push(&token).await,
        Command::Dashboard => app.dashboard().await,
        Command::Employees { page, limit, search } => {
            app.employees(page, limit, search.as_deref()).await
        }
        Command::Attendances {
            page,
            search,
            start,
            end,
        } => {
            let filter = AttendanceFilter {
                page,
                search,
                start_date: start,
                end_date: end,
                ..Default::default()
            };
            app.attendances(&filter).await
        }
        Command::Employee { id } => app.employee(&id).await,
        Command::AddEmployee {
            name,
            email,
            position,
            phone,
            role,
            set_password,
        } => {
            let employee = NewEmployee {
                full_name: name,
                email,
                position,
                phone_number: phone,
                role,
                password: None,
            };
            app.add_employee(employee, set_password).await
        }
        Command::EditEmployee {
            id,
            name,
            position,
            phone,
            active,
        } => {
            let changes = EmployeeChanges {
                full_name: name,
                position,
                phone_number: phone,
                is_active: active,
            };
            app.edit_employee(&id, changes).await
        }
        Command::Config { .. } => Ok(()),
    }
}
