mod auth;
mod config;
mod db;
mod error;
mod models;
mod reports;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::auth::AuthService;
use crate::config::Config;
use crate::db::Database;
use crate::error::CrmError;
use crate::models::{ClientQuery, Principal, ReportQuery};
use crate::reports::{ReportGenerator, ReportRequest};
use crate::ui::{
    client_wizard::{self, ClientWizardAction, ClientWizardState},
    clients::{self, ClientAction, ClientsState},
    credentials::{self, CredentialsAction, CredentialsMode, CredentialsState},
    menu::{self, DashboardAction, MainAction, MenuState},
    report_wizard::{self, ReportWizardAction, ReportWizardState},
    reports::{self as reports_ui, ReportAction, ReportsState},
    settings::{self, SettingsAction, SettingsState},
    statistics::{self, StatisticsAction, StatisticsState},
};

/// Client register with PDF, Excel and CSV reports
#[derive(Parser, Debug)]
#[command(name = "client_reports", version, about)]
struct Cli {
    /// SQLite database file (overrides CRM_DATABASE_PATH)
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Directory reports are written to (overrides CRM_REPORTS_DIR)
    #[arg(long, value_name = "DIR")]
    reports_dir: Option<PathBuf>,

    /// Log filter directive (overrides CRM_LOG_LEVEL)
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

// Represents the current screen in the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppScreen {
    MainMenu,
    Credentials,
    Dashboard,
    Clients,
    ClientWizard,
    Reports,
    ReportWizard,
    Statistics,
    Settings,
}

// Main application state
struct AppState {
    db: Database,
    config: Config,
    principal: Option<Principal>,
    screen: AppScreen,
    status: Option<String>,
    main_menu: MenuState<MainAction>,
    dashboard_state: Option<MenuState<DashboardAction>>,
    credentials_state: Option<CredentialsState>,
    clients_state: Option<ClientsState>,
    client_wizard_state: Option<ClientWizardState>,
    reports_state: Option<ReportsState>,
    report_wizard_state: Option<ReportWizardState>,
    statistics_state: Option<StatisticsState>,
    settings_state: Option<SettingsState>,
    // Screen the report wizard returns to
    report_wizard_origin: AppScreen,
}

impl AppState {
    fn new(db: Database, config: Config, needs_bootstrap: bool) -> Self {
        let (screen, credentials_state, status) = if needs_bootstrap {
            (
                AppScreen::Credentials,
                Some(CredentialsState::new(CredentialsMode::Bootstrap)),
                Some("No accounts yet: create the administrator to continue".to_string()),
            )
        } else {
            (AppScreen::MainMenu, None, None)
        };

        Self {
            db,
            config,
            principal: None,
            screen,
            status,
            main_menu: MenuState::main_menu(),
            dashboard_state: None,
            credentials_state,
            clients_state: None,
            client_wizard_state: None,
            reports_state: None,
            report_wizard_state: None,
            statistics_state: None,
            settings_state: None,
            report_wizard_origin: AppScreen::Reports,
        }
    }

    fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.db)
    }

    fn generator(&self) -> crate::error::Result<ReportGenerator<'_>> {
        ReportGenerator::new(&self.db, self.config.reports_dir())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::init()?.with_overrides(cli.database, cli.reports_dir, cli.log_level);
    init_logging(&config)?;
    info!(database = %config.database_path().display(), reports = %config.reports_dir().display(), "starting");

    // Initialize database connection
    let db = db::init(&config)
        .await
        .with_context(|| format!("cannot open database {}", config.database_path().display()))?;

    let needs_bootstrap = match AuthService::new(&db).needs_bootstrap().await {
        Ok(needs_bootstrap) => needs_bootstrap,
        Err(err) => {
            db.close().await;
            return Err(err.into());
        }
    };

    let mut app_state = AppState::new(db, config, needs_bootstrap);
    let result = run_terminal(&mut app_state).await;

    let AppState { db, .. } = app_state;
    db.close().await;

    match result {
        Ok(()) => {
            info!("session ended");
            println!("Goodbye.");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "terminal failure");
            Err(err)
        }
    }
}

/// Send log output to the configured file; the terminal belongs to the UI
fn init_logging(config: &Config) -> Result<()> {
    if let Some(parent) = config.log_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("cannot open log file {}", config.log_file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log level '{}'", config.log_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}

async fn run_terminal(app_state: &mut AppState) -> Result<()> {
    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        // Render current screen
        terminal.draw(|f| {
            let (body, status_area) = ui::screen_layout(f.size());
            match app_state.screen {
                AppScreen::MainMenu => menu::render_menu(f, body, &mut app_state.main_menu),
                AppScreen::Credentials => {
                    if let Some(state) = &mut app_state.credentials_state {
                        credentials::render_credentials(f, body, state);
                    }
                }
                AppScreen::Dashboard => {
                    if let Some(state) = &mut app_state.dashboard_state {
                        menu::render_menu(f, body, state);
                    }
                }
                AppScreen::Clients => {
                    if let Some(state) = &mut app_state.clients_state {
                        clients::render_clients(f, body, state);
                    }
                }
                AppScreen::ClientWizard => {
                    if let Some(state) = &mut app_state.client_wizard_state {
                        client_wizard::render_client_wizard(f, body, state);
                    }
                }
                AppScreen::Reports => {
                    if let Some(state) = &mut app_state.reports_state {
                        reports_ui::render_reports(f, body, state);
                    }
                }
                AppScreen::ReportWizard => {
                    if let Some(state) = &mut app_state.report_wizard_state {
                        report_wizard::render_report_wizard(f, body, state);
                    }
                }
                AppScreen::Statistics => {
                    if let Some(state) = &mut app_state.statistics_state {
                        statistics::render_statistics(f, body, state);
                    }
                }
                AppScreen::Settings => {
                    if let Some(state) = &mut app_state.settings_state {
                        settings::render_settings(f, body, state);
                    }
                }
            }
            ui::render_status(f, status_area, app_state.status.as_deref());
        })?;

        // Handle input for current screen
        let outcome = match app_state.screen {
            AppScreen::MainMenu => handle_main_menu_screen(app_state).await,
            AppScreen::Credentials => handle_credentials_screen(app_state).await,
            AppScreen::Dashboard => handle_dashboard_screen(app_state).await,
            AppScreen::Clients => handle_clients_screen(app_state).await,
            AppScreen::ClientWizard => handle_client_wizard_screen(app_state).await,
            AppScreen::Reports => handle_reports_screen(app_state).await,
            AppScreen::ReportWizard => handle_report_wizard_screen(app_state).await,
            AppScreen::Statistics => handle_statistics_screen(app_state).await,
            AppScreen::Settings => handle_settings_screen(app_state).await,
        };

        match outcome {
            Ok(true) => break,
            Ok(false) => {}
            // Domain failures become a status message; terminal failures end the loop
            Err(err) => match err.downcast::<CrmError>() {
                Ok(crm_err) => {
                    warn!(error = %crm_err, "operation failed");
                    app_state.status = Some(crm_err.to_string());
                }
                Err(other) => return Err(other),
            },
        }
    }

    Ok(())
}

async fn load_dashboard_screen(app_state: &mut AppState) -> Result<()> {
    let client_stats = app_state.db.client_stats().await?;
    let report_stats = app_state.db.report_stats().await?;

    let Some(principal) = &app_state.principal else {
        app_state.screen = AppScreen::MainMenu;
        return Ok(());
    };

    let mut summary = vec![
        format!("Clients: {}", client_stats.total_clients),
        format!("Reports: {}", report_stats.total_reports),
    ];
    if let Some((country, count)) = client_stats.by_country.first() {
        summary.push(format!("Top country: {} ({})", country, count));
    }

    let mut dashboard = MenuState::dashboard(principal);
    dashboard.set_summary(summary);
    app_state.dashboard_state = Some(dashboard);
    app_state.screen = AppScreen::Dashboard;

    Ok(())
}

async fn load_clients_screen(app_state: &mut AppState, query: ClientQuery) -> Result<()> {
    let clients = app_state.db.list_clients(&query).await?;
    app_state.clients_state = Some(ClientsState::new(clients, query));
    app_state.screen = AppScreen::Clients;
    Ok(())
}

async fn load_reports_screen(app_state: &mut AppState, query: ReportQuery, export_mode: bool) -> Result<()> {
    let reports = app_state.db.list_reports(&query).await?;
    app_state.reports_state = Some(ReportsState::new(reports, query, export_mode));
    app_state.screen = AppScreen::Reports;
    Ok(())
}

async fn load_statistics_screen(app_state: &mut AppState) -> Result<()> {
    let client_stats = app_state.db.client_stats().await?;
    let report_stats = app_state.db.report_stats().await?;
    app_state.statistics_state = Some(StatisticsState::new(client_stats, report_stats));
    app_state.screen = AppScreen::Statistics;
    Ok(())
}

async fn load_settings_screen(app_state: &mut AppState) -> Result<()> {
    let Some(principal) = &app_state.principal else {
        app_state.screen = AppScreen::MainMenu;
        return Ok(());
    };

    // Only administrators see the account list
    let users = if principal.role.is_admin() {
        app_state.db.list_users().await?
    } else {
        Vec::new()
    };

    app_state.settings_state = Some(SettingsState::new(&app_state.config, principal, &users));
    app_state.screen = AppScreen::Settings;
    Ok(())
}

fn open_credentials(app_state: &mut AppState, mode: CredentialsMode) {
    app_state.credentials_state = Some(CredentialsState::new(mode));
    app_state.screen = AppScreen::Credentials;
}

async fn start_session(app_state: &mut AppState, principal: Principal) -> Result<()> {
    app_state.status = Some(format!("Welcome, {}", principal.username));
    app_state.principal = Some(principal);
    app_state.credentials_state = None;
    load_dashboard_screen(app_state).await
}

async fn handle_main_menu_screen(app_state: &mut AppState) -> Result<bool> {
    let action = menu::handle_input(&mut app_state.main_menu)?;
    if action.is_some() {
        app_state.status = None;
    }

    match action {
        Some(MainAction::Login) => open_credentials(app_state, CredentialsMode::Login),
        Some(MainAction::Register) => open_credentials(app_state, CredentialsMode::Register),
        Some(MainAction::About) => app_state.main_menu.show_popup("About", menu::about_lines()),
        Some(MainAction::Help) => app_state.main_menu.show_popup("Help", menu::help_lines()),
        Some(MainAction::SystemInfo) => {
            let lines = menu::system_info_lines(&app_state.db, &app_state.config).await?;
            app_state.main_menu.show_popup("System information", lines);
        }
        Some(MainAction::Exit) => return Ok(true),
        None => {}
    }

    Ok(false)
}

async fn handle_credentials_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.credentials_state else {
        app_state.screen = AppScreen::MainMenu;
        return Ok(false);
    };
    let mode = state.mode();

    match credentials::handle_input(state)? {
        Some(CredentialsAction::Cancel) => match mode {
            // Nothing can be done without an administrator
            CredentialsMode::Bootstrap => return Ok(true),
            CredentialsMode::ChangePassword => {
                app_state.credentials_state = None;
                load_settings_screen(app_state).await?;
            }
            CredentialsMode::Login | CredentialsMode::Register => {
                app_state.credentials_state = None;
                app_state.screen = AppScreen::MainMenu;
            }
        },
        Some(CredentialsAction::Submit { username, password }) => match mode {
            CredentialsMode::Login => {
                let principal = app_state.auth().login(&username, &password).await?;
                start_session(app_state, principal).await?;
            }
            CredentialsMode::Bootstrap => {
                let principal = app_state.auth().bootstrap(&username, &password).await?;
                start_session(app_state, principal).await?;
            }
            CredentialsMode::Register => {
                let user = app_state.auth().register(&username, &password).await?;
                open_credentials(app_state, CredentialsMode::Login);
                app_state.status = Some(format!("Account '{}' created, log in to continue", user.username));
            }
            CredentialsMode::ChangePassword => {}
        },
        Some(CredentialsAction::ChangePassword { current, new }) => {
            if let Some(principal) = app_state.principal.clone() {
                app_state.auth().change_password(&principal, &current, &new).await?;
                info!(user_id = principal.user_id, "password changed");
                app_state.status = Some("Password changed".to_string());
            }
            app_state.credentials_state = None;
            load_settings_screen(app_state).await?;
        }
        None => {}
    }

    Ok(false)
}

async fn handle_dashboard_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.dashboard_state else {
        load_dashboard_screen(app_state).await?;
        return Ok(false);
    };
    let action = menu::handle_input(state)?;
    if action.is_some() {
        app_state.status = None;
    }

    match action {
        Some(DashboardAction::Clients) => load_clients_screen(app_state, ClientQuery::default()).await?,
        Some(DashboardAction::Reports) => load_reports_screen(app_state, ReportQuery::default(), false).await?,
        Some(DashboardAction::Statistics) => load_statistics_screen(app_state).await?,
        Some(DashboardAction::Export) => load_reports_screen(app_state, ReportQuery::default(), true).await?,
        Some(DashboardAction::Configuration) => load_settings_screen(app_state).await?,
        Some(DashboardAction::Logout) => {
            if let Some(principal) = app_state.principal.take() {
                info!(user_id = principal.user_id, "logged out");
            }
            app_state.dashboard_state = None;
            app_state.screen = AppScreen::MainMenu;
            app_state.status = Some("Logged out".to_string());
        }
        Some(DashboardAction::Exit) => return Ok(true),
        None => {}
    }

    Ok(false)
}

async fn handle_clients_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.clients_state else {
        return load_clients_screen(app_state, ClientQuery::default()).await.map(|_| false);
    };
    let query = state.query().clone();

    match clients::handle_input(state)? {
        Some(ClientAction::Back) => load_dashboard_screen(app_state).await?,
        Some(ClientAction::NewClient) => {
            app_state.client_wizard_state = Some(ClientWizardState::new());
            app_state.screen = AppScreen::ClientWizard;
        }
        Some(ClientAction::EditClient(client_id)) => {
            let client = app_state.db.get_client(client_id).await?;
            app_state.client_wizard_state = Some(ClientWizardState::from_existing(&client));
            app_state.screen = AppScreen::ClientWizard;
        }
        Some(ClientAction::DeleteClient(client_id)) => {
            app_state.db.delete_client(client_id).await?;
            app_state.status = Some(format!("Client {} deleted", client_id));
            load_clients_screen(app_state, query).await?;
        }
        Some(ClientAction::Query(query)) => load_clients_screen(app_state, query).await?,
        Some(ClientAction::Report(client_id)) => {
            app_state.report_wizard_state = Some(ReportWizardState::for_client(client_id));
            app_state.report_wizard_origin = AppScreen::Clients;
            app_state.screen = AppScreen::ReportWizard;
        }
        Some(ClientAction::History(client_id)) => {
            let query = ReportQuery {
                client_id: Some(client_id),
                ..Default::default()
            };
            load_reports_screen(app_state, query, false).await?;
        }
        Some(ClientAction::ListReport(query)) => {
            app_state.report_wizard_state = Some(ReportWizardState::for_query(&query));
            app_state.report_wizard_origin = AppScreen::Clients;
            app_state.screen = AppScreen::ReportWizard;
        }
        None => {}
    }

    Ok(false)
}

async fn handle_client_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.client_wizard_state else {
        app_state.screen = AppScreen::Clients;
        return Ok(false);
    };
    let query = app_state
        .clients_state
        .as_ref()
        .map(|s| s.query().clone())
        .unwrap_or_default();

    match client_wizard::handle_input(state)? {
        Some(ClientWizardAction::Cancel) => {
            app_state.client_wizard_state = None;
            load_clients_screen(app_state, query).await?;
        }
        Some(ClientWizardAction::Save(client_id, draft)) => {
            let client = match client_id {
                Some(id) => app_state.db.update_client(id, &draft).await?,
                None => app_state.db.create_client(&draft).await?,
            };
            app_state.status = Some(format!("Client '{}' saved", client.name));
            app_state.client_wizard_state = None;
            load_clients_screen(app_state, query).await?;
        }
        None => {}
    }

    Ok(false)
}

async fn handle_reports_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.reports_state else {
        return load_reports_screen(app_state, ReportQuery::default(), false)
            .await
            .map(|_| false);
    };
    let query = state.query().clone();
    let export_mode = state.export_mode();

    match reports_ui::handle_input(state)? {
        Some(ReportAction::Back) => load_dashboard_screen(app_state).await?,
        Some(ReportAction::Generate) => {
            app_state.report_wizard_state = Some(ReportWizardState::new());
            app_state.report_wizard_origin = AppScreen::Reports;
            app_state.screen = AppScreen::ReportWizard;
        }
        Some(ReportAction::Export(report_id, format)) => {
            let path = app_state.generator()?.export(report_id, format).await?;
            app_state.status = Some(format!("Report {} exported to {}", report_id, path.display()));
        }
        Some(ReportAction::Delete(report_id)) => {
            app_state.db.delete_report(report_id).await?;
            app_state.status = Some(format!("Report {} deleted", report_id));
            load_reports_screen(app_state, query, export_mode).await?;
        }
        Some(ReportAction::Filter(query)) => load_reports_screen(app_state, query, export_mode).await?,
        Some(ReportAction::UpdateDetails { report_id, title, description }) => {
            app_state
                .db
                .update_report_details(report_id, &title, description.as_deref())
                .await?;
            app_state.status = Some(format!("Report {} updated", report_id));
            load_reports_screen(app_state, query, export_mode).await?;
        }
        None => {}
    }

    Ok(false)
}

async fn return_from_report_wizard(app_state: &mut AppState) -> Result<()> {
    app_state.report_wizard_state = None;
    match app_state.report_wizard_origin {
        AppScreen::Clients => {
            let query = app_state
                .clients_state
                .as_ref()
                .map(|s| s.query().clone())
                .unwrap_or_default();
            load_clients_screen(app_state, query).await
        }
        _ => {
            let (query, export_mode) = app_state
                .reports_state
                .as_ref()
                .map(|s| (s.query().clone(), s.export_mode()))
                .unwrap_or_default();
            load_reports_screen(app_state, query, export_mode).await
        }
    }
}

async fn handle_report_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.report_wizard_state else {
        return_from_report_wizard(app_state).await?;
        return Ok(false);
    };

    match report_wizard::handle_input(state)? {
        Some(ReportWizardAction::Cancel) => return_from_report_wizard(app_state).await?,
        Some(ReportWizardAction::Generate(request, format)) => {
            let report = app_state.generator()?.generate(request, format).await?;
            app_state.status = Some(format!("Report {} written to {}", report.id, report.file_path));
            return_from_report_wizard(app_state).await?;
        }
        None => {}
    }

    Ok(false)
}

async fn handle_statistics_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.statistics_state else {
        return load_statistics_screen(app_state).await.map(|_| false);
    };

    match statistics::handle_input(state)? {
        Some(StatisticsAction::Back) => load_dashboard_screen(app_state).await?,
        Some(StatisticsAction::Generate(format)) => {
            let report = app_state
                .generator()?
                .generate(ReportRequest::Statistics, format)
                .await?;
            app_state.status = Some(format!("Report {} written to {}", report.id, report.file_path));
            load_statistics_screen(app_state).await?;
        }
        None => {}
    }

    Ok(false)
}

async fn handle_settings_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.settings_state else {
        return load_dashboard_screen(app_state).await.map(|_| false);
    };

    match settings::handle_input(state)? {
        Some(SettingsAction::Back) => load_dashboard_screen(app_state).await?,
        Some(SettingsAction::ChangePassword) => open_credentials(app_state, CredentialsMode::ChangePassword),
        None => {}
    }

    Ok(false)
}
