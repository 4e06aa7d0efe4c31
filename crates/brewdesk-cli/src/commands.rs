//! Subcommand handlers.
//!
//! Each handler returns the process exit code. Auth failures are reported
//! with `AuthError::user_message` and exit non-zero; anything else bubbles
//! up as an `anyhow` error.

use std::process::ExitCode;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::warn;

use brewdesk_core::bootstrap::{self, StoreChoice};
use brewdesk_core::config::is_loopback;
use brewdesk_core::diagnostics;
use brewdesk_core::utils::truncate_string;
use brewdesk_core::validation::{validate_login, validate_registration, ValidationErrors};
use brewdesk_core::{ApiClient, AuthAction, AuthError, Config, SessionEvent};

use crate::prompt;

/// Longest display name printed in status lines
const MAX_NAME_DISPLAY: usize = 40;

/// Print where each session transition leads
fn announce(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Authenticated { user } => println!(
                "Welcome, {}!",
                truncate_string(user.display_name(), MAX_NAME_DISPLAY)
            ),
            SessionEvent::Unauthenticated => {
                println!("Signed out. Run `brewdesk login` to sign in.")
            }
        }
    }
}

fn report_invalid(errors: &ValidationErrors) -> ExitCode {
    for message in errors.messages() {
        eprintln!("  - {}", message);
    }
    ExitCode::FAILURE
}

fn report_failure(err: &AuthError, action: AuthAction) -> ExitCode {
    eprintln!("{}", err.user_message(action));
    ExitCode::FAILURE
}

pub async fn login(
    config: &mut Config,
    choice: StoreChoice,
    email: Option<String>,
) -> Result<ExitCode> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt::email("Email: ")?,
    };
    let password = prompt::password(&format!("Password for {}: ", email.trim()))?;

    if let Err(errors) = validate_login(&email, &password) {
        return Ok(report_invalid(&errors));
    }

    let manager = bootstrap::start(config, choice)?;
    let mut events = manager.subscribe_events();

    let email = email.trim().to_string();
    match manager.login(&email, &password).await {
        Ok(_) => {
            announce(&mut events);
            if let Some(at) = manager.state().signed_in_at {
                println!("Session started {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            config.last_email = Some(email);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to remember last email");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_failure(&e, AuthAction::SignIn)),
    }
}

pub async fn register(
    config: &Config,
    choice: StoreChoice,
    name: String,
    email: Option<String>,
) -> Result<ExitCode> {
    let email = match email {
        Some(email) => email,
        None => prompt::email("Email: ")?,
    };
    let password = prompt::password("Password: ")?;
    let confirm = prompt::password("Confirm password: ")?;

    if let Err(errors) = validate_registration(&name, &email, &password, &confirm) {
        return Ok(report_invalid(&errors));
    }

    let manager = bootstrap::start(config, choice)?;
    let mut events = manager.subscribe_events();

    match manager.register(email.trim(), &password, name.trim()).await {
        Ok(_) => {
            announce(&mut events);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_failure(&e, AuthAction::Register)),
    }
}

pub async fn logout(config: &Config, choice: StoreChoice) -> Result<ExitCode> {
    let manager = bootstrap::start(config, choice)?;
    let mut events = manager.subscribe_events();

    manager.logout().await;
    announce(&mut events);
    Ok(ExitCode::SUCCESS)
}

pub async fn status(config: &Config, choice: StoreChoice, refresh: bool) -> Result<ExitCode> {
    let manager = bootstrap::start(config, choice)?;
    let mut events = manager.subscribe_events();

    if refresh {
        if let Err(e) = manager.refresh_profile().await {
            let code = report_failure(&e, AuthAction::RefreshProfile);
            announce(&mut events);
            return Ok(code);
        }
    }

    let snapshot = manager.snapshot();
    match snapshot.user.filter(|_| snapshot.is_authenticated) {
        Some(user) => println!(
            "Signed in as {} <{}>",
            truncate_string(user.display_name(), MAX_NAME_DISPLAY),
            user.email
        ),
        None => println!("Not signed in. Run `brewdesk login` to sign in."),
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn diagnose(config: &Config, choice: StoreChoice, probe: bool) -> Result<ExitCode> {
    let api = ApiClient::new(&config.api_url())?;
    let store = bootstrap::open_store(config, &choice)?;

    let report = diagnostics::collect(&api, store.as_ref(), probe).await;
    print!("{}", report);
    Ok(ExitCode::SUCCESS)
}

pub fn config(config: &mut Config, api_url: Option<String>) -> Result<ExitCode> {
    if let Some(url) = api_url {
        let url = url.trim().trim_end_matches('/').to_string();
        config.api_url = (!url.is_empty()).then_some(url);
        config.save()?;
        println!("Saved to {}", Config::config_path()?.display());
    }

    let resolved = config.api_url();
    println!("API URL:            {}", resolved);
    if is_loopback(&resolved) {
        println!("                    (reachable from this machine only)");
    }
    println!(
        "Credential backend: {}",
        serde_json::to_string(&config.credential_backend)?.trim_matches('"')
    );
    if let Some(email) = &config.last_email {
        println!("Last email:         {}", email);
    }
    Ok(ExitCode::SUCCESS)
}
