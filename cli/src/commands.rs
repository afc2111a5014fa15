//! Subcommand implementations.
//!
//! Each command drives the shared [`SessionStore`] and returns the text to
//! print, so the behavior is testable without a terminal.

#[cfg(test)]
#[path = "commands_test.rs"]
mod commands_test;

use std::fmt::Write as _;

use session::storage::{self, CachedSession};
use session::{
    AccountApi, AuthFailure, ProfileDisplay, ProfileRender, ProfileView, RegisterRequest, SessionStorage,
    SessionStore,
};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Auth(#[from] AuthFailure),
    #[error("not logged in; run `login` first")]
    NotLoggedIn,
    #[error("{0}")]
    Profile(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("failed to read password: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn login<S: SessionStorage, A: AccountApi>(
    store: &SessionStore<S, A>,
    username: &str,
    password: &str,
) -> Result<String, CliError> {
    store.login(username, password).await?;
    let name = store.session().user.and_then(|u| u.display_name()).unwrap_or_else(|| username.to_owned());
    Ok(format!("Logged in as {name}"))
}

pub async fn register<S: SessionStorage, A: AccountApi>(
    store: &SessionStore<S, A>,
    request: &RegisterRequest,
) -> Result<String, CliError> {
    store.register(request).await?;
    Ok(format!("Registered {}. Run `login` to sign in.", request.username))
}

/// Restore and validate the stored session, then fetch and print the profile.
pub async fn whoami<S: SessionStorage, A: AccountApi>(store: &SessionStore<S, A>) -> Result<String, CliError> {
    store.initialize().await;
    let Some(cached) = store.session().user else {
        return Err(CliError::NotLoggedIn);
    };

    let view = ProfileView::new();
    view.load(store.api()).await;
    match view.render(Some(&cached)) {
        ProfileRender::Profile(display) => Ok(format_profile(&display)),
        ProfileRender::Error(message) => Err(CliError::Profile(message)),
        ProfileRender::Loading => Err(CliError::Profile(session::profile::LOAD_ERROR.to_owned())),
    }
}

/// Report the cached session without touching the network.
pub fn status<S: SessionStorage>(storage: &S) -> String {
    match storage::read_cached_session(storage) {
        CachedSession::Present { user, .. } => {
            let name = user.display_name().unwrap_or_else(|| "unknown user".to_owned());
            format!("Logged in as {name} (cached)")
        }
        CachedSession::Absent => "Not logged in".to_owned(),
        CachedSession::Corrupt => "Stored session is unreadable; run `logout` and log in again".to_owned(),
    }
}

pub fn logout<S: SessionStorage, A: AccountApi>(store: &SessionStore<S, A>) -> String {
    store.logout();
    "Logged out".to_owned()
}

fn format_profile(display: &ProfileDisplay) -> String {
    let mut out = String::new();
    let rows = [
        ("Username", display.username.as_str()),
        ("Email", display.email.as_str()),
        ("First Name", display.first_name.as_str()),
        ("Last Name", display.last_name.as_str()),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "{label:<13}{value}");
    }
    if let Some(since) = &display.member_since {
        let _ = writeln!(out, "{:<13}{since}", "Member Since");
    }
    out.truncate(out.trim_end().len());
    out
}
