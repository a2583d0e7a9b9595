//! Login, registration and logout. Successful calls persist the session.
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument};

use crate::api::PrepApi;
use crate::error::ClientError;
use crate::session::{Session, SessionStore};

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static UPPER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]").expect("valid regex"));
static LOWER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]").expect("valid regex"));
static DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").expect("valid regex"));

pub fn check_password(password: &str) -> Result<(), ClientError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::WeakPassword("must be at least 8 characters"));
    }
    if !UPPER_RE.is_match(password) {
        return Err(ClientError::WeakPassword("must contain an uppercase letter"));
    }
    if !LOWER_RE.is_match(password) {
        return Err(ClientError::WeakPassword("must contain a lowercase letter"));
    }
    if !DIGIT_RE.is_match(password) {
        return Err(ClientError::WeakPassword("must contain a digit"));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), ClientError> {
    if email.is_empty() {
        return Err(ClientError::MissingField("email"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ClientError::Invalid("email address is not valid"));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn login(
    api: &dyn PrepApi,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<Session, ClientError> {
    let email = email.trim();
    check_email(email)?;
    if password.is_empty() {
        return Err(ClientError::MissingField("password"));
    }
    let resp = api.login(email, password).await?;
    let session = Session::new(resp.token, Some(resp.user));
    store.save(&session)?;
    info!(user = session.identity(), "logged in");
    Ok(session)
}

#[instrument(skip_all)]
pub async fn register(
    api: &dyn PrepApi,
    store: &SessionStore,
    name: &str,
    email: &str,
    password: &str,
) -> Result<Session, ClientError> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() {
        return Err(ClientError::MissingField("name"));
    }
    check_email(email)?;
    check_password(password)?;
    let resp = api.register(name, email, password).await?;
    let session = Session::new(resp.token, Some(resp.user));
    store.save(&session)?;
    info!(user = session.identity(), "registered");
    Ok(session)
}

pub fn logout(store: &SessionStore) -> Result<(), ClientError> {
    store.clear()?;
    info!("logged out");
    Ok(())
}
