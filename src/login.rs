use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::settings::{Settings, HOME_URL, LOGIN_URL};
use crate::session::{Locator, LoginSession, StoredCookie};

pub const USERNAME_SELECTOR: &str = "#username";
pub const PASSWORD_SELECTOR: &str = "#password";
pub const SUBMIT_SELECTOR: &str = "button[type=\"submit\"]";

/// Sign in, reusing saved cookies when they are still valid. Returns whether
/// the session ended up on the feed.
pub fn login<S: LoginSession + ?Sized>(session: &mut S, settings: &Settings) -> Result<bool> {
    let pauses = settings.pauses();

    if settings.cookie_path.exists() {
        info!("Loading cookies from {:?}", settings.cookie_path);
        match load_cookies(&settings.cookie_path) {
            Ok(cookies) => {
                session.navigate(HOME_URL)?;
                session.set_cookies(&cookies)?;
                session.navigate(HOME_URL)?;
                session.pause(pauses.login);
                if on_feed(session)? {
                    info!("Logged in via cookies");
                    return Ok(true);
                }
                info!("Saved cookies no longer valid");
            }
            Err(e) => warn!("Ignoring unreadable cookie file: {:#}", e),
        }
    }

    let email = settings
        .linkedin_email
        .as_deref()
        .context("HARVEST_LINKEDIN_EMAIL is not set")?;
    let password = settings
        .linkedin_password
        .as_deref()
        .context("HARVEST_LINKEDIN_PASSWORD is not set")?;

    info!("Logging in with credentials");
    session.navigate(LOGIN_URL)?;
    session.pause(pauses.login);
    session.type_into(USERNAME_SELECTOR, email)?;
    session.type_into(PASSWORD_SELECTOR, password)?;
    let submit = session
        .find(&Locator::css(SUBMIT_SELECTOR))?
        .context("Login form has no submit button")?;
    session.click(submit)?;
    session.pause(pauses.submit);

    if !on_feed(session)? {
        error!("Login failed. Check credentials or security challenge.");
        return Ok(false);
    }

    save_cookies(&settings.cookie_path, &session.cookies()?)?;
    info!("Login successful. Cookies saved to {:?}", settings.cookie_path);
    Ok(true)
}

fn on_feed<S: LoginSession + ?Sized>(session: &mut S) -> Result<bool> {
    Ok(session.current_url()?.contains("feed"))
}

fn load_cookies(path: &Path) -> Result<Vec<StoredCookie>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn save_cookies(path: &Path, cookies: &[StoredCookie]) -> Result<()> {
    let json = serde_json::to_string_pretty(cookies)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
}
