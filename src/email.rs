use tracing::{debug, info};

use crate::extract::strip_query;
use crate::session::{Locator, Session, SessionError};
use crate::settings::Pauses;

pub const CONTACT_LINK_TEXT: &str = "Contact";
pub const MAIL_LINK_XPATH: &str = r#"//a[starts-with(@href,"mailto:")]"#;

/// Visit a profile, open its contact panel and return the first email shown.
///
/// Best effort: any failure along the way reads as "no email".
pub fn fetch_email<S: Session + ?Sized>(
    session: &mut S,
    profile_url: &str,
    pauses: &Pauses,
) -> Option<String> {
    info!("Visiting {}", profile_url);
    match try_fetch(session, profile_url, pauses) {
        Ok(email) => email,
        Err(e) => {
            debug!("No email for {}: {}", profile_url, e);
            None
        }
    }
}

fn try_fetch<S: Session + ?Sized>(
    session: &mut S,
    profile_url: &str,
    pauses: &Pauses,
) -> Result<Option<String>, SessionError> {
    session.navigate(profile_url)?;
    session.pause(pauses.render);

    let Some(contact) = session.find(&Locator::link_text(CONTACT_LINK_TEXT))? else {
        return Ok(None);
    };
    session.click(contact)?;
    session.pause(pauses.contact);

    for link in session.find_all(&Locator::XPath(MAIL_LINK_XPATH.to_string()))? {
        let Some(href) = session.attribute(link, "href")? else {
            continue;
        };
        if let Some(address) = mail_address(&href) {
            return Ok(Some(address.to_string()));
        }
    }
    Ok(None)
}

/// Address part of a `mailto:` link, if it looks like one.
fn mail_address(href: &str) -> Option<&str> {
    let address = strip_query(href.strip_prefix("mailto:")?).trim();
    address.contains('@').then_some(address)
}
