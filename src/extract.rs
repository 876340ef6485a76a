use tracing::{debug, info};

use crate::session::{ElementHandle, Locator, Session, SessionError};

pub const CARD_SELECTOR: &str = ".mn-connection-card";
pub const NAME_SELECTOR: &str = ".mn-connection-card__name";
pub const DETAILS_SELECTOR: &str = ".mn-connection-card__details";
pub const LINK_SELECTOR: &str = "a";

/// One card from the connections list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub name: String,
    /// Raw details blob; multi-line and may carry noise lines.
    pub location: String,
    /// Card link without its query string.
    pub profile_url: String,
}

/// Read every card currently on the page, in display order.
///
/// Cards with a missing field, or that go stale while being read, are
/// skipped. Duplicates are left for the store to collapse.
pub fn extract_all<S: Session + ?Sized>(session: &mut S) -> Result<Vec<ConnectionRecord>, SessionError> {
    let cards = session.find_all(&Locator::css(CARD_SELECTOR))?;
    let mut records = Vec::with_capacity(cards.len());

    for (i, card) in cards.into_iter().enumerate() {
        match read_card(session, card) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => debug!("Skipping card {}: missing field", i),
            Err(e) => debug!("Skipping card {}: {}", i, e),
        }
    }

    info!("Extracted {} connections", records.len());
    Ok(records)
}

fn read_card<S: Session + ?Sized>(
    session: &mut S,
    card: ElementHandle,
) -> Result<Option<ConnectionRecord>, SessionError> {
    let Some(name) = session.find_within(card, &Locator::css(NAME_SELECTOR))? else {
        return Ok(None);
    };
    let Some(details) = session.find_within(card, &Locator::css(DETAILS_SELECTOR))? else {
        return Ok(None);
    };
    let Some(link) = session.find_within(card, &Locator::css(LINK_SELECTOR))? else {
        return Ok(None);
    };
    let Some(href) = session.attribute(link, "href")? else {
        return Ok(None);
    };

    Ok(Some(ConnectionRecord {
        name: session.text(name)?.trim().to_string(),
        location: session.text(details)?.trim().to_string(),
        profile_url: strip_query(&href).to_string(),
    }))
}

pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
