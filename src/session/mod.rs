pub mod chrome;
#[cfg(test)]
pub mod fake;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use chrome::ChromeSession;

/// How to look up elements on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    /// Anchors whose visible text contains the given fragment.
    PartialLinkText(String),
}

impl Locator {
    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }

    pub fn link_text(fragment: &str) -> Self {
        Locator::PartialLinkText(fragment.to_string())
    }
}

/// Opaque reference to an element on the page. Becomes stale when the page
/// re-renders the underlying node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub fn new(id: u64) -> Self {
        ElementHandle(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("element is no longer attached to the page")]
    Stale,
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("browser error: {0}")]
    Driver(String),
}

impl SessionError {
    pub fn is_stale(&self) -> bool {
        matches!(self, SessionError::Stale)
    }
}

/// Blocking browser capability the harvesting code drives.
///
/// One session is one exclusive browser tab; callers pass it around by
/// `&mut` and never share it across threads.
pub trait Session {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError>;

    fn find(&mut self, locator: &Locator) -> Result<Option<ElementHandle>, SessionError> {
        Ok(self.find_all(locator)?.into_iter().next())
    }

    /// First match of `locator` inside `parent`. `Err(Stale)` if the parent is gone.
    fn find_within(
        &mut self,
        parent: ElementHandle,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, SessionError>;

    /// Press a named key (e.g. `"End"`) on the page body.
    fn send_key(&mut self, key: &str) -> Result<(), SessionError>;

    fn scroll_into_view(&mut self, element: ElementHandle) -> Result<(), SessionError>;

    fn click(&mut self, element: ElementHandle) -> Result<(), SessionError>;

    fn text(&mut self, element: ElementHandle) -> Result<String, SessionError>;

    fn attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    fn is_displayed(&mut self, element: ElementHandle) -> Result<bool, SessionError>;

    fn is_enabled(&mut self, element: ElementHandle) -> Result<bool, SessionError>;

    /// Fixed wait used after actions that trigger asynchronous rendering.
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Cookie shape persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

/// The extra page access signing in needs: the address bar, form typing and
/// the cookie jar.
pub trait LoginSession: Session {
    fn current_url(&mut self) -> Result<String, SessionError>;

    /// Focus the first element matching the CSS `selector` and type `text` into it.
    fn type_into(&mut self, selector: &str, text: &str) -> Result<(), SessionError>;

    fn cookies(&mut self) -> Result<Vec<StoredCookie>, SessionError>;

    fn set_cookies(&mut self, cookies: &[StoredCookie]) -> Result<(), SessionError>;
}
