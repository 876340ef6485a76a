//! Scripted in-memory page for exercising the harvesting code without a browser.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use super::{ElementHandle, Locator, LoginSession, Session, SessionError, StoredCookie};
use crate::email::{CONTACT_LINK_TEXT, MAIL_LINK_XPATH};
use crate::extract::{CARD_SELECTOR, DETAILS_SELECTOR, LINK_SELECTOR, NAME_SELECTOR};
use crate::loader::{REVEAL_BUTTON_XPATH, REVEAL_LABELS};
use crate::login::{PASSWORD_SELECTOR, SUBMIT_SELECTOR, USERNAME_SELECTOR};
use crate::settings::{HOME_URL, LOGIN_URL};

const FEED_URL: &str = "https://www.linkedin.com/feed/";
const SESSION_COOKIE: &str = "li_at";

#[derive(Debug, Clone, Default)]
pub struct FakeCard {
    pub name: Option<String>,
    pub details: Option<String>,
    pub href: Option<String>,
    pub stale: bool,
}

impl FakeCard {
    pub fn new(name: &str, details: &str, href: &str) -> Self {
        FakeCard {
            name: Some(name.to_string()),
            details: Some(details.to_string()),
            href: Some(href.to_string()),
            stale: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeButton {
    pub label: String,
    pub enabled: bool,
    pub stale: bool,
    /// Detached by a re-render between lookup and click.
    pub stale_on_click: bool,
    /// Clicks left before the button hides itself.
    pub remaining: usize,
    /// Cards appended per click.
    pub reveals: usize,
    pub clicks: usize,
}

impl FakeButton {
    pub fn new(label: &str, remaining: usize, reveals: usize) -> Self {
        FakeButton {
            label: label.to_string(),
            enabled: true,
            stale: false,
            stale_on_click: false,
            remaining,
            reveals,
            clicks: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeProfile {
    pub has_contact: bool,
    pub mail_links: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Card(usize),
    CardName(usize),
    CardDetails(usize),
    CardLink(usize),
    Button(usize),
    Contact,
    MailLink(usize),
    Submit,
}

#[derive(Default)]
pub struct FakeSession {
    pub cards: Vec<FakeCard>,
    /// Cards appended on each successive `End` key press.
    pub growth: VecDeque<usize>,
    pub buttons: Vec<FakeButton>,
    pub profiles: HashMap<String, FakeProfile>,
    pub scrolls: usize,
    pub pauses: Vec<Duration>,
    /// Element text reads, one per `text` call.
    pub text_calls: usize,
    /// Session cookie value the home page accepts as signed in.
    pub session_token: Option<String>,
    /// Email and password the login form accepts.
    pub credentials: Option<(String, String)>,
    /// Form input by selector.
    pub typed: HashMap<String, String>,
    jar: Vec<StoredCookie>,
    /// Where the last navigation or submit redirected to.
    landed: Option<String>,
    current: Option<String>,
    contact_open: bool,
    nodes: Vec<Node>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: Vec<FakeCard>) -> Self {
        FakeSession {
            cards,
            ..Self::default()
        }
    }

    fn handle(&mut self, node: Node) -> ElementHandle {
        self.nodes.push(node);
        ElementHandle::new(self.nodes.len() as u64 - 1)
    }

    fn node(&self, handle: ElementHandle) -> Result<Node, SessionError> {
        let node = *self
            .nodes
            .get(handle.id() as usize)
            .ok_or(SessionError::Stale)?;
        let stale = match node {
            Node::Card(i) | Node::CardName(i) | Node::CardDetails(i) | Node::CardLink(i) => {
                self.cards[i].stale
            }
            Node::Button(i) => self.buttons[i].stale,
            Node::Contact | Node::MailLink(_) | Node::Submit => false,
        };
        if stale {
            return Err(SessionError::Stale);
        }
        Ok(node)
    }

    fn grow(&mut self, n: usize) {
        for _ in 0..n {
            let i = self.cards.len();
            self.cards.push(FakeCard::new(
                &format!("Person {}", i),
                "London, England",
                &format!("https://www.linkedin.com/in/person-{}/", i),
            ));
        }
    }

    fn signed_in_by_cookie(&self) -> bool {
        self.session_token.as_ref().is_some_and(|token| {
            self.jar
                .iter()
                .any(|c| c.name == SESSION_COOKIE && c.value == *token)
        })
    }

    fn submit_login(&mut self) {
        let Some((email, password)) = &self.credentials else {
            return;
        };
        let field = |selector: &str| self.typed.get(selector).map(String::as_str);
        let accepted = field(USERNAME_SELECTOR) == Some(email.as_str())
            && field(PASSWORD_SELECTOR) == Some(password.as_str());
        if !accepted {
            return;
        }
        self.landed = Some(FEED_URL.to_string());
        self.jar = self
            .session_token
            .iter()
            .map(|token| StoredCookie {
                name: SESSION_COOKIE.to_string(),
                value: token.clone(),
                domain: ".linkedin.com".to_string(),
                path: "/".to_string(),
                secure: true,
                http_only: true,
            })
            .collect();
    }

    fn is_reveal_button(button: &FakeButton) -> bool {
        let label = button
            .label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        button.enabled && REVEAL_LABELS.iter().any(|l| label.contains(l))
    }

    fn profile(&self) -> Option<&FakeProfile> {
        self.current.as_ref().and_then(|url| self.profiles.get(url))
    }
}

impl Session for FakeSession {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        let known = url == HOME_URL || url == LOGIN_URL || self.profiles.contains_key(url);
        if !known {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        self.current = Some(url.to_string());
        self.contact_open = false;
        self.landed = (url == HOME_URL && self.signed_in_by_cookie()).then(|| FEED_URL.to_string());
        Ok(())
    }

    fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        let nodes: Vec<Node> = if *locator == Locator::css(CARD_SELECTOR) {
            (0..self.cards.len()).map(Node::Card).collect()
        } else if *locator == Locator::XPath(REVEAL_BUTTON_XPATH.clone()) {
            (0..self.buttons.len())
                .filter(|&i| Self::is_reveal_button(&self.buttons[i]))
                .map(Node::Button)
                .collect()
        } else if *locator == Locator::css(SUBMIT_SELECTOR) {
            if self.current.as_deref() == Some(LOGIN_URL) {
                vec![Node::Submit]
            } else {
                Vec::new()
            }
        } else if *locator == Locator::link_text(CONTACT_LINK_TEXT) {
            match self.profile() {
                Some(p) if p.has_contact => vec![Node::Contact],
                _ => Vec::new(),
            }
        } else if *locator == Locator::XPath(MAIL_LINK_XPATH.to_string()) {
            match self.profile() {
                Some(p) if self.contact_open => (0..p.mail_links.len()).map(Node::MailLink).collect(),
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };
        Ok(nodes.into_iter().map(|n| self.handle(n)).collect())
    }

    fn find_within(
        &mut self,
        parent: ElementHandle,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, SessionError> {
        let Node::Card(i) = self.node(parent)? else {
            return Ok(None);
        };
        let card = &self.cards[i];
        let node = if *locator == Locator::css(NAME_SELECTOR) {
            card.name.as_ref().map(|_| Node::CardName(i))
        } else if *locator == Locator::css(DETAILS_SELECTOR) {
            card.details.as_ref().map(|_| Node::CardDetails(i))
        } else if *locator == Locator::css(LINK_SELECTOR) {
            card.href.as_ref().map(|_| Node::CardLink(i))
        } else {
            None
        };
        Ok(node.map(|n| self.handle(n)))
    }

    fn send_key(&mut self, key: &str) -> Result<(), SessionError> {
        if key == "End" {
            self.scrolls += 1;
            if let Some(n) = self.growth.pop_front() {
                self.grow(n);
            }
        }
        Ok(())
    }

    fn scroll_into_view(&mut self, element: ElementHandle) -> Result<(), SessionError> {
        self.node(element).map(|_| ())
    }

    fn click(&mut self, element: ElementHandle) -> Result<(), SessionError> {
        match self.node(element)? {
            Node::Button(i) => {
                let button = &mut self.buttons[i];
                if button.stale_on_click {
                    return Err(SessionError::Stale);
                }
                button.clicks += 1;
                button.remaining = button.remaining.saturating_sub(1);
                let reveals = button.reveals;
                self.grow(reveals);
            }
            Node::Contact => self.contact_open = true,
            Node::Submit => self.submit_login(),
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, element: ElementHandle) -> Result<String, SessionError> {
        self.text_calls += 1;
        let text = match self.node(element)? {
            Node::CardName(i) => self.cards[i].name.clone().unwrap_or_default(),
            Node::CardDetails(i) => self.cards[i].details.clone().unwrap_or_default(),
            Node::Button(i) => self.buttons[i].label.clone(),
            Node::Contact => "Contact info".to_string(),
            _ => String::new(),
        };
        Ok(text)
    }

    fn attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        if name != "href" {
            return Ok(None);
        }
        let value = match self.node(element)? {
            Node::CardLink(i) => self.cards[i].href.clone(),
            Node::MailLink(i) => self.profile().and_then(|p| p.mail_links.get(i).cloned()),
            _ => None,
        };
        Ok(value)
    }

    fn is_displayed(&mut self, element: ElementHandle) -> Result<bool, SessionError> {
        match self.node(element)? {
            Node::Button(i) => Ok(self.buttons[i].remaining > 0),
            _ => Ok(true),
        }
    }

    fn is_enabled(&mut self, element: ElementHandle) -> Result<bool, SessionError> {
        match self.node(element)? {
            Node::Button(i) => Ok(self.buttons[i].enabled),
            _ => Ok(true),
        }
    }

    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}

impl LoginSession for FakeSession {
    fn current_url(&mut self) -> Result<String, SessionError> {
        let url = self.landed.as_ref().or(self.current.as_ref());
        Ok(url.cloned().unwrap_or_else(|| "about:blank".to_string()))
    }

    fn type_into(&mut self, selector: &str, text: &str) -> Result<(), SessionError> {
        if self.current.as_deref() != Some(LOGIN_URL) {
            return Err(SessionError::Driver(format!("no element matches {}", selector)));
        }
        self.typed.insert(selector.to_string(), text.to_string());
        Ok(())
    }

    fn cookies(&mut self) -> Result<Vec<StoredCookie>, SessionError> {
        Ok(self.jar.clone())
    }

    fn set_cookies(&mut self, cookies: &[StoredCookie]) -> Result<(), SessionError> {
        self.jar = cookies.to_vec();
        Ok(())
    }
}
