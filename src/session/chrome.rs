use anyhow::{anyhow, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{ElementHandle, Locator, LoginSession, Session, SessionError, StoredCookie};

/// Attribute stamped on every element handed out, so later calls can find it
/// again. Nodes replaced by a re-render lose it and read back as stale.
const HANDLE_ATTR: &str = "data-harvest-id";

/// Chrome tab driven over CDP. Every call blocks on an internal runtime.
pub struct ChromeSession {
    runtime: Runtime,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

#[derive(Deserialize)]
struct Reply<T> {
    stale: bool,
    value: Option<T>,
}

impl ChromeSession {
    pub fn launch(headless: bool) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("Failed to start browser runtime")?;

        let mut builder = BrowserConfig::builder().arg("--disable-blink-features=AutomationControlled");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(|e| anyhow!("Invalid browser config: {}", e))?;

        let (browser, page, handler) = runtime.block_on(async {
            let (browser, mut handler) = Browser::launch(config)
                .await
                .context("Failed to launch Chrome")?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            let page = browser.new_page("about:blank").await?;
            anyhow::Ok((browser, page, handler))
        })?;

        Ok(ChromeSession {
            runtime,
            browser,
            page,
            handler,
        })
    }

    /// Shut the browser down and wait for the process to exit.
    pub fn close(self) {
        let ChromeSession {
            runtime,
            mut browser,
            page,
            handler,
        } = self;
        drop(page);
        let closed = runtime.block_on(async {
            browser.close().await?;
            browser.wait().await?;
            anyhow::Ok(())
        });
        if let Err(e) = closed {
            warn!("Browser did not shut down cleanly: {}", e);
        }
        handler.abort();
    }

    fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, SessionError> {
        let result = self
            .runtime
            .block_on(self.page.evaluate(script))
            .map_err(|e| SessionError::Driver(e.to_string()))?;
        result
            .into_value::<T>()
            .map_err(|e| SessionError::Driver(e.to_string()))
    }

    /// Run `body` with `el` bound to the element behind `handle`.
    fn with_element<T: DeserializeOwned>(
        &self,
        handle: ElementHandle,
        body: &str,
    ) -> Result<Option<T>, SessionError> {
        let script = format!(
            "(() => {{ const el = document.querySelector('[{attr}=\"{id}\"]'); \
             if (!el) return {{ stale: true, value: null }}; \
             return {{ stale: false, value: (() => {{ {body} }})() ?? null }}; }})()",
            attr = HANDLE_ATTR,
            id = handle.id(),
            body = body,
        );
        let reply: Reply<T> = self.eval(script)?;
        if reply.stale {
            return Err(SessionError::Stale);
        }
        Ok(reply.value)
    }

    /// Collect matches of `locator` under `scope` (a JS expression) and stamp
    /// each with a handle id.
    fn collect(&self, scope: &str, locator: &Locator) -> Result<Reply<Vec<u64>>, SessionError> {
        let script = format!(
            "(() => {{ const scope = {scope}; \
             if (!scope) return {{ stale: true, value: null }}; \
             const found = {query}; \
             window.__harvestSeq = window.__harvestSeq || 0; \
             const ids = found.map(el => {{ \
               if (!el.hasAttribute('{attr}')) el.setAttribute('{attr}', String(++window.__harvestSeq)); \
               return Number(el.getAttribute('{attr}')); }}); \
             return {{ stale: false, value: ids }}; }})()",
            scope = scope,
            query = locator_query(locator),
            attr = HANDLE_ATTR,
        );
        self.eval(script)
    }
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn locator_query(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) => {
            format!("Array.from(scope.querySelectorAll({}))", js_string(selector))
        }
        Locator::XPath(path) => format!(
            "(() => {{ const snap = document.evaluate({}, scope, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
             const out = []; for (let i = 0; i < snap.snapshotLength; i++) out.push(snap.snapshotItem(i)); \
             return out; }})()",
            js_string(path)
        ),
        Locator::PartialLinkText(fragment) => format!(
            "Array.from(scope.querySelectorAll('a')).filter(a => (a.innerText || '').includes({}))",
            js_string(fragment)
        ),
    }
}

impl Session for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        debug!("navigate {}", url);
        self.runtime
            .block_on(self.page.goto(url))
            .map(|_| ())
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        let reply = self.collect("document", locator)?;
        Ok(reply
            .value
            .unwrap_or_default()
            .into_iter()
            .map(ElementHandle::new)
            .collect())
    }

    fn find_within(
        &mut self,
        parent: ElementHandle,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, SessionError> {
        let scope = format!("document.querySelector('[{}=\"{}\"]')", HANDLE_ATTR, parent.id());
        let reply = self.collect(&scope, locator)?;
        if reply.stale {
            return Err(SessionError::Stale);
        }
        Ok(reply
            .value
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(ElementHandle::new))
    }

    fn send_key(&mut self, key: &str) -> Result<(), SessionError> {
        self.runtime
            .block_on(async {
                let body = self.page.find_element("body").await?;
                body.press_key(key).await?;
                Ok::<_, chromiumoxide::error::CdpError>(())
            })
            .map_err(|e| SessionError::Driver(e.to_string()))
    }

    fn scroll_into_view(&mut self, element: ElementHandle) -> Result<(), SessionError> {
        self.with_element::<bool>(element, "el.scrollIntoView({ block: 'center' }); return true;")?;
        Ok(())
    }

    fn click(&mut self, element: ElementHandle) -> Result<(), SessionError> {
        self.with_element::<bool>(element, "el.click(); return true;")?;
        Ok(())
    }

    fn text(&mut self, element: ElementHandle) -> Result<String, SessionError> {
        let text = self.with_element::<String>(element, "return el.innerText || '';")?;
        Ok(text.unwrap_or_default())
    }

    fn attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        // Prefer the resolved property (absolute href) over the raw attribute.
        let body = format!(
            "const n = {name}; return (typeof el[n] === 'string') ? el[n] : el.getAttribute(n);",
            name = js_string(name)
        );
        self.with_element::<String>(element, &body)
    }

    fn is_displayed(&mut self, element: ElementHandle) -> Result<bool, SessionError> {
        let shown = self.with_element::<bool>(
            element,
            "return !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);",
        )?;
        Ok(shown.unwrap_or(false))
    }

    fn is_enabled(&mut self, element: ElementHandle) -> Result<bool, SessionError> {
        let enabled = self.with_element::<bool>(element, "return !el.disabled;")?;
        Ok(enabled.unwrap_or(false))
    }
}

impl LoginSession for ChromeSession {
    fn current_url(&mut self) -> Result<String, SessionError> {
        let url = self.runtime.block_on(self.page.url()).map_err(driver)?;
        Ok(url.unwrap_or_default())
    }

    fn type_into(&mut self, selector: &str, text: &str) -> Result<(), SessionError> {
        self.runtime
            .block_on(async {
                let element = self.page.find_element(selector).await?;
                element.click().await?.type_str(text).await?;
                Ok::<_, chromiumoxide::error::CdpError>(())
            })
            .map_err(|e| SessionError::Driver(format!("typing into {}: {}", selector, e)))
    }

    fn cookies(&mut self) -> Result<Vec<StoredCookie>, SessionError> {
        let cookies = self.runtime.block_on(self.page.get_cookies()).map_err(driver)?;
        Ok(cookies
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect())
    }

    fn set_cookies(&mut self, cookies: &[StoredCookie]) -> Result<(), SessionError> {
        let params = cookies
            .iter()
            .map(|c| {
                CookieParam::builder()
                    .name(c.name.clone())
                    .value(c.value.clone())
                    .domain(c.domain.clone())
                    .path(c.path.clone())
                    .secure(c.secure)
                    .http_only(c.http_only)
                    .build()
                    .map_err(|e| SessionError::Driver(format!("bad cookie {}: {}", c.name, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.runtime.block_on(self.page.set_cookies(params)).map_err(driver)?;
        Ok(())
    }
}

fn driver(e: chromiumoxide::error::CdpError) -> SessionError {
    SessionError::Driver(e.to_string())
}
