use std::sync::LazyLock;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::extract::CARD_SELECTOR;
use crate::session::{ElementHandle, Locator, Session, SessionError};

pub const REVEAL_LABELS: &[&str] = &["show more", "load more"];

/// Enabled buttons whose folded text contains one of [`REVEAL_LABELS`], found
/// with one page query per round.
pub static REVEAL_BUTTON_XPATH: LazyLock<String> = LazyLock::new(|| {
    let label = "translate(normalize-space(.),'ABCDEFGHIJKLMNOPQRSTUVWXYZ','abcdefghijklmnopqrstuvwxyz')";
    let any_label = REVEAL_LABELS
        .iter()
        .map(|l| format!("contains({},'{}')", label, l))
        .collect::<Vec<_>>()
        .join(" or ");
    format!("//button[not(@disabled) and ({})]", any_label)
});

struct Convergence {
    last_count: usize,
    idle_loops: usize,
}

/// Scroll and click "show/load more" until the card count stops growing for
/// `max_idle_loops` consecutive rounds. Returns the final card count.
///
/// At least one round always runs, so `0` behaves like `1`.
pub fn load_all<S: Session + ?Sized>(
    session: &mut S,
    pause: Duration,
    max_idle_loops: usize,
) -> Result<usize, SessionError> {
    info!("Scrolling to load all connections");
    let max_idle_loops = max_idle_loops.max(1);
    let mut state = Convergence {
        last_count: 0,
        idle_loops: 0,
    };

    while state.idle_loops < max_idle_loops {
        session.send_key("End")?;
        session.pause(pause);

        let clicked_any = click_reveal_buttons(session)?;

        let count = session.find_all(&Locator::css(CARD_SELECTOR))?.len();
        debug!(count, clicked_any, "Visible cards");

        if count == state.last_count && !clicked_any {
            state.idle_loops += 1;
        } else {
            state.last_count = count;
            state.idle_loops = 0;
        }
    }

    info!("Finished scrolling. Total loaded: {}", state.last_count);
    Ok(state.last_count)
}

/// Click every visible, enabled reveal button. Returns whether any click landed.
fn click_reveal_buttons<S: Session + ?Sized>(session: &mut S) -> Result<bool, SessionError> {
    let buttons = session.find_all(&Locator::XPath(REVEAL_BUTTON_XPATH.clone()))?;
    let mut clicked_any = false;

    for button in buttons {
        match try_click(session, button) {
            Ok(true) => {
                clicked_any = true;
                debug!(button = button.id(), "Clicked reveal button");
            }
            Ok(false) => {}
            Err(e) if e.is_stale() => continue,
            Err(e) => warn!("Skipping button: {}", e),
        }
    }

    Ok(clicked_any)
}

fn try_click<S: Session + ?Sized>(
    session: &mut S,
    button: ElementHandle,
) -> Result<bool, SessionError> {
    if !session.is_enabled(button)? || !session.is_displayed(button)? {
        return Ok(false);
    }
    session.scroll_into_view(button)?;
    session.click(button)?;
    Ok(true)
}
