//! Overlay: "Return to stream" přes přehrávač.

use crate::{ClickRule, Target};
use page_driver::{finder, ElementId, HumanDelay, Page};
use settings::Settings;
use std::time::Duration;

const CONTAINER: &str = ".player-overlay-background";
const CLOSE_BUTTONS: &[&str] = &[
    r#"button[aria-label="Return to stream"]"#,
    r#"button[aria-label*="Return to stream" i]"#,
];
const CLICK_DELAY: HumanDelay = HumanDelay::ms(300, 1500);

#[derive(Debug, Default, Clone, Copy)]
pub struct OverlayRule;

impl OverlayRule {
    /// Zavírací tlačítko; jinak první použitelné tlačítko v kontejneru
    fn close_button(page: &dyn Page, container: &ElementId) -> Option<ElementId> {
        finder::first_usable(page, Some(container), CLOSE_BUTTONS).or_else(|| {
            finder::first_present(page, Some(container), &["button"]).filter(|b| finder::is_usable(page, b))
        })
    }

    fn target(page: &dyn Page, container: ElementId) -> Option<Target> {
        let button = Self::close_button(page, &container)?;
        Some(Target { key: container, button })
    }
}

impl ClickRule for OverlayRule {
    const LABEL: &'static str = "[Overlay]";
    const EVENT: &'static str = "OVERLAY_CLOSED";
    const COOLDOWN: Duration = Duration::from_secs(10);

    fn enabled(&self, settings: &Settings) -> bool {
        settings.enable_overlay
    }

    fn poll_every(&self) -> Option<Duration> {
        None
    }

    fn scan(&self, page: &dyn Page) -> Vec<Target> {
        page.query_all(None, CONTAINER)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| Self::target(page, c))
            .collect()
    }

    fn from_added(&self, page: &dyn Page, node: &ElementId) -> Vec<Target> {
        let mut containers = Vec::new();
        if page.matches(node, CONTAINER).unwrap_or(false) {
            containers.push(node.clone());
        }
        if let Some(inside) = finder::first_present(page, Some(node), &[CONTAINER]) {
            containers.push(inside);
        }
        containers
            .into_iter()
            .filter_map(|c| Self::target(page, c))
            .collect()
    }

    fn delay(&self, _settings: &Settings) -> Duration {
        CLICK_DELAY.sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::clicker;
    use page_driver::MemoryPage;
    use std::sync::Arc;
    use tokio::time::advance;

    const PLAYER: &str = r#"
        <div class="video-player" id="player">
          <div class="player-overlay-background" id="ov">
            <p>Ad blocker detected</p>
            <button aria-label="Learn more" id="learn">Learn more</button>
            <button aria-label="Return to stream" id="back">Return to stream</button>
          </div>
        </div>"#;

    fn overlay_settings() -> Settings {
        Settings { enable_overlay: true, ..Settings::default() }
    }

    #[tokio::test(start_paused = true)]
    async fn closes_overlay_with_return_button() {
        let page = Arc::new(MemoryPage::new(PLAYER));
        let (mut overlay, _tx, cooldown) = clicker(OverlayRule, &page, overlay_settings());

        overlay.on_added(&[page.first("#player").unwrap()]);
        assert_eq!(overlay.pending(), 1);
        overlay.step().await;
        assert_eq!(page.click_count("#back"), 1);
        assert_eq!(page.click_count("#learn"), 0);
        assert!(!cooldown.ready());

        advance(Duration::from_secs(9)).await;
        overlay.scan();
        assert_eq!(overlay.pending(), 0);
        advance(Duration::from_secs(1)).await;
        overlay.scan();
        assert_eq!(overlay.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_any_usable_button() {
        let page = Arc::new(MemoryPage::new(
            r#"<div class="player-overlay-background" id="ov"><button id="x">Dismiss</button></div>"#,
        ));
        let (mut overlay, _tx, _) = clicker(OverlayRule, &page, overlay_settings());
        overlay.scan();
        overlay.step().await;
        assert_eq!(page.click_count("#x"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_to_click_is_not_scheduled() {
        let page = Arc::new(MemoryPage::new(
            r#"<div class="player-overlay-background" id="ov"><button id="x" disabled>Wait</button></div>"#,
        ));
        let (mut overlay, _tx, _) = clicker(OverlayRule, &page, overlay_settings());
        overlay.scan();
        overlay.on_added(&[page.first("#ov").unwrap()]);
        assert_eq!(overlay.pending(), 0);
    }
}
