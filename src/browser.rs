//! Drive a Chrome tab through `headless_chrome`.

use crate::error::Error;
use crate::scrape::{
    PlaylistPage, PlaylistRow, FIRST_ROW_SELECTOR, PLAYLIST_SELECTOR, PLAY_BUTTON_SELECTOR,
    ROW_SELECTOR,
};
use crate::types;
use crate::util;
use crate::Config;
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

/// Chrome keeps its connection open this long without events, at the least.
const MIN_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// A browser with a single tab. Chrome is shut down when this is dropped.
pub struct ChromeSession {
    tab: Arc<Tab>,
    _browser: Browser,
}

impl ChromeSession {
    pub fn launch(config: &Config) -> types::SessionResult {
        info!("Launching browser...");
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .idle_browser_timeout(config.load_timeout.max(MIN_IDLE_TIMEOUT))
            .build()
            .map_err(|e| Error::Browser(anyhow::anyhow!(e.to_string())))?;

        let browser = Browser::new(options)?;
        let tab = browser.new_tab()?;

        Ok(ChromeSession {
            tab,
            _browser: browser,
        })
    }
}

/// The selector matched nothing, as opposed to the browser failing.
fn is_missing(e: &anyhow::Error) -> bool {
    e.is::<NoElementFound>()
}

/// Only running out of time counts as a load timeout.
fn wait_error(url: &str, timeout: Duration, e: anyhow::Error) -> Error {
    if e.is::<Timeout>() {
        Error::LoadTimeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        Error::Browser(e)
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        info!("Closing browser...");
    }
}

impl PlaylistPage for ChromeSession {
    type Row<'a> = ChromeRow<'a>;

    fn navigate(&self, url: &str) -> types::UnitResult {
        self.tab.navigate_to(url)?;
        Ok(())
    }

    fn wait_for_playlist(&self, url: &str, timeout: Duration) -> types::UnitResult {
        match self
            .tab
            .wait_for_element_with_custom_timeout(PLAYLIST_SELECTOR, timeout)
        {
            Ok(_) => Ok(()),
            Err(e) => {
                debug!("Waiting for {} failed: {}", PLAYLIST_SELECTOR, e);
                Err(wait_error(url, timeout, e))
            }
        }
    }

    fn playlist_label(&self) -> types::OptionStringResult {
        match self.tab.find_element(PLAYLIST_SELECTOR) {
            Ok(grid) => util::attribute(&grid, "aria-label"),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn focus_first_row(&self) -> types::BoolResult {
        match self.tab.find_element(FIRST_ROW_SELECTOR) {
            Ok(row) => {
                row.focus()?;
                Ok(true)
            }
            Err(e) if is_missing(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn rows(&self) -> Result<Vec<Self::Row<'_>>, Error> {
        // No match at all is reported as an error
        match self.tab.find_elements(ROW_SELECTOR) {
            Ok(rows) => Ok(rows.into_iter().map(ChromeRow).collect()),
            Err(e) if is_missing(&e) => {
                debug!("No rows rendered");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn select_next(&self) -> types::UnitResult {
        self.tab.press_key("ArrowDown")?;
        Ok(())
    }
}

/// A row element. Reads fail with a browser error once the grid has
/// recycled the row's node.
pub struct ChromeRow<'a>(Element<'a>);

impl PlaylistRow for ChromeRow<'_> {
    fn index(&self) -> types::OptionStringResult {
        util::attribute(&self.0, "aria-rowindex")
    }

    fn play_label(&self) -> types::OptionStringResult {
        match self.0.find_element(PLAY_BUTTON_SELECTOR) {
            Ok(button) => util::attribute(&button, "aria-label"),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::Collector;

    #[test]
    fn only_timeouts_are_load_timeouts() {
        let timeout = Duration::from_secs(60);

        let e = wait_error("url", timeout, anyhow::Error::new(Timeout));
        assert!(matches!(e, Error::LoadTimeout { .. }));

        let closed = anyhow::anyhow!("Unable to make method calls because underlying connection is closed");
        let e = wait_error("url", timeout, closed);
        match e {
            Error::Browser(e) => assert!(e.to_string().contains("connection is closed")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn tells_missing_elements_from_failures() {
        assert!(is_missing(&anyhow::Error::new(NoElementFound {})));
        assert!(!is_missing(&anyhow::anyhow!("Could not find node with given id")));
    }

    #[test]
    #[ignore]
    fn scrapes_public_playlist() {
        let config = Config {
            url: String::from("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M"),
            ..Default::default()
        };
        let session = ChromeSession::launch(&config).unwrap();
        let mut collector = Collector::new(session, &config);

        let playlist = collector.collect(&config.url).unwrap();

        assert!(!playlist.name.is_empty());
        assert!(!playlist.songs.is_empty());
    }
}
