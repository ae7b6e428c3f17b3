//! Collect the songs of a playlist page.
//!
//! Spotify only keeps a window of rows in the DOM. The collector moves the
//! selection down one row at a time, reading every row it has not seen yet,
//! and gives up once the number of rendered rows has not changed for
//! `stall_threshold` polls in a row.

use crate::error::Error;
use crate::types::{self, Playlist, SongRecord};
use crate::Config;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

pub const PLAYLIST_SELECTOR: &str = r#"div[role="grid"][aria-label]"#;
pub const ROW_SELECTOR: &str = r#"div[role="row"]"#;
/// Row 1 is the column header.
pub const FIRST_ROW_SELECTOR: &str = r#"div[role="row"][aria-rowindex="2"]"#;
pub const PLAY_BUTTON_SELECTOR: &str = r#"button[aria-label^="Play "]"#;

const LABEL_SEPARATOR: &str = " by ";
const LABEL_PREFIX: &str = "Play ";

/// A rendered row of the playlist grid.
pub trait PlaylistRow {
    /// The row's `aria-rowindex`, if it has one.
    fn index(&self) -> types::OptionStringResult;

    /// The `aria-label` of the row's play button, if it has one.
    fn play_label(&self) -> types::OptionStringResult;
}

/// The page operations the collector needs from a browser.
pub trait PlaylistPage {
    type Row<'a>: PlaylistRow
    where
        Self: 'a;

    fn navigate(&self, url: &str) -> types::UnitResult;

    /// Block until the playlist grid is rendered.
    ///
    /// # Errors
    /// - `Error::LoadTimeout` if it does not show up within `timeout`
    fn wait_for_playlist(&self, url: &str, timeout: Duration) -> types::UnitResult;

    /// The grid's `aria-label`, or `None` when the grid (or its label) is gone.
    fn playlist_label(&self) -> types::OptionStringResult;

    /// Returns false when there is no first row to focus.
    fn focus_first_row(&self) -> types::BoolResult;

    fn rows(&self) -> Result<Vec<Self::Row<'_>>, Error>;

    /// Move the selection one row down.
    fn select_next(&self) -> types::UnitResult;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    Running,
    Done,
}

#[derive(Debug, Default)]
pub struct ScrapeState {
    seen: HashSet<String>,
    songs: Vec<SongRecord>,
    last_row_count: usize,
    stalled: u32,
}

impl ScrapeState {
    fn is_seen(&self, index: &str) -> bool {
        self.seen.contains(index)
    }

    fn mark_seen(&mut self, index: String) {
        self.seen.insert(index);
    }

    /// Feed the number of rows rendered by the latest poll into the stall counter.
    fn observe_row_count(&mut self, count: usize, threshold: u32) -> Progress {
        if count == self.last_row_count {
            self.stalled += 1;
            debug!("Row count unchanged at {} ({}/{})", count, self.stalled, threshold);
        } else {
            if self.stalled > 0 {
                debug!("Row count changed to {}, resetting stall counter", count);
            }
            self.stalled = 0;
        }
        self.last_row_count = count;

        if self.stalled >= threshold {
            Progress::Done
        } else {
            Progress::Running
        }
    }

    #[cfg(test)]
    fn stalled(&self) -> u32 {
        self.stalled
    }
}

/// Parse a play button label of the form `Play {title} by {artist}`.
///
/// Labels that do not split into exactly two parts around `" by "` are
/// rejected, including titles or artists that themselves contain `" by "`.
pub fn parse_label(label: &str) -> Option<SongRecord> {
    let parts: Vec<&str> = label.split(LABEL_SEPARATOR).collect();
    if parts.len() != 2 {
        return None;
    }

    let title = parts[0].strip_prefix(LABEL_PREFIX).unwrap_or(parts[0]);
    Some(SongRecord {
        title: title.trim().to_string(),
        artist: parts[1].trim().to_string(),
    })
}

pub struct Collector<P: PlaylistPage> {
    page: P,
    state: ScrapeState,
    stall_threshold: u32,
    advance_delay: Duration,
    load_timeout: Duration,
}

impl<P: PlaylistPage> Collector<P> {
    pub fn new(page: P, config: &Config) -> Self {
        Collector {
            page,
            state: ScrapeState::default(),
            stall_threshold: config.stall_threshold,
            advance_delay: config.advance_delay,
            load_timeout: config.load_timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn page(&self) -> &P {
        &self.page
    }

    #[cfg(test)]
    fn state(&self) -> &ScrapeState {
        &self.state
    }

    /// Load `url` and wait for the playlist grid to appear.
    pub fn open(&self, url: &str) -> types::UnitResult {
        info!("Navigating to {}...", url);
        self.page.navigate(url)?;

        info!("Waiting for playlist element to load...");
        self.page.wait_for_playlist(url, self.load_timeout)
    }

    /// The playlist's display name, taken from the grid's accessible label.
    pub fn resolve_name(&self) -> types::StringResult {
        match self.page.playlist_label()? {
            Some(name) => {
                info!("Playlist Name: {}", name);
                Ok(name)
            }
            None => Err(Error::ElementNotFound(PLAYLIST_SELECTOR.into())),
        }
    }

    /// Read every rendered row that has not been seen before, then update the
    /// stall counter with the number of rendered rows.
    ///
    /// A row whose node was recycled while it was being read is left unseen,
    /// so it is read again if it shows up in a later poll.
    pub fn poll(&mut self) -> types::ProgressResult {
        let rows = self.page.rows()?;

        for row in &rows {
            let index = match row.index() {
                Ok(Some(index)) => index,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Skipping unreadable row: {}", e);
                    continue;
                }
            };
            if self.state.is_seen(&index) {
                continue;
            }

            let label = match row.play_label() {
                Ok(label) => label,
                Err(e) => {
                    debug!("Skipping row {} for now: {}", index, e);
                    continue;
                }
            };
            self.state.mark_seen(index);

            let label = if let Some(label) = label {
                label
            } else {
                continue;
            };

            if let Some(song) = parse_label(&label) {
                info!("Fetched song - Title: {}, Artist: {}", song.title, song.artist);
                self.state.songs.push(song);
            } else {
                debug!("Skipping unparsable label: {}", label);
            }
        }

        Ok(self
            .state
            .observe_row_count(rows.len(), self.stall_threshold))
    }

    /// Press the down arrow once and give the page a moment to render the next rows.
    pub fn advance(&self) -> types::UnitResult {
        debug!("Pressing down to load more songs...");
        self.page.select_next()?;
        thread::sleep(self.advance_delay);
        Ok(())
    }

    /// Run a full collection of the playlist at `url`.
    pub fn collect(&mut self, url: &str) -> types::PlaylistResult {
        self.open(url)?;

        info!("Finding playlist element...");
        let name = self.resolve_name()?;

        info!("Fetching song data...");
        if self.page.focus_first_row()? {
            info!("Focusing on the first song...");
        } else {
            warn!("First song not found, key presses may not scroll the playlist");
        }

        while self.poll()? == Progress::Running {
            self.advance()?;
        }

        info!(
            "Found {} songs in {} rows",
            self.state.songs.len(),
            self.state.seen.len()
        );

        Ok(Playlist {
            name,
            songs: std::mem::take(&mut self.state.songs),
        })
    }
}

/// An in-memory playlist grid for driving the collector without a browser.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::Cell;
    use std::ops::Range;
    use std::rc::Rc;

    #[derive(Clone)]
    pub(crate) struct FakeRow {
        pub(crate) index: Option<String>,
        pub(crate) label: Option<String>,
        /// Reads left that fail as if the node had been recycled
        pub(crate) index_failures: Rc<Cell<u32>>,
        pub(crate) label_failures: Rc<Cell<u32>>,
    }

    impl FakeRow {
        pub(crate) fn new(index: Option<&str>, label: Option<&str>) -> Self {
            FakeRow {
                index: index.map(String::from),
                label: label.map(String::from),
                index_failures: Rc::new(Cell::new(0)),
                label_failures: Rc::new(Cell::new(0)),
            }
        }
    }

    fn recycled(failures: &Cell<u32>) -> bool {
        if failures.get() == 0 {
            return false;
        }
        failures.set(failures.get() - 1);
        true
    }

    fn node_gone() -> Error {
        Error::Browser(anyhow::anyhow!("Could not find node with given id"))
    }

    impl PlaylistRow for FakeRow {
        fn index(&self) -> types::OptionStringResult {
            if recycled(&self.index_failures) {
                return Err(node_gone());
            }
            Ok(self.index.clone())
        }

        fn play_label(&self) -> types::OptionStringResult {
            if recycled(&self.label_failures) {
                return Err(node_gone());
            }
            Ok(self.label.clone())
        }
    }

    /// A virtualized grid: `view` maps the number of key presses so far to
    /// the slice of `rows` that is currently rendered.
    pub(crate) struct FakePage {
        pub(crate) name: Option<String>,
        pub(crate) loads: bool,
        pub(crate) rows: Vec<FakeRow>,
        pub(crate) view: fn(usize) -> Range<usize>,
        pub(crate) presses: Cell<usize>,
        pub(crate) polls: Cell<usize>,
        /// Key press number (1-based) that fails
        pub(crate) fail_on_press: Option<usize>,
        pub(crate) dropped: Rc<Cell<bool>>,
    }

    impl FakePage {
        pub(crate) fn new(labels: &[&str], view: fn(usize) -> Range<usize>) -> Self {
            let rows = labels
                .iter()
                .enumerate()
                .map(|(i, label)| FakeRow::new(Some(&(i + 2).to_string()), Some(*label)))
                .collect();
            FakePage {
                name: Some(String::from("My 90s Mix!")),
                loads: true,
                rows,
                view,
                presses: Cell::new(0),
                polls: Cell::new(0),
                fail_on_press: None,
                dropped: Rc::new(Cell::new(false)),
            }
        }
    }

    impl Drop for FakePage {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    impl PlaylistPage for FakePage {
        type Row<'a> = FakeRow;

        fn navigate(&self, _url: &str) -> types::UnitResult {
            Ok(())
        }

        fn wait_for_playlist(&self, url: &str, timeout: Duration) -> types::UnitResult {
            if self.loads {
                Ok(())
            } else {
                Err(Error::LoadTimeout {
                    url: url.to_string(),
                    timeout,
                })
            }
        }

        fn playlist_label(&self) -> types::OptionStringResult {
            Ok(self.name.clone())
        }

        fn focus_first_row(&self) -> types::BoolResult {
            Ok(!self.rows.is_empty())
        }

        fn rows(&self) -> Result<Vec<Self::Row<'_>>, Error> {
            self.polls.set(self.polls.get() + 1);
            let range = (self.view)(self.presses.get());
            let end = range.end.min(self.rows.len());
            let start = range.start.min(end);
            Ok(self.rows[start..end].to_vec())
        }

        fn select_next(&self) -> types::UnitResult {
            self.presses.set(self.presses.get() + 1);
            if self.fail_on_press == Some(self.presses.get()) {
                return Err(Error::Browser(anyhow::anyhow!(
                    "Unable to make method calls because underlying connection is closed"
                )));
            }
            Ok(())
        }
    }
}
