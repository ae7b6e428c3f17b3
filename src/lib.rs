mod browser;
mod error;
pub mod scrape;
pub mod types;
mod util;
pub mod write;

pub use error::Error;

use browser::ChromeSession;
use clap::Parser;
use log::{info, warn};
use scrape::{Collector, PlaylistPage};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use write::Writer;

#[derive(Parser, Debug)]
#[command(
    name = "playlist-scrape",
    version,
    about = "Scrape the songs of a Spotify playlist and save them as CSV and JSON"
)]
struct Cli {
    /// URL of the Spotify playlist
    url: String,

    /// Directory to write the CSV and JSON files to [default: output]
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Stop after this many polls in a row without new rows [default: 25]
    #[arg(short, long, value_name = "N")]
    stall_threshold: Option<u32>,

    /// Pause after each key press, in milliseconds [default: 10]
    #[arg(short, long = "delay-ms", value_name = "MS")]
    delay_ms: Option<u64>,

    /// How long to wait for the playlist to load, in seconds [default: 60]
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    show_browser: bool,

    /// Read options from this file instead of the default location
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbosely show what is being processed
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub url: String,
    pub output_dir: PathBuf,
    pub stall_threshold: u32,
    pub advance_delay: Duration,
    pub load_timeout: Duration,
    pub headless: bool,
    pub verbose: bool,

    /// The config file that was read, if any
    pub conf_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            url: String::new(),
            output_dir: PathBuf::from("output"),
            stall_threshold: 25,
            advance_delay: Duration::from_millis(10),
            load_timeout: Duration::from_secs(60),
            headless: true,
            verbose: false,
            conf_path: None,
        }
    }
}

impl Config {
    /// `<config dir>/playlist-scrape/scrape.conf`
    pub fn default_conf_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("playlist-scrape").join("scrape.conf"))
    }

    /// Read options from a file of `option=value` lines.
    /// For any option that is not present in the file, the current value is kept.
    ///
    /// # Errors
    /// - If a line does not follow the `option=value` format
    /// - If an option is not recognized, or its value cannot be parsed
    fn apply_conf(&mut self, contents: &str) -> types::UnitResult {
        for line in contents.lines().map(|l| l.trim()) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("Invalid config line: {}", line)))?;
            let (key, value) = (key.trim().to_lowercase(), value.trim());

            match key.as_str() {
                "output_dir" => self.output_dir = PathBuf::from(value),
                "stall_threshold" => self.stall_threshold = parse_value(&key, value)?,
                "advance_delay_ms" => {
                    self.advance_delay = Duration::from_millis(parse_value(&key, value)?)
                }
                "load_timeout_secs" => {
                    self.load_timeout = Duration::from_secs(parse_value(&key, value)?)
                }
                "headless" => self.headless = parse_value(&key, value)?,
                "verbose" => self.verbose = parse_value(&key, value)?,
                _ => return Err(Error::Config(format!("Invalid config option: {}", key))),
            }
        }

        Ok(())
    }

    /// An explicitly given config file must exist; the default one may be absent.
    fn load_conf(&mut self, path: Option<PathBuf>) -> types::UnitResult {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => match Config::default_conf_path() {
                Some(path) => (path, false),
                None => return Ok(()),
            },
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) if !required => return Ok(()),
            Err(e) => {
                return Err(Error::Config(format!(
                    "Could not read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        self.apply_conf(&contents)?;
        self.conf_path = Some(path);
        Ok(())
    }

    /// Command-line options override the config file.
    fn apply_cli(&mut self, cli: Cli) {
        self.url = cli.url;
        if let Some(dir) = cli.output_dir {
            self.output_dir = dir;
        }
        if let Some(threshold) = cli.stall_threshold {
            self.stall_threshold = threshold;
        }
        if let Some(ms) = cli.delay_ms {
            self.advance_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = cli.timeout {
            self.load_timeout = Duration::from_secs(secs);
        }
        if cli.show_browser {
            self.headless = false;
        }
        if cli.verbose {
            self.verbose = true;
        }
    }

    pub fn build(args: impl Iterator<Item = String>) -> types::ConfigResult {
        let cli = Cli::try_parse_from(args)?;

        let mut config = Config::default();
        config.load_conf(cli.config.clone())?;
        config.apply_cli(cli);

        if config.stall_threshold == 0 {
            return Err(Error::Config(String::from(
                "stall_threshold must be at least 1",
            )));
        }

        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .parse::<T>()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}

/// Only Spotify playlist pages have the grid the collector looks for.
fn is_spotify_playlist(url: &str) -> bool {
    match Url::parse(url) {
        Ok(url) => {
            url.host_str() == Some("open.spotify.com") && url.path().starts_with("/playlist")
        }
        Err(_) => false,
    }
}

/// Collect the playlist at `config.url` from `page` and write its songs to
/// `config.output_dir`. The page is dropped before anything is written, and
/// nothing is written if collecting fails.
pub fn scrape_to<P: PlaylistPage>(page: P, config: &Config) -> types::UnitResult {
    let playlist = {
        let mut collector = Collector::new(page, config);
        collector.collect(&config.url)?
    };

    let files = Writer::new(&config.output_dir).write(&playlist.name, &playlist.songs)?;
    info!(
        "Saved {} songs to {} and {}",
        playlist.songs.len(),
        files.csv.display(),
        files.json.display()
    );

    Ok(())
}

/// Scrape the playlist at `config.url` with a fresh Chrome.
pub fn run(config: Config) -> types::UnitResult {
    if !is_spotify_playlist(&config.url) {
        warn!("{} does not look like a Spotify playlist URL", config.url);
    }

    scrape_to(ChromeSession::launch(&config)?, &config)
}
