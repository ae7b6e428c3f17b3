//! Integration testing helper functions.

use playlist_scrape::{Config, Error};
use std::env;
use std::fs;
use std::path::PathBuf;

pub fn setup(mut args: Vec<&str>) -> Result<Config, Error> {
    args.insert(0, "playlist-scrape");
    let args = args.into_iter().map(|s| String::from(s));
    Config::build(args)
}

/// A fresh, empty directory under the system temp dir.
pub fn create_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("playlist-scrape-test-{}", name));
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Remove the directory and all its contents.
pub fn destroy(dir: PathBuf) {
    fs::remove_dir_all(dir).unwrap();
}

pub fn read(path: PathBuf) -> String {
    fs::read_to_string(path).unwrap()
}

/// Write the `contents` to the file at `path`, replacing whatever was there.
pub fn write(path: &PathBuf, contents: &str) {
    fs::write(path, contents).unwrap();
}
