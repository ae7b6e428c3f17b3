use crate::browser::ChromeSession;
use crate::error::Error;
use crate::scrape::Progress;
use crate::write::WrittenFiles;
use crate::Config;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One track as listed on the playlist page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongRecord {
    pub title: String,
    pub artist: String,
}

/// What a completed collection run yields.
#[derive(Clone, Debug, PartialEq)]
pub struct Playlist {
    pub name: String,
    pub songs: Vec<SongRecord>,
}

pub type BoolResult = Result<bool, Error>;
pub type ConfigResult = Result<Config, Error>;
pub type OptionStringResult = Result<Option<String>, Error>;
pub type PathResult = Result<PathBuf, Error>;
pub type PlaylistResult = Result<Playlist, Error>;
pub type ProgressResult = Result<Progress, Error>;
pub(crate) type SessionResult = Result<ChromeSession, Error>;
pub type StringResult = Result<String, Error>;
pub type UnitResult = Result<(), Error>;
pub type WrittenFilesResult = Result<WrittenFiles, Error>;
