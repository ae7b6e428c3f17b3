//! Save collected songs as CSV and JSON.

use crate::types::{self, SongRecord};
use crate::util;
use log::info;
use regex::Regex;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const CSV_HEADER: [&str; 2] = ["title", "artist"];
const JSON_INDENT: &[u8] = b"    ";

/// Turn a playlist name into a file stem, e.g. "Chill Vibes #1" -> "chill_vibes_1".
pub fn slugify(name: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap());
    re.replace_all(&name.to_lowercase(), "_").into_owned()
}

#[derive(Debug, PartialEq)]
pub struct WrittenFiles {
    pub csv: PathBuf,
    pub json: PathBuf,
}

pub struct Writer {
    output_dir: PathBuf,
}

impl Writer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Writer {
            output_dir: output_dir.into(),
        }
    }

    /// Write `songs` to `<output_dir>/<slug>.csv` and `<output_dir>/<slug>.json`,
    /// creating the output directory if needed. Existing files are overwritten.
    pub fn write(&self, name: &str, songs: &[SongRecord]) -> types::WrittenFilesResult {
        let dir = util::guarantee_dir_path(self.output_dir.clone())?;
        let slug = slugify(name);

        let files = WrittenFiles {
            csv: dir.join(format!("{}.csv", slug)),
            json: dir.join(format!("{}.json", slug)),
        };

        info!("Writing data to {}...", files.csv.display());
        write_csv(&files.csv, songs)?;

        info!("Writing data to {}...", files.json.display());
        write_json(&files.json, songs)?;

        Ok(files)
    }
}

fn write_csv(path: &Path, songs: &[SongRecord]) -> types::UnitResult {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_path(path)?;

    // Written by hand so an empty playlist still gets a header
    writer.write_record(CSV_HEADER)?;
    for song in songs {
        writer.serialize(song)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json(path: &Path, songs: &[SongRecord]) -> types::UnitResult {
    let mut out = BufWriter::new(File::create(path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    songs.serialize(&mut serializer)?;
    out.flush()?;
    Ok(())
}
