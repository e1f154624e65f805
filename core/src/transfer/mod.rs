//! File-transfer side channel.
//!
//! File bytes never travel over the CLI. They move through a [`Station`],
//! a directory-backed exchange point the device pulls staged files from and
//! pushes fetched files into, served over the wire by the
//! [`TftpListener`].

pub mod tftp;

pub use tftp::TftpListener;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::StageSource;

/// Directory-backed exchange point for the transfer side channel.
///
/// `address` is the host the device dials to reach the listener serving
/// this directory; synthesized copy commands embed it.
#[derive(Debug, Clone)]
pub struct Station {
    root: PathBuf,
    address: String,
}

impl Station {
    /// Create a station rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>, address: impl Into<String>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            address: address.into(),
        })
    }

    /// Host address the device uses to reach this station.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Exchange directory served by the listener.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk path of an object name.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether an object is currently present in the exchange directory.
    pub fn has(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    /// Stage inline text under `name`.
    pub fn stage_text(&self, name: &str, text: &str) -> io::Result<()> {
        fs::write(self.path_of(name), text)
    }

    /// Stage a zero-byte placeholder under `name`.
    pub fn stage_empty(&self, name: &str) -> io::Result<()> {
        fs::write(self.path_of(name), b"")
    }

    /// Stage a client-side file under `name`.
    ///
    /// Returns `Ok(None)` when the source path does not exist on the
    /// client host; the object is then assumed to already live on the
    /// transfer server the copy command names.
    pub fn stage_file(&self, name: &str, source: &Path) -> io::Result<Option<String>> {
        if !source.is_file() {
            debug!(source = %source.display(), "local source absent, assuming object is already remote");
            return Ok(None);
        }
        let content = fs::read_to_string(source)?;
        self.stage_text(name, &content)?;
        Ok(Some(content))
    }

    /// Apply a staging directive from a validated copy plan.
    ///
    /// Returns the staged content, or `None` when nothing was staged
    /// locally (remote source).
    pub fn stage(&self, remote_name: &str, source: &StageSource) -> io::Result<Option<String>> {
        match source {
            StageSource::Text(text) => {
                self.stage_text(remote_name, text)?;
                Ok(Some(text.clone()))
            }
            StageSource::Empty => {
                self.stage_empty(remote_name)?;
                Ok(Some(String::new()))
            }
            StageSource::LocalFile(path) => self.stage_file(remote_name, path),
        }
    }

    /// Read an object the device pushed into the exchange directory.
    pub fn retrieve(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.path_of(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> (tempfile::TempDir, Station) {
        let dir = tempfile::tempdir().unwrap();
        let station = Station::new(dir.path().join("exchange"), "127.0.0.1").unwrap();
        (dir, station)
    }

    #[test]
    fn new_creates_the_exchange_directory() {
        let (_guard, station) = station();
        assert!(station.root().is_dir());
        assert_eq!(station.address(), "127.0.0.1");
    }

    #[test]
    fn stage_text_and_retrieve() {
        let (_guard, station) = station();
        station.stage_text("test_file_1.cfg", "hostname nac_dev\n").unwrap();
        assert!(station.has("test_file_1.cfg"));
        assert_eq!(
            station.retrieve("test_file_1.cfg").unwrap(),
            "hostname nac_dev\n"
        );
    }

    #[test]
    fn stage_empty_creates_zero_byte_object() {
        let (_guard, station) = station();
        station.stage_empty("test_file_3.cfg").unwrap();
        assert_eq!(station.retrieve("test_file_3.cfg").unwrap(), "");
    }

    #[test]
    fn stage_file_copies_under_the_remote_name() {
        let (guard, station) = station();
        let source = guard.path().join("temp_1.cfg");
        std::fs::write(&source, "vlan database\n").unwrap();

        let staged = station.stage_file("temp_1.cfg", &source).unwrap();
        assert_eq!(staged.as_deref(), Some("vlan database\n"));
        assert_eq!(station.retrieve("temp_1.cfg").unwrap(), "vlan database\n");
    }

    #[test]
    fn stage_file_with_missing_source_stages_nothing() {
        let (guard, station) = station();
        let missing = guard.path().join("nope.cfg");
        let staged = station.stage_file("nope.cfg", &missing).unwrap();
        assert!(staged.is_none());
        assert!(!station.has("nope.cfg"));
    }

    #[test]
    fn stage_applies_plan_directives() {
        let (_guard, station) = station();
        let staged = station
            .stage("a.cfg", &StageSource::Text("abc".into()))
            .unwrap();
        assert_eq!(staged.as_deref(), Some("abc"));

        let staged = station.stage("b.cfg", &StageSource::Empty).unwrap();
        assert_eq!(staged.as_deref(), Some(""));
    }

    #[test]
    fn retrieve_missing_object_is_an_io_error() {
        let (_guard, station) = station();
        assert!(station.retrieve("ghost.cfg").is_err());
    }
}
