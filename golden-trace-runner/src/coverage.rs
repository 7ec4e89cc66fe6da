// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moving coverage data produced by library builds out of the way.
//!
//! Instrumented library builds write their coverage data into the source root under fixed names.
//! The next instrumented build would reuse those names, so after the library scenarios run, the
//! data is moved into the library test directory.

use crate::{config::HarnessConfig, errors::CoverageRelocateError};
use camino::Utf8PathBuf;
use std::io;
use tracing::{debug, warn};

const NOTES_EXTENSION: &str = "gcno";

/// Relocates coverage data when coverage instrumentation is enabled, and does nothing otherwise.
#[derive(Clone, Debug)]
pub struct CoverageRelocator<'cfg> {
    config: &'cfg HarnessConfig,
    enabled: bool,
}

impl<'cfg> CoverageRelocator<'cfg> {
    /// Creates a new relocator.
    pub fn new(config: &'cfg HarnessConfig, enabled: bool) -> Self {
        Self { config, enabled }
    }

    /// Moves each configured coverage artifact from the source root into the library test
    /// directory, returning the destinations of the files that were moved.
    pub fn relocate(&self) -> Result<Vec<Utf8PathBuf>, CoverageRelocateError> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let source_root = self.config.source_root();
        let dest_dir = source_root.join(&self.config.library().test_dir);
        let mut moved = Vec::new();

        for artifact in &self.config.coverage().artifacts {
            let from = source_root.join(artifact);
            let to = dest_dir.join(artifact);
            match std::fs::rename(&from, &to) {
                Ok(()) => {
                    debug!("moved coverage data {from} to {to}");
                    moved.push(to);
                }
                Err(error) if error.kind() == io::ErrorKind::NotFound => {
                    debug!("coverage data {from} not found, skipping");
                }
                Err(error) if error.kind() == io::ErrorKind::PermissionDenied => {
                    warn!("could not move coverage data {from} to {to}: {error}");
                }
                Err(error) => return Err(CoverageRelocateError::Move { from, to, error }),
            }
        }

        Ok(moved)
    }

    /// Removes coverage notes files from the source root, returning the paths that were removed.
    ///
    /// Used after the library build without the XML backend, whose notes would otherwise be
    /// confused with those of the XML-enabled build.
    pub fn discard_notes(&self) -> Result<Vec<Utf8PathBuf>, CoverageRelocateError> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let source_root = self.config.source_root();
        let mut removed = Vec::new();

        for artifact in &self.config.coverage().artifacts {
            let path = source_root.join(artifact);
            if path.extension() != Some(NOTES_EXTENSION) {
                continue;
            }

            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("removed coverage notes {path}");
                    removed.push(path);
                }
                Err(error) if error.kind() == io::ErrorKind::NotFound => {
                    debug!("coverage notes {path} not found, skipping");
                }
                Err(error) if error.kind() == io::ErrorKind::PermissionDenied => {
                    warn!("could not remove coverage notes {path}: {error}");
                }
                Err(error) => return Err(CoverageRelocateError::Remove { path, error }),
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::tempdir;
    use camino_tempfile_ext::prelude::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn disabled_does_nothing() {
        let temp_dir = tempdir().unwrap();
        temp_dir.child("lib_test.gcno").write_str("notes").unwrap();

        let config = HarnessConfig::default_config(temp_dir.path());
        let relocator = CoverageRelocator::new(&config, false);
        assert_eq!(relocator.relocate().unwrap(), Vec::<Utf8PathBuf>::new());
        assert_eq!(relocator.discard_notes().unwrap(), Vec::<Utf8PathBuf>::new());
        assert!(temp_dir.path().join("lib_test.gcno").exists());
    }

    #[test]
    fn relocate_moves_artifacts() {
        let temp_dir = tempdir().unwrap();
        temp_dir.child("lib_test.gcno").write_str("notes").unwrap();
        temp_dir.child("lib_test.gcda").write_str("data").unwrap();
        temp_dir
            .child("test/libdrampowertest/lib_test.gcda")
            .write_str("stale")
            .unwrap();

        let config = HarnessConfig::default_config(temp_dir.path());
        let moved = CoverageRelocator::new(&config, true).relocate().unwrap();

        let dest_dir = temp_dir.path().join("test/libdrampowertest");
        assert_eq!(
            moved,
            vec![dest_dir.join("lib_test.gcno"), dest_dir.join("lib_test.gcda")]
        );
        assert!(!temp_dir.path().join("lib_test.gcno").exists());
        assert!(!temp_dir.path().join("lib_test.gcda").exists());
        assert_eq!(
            std::fs::read_to_string(dest_dir.join("lib_test.gcda")).unwrap(),
            "data"
        );
    }

    #[test]
    fn relocate_skips_missing_artifacts() {
        let temp_dir = tempdir().unwrap();
        temp_dir.child("lib_test.gcda").write_str("data").unwrap();
        std::fs::create_dir_all(temp_dir.path().join("test/libdrampowertest")).unwrap();

        let config = HarnessConfig::default_config(temp_dir.path());
        let moved = CoverageRelocator::new(&config, true).relocate().unwrap();
        assert_eq!(
            moved,
            vec![temp_dir.path().join("test/libdrampowertest/lib_test.gcda")]
        );
    }

    #[test]
    fn relocate_onto_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        temp_dir.child("lib_test.gcno").write_str("notes").unwrap();
        // Make the destination directory a file, so the rename fails for a reason other than a
        // missing source.
        temp_dir.child("test/libdrampowertest").write_str("").unwrap();

        let config = HarnessConfig::default_config(temp_dir.path());
        let error = CoverageRelocator::new(&config, true)
            .relocate()
            .unwrap_err();
        assert!(
            matches!(error, CoverageRelocateError::Move { .. }),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn discard_notes_removes_only_notes() {
        let temp_dir = tempdir().unwrap();
        temp_dir.child("lib_test.gcno").write_str("notes").unwrap();
        temp_dir.child("lib_test.gcda").write_str("data").unwrap();

        let config = HarnessConfig::default_config(temp_dir.path());
        let relocator = CoverageRelocator::new(&config, true);
        assert_eq!(
            relocator.discard_notes().unwrap(),
            vec![temp_dir.path().join("lib_test.gcno")]
        );
        assert!(temp_dir.path().join("lib_test.gcda").exists());

        // A second call finds nothing to remove.
        assert_eq!(relocator.discard_notes().unwrap(), Vec::<Utf8PathBuf>::new());
    }
}
