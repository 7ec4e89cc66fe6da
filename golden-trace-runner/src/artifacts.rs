// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoped ownership of temporary files.
//!
//! An [`ArtifactStore`] is opened for each scenario. Every path it hands out is registered before
//! it is returned, and every registered path is removed when the store is closed or dropped.

use crate::errors::{
    ArtifactReleaseError, DisplayErrorChain, FixtureUnavailable, TempPathError,
};
use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::MultiGzDecoder;
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
};
use tracing::{debug, warn};

/// The prefix for every temporary file created by golden-trace.
pub const TEMP_PREFIX: &str = "golden-trace-";

/// The result of releasing a temporary path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReleaseOutcome {
    /// The file was removed.
    Removed,

    /// The file did not exist anymore.
    AlreadyGone,

    /// The file could not be removed because of a permissions issue, and was left in place.
    Retained,
}

/// Owns the temporary files used by one scenario.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    paths: Vec<Utf8PathBuf>,
}

impl ArtifactStore {
    /// Opens a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the paths currently owned by this store.
    pub fn paths(&self) -> &[Utf8PathBuf] {
        &self.paths
    }

    /// Creates a new unique, zero-length file in the system temporary directory and returns its
    /// path.
    pub fn acquire_temp_path(&mut self) -> Result<Utf8PathBuf, TempPathError> {
        let temp_file = camino_tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile()
            .map_err(TempPathError::new)?;
        let path = temp_file
            .into_temp_path()
            .keep()
            .map_err(|err| TempPathError::new(err.error))?;
        self.paths.push(path.clone());
        Ok(path)
    }

    /// Decompresses a gzip-compressed fixture into a fresh temporary file, returning its path.
    pub fn materialize_from_compressed(
        &mut self,
        compressed: &Utf8Path,
    ) -> Result<Utf8PathBuf, FixtureUnavailable> {
        let source = match File::open(compressed) {
            Ok(source) => source,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(FixtureUnavailable::Missing {
                    path: compressed.to_owned(),
                });
            }
            Err(error) => {
                return Err(FixtureUnavailable::Unreadable {
                    path: compressed.to_owned(),
                    error,
                });
            }
        };

        let dest = self
            .acquire_temp_path()
            .map_err(|error| FixtureUnavailable::TempPath {
                path: compressed.to_owned(),
                error,
            })?;

        // The destination is registered at this point, so a partial write is cleaned up along
        // with the rest of the store.
        decompress_into(source, &dest).map_err(|error| FixtureUnavailable::Corrupt {
            path: compressed.to_owned(),
            error,
        })?;

        debug!("decompressed {compressed} to {dest}");
        Ok(dest)
    }

    /// Removes a temporary path and stops tracking it.
    ///
    /// Missing files and permission errors are not treated as errors. Any other I/O error is
    /// returned.
    pub fn release(&mut self, path: &Utf8Path) -> Result<ReleaseOutcome, ArtifactReleaseError> {
        self.paths.retain(|p| p != path);
        release_path(path)
    }

    /// Releases every path owned by this store.
    ///
    /// All paths are attempted even if some fail; the first unexpected error is returned.
    pub fn close(mut self) -> Result<(), ArtifactReleaseError> {
        let mut first_error = None;
        for path in std::mem::take(&mut self.paths) {
            if let Err(error) = release_path(&path) {
                first_error.get_or_insert(error);
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Drop for ArtifactStore {
    fn drop(&mut self) {
        for path in std::mem::take(&mut self.paths) {
            if let Err(error) = release_path(&path) {
                warn!("{}", DisplayErrorChain::new(error));
            }
        }
    }
}

fn decompress_into(source: File, dest: &Utf8Path) -> io::Result<()> {
    let mut decoder = MultiGzDecoder::new(BufReader::new(source));
    let mut writer = BufWriter::new(File::create(dest)?);
    io::copy(&mut decoder, &mut writer)?;
    writer.flush()
}

fn release_path(path: &Utf8Path) -> Result<ReleaseOutcome, ArtifactReleaseError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(ReleaseOutcome::Removed),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(ReleaseOutcome::AlreadyGone),
        Err(error) if error.kind() == io::ErrorKind::PermissionDenied => {
            warn!("leaving temporary file {path} in place: {error}");
            Ok(ReleaseOutcome::Retained)
        }
        Err(error) => Err(ArtifactReleaseError::new(path, error)),
    }
}
