// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use cp_r::CopyOptions;
use fs_err as fs;
use integration_tests::{fake_power::FAKE_TOOL_ENV, golden_trace_cli::GoldenTraceCli};

pub const GOLDEN_TRACE_BIN: &str = env!("CARGO_BIN_EXE_golden-trace-dup");
const FAKE_DRAMPOWER_BIN: &str = env!("CARGO_BIN_EXE_fake-drampower");
const FAKE_MAKE_BIN: &str = env!("CARGO_BIN_EXE_fake-make");

fn drampower_tree_dir() -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures/drampower-tree")
}

/// A temporary copy of the fixture source tree, configured to build with the fake build system.
#[derive(Debug)]
pub struct TempSourceTree {
    // Kept alive for the lifetime of the tree.
    _temp_dir: Utf8TempDir,
    source_root: Utf8PathBuf,
}

impl TempSourceTree {
    pub fn new() -> color_eyre::Result<Self> {
        Self::with_build_program(FAKE_MAKE_BIN)
    }

    pub fn with_build_program(program: &str) -> color_eyre::Result<Self> {
        let temp_dir = camino_tempfile::Builder::new()
            .prefix("golden-trace-fixture-")
            .tempdir()?;
        let source_root = temp_dir.path().join("src");

        fs::create_dir_all(&source_root)?;
        CopyOptions::new().copy_tree(drampower_tree_dir(), &source_root)?;

        let config_dir = source_root.join(".config");
        fs::create_dir_all(&config_dir)?;
        fs::write(
            config_dir.join("golden-trace.toml"),
            format!("[build]\nprogram = {program:?}\n"),
        )?;

        Ok(Self {
            _temp_dir: temp_dir,
            source_root,
        })
    }

    pub fn source_root(&self) -> &Utf8Path {
        &self.source_root
    }

    pub fn reference_dir(&self) -> Utf8PathBuf {
        self.source_root.join("test/reference")
    }

    /// Returns a golden-trace invocation pointed at this tree.
    pub fn cli(&self) -> GoldenTraceCli {
        let mut cli = GoldenTraceCli::new(GOLDEN_TRACE_BIN);
        cli.args(["--source-root", self.source_root.as_str()])
            .env(FAKE_TOOL_ENV, FAKE_DRAMPOWER_BIN);
        cli
    }

    /// Runs `golden-trace regenerate` with the given filters, which must succeed.
    pub fn regenerate(&self, filters: &[&str]) {
        self.cli()
            .arg("regenerate")
            .args(filters.iter().copied())
            .output();
    }
}
