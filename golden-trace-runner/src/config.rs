// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for golden-trace.
//!
//! The configuration is layered: the embedded default config is overlaid by
//! `.config/golden-trace.toml` under the source root if it exists, or by an explicitly specified
//! file.

use crate::errors::ConfigParseError;
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Overall configuration for golden-trace.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    source_root: Utf8PathBuf,
    inner: HarnessConfigDeserialize,
}

impl HarnessConfig {
    /// The default location of the config within the source root.
    pub const CONFIG_PATH: &'static str = ".config/golden-trace.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the configuration for the given source root.
    ///
    /// If `config_file` is specified, it must exist and replaces the default location. Unknown
    /// keys produce warnings rather than errors.
    pub fn from_sources(
        source_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let source_root = source_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (
                file.to_owned(),
                File::new(file.as_str(), FileFormat::Toml),
            ),
            None => {
                let config_file = source_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (inner, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|err| ConfigParseError::new(&config_file, err))?;

        if !unknown.is_empty() {
            warn!(
                "ignoring unknown configuration keys in config file {config_file}: {}",
                unknown.iter().join(", ")
            );
        }

        Ok(Self {
            source_root,
            inner,
        })
    }

    /// Returns the default config for the given source root.
    #[cfg(test)]
    pub(crate) fn default_config(source_root: impl Into<Utf8PathBuf>) -> Self {
        let (inner, unknown) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");

        // The default config is embedded in the binary, so any unknown key there is a bug.
        if !unknown.is_empty() {
            panic!(
                "found unknown keys in default config: {}",
                unknown.iter().join(", ")
            );
        }

        Self {
            source_root: source_root.into(),
            inner,
        }
    }

    /// Returns the source root this config applies to.
    pub fn source_root(&self) -> &Utf8Path {
        &self.source_root
    }

    /// Returns the settings for the standalone tool.
    pub fn tool(&self) -> &ToolConfig {
        &self.inner.tool
    }

    /// Returns the settings for the library-embedding test executables.
    pub fn library(&self) -> &LibraryConfig {
        &self.inner.library
    }

    /// Returns the settings for the build system.
    pub fn build(&self) -> &BuildSystemConfig {
        &self.inner.build
    }

    /// Returns the coverage settings.
    pub fn coverage(&self) -> &CoverageConfig {
        &self.inner.coverage
    }

    /// Returns the build-hygiene settings.
    pub fn hygiene(&self) -> &HygieneConfig {
        &self.inner.hygiene
    }

    /// Returns the output-normalization settings.
    pub fn output(&self) -> &OutputConfig {
        &self.inner.output
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(HarnessConfigDeserialize, BTreeSet<String>), config::ConfigError> {
        let config = builder.build_cloned()?;

        let mut ignored = BTreeSet::new();
        let config: HarnessConfigDeserialize =
            serde_ignored::deserialize(config, |path: serde_ignored::Path| {
                ignored.insert(path.to_string());
            })?;

        Ok((config, ignored))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HarnessConfigDeserialize {
    tool: ToolConfig,
    library: LibraryConfig,
    build: BuildSystemConfig,
    coverage: CoverageConfig,
    hygiene: HygieneConfig,
    output: OutputConfig,
}

/// Settings for the standalone tool under test.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolConfig {
    /// The executable produced by the build, relative to the source root.
    pub binary: Utf8PathBuf,

    /// The makefile that builds and cleans the tool.
    pub makefile: Utf8PathBuf,
}

/// Settings for the library-embedding test executables.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LibraryConfig {
    /// The directory holding the library executables, relative to the source root.
    pub test_dir: Utf8PathBuf,

    /// The makefile that builds the library executables.
    pub makefile: Utf8PathBuf,

    /// The build variable pointing the library makefile at the tool sources.
    pub tool_root_var: String,
}

/// Settings for the build system.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildSystemConfig {
    /// The build program, looked up on `PATH` if not a path.
    pub program: String,
}

/// Coverage settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoverageConfig {
    /// Coverage data file names produced in the source root by a library build.
    pub artifacts: Vec<String>,
}

/// Build-hygiene settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HygieneConfig {
    /// Glob patterns matching build artifacts, applied to file names.
    pub patterns: Vec<String>,

    /// File names starting with this prefix are ignored.
    pub ignore_prefix: String,
}

/// Output-normalization settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Lines starting with this marker are excluded from comparison.
    pub comment_marker: String,

    /// Prefixes identifying summary lines.
    pub summary_prefixes: Vec<String>,
}
