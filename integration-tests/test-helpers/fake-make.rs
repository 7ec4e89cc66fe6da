// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A fake build system.
//!
//! Understands the two makefiles golden-trace drives. Building copies the fake tool into place
//! and drops object files; `clean` removes them again.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::{
    Result,
    eyre::{Context, bail},
};
use fs_err as fs;
use integration_tests::fake_power::{FAKE_TOOL_ENV, MAKE_FAIL_ENV, MAKE_KEEP_OBJECTS_ENV};
use std::process::ExitCode;

const TOOL_MAKEFILE: &str = "Makefile";
const LIBRARY_MAKEFILE: &str = "test/libdrampowertest/Makefile";
const LIBRARY_DIR: &str = "test/libdrampowertest";

const TOOL_OBJECTS: &[&str] = &[
    "src/cli/drampower.o",
    "src/cli/drampower.d",
    "src/libdrampower.a",
];
const LIBRARY_OBJECTS: &[&str] = &["test/libdrampowertest/lib_test.o"];
const COVERAGE_FILES: &[&str] = &["lib_test.gcno", "lib_test.gcda"];

#[derive(Debug, Default)]
struct Invocation {
    makefile: Option<String>,
    clean: bool,
    variables: Vec<(String, String)>,
}

impl Invocation {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut invocation = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "-f" {
                invocation.makefile = args.next();
            } else if arg == "clean" {
                invocation.clean = true;
            } else if let Some((name, value)) = arg.split_once('=') {
                invocation.variables.push((name.to_owned(), value.to_owned()));
            } else if !arg.starts_with("-j") {
                bail!("unexpected argument {arg}");
            }
        }
        Ok(invocation)
    }

    fn variable(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("make: *** {error:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<()> {
    let invocation = Invocation::parse(std::env::args().skip(1))?;
    let root = Utf8PathBuf::try_from(std::env::current_dir()?)?;

    let makefile = invocation.makefile.as_deref().unwrap_or(TOOL_MAKEFILE);
    if !root.join(makefile).is_file() {
        bail!("{makefile}: No such file or directory");
    }

    if invocation.clean {
        return clean(&root);
    }

    let target = match makefile {
        TOOL_MAKEFILE => "standalone",
        LIBRARY_MAKEFILE => "library",
        other => bail!("unknown makefile {other}"),
    };
    let failing = std::env::var(MAKE_FAIL_ENV).unwrap_or_default();
    if failing.split(',').any(|name| name == target) {
        bail!("[{target}] Error 1");
    }

    let fake_tool = std::env::var(FAKE_TOOL_ENV).wrap_err(FAKE_TOOL_ENV)?;
    if target == "standalone" {
        fs::copy(&fake_tool, root.join("drampower"))?;
        touch_all(&root, TOOL_OBJECTS)?;
    } else {
        if invocation.variable("DRAMPOWER_PATH") != Some(".") {
            bail!("DRAMPOWER_PATH must point at the source root");
        }
        for executable in ["library_test", "window_example"] {
            fs::copy(&fake_tool, root.join(LIBRARY_DIR).join(executable))?;
        }
        touch_all(&root, LIBRARY_OBJECTS)?;
        if invocation.variable("COVERAGE") == Some("1") {
            touch_all(&root, COVERAGE_FILES)?;
        }
    }
    Ok(())
}

fn touch_all(root: &Utf8Path, paths: &[&str]) -> Result<()> {
    for path in paths {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, "")?;
    }
    Ok(())
}

fn clean(root: &Utf8Path) -> Result<()> {
    let keep_objects = std::env::var_os(MAKE_KEEP_OBJECTS_ENV).is_some();
    let generated = TOOL_OBJECTS
        .iter()
        .chain(LIBRARY_OBJECTS)
        .map(|path| root.join(path))
        .chain([
            root.join("drampower"),
            root.join(LIBRARY_DIR).join("library_test"),
            root.join(LIBRARY_DIR).join("window_example"),
        ]);

    for path in generated {
        if keep_objects && path.extension() == Some("o") {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }
    }
    Ok(())
}
