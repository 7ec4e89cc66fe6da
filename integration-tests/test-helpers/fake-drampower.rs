// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A fake power estimation tool.
//!
//! `fake-make` copies this binary into the source tree under three names. It behaves as the
//! standalone tool, the library test executable or the window example depending on the name it
//! is invoked under.

use camino::Utf8Path;
use color_eyre::{
    Result,
    eyre::{Context, bail},
};
use fs_err as fs;
use integration_tests::fake_power::{
    Estimate, LIBRARY_COMMANDS, Memspec, TraceStats, WINDOW_TRACE, drift_requested, render_report,
};
use std::{io::Write, process::ExitCode};

const USAGE: &str = "usage: drampower -m <memspec> (-c <command trace> | -t <transaction trace>) \
                     [-r] [-p <level>] [-b <ratios>] [-pasr <mode>]";

fn main() -> ExitCode {
    let mut args = std::env::args();
    let argv0 = args.next().unwrap_or_default();
    let args: Vec<String> = args.collect();

    let executable = Utf8Path::new(&argv0)
        .file_stem()
        .unwrap_or_default()
        .to_owned();
    let result = match executable.as_str() {
        "library_test" => library_test(&args),
        "window_example" => window_example(&args),
        _ => tool(&args),
    };

    match result {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            if stdout.write_all(output.as_bytes()).is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{executable}: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn read_memspec(path: &str) -> Result<Memspec> {
    let xml = fs::read_to_string(path)?;
    Memspec::from_xml(&xml).wrap_err_with(|| format!("invalid memspec {path}"))
}

fn tool(args: &[String]) -> Result<String> {
    let mut memspec = None;
    let mut trace = None;
    let mut options = Vec::new();

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        let mut value = || {
            args.next()
                .cloned()
                .ok_or_else(|| color_eyre::eyre::eyre!("{arg} requires a value\n{USAGE}"))
        };
        match arg.as_str() {
            "-m" => memspec = Some(value()?),
            "-c" | "-t" => trace = Some(value()?),
            "-r" => options.push(arg.clone()),
            "-p" | "-b" | "-pasr" => {
                let value = value()?;
                options.push(format!("{arg} {value}"));
            }
            other => bail!("unknown argument {other}\n{USAGE}"),
        }
    }

    let (Some(memspec), Some(trace)) = (memspec, trace) else {
        bail!("{USAGE}");
    };
    let memspec = read_memspec(&memspec)?;
    let trace_text = fs::read_to_string(&trace)?;

    let stats = TraceStats::parse(&trace_text);
    for line in &stats.malformed {
        eprintln!("WARNING: ignoring malformed command on line {line} of {trace}");
    }

    let estimate = Estimate::new(&memspec, &stats, &options, drift_requested("tool"));
    Ok(render_report(&memspec, &trace, &stats, &options, &estimate))
}

fn library_test(args: &[String]) -> Result<String> {
    let [memspec] = args else {
        bail!("usage: library_test <memspec>");
    };
    let memspec = read_memspec(memspec)?;
    eprintln!("library_test: replaying the built-in command sequence");

    let stats = TraceStats::parse(LIBRARY_COMMANDS);
    let estimate = Estimate::new(&memspec, &stats, &[], drift_requested("library"));
    Ok(render_report(
        &memspec,
        "<built-in>",
        &stats,
        &[],
        &estimate,
    ))
}

fn window_example(args: &[String]) -> Result<String> {
    let [memspec] = args else {
        bail!("usage: window_example <memspec>");
    };
    let memspec = read_memspec(memspec)?;
    let trace = fs::read_to_string(WINDOW_TRACE)?;

    let mut out = String::new();
    let lines: Vec<&str> = trace.lines().filter(|line| !line.trim().is_empty()).collect();
    for (index, window) in lines.chunks(4).enumerate() {
        let stats = TraceStats::parse(&window.join("\n"));
        let estimate = Estimate::new(&memspec, &stats, &[], false);
        out.push_str(&format!(
            "Window {} Total Energy: {:.2} pJ\nWindow {} Average Power: {:.2} mW\n\n",
            index + 1,
            estimate.energy_pj,
            index + 1,
            estimate.average_power_mw,
        ));
    }

    let stats = TraceStats::parse(&trace);
    Estimate::new(&memspec, &stats, &[], drift_requested("window")).write_summary(&mut out);
    Ok(out)
}
