// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A deterministic stand-in for the power estimation tool.
//!
//! The fake executables built from `test-helpers/` share this model so that the standalone tool
//! and the library executables agree on summary lines, the way the real ones do.

use color_eyre::{Result, eyre::bail};
use std::{collections::BTreeMap, time::SystemTime};
use swrite::{SWrite, swriteln};

/// Set to `tool`, `library` or `window` to perturb the energy that executable reports.
pub const DRIFT_ENV: &str = "FAKE_DRAMPOWER_DRIFT";

/// The path to the fake tool, used by `fake-make` to "build" it.
pub const FAKE_TOOL_ENV: &str = "GOLDEN_TRACE_FAKE_TOOL";

/// Comma-separated build targets (`standalone`, `library`) that `fake-make` fails to build.
pub const MAKE_FAIL_ENV: &str = "FAKE_MAKE_FAIL";

/// If set, `fake-make clean` leaves an object file behind.
pub const MAKE_KEEP_OBJECTS_ENV: &str = "FAKE_MAKE_KEEP_OBJECTS";

/// The trace the window example replays, relative to the source root.
pub const WINDOW_TRACE: &str = "test/libdrampowertest/window.trace";

/// The commands the library test executable issues.
pub const LIBRARY_COMMANDS: &str = "\
0,ACT,0
20,RD,0
40,WR,0
60,PRE,0
100,ACT,3
120,RDA,3
200,REF,0
";

/// Returns true if `executable` should report perturbed numbers.
pub fn drift_requested(executable: &str) -> bool {
    std::env::var(DRIFT_ENV).is_ok_and(|value| value == executable)
}

/// The parts of a memory specification the model looks at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Memspec {
    pub memory_id: String,
    weight: u64,
}

impl Memspec {
    /// Reads the `memoryId` parameter out of a memspec XML file.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let Some(memory_id) = xml
            .lines()
            .find(|line| line.contains("id=\"memoryId\""))
            .and_then(|line| attribute(line, "value"))
        else {
            bail!("memspec has no memoryId parameter");
        };

        let weight = memory_id.bytes().map(u64::from).sum::<u64>() % 97 + 1;
        Ok(Self {
            memory_id: memory_id.to_owned(),
            weight,
        })
    }
}

fn attribute<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let start = line.find(&format!("{name}=\""))? + name.len() + 2;
    let len = line[start..].find('"')?;
    Some(&line[start..start + len])
}

/// Command counts collected from a trace.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TraceStats {
    pub counts: BTreeMap<String, u64>,
    pub last_cycle: u64,
    /// 1-based line numbers that could not be parsed.
    pub malformed: Vec<usize>,
}

impl TraceStats {
    /// Parses `timestamp,command[,...]` lines. Blank lines are ignored.
    pub fn parse(trace: &str) -> Self {
        let mut stats = Self::default();
        for (index, line) in trace.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split(',').map(str::trim);
            let cycle = fields.next().and_then(|cycle| cycle.parse::<u64>().ok());
            let command = fields.next().filter(|command| !command.is_empty());
            match (cycle, command) {
                (Some(cycle), Some(command)) => {
                    *stats.counts.entry(command.to_uppercase()).or_default() += 1;
                    stats.last_cycle = stats.last_cycle.max(cycle);
                }
                _ => stats.malformed.push(index + 1),
            }
        }
        stats
    }
}

fn command_weight(command: &str) -> u64 {
    match command {
        "ACT" => 30,
        "PRE" | "PREA" => 20,
        "RD" | "RDA" | "READ" => 15,
        "WR" | "WRA" | "WRITE" => 17,
        "REF" | "REFB" => 60,
        _ => 5,
    }
}

/// The headline numbers of an estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Estimate {
    pub energy_pj: f64,
    pub average_power_mw: f64,
}

impl Estimate {
    /// Estimates energy for `stats`. Each option string scales the result.
    pub fn new(memspec: &Memspec, stats: &TraceStats, options: &[String], drift: bool) -> Self {
        let base: u64 = stats
            .counts
            .iter()
            .map(|(command, count)| count * command_weight(command) * memspec.weight)
            .sum();
        let option_bytes: u64 = options
            .iter()
            .flat_map(|option| option.bytes())
            .map(u64::from)
            .sum();
        let factor = 1.0 + (option_bytes % 50) as f64 / 100.0;

        let mut energy_pj = base as f64 * factor;
        if drift {
            energy_pj += 1.0;
        }
        let average_power_mw = energy_pj / stats.last_cycle.max(1) as f64;
        Self {
            energy_pj,
            average_power_mw,
        }
    }

    /// Writes the two summary lines.
    pub fn write_summary(&self, out: &mut String) {
        swriteln!(out, "Total Trace Energy: {:.3} pJ", self.energy_pj);
        swriteln!(out, "Average Power: {:.3} mW", self.average_power_mw);
    }
}

/// Renders a full report. Banner lines carry volatile data such as timestamps and temporary
/// paths.
pub fn render_report(
    memspec: &Memspec,
    trace_label: &str,
    stats: &TraceStats,
    options: &[String],
    estimate: &Estimate,
) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();

    let mut out = String::new();
    swriteln!(out, "* Analysis Start Time: {now}");
    swriteln!(out, "* Trace: {trace_label}");
    swriteln!(out, "Memory: {}", memspec.memory_id);
    if options.is_empty() {
        swriteln!(out, "Options: none");
    } else {
        swriteln!(out, "Options: {}", options.join(" "));
    }
    out.push('\n');
    for (command, count) in &stats.counts {
        swriteln!(out, "#{command} commands: {count}");
    }
    swriteln!(out, "Total cycles: {}", stats.last_cycle);
    estimate.write_summary(&mut out);
    swriteln!(out, "* Analysis End Time: {now}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMSPEC: &str = r#"<memspec>
  <parameter id="memoryId" type="string" value="MICRON_1Gb_DDR2-1066_16bit_H" />
</memspec>"#;

    #[test]
    fn parse_memspec() {
        let memspec = Memspec::from_xml(MEMSPEC).unwrap();
        assert_eq!(memspec.memory_id, "MICRON_1Gb_DDR2-1066_16bit_H");
        Memspec::from_xml("<memspec />").unwrap_err();
    }

    #[test]
    fn parse_trace() {
        let stats = TraceStats::parse("0,ACT,0\n\n20,rd,0\nbogus\n40,RD,1\n,PRE\n");
        assert_eq!(stats.counts.get("ACT"), Some(&1));
        assert_eq!(stats.counts.get("RD"), Some(&2));
        assert_eq!(stats.last_cycle, 40);
        assert_eq!(stats.malformed, [4, 6]);
    }

    #[test]
    fn options_and_drift_change_energy() {
        let memspec = Memspec::from_xml(MEMSPEC).unwrap();
        let stats = TraceStats::parse(LIBRARY_COMMANDS);
        let plain = Estimate::new(&memspec, &stats, &[], false);

        assert_eq!(plain, Estimate::new(&memspec, &stats, &[], false));
        assert_ne!(plain, Estimate::new(&memspec, &stats, &["-r".to_owned()], false));
        assert_ne!(plain, Estimate::new(&memspec, &stats, &[], true));
    }
}
