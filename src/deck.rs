// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! SPICE deck writer.

use std::fmt;
use std::path::Path;
use compact_str::{format_compact, CompactString};
use itertools::Itertools;
use crate::error::{Result, Tim2SpiceError};
use crate::synth::{Stimulus, StimulusSource};

/// Significant digits of PWL times and analysis parameters.
pub const TIME_DIGITS: usize = 12;
/// Significant digits of PWL voltages.
pub const VOLTAGE_DIGITS: usize = 6;

pub const DEFAULT_LIB_PATH: &str =
    "/usr/local/share/pdk/sky130A/libs.tech/ngspice/sky130.lib.spice";
pub const DEFAULT_CORNER: &str = "tt";

/// Format like C's `%.<precision>g`.
///
/// Uses the shortest of fixed and scientific notation for the given
/// number of significant digits, without trailing zeros. Exponents
/// have at least two digits, e.g. `1e-09`.
pub fn fmt_g(x: f64, precision: usize) -> String {
    if x == 0. {
        return "0".to_string()
    }
    if !x.is_finite() {
        return x.to_string()
    }
    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, x);
    // the exponent is taken after rounding to `precision` digits.
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci
    };
    if exp < -4 || exp >= precision as i32 {
        format!("{}e{}{:02}", trim_fraction(mantissa),
                if exp < 0 { '-' } else { '+' }, exp.abs())
    }
    else {
        let fixed = format!("{:.*}", (precision as i32 - 1 - exp) as usize, x);
        trim_fraction(&fixed).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    match s.contains('.') {
        true => s.trim_end_matches('0').trim_end_matches('.'),
        false => s
    }
}

/// Deck-level settings that do not influence the waveforms.
#[derive(Debug, Clone)]
pub struct DeckOptions {
    /// Shown in the header comment, usually the input file name.
    pub title: CompactString,
    pub lib_path: CompactString,
    pub corner: CompactString,
    /// Stem of the `.raw` file the simulator writes.
    pub raw_name: CompactString,
    /// Path of the netlist under test.
    pub include: CompactString,
}

impl Default for DeckOptions {
    fn default() -> Self {
        DeckOptions {
            title: "stimulus".into(),
            lib_path: DEFAULT_LIB_PATH.into(),
            corner: DEFAULT_CORNER.into(),
            raw_name: "stimulus".into(),
            include: "./stimulus.spice".into(),
        }
    }
}

impl DeckOptions {
    /// Options for converting `input` into `output`: the raw file is
    /// named after the output, the netlist after the input.
    pub fn for_paths(input: &Path, output: &Path) -> DeckOptions {
        let stem = |p: &Path| -> CompactString {
            p.file_stem().map_or_else(|| "stimulus".into(), |s| s.to_string_lossy().into())
        };
        DeckOptions {
            title: input.file_name()
                .map_or_else(|| input.display().to_string().into(),
                             |s| s.to_string_lossy().into()),
            raw_name: stem(output),
            include: format_compact!("./{}.spice", stem(input)),
            ..Default::default()
        }
    }
}

/// A complete deck, rendered through [`fmt::Display`].
pub struct Deck<'a> {
    pub stimulus: &'a Stimulus,
    pub options: &'a DeckOptions,
}

impl<'a> Deck<'a> {
    pub fn new(stimulus: &'a Stimulus, options: &'a DeckOptions) -> Deck<'a> {
        Deck { stimulus, options }
    }

    /// Write the rendered deck to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_string()).map_err(|source| {
            Tim2SpiceError::Write { path: path.to_owned(), source }
        })
    }
}

fn write_source(f: &mut fmt::Formatter<'_>, src: &StimulusSource) -> fmt::Result {
    writeln!(f, "* {}", src.node)?;
    writeln!(f, "{} {} 0 PWL({})", src.source_name, src.node,
             src.trace.points.iter().format_with(" ", |p, g| g(&format_args!(
                 "{} {}", fmt_g(p.time, TIME_DIGITS), fmt_g(p.voltage, VOLTAGE_DIGITS)))))?;
    writeln!(f)
}

impl fmt::Display for Deck<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (stim, opts) = (self.stimulus, self.options);
        writeln!(f, "* Generated from {}", opts.title)?;
        writeln!(f, "* VDD Level: {} V", stim.vdd)?;
        writeln!(f)?;
        writeln!(f, ".lib {} {}", opts.lib_path, opts.corner)?;
        writeln!(f)?;
        writeln!(f, ".tran {} {}",
                 fmt_g(stim.timestep(), TIME_DIGITS),
                 fmt_g(stim.sim_time(), TIME_DIGITS))?;
        writeln!(f, ".print tran format=raw file={}.raw v(*)", opts.raw_name)?;
        writeln!(f)?;
        writeln!(f, "* Power rails")?;
        writeln!(f, "Vvdd VPWR 0 DC {}", stim.vdd)?;
        writeln!(f, "Vgnd VGND 0 DC 0")?;
        writeln!(f)?;
        for src in stim.sources.values() {
            write_source(f, src)?;
        }
        writeln!(f, ".include \"{}\"", opts.include)?;
        writeln!(f, ".end")
    }
}
