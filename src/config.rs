// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Conversion settings.
//!
//! [`SynthConfig`] is an immutable record handed to the synthesizer.
//! It starts from built-in defaults, can be amended by a TOML mapping
//! file, and finally by command line flags.
//!
//! A mapping file looks like this:
//! ```toml
//! vdd = 1.8
//! unknown_level = "low"
//! radix = "hex"
//!
//! # scalar signal name -> circuit node
//! [signals]
//! rst = "rst_n"
//! init = "uio_in[0]"
//!
//! # bus name -> slice of a target array
//! [buses."A[3:0]"]
//! target = "ui_in"
//! msb = 3
//! lsb = 0
//! base_index = 0
//! reversed = true
//! ```

use std::path::Path;
use compact_str::CompactString;
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use crate::bits::{BusRange, Radix, MAX_BUS_WIDTH};
use crate::error::{Result, Tim2SpiceError};
use crate::pwl::{transition_epsilon, Level, EPSILON_FACTOR, MIN_EPS};

/// Default supply voltage in volts.
pub const DEFAULT_VDD: f64 = 3.3;

/// A bus mapped onto a slice of a target array, starting at
/// `target[base_index]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedOffset {
    pub target: CompactString,
    pub msb: u32,
    pub lsb: u32,
    #[serde(default)]
    pub base_index: u32,
    /// Map bit 0 of the decoded value to the highest target index.
    ///
    /// Needed when the dump's bit order is inverted relative to the
    /// target array.
    #[serde(default)]
    pub reversed: bool,
}

impl FixedOffset {
    #[inline]
    pub fn width(&self) -> u64 {
        BusRange { msb: self.msb, lsb: self.lsb }.width()
    }

    /// The absolute target index of decoded bit `bit`.
    #[inline]
    pub fn target_index(&self, bit: usize) -> u64 {
        let bit = bit as u64;
        match self.reversed {
            false => self.base_index as u64 + bit,
            true => self.base_index as u64 + (self.width() - 1 - bit),
        }
    }

    /// The highest target index written.
    #[inline]
    pub fn last_index(&self) -> u64 {
        self.base_index as u64 + self.width() - 1
    }
}

/// The on-disk mapping file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingFile {
    pub vdd: Option<f64>,
    pub epsilon_factor: Option<f64>,
    pub min_epsilon: Option<f64>,
    pub unknown_level: Option<Level>,
    pub radix: Option<Radix>,
    #[serde(default)]
    pub signals: IndexMap<CompactString, CompactString>,
    #[serde(default)]
    pub buses: IndexMap<CompactString, FixedOffset>,
    /// Buses emitted as a single bit under their own name.
    #[serde(default)]
    pub literal: Vec<CompactString>,
    /// Signals and buses kept regardless of the reference filter.
    #[serde(default)]
    pub force_include: Vec<CompactString>,
}

impl MappingFile {
    pub fn from_toml(text: &str) -> std::result::Result<MappingFile, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<MappingFile> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            Tim2SpiceError::Read { path: path.to_owned(), source }
        })?;
        MappingFile::from_toml(&text).map_err(|source| {
            Tim2SpiceError::Mapping { path: path.to_owned(), source }
        })
    }
}

/// Settings of one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    /// Supply voltage for logical 1.
    pub vdd: f64,
    pub epsilon_factor: f64,
    pub min_epsilon: f64,
    /// Level driven for unknown/high-impedance (`X`, `Z`) states.
    pub unknown_level: Level,
    /// Radix of bare bus value literals.
    pub radix: Radix,
    /// Scalar signal name to node name.
    pub signal_aliases: IndexMap<CompactString, CompactString>,
    /// Bus name (full or base) to fixed-offset mapping.
    pub bus_mappings: IndexMap<CompactString, FixedOffset>,
    pub literal_buses: IndexSet<CompactString>,
    pub force_include: IndexSet<CompactString>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            vdd: DEFAULT_VDD,
            epsilon_factor: EPSILON_FACTOR,
            min_epsilon: MIN_EPS,
            unknown_level: Level::Low,
            radix: Radix::Hex,
            signal_aliases: IndexMap::new(),
            bus_mappings: IndexMap::new(),
            literal_buses: IndexSet::new(),
            force_include: IndexSet::new(),
        }
    }
}

impl SynthConfig {
    /// Amend with the values given in a mapping file.
    pub fn apply_mapping_file(&mut self, file: MappingFile) {
        if let Some(vdd) = file.vdd { self.vdd = vdd; }
        if let Some(f) = file.epsilon_factor { self.epsilon_factor = f; }
        if let Some(m) = file.min_epsilon { self.min_epsilon = m; }
        if let Some(l) = file.unknown_level { self.unknown_level = l; }
        if let Some(r) = file.radix { self.radix = r; }
        self.signal_aliases.extend(file.signals);
        self.bus_mappings.extend(file.buses);
        self.literal_buses.extend(file.literal);
        self.force_include.extend(file.force_include);
    }

    /// Reject settings that would produce a degenerate deck.
    pub fn validate(&self) -> Result<()> {
        if !(self.vdd.is_finite() && self.vdd > 0.) {
            return Err(Tim2SpiceError::Config(format!(
                "vdd must be positive, got {}", self.vdd)))
        }
        if !(self.min_epsilon.is_finite() && self.min_epsilon > 0.) {
            return Err(Tim2SpiceError::Config(format!(
                "min_epsilon must be positive, got {}", self.min_epsilon)))
        }
        if !(self.epsilon_factor.is_finite() && self.epsilon_factor >= 0.) {
            return Err(Tim2SpiceError::Config(format!(
                "epsilon_factor must be non-negative, got {}", self.epsilon_factor)))
        }
        for (name, map) in &self.bus_mappings {
            if map.target.is_empty() {
                return Err(Tim2SpiceError::Config(format!(
                    "bus mapping {} has an empty target", name)))
            }
            if map.width() > MAX_BUS_WIDTH as u64 {
                return Err(Tim2SpiceError::Config(format!(
                    "bus mapping {} is {} bits wide, at most {} supported",
                    name, map.width(), MAX_BUS_WIDTH)))
            }
            if map.last_index() > u32::MAX as u64 {
                return Err(Tim2SpiceError::Config(format!(
                    "bus mapping {} exceeds the index range of {}",
                    name, map.target)))
            }
        }
        Ok(())
    }

    /// The transition epsilon for a document time scale.
    #[inline]
    pub fn epsilon(&self, time_scale: f64) -> f64 {
        transition_epsilon(time_scale, self.epsilon_factor, self.min_epsilon)
    }
}
