// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Bus-to-bit expansion.
//!
//! A bus is decoded into per-bit edge sequences. Where each bit goes
//! in the circuit is decided by a [`BusMapping`] resolved once per bus,
//! so there is a single expansion code path for every naming scheme.

use compact_str::{format_compact, CompactString};
use crate::bits::{decode_literal, literal_width_hint, split_name, NameSuffix, Radix, MAX_BUS_WIDTH};
use crate::config::{FixedOffset, SynthConfig};
use crate::pwl::Level;
use crate::tim::BusSignal;

/// How the bits of one bus map to circuit nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMapping {
    /// Bit `i` goes to node `base[low + i]`.
    ///
    /// The range comes from a `[msb:lsb]` name suffix, or is inferred
    /// as `[width-1:0]` from the widest value literal.
    RangeDerived {
        base: CompactString,
        low: u32,
        width: usize,
    },
    /// Bit `i` goes to a slice of a configured target array.
    FixedOffset(FixedOffset),
    /// No expansion: bit 0 drives a node named like the bus.
    Literal,
}

impl BusMapping {
    /// Choose the mapping of a bus.
    ///
    /// Configured fixed-offset tables win, looked up by the full
    /// declared name and then by the base name. Configured literals
    /// come next, then the name's own suffix.
    pub fn resolve(bus: &BusSignal, config: &SynthConfig) -> BusMapping {
        let suffix = split_name(&bus.name);
        let base = match suffix {
            NameSuffix::Range(base, _) | NameSuffix::Index(base, _) |
            NameSuffix::Plain(base) => base,
        };
        if let Some(map) = config.bus_mappings.get(bus.name.as_str())
            .or_else(|| config.bus_mappings.get(base))
        {
            return match map.width() <= MAX_BUS_WIDTH as u64 {
                true => BusMapping::FixedOffset(map.clone()),
                false => too_wide(bus, map.width()),
            }
        }
        if config.literal_buses.contains(bus.name.as_str()) ||
            config.literal_buses.contains(base)
        {
            return BusMapping::Literal
        }
        match suffix {
            NameSuffix::Range(_, range) if range.width() > MAX_BUS_WIDTH as u64 =>
                too_wide(bus, range.width()),
            NameSuffix::Range(base, range) => BusMapping::RangeDerived {
                base: base.into(),
                low: range.low(),
                width: range.width() as usize,
            },
            NameSuffix::Index(..) => BusMapping::Literal,
            NameSuffix::Plain(name) => match inferred_width(bus, config.radix) {
                width if width > MAX_BUS_WIDTH => too_wide(bus, width as u64),
                width => BusMapping::RangeDerived {
                    base: name.into(),
                    low: 0,
                    width,
                },
            },
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        match self {
            BusMapping::RangeDerived { width, .. } => *width,
            BusMapping::FixedOffset(map) => map.width() as usize,
            BusMapping::Literal => 1,
        }
    }

    /// The circuit node driven by decoded bit `bit` of bus `bus_name`.
    pub fn node_name(&self, bus_name: &str, bit: usize) -> CompactString {
        match self {
            BusMapping::RangeDerived { base, low, .. } =>
                format_compact!("{}[{}]", base, *low as usize + bit),
            BusMapping::FixedOffset(map) =>
                format_compact!("{}[{}]", map.target, map.target_index(bit)),
            BusMapping::Literal => bus_name.into(),
        }
    }
}

fn too_wide(bus: &BusSignal, width: u64) -> BusMapping {
    clilog::warn!(TIM_BUS_RANGE,
                  "bus {} is {} bits wide, more than {}. kept as a single node",
                  bus.name, width, MAX_BUS_WIDTH);
    BusMapping::Literal
}

/// Infer a bus width from its value literals when the name carries
/// no range: the widest literal wins, at least 1 bit.
pub fn inferred_width(bus: &BusSignal, radix: Radix) -> usize {
    std::iter::once(&bus.start_state)
        .chain(bus.edges.iter().map(|(_, v)| v))
        .map(|lit| literal_width_hint(lit, radix))
        .max()
        .unwrap_or(0)
        .max(1)
}

/// One bit of an expanded bus.
#[derive(Debug, Clone, PartialEq)]
pub struct BitStimulus {
    /// position in the decoded value, 0 = LSB.
    pub bit: usize,
    pub node: CompactString,
    pub start: Level,
    /// (raw time, level). Only contains actual changes of this bit.
    pub edges: Vec<(f64, Level)>,
}

/// Expand a bus into one [`BitStimulus`] per bit, LSB first.
///
/// Bus edges sharing a timestamp collapse to the last one, and edges
/// at raw time 0 or earlier replace the start value.
pub fn expand_bus(bus: &BusSignal, mapping: &BusMapping, radix: Radix) -> Vec<BitStimulus> {
    let width = mapping.width();
    let mut start_literal = bus.start_state.as_str();
    let mut values: Vec<(f64, &str)> = Vec::with_capacity(bus.edges.len());
    for (t, lit) in &bus.edges {
        if *t <= 0. {
            start_literal = lit.as_str();
            continue
        }
        match values.last_mut() {
            Some(last) if last.0 == *t => last.1 = lit.as_str(),
            _ => values.push((*t, lit.as_str())),
        }
    }

    let start_bits = decode_literal(start_literal, width, radix);
    let mut bits = (0..width).map(|i| BitStimulus {
        bit: i,
        node: mapping.node_name(&bus.name, i),
        start: start_bits[i].into(),
        edges: vec![],
    }).collect::<Vec<_>>();

    let mut last_bits = start_bits;
    for (t, lit) in values {
        let new_bits = decode_literal(lit, width, radix);
        for (i, bs) in bits.iter_mut().enumerate() {
            if new_bits[i] != last_bits[i] {
                bs.edges.push((t, new_bits[i].into()));
            }
        }
        last_bits = new_bits;
    }
    bits
}
