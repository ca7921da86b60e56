// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! PWL stimulus synthesis from a parsed timing dump.

use compact_str::{format_compact, CompactString};
use indexmap::{IndexMap, IndexSet};
use crate::config::SynthConfig;
use crate::expand::{expand_bus, BusMapping};
use crate::pwl::{level_timeline, BitTrace, Level};
use crate::tim::{LogicState, TimDocument};

/// One independent voltage source of the deck.
#[derive(Debug, Clone, PartialEq)]
pub struct StimulusSource {
    /// The SPICE element name, unique within a [`Stimulus`].
    pub source_name: CompactString,
    /// The circuit node driven.
    pub node: CompactString,
    /// The signal or bus this source was derived from.
    pub origin: CompactString,
    pub trace: BitTrace,
}

/// All sources of one conversion, in emission order.
#[derive(Debug, Clone)]
pub struct Stimulus {
    pub time_scale: f64,
    pub epsilon: f64,
    pub vdd: f64,
    /// indexed by node name.
    pub sources: IndexMap<CompactString, StimulusSource>,
}

/// Turn an arbitrary name into a SPICE-safe identifier body.
///
/// Characters outside `[A-Za-z0-9_]` become `_`, and trailing
/// underscores are dropped, e.g. `ui_in[3]` becomes `ui_in_3`.
pub fn sanitize_name(name: &str) -> CompactString {
    let s: CompactString = name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    s.trim_end_matches('_').into()
}

impl Stimulus {
    /// Latest breakpoint over all traces, in seconds.
    pub fn max_time(&self) -> f64 {
        self.sources.values()
            .map(|s| s.trace.end_time())
            .fold(0., f64::max)
    }

    /// Transient analysis stop time: 10% beyond the last transition,
    /// at least 1 ns.
    pub fn sim_time(&self) -> f64 {
        (self.max_time() * 1.1).max(1e-9)
    }

    /// Transient analysis step: ten document time units, at least 1 ps.
    pub fn timestep(&self) -> f64 {
        (self.time_scale * 10.).max(1e-12)
    }

    /// Keep only the sources accepted by `keep`.
    ///
    /// Traces are never modified.
    pub fn retain(&mut self, mut keep: impl FnMut(&StimulusSource) -> bool) {
        self.sources.retain(|_, src| keep(src));
    }
}

/// Builds a [`Stimulus`] from a [`TimDocument`] under one
/// [`SynthConfig`].
pub struct PwlSynthesizer<'c> {
    config: &'c SynthConfig,
}

impl<'c> PwlSynthesizer<'c> {
    pub fn new(config: &'c SynthConfig) -> Self {
        PwlSynthesizer { config }
    }

    fn trace_of(
        &self, time_scale: f64, epsilon: f64,
        start: Level, edges: impl IntoIterator<Item = (f64, Level)>
    ) -> BitTrace {
        let timeline = level_timeline(
            start,
            edges.into_iter().map(|(t, l)| (t * time_scale, l)));
        BitTrace::from_levels(&timeline, epsilon, self.config.vdd)
    }

    /// Synthesize every signal, then every bus bit.
    ///
    /// A declared scalar signal takes precedence over a bus bit
    /// that would drive the same node.
    pub fn synthesize(&self, doc: &TimDocument) -> Stimulus {
        let timer_synth = clilog::stimer!("synthesize PWL sources");
        let config = self.config;
        let epsilon = config.epsilon(doc.time_scale);
        let mut stim = Stimulus {
            time_scale: doc.time_scale,
            epsilon,
            vdd: config.vdd,
            sources: IndexMap::new(),
        };
        let mut source_names = IndexSet::new();
        let mut add_source = |stim: &mut Stimulus, node: CompactString,
                              origin: &CompactString, trace: BitTrace| {
            let base = format_compact!("V_{}", sanitize_name(&node));
            let mut source_name = base.clone();
            let mut dup = 1;
            while !source_names.insert(source_name.clone()) {
                dup += 1;
                source_name = format_compact!("{}_{}", base, dup);
            }
            if dup > 1 {
                clilog::warn!(SYN_SRC_RENAMED,
                              "source name {} already used, node {} gets {}",
                              base, node, source_name);
            }
            stim.sources.insert(node.clone(), StimulusSource {
                source_name, node, origin: origin.clone(), trace
            });
        };

        for (name, sig) in &doc.signals {
            let node = config.signal_aliases.get(name.as_str())
                .cloned()
                .unwrap_or_else(|| name.clone());
            if stim.sources.contains_key(&node) {
                clilog::warn!(SYN_NODE_DUP,
                              "signal {} drives node {} already driven, skipped",
                              name, node);
                continue
            }
            let resolve = |state: LogicState| {
                let level = state.resolve(config.unknown_level);
                if let LogicState::Unknown(c) = state {
                    clilog::debug!("signal {}: state {} resolved to {:?}", name, c, level);
                }
                level
            };
            let start = resolve(sig.start_state);
            let edges = sig.edges.iter().map(|&(t, s)| (t, resolve(s)));
            let trace = self.trace_of(doc.time_scale, epsilon, start, edges);
            add_source(&mut stim, node, name, trace);
        }
        let num_scalar_nodes = stim.sources.len();

        for (name, bus) in &doc.buses {
            let mapping = BusMapping::resolve(bus, config);
            clilog::debug!("bus {}: {:?}", name, mapping);
            for bit in expand_bus(bus, &mapping, config.radix) {
                if let Some(idx) = stim.sources.get_index_of(&bit.node) {
                    if idx < num_scalar_nodes {
                        clilog::debug!("bus {} bit {}: node {} is declared as a signal, skipped",
                                       name, bit.bit, bit.node);
                    }
                    else {
                        clilog::warn!(SYN_NODE_DUP,
                                      "bus {} bit {}: node {} already driven by {}, skipped",
                                      name, bit.bit, bit.node,
                                      stim.sources[idx].origin);
                    }
                    continue
                }
                let trace = self.trace_of(doc.time_scale, epsilon, bit.start, bit.edges);
                add_source(&mut stim, bit.node, name, trace);
            }
        }
        clilog::finish!(timer_synth);
        stim
    }
}
