// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Reference filter.
//!
//! Restricts the emitted sources to those a reference netlist or
//! stimulus file already declares as independent voltage sources.

use std::path::Path;
use compact_str::CompactString;
use indexmap::IndexSet;
use crate::bits::{split_name, NameSuffix};
use crate::error::{Result, Tim2SpiceError};
use crate::synth::{Stimulus, StimulusSource};

/// Normalize a node or signal name for comparison.
///
/// Lowercases, turns every non-word character into `_`, and trims
/// underscores at both ends. `ui_in[3]` becomes `ui_in_3`.
pub fn normalize_name(name: &str) -> CompactString {
    let s: CompactString = name.chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '_' => c.to_ascii_lowercase(),
            _ => '_'
        })
        .collect();
    s.trim_matches('_').into()
}

/// Normalize a source element name: like [`normalize_name`], with the
/// leading `v_` or `v` element prefix removed.
pub fn normalize_source_name(name: &str) -> CompactString {
    let n = normalize_name(name);
    let stripped = n.strip_prefix("v_")
        .or_else(|| n.strip_prefix('v'))
        .unwrap_or(n.as_str());
    stripped.trim_start_matches('_').into()
}

/// The set of names a reference file declares, plus names that are
/// always kept.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFilter {
    /// normalized positive nodes of reference sources.
    nodes: IndexSet<CompactString>,
    /// normalized reference source names.
    sources: IndexSet<CompactString>,
    /// signal or bus names kept regardless of the reference.
    forced: IndexSet<CompactString>,
}

impl ReferenceFilter {
    /// Collect the voltage source declarations of a netlist.
    ///
    /// Comment (`*`), continuation (`+`) and control (`.`) lines are
    /// ignored, as is everything that is not a `V` element.
    pub fn from_netlist(text: &str) -> ReferenceFilter {
        let mut filter = ReferenceFilter::default();
        for line in text.lines() {
            let mut tokens = line.split_whitespace();
            let Some(name) = tokens.next() else { continue };
            if !name.starts_with(['V', 'v']) { continue }
            let Some(node) = tokens.next() else {
                clilog::debug!("reference source {} has no node, ignored", name);
                continue
            };
            filter.sources.insert(normalize_source_name(name));
            filter.nodes.insert(normalize_name(node));
        }
        clilog::info!("reference declares {} voltage sources", filter.sources.len());
        filter
    }

    pub fn load(path: &Path) -> Result<ReferenceFilter> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            Tim2SpiceError::Read { path: path.to_owned(), source }
        })?;
        Ok(ReferenceFilter::from_netlist(&text))
    }

    /// Keep every source derived from `name`, which may be a full bus
    /// name or its base.
    pub fn force_include(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.forced.insert(name.into());
        }
    }

    pub fn keeps(&self, src: &StimulusSource) -> bool {
        if self.nodes.contains(&normalize_name(&src.node)) ||
            self.sources.contains(&normalize_source_name(&src.source_name))
        {
            return true
        }
        let base = match split_name(&src.origin) {
            NameSuffix::Range(base, _) | NameSuffix::Index(base, _) |
            NameSuffix::Plain(base) => base,
        };
        self.forced.contains(src.origin.as_str()) || self.forced.contains(base)
    }

    /// Drop the sources of `stim` this filter does not keep.
    pub fn apply(&self, stim: &mut Stimulus) {
        let before = stim.sources.len();
        stim.retain(|src| {
            let keep = self.keeps(src);
            if !keep {
                clilog::debug!("{} ({}) not in reference, dropped", src.source_name, src.node);
            }
            keep
        });
        clilog::info!("reference filter kept {} of {} sources",
                      stim.sources.len(), before);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthConfig;
    use crate::synth::PwlSynthesizer;
    use crate::tim::parse_tim;

    const REFERENCE: &str = "\
* stimulus for the multiplier
.include \"mult.spice\"
V_ui_in_0 ui_in[0] 0 PWL(0 0 1n 1.8)
+ 2n 0
vclk clk 0 DC 0
Xdut ui_in[0] ui_in[1] clk mult
R1 a b 1k
V3
";

    #[test]
    fn normalization() {
        assert_eq!(normalize_name("ui_in[3]"), "ui_in_3");
        assert_eq!(normalize_name("Top/U1.Q<2>"), "top_u1_q_2");
        assert_eq!(normalize_source_name("V_ui_in[0]"), "ui_in_0");
        assert_eq!(normalize_source_name("vclk"), "clk");
        assert_eq!(normalize_source_name("VRST"), "rst");
    }

    #[test]
    fn collects_voltage_sources_only() {
        let filter = ReferenceFilter::from_netlist(REFERENCE);
        assert_eq!(filter.nodes.iter().map(|n| n.as_str()).collect::<Vec<_>>(),
                   vec!["ui_in_0", "clk"]);
        assert_eq!(filter.sources.iter().map(|n| n.as_str()).collect::<Vec<_>>(),
                   vec!["ui_in_0", "clk"]);
    }

    #[test]
    fn filters_by_node_source_and_force() {
        let doc = parse_tim("Time_Scale: 1e-9\n\
                             Digital_Signal\nName: clk\n\
                             Digital_Signal\nName: rst\n\
                             Digital_Bus\nName: ui_in[1:0]\nStart_State: 1\n\
                             Digital_Bus\nName: uo_out[1:0]\nStart_State: 2\n");
        let config = SynthConfig::default();
        let stim = PwlSynthesizer::new(&config).synthesize(&doc);
        assert_eq!(stim.sources.len(), 6);

        let mut filter = ReferenceFilter::from_netlist(REFERENCE);
        let mut kept = stim.clone();
        filter.apply(&mut kept);
        assert_eq!(kept.sources.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
                   vec!["clk", "ui_in[0]"]);
        // traces are untouched.
        assert_eq!(kept.sources["ui_in[0]"], stim.sources["ui_in[0]"]);

        filter.force_include("uo_out");
        let mut kept = stim.clone();
        filter.apply(&mut kept);
        assert_eq!(kept.sources.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
                   vec!["clk", "ui_in[0]", "uo_out[0]", "uo_out[1]"]);
    }
}
