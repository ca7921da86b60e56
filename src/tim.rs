// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Timing dump (`.tim`) reader.
//!
//! The format is loosely structured: a `Time_Scale:` header field
//! followed by `Digital_Signal` and `Digital_Bus` blocks, each with
//! `Name:`, `Start_State:` and `Edge:` fields.
//! The reader is best-effort. A malformed block or edge is dropped
//! with a warning and never fails the whole document.

use compact_str::CompactString;
use indexmap::IndexMap;
use regex::Regex;
use crate::pwl::Level;

/// Seconds per time unit used when a document declares no usable
/// `Time_Scale:` field.
///
/// This is a fallback only. A document without a time scale is
/// likely to produce a wrongly scaled deck and is reported as such.
pub const DEFAULT_TIME_SCALE: f64 = 1e-12;

/// A digital state as written in a timing dump.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogicState {
    Low,
    High,
    /// Unknown or high-impedance, with its source code (e.g. `X`).
    Unknown(char),
}

impl LogicState {
    /// Parse a state code. Anything except 0/1 is unknown.
    pub fn from_code(c: char) -> LogicState {
        match c {
            '0' => LogicState::Low,
            '1' => LogicState::High,
            c => LogicState::Unknown(c.to_ascii_uppercase()),
        }
    }

    /// Resolve to a drivable level, mapping unknown states
    /// to `unknown_level`.
    #[inline]
    pub fn resolve(self, unknown_level: Level) -> Level {
        match self {
            LogicState::Low => Level::Low,
            LogicState::High => Level::High,
            LogicState::Unknown(_) => unknown_level,
        }
    }
}

/// A single-bit signal from a `Digital_Signal` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSignal {
    pub name: CompactString,
    pub start_state: LogicState,
    /// (raw time, state), sorted by raw time.
    ///
    /// Edges sharing a timestamp keep their document order.
    pub edges: Vec<(f64, LogicState)>,
}

/// A multi-bit bus from a `Digital_Bus` block.
#[derive(Debug, Clone, PartialEq)]
pub struct BusSignal {
    /// The declared name, possibly with a `[msb:lsb]` suffix.
    pub name: CompactString,
    /// The start value literal. `"0"` if not declared.
    pub start_state: CompactString,
    /// (raw time, value literal), sorted by raw time.
    pub edges: Vec<(f64, CompactString)>,
}

/// The content of one timing dump.
#[derive(Debug, Clone, Default)]
pub struct TimDocument {
    /// seconds per raw time unit. always positive.
    pub time_scale: f64,
    /// whether [`DEFAULT_TIME_SCALE`] was substituted.
    pub time_scale_is_fallback: bool,
    pub signals: IndexMap<CompactString, ScalarSignal>,
    pub buses: IndexMap<CompactString, BusSignal>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BlockKind {
    Signal,
    Bus,
}

/// Two-stage reader: a keyword-anchored block splitter followed by
/// a field extractor per block.
///
/// A field value may follow its label on the same or a later line.
/// A token directly followed by `:` is the next label, never a value.
pub struct TimParser {
    time_scale_re: Regex,
    block_re: Regex,
    name_re: Regex,
    start_re: Regex,
    edge_re: Regex,
    label_re: Regex,
}

impl Default for TimParser {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn count_newlines(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'\n').count()
}

impl TimParser {
    pub fn new() -> TimParser {
        let re = |s: &str| Regex::new(s).expect("static regex");
        TimParser {
            time_scale_re: re(r"\bTime_Scale[ \t]*:\s*([^\s:]+)(?:\s|$)"),
            block_re: re(r"\b(Digital_Signal|Digital_Bus)\b"),
            name_re: re(r"\bName[ \t]*:\s*([^\r\n]*)"),
            start_re: re(r"\bStart_State[ \t]*:\s*([^\s:]+)(?:\s|$)"),
            edge_re: re(r"\bEdge[ \t]*:\s*([^\s:]+)(?:\s|$)(?:\s*([^\s:]+)(?:\s|$))?"),
            label_re: re(r"^(?:Time_Scale|Name|Start_State|Edge)[ \t]*:"),
        }
    }

    /// Read the global time scale, or fall back to
    /// [`DEFAULT_TIME_SCALE`].
    fn parse_time_scale(&self, text: &str) -> Option<f64> {
        let caps = self.time_scale_re.captures(text)?;
        let raw = &caps[1];
        match raw.parse::<f64>() {
            Ok(ts) if ts.is_finite() && ts > 0. => Some(ts),
            _ => {
                clilog::warn!(TIM_BAD_TIMESCALE,
                              "unusable Time_Scale value `{}` at line {}",
                              raw, count_newlines(&text[..caps.get(1).map_or(0, |m| m.start())]) + 1);
                None
            }
        }
    }

    /// Parse a full document.
    pub fn parse(&self, text: &str) -> TimDocument {
        let (time_scale, time_scale_is_fallback) = match self.parse_time_scale(text) {
            Some(ts) => (ts, false),
            None => {
                clilog::warn!(TIM_NO_TIMESCALE,
                              "no usable Time_Scale in document, assuming {} s per unit",
                              DEFAULT_TIME_SCALE);
                (DEFAULT_TIME_SCALE, true)
            }
        };
        let mut doc = TimDocument {
            time_scale, time_scale_is_fallback,
            ..Default::default()
        };

        let starts = self.block_re.find_iter(text).collect::<Vec<_>>();
        // line numbers are counted incrementally over the block starts.
        let (mut line, mut line_pos) = (1, 0);
        for (i, m) in starts.iter().enumerate() {
            let end = starts.get(i + 1).map_or(text.len(), |n| n.start());
            let body = &text[m.end()..end];
            let kind = match m.as_str() {
                "Digital_Signal" => BlockKind::Signal,
                _ => BlockKind::Bus,
            };
            line += count_newlines(&text[line_pos..m.start()]);
            line_pos = m.start();
            let Some(name) = self.parse_name(body) else {
                clilog::warn!(TIM_BLOCK_NONAME,
                              "{} block at line {} has no Name field, skipped",
                              m.as_str(), line);
                continue
            };
            match kind {
                BlockKind::Signal => {
                    let sig = self.parse_signal_block(name, body, line);
                    if let Some(old) = doc.signals.insert(sig.name.clone(), sig) {
                        clilog::warn!(TIM_DUP_NAME,
                                      "signal {} redeclared at line {}, later block wins",
                                      old.name, line);
                    }
                }
                BlockKind::Bus => {
                    let bus = self.parse_bus_block(name, body, line);
                    if let Some(old) = doc.buses.insert(bus.name.clone(), bus) {
                        clilog::warn!(TIM_DUP_NAME,
                                      "bus {} redeclared at line {}, later block wins",
                                      old.name, line);
                    }
                }
            }
        }
        clilog::debug!("parsed {} signals and {} buses, time scale {} s",
                       doc.signals.len(), doc.buses.len(), doc.time_scale);
        doc
    }

    /// The block name, possibly on the line after `Name:`.
    /// An empty name followed by another field yields None.
    fn parse_name(&self, body: &str) -> Option<CompactString> {
        let caps = self.name_re.captures(body)?;
        let name = caps[1].trim();
        (!name.is_empty() && !self.label_re.is_match(name)).then(|| name.into())
    }

    fn parse_start<'b>(&self, body: &'b str) -> Option<&'b str> {
        Some(self.start_re.captures(body)?.get(1)?.as_str())
    }

    /// Iterate over (time, value) of all well-formed edges in a block.
    ///
    /// Edges with unparseable time or a missing value are skipped.
    fn edges<'b>(
        &'b self, name: &'b str, body: &'b str, line: usize
    ) -> impl Iterator<Item = (f64, &'b str)> + 'b {
        self.edge_re.captures_iter(body).filter_map(move |caps| {
            let t = &caps[1];
            let (Ok(time), Some(val)) = (t.parse::<f64>(), caps.get(2)) else {
                clilog::warn!(TIM_EDGE_BAD,
                              "malformed edge `{}` in block {} (line {}), skipped",
                              caps[0].trim(), name, line);
                return None
            };
            if !time.is_finite() {
                clilog::warn!(TIM_EDGE_BAD,
                              "non-finite edge time `{}` in block {} (line {}), skipped",
                              t, name, line);
                return None
            }
            Some((time, val.as_str()))
        })
    }

    fn parse_signal_block(
        &self, name: CompactString, body: &str, line: usize
    ) -> ScalarSignal {
        let start_state = match self.parse_start(body) {
            Some(s) => s.chars().next().map_or(LogicState::Low, LogicState::from_code),
            None => LogicState::Low,
        };
        let mut edges = self.edges(&name, body, line)
            .filter_map(|(t, v)| match v {
                "0" => Some((t, LogicState::Low)),
                "1" => Some((t, LogicState::High)),
                "x" | "X" | "z" | "Z" => Some((t, LogicState::from_code(v.as_bytes()[0] as char))),
                _ => {
                    clilog::warn!(TIM_EDGE_BAD,
                                  "signal {} (line {}) has edge value `{}` at {}, skipped",
                                  name, line, v, t);
                    None
                }
            })
            .collect::<Vec<_>>();
        // stable: same-time edges keep document order.
        edges.sort_by(|a, b| a.0.total_cmp(&b.0));
        ScalarSignal { name, start_state, edges }
    }

    fn parse_bus_block(
        &self, name: CompactString, body: &str, line: usize
    ) -> BusSignal {
        let start_state = self.parse_start(body).unwrap_or("0").into();
        let mut edges = self.edges(&name, body, line)
            .map(|(t, v)| (t, CompactString::from(v)))
            .collect::<Vec<_>>();
        edges.sort_by(|a, b| a.0.total_cmp(&b.0));
        BusSignal { name, start_state, edges }
    }
}

/// Parse a document with a fresh [`TimParser`].
pub fn parse_tim(text: &str) -> TimDocument {
    TimParser::new().parse(text)
}
