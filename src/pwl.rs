// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Digital levels to piecewise-linear (PWL) point lists.
//!
//! Every level is held flat until `epsilon` before its successor's
//! nominal transition time, then ramps to the new level exactly at
//! the transition time.

use serde::Deserialize;

/// Default transition epsilon, as a fraction of the document time unit.
pub const EPSILON_FACTOR: f64 = 1e-3;

/// Absolute floor of the transition epsilon in seconds.
pub const MIN_EPS: f64 = 1e-12;

/// The transition epsilon for a document time scale.
///
/// The floor keeps ramps non-degenerate at very fine time scales.
#[inline]
pub fn transition_epsilon(time_scale: f64, epsilon_factor: f64, min_eps: f64) -> f64 {
    (time_scale * epsilon_factor).max(min_eps)
}

/// A drivable digital level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    #[inline]
    pub fn voltage(self, vdd: f64) -> f64 {
        match self {
            Level::Low => 0.,
            Level::High => vdd,
        }
    }
}

impl From<bool> for Level {
    #[inline]
    fn from(b: bool) -> Level {
        if b { Level::High } else { Level::Low }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PwlPoint {
    /// seconds
    pub time: f64,
    /// volts
    pub voltage: f64,
}

impl PwlPoint {
    #[inline]
    pub fn new(time: f64, voltage: f64) -> PwlPoint {
        PwlPoint { time, voltage }
    }
}

/// The PWL waveform of one bit.
///
/// Invariants: the first point is at time 0, times never decrease,
/// and no two consecutive points are identical.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BitTrace {
    pub points: Vec<PwlPoint>,
}

/// Build a level timeline from a start level and edges in seconds.
///
/// Edges must be sorted by time. Among edges sharing a timestamp the
/// last one wins, and edges at or before time 0 replace the start
/// level. The result starts at time 0 and has strictly increasing
/// times.
pub fn level_timeline(
    start: Level,
    edges: impl IntoIterator<Item = (f64, Level)>
) -> Vec<(f64, Level)> {
    let mut timeline = vec![(0., start)];
    for (t, level) in edges {
        let t = t.max(0.);
        // the timeline is never empty.
        let last = timeline.last_mut().unwrap();
        if t <= last.0 {
            last.1 = level;
        }
        else {
            timeline.push((t, level));
        }
    }
    timeline
}

impl BitTrace {
    /// Synthesize a trace from (seconds, level) points in time order.
    ///
    /// Points that repeat the current level are no-ops.
    /// If the first point is after time 0, its level is held back to 0.
    pub fn from_levels(points: &[(f64, Level)], epsilon: f64, vdd: f64) -> BitTrace {
        let Some(&(_, first)) = points.first() else {
            return BitTrace { points: vec![PwlPoint::new(0., 0.)] }
        };
        let mut out = vec![PwlPoint::new(0., first.voltage(vdd))];
        let mut current = first;
        for &(t, level) in &points[1..] {
            if level == current { continue }
            let last_t = out.last().map_or(0., |p| p.time);
            let t = t.max(last_t);
            // transitions closer than epsilon get a shortened hold.
            let t_pre = (t - epsilon).max(0.).max(last_t);
            let pre = PwlPoint::new(t_pre, current.voltage(vdd));
            if out.last() != Some(&pre) {
                out.push(pre);
            }
            out.push(PwlPoint::new(t, level.voltage(vdd)));
            current = level;
        }
        BitTrace { points: out }
    }

    /// Time of the last breakpoint.
    #[inline]
    pub fn end_time(&self) -> f64 {
        self.points.last().map_or(0., |p| p.time)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
