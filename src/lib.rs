// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Conversion of GTKWave timing dumps (`.tim`) into SPICE stimulus
//! decks built from piecewise-linear voltage sources.

pub mod error;

pub mod bits;

pub mod tim;

pub mod pwl;

pub mod config;

pub mod expand;

pub mod synth;

pub mod filter;

pub mod deck;
