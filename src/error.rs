// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Fatal error conditions.
//!
//! Malformed timing text never ends up here: format problems are
//! recovered at the smallest scope and reported through the log.
//! Only filesystem and configuration failures abort a conversion.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Tim2SpiceError>;

#[derive(Debug, Error)]
pub enum Tim2SpiceError {
    /// The timing input does not exist or is not a file.
    #[error("input file {0:?} does not exist")]
    MissingInput(PathBuf),

    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML mapping file is malformed.
    #[error("invalid mapping file {path:?}: {source}")]
    Mapping {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A configuration value is out of range, e.g. a negative VDD.
    #[error("invalid configuration: {0}")]
    Config(String),
}
