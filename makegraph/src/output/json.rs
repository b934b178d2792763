// SPDX-License-Identifier: GPL-3.0-or-later

//! This module contains functions to serialize and deserialize the native
//! build configuration as a JSON document.

use std::io;

use super::NativeBuildConfig;

/// Serialize the configuration as a pretty printed JSON object.
pub fn to_writer<W: io::Write>(writer: W, config: &NativeBuildConfig) -> Result<(), serde_json::Error> {
    serde_json::to_writer_pretty(writer, config)
}

/// Deserialize the configuration from a JSON object.
pub fn from_reader<R: io::Read>(reader: R) -> Result<NativeBuildConfig, serde_json::Error> {
    serde_json::from_reader(reader)
}
