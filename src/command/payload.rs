// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of inbound command payloads.

use crate::error::PayloadError;
use crate::types::Device;

/// The target set named by an inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPayload {
    /// Act on the current roster.
    Roster,
    /// Act on exactly these devices, bypassing the roster.
    Devices(Vec<Device>),
}

impl CommandPayload {
    /// Decodes a raw MQTT payload.
    ///
    /// # Errors
    ///
    /// Returns error if the payload is neither blank nor a JSON list of
    /// device descriptors.
    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::Roster);
        }

        let devices: Vec<Device> = serde_json::from_slice(payload)?;
        Ok(Self::Devices(devices))
    }

    /// Returns the explicit targets, or `None` for the roster.
    #[must_use]
    pub fn targets(&self) -> Option<&[Device]> {
        match self {
            Self::Roster => None,
            Self::Devices(devices) => Some(devices),
        }
    }
}
