// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observation configuration fixtures.
//!
//! Assign-resources and scan-config templates are JSON files whose IDs
//! (scan ID, scheduling-block and processing-block IDs) must be fresh on
//! every run to avoid collisions in the system under test. These helpers
//! read a template, substitute fresh IDs in place and write it back.
//!
//! Processing-block IDs carry a trailing five-digit counter, optionally
//! followed by a `-<non-digit>` suffix (`pb-mvp01-20200325-00001` or
//! `pb-mvp01-20200325-00001-a`); only that counter is rewritten.

use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{ParseError, Result};

/// Matches a trailing five-digit counter, keeping any `-<non-digit>`
/// suffix in the second capture group.
fn counter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{5})(-\D|$)").expect("counter pattern is a valid regex")
    })
}

/// Entropy for generated counters; nothing here needs cryptographic or
/// reproducible randomness, only collision avoidance between runs.
#[allow(clippy::cast_possible_truncation)]
fn random_counter() -> u32 {
    (Uuid::new_v4().as_u128() % 100_000) as u32
}

fn set_trailing_counter(id: &str, counter: u32) -> String {
    counter_regex()
        .replace(id, |caps: &Captures<'_>| {
            format!("{counter:05}{}", &caps[2])
        })
        .into_owned()
}

fn trailing_counter_value(id: &str) -> Option<u32> {
    counter_regex()
        .captures(id)
        .and_then(|caps| caps[1].parse().ok())
}

/// Replaces an ID's trailing five-digit counter with a fresh one.
///
/// IDs without a recognizable counter are returned unchanged.
#[must_use]
pub fn refresh_trailing_counter(id: &str) -> String {
    set_trailing_counter(id, random_counter())
}

/// Reads a configuration file, validating that it holds JSON.
///
/// Returns the raw text, which is what device commands take as their
/// argument payload.
///
/// # Errors
///
/// Fails on I/O errors and when the file is not valid JSON.
pub fn load_config_from_file(path: impl AsRef<Path>) -> Result<String> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str::<Value>(&text).map_err(ParseError::Json)?;
    Ok(text)
}

/// Refreshes the IDs in an assign-resources template in place.
///
/// The scheduling-block ID and every processing-block ID get a fresh
/// counter; processing blocks after the first follow the first one
/// sequentially, and dependency back-references are fixed up to point at
/// the first block's new ID. Returns the new scheduling-block ID.
///
/// # Errors
///
/// Fails on I/O errors and when the template lacks the `sdp` structure.
pub fn update_resource_config_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let mut data: Value = serde_json::from_str(&text).map_err(ParseError::Json)?;

    let sdp = data
        .get_mut("sdp")
        .ok_or_else(|| ParseError::MissingField("sdp".to_string()))?;

    let sb_id = sdp
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::MissingField("sdp.id".to_string()))?;
    let new_sb_id = refresh_trailing_counter(sb_id);
    sdp["id"] = json!(new_sb_id);

    let blocks = sdp
        .get_mut("processing_blocks")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| ParseError::MissingField("sdp.processing_blocks".to_string()))?;

    let mut first_block_id = String::new();
    let mut base_counter = 0_u32;
    for (index, block) in blocks.iter_mut().enumerate() {
        let old_id = block
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ParseError::MissingField(format!("sdp.processing_blocks[{index}].id"))
            })?
            .to_string();

        let new_id = if index == 0 {
            let fresh = refresh_trailing_counter(&old_id);
            base_counter = trailing_counter_value(&fresh).unwrap_or(0);
            first_block_id = fresh.clone();
            fresh
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let counter = base_counter.wrapping_add(index as u32) % 100_000;
            set_trailing_counter(&first_block_id, counter)
        };
        block["id"] = json!(new_id);
    }

    for block in blocks.iter_mut() {
        if let Some(dependencies) = block
            .get_mut("dependencies")
            .and_then(Value::as_array_mut)
        {
            for dependency in dependencies.iter_mut().filter_map(Value::as_object_mut) {
                dependency.insert("pb_id".to_string(), json!(first_block_id));
            }
        }
    }

    tracing::debug!(path = %path.display(), sb_id = %new_sb_id, "resource config refreshed");
    std::fs::write(path, serde_json::to_string(&data).map_err(ParseError::Json)?)?;
    Ok(new_sb_id)
}

/// Refreshes the IDs in a scan-config template in place.
///
/// Picks a fresh scan ID, stamps the realtime processing ID (or the given
/// scheduling-block ID) into the SDP configure section and keys the scan
/// parameters by the new scan ID.
///
/// # Errors
///
/// Fails on I/O errors and when the template is not valid JSON.
pub fn update_scan_config_file(
    path: impl AsRef<Path>,
    sdp_block: Option<&str>,
) -> Result<()> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let mut data: Value = serde_json::from_str(&text).map_err(ParseError::Json)?;

    let scan_id = 100 + random_counter() % 900;
    data.as_object_mut()
        .ok_or_else(|| ParseError::UnexpectedFormat("top-level JSON object expected".to_string()))?
        .insert("scanID".to_string(), json!(scan_id));

    if let Some(configure) = data
        .pointer_mut("/sdp/configure/0")
        .and_then(Value::as_object_mut)
    {
        let id = sdp_block.map_or_else(
            || {
                format!(
                    "realtime-{}-{:05}",
                    chrono::Local::now().format("%Y%m%d"),
                    random_counter()
                )
            },
            ToString::to_string,
        );
        configure.insert("id".to_string(), json!(id));
        configure.insert(
            "scanParameters".to_string(),
            json!({ scan_id.to_string(): { "fieldId": 1, "intervalMs": 1400 } }),
        );
    }

    tracing::debug!(path = %path.display(), scan_id, "scan config refreshed");
    std::fs::write(path, serde_json::to_string(&data).map_err(ParseError::Json)?)?;
    Ok(())
}
