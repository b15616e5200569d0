use std::time::Duration;

use crate::command::run_with_timeout;
use crate::size::{numeric_prefix, within_tolerance};
use crate::DetectString;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScsiDevice {
    pub identifier: String, // vendor/model text, e.g. "ATA SAMSUNG MZ7LM480 404Q"
    pub size: String,       // trailing size column, e.g. "480GB"
    pub path: String,       // /dev node, or an opaque id on misbehaving controllers
}

pub fn detect_device(descriptor: &DetectString, timeout: Duration) -> Option<String> {
    let output = match run_with_timeout("lsscsi", &["-s"], timeout) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("Failed to run lsscsi: {}", err);
            return None;
        }
    };
    if !output.success() {
        eprintln!("Failed to run lsscsi: {}", output.failure_reason());
        return None;
    }
    select_device(descriptor, &parse_listing(&output.stdout))
}

// lsscsi -s -> one line per device:
//   [0:0:0:0]  disk  ATA  SAMSUNG MZ7LM480  404Q  /dev/sda  480GB
// type is the 2nd column, path and size the last two; everything between
// is the vendor/model identifier.
pub fn parse_listing(raw: &str) -> Vec<ScsiDevice> {
    let mut devices = Vec::new();
    for line in raw.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 4 || tokens[1] != "disk" {
            continue;
        }
        devices.push(ScsiDevice {
            identifier: tokens[2..tokens.len() - 2].join(" "),
            size: tokens[tokens.len() - 1].to_string(),
            path: tokens[tokens.len() - 2].to_string(),
        });
    }
    devices
}

pub fn select_device(descriptor: &DetectString, devices: &[ScsiDevice]) -> Option<String> {
    let size = canonical_size(&descriptor.size, devices);
    let name = descriptor.name.to_lowercase();
    let candidates: Vec<&ScsiDevice> = devices
        .iter()
        .filter(|device| device.identifier.to_lowercase().contains(&name))
        .filter(|device| device.size == size)
        .collect();
    candidates
        .get(descriptor.index)
        .map(|device| device.path.clone())
}

// The requested size is a rounded marketing figure; snap it to the first
// reported size token (in listing order) whose numeric part it lands within
// tolerance of, then match that token exactly. With no fit the request text
// is kept as-is, which simply matches nothing.
fn canonical_size(requested: &str, devices: &[ScsiDevice]) -> String {
    let Some(requested_value) = numeric_prefix(requested) else {
        return requested.to_string();
    };
    let mut seen: Vec<&str> = Vec::new();
    for device in devices {
        if seen.contains(&device.size.as_str()) {
            continue;
        }
        seen.push(&device.size);
        let Some(reported_value) = numeric_prefix(&device.size) else {
            continue;
        };
        if within_tolerance(requested_value, reported_value) {
            return device.size.clone();
        }
    }
    requested.to_string()
}
