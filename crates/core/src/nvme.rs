use std::time::Duration;

use serde::Deserialize;

use crate::command::run_with_timeout;
use crate::size::{parse_size_bytes, within_tolerance};
use crate::DetectString;

// nvme list --output-format json -> {"Devices": [...]}; fields beyond the
// three used here vary by nvme-cli version and are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct NvmeListing {
    #[serde(default, rename = "Devices")]
    pub devices: Vec<NvmeDevice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NvmeDevice {
    #[serde(rename = "ModelNumber")]
    pub model_number: String,
    #[serde(rename = "PhysicalSize")]
    pub physical_size: u64,
    #[serde(rename = "DevicePath")]
    pub device_path: String,
}

pub fn detect_device(descriptor: &DetectString, timeout: Duration) -> Option<String> {
    let Some(requested_bytes) = parse_size_bytes(&descriptor.size) else {
        eprintln!(
            "Size {:?} is not <integer><kB|MB|GB|TB|PB>; skipping nvme detection",
            descriptor.size
        );
        return None;
    };
    let output = match run_with_timeout("nvme", &["list", "--output-format", "json"], timeout) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("Failed to run nvme: {}", err);
            return None;
        }
    };
    if !output.success() {
        eprintln!("Failed to run nvme: {}", output.failure_reason());
        return None;
    }
    let listing: NvmeListing = match serde_json::from_str(&output.stdout) {
        Ok(listing) => listing,
        Err(err) => {
            eprintln!("Unreadable nvme listing: {}", err);
            return None;
        }
    };
    select_device(descriptor, requested_bytes, &listing.devices)
}

pub fn select_device(
    descriptor: &DetectString,
    requested_bytes: u64,
    devices: &[NvmeDevice],
) -> Option<String> {
    let size = canonical_size(requested_bytes, devices)?;
    let name = descriptor.name.to_lowercase();
    let candidates: Vec<&NvmeDevice> = devices
        .iter()
        .filter(|device| device.model_number.to_lowercase().contains(&name))
        .filter(|device| device.physical_size == size)
        .collect();
    candidates
        .get(descriptor.index)
        .map(|device| device.device_path.clone())
}

// Exact byte counts, so unlike the lsscsi path there is no text fallback:
// no reported size within tolerance of the request means not found.
fn canonical_size(requested_bytes: u64, devices: &[NvmeDevice]) -> Option<u64> {
    let requested = requested_bytes as f64;
    let mut seen: Vec<u64> = Vec::new();
    for device in devices {
        if seen.contains(&device.physical_size) {
            continue;
        }
        seen.push(device.physical_size);
        if within_tolerance(device.physical_size as f64, requested) {
            return Some(device.physical_size);
        }
    }
    None
}
