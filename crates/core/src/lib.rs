use anyhow::{anyhow, Context, Result};
use std::time::Duration;

pub mod command;
pub mod nvme;
pub mod scsi;
pub mod size;

pub const DETECT_TAG: &str = "detect";
pub const DEV_PATH_PREFIX: &str = "/dev";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectString {
    pub name: String,  // case-insensitive substring of the device model/vendor
    pub size: String,  // human-readable capacity, e.g. "480GB" or "1.92TB"
    pub index: usize,  // ordinal among equally-matching devices
}

impl DetectString {
    pub fn parse(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.split(':').collect();
        if fields.len() != 4 {
            return Err(anyhow!(
                "malformed detect string {:?}: expected detect:<name>:<size>:<index>",
                raw
            ));
        }
        if fields[0] != DETECT_TAG {
            return Err(anyhow!(
                "detect string {:?} does not begin with \"{}:\"",
                raw,
                DETECT_TAG
            ));
        }
        let index = fields[3]
            .parse::<usize>()
            .with_context(|| format!("invalid device index {:?} in {:?}", fields[3], raw))?;
        Ok(Self {
            name: fields[1].to_string(),
            size: fields[2].to_string(),
            index,
        })
    }
}

// lsscsi first. Some NVMe controllers show up there with an identifier that
// is not a usable path, so anything outside /dev falls through to the nvme
// listing, and the final answer is shape-checked the same way.
pub fn resolve(descriptor: &DetectString, timeout: Duration) -> Option<String> {
    scsi::detect_device(descriptor, timeout)
        .filter(|path| path.starts_with(DEV_PATH_PREFIX))
        .or_else(|| nvme::detect_device(descriptor, timeout))
        .filter(|path| path.starts_with(DEV_PATH_PREFIX))
}
