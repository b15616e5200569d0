// Size handling for the two inventory sources: lsscsi reports rounded
// marketing strings ("480GB", "1.92TB"), nvme reports exact byte counts.

pub const SIZE_TOLERANCE: f64 = 0.03;

pub fn within_tolerance(value: f64, center: f64) -> bool {
    value >= center * (1.0 - SIZE_TOLERANCE) && value <= center * (1.0 + SIZE_TOLERANCE)
}

// Leading digits-and-dots of a size token, e.g. "1.92TB" -> 1.92.
pub fn numeric_prefix(token: &str) -> Option<f64> {
    let end = token
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(token.len());
    token[..end].parse::<f64>().ok()
}

const BYTE_UNITS: [(&str, u64); 5] = [
    ("kB", 1_000),
    ("MB", 1_000_000),
    ("GB", 1_000_000_000),
    ("TB", 1_000_000_000_000),
    ("PB", 1_000_000_000_000_000),
];

// Strict grammar: integer magnitude immediately followed by one of the
// decimal units above. Anything else is None, never an error.
pub fn parse_size_bytes(token: &str) -> Option<u64> {
    for (unit, multiplier) in BYTE_UNITS {
        let Some(magnitude) = token.strip_suffix(unit) else {
            continue;
        };
        if magnitude.is_empty() || !magnitude.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        return magnitude.parse::<u64>().ok()?.checked_mul(multiplier);
    }
    None
}
