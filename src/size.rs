const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
const BASE: f64 = 1024.0;

/// Human-readable file size using base-1024 units and two decimals.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".into();
    }

    // floor(log1024(bytes)) in integer arithmetic, clamped to the unit table.
    let mut index = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && index < UNITS.len() - 1 {
        scaled /= 1024;
        index += 1;
    }

    format!("{:.2} {}", bytes as f64 / BASE.powi(index as i32), UNITS[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(1), "1.00 Bytes");
        assert_eq!(format_bytes(1023), "1023.00 Bytes");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
        assert_eq!(format_bytes(5_000_000), "4.77 MB");
        assert_eq!(format_bytes(1 << 30), "1.00 GB");
    }

    #[test]
    fn test_units_are_clamped() {
        assert_eq!(format_bytes(1 << 40), "1024.00 GB");
    }
}
