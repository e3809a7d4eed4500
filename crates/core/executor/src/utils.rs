use crate::MIN_ADDRESS;

/// Format a machine word for display.
///
/// Words that look like addresses are shown in hex, everything else in decimal.
#[must_use]
pub fn format_word(value: u64) -> String {
    if value >= MIN_ADDRESS {
        format!("{value:#x}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_word() {
        assert_eq!(format_word(0), "0");
        assert_eq!(format_word(24), "24");
        assert_eq!(format_word(0xfff), "4095");
        assert_eq!(format_word(0x1000), "0x1000");
        assert_eq!(format_word(0xff98), "0xff98");
    }
}
