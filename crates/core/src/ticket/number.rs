//! Human-readable ticket numbers (`T-00001`, `T-00002`, ...).
//!
//! Numbers are derived from a monotonically increasing sequence owned by the
//! store. The sequence never goes backwards, so a number is never handed out
//! twice, even after the ticket that held it has been soft-deleted.

/// Prefix shared by every generated ticket number.
pub const TICKET_NUMBER_PREFIX: &str = "T-";

/// Minimum digit width of the sequence part.
const SEQUENCE_WIDTH: usize = 5;

/// Format a sequence value as a ticket number.
pub fn format_ticket_number(sequence: i64) -> String {
    format!(
        "{}{:0width$}",
        TICKET_NUMBER_PREFIX,
        sequence,
        width = SEQUENCE_WIDTH
    )
}

/// Extract the sequence value from a generated ticket number.
///
/// Returns `None` for numbers that were not produced by [`format_ticket_number`].
pub fn parse_ticket_number(number: &str) -> Option<i64> {
    let digits = number.strip_prefix(TICKET_NUMBER_PREFIX)?;
    if digits.len() < SEQUENCE_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Returns true if `number` has the generated `T-NNNNN` shape.
pub fn is_generated_number(number: &str) -> bool {
    parse_ticket_number(number).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_to_five_digits() {
        assert_eq!(format_ticket_number(1), "T-00001");
        assert_eq!(format_ticket_number(42), "T-00042");
        assert_eq!(format_ticket_number(99999), "T-99999");
    }

    #[test]
    fn test_format_grows_past_five_digits() {
        assert_eq!(format_ticket_number(100000), "T-100000");
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse_ticket_number("T-00001"), Some(1));
        assert_eq!(parse_ticket_number("T-100000"), Some(100000));
        assert_eq!(parse_ticket_number("T-1"), None);
        assert_eq!(parse_ticket_number("X-00001"), None);
        assert_eq!(parse_ticket_number("T-0000a"), None);
        assert_eq!(parse_ticket_number("T--0001"), None);
    }

    #[test]
    fn test_is_generated_number() {
        assert!(is_generated_number(&format_ticket_number(7)));
        assert!(!is_generated_number("LEGACY-7"));
    }
}
