use crate::error::{Error, Result};

const DESIGNATORS: [(char, u64); 3] = [('H', 3600), ('M', 60), ('S', 1)];

/// Parses `PT[nH][nM][nS]` into whole seconds.
///
/// Every component is optional (absent means zero) but the order is fixed and
/// nothing may follow the last component.
pub fn parse_duration(text: &str) -> Result<u64> {
    let malformed = || Error::MalformedDuration(text.to_string());

    let mut rest = text.strip_prefix("PT").ok_or_else(malformed)?;
    let mut total = 0u64;
    for (designator, scale) in DESIGNATORS {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || rest[digits..].chars().next() != Some(designator) {
            continue;
        }
        let value = rest[..digits].parse::<u64>().map_err(|_| malformed())?;
        total = value
            .checked_mul(scale)
            .and_then(|component| total.checked_add(component))
            .ok_or_else(malformed)?;
        rest = &rest[digits + 1..];
    }

    if !rest.is_empty() {
        return Err(malformed());
    }
    Ok(total)
}

/// Inverse of [`parse_duration`]; zero components are omitted.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "PT0S".to_string();
    }
    let mut out = String::from("PT");
    let mut remaining = seconds;
    for (designator, scale) in DESIGNATORS {
        let value = remaining / scale;
        remaining %= scale;
        if value > 0 {
            out.push_str(&value.to_string());
            out.push(designator);
        }
    }
    out
}

/// Renders elapsed seconds as `H:MM:SS`, or `MM:SS` below one hour.
pub fn format_elapsed(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00".to_string();
    }
    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_components() {
        assert_eq!(parse_duration("PT1H2M3S").unwrap(), 3723);
    }

    #[test]
    fn test_parse_subsets() {
        assert_eq!(parse_duration("PT10M").unwrap(), 600);
        assert_eq!(parse_duration("PT45S").unwrap(), 45);
        assert_eq!(parse_duration("PT2H").unwrap(), 7200);
        assert_eq!(parse_duration("PT1H30S").unwrap(), 3630);
        assert_eq!(parse_duration("PT").unwrap(), 0);
    }

    #[test]
    fn test_parse_rejects_other_notations() {
        for text in ["", "1H2M", "P1D", "PT1.5S", "PT5M3H", "PT3S ", "PTxS", "pt1s"] {
            assert_eq!(
                parse_duration(text),
                Err(Error::MalformedDuration(text.to_string())),
                "{text:?} should not parse"
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(parse_duration("PT99999999999999999999H").is_err());
    }

    #[test]
    fn test_format_duration_inverts_parse() {
        for (h, m, s) in [(0, 0, 0), (0, 0, 59), (0, 10, 0), (1, 0, 1), (26, 59, 59)] {
            let seconds = h * 3600 + m * 60 + s;
            assert_eq!(parse_duration(&format_duration(seconds)).unwrap(), seconds);
        }
        assert_eq!(format_duration(3630), "PT1H30S");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0.0), "00:00");
        assert_eq!(format_elapsed(-12.0), "00:00");
        assert_eq!(format_elapsed(59.99), "00:59");
        assert_eq!(format_elapsed(600.0), "10:00");
        assert_eq!(format_elapsed(3661.0), "1:01:01");
    }
}
