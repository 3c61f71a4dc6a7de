//! Identifier and free text cleaning.

/// Prefix some ERP systems put in front of customer identifiers.
pub const ERP_CUSTOMER_PREFIX: &str = "NAS";

pub fn trim(raw: Option<&str>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
}

/// Removes `prefix` from the start of `raw` when present.
pub fn strip_prefix(raw: Option<&str>, prefix: &str) -> Option<String> {
    raw.map(|value| value.strip_prefix(prefix).unwrap_or(value).to_string())
}

/// Removes every `-` from a location identifier.
pub fn remove_dashes(raw: Option<&str>) -> Option<String> {
    raw.map(|value| value.replace('-', ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_stripped_only_at_start() {
        assert_eq!(
            strip_prefix(Some("NASAW00011000"), ERP_CUSTOMER_PREFIX).as_deref(),
            Some("AW00011000")
        );
        assert_eq!(
            strip_prefix(Some("AWNAS1"), ERP_CUSTOMER_PREFIX).as_deref(),
            Some("AWNAS1")
        );
        assert_eq!(strip_prefix(None, ERP_CUSTOMER_PREFIX), None);
    }

    #[test]
    fn dashes_are_removed_and_names_trimmed() {
        assert_eq!(
            remove_dashes(Some("AW-00011000")).as_deref(),
            Some("AW00011000")
        );
        assert_eq!(trim(Some("  Jon ")).as_deref(), Some("Jon"));
        assert_eq!(trim(None), None);
    }
}
