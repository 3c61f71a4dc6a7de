//! Decomposition of compound product keys such as `CO-RF-FR-R92B-58`.

const CATEGORY_PREFIX_LEN: usize = 5;

const PRODUCT_NUMBER_OFFSET: usize = 6;

/// Returns the category id: the first five characters with `-` replaced by `_`.
///
/// Keys shorter than five characters are returned unmodified.
pub fn category_id(raw: &str) -> String {
    if raw.chars().count() < CATEGORY_PREFIX_LEN {
        return raw.to_string();
    }

    raw.chars()
        .take(CATEGORY_PREFIX_LEN)
        .map(|c| if c == '-' { '_' } else { c })
        .collect()
}

/// Returns the product number: every character after the sixth.
///
/// Keys of six characters or less are returned unmodified.
pub fn product_number(raw: &str) -> String {
    if raw.chars().count() <= PRODUCT_NUMBER_OFFSET {
        return raw.to_string();
    }

    raw.chars().skip(PRODUCT_NUMBER_OFFSET).collect()
}
