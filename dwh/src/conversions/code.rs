//! Code to label mappings.

/// Label used for unknown, blank or missing codes and attributes.
pub const NOT_AVAILABLE: &str = "n/a";

/// A fixed mapping from upper case codes to labels.
#[derive(Debug, Clone, Copy)]
pub struct CodeTable {
    entries: &'static [(&'static str, &'static str)],
}

impl CodeTable {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// Returns the label of `raw` after trimming and upper casing it, or [`NOT_AVAILABLE`].
    pub fn label(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw else {
            return NOT_AVAILABLE.to_string();
        };

        let code = raw.trim().to_uppercase();
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

pub const MARITAL_STATUS: CodeTable = CodeTable::new(&[("M", "Married"), ("S", "Single")]);

pub const CRM_GENDER: CodeTable = CodeTable::new(&[("F", "Female"), ("M", "Male")]);

pub const ERP_GENDER: CodeTable = CodeTable::new(&[
    ("F", "Female"),
    ("FEMALE", "Female"),
    ("M", "Male"),
    ("MALE", "Male"),
]);

pub const PRODUCT_LINE: CodeTable = CodeTable::new(&[
    ("M", "Mountain"),
    ("R", "Road"),
    ("S", "Other Sales"),
    ("T", "Touring"),
]);

/// Normalizes a country code to a country name.
///
/// Known codes are matched exactly after trimming. Unknown values are kept trimmed, blank
/// or missing values become [`NOT_AVAILABLE`].
pub fn country_label(raw: Option<&str>) -> String {
    let country = raw.map(str::trim).unwrap_or_default();

    match country {
        "" => NOT_AVAILABLE.to_string(),
        "DE" => "Germany".to_string(),
        "US" | "USA" => "United States".to_string(),
        other => other.to_string(),
    }
}
