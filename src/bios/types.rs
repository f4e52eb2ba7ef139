//! BIOS attribute descriptor shapes (spec §4.5). Each kind is validated
//! via the corresponding PLDM BIOS "-info" check on construction, the
//! same place `pdr::types` validates payload shapes while parsing.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::PldmError;

/// PLDM BIOS string encoding (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StringEncoding {
    Unknown,
    #[serde(rename = "ASCII")]
    Ascii,
    Hex,
    #[serde(rename = "UTF-8")]
    Utf8,
    #[serde(rename = "UTF-16LE")]
    Utf16Le,
    #[serde(rename = "UTF-16BE")]
    Utf16Be,
    VendorSpecific,
}

/// `{ read_only, possible_values, default_values, dbus_value_map }` (spec
/// §4.5). Current value resolves the object-bus property string through
/// `dbus_value_map`; an unmapped or absent property falls back to the
/// first of `default_values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumAttribute {
    pub read_only: bool,
    pub possible_values: Vec<String>,
    pub default_values: Vec<String>,
    pub dbus_value_map: HashMap<String, String>,
}

impl EnumAttribute {
    pub fn validate(&self) -> Result<(), PldmError> {
        if self.possible_values.is_empty() {
            return Err(PldmError::invalid_data("enum attribute has no possible_values"));
        }
        for d in &self.default_values {
            if !self.possible_values.contains(d) {
                return Err(PldmError::invalid_data(format!(
                    "enum default value {d:?} is not among possible_values"
                )));
            }
        }
        for v in self.dbus_value_map.values() {
            if !self.possible_values.contains(v) {
                return Err(PldmError::invalid_data(format!(
                    "dbus_value_map targets {v:?}, which is not among possible_values"
                )));
            }
        }
        Ok(())
    }

    /// Resolves the current attribute string for an observed object-bus
    /// property value, falling back to the default (spec §4.5).
    pub fn current_value(&self, object_value: Option<&str>) -> String {
        object_value
            .and_then(|v| self.dbus_value_map.get(v))
            .cloned()
            .or_else(|| self.default_values.first().cloned())
            .unwrap_or_default()
    }
}

/// `{ read_only, encoding, min_len, max_len, default_len, default }` (spec
/// §4.5), validated via the standard PLDM BIOS string-info check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringAttribute {
    pub read_only: bool,
    pub encoding: StringEncoding,
    pub min_len: u16,
    pub max_len: u16,
    pub default_len: u16,
    pub default: String,
}

impl StringAttribute {
    pub fn validate(&self) -> Result<(), PldmError> {
        if self.min_len > self.max_len {
            return Err(PldmError::invalid_data(format!(
                "string attribute min_len {} exceeds max_len {}",
                self.min_len, self.max_len
            )));
        }
        if self.default_len < self.min_len || self.default_len > self.max_len {
            return Err(PldmError::invalid_data(format!(
                "string attribute default_len {} outside [{}, {}]",
                self.default_len, self.min_len, self.max_len
            )));
        }
        if self.default.chars().count() as u16 != self.default_len {
            return Err(PldmError::invalid_data(format!(
                "string attribute default {:?} does not match declared default_len {}",
                self.default, self.default_len
            )));
        }
        Ok(())
    }

    pub fn current_value(&self, object_value: Option<&str>) -> String {
        object_value.map(str::to_owned).unwrap_or_else(|| self.default.clone())
    }
}

/// `{ read_only, lower, upper, scalar_increment, default }` (spec §4.5),
/// validated via the standard PLDM BIOS integer-info check:
/// `scalar_increment` must evenly divide `(upper - lower)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerAttribute {
    pub read_only: bool,
    pub lower: i64,
    pub upper: i64,
    pub scalar_increment: i64,
    pub default: i64,
}

impl IntegerAttribute {
    pub fn validate(&self) -> Result<(), PldmError> {
        if self.lower > self.upper {
            return Err(PldmError::invalid_data(format!(
                "integer attribute lower {} exceeds upper {}",
                self.lower, self.upper
            )));
        }
        if self.scalar_increment <= 0 {
            return Err(PldmError::invalid_data("integer attribute scalar_increment must be positive"));
        }
        if (self.upper - self.lower) % self.scalar_increment != 0 {
            return Err(PldmError::invalid_data(format!(
                "scalar_increment {} does not divide (upper - lower) = {}",
                self.scalar_increment,
                self.upper - self.lower
            )));
        }
        if self.default < self.lower || self.default > self.upper {
            return Err(PldmError::invalid_data(format!(
                "integer attribute default {} outside [{}, {}]",
                self.default, self.lower, self.upper
            )));
        }
        Ok(())
    }

    pub fn current_value(&self, object_value: Option<i64>) -> i64 {
        object_value.unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_current_value_falls_back_to_default_when_unmapped() {
        let attr = EnumAttribute {
            read_only: false,
            possible_values: vec!["Normal".into(), "Setup".into()],
            default_values: vec!["Normal".into()],
            dbus_value_map: HashMap::new(),
        };
        assert_eq!(attr.current_value(Some("unmapped")), "Normal");
    }

    #[test]
    fn enum_default_must_be_a_possible_value() {
        let attr = EnumAttribute {
            read_only: false,
            possible_values: vec!["Normal".into()],
            default_values: vec!["Setup".into()],
            dbus_value_map: HashMap::new(),
        };
        assert!(attr.validate().is_err());
    }

    #[test]
    fn integer_scalar_increment_must_divide_range() {
        let attr = IntegerAttribute {
            read_only: false,
            lower: 0,
            upper: 10,
            scalar_increment: 3,
            default: 0,
        };
        assert!(attr.validate().is_err());

        let ok = IntegerAttribute { scalar_increment: 5, ..attr };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn string_default_len_must_match_default() {
        let attr = StringAttribute {
            read_only: false,
            encoding: StringEncoding::Ascii,
            min_len: 0,
            max_len: 8,
            default_len: 3,
            default: "hullo".into(),
        };
        assert!(attr.validate().is_err());
    }
}
