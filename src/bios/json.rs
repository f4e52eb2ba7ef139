//! BIOS JSON directory ingestion (spec §6 "Configuration surface"):
//! `enum_attrs.json`, `string_attrs.json`, `integer_attrs.json`, each an
//! array of named attribute descriptors. A malformed file is logged and
//! skipped (spec §7) — the same per-file degrade-and-continue discipline
//! `pdr::json` applies to PDR descriptors.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::warn;
use serde::Deserialize;

use crate::error::JsonIngestError;

use super::registry::BiosAttributeRegistry;
use super::types::{EnumAttribute, IntegerAttribute, StringAttribute, StringEncoding};

#[derive(Debug, Deserialize)]
struct RawEnumAttr {
    name: String,
    #[serde(default)]
    read_only: bool,
    possible_values: Vec<String>,
    #[serde(default)]
    default_values: Vec<String>,
    /// Explicit object-value → attribute-string map; when absent, built
    /// positionally from `possible_values` (spec §9 "populateMapping" —
    /// JSON array order is preserved by `serde_json`, so this is a
    /// straight `possible_values.iter().enumerate()` zip rather than a
    /// hand-kept position counter).
    #[serde(default)]
    dbus_value_map: Option<HashMap<String, String>>,
}

impl RawEnumAttr {
    fn into_attribute(self) -> Result<(String, EnumAttribute), JsonIngestError> {
        let dbus_value_map = self.dbus_value_map.unwrap_or_else(|| {
            self.possible_values
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect()
        });
        let attr = EnumAttribute {
            read_only: self.read_only,
            possible_values: self.possible_values,
            default_values: self.default_values,
            dbus_value_map,
        };
        attr.validate().map_err(|e| JsonIngestError(e.to_string()))?;
        Ok((self.name, attr))
    }
}

#[derive(Debug, Deserialize)]
struct RawStringAttr {
    name: String,
    #[serde(default)]
    read_only: bool,
    encoding: StringEncoding,
    min_len: u16,
    max_len: u16,
    default_len: u16,
    #[serde(default)]
    default: String,
}

impl RawStringAttr {
    fn into_attribute(self) -> Result<(String, StringAttribute), JsonIngestError> {
        let attr = StringAttribute {
            read_only: self.read_only,
            encoding: self.encoding,
            min_len: self.min_len,
            max_len: self.max_len,
            default_len: self.default_len,
            default: self.default,
        };
        attr.validate().map_err(|e| JsonIngestError(e.to_string()))?;
        Ok((self.name, attr))
    }
}

#[derive(Debug, Deserialize)]
struct RawIntegerAttr {
    name: String,
    #[serde(default)]
    read_only: bool,
    lower: i64,
    upper: i64,
    scalar_increment: i64,
    default: i64,
}

impl RawIntegerAttr {
    fn into_attribute(self) -> Result<(String, IntegerAttribute), JsonIngestError> {
        let attr = IntegerAttribute {
            read_only: self.read_only,
            lower: self.lower,
            upper: self.upper,
            scalar_increment: self.scalar_increment,
            default: self.default,
        };
        attr.validate().map_err(|e| JsonIngestError(e.to_string()))?;
        Ok((self.name, attr))
    }
}

fn load_file<T, F, A>(path: &Path, into_attribute: F) -> HashMap<String, A>
where
    T: for<'de> Deserialize<'de>,
    F: Fn(T) -> Result<(String, A), JsonIngestError>,
{
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("BIOS descriptor {} unreadable, skipping: {e}", path.display());
            return HashMap::new();
        }
    };
    let raw: Vec<T> = match serde_json::from_str(&text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("BIOS descriptor {} malformed, skipping: {e}", path.display());
            return HashMap::new();
        }
    };
    let mut out = HashMap::with_capacity(raw.len());
    for entry in raw {
        match into_attribute(entry) {
            Ok((name, attr)) => {
                out.insert(name, attr);
            }
            Err(e) => {
                warn!("BIOS descriptor {} rejected, skipping file: {e}", path.display());
                return HashMap::new();
            }
        }
    }
    out
}

/// Loads `enum_attrs.json`/`string_attrs.json`/`integer_attrs.json` from
/// `dir` and calls `registry.setup_config` once with whatever parsed.
pub fn load_directory(registry: &mut BiosAttributeRegistry, dir: &Path) {
    let enums = load_file::<RawEnumAttr, _, _>(&dir.join("enum_attrs.json"), RawEnumAttr::into_attribute);
    let strings = load_file::<RawStringAttr, _, _>(&dir.join("string_attrs.json"), RawStringAttr::into_attribute);
    let integers =
        load_file::<RawIntegerAttr, _, _>(&dir.join("integer_attrs.json"), RawIntegerAttr::into_attribute);
    if let Err(e) = registry.setup_config(enums, strings, integers) {
        warn!("BIOS registry setup_config failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("pldm-platform-bios-json-{tag}-{:?}", std::thread::current().id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn ingests_enum_and_integer_descriptors() {
        let dir = scratch_dir("ok");
        let mut enum_file = fs::File::create(dir.join("enum_attrs.json")).unwrap();
        write!(
            enum_file,
            r#"[{{ "name": "boot_mode", "possible_values": ["Normal", "Setup"], "default_values": ["Normal"] }}]"#
        )
        .unwrap();
        let mut int_file = fs::File::create(dir.join("integer_attrs.json")).unwrap();
        write!(
            int_file,
            r#"[{{ "name": "fan_speed", "lower": 0, "upper": 100, "scalar_increment": 5, "default": 50 }}]"#
        )
        .unwrap();

        let mut registry = BiosAttributeRegistry::new();
        load_directory(&mut registry, &dir);
        assert_eq!(registry.attribute_count(), 2);
        assert!(registry.enum_attribute("boot_mode").is_some());
        assert!(registry.integer_attribute("fan_speed").is_some());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_file_does_not_fail_the_whole_directory() {
        let dir = scratch_dir("bad");
        fs::write(dir.join("enum_attrs.json"), "{ not json").unwrap();
        let mut int_file = fs::File::create(dir.join("integer_attrs.json")).unwrap();
        write!(
            int_file,
            r#"[{{ "name": "fan_speed", "lower": 0, "upper": 100, "scalar_increment": 5, "default": 50 }}]"#
        )
        .unwrap();

        let mut registry = BiosAttributeRegistry::new();
        load_directory(&mut registry, &dir);
        assert_eq!(registry.attribute_count(), 1);
        assert!(registry.enum_attribute("boot_mode").is_none());

        fs::remove_dir_all(&dir).ok();
    }
}
