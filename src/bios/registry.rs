//! BIOS Attribute Registry (spec §4.5): three name-keyed tables, populated
//! once by idempotent `setup_config`, exposing current/default value
//! lookup against an object-bus property source supplied by the caller.

use std::collections::HashMap;

use crate::error::{PldmError, PldmResult};

use super::types::{EnumAttribute, IntegerAttribute, StringAttribute};

/// The seam an outer object-bus binding implements so the registry can
/// resolve "current value" against a live property instead of the
/// static default (spec §4.5).
pub trait BiosPropertySource {
    fn enum_property(&self, attribute_name: &str) -> Option<String>;
    fn string_property(&self, attribute_name: &str) -> Option<String>;
    fn integer_property(&self, attribute_name: &str) -> Option<i64>;
}

/// A source with no live properties; every lookup resolves to the
/// attribute's static default. Useful before the object-bus binding is up.
#[derive(Debug, Default)]
pub struct NoProperties;

impl BiosPropertySource for NoProperties {
    fn enum_property(&self, _attribute_name: &str) -> Option<String> {
        None
    }
    fn string_property(&self, _attribute_name: &str) -> Option<String> {
        None
    }
    fn integer_property(&self, _attribute_name: &str) -> Option<i64> {
        None
    }
}

#[derive(Debug, Default)]
pub struct BiosAttributeRegistry {
    enums: HashMap<String, EnumAttribute>,
    strings: HashMap<String, StringAttribute>,
    integers: HashMap<String, IntegerAttribute>,
}

impl BiosAttributeRegistry {
    pub fn new() -> Self {
        BiosAttributeRegistry::default()
    }

    /// Populates the three tables from already-parsed, already-validated
    /// descriptors. Idempotent: once the registry holds any attribute, a
    /// further call is a no-op returning `Ok(())` (spec §4.5).
    pub fn setup_config(
        &mut self,
        enums: HashMap<String, EnumAttribute>,
        strings: HashMap<String, StringAttribute>,
        integers: HashMap<String, IntegerAttribute>,
    ) -> PldmResult<()> {
        if !self.is_empty() {
            return Ok(());
        }
        self.enums = enums;
        self.strings = strings;
        self.integers = integers;
        Ok(())
    }

    pub fn attribute_count(&self) -> usize {
        self.enums.len() + self.strings.len() + self.integers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_count() == 0
    }

    /// The count reported to callers, with the "-1 on fully empty
    /// registry" convention (spec §7).
    pub fn reported_attribute_count(&self) -> i64 {
        if self.is_empty() {
            -1
        } else {
            self.attribute_count() as i64
        }
    }

    pub fn enum_attribute(&self, name: &str) -> Option<&EnumAttribute> {
        self.enums.get(name)
    }

    pub fn string_attribute(&self, name: &str) -> Option<&StringAttribute> {
        self.strings.get(name)
    }

    pub fn integer_attribute(&self, name: &str) -> Option<&IntegerAttribute> {
        self.integers.get(name)
    }

    pub fn current_enum_value(&self, name: &str, source: &dyn BiosPropertySource) -> PldmResult<String> {
        let attr = self
            .enums
            .get(name)
            .ok_or_else(|| PldmError::invalid_data(format!("no enum attribute named {name:?}")))?;
        Ok(attr.current_value(source.enum_property(name).as_deref()))
    }

    pub fn current_string_value(&self, name: &str, source: &dyn BiosPropertySource) -> PldmResult<String> {
        let attr = self
            .strings
            .get(name)
            .ok_or_else(|| PldmError::invalid_data(format!("no string attribute named {name:?}")))?;
        Ok(attr.current_value(source.string_property(name).as_deref()))
    }

    pub fn current_integer_value(&self, name: &str, source: &dyn BiosPropertySource) -> PldmResult<i64> {
        let attr = self
            .integers
            .get(name)
            .ok_or_else(|| PldmError::invalid_data(format!("no integer attribute named {name:?}")))?;
        Ok(attr.current_value(source.integer_property(name)))
    }
}
