//! String-keyed configuration values with display units.
//!
//! Numbers are stored in the units they were declared with and converted to
//! internal SI units when read, so a persisted document stays readable
//! (`{"D": {"value": 5.0, "units": "nmi"}}`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ParameterError;
use crate::units;

const UNSPECIFIED: &str = "unspecified";

fn unspecified() -> String {
    UNSPECIFIED.to_string()
}

fn is_unspecified(u: &str) -> bool {
    u == UNSPECIFIED
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub value: ParameterValue,
    #[serde(default = "unspecified", skip_serializing_if = "is_unspecified")]
    pub units: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterData {
    entries: BTreeMap<String, ParameterEntry>,
}

impl ParameterData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an internal-unit value, displayed in `unit`.
    pub fn set_internal(&mut self, key: &str, value: f64, unit: &str) {
        self.entries.insert(
            key.to_string(),
            ParameterEntry {
                value: ParameterValue::Number(units::to(unit, value)),
                units: unit.to_string(),
            },
        );
    }

    /// Store a unitless number.
    pub fn set_value(&mut self, key: &str, value: f64) {
        self.set_internal(key, value, UNSPECIFIED);
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(
            key.to_string(),
            ParameterEntry {
                value: ParameterValue::Text(value.into()),
                units: unspecified(),
            },
        );
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.entries.insert(
            key.to_string(),
            ParameterEntry {
                value: ParameterValue::Bool(value),
                units: unspecified(),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Numeric value in internal units.
    pub fn get_value(&self, key: &str) -> Option<f64> {
        match self.entries.get(key)? {
            ParameterEntry {
                value: ParameterValue::Number(v),
                units: u,
            } => Some(units::from(u, *v)),
            _ => None,
        }
    }

    pub fn get_units(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.units.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match &self.entries.get(key)?.value {
            ParameterValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key)?.value {
            ParameterValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Numeric value in internal units, failing if the key holds something
    /// else.
    pub fn require_value(&self, key: &str) -> Result<Option<f64>, ParameterError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(ParameterEntry {
                value: ParameterValue::Number(_),
                ..
            }) => Ok(self.get_value(key)),
            Some(_) => Err(ParameterError::WrongType {
                key: key.to_string(),
                expected: "a number",
            }),
        }
    }

    /// Copy entries from `other`. Existing keys are kept unless `overwrite`.
    pub fn copy_from(&mut self, other: &ParameterData, overwrite: bool) {
        for (k, v) in &other.entries {
            if overwrite || !self.entries.contains_key(k) {
                self.entries.insert(k.clone(), v.clone());
            }
        }
    }

    /// Same keys, units and values, numbers compared to within round-off.
    pub fn almost_equals(&self, other: &ParameterData) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().zip(&other.entries).all(|((ka, a), (kb, b))| {
                ka == kb
                    && a.units == b.units
                    && match (&a.value, &b.value) {
                        (ParameterValue::Number(x), ParameterValue::Number(y)) => {
                            crate::util::almost_equals(*x, *y)
                        }
                        (x, y) => x == y,
                    }
            })
    }

    /// Every numeric entry must use a known unit.
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (key, entry) in &self.entries {
            if matches!(entry.value, ParameterValue::Number(_)) && !units::is_known(&entry.units) {
                return Err(ParameterError::UnknownUnit {
                    key: key.clone(),
                    unit: entry.units.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ParameterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, ParameterError> {
        let data: ParameterData = serde_json::from_str(s)?;
        data.validate()?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_convert_through_units() {
        let mut p = ParameterData::new();
        p.set_internal("D", 9260.0, "nmi");
        assert_eq!(p.get_units("D"), Some("nmi"));
        assert!((p.get_value("D").unwrap() - 9260.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_round_trip() {
        let mut p = ParameterData::new();
        p.set_internal("H", 304.8, "ft");
        p.set_string("id", "wx");
        p.set_bool("enabled", true);
        let json = p.to_json().unwrap();
        assert!(json.contains("\"ft\""));
        let back = ParameterData::from_json(&json).unwrap();
        assert_eq!(back.get_string("id"), Some("wx"));
        assert_eq!(back.get_bool("enabled"), Some(true));
        assert!((back.get_value("H").unwrap() - 304.8).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_unit_rejected_on_load() {
        let err = ParameterData::from_json(r#"{"D": {"value": 5.0, "units": "leagues"}}"#)
            .unwrap_err();
        assert!(matches!(err, ParameterError::UnknownUnit { .. }));
    }

    #[test]
    fn test_wrong_type() {
        let mut p = ParameterData::new();
        p.set_string("timeStep", "fast");
        assert!(p.get_value("timeStep").is_none());
        assert!(matches!(
            p.require_value("timeStep"),
            Err(ParameterError::WrongType { .. })
        ));
        assert!(matches!(p.require_value("missing"), Ok(None)));
    }

    #[test]
    fn test_copy_without_overwrite() {
        let mut a = ParameterData::new();
        a.set_value("x", 1.0);
        let mut b = ParameterData::new();
        b.set_value("x", 2.0);
        b.set_value("y", 3.0);
        a.copy_from(&b, false);
        assert_eq!(a.get_value("x"), Some(1.0));
        assert_eq!(a.get_value("y"), Some(3.0));
    }
}
