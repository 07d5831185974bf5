//! Canonical patient identifiers.
//!
//! Patient ids are UUIDs in canonical form: **32 lowercase hexadecimal characters** (no
//! hyphens), the same value `Uuid::new_v4().simple().to_string()` produces. Externally supplied
//! ids (API paths, CLI args) must already be canonical; other forms are rejected rather than
//! normalised so that path derivation is deterministic.
//!
//! Patient directories are sharded as `parent_dir/<u[0..2]>/<u[2..4]>/<u>/` to limit fan-out.

use crate::TypeError;
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PatientId(Uuid);

impl Default for PatientId {
    fn default() -> Self {
        Self::new()
    }
}

impl PatientId {
    /// Generates a new random patient id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates a patient id that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidPatientId`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        if !Self::is_canonical(input) {
            return Err(TypeError::InvalidPatientId(input.to_string()));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|_| TypeError::InvalidPatientId(input.to_string()))
    }

    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/`.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.to_string();
        parent_dir
            .join(&canonical[0..2])
            .join(&canonical[2..4])
            .join(&canonical)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for PatientId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for PatientId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for PatientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PatientId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_canonical() {
        let id = PatientId::new();
        assert!(PatientId::is_canonical(&id.to_string()));
    }

    #[test]
    fn rejects_hyphenated_form() {
        let err = PatientId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap_err();
        assert!(matches!(err, TypeError::InvalidPatientId(_)));
    }

    #[test]
    fn rejects_uppercase() {
        assert!(PatientId::parse("550E8400E29B41D4A716446655440000").is_err());
    }

    #[test]
    fn sharded_dir_uses_two_prefix_levels() {
        let temp = tempfile::tempdir().unwrap();
        let id = PatientId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let dir = id.sharded_dir(temp.path());
        assert_eq!(
            dir,
            temp.path()
                .join("55")
                .join("0e")
                .join("550e8400e29b41d4a716446655440000")
        );
    }
}
