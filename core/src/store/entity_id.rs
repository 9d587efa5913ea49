use crate::prelude::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum width of the serial field in directory names. Larger serials
/// use as many digits as they need.
const SERIAL_WIDTH: usize = 2;

/// Kind of entity that owns a numbered directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Sample,
    Measurement,
    Simulation,
}

impl EntityKind {
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Sample => "Sample_",
            EntityKind::Measurement => "Measurement_",
            EntityKind::Simulation => "MC_simulation_",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Sample => "sample",
            EntityKind::Measurement => "measurement",
            EntityKind::Simulation => "simulation",
        };
        f.write_str(name)
    }
}

/// Serial number of an entity together with its kind.
///
/// This is the only place that knows how serials are encoded in directory
/// names (`<Prefix><NN>-<name>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub kind: EntityKind,
    pub serial: u32,
}

impl EntityId {
    pub fn new(kind: EntityKind, serial: u32) -> Self {
        Self { kind, serial }
    }

    pub fn dir_name(&self, name: &str) -> String {
        format!("{}{:02}-{}", self.kind.prefix(), self.serial, name)
    }

    /// Parses a directory name of the given kind into its id and entity name.
    pub fn parse(kind: EntityKind, dir_name: &str) -> CoreResult<(Self, String)> {
        let rest = dir_name.strip_prefix(kind.prefix()).ok_or_else(|| {
            CoreError::Consistency(format!("'{}' is not a {} directory", dir_name, kind))
        })?;
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits < SERIAL_WIDTH {
            return Err(CoreError::Consistency(format!(
                "'{}' has no serial number",
                dir_name
            )));
        }
        let serial = rest[..digits].parse::<u32>().map_err(|err| {
            CoreError::Consistency(format!(
                "couldn't read serial number from '{}': {}",
                dir_name, err
            ))
        })?;
        let tail = &rest[digits..];
        let name = tail.strip_prefix('-').unwrap_or(tail).to_string();
        Ok((Self::new(kind, serial), name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_zero_padded_serial() {
        let id = EntityId::new(EntityKind::Measurement, 3);
        assert_eq!(id.dir_name("run-a"), "Measurement_03-run-a");
        let id = EntityId::new(EntityKind::Simulation, 12);
        assert_eq!(id.dir_name("x"), "MC_simulation_12-x");
    }

    #[test]
    fn parses_serial_and_keeps_dashes_in_name() {
        let (id, name) = EntityId::parse(EntityKind::Sample, "Sample_07-thin-film").unwrap();
        assert_eq!(id, EntityId::new(EntityKind::Sample, 7));
        assert_eq!(name, "thin-film");
    }

    #[test]
    fn serials_past_two_digits_round_trip() {
        let id = EntityId::new(EntityKind::Sample, 100);
        assert_eq!(id.dir_name("x"), "Sample_100-x");
        let (parsed, name) = EntityId::parse(EntityKind::Sample, "Sample_100-x").unwrap();
        assert_eq!(parsed, id);
        assert_eq!(name, "x");
        let (parsed, name) = EntityId::parse(EntityKind::Measurement, "Measurement_1234-10-b").unwrap();
        assert_eq!(parsed.serial, 1234);
        assert_eq!(name, "10-b");
    }

    #[test]
    fn rejects_non_numeric_serial_field() {
        assert!(matches!(
            EntityId::parse(EntityKind::Sample, "Sample_ab-x"),
            Err(CoreError::Consistency(_))
        ));
        assert!(EntityId::parse(EntityKind::Sample, "Measurement_01-x").is_err());
        assert!(EntityId::parse(EntityKind::Sample, "Sample_1").is_err());
    }
}
