use serde::{Deserialize, Serialize};
use std::fmt;

/// Cross-section model used by the depth-profile analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CrossSection {
    Rutherford,
    LEcuyer,
    Andersen,
}

impl CrossSection {
    pub fn flag(self) -> u8 {
        match self {
            CrossSection::Rutherford => 1,
            CrossSection::LEcuyer => 2,
            CrossSection::Andersen => 3,
        }
    }
}

impl TryFrom<u8> for CrossSection {
    type Error = String;

    fn try_from(flag: u8) -> Result<Self, Self::Error> {
        match flag {
            1 => Ok(CrossSection::Rutherford),
            2 => Ok(CrossSection::LEcuyer),
            3 => Ok(CrossSection::Andersen),
            other => Err(format!("unknown cross section flag {}", other)),
        }
    }
}

impl From<CrossSection> for u8 {
    fn from(value: CrossSection) -> Self {
        value.flag()
    }
}

impl fmt::Display for CrossSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrossSection::Rutherford => "Rutherford",
            CrossSection::LEcuyer => "L'Ecuyer",
            CrossSection::Andersen => "Andersen",
        };
        f.write_str(name)
    }
}

/// Program-wide settings that are not tied to any entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub cross_section: CrossSection,
    pub num_iterations: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            cross_section: CrossSection::Andersen,
            num_iterations: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_section_uses_numeric_flags() {
        let settings: GlobalSettings =
            serde_json::from_str(r#"{"cross_section": 1}"#).unwrap();
        assert_eq!(settings.cross_section, CrossSection::Rutherford);
        assert_eq!(settings.num_iterations, 3);
        assert!(serde_json::from_str::<GlobalSettings>(r#"{"cross_section": 9}"#).is_err());
    }
}
