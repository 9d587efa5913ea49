use crate::model::{Element, SelectionLabel, SelectionType};
use crate::prelude::{CoreError, CoreResult};
use crate::serialization::text::format_float;
use crate::store::files::write_atomic;
use std::fs;
use std::path::Path;

const POINTS_HEADER: &str = "ToF, Energy, Event number";

/// One event inside a selection. `event` is the 1-based event number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutPoint {
    pub x: u32,
    pub y: u32,
    pub event: u64,
}

/// Events of one closed selection together with the selection's element information.
#[derive(Debug, Clone, PartialEq)]
pub struct CutFile {
    pub label: SelectionLabel,
    pub points: Vec<CutPoint>,
}

impl CutFile {
    /// File name `<measurement>.<element>.<ERD|RBS_scatter>.<index>.cut`.
    pub fn file_name(measurement: &str, label: &SelectionLabel, index: usize) -> String {
        format!(
            "{}.{}.{}.{}.cut",
            measurement,
            label.element.label(),
            label.file_tag(),
            index
        )
    }

    pub fn to_text(&self) -> String {
        let scatter = self
            .label
            .scatter_element
            .as_ref()
            .map(|element| element.to_string())
            .unwrap_or_default();
        let mut text = format!(
            "Count: {}\nType: {}\nWeight Factor: {}\nEnergy: 0\nDetector Angle: 0\n\
             Scatter Element: {}\nElement losses: False\nSplit count: 0\n\n{}\n",
            self.points.len(),
            self.label.selection_type,
            format_float(self.label.weight_factor),
            scatter,
            POINTS_HEADER,
        );
        for point in &self.points {
            text.push_str(&format!("{} {} {}\n", point.x, point.y, point.event));
        }
        text
    }

    /// Parses cut text. The element is not part of the text and comes from the file name.
    pub fn from_text(path: &Path, element: Element, text: &str) -> CoreResult<Self> {
        let mut label = SelectionLabel::erd(element);
        let mut count = None;
        let mut lines = text.lines();

        for line in lines.by_ref() {
            if line.trim() == POINTS_HEADER {
                break;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "Count" => {
                    count = Some(value.parse::<usize>().map_err(|err| CoreError::parse(path, err))?)
                }
                "Type" => {
                    label.selection_type =
                        value.parse::<SelectionType>().map_err(|err| CoreError::parse(path, err))?
                }
                "Weight Factor" => {
                    label.weight_factor = value.parse().map_err(|err| CoreError::parse(path, err))?
                }
                "Scatter Element" if !value.is_empty() => {
                    label.scatter_element =
                        Some(value.parse().map_err(|err| CoreError::parse(path, err))?)
                }
                _ => {}
            }
        }

        let mut points = Vec::new();
        for line in lines.filter(|line| !line.trim().is_empty()) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [x, y, event] = fields[..] else {
                return Err(CoreError::parse(path, format!("bad cut line '{}'", line)));
            };
            points.push(CutPoint {
                x: x.parse().map_err(|err| CoreError::parse(path, err))?,
                y: y.parse().map_err(|err| CoreError::parse(path, err))?,
                event: event.parse().map_err(|err| CoreError::parse(path, err))?,
            });
        }

        if let Some(count) = count {
            if count != points.len() {
                return Err(CoreError::parse(
                    path,
                    format!("header says {} events, found {}", count, points.len()),
                ));
            }
        }
        Ok(Self { label, points })
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        write_atomic(path, self.to_text().as_bytes())
    }

    /// Loads a cut file, taking the element from the second dot-separated
    /// field of the file name. An `RBS_<scatter>` type field supplies the
    /// scatter element when the header has none.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut fields = file_name.split('.').skip(1);
        let element = fields
            .next()
            .ok_or_else(|| CoreError::parse(path, "cut file name has no element field"))?
            .parse::<Element>()
            .map_err(|err| CoreError::parse(path, err))?;
        let text = fs::read_to_string(path).map_err(|err| CoreError::io(path, err))?;
        let mut cut = Self::from_text(path, element, &text)?;
        if let Some(scatter) = fields.next().and_then(|tag| tag.strip_prefix("RBS_")) {
            if cut.label.scatter_element.is_none() {
                cut.label.selection_type = SelectionType::Rbs;
                cut.label.scatter_element =
                    Some(scatter.parse().map_err(|err| CoreError::parse(path, err))?);
            }
        }
        Ok(cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_cut() -> CutFile {
        let mut label = SelectionLabel::erd("4He".parse().unwrap());
        label.weight_factor = 2.0;
        CutFile {
            label,
            points: vec![
                CutPoint { x: 5, y: 5, event: 1 },
                CutPoint { x: 0, y: 0, event: 3 },
            ],
        }
    }

    #[test]
    fn text_has_header_and_points() {
        let text = sample_cut().to_text();
        assert!(text.starts_with("Count: 2\nType: ERD\nWeight Factor: 2.0\n"));
        assert!(text.ends_with("ToF, Energy, Event number\n5 5 1\n0 0 3\n"));
    }

    #[test]
    fn load_reads_back_saved_cut() {
        let dir = TempDir::new().unwrap();
        let cut = sample_cut();
        let path = dir.path().join(CutFile::file_name("m", &cut.label, 0));
        assert!(path.ends_with("m.4He.ERD.0.cut"));
        cut.save(&path).unwrap();
        assert_eq!(CutFile::load(&path).unwrap(), cut);
    }

    #[test]
    fn rbs_cut_name_carries_scatter_element() {
        let dir = TempDir::new().unwrap();
        let mut cut = sample_cut();
        cut.label.selection_type = SelectionType::Rbs;
        cut.label.scatter_element = Some("Cl".parse().unwrap());
        let path = dir.path().join(CutFile::file_name("mesu1", &cut.label, 1));
        assert!(path.ends_with("mesu1.4He.RBS_Cl.1.cut"));
        cut.save(&path).unwrap();
        assert_eq!(CutFile::load(&path).unwrap(), cut);

        let text = cut.to_text().replace("Scatter Element: Cl", "Scatter Element: ");
        fs::write(&path, text).unwrap();
        let loaded = CutFile::load(&path).unwrap();
        assert_eq!(loaded.label.scatter_element, Some("Cl".parse().unwrap()));
    }

    #[test]
    fn count_mismatch_is_a_parse_error() {
        let text = sample_cut().to_text().replace("Count: 2", "Count: 5");
        let result = CutFile::from_text(Path::new("x.cut"), "H".parse().unwrap(), &text);
        assert!(matches!(result, Err(CoreError::Parse { .. })));
    }
}
