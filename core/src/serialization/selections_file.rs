use crate::model::{Selection, SelectionLabel, Selector};
use crate::prelude::{CoreError, CoreResult};
use crate::serialization::text::format_float;
use crate::store::files::write_atomic;
use crate::telemetry::EntityLog;
use std::fs;
use std::path::Path;

const SEPARATOR: &str = "    ";

fn join_values(values: impl Iterator<Item = f64>) -> String {
    values.map(format_float).collect::<Vec<_>>().join(",")
}

/// One line per closed selection:
/// `type    element    weight_factor    scatter    x1,x2,..;y1,y2,..`.
pub fn selections_text(selector: &Selector) -> String {
    let mut text = String::new();
    for selection in selector.closed_selections() {
        let Some(label) = selection.label() else {
            continue;
        };
        let scatter = label
            .scatter_element
            .as_ref()
            .map(|element| element.to_string())
            .unwrap_or_else(|| "None".to_string());
        let xs = join_values(selection.points().iter().map(|point| point.0));
        let ys = join_values(selection.points().iter().map(|point| point.1));
        let fields = [
            label.selection_type.to_string(),
            label.element.to_string(),
            format_float(label.weight_factor),
            scatter,
            format!("{};{}", xs, ys),
        ];
        text.push_str(&fields.join(SEPARATOR));
        text.push('\n');
    }
    text
}

fn parse_values(text: &str) -> Result<Vec<f64>, String> {
    text.split(',')
        .map(|value| value.trim().parse::<f64>().map_err(|err| err.to_string()))
        .collect()
}

fn parse_line(line: &str) -> Result<Selection, String> {
    let fields: Vec<&str> = line.split(SEPARATOR).map(str::trim).collect();
    let [selection_type, element, weight_factor, scatter, points] = fields[..] else {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    };
    let (xs, ys) = points
        .split_once(';')
        .ok_or_else(|| "points lack ';' separator".to_string())?;
    let xs = parse_values(xs)?;
    let ys = parse_values(ys)?;
    if xs.len() != ys.len() {
        return Err("x and y lists differ in length".to_string());
    }

    let label = SelectionLabel {
        element: element.parse()?,
        selection_type: selection_type.parse()?,
        weight_factor: weight_factor.parse().map_err(|err| format!("{}", err))?,
        scatter_element: match scatter {
            "None" | "" => None,
            other => Some(other.parse()?),
        },
    };
    Selection::closed(xs.into_iter().zip(ys).collect(), label).map_err(|err| err.to_string())
}

/// Parses selections text. Malformed lines are logged and skipped.
pub fn parse_selections(text: &str, log: &EntityLog) -> Vec<Selection> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(number, line)| match parse_line(line) {
            Ok(selection) => Some(selection),
            Err(reason) => {
                log.warn(&format!("Skipping selection on line {}: {}", number + 1, reason));
                None
            }
        })
        .collect()
}

pub fn write_selections(path: &Path, selector: &Selector) -> CoreResult<()> {
    write_atomic(path, selections_text(selector).as_bytes())
}

pub fn read_selections(path: &Path, log: &EntityLog) -> CoreResult<Vec<Selection>> {
    let text = fs::read_to_string(path).map_err(|err| CoreError::io(path, err))?;
    Ok(parse_selections(&text, log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SelectionType;

    fn selector_with_square() -> Selector {
        let mut selector = Selector::new();
        for point in [(0.0, 0.0), (0.0, 10.0), (10.5, 10.0), (10.0, 0.0)] {
            selector.add_point(point);
        }
        let mut label = SelectionLabel::erd("4He".parse().unwrap());
        label.selection_type = SelectionType::Rbs;
        label.scatter_element = Some("35Cl".parse().unwrap());
        selector.close_open(label).unwrap();
        selector.add_point((1.0, 1.0));
        selector
    }

    #[test]
    fn only_closed_selections_are_written() {
        let text = selections_text(&selector_with_square());
        assert_eq!(
            text,
            "RBS    4He    1.0    35Cl    0.0,0.0,10.5,10.0;0.0,10.0,10.0,0.0\n"
        );
    }

    #[test]
    fn parse_reads_back_and_skips_garbage() {
        let mut text = selections_text(&selector_with_square());
        text.push_str("ERD    H    1.0\n");
        let selections = parse_selections(&text, &EntityLog::new("test"));
        assert_eq!(selections.len(), 1);
        let label = selections[0].label().unwrap();
        assert_eq!(label.selection_type, SelectionType::Rbs);
        assert_eq!(selections[0].points()[2], (10.5, 10.0));
    }
}
