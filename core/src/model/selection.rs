use crate::math::polygon::Polygon;
use crate::model::element::Element;
use crate::prelude::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;

/// Kind of particles a selection picks out of the histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionType {
    #[default]
    Erd,
    Rbs,
}

impl fmt::Display for SelectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionType::Erd => f.write_str("ERD"),
            SelectionType::Rbs => f.write_str("RBS"),
        }
    }
}

impl FromStr for SelectionType {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim() {
            "ERD" => Ok(SelectionType::Erd),
            "RBS" => Ok(SelectionType::Rbs),
            other => Err(format!("unknown selection type '{}'", other)),
        }
    }
}

/// Element information attached to a selection when it is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionLabel {
    pub element: Element,
    pub selection_type: SelectionType,
    pub weight_factor: f64,
    pub scatter_element: Option<Element>,
}

impl SelectionLabel {
    pub fn erd(element: Element) -> Self {
        Self {
            element,
            selection_type: SelectionType::Erd,
            weight_factor: 1.0,
            scatter_element: None,
        }
    }

    /// Type field of cut file names: `ERD`, or `RBS_<scatter element>`.
    pub fn file_tag(&self) -> String {
        match (self.selection_type, &self.scatter_element) {
            (SelectionType::Erd, _) => SelectionType::Erd.to_string(),
            (SelectionType::Rbs, Some(scatter)) => format!("{}_{}", SelectionType::Rbs, scatter.label()),
            (SelectionType::Rbs, None) => SelectionType::Rbs.to_string(),
        }
    }
}

/// Ordered polygon drawn over the (ToF, energy) histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    points: Vec<(f64, f64)>,
    label: Option<SelectionLabel>,
}

impl Selection {
    fn open() -> Self {
        Self {
            points: Vec::new(),
            label: None,
        }
    }

    /// Builds an already closed selection, e.g. when loading from disk.
    pub fn closed(points: Vec<(f64, f64)>, label: SelectionLabel) -> CoreResult<Self> {
        Polygon::new(points.clone())?;
        Ok(Self {
            points,
            label: Some(label),
        })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.label.is_some()
    }

    pub fn label(&self) -> Option<&SelectionLabel> {
        self.label.as_ref()
    }

    pub fn polygon(&self) -> CoreResult<Polygon> {
        Polygon::new(self.points.clone())
    }
}

/// Result of adding a point to the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPoint {
    /// A new open selection was started with this point.
    Started,
    /// The point was appended to the open selection.
    Appended,
}

/// Ordered list of selections belonging to one measurement. At most one
/// selection is open at a time and it is always the last one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    selections: Vec<Selection>,
    selected: Option<usize>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_closed(selections: Vec<Selection>) -> Self {
        Self {
            selections: selections.into_iter().filter(Selection::is_closed).collect(),
            selected: None,
        }
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn closed_selections(&self) -> impl Iterator<Item = &Selection> {
        self.selections.iter().filter(|selection| selection.is_closed())
    }

    pub fn count(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn get_at(&self, index: usize) -> Option<&Selection> {
        self.selections.get(index)
    }

    fn open_selection_mut(&mut self) -> Option<&mut Selection> {
        self.selections.last_mut().filter(|selection| !selection.is_closed())
    }

    pub fn has_open(&self) -> bool {
        self.selections.last().is_some_and(|selection| !selection.is_closed())
    }

    pub fn add_point(&mut self, point: (f64, f64)) -> AddPoint {
        if let Some(open) = self.open_selection_mut() {
            open.points.push(point);
            return AddPoint::Appended;
        }
        let mut selection = Selection::open();
        selection.points.push(point);
        self.selections.push(selection);
        AddPoint::Started
    }

    /// Removes the last point of the open selection, dropping the selection
    /// once it has no points left.
    pub fn undo_point(&mut self) -> CoreResult<()> {
        let open = self
            .open_selection_mut()
            .ok_or_else(|| CoreError::Consistency("no open selection to undo".into()))?;
        open.points.pop();
        if open.points.is_empty() {
            self.selections.pop();
        }
        Ok(())
    }

    /// Closes the open selection and attaches its element information.
    pub fn close_open(&mut self, label: SelectionLabel) -> CoreResult<usize> {
        let index = self.selections.len().saturating_sub(1);
        let open = self
            .open_selection_mut()
            .ok_or_else(|| CoreError::Consistency("no open selection to close".into()))?;
        Polygon::new(open.points.clone())?;
        open.label = Some(label);
        Ok(index)
    }

    /// Removes the open selection, if any.
    pub fn purge(&mut self) {
        if self.has_open() {
            self.selections.pop();
        }
    }

    pub fn remove_all(&mut self) {
        self.selections.clear();
        self.selected = None;
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Selects the first closed selection containing `point`.
    pub fn select(&mut self, point: (f64, f64)) -> Option<usize> {
        self.selected = self.selections.iter().position(|selection| {
            selection.is_closed()
                && selection
                    .polygon()
                    .map(|polygon| polygon.contains(point.0, point.1))
                    .unwrap_or(false)
        });
        self.selected
    }

    pub fn reset_select(&mut self) {
        self.selected = None;
    }

    pub fn remove_selected(&mut self) -> Option<Selection> {
        let index = self.selected.take()?;
        if index < self.selections.len() {
            Some(self.selections.remove(index))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_square(selector: &mut Selector, offset: f64, element: &str) {
        for point in [(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)] {
            selector.add_point((point.0 + offset, point.1 + offset));
        }
        selector
            .close_open(SelectionLabel::erd(element.parse().unwrap()))
            .unwrap();
    }

    #[test]
    fn file_tag_carries_type_and_scatter() {
        let mut label = SelectionLabel::erd("He".parse().unwrap());
        assert_eq!(label.file_tag(), "ERD");
        label.selection_type = SelectionType::Rbs;
        assert_eq!(label.file_tag(), "RBS");
        label.scatter_element = Some("Cl".parse().unwrap());
        assert_eq!(label.file_tag(), "RBS_Cl");
    }

    #[test]
    fn first_point_starts_a_selection() {
        let mut selector = Selector::new();
        assert_eq!(selector.add_point((1.0, 1.0)), AddPoint::Started);
        assert_eq!(selector.add_point((2.0, 1.0)), AddPoint::Appended);
        assert!(selector.has_open());
        assert_eq!(selector.count(), 1);
    }

    #[test]
    fn undo_without_open_selection_is_a_consistency_error() {
        let mut selector = Selector::new();
        assert!(matches!(
            selector.undo_point(),
            Err(CoreError::Consistency(_))
        ));
        closed_square(&mut selector, 0.0, "H");
        assert!(selector.undo_point().is_err());
    }

    #[test]
    fn undo_removes_empty_selection() {
        let mut selector = Selector::new();
        selector.add_point((1.0, 1.0));
        selector.undo_point().unwrap();
        assert!(selector.is_empty());
    }

    #[test]
    fn closing_needs_a_polygon() {
        let mut selector = Selector::new();
        selector.add_point((1.0, 1.0));
        selector.add_point((2.0, 2.0));
        assert!(selector
            .close_open(SelectionLabel::erd("H".parse().unwrap()))
            .is_err());
        assert!(selector.has_open());
    }

    #[test]
    fn select_and_remove_selected() {
        let mut selector = Selector::new();
        closed_square(&mut selector, 0.0, "H");
        closed_square(&mut selector, 100.0, "C");
        assert_eq!(selector.select((105.0, 105.0)), Some(1));
        let removed = selector.remove_selected().unwrap();
        assert_eq!(removed.label().unwrap().element.symbol, "C");
        assert_eq!(selector.count(), 1);
        assert_eq!(selector.select((500.0, 500.0)), None);
    }

    #[test]
    fn purge_drops_only_the_open_selection() {
        let mut selector = Selector::new();
        closed_square(&mut selector, 0.0, "H");
        selector.add_point((50.0, 50.0));
        selector.purge();
        assert_eq!(selector.count(), 1);
        assert!(!selector.has_open());
    }
}
