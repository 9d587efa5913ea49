use crate::math::narrow::EventValue;
use crate::math::polygon::Polygon;
use crate::model::{Selection, Selector};
use crate::prelude::{CancelFlag, CoreResult};
use crate::processing::events::{rows, EventData};
use crate::processing::mask_pool::MaskPool;
use crate::serialization::cut_file::{CutFile, CutPoint};
use crate::serialization::selections_file::write_selections;
use crate::store::files::{remove_if_exists, remove_matching_files};
use crate::store::layout::MeasurementLayout;
use crate::telemetry::{Counts, EntityLog, OperationCounters};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Element label, type field (`ERD` or `RBS_<scatter>`) and index among
/// selections sharing both.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CutKey {
    pub element: String,
    pub kind: String,
    pub index: usize,
}

impl fmt::Display for CutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.element, self.kind, self.index)
    }
}

/// Outcome of an extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub cuts: BTreeMap<CutKey, CutFile>,
    pub written: Vec<PathBuf>,
    pub removed: usize,
    pub counts: Counts,
}

fn select_events<T: EventValue>(
    data: &Array2<T>,
    polygon: &Polygon,
    mask: &mut [bool],
) -> CoreResult<Vec<CutPoint>> {
    let (xs, ys) = rows(data);
    polygon.contains_all(xs, ys, mask)?;
    Ok(mask
        .iter()
        .enumerate()
        .filter(|(_, inside)| **inside)
        .map(|(index, _)| {
            let x: u64 = xs[index].into();
            let y: u64 = ys[index].into();
            CutPoint {
                x: x as u32,
                y: y as u32,
                event: index as u64 + 1,
            }
        })
        .collect())
}

/// Computes the cut of every closed selection in memory.
///
/// Each selection is tested once against all events; cancellation is
/// checked between selections. Selections with no events inside produce
/// no cut. Keys number the selections of one element and type field from
/// zero in selector order.
pub fn compute_cuts(
    events: &EventData,
    selections: &[Selection],
    cancel: &CancelFlag,
    pool: &mut MaskPool,
    counters: &OperationCounters,
) -> CoreResult<BTreeMap<CutKey, CutFile>> {
    let mut cuts = BTreeMap::new();
    let mut per_kind: BTreeMap<(String, String), usize> = BTreeMap::new();

    for selection in selections {
        cancel.check()?;
        let Some(label) = selection.label() else {
            counters.record_skipped();
            continue;
        };
        let element = label.element.label();
        let kind = label.file_tag();
        let slot = per_kind.entry((element.clone(), kind.clone())).or_insert(0);
        let index = *slot;
        *slot += 1;

        let polygon = selection.polygon()?;
        let mut mask = pool.checkout(events.len());
        let points = match events {
            EventData::U8(data) => select_events(data, &polygon, &mut mask),
            EventData::U16(data) => select_events(data, &polygon, &mut mask),
            EventData::U32(data) => select_events(data, &polygon, &mut mask),
        };
        pool.release(mask);
        let points = points?;

        if points.is_empty() {
            counters.record_skipped();
            continue;
        }
        counters.record_processed();
        cuts.insert(
            CutKey {
                element,
                kind,
                index,
            },
            CutFile {
                label: label.clone(),
                points,
            },
        );
    }
    Ok(cuts)
}

/// Removes every cut and element-loss split file of a measurement.
pub fn clear_cuts(layout: &MeasurementLayout) -> CoreResult<usize> {
    Ok(remove_matching_files(&layout.cuts_dir(), "cut")?
        + remove_matching_files(&layout.changes_dir(), "cut")?)
}

/// Extracts cut files of a measurement from its closed selections.
///
/// All cuts are computed before any file is touched, so a cancelled run
/// leaves the previous cuts in place. Old cuts are then removed and the new
/// ones written together with the `.selections` file. With no closed
/// selections the cuts and the `.selections` file are removed.
pub fn extract(
    layout: &MeasurementLayout,
    measurement_name: &str,
    events: &EventData,
    selector: &Selector,
    cancel: &CancelFlag,
    log: &EntityLog,
) -> CoreResult<ExtractionReport> {
    let selections_path = layout.selections_file(measurement_name);
    let counters = OperationCounters::new();
    let closed: Vec<Selection> = selector.closed_selections().cloned().collect();

    if closed.is_empty() {
        let removed = clear_cuts(layout)?;
        remove_if_exists(&selections_path)?;
        log.info(&format!("No selections, removed {} cut files.", removed));
        return Ok(ExtractionReport {
            cuts: BTreeMap::new(),
            written: Vec::new(),
            removed,
            counts: counters.snapshot(),
        });
    }
    if selector.has_open() {
        log.warn("Open selection is not extracted.");
    }

    let mut pool = MaskPool::with_capacity(1);
    let cuts = compute_cuts(events, &closed, cancel, &mut pool, &counters)?;
    cancel.check()?;

    let removed = clear_cuts(layout)?;
    let mut written = Vec::with_capacity(cuts.len());
    for (key, cut) in &cuts {
        let path = layout
            .cuts_dir()
            .join(CutFile::file_name(measurement_name, &cut.label, key.index));
        cut.save(&path)?;
        written.push(path);
    }
    write_selections(&selections_path, selector)?;

    let counts = counters.snapshot();
    log.info(&format!(
        "Saved {} cut files ({} selections without events).",
        written.len(),
        counts.skipped
    ));
    Ok(ExtractionReport {
        cuts,
        written,
        removed,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SelectionLabel, SelectionType};
    use ndarray::array;

    fn square(offset: f64, element: &str) -> Selection {
        let points = [(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]
            .iter()
            .map(|(x, y)| (x + offset, y + offset))
            .collect();
        Selection::closed(points, SelectionLabel::erd(element.parse().unwrap())).unwrap()
    }

    #[test]
    fn inside_and_boundary_events_keep_order_and_numbering() {
        let events = EventData::from_raw(&array![[5i64, 15, 0, 7], [5, 15, 0, 3]]).unwrap();
        let counters = OperationCounters::new();
        let cuts = compute_cuts(
            &events,
            &[square(0.0, "H")],
            &CancelFlag::new(),
            &mut MaskPool::default(),
            &counters,
        )
        .unwrap();
        let cut = &cuts[&CutKey {
            element: "H".into(),
            kind: "ERD".into(),
            index: 0,
        }];
        let numbered: Vec<u64> = cut.points.iter().map(|point| point.event).collect();
        assert_eq!(numbered, vec![1, 3, 4]);
        assert_eq!(cut.points[0], CutPoint { x: 5, y: 5, event: 1 });
    }

    #[test]
    fn repeated_elements_are_indexed_and_empty_cuts_dropped() {
        let events = EventData::from_raw(&array![[5i64, 105], [5, 105]]).unwrap();
        let counters = OperationCounters::new();
        let cuts = compute_cuts(
            &events,
            &[square(0.0, "H"), square(100.0, "H"), square(500.0, "C")],
            &CancelFlag::new(),
            &mut MaskPool::default(),
            &counters,
        )
        .unwrap();
        let keys: Vec<String> = cuts.keys().map(|key| key.to_string()).collect();
        assert_eq!(keys, vec!["H.ERD.0", "H.ERD.1"]);
        assert_eq!(counters.snapshot().skipped, 1);
    }

    #[test]
    fn erd_and_rbs_cuts_of_one_element_are_numbered_apart() {
        let events = EventData::from_raw(&array![[5i64, 105, 205], [5, 105, 205]]).unwrap();
        let rbs = |offset: f64, scatter: &str| {
            let mut label = SelectionLabel::erd("He".parse().unwrap());
            label.selection_type = SelectionType::Rbs;
            label.scatter_element = Some(scatter.parse().unwrap());
            Selection::closed(square(offset, "He").points().to_vec(), label).unwrap()
        };
        let cuts = compute_cuts(
            &events,
            &[square(0.0, "He"), rbs(100.0, "Cl"), rbs(200.0, "Cl")],
            &CancelFlag::new(),
            &mut MaskPool::default(),
            &OperationCounters::new(),
        )
        .unwrap();
        let keys: Vec<String> = cuts.keys().map(|key| key.to_string()).collect();
        assert_eq!(keys, vec!["He.ERD.0", "He.RBS_Cl.0", "He.RBS_Cl.1"]);
    }

    #[test]
    fn extraction_writes_type_field_into_file_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = MeasurementLayout::new(dir.path());
        layout.create_all().unwrap();
        let events = EventData::from_raw(&array![[5i64, 105], [5, 105]]).unwrap();
        let mut label = SelectionLabel::erd("He".parse().unwrap());
        label.selection_type = SelectionType::Rbs;
        label.scatter_element = Some("Cl".parse().unwrap());
        let rbs = Selection::closed(square(100.0, "He").points().to_vec(), label).unwrap();
        let selector = Selector::from_closed(vec![square(0.0, "He"), rbs]);

        let report = extract(
            &layout,
            "m",
            &events,
            &selector,
            &CancelFlag::new(),
            &EntityLog::new("m"),
        )
        .unwrap();
        let mut names: Vec<String> = report
            .written
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["m.He.ERD.0.cut", "m.He.RBS_Cl.0.cut"]);
        assert!(layout.selections_file("m").is_file());
    }

    #[test]
    fn cancelled_extraction_produces_nothing() {
        let events = EventData::from_raw(&array![[5i64], [5]]).unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = compute_cuts(
            &events,
            &[square(0.0, "H")],
            &cancel,
            &mut MaskPool::default(),
            &OperationCounters::new(),
        );
        assert!(matches!(result, Err(crate::prelude::CoreError::Cancelled)));
    }
}
