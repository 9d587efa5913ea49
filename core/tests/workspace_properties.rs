use erdcore::math::narrow_to;
use erdcore::model::SelectionLabel;
use erdcore::prelude::{CancelFlag, CoreError, StorageWidth};
use erdcore::processing::tof_in::{GenerationStatus, TofInOptions};
use erdcore::settings::{GlobalSettings, SettingsSource};
use erdcore::store::{allocate, scan, EntityKind, SerialCounter};
use erdcore::Request;
use ndarray::array;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn backups_in(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .ends_with(".bak")
        })
        .count()
}

#[test]
fn serials_increase_across_removals_and_rescans() {
    let dir = TempDir::new().unwrap();
    let counter = SerialCounter::new();
    let mut serials = Vec::new();
    for name in ["a", "b", "c"] {
        let (id, path) = allocate(dir.path(), &counter, EntityKind::Measurement, name).unwrap();
        serials.push(id.serial);
        if name == "b" {
            fs::remove_dir_all(path).unwrap();
        }
    }
    assert_eq!(serials, vec![1, 2, 3]);

    let rescanned = SerialCounter::new();
    let found = scan(dir.path(), EntityKind::Measurement, &rescanned).unwrap();
    assert_eq!(found.entries.len(), 2);
    assert_eq!(rescanned.peek(), 4);
}

#[test]
fn rescan_skips_garbage() {
    let dir = TempDir::new().unwrap();
    for name in ["Sample_01-a", "Sample_03-b", "garbage"] {
        fs::create_dir(dir.path().join(name)).unwrap();
    }
    let counter = SerialCounter::new();
    let found = scan(dir.path(), EntityKind::Sample, &counter).unwrap();
    assert_eq!(found.entries.len(), 2);
    assert_eq!(counter.peek(), 4);
}

#[test]
fn resolution_follows_the_flag_immediately() {
    let dir = TempDir::new().unwrap();
    let (mut request, _) =
        Request::open_or_create(&dir.path().join("req"), GlobalSettings::default()).unwrap();
    let tab = request.next_tab();
    let defaults = request.defaults().clone();
    request
        .add_sample("s")
        .unwrap()
        .add_measurement(tab, "m", &defaults)
        .unwrap();

    {
        let measurement = request.measurement(tab).unwrap();
        let resolved = measurement.resolve(request.defaults());
        assert!(std::ptr::eq(resolved.settings.detector, &request.defaults().detector));
        assert!(std::ptr::eq(resolved.profile, &request.defaults().measurement));
    }

    let defaults = request.defaults().clone();
    request
        .measurement_mut(tab)
        .unwrap()
        .set_use_default_profile_settings(false, &defaults);
    let measurement = request.measurement(tab).unwrap();
    let resolved = measurement.resolve(request.defaults());
    assert_eq!(resolved.settings.source, SettingsSource::Local);
    let local = measurement.settings().local().unwrap();
    assert!(std::ptr::eq(resolved.settings.run, &local.run));
    assert!(std::ptr::eq(resolved.settings.target, &local.target));
}

#[test]
fn tof_in_generation_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let (mut request, _) =
        Request::open_or_create(&dir.path().join("req"), GlobalSettings::default()).unwrap();
    let tab = request.next_tab();
    let defaults = request.defaults().clone();
    request
        .add_sample("s")
        .unwrap()
        .add_measurement(tab, "m", &defaults)
        .unwrap();
    let options = TofInOptions::default();
    let cancel = CancelFlag::new();

    let first = request.generate_tof_in(tab, &options, &cancel).unwrap();
    let tof_in_dir = first.path.parent().unwrap().to_path_buf();
    let second = request.generate_tof_in(tab, &options, &cancel).unwrap();
    assert_eq!(second.status, GenerationStatus::Unchanged);
    assert_eq!(backups_in(&tof_in_dir), 0);

    request.defaults_mut().measurement.number_of_depth_steps = 200;
    let third = request.generate_tof_in(tab, &options, &cancel).unwrap();
    let GenerationStatus::Written { backup: Some(backup) } = third.status else {
        panic!("expected a backup, got {:?}", third.status);
    };
    assert_eq!(backups_in(&tof_in_dir), 1);
    let old = fs::read_to_string(backup).unwrap();
    let new = fs::read_to_string(&third.path).unwrap();
    assert_ne!(old, new);
    assert!(new.contains("Number of depth steps: 200"));
}

#[test]
fn extraction_keeps_inside_points_in_order() {
    let dir = TempDir::new().unwrap();
    let (mut request, _) =
        Request::open_or_create(&dir.path().join("req"), GlobalSettings::default()).unwrap();
    let tab = request.next_tab();
    let defaults = request.defaults().clone();
    let measurement = request
        .add_sample("s")
        .unwrap()
        .add_measurement(tab, "m", &defaults)
        .unwrap();
    fs::write(
        measurement.layout().data_dir().join("m.asc"),
        "5 5\n15 15\n0 0\n",
    )
    .unwrap();
    for point in [(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)] {
        measurement.selector_mut().add_point(point);
    }
    measurement
        .selector_mut()
        .close_open(SelectionLabel::erd("1H".parse().unwrap()))
        .unwrap();

    let report = measurement.extract_cuts(&CancelFlag::new()).unwrap();
    let cut = report.cuts.values().next().unwrap();
    let events: Vec<u64> = cut.points.iter().map(|point| point.event).collect();
    assert_eq!(events, vec![1, 3]);
    assert!(measurement.selections_path().is_file());
    assert_eq!(
        measurement.selections_path(),
        measurement.layout().data_dir().join(format!("{}.selections", measurement.name()))
    );

    measurement.selector_mut().remove_all();
    let report = measurement.extract_cuts(&CancelFlag::new()).unwrap();
    assert!(report.cuts.is_empty());
    assert_eq!(report.removed, 1);
    assert!(measurement.cut_files().unwrap().is_empty());
    assert!(!measurement.selections_path().exists());
}

#[test]
fn cancelled_extraction_keeps_previous_cuts() {
    let dir = TempDir::new().unwrap();
    let (mut request, _) =
        Request::open_or_create(&dir.path().join("req"), GlobalSettings::default()).unwrap();
    let tab = request.next_tab();
    let defaults = request.defaults().clone();
    let measurement = request
        .add_sample("s")
        .unwrap()
        .add_measurement(tab, "m", &defaults)
        .unwrap();
    fs::write(measurement.layout().data_dir().join("m.asc"), "5 5\n").unwrap();
    for point in [(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)] {
        measurement.selector_mut().add_point(point);
    }
    measurement
        .selector_mut()
        .close_open(SelectionLabel::erd("C".parse().unwrap()))
        .unwrap();
    measurement.extract_cuts(&CancelFlag::new()).unwrap();

    let cancel = CancelFlag::new();
    cancel.cancel();
    assert!(matches!(
        measurement.extract_cuts(&cancel),
        Err(CoreError::Cancelled)
    ));
    assert_eq!(measurement.cut_files().unwrap().len(), 1);
}

#[test]
fn narrowing_70000_to_u16_is_a_range_error() {
    let raw = array![[1i64, 70_000], [0, 0]];
    assert!(matches!(
        narrow_to::<u16>(&raw),
        Err(CoreError::Range {
            value: 70_000,
            width: StorageWidth::U16
        })
    ));
}

#[test]
fn reopened_request_restores_samples_and_counters() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("req");
    {
        let (mut request, _) = Request::open_or_create(&root, GlobalSettings::default()).unwrap();
        let defaults = request.defaults().clone();
        let tab = request.next_tab();
        let sample = request.add_sample("s").unwrap();
        sample.add_measurement(tab, "m", &defaults).unwrap();
        request.add_sample("t").unwrap();
    }
    fs::create_dir(root.join("Sample_xx-broken")).unwrap();

    let (mut request, counts) = Request::open_or_create(&root, GlobalSettings::default()).unwrap();
    assert_eq!(request.samples().len(), 2);
    assert_eq!(counts.skipped, 1);
    assert!(request.find_measurement("m").is_some());
    let sample = request.add_sample("u").unwrap();
    assert_eq!(sample.id().serial, 3);
}
