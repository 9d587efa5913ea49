use crate::model::{Detector, Selector, Target};
use crate::prelude::{CancelFlag, CoreError, CoreResult, RenameStep};
use crate::processing::cuts::{self, ExtractionReport};
use crate::processing::events::{load_events, EventData};
use crate::serialization::json::{read_json, write_json};
use crate::serialization::selections_file::read_selections;
use crate::serialization::{InfoFile, MeasurementFile, ProfileFile, Timestamp};
use crate::settings::{resolve_measurement, MeasurementSettings, RequestDefaults, ResolvedMeasurement, Setting};
use crate::store::directory::{allocate, rename_directory, SerialCounter};
use crate::store::entity_id::{EntityId, EntityKind};
use crate::store::files::{find_files_by_extension, find_first, remove_if_exists, remove_matching_files, rename_file};
use crate::store::layout::{create_dir, MeasurementLayout};
use crate::telemetry::EntityLog;
use std::fs;
use std::path::{Path, PathBuf};

/// One imported dataset inside a sample.
#[derive(Debug)]
pub struct Measurement {
    id: EntityId,
    name: String,
    pub description: String,
    modified: Timestamp,
    layout: MeasurementLayout,
    measurement_setting_file_name: String,
    settings: Setting<MeasurementSettings>,
    selector: Selector,
    events: Option<EventData>,
    log: EntityLog,
}

impl Measurement {
    /// Creates `Measurement_NN-<name>` under `sample_dir` with the full
    /// folder structure, using the request defaults.
    pub fn create(
        sample_dir: &Path,
        counter: &SerialCounter,
        name: &str,
        defaults: &RequestDefaults,
    ) -> CoreResult<Self> {
        let (id, directory) = allocate(sample_dir, counter, EntityKind::Measurement, name)?;
        let layout = MeasurementLayout::new(directory);
        layout.create_all()?;
        let mut measurement = Self {
            id,
            name: name.to_string(),
            description: String::new(),
            modified: Timestamp::now(),
            layout,
            measurement_setting_file_name: String::new(),
            settings: Setting::Inherited,
            selector: Selector::new(),
            events: None,
            log: EntityLog::new(name),
        };
        measurement.to_file(defaults)?;
        measurement.log.info(&format!("Created measurement {}.", name));
        Ok(measurement)
    }

    /// Loads a measurement directory. The `.info` file is required; a
    /// missing or malformed `.profile` falls back to the request defaults.
    pub fn load(directory: &Path, defaults: &RequestDefaults) -> CoreResult<Self> {
        let dir_name = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (id, _) = EntityId::parse(EntityKind::Measurement, &dir_name)?;
        let info_path = find_first(directory, "info")?.ok_or_else(|| CoreError::NotFound {
            path: directory.join(".info"),
        })?;
        let info = InfoFile::read(&info_path)?;
        let layout = MeasurementLayout::new(directory);
        let log = EntityLog::new(info.name.as_str());

        let settings = match find_first(directory, "profile").and_then(|path| {
            let path = path.ok_or_else(|| CoreError::NotFound {
                path: directory.join(".profile"),
            })?;
            ProfileFile::read(&path)
        }) {
            Ok(profile) if profile.use_default_settings() => Setting::Inherited,
            Ok(profile) => Setting::Overridden(MeasurementSettings {
                detector: Self::load_detector(&layout, defaults, &log),
                target: Self::load_target(&layout, defaults, &log),
                run: defaults.run.clone(),
                profile: profile.to_settings(),
            }),
            Err(err) => {
                log.warn(&format!("Using request default settings: {}", err));
                Setting::Inherited
            }
        };

        let mut measurement = Self {
            id,
            name: info.name,
            description: info.description,
            modified: info.modified,
            layout,
            measurement_setting_file_name: String::new(),
            settings,
            selector: Selector::new(),
            events: None,
            log,
        };
        measurement.load_measurement_file();
        measurement.load_selections()?;
        Ok(measurement)
    }

    fn load_detector(layout: &MeasurementLayout, defaults: &RequestDefaults, log: &EntityLog) -> Detector {
        let loaded = find_first(&layout.detector_dir(), "detector").and_then(|path| match path {
            Some(path) => read_json::<Detector>(&path),
            None => Err(CoreError::NotFound {
                path: layout.detector_dir(),
            }),
        });
        loaded.unwrap_or_else(|err| {
            log.warn(&format!("Using request default detector: {}", err));
            defaults.detector.clone()
        })
    }

    fn load_target(layout: &MeasurementLayout, defaults: &RequestDefaults, log: &EntityLog) -> Target {
        let loaded = find_first(layout.root(), "target").and_then(|path| match path {
            Some(path) => read_json::<Target>(&path),
            None => Err(CoreError::NotFound {
                path: layout.root().join(".target"),
            }),
        });
        loaded.unwrap_or_else(|err| {
            log.warn(&format!("Using request default target: {}", err));
            defaults.target.clone()
        })
    }

    /// Applies run and geometry from the `.measurement` file to local settings.
    fn load_measurement_file(&mut self) {
        let path = match find_first(self.layout.root(), "measurement") {
            Ok(Some(path)) => path,
            _ => return,
        };
        if let Some(stem) = path.file_stem() {
            self.measurement_setting_file_name = stem.to_string_lossy().into_owned();
        }
        let Some(local) = self.settings.local_mut() else {
            return;
        };
        match MeasurementFile::read(&path) {
            Ok(file) => {
                local.run = file.to_run();
                local.detector.detector_theta = file.geometry.detector_theta;
                local.target.target_theta = file.geometry.target_theta;
            }
            Err(err) => self
                .log
                .warn(&format!("Using request default run settings: {}", err)),
        }
    }

    /// Writes `.info`, `.profile` and, for local settings, the
    /// `.measurement`, `.target` and `.detector` files.
    pub fn to_file(&mut self, defaults: &RequestDefaults) -> CoreResult<()> {
        let mut info = InfoFile::new(self.name.as_str(), self.description.as_str());
        info.write(&self.info_path())?;
        self.modified = info.modified;

        let resolved = resolve_measurement(defaults, &self.settings);
        let profile = ProfileFile::new(resolved.profile, self.settings.is_inherited());
        remove_matching_files(self.layout.root(), "profile")?;
        profile.write(
            &self
                .layout
                .root()
                .join(format!("{}.profile", resolved.profile.profile_name)),
        )?;

        if let Setting::Overridden(local) = &self.settings {
            let file_name = self.measurement_setting_file_name().to_string();
            MeasurementFile::new(
                &file_name,
                &self.description,
                &local.run,
                local.detector.detector_theta,
                local.target.target_theta,
            )
            .write(&self.layout.root().join(format!("{}.measurement", file_name)))?;
            write_json(
                &self.layout.root().join(format!("{}.target", local.target.name)),
                &local.target,
            )?;
            create_dir(&self.layout.detector_dir())?;
            write_json(
                &self
                    .layout
                    .detector_dir()
                    .join(format!("{}.detector", local.detector.name)),
                &local.detector,
            )?;
        }
        Ok(())
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modified(&self) -> &Timestamp {
        &self.modified
    }

    pub fn directory(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &MeasurementLayout {
        &self.layout
    }

    pub fn log(&self) -> &EntityLog {
        &self.log
    }

    fn info_path(&self) -> PathBuf {
        self.layout.root().join(format!("{}.info", self.name))
    }

    pub fn selections_path(&self) -> PathBuf {
        self.layout.selections_file(&self.name)
    }

    /// Name of the `.measurement` file; the measurement name when unset.
    pub fn measurement_setting_file_name(&self) -> &str {
        if self.measurement_setting_file_name.is_empty() {
            &self.name
        } else {
            &self.measurement_setting_file_name
        }
    }

    pub fn set_measurement_setting_file_name(&mut self, name: impl Into<String>) {
        self.measurement_setting_file_name = name.into();
    }

    pub fn settings(&self) -> &Setting<MeasurementSettings> {
        &self.settings
    }

    pub fn use_default_profile_settings(&self) -> bool {
        self.settings.is_inherited()
    }

    /// Switches between request defaults and local settings. Local settings
    /// start as a copy of the current defaults.
    pub fn set_use_default_profile_settings(&mut self, use_default: bool, defaults: &RequestDefaults) {
        if use_default {
            self.settings.inherit();
        } else {
            self.settings.override_from(&defaults.measurement_settings());
        }
    }

    /// Local settings, switching away from the defaults first if needed.
    pub fn local_settings_mut(&mut self, defaults: &RequestDefaults) -> &mut MeasurementSettings {
        self.settings.override_from(&defaults.measurement_settings())
    }

    pub fn resolve<'a>(&'a self, defaults: &'a RequestDefaults) -> ResolvedMeasurement<'a> {
        resolve_measurement(defaults, &self.settings)
    }

    /// Copies a raw `.asc` event file into `Data/`, replacing any earlier
    /// event file and its cache.
    pub fn import_data(&mut self, source: &Path) -> CoreResult<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| CoreError::NotFound {
            path: source.to_path_buf(),
        })?;
        let data_dir = self.layout.data_dir();
        let target = data_dir.join(file_name);
        if source != target {
            fs::copy(source, &target).map_err(|err| CoreError::io(source, err))?;
        }
        for old in find_files_by_extension(&data_dir, "asc")? {
            if old != target {
                remove_if_exists(&old)?;
            }
        }
        remove_matching_files(&data_dir, "events")?;
        self.events = None;
        self.log.info(&format!("Imported {}.", source.display()));
        Ok(target)
    }

    pub fn data_file(&self) -> CoreResult<Option<PathBuf>> {
        find_first(&self.layout.data_dir(), "asc")
    }

    /// Loads the event data, reusing an already loaded array.
    pub fn load_data(&mut self) -> CoreResult<&EventData> {
        if self.events.is_none() {
            let asc = self.data_file()?.ok_or_else(|| CoreError::NotFound {
                path: self.layout.data_dir().join("*.asc"),
            })?;
            self.events = Some(load_events(&asc, &self.log)?);
        }
        self.events.as_ref().ok_or_else(|| {
            CoreError::Consistency(format!("measurement {} has no event data", self.name))
        })
    }

    pub fn events(&self) -> Option<&EventData> {
        self.events.as_ref()
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut Selector {
        &mut self.selector
    }

    /// Replaces the current selections with those in `<name>.selections`.
    pub fn load_selections(&mut self) -> CoreResult<()> {
        let path = self.selections_path();
        match read_selections(&path, &self.log) {
            Ok(selections) => {
                self.selector = Selector::from_closed(selections);
                Ok(())
            }
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Extracts cut files from the closed selections.
    pub fn extract_cuts(&mut self, cancel: &CancelFlag) -> CoreResult<ExtractionReport> {
        self.load_data()?;
        let events = self.events.as_ref().ok_or_else(|| {
            CoreError::Consistency(format!("measurement {} has no event data", self.name))
        })?;
        cuts::extract(&self.layout, &self.name, events, &self.selector, cancel, &self.log)
    }

    /// Removes every selection together with the cut files and the `.selections` file.
    pub fn remove_all_selections(&mut self) -> CoreResult<()> {
        self.selector.remove_all();
        cuts::clear_cuts(&self.layout)?;
        remove_if_exists(&self.selections_path())
    }

    /// Cut files in `Data/Cuts` followed by element-loss splits in
    /// `Composition_changes/Changes`.
    pub fn cut_files(&self) -> CoreResult<Vec<PathBuf>> {
        let mut files = find_files_by_extension(&self.layout.cuts_dir(), "cut")?;
        files.extend(find_files_by_extension(&self.layout.changes_dir(), "cut")?);
        Ok(files)
    }

    /// Renames the measurement: directory, then `.info`, then every file
    /// whose name starts with the old measurement name.
    pub fn rename(&mut self, new_name: &str) -> CoreResult<()> {
        if new_name == self.name {
            return Ok(());
        }
        let step = |step: RenameStep| move |err: CoreError| CoreError::Rename {
            step,
            source: Box::new(err),
        };

        let directory = rename_directory(self.layout.root(), self.id, new_name)
            .map_err(step(RenameStep::Directory))?;
        self.layout = MeasurementLayout::new(directory);
        let old_name = std::mem::replace(&mut self.name, new_name.to_string());

        let mut info = InfoFile::new(self.name.as_str(), self.description.as_str());
        remove_if_exists(&self.layout.root().join(format!("{}.info", old_name)))
            .and_then(|_| info.write(&self.info_path()))
            .map_err(step(RenameStep::InfoFile))?;
        self.modified = info.modified;

        let mut derived = self.cut_files().map_err(step(RenameStep::CutFiles))?;
        derived.push(self.layout.selections_file(&old_name));
        let prefix = format!("{}.", old_name);
        for path in derived {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let Some(rest) = file_name.strip_prefix(&prefix) else {
                continue;
            };
            if !path.exists() {
                continue;
            }
            rename_file(&path, &format!("{}.{}", new_name, rest))
                .map_err(step(RenameStep::CutFiles))?;
        }

        self.log = EntityLog::new(new_name);
        self.log.info(&format!("Renamed measurement {} to {}.", old_name, new_name));
        Ok(())
    }
}
