use crate::entities::measurement::Measurement;
use crate::entities::sample::Sample;
use crate::entities::simulation::Simulation;
use crate::entities::TabAllocator;
use crate::model::{Detector, Target};
use crate::prelude::{CancelFlag, CoreError, CoreResult, TabId};
use crate::processing::cuts::ExtractionReport;
use crate::processing::tof_in::{tof_in_text, write_if_changed, GenerationReport, TofInOptions, TOF_IN_FILE};
use crate::serialization::json::{read_json, write_json};
use crate::serialization::{ElementSimulationFile, MeasurementFile, ProfileFile, RequestFile, Timestamp};
use crate::settings::{GlobalSettings, RequestDefaults, SettingsSource};
use crate::store::directory::{scan, SerialCounter};
use crate::store::entity_id::EntityKind;
use crate::store::layout::create_dir;
use crate::telemetry::{Counts, EntityLog, OperationCounters};
use std::path::{Path, PathBuf};

pub const DEFAULT_DIR: &str = "Default";
const DEFAULT_NAME: &str = "Default";

/// Files of the request `Default/` directory.
#[derive(Debug, Clone)]
struct DefaultFiles {
    root: PathBuf,
}

impl DefaultFiles {
    fn new(request_dir: &Path) -> Self {
        Self {
            root: request_dir.join(DEFAULT_DIR),
        }
    }

    fn detector_dir(&self) -> PathBuf {
        self.root.join("Detector")
    }

    fn efficiency_dir(&self) -> PathBuf {
        self.detector_dir().join("Efficiency_files")
    }

    fn file(&self, ext: &str) -> PathBuf {
        self.root.join(format!("{}.{}", DEFAULT_NAME, ext))
    }

    fn detector(&self) -> PathBuf {
        self.detector_dir().join(format!("{}.detector", DEFAULT_NAME))
    }

    /// Loads every default file separately, keeping built-in values for
    /// the ones that are missing or malformed.
    fn load(&self, log: &EntityLog) -> RequestDefaults {
        let mut defaults = RequestDefaults::default();
        let fallback = |what: &str, err: CoreError| {
            log.warn(&format!("Using built-in default {}: {}", what, err));
        };

        match read_json::<Detector>(&self.detector()) {
            Ok(detector) => defaults.detector = detector,
            Err(err) => fallback("detector", err),
        }
        match read_json::<Target>(&self.file("target")) {
            Ok(target) => defaults.target = target,
            Err(err) => fallback("target", err),
        }
        match MeasurementFile::read(&self.file("measurement")) {
            Ok(file) => {
                defaults.run = file.to_run();
                defaults.detector.detector_theta = file.geometry.detector_theta;
                defaults.target.target_theta = file.geometry.target_theta;
            }
            Err(err) => fallback("run", err),
        }
        match ProfileFile::read(&self.file("profile")) {
            Ok(profile) => defaults.measurement = profile.to_settings(),
            Err(err) => fallback("profile", err),
        }
        match ElementSimulationFile::read(&self.file("mc_simu")) {
            Ok(file) => defaults.element_simulation = file.parameters,
            Err(err) => fallback("simulation parameters", err),
        }
        defaults
    }

    fn write(&self, defaults: &RequestDefaults) -> CoreResult<()> {
        create_dir(&self.efficiency_dir())?;
        write_json(&self.detector(), &defaults.detector)?;
        write_json(&self.file("target"), &defaults.target)?;
        MeasurementFile::new(
            DEFAULT_NAME,
            "",
            &defaults.run,
            defaults.detector.detector_theta,
            defaults.target.target_theta,
        )
        .write(&self.file("measurement"))?;
        ProfileFile::new(&defaults.measurement, true).write(&self.file("profile"))?;
        ElementSimulationFile {
            name: DEFAULT_NAME.to_string(),
            description: String::new(),
            modified: Timestamp::now(),
            parameters: defaults.element_simulation.clone(),
            use_default_settings: true,
        }
        .write(&self.file("mc_simu"))
    }
}

/// Root of a workspace: request defaults, program settings and samples.
///
/// Changing the defaults needs `&mut Request`, so no resolution borrowing
/// them can be in flight at the same time.
#[derive(Debug)]
pub struct Request {
    directory: PathBuf,
    meta: RequestFile,
    defaults: RequestDefaults,
    pub global: GlobalSettings,
    samples: Vec<Sample>,
    sample_counter: SerialCounter,
    tabs: TabAllocator,
    log: EntityLog,
}

impl Request {
    /// Opens the request in `directory`, creating it when it does not exist.
    /// Samples and their children that fail to load are logged and skipped.
    pub fn open_or_create(directory: &Path, global: GlobalSettings) -> CoreResult<(Self, Counts)> {
        let log = EntityLog::request();
        create_dir(directory)?;
        let name = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "request".to_string());
        let meta_path = directory.join(format!("{}.request", name));
        let meta = match RequestFile::read(&meta_path) {
            Ok(meta) => meta,
            Err(err) => {
                if !err.is_not_found() {
                    log.warn(&format!("Recreating request file: {}", err));
                }
                let meta = RequestFile::new(name.as_str());
                meta.write(&meta_path)?;
                log.info(&format!("Created request {}.", name));
                meta
            }
        };

        let default_files = DefaultFiles::new(directory);
        let defaults = default_files.load(&log);
        default_files.write(&defaults)?;

        let mut request = Self {
            directory: directory.to_path_buf(),
            meta,
            defaults,
            global,
            samples: Vec::new(),
            sample_counter: SerialCounter::new(),
            tabs: TabAllocator::default(),
            log,
        };
        let counts = request.load_samples()?;
        Ok((request, counts))
    }

    fn load_samples(&mut self) -> CoreResult<Counts> {
        let found = scan(&self.directory, EntityKind::Sample, &self.sample_counter)?;
        let counters = OperationCounters::new();
        let mut skipped = found.counts.skipped;
        for entry in found.entries {
            match Sample::open(&entry.path, &self.defaults, &self.tabs) {
                Ok((sample, counts)) => {
                    counters.record_processed();
                    skipped += counts.skipped;
                    self.samples.push(sample);
                }
                Err(err) => {
                    counters.record_skipped();
                    self.log
                        .error(&format!("Could not open {}: {}", entry.path.display(), err));
                }
            }
        }
        let mut counts = counters.snapshot();
        counts.skipped += skipped;
        Ok(counts)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn name(&self) -> &str {
        &self.meta.request_name
    }

    pub fn default_dir(&self) -> PathBuf {
        self.directory.join(DEFAULT_DIR)
    }

    fn meta_path(&self) -> PathBuf {
        self.directory.join(format!("{}.request", self.meta.request_name))
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    pub fn defaults_mut(&mut self) -> &mut RequestDefaults {
        &mut self.defaults
    }

    pub fn save_defaults(&self) -> CoreResult<()> {
        DefaultFiles::new(&self.directory).write(&self.defaults)
    }

    pub fn next_tab(&self) -> TabId {
        self.tabs.next()
    }

    pub fn add_sample(&mut self, name: &str) -> CoreResult<&mut Sample> {
        let sample = Sample::create(&self.directory, &self.sample_counter, name)?;
        self.samples.push(sample);
        let index = self.samples.len() - 1;
        Ok(&mut self.samples[index])
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn sample_mut(&mut self, serial: u32) -> Option<&mut Sample> {
        self.samples.iter_mut().find(|sample| sample.id().serial == serial)
    }

    pub fn sample_by_name_mut(&mut self, name: &str) -> Option<&mut Sample> {
        self.samples.iter_mut().find(|sample| sample.name() == name)
    }

    pub fn measurements(&self) -> impl Iterator<Item = (TabId, &Measurement)> {
        self.samples.iter().flat_map(|sample| sample.measurements())
    }

    pub fn measurement(&self, tab: TabId) -> Option<&Measurement> {
        self.samples.iter().find_map(|sample| sample.measurement(tab))
    }

    pub fn measurement_mut(&mut self, tab: TabId) -> Option<&mut Measurement> {
        self.samples
            .iter_mut()
            .find_map(|sample| sample.measurement_mut(tab))
    }

    pub fn find_measurement(&self, name: &str) -> Option<TabId> {
        self.measurements()
            .find(|(_, measurement)| measurement.name() == name)
            .map(|(tab, _)| tab)
    }

    pub fn simulations(&self) -> impl Iterator<Item = (TabId, &Simulation)> {
        self.samples.iter().flat_map(|sample| sample.simulations())
    }

    pub fn simulation(&self, tab: TabId) -> Option<&Simulation> {
        self.samples.iter().find_map(|sample| sample.simulation(tab))
    }

    pub fn simulation_mut(&mut self, tab: TabId) -> Option<&mut Simulation> {
        self.samples
            .iter_mut()
            .find_map(|sample| sample.simulation_mut(tab))
    }

    pub fn find_simulation(&self, name: &str) -> Option<TabId> {
        self.simulations()
            .find(|(_, simulation)| simulation.name() == name)
            .map(|(tab, _)| tab)
    }

    fn require_measurement(&self, tab: TabId) -> CoreResult<&Measurement> {
        self.measurement(tab)
            .ok_or_else(|| CoreError::Consistency(format!("no measurement open in tab {}", tab.0)))
    }

    /// Regenerates the measurement's tof.in if its resolved settings changed.
    pub fn generate_tof_in(
        &self,
        tab: TabId,
        options: &TofInOptions,
        cancel: &CancelFlag,
    ) -> CoreResult<GenerationReport> {
        let measurement = self.require_measurement(tab)?;
        let resolved = measurement.resolve(&self.defaults);
        let efficiency_dir = match resolved.settings.source {
            SettingsSource::RequestDefaults => DefaultFiles::new(&self.directory).efficiency_dir(),
            SettingsSource::Local => measurement.layout().efficiency_dir(),
        };
        let text = tof_in_text(&resolved, &self.global, &efficiency_dir, options.no_foil)?;
        let output_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| measurement.layout().tof_in_dir());
        write_if_changed(&output_dir.join(TOF_IN_FILE), &text, cancel, measurement.log())
    }

    pub fn master(&self) -> Option<TabId> {
        if self.meta.master.is_empty() {
            return None;
        }
        self.find_measurement(&self.meta.master)
    }

    pub fn set_master(&mut self, tab: Option<TabId>) -> CoreResult<()> {
        self.meta.master = match tab {
            Some(tab) => self.require_measurement(tab)?.name().to_string(),
            None => String::new(),
        };
        self.meta.write(&self.meta_path())
    }

    /// Excludes a measurement from master/slave operations.
    pub fn exclude_slave(&mut self, name: &str) -> CoreResult<()> {
        if !self.meta.nonslave.iter().any(|excluded| excluded == name) {
            self.meta.nonslave.push(name.to_string());
        }
        self.meta.write(&self.meta_path())
    }

    pub fn include_slave(&mut self, name: &str) -> CoreResult<()> {
        self.meta.nonslave.retain(|excluded| excluded != name);
        self.meta.write(&self.meta_path())
    }

    /// All measurements except the master and the excluded ones.
    pub fn slaves(&self) -> Vec<TabId> {
        if self.meta.master.is_empty() {
            return Vec::new();
        }
        self.measurements()
            .filter(|(_, measurement)| {
                measurement.name() != self.meta.master
                    && !self.meta.nonslave.iter().any(|name| name == measurement.name())
            })
            .map(|(tab, _)| tab)
            .collect()
    }

    /// Copies the master's selections to every slave and extracts their cuts.
    pub fn propagate_master_selections(
        &mut self,
        cancel: &CancelFlag,
    ) -> CoreResult<Vec<(TabId, ExtractionReport)>> {
        let master = self
            .master()
            .ok_or_else(|| CoreError::Consistency("no master measurement set".into()))?;
        let selector = self.require_measurement(master)?.selector().clone();
        let mut reports = Vec::new();
        for tab in self.slaves() {
            cancel.check()?;
            let Some(slave) = self.measurement_mut(tab) else {
                continue;
            };
            *slave.selector_mut() = selector.clone();
            reports.push((tab, slave.extract_cuts(cancel)?));
        }
        Ok(reports)
    }
}
