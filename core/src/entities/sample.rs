use crate::entities::measurement::Measurement;
use crate::entities::simulation::Simulation;
use crate::entities::TabAllocator;
use crate::prelude::{CoreError, CoreResult, TabId};
use crate::settings::RequestDefaults;
use crate::store::directory::{allocate, scan, SerialCounter};
use crate::store::entity_id::{EntityId, EntityKind};
use crate::store::files::find_first;
use crate::telemetry::{Counts, EntityLog, OperationCounters};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A sample directory with its measurements and simulations.
///
/// Children are keyed by the tab they are open in. Serial numbers of new
/// children come from per-sample counters that never go back.
#[derive(Debug)]
pub struct Sample {
    id: EntityId,
    name: String,
    directory: PathBuf,
    measurement_counter: SerialCounter,
    simulation_counter: SerialCounter,
    measurements: BTreeMap<TabId, Measurement>,
    simulations: BTreeMap<TabId, Simulation>,
    log: EntityLog,
}

impl Sample {
    pub fn create(request_dir: &Path, counter: &SerialCounter, name: &str) -> CoreResult<Self> {
        let (id, directory) = allocate(request_dir, counter, EntityKind::Sample, name)?;
        Ok(Self::new(id, name.to_string(), directory))
    }

    fn new(id: EntityId, name: String, directory: PathBuf) -> Self {
        let log = EntityLog::new(name.as_str());
        Self {
            id,
            name,
            directory,
            measurement_counter: SerialCounter::new(),
            simulation_counter: SerialCounter::new(),
            measurements: BTreeMap::new(),
            simulations: BTreeMap::new(),
            log,
        }
    }

    /// Opens an existing sample directory and loads its measurements
    /// (directories with a `.info`) and simulations (directories with a
    /// `.simulation`). Children that fail to load are logged and skipped.
    pub fn open(
        directory: &Path,
        defaults: &RequestDefaults,
        tabs: &TabAllocator,
    ) -> CoreResult<(Self, Counts)> {
        let dir_name = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (id, name) = EntityId::parse(EntityKind::Sample, &dir_name)?;
        let mut sample = Self::new(id, name, directory.to_path_buf());
        let counters = OperationCounters::new();

        let measurements = scan(directory, EntityKind::Measurement, &sample.measurement_counter)?;
        for entry in measurements.entries {
            if find_first(&entry.path, "info")?.is_none() {
                continue;
            }
            match Measurement::load(&entry.path, defaults) {
                Ok(measurement) => {
                    counters.record_processed();
                    sample.measurements.insert(tabs.next(), measurement);
                }
                Err(err) => {
                    counters.record_skipped();
                    sample
                        .log
                        .error(&format!("Could not load {}: {}", entry.path.display(), err));
                }
            }
        }

        let simulations = scan(directory, EntityKind::Simulation, &sample.simulation_counter)?;
        for entry in simulations.entries {
            if find_first(&entry.path, "simulation")?.is_none() {
                continue;
            }
            match Simulation::load(&entry.path, defaults) {
                Ok(simulation) => {
                    counters.record_processed();
                    sample.simulations.insert(tabs.next(), simulation);
                }
                Err(err) => {
                    counters.record_skipped();
                    sample
                        .log
                        .error(&format!("Could not load {}: {}", entry.path.display(), err));
                }
            }
        }

        let mut counts = counters.snapshot();
        counts.skipped += measurements.counts.skipped + simulations.counts.skipped;
        Ok((sample, counts))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn next_measurement_serial(&self) -> u32 {
        self.measurement_counter.peek()
    }

    pub fn next_simulation_serial(&self) -> u32 {
        self.simulation_counter.peek()
    }

    pub fn add_measurement(
        &mut self,
        tab: TabId,
        name: &str,
        defaults: &RequestDefaults,
    ) -> CoreResult<&mut Measurement> {
        ensure_free(tab, self.measurements.contains_key(&tab) || self.simulations.contains_key(&tab))?;
        let measurement =
            Measurement::create(&self.directory, &self.measurement_counter, name, defaults)?;
        Ok(self.measurements.entry(tab).or_insert(measurement))
    }

    /// Creates a measurement named after the file stem of `source` and
    /// copies the event file into it.
    pub fn import_measurement(
        &mut self,
        tab: TabId,
        source: &Path,
        defaults: &RequestDefaults,
    ) -> CoreResult<&mut Measurement> {
        let name = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| CoreError::NotFound {
                path: source.to_path_buf(),
            })?;
        if !source.is_file() {
            return Err(CoreError::NotFound {
                path: source.to_path_buf(),
            });
        }
        let measurement = self.add_measurement(tab, &name, defaults)?;
        measurement.import_data(source)?;
        Ok(measurement)
    }

    pub fn measurements(&self) -> impl Iterator<Item = (TabId, &Measurement)> {
        self.measurements.iter().map(|(tab, measurement)| (*tab, measurement))
    }

    pub fn measurement(&self, tab: TabId) -> Option<&Measurement> {
        self.measurements.get(&tab)
    }

    pub fn measurement_mut(&mut self, tab: TabId) -> Option<&mut Measurement> {
        self.measurements.get_mut(&tab)
    }

    /// Forgets a measurement; with `delete_files` its directory is removed too.
    /// Its serial number is not handed out again.
    pub fn remove_measurement(&mut self, tab: TabId, delete_files: bool) -> CoreResult<Option<Measurement>> {
        let Some(measurement) = self.measurements.remove(&tab) else {
            return Ok(None);
        };
        if delete_files {
            fs::remove_dir_all(measurement.directory())
                .map_err(|err| CoreError::io(measurement.directory(), err))?;
            self.log.info(&format!("Removed measurement {}.", measurement.name()));
        }
        Ok(Some(measurement))
    }

    pub fn add_simulation(
        &mut self,
        tab: TabId,
        name: &str,
        defaults: &RequestDefaults,
    ) -> CoreResult<&mut Simulation> {
        ensure_free(tab, self.measurements.contains_key(&tab) || self.simulations.contains_key(&tab))?;
        let simulation =
            Simulation::create(&self.directory, &self.simulation_counter, name, defaults)?;
        Ok(self.simulations.entry(tab).or_insert(simulation))
    }

    pub fn simulations(&self) -> impl Iterator<Item = (TabId, &Simulation)> {
        self.simulations.iter().map(|(tab, simulation)| (*tab, simulation))
    }

    pub fn simulation(&self, tab: TabId) -> Option<&Simulation> {
        self.simulations.get(&tab)
    }

    pub fn simulation_mut(&mut self, tab: TabId) -> Option<&mut Simulation> {
        self.simulations.get_mut(&tab)
    }

    pub fn remove_simulation(&mut self, tab: TabId, delete_files: bool) -> CoreResult<Option<Simulation>> {
        let Some(simulation) = self.simulations.remove(&tab) else {
            return Ok(None);
        };
        if delete_files {
            fs::remove_dir_all(simulation.directory())
                .map_err(|err| CoreError::io(simulation.directory(), err))?;
            self.log.info(&format!("Removed simulation {}.", simulation.name()));
        }
        Ok(Some(simulation))
    }
}

fn ensure_free(tab: TabId, taken: bool) -> CoreResult<()> {
    if taken {
        return Err(CoreError::Consistency(format!("tab {} is already in use", tab.0)));
    }
    Ok(())
}
