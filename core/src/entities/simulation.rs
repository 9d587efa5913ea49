use crate::external::mcerd::McerdSettings;
use crate::model::{Detector, Element, RecoilElement, SimulationParameters, Target};
use crate::prelude::{CoreError, CoreResult};
use crate::serialization::json::{read_json, write_json};
use crate::serialization::simulation_file::{read_recoil, write_recoil};
use crate::serialization::{ElementSimulationFile, MeasurementFile, SimulationFile, Timestamp};
use crate::settings::{
    resolve_element_simulation, resolve_simulation, RequestDefaults, Resolved,
    ResolvedElementSimulation, Setting, SimulationSettings,
};
use crate::store::directory::{allocate, SerialCounter};
use crate::store::entity_id::{EntityId, EntityKind};
use crate::store::files::{find_files_by_extension, find_first};
use crate::store::layout::{create_dir, SimulationLayout};
use crate::telemetry::EntityLog;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One simulation run configuration for a recoil element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSimulation {
    pub name: String,
    pub description: String,
    pub recoil: RecoilElement,
    parameters: Setting<SimulationParameters>,
}

impl ElementSimulation {
    pub fn new(recoil: RecoilElement) -> Self {
        Self {
            name: recoil.name.clone(),
            description: String::new(),
            recoil,
            parameters: Setting::Inherited,
        }
    }

    /// `<element>-<name>`, the stem of the `.mc_simu` and `.rec` files.
    pub fn file_prefix(&self) -> String {
        format!("{}-{}", self.recoil.element.label(), self.name)
    }

    pub fn parameters(&self) -> &Setting<SimulationParameters> {
        &self.parameters
    }

    pub fn use_default_settings(&self) -> bool {
        self.parameters.is_inherited()
    }

    pub fn set_use_default_settings(&mut self, use_default: bool, defaults: &RequestDefaults) {
        if use_default {
            self.parameters.inherit();
        } else {
            self.parameters.override_from(&defaults.element_simulation);
        }
    }

    pub fn local_parameters_mut(&mut self, defaults: &RequestDefaults) -> &mut SimulationParameters {
        self.parameters.override_from(&defaults.element_simulation)
    }

    fn to_file(&self, directory: &Path, defaults: &RequestDefaults) -> CoreResult<()> {
        let (parameters, _) = self.parameters.resolve(&defaults.element_simulation);
        let mut file = ElementSimulationFile {
            name: self.name.clone(),
            description: self.description.clone(),
            modified: Timestamp::now(),
            parameters: parameters.clone(),
            use_default_settings: self.use_default_settings(),
        };
        let prefix = self.file_prefix();
        file.write(&directory.join(format!("{}.mc_simu", prefix)))?;
        write_recoil(&directory.join(format!("{}.rec", prefix)), &self.recoil)
    }

    fn from_file(mc_simu: &Path) -> CoreResult<Self> {
        let file = ElementSimulationFile::read(mc_simu)?;
        let recoil = read_recoil(&mc_simu.with_extension("rec"))?;
        Ok(Self {
            name: file.name,
            description: file.description,
            recoil,
            parameters: if file.use_default_settings {
                Setting::Inherited
            } else {
                Setting::Overridden(file.parameters)
            },
        })
    }
}

/// A Monte-Carlo simulation scope inside a sample.
#[derive(Debug)]
pub struct Simulation {
    id: EntityId,
    name: String,
    pub description: String,
    layout: SimulationLayout,
    settings: Setting<SimulationSettings>,
    element_simulations: BTreeMap<String, ElementSimulation>,
    log: EntityLog,
}

impl Simulation {
    pub fn create(
        sample_dir: &Path,
        counter: &SerialCounter,
        name: &str,
        defaults: &RequestDefaults,
    ) -> CoreResult<Self> {
        let (id, directory) = allocate(sample_dir, counter, EntityKind::Simulation, name)?;
        let layout = SimulationLayout::new(directory);
        layout.create_all()?;
        let mut simulation = Self {
            id,
            name: name.to_string(),
            description: String::new(),
            layout,
            settings: Setting::Inherited,
            element_simulations: BTreeMap::new(),
            log: EntityLog::new(name),
        };
        simulation.to_file(defaults)?;
        simulation.log.info(&format!("Created simulation {}.", name));
        Ok(simulation)
    }

    /// Loads a simulation directory holding a `.simulation` file. Element
    /// simulations that fail to load are logged and skipped.
    pub fn load(directory: &Path, defaults: &RequestDefaults) -> CoreResult<Self> {
        let dir_name = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (id, _) = EntityId::parse(EntityKind::Simulation, &dir_name)?;
        let path = find_first(directory, "simulation")?.ok_or_else(|| CoreError::NotFound {
            path: directory.join(".simulation"),
        })?;
        let file = SimulationFile::read(&path)?;
        let layout = SimulationLayout::new(directory);
        let log = EntityLog::new(file.name.as_str());

        let settings = if file.use_request_settings {
            Setting::Inherited
        } else {
            Setting::Overridden(Self::load_local_settings(&layout, &file.name, defaults, &log))
        };

        let mut element_simulations = BTreeMap::new();
        for mc_simu in find_files_by_extension(directory, "mc_simu")? {
            match ElementSimulation::from_file(&mc_simu) {
                Ok(element) => {
                    element_simulations.insert(element.recoil.element.label(), element);
                }
                Err(err) => log.warn(&format!("Skipping element simulation: {}", err)),
            }
        }

        Ok(Self {
            id,
            name: file.name,
            description: file.description,
            layout,
            settings,
            element_simulations,
            log,
        })
    }

    fn load_local_settings(
        layout: &SimulationLayout,
        name: &str,
        defaults: &RequestDefaults,
        log: &EntityLog,
    ) -> SimulationSettings {
        let mut settings = defaults.simulation_settings();
        match read_json::<Detector>(&layout.detector_dir().join(format!("{}.detector", name))) {
            Ok(detector) => settings.detector = detector,
            Err(err) => log.warn(&format!("Using request default detector: {}", err)),
        }
        match read_json::<Target>(&layout.root().join(format!("{}.target", name))) {
            Ok(target) => settings.target = target,
            Err(err) => log.warn(&format!("Using request default target: {}", err)),
        }
        match MeasurementFile::read(&layout.root().join(format!("{}.measurement", name))) {
            Ok(file) => {
                settings.run = file.to_run();
                settings.detector.detector_theta = file.geometry.detector_theta;
                settings.target.target_theta = file.geometry.target_theta;
            }
            Err(err) => log.warn(&format!("Using request default run settings: {}", err)),
        }
        settings
    }

    /// Writes `.simulation`, the local settings files and every element simulation.
    pub fn to_file(&mut self, defaults: &RequestDefaults) -> CoreResult<()> {
        let mut file = SimulationFile {
            name: self.name.clone(),
            description: self.description.clone(),
            modified: Timestamp::now(),
            use_request_settings: self.settings.is_inherited(),
        };
        file.write(&self.layout.root().join(format!("{}.simulation", self.name)))?;

        if let Setting::Overridden(local) = &self.settings {
            let root = self.layout.root();
            create_dir(&self.layout.detector_dir())?;
            write_json(
                &self.layout.detector_dir().join(format!("{}.detector", self.name)),
                &local.detector,
            )?;
            write_json(&root.join(format!("{}.target", self.name)), &local.target)?;
            MeasurementFile::new(
                &self.name,
                &self.description,
                &local.run,
                local.detector.detector_theta,
                local.target.target_theta,
            )
            .write(&root.join(format!("{}.measurement", self.name)))?;
        }

        for element in self.element_simulations.values() {
            element.to_file(self.layout.root(), defaults)?;
        }
        Ok(())
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        self.layout.root()
    }

    pub fn settings(&self) -> &Setting<SimulationSettings> {
        &self.settings
    }

    pub fn use_request_settings(&self) -> bool {
        self.settings.is_inherited()
    }

    pub fn set_use_request_settings(&mut self, use_request: bool, defaults: &RequestDefaults) {
        if use_request {
            self.settings.inherit();
        } else {
            self.settings.override_from(&defaults.simulation_settings());
        }
    }

    pub fn local_settings_mut(&mut self, defaults: &RequestDefaults) -> &mut SimulationSettings {
        self.settings.override_from(&defaults.simulation_settings())
    }

    pub fn resolve<'a>(&'a self, defaults: &'a RequestDefaults) -> Resolved<'a> {
        resolve_simulation(defaults, &self.settings)
    }

    /// Adds an element simulation for `element` with a default recoil
    /// distribution, or returns the existing one.
    pub fn add_element_simulation(&mut self, element: Element) -> &mut ElementSimulation {
        let log = &self.log;
        self.element_simulations
            .entry(element.label())
            .or_insert_with(|| {
                log.info(&format!("Added element simulation for {}.", element));
                ElementSimulation::new(RecoilElement::with_default_points(element.clone()))
            })
    }

    pub fn element_simulations(&self) -> impl Iterator<Item = &ElementSimulation> {
        self.element_simulations.values()
    }

    pub fn element_simulation(&self, element: &str) -> Option<&ElementSimulation> {
        self.element_simulations.get(element)
    }

    pub fn element_simulation_mut(&mut self, element: &str) -> Option<&mut ElementSimulation> {
        self.element_simulations.get_mut(element)
    }

    pub fn resolve_element<'a>(
        &'a self,
        element: &str,
        defaults: &'a RequestDefaults,
    ) -> CoreResult<ResolvedElementSimulation<'a>> {
        let element_simulation = self.element_simulations.get(element).ok_or_else(|| {
            CoreError::Consistency(format!(
                "simulation {} has no element simulation for {}",
                self.name, element
            ))
        })?;
        Ok(resolve_element_simulation(
            defaults,
            &self.settings,
            &element_simulation.parameters,
        ))
    }

    /// Settings dictionary for the external simulation of one element.
    pub fn mcerd_settings(&self, element: &str, defaults: &RequestDefaults) -> CoreResult<McerdSettings> {
        let resolved = self.resolve_element(element, defaults)?;
        let recoil = self
            .element_simulations
            .get(element)
            .map(|element_simulation| &element_simulation.recoil)
            .ok_or_else(|| CoreError::Consistency(format!("no recoil element {}", element)))?;
        Ok(McerdSettings::new(&resolved, recoil, self.output_dir()))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.layout.root().to_path_buf()
    }
}
