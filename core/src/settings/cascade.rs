use crate::model::{Detector, ProfileSettings, Run, SimulationParameters, Target};
use serde::{Deserialize, Serialize};

/// A settings value that is either taken from the enclosing scope or
/// owned locally by the entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting<T> {
    Inherited,
    Overridden(T),
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSource {
    RequestDefaults,
    Local,
}

impl<T> Setting<T> {
    pub fn is_inherited(&self) -> bool {
        matches!(self, Setting::Inherited)
    }

    pub fn local(&self) -> Option<&T> {
        match self {
            Setting::Inherited => None,
            Setting::Overridden(value) => Some(value),
        }
    }

    /// Mutable access to the local value. Inherited values cannot be
    /// mutated through the entity.
    pub fn local_mut(&mut self) -> Option<&mut T> {
        match self {
            Setting::Inherited => None,
            Setting::Overridden(value) => Some(value),
        }
    }

    /// Picks the local value or `inherited`.
    pub fn resolve<'a>(&'a self, inherited: &'a T) -> (&'a T, SettingsSource) {
        match self {
            Setting::Inherited => (inherited, SettingsSource::RequestDefaults),
            Setting::Overridden(value) => (value, SettingsSource::Local),
        }
    }

    /// Switches to the inherited value, handing back the dropped local one.
    pub fn inherit(&mut self) -> Option<T> {
        match std::mem::replace(self, Setting::Inherited) {
            Setting::Inherited => None,
            Setting::Overridden(value) => Some(value),
        }
    }
}

impl<T: Clone> Setting<T> {
    /// Switches to a local value, starting from a copy of `inherited` when
    /// nothing was overridden yet.
    pub fn override_from(&mut self, inherited: &T) -> &mut T {
        if let Setting::Inherited = self {
            *self = Setting::Overridden(inherited.clone());
        }
        match self {
            Setting::Overridden(value) => value,
            Setting::Inherited => unreachable!("setting was just overridden"),
        }
    }
}

/// Detector, run and target of a simulation scope.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub detector: Detector,
    pub run: Run,
    pub target: Target,
}

/// Everything a measurement can inherit from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSettings {
    pub detector: Detector,
    pub run: Run,
    pub target: Target,
    pub profile: ProfileSettings,
}

/// Request-wide defaults inherited by measurements and simulations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestDefaults {
    pub detector: Detector,
    pub run: Run,
    pub target: Target,
    pub measurement: ProfileSettings,
    pub element_simulation: SimulationParameters,
}

impl RequestDefaults {
    pub fn measurement_settings(&self) -> MeasurementSettings {
        MeasurementSettings {
            detector: self.detector.clone(),
            run: self.run.clone(),
            target: self.target.clone(),
            profile: self.measurement.clone(),
        }
    }

    pub fn simulation_settings(&self) -> SimulationSettings {
        SimulationSettings {
            detector: self.detector.clone(),
            run: self.run.clone(),
            target: self.target.clone(),
        }
    }
}

/// Effective detector, run and target of an entity.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub detector: &'a Detector,
    pub run: &'a Run,
    pub target: &'a Target,
    pub source: SettingsSource,
}

/// Effective settings of a measurement.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMeasurement<'a> {
    pub settings: Resolved<'a>,
    pub profile: &'a ProfileSettings,
}

/// Effective settings of an element simulation. `settings` follows the
/// owning simulation's flag, `parameters` the element simulation's own flag.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedElementSimulation<'a> {
    pub settings: Resolved<'a>,
    pub parameters: &'a SimulationParameters,
    pub parameters_source: SettingsSource,
}

pub fn resolve_measurement<'a>(
    defaults: &'a RequestDefaults,
    setting: &'a Setting<MeasurementSettings>,
) -> ResolvedMeasurement<'a> {
    match setting {
        Setting::Inherited => ResolvedMeasurement {
            settings: Resolved {
                detector: &defaults.detector,
                run: &defaults.run,
                target: &defaults.target,
                source: SettingsSource::RequestDefaults,
            },
            profile: &defaults.measurement,
        },
        Setting::Overridden(local) => ResolvedMeasurement {
            settings: Resolved {
                detector: &local.detector,
                run: &local.run,
                target: &local.target,
                source: SettingsSource::Local,
            },
            profile: &local.profile,
        },
    }
}

pub fn resolve_simulation<'a>(
    defaults: &'a RequestDefaults,
    setting: &'a Setting<SimulationSettings>,
) -> Resolved<'a> {
    match setting {
        Setting::Inherited => Resolved {
            detector: &defaults.detector,
            run: &defaults.run,
            target: &defaults.target,
            source: SettingsSource::RequestDefaults,
        },
        Setting::Overridden(local) => Resolved {
            detector: &local.detector,
            run: &local.run,
            target: &local.target,
            source: SettingsSource::Local,
        },
    }
}

pub fn resolve_element_simulation<'a>(
    defaults: &'a RequestDefaults,
    simulation: &'a Setting<SimulationSettings>,
    parameters: &'a Setting<SimulationParameters>,
) -> ResolvedElementSimulation<'a> {
    let (parameters, parameters_source) = parameters.resolve(&defaults.element_simulation);
    ResolvedElementSimulation {
        settings: resolve_simulation(defaults, simulation),
        parameters,
        parameters_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn inherited_measurement_points_at_request_defaults() {
        let defaults = RequestDefaults::default();
        let setting = Setting::Inherited;
        let resolved = resolve_measurement(&defaults, &setting);
        assert!(ptr::eq(resolved.settings.detector, &defaults.detector));
        assert!(ptr::eq(resolved.settings.run, &defaults.run));
        assert!(ptr::eq(resolved.settings.target, &defaults.target));
        assert!(ptr::eq(resolved.profile, &defaults.measurement));
        assert_eq!(resolved.settings.source, SettingsSource::RequestDefaults);
    }

    #[test]
    fn toggling_is_visible_on_next_resolution() {
        let defaults = RequestDefaults::default();
        let mut setting = Setting::Inherited;
        setting.override_from(&defaults.measurement_settings()).profile.number_of_splits = 3;

        let resolved = resolve_measurement(&defaults, &setting);
        let local = setting.local().unwrap();
        assert!(ptr::eq(resolved.settings.detector, &local.detector));
        assert_eq!(resolved.profile.number_of_splits, 3);
        assert_eq!(resolved.settings.source, SettingsSource::Local);

        let dropped = setting.inherit().unwrap();
        assert_eq!(dropped.profile.number_of_splits, 3);
        let resolved = resolve_measurement(&defaults, &setting);
        assert!(ptr::eq(resolved.profile, &defaults.measurement));
    }

    #[test]
    fn element_simulation_flags_are_independent() {
        let defaults = RequestDefaults::default();
        let simulation = Setting::Inherited;
        let mut own = defaults.element_simulation.clone();
        own.number_of_ions = 42;
        let parameters = Setting::Overridden(own);

        let resolved = resolve_element_simulation(&defaults, &simulation, &parameters);
        assert_eq!(resolved.settings.source, SettingsSource::RequestDefaults);
        assert_eq!(resolved.parameters_source, SettingsSource::Local);
        assert_eq!(resolved.parameters.number_of_ions, 42);

        let local_simulation = Setting::Overridden(defaults.simulation_settings());
        let inherited_parameters = Setting::Inherited;
        let resolved =
            resolve_element_simulation(&defaults, &local_simulation, &inherited_parameters);
        assert_eq!(resolved.settings.source, SettingsSource::Local);
        assert!(ptr::eq(resolved.parameters, &defaults.element_simulation));
    }

    #[test]
    fn override_keeps_existing_local_value() {
        let mut setting = Setting::Overridden(5);
        *setting.override_from(&1) += 1;
        assert_eq!(setting.local(), Some(&6));
        assert!(Setting::<i32>::Inherited.local().is_none());
    }
}
