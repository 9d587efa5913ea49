use crate::math::units::{areal_density, time_of_flight_length};
use crate::prelude::{CancelFlag, CoreError, CoreResult};
use crate::serialization::text::format_float;
use crate::serialization::timestamp::backup_suffix;
use crate::settings::{GlobalSettings, ResolvedMeasurement};
use crate::store::files::write_atomic;
use crate::telemetry::EntityLog;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub const TOF_IN_FILE: &str = "tof.in";

/// Options of a tof.in generation.
#[derive(Debug, Clone, Default)]
pub struct TofInOptions {
    /// Forces the carbon foil thickness to zero, for comparing simulated
    /// spectra with measured ones.
    pub no_foil: bool,
    /// Directory to write into instead of the measurement's `tof_in`.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationStatus {
    /// The file already had identical contents and was not touched.
    Unchanged,
    Written { backup: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub path: PathBuf,
    pub status: GenerationStatus,
}

/// Builds the tof.in text from resolved measurement settings.
pub fn tof_in_text(
    resolved: &ResolvedMeasurement<'_>,
    global: &GlobalSettings,
    efficiency_dir: &Path,
    no_foil: bool,
) -> CoreResult<String> {
    let detector = resolved.settings.detector;
    let run = resolved.settings.run;
    let target = resolved.settings.target;
    let profile = resolved.profile;

    let timing = detector.timing_foils();
    let toflen = match (timing.first(), timing.last()) {
        (Some(first), Some(last)) => time_of_flight_length(first.distance, last.distance),
        _ => 0.0,
    };

    // Only the first layer of the first timing foil counts.
    let carbon_foil_thickness = if no_foil {
        0.0
    } else {
        let layer = timing
            .first()
            .and_then(|foil| foil.layers.first())
            .ok_or_else(|| {
                CoreError::Consistency(format!(
                    "detector {} has no layered timing foil",
                    detector.name
                ))
            })?;
        areal_density(layer.thickness, layer.density)
    };

    let lines = [
        format!("Beam: {}", run.beam.ion),
        format!("Energy: {}", format_float(run.beam.energy)),
        format!("Detector angle: {}", format_float(detector.detector_theta)),
        format!("Target angle: {}", format_float(target.target_theta)),
        format!("Toflen: {}", format_float(toflen)),
        format!("Carbon foil thickness: {}", format_float(carbon_foil_thickness)),
        format!("Target density: {}", format_float(profile.reference_density)),
        format!(
            "TOF calibration: {} {}",
            format_float(detector.tof_slope),
            format_float(detector.tof_offset)
        ),
        format!(
            "Angle calibration: {} {}",
            format_float(detector.angle_slope),
            format_float(detector.angle_offset)
        ),
        format!("Number of depth steps: {}", profile.number_of_depth_steps),
        format!("Depth step for stopping: {}", profile.depth_step_for_stopping),
        format!("Depth step for output: {}", profile.depth_step_for_output),
        format!(
            "Depths for concentration scaling: {} {}",
            format_float(profile.depth_for_concentration_from),
            format_float(profile.depth_for_concentration_to)
        ),
        format!("Cross section: {}", global.cross_section.flag()),
        format!("Number of iterations: {}", global.num_iterations),
        format!("Efficiency directory: {}", efficiency_dir.display()),
    ];
    Ok(lines.join("\n"))
}

pub fn fingerprint(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

fn file_fingerprint(path: &Path) -> Option<[u8; 32]> {
    fs::read(path).ok().map(|bytes| fingerprint(&bytes))
}

/// Copies `path` to `<path>_<YYYY-MM-DD_HH.MM.SS>.bak`. A missing source is
/// not an error; other failures are logged and ignored.
fn back_up(path: &Path, log: &EntityLog) -> Option<PathBuf> {
    let backup = PathBuf::from(format!("{}_{}.bak", path.display(), backup_suffix()));
    match fs::copy(path, &backup) {
        Ok(_) => {
            log.info(&format!("Backed up old tof.in file to {}", backup.display()));
            Some(backup)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            log.error(&format!("Error when backing up tof.in: {}", err));
            None
        }
    }
}

/// Writes `text` to `path` unless the file already has the same fingerprint.
/// An existing file with different contents is backed up first.
pub fn write_if_changed(
    path: &Path,
    text: &str,
    cancel: &CancelFlag,
    log: &EntityLog,
) -> CoreResult<GenerationReport> {
    if file_fingerprint(path) == Some(fingerprint(text.as_bytes())) {
        return Ok(GenerationReport {
            path: path.to_path_buf(),
            status: GenerationStatus::Unchanged,
        });
    }
    cancel.check()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| CoreError::io(parent, err))?;
    }
    let backup = back_up(path, log);
    write_atomic(path, text.as_bytes())?;
    log.info(&format!("Wrote {}", path.display()));
    Ok(GenerationReport {
        path: path.to_path_buf(),
        status: GenerationStatus::Written { backup },
    })
}
