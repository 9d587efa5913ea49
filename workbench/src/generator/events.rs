use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Configuration for generating a synthetic (ToF, energy) event list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventGeneratorConfig {
    pub events: usize,
    pub seed: u64,
    /// Largest channel value on both axes.
    pub max_channel: u32,
    /// Number of recoil branches drawn as bands through the histogram.
    pub branches: usize,
    pub spread: f64,
    /// Fraction of events scattered uniformly as background.
    pub background: f64,
}

impl Default for EventGeneratorConfig {
    fn default() -> Self {
        Self {
            events: 20_000,
            seed: 0,
            max_channel: 8191,
            branches: 3,
            spread: 40.0,
            background: 0.05,
        }
    }
}

impl EventGeneratorConfig {
    fn normalized_branches(&self) -> usize {
        self.branches.max(1)
    }
}

/// Draws events along hyperbolic branches, roughly where recoils of
/// different masses land in a ToF-E histogram.
pub fn generate_events(config: &EventGeneratorConfig) -> Vec<(u32, u32)> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let max = config.max_channel.max(1) as f64;
    let branches = config.normalized_branches();
    let background = config.background.clamp(0.0, 1.0);

    (0..config.events)
        .map(|_| {
            if rng.gen_bool(background) {
                return (rng.gen_range(0..=config.max_channel), rng.gen_range(0..=config.max_channel));
            }
            let branch = rng.gen_range(0..branches);
            let mass = (branch + 1) as f64 / branches as f64;
            let tof = rng.gen_range(0.1..0.9) * max;
            let energy = mass * max * 0.15 / (tof / max).powi(2);
            let jitter = |rng: &mut StdRng| {
                // Sum of uniforms, close enough to a gaussian for a test histogram.
                (0..4).map(|_| rng.gen_range(-1.0..1.0)).sum::<f64>() * config.spread / 2.0
            };
            let x = (tof + jitter(&mut rng)).clamp(0.0, max);
            let y = (energy + jitter(&mut rng)).clamp(0.0, max);
            (x.round() as u32, y.round() as u32)
        })
        .collect()
}

pub fn asc_text(events: &[(u32, u32)]) -> String {
    let mut text = String::with_capacity(events.len() * 10);
    for (x, y) in events {
        let _ = writeln!(text, "{} {}", x, y);
    }
    text
}

pub fn write_asc(path: &Path, config: &EventGeneratorConfig) -> anyhow::Result<usize> {
    let events = generate_events(config);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, asc_text(&events))
        .with_context(|| format!("writing event file {}", path.display()))?;
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generator_is_deterministic_for_a_seed() {
        let config = EventGeneratorConfig {
            events: 256,
            seed: 13,
            ..Default::default()
        };
        assert_eq!(generate_events(&config), generate_events(&config));
        let other = EventGeneratorConfig { seed: 14, ..config.clone() };
        assert_ne!(generate_events(&config), generate_events(&other));
    }

    #[test]
    fn generator_stays_within_channel_range() {
        let config = EventGeneratorConfig {
            events: 2000,
            max_channel: 255,
            background: 0.5,
            ..Default::default()
        };
        let events = generate_events(&config);
        assert_eq!(events.len(), 2000);
        assert!(events.iter().all(|(x, y)| *x <= 255 && *y <= 255));
    }

    #[test]
    fn written_file_parses_as_event_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Data").join("demo.asc");
        let config = EventGeneratorConfig {
            events: 100,
            ..Default::default()
        };
        assert_eq!(write_asc(&path, &config).unwrap(), 100);
        let data = erdcore::processing::events::read_asc(&path).unwrap();
        assert_eq!(data.dim(), (2, 100));
    }
}
