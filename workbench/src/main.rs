use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use erdcore::external::{InputFileBackend, SimulationBackend};
use erdcore::model::{Element, Selector};
use erdcore::processing::{GenerationStatus, TofInOptions};
use erdcore::serialization::selections_file::read_selections;
use erdcore::serialization::ProfileFile;
use erdcore::settings::SettingsSource;
use erdcore::telemetry::EntityLog;
use erdcore::{Request, TabId};
use generator::events::write_asc;
use serde_json::json;
use std::path::PathBuf;
use workflow::config::WorkbenchConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "ToF-ERD request workspace driver")]
struct Args {
    /// Load the workbench config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Request directory, used when no config file is given
    #[arg(long, default_value = "request")]
    request: PathBuf,
    /// Cross-section model flag (1 Rutherford, 2 L'Ecuyer, 3 Andersen)
    #[arg(long, default_value_t = 3)]
    cross_section: u8,
    #[arg(long, default_value_t = 3)]
    iterations: u32,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the request directory and its defaults, or report on an existing one
    Init,
    #[command(subcommand)]
    Sample(SampleCommand),
    #[command(subcommand)]
    Measurement(MeasurementCommand),
    #[command(subcommand)]
    Simulation(SimulationCommand),
    #[command(subcommand)]
    Master(MasterCommand),
    /// Regenerate tof.in of a measurement if its settings changed
    TofIn {
        measurement: String,
        /// Write a zero carbon foil thickness
        #[arg(long, default_value_t = false)]
        no_foil: bool,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Extract cut files from a measurement's selections
    Cut {
        measurement: String,
        /// Replace the selections with those in this `.selections` file first
        #[arg(long)]
        selections: Option<PathBuf>,
        /// Make the measurement master and repeat the cuts on every slave
        #[arg(long, default_value_t = false)]
        propagate: bool,
    },
    /// Print the effective settings of a measurement as JSON
    Resolve { measurement: String },
    /// Write a synthetic event file
    Demo {
        output: PathBuf,
        #[arg(long)]
        events: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Subcommand)]
enum SampleCommand {
    Add { name: String },
    List,
}

#[derive(Subcommand)]
enum MeasurementCommand {
    /// Create a measurement from an event file, named after the file stem
    Import {
        #[arg(long)]
        sample: String,
        file: PathBuf,
    },
    Rename { name: String, new_name: String },
    /// Switch between request defaults and local settings
    Settings {
        name: String,
        #[arg(long, default_value_t = false)]
        local: bool,
    },
}

#[derive(Subcommand)]
enum SimulationCommand {
    Add {
        #[arg(long)]
        sample: String,
        name: String,
        /// Recoil elements to simulate, e.g. 4He
        #[arg(long = "element")]
        elements: Vec<String>,
    },
    /// Print the external simulation settings of one element as JSON
    Mcerd {
        simulation: String,
        element: String,
        /// Also write the simulation input files
        #[arg(long, default_value_t = false)]
        write_inputs: bool,
    },
}

#[derive(Subcommand)]
enum MasterCommand {
    Set { measurement: String },
    Clear,
    Exclude { measurement: String },
    Include { measurement: String },
}

fn measurement_tab(request: &Request, name: &str) -> anyhow::Result<TabId> {
    request
        .find_measurement(name)
        .with_context(|| format!("no measurement named {}", name))
}

fn simulation_tab(request: &Request, name: &str) -> anyhow::Result<TabId> {
    request
        .find_simulation(name)
        .with_context(|| format!("no simulation named {}", name))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = args.config.as_ref() {
        WorkbenchConfig::load(path)?
    } else {
        WorkbenchConfig::from_args(args.request.clone(), args.cross_section, args.iterations)?
    };

    if let Command::Demo {
        output,
        events,
        seed,
    } = &args.command
    {
        let mut demo = config.demo.clone();
        demo.events = events.unwrap_or(demo.events);
        demo.seed = seed.unwrap_or(demo.seed);
        let written = write_asc(output, &demo)?;
        println!("Wrote {} events to {}", written, output.display());
        return Ok(());
    }

    let (request, counts) = Request::open_or_create(&config.request_dir, config.global.clone())
        .with_context(|| format!("opening request {}", config.request_dir.display()))?;
    if counts.skipped > 0 {
        log::warn!("{} entries could not be loaded", counts.skipped);
    }
    let runner = Runner::new(request);
    let shared = runner.request();
    let mut request = shared
        .write()
        .map_err(|_| anyhow!("request lock poisoned"))?;

    match args.command {
        Command::Init => {
            println!(
                "Request {} at {} ({} samples, {} measurements)",
                request.name(),
                request.directory().display(),
                request.samples().len(),
                request.measurements().count()
            );
        }
        Command::Sample(SampleCommand::Add { name }) => {
            let sample = request.add_sample(&name).context("adding sample")?;
            println!("Created {}", sample.directory().display());
        }
        Command::Sample(SampleCommand::List) => {
            for sample in request.samples() {
                println!("{}", sample.id().dir_name(sample.name()));
                for (_, measurement) in sample.measurements() {
                    println!("  {}", measurement.id().dir_name(measurement.name()));
                }
                for (_, simulation) in sample.simulations() {
                    println!("  {}", simulation.id().dir_name(simulation.name()));
                }
            }
        }
        Command::Measurement(MeasurementCommand::Import { sample, file }) => {
            let tab = request.next_tab();
            let defaults = request.defaults().clone();
            let measurement = request
                .sample_by_name_mut(&sample)
                .with_context(|| format!("no sample named {}", sample))?
                .import_measurement(tab, &file, &defaults)
                .with_context(|| format!("importing {}", file.display()))?;
            println!("Imported {}", measurement.directory().display());
        }
        Command::Measurement(MeasurementCommand::Rename { name, new_name }) => {
            let tab = measurement_tab(&request, &name)?;
            let measurement = request
                .measurement_mut(tab)
                .with_context(|| format!("no measurement named {}", name))?;
            measurement
                .rename(&new_name)
                .with_context(|| format!("renaming {} to {}", name, new_name))?;
            println!("Renamed to {}", measurement.directory().display());
        }
        Command::Measurement(MeasurementCommand::Settings { name, local }) => {
            let tab = measurement_tab(&request, &name)?;
            let defaults = request.defaults().clone();
            let measurement = request
                .measurement_mut(tab)
                .with_context(|| format!("no measurement named {}", name))?;
            measurement.set_use_default_profile_settings(!local, &defaults);
            measurement
                .to_file(&defaults)
                .context("saving measurement settings")?;
        }
        Command::Simulation(SimulationCommand::Add {
            sample,
            name,
            elements,
        }) => {
            let elements = elements
                .iter()
                .map(|label| label.parse::<Element>().map_err(anyhow::Error::msg))
                .collect::<anyhow::Result<Vec<_>>>()
                .context("reading --element")?;
            let tab = request.next_tab();
            let defaults = request.defaults().clone();
            let simulation = request
                .sample_by_name_mut(&sample)
                .with_context(|| format!("no sample named {}", sample))?
                .add_simulation(tab, &name, &defaults)
                .context("adding simulation")?;
            for element in elements {
                simulation.add_element_simulation(element);
            }
            simulation
                .to_file(&defaults)
                .context("saving simulation")?;
            println!("Created {}", simulation.directory().display());
        }
        Command::Simulation(SimulationCommand::Mcerd {
            simulation,
            element,
            write_inputs,
        }) => {
            let tab = simulation_tab(&request, &simulation)?;
            let settings = request
                .simulation(tab)
                .with_context(|| format!("no simulation named {}", simulation))?
                .mcerd_settings(&element, request.defaults())
                .context("resolving simulation settings")?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if write_inputs {
                let output = InputFileBackend
                    .run(&settings)
                    .context("writing simulation inputs")?;
                println!("Simulation output will be {}", output.display());
            }
        }
        Command::Master(command) => {
            match command {
                MasterCommand::Set { measurement } => {
                    let tab = measurement_tab(&request, &measurement)?;
                    request.set_master(Some(tab))?;
                }
                MasterCommand::Clear => request.set_master(None)?,
                MasterCommand::Exclude { measurement } => request.exclude_slave(&measurement)?,
                MasterCommand::Include { measurement } => request.include_slave(&measurement)?,
            }
            let slaves: Vec<&str> = request
                .slaves()
                .into_iter()
                .filter_map(|tab| request.measurement(tab).map(|m| m.name()))
                .collect();
            println!("Slaves: {}", slaves.join(", "));
        }
        Command::TofIn {
            measurement,
            no_foil,
            output_dir,
        } => {
            let tab = measurement_tab(&request, &measurement)?;
            drop(request);
            let report = runner.generate_tof_in(tab, TofInOptions { no_foil, output_dir })?;
            match report.status {
                GenerationStatus::Unchanged => println!("{} is up to date", report.path.display()),
                GenerationStatus::Written { backup } => {
                    println!("Wrote {}", report.path.display());
                    if let Some(backup) = backup {
                        println!("Previous file kept as {}", backup.display());
                    }
                }
            }
        }
        Command::Cut {
            measurement,
            selections,
            propagate,
        } => {
            let tab = measurement_tab(&request, &measurement)?;
            if let Some(path) = selections {
                let loaded = read_selections(&path, &EntityLog::new(measurement.as_str()))
                    .with_context(|| format!("reading selections {}", path.display()))?;
                *request
                    .measurement_mut(tab)
                    .with_context(|| format!("no measurement named {}", measurement))?
                    .selector_mut() = Selector::from_closed(loaded);
            }
            drop(request);
            let result = runner.extract_cuts(tab, propagate)?;
            for path in &result.master.written {
                println!("{}", path.display());
            }
            for (_, report) in &result.slaves {
                for path in &report.written {
                    println!("{}", path.display());
                }
            }
        }
        Command::Resolve { measurement } => {
            let tab = measurement_tab(&request, &measurement)?;
            let resolved = request
                .measurement(tab)
                .with_context(|| format!("no measurement named {}", measurement))?
                .resolve(request.defaults());
            let inherited = resolved.settings.source == SettingsSource::RequestDefaults;
            let document = json!({
                "source": resolved.settings.source,
                "detector": resolved.settings.detector,
                "run": resolved.settings.run,
                "target": resolved.settings.target,
                "profile": ProfileFile::new(resolved.profile, inherited),
            });
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Command::Demo { .. } => {}
    }

    Ok(())
}
