//! The command line interface for the simulation.
use crate::error::FailureKind;
use crate::log;
use crate::model::{FixedModel, FixedRunSection, MobileModel, MobileRunSection};
use crate::output::metadata::write_metadata;
use crate::output::{create_output_directory, get_output_dir};
use crate::settings::Settings;
use crate::simulation::{FixedSimulation, Simulation};
use crate::strategy::{FixedStrategy, MobileStrategy, PopulationScenario, ThroughputScenario};
use crate::units::{Money, TrafficDensity};
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options controlling where and how outputs are written
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write additional information to CSV files
    #[arg(long)]
    pub debug_model: bool,
}

/// Options for a mobile run, overriding the `[run]` table of the model file
#[derive(Args, Default)]
pub struct MobileRunArgs {
    /// First simulated year
    #[arg(long)]
    pub base_year: Option<u32>,
    /// Last simulated year
    #[arg(long)]
    pub end_year: Option<u32>,
    /// Population scenario (high, baseline, low or static2017)
    #[arg(long)]
    pub scenario: Option<PopulationScenario>,
    /// Throughput scenario (low, baseline or high)
    #[arg(long)]
    pub throughput_scenario: Option<ThroughputScenario>,
    /// Intervention strategy
    #[arg(long)]
    pub strategy: Option<MobileStrategy>,
    /// Annual budget in GBP
    #[arg(long)]
    pub budget: Option<f64>,
    /// Universal service obligation in Mbps/km²
    #[arg(long)]
    pub service_obligation: Option<f64>,
    /// Seed for random choices
    #[arg(long)]
    pub seed: Option<u64>,
}

impl MobileRunArgs {
    /// The options given, in the form of a `[run]` table
    pub fn to_section(&self) -> MobileRunSection {
        MobileRunSection {
            base_year: self.base_year,
            end_year: self.end_year,
            scenario: self.scenario,
            throughput_scenario: self.throughput_scenario,
            strategy: self.strategy,
            annual_budget: self.budget.map(Money),
            service_obligation: self.service_obligation.map(TrafficDensity),
            seed: self.seed,
        }
    }
}

/// Options for a fixed-access run, overriding the `[run]` table of the model file
#[derive(Args, Default)]
pub struct FixedRunArgs {
    /// First simulated year
    #[arg(long)]
    pub base_year: Option<u32>,
    /// Last simulated year
    #[arg(long)]
    pub end_year: Option<u32>,
    /// Rollout strategy, e.g. rollout_fttp_per_distribution
    #[arg(long)]
    pub strategy: Option<FixedStrategy>,
    /// Annual budget in GBP
    #[arg(long)]
    pub budget: Option<f64>,
}

impl FixedRunArgs {
    /// The options given, in the form of a `[run]` table
    pub fn to_section(&self) -> FixedRunSection {
        FixedRunSection {
            base_year: self.base_year,
            end_year: self.end_year,
            strategy: self.strategy,
            annual_budget: self.budget.map(Money),
        }
    }
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a mobile model.
    Run {
        /// Path to the model directory.
        #[arg(default_value = ".")]
        model_dir: PathBuf,
        /// Run options
        #[command(flatten)]
        run_args: MobileRunArgs,
        /// Output options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Run a fixed-access model.
    RunFixed {
        /// Path to the model directory.
        #[arg(default_value = ".")]
        model_dir: PathBuf,
        /// Run options
        #[command(flatten)]
        run_args: FixedRunArgs,
        /// Output options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a mobile model.
    Validate {
        /// The path to the model directory.
        #[arg(default_value = ".")]
        model_dir: PathBuf,
        /// Run options
        #[command(flatten)]
        run_args: MobileRunArgs,
    },
    /// Validate a fixed-access model.
    ValidateFixed {
        /// The path to the model directory.
        #[arg(default_value = ".")]
        model_dir: PathBuf,
        /// Run options
        #[command(flatten)]
        run_args: FixedRunArgs,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Manage program settings.
    Settings {
        /// The available subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run {
                model_dir,
                run_args,
                opts,
            } => handle_run_command(&model_dir, &run_args.to_section(), &opts, None),
            Self::RunFixed {
                model_dir,
                run_args,
                opts,
            } => handle_run_fixed_command(&model_dir, &run_args.to_section(), &opts, None),
            Self::Validate {
                model_dir,
                run_args,
            } => handle_validate_command(&model_dir, &run_args.to_section(), None),
            Self::ValidateFixed {
                model_dir,
                run_args,
            } => handle_validate_fixed_command(&model_dir, &run_args.to_section(), None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start dcsim
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ dcsim --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help in markdown format
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    if let Some(settings) = settings {
        Ok(settings)
    } else {
        Settings::load().context("Failed to load settings.")
    }
}

/// Initialise the program logger, unless an earlier command in this process already has
fn init_logger(settings: &Settings, log_file_path: Option<&Path>) -> Result<()> {
    if log::is_logger_initialised() {
        return Ok(());
    }

    log::init(Some(&settings.log_level), log_file_path).context("Failed to initialise logging.")
}

/// Resolve and create the output folder for a run and start logging to it.
///
/// # Returns
///
/// The settings for the run and the path to the output folder
fn prepare_run(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<(Settings, PathBuf)> {
    let mut settings = load_settings(settings)?;

    // These settings can be overridden by command-line arguments
    if opts.debug_model {
        settings.debug_model = true;
    }
    if opts.overwrite {
        settings.overwrite = true;
    }

    // Get path to output folder
    let output_path = if let Some(p) = &opts.output_dir {
        p.clone()
    } else {
        get_output_dir(model_path).context(FailureKind::Configuration)?
    };

    let overwrite =
        create_output_directory(&output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    init_logger(&settings, Some(&output_path))?;
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    Ok((settings, output_path))
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    run_args: &MobileRunSection,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let (settings, output_path) = prepare_run(model_path, opts, settings)?;

    // Load the model to run
    let model = MobileModel::from_path(model_path, run_args).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    write_metadata(&output_path, model_path, "mobile")?;

    // Run the simulation
    Simulation::new(model).run(&output_path, settings.debug_model)?;
    info!("Simulation complete!");

    Ok(())
}

/// Handle the `run-fixed` command.
pub fn handle_run_fixed_command(
    model_path: &Path,
    run_args: &FixedRunSection,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let (_, output_path) = prepare_run(model_path, opts, settings)?;

    let model = FixedModel::from_path(model_path, run_args).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    write_metadata(&output_path, model_path, "fixed")?;

    FixedSimulation::new(model).run(&output_path)?;
    info!("Simulation complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(
    model_path: &Path,
    run_args: &MobileRunSection,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the validate command)
    init_logger(&settings, None)?;

    // Load/validate the model
    MobileModel::from_path(model_path, run_args).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}

/// Handle the `validate-fixed` command.
pub fn handle_validate_fixed_command(
    model_path: &Path,
    run_args: &FixedRunSection,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    init_logger(&settings, None)?;

    FixedModel::from_path(model_path, run_args).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}
