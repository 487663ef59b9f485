//! This program sets up a working directory for the converters: it writes a configuration
//! file with every setting spelled out, a city table to edit, and the directories the
//! default configuration reads from and writes to.
//!
//! Each step is designed so that running this program again does nothing unless a
//! file was changed or removed. Files that exist with different content are left
//! alone unless `--force` is given.
use std::{borrow::Cow, io::Write, path::{Path, PathBuf}, process::ExitCode};
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colored::Colorize;
use eo_city_rs::default_files::{default_cities_json, default_cities_toml, default_config_toml};


fn main() -> ExitCode {
    let clargs = Cli::parse();

    env_logger::Builder::new()
    .filter_level(clargs.verbose.log_level_filter())
    .init();

    let res = driver(&clargs);
    match res {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error initializing the working directory:\n{e}");
            ExitCode::FAILURE
        }
    }
}

/// Write a default configuration and city table for the NASA data converters
#[derive(Debug, clap::Parser)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// The directory to set up
    #[clap(default_value = ".")]
    dir: PathBuf,

    /// Format of the city table file
    #[clap(long, value_enum, default_value_t = CitiesFormat::Toml)]
    cities_format: CitiesFormat,

    /// Overwrite files that exist with different content
    #[clap(short = 'f', long)]
    force: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CitiesFormat {
    Json,
    Toml,
}

const CONFIG_FILE: &str = "eo-config.toml";
const INPUT_SUBDIRS: [&str; 3] = ["temperature", "ndvi", "soil-moisture"];

fn driver(clargs: &Cli) -> Result<bool, SetupError> {
    let root = &clargs.dir;
    if !root.is_dir() {
        return Err(SetupError::Other(format!("{} is not a directory", root.display())));
    }

    let (cities_name, cities_content) = match clargs.cities_format {
        CitiesFormat::Json => ("cities.json", default_cities_json()),
        CitiesFormat::Toml => ("cities.toml", default_cities_toml()),
    };

    let mut steps = vec![
        CreateFileStep::new_boxed(default_config_toml(Some(Path::new(cities_name))), root.join(CONFIG_FILE)),
        CreateFileStep::new_boxed(cities_content, root.join(cities_name)),
    ];
    for sub in INPUT_SUBDIRS {
        steps.push(MakeDirStep::new_boxed(root, Path::new("raw-nasa-data").join(sub)));
    }
    steps.push(MakeDirStep::new_boxed(root, Path::new("public").join("data").join("csv")));

    let mut n_skipped = 0;
    let mut outcomes = vec![];
    for step in steps {
        step.describe();
        let outcome = step.execute(clargs.force)?;
        match outcome {
            SetupOutcome::Executed => {
                step.tell_completion();
                outcomes.push((true, step.name()));
            },
            SetupOutcome::NotNeeded => {
                step.tell_not_needed();
                outcomes.push((true, step.name()));
            },
            SetupOutcome::Skipped(reason) => {
                println!("Step skipped: {reason}");
                n_skipped += 1;
                outcomes.push((false, step.name()));
            }
        }
    }

    println!("\nSummary:");
    for (step_ok, step_name) in outcomes {
        let status_text = if step_ok {
            "OK".on_green().black().bold()
        } else {
            "SKIPPED".on_red().black().bold()
        };
        println!("{status_text:^8} {step_name}");
    }

    if n_skipped == 0 {
        println!("\nInitialization complete. Run the converters with --config {}", root.join(CONFIG_FILE).display());
        Ok(true)
    } else {
        println!("\n{n_skipped} steps were skipped. Review them and rerun with --force if the existing files should be replaced.");
        Ok(false)
    }
}

type SetupResult = Result<SetupOutcome, SetupError>;

enum SetupOutcome {
    /// Indicates that the step was executed successfully
    Executed,

    /// Indicates that the step was not run because it had
    /// been completed previously.
    NotNeeded,

    /// The step was not run, for the given reason
    Skipped(String),
}

#[derive(Debug, thiserror::Error)]
enum SetupError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

trait SetupStep {
    fn name(&self) -> Cow<'static, str>;
    fn describe(&self);
    fn tell_completion(&self);
    fn tell_not_needed(&self);
    fn execute(&self, force: bool) -> SetupResult;
}

/// Initialization step to create a file with fixed contents.
struct CreateFileStep {
    source: String,
    dest: PathBuf
}

/// Used to indicate whether a file to create exists, needs created,
/// or needs overwritten.
#[derive(Debug, Clone, Copy)]
enum FileStatus {
    /// The file does not exist
    Missing,

    /// The file exists, but has different content than expected.
    ContentDiffers,

    /// The file exists with the expected content.
    Extant
}

impl CreateFileStep {
    fn new_boxed(source: String, dest: PathBuf) -> Box<dyn SetupStep> {
        Box::new(Self { source, dest })
    }

    fn file_status(&self) -> std::io::Result<FileStatus> {
        if !self.dest.exists() {
            return Ok(FileStatus::Missing);
        }

        let current = std::fs::read_to_string(&self.dest)?;
        if current == self.source {
            Ok(FileStatus::Extant)
        } else {
            Ok(FileStatus::ContentDiffers)
        }
    }
}

impl SetupStep for CreateFileStep {
    fn name(&self) -> Cow<'static, str> {
        let name = self.dest.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| self.dest.to_string_lossy());
        format!("Create '{name}' file").into()
    }

    fn describe(&self) {
        println!("Creating file {}", self.dest.display());
    }

    fn tell_completion(&self) {
        println!("File created.");
    }

    fn tell_not_needed(&self) {
        println!("File already exists, not re-creating.");
    }

    fn execute(&self, force: bool) -> SetupResult {
        match self.file_status()? {
            FileStatus::Extant => return Ok(SetupOutcome::NotNeeded),
            FileStatus::ContentDiffers if !force => {
                return Ok(SetupOutcome::Skipped("file exists with different content".to_string()));
            },
            FileStatus::ContentDiffers => log::warn!("Overwriting {}", self.dest.display()),
            FileStatus::Missing => (),
        }

        let mut f = std::fs::File::create(&self.dest)?;
        f.write_all(self.source.as_bytes())?;
        Ok(SetupOutcome::Executed)
    }
}


struct MakeDirStep {
    root: PathBuf,
    subdir: PathBuf,
}

impl MakeDirStep {
    fn new_boxed(root: &Path, subdir: PathBuf) -> Box<dyn SetupStep> {
        Box::new(Self { root: root.to_path_buf(), subdir })
    }

    fn target_dir(&self) -> PathBuf {
        self.root.join(&self.subdir)
    }
}

impl SetupStep for MakeDirStep {
    fn name(&self) -> Cow<'static, str> {
        format!("Make directory {}", self.subdir.display()).into()
    }

    fn describe(&self) {
        println!("Creating directory {}", self.target_dir().display());
    }

    fn tell_completion(&self) {
        println!("Directory created.");
    }

    fn tell_not_needed(&self) {
        println!("Directory already exists");
    }

    fn execute(&self, _force: bool) -> SetupResult {
        let target_dir = self.target_dir();
        if target_dir.is_dir() {
            return Ok(SetupOutcome::NotNeeded);
        } else if target_dir.exists() {
            return Ok(SetupOutcome::Skipped("target directory exists as a file, which is not expected".to_string()));
        }

        std::fs::create_dir_all(&target_dir)?;
        Ok(SetupOutcome::Executed)
    }
}
