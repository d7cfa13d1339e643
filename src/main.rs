//! philtrack CLI.
//!
//! Commands:
//! - reduce: Reduce linked tracking tables into per-condition CSVs and a summary
//! - contacts: Run the interactive contact book

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use philtrack::contacts::{
    execute, AddressBook, Command, CommandKind, Contact, ContactDraft, ContactStore,
    DEFAULT_CONTACTS_FILE,
};
use philtrack::linking::PrelinkedTables;
use philtrack::pipeline::{Condition, Pipeline};
use philtrack::settings::TrackingSettings;

const HEADING: &str = "
                 Address Book
-----------------------------------------------
";

#[derive(Parser)]
#[command(name = "philtrack")]
#[command(version)]
#[command(about = "Particle-tracking kinematic reduction")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce linked observation tables
    Reduce {
        /// JSON settings file (missing keys take defaults)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Condition as NAME=FILE,FILE,... or FILE,FILE,... (name taken from
        /// the first file). Repeat for each condition.
        #[arg(long = "condition", required = true)]
        conditions: Vec<String>,

        /// Nominal frame rate
        #[arg(long)]
        fps: Option<f64>,

        /// Physical size of one pixel
        #[arg(long)]
        pixel_size: Option<f64>,

        /// Write one trajectory image per file
        #[arg(long)]
        paths: bool,

        /// Write the unreduced per-frame table per condition
        #[arg(long)]
        full_obj_data: bool,

        /// Output directory
        #[arg(long, env = "PHILTRACK_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Run the interactive contact book
    Contacts {
        /// Contact file
        #[arg(long, default_value = DEFAULT_CONTACTS_FILE)]
        file: PathBuf,
    },
}

fn parse_condition(arg: &str) -> Result<Condition> {
    let (name, files) = match arg.split_once('=') {
        Some((name, files)) => (Some(name.trim()), files),
        None => (None, arg),
    };
    let files: Vec<PathBuf> = files
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(PathBuf::from)
        .collect();

    let condition = match name {
        Some(name) => Condition::new(name, files),
        None => Condition::from_files(files),
    };
    condition.with_context(|| format!("Invalid condition '{arg}'"))
}

#[allow(clippy::too_many_arguments)]
fn run_reduce(
    settings_path: Option<PathBuf>,
    conditions: &[String],
    fps: Option<f64>,
    pixel_size: Option<f64>,
    paths: bool,
    full_obj_data: bool,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut settings = match settings_path {
        Some(path) => TrackingSettings::from_json_file(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => TrackingSettings::default(),
    };
    if let Some(fps) = fps {
        settings.fps = fps;
    }
    if let Some(pixel_size) = pixel_size {
        settings.pixel_size = pixel_size;
    }
    settings.paths |= paths;
    settings.full_obj_data |= full_obj_data;
    if let Some(output_dir) = output_dir {
        settings.output_dir = output_dir;
    }

    let conditions = conditions
        .iter()
        .map(|arg| parse_condition(arg))
        .collect::<Result<Vec<_>>>()?;

    let pipeline = Pipeline::new(settings, PrelinkedTables::new())?;
    let report = pipeline.run(&conditions)?;

    for summary in &report.summaries {
        info!(
            condition = %summary.condition,
            files = summary.file_count,
            particles = summary.particle_count,
            average_speed = summary.average_speed,
            speed_sem = summary.speed_sem,
            "Summary"
        );
    }
    if !report.diagnostics.is_empty() {
        warn!(skipped = report.diagnostics.len(), "Some files were skipped");
        eprint!("{}", report.diagnostics_text());
    }
    for output in &report.outputs {
        println!("{}", output.display());
    }

    Ok(())
}

/// Line-oriented prompt over stdin/stdout.
struct Prompt<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    fn ask(&mut self, question: &str) -> Result<String> {
        writeln!(self.output, "{question}")?;
        write!(self.output, ">> ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("Input closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    fn contact(&mut self) -> Result<Contact> {
        self.say("To skip any of the field entries, just enter 'skip'")?;
        let draft = loop {
            if let Some(draft) = ContactDraft::new(&self.ask("Enter first name:")?) {
                break draft;
            }
            self.say("Sorry first name cannot be skipped or blank")?;
        };

        let draft = draft.last_name(&self.ask("Enter last name:")?);
        self.say(&draft.entered().join("\n"))?;
        let draft = draft.address(&self.ask("Enter address:")?);
        self.say(&draft.entered().join("\n"))?;
        let draft = draft.phone(&self.ask("Enter phone number (no dashes or spaces):")?);
        self.say(&draft.entered().join("\n"))?;
        let draft = draft.email(&self.ask("Enter email address:")?);
        Ok(draft.build())
    }

    fn name(&mut self, book: &AddressBook) -> Result<String> {
        let answer = self.ask("Type first name of desired contact, otherwise type 'show contacts'")?;
        let compact: String = answer.split_whitespace().collect();
        if compact.eq_ignore_ascii_case("showcontacts") {
            self.say(&book.listing())?;
            return self.ask("Type first name of desired contact");
        }
        Ok(answer)
    }

    /// Gather the input a command kind needs.
    fn command(&mut self, kind: CommandKind, book: &AddressBook) -> Result<Command> {
        Ok(match kind {
            CommandKind::Add => Command::Add(self.contact()?),
            CommandKind::Help => Command::Help,
            CommandKind::Edit => {
                let name = self.name(book)?;
                let replacement = self.contact()?;
                Command::Edit { name, replacement }
            }
            CommandKind::Show => Command::Show,
            CommandKind::Delete => Command::Delete(self.name(book)?),
            CommandKind::Reset => {
                let answer = self
                    .ask("Are you SURE that you want to delete the entire address book? (y\\n)")?;
                let confirmation = if answer.trim().eq_ignore_ascii_case("y") {
                    self.ask("Type 'deleteAddressBook' to confirm (capitalization doesn't matter):")?
                } else {
                    String::new()
                };
                Command::Reset {
                    answer,
                    confirmation,
                }
            }
            CommandKind::Greet => Command::Greet,
            CommandKind::Exit => Command::Exit,
            CommandKind::Unknown => Command::Unknown,
        })
    }
}

fn run_contacts(file: PathBuf) -> Result<()> {
    let store = ContactStore::new(file);
    let mut book = store
        .load()
        .with_context(|| format!("Failed to load {}", store.path().display()))?;

    let stdin = io::stdin();
    let mut prompt = Prompt {
        input: stdin.lock(),
        output: io::stdout(),
    };

    loop {
        let keyword = prompt.ask(&format!("{HEADING}For List of Commands, type 'help'"))?;
        let kind = CommandKind::parse(&keyword);
        if kind == CommandKind::Help {
            prompt.say(HEADING)?;
        }
        let command = prompt.command(kind, &book)?;

        let (next, outcome) = execute(book, command);
        book = next;
        if outcome.mutated {
            store.save(&book)?;
        }
        prompt.say(&outcome.message)?;
        if outcome.exit {
            return Ok(());
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Reduce {
            settings,
            conditions,
            fps,
            pixel_size,
            paths,
            full_obj_data,
            output_dir,
        } => run_reduce(
            settings,
            &conditions,
            fps,
            pixel_size,
            paths,
            full_obj_data,
            output_dir,
        ),
        Commands::Contacts { file } => run_contacts(file),
    }
}
