use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages (default for verbose)
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Source document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Oai,
    Csv,
    Json,
    /// Pick a decoder by sniffing the input
    Auto,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oai => "oai",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Auto => "auto",
        }
    }
}

#[derive(Parser)]
#[command(name = "dswarm")]
#[command(about = "dswarm - compile mapping jobs and run them over bibliographic records")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses config file value or RUST_LOG
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to built-in settings)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

/// The program a run applies
///
/// With neither flag the decoder output is encoded unchanged.
#[derive(Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct ProgramArgs {
    /// Job description (JSON) to compile and run
    #[arg(long)]
    pub job: Option<PathBuf>,

    /// Compiled morph document (XML) to run
    #[arg(long)]
    pub script: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a job description into a morph document
    Compile {
        /// Job description (JSON)
        job: PathBuf,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a job description and list every problem found
    Validate {
        /// Job description (JSON)
        job: PathBuf,
    },

    /// Run a program over a source document and print the resulting model
    Run {
        #[command(flatten)]
        program: ProgramArgs,

        /// Source documents, each run as its own task
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Source format (overrides config file)
        #[arg(short, long, value_enum)]
        format: Option<InputFormat>,

        /// Print statements without record ids
        #[arg(long)]
        raw: bool,

        /// Also store the model in an in-process MemoryDb and print its schema
        #[arg(long)]
        store: bool,
    },

    /// Print the attribute paths a run produces
    Schema {
        #[command(flatten)]
        program: ProgramArgs,

        /// Source document
        input: PathBuf,

        /// Source format (overrides config file)
        #[arg(short, long, value_enum)]
        format: Option<InputFormat>,
    },
}
