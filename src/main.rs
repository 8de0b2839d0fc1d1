//! Constraint Layout CLI
//!
//! Usage:
//!   constraint-layout [OPTIONS] [FILE]
//!
//! Options:
//!   -W, --width <W>        Container width (unbounded if omitted)
//!   -H, --height <H>       Container height (unbounded if omitted)
//!       --wrap             Treat the given width/height as upper bounds
//!       --rtl              Resolve start/end anchors right-to-left
//!   -s, --set <NAME>       Constraint set to apply (first declared if omitted)
//!   -l, --labels <A,B>     Labels the selected variant must carry
//!   -c, --config <FILE>    Engine configuration (TOML format)
//!   -d, --debug            Also print helper frames
//!   -v, --verbose          Log resolution passes to stderr (repeat for more)
//!   -h, --help             Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use constraint_layout::{resolve_with_config, LayoutConfig, LayoutDirection, MeasureSpec, ResolveConfig};

#[derive(Parser)]
#[command(name = "constraint-layout")]
#[command(about = "Resolve constraint-set files into node frames")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Container width (unbounded if omitted)
    #[arg(short = 'W', long)]
    width: Option<f64>,

    /// Container height (unbounded if omitted)
    #[arg(short = 'H', long)]
    height: Option<f64>,

    /// Treat the given width/height as upper bounds instead of exact sizes
    #[arg(long)]
    wrap: bool,

    /// Resolve start/end anchors right-to-left
    #[arg(long)]
    rtl: bool,

    /// Constraint set to apply
    #[arg(short, long)]
    set: Option<String>,

    /// Labels the selected variant must carry
    #[arg(short, long, value_delimiter = ',')]
    labels: Vec<String>,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug mode: also print helper frames
    #[arg(short, long)]
    debug: bool,

    /// Log resolution passes to stderr
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn container_spec(size: Option<f64>, wrap: bool) -> MeasureSpec {
    match size {
        Some(size) if wrap => MeasureSpec::AtMost(size),
        Some(size) => MeasureSpec::Exactly(size),
        None => MeasureSpec::Unspecified,
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    // Load engine configuration
    let layout_config = match &cli.config {
        Some(path) => match LayoutConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => LayoutConfig::default(),
    };

    // Read input
    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let mut config = ResolveConfig::new()
        .with_layout(layout_config)
        .with_container(
            container_spec(cli.width, cli.wrap),
            container_spec(cli.height, cli.wrap),
        )
        .with_direction(if cli.rtl {
            LayoutDirection::RightToLeft
        } else {
            LayoutDirection::LeftToRight
        })
        .with_debug(cli.debug);
    if let Some(set) = cli.set {
        config = config.with_set(set, cli.labels);
    } else {
        config.labels = cli.labels;
    }

    match resolve_with_config(&source, config) {
        Ok(layout) => {
            for warning in &layout.warnings {
                eprintln!("Warning: {}", warning);
            }
            print!("{}", layout);
        }
        Err(constraint_layout::ResolveError::Parse(errors)) => {
            for error in errors {
                eprint!("{}", error.format(&source, &filename));
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
