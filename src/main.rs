//! swfcss CLI
//!
//! Usage:
//!   swfcss [OPTIONS] [INPUT]
//!
//! Options:
//!   -o, --out-dir <DIR>      Write every artifact into DIR
//!   --html <FILE>            Write the XHTML page to FILE
//!   -c, --config <FILE>      Conversion settings (TOML format)
//!   -p, --key-prefix <P>     Prefix for instance keys and CSS classes
//!   -s, --scale <F>          Stage scale factor
//!   --root <NAME>            Start the div tree at the named instance
//!   --no-renumber            Keep original sprite depths
//!   --renumber-only          Print the renumbered XML and exit
//!   -v, --verbose            Debug logging on stderr
//!   -h, --help               Print help

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::Level;

use swfcss::{ConvertConfig, ConvertError, Converter};

#[derive(Parser)]
#[command(name = "swfcss")]
#[command(about = "Convert SWF movie XML to SVG shapes and CSS keyframe animations")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Directory to write every artifact into
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Write the XHTML page to this file
    #[arg(long)]
    html: Option<PathBuf>,

    /// Conversion settings file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefix for instance keys and CSS classes
    #[arg(short = 'p', long)]
    key_prefix: Option<String>,

    /// Stage scale factor
    #[arg(short, long)]
    scale: Option<f64>,

    /// Instance name the div tree and class rules start at
    #[arg(long)]
    root: Option<String>,

    /// Keep original sprite depths
    #[arg(long)]
    no_renumber: bool,

    /// Print the renumbered XML document and exit
    #[arg(long)]
    renumber_only: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    // Load config, then let flags override it
    let mut config = match &cli.config {
        Some(path) => match ConvertConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ConvertConfig::default(),
    };
    if let Some(prefix) = &cli.key_prefix {
        config = config.with_key_prefix(prefix.as_str());
    }
    if let Some(scale) = cli.scale {
        config = config.with_scale_factor(scale);
    }
    if let Some(root) = &cli.root {
        config = config.with_root_name(root.as_str());
    }
    if cli.no_renumber {
        config = config.with_renumber(false);
    }
    if cli.renumber_only {
        config = config.with_renumber(true);
    }

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

    let conversion = match Converter::new(config).convert(&source) {
        Ok(c) => c,
        Err(ConvertError::Parse(e)) => {
            eprint!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.renumber_only {
        println!("{}", conversion.renumbered_xml());
        return;
    }

    let base = base_name(cli.input.as_deref());

    if let Some(dir) = &cli.out_dir {
        if let Err(e) = conversion.write_to_dir(dir, &base) {
            eprintln!("Error writing to '{}': {}", dir.display(), e);
            std::process::exit(1);
        }
    }

    if let Some(path) = &cli.html {
        if let Err(e) = fs::write(path, conversion.html(&base)) {
            eprintln!("Error writing '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }

    if cli.out_dir.is_none() && cli.html.is_none() {
        print!("{}", conversion.html(&base));
    }
}

/// Input file stem, `movie` for stdin
fn base_name(input: Option<&Path>) -> String {
    input
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "movie".to_string())
}
