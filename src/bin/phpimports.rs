//! phpimports CLI
//!
//! Fixes the `use` header of one PHP file: prints the result, or rewrites
//! the file in place with `--write`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use phpimports::{
    Error, ImportsConfig, LineIndex, ProjectError, find_project_root, fix_imports, load_index,
};

#[derive(Parser)]
#[command(name = "phpimports")]
#[command(version, about, long_about = None)]
struct Cli {
    /// PHP file to fix
    file: PathBuf,

    /// Overwrite the file instead of printing the result
    #[arg(long)]
    write: bool,

    /// Project root (default: nearest directory with composer.json or .phpimports.toml)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}: {e}", cli.file.display());
            ExitCode::from(e.exit_code())
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    let source = fs::read_to_string(&cli.file).map_err(|e| io_error(&cli.file, e))?;

    let root = match &cli.root {
        Some(root) => root.clone(),
        None => find_project_root(&cli.file)
            .ok_or_else(|| ProjectError::MissingRoot(cli.file.clone()))?,
    };
    let config = ImportsConfig::load_from_project(&root)?;
    let project = load_index(&root, &config)?;
    info!(
        root = %root.display(),
        symbols = project.symbols.len(),
        "loaded symbol index"
    );

    let outcome = fix_imports(&source, &project.symbols, &config).inspect_err(|e| {
        if let Error::Parse(parse) = e {
            let at = LineIndex::new(&source).line_col(parse.range.start());
            eprintln!("  --> {}:{at}", cli.file.display());
        }
    })?;

    for diagnostic in outcome.warnings() {
        eprintln!("{}: {diagnostic}", cli.file.display());
    }
    info!(
        added = outcome.added.len(),
        removed = outcome.removed.len(),
        changed = outcome.changed,
        "fixed imports"
    );

    if cli.write {
        if outcome.changed {
            fs::write(&cli.file, &outcome.text).map_err(|e| io_error(&cli.file, e))?;
        }
    } else {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(outcome.text.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|e| io_error(Path::new("<stdout>"), e))?;
    }
    Ok(())
}

fn io_error(path: &Path, source: io::Error) -> Error {
    ProjectError::Io {
        path: path.to_path_buf(),
        source,
    }
    .into()
}
