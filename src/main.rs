use clap::{ArgAction, Parser, Subcommand};
use env_logger::Env;
use mypoint::imaging::RustBackend;
use mypoint::{config, fingerprint, output, site};
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mypoint")]
#[command(about = "Static content-gallery generator: source media in, JSON API tree out")]
#[command(long_about = "\
Static content-gallery generator: source media in, JSON API tree out

The source directory holds the media, an optional static/ directory, and a
config.toml declaring one [[apis]] entry per collection. Each collection
selects files by glob, orders them, runs its plugin's transforms and is
written as a JSON tree:

  <output>/
  ├── ...                          # copy of <source>/static/
  └── api/
      └── photos/                  # one directory per [[apis]] name
          ├── index.json           # list of objects (list_attributes)
          ├── 1/
          │   ├── index.json       # one object (detail_attributes)
          │   ├── dawn.jpg         # copied source, EXIF rotation applied
          │   └── thumbnail.jpg    # when [apis.thumbnail] is set
          └── 2/

Per-file metadata comes from the filesystem (path, filename, mtime, ctime)
and an optional YAML sidecar next to the file (dawn.jpg.yaml), whose keys
win.

Run 'mypoint gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate every collection declared in <FROM_DIR>/config.toml
    Generate {
        /// Source directory (holds config.toml)
        from_dir: PathBuf,
        /// Output directory
        output_dir: PathBuf,
    },
    /// Validate config and list what each collection would select
    Check {
        /// Source directory (holds config.toml)
        from_dir: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
    /// Print SHA-1 content fingerprints, sha1sum style
    Fingerprint {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(err) = run(cli.command) {
        eprintln!("error: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Generate {
            from_dir,
            output_dir,
        } => {
            let site_config = config::load_config(&from_dir)?;
            init_thread_pool(&site_config.processing);
            let report = site::build_site(
                &site_config,
                &from_dir,
                &output_dir,
                Arc::new(RustBackend::new()),
            )?;
            output::print_site_output(&report);
        }
        Command::Check { from_dir } => {
            println!("==> Checking {}", from_dir.display());
            let report = site::check_site(&from_dir)?;
            output::print_check_output(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Fingerprint { files } => {
            for path in &files {
                let digest = fingerprint::fingerprint_file(path)
                    .map_err(|e| format!("{}: {}", path.display(), e))?;
                println!("{}", output::format_fingerprint_line(&digest, path));
            }
        }
    }

    Ok(())
}

/// Log to stderr at `warn` by default; each `-v` raises the level.
fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
