//! `zen-bundle`: merge userscript modules into one file.

use std::path::PathBuf;
use std::process::ExitCode;

use bundler_native::{run_build, BundleConfig, OptimizeMode, DEFAULT_CONFIG_FILE};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "zen-bundle", version, about = "Bundle userscript modules")]
struct Cli {
    /// Source root to scan for modules.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Path to the configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Output artifact path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Strip comments and collapse whitespace after validation.
    #[arg(long, conflicts_with = "full")]
    fast: bool,

    /// Run the full minifier after validation.
    #[arg(long)]
    full: bool,

    /// With --full, emit readable output instead of minified.
    #[arg(long)]
    pretty: bool,

    /// With --full, also write `<output>.map` and link it from the artifact.
    #[arg(long)]
    source_map: bool,

    /// Also write the unoptimized artifact as `<name>.debug.<ext>`.
    #[arg(long)]
    debug_copy: bool,

    /// Skip the lint stage.
    #[arg(long)]
    skip_lint: bool,

    /// External lint command; the artifact path is appended.
    #[arg(long, num_args = 1.., value_name = "CMD")]
    lint_cmd: Option<Vec<String>>,

    /// Enable debug output.
    #[arg(short, long)]
    verbose: bool,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn apply(self, mut config: BundleConfig) -> BundleConfig {
        if let Some(root) = self.root {
            config.source_root = root;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if self.fast {
            config.optimize = OptimizeMode::Fast;
        }
        if self.full {
            config.optimize = OptimizeMode::Full;
        }
        config.pretty |= self.pretty;
        config.source_map |= self.source_map;
        config.debug_copy |= self.debug_copy;
        config.skip_lint |= self.skip_lint;
        if self.lint_cmd.is_some() {
            config.lint_command = self.lint_cmd;
        }
        config
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = match BundleConfig::load(&cli.config) {
        Ok(config) => cli.apply(config),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run_build(config) {
        Ok(summary) => {
            println!(
                "merged {} module(s), skipped {}, changed since last run {} -> {} ({} bytes)",
                summary.merged,
                summary.skipped,
                summary.changed,
                summary.output.display(),
                summary.bytes_final
            );
            if let Some(map) = &summary.source_map {
                println!("source map -> {}", map.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
