use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use luapack::{BundleError, BundleTarget, Bundler, Config};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entry script, or a project directory containing a package.json with a `luapack` section
    source: PathBuf,

    /// Output bundled Lua file (defaults to `luapack.output` from the manifest)
    #[arg(short, long, conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Output bundled code to stdout instead of a file
    #[arg(long, conflicts_with = "output")]
    stdout: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Pretty-print the bundle instead of minifying it
    #[arg(long)]
    no_minify: bool,

    /// Prepend a comment naming the luapack version and entry script
    #[arg(short, long)]
    metadata: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("Starting luapack");
    debug!("Source: {:?}", cli.source);

    let mut config = Config::load(cli.config.as_deref())?;
    let target = BundleTarget::from_source(&cli.source)?;

    // Manifest options override configuration; flags override both.
    config = target.apply_to(config);
    if cli.no_minify {
        config.minify = false;
    }
    if cli.metadata {
        config.metadata = true;
    }
    debug!("Configuration: {:?}", config);

    let bundler = Bundler::new(config);

    if cli.stdout {
        let bundle = bundler.bundle_to_string(&target)?;
        io::stdout()
            .lock()
            .write_all(&bundle.code)
            .context("Failed to write bundle to stdout")?;
        info!("Bundle output to stdout");
        return Ok(());
    }

    let Some(output_path) = cli.output.or_else(|| target.manifest_output()) else {
        return Err(BundleError::configuration(
            &cli.source,
            "no output path; pass --output or --stdout, or set `luapack.output` in the manifest",
        )
        .into());
    };
    bundler.bundle(&target, &output_path)?;
    info!("Bundle created successfully at {:?}", output_path);

    Ok(())
}
