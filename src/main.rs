use clap::Parser;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use scorex_installer::archive::TarGzExtractor;
use scorex_installer::checksum::load_checksums;
use scorex_installer::cleanup::spawn_interrupt_handler;
use scorex_installer::config::{InstallerConfig, resolve_bin_dir, resolve_target};
use scorex_installer::formula::{FormulaData, FormulaGenerator};
use scorex_installer::http::HttpClient;
use scorex_installer::release::{BINARY_NAME, DEFAULT_BASE_URL, DEFAULT_VERSION, ReleaseTable};
use scorex_installer::runtime::{RealRuntime, Runtime};
use scorex_installer::smoke::smoke_test;
use scorex_installer::{Arch, InstallError, Installer, OsFamily, PlatformDescriptor, Result};

/// scorex-installer - install the prebuilt scorex CLI
///
/// Picks the release archive for this machine, downloads it, verifies its
/// SHA-256 digest, installs the `scorex` binary and runs `scorex version`.
///
/// Examples:
///   scorex-installer install --checksums SHA256SUMS
///   scorex-installer resolve --os linux --arch x86_64
#[derive(Parser, Debug)]
#[command(author, version = env!("SCOREX_INSTALLER_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install directory (defaults to ~/.local/bin; also via SCOREX_BIN_DIR)
    #[arg(long, env = "SCOREX_BIN_DIR", value_name = "PATH", global = true)]
    pub bin_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download, verify and install scorex
    Install(InstallArgs),

    /// Print the release archive selected for a platform
    Resolve(ResolveArgs),

    /// Run `scorex version` on the installed binary
    Test(TestArgs),

    /// Print a Homebrew formula for a release
    Formula(FormulaArgs),
}

#[derive(clap::Args, Debug)]
pub struct ReleaseArgs {
    /// Release version, with or without a leading "v"
    #[arg(long, env = "SCOREX_VERSION", default_value = DEFAULT_VERSION)]
    pub version: String,

    /// Base URL the release archives are published under
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// sha256sum-style file with the digests of the release archives
    #[arg(long, value_name = "FILE")]
    pub checksums: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct TargetArgs {
    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Operating system (macos, linux); defaults to the host
    #[arg(long)]
    pub os: Option<OsFamily>,

    /// CPU architecture (arm64, x86_64); defaults to the host
    #[arg(long)]
    pub arch: Option<Arch>,

    /// Expected SHA-256 of the archive; wins over --checksums
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Download timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub download_timeout: u64,

    /// Smoke test timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub test_timeout: u64,

    /// Do not run `scorex version` after installing
    #[arg(long)]
    pub skip_test: bool,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the whole release target as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct TestArgs {
    /// Smoke test timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub test_timeout: u64,
}

#[derive(clap::Args, Debug)]
pub struct FormulaArgs {
    /// Release version, with or without a leading "v"
    #[arg(long, env = "SCOREX_VERSION", default_value = DEFAULT_VERSION)]
    pub version: String,

    /// Base URL the release archives are published under
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// sha256sum-style file with the digests of all release archives
    #[arg(long, value_name = "FILE")]
    pub checksums: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    let result = match cli.command {
        Commands::Install(args) => install(runtime, cli.bin_dir, args).await,
        Commands::Resolve(args) => resolve(&runtime, args),
        Commands::Test(args) => test(&runtime, cli.bin_dir, args).await,
        Commands::Formula(args) => formula(&runtime, args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn release_table<R: Runtime>(
    runtime: &R,
    base_url: &str,
    checksums: Option<&Path>,
) -> Result<ReleaseTable> {
    let table = ReleaseTable::new(base_url);
    match checksums {
        Some(path) => Ok(table.with_checksums(load_checksums(runtime, path)?)),
        None => Ok(table),
    }
}

fn target_platform(args: &TargetArgs) -> PlatformDescriptor {
    let platform = PlatformDescriptor::detect_with_overrides(args.os.clone(), args.arch.clone());
    debug!("Target platform: {}", platform);
    platform
}

fn installer_config<R: Runtime>(
    runtime: &R,
    bin_dir: Option<PathBuf>,
    args: TargetArgs,
) -> Result<InstallerConfig> {
    let platform = target_platform(&args);
    let bin_dir = resolve_bin_dir(runtime, bin_dir.as_deref())?;
    let mut config = InstallerConfig::new(platform, bin_dir);
    config.table = release_table(
        runtime,
        &args.release.base_url,
        args.release.checksums.as_deref(),
    )?;
    config.version = args.release.version;
    config.sha256 = args.sha256;
    Ok(config)
}

async fn install(runtime: RealRuntime, bin_dir: Option<PathBuf>, args: InstallArgs) -> Result<()> {
    let mut config = installer_config(&runtime, bin_dir, args.target)?;
    config.download_timeout = Duration::from_secs(args.download_timeout);
    config.smoke_test_timeout = (!args.skip_test).then(|| Duration::from_secs(args.test_timeout));

    let source = HttpClient::with_defaults().map_err(|e| InstallError::Io {
        operation: "creating HTTP client".to_string(),
        source: e,
    })?;
    let installer = Installer::new(runtime, source, TarGzExtractor);

    let interrupt = spawn_interrupt_handler(installer.cleanup_context());
    let outcome = installer.run(&config).await;
    interrupt.abort();

    let report = outcome.into_result()?;
    println!(
        "scorex {} installed to {}",
        report.target.version,
        report.artifact.dest_path.display()
    );
    Ok(())
}

fn resolve<R: Runtime>(runtime: &R, args: ResolveArgs) -> Result<()> {
    let platform = target_platform(&args.target);
    let release = &args.target.release;
    let table = release_table(runtime, &release.base_url, release.checksums.as_deref())?;
    let target = resolve_target(
        &table,
        &platform,
        &release.version,
        args.target.sha256.as_deref(),
    )?;

    if args.json {
        let json = serde_json::to_string_pretty(&target).map_err(|e| InstallError::Io {
            operation: "serializing release target".to_string(),
            source: e.into(),
        })?;
        println!("{}", json);
    } else {
        println!("{}", target.url);
    }
    Ok(())
}

async fn test<R: Runtime>(runtime: &R, bin_dir: Option<PathBuf>, args: TestArgs) -> Result<()> {
    let binary = resolve_bin_dir(runtime, bin_dir.as_deref())?.join(BINARY_NAME);
    let result = smoke_test(&binary, Duration::from_secs(args.test_timeout)).await;

    if !result.passed {
        return Err(InstallError::SmokeTestFailure {
            binary,
            outcome: result.describe(),
        });
    }
    println!("{} version: ok", binary.display());
    Ok(())
}

fn formula<R: Runtime>(runtime: &R, args: FormulaArgs) -> Result<()> {
    let table = release_table(runtime, &args.base_url, Some(args.checksums.as_path()))?;
    let data = FormulaData::from_table(&table, &args.version)?;
    print!("{}", FormulaGenerator::generate(&data));
    Ok(())
}
