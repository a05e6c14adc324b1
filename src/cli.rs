/*
 * This file is part of rtd3.
 *
 * Copyright (C) 2025 rtd3 contributors
 *
 * rtd3 is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * rtd3 is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with rtd3. If not, see <https://www.gnu.org/licenses/>.
 */

//! Command Line Interface
//!
//! Reports and progress lines are written to the given writer (stdout in
//! the binary); diagnostics go through tracing to stderr.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use rtd3_core::{
    collect_state, install_all, uninstall_all, verify_requirements, FsSource, ModprobeOptions,
    Registry, Rtd3Config,
};
use rtd3_error::{Result, Rtd3Error};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "rtd3")]
#[command(version)]
#[command(about = "RTD3 Tool: manage and diagnose NVIDIA GPU power management on hybrid laptops")]
#[command(long_about = "RTD3 Tool: manage and diagnose NVIDIA GPU power management on hybrid laptops

Checks the kernel, ACPI, chassis and suspend requirements for NVIDIA Runtime D3,
shows the live state of the discrete GPU and batteries, and installs the udev
rule and modprobe options that enable dynamic power management.

EXAMPLES:
    rtd3 info --verify                 Check RTD3 requirements
    rtd3 info --state                  Show dGPU and battery state
    rtd3 info --verify --format json   Requirements as JSON
    sudo rtd3 install                  Install udev rule and modprobe options
    sudo rtd3 install --powermode 1    Coarse-grained power management
    sudo rtd3 install --force          Overwrite even if a backup exists
    sudo rtd3 uninstall                Remove files and restore backups

ENVIRONMENT VARIABLES:
    RUST_LOG=debug         Override the diagnostic log level
    RTD3_ROOT=/mnt         Operate on a system mounted at /mnt

FILES:
    /etc/udev/rules.d/80-nvidia-pm.rules   udev rule
    /etc/modprobe.d/nvidia-pm.conf         modprobe options
    <file>.bak                             backup of a replaced file")]
#[command(propagate_version = true)]
pub struct Cli {
    /// System root to inspect and install into
    #[arg(long, global = true, env = "RTD3_ROOT", default_value = "/")]
    pub root: PathBuf,

    /// Report output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Increase diagnostic verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show requirement checks and live power state
    Info(InfoArgs),

    /// Install the udev rule and modprobe options (requires root)
    Install(InstallArgs),

    /// Remove the udev rule and modprobe options, restoring backups (requires root)
    Uninstall,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Verify system requirements as specified in NVIDIA docs
    #[arg(long)]
    pub verify: bool,

    /// Show the current state of the dGPU and battery
    #[arg(long)]
    pub state: bool,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// NVreg_DynamicPowerManagement: 0 disabled, 1 coarse-grained, 2 fine-grained
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub powermode: u8,

    /// NVreg_EnableGpuFirmware: 0 or 1
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub enablefirmware: u8,

    /// Overwrite the installed file even when a backup already exists
    #[arg(long)]
    pub force: bool,
}

// ============================================================================
// CLI Execution
// ============================================================================

/// Run the parsed command, writing output to stdout
pub fn run_cli(cli: &Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli, &mut out)
}

/// Run the parsed command, writing output to `out`
pub fn execute<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let config = Rtd3Config::with_root(&cli.root);
    debug!(root = %config.root().display(), command = ?cli.command, "Dispatching");

    match &cli.command {
        None => {
            write!(out, "{}", Cli::command().render_help())?;
            Ok(())
        }
        Some(Commands::Info(args)) => cmd_info(&config, args, cli.format, out),
        Some(Commands::Install(args)) => cmd_install(&config, args, out),
        Some(Commands::Uninstall) => cmd_uninstall(&config, out),
    }
}

/// Writes to the live system need root
fn require_root(config: &Rtd3Config, action: &str) -> Result<()> {
    // SAFETY: geteuid has no preconditions and only returns the effective user ID.
    if config.is_system_root() && unsafe { libc::geteuid() } != 0 {
        return Err(Rtd3Error::PermissionDenied(format!(
            "{} requires root privileges, run with: sudo rtd3 {}",
            action, action
        )));
    }
    Ok(())
}

// ============================================================================
// Info Command
// ============================================================================

fn cmd_info<W: Write>(
    config: &Rtd3Config,
    args: &InfoArgs,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    if !args.verify && !args.state {
        let mut cmd = Cli::command();
        if let Some(info) = cmd.find_subcommand_mut("info") {
            write!(out, "{}", info.render_help())?;
        }
        return Ok(());
    }

    let source = FsSource;
    let registry = Registry::new(config);

    let verify = if args.verify {
        Some(verify_requirements(config, &source, &registry)?)
    } else {
        None
    };
    let state = if args.state {
        Some(collect_state(
            config,
            &source,
            &registry,
            &ModprobeOptions::default(),
        ))
    } else {
        None
    };

    match format {
        OutputFormat::Text => {
            if let Some(report) = &verify {
                write!(out, "{}", report.to_table())?;
            }
            if let Some(report) = &state {
                write!(out, "{}", report.to_table())?;
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({ "verify": verify, "state": state });
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
    }
    Ok(())
}

// ============================================================================
// Install / Uninstall Commands
// ============================================================================

fn cmd_install<W: Write>(config: &Rtd3Config, args: &InstallArgs, out: &mut W) -> Result<()> {
    require_root(config, "install")?;
    let options = ModprobeOptions::from_raw(args.powermode, args.enablefirmware)?;
    let files = config.managed_files(&options);

    writeln!(out, "=== Installation started ===")?;
    let mut failed = 0;
    for (kind, result) in install_all(&files, &config.backup_suffix, args.force) {
        match result {
            Ok(outcome) => {
                writeln!(out, "{}", outcome)?;
                writeln!(out, "{} file installed successfully.", kind.label())?;
            }
            Err(e) => {
                failed += 1;
                writeln!(out, "{} file not installed: {}", kind.label(), e)?;
            }
        }
    }
    writeln!(out, "=== Installation finished ===")?;

    if failed > 0 {
        return Err(Rtd3Error::generic(format!(
            "{} of {} files were not installed",
            failed,
            files.len()
        )));
    }
    Ok(())
}

fn cmd_uninstall<W: Write>(config: &Rtd3Config, out: &mut W) -> Result<()> {
    require_root(config, "uninstall")?;
    let files = config.managed_files(&ModprobeOptions::default());

    writeln!(out, "=== Uninstallation started ===")?;
    let mut failed = 0;
    for (kind, result) in uninstall_all(&files, &config.backup_suffix) {
        match result {
            Ok(outcome) if outcome.is_noop() => {
                writeln!(out, "{} file not installed, nothing to delete.", kind.label())?;
            }
            Ok(outcome) => {
                for path in &outcome.removed {
                    writeln!(out, "Deleted: {}", path.display())?;
                }
                for path in &outcome.restored {
                    writeln!(out, "Restored: {}", path.display())?;
                }
                writeln!(out, "{} file deleted successfully.", kind.label())?;
            }
            Err(e) => {
                failed += 1;
                writeln!(out, "{} file not removed: {}", kind.label(), e)?;
            }
        }
    }
    writeln!(out, "=== Uninstallation finished ===")?;

    if failed > 0 {
        return Err(Rtd3Error::generic(format!(
            "{} of {} files were not removed",
            failed,
            files.len()
        )));
    }
    Ok(())
}
