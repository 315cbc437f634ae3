//! devmirror CLI - populate a sandbox device directory from the host's /dev

use clap::{Args, Parser, Subcommand};
use devmirror_core::{DevConfig, DevEntry, EntrySpec, MountOutcome, SystemHost};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "devmirror")]
#[command(author, version, about = "Read-only sandbox /dev built from an allowlist of host devices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount a tmpfs at the target root, copy the devices and seal it
    Mount {
        #[command(flatten)]
        target: TargetArgs,

        /// tmpfs size limit in KiB
        #[arg(long)]
        size_kb: Option<u64>,
    },

    /// Validate the device list without mounting or writing anything
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// List capabilities the current process is missing
    Caps,
}

#[derive(Args)]
struct TargetArgs {
    /// Device names, relative to the host root (e.g. null zero net/tun)
    names: Vec<String>,

    /// JSON config file; names on the command line are appended to its list
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host device root (default /dev)
    #[arg(long)]
    host_root: Option<PathBuf>,

    /// Sandbox device root (defaults to DEVMIRROR_TARGET env var or /srv/dev)
    #[arg(long)]
    target_root: Option<PathBuf>,

    /// Print entries as JSON
    #[arg(long)]
    json: bool,
}

impl TargetArgs {
    fn load(&self) -> devmirror_core::Result<DevConfig> {
        let mut config = match &self.config {
            Some(path) => DevConfig::from_file(path)?,
            None => DevConfig::default(),
        };
        if let Some(root) = &self.host_root {
            config.host_root.clone_from(root);
        }
        if let Some(root) = &self.target_root {
            config.target_root.clone_from(root);
        }
        config.devices.extend(self.names.iter().cloned());
        Ok(config)
    }
}

fn mount_config(target: &TargetArgs, size_kb: Option<u64>) -> devmirror_core::Result<DevConfig> {
    let mut config = target.load()?;
    if let Some(kb) = size_kb {
        config.set_tmpfs_size_kb(kb)?;
    }
    Ok(config)
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Messages already carry their causes
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("devmirror=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mount { target, size_kb } => {
            let config = mount_config(&target, size_kb)?;
            tracing::debug!(?config, "configuration loaded");

            match devmirror_core::mount_dev(&SystemHost, &config)? {
                MountOutcome::Skipped => {
                    println!("{} does not exist, nothing mounted", config.target_root.display());
                }
                MountOutcome::Sealed(entries) => print_entries(&entries, target.json)?,
            }
        }

        Commands::Check { target } => {
            let config = target.load()?;
            let entries = devmirror_core::check(&SystemHost, &config)?;
            print_entries(&entries, target.json)?;
        }

        Commands::Caps => {
            let missing = devmirror_core::privilege::missing_capabilities();
            if missing.is_empty() {
                println!("all required capabilities present");
            }
            for cap in missing {
                println!("missing {cap}");
            }
        }
    }

    Ok(())
}

fn print_entries(entries: &[DevEntry], json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    for entry in entries {
        match &entry.spec {
            EntrySpec::Node {
                kind,
                mode,
                major,
                minor,
            } => println!(
                "{:<24} {kind} {mode:04o} {major}:{minor}",
                entry.dest.display().to_string()
            ),
            EntrySpec::Symlink { target } => {
                println!("{:<24} -> {}", entry.dest.display().to_string(), target.display());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount_args(args: &[&str]) -> (TargetArgs, Option<u64>) {
        let cli = Cli::try_parse_from(["devmirror", "mount"].iter().chain(args)).unwrap();
        match cli.command {
            Commands::Mount { target, size_kb } => (target, size_kb),
            _ => unreachable!(),
        }
    }

    #[test]
    fn oversized_size_kb_is_a_config_error() {
        let (target, size_kb) = mount_args(&[
            "--target-root",
            "/nonexistent/devmirror",
            "--size-kb",
            "18446744073709551615",
            "null",
        ]);

        let err = mount_config(&target, size_kb).unwrap_err();
        assert!(matches!(err, devmirror_core::DevMirrorError::Config(_)));
    }

    #[test]
    fn size_kb_and_names_reach_config() {
        let (target, size_kb) = mount_args(&[
            "--host-root",
            "/host/dev",
            "--target-root",
            "/jail/dev",
            "--size-kb",
            "64",
            "null",
            "zero",
        ]);

        let config = mount_config(&target, size_kb).unwrap();
        assert_eq!(config.host_root, PathBuf::from("/host/dev"));
        assert_eq!(config.target_root, PathBuf::from("/jail/dev"));
        assert_eq!(config.devices, vec!["null", "zero"]);
        assert_eq!(config.tmpfs_size, Some(64 * 1024));
    }
}
