//! Core library for rtd3
//!
//! Checks the hardware, firmware and kernel requirements for NVIDIA Runtime
//! D3 power management, reports the live power state of discrete GPUs and
//! batteries, and installs or removes the udev rule and modprobe options that
//! enable it.

pub mod config;
pub mod constants;
pub mod enumerate;
pub mod facts;
pub mod install;
pub mod report;
pub mod source;

pub use config::{ModprobeOptions, PowerMode, ReadMode, Rtd3Config};
pub use enumerate::{enumerate_batteries, enumerate_gpus, BatteryState, GpuState};
pub use facts::{Fact, FactKind, Registry, Requirement};
pub use install::{
    install_all, install_file, uninstall_all, uninstall_file, InstallOutcome, ManagedFile,
    ManagedFileKind, UninstallOutcome,
};
pub use report::{ManagedFileStatus, RequirementCheck, StateReport, Table, VerifyReport};
pub use source::{FsSource, Source};

pub use rtd3_error::{Result, Rtd3Error};

use tracing::{debug, info};

/// Read and classify each configured requirement
pub fn verify_requirements(
    config: &Rtd3Config,
    source: &dyn Source,
    registry: &Registry,
) -> Result<VerifyReport> {
    let mut checks = Vec::with_capacity(config.requirements.len());

    for req in &config.requirements {
        let raw = source.read(&req.path, req.mode).unwrap_or_default();
        let fact = registry.extract(req.requirement.fact_kind(), &raw)?;
        let supported = registry.classify(req.requirement, &fact);
        debug!(check = %req.requirement, value = %fact.value(), supported, "Checked requirement");

        checks.push(RequirementCheck {
            name: req.requirement,
            path: req.path.clone(),
            mode: req.mode,
            value: fact.value(),
            supported,
        });
    }

    let report = VerifyReport { checks };
    info!(
        "{} of {} requirements supported",
        report.checks.iter().filter(|c| c.supported).count(),
        report.checks.len()
    );
    Ok(report)
}

/// Gather GPU and battery state plus managed file status
pub fn collect_state(
    config: &Rtd3Config,
    source: &dyn Source,
    registry: &Registry,
    options: &ModprobeOptions,
) -> StateReport {
    let gpus = enumerate_gpus(config, source, registry);
    let batteries = enumerate_batteries(config, source, registry);
    info!("Found {} NVIDIA GPU(s) and {} battery(ies)", gpus.len(), batteries.len());

    StateReport {
        gpus,
        batteries,
        files: config
            .managed_files(options)
            .iter()
            .map(ManagedFileStatus::of)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSource;
    use std::path::Path;

    #[test]
    fn test_verify_requirements_in_order() {
        let config = Rtd3Config::default();
        let registry = Registry::new(&config);
        let mut source = MockSource::new();
        source.expect_read().returning(|path: &Path, mode| {
            match (path.to_string_lossy().as_ref(), mode) {
                ("/proc/version", ReadMode::Text) => {
                    Some("Linux version 6.8.0-45-generic (buildd@lcy02)".to_string())
                }
                ("/sys/firmware/acpi/tables/DSDT", ReadMode::Binary) => {
                    Some("DSDT\u{0}_PR0\u{0}_PR3".to_string())
                }
                ("/sys/class/dmi/id/chassis_type", ReadMode::Text) => Some("10\n".to_string()),
                ("/sys/power/mem_sleep", ReadMode::Text) => Some("s2idle\n".to_string()),
                _ => None,
            }
        });

        let report = verify_requirements(&config, &source, &registry).unwrap();
        let rows: Vec<(String, String, bool)> = report
            .checks
            .iter()
            .map(|c| (c.name.to_string(), c.value.clone(), c.supported))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("kernel".to_string(), "6.8".to_string(), true),
                ("acpi".to_string(), "_PR0_PR3".to_string(), true),
                ("chassis".to_string(), "10".to_string(), true),
                ("s3".to_string(), "s2idle".to_string(), false),
            ]
        );
        assert!(!report.all_supported());
    }

    #[test]
    fn test_verify_with_nothing_readable() {
        let config = Rtd3Config::default();
        let registry = Registry::new(&config);
        let mut source = MockSource::new();
        source.expect_read().times(4).returning(|_, _| None);

        let report = verify_requirements(&config, &source, &registry).unwrap();
        assert_eq!(report.checks[0].value, "-1.-1");
        assert_eq!(report.checks[1].value, "");
        assert_eq!(report.checks[2].value, "Unknown");
        assert!(report.checks.iter().all(|c| !c.supported));
    }
}
