//! Discrete GPU and battery discovery
//!
//! Devices are found by listing the NVIDIA driver and power-supply
//! directories, then each device's pseudo-files are read and extracted.
//! Devices come back in directory-listing order.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{ReadMode, Rtd3Config};
use crate::constants::{BATTERY_MARKER, SENTINEL, UNKNOWN};
use crate::facts::{remaining_time, Fact, FactKind, PciInfo, Registry};
use crate::source::Source;

/// Live state of one discrete GPU
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuState {
    pub address: String,
    pub pci: PciInfo,
    pub rtd3_status: String,
    pub power_state: String,
    pub runtime_status: String,
}

/// Live state of one battery, readings in W and Wh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryState {
    pub name: String,
    pub power_now: f64,
    pub energy_now: f64,
    /// Hours, `-1` when power is zero or a reading failed to parse
    pub remaining_time: f64,
}

fn read_raw(source: &dyn Source, path: &Path) -> String {
    source.read(path, ReadMode::Text).unwrap_or_default()
}

fn text_fact(source: &dyn Source, registry: &Registry, kind: FactKind, path: &Path) -> String {
    let raw = read_raw(source, path);
    match registry.extract(kind, &raw) {
        Ok(fact) => fact.value(),
        Err(e) => {
            warn!(fact = %kind, "{}", e);
            UNKNOWN.to_string()
        }
    }
}

fn reading_fact(
    source: &dyn Source,
    registry: &Registry,
    kind: FactKind,
    path: &Path,
) -> Option<f64> {
    let raw = read_raw(source, path);
    match registry.extract(kind, &raw) {
        Ok(fact) => fact.as_reading(),
        Err(e) => {
            warn!(fact = %kind, "{}", e);
            None
        }
    }
}

fn pci_info(registry: &Registry, address: &str) -> PciInfo {
    match registry.extract(FactKind::PciInfo, address) {
        Ok(Fact::PciInfo(info)) => info,
        Ok(other) => {
            warn!(address, "Unexpected fact {} for PCI address", other.kind());
            PciInfo::split_address(address).0
        }
        Err(e) => {
            warn!("{}", e);
            PciInfo::split_address(address).0
        }
    }
}

/// Every GPU bound to the NVIDIA driver
pub fn enumerate_gpus(
    config: &Rtd3Config,
    source: &dyn Source,
    registry: &Registry,
) -> Vec<GpuState> {
    let addresses = source.list(&config.nvidia_gpus_dir);
    if addresses.is_empty() {
        warn!(dir = %config.nvidia_gpus_dir.display(), "No NVIDIA GPUs found");
    }

    addresses
        .into_iter()
        .map(|address| {
            debug!(address = %address, "Reading GPU state");
            GpuState {
                pci: pci_info(registry, &address),
                rtd3_status: text_fact(
                    source,
                    registry,
                    FactKind::Rtd3Status,
                    &config.gpu_power_path(&address),
                ),
                power_state: text_fact(
                    source,
                    registry,
                    FactKind::PowerState,
                    &config.pci_power_state_path(&address),
                ),
                runtime_status: text_fact(
                    source,
                    registry,
                    FactKind::RuntimeStatus,
                    &config.pci_runtime_status_path(&address),
                ),
                address,
            }
        })
        .collect()
}

/// Every power supply whose name marks it as a battery
pub fn enumerate_batteries(
    config: &Rtd3Config,
    source: &dyn Source,
    registry: &Registry,
) -> Vec<BatteryState> {
    let batteries: Vec<String> = source
        .list(&config.power_supply_dir)
        .into_iter()
        .filter(|name| name.contains(BATTERY_MARKER))
        .collect();
    if batteries.is_empty() {
        warn!(dir = %config.power_supply_dir.display(), "No batteries found");
    }

    batteries
        .into_iter()
        .map(|name| {
            debug!(battery = %name, "Reading battery state");
            let power_now = reading_fact(
                source,
                registry,
                FactKind::PowerNow,
                &config.battery_power_now_path(&name),
            );
            let energy_now = reading_fact(
                source,
                registry,
                FactKind::EnergyNow,
                &config.battery_energy_now_path(&name),
            );
            BatteryState {
                name,
                power_now: power_now.unwrap_or(SENTINEL),
                energy_now: energy_now.unwrap_or(SENTINEL),
                remaining_time: remaining_time(power_now, energy_now),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSource;
    use mockall::predicate::function;

    fn fixture() -> (Rtd3Config, Registry) {
        let config = Rtd3Config::default();
        let registry = Registry::new(&config);
        (config, registry)
    }

    #[test]
    fn test_gpu_fan_out() {
        let (config, registry) = fixture();
        let mut source = MockSource::new();
        source
            .expect_list()
            .with(function(|dir: &Path| dir == Path::new("/proc/driver/nvidia/gpus")))
            .returning(|_| vec!["0000:01:00.0".to_string()]);
        source.expect_read().returning(|path, _| {
            let path = path.to_string_lossy();
            if path.ends_with("gpus/0000:01:00.0/power") {
                Some("Runtime D3 status:          Enabled (fine-grained)\n".to_string())
            } else if path.ends_with("power/runtime_status") {
                Some("suspended\n".to_string())
            } else if path.ends_with("power_state") {
                Some("D3cold\n".to_string())
            } else {
                None
            }
        });

        let gpus = enumerate_gpus(&config, &source, &registry);
        assert_eq!(gpus.len(), 1);
        let gpu = &gpus[0];
        assert_eq!(gpu.address, "0000:01:00.0");
        assert_eq!(gpu.pci.bus, "01");
        assert_eq!(gpu.pci.function_name(), "VGA controller/3D controller");
        assert_eq!(gpu.rtd3_status, "Enabled (fine-grained)");
        assert_eq!(gpu.power_state, "D3cold");
        assert_eq!(gpu.runtime_status, "suspended");
    }

    #[test]
    fn test_gpu_unreadable_files_are_unknown() {
        let (config, registry) = fixture();
        let mut source = MockSource::new();
        source
            .expect_list()
            .returning(|_| vec!["0000:01:00.5".to_string()]);
        source.expect_read().times(3).returning(|_, _| None);

        let gpus = enumerate_gpus(&config, &source, &registry);
        let gpu = &gpus[0];
        assert_eq!(gpu.pci.domain, "0000");
        assert_eq!(gpu.pci.device, "00");
        assert!(gpu.pci.function.is_none());
        assert_eq!(gpu.rtd3_status, "Unknown");
        assert_eq!(gpu.power_state, "Unknown");
        assert_eq!(gpu.runtime_status, "Unknown");
    }

    #[test]
    fn test_no_gpus() {
        let (config, registry) = fixture();
        let mut source = MockSource::new();
        source.expect_list().returning(|_| Vec::new());
        source.expect_read().never();
        assert!(enumerate_gpus(&config, &source, &registry).is_empty());
    }

    #[test]
    fn test_batteries_filtered_and_ordered() {
        let (config, registry) = fixture();
        let mut source = MockSource::new();
        source
            .expect_list()
            .with(function(|dir: &Path| dir == Path::new("/sys/class/power_supply")))
            .returning(|_| {
                vec![
                    "BAT1".to_string(),
                    "AC".to_string(),
                    "ucsi-source-psy-USBC000:001".to_string(),
                    "BAT0".to_string(),
                ]
            });
        source.expect_read().returning(|path, _| {
            let path = path.to_string_lossy();
            match (path.contains("BAT1"), path.ends_with("power_now")) {
                (true, true) => Some("5000000\n".to_string()),
                (true, false) => Some("50000000\n".to_string()),
                (false, true) => Some("0\n".to_string()),
                (false, false) => Some("42000000\n".to_string()),
            }
        });

        let batteries = enumerate_batteries(&config, &source, &registry);
        let names: Vec<_> = batteries.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["BAT1", "BAT0"]);

        assert_eq!(batteries[0].power_now, 5.0);
        assert_eq!(batteries[0].energy_now, 50.0);
        assert_eq!(batteries[0].remaining_time, 10.0);

        assert_eq!(batteries[1].power_now, 0.0);
        assert_eq!(batteries[1].remaining_time, -1.0);
    }

    #[test]
    fn test_battery_parse_failure_is_sentinel() {
        let (config, registry) = fixture();
        let mut source = MockSource::new();
        source
            .expect_list()
            .returning(|_| vec!["BAT0".to_string()]);
        source
            .expect_read()
            .returning(|_, _| Some("garbage".to_string()));

        let batteries = enumerate_batteries(&config, &source, &registry);
        assert_eq!(batteries[0].power_now, -1.0);
        assert_eq!(batteries[0].energy_now, -1.0);
        assert_eq!(batteries[0].remaining_time, -1.0);
    }

    #[test]
    fn test_battery_discharge_sign_is_kept() {
        let (config, registry) = fixture();
        let mut source = MockSource::new();
        source
            .expect_list()
            .returning(|_| vec!["BAT0".to_string()]);
        source.expect_read().returning(|path, _| {
            if path.to_string_lossy().ends_with("power_now") {
                Some("-5000000\n".to_string())
            } else {
                Some("50000000\n".to_string())
            }
        });

        let batteries = enumerate_batteries(&config, &source, &registry);
        assert_eq!(batteries[0].power_now, -5.0);
        assert_eq!(batteries[0].energy_now, 50.0);
        assert_eq!(batteries[0].remaining_time, -10.0);
    }
}
