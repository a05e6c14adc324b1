//! Runtime configuration
//!
//! [`Rtd3Config`] is built once at startup and passed by reference into every
//! component. All absolute paths from [`crate::constants::paths`] are resolved
//! against a system root, which is `/` on a live system and a temporary
//! directory in tests.

use std::fmt;
use std::path::{Path, PathBuf};

use rtd3_error::{Result, Rtd3Error};
use serde::Serialize;

use crate::constants::{self, paths, templates};
use crate::facts::Requirement;
use crate::install::{ManagedFile, ManagedFileKind};

/// How a pseudo-file is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    Text,
    /// Raw bytes decoded permissively
    Binary,
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadMode::Text => write!(f, "text"),
            ReadMode::Binary => write!(f, "binary"),
        }
    }
}

/// Where a requirement fact is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementSource {
    pub requirement: Requirement,
    pub path: PathBuf,
    pub mode: ReadMode,
}

/// NVreg_DynamicPowerManagement value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerMode {
    /// 0x00: dynamic power management disabled
    Disabled,
    /// 0x01: coarse-grained, GPU powered off only when no client is active
    Coarse,
    /// 0x02: fine-grained, GPU powered off whenever idle
    #[default]
    Fine,
}

impl PowerMode {
    pub fn as_u8(self) -> u8 {
        match self {
            PowerMode::Disabled => 0,
            PowerMode::Coarse => 1,
            PowerMode::Fine => 2,
        }
    }
}

impl TryFrom<u8> for PowerMode {
    type Error = Rtd3Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(PowerMode::Disabled),
            1 => Ok(PowerMode::Coarse),
            2 => Ok(PowerMode::Fine),
            other => Err(Rtd3Error::invalid_config(
                "powermode",
                format!("must be 0, 1 or 2, got {}", other),
            )),
        }
    }
}

/// Settings rendered into the modprobe options file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ModprobeOptions {
    pub power_mode: PowerMode,
    pub enable_firmware: bool,
}

impl ModprobeOptions {
    /// Build from the raw CLI integers, validating both ranges
    pub fn from_raw(power_mode: u8, enable_firmware: u8) -> Result<Self> {
        let enable_firmware = match enable_firmware {
            0 => false,
            1 => true,
            other => {
                return Err(Rtd3Error::invalid_config(
                    "enablefirmware",
                    format!("must be 0 or 1, got {}", other),
                ))
            }
        };
        Ok(Self {
            power_mode: PowerMode::try_from(power_mode)?,
            enable_firmware,
        })
    }

    pub fn render(&self) -> String {
        templates::modprobe_options(self.power_mode.as_u8(), u8::from(self.enable_firmware))
    }
}

/// Immutable configuration shared by all components
#[derive(Debug, Clone)]
pub struct Rtd3Config {
    root: PathBuf,
    pub requirements: Vec<RequirementSource>,
    pub nvidia_gpus_dir: PathBuf,
    pub power_supply_dir: PathBuf,
    pub pci_devices_dir: PathBuf,
    pub backup_suffix: String,
    pub notebook_chassis: Vec<String>,
}

impl Default for Rtd3Config {
    fn default() -> Self {
        Self::with_root("/")
    }
}

impl Rtd3Config {
    /// Configuration for a system mounted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let resolve = |abs: &str| root.join(abs.trim_start_matches('/'));

        let requirements = vec![
            RequirementSource {
                requirement: Requirement::Kernel,
                path: resolve(paths::PROC_VERSION),
                mode: ReadMode::Text,
            },
            RequirementSource {
                requirement: Requirement::Acpi,
                path: resolve(paths::ACPI_DSDT),
                mode: ReadMode::Binary,
            },
            RequirementSource {
                requirement: Requirement::Chassis,
                path: resolve(paths::CHASSIS_TYPE),
                mode: ReadMode::Text,
            },
            RequirementSource {
                requirement: Requirement::S3,
                path: resolve(paths::MEM_SLEEP),
                mode: ReadMode::Text,
            },
        ];

        Self {
            nvidia_gpus_dir: resolve(paths::NVIDIA_GPUS_DIR),
            power_supply_dir: resolve(paths::POWER_SUPPLY_DIR),
            pci_devices_dir: resolve(paths::PCI_DEVICES_DIR),
            requirements,
            backup_suffix: constants::BACKUP_SUFFIX.to_string(),
            notebook_chassis: constants::NOTEBOOK_CHASSIS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when operating on the live system rather than a mounted image
    pub fn is_system_root(&self) -> bool {
        self.root == Path::new("/")
    }

    /// Resolve an absolute system path against the configured root
    pub fn resolve(&self, abs: &str) -> PathBuf {
        self.root.join(abs.trim_start_matches('/'))
    }

    pub fn gpu_power_path(&self, pci: &str) -> PathBuf {
        self.nvidia_gpus_dir.join(pci).join(paths::GPU_POWER_FILE)
    }

    pub fn pci_power_state_path(&self, pci: &str) -> PathBuf {
        self.pci_devices_dir.join(pci).join(paths::PCI_POWER_STATE_FILE)
    }

    pub fn pci_runtime_status_path(&self, pci: &str) -> PathBuf {
        self.pci_devices_dir.join(pci).join(paths::PCI_RUNTIME_STATUS_FILE)
    }

    pub fn battery_power_now_path(&self, battery: &str) -> PathBuf {
        self.power_supply_dir.join(battery).join(paths::BATTERY_POWER_NOW_FILE)
    }

    pub fn battery_energy_now_path(&self, battery: &str) -> PathBuf {
        self.power_supply_dir.join(battery).join(paths::BATTERY_ENERGY_NOW_FILE)
    }

    fn candidates(&self, list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(|p| self.resolve(p)).collect()
    }

    /// The udev rule file definition
    pub fn udev_file(&self) -> ManagedFile {
        ManagedFile::new(
            ManagedFileKind::Udev,
            self.candidates(paths::UDEV_RULE_CANDIDATES),
            templates::UDEV_RULE.to_string(),
        )
    }

    /// The modprobe options file definition rendered with `options`
    pub fn modprobe_file(&self, options: &ModprobeOptions) -> ManagedFile {
        ManagedFile::new(
            ManagedFileKind::Modprobe,
            self.candidates(paths::MODPROBE_CANDIDATES),
            options.render(),
        )
    }

    /// Both managed files, udev first
    pub fn managed_files(&self, options: &ModprobeOptions) -> Vec<ManagedFile> {
        vec![self.udev_file(), self.modprobe_file(options)]
    }
}
