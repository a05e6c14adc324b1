//! Constants for rtd3
//!
//! Centralizes pseudo-file paths, support thresholds, markers and the
//! content of the managed configuration files. Paths are absolute and get
//! resolved against the configured system root by [`crate::config`].

/// Pseudo-file and configuration paths, absolute from the system root
pub mod paths {
    /// Kernel version string
    pub const PROC_VERSION: &str = "/proc/version";

    /// ACPI Differentiated System Description Table (binary)
    pub const ACPI_DSDT: &str = "/sys/firmware/acpi/tables/DSDT";

    /// DMI chassis type code
    pub const CHASSIS_TYPE: &str = "/sys/class/dmi/id/chassis_type";

    /// Supported suspend-to-RAM modes
    pub const MEM_SLEEP: &str = "/sys/power/mem_sleep";

    /// One subdirectory per discrete GPU, named by PCI address
    pub const NVIDIA_GPUS_DIR: &str = "/proc/driver/nvidia/gpus";

    /// Power supplies; entries containing [`super::BATTERY_MARKER`] are batteries
    pub const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

    /// Base directory of PCI devices
    pub const PCI_DEVICES_DIR: &str = "/sys/bus/pci/devices";

    /// RTD3 status file, relative to a GPU directory
    pub const GPU_POWER_FILE: &str = "power";

    /// PCI power state, relative to a PCI device directory
    pub const PCI_POWER_STATE_FILE: &str = "power_state";

    /// Runtime PM status, relative to a PCI device directory
    pub const PCI_RUNTIME_STATUS_FILE: &str = "power/runtime_status";

    /// Instantaneous power draw (microwatts), relative to a battery directory
    pub const BATTERY_POWER_NOW_FILE: &str = "power_now";

    /// Remaining energy (microwatt-hours), relative to a battery directory
    pub const BATTERY_ENERGY_NOW_FILE: &str = "energy_now";

    /// udev rule install candidates; the first is the default target
    pub const UDEV_RULE_CANDIDATES: &[&str] = &[
        "/etc/udev/rules.d/80-nvidia-pm.rules",
        "/lib/udev/rules.d/80-nvidia-pm.rules",
    ];

    /// modprobe option install candidates; the first is the default target
    pub const MODPROBE_CANDIDATES: &[&str] = &[
        "/etc/modprobe.d/nvidia-pm.conf",
        "/etc/modprobe.d/nvidia.conf",
    ];
}

/// Suffix appended to an install path to form its backup path
pub const BACKUP_SUFFIX: &str = ".bak";

/// Display value used when a fact cannot be determined
pub const UNKNOWN: &str = "Unknown";

/// Sentinel for numeric readings that could not be parsed or computed
pub const SENTINEL: f64 = -1.0;

/// Sentinel for kernel version components that could not be parsed
pub const VERSION_SENTINEL: i64 = -1;

/// Oldest kernel (major, minor) with RTD3 support
pub const MIN_KERNEL_VERSION: (i64, i64) = (4, 18);

/// ACPI power resource methods required for runtime D3
pub const ACPI_PR0: &str = "_PR0";
pub const ACPI_PR3: &str = "_PR3";

/// mem_sleep mode string for suspend-to-RAM
pub const DEEP_SLEEP: &str = "deep";

/// Marker text on the first line of the NVIDIA GPU power file
pub const RTD3_STATUS_MARKER: &str = "Runtime D3 status";

/// Substring identifying battery entries under the power-supply directory
pub const BATTERY_MARKER: &str = "BAT";

/// sysfs power readings are in micro-units
pub const MICRO_PER_UNIT: f64 = 1_000_000.0;

/// DMI chassis type codes for notebook form factors
/// (8 Portable, 9 Laptop, 10 Notebook, 14 Sub Notebook)
pub const NOTEBOOK_CHASSIS: &[&str] = &["8", "9", "10", "14"];

/// Column padding used by the report tables
pub const TABLE_MARGIN: usize = 2;

/// Cell text of the separator row appended after each device block
pub const SEPARATOR_CELL: &str = "-----";

/// Default mode for installed configuration files
pub const CONFIG_FILE_MODE: u32 = 0o644;

/// Managed configuration file contents
pub mod templates {
    /// udev rule enabling runtime PM on bind and disabling it on unbind for
    /// NVIDIA VGA (0x030000), 3D (0x030200) and audio (0x040300) functions
    pub const UDEV_RULE: &str = r#"# Enable runtime PM for NVIDIA VGA/3D controller devices on driver bind
ACTION=="bind", SUBSYSTEM=="pci", ATTR{vendor}=="0x10de", ATTR{class}=="0x030000", TEST=="power/control", ATTR{power/control}="auto"
ACTION=="bind", SUBSYSTEM=="pci", ATTR{vendor}=="0x10de", ATTR{class}=="0x030200", TEST=="power/control", ATTR{power/control}="auto"

# Disable runtime PM for NVIDIA VGA/3D controller devices on driver unbind
ACTION=="unbind", SUBSYSTEM=="pci", ATTR{vendor}=="0x10de", ATTR{class}=="0x030000", TEST=="power/control", ATTR{power/control}="on"
ACTION=="unbind", SUBSYSTEM=="pci", ATTR{vendor}=="0x10de", ATTR{class}=="0x030200", TEST=="power/control", ATTR{power/control}="on"

# Enable runtime PM for NVIDIA Audio devices on driver bind
ACTION=="bind", SUBSYSTEM=="pci", ATTR{vendor}=="0x10de", ATTR{class}=="0x040300", TEST=="power/control", ATTR{power/control}="auto"

# Disable runtime PM for NVIDIA Audio devices on driver unbind
ACTION=="unbind", SUBSYSTEM=="pci", ATTR{vendor}=="0x10de", ATTR{class}=="0x040300", TEST=="power/control", ATTR{power/control}="on"
"#;

    /// modprobe options for the nvidia module
    pub fn modprobe_options(power_mode: u8, enable_firmware: u8) -> String {
        format!(
            "options nvidia \"NVreg_DynamicPowerManagement=0x{:02x}\"\noptions nvidia \"NVreg_EnableGpuFirmware={}\"\n",
            power_mode, enable_firmware
        )
    }
}
