//! Fact extraction and support classification
//!
//! Every pseudo-file the tool reads is turned into a [`Fact`] by the
//! [`Extractor`] registered for its [`FactKind`]. Requirement facts are then
//! judged by the [`Classifier`] registered for their [`Requirement`].
//!
//! The [`Registry`] holding both maps is built once per process.

mod battery;
mod gpu;
mod requirements;

pub use battery::{parse_micro_reading, remaining_time, EnergyNowExtractor, PowerNowExtractor};
pub use gpu::{
    PciFunction, PciInfo, PciInfoExtractor, PowerStateExtractor, Rtd3StatusExtractor,
    RuntimeStatusExtractor,
};
pub use requirements::{
    AcpiClassifier, AcpiExtractor, AcpiTags, ChassisClassifier, ChassisExtractor,
    KernelClassifier, KernelExtractor, KernelVersion, S3Classifier, S3Extractor,
};

use std::collections::HashMap;
use std::fmt;

use rtd3_error::{Result, Rtd3Error};
use serde::Serialize;

use crate::config::Rtd3Config;
use crate::constants::{SENTINEL, UNKNOWN};

/// Every fact the tool knows how to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Kernel,
    Acpi,
    Chassis,
    S3,
    Rtd3Status,
    PowerState,
    RuntimeStatus,
    PowerNow,
    EnergyNow,
    PciInfo,
}

impl FactKind {
    pub const ALL: [FactKind; 10] = [
        FactKind::Kernel,
        FactKind::Acpi,
        FactKind::Chassis,
        FactKind::S3,
        FactKind::Rtd3Status,
        FactKind::PowerState,
        FactKind::RuntimeStatus,
        FactKind::PowerNow,
        FactKind::EnergyNow,
        FactKind::PciInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FactKind::Kernel => "kernel",
            FactKind::Acpi => "acpi",
            FactKind::Chassis => "chassis",
            FactKind::S3 => "s3",
            FactKind::Rtd3Status => "rtd3_status",
            FactKind::PowerState => "power_state",
            FactKind::RuntimeStatus => "runtime_status",
            FactKind::PowerNow => "power_now",
            FactKind::EnergyNow => "energy_now",
            FactKind::PciInfo => "pci_info",
        }
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four documented RTD3 hardware/firmware requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Kernel,
    Acpi,
    Chassis,
    S3,
}

impl Requirement {
    /// The fact a requirement is judged on
    pub fn fact_kind(self) -> FactKind {
        match self {
            Requirement::Kernel => FactKind::Kernel,
            Requirement::Acpi => FactKind::Acpi,
            Requirement::Chassis => FactKind::Chassis,
            Requirement::S3 => FactKind::S3,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fact_kind().name())
    }
}

/// A parsed fact, one variant per [`FactKind`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Fact {
    Kernel(KernelVersion),
    Acpi(AcpiTags),
    Chassis(String),
    S3(String),
    Rtd3Status(String),
    PowerState(String),
    RuntimeStatus(String),
    /// Watts, `None` when unparsable
    PowerNow(Option<f64>),
    /// Watt-hours, `None` when unparsable
    EnergyNow(Option<f64>),
    PciInfo(PciInfo),
}

impl Fact {
    pub fn kind(&self) -> FactKind {
        match self {
            Fact::Kernel(_) => FactKind::Kernel,
            Fact::Acpi(_) => FactKind::Acpi,
            Fact::Chassis(_) => FactKind::Chassis,
            Fact::S3(_) => FactKind::S3,
            Fact::Rtd3Status(_) => FactKind::Rtd3Status,
            Fact::PowerState(_) => FactKind::PowerState,
            Fact::RuntimeStatus(_) => FactKind::RuntimeStatus,
            Fact::PowerNow(_) => FactKind::PowerNow,
            Fact::EnergyNow(_) => FactKind::EnergyNow,
            Fact::PciInfo(_) => FactKind::PciInfo,
        }
    }

    /// Numeric reading in base units, for battery facts
    pub fn as_reading(&self) -> Option<f64> {
        match self {
            Fact::PowerNow(v) | Fact::EnergyNow(v) => *v,
            _ => None,
        }
    }

    /// Display value for report cells
    pub fn value(&self) -> String {
        match self {
            Fact::Kernel(version) => version.to_string(),
            Fact::Acpi(tags) => tags.to_string(),
            Fact::Chassis(s)
            | Fact::S3(s)
            | Fact::Rtd3Status(s)
            | Fact::PowerState(s)
            | Fact::RuntimeStatus(s) => text_or_unknown(s),
            Fact::PowerNow(v) | Fact::EnergyNow(v) => format_reading(v.unwrap_or(SENTINEL)),
            Fact::PciInfo(info) => info.to_string(),
        }
    }
}

fn text_or_unknown(s: &str) -> String {
    if s.is_empty() {
        UNKNOWN.to_string()
    } else {
        s.to_string()
    }
}

/// Format a base-unit reading; sentinels print as `-1`
pub fn format_reading(value: f64) -> String {
    format!("{}", value)
}

/// Turns raw pseudo-file content into a [`Fact`]
pub trait Extractor {
    fn extract(&self, raw: &str) -> Result<Fact>;
}

/// Decides whether a fact satisfies an RTD3 requirement
pub trait Classifier {
    fn supported(&self, fact: &Fact) -> bool;
}

/// Fixed mapping from fact kinds to extractors and requirements to classifiers
pub struct Registry {
    extractors: HashMap<FactKind, Box<dyn Extractor>>,
    classifiers: HashMap<Requirement, Box<dyn Classifier>>,
}

impl Registry {
    pub fn new(config: &Rtd3Config) -> Self {
        let mut extractors: HashMap<FactKind, Box<dyn Extractor>> = HashMap::new();
        extractors.insert(FactKind::Kernel, Box::new(KernelExtractor));
        extractors.insert(FactKind::Acpi, Box::new(AcpiExtractor));
        extractors.insert(FactKind::Chassis, Box::new(ChassisExtractor));
        extractors.insert(FactKind::S3, Box::new(S3Extractor));
        extractors.insert(FactKind::Rtd3Status, Box::new(Rtd3StatusExtractor));
        extractors.insert(FactKind::PowerState, Box::new(PowerStateExtractor));
        extractors.insert(FactKind::RuntimeStatus, Box::new(RuntimeStatusExtractor));
        extractors.insert(FactKind::PowerNow, Box::new(PowerNowExtractor));
        extractors.insert(FactKind::EnergyNow, Box::new(EnergyNowExtractor));
        extractors.insert(FactKind::PciInfo, Box::new(PciInfoExtractor));

        let mut classifiers: HashMap<Requirement, Box<dyn Classifier>> = HashMap::new();
        classifiers.insert(Requirement::Kernel, Box::new(KernelClassifier));
        classifiers.insert(Requirement::Acpi, Box::new(AcpiClassifier));
        classifiers.insert(
            Requirement::Chassis,
            Box::new(ChassisClassifier::new(config.notebook_chassis.clone())),
        );
        classifiers.insert(Requirement::S3, Box::new(S3Classifier));

        Self {
            extractors,
            classifiers,
        }
    }

    /// Run the extractor registered for `kind`
    pub fn extract(&self, kind: FactKind, raw: &str) -> Result<Fact> {
        let extractor = self
            .extractors
            .get(&kind)
            .ok_or_else(|| Rtd3Error::generic(format!("No extractor registered for {}", kind)))?;
        extractor.extract(raw)
    }

    /// Run the classifier registered for `requirement`
    pub fn classify(&self, requirement: Requirement, fact: &Fact) -> bool {
        self.classifiers
            .get(&requirement)
            .map(|c| c.supported(fact))
            .unwrap_or(false)
    }
}
