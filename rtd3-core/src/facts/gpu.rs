//! Discrete GPU facts: PCI topology, RTD3 status and PCI power state

use std::fmt;

use rtd3_error::{Result, Rtd3Error};
use serde::Serialize;

use super::{Extractor, Fact};
use crate::constants::{RTD3_STATUS_MARKER, UNKNOWN};

/// Function of an NVIDIA PCI device, by function code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PciFunction {
    Graphics,
    Audio,
    UsbXhci,
    UsbUcsi,
}

impl PciFunction {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(PciFunction::Graphics),
            "1" => Some(PciFunction::Audio),
            "2" => Some(PciFunction::UsbXhci),
            "3" => Some(PciFunction::UsbUcsi),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PciFunction::Graphics => "VGA controller/3D controller",
            PciFunction::Audio => "Audio device",
            PciFunction::UsbXhci => "USB xHCI Host controller",
            PciFunction::UsbUcsi => "USB Type-c UCSI controller",
        }
    }
}

impl fmt::Display for PciFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A PCI address split into its parts
///
/// An address with fewer than three colon-separated segments degrades to
/// `-1` for domain, bus and device with no function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PciInfo {
    pub domain: String,
    pub bus: String,
    pub device: String,
    pub function: Option<PciFunction>,
}

impl PciInfo {
    fn degraded() -> Self {
        Self {
            domain: "-1".to_string(),
            bus: "-1".to_string(),
            device: "-1".to_string(),
            function: None,
        }
    }

    /// Split an address without resolving the function code.
    ///
    /// Returns the parsed parts and the raw function code, if any.
    pub fn split_address(address: &str) -> (Self, Option<String>) {
        let segments: Vec<&str> = address.trim().split(':').collect();
        if segments.len() < 3 {
            return (Self::degraded(), None);
        }

        let (device, code) = match segments[2].split_once('.') {
            Some((device, code)) => (device, Some(code.to_string())),
            None => (segments[2], None),
        };

        let info = Self {
            domain: segments[0].to_string(),
            bus: segments[1].to_string(),
            device: device.to_string(),
            function: None,
        };
        (info, code)
    }

    /// Parse an address, failing on an unknown function code
    pub fn parse(address: &str) -> Result<Self> {
        let (mut info, code) = Self::split_address(address);
        if let Some(code) = code {
            let function =
                PciFunction::from_code(&code).ok_or_else(|| Rtd3Error::UnknownPciFunction {
                    address: address.trim().to_string(),
                    code,
                })?;
            info.function = Some(function);
        }
        Ok(info)
    }

    /// Display text for the function cell
    pub fn function_name(&self) -> &'static str {
        self.function.map(PciFunction::description).unwrap_or(UNKNOWN)
    }

    /// Report rows for this address, in display order
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("domain", self.domain.clone()),
            ("bus", self.bus.clone()),
            ("device", self.device.clone()),
            ("function", self.function_name().to_string()),
        ]
    }
}

impl fmt::Display for PciInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} ({})",
            self.domain,
            self.bus,
            self.device,
            self.function_name()
        )
    }
}

pub struct PciInfoExtractor;

impl Extractor for PciInfoExtractor {
    fn extract(&self, raw: &str) -> Result<Fact> {
        PciInfo::parse(raw).map(Fact::PciInfo)
    }
}

/// First line of the driver power file, e.g. `Runtime D3 status:  Enabled (fine-grained)`
pub struct Rtd3StatusExtractor;

impl Extractor for Rtd3StatusExtractor {
    fn extract(&self, raw: &str) -> Result<Fact> {
        let status = raw
            .lines()
            .next()
            .filter(|line| line.contains(RTD3_STATUS_MARKER))
            .and_then(|line| line.split_once(':'))
            .map(|(_, value)| value.trim().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());
        Ok(Fact::Rtd3Status(status))
    }
}

pub struct PowerStateExtractor;

impl Extractor for PowerStateExtractor {
    fn extract(&self, raw: &str) -> Result<Fact> {
        Ok(Fact::PowerState(raw.trim().to_string()))
    }
}

pub struct RuntimeStatusExtractor;

impl Extractor for RuntimeStatusExtractor {
    fn extract(&self, raw: &str) -> Result<Fact> {
        Ok(Fact::RuntimeStatus(raw.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_address() {
        let info = PciInfo::parse("0000:01:00.0").unwrap();
        assert_eq!(info.domain, "0000");
        assert_eq!(info.bus, "01");
        assert_eq!(info.device, "00");
        assert_eq!(info.function, Some(PciFunction::Graphics));
        assert_eq!(info.function_name(), "VGA controller/3D controller");

        let audio = PciInfo::parse("0000:01:00.1\n").unwrap();
        assert_eq!(audio.function_name(), "Audio device");
    }

    #[test]
    fn test_parse_short_address_degrades() {
        let info = PciInfo::parse("01:00.0").unwrap();
        assert_eq!(info.domain, "-1");
        assert_eq!(info.bus, "-1");
        assert_eq!(info.device, "-1");
        assert!(info.function.is_none());
    }

    #[test]
    fn test_parse_without_function() {
        let info = PciInfo::parse("0000:01:00").unwrap();
        assert_eq!(info.device, "00");
        assert!(info.function.is_none());
        assert_eq!(info.function_name(), "Unknown");
    }

    #[test]
    fn test_unknown_function_code_is_an_error() {
        let err = PciInfo::parse("0000:01:00.7").unwrap_err();
        assert!(matches!(err, Rtd3Error::UnknownPciFunction { ref code, .. } if code == "7"));

        let (info, code) = PciInfo::split_address("0000:01:00.7");
        assert_eq!(info.bus, "01");
        assert_eq!(code.as_deref(), Some("7"));
    }

    #[test]
    fn test_rows_order() {
        let info = PciInfo::parse("0000:01:00.0").unwrap();
        let keys: Vec<_> = info.rows().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["domain", "bus", "device", "function"]);
    }

    #[test]
    fn test_rtd3_status() {
        let raw = "Runtime D3 status:          Enabled (fine-grained)\nVideo Memory:  Off\n";
        let fact = Rtd3StatusExtractor.extract(raw).unwrap();
        assert_eq!(fact.value(), "Enabled (fine-grained)");

        let other = Rtd3StatusExtractor.extract("Video Memory: Active\n").unwrap();
        assert_eq!(other.value(), "Unknown");

        let no_colon = Rtd3StatusExtractor.extract("Runtime D3 status").unwrap();
        assert_eq!(no_colon.value(), "Unknown");

        assert_eq!(Rtd3StatusExtractor.extract("").unwrap().value(), "Unknown");
    }

    #[test]
    fn test_power_state_trimmed() {
        assert_eq!(PowerStateExtractor.extract("D3cold\n").unwrap().value(), "D3cold");
        assert_eq!(
            RuntimeStatusExtractor.extract(" suspended \n").unwrap().value(),
            "suspended"
        );
    }
}
