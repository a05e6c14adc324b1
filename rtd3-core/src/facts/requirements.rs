//! Requirement facts: kernel version, ACPI power resources, chassis, S3

use std::fmt;

use rtd3_error::Result;
use serde::Serialize;
use tracing::{debug, warn};

use super::{Classifier, Extractor, Fact};
use crate::constants::{ACPI_PR0, ACPI_PR3, DEEP_SLEEP, MIN_KERNEL_VERSION, VERSION_SENTINEL};

/// Kernel `(major, minor)` plus the release token it was parsed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelVersion {
    pub major: i64,
    pub minor: i64,
    pub release: String,
}

impl KernelVersion {
    pub fn parse(raw: &str) -> Self {
        let release = raw.split_whitespace().nth(2).unwrap_or_default().to_string();
        let mut parts = release.split('.');
        let numbers = match (parts.next(), parts.next()) {
            (Some(major), Some(minor)) => major.parse::<i64>().ok().zip(minor.parse::<i64>().ok()),
            _ => None,
        };

        match numbers {
            Some((major, minor)) => Self {
                major,
                minor,
                release,
            },
            None => {
                warn!(input = raw.trim(), "Could not parse kernel version");
                Self {
                    major: VERSION_SENTINEL,
                    minor: VERSION_SENTINEL,
                    release,
                }
            }
        }
    }

    pub fn as_tuple(&self) -> (i64, i64) {
        (self.major, self.minor)
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// ACPI power resource methods found in the DSDT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AcpiTags {
    pub pr0: bool,
    pub pr3: bool,
}

impl fmt::Display for AcpiTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pr0 {
            f.write_str(ACPI_PR0)?;
        }
        if self.pr3 {
            f.write_str(ACPI_PR3)?;
        }
        Ok(())
    }
}

pub struct KernelExtractor;

impl Extractor for KernelExtractor {
    fn extract(&self, raw: &str) -> Result<Fact> {
        Ok(Fact::Kernel(KernelVersion::parse(raw)))
    }
}

pub struct KernelClassifier;

impl Classifier for KernelClassifier {
    fn supported(&self, fact: &Fact) -> bool {
        match fact {
            Fact::Kernel(version) => version.as_tuple() >= MIN_KERNEL_VERSION,
            _ => false,
        }
    }
}

pub struct AcpiExtractor;

impl Extractor for AcpiExtractor {
    fn extract(&self, raw: &str) -> Result<Fact> {
        let tags = AcpiTags {
            pr0: raw.contains(ACPI_PR0),
            pr3: raw.contains(ACPI_PR3),
        };
        debug!(pr0 = tags.pr0, pr3 = tags.pr3, "Scanned DSDT");
        Ok(Fact::Acpi(tags))
    }
}

pub struct AcpiClassifier;

impl Classifier for AcpiClassifier {
    fn supported(&self, fact: &Fact) -> bool {
        matches!(fact, Fact::Acpi(AcpiTags { pr0: true, pr3: true }))
    }
}

pub struct ChassisExtractor;

impl Extractor for ChassisExtractor {
    fn extract(&self, raw: &str) -> Result<Fact> {
        Ok(Fact::Chassis(raw.trim().to_string()))
    }
}

/// Accepts DMI chassis codes from a configured notebook set
pub struct ChassisClassifier {
    codes: Vec<String>,
}

impl ChassisClassifier {
    pub fn new(codes: Vec<String>) -> Self {
        Self { codes }
    }
}

impl Classifier for ChassisClassifier {
    fn supported(&self, fact: &Fact) -> bool {
        match fact {
            Fact::Chassis(code) => self.codes.iter().any(|c| c == code),
            _ => false,
        }
    }
}

pub struct S3Extractor;

impl Extractor for S3Extractor {
    fn extract(&self, raw: &str) -> Result<Fact> {
        Ok(Fact::S3(raw.trim().to_string()))
    }
}

pub struct S3Classifier;

impl Classifier for S3Classifier {
    fn supported(&self, fact: &Fact) -> bool {
        match fact {
            Fact::S3(modes) => modes.contains(DEEP_SLEEP),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NOTEBOOK_CHASSIS;

    fn kernel_supported(raw: &str) -> (String, bool) {
        let fact = KernelExtractor.extract(raw).unwrap();
        (fact.value(), KernelClassifier.supported(&fact))
    }

    #[test]
    fn test_kernel_threshold() {
        assert_eq!(
            kernel_supported("Linux version 4.17.3 (gcc version 8.1.0)"),
            ("4.17".to_string(), false)
        );
        assert_eq!(
            kernel_supported("Linux version 4.18.0 (gcc version 8.1.0)"),
            ("4.18".to_string(), true)
        );
        assert_eq!(
            kernel_supported("Linux version 5.15.0-generic #1 SMP"),
            ("5.15".to_string(), true)
        );
        assert_eq!(kernel_supported("Linux version 10.0.1"), ("10.0".to_string(), true));
    }

    #[test]
    fn test_kernel_malformed() {
        assert_eq!(
            kernel_supported("Linux version unknown"),
            ("-1.-1".to_string(), false)
        );
        assert_eq!(kernel_supported(""), ("-1.-1".to_string(), false));
        assert_eq!(kernel_supported("Linux version 5"), ("-1.-1".to_string(), false));
    }

    #[test]
    fn test_kernel_keeps_release_token() {
        let version = KernelVersion::parse("Linux version 6.1.0-13-amd64 (debian)");
        assert_eq!(version.release, "6.1.0-13-amd64");
        assert_eq!(version.as_tuple(), (6, 1));
    }

    #[test]
    fn test_acpi_requires_both_tags() {
        let only_pr0 = AcpiExtractor.extract("xx_PR0yy").unwrap();
        assert_eq!(only_pr0.value(), "_PR0");
        assert!(!AcpiClassifier.supported(&only_pr0));

        let both = AcpiExtractor.extract("\u{0}_PR3 ... _PR0\u{0}").unwrap();
        assert_eq!(both.value(), "_PR0_PR3");
        assert!(AcpiClassifier.supported(&both));

        let none = AcpiExtractor.extract("").unwrap();
        assert_eq!(none.value(), "");
        assert!(!AcpiClassifier.supported(&none));
    }

    #[test]
    fn test_chassis_set() {
        let classifier =
            ChassisClassifier::new(NOTEBOOK_CHASSIS.iter().map(|c| c.to_string()).collect());
        let laptop = ChassisExtractor.extract("10\n").unwrap();
        assert_eq!(laptop.value(), "10");
        assert!(classifier.supported(&laptop));
        assert!(classifier.supported(&ChassisExtractor.extract(" 9 ").unwrap()));

        let desktop = ChassisExtractor.extract("3\n").unwrap();
        assert!(!classifier.supported(&desktop));

        let missing = ChassisExtractor.extract("").unwrap();
        assert_eq!(missing.value(), "Unknown");
        assert!(!classifier.supported(&missing));
    }

    #[test]
    fn test_s3_deep() {
        assert!(S3Classifier.supported(&S3Extractor.extract("s2idle [deep]\n").unwrap()));
        assert!(!S3Classifier.supported(&S3Extractor.extract("s2idle").unwrap()));
        assert!(!S3Classifier.supported(&S3Extractor.extract("").unwrap()));
    }
}
