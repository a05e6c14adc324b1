//! Battery facts: power draw, remaining energy and time left

use rtd3_error::{Result, Rtd3Error};
use tracing::warn;

use super::{Extractor, Fact, FactKind};
use crate::constants::{MICRO_PER_UNIT, SENTINEL};

/// Parse a sysfs micro-unit reading into base units, `None` on failure
pub fn parse_micro_reading(kind: FactKind, raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(micro) => Some(micro as f64 / MICRO_PER_UNIT),
        Err(e) => {
            let err = Rtd3Error::parse_failure(kind.name(), trimmed, e.to_string());
            warn!("{}", err);
            None
        }
    }
}

/// Hours of battery left at the current draw
///
/// Signed readings divide as-is. Zero draw or an unparsed reading yields `-1`.
pub fn remaining_time(power_now: Option<f64>, energy_now: Option<f64>) -> f64 {
    match (power_now, energy_now) {
        (Some(power), Some(energy)) if power != 0.0 => energy / power,
        _ => SENTINEL,
    }
}

pub struct PowerNowExtractor;

impl Extractor for PowerNowExtractor {
    fn extract(&self, raw: &str) -> Result<Fact> {
        Ok(Fact::PowerNow(parse_micro_reading(FactKind::PowerNow, raw)))
    }
}

pub struct EnergyNowExtractor;

impl Extractor for EnergyNowExtractor {
    fn extract(&self, raw: &str) -> Result<Fact> {
        Ok(Fact::EnergyNow(parse_micro_reading(FactKind::EnergyNow, raw)))
    }
}
