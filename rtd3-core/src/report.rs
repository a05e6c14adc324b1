//! Tabular and JSON reports
//!
//! [`VerifyReport`] lists the four requirement checks, [`StateReport`] the
//! live GPU and battery state plus whether the managed files are installed.
//! Both render to a fixed-width [`Table`] or serialize to JSON.

use std::fmt;
use std::path::PathBuf;

use rtd3_error::Result;
use serde::Serialize;

use crate::config::ReadMode;
use crate::constants::{SEPARATOR_CELL, TABLE_MARGIN};
use crate::enumerate::{BatteryState, GpuState};
use crate::facts::{format_reading, Requirement};
use crate::install::{ManagedFile, ManagedFileKind};

/// A titled table where every column has the width of the widest cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    fn separator(&mut self) {
        self.push_row(vec![SEPARATOR_CELL; self.headers.len()]);
    }

    fn column_width(&self) -> usize {
        self.headers
            .iter()
            .chain(self.rows.iter().flatten())
            .map(|cell| cell.chars().count())
            .max()
            .unwrap_or(0)
            + TABLE_MARGIN
    }

    fn format_line(cells: &[String], width: usize) -> String {
        cells
            .iter()
            .map(|cell| format!("{:<width$}", cell, width = width))
            .collect()
    }

    pub fn render(&self) -> String {
        let width = self.column_width();
        let total = width * self.headers.len();

        let mut out = String::new();
        out.push_str(&center(&self.title, total, '='));
        out.push('\n');
        out.push_str(&Self::format_line(&self.headers, width));
        out.push('\n');
        out.push_str(&"-".repeat(total));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&Self::format_line(row, width));
            out.push('\n');
        }
        out.push_str(&"=".repeat(total));
        out.push('\n');
        out
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Center `text` in `width` columns of `fill`. The odd fill character goes
/// left only when both padding and width are odd.
fn center(text: &str, width: usize, fill: char) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let pad = width - len;
    let left = pad / 2 + (pad & width & 1);
    let right = pad - left;
    let fill = fill.to_string();
    format!("{}{}{}", fill.repeat(left), text, fill.repeat(right))
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// One row of the requirements report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementCheck {
    pub name: Requirement,
    pub path: PathBuf,
    pub mode: ReadMode,
    pub value: String,
    pub supported: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerifyReport {
    pub checks: Vec<RequirementCheck>,
}

impl VerifyReport {
    /// True when every check passed
    pub fn all_supported(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.supported)
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new("Requirements", &["Check", "Value", "Supported"]);
        for check in &self.checks {
            table.push_row([
                check.name.to_string(),
                check.value.clone(),
                yes_no(check.supported).to_string(),
            ]);
        }
        table
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Install status of one managed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedFileStatus {
    pub kind: ManagedFileKind,
    pub path: PathBuf,
    pub installed: bool,
}

impl ManagedFileStatus {
    pub fn of(file: &ManagedFile) -> Self {
        Self {
            kind: file.kind,
            path: file.resolve_install_path().to_path_buf(),
            installed: file.is_installed(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateReport {
    pub gpus: Vec<GpuState>,
    pub batteries: Vec<BatteryState>,
    pub files: Vec<ManagedFileStatus>,
}

impl StateReport {
    pub fn to_table(&self) -> Table {
        let mut table = Table::new("State", &["key", "value"]);

        for gpu in &self.gpus {
            for (key, value) in gpu.pci.rows() {
                table.push_row([key.to_string(), value]);
            }
            table.push_row(["rtd3_status", gpu.rtd3_status.as_str()]);
            table.push_row(["power_state", gpu.power_state.as_str()]);
            table.push_row(["runtime_status", gpu.runtime_status.as_str()]);
            table.separator();
        }

        for battery in &self.batteries {
            table.push_row(["battery", battery.name.as_str()]);
            table.push_row(["power_now".to_string(), format_reading(battery.power_now)]);
            table.push_row(["energy_now".to_string(), format_reading(battery.energy_now)]);
            table.push_row([
                "Remaining time".to_string(),
                format_reading(battery.remaining_time),
            ]);
            table.separator();
        }

        for file in &self.files {
            let status = if file.installed {
                format!("installed ({})", file.path.display())
            } else {
                "not installed".to_string()
            };
            table.push_row([format!("{} file", file.kind), status]);
        }

        table
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::PciInfo;

    #[test]
    fn test_center_matches_odd_even_rules() {
        assert_eq!(center("ab", 6, '='), "==ab==");
        assert_eq!(center("abc", 6, '='), "=abc==");
        assert_eq!(center("ab", 5, '='), "==ab=");
        assert_eq!(center("toolong", 3, '='), "toolong");
    }

    #[test]
    fn test_table_layout() {
        let mut table = Table::new("T", &["a", "b"]);
        table.push_row(["xyz", "1"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        // widest cell "xyz" (3) + margin 2 = 5 per column
        assert_eq!(lines[0], "====T=====");
        assert_eq!(lines[1], "a    b    ");
        assert_eq!(lines[2], "----------");
        assert_eq!(lines[3], "xyz  1    ");
        assert_eq!(lines[4], "==========");
    }

    #[test]
    fn test_verify_table() {
        let report = VerifyReport {
            checks: vec![RequirementCheck {
                name: Requirement::Kernel,
                path: PathBuf::from("/proc/version"),
                mode: ReadMode::Text,
                value: "6.8".to_string(),
                supported: true,
            }],
        };
        let table = report.to_table();
        assert_eq!(table.title, "Requirements");
        assert_eq!(table.rows, vec![vec!["kernel", "6.8", "True"]]);
        assert!(report.all_supported());
        assert!(!VerifyReport::default().all_supported());
    }

    #[test]
    fn test_state_table_rows() {
        let report = StateReport {
            gpus: vec![GpuState {
                address: "0000:01:00.0".to_string(),
                pci: PciInfo::parse("0000:01:00.0").unwrap(),
                rtd3_status: "Enabled (fine-grained)".to_string(),
                power_state: "D3cold".to_string(),
                runtime_status: "suspended".to_string(),
            }],
            batteries: vec![BatteryState {
                name: "BAT0".to_string(),
                power_now: 5.0,
                energy_now: 50.0,
                remaining_time: 10.0,
            }],
            files: vec![ManagedFileStatus {
                kind: ManagedFileKind::Udev,
                path: PathBuf::from("/etc/udev/rules.d/80-nvidia-pm.rules"),
                installed: false,
            }],
        };

        let keys: Vec<String> = report
            .to_table()
            .rows
            .into_iter()
            .map(|row| row[0].clone())
            .collect();
        assert_eq!(
            keys,
            vec![
                "domain",
                "bus",
                "device",
                "function",
                "rtd3_status",
                "power_state",
                "runtime_status",
                "-----",
                "battery",
                "power_now",
                "energy_now",
                "Remaining time",
                "-----",
                "udev file",
            ]
        );
    }

    #[test]
    fn test_json_output() {
        let report = StateReport {
            batteries: vec![BatteryState {
                name: "BAT0".to_string(),
                power_now: 0.0,
                energy_now: 40.0,
                remaining_time: -1.0,
            }],
            ..Default::default()
        };
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["batteries"][0]["name"], "BAT0");
        assert_eq!(json["batteries"][0]["remaining_time"], -1.0);
        assert!(json["gpus"].as_array().unwrap().is_empty());
    }
}
