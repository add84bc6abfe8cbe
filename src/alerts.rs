use std::collections::BTreeMap;

use crate::config::AlertThresholds;
use crate::models::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info     => "INFO",
            Severity::Warning  => "WARN",
            Severity::Critical => "CRIT",
        }
    }

    /// Nagios-style plugin exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Severity::Info     => 0,
            Severity::Warning  => 1,
            Severity::Critical => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub severity: Severity,
    pub array:    String,
    pub device:   Option<String>,
    pub message:  String,
}

impl Alert {
    pub fn prefix(&self) -> String {
        match &self.device {
            Some(d) => format!("[{}/{}] ", self.array, d),
            None    => format!("[{}] ", self.array),
        }
    }
}

/// Evaluate health conditions for every array in the snapshot.
/// Returns a freshly built list sorted Critical → Warning → Info.
pub fn evaluate(snapshot: &Snapshot, mismatches: &BTreeMap<String, u64>, thr: &AlertThresholds) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = Vec::new();

    for array in &snapshot.arrays {
        let alert = |severity: Severity, device: Option<String>, message: String| Alert {
            severity,
            array: array.name.clone(),
            device,
            message,
        };

        // ── Members ───────────────────────────────────────────────────
        for dev in array.failing_devices() {
            alerts.push(alert(
                Severity::Critical,
                Some(dev.identifier.clone()),
                format!("member in slot {} marked faulty", dev.array_index),
            ));
        }

        if let Some(m) = array.members.as_ref().filter(|m| m.is_degraded()) {
            alerts.push(alert(
                Severity::Critical,
                None,
                format!("degraded: {}/{} members active [{}]", m.active_disks, m.raid_disks, m.slots),
            ));
        }

        if array.state == "inactive" {
            alerts.push(alert(Severity::Warning, None, "array is inactive".into()));
        }

        // ── Background operation ──────────────────────────────────────
        if let Some(op) = &array.op_status {
            let pct = op.progress_percent()
                .map(|p| format!(" ({:.1}%)", p))
                .unwrap_or_default();
            let severity = if op.kind.is_rebuild() || thr.warn_on_check {
                Severity::Warning
            } else {
                Severity::Info
            };
            alerts.push(alert(severity, None, format!("{} in progress{}", op.kind, pct)));
        }

        // ── Mismatch count ────────────────────────────────────────────
        if let Some(&count) = mismatches.get(&array.name) {
            if count > thr.mismatch_warn {
                alerts.push(alert(
                    Severity::Warning,
                    None,
                    format!("mismatch count {} above {}", count, thr.mismatch_warn),
                ));
            }
        }
    }

    // Sort: Critical first, then Warning, then Info
    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
    alerts
}

/// Highest severity present, `None` when there is nothing to report.
pub fn worst(alerts: &[Alert]) -> Option<Severity> {
    alerts.iter().map(|a| a.severity.clone()).max()
}
