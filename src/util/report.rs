use crossterm::style::{Color, Stylize};
use std::collections::BTreeMap;

use crate::alerts::{Alert, Severity};
use crate::models::{Array, Device, Snapshot};
use crate::util::human::{fmt_bytes, fmt_kib_rate, fmt_minutes, fmt_pct};

/// Text styling that degrades to plain text when color is off.
struct Painter {
    color: bool,
}

impl Painter {
    fn bold(&self, s: &str) -> String {
        if self.color { s.bold().to_string() } else { s.to_string() }
    }

    fn fg(&self, s: &str, color: Color) -> String {
        if self.color { s.with(color).to_string() } else { s.to_string() }
    }

    fn severity(&self, sev: &Severity) -> String {
        let label = format!("[{}]", sev.label());
        match sev {
            Severity::Critical => self.fg(&label, Color::Red),
            Severity::Warning  => self.fg(&label, Color::Yellow),
            Severity::Info     => self.fg(&label, Color::Cyan),
        }
    }
}

/// Generate a human-readable array report.
pub fn generate(
    snapshot:   &Snapshot,
    mismatches: &BTreeMap<String, u64>,
    alerts:     &[Alert],
    color:      bool,
) -> String {
    let p = Painter { color };
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut out = String::new();

    out.push_str("═══════════════════════════════════════════════\n");
    out.push_str(&format!("  {} {}\n", p.bold("Software RAID Report"), now));
    out.push_str("═══════════════════════════════════════════════\n\n");

    let personalities: Vec<String> = snapshot.personalities.iter().map(|l| l.to_string()).collect();
    out.push_str(&format!("  Personalities: {}\n\n",
        if personalities.is_empty() { "(none)".to_string() } else { personalities.join(" ") }));

    // ── Alerts ─────────────────────────────────────────────────────────
    out.push_str(&format!("── Alerts ({}) ─────────────────────────────────\n", alerts.len()));
    if alerts.is_empty() {
        out.push_str(&format!("  {}\n", p.fg("● All arrays healthy", Color::Green)));
    } else {
        for a in alerts {
            out.push_str(&format!("  {}  {}{}\n", p.severity(&a.severity), a.prefix(), a.message));
        }
    }
    out.push('\n');

    // ── Arrays ─────────────────────────────────────────────────────────
    out.push_str(&format!("── Arrays ({}) ─────────────────────────────────\n", snapshot.arrays.len()));
    for array in &snapshot.arrays {
        write_array(&mut out, &p, array, mismatches.get(&array.name).copied());
        out.push('\n');
    }

    out.push_str("═══════════════════════════════════════════════\n");
    out
}

fn write_array(out: &mut String, p: &Painter, array: &Array, mismatch: Option<u64>) {
    let state = if array.is_degraded() {
        p.fg(&array.state, Color::Red)
    } else if array.is_active() {
        p.fg(&array.state, Color::Green)
    } else {
        p.fg(&array.state, Color::Yellow)
    };
    let flags = if array.state_flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", array.state_flags.join(", "))
    };
    let members = array.members.as_ref()
        .map(|m| format!("  [{}/{}] [{}]", m.raid_disks, m.active_disks, m.slots))
        .unwrap_or_default();

    out.push_str(&format!(
        "  {:8} {}{} {:7} {:>10}  super {}{}\n",
        p.bold(&array.name), state, flags, array.level.to_string(),
        fmt_bytes(array.capacity_bytes()), array.superblock, members,
    ));

    let devices: Vec<String> = array.devices.iter().map(|d| device_label(p, d)).collect();
    out.push_str(&format!("    Members:   {}\n",
        if devices.is_empty() { "(none)".to_string() } else { devices.join("  ") }));

    if let Some(chunk) = array.chunk_kib {
        out.push_str(&format!("    Chunk:     {}\n", fmt_bytes(chunk * 1024)));
    }

    if let Some(bm) = &array.bitmap {
        let chunk = bm.chunk_kib.map(|c| format!(", {} chunk", fmt_bytes(c * 1024))).unwrap_or_default();
        let file  = bm.file.as_ref().map(|f| format!(", file {}", f)).unwrap_or_default();
        out.push_str(&format!(
            "    Bitmap:    {}/{} pages ({}){}{}\n",
            bm.pages_used, bm.pages_total, fmt_pct(bm.use_pct()), chunk, file,
        ));
    }

    if let Some(op) = &array.op_status {
        let pct = op.progress_percent().map(fmt_pct).unwrap_or_else(|_| "?".to_string());
        let mut line = format!("    {:<10} {}  ({}/{})", format!("{}:", capitalize(op.kind.keyword())),
            p.bold(&pct), op.progress_units, op.total_units);
        if let Some(min) = op.finish_minutes {
            line.push_str(&format!("  eta {}", fmt_minutes(min)));
        }
        if let Some(speed) = op.speed_kib_per_sec {
            line.push_str(&format!("  @ {}", fmt_kib_rate(speed)));
        }
        out.push_str(&line);
        out.push('\n');
    }

    if let Some(count) = mismatch {
        out.push_str(&format!("    Mismatch:  {}\n", count));
    }
}

fn device_label(p: &Painter, d: &Device) -> String {
    let mut label = format!("{}[{}]", d.identifier, d.array_index);
    if d.is_failing     { label.push_str("(F)"); }
    if d.is_spare       { label.push_str("(S)"); }
    if d.write_mostly   { label.push_str("(W)"); }
    if d.is_journal     { label.push_str("(J)"); }
    if d.is_replacement { label.push_str("(R)"); }

    if d.is_failing { p.fg(&label, Color::Red) }
    else if !d.in_use { p.fg(&label, Color::DarkGrey) }
    else { label }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None    => String::new(),
    }
}
