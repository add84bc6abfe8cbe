/// Format a raw byte count into a human-readable string: "12.5 MB"
pub fn fmt_bytes(bytes: u64) -> String {
    fmt_bytes_f(bytes as f64)
}

/// Format a KiB/s rate as reported by md: "108.9 MB/s"
pub fn fmt_kib_rate(kib_per_sec: u64) -> String {
    fmt_bytes_f(kib_per_sec as f64 * 1024.0) + "/s"
}

fn fmt_bytes_f(b: f64) -> String {
    const TB: f64 = 1_099_511_627_776.0;
    const GB: f64 = 1_073_741_824.0;
    const MB: f64 = 1_048_576.0;
    const KB: f64 = 1_024.0;
    if b >= TB      { format!("{:.1} TB", b / TB) }
    else if b >= GB { format!("{:.1} GB", b / GB) }
    else if b >= MB { format!("{:.1} MB", b / MB) }
    else if b >= KB { format!("{:.1} KB", b / KB) }
    else            { format!("{:.0} B",  b) }
}

/// Format a percentage with one decimal: "84.5%"
pub fn fmt_pct(pct: f64) -> String {
    format!("{:.1}%", pct)
}

/// Format an estimated time remaining given in minutes: "2h 07m"
pub fn fmt_minutes(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as u64;
    if total >= 60 { format!("{}h {:02}m", total / 60, total % 60) }
    else { format!("{}m", total) }
}
