//! Clock-style rendering of durations.

/// Render `secs` as `HH:MM:SS`, adding `.mmm` when there is a fractional part.
///
/// Negative input renders as zero.
///
/// ```
/// use vcut_models::timestamp::format_seconds;
/// assert_eq!(format_seconds(5400.0), "01:30:00");
/// assert_eq!(format_seconds(90.5), "00:01:30.500");
/// ```
pub fn format_seconds(secs: f64) -> String {
    let millis = (secs.max(0.0) * 1000.0).round() as u64;
    let (whole, frac) = (millis / 1000, millis % 1000);
    let clock = format!(
        "{:02}:{:02}:{:02}",
        whole / 3600,
        (whole / 60) % 60,
        whole % 60
    );

    if frac == 0 {
        clock
    } else {
        format!("{}.{:03}", clock, frac)
    }
}
