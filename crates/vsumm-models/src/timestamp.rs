//! Timestamp formatting for segment windows.

/// Format seconds into `H:MM:SS` or `H:MM:SS.ffffff`.
///
/// # Examples
/// ```
/// use vsumm_models::timestamp::format_seconds;
/// assert_eq!(format_seconds(90.0), "0:01:30");
/// assert_eq!(format_seconds(3661.5), "1:01:01.500000");
/// ```
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u64;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u64;
    let secs = total_secs % 60.0;
    let whole = secs.floor() as u64;
    let micros = ((secs - secs.floor()) * 1_000_000.0).round() as u64;

    if micros == 0 {
        format!("{}:{:02}:{:02}", hours, mins, whole)
    } else if micros >= 1_000_000 {
        // Rounding carried into the next second
        format_seconds(total_secs.ceil())
    } else {
        format!("{}:{:02}:{:02}.{:06}", hours, mins, whole, micros)
    }
}
