//! Terminal output for the mirror summary

use console::style;
use ftpmirror_sync::SyncResult;
use std::time::Duration;

/// Print the statistics of a finished run
pub fn display_sync_result(result: &SyncResult) {
    let stats = &result.stats;

    println!();
    println!("{}", style("Mirror Statistics:").bold().underlined());
    println!("  Files scanned: {}", style(stats.files_scanned).cyan());
    println!("  Files uploaded: {}", style(stats.files_uploaded).green());
    println!(
        "  Bytes uploaded: {}",
        style(format_bytes(stats.bytes_uploaded)).green()
    );
    println!("  Files unchanged: {}", style(stats.files_unchanged).dim());
    println!(
        "  Directories created: {}",
        style(stats.directories_created).green()
    );
    println!(
        "  Orphans deleted: {}",
        if stats.orphans_deleted > 0 {
            style(stats.orphans_deleted).yellow()
        } else {
            style(stats.orphans_deleted).dim()
        }
    );
    println!(
        "  Remote clock offset: {}",
        style(format_offset(result.time_offset.as_secs())).blue()
    );
    println!(
        "  Metadata queries: {}",
        style(if result.used_mlst { "MLST" } else { "MDTM + SIZE" }).blue()
    );
    println!(
        "  Duration: {}",
        style(format_duration(stats.duration)).blue()
    );
    println!(
        "  Transfer rate: {}/s",
        style(format_bytes(stats.transfer_rate() as u64)).blue().bold()
    );
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Signed clock offset, e.g. `+2h 0m 0s`
fn format_offset(seconds: i64) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let magnitude = Duration::from_secs(seconds.unsigned_abs());
    format!("{}{}", sign, format_duration(magnitude))
}

/// Display a success message with proper formatting
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), style(message).green());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0.00 B")]
    #[case(1023, "1023.00 B")]
    #[case(1536, "1.50 KB")]
    #[case(5 * 1024 * 1024, "5.00 MB")]
    fn test_format_bytes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_bytes(bytes), expected);
    }

    #[rstest]
    #[case(Duration::from_millis(1500), "1.50s")]
    #[case(Duration::from_secs(125), "2m 5s")]
    #[case(Duration::from_secs(7322), "2h 2m 2s")]
    fn test_format_duration(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(format_duration(duration), expected);
    }

    #[test]
    fn test_format_offset_sign() {
        assert_eq!(format_offset(-7200), "-2h 0m 0s");
        assert_eq!(format_offset(30), "+30.00s");
    }
}
