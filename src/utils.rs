//! Utility functions for ltfsadm

use std::io::{self, BufRead, Write};

/// Format duration in human-readable format
pub fn format_duration(duration_secs: f64) -> String {
    if duration_secs < 60.0 {
        format!("{:.1}s", duration_secs)
    } else if duration_secs < 3600.0 {
        let minutes = (duration_secs / 60.0) as u32;
        let seconds = duration_secs % 60.0;
        format!("{}m {:.1}s", minutes, seconds)
    } else {
        let hours = (duration_secs / 3600.0) as u32;
        let minutes = ((duration_secs % 3600.0) / 60.0) as u32;
        let seconds = duration_secs % 60.0;
        format!("{}h {}m {:.1}s", hours, minutes, seconds)
    }
}

/// Ask a yes/no question; anything but `y`/`yes` is a no
pub fn confirm<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    write!(output, "{} [y/N]: ", prompt)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
