//! Shared CLI helpers: path expansion and number formatting.

use std::path::PathBuf;

use colored::Colorize;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Format a USD amount; sub-cent values keep enough digits to be readable.
pub fn format_cost(usd: f64) -> String {
    if usd == 0.0 {
        "$0".to_string()
    } else if usd < 0.01 {
        format!("${usd:.6}")
    } else {
        format!("${usd:.4}")
    }
}

/// Success rate as a percentage.
pub fn format_rate(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Check mark or cross.
pub fn flag(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

/// Print a section title.
pub fn print_title(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_home() {
        let result = expand_tilde("~/foo/config.json");
        assert!(result.ends_with("foo/config.json"));
        assert!(!result.starts_with("~"));
    }

    #[test]
    fn expand_tilde_no_tilde() {
        assert_eq!(expand_tilde("/etc/switchboard.json"), PathBuf::from("/etc/switchboard.json"));
        assert_eq!(expand_tilde("relative.json"), PathBuf::from("relative.json"));
    }

    #[test]
    fn format_cost_ranges() {
        assert_eq!(format_cost(0.0), "$0");
        assert_eq!(format_cost(0.000123), "$0.000123");
        assert_eq!(format_cost(1.5), "$1.5000");
    }

    #[test]
    fn format_rate_percent() {
        assert_eq!(format_rate(1.0), "100.0%");
        assert_eq!(format_rate(0.256), "25.6%");
    }
}
