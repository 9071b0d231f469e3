//! Table formatting utilities for CLI output.

/// Truncates a string to at most `max_len` characters, adding "..." if cut.
///
/// # Examples
///
/// ```rust
/// use toolvisor_cli::presentation::truncate_string;
///
/// assert_eq!(truncate_string("Hello", 10), "Hello");
/// assert_eq!(truncate_string("Hello World", 8), "Hello...");
/// ```
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Format an optional value for table display, returning a default if None.
pub fn format_optional<T: std::fmt::Display>(value: Option<&T>, default: &str) -> String {
    value.map_or_else(|| default.to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_is_char_safe() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("ééééééééé", 5), "éé...");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(&4242), "--"), "4242");
        assert_eq!(format_optional::<u32>(None, "--"), "--");
    }
}
