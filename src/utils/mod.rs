//! Utilities module for error handling, logging and formatting helpers

pub mod error;
pub mod logging;

pub use error::{Result, ResultExt, SslDatasetError};
pub use logging::{init_logging, LogConfig, LogLevel};

/// Format a number with thousands separator
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Render a horizontal bar proportional to `count / total`
pub fn format_bar(count: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return String::new();
    }
    let filled = (count as f64 / total as f64 * width as f64).round() as usize;
    "█".repeat(filled.min(width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(50000), "50,000");
        assert_eq!(format_number(42), "42");
    }

    #[test]
    fn test_format_bar() {
        assert_eq!(format_bar(5, 10, 10).chars().count(), 5);
        assert_eq!(format_bar(10, 10, 4).chars().count(), 4);
        assert!(format_bar(1, 0, 10).is_empty());
    }
}
