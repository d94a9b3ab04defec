//! String utility functions

/// Check whether text contains at least one ASCII letter or digit
pub fn has_alphanumeric(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphanumeric())
}

/// Split a comma-separated tag string, trimming entries and dropping empties
pub fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Build a field key from a label: trimmed, lowercased, whitespace runs to `_`
pub fn slugify(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Split a comma-separated operand list (`10,20`), trimming each entry
pub fn split_operands(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_alphanumeric() {
        assert!(has_alphanumeric("a"));
        assert!(has_alphanumeric("--7--"));
        assert!(!has_alphanumeric("   "));
        assert!(!has_alphanumeric("!!!"));
        assert!(!has_alphanumeric("é"));
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("vip, summer ,,  "), vec!["vip", "summer"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Last Purchase   Date "), "last_purchase_date");
        assert_eq!(slugify("City"), "city");
        assert_eq!(slugify("Tab\tSeparated"), "tab_separated");
    }

    #[test]
    fn test_split_operands() {
        assert_eq!(split_operands(" 10 , 20 "), vec!["10", "20"]);
        assert_eq!(split_operands("a,,b"), vec!["a", "b"]);
    }
}
