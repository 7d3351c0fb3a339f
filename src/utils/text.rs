/// Keep at most the last `max_chars` characters of `text`.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let skip = total - max_chars;
    match text.char_indices().nth(skip) {
        Some((offset, _)) => &text[offset..],
        None => "",
    }
}

/// Keep at most the first `max_chars` characters of `text`, marking the cut.
pub fn head_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => format!("{}…", &text[..offset]),
        None => text.to_string(),
    }
}

/// Case- and whitespace-insensitive form used to compare headlines.
pub fn normalize_headline(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_most_recent_characters() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("abc", 10), "abc");
        assert_eq!(tail_chars("", 0), "");
    }

    #[test]
    fn tail_respects_char_boundaries() {
        assert_eq!(tail_chars("héllo wörld", 5), "wörld");
    }

    #[test]
    fn head_marks_truncation() {
        assert_eq!(head_chars("abcdef", 3), "abc…");
        assert_eq!(head_chars("abc", 3), "abc");
    }

    #[test]
    fn headlines_normalize_case_and_spacing() {
        assert_eq!(
            normalize_headline("  Rust 2.0   Announced "),
            normalize_headline("rust 2.0 announced")
        );
    }
}
