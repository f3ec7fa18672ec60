//! Text normalization for item and product names

/// Lower-cases `text`, keeps only `[a-z0-9 ]`, collapses runs of whitespace and trims.
///
/// Any whitespace character (tabs, newlines) counts as a word separator before
/// the character filter runs.
pub fn normalize(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !(ch.is_ascii_lowercase() || ch.is_ascii_digit()) {
            continue;
        }
        if pending_space && !output.is_empty() {
            output.push(' ');
        }
        pending_space = false;
        output.push(ch);
    }

    output
}

/// Whitespace tokens of an already normalized string.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::{normalize, tokens};

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(normalize("2 lbs. Organic Chicken-Breast!"), "2 lbs organic chickenbreast");
        assert_eq!(normalize("Ben & Jerry's"), "ben jerrys");
    }

    #[test]
    fn collapses_and_trims_whitespace() {
        assert_eq!(normalize("  Whole \t\n Milk  "), "whole milk");
        assert_eq!(normalize("a , b"), "a b");
    }

    #[test]
    fn empty_and_symbol_only_input_yield_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  --- !! "), "");
    }

    #[test]
    fn non_ascii_letters_are_dropped() {
        assert_eq!(normalize("Jalapeño Crème"), "jalapeo crme");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize("Fresh  Atlantic SALMON (wild)");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn splits_tokens_on_spaces() {
        assert_eq!(tokens("organic whole milk"), vec!["organic", "whole", "milk"]);
        assert!(tokens("").is_empty());
    }
}
