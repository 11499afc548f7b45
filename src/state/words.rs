//! Tokenisation shared by challenge quotes, generated content and player input.

/// Lowercase `text`, keep only letters and whitespace, then split on whitespace runs.
///
/// The same function builds a challenge's target words and the tokens compared
/// against them, so matching stays consistent on both sides.
pub fn sanitize(text: &str) -> Vec<String> {
    let clean: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();

    clean.split_whitespace().map(str::to_owned).collect()
}

/// Whether a target word can actually be typed by a player (plain ASCII letters).
pub fn is_typeable(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_digits() {
        assert_eq!(
            sanitize("Don't judge each day by the harvest, 2 times!"),
            vec!["dont", "judge", "each", "day", "by", "the", "harvest", "times"]
        );
    }

    #[test]
    fn empty_and_symbol_only_input_yield_nothing() {
        assert!(sanitize("").is_empty());
        assert!(sanitize("  123 -- !!! \t\n").is_empty());
    }

    #[test]
    fn tokens_are_lowercase_alphabetic_and_ordered() {
        let tokens = sanitize("Always REMEMBER that\tyou are   absolutely unique.");
        assert_eq!(
            tokens,
            vec!["always", "remember", "that", "you", "are", "absolutely", "unique"]
        );
        for token in &tokens {
            assert!(!token.is_empty());
            assert!(token.chars().all(|c| c.is_alphabetic() && !c.is_uppercase()));
        }
    }

    #[test]
    fn keeps_non_ascii_letters() {
        assert_eq!(sanitize("Café+Crème"), vec!["cafécrème"]);
        assert!(!is_typeable("café"));
        assert!(is_typeable("cafe"));
        assert!(!is_typeable(""));
    }
}
