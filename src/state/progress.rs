//! Word-progress matching between generated text and a challenge's target words.

use crate::state::words::{is_typeable, sanitize};

/// How a finished (or abandoned) session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every target word was revealed.
    Solved,
    /// The attempt budget ran out first.
    Exhausted,
    /// Neither; the session was cut short (rotation, advancement).
    Unfinished,
}

/// Progress vector for a fresh session: words that can never be typed start revealed.
pub fn initial_progress(words: &[String]) -> Vec<bool> {
    words.iter().map(|word| !is_typeable(word)).collect()
}

/// Mark every target index whose word is contained in a token of `generated`.
///
/// Returns the number of newly satisfied indices. Indices already satisfied are
/// left untouched, so progress never regresses.
pub fn apply_matches(progress: &mut [bool], words: &[String], generated: &str) -> usize {
    debug_assert_eq!(progress.len(), words.len());

    let tokens = sanitize(generated);
    let mut revealed = 0;
    for (found, word) in progress.iter_mut().zip(words) {
        if *found || word.is_empty() {
            continue;
        }
        if tokens.iter().any(|token| token.contains(word.as_str())) {
            *found = true;
            revealed += 1;
        }
    }
    revealed
}

/// A challenge is over once every word is found or no attempts remain.
pub fn is_complete(progress: &[bool], attempts: usize, max_attempts: usize) -> bool {
    attempts >= max_attempts || progress.iter().all(|found| *found)
}

/// Classify the end state of a progress vector.
pub fn outcome(progress: &[bool], attempts: usize, max_attempts: usize) -> Outcome {
    if progress.iter().all(|found| *found) {
        Outcome::Solved
    } else if attempts >= max_attempts {
        Outcome::Exhausted
    } else {
        Outcome::Unfinished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(quote: &str) -> Vec<String> {
        sanitize(quote)
    }

    #[test]
    fn substring_match_reveals_stemmed_word() {
        let targets = words("Always remember that you are absolutely unique");
        assert_eq!(targets.len(), 7);

        let mut progress = initial_progress(&targets);
        let revealed = apply_matches(&mut progress, &targets, "Such uniqueness is rare.");

        assert_eq!(revealed, 1);
        assert_eq!(
            progress,
            vec![false, false, false, false, false, false, true]
        );
    }

    #[test]
    fn one_paragraph_can_reveal_many_words() {
        let targets = words("tie a knot in it");
        let mut progress = initial_progress(&targets);
        apply_matches(&mut progress, &targets, "Knots tied in a hurry: it works.");
        assert_eq!(progress, vec![true, true, true, true, true]);
    }

    #[test]
    fn duplicates_are_matched_positionally() {
        let targets = words("by the harvest but by the seeds");
        let mut progress = initial_progress(&targets);
        apply_matches(&mut progress, &targets, "nearby");
        assert_eq!(
            progress,
            vec![true, false, false, false, true, false, false]
        );
    }

    #[test]
    fn progress_never_regresses() {
        let targets = words("hang on");
        let mut progress = initial_progress(&targets);
        apply_matches(&mut progress, &targets, "hanging");
        assert_eq!(progress, vec![true, false]);

        let revealed = apply_matches(&mut progress, &targets, "nothing relevant");
        assert_eq!(revealed, 0);
        assert_eq!(progress, vec![true, false]);
    }

    #[test]
    fn untypeable_words_start_revealed() {
        let targets = words("Le café est noir");
        assert_eq!(initial_progress(&targets), vec![false, true, false, false]);
    }

    #[test]
    fn completion_by_words_or_attempts() {
        assert!(!is_complete(&[true, false], 3, 5));
        assert!(is_complete(&[true, true], 3, 5));
        assert!(is_complete(&[false, false], 5, 5));

        assert_eq!(outcome(&[true, true], 5, 5), Outcome::Solved);
        assert_eq!(outcome(&[true, false], 5, 5), Outcome::Exhausted);
        assert_eq!(outcome(&[true, false], 2, 5), Outcome::Unfinished);
    }
}
