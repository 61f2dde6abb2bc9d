//! Title similarity scoring for duplicate detection.
//!
//! Produces a normalised score in `[0, 1]`:
//!
//! 1. Both titles are lowercased and stripped of everything except ASCII
//!    word characters, whitespace and CJK unified ideographs.
//! 2. Identical normalised titles score `1.0`.
//! 3. If one contains the other, the score is penalised by the length
//!    difference: `1.0 - |len(a) - len(b)| / max(len(a), len(b))`.
//! 4. Otherwise the score is the fraction of words in `a` that equal,
//!    contain, or are contained by some word in `b`, divided by the larger
//!    word count.
//!
//! Lengths are counted in characters, so CJK titles are not penalised for
//! their multi-byte encoding.

/// Compare two titles and return a similarity in `[0, 1]`.
///
/// Pure and deterministic. Two empty titles are identical and score `1.0`;
/// an empty title against a non-empty one scores `0.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let s1 = normalize_title(a);
    let s2 = normalize_title(b);

    if s1 == s2 {
        return 1.0;
    }

    if s1.contains(s2.as_str()) || s2.contains(s1.as_str()) {
        let len1 = s1.chars().count();
        let len2 = s2.chars().count();
        let max_len = len1.max(len2);
        return 1.0 - len1.abs_diff(len2) as f64 / max_len as f64;
    }

    let words1: Vec<&str> = s1.split_whitespace().collect();
    let words2: Vec<&str> = s2.split_whitespace().collect();
    let divisor = words1.len().max(words2.len());
    if divisor == 0 {
        return 0.0;
    }

    let common = words1
        .iter()
        .filter(|w1| {
            words2
                .iter()
                .any(|w2| w1 == &w2 || w1.contains(w2) || w2.contains(*w1))
        })
        .count();

    common as f64 / divisor as f64
}

/// Lowercase `title` and drop every character that is not an ASCII word
/// character, whitespace, or a CJK unified ideograph.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| is_ascii_word(*c) || c.is_whitespace() || is_cjk_ideograph(*c))
        .collect()
}

fn is_ascii_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_titles_score_one() {
        for title in ["Inception", "流浪地球", "The Dark Knight", "x"] {
            assert!(approx(similarity(title, title), 1.0), "{title}");
        }
    }

    #[test]
    fn both_empty_is_one() {
        assert!(approx(similarity("", ""), 1.0));
    }

    #[test]
    fn empty_against_non_empty_is_zero() {
        assert!(approx(similarity("", "Inception"), 0.0));
        assert!(approx(similarity("Inception", ""), 0.0));
    }

    #[test]
    fn case_and_punctuation_ignored() {
        assert!(approx(similarity("Spider-Man!", "spiderman"), 1.0));
        assert!(approx(similarity("INCEPTION", "inception"), 1.0));
    }

    #[test]
    fn containment_applies_length_penalty() {
        // "a b" (3 chars) inside "a b c" (5 chars): 1 - 2/5.
        assert!(approx(similarity("a b", "a b c"), 0.6));
        assert!(approx(similarity("a b c", "a b"), 0.6));
    }

    #[test]
    fn cjk_containment_counts_characters() {
        // 4 characters inside 5 characters: 1 - 1/5.
        assert!(approx(similarity("流浪地球", "流浪地球2"), 0.8));
    }

    #[test]
    fn sequel_is_below_duplicate_threshold() {
        assert!(similarity("Toy Story", "Toy Story 2") < 0.9);
    }

    #[test]
    fn word_overlap_branch() {
        // No containment; "dark" and "knight" match, "the" does not.
        let score = similarity("the dark knight", "knight dark rises");
        assert!(approx(score, 2.0 / 3.0));
    }

    #[test]
    fn word_overlap_counts_partial_word_containment() {
        // "star" is contained in "stars", "wars" equals "wars".
        assert!(approx(similarity("star wars", "wars of stars"), 2.0 / 3.0));
    }

    #[test]
    fn disjoint_titles_score_zero() {
        assert!(approx(similarity("alpha beta", "gamma delta"), 0.0));
    }

    #[test]
    fn whitespace_only_titles_do_not_divide_by_zero() {
        let score = similarity("\t", "  ");
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn score_is_symmetric_for_containment() {
        assert!(approx(
            similarity("Interstellar", "Interstellar IMAX"),
            similarity("Interstellar IMAX", "Interstellar")
        ));
    }

    #[test]
    fn normalize_keeps_cjk_and_strips_symbols() {
        assert_eq!(normalize_title("Hello, 世界!"), "hello 世界");
        assert_eq!(normalize_title("Amélie"), "amlie");
        assert_eq!(normalize_title("snake_case"), "snake_case");
    }

    #[test]
    fn score_always_in_unit_interval() {
        let titles = ["", "a", "a b", "the matrix", "矩阵", "Matrix Reloaded", "  "];
        for a in titles {
            for b in titles {
                let s = similarity(a, b);
                assert!((0.0..=1.0).contains(&s), "{a:?} vs {b:?} = {s}");
            }
        }
    }
}
