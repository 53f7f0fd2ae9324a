//! Partial-name selection among playlist and room names

/// Outcome of [`best_match`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestMatch {
    /// A single viable option
    One(String),
    /// Zero or several options; the caller asks the user to pick
    Candidates(Vec<String>),
}

/// Pick the option meant by `selection`.
///
/// An exact match wins; otherwise options starting with `selection` are
/// considered, and only when there are none, options containing it.
/// Candidate lists are sorted.
pub fn best_match<'a, I>(selection: &str, options: I) -> BestMatch
where
    I: IntoIterator<Item = &'a str>,
{
    let options: Vec<&str> = options.into_iter().collect();
    if options.contains(&selection) {
        return BestMatch::One(selection.to_string());
    }

    let mut prefixed: Vec<String> = options
        .iter()
        .filter(|o| o.starts_with(selection))
        .map(|o| o.to_string())
        .collect();

    match prefixed.len() {
        1 => BestMatch::One(prefixed.remove(0)),
        0 => {
            let mut contained: Vec<String> = options
                .iter()
                .filter(|o| o.contains(selection))
                .map(|o| o.to_string())
                .collect();
            contained.sort();
            BestMatch::Candidates(contained)
        }
        _ => {
            prefixed.sort();
            BestMatch::Candidates(prefixed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENRES: [&str; 3] = ["rock", "rockabilly", "pop"];

    #[test]
    fn test_exact_match_wins() {
        assert_eq!(best_match("rock", GENRES), BestMatch::One("rock".into()));
    }

    #[test]
    fn test_ambiguous_prefix() {
        assert_eq!(
            best_match("ro", GENRES),
            BestMatch::Candidates(vec!["rock".into(), "rockabilly".into()])
        );
    }

    #[test]
    fn test_unique_prefix() {
        assert_eq!(best_match("po", GENRES), BestMatch::One("pop".into()));
    }

    #[test]
    fn test_substring_fallback_is_a_candidate_list() {
        assert_eq!(
            best_match("billy", GENRES),
            BestMatch::Candidates(vec!["rockabilly".into()])
        );
    }

    #[test]
    fn test_nothing_matches() {
        assert_eq!(best_match("jazz", GENRES), BestMatch::Candidates(vec![]));
    }
}
