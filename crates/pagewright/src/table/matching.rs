//! Row search over extracted table text.
//!
//! Everything here is pure: [`UiTable`](super::UiTable) pulls row texts from
//! the driver and hands them to these functions.
//!
//! A row matches when every candidate value matches some token of the row.
//! By default a token matches when it contains the candidate, ignoring case;
//! `exact` requires case-insensitive equality. Tokens and candidates are
//! compared trimmed.

/// Rows of rendered text need this many tokens to be searched
pub const MIN_TEXT_TOKENS: usize = 2;

/// Meta-table rows need more than this many cells by default
pub const DEFAULT_MIN_COLUMN_SIZE: usize = 1;

/// Normalize a candidate value.
///
/// The value is trimmed; a value containing `'` is reduced to the text after
/// the first quote, up to the next one.
///
/// ```
/// use pagewright::table::matching::normalize_candidate;
///
/// assert_eq!(normalize_candidate("  Alice "), "Alice");
/// assert_eq!(normalize_candidate("name 'Bob Smith' here"), "Bob Smith");
/// ```
#[must_use]
pub fn normalize_candidate(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.contains('\'') {
        trimmed.split('\'').nth(1).unwrap_or_default().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalize every candidate
#[must_use]
pub fn normalize_candidates<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values.iter().map(|v| normalize_candidate(v.as_ref())).collect()
}

/// Split a row's rendered text into cell tokens.
///
/// Cells are tab-separated and multi-line cells add newlines; blank tokens
/// are dropped.
#[must_use]
pub fn row_tokens(inner_text: &str) -> Vec<String> {
    inner_text
        .split(['\t', '\n'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether one token satisfies one candidate
#[must_use]
pub fn token_matches(token: &str, candidate: &str, exact: bool) -> bool {
    let token = token.trim().to_lowercase();
    let candidate = candidate.trim().to_lowercase();
    if exact {
        token == candidate
    } else {
        token.contains(&candidate)
    }
}

/// Whether every candidate is satisfied by some token
#[must_use]
pub fn row_matches<T: AsRef<str>, C: AsRef<str>>(tokens: &[T], candidates: &[C], exact: bool) -> bool {
    candidates.iter().all(|candidate| {
        tokens
            .iter()
            .any(|token| token_matches(token.as_ref(), candidate.as_ref(), exact))
    })
}

/// Indices of matching rows among all `rows`.
///
/// Rows with fewer than `min_tokens` tokens are never matched but still
/// count towards the indices of later rows.
#[must_use]
pub fn matching_rows<T: AsRef<str>, C: AsRef<str>>(
    rows: &[Vec<T>],
    candidates: &[C],
    exact: bool,
    min_tokens: usize,
) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, tokens)| tokens.len() >= min_tokens)
        .filter(|(_, tokens)| row_matches(tokens, candidates, exact))
        .map(|(index, _)| index)
        .collect()
}

/// First matching row, if any
#[must_use]
pub fn first_matching_row<T: AsRef<str>, C: AsRef<str>>(
    rows: &[Vec<T>],
    candidates: &[C],
    exact: bool,
    min_tokens: usize,
) -> Option<usize> {
    rows.iter()
        .enumerate()
        .find(|(_, tokens)| tokens.len() >= min_tokens && row_matches(tokens, candidates, exact))
        .map(|(index, _)| index)
}

/// Position of the header named `name`.
///
/// `exact` compares trimmed text case-sensitively, otherwise ignoring case.
#[must_use]
pub fn header_index<S: AsRef<str>>(headers: &[S], name: &str, exact: bool) -> Option<usize> {
    let wanted = name.trim();
    headers.iter().position(|header| {
        let header = header.as_ref().trim();
        if exact {
            header == wanted
        } else {
            header.to_lowercase() == wanted.to_lowercase()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text_rows(rows: &[&str]) -> Vec<Vec<String>> {
        rows.iter().map(|r| row_tokens(r)).collect()
    }

    mod normalize_tests {
        use super::*;

        #[test]
        fn test_quote_extraction() {
            assert_eq!(normalize_candidate("'Open'"), "Open");
            assert_eq!(normalize_candidate("O'Brien"), "Brien");
            assert_eq!(normalize_candidate("''"), "");
            assert_eq!(normalize_candidates(&[" a ", "x 'b' y"]), vec!["a", "b"]);
        }

        #[test]
        fn test_row_tokens_split_tab_and_newline() {
            assert_eq!(row_tokens("1\tAlice\tOpen"), vec!["1", "Alice", "Open"]);
            assert_eq!(row_tokens("1\tAlice\nSmith\t\t "), vec!["1", "Alice", "Smith"]);
            assert!(row_tokens(" \t\n").is_empty());
        }
    }

    mod match_tests {
        use super::*;

        #[test]
        fn test_default_is_substring_exact_is_equality() {
            let rows = text_rows(&["ID\tName", "1\tfoo", "xA y\tzB"]);
            assert_eq!(first_matching_row(&rows, &["A", "B"], false, MIN_TEXT_TOKENS), Some(2));
            assert_eq!(first_matching_row(&rows, &["A", "B"], true, MIN_TEXT_TOKENS), None);
            assert_eq!(first_matching_row(&rows, &["xa y", "ZB"], true, MIN_TEXT_TOKENS), Some(2));
        }

        #[test]
        fn test_short_rows_keep_their_index() {
            let rows = text_rows(&["Orders", "1\tAlice", "2\tBob", "3\tAlice"]);
            assert_eq!(matching_rows(&rows, &["alice"], false, MIN_TEXT_TOKENS), vec![1, 3]);
            assert_eq!(first_matching_row(&rows, &["Orders"], false, MIN_TEXT_TOKENS), None);
        }

        #[test]
        fn test_meta_rows_need_more_cells() {
            let rows = vec![
                vec!["Alice".to_string()],
                vec!["Alice".to_string(), "Open".to_string()],
            ];
            let min = DEFAULT_MIN_COLUMN_SIZE + 1;
            assert_eq!(matching_rows(&rows, &["Alice"], true, min), vec![1]);
        }

        #[test]
        fn test_header_index() {
            let headers = ["ID", " Name ", "Status"];
            assert_eq!(header_index(&headers, "Name", false), Some(1));
            assert_eq!(header_index(&headers, "status", false), Some(2));
            assert_eq!(header_index(&headers, "status", true), None);
            assert_eq!(header_index(&headers, "Owner", false), None);
        }
    }

    mod property_tests {
        use super::*;

        proptest! {
            #[test]
            fn prop_row_matches_its_own_tokens(cells in prop::collection::vec("[a-zA-Z0-9 ]{1,12}", 2..6)) {
                let text = cells.join("\t");
                let tokens = row_tokens(&text);
                prop_assume!(tokens.len() >= MIN_TEXT_TOKENS);
                prop_assert!(row_matches(&tokens, &tokens, true));
                prop_assert!(row_matches(&tokens, &tokens, false));
            }

            #[test]
            fn prop_exact_implies_substring(token in "[a-zA-Z ]{0,10}", candidate in "[a-zA-Z ]{0,10}") {
                if token_matches(&token, &candidate, true) {
                    prop_assert!(token_matches(&token, &candidate, false));
                }
            }

            #[test]
            fn prop_case_does_not_matter(token in "[a-zA-Z]{1,10}", candidate in "[a-zA-Z]{1,5}") {
                let upper = candidate.to_uppercase();
                prop_assert_eq!(
                    token_matches(&token, &candidate, false),
                    token_matches(&token, &upper, false)
                );
            }

            #[test]
            fn prop_first_is_head_of_all(rows in prop::collection::vec(prop::collection::vec("[ab]{1,2}", 0..4), 0..8)) {
                let all = matching_rows(&rows, &["a"], false, MIN_TEXT_TOKENS);
                prop_assert_eq!(first_matching_row(&rows, &["a"], false, MIN_TEXT_TOKENS), all.first().copied());
            }
        }
    }
}
