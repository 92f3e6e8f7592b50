//! Search expression parser.
//!
//! The mini-language is a comma-separated list of tokens. Each token is a
//! bare term, a bare identifier of nine or more digits, or a `key:value`
//! pair where `key` is `id`, `tag`, or `title` (case-insensitive). Tokens
//! and values may be wrapped in one layer of matching single or double
//! quotes.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::SearchQuery;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{9,}$").expect("valid identifier regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Id,
    Tag,
    Title,
}

/// Parses a raw search expression into a [`SearchQuery`].
///
/// - `id:` values are split on whitespace; pieces of nine or more digits
///   become identifiers, anything else is ignored.
/// - `tag:` values are kept whole as a single tag term.
/// - `title:` values are split on whitespace into title terms.
/// - A bare identifier-shaped token is an identifier; any other bare token
///   is a tag term.
///
/// Term order follows the input and duplicates are kept.
#[must_use]
pub fn parse_query(raw: &str) -> SearchQuery {
    let mut query = SearchQuery::default();

    for token in raw.split(',') {
        let token = strip_quotes(token.trim()).trim();
        if token.is_empty() {
            continue;
        }

        if let Some((prefix, value)) = split_prefix(token) {
            let value = strip_quotes(value.trim()).trim();
            match prefix {
                Prefix::Id => query.ids.extend(
                    value
                        .split_whitespace()
                        .filter(|piece| is_identifier(piece))
                        .map(str::to_owned),
                ),
                Prefix::Tag => {
                    if !value.is_empty() {
                        query.tag_terms.push(value.to_owned());
                    }
                }
                Prefix::Title => query
                    .title_terms
                    .extend(value.split_whitespace().map(str::to_owned)),
            }
            continue;
        }

        if is_identifier(token) {
            query.ids.insert(token.to_owned());
        } else {
            query.tag_terms.push(token.to_owned());
        }
    }

    query
}

/// `true` for strings of nine or more ASCII digits.
#[must_use]
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

fn split_prefix(token: &str) -> Option<(Prefix, &str)> {
    let (key, value) = token.split_once(':')?;
    let prefix = if key.eq_ignore_ascii_case("id") {
        Prefix::Id
    } else if key.eq_ignore_ascii_case("tag") {
        Prefix::Tag
    } else if key.eq_ignore_ascii_case("title") {
        Prefix::Title
    } else {
        return None;
    };
    Some((prefix, value))
}

/// Removes one layer of matching surrounding quotes.
fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
