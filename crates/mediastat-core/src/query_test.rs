use super::*;

fn ids(query: &SearchQuery) -> Vec<&str> {
    query.ids.iter().map(String::as_str).collect()
}

#[test]
fn quoted_tag_value_stays_one_term() {
    let query = parse_query(r#"tag:"a b""#);
    assert_eq!(query.tag_terms, vec!["a b"]);
    assert!(query.title_terms.is_empty());
}

#[test]
fn quoted_title_value_splits_on_whitespace() {
    let query = parse_query(r#"title:"a b""#);
    assert_eq!(query.title_terms, vec!["a", "b"]);
    assert!(query.tag_terms.is_empty());
}

#[test]
fn bare_ten_digit_token_is_an_id() {
    let query = parse_query("1234567890");
    assert_eq!(ids(&query), vec!["1234567890"]);
    assert!(query.tag_terms.is_empty());
}

#[test]
fn bare_short_number_is_a_tag() {
    let query = parse_query("12345");
    assert!(query.ids.is_empty());
    assert_eq!(query.tag_terms, vec!["12345"]);
}

#[test]
fn id_prefix_accepts_multiple_identifiers() {
    let query = parse_query("id: 123456789 987654321 42");
    assert_eq!(ids(&query), vec!["123456789", "987654321"]);
}

#[test]
fn prefixes_are_case_insensitive() {
    let query = parse_query("TAG:Launch, Title:Recap, ID:123456789");
    assert_eq!(query.tag_terms, vec!["Launch"]);
    assert_eq!(query.title_terms, vec!["Recap"]);
    assert_eq!(ids(&query), vec!["123456789"]);
}

#[test]
fn outer_quotes_are_stripped_before_prefix_matching() {
    let query = parse_query(r"'tag:product demo'");
    assert_eq!(query.tag_terms, vec!["product demo"]);
}

#[test]
fn only_one_layer_of_quotes_is_stripped() {
    let query = parse_query(r#"tag:"'nested'""#);
    assert_eq!(query.tag_terms, vec!["'nested'"]);
}

#[test]
fn mismatched_quotes_are_kept() {
    let query = parse_query(r#""half'"#);
    assert_eq!(query.tag_terms, vec![r#""half'"#]);
}

#[test]
fn empty_tokens_and_values_are_discarded() {
    let query = parse_query(" , tag:, title: \"\" ,  ,id:");
    assert!(query.is_empty(), "expected empty query, got {query:?}");
}

#[test]
fn unknown_prefix_is_a_bare_tag() {
    let query = parse_query("series:finale");
    assert_eq!(query.tag_terms, vec!["series:finale"]);
}

#[test]
fn term_order_follows_input_and_duplicates_are_kept() {
    let query = parse_query("zeta, alpha, zeta, title:one two one");
    assert_eq!(query.tag_terms, vec!["zeta", "alpha", "zeta"]);
    assert_eq!(query.title_terms, vec!["one", "two", "one"]);
}

#[test]
fn mixed_query_collects_every_kind() {
    let query = parse_query(r#"6312345678112, tag:"how to", title:setup guide, webinar"#);
    assert_eq!(ids(&query), vec!["6312345678112"]);
    assert_eq!(query.tag_terms, vec!["how to", "webinar"]);
    assert_eq!(query.title_terms, vec!["setup", "guide"]);
    assert!(query.uses_id_lookup());
}

#[test]
fn parsing_is_deterministic() {
    let raw = r#"tag:"a b", title:"c d", 123456789, e"#;
    assert_eq!(parse_query(raw), parse_query(raw));
}

#[test]
fn identifier_shape() {
    assert!(is_identifier("123456789"));
    assert!(!is_identifier("12345678"));
    assert!(!is_identifier("12345678a9"));
    assert!(!is_identifier(""));
}

#[test]
fn non_ascii_digits_are_not_identifiers() {
    // Arabic-Indic digits one through nine.
    let arabic_indic = "\u{661}\u{662}\u{663}\u{664}\u{665}\u{666}\u{667}\u{668}\u{669}";
    assert!(!is_identifier(arabic_indic));

    let query = parse_query(arabic_indic);
    assert!(query.ids.is_empty());
    assert_eq!(query.tag_terms, vec![arabic_indic]);

    let prefixed = parse_query(&format!("id:{arabic_indic} 123456789"));
    assert_eq!(ids(&prefixed), vec!["123456789"]);
}
