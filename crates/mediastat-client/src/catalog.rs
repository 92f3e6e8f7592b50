//! Resolution of a [`SearchQuery`] into catalog items.
//!
//! Identifier queries fan out one lookup per id. Term queries page through
//! a server-side search and then re-check every result client-side, since
//! the search syntax matches more loosely than the terms intend.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use mediastat_core::{CatalogItem, SearchQuery};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::CmsVideo;

/// Rows requested per search page.
pub const SEARCH_PAGE_SIZE: usize = 100;
/// Hard cap on rows read from a single search.
pub const SEARCH_ROW_CAP: usize = 20_000;

/// Name used for items that have none.
pub const UNTITLED: &str = "(untitled)";
/// Image used for items with neither a thumbnail nor a poster.
pub const PLACEHOLDER_THUMBNAIL: &str = "https://placehold.co/480x270?text=No+Thumbnail";

impl ApiClient {
    /// Resolves `query` into active catalog items, deduplicated by id and
    /// sorted newest first.
    ///
    /// An empty query resolves to an empty list without touching the network.
    ///
    /// # Errors
    ///
    /// Identifier lookups never fail the call: a failing id is logged and
    /// dropped. Search pages propagate the page's [`ApiError`] once its
    /// retries are exhausted.
    pub async fn resolve(
        &self,
        query: &SearchQuery,
        token: &str,
    ) -> Result<Vec<CatalogItem>, ApiError> {
        let videos = if query.uses_id_lookup() {
            self.lookup_ids(query, token).await
        } else {
            self.search_terms(query, token).await?
        };

        let mut seen = HashSet::new();
        let mut items: Vec<CatalogItem> = videos
            .into_iter()
            .filter(|v| seen.insert(v.id.clone()))
            .map(to_catalog_item)
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        tracing::debug!(
            resolved = items.len(),
            by_id = query.uses_id_lookup(),
            "resolved catalog query"
        );
        Ok(items)
    }

    async fn lookup_ids(&self, query: &SearchQuery, token: &str) -> Vec<CmsVideo> {
        let lookups = query.ids.iter().map(|id| async move {
            match self.get_video(id, token).await {
                Ok(video) => Some(video),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "dropping id: catalog lookup failed");
                    None
                }
            }
        });

        join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .filter(CmsVideo::is_active)
            .collect()
    }

    async fn search_terms(
        &self,
        query: &SearchQuery,
        token: &str,
    ) -> Result<Vec<CmsVideo>, ApiError> {
        let Some(filter) = build_filter(query) else {
            return Ok(Vec::new());
        };

        let mut matches = Vec::new();
        let mut offset = 0usize;
        let mut pages = 0usize;
        while offset < SEARCH_ROW_CAP {
            let limit = SEARCH_PAGE_SIZE.min(SEARCH_ROW_CAP - offset);
            let page = self.search_videos(&filter, token, offset, limit).await?;
            pages += 1;
            let fetched = page.len();
            matches.extend(page.into_iter().filter(|v| matches_terms(v, query)));
            offset += fetched;
            if fetched < limit {
                break;
            }
        }

        if offset >= SEARCH_ROW_CAP {
            tracing::warn!(
                cap = SEARCH_ROW_CAP,
                "catalog search hit the row cap; results are truncated"
            );
        }
        tracing::debug!(pages, rows = offset, kept = matches.len(), "catalog search complete");
        Ok(matches)
    }
}

/// Builds the server-side search expression for a term query.
///
/// Returns `None` when the query has no tag or title terms: a search with no
/// constraints yields nothing rather than the whole catalog.
#[must_use]
pub fn build_filter(query: &SearchQuery) -> Option<String> {
    if query.tag_terms.is_empty() && query.title_terms.is_empty() {
        return None;
    }

    let mut clauses = vec!["+state:ACTIVE".to_owned()];
    clauses.extend(
        query
            .tag_terms
            .iter()
            .map(|tag| format!("+tags:\"{}\"", escape_quoted(tag))),
    );
    clauses.extend(
        query
            .title_terms
            .iter()
            .map(|term| format!("+name:*{}*", escape_term(term))),
    );
    Some(clauses.join(" "))
}

/// Escapes a value placed inside double quotes.
fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escapes a bare term so query-syntax operators match literally.
fn escape_term(value: &str) -> String {
    const SPECIAL: &[char] = &[
        '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
        '/', ' ',
    ];
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Client-side check that a search hit really satisfies every term.
fn matches_terms(video: &CmsVideo, query: &SearchQuery) -> bool {
    if !video.is_active() {
        return false;
    }

    let tags: Vec<String> = video.tags.iter().map(|t| t.to_lowercase()).collect();
    let all_tags = query
        .tag_terms
        .iter()
        .all(|term| tags.contains(&term.to_lowercase()));
    if !all_tags {
        return false;
    }

    let name = video.name.as_deref().unwrap_or_default().to_lowercase();
    query
        .title_terms
        .iter()
        .all(|term| name.contains(&term.to_lowercase()))
}

fn to_catalog_item(video: CmsVideo) -> CatalogItem {
    let thumbnail_url = video
        .images
        .as_ref()
        .and_then(|images| {
            let src = |img: &Option<crate::types::CmsImage>| {
                img.as_ref()
                    .and_then(|i| i.src.clone())
                    .filter(|s| !s.trim().is_empty())
            };
            src(&images.thumbnail).or_else(|| src(&images.poster))
        })
        .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_owned());

    let name = video
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_owned());

    CatalogItem {
        id: video.id,
        name,
        tags: video.tags,
        thumbnail_url,
        created_at: video.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
    }
}

#[cfg(test)]
mod tests {
    use mediastat_core::parse_query;

    use super::*;
    use crate::types::{CmsImage, CmsImages};

    fn video(id: &str, name: Option<&str>, tags: &[&str], state: &str) -> CmsVideo {
        CmsVideo {
            id: id.to_owned(),
            name: name.map(str::to_owned),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            state: Some(state.to_owned()),
            created_at: None,
            published_at: None,
            images: None,
        }
    }

    fn image(src: &str) -> Option<CmsImage> {
        Some(CmsImage {
            src: Some(src.to_owned()),
        })
    }

    #[test]
    fn filter_is_none_without_terms() {
        assert!(build_filter(&SearchQuery::default()).is_none());
    }

    #[test]
    fn filter_conjoins_state_tags_and_titles() {
        let query = parse_query(r#"tag:"how to", title:setup guide"#);
        assert_eq!(
            build_filter(&query).as_deref(),
            Some(r#"+state:ACTIVE +tags:"how to" +name:*setup* +name:*guide*"#)
        );
    }

    #[test]
    fn filter_escapes_special_characters() {
        let query = parse_query(r#"tag:say "hi", title:c++"#);
        assert_eq!(
            build_filter(&query).as_deref(),
            Some(r#"+state:ACTIVE +tags:"say \"hi\"" +name:*c\+\+*"#)
        );
    }

    #[test]
    fn client_side_match_requires_every_tag_case_insensitively() {
        let query = parse_query("tag:Launch, tag:demo");
        assert!(matches_terms(
            &video("1", Some("x"), &["launch", "DEMO"], "ACTIVE"),
            &query
        ));
        assert!(!matches_terms(
            &video("1", Some("x"), &["launch"], "ACTIVE"),
            &query
        ));
        assert!(!matches_terms(
            &video("1", Some("x"), &["launch-demo"], "ACTIVE"),
            &query
        ));
    }

    #[test]
    fn client_side_match_requires_every_title_substring() {
        let query = parse_query("title:setup guide");
        assert!(matches_terms(
            &video("1", Some("Router SETUP Guide"), &[], "ACTIVE"),
            &query
        ));
        assert!(!matches_terms(
            &video("1", Some("Router setup"), &[], "ACTIVE"),
            &query
        ));
        assert!(!matches_terms(&video("1", None, &[], "ACTIVE"), &query));
    }

    #[test]
    fn client_side_match_rejects_inactive() {
        let query = parse_query("tag:demo");
        assert!(!matches_terms(
            &video("1", Some("x"), &["demo"], "INACTIVE"),
            &query
        ));
    }

    #[test]
    fn catalog_item_defaults_name_and_thumbnail() {
        let item = to_catalog_item(video("1", Some("  "), &[], "ACTIVE"));
        assert_eq!(item.name, UNTITLED);
        assert_eq!(item.thumbnail_url, PLACEHOLDER_THUMBNAIL);
    }

    #[test]
    fn catalog_item_prefers_thumbnail_over_poster() {
        let mut v = video("1", Some("a"), &[], "ACTIVE");
        v.images = Some(CmsImages {
            thumbnail: image("https://img.example/thumb.jpg"),
            poster: image("https://img.example/poster.jpg"),
        });
        assert_eq!(to_catalog_item(v).thumbnail_url, "https://img.example/thumb.jpg");
    }

    #[test]
    fn catalog_item_falls_back_to_poster() {
        let mut v = video("1", Some("a"), &[], "ACTIVE");
        v.images = Some(CmsImages {
            thumbnail: None,
            poster: image("https://img.example/poster.jpg"),
        });
        assert_eq!(to_catalog_item(v).thumbnail_url, "https://img.example/poster.jpg");
    }
}
