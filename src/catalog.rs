// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::api::ApiClient;
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::models::{Category, ContentType, StreamItem};
use futures_util::future::join_all;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub const NO_IMAGE: &str = "https://via.placeholder.com/300x420?text=No+Image";

/// What a catalog tile carries: enough to open the detail view or start
/// playback without going back to the listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub kind: ContentType,
    pub id: String,
    pub title: String,
    pub thumb: String,
    /// Container extension, only set on movie cards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
}

fn first_non_empty<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find(|s| !s.is_empty())
}

impl Card {
    pub fn from_item(kind: ContentType, item: &StreamItem) -> Self {
        let thumb = first_non_empty(&[&item.stream_icon, &item.cover])
            .unwrap_or(NO_IMAGE)
            .to_string();

        let (id, title) = match kind {
            ContentType::Series => (
                item.series_id.clone(),
                first_non_empty(&[&item.series_name, &item.name, &item.title]),
            ),
            ContentType::Live | ContentType::Vod => (
                item.stream_id.clone(),
                first_non_empty(&[&item.name, &item.title]),
            ),
        };

        let ext = match kind {
            ContentType::Vod => Some(
                first_non_empty(&[&item.container_extension])
                    .unwrap_or("mp4")
                    .to_string(),
            ),
            _ => None,
        };

        Self {
            kind,
            id: id.unwrap_or_default(),
            title: title.unwrap_or("Untitled").to_string(),
            thumb,
            ext,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogRow {
    pub category: Category,
    pub cards: Vec<Card>,
    /// Whether the row offers the "See All" drill-down. Rows whose stream
    /// list failed to load stay empty and offer nothing.
    pub see_all: bool,
}

#[derive(Debug)]
pub struct HomeRows {
    pub movies: Result<Vec<CatalogRow>, CatalogError>,
    pub series: Result<Vec<CatalogRow>, CatalogError>,
    pub live: Result<Vec<CatalogRow>, CatalogError>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WarmReport {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchKind {
    #[default]
    All,
    Only(ContentType),
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::All => "all",
            SearchKind::Only(ct) => ct.as_str(),
        }
    }

    fn includes(&self, ct: ContentType) -> bool {
        match self {
            SearchKind::All => true,
            SearchKind::Only(only) => *only == ct,
        }
    }
}

impl FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(SearchKind::All);
        }
        s.parse().map(SearchKind::Only)
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchGroup {
    pub title: &'static str,
    pub kind: ContentType,
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub groups: Vec<SearchGroup>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn group_title(ct: ContentType) -> &'static str {
    match ct {
        ContentType::Live => "Live TV",
        ContentType::Vod => "Movies",
        ContentType::Series => "Series",
    }
}

/// Builds the browse views on top of the cached API.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    api: ApiClient,
    config: CatalogConfig,
}

impl CatalogLoader {
    pub fn new(api: ApiClient, config: CatalogConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn categories(
        &self,
        content_type: ContentType,
        bypass_once: bool,
    ) -> Result<Vec<Category>, CatalogError> {
        self.api
            .categories(content_type, self.config.category_ttl_secs, bypass_once)
            .await
            .map_err(|e| CatalogError::Categories(Some(e)))
    }

    /// One row per category holding at most `row_limit` cards.
    pub async fn load_rows(
        &self,
        content_type: ContentType,
        bypass_once: bool,
    ) -> Result<Vec<CatalogRow>, CatalogError> {
        let categories = self.categories(content_type, bypass_once).await?;

        let mut rows = Vec::with_capacity(categories.len());
        for category in categories {
            let result = self
                .api
                .streams(
                    content_type,
                    &category.category_id,
                    self.config.stream_ttl_secs,
                    bypass_once,
                )
                .await;
            let row = match result {
                Ok(items) => CatalogRow {
                    cards: items
                        .iter()
                        .take(self.config.row_limit)
                        .map(|item| Card::from_item(content_type, item))
                        .collect(),
                    see_all: true,
                    category,
                },
                Err(e) => {
                    debug!(
                        "Row {} ({}) failed to load: {}",
                        category.category_name, content_type, e
                    );
                    CatalogRow {
                        category,
                        cards: Vec::new(),
                        see_all: false,
                    }
                }
            };
            rows.push(row);
        }
        Ok(rows)
    }

    /// The "See All" view: the full stream list of one category.
    pub async fn see_all(
        &self,
        content_type: ContentType,
        category_id: &str,
        bypass_once: bool,
    ) -> Result<Vec<Card>, CatalogError> {
        let items = self
            .api
            .streams(
                content_type,
                category_id,
                self.config.stream_ttl_secs,
                bypass_once,
            )
            .await
            .map_err(|e| CatalogError::Streams(Some(e)))?;
        Ok(items
            .iter()
            .map(|item| Card::from_item(content_type, item))
            .collect())
    }

    /// Prefetches category lists for every content type and the stream
    /// lists of the first few categories of each, all concurrently. One
    /// failing fetch never stops the others.
    pub async fn warm_home_cache(&self) -> WarmReport {
        let category_lists = join_all(
            ContentType::ALL
                .iter()
                .map(|ct| self.api.categories(*ct, self.config.category_ttl_secs, false)),
        )
        .await;

        let mut targets = Vec::new();
        for (ct, result) in ContentType::ALL.iter().zip(category_lists) {
            let categories = match result {
                Ok(categories) => categories,
                Err(e) => {
                    warn!("Skipping {} warm-up: {}", ct, e);
                    continue;
                }
            };
            let limit = match ct {
                ContentType::Live => self.config.warm_live_categories,
                _ => self.config.warm_other_categories,
            };
            targets.extend(
                categories
                    .into_iter()
                    .filter(|c| !c.category_id.is_empty())
                    .take(limit)
                    .map(|c| (*ct, c.category_id)),
            );
        }

        let results = join_all(targets.iter().map(|(ct, category_id)| {
            self.api
                .streams(*ct, category_id, self.config.stream_ttl_secs, false)
        }))
        .await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let report = WarmReport {
            requested: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        };
        debug!("Home cache warm-up: {:?}", report);
        report
    }

    /// Warms the cache, then builds the movie, series and live rows
    /// concurrently; each section fails on its own.
    pub async fn build_home_rows(&self) -> HomeRows {
        self.warm_home_cache().await;
        let (movies, series, live) = tokio::join!(
            self.load_rows(ContentType::Vod, false),
            self.load_rows(ContentType::Series, false),
            self.load_rows(ContentType::Live, false),
        );
        HomeRows {
            movies,
            series,
            live,
        }
    }

    pub async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        bypass_once: bool,
    ) -> Result<SearchResults, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResults::default());
        }

        let response = self
            .api
            .search(query, kind.as_str(), self.config.search_ttl_secs, bypass_once)
            .await
            .map_err(|e| CatalogError::Search(Some(e)))?;

        let groups = [
            (ContentType::Live, response.live),
            (ContentType::Vod, response.vod),
            (ContentType::Series, response.series),
        ]
        .into_iter()
        .filter(|(ct, items)| kind.includes(*ct) && !items.is_empty())
        .map(|(ct, items)| SearchGroup {
            title: group_title(ct),
            kind: ct,
            cards: items.iter().map(|item| Card::from_item(ct, item)).collect(),
        })
        .collect();

        Ok(SearchResults { groups })
    }
}
