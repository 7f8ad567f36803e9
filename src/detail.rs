// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::api::ApiClient;
use crate::catalog::Card;
use crate::error::{AccountError, CatalogError};
use crate::models::{ContentType, Episode, NewFavourite, SeriesInfoResponse, VodInfoResponse};
use crate::playback::PlayRequest;
use serde::Serialize;

pub const NO_DESCRIPTION: &str = "No description available.";
pub const EPISODE_IMAGE: &str = "https://via.placeholder.com/300x180?text=Episode";

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeCard {
    pub id: String,
    pub title: String,
    pub thumb: String,
}

impl EpisodeCard {
    fn from_episode(episode: &Episode) -> Self {
        let title = episode
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Episode {}", episode.episode_num.unwrap_or_default()));
        let thumb = episode
            .info
            .as_ref()
            .and_then(|info| info.movie_image.clone())
            .filter(|img| !img.is_empty())
            .unwrap_or_else(|| EPISODE_IMAGE.to_string());
        Self {
            id: episode.id.clone(),
            title,
            thumb,
        }
    }

    /// Episodes always play through the series route as mp4.
    pub fn play_request(&self) -> PlayRequest {
        PlayRequest::new(ContentType::Series, &self.id, &self.title, "mp4")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonView {
    pub label: String,
    pub number: Option<u32>,
    pub episodes: Vec<EpisodeCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AboutView {
    pub kind: ContentType,
    pub id: String,
    pub title: String,
    pub cover: String,
    pub overview: String,
    pub year: String,
    pub quality: String,
    /// Only present for series; the first season is the one shown initially.
    pub seasons: Option<Vec<SeasonView>>,
    #[serde(skip)]
    ext: Option<String>,
}

impl AboutView {
    fn base(card: &Card) -> Self {
        Self {
            kind: card.kind,
            id: card.id.clone(),
            title: card.title.clone(),
            cover: card.thumb.clone(),
            overview: String::new(),
            year: String::new(),
            quality: String::new(),
            seasons: None,
            ext: card.ext.clone(),
        }
    }

    /// What the "Play" action starts.
    pub fn play_request(&self) -> PlayRequest {
        match self.kind {
            ContentType::Vod => PlayRequest::new(
                ContentType::Vod,
                &self.id,
                &self.title,
                self.ext.as_deref().unwrap_or("mp4"),
            ),
            ContentType::Live => PlayRequest::new(ContentType::Live, &self.id, &self.title, "ts"),
            ContentType::Series => {
                PlayRequest::new(ContentType::Series, &self.id, &self.title, "mp4")
            }
        }
    }

    pub fn favourite(&self) -> NewFavourite {
        NewFavourite {
            content_type: self.kind.as_str().to_string(),
            item_id: self.id.clone(),
            title: self.title.clone(),
            thumbnail: self.cover.clone(),
        }
    }

    pub fn season(&self, number: u32) -> Option<&SeasonView> {
        self.seasons
            .as_ref()?
            .iter()
            .find(|s| s.number == Some(number))
    }
}

fn year_of(date: Option<&str>) -> String {
    date.map(|d| d.chars().take(4).collect())
        .unwrap_or_default()
}

fn apply_vod_info(view: &mut AboutView, response: &VodInfoResponse) {
    let info = response.info.clone().unwrap_or_default();
    view.overview = [info.plot, info.description]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());
    view.year = year_of(info.releasedate.as_deref().or(info.release_date.as_deref()));
    view.quality = info
        .container_extension
        .filter(|e| !e.is_empty())
        .or_else(|| view.ext.clone())
        .unwrap_or_else(|| "mp4".to_string())
        .to_uppercase();
}

fn apply_series_info(view: &mut AboutView, response: &SeriesInfoResponse) {
    let details = response.info.clone().unwrap_or_default();
    view.overview = details
        .plot
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());
    view.year = year_of(details.release_date.as_deref().or(details.start.as_deref()));
    view.quality = "HD".to_string();

    let episodes_for = |number: Option<u32>| -> Vec<EpisodeCard> {
        number
            .and_then(|n| response.episodes.get(&n.to_string()))
            .map(|list| list.iter().map(EpisodeCard::from_episode).collect())
            .unwrap_or_default()
    };

    let seasons = if response.seasons.is_empty() {
        let mut numbers: Vec<u32> = response
            .episodes
            .keys()
            .filter_map(|k| k.parse().ok())
            .collect();
        numbers.sort_unstable();
        numbers
            .into_iter()
            .map(|n| SeasonView {
                label: format!("Season {}", n),
                number: Some(n),
                episodes: episodes_for(Some(n)),
            })
            .collect()
    } else {
        response
            .seasons
            .iter()
            .enumerate()
            .map(|(idx, season)| {
                let label = season
                    .name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| {
                        let number = season
                            .season_number
                            .filter(|&n| n != 0)
                            .unwrap_or(idx as u32 + 1);
                        format!("Season {}", number)
                    });
                SeasonView {
                    label,
                    number: season.season_number,
                    episodes: episodes_for(season.season_number),
                }
            })
            .collect()
    };
    view.seasons = Some(seasons);
}

/// Loads the extended metadata behind the detail view.
#[derive(Debug, Clone)]
pub struct DetailLoader {
    api: ApiClient,
    info_ttl_secs: u64,
}

impl DetailLoader {
    pub fn new(api: ApiClient, info_ttl_secs: u64) -> Self {
        Self { api, info_ttl_secs }
    }

    pub async fn open(&self, card: &Card) -> Result<AboutView, CatalogError> {
        let mut view = AboutView::base(card);
        match card.kind {
            ContentType::Vod => {
                let info = self
                    .api
                    .vod_info(&card.id, self.info_ttl_secs)
                    .await
                    .map_err(|e| CatalogError::Details(Some(e)))?;
                apply_vod_info(&mut view, &info);
            }
            ContentType::Series => {
                let info = self
                    .api
                    .series_info(&card.id, self.info_ttl_secs)
                    .await
                    .map_err(|e| CatalogError::Details(Some(e)))?;
                apply_series_info(&mut view, &info);
            }
            ContentType::Live => {
                view.overview = "Live channel.".to_string();
                view.quality = "LIVE".to_string();
            }
        }
        Ok(view)
    }

    /// The "Add to My List" action.
    pub async fn add_to_list(&self, view: &AboutView) -> Result<String, AccountError> {
        self.api.add_favourite(&view.favourite()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn card(kind: ContentType, id: &str, ext: Option<&str>) -> Card {
        Card {
            kind,
            id: id.to_string(),
            title: "Title".to_string(),
            thumb: "http://img".to_string(),
            ext: ext.map(str::to_string),
        }
    }

    #[test]
    fn vod_details() {
        let mut view = AboutView::base(&card(ContentType::Vod, "42", Some("mkv")));
        let info: VodInfoResponse = serde_json::from_value(json!({
            "info": {"description": "A film", "releaseDate": "2019-05-01"}
        }))
        .unwrap();
        apply_vod_info(&mut view, &info);
        assert_eq!(view.overview, "A film");
        assert_eq!(view.year, "2019");
        assert_eq!(view.quality, "MKV");

        let play = view.play_request();
        assert_eq!(play.kind, ContentType::Vod);
        assert_eq!(play.ext, "mkv");
    }

    #[test]
    fn vod_without_info() {
        let mut view = AboutView::base(&card(ContentType::Vod, "1", None));
        apply_vod_info(&mut view, &VodInfoResponse::default());
        assert_eq!(view.overview, NO_DESCRIPTION);
        assert_eq!(view.year, "");
        assert_eq!(view.quality, "MP4");
    }

    #[test]
    fn series_seasons_and_episodes() {
        let mut view = AboutView::base(&card(ContentType::Series, "7", None));
        let info: SeriesInfoResponse = serde_json::from_value(json!({
            "info": {"plot": "Plot", "start": "2011-01-01"},
            "seasons": [{"season_number": 1}, {"name": "Specials", "season_number": 0}],
            "episodes": {
                "1": [
                    {"id": "101", "episode_num": 1, "title": "", "info": {"movie_image": "http://e/1.jpg"}},
                    {"id": "102", "episode_num": 2, "title": "Second", "info": []}
                ]
            }
        }))
        .unwrap();
        apply_series_info(&mut view, &info);

        assert_eq!(view.year, "2011");
        assert_eq!(view.quality, "HD");
        let seasons = view.seasons.as_ref().unwrap();
        assert_eq!(seasons[0].label, "Season 1");
        assert_eq!(seasons[1].label, "Specials");
        assert!(seasons[1].episodes.is_empty());

        let first = &seasons[0].episodes[0];
        assert_eq!(first.title, "Episode 1");
        assert_eq!(first.thumb, "http://e/1.jpg");
        assert_eq!(seasons[0].episodes[1].thumb, EPISODE_IMAGE);

        let play = first.play_request();
        assert_eq!(play.kind, ContentType::Series);
        assert_eq!(play.id, "101");
        assert_eq!(play.ext, "mp4");
    }

    #[test]
    fn unnamed_season_zero_is_labelled_by_position() {
        let mut view = AboutView::base(&card(ContentType::Series, "7", None));
        let info: SeriesInfoResponse = serde_json::from_value(json!({
            "seasons": [{"season_number": 0}, {"season_number": 3}],
            "episodes": {"0": [{"id": "900", "episode_num": 1, "title": "Extra"}]}
        }))
        .unwrap();
        apply_series_info(&mut view, &info);

        let seasons = view.seasons.as_ref().unwrap();
        assert_eq!(seasons[0].label, "Season 1");
        assert_eq!(seasons[0].episodes[0].title, "Extra");
        assert_eq!(seasons[1].label, "Season 3");
    }

    #[test]
    fn favourite_payload() {
        let view = AboutView::base(&card(ContentType::Live, "9", None));
        let fav = view.favourite();
        assert_eq!(fav.content_type, "live");
        assert_eq!(fav.item_id, "9");
        assert_eq!(fav.thumbnail, "http://img");
    }
}
