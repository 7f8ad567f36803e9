// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

fn deserialize_number_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: Value = Deserialize::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(D::Error::custom("Expected string or number")),
    }
}

fn deserialize_optional_number_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;

    Ok(match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn deserialize_optional_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;

    Ok(match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Panels often send `[]` where an object is expected; anything that does
/// not fit `T` becomes `None`.
fn deserialize_lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn deserialize_episodes<'de, D>(deserializer: D) -> Result<HashMap<String, Vec<Episode>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;

    let mut by_season = HashMap::new();
    match value {
        Value::Object(map) => {
            for (season, list) in map {
                if let Ok(episodes) = serde_json::from_value::<Vec<Episode>>(list) {
                    by_season.insert(season, episodes);
                }
            }
        }
        Value::Array(lists) => {
            for (idx, list) in lists.into_iter().enumerate() {
                if let Ok(episodes) = serde_json::from_value::<Vec<Episode>>(list) {
                    let season = episodes
                        .first()
                        .and_then(|ep| ep.season)
                        .unwrap_or(idx as u32 + 1);
                    by_season.insert(season.to_string(), episodes);
                }
            }
        }
        _ => {}
    }
    Ok(by_season)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Live,
    Vod,
    Series,
}

impl ContentType {
    pub const ALL: [ContentType; 3] = [ContentType::Vod, ContentType::Series, ContentType::Live];

    /// Path segment used by the backend routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Live => "live",
            ContentType::Vod => "vod",
            ContentType::Series => "series",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" | "tv" => Ok(Self::Live),
            "vod" | "movie" | "movies" => Ok(Self::Vod),
            "series" | "show" | "shows" => Ok(Self::Series),
            _ => Err(format!(
                "Invalid type: {}. Use 'live', 'vod', or 'series'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "deserialize_number_as_string")]
    pub category_id: String,
    #[serde(default)]
    pub category_name: String,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category_name)
    }
}

/// One entry of a live, VOD or series listing. Which id is set depends on
/// the listing it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamItem {
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub stream_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub series_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub stream_icon: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub container_extension: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "deserialize_number_as_string")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favourite {
    #[serde(deserialize_with = "deserialize_number_as_string")]
    pub id: String,
    pub content_type: String,
    #[serde(deserialize_with = "deserialize_number_as_string")]
    pub item_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub watched_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDetail {
    #[serde(deserialize_with = "deserialize_number_as_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub favourites: Vec<Favourite>,
    #[serde(default)]
    pub recently_watched: Vec<Favourite>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewFavourite {
    pub content_type: String,
    pub item_id: String,
    pub title: String,
    pub thumbnail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub live: Vec<StreamItem>,
    #[serde(default)]
    pub vod: Vec<StreamItem>,
    #[serde(default)]
    pub series: Vec<StreamItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HlsCheck {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamUrl {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VodInfo {
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub releasedate: Option<String>,
    #[serde(default, rename = "releaseDate", deserialize_with = "deserialize_optional_number_as_string")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub container_extension: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VodInfoResponse {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub info: Option<VodInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeriesDetails {
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default, rename = "releaseDate", deserialize_with = "deserialize_optional_number_as_string")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub start: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Season {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_u32")]
    pub season_number: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodeInfo {
    #[serde(default)]
    pub movie_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Episode {
    #[serde(deserialize_with = "deserialize_number_as_string")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_optional_u32")]
    pub episode_num: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub container_extension: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub info: Option<EpisodeInfo>,
    #[serde(default, deserialize_with = "deserialize_optional_u32")]
    pub season: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeriesInfoResponse {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub info: Option<SeriesDetails>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    #[serde(default, deserialize_with = "deserialize_episodes")]
    pub episodes: HashMap<String, Vec<Episode>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_ids_become_strings() {
        let cat: Category = serde_json::from_value(json!({"category_id": 7, "category_name": "News"})).unwrap();
        assert_eq!(cat.category_id, "7");

        let item: StreamItem = serde_json::from_value(json!({"stream_id": 42, "name": "A"})).unwrap();
        assert_eq!(item.stream_id.as_deref(), Some("42"));
        assert!(item.series_id.is_none());
    }

    #[test]
    fn series_info_accepts_empty_info_array() {
        let info: SeriesInfoResponse = serde_json::from_value(json!({
            "info": [],
            "seasons": [{"name": "Season 1", "season_number": "1"}],
            "episodes": {"1": [{"id": "900", "episode_num": 1, "title": "Pilot"}]}
        }))
        .unwrap();
        assert!(info.info.is_none());
        assert_eq!(info.seasons[0].season_number, Some(1));
        assert_eq!(info.episodes["1"][0].id, "900");
    }

    #[test]
    fn episodes_as_nested_arrays() {
        let info: SeriesInfoResponse = serde_json::from_value(json!({
            "episodes": [[{"id": 1, "season": 3}], [{"id": 2}]]
        }))
        .unwrap();
        assert_eq!(info.episodes["3"][0].id, "1");
        assert_eq!(info.episodes["2"][0].id, "2");
    }

    #[test]
    fn content_type_parsing() {
        assert_eq!("movies".parse::<ContentType>().unwrap(), ContentType::Vod);
        assert_eq!("LIVE".parse::<ContentType>().unwrap(), ContentType::Live);
        assert!("radio".parse::<ContentType>().is_err());
    }
}
