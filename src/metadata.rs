//! Best-effort metadata enrichment from third-party catalogs: OMDB for
//! films/series, RAWG for games, the YouTube Data API for livestream ingestion.
//! Lookup failures degrade to empty metadata; they never fail the operation
//! that requested them.

use {
    crate::{
        model::NewRecommendation,
        prelude::*,
    },
};

pub(crate) struct Clients {
    pub(crate) omdb: Option<Omdb>,
    pub(crate) rawg: Option<Rawg>,
    pub(crate) youtube: Option<YouTube>,
}

impl Clients {
    pub(crate) fn new(http_client: &reqwest::Client, config: &Config) -> Self {
        Self {
            omdb: config.omdb_api_key.clone().map(|api_key| Omdb { http_client: http_client.clone(), api_key }),
            rawg: config.rawg_api_key.clone().map(|api_key| Rawg { http_client: http_client.clone(), api_key }),
            youtube: config.youtube.clone().map(|youtube| YouTube {
                http_client: http_client.clone(),
                api_key: youtube.api_key,
                playlist_id: youtube.playlist_id,
            }),
        }
    }
}

/// Catalog fields a lookup can contribute to a recommendation.
#[derive(Debug, Default)]
pub(crate) struct Enrichment {
    pub(crate) link: String,
    pub(crate) image: String,
    pub(crate) platforms: String,
    pub(crate) rate: String,
    pub(crate) genre: String,
    pub(crate) release_date: String,
    pub(crate) length: String,
}

impl Enrichment {
    /// Fills only the fields the editor left empty.
    pub(crate) fn apply(self, rec: &mut NewRecommendation) {
        for (target, value) in [
            (&mut rec.link, self.link),
            (&mut rec.image, self.image),
            (&mut rec.platforms, self.platforms),
            (&mut rec.rate, self.rate),
            (&mut rec.genre, self.genre),
            (&mut rec.release_date, self.release_date),
            (&mut rec.length, self.length),
        ] {
            if target.is_empty() {
                *target = value;
            }
        }
    }
}

pub(crate) struct Omdb {
    http_client: reqwest::Client,
    api_key: String,
}

#[derive(Deserialize)]
struct OmdbEntry {
    #[serde(rename = "Response")]
    response: String,
    #[serde(default, rename = "Released")]
    released: String,
    #[serde(default, rename = "Runtime")]
    runtime: String,
    #[serde(default, rename = "Genre")]
    genre: String,
    #[serde(default, rename = "Poster")]
    poster: String,
    #[serde(default, rename = "imdbRating")]
    imdb_rating: String,
    #[serde(default, rename = "imdbID")]
    imdb_id: String,
}

impl Omdb {
    pub(crate) async fn search(&self, title: &str) -> Option<Enrichment> {
        match self.lookup(&[("t", title)]).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("OMDB lookup for {title:?} failed: {e}");
                None
            }
        }
    }

    pub(crate) async fn by_id(&self, imdb_id: &str) -> Option<Enrichment> {
        match self.lookup(&[("i", imdb_id)]).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("OMDB lookup for {imdb_id:?} failed: {e}");
                None
            }
        }
    }

    async fn lookup(&self, query: &[(&str, &str)]) -> reqwest::Result<Option<Enrichment>> {
        let entry = self.http_client.get("https://www.omdbapi.com/")
            .query(&[("apikey", &*self.api_key)])
            .query(query)
            .send().await?
            .error_for_status()?
            .json::<OmdbEntry>().await?;
        if entry.response != "True" {
            return Ok(None)
        }
        Ok(Some(Enrichment {
            link: if entry.imdb_id.is_empty() { String::new() } else { format!("https://www.imdb.com/title/{}/", entry.imdb_id) },
            image: non_placeholder(entry.poster),
            platforms: String::new(),
            rate: non_placeholder(entry.imdb_rating),
            genre: non_placeholder(entry.genre),
            release_date: non_placeholder(entry.released),
            length: non_placeholder(entry.runtime),
        }))
    }
}

/// OMDB uses the literal string "N/A" for absent fields.
fn non_placeholder(value: String) -> String {
    if value == "N/A" { String::new() } else { value }
}

pub(crate) struct Rawg {
    http_client: reqwest::Client,
    api_key: String,
}

#[derive(Deserialize)]
struct RawgSearchResponse {
    #[serde(default)]
    results: Vec<RawgGame>,
}

#[derive(Deserialize)]
struct RawgGame {
    slug: String,
    #[serde(default)]
    released: Option<String>,
    #[serde(default)]
    background_image: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    /// Average playtime in hours, RAWG's stand-in for HowLongToBeat.
    #[serde(default)]
    playtime: Option<u32>,
    #[serde(default)]
    platforms: Option<Vec<RawgPlatformEntry>>,
    #[serde(default)]
    genres: Option<Vec<RawgNamed>>,
}

#[derive(Deserialize)]
struct RawgPlatformEntry {
    platform: RawgNamed,
}

#[derive(Deserialize)]
struct RawgNamed {
    name: String,
}

impl Rawg {
    pub(crate) async fn search(&self, title: &str) -> Option<Enrichment> {
        match self.search_inner(title).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("RAWG lookup for {title:?} failed: {e}");
                None
            }
        }
    }

    async fn search_inner(&self, title: &str) -> reqwest::Result<Option<Enrichment>> {
        let response = self.http_client.get("https://api.rawg.io/api/games")
            .query(&[("key", &*self.api_key), ("search", title), ("page_size", "1")])
            .send().await?
            .error_for_status()?
            .json::<RawgSearchResponse>().await?;
        let Some(game) = response.results.into_iter().next() else { return Ok(None) };
        Ok(Some(Enrichment {
            link: format!("https://rawg.io/games/{}", game.slug),
            image: game.background_image.unwrap_or_default(),
            platforms: game.platforms.unwrap_or_default().into_iter().map(|entry| entry.platform.name).collect::<Vec<_>>().join(", "),
            rate: game.rating.map(|rating| rating.to_string()).unwrap_or_default(),
            genre: game.genres.unwrap_or_default().into_iter().map(|genre| genre.name).collect::<Vec<_>>().join(", "),
            release_date: game.released.unwrap_or_default(),
            length: game.playtime.filter(|&hours| hours > 0).map(|hours| format!("{hours} ч.")).unwrap_or_default(),
        }))
    }
}

pub(crate) struct YouTube {
    http_client: reqwest::Client,
    api_key: String,
    playlist_id: String,
}

/// One playlist entry, reduced to what the streams table stores.
#[derive(Debug)]
pub(crate) struct PlaylistVideo {
    pub(crate) title: String,
    pub(crate) link: String,
    pub(crate) published: Option<NaiveDate>,
    pub(crate) length_ms: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    snippet: PlaylistSnippet,
    content_details: PlaylistContentDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    title: String,
    published_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    video_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    content_details: VideoContentDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoContentDetails {
    #[serde(default)]
    duration: String,
}

impl YouTube {
    /// Lists the whole playlist, with per-video durations resolved through the
    /// videos endpoint.
    pub(crate) async fn playlist_videos(&self) -> reqwest::Result<Vec<PlaylistVideo>> {
        let mut videos = Vec::new();
        let mut page_token = None::<String>;
        loop {
            let mut request = self.http_client.get("https://www.googleapis.com/youtube/v3/playlistItems")
                .query(&[
                    ("part", "snippet,contentDetails"),
                    ("maxResults", "50"),
                    ("playlistId", &*self.playlist_id),
                    ("key", &*self.api_key),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page = request.send().await?
                .error_for_status()?
                .json::<PlaylistItemsResponse>().await?;
            let durations = self.video_durations(page.items.iter().map(|item| item.content_details.video_id.clone()).collect()).await?;
            for item in page.items {
                videos.push(PlaylistVideo {
                    title: item.snippet.title,
                    link: format!("https://youtu.be/{}", item.content_details.video_id),
                    published: Some(item.snippet.published_at.date_naive()),
                    length_ms: durations.get(&item.content_details.video_id).copied().flatten(),
                });
            }
            page_token = page.next_page_token;
            if page_token.is_none() {
                break
            }
        }
        Ok(videos)
    }

    async fn video_durations(&self, ids: Vec<String>) -> reqwest::Result<HashMap<String, Option<i64>>> {
        let mut durations = HashMap::new();
        for chunk in ids.chunks(50) {
            let response = self.http_client.get("https://www.googleapis.com/youtube/v3/videos")
                .query(&[
                    ("part", "contentDetails"),
                    ("id", &*chunk.join(",")),
                    ("key", &*self.api_key),
                ])
                .send().await?
                .error_for_status()?
                .json::<VideosResponse>().await?;
            for item in response.items {
                durations.insert(item.id, parse_iso8601_duration(&item.content_details.duration));
            }
        }
        Ok(durations)
    }
}

/// Parses the `PT#H#M#S` durations the YouTube API returns. Date components
/// (`P#DT…`) appear on streams longer than a day and are handled too.
fn parse_iso8601_duration(raw: &str) -> Option<i64> {
    let rest = raw.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date_part, time_part)) => (date_part, time_part),
        None => (rest, ""),
    };
    let mut total_seconds = 0_i64;
    let mut number = String::new();
    for c in date_part.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else {
            let value = number.parse::<i64>().ok()?;
            number.clear();
            match c {
                'D' => total_seconds += value * 86400,
                _ => return None, // years/months never appear in video durations
            }
        }
    }
    for c in time_part.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else {
            let value = number.parse::<i64>().ok()?;
            number.clear();
            match c {
                'H' => total_seconds += value * 3600,
                'M' => total_seconds += value * 60,
                'S' => total_seconds += value,
                _ => return None,
            }
        }
    }
    if !number.is_empty() {
        return None
    }
    Some(total_seconds * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso8601_durations() {
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(((3600 + 2 * 60 + 3) * 1000) as i64));
        assert_eq!(parse_iso8601_duration("PT45M"), Some(45 * 60 * 1000));
        assert_eq!(parse_iso8601_duration("P1DT2H"), Some((86400 + 2 * 3600) * 1000));
        assert_eq!(parse_iso8601_duration("PT0S"), Some(0));
        assert_eq!(parse_iso8601_duration(""), None);
        assert_eq!(parse_iso8601_duration("1H"), None);
    }

    #[test]
    fn enrichment_fills_only_empty_fields() {
        let mut rec = NewRecommendation {
            link: "https://example.com/kept".to_owned(),
            ..NewRecommendation::default()
        };
        Enrichment {
            link: "https://example.com/ignored".to_owned(),
            genre: "Adventure".to_owned(),
            ..Enrichment::default()
        }.apply(&mut rec);
        assert_eq!(rec.link, "https://example.com/kept");
        assert_eq!(rec.genre, "Adventure");
    }

    #[test]
    fn omdb_placeholder_is_dropped() {
        assert_eq!(non_placeholder("N/A".to_owned()), "");
        assert_eq!(non_placeholder("8.1".to_owned()), "8.1");
    }
}
