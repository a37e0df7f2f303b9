//! Database entities, their CRUD queries, and the per-sheet column tables that
//! tie each entity to its spreadsheet representation.
//!
//! Every record mirrored from the spreadsheet carries a `row_number` pointing at
//! its 1-indexed row in the named sheet. Single-row writes rely on that pointer,
//! so anything that moves sheet rows around has to refresh it (a full sync does).

use {
    crate::{
        prelude::*,
        rowmap::{
            self,
            DateFallback,
            HeaderIndex,
        },
    },
};

/// Sheet and column labels for the episode list.
pub(crate) mod podcasts_sheet {
    pub(crate) const TITLE: &str = "Выпуски";
    pub(crate) const DATE: &str = "Дата";
    pub(crate) const SHOW: &str = "Шоу";
    pub(crate) const NUMBER: &str = "Выпуск";
    pub(crate) const NAME: &str = "Название";
    pub(crate) const LENGTH: &str = "Длительность";
    pub(crate) const REQUIRED: &[&str] = &[DATE, SHOW, NUMBER, NAME, LENGTH];
}

/// Sheet and column labels for per-episode recommendations.
pub(crate) mod recommendations_sheet {
    pub(crate) const TITLE: &str = "Рекомендации";
    pub(crate) const DATE: &str = "Дата";
    pub(crate) const EPISODE: &str = "Выпуск";
    pub(crate) const KIND: &str = "Тип";
    pub(crate) const NAME: &str = "Название";
    pub(crate) const LINK: &str = "Ссылка";
    pub(crate) const IMAGE: &str = "Картинка";
    pub(crate) const PLATFORMS: &str = "Платформы";
    pub(crate) const RATE: &str = "Оценка";
    pub(crate) const GENRE: &str = "Жанр";
    pub(crate) const RELEASED: &str = "Дата выхода";
    pub(crate) const LENGTH: &str = "Длительность";
    pub(crate) const DIMA: &str = "Дима";
    pub(crate) const TIMUR: &str = "Тимур";
    pub(crate) const MAKSIM: &str = "Максим";
    pub(crate) const GUEST: &str = "Гость";
    pub(crate) const REQUIRED: &[&str] = &[DATE, EPISODE, KIND, NAME, LINK, DIMA, TIMUR, MAKSIM];
}

pub(crate) mod streams_sheet {
    pub(crate) const TITLE: &str = "Стримы";
    pub(crate) const DATE: &str = "Дата";
    pub(crate) const NAME: &str = "Название";
    pub(crate) const LINK: &str = "Ссылка";
    pub(crate) const LENGTH: &str = "Длительность";
    pub(crate) const REQUIRED: &[&str] = &[DATE, NAME, LINK, LENGTH];
}

pub(crate) mod config_sheet {
    pub(crate) const TITLE: &str = "Config";
    pub(crate) const KIND: &str = "Тип";
    pub(crate) const VALUE: &str = "Значение";
    pub(crate) const REQUIRED: &[&str] = &[KIND, VALUE];
}

/// `config_entries.kind` values. The Config sheet is a flattened key bag; these
/// discriminate which dropdown a value belongs to.
pub(crate) const TYPE_LIST: &str = "typeList";
pub(crate) const REACTION_LIST: &str = "reactionList";
pub(crate) const SHOW_LIST: &str = "showList";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Podcast {
    pub(crate) id: i64,
    pub(crate) date: Option<NaiveDate>,
    pub(crate) show_type: String,
    pub(crate) number: String,
    pub(crate) name: String,
    #[serde(rename = "length")]
    pub(crate) length_ms: Option<i64>,
    pub(crate) row_number: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewPodcast {
    pub(crate) date: Option<NaiveDate>,
    pub(crate) show_type: String,
    pub(crate) number: String,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default, rename = "length")]
    pub(crate) length_ms: Option<i64>,
}

impl Podcast {
    /// The "ShowType #Number" label recommendation rows use to reference their episode.
    pub(crate) fn label(&self) -> String {
        format!("{} #{}", self.show_type, self.number)
    }

    pub(crate) fn as_new(&self) -> NewPodcast {
        NewPodcast {
            date: self.date,
            show_type: self.show_type.clone(),
            number: self.number.clone(),
            name: self.name.clone(),
            length_ms: self.length_ms,
        }
    }

    pub(crate) async fn all(pool: &PgPool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT id, date, show_type, number, name, length_ms, row_number FROM podcasts ORDER BY id")
            .fetch_all(pool).await
    }

    pub(crate) async fn from_id(pool: &PgPool, id: i64) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT id, date, show_type, number, name, length_ms, row_number FROM podcasts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool).await
    }

    pub(crate) async fn create(pool: &PgPool, data: &NewPodcast, row_number: Option<i32>) -> sqlx::Result<Self> {
        sqlx::query_as("INSERT INTO podcasts (date, show_type, number, name, length_ms, row_number) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id, date, show_type, number, name, length_ms, row_number")
            .bind(data.date)
            .bind(&data.show_type)
            .bind(&data.number)
            .bind(&data.name)
            .bind(data.length_ms)
            .bind(row_number)
            .fetch_one(pool).await
    }

    pub(crate) async fn update(pool: &PgPool, id: i64, data: &NewPodcast, row_number: Option<i32>) -> sqlx::Result<Self> {
        sqlx::query_as("UPDATE podcasts SET date = $2, show_type = $3, number = $4, name = $5, length_ms = $6, row_number = $7 WHERE id = $1 RETURNING id, date, show_type, number, name, length_ms, row_number")
            .bind(id)
            .bind(data.date)
            .bind(&data.show_type)
            .bind(&data.number)
            .bind(&data.name)
            .bind(data.length_ms)
            .bind(row_number)
            .fetch_one(pool).await
    }

    pub(crate) async fn delete(pool: &PgPool, id: i64) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM podcasts WHERE id = $1").bind(id).execute(pool).await?;
        Ok(())
    }
}

impl NewPodcast {
    pub(crate) fn from_sheet_row(header: &HeaderIndex, row: &[String], dates: DateFallback) -> Self {
        Self {
            date: rowmap::parse_sheet_date(header.value(row, podcasts_sheet::DATE), dates),
            show_type: header.value(row, podcasts_sheet::SHOW).to_owned(),
            number: header.value(row, podcasts_sheet::NUMBER).to_owned(),
            name: header.value(row, podcasts_sheet::NAME).to_owned(),
            length_ms: rowmap::parse_duration_ms(header.value(row, podcasts_sheet::LENGTH)),
        }
    }

    pub(crate) fn sheet_cells(&self, header: &HeaderIndex) -> Vec<String> {
        header.make_row(&[
            (podcasts_sheet::DATE, rowmap::format_sheet_date(self.date)),
            (podcasts_sheet::SHOW, self.show_type.clone()),
            (podcasts_sheet::NUMBER, self.number.clone()),
            (podcasts_sheet::NAME, self.name.clone()),
            (podcasts_sheet::LENGTH, self.length_ms.map(rowmap::format_duration_ms).unwrap_or_default()),
        ])
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.show_type.is_empty() && self.number.is_empty() && self.name.is_empty()
    }
}

/// How a recommendation sheet row references its episode: newer rows carry a
/// "ShowType #Number" label, legacy rows only the episode date.
#[derive(Debug, Clone, Default)]
pub(crate) struct EpisodeRef {
    pub(crate) label: String,
    pub(crate) date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Recommendation {
    pub(crate) id: i64,
    pub(crate) podcast_id: i64,
    #[serde(rename = "typeId")]
    pub(crate) type_id: Option<i64>,
    pub(crate) name: String,
    pub(crate) link: String,
    pub(crate) image: String,
    pub(crate) platforms: String,
    pub(crate) rate: String,
    pub(crate) genre: String,
    pub(crate) release_date: String,
    pub(crate) length: String,
    pub(crate) dima: Option<bool>,
    pub(crate) timur: Option<bool>,
    pub(crate) maksim: Option<bool>,
    pub(crate) guest: String,
    pub(crate) row_number: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewRecommendation {
    pub(crate) podcast_id: i64,
    #[serde(default, rename = "typeId")]
    pub(crate) type_id: Option<i64>,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) link: String,
    #[serde(default)]
    pub(crate) image: String,
    #[serde(default)]
    pub(crate) platforms: String,
    #[serde(default)]
    pub(crate) rate: String,
    #[serde(default)]
    pub(crate) genre: String,
    #[serde(default)]
    pub(crate) release_date: String,
    #[serde(default)]
    pub(crate) length: String,
    #[serde(default)]
    pub(crate) dima: Option<bool>,
    #[serde(default)]
    pub(crate) timur: Option<bool>,
    #[serde(default)]
    pub(crate) maksim: Option<bool>,
    #[serde(default)]
    pub(crate) guest: String,
}

const RECOMMENDATION_COLUMNS: &str = "id, podcast_id, type_id, name, link, image, platforms, rate, genre, release_date, length, dima, timur, maksim, guest, row_number";

impl Recommendation {
    pub(crate) fn as_new(&self) -> NewRecommendation {
        NewRecommendation {
            podcast_id: self.podcast_id,
            type_id: self.type_id,
            name: self.name.clone(),
            link: self.link.clone(),
            image: self.image.clone(),
            platforms: self.platforms.clone(),
            rate: self.rate.clone(),
            genre: self.genre.clone(),
            release_date: self.release_date.clone(),
            length: self.length.clone(),
            dima: self.dima,
            timur: self.timur,
            maksim: self.maksim,
            guest: self.guest.clone(),
        }
    }

    pub(crate) async fn all(pool: &PgPool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!("SELECT {RECOMMENDATION_COLUMNS} FROM recommendations ORDER BY id"))
            .fetch_all(pool).await
    }

    pub(crate) async fn from_id(pool: &PgPool, id: i64) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("SELECT {RECOMMENDATION_COLUMNS} FROM recommendations WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool).await
    }

    pub(crate) async fn for_podcast(pool: &PgPool, podcast_id: i64) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!("SELECT {RECOMMENDATION_COLUMNS} FROM recommendations WHERE podcast_id = $1 ORDER BY id"))
            .bind(podcast_id)
            .fetch_all(pool).await
    }

    /// Case-insensitive substring search over the composite name, for the bot's
    /// inline queries.
    pub(crate) async fn search(pool: &PgPool, query: &str, limit: i64) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!("SELECT {RECOMMENDATION_COLUMNS} FROM recommendations WHERE name ILIKE '%' || $1 || '%' ORDER BY id DESC LIMIT $2"))
            .bind(query)
            .bind(limit)
            .fetch_all(pool).await
    }

    pub(crate) async fn create(pool: &PgPool, data: &NewRecommendation, row_number: Option<i32>) -> sqlx::Result<Self> {
        sqlx::query_as(&format!("INSERT INTO recommendations (podcast_id, type_id, name, link, image, platforms, rate, genre, release_date, length, dima, timur, maksim, guest, row_number) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING {RECOMMENDATION_COLUMNS}"))
            .bind(data.podcast_id)
            .bind(data.type_id)
            .bind(&data.name)
            .bind(&data.link)
            .bind(&data.image)
            .bind(&data.platforms)
            .bind(&data.rate)
            .bind(&data.genre)
            .bind(&data.release_date)
            .bind(&data.length)
            .bind(data.dima)
            .bind(data.timur)
            .bind(data.maksim)
            .bind(&data.guest)
            .bind(row_number)
            .fetch_one(pool).await
    }

    pub(crate) async fn update(pool: &PgPool, id: i64, data: &NewRecommendation, row_number: Option<i32>) -> sqlx::Result<Self> {
        sqlx::query_as(&format!("UPDATE recommendations SET podcast_id = $2, type_id = $3, name = $4, link = $5, image = $6, platforms = $7, rate = $8, genre = $9, release_date = $10, length = $11, dima = $12, timur = $13, maksim = $14, guest = $15, row_number = $16 WHERE id = $1 RETURNING {RECOMMENDATION_COLUMNS}"))
            .bind(id)
            .bind(data.podcast_id)
            .bind(data.type_id)
            .bind(&data.name)
            .bind(&data.link)
            .bind(&data.image)
            .bind(&data.platforms)
            .bind(&data.rate)
            .bind(&data.genre)
            .bind(&data.release_date)
            .bind(&data.length)
            .bind(data.dima)
            .bind(data.timur)
            .bind(data.maksim)
            .bind(&data.guest)
            .bind(row_number)
            .fetch_one(pool).await
    }

    pub(crate) async fn delete(pool: &PgPool, id: i64) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM recommendations WHERE id = $1").bind(id).execute(pool).await?;
        Ok(())
    }
}

impl NewRecommendation {
    /// Splits a sheet row into the recommendation fields and the episode
    /// reference; `podcast_id` is left at 0 for the reconciler to resolve.
    pub(crate) fn from_sheet_row(header: &HeaderIndex, row: &[String], dates: DateFallback) -> (Self, EpisodeRef, String) {
        use recommendations_sheet::*;
        let episode = EpisodeRef {
            label: header.value(row, EPISODE).to_owned(),
            date: rowmap::parse_sheet_date(header.value(row, DATE), dates),
        };
        let kind_value = header.value(row, KIND).to_owned();
        let data = Self {
            podcast_id: 0,
            type_id: None,
            name: header.value(row, NAME).to_owned(),
            link: header.value(row, LINK).to_owned(),
            image: header.value(row, IMAGE).to_owned(),
            platforms: header.value(row, PLATFORMS).to_owned(),
            rate: header.value(row, RATE).to_owned(),
            genre: header.value(row, GENRE).to_owned(),
            release_date: header.value(row, RELEASED).to_owned(),
            length: header.value(row, LENGTH).to_owned(),
            dima: rowmap::parse_reaction(header.value(row, DIMA)),
            timur: rowmap::parse_reaction(header.value(row, TIMUR)),
            maksim: rowmap::parse_reaction(header.value(row, MAKSIM)),
            guest: header.value(row, GUEST).to_owned(),
        };
        (data, episode, kind_value)
    }

    pub(crate) fn sheet_cells(&self, header: &HeaderIndex, episode: &EpisodeRef, kind_value: &str) -> Vec<String> {
        use recommendations_sheet::*;
        header.make_row(&[
            (DATE, rowmap::format_sheet_date(episode.date)),
            (EPISODE, episode.label.clone()),
            (KIND, kind_value.to_owned()),
            (NAME, self.name.clone()),
            (LINK, self.link.clone()),
            (IMAGE, self.image.clone()),
            (PLATFORMS, self.platforms.clone()),
            (RATE, self.rate.clone()),
            (GENRE, self.genre.clone()),
            (RELEASED, self.release_date.clone()),
            (LENGTH, self.length.clone()),
            (DIMA, rowmap::format_reaction(self.dima)),
            (TIMUR, rowmap::format_reaction(self.timur)),
            (MAKSIM, rowmap::format_reaction(self.maksim)),
            (GUEST, self.guest.clone()),
        ])
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.name.is_empty() && self.link.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Stream {
    pub(crate) id: i64,
    pub(crate) date: Option<NaiveDate>,
    pub(crate) title: String,
    pub(crate) link: String,
    #[serde(rename = "length")]
    pub(crate) length_ms: Option<i64>,
    pub(crate) row_number: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewStream {
    pub(crate) date: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) title: String,
    pub(crate) link: String,
    #[serde(default, rename = "length")]
    pub(crate) length_ms: Option<i64>,
}

impl Stream {
    pub(crate) async fn all(pool: &PgPool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT id, date, title, link, length_ms, row_number FROM streams ORDER BY id")
            .fetch_all(pool).await
    }

    pub(crate) async fn from_link(pool: &PgPool, link: &str) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT id, date, title, link, length_ms, row_number FROM streams WHERE link = $1")
            .bind(link)
            .fetch_optional(pool).await
    }

    pub(crate) async fn create(pool: &PgPool, data: &NewStream, row_number: Option<i32>) -> sqlx::Result<Self> {
        sqlx::query_as("INSERT INTO streams (date, title, link, length_ms, row_number) VALUES ($1, $2, $3, $4, $5) RETURNING id, date, title, link, length_ms, row_number")
            .bind(data.date)
            .bind(&data.title)
            .bind(&data.link)
            .bind(data.length_ms)
            .bind(row_number)
            .fetch_one(pool).await
    }

    pub(crate) async fn set_row_number(pool: &PgPool, id: i64, row_number: i32) -> sqlx::Result<()> {
        sqlx::query("UPDATE streams SET row_number = $2 WHERE id = $1")
            .bind(id)
            .bind(row_number)
            .execute(pool).await?;
        Ok(())
    }
}

impl NewStream {
    pub(crate) fn from_sheet_row(header: &HeaderIndex, row: &[String], dates: DateFallback) -> Self {
        use streams_sheet::*;
        Self {
            date: rowmap::parse_sheet_date(header.value(row, DATE), dates),
            title: header.value(row, NAME).to_owned(),
            link: header.value(row, LINK).to_owned(),
            length_ms: rowmap::parse_duration_ms(header.value(row, LENGTH)),
        }
    }

    pub(crate) fn sheet_cells(&self, header: &HeaderIndex) -> Vec<String> {
        use streams_sheet::*;
        header.make_row(&[
            (DATE, rowmap::format_sheet_date(self.date)),
            (NAME, self.title.clone()),
            (LINK, self.link.clone()),
            (LENGTH, self.length_ms.map(rowmap::format_duration_ms).unwrap_or_default()),
        ])
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigEntry {
    pub(crate) id: i64,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) value: String,
    pub(crate) row_number: Option<i32>,
}

impl ConfigEntry {
    pub(crate) async fn all(pool: &PgPool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT id, kind, value, row_number FROM config_entries ORDER BY id")
            .fetch_all(pool).await
    }

    /// The Config table is fully replaced on each sync.
    pub(crate) async fn truncate(pool: &PgPool) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM config_entries").execute(pool).await?;
        Ok(())
    }

    pub(crate) async fn create(pool: &PgPool, kind: &str, value: &str, row_number: Option<i32>) -> sqlx::Result<Self> {
        sqlx::query_as("INSERT INTO config_entries (kind, value, row_number) VALUES ($1, $2, $3) RETURNING id, kind, value, row_number")
            .bind(kind)
            .bind(value)
            .bind(row_number)
            .fetch_one(pool).await
    }

    pub(crate) async fn id_for_value(pool: &PgPool, kind: &str, value: &str) -> sqlx::Result<Option<i64>> {
        sqlx::query_scalar("SELECT id FROM config_entries WHERE kind = $1 AND value = $2 ORDER BY id LIMIT 1")
            .bind(kind)
            .bind(value)
            .fetch_optional(pool).await
    }

    pub(crate) async fn value_of(pool: &PgPool, id: i64) -> sqlx::Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM config_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(pool).await
    }

    /// `id → value` for every `typeList` entry, for stats grouping and sheet writes.
    pub(crate) async fn type_names(pool: &PgPool) -> sqlx::Result<HashMap<i64, String>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, value FROM config_entries WHERE kind = $1")
            .bind(TYPE_LIST)
            .fetch_all(pool).await?;
        Ok(rows.into_iter().collect())
    }
}

/// Two-tier permission model for the bot. Anyone not listed in `accounts` (and
/// not the configured default admin) is a moderator, restricted to public commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Admin,
    Moderator,
}

pub(crate) async fn role_of(pool: &PgPool, telegram_id: i64, default_admin: i64) -> sqlx::Result<Role> {
    if telegram_id == default_admin {
        return Ok(Role::Admin)
    }
    let role: Option<String> = sqlx::query_scalar("SELECT role FROM accounts WHERE telegram_id = $1")
        .bind(telegram_id)
        .fetch_optional(pool).await?;
    Ok(match role.as_deref() {
        Some("admin") => Role::Admin,
        _ => Role::Moderator,
    })
}

pub(crate) async fn ensure_account(pool: &PgPool, telegram_id: i64) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO accounts (telegram_id, role) VALUES ($1, 'moderator') ON CONFLICT (telegram_id) DO NOTHING")
        .bind(telegram_id)
        .execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        crate::rowmap::HeaderIndex,
        super::*,
    };

    fn podcast_header() -> HeaderIndex {
        HeaderIndex::new(&["Дата", "Шоу", "Выпуск", "Название", "Длительность"].map(str::to_owned))
    }

    #[test]
    fn podcast_sheet_round_trip() {
        let header = podcast_header();
        let data = NewPodcast {
            date: NaiveDate::from_ymd_opt(2023, 2, 1),
            show_type: "Zavtracast".to_owned(),
            number: "5".to_owned(),
            name: "Тестовый выпуск".to_owned(),
            length_ms: Some(((2 * 60 + 1) * 60 + 4) * 1000),
        };
        let cells = data.sheet_cells(&header);
        assert_eq!(cells, ["01.02.2023", "Zavtracast", "5", "Тестовый выпуск", "02:01:04"]);
        let parsed = NewPodcast::from_sheet_row(&header, &cells, DateFallback::Null);
        assert_eq!(parsed.date, data.date);
        assert_eq!(parsed.show_type, data.show_type);
        assert_eq!(parsed.number, data.number);
        assert_eq!(parsed.length_ms, data.length_ms);
    }

    #[test]
    fn blank_podcast_row_is_detected() {
        let header = podcast_header();
        let blanked = vec![String::new(); header.width()];
        assert!(NewPodcast::from_sheet_row(&header, &blanked, DateFallback::Null).is_blank());
    }

    #[test]
    fn recommendation_sheet_round_trip() {
        let header = HeaderIndex::new(&[
            "Дата", "Выпуск", "Тип", "Название", "Ссылка", "Картинка", "Платформы",
            "Оценка", "Жанр", "Дата выхода", "Длительность", "Дима", "Тимур", "Максим", "Гость",
        ].map(str::to_owned));
        let episode = EpisodeRef {
            label: "Zavtracast #5".to_owned(),
            date: NaiveDate::from_ymd_opt(2023, 2, 1),
        };
        let data = NewRecommendation {
            podcast_id: 0,
            name: "Outer Wilds".to_owned(),
            link: "https://rawg.io/games/outer-wilds".to_owned(),
            dima: Some(true),
            maksim: Some(false),
            guest: "Петя".to_owned(),
            ..NewRecommendation::default()
        };
        let cells = data.sheet_cells(&header, &episode, "Игра");
        let (parsed, parsed_episode, kind_value) = NewRecommendation::from_sheet_row(&header, &cells, DateFallback::Null);
        assert_eq!(parsed_episode.label, episode.label);
        assert_eq!(parsed_episode.date, episode.date);
        assert_eq!(kind_value, "Игра");
        assert_eq!(parsed.name, data.name);
        assert_eq!(parsed.link, data.link);
        assert_eq!(parsed.dima, Some(true));
        assert_eq!(parsed.timur, None);
        assert_eq!(parsed.maksim, Some(false));
        assert_eq!(parsed.guest, data.guest);
    }
}
