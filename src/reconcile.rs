//! Row-numbered synchronization between the spreadsheet and Postgres.
//!
//! The spreadsheet stays the editing surface for non-technical hosts; Postgres
//! is the store the API and the bot read. `full_sync` mirrors every sheet into
//! its table and refreshes each record's `row_number` pointer; the single-row
//! operations write the sheet first and the database second, so a failed sheet
//! write leaves the database untouched. A failed database write after a
//! successful sheet write leaves the stores diverged until the next full sync;
//! there is no compensating rollback.

use {
    lazy_regex::regex_captures,
    crate::{
        model::{
            self,
            ConfigEntry,
            EpisodeRef,
            NewPodcast,
            NewRecommendation,
            NewStream,
            Podcast,
            Recommendation,
            Stream,
            config_sheet,
            podcasts_sheet,
            recommendations_sheet,
            streams_sheet,
        },
        prelude::*,
        rowmap::{
            self,
            DateFallback,
            HeaderIndex,
        },
        sheets::SheetStore,
    },
};

/// Legacy rows reference their episode by date alone; anything within this
/// window of an episode's air date is attributed to it.
const DATE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Header(#[from] rowmap::MissingHeaders),
    #[error(transparent)] Sheets(#[from] crate::sheets::Error),
    #[error(transparent)] Sql(#[from] sqlx::Error),
    #[error("podcast {0} not found")]
    PodcastNotFound(i64),
    #[error("recommendation {0} not found")]
    RecommendationNotFound(i64),
}

/// Aggregate outcome of a table sync. Per-row failures are logged server-side
/// and not itemized for the caller.
#[derive(Debug, Default, Serialize)]
pub(crate) struct TableReport {
    pub(crate) synced: usize,
    pub(crate) total: usize,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct SyncReport {
    pub(crate) config: TableReport,
    pub(crate) podcasts: TableReport,
    pub(crate) recommendations: TableReport,
    pub(crate) streams: TableReport,
}

pub(crate) struct Reconciler<S> {
    sheets: S,
    pool: PgPool,
    dates: DateFallback,
}

impl<S: SheetStore> Reconciler<S> {
    pub(crate) fn new(sheets: S, pool: PgPool, dates: DateFallback) -> Self {
        Self { sheets, pool, dates }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fails fast if any sheet's header row no longer carries the labels the
    /// field maps address. Run at startup, before anything writes a row.
    pub(crate) async fn validate_headers(&self) -> Result<(), Error> {
        for (sheet, required) in [
            (podcasts_sheet::TITLE, podcasts_sheet::REQUIRED),
            (recommendations_sheet::TITLE, recommendations_sheet::REQUIRED),
            (streams_sheet::TITLE, streams_sheet::REQUIRED),
            (config_sheet::TITLE, config_sheet::REQUIRED),
        ] {
            let header = HeaderIndex::new(&self.sheets.header_row(sheet).await?);
            header.validate(required)?;
        }
        Ok(())
    }

    async fn header(&self, sheet: &str, required: &[&str]) -> Result<HeaderIndex, Error> {
        let header = HeaderIndex::new(&self.sheets.header_row(sheet).await?);
        header.validate(required)?;
        Ok(header)
    }

    /// Mirrors every sheet into its table, in dependency order. Config is
    /// truncated and reloaded; a crash between the truncate and the reload
    /// leaves it empty until the next sync, which is accepted.
    pub(crate) async fn full_sync(&self) -> Result<SyncReport, Error> {
        let config = self.sync_config().await?;
        let podcasts = self.sync_podcasts().await?;
        let recommendations = self.sync_recommendations().await?;
        let streams = self.sync_streams().await?;
        let report = SyncReport { config, podcasts, recommendations, streams };
        info!(
            "full sync: config {}/{}, podcasts {}/{}, recommendations {}/{}, streams {}/{}",
            report.config.synced, report.config.total,
            report.podcasts.synced, report.podcasts.total,
            report.recommendations.synced, report.recommendations.total,
            report.streams.synced, report.streams.total,
        );
        Ok(report)
    }

    async fn sync_config(&self) -> Result<TableReport, Error> {
        let rows = self.sheets.values(config_sheet::TITLE).await?;
        let Some((header_row, data_rows)) = rows.split_first() else { return Ok(TableReport::default()) };
        let header = HeaderIndex::new(header_row);
        header.validate(config_sheet::REQUIRED)?;
        ConfigEntry::truncate(&self.pool).await?;
        let mut report = TableReport::default();
        for (idx, row) in data_rows.iter().enumerate() {
            let row_number = sheet_row_number(idx);
            let kind = header.value(row, config_sheet::KIND);
            let value = header.value(row, config_sheet::VALUE);
            if kind.is_empty() && value.is_empty() {
                continue
            }
            report.total += 1;
            match ConfigEntry::create(&self.pool, kind, value, Some(row_number)).await {
                Ok(_) => report.synced += 1,
                Err(e) => warn!("config row {row_number}: {e}"),
            }
        }
        Ok(report)
    }

    async fn sync_podcasts(&self) -> Result<TableReport, Error> {
        let rows = self.sheets.values(podcasts_sheet::TITLE).await?;
        let Some((header_row, data_rows)) = rows.split_first() else { return Ok(TableReport::default()) };
        let header = HeaderIndex::new(header_row);
        header.validate(podcasts_sheet::REQUIRED)?;
        let mut by_key = Podcast::all(&self.pool).await?
            .into_iter()
            .map(|podcast| ((podcast.show_type.clone(), podcast.number.clone()), podcast.id))
            .collect::<HashMap<_, _>>();
        let mut report = TableReport::default();
        for (idx, row) in data_rows.iter().enumerate() {
            let row_number = sheet_row_number(idx);
            let data = NewPodcast::from_sheet_row(&header, row, self.dates);
            if data.is_blank() {
                continue
            }
            report.total += 1;
            let key = (data.show_type.clone(), data.number.clone());
            let result = match by_key.get(&key) {
                Some(&id) => Podcast::update(&self.pool, id, &data, Some(row_number)).await,
                None => Podcast::create(&self.pool, &data, Some(row_number)).await,
            };
            match result {
                Ok(podcast) => {
                    by_key.insert(key, podcast.id);
                    report.synced += 1;
                }
                Err(e) => warn!("podcast row {row_number}: {e}"),
            }
        }
        Ok(report)
    }

    async fn sync_recommendations(&self) -> Result<TableReport, Error> {
        let rows = self.sheets.values(recommendations_sheet::TITLE).await?;
        let Some((header_row, data_rows)) = rows.split_first() else { return Ok(TableReport::default()) };
        let header = HeaderIndex::new(header_row);
        header.validate(recommendations_sheet::REQUIRED)?;
        let podcasts = Podcast::all(&self.pool).await?;
        let existing_by_row = Recommendation::all(&self.pool).await?
            .into_iter()
            .filter_map(|rec| rec.row_number.map(|row_number| (row_number, rec.id)))
            .collect::<HashMap<_, _>>();
        let mut report = TableReport::default();
        for (idx, row) in data_rows.iter().enumerate() {
            let row_number = sheet_row_number(idx);
            let (mut data, episode, kind_value) = NewRecommendation::from_sheet_row(&header, row, self.dates);
            if data.is_blank() {
                continue
            }
            report.total += 1;
            let Some(podcast) = match_podcast(&podcasts, &episode) else {
                warn!("recommendation row {row_number}: no episode matches {:?}", episode.label);
                continue
            };
            data.podcast_id = podcast.id;
            if !kind_value.is_empty() {
                data.type_id = ConfigEntry::id_for_value(&self.pool, model::TYPE_LIST, &kind_value).await?;
            }
            let result = match existing_by_row.get(&row_number) {
                Some(&id) => Recommendation::update(&self.pool, id, &data, Some(row_number)).await,
                None => Recommendation::create(&self.pool, &data, Some(row_number)).await,
            };
            match result {
                Ok(_) => report.synced += 1,
                Err(e) => warn!("recommendation row {row_number}: {e}"),
            }
        }
        Ok(report)
    }

    async fn sync_streams(&self) -> Result<TableReport, Error> {
        let rows = self.sheets.values(streams_sheet::TITLE).await?;
        let Some((header_row, data_rows)) = rows.split_first() else { return Ok(TableReport::default()) };
        let header = HeaderIndex::new(header_row);
        header.validate(streams_sheet::REQUIRED)?;
        let mut report = TableReport::default();
        for (idx, row) in data_rows.iter().enumerate() {
            let row_number = sheet_row_number(idx);
            let data = NewStream::from_sheet_row(&header, row, self.dates);
            if data.link.is_empty() {
                continue
            }
            report.total += 1;
            let result = match Stream::from_link(&self.pool, &data.link).await {
                Ok(Some(existing)) => Stream::set_row_number(&self.pool, existing.id, row_number).await,
                Ok(None) => Stream::create(&self.pool, &data, Some(row_number)).await.map(|_| ()),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => report.synced += 1,
                Err(e) => warn!("stream row {row_number}: {e}"),
            }
        }
        Ok(report)
    }

    pub(crate) async fn add_podcast(&self, data: NewPodcast) -> Result<Podcast, Error> {
        let header = self.header(podcasts_sheet::TITLE, podcasts_sheet::REQUIRED).await?;
        let row_number = self.sheets.append_row(podcasts_sheet::TITLE, data.sheet_cells(&header)).await?;
        Ok(Podcast::create(&self.pool, &data, Some(row_number)).await?)
    }

    /// Rewrites the podcast's sheet row and record. If the date changed, every
    /// linked recommendation's sheet row is rewritten too so its date column
    /// stays in step; those rewrites are best-effort.
    pub(crate) async fn update_podcast(&self, id: i64, data: NewPodcast) -> Result<Podcast, Error> {
        let current = Podcast::from_id(&self.pool, id).await?.ok_or(Error::PodcastNotFound(id))?;
        let header = self.header(podcasts_sheet::TITLE, podcasts_sheet::REQUIRED).await?;
        match current.row_number {
            Some(row_number) => self.sheets.update_row(podcasts_sheet::TITLE, row_number, data.sheet_cells(&header)).await?,
            None => warn!("podcast {id} has no sheet row, updating database only"),
        }
        let changed_reference = current.date != data.date || current.show_type != data.show_type || current.number != data.number;
        let updated = Podcast::update(&self.pool, id, &data, current.row_number).await?;
        if changed_reference {
            self.rewrite_recommendation_rows(&updated).await?;
        }
        Ok(updated)
    }

    async fn rewrite_recommendation_rows(&self, podcast: &Podcast) -> Result<(), Error> {
        let header = self.header(recommendations_sheet::TITLE, recommendations_sheet::REQUIRED).await?;
        let episode = EpisodeRef { label: podcast.label(), date: podcast.date };
        let type_names = ConfigEntry::type_names(&self.pool).await?;
        for rec in Recommendation::for_podcast(&self.pool, podcast.id).await? {
            let Some(row_number) = rec.row_number else { continue };
            let kind_value = rec.type_id.and_then(|type_id| type_names.get(&type_id).cloned()).unwrap_or_default();
            let cells = rec.as_new().sheet_cells(&header, &episode, &kind_value);
            if let Err(e) = self.sheets.update_row(recommendations_sheet::TITLE, row_number, cells).await {
                warn!("rewriting recommendation row {row_number}: {e}");
            }
        }
        Ok(())
    }

    /// Cascade delete: recommendations first (sheet blanked, then record), the
    /// podcast itself last, so a crash mid-cascade cannot orphan recommendation
    /// rows. Individual recommendation failures are logged and skipped; the
    /// database backstops them with `ON DELETE CASCADE`.
    pub(crate) async fn delete_podcast(&self, id: i64) -> Result<(), Error> {
        let podcast = Podcast::from_id(&self.pool, id).await?.ok_or(Error::PodcastNotFound(id))?;
        let rec_header = self.header(recommendations_sheet::TITLE, recommendations_sheet::REQUIRED).await?;
        for rec in Recommendation::for_podcast(&self.pool, id).await? {
            if let Some(row_number) = rec.row_number {
                if let Err(e) = self.sheets.blank_row(recommendations_sheet::TITLE, row_number, rec_header.width()).await {
                    warn!("blanking recommendation row {row_number}: {e}");
                    continue
                }
            }
            if let Err(e) = Recommendation::delete(&self.pool, rec.id).await {
                warn!("deleting recommendation {}: {e}", rec.id);
            }
        }
        if let Some(row_number) = podcast.row_number {
            let header = self.header(podcasts_sheet::TITLE, podcasts_sheet::REQUIRED).await?;
            self.sheets.blank_row(podcasts_sheet::TITLE, row_number, header.width()).await?;
        }
        Ok(Podcast::delete(&self.pool, id).await?)
    }

    pub(crate) async fn add_recommendation(&self, data: NewRecommendation) -> Result<Recommendation, Error> {
        let podcast = Podcast::from_id(&self.pool, data.podcast_id).await?.ok_or(Error::PodcastNotFound(data.podcast_id))?;
        let header = self.header(recommendations_sheet::TITLE, recommendations_sheet::REQUIRED).await?;
        let episode = EpisodeRef { label: podcast.label(), date: podcast.date };
        let kind_value = self.kind_value(&data).await?;
        let row_number = self.sheets.append_row(recommendations_sheet::TITLE, data.sheet_cells(&header, &episode, &kind_value)).await?;
        Ok(Recommendation::create(&self.pool, &data, Some(row_number)).await?)
    }

    pub(crate) async fn update_recommendation(&self, id: i64, data: NewRecommendation) -> Result<Recommendation, Error> {
        let current = Recommendation::from_id(&self.pool, id).await?.ok_or(Error::RecommendationNotFound(id))?;
        let podcast = Podcast::from_id(&self.pool, data.podcast_id).await?.ok_or(Error::PodcastNotFound(data.podcast_id))?;
        let header = self.header(recommendations_sheet::TITLE, recommendations_sheet::REQUIRED).await?;
        let episode = EpisodeRef { label: podcast.label(), date: podcast.date };
        let kind_value = self.kind_value(&data).await?;
        match current.row_number {
            Some(row_number) => self.sheets.update_row(recommendations_sheet::TITLE, row_number, data.sheet_cells(&header, &episode, &kind_value)).await?,
            None => warn!("recommendation {id} has no sheet row, updating database only"),
        }
        Ok(Recommendation::update(&self.pool, id, &data, current.row_number).await?)
    }

    pub(crate) async fn delete_recommendation(&self, id: i64) -> Result<(), Error> {
        let current = Recommendation::from_id(&self.pool, id).await?.ok_or(Error::RecommendationNotFound(id))?;
        if let Some(row_number) = current.row_number {
            let header = self.header(recommendations_sheet::TITLE, recommendations_sheet::REQUIRED).await?;
            self.sheets.blank_row(recommendations_sheet::TITLE, row_number, header.width()).await?;
        }
        Ok(Recommendation::delete(&self.pool, id).await?)
    }

    /// Appends a stream unless its link is already recorded. Returns `None` for
    /// duplicates; the streams table is append-only.
    pub(crate) async fn add_stream(&self, data: NewStream) -> Result<Option<Stream>, Error> {
        if Stream::from_link(&self.pool, &data.link).await?.is_some() {
            return Ok(None)
        }
        let header = self.header(streams_sheet::TITLE, streams_sheet::REQUIRED).await?;
        let row_number = self.sheets.append_row(streams_sheet::TITLE, data.sheet_cells(&header)).await?;
        Ok(Some(Stream::create(&self.pool, &data, Some(row_number)).await?))
    }

    async fn kind_value(&self, data: &NewRecommendation) -> Result<String, Error> {
        Ok(match data.type_id {
            Some(type_id) => ConfigEntry::value_of(&self.pool, type_id).await?.unwrap_or_default(),
            None => String::new(),
        })
    }
}

/// Sheet row number of the data row at `idx` (row 1 is the header).
fn sheet_row_number(idx: usize) -> i32 {
    idx as i32 + 2
}

/// Splits a "ShowType #Number" episode label into its natural-key parts.
pub(crate) fn parse_episode_label(label: &str) -> Option<(&str, &str)> {
    regex_captures!(r"^(.+?)\s*#\s*(\S+)$", label.trim())
        .map(|(_, show_type, number)| (show_type.trim(), number))
}

/// Resolves a recommendation row's episode reference to a podcast. The exact
/// natural-key match wins; rows that predate the label format fall back to a
/// ±7-day window around the episode date, first match in query order.
pub(crate) fn match_podcast<'p>(podcasts: &'p [Podcast], episode: &EpisodeRef) -> Option<&'p Podcast> {
    if let Some((show_type, number)) = parse_episode_label(&episode.label) {
        if let Some(podcast) = podcasts.iter().find(|podcast| podcast.show_type == show_type && podcast.number == number) {
            return Some(podcast)
        }
    }
    let date = episode.date
        .or_else(|| rowmap::parse_sheet_date(&episode.label, DateFallback::Null))?;
    podcasts.iter().find(|podcast| podcast.date.is_some_and(|aired| (aired - date).num_days().abs() <= DATE_WINDOW_DAYS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn podcast(id: i64, show_type: &str, number: &str, date: Option<NaiveDate>) -> Podcast {
        Podcast {
            id,
            date,
            show_type: show_type.to_owned(),
            number: number.to_owned(),
            name: String::new(),
            length_ms: None,
            row_number: None,
        }
    }

    #[test]
    fn episode_labels() {
        assert_eq!(parse_episode_label("Zavtracast #5"), Some(("Zavtracast", "5")));
        assert_eq!(parse_episode_label("ДТКД # 12"), Some(("ДТКД", "12")));
        assert_eq!(parse_episode_label("Zavtracast 5"), None);
        assert_eq!(parse_episode_label(""), None);
    }

    #[test]
    fn natural_key_match_beats_date_window() {
        let date = NaiveDate::from_ymd_opt(2023, 2, 1);
        let podcasts = vec![
            podcast(1, "ДТКД", "5", date),
            podcast(2, "Zavtracast", "5", date),
        ];
        let episode = EpisodeRef { label: "Zavtracast #5".to_owned(), date };
        assert_eq!(match_podcast(&podcasts, &episode).map(|p| p.id), Some(2));
    }

    #[test]
    fn date_window_fallback() {
        let podcasts = vec![
            podcast(1, "Zavtracast", "4", NaiveDate::from_ymd_opt(2023, 1, 1)),
            podcast(2, "Zavtracast", "5", NaiveDate::from_ymd_opt(2023, 2, 1)),
        ];
        // unparseable label, date four days past episode 5
        let episode = EpisodeRef {
            label: "пятый выпуск".to_owned(),
            date: NaiveDate::from_ymd_opt(2023, 2, 5),
        };
        assert_eq!(match_podcast(&podcasts, &episode).map(|p| p.id), Some(2));
        // legacy rows sometimes carry the date in the label column itself
        let labeled_date = EpisodeRef { label: "01.01.2023".to_owned(), date: None };
        assert_eq!(match_podcast(&podcasts, &labeled_date).map(|p| p.id), Some(1));
        // outside the window, no match
        let stray = EpisodeRef { label: String::new(), date: NaiveDate::from_ymd_opt(2023, 3, 1) };
        assert!(match_podcast(&podcasts, &stray).is_none());
    }

    #[test]
    fn first_match_wins_on_ambiguity() {
        let date = NaiveDate::from_ymd_opt(2023, 2, 1);
        let podcasts = vec![
            podcast(1, "Zavtracast", "5", date),
            podcast(2, "ДТКД", "12", date),
        ];
        let episode = EpisodeRef { label: String::new(), date };
        assert_eq!(match_podcast(&podcasts, &episode).map(|p| p.id), Some(1));
    }

    #[test]
    fn data_rows_start_below_the_header() {
        assert_eq!(sheet_row_number(0), 2);
        assert_eq!(sheet_row_number(10), 12);
    }
}
