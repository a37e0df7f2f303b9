//! Pure aggregation and formatting helpers, shared by the bot replies and the
//! read-only stats endpoint. Nothing here touches the database or the sheet.

use {
    crate::{
        model::{
            Podcast,
            Recommendation,
        },
        prelude::*,
        rowmap,
    },
};

pub(crate) const YEAR_FORMS: [&str; 3] = ["год", "года", "лет"];
pub(crate) const MONTH_FORMS: [&str; 3] = ["месяц", "месяца", "месяцев"];
pub(crate) const DAY_FORMS: [&str; 3] = ["день", "дня", "дней"];
pub(crate) const EPISODE_FORMS: [&str; 3] = ["выпуск", "выпуска", "выпусков"];
pub(crate) const RECOMMENDATION_FORMS: [&str; 3] = ["рекомендация", "рекомендации", "рекомендаций"];

/// Russian three-form declension: `[one, few, many]`, with 11–19 always "many".
pub(crate) fn word_declension(num: u64, forms: [&'static str; 3]) -> &'static str {
    let [one, few, many] = forms;
    if (11..=19).contains(&(num % 100)) {
        return many
    }
    match num % 10 {
        1 => one,
        2..=4 => few,
        _ => many,
    }
}

/// Sums a list of `HH:MM:SS` strings into one. Two-component entries are
/// `MM:SS`; anything unparseable contributes nothing.
pub(crate) fn sum_time<S: AsRef<str>>(times: &[S]) -> String {
    let total = times.iter().filter_map(|time| rowmap::parse_duration_ms(time.as_ref())).sum();
    rowmap::format_duration_ms(total)
}

/// Decomposes the span between two dates into years/months/days by reading the
/// difference as a timestamp since the epoch. Deliberately not calendar-exact;
/// this matches what the stats always displayed.
pub(crate) fn human_period(from: NaiveDate, to: NaiveDate) -> String {
    let diff_ms = (to - from).num_milliseconds().max(0);
    let point = DateTime::from_timestamp_millis(diff_ms).unwrap_or(DateTime::UNIX_EPOCH);
    let years = (point.year() - 1970) as u64;
    let months = point.month0() as u64;
    let days = (point.day() - 1) as u64;
    let mut parts = Vec::new();
    if years > 0 {
        parts.push(format!("{years} {}", word_declension(years, YEAR_FORMS)));
    }
    if months > 0 {
        parts.push(format!("{months} {}", word_declension(months, MONTH_FORMS)));
    }
    if days > 0 || parts.is_empty() {
        parts.push(format!("{days} {}", word_declension(days, DAY_FORMS)));
    }
    parts.join(" ")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PodcastStat {
    /// Time since the first episode aired.
    pub(crate) on_air: String,
    pub(crate) count: usize,
    /// Summed episode length, `HH:MM:SS`.
    pub(crate) total_length: String,
    /// Time since the most recent episode, if any episode has a date.
    pub(crate) last_release: Option<String>,
}

pub(crate) fn podcast_stat(rows: &[Podcast], today: NaiveDate) -> PodcastStat {
    let first = rows.iter().filter_map(|podcast| podcast.date).min();
    let last = rows.iter().filter_map(|podcast| podcast.date).max();
    let total_ms = rows.iter().filter_map(|podcast| podcast.length_ms).sum();
    PodcastStat {
        on_air: first.map(|first| human_period(first, today)).unwrap_or_default(),
        count: rows.len(),
        total_length: rowmap::format_duration_ms(total_ms),
        last_release: last.map(|last| human_period(last, today)),
    }
}

/// Which host's vote to filter by in [`total_stat`].
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Host {
    Dima,
    Timur,
    Maksim,
}

impl Host {
    pub(crate) fn vote(&self, rec: &Recommendation) -> Option<bool> {
        match self {
            Self::Dima => rec.dima,
            Self::Timur => rec.timur,
            Self::Maksim => rec.maksim,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TotalStat {
    pub(crate) count: usize,
    pub(crate) by_type: BTreeMap<String, usize>,
}

const UNTYPED: &str = "прочее";

/// Count of recommendations, grouped by type name, optionally narrowed to one
/// podcast and/or to entries a given host voted for.
pub(crate) fn total_stat(
    rows: &[Recommendation],
    type_names: &HashMap<i64, String>,
    podcast_filter: Option<i64>,
    host_filter: Option<Host>,
) -> TotalStat {
    let mut by_type = BTreeMap::<String, usize>::new();
    let mut count = 0;
    for rec in rows {
        if podcast_filter.is_some_and(|podcast_id| rec.podcast_id != podcast_id) {
            continue
        }
        if let Some(host) = host_filter {
            if host.vote(rec) != Some(true) {
                continue
            }
        }
        count += 1;
        let type_name = rec.type_id
            .and_then(|type_id| type_names.get(&type_id).map(String::as_str))
            .unwrap_or(UNTYPED);
        *by_type.entry(type_name.to_owned()).or_default() += 1;
    }
    TotalStat { count, by_type }
}

/// The parts of a composite recommendation title: `"Name / Alt (Desc)"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NameParts {
    pub(crate) name: String,
    pub(crate) another_name: String,
    pub(crate) description: String,
}

pub(crate) fn split_name(full: &str) -> NameParts {
    let full = full.trim();
    let (head, description) = match (full.rfind('('), full.ends_with(')')) {
        (Some(open), true) => (full[..open].trim(), full[open + 1..full.len() - 1].trim()),
        _ => (full, ""),
    };
    let (name, another_name) = match head.split_once(" / ") {
        Some((name, another_name)) => (name.trim(), another_name.trim()),
        None => (head, ""),
    };
    NameParts {
        name: name.to_owned(),
        another_name: another_name.to_owned(),
        description: description.to_owned(),
    }
}

pub(crate) fn combine_title(parts: &NameParts) -> String {
    let mut full = parts.name.clone();
    if !parts.another_name.is_empty() {
        full.push_str(" / ");
        full.push_str(&parts.another_name);
    }
    if !parts.description.is_empty() {
        full.push_str(" (");
        full.push_str(&parts.description);
        full.push(')');
    }
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declension_matches_russian_rules() {
        let expected = [
            "лет", "год", "года", "года", "года", "лет", "лет", "лет", "лет", "лет", // 0..=9
            "лет", "лет", "лет", "лет", "лет", "лет", "лет", "лет", "лет", "лет", // 10..=19
            "лет", "год", // 20, 21
        ];
        for (num, &form) in expected.iter().enumerate() {
            assert_eq!(word_declension(num as u64, YEAR_FORMS), form, "n = {num}");
        }
        // 11..=19 modulo 100 is always the "many" form
        for num in 111..=119 {
            assert_eq!(word_declension(num, YEAR_FORMS), "лет", "n = {num}");
        }
        assert_eq!(word_declension(121, YEAR_FORMS), "год");
    }

    #[test]
    fn sum_time_cases() {
        assert_eq!(sum_time(&["02:01:04", "02:58:56"]), "05:00:00");
        assert_eq!(sum_time::<&str>(&[]), "00:00:00");
        assert_eq!(sum_time(&["03:02"]), "00:03:02");
    }

    #[test]
    fn split_name_full_composite() {
        assert_eq!(split_name("Name / Alt (Desc)"), NameParts {
            name: "Name".to_owned(),
            another_name: "Alt".to_owned(),
            description: "Desc".to_owned(),
        });
    }

    #[test]
    fn split_name_partial_forms() {
        assert_eq!(split_name("Name"), NameParts { name: "Name".to_owned(), ..NameParts::default() });
        assert_eq!(split_name("Name (Desc)"), NameParts {
            name: "Name".to_owned(),
            another_name: String::new(),
            description: "Desc".to_owned(),
        });
    }

    #[test]
    fn combine_title_round_trip() {
        for full in ["Name / Alt (Desc)", "Name (Desc)", "Name / Alt", "Name"] {
            assert_eq!(combine_title(&split_name(full)), full);
        }
    }

    #[test]
    fn human_period_epoch_decomposition() {
        let from = NaiveDate::from_ymd_opt(2014, 10, 1).unwrap();
        assert_eq!(human_period(from, from), "0 дней");
        let one_day = from.succ_opt().unwrap();
        assert_eq!(human_period(from, one_day), "1 день");
        // 365 days read as a timestamp lands on 1971-01-01
        let one_year = from + chrono::Days::new(365);
        assert_eq!(human_period(from, one_year), "1 год");
    }

    #[test]
    fn total_stat_grouping_and_filters() {
        use crate::model::Recommendation;
        let rec = |podcast_id, type_id, dima| Recommendation {
            id: 0,
            podcast_id,
            type_id,
            name: String::new(),
            link: String::new(),
            image: String::new(),
            platforms: String::new(),
            rate: String::new(),
            genre: String::new(),
            release_date: String::new(),
            length: String::new(),
            dima,
            timur: None,
            maksim: None,
            guest: String::new(),
            row_number: None,
        };
        let rows = vec![
            rec(1, Some(10), Some(true)),
            rec(1, Some(10), None),
            rec(2, Some(11), Some(true)),
            rec(2, None, Some(false)),
        ];
        let type_names = HashMap::from([(10, "Игра".to_owned()), (11, "Кино".to_owned())]);
        let all = total_stat(&rows, &type_names, None, None);
        assert_eq!(all.count, 4);
        assert_eq!(all.by_type.get("Игра"), Some(&2));
        assert_eq!(all.by_type.get("Кино"), Some(&1));
        assert_eq!(all.by_type.get("прочее"), Some(&1));
        let one_podcast = total_stat(&rows, &type_names, Some(1), None);
        assert_eq!(one_podcast.count, 2);
        let dima_likes = total_stat(&rows, &type_names, None, Some(Host::Dima));
        assert_eq!(dima_likes.count, 2);
    }
}
