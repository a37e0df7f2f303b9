//! The Telegram side of the admin surface: commands for stats and manual sync,
//! inline queries for looking up past recommendations mid-conversation, and the
//! chat menu button that opens the web app.

use {
    std::collections::HashSet,
    itertools::Itertools as _,
    teloxide::{
        dispatching::UpdateFilterExt as _,
        prelude::*,
        types::{
            InlineQueryResult,
            InlineQueryResultArticle,
            InputMessageContent,
            InputMessageContentText,
            MenuButton,
            WebAppInfo,
        },
        utils::command::BotCommands,
    },
    crate::{
        model::{
            self,
            ConfigEntry,
            Podcast,
            Recommendation,
            Role,
        },
        prelude::*,
        reconcile::Reconciler,
        sheets::GoogleSheets,
        stats::{
            self,
            EPISODE_FORMS,
            RECOMMENDATION_FORMS,
            word_declension,
        },
    },
};

const INLINE_RESULT_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Request(#[from] teloxide::RequestError),
}

#[derive(Clone)]
pub(crate) struct BotState {
    pub(crate) reconciler: Arc<Reconciler<GoogleSheets>>,
    pub(crate) default_admin: i64,
    pub(crate) web_app_url: Option<Url>,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "показать этот список")]
    Help,
    #[command(description = "статистика по выпускам")]
    Stats,
    #[command(description = "итоги по рекомендациям")]
    Total,
    #[command(description = "синхронизировать таблицу с базой (только для админов)")]
    Sync,
}

pub(crate) async fn run(bot_token: String, state: BotState, shutdown: rocket::Shutdown) -> Result<(), Error> {
    let bot = Bot::new(bot_token);
    bot.set_my_commands(Command::bot_commands()).await?;
    let handler = dptree::entry()
        .branch(Update::filter_message().filter_command::<Command>().endpoint(handle_command))
        .branch(Update::filter_inline_query().endpoint(handle_inline_query));
    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .build();
    let shutdown_token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.await;
        if let Ok(stopped) = shutdown_token.shutdown() {
            stopped.await;
        }
    });
    dispatcher.dispatch().await;
    Ok(())
}

/// Endpoint wrapper: domain errors are reported into the chat instead of
/// killing the dispatcher.
async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: BotState) -> Result<(), teloxide::RequestError> {
    if let Err(e) = command_reply(&bot, &msg, cmd, &state).await {
        error!("bot command in chat {}: {e:?}", msg.chat.id);
        bot.send_message(msg.chat.id, format!("Ошибка: {e}")).await?;
    }
    Ok(())
}

async fn command_reply(bot: &Bot, msg: &Message, cmd: Command, state: &BotState) -> anyhow::Result<()> {
    let pool = state.reconciler.pool();
    let Some(user) = &msg.from else { return Ok(()) };
    let user_id = user.id.0 as i64;
    match cmd {
        Command::Start => {
            model::ensure_account(pool, user_id).await?;
            if let Some(url) = &state.web_app_url {
                bot.set_chat_menu_button()
                    .chat_id(msg.chat.id)
                    .menu_button(MenuButton::WebApp {
                        text: "Админка".to_owned(),
                        web_app: WebAppInfo { url: url.clone() },
                    })
                    .await?;
            }
            bot.send_message(msg.chat.id, format!("Привет! Я слежу за таблицей выпусков и рекомендаций.\n\n{}", Command::descriptions())).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
        }
        Command::Stats => {
            let today = Utc::now().date_naive();
            let mut by_show = BTreeMap::<String, Vec<Podcast>>::new();
            for podcast in Podcast::all(pool).await? {
                by_show.entry(podcast.show_type.clone()).or_default().push(podcast);
            }
            let shows = by_show.into_iter()
                .map(|(show, episodes)| (show, stats::podcast_stat(&episodes, today)))
                .collect_vec();
            bot.send_message(msg.chat.id, stats_message(&shows)).await?;
        }
        Command::Total => {
            let total = stats::total_stat(
                &Recommendation::all(pool).await?,
                &ConfigEntry::type_names(pool).await?,
                None,
                None,
            );
            bot.send_message(msg.chat.id, total_message(&total)).await?;
        }
        Command::Sync => {
            if model::role_of(pool, user_id, state.default_admin).await? != Role::Admin {
                bot.send_message(msg.chat.id, "Эта команда доступна только администраторам.").await?;
                return Ok(())
            }
            bot.send_message(msg.chat.id, "Синхронизирую…").await?;
            let report = state.reconciler.full_sync().await?;
            bot.send_message(msg.chat.id, format!(
                "Готово. Выпуски: {}/{}, рекомендации: {}/{}, стримы: {}/{}, конфиг: {}/{}.",
                report.podcasts.synced, report.podcasts.total,
                report.recommendations.synced, report.recommendations.total,
                report.streams.synced, report.streams.total,
                report.config.synced, report.config.total,
            )).await?;
        }
    }
    Ok(())
}

async fn handle_inline_query(bot: Bot, query: InlineQuery, state: BotState) -> Result<(), teloxide::RequestError> {
    let results = match inline_results(&query, &state).await {
        Ok(results) => results,
        Err(e) => {
            error!("inline query {:?}: {e:?}", query.query);
            Vec::default()
        }
    };
    bot.answer_inline_query(query.id, results).await?;
    Ok(())
}

async fn inline_results(query: &InlineQuery, state: &BotState) -> anyhow::Result<Vec<InlineQueryResult>> {
    let text = query.query.trim();
    if text.is_empty() {
        return Ok(Vec::default())
    }
    // fetch more than the cap since deduplication shrinks the list
    let matches = Recommendation::search(state.reconciler.pool(), text, (2 * INLINE_RESULT_LIMIT) as i64).await?;
    Ok(dedup_for_inline(matches).into_iter()
        .map(|rec| {
            let mut article = InlineQueryResultArticle::new(
                rec.id.to_string(),
                if rec.name.is_empty() { rec.link.clone() } else { rec.name.clone() },
                InputMessageContent::Text(InputMessageContentText::new(inline_message(&rec))),
            ).description(vote_summary(&rec));
            if let Ok(thumbnail) = rec.image.parse::<Url>() {
                article = article.thumbnail_url(thumbnail);
            }
            InlineQueryResult::Article(article)
        })
        .collect())
}

/// Repeat recommendations of the same thing across episodes collapse into one
/// inline result, keyed by name (link for nameless rows).
fn dedup_for_inline(matches: Vec<Recommendation>) -> Vec<Recommendation> {
    let mut seen = HashSet::new();
    matches.into_iter()
        .filter(|rec| {
            let key = if rec.name.is_empty() { rec.link.clone() } else { rec.name.to_lowercase() };
            seen.insert(key)
        })
        .take(INLINE_RESULT_LIMIT)
        .collect()
}

fn vote_summary(rec: &Recommendation) -> String {
    [("Дима", rec.dima), ("Тимур", rec.timur), ("Максим", rec.maksim)].into_iter()
        .filter_map(|(host, vote)| vote.map(|vote| format!("{host} {}", if vote { "👍" } else { "❌" })))
        .join(", ")
}

fn inline_message(rec: &Recommendation) -> String {
    let mut lines = vec![rec.name.clone()];
    for detail in [&rec.genre, &rec.platforms, &rec.rate] {
        if !detail.is_empty() {
            lines.push(detail.clone());
        }
    }
    let votes = vote_summary(rec);
    if !votes.is_empty() {
        lines.push(votes);
    }
    if !rec.link.is_empty() {
        lines.push(rec.link.clone());
    }
    lines.retain(|line| !line.is_empty());
    lines.join("\n")
}

fn stats_message(shows: &[(String, stats::PodcastStat)]) -> String {
    if shows.is_empty() {
        return "Пока нет ни одного выпуска.".to_owned()
    }
    shows.iter()
        .map(|(show, stat)| {
            let mut line = format!("«{show}»: {} {}", stat.count, word_declension(stat.count as u64, EPISODE_FORMS));
            if !stat.on_air.is_empty() {
                line.push_str(&format!(", в эфире {}", stat.on_air));
            }
            line.push_str(&format!(", суммарная длительность {}", stat.total_length));
            if let Some(last_release) = &stat.last_release {
                line.push_str(&format!(", последний выпуск {last_release} назад"));
            }
            line
        })
        .join("\n")
}

fn total_message(total: &stats::TotalStat) -> String {
    let mut text = format!("Всего {} {}", total.count, word_declension(total.count as u64, RECOMMENDATION_FORMS));
    if total.by_type.is_empty() {
        return text
    }
    text.push(':');
    for (type_name, count) in &total.by_type {
        text.push_str(&format!("\n{type_name}: {count}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, name: &str, link: &str) -> Recommendation {
        Recommendation {
            id,
            podcast_id: 1,
            type_id: None,
            name: name.to_owned(),
            link: link.to_owned(),
            image: String::new(),
            platforms: String::new(),
            rate: String::new(),
            genre: String::new(),
            release_date: String::new(),
            length: String::new(),
            dima: None,
            timur: None,
            maksim: None,
            guest: String::new(),
            row_number: None,
        }
    }

    #[test]
    fn inline_dedup_keys_on_name_then_link() {
        let matches = vec![
            rec(1, "Outer Wilds", ""),
            rec(2, "outer wilds", "https://example.com/1"),
            rec(3, "", "https://example.com/2"),
            rec(4, "", "https://example.com/2"),
        ];
        let deduped = dedup_for_inline(matches);
        assert_eq!(deduped.iter().map(|rec| rec.id).collect::<Vec<_>>(), [1, 3]);
    }

    #[test]
    fn inline_dedup_caps_results() {
        let matches = (0..200).map(|n| rec(n, &format!("game {n}"), "")).collect();
        assert_eq!(dedup_for_inline(matches).len(), INLINE_RESULT_LIMIT);
    }

    #[test]
    fn vote_summary_skips_missing_votes() {
        let mut entry = rec(1, "Outer Wilds", "");
        entry.dima = Some(true);
        entry.maksim = Some(false);
        assert_eq!(vote_summary(&entry), "Дима 👍, Максим ❌");
        assert_eq!(vote_summary(&rec(2, "x", "")), "");
    }

    #[test]
    fn total_message_lists_types() {
        let total = stats::TotalStat {
            count: 3,
            by_type: BTreeMap::from([("Игра".to_owned(), 2), ("Кино".to_owned(), 1)]),
        };
        assert_eq!(total_message(&total), "Всего 3 рекомендации:\nИгра: 2\nКино: 1");
    }

    #[test]
    fn stats_message_mentions_every_show() {
        let shows = vec![
            ("Zavtracast".to_owned(), stats::PodcastStat {
                on_air: "1 год".to_owned(),
                count: 21,
                total_length: "100:00:00".to_owned(),
                last_release: Some("3 дня".to_owned()),
            }),
        ];
        let message = stats_message(&shows);
        assert!(message.contains("«Zavtracast»: 21 выпуск"));
        assert!(message.contains("в эфире 1 год"));
        assert!(message.contains("3 дня назад"));
        assert_eq!(stats_message(&[]), "Пока нет ни одного выпуска.");
    }
}
