//! The JSON API the admin web app talks to. Mounted under `/api/v1`; every
//! response body is JSON, errors map to plain status codes with the detail in
//! the server log.

use {
    std::net::Ipv4Addr,
    rocket::{
        Ignite,
        Rocket,
        State,
        http::Status,
        serde::json::Json,
    },
    crate::{
        metadata,
        model::{
            ConfigEntry,
            NewPodcast,
            NewRecommendation,
            Podcast,
            Recommendation,
            Stream,
        },
        prelude::*,
        reconcile::{
            Reconciler,
            SyncReport,
        },
        sheets::GoogleSheets,
        stats,
    },
};

type SheetSync = Arc<Reconciler<GoogleSheets>>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Reconcile(#[from] crate::reconcile::Error),
    #[error(transparent)] Sql(#[from] sqlx::Error),
}

impl<'r> rocket::response::Responder<'r, 'static> for Error {
    fn respond_to(self, request: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        use crate::reconcile::Error as Reconcile;

        let status = match &self {
            Self::Reconcile(Reconcile::PodcastNotFound(_) | Reconcile::RecommendationNotFound(_)) => Status::NotFound,
            Self::Reconcile(Reconcile::Sheets(_)) => Status::BadGateway,
            _ => Status::InternalServerError,
        };
        error!("{} {}: {self}", request.method(), request.uri());
        status.respond_to(request)
    }
}

#[rocket::get("/podcasts")]
async fn podcasts_list(reconciler: &State<SheetSync>) -> Result<Json<Vec<Podcast>>, Error> {
    Ok(Json(Podcast::all(reconciler.pool()).await?))
}

#[rocket::post("/podcasts", data = "<data>")]
async fn podcasts_create(reconciler: &State<SheetSync>, data: Json<NewPodcast>) -> Result<Json<Podcast>, Error> {
    Ok(Json(reconciler.add_podcast(data.into_inner()).await?))
}

#[rocket::put("/podcasts/<id>", data = "<data>")]
async fn podcasts_update(reconciler: &State<SheetSync>, id: i64, data: Json<NewPodcast>) -> Result<Json<Podcast>, Error> {
    Ok(Json(reconciler.update_podcast(id, data.into_inner()).await?))
}

#[rocket::delete("/podcasts/<id>")]
async fn podcasts_delete(reconciler: &State<SheetSync>, id: i64) -> Result<(), Error> {
    Ok(reconciler.delete_podcast(id).await?)
}

/// Which catalog to consult for the fields the editor left empty.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum AutofillKind {
    Film,
    Game,
}

#[derive(Deserialize)]
struct RecommendationForm {
    #[serde(flatten)]
    rec: NewRecommendation,
    #[serde(default)]
    autofill: Option<AutofillKind>,
}

async fn autofill(metadata: &metadata::Clients, kind: AutofillKind, rec: &mut NewRecommendation) {
    // catalogs index by primary title, not the "Name / Alt (Desc)" composite
    let query = stats::split_name(&rec.name).name;
    if query.is_empty() {
        return
    }
    let enrichment = match kind {
        AutofillKind::Film => match &metadata.omdb {
            Some(omdb) => omdb.search(&query).await,
            None => {
                warn!("film autofill requested but no OMDB API key is configured");
                None
            }
        },
        AutofillKind::Game => match &metadata.rawg {
            Some(rawg) => rawg.search(&query).await,
            None => {
                warn!("game autofill requested but no RAWG API key is configured");
                None
            }
        },
    };
    if let Some(enrichment) = enrichment {
        enrichment.apply(rec);
    }
}

#[rocket::get("/recommendations?<podcast_id>")]
async fn recommendations_list(reconciler: &State<SheetSync>, podcast_id: Option<i64>) -> Result<Json<Vec<Recommendation>>, Error> {
    Ok(Json(match podcast_id {
        Some(podcast_id) => Recommendation::for_podcast(reconciler.pool(), podcast_id).await?,
        None => Recommendation::all(reconciler.pool()).await?,
    }))
}

#[rocket::post("/recommendations", data = "<data>")]
async fn recommendations_create(reconciler: &State<SheetSync>, metadata: &State<metadata::Clients>, data: Json<RecommendationForm>) -> Result<Json<Recommendation>, Error> {
    let RecommendationForm { mut rec, autofill: kind } = data.into_inner();
    if let Some(kind) = kind {
        autofill(metadata, kind, &mut rec).await;
    }
    Ok(Json(reconciler.add_recommendation(rec).await?))
}

#[rocket::put("/recommendations/<id>", data = "<data>")]
async fn recommendations_update(reconciler: &State<SheetSync>, id: i64, data: Json<NewRecommendation>) -> Result<Json<Recommendation>, Error> {
    Ok(Json(reconciler.update_recommendation(id, data.into_inner()).await?))
}

#[rocket::delete("/recommendations/<id>")]
async fn recommendations_delete(reconciler: &State<SheetSync>, id: i64) -> Result<(), Error> {
    Ok(reconciler.delete_recommendation(id).await?)
}

#[rocket::get("/streams")]
async fn streams_list(reconciler: &State<SheetSync>) -> Result<Json<Vec<Stream>>, Error> {
    Ok(Json(Stream::all(reconciler.pool()).await?))
}

#[rocket::get("/config")]
async fn config_list(reconciler: &State<SheetSync>) -> Result<Json<Vec<ConfigEntry>>, Error> {
    Ok(Json(ConfigEntry::all(reconciler.pool()).await?))
}

#[rocket::post("/sync")]
async fn sync(reconciler: &State<SheetSync>) -> Result<Json<SyncReport>, Error> {
    Ok(Json(reconciler.full_sync().await?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    shows: BTreeMap<String, stats::PodcastStat>,
    recommendations: stats::TotalStat,
}

#[rocket::get("/stats?<podcast_id>&<host>")]
async fn stats_get(reconciler: &State<SheetSync>, podcast_id: Option<i64>, host: Option<String>) -> Result<Json<StatsResponse>, Error> {
    let host_filter = host.as_deref().and_then(|host| match host {
        "dima" => Some(stats::Host::Dima),
        "timur" => Some(stats::Host::Timur),
        "maksim" => Some(stats::Host::Maksim),
        _ => None,
    });
    let today = Utc::now().date_naive();
    let mut by_show = BTreeMap::<String, Vec<Podcast>>::new();
    for podcast in Podcast::all(reconciler.pool()).await? {
        by_show.entry(podcast.show_type.clone()).or_default().push(podcast);
    }
    let shows = by_show.into_iter()
        .map(|(show, episodes)| (show, stats::podcast_stat(&episodes, today)))
        .collect();
    let recommendations = stats::total_stat(
        &Recommendation::all(reconciler.pool()).await?,
        &ConfigEntry::type_names(reconciler.pool()).await?,
        podcast_id,
        host_filter,
    );
    Ok(Json(StatsResponse { shows, recommendations }))
}

pub(crate) async fn rocket(reconciler: SheetSync, metadata: metadata::Clients, port: u16) -> Result<Rocket<Ignite>, rocket::Error> {
    rocket::custom(rocket::Config {
        port,
        address: Ipv4Addr::UNSPECIFIED.into(),
        ..rocket::Config::default()
    })
        .manage(reconciler)
        .manage(metadata)
        .mount("/api/v1", rocket::routes![
            podcasts_list,
            podcasts_create,
            podcasts_update,
            podcasts_delete,
            recommendations_list,
            recommendations_create,
            recommendations_update,
            recommendations_delete,
            streams_list,
            config_list,
            sync,
            stats_get,
        ])
        .ignite().await
}
