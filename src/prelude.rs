pub(crate) use {
    std::{
        collections::{
            BTreeMap,
            HashMap,
        },
        sync::Arc,
        time::Duration,
    },
    chrono::prelude::*,
    log::{
        error,
        info,
        warn,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    sqlx::PgPool,
    url::Url,
    crate::config::Config,
};
