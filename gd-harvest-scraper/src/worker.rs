use std::path::PathBuf;

use gd_harvest_core::{GameDocument, GameTask};

use crate::circuit::CircuitControl;
use crate::client::{SessionPool, Transport};
use crate::config::RetryPolicy;
use crate::error::HarvestError;
use crate::store::{GameStore, normalize_xml};

/// Fetch, normalize and persist one game through session `session`.
///
/// Nothing is written until both documents have been fetched and parsed, so
/// a failure anywhere leaves the game to be picked up again next run.
pub async fn fetch_game<T: Transport, C: CircuitControl>(
    pool: &SessionPool<T, C>,
    store: &GameStore,
    session: usize,
    task: &GameTask,
    policy: &RetryPolicy,
) -> Result<PathBuf, HarvestError> {
    let players = fetch_document(pool, session, task, GameDocument::Players, policy).await?;
    let innings = fetch_document(pool, session, task, GameDocument::Innings, policy).await?;
    Ok(store.persist(task, &players, &innings)?)
}

async fn fetch_document<T: Transport, C: CircuitControl>(
    pool: &SessionPool<T, C>,
    session: usize,
    task: &GameTask,
    doc: GameDocument,
    policy: &RetryPolicy,
) -> Result<String, HarvestError> {
    let raw = pool
        .fetch_with_retry(session, &task.document_url(doc), policy)
        .await?;
    Ok(normalize_xml(&raw, doc)?)
}
