//! Day discovery: turn a day's listing page into game tasks.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use gd_harvest_core::{ArchiveLayout, CalendarDay, GameTask};
use regex::Regex;
use scraper::{Html, Selector};

use crate::circuit::CircuitControl;
use crate::client::{SessionPool, Transport};
use crate::config::RetryPolicy;
use crate::error::FetchError;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("static selector"));

/// Anchor text of a game directory entry, e.g. `gid_2016_06_01_nyamlb_bosmlb_1/`.
static GAME_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"gid\w*/").expect("static pattern"));

/// Game tasks linked from a listing page, in URL order without duplicates.
///
/// Anchors whose text does not look like a game directory are ignored, so a
/// page with no games (or not a listing at all) yields nothing.
pub fn parse_listing(layout: &ArchiveLayout, listing_url: &str, html: &str) -> Vec<GameTask> {
    let document = Html::parse_document(html);
    let mut games = BTreeSet::new();

    for anchor in document.select(&ANCHOR) {
        let text: String = anchor.text().collect();
        if !GAME_LINK.is_match(&text) {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        match layout.resolve_game(listing_url, href) {
            Some(task) => {
                games.insert(task);
            }
            None => log::debug!("Skipping unusable game link '{}' on {}", href, listing_url),
        }
    }

    games.into_iter().collect()
}

/// Fetch one day's listing through session `session` and extract its games.
pub async fn discover_day<T: Transport, C: CircuitControl>(
    pool: &SessionPool<T, C>,
    layout: &ArchiveLayout,
    day: CalendarDay,
    session: usize,
    policy: &RetryPolicy,
) -> Result<Vec<GameTask>, FetchError> {
    let url = layout.day_listing_url(&day);
    let body = pool.fetch_with_retry(session, &url, policy).await?;
    let html = String::from_utf8_lossy(&body);

    // Html is !Send; keep it out of any await
    let games = parse_listing(layout, &url, &html);
    log::debug!("{}: {} games listed", day, games.len());
    Ok(games)
}

#[cfg(test)]
#[path = "tests/discovery_tests.rs"]
mod tests;
