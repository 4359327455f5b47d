//! Directory layout of the remote game archive.
//!
//! The archive is a static tree:
//!
//! ```text
//! {home}year_2016/month_06/day_01/                       day listing (HTML)
//! {home}year_2016/month_06/day_01/gid_.../players.xml    roster
//! {home}year_2016/month_06/day_01/gid_.../inning/inning_all.xml
//! ```

use crate::calendar::CalendarDay;
use crate::task::GameTask;

/// Root of the public gameday archive.
pub const DEFAULT_HOME: &str = "http://gd2.mlb.com/components/game/mlb/";

/// The two documents harvested for every game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameDocument {
    Players,
    Innings,
}

impl GameDocument {
    /// Both documents, in the order they are fetched and written.
    pub const ALL: [GameDocument; 2] = [GameDocument::Players, GameDocument::Innings];

    /// Path below the game's base URL.
    pub fn remote_path(self) -> &'static str {
        match self {
            Self::Players => "players.xml",
            Self::Innings => "inning/inning_all.xml",
        }
    }

    /// File name inside the local game directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Players => "players.xml",
            Self::Innings => "inning_all.xml",
        }
    }
}

impl std::fmt::Display for GameDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// URL builder for one archive root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    home: String,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self::new(DEFAULT_HOME)
    }
}

impl ArchiveLayout {
    pub fn new(home: impl Into<String>) -> Self {
        let mut home = home.into();
        if !home.ends_with('/') {
            home.push('/');
        }
        Self { home }
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    /// Listing page for one day: `{home}year_YYYY/month_MM/day_DD/`.
    pub fn day_listing_url(&self, day: &CalendarDay) -> String {
        format!(
            "{}year_{:04}/month_{:02}/day_{:02}/",
            self.home,
            day.year(),
            day.month(),
            day.day()
        )
    }

    /// Resolve an anchor target found on a day listing into a game task.
    ///
    /// Only the last path segment of `href` is kept, so relative
    /// (`gid_x/`), root-relative and absolute links all land under the
    /// listing that referenced them.
    pub fn resolve_game(&self, listing_url: &str, href: &str) -> Option<GameTask> {
        let segment = href
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())?;
        let base = if listing_url.ends_with('/') {
            format!("{listing_url}{segment}/")
        } else {
            format!("{listing_url}/{segment}/")
        };
        GameTask::new(base).ok()
    }
}

#[cfg(test)]
#[path = "tests/layout_tests.rs"]
mod tests;
