use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::layout::GameDocument;

/// Number of trailing URL path segments that name a game's directory:
/// `year_YYYY/month_MM/day_DD/gid_...`.
const GAME_PATH_SEGMENTS: usize = 4;

/// One game's document directory on the archive, identified by its base URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameTask {
    base_url: String,
    relative_dir: String,
}

impl GameTask {
    /// Wrap a game base URL. A missing trailing `/` is added.
    ///
    /// The URL needs at least four path segments after the host so the
    /// persistence directory can be derived from it; `.` and `..` segments
    /// are rejected so a hostile listing cannot escape the output root.
    pub fn new(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let path = base_url
            .split_once("://")
            .map(|(_, rest)| rest.split_once('/').map(|(_, path)| path).unwrap_or(""))
            .ok_or_else(|| CoreError::invalid_game_url(&base_url))?;

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < GAME_PATH_SEGMENTS {
            return Err(CoreError::invalid_game_url(&base_url));
        }
        let tail = &segments[segments.len() - GAME_PATH_SEGMENTS..];
        if tail.iter().any(|s| *s == "." || *s == ".." || s.contains('\\')) {
            return Err(CoreError::invalid_game_url(&base_url));
        }
        let relative_dir = tail.join("/");

        Ok(Self {
            base_url,
            relative_dir,
        })
    }

    /// The base URL, always ending in `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The game id segment, e.g. `gid_2016_06_01_nyamlb_bosmlb_1`.
    pub fn game_id(&self) -> &str {
        self.relative_dir
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_dir)
    }

    /// Persistence directory relative to the output root,
    /// e.g. `year_2016/month_06/day_01/gid_2016_06_01_nyamlb_bosmlb_1`.
    pub fn relative_dir(&self) -> PathBuf {
        self.relative_dir.split('/').collect()
    }

    /// The same directory as a `/`-separated string, independent of platform.
    pub fn relative_dir_str(&self) -> &str {
        &self.relative_dir
    }

    /// Full URL of one of the game's documents.
    pub fn document_url(&self, doc: GameDocument) -> String {
        format!("{}{}", self.base_url, doc.remote_path())
    }
}

impl std::fmt::Display for GameTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.base_url)
    }
}

impl TryFrom<String> for GameTask {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GameTask> for String {
    fn from(task: GameTask) -> Self {
        task.base_url
    }
}

/// An element of the discovery → fetch task queue.
///
/// `Done` is the sentinel: exactly one is pushed per worker, and a worker that
/// pops it stops without taking further items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Task(GameTask),
    Done,
}

impl From<GameTask> for QueueItem {
    fn from(task: GameTask) -> Self {
        Self::Task(task)
    }
}

#[cfg(test)]
#[path = "tests/task_tests.rs"]
mod tests;
