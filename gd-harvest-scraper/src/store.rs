//! Local game tree: dedup checks, XML normalization, and crash-safe writes.
//!
//! A game counts as persisted only when its directory holds both documents.
//! Both are written through temp files, `players.xml` first, so an
//! interrupted write leaves the game looking new on the next run.

use std::path::{Path, PathBuf};

use gd_harvest_core::{GameDocument, GameTask};
use gd_harvest_lib::settings::write_atomically;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::StoreError;

/// Persisted games under one output root.
#[derive(Debug, Clone)]
pub struct GameStore {
    root: PathBuf,
}

impl GameStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `{root}/year_YYYY/month_MM/day_DD/gid_...`
    pub fn game_dir(&self, task: &GameTask) -> PathBuf {
        self.root.join(task.relative_dir())
    }

    /// True unless the game's directory already holds both documents.
    pub fn is_new(&self, task: &GameTask) -> bool {
        let dir = self.game_dir(task);
        !GameDocument::ALL
            .iter()
            .all(|doc| dir.join(doc.file_name()).is_file())
    }

    /// Write both (already normalized) documents and return the game directory.
    pub fn persist(
        &self,
        task: &GameTask,
        players: &str,
        innings: &str,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.game_dir(task);
        create_game_dir(&dir)?;

        write_atomically(
            &dir.join(GameDocument::Players.file_name()),
            players.as_bytes(),
        )?;
        write_atomically(
            &dir.join(GameDocument::Innings.file_name()),
            innings.as_bytes(),
        )?;

        log::debug!("Persisted {} to {}", task.game_id(), dir.display());
        Ok(dir)
    }
}

#[cfg(unix)]
fn create_game_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o777)
        .create(dir)
}

#[cfg(not(unix))]
fn create_game_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Re-indent an XML document with one space per nesting level.
///
/// Fails on malformed markup, on a body that ends with elements still open,
/// and on anything other than exactly one root element (an HTML error page
/// served with status 200 still parses as text otherwise).
pub fn normalize_xml(raw: &[u8], document: GameDocument) -> Result<String, StoreError> {
    let malformed = |message: String| StoreError::MalformedXml {
        document: document.file_name(),
        message,
    };

    let mut reader = Reader::from_reader(raw);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            malformed(format!("{} at byte {}", e, reader.buffer_position()))
        })?;
        match &event {
            Event::Eof => break,
            Event::Start(_) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::Empty(_) if depth == 0 => roots += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        if roots > 1 {
            return Err(malformed("more than one root element".to_string()));
        }
        writer
            .write_event(event)
            .map_err(|e| malformed(e.to_string()))?;
    }

    if roots == 0 {
        return Err(malformed("no elements".to_string()));
    }
    if depth != 0 {
        return Err(malformed(format!(
            "truncated with {} unclosed elements at byte {}",
            depth,
            reader.buffer_position()
        )));
    }

    let mut out =
        String::from_utf8(writer.into_inner()).map_err(|e| malformed(e.to_string()))?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
