//! Data model shared by every gd-harvest crate: calendar days and months,
//! game tasks, the queue element type, and the archive URL layout.

pub mod calendar;
pub mod error;
pub mod layout;
pub mod task;

pub use calendar::{CalendarDay, FIRST_ARCHIVE_YEAR, MonthSpec, months_of_year, year_range};
pub use error::CoreError;
pub use layout::{ArchiveLayout, DEFAULT_HOME, GameDocument};
pub use task::{GameTask, QueueItem};
