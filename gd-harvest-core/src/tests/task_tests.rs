use std::path::PathBuf;

use super::*;

const GAME: &str =
    "http://gd2.mlb.com/components/game/mlb/year_2016/month_06/day_01/gid_2016_06_01_nyamlb_bosmlb_1/";

#[test]
fn test_relative_dir_from_base_url() {
    let task = GameTask::new(GAME).unwrap();
    assert_eq!(
        task.relative_dir_str(),
        "year_2016/month_06/day_01/gid_2016_06_01_nyamlb_bosmlb_1"
    );
    let expected: PathBuf = ["year_2016", "month_06", "day_01", "gid_2016_06_01_nyamlb_bosmlb_1"]
        .iter()
        .collect();
    assert_eq!(task.relative_dir(), expected);
    assert_eq!(task.game_id(), "gid_2016_06_01_nyamlb_bosmlb_1");
}

#[test]
fn test_trailing_slash_added() {
    let task = GameTask::new(GAME.trim_end_matches('/')).unwrap();
    assert_eq!(task.base_url(), GAME);
}

#[test]
fn test_document_urls() {
    let task = GameTask::new(GAME).unwrap();
    assert_eq!(task.document_url(GameDocument::Players), format!("{GAME}players.xml"));
    assert_eq!(
        task.document_url(GameDocument::Innings),
        format!("{GAME}inning/inning_all.xml")
    );
}

#[test]
fn test_rejects_short_or_relative_urls() {
    assert!(GameTask::new("gid_2016_06_01_nyamlb_bosmlb_1/").is_err());
    assert!(GameTask::new("http://host/a/b/c/").is_err());
    assert!(GameTask::new("http://host/a/../b/c/").is_err());
}

#[test]
fn test_queue_item_sentinel() {
    let task = GameTask::new(GAME).unwrap();
    assert_eq!(QueueItem::from(task.clone()), QueueItem::Task(task));
    assert_ne!(QueueItem::Done, QueueItem::from(GameTask::new(GAME).unwrap()));
}
