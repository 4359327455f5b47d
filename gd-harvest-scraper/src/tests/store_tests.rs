use super::*;

const GAME_URL: &str =
    "http://gd2.mlb.com/components/game/mlb/year_2016/month_06/day_01/gid_2016_06_01_nyamlb_bosmlb_1/";

fn task() -> GameTask {
    GameTask::new(GAME_URL).unwrap()
}

#[test]
fn test_game_dir_layout() {
    let store = GameStore::new("/data/gd2");
    assert_eq!(
        store.game_dir(&task()),
        Path::new("/data/gd2/year_2016/month_06/day_01/gid_2016_06_01_nyamlb_bosmlb_1")
    );
}

#[test]
fn test_persist_then_not_new() {
    let tmp = tempfile::tempdir().unwrap();
    let store = GameStore::new(tmp.path());
    assert!(store.is_new(&task()));

    let dir = store.persist(&task(), "<game/>\n", "<innings/>\n").unwrap();
    assert_eq!(std::fs::read_to_string(dir.join("players.xml")).unwrap(), "<game/>\n");
    assert_eq!(
        std::fs::read_to_string(dir.join("inning_all.xml")).unwrap(),
        "<innings/>\n"
    );
    assert!(!store.is_new(&task()));
    // No temp files left behind
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 2);
}

#[test]
fn test_half_written_game_is_still_new() {
    let tmp = tempfile::tempdir().unwrap();
    let store = GameStore::new(tmp.path());
    let dir = store.game_dir(&task());
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("players.xml"), "<game/>").unwrap();
    assert!(store.is_new(&task()));

    // An empty directory from an interrupted run is also not a persisted game
    std::fs::remove_file(dir.join("players.xml")).unwrap();
    assert!(store.is_new(&task()));
}

#[cfg(unix)]
#[test]
fn test_game_dir_mode() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let store = GameStore::new(tmp.path());
    let dir = store.persist(&task(), "<a/>", "<b/>").unwrap();
    let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
    // umask may strip bits, but the owner always gets rwx
    assert_eq!(mode & 0o700, 0o700);
}

#[test]
fn test_normalize_indents_one_space() {
    let raw = br#"<?xml version="1.0" encoding="UTF-8"?><game venue="Fenway Park"><team id="bos"><player id="1" last="Ortiz"/></team></game>"#;
    let out = normalize_xml(raw, GameDocument::Players).unwrap();
    let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<game venue="Fenway Park">
 <team id="bos">
  <player id="1" last="Ortiz"/>
 </team>
</game>
"#;
    assert_eq!(out, expected);
}

#[test]
fn test_normalize_is_stable() {
    let raw = b"<inning num=\"1\">\n      <top>\n<atbat/></top></inning>";
    let once = normalize_xml(raw, GameDocument::Innings).unwrap();
    let twice = normalize_xml(once.as_bytes(), GameDocument::Innings).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_normalize_rejects_mismatched_tags() {
    let err = normalize_xml(b"<game><team></game>", GameDocument::Players).unwrap_err();
    match err {
        StoreError::MalformedXml { document, .. } => assert_eq!(document, "players.xml"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_normalize_rejects_non_xml() {
    assert!(normalize_xml(b"", GameDocument::Innings).is_err());
    assert!(normalize_xml(b"Service Unavailable", GameDocument::Innings).is_err());
}

#[test]
fn test_normalize_rejects_truncated() {
    let cut_players = b"<game id=\"g\"><team id=\"bos\"><player id=\"1\"/>";
    let err = normalize_xml(cut_players, GameDocument::Players).unwrap_err();
    assert!(matches!(err, StoreError::MalformedXml { document: "players.xml", .. }));

    let cut_innings = b"<?xml version=\"1.0\"?><game><inning num=\"1\"><top>";
    assert!(normalize_xml(cut_innings, GameDocument::Innings).is_err());
}

#[test]
fn test_normalize_rejects_several_roots() {
    let raw = b"<game id=\"g\"/><game id=\"h\"/>";
    assert!(normalize_xml(raw, GameDocument::Players).is_err());
}
