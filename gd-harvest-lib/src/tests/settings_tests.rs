use super::*;

#[test]
fn test_write_atomically_creates_parents_and_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a").join("b").join("doc.xml");

    write_atomically(&path, b"first").unwrap();
    write_atomically(&path, b"second").unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    assert!(!path.with_file_name("doc.xml.tmp").exists());
}

#[test]
fn test_resolve_output_dir_priority() {
    let cli = PathBuf::from("/from/cli");
    let configured = PathBuf::from("/from/config");
    assert_eq!(
        resolve_output_dir(Some(cli.clone()), Some(configured.clone())),
        cli
    );
    assert_eq!(resolve_output_dir(None, Some(configured.clone())), configured);
    assert!(!resolve_output_dir(None, None).as_os_str().is_empty());
}

#[test]
fn test_config_path_is_namespaced() {
    if let Some(path) = config_path() {
        assert!(path.ends_with("gd-harvest/config.toml"));
    }
}
