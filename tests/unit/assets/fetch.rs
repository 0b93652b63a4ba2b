use super::*;

fn fetcher(root: &Path, proxy: Option<&str>) -> DefaultFetcher {
    DefaultFetcher::new(root, proxy, Duration::from_secs(5)).unwrap()
}

#[test]
fn normalize_rel_path_rejects_escape_and_absolute() {
    assert_eq!(normalize_rel_path("a/./b//c.png").unwrap(), "a/b/c.png");
    assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("/etc/passwd").is_err());
    assert!(normalize_rel_path("../x.png").is_err());
    assert!(normalize_rel_path("./").is_err());
}

#[test]
fn remote_urls_go_through_proxy() {
    let f = fetcher(Path::new("/tmp"), Some("http://localhost:3000/api/proxy"));
    let loc = f.locate("https://i.imgflip.com/a b.jpg?x=1&y=2").unwrap();
    let AssetLocation::Remote(target) = loc else {
        panic!("expected remote, got {loc:?}");
    };
    let parsed = url::Url::parse(&target).unwrap();
    assert_eq!(parsed.path(), "/api/proxy");
    let pairs: Vec<_> = parsed.query_pairs().collect();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].0, "url");
    assert_eq!(pairs[0].1, "https://i.imgflip.com/a b.jpg?x=1&y=2");
}

#[test]
fn remote_urls_without_proxy_are_untouched() {
    let f = fetcher(Path::new("/tmp"), None);
    assert_eq!(
        f.locate("https://example.com/cat.gif").unwrap(),
        AssetLocation::Remote("https://example.com/cat.gif".to_owned())
    );
}

#[test]
fn invalid_proxy_is_a_validation_error() {
    let err = DefaultFetcher::new("/tmp", Some("not a url"), Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, ReelsmithError::Validation(_)));
}

#[test]
fn site_root_paths_resolve_under_assets_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("memes")).unwrap();
    std::fs::write(dir.path().join("memes/cat.png"), b"png-bytes").unwrap();
    let f = fetcher(dir.path(), None);
    assert_eq!(f.fetch("/memes/cat.png").unwrap(), b"png-bytes");
    assert_eq!(f.fetch("memes/cat.png").unwrap(), b"png-bytes");
    assert!(matches!(
        f.fetch("memes/missing.png"),
        Err(ReelsmithError::Asset(_))
    ));
    assert!(f.fetch("/../secret").is_err());
}

#[test]
fn data_urls_decode_inline() {
    let f = fetcher(Path::new("/tmp"), None);
    let payload = general_purpose::STANDARD.encode(b"hello");
    assert_eq!(
        f.fetch(&format!("data:image/png;base64,{payload}")).unwrap(),
        b"hello"
    );
    assert!(f.fetch("data:text/plain,hello").is_err());
}
