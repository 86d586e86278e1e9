use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn curio(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("curio").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path());
    cmd
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    curio(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_sources_lists_default_registry() {
    let dir = TempDir::new().unwrap();
    curio(&dir)
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("TVmaze: video"))
        .stdout(predicate::str::contains("IGDB: game"))
        .stdout(predicate::str::contains("MusicBrainz: music"))
        .stdout(predicate::str::contains("BoardGameGeek: boardgame"));
}

#[test]
fn test_sources_skips_unconfigured_catalog() {
    let dir = TempDir::new().unwrap();
    curio(&dir)
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("Library Catalog").not())
        .stdout(predicate::str::contains("MobyGames").not());
}

#[test]
fn test_config_path() {
    let dir = TempDir::new().unwrap();
    curio(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("curio"))
        .stdout(predicate::str::contains("fetch.toml"));
}

#[test]
fn test_config_init_then_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    curio(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch.toml"));

    curio(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_show_resolves_defaults() {
    let dir = TempDir::new().unwrap();
    curio(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_results = 20"))
        .stdout(predicate::str::contains("[opac]"));
}

#[test]
fn test_search_with_no_capable_source_fails() {
    let dir = TempDir::new().unwrap();
    // no registered game source searches by ISBN
    curio(&dir)
        .args(["search", "game", "mega man", "--key", "isbn"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no registered source"));
}

#[test]
fn test_search_rejects_unknown_source() {
    let dir = TempDir::new().unwrap();
    curio(&dir)
        .args(["search", "video", "firefly", "--source", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown source"));
}

#[test]
fn test_search_rejects_incapable_source() {
    let dir = TempDir::new().unwrap();
    curio(&dir)
        .args(["search", "music", "firefly", "--source", "TVmaze"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot search"));
}
