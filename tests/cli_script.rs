mod common;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

#[test]
fn script_mode_creates_an_entry_from_shorthand() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("config.json");
    let ledger_path = temp.path().join("ledger.bean");
    std::fs::write(&config_path, common::FIXTURE_DOCUMENT).unwrap();

    let mut cmd = Command::cargo_bin("beanbot_core_cli").unwrap();
    cmd.env("BEANBOT_CORE_CLI_SCRIPT", "1")
        .env("BEANBOT_CORE_CONFIG", &config_path)
        .env("BEANBOT_CORE_LEDGER", &ledger_path)
        .write_stdin("vultr\nexit\n")
        .assert()
        .success()
        .stdout(contains("Created entry"));

    let ledger = std::fs::read_to_string(&ledger_path).unwrap();
    assert!(ledger.contains("Expenses:Tech:Cloud"));
    assert!(ledger.contains("beanbot_uuid"));
}

#[test]
fn script_mode_suggests_a_close_alias_for_typos() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("config.json");
    let ledger_path = temp.path().join("ledger.bean");
    std::fs::write(&config_path, common::FIXTURE_DOCUMENT).unwrap();

    let mut cmd = Command::cargo_bin("beanbot_core_cli").unwrap();
    cmd.env("BEANBOT_CORE_CLI_SCRIPT", "1")
        .env("BEANBOT_CORE_CONFIG", &config_path)
        .env("BEANBOT_CORE_LEDGER", &ledger_path)
        .write_stdin("vultrr\nexit\n")
        .assert()
        .success()
        .stdout(contains("Did you mean `vultr`?"));

    assert!(!ledger_path.exists());
}

#[test]
fn script_mode_reports_usage() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("config.json");
    std::fs::write(&config_path, common::FIXTURE_DOCUMENT).unwrap();

    let mut cmd = Command::cargo_bin("beanbot_core_cli").unwrap();
    cmd.env("BEANBOT_CORE_CLI_SCRIPT", "1")
        .env("BEANBOT_CORE_CONFIG", &config_path)
        .env("BEANBOT_CORE_LEDGER", temp.path().join("ledger.bean"))
        .write_stdin("help\nexit\n")
        .assert()
        .success()
        .stdout(contains("trip <cost> [note]"));
}
