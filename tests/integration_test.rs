use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn todo(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("todo").unwrap();
    cmd.current_dir(dir)
        .env_remove("TODO_DB_PATH")
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_buy_milk_scenario() {
    let temp_dir = TempDir::new().unwrap();

    todo(temp_dir.path())
        .args(["add", "buy milk"])
        .assert()
        .success()
        .stdout("Added todo #1: buy milk\n");

    todo(temp_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout("#1 - buy milk [active]\n");

    todo(temp_dir.path())
        .args(["delete", "milk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 todo(s)"));

    todo(temp_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout("No todos found\n");

    todo(temp_dir.path())
        .args(["list", "--all"])
        .assert()
        .success()
        .stdout("#1 - buy milk [deleted]\n");

    todo(temp_dir.path())
        .args(["restore", "milk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 1 todo(s)"));

    todo(temp_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout("#1 - buy milk [active]\n");

    assert!(temp_dir.path().join("todos.db").exists());
}

#[test]
fn test_search_by_id_and_keyword() {
    let temp_dir = TempDir::new().unwrap();

    for content in ["Pay rent", "rent a car", "walk dog"] {
        todo(temp_dir.path()).args(["add", content]).assert().success();
    }
    todo(temp_dir.path())
        .args(["delete", "car"])
        .assert()
        .success();

    todo(temp_dir.path())
        .args(["search", "RENT"])
        .assert()
        .success()
        .stdout("#1 - Pay rent [active]\n");

    todo(temp_dir.path())
        .args(["search", "2"])
        .assert()
        .success()
        .stdout("#2 - rent a car [deleted]\n");

    todo(temp_dir.path())
        .args(["search", "boat"])
        .assert()
        .success()
        .stdout("No todos found\n");
}

#[test]
fn test_no_match_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();

    todo(temp_dir.path())
        .args(["delete", "anything"])
        .assert()
        .success()
        .stdout("No matching todos for \"anything\"\n");

    todo(temp_dir.path())
        .args(["restore", "anything"])
        .assert()
        .success()
        .stdout("No matching todos for \"anything\"\n");
}

#[test]
fn test_validation_errors_exit_nonzero() {
    let temp_dir = TempDir::new().unwrap();

    todo(temp_dir.path())
        .args(["add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be empty"));

    todo(temp_dir.path())
        .args(["delete", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Keyword must not be empty"));
}

#[test]
fn test_db_flag_selects_database() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("elsewhere.db");

    todo(temp_dir.path())
        .args(["add", "custom path"])
        .arg("--db")
        .arg(&db)
        .assert()
        .success();

    assert!(db.exists());
    assert!(!temp_dir.path().join("todos.db").exists());

    todo(temp_dir.path())
        .env("TODO_DB_PATH", &db)
        .arg("list")
        .assert()
        .success()
        .stdout("#1 - custom path [active]\n");
}

#[test]
fn test_chat_requires_api_key() {
    let temp_dir = TempDir::new().unwrap();

    todo(temp_dir.path())
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}
