use std::fs;
use std::path::Path;

use assert_cmd::Command;

fn bookshelf(config_dir: &Path, database: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bookshelf").unwrap();
    cmd.env("BOOKSHELF_CONFIG_DIR", config_dir)
        .env("BOOKSHELF_ENV", "local")
        .env("DATABASE_URL", format!("sqlite://{}", database.display()))
        .env("RUST_LOG", "warn");
    cmd
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn help_lists_subcommands() {
    let output = Command::cargo_bin("bookshelf")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["serve", "authors", "import", "check-config"] {
        assert!(text.contains(command), "missing {command} in help");
    }
}

#[test]
fn check_config_reports_overrides() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("base.toml"),
        "[server]\nport = 9191\n",
    )
    .unwrap();
    let database = dir.path().join("books.db");

    let output = bookshelf(dir.path(), &database)
        .arg("check-config")
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["server"]["port"], 9191);
    assert_eq!(summary["environment"], "local");
    assert!(summary["database"]["url"]
        .as_str()
        .unwrap()
        .ends_with("books.db"));
}

#[test]
fn import_then_report_authors() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("books.db");
    let file = dir.path().join("books.json");
    fs::write(
        &file,
        r#"[
            {"title": "Hobbit", "author": "Tolkien"},
            {"title": "Silmarillion", "author": "Tolkien", "description": "Legends"},
            {"title": "Dune", "author": "Herbert"}
        ]"#,
    )
    .unwrap();

    let output = bookshelf(dir.path(), &database)
        .arg("import")
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("\"imported\":3"));

    let output = bookshelf(dir.path(), &database)
        .args(["authors", "--min-books", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let counts: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        counts,
        serde_json::json!([{ "author": "Tolkien", "book_count": 2 }])
    );
}

#[test]
fn import_with_duplicate_title_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("books.db");
    let file = dir.path().join("books.json");
    fs::write(
        &file,
        r#"[{"title": "Same", "author": "A"}, {"title": "Same", "author": "B"}]"#,
    )
    .unwrap();

    let output = bookshelf(dir.path(), &database)
        .arg("import")
        .arg(&file)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already exists"));
    assert!(stderr.contains("already_exists"), "{stderr}");

    let output = bookshelf(dir.path(), &database)
        .arg("authors")
        .output()
        .unwrap();
    assert!(output.status.success());
    let counts: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(counts, serde_json::json!([]));
}
