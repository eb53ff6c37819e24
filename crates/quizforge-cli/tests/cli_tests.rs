//! CLI integration tests using assert_cmd.
//!
//! No API keys are set, so generation always goes through the offline
//! fallback and the tests never touch the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const KEY_VARS: [&str; 8] = [
    "GEMINI_API_KEY",
    "GEMINI_MODEL",
    "OPENAI_API_KEY",
    "OPENAI_MODEL",
    "CLAUDE_API_KEY",
    "ANTHROPIC_API_KEY",
    "CLAUDE_MODEL",
    "QUIZFORGE_PROVIDER",
];

fn quizforge(home: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("quizforge").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("QUIZFORGE_DATA_DIR", home.path().join("data"))
        .env("RUST_LOG", "quizforge=warn");
    for var in KEY_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn generate_json(home: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = quizforge(home)
        .arg("generate")
        .args(args)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    quizforge(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quizforge.toml"));
    assert!(dir.path().join("quizforge.toml").exists());

    quizforge(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn generate_falls_back_without_key() {
    let dir = TempDir::new().unwrap();
    let json = generate_json(&dir, &["--topic", "Photosynthesis", "--count", "4", "--types", "mcq,tf"]);

    let questions = json["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 4);
    let kinds: Vec<&str> = questions.iter().map(|q| q["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, ["mcq", "tf", "mcq", "tf"]);
    for q in questions {
        assert!(q["question"].as_str().unwrap().contains("Photosynthesis"));
    }
}

#[test]
fn generate_normalizes_count() {
    let dir = TempDir::new().unwrap();

    let json = generate_json(&dir, &["--topic", "Volcanoes", "--count", "0"]);
    assert_eq!(json["questions"].as_array().unwrap().len(), 5);

    let json = generate_json(&dir, &["--topic", "Volcanoes", "--count", "500"]);
    assert_eq!(json["questions"].as_array().unwrap().len(), 100);
}

#[test]
fn generate_table_output() {
    let dir = TempDir::new().unwrap();
    quizforge(&dir)
        .args(["generate", "--topic", "Optics", "--count", "2", "--types", "short"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Question"))
        .stdout(predicate::str::contains("Optics"))
        .stderr(predicate::str::contains("2 fallback"));
}

#[test]
fn generate_rejects_blank_topic() {
    let dir = TempDir::new().unwrap();
    quizforge(&dir)
        .args(["generate", "--topic", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: topic must not be empty"));
}

#[test]
fn generate_rejects_unknown_provider() {
    let dir = TempDir::new().unwrap();
    quizforge(&dir)
        .args(["generate", "--topic", "Optics", "--provider", "llama"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider 'llama'"));
}

#[test]
fn generate_rejects_unknown_type() {
    let dir = TempDir::new().unwrap();
    quizforge(&dir)
        .args(["generate", "--topic", "Optics", "--types", "essay"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown question type: essay"));
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    quizforge(&dir)
        .args(["history", "--config", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn grade_history_export_flow() {
    let dir = TempDir::new().unwrap();

    quizforge(&dir)
        .args([
            "generate", "--topic", "Cells", "--count", "3", "--types", "tf", "--output", "quiz.json",
        ])
        .assert()
        .success();
    assert!(dir.path().join("quiz.json").exists());

    // Offline true/false items always have "True" as the answer.
    std::fs::write(dir.path().join("answers.json"), r#"["true", "False", null]"#).unwrap();

    let output = quizforge(&dir)
        .args([
            "grade",
            "--questions",
            "quiz.json",
            "--answers",
            "answers.json",
            "--subject",
            "Biology",
            "--time-spent",
            "120",
            "--export",
            "out/attempt.html",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Score: 33% (Needs Improvement), 1 of 3 correct"));
    assert!(dir.path().join("out/attempt.html").exists());
    assert!(dir.path().join("data/progress_guest.json").exists());

    let attempt_id = stdout
        .lines()
        .find_map(|l| l.strip_prefix("Attempt id: "))
        .unwrap()
        .trim()
        .to_string();

    quizforge(&dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains(attempt_id.as_str()))
        .stdout(predicate::str::contains("Biology"))
        .stdout(predicate::str::contains("33%"));

    quizforge(&dir)
        .args(["export", "--attempt", &attempt_id, "--output", "again.html"])
        .assert()
        .success();
    let html = std::fs::read_to_string(dir.path().join("again.html")).unwrap();
    assert!(html.contains("Biology"));

    let output = quizforge(&dir)
        .args(["analytics", "--format", "json"])
        .output()
        .unwrap();
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["overall"]["total_quizzes"], 1);
    assert_eq!(summary["subjects"][0]["subject"], "Biology");

    quizforge(&dir)
        .args(["analytics", "--format", "html", "--output", "stats.html"])
        .assert()
        .success();
    assert!(dir.path().join("stats.html").exists());

    quizforge(&dir)
        .args(["history", "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("History cleared."));
    quizforge(&dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No quizzes taken yet."));
}

#[test]
fn grade_rejects_too_many_answers() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("quiz.json"),
        r#"[{"type": "short", "question": "Name the powerhouse of the cell.", "answer": "Mitochondria"}]"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("answers.json"), r#"["mitochondria", "extra"]"#).unwrap();

    quizforge(&dir)
        .args([
            "grade", "--questions", "quiz.json", "--answers", "answers.json", "--subject", "Biology",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 entries but the quiz has 1 questions"));
}

#[test]
fn export_unknown_attempt_fails() {
    let dir = TempDir::new().unwrap();
    quizforge(&dir)
        .args([
            "export",
            "--attempt",
            "5f0c6f8e-8a51-4b8e-9f5c-2f4b1a0d9c11",
            "--output",
            "x.html",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn login_scopes_history() {
    let dir = TempDir::new().unwrap();

    quizforge(&dir)
        .args(["login", "--name", "Ada", "--email", "ada@example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as Ada <ada@example.com>"));
    assert!(dir.path().join("data/student.json").exists());

    quizforge(&dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));
    quizforge(&dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn login_rejects_bad_email() {
    let dir = TempDir::new().unwrap();
    quizforge(&dir)
        .args(["login", "--name", "Ada", "--email", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid email address"));
}

#[test]
fn list_models_filter() {
    let dir = TempDir::new().unwrap();
    quizforge(&dir)
        .args(["list-models", "--provider", "claude"])
        .assert()
        .success()
        .stdout(predicate::str::contains("claude-sonnet-4-20250514 (default)"))
        .stdout(predicate::str::contains("missing"))
        .stdout(predicate::str::contains("gpt-4o").not());
}

#[test]
fn analyze_image_without_key_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cell.png"), [0x89, b'P', b'N', b'G']).unwrap();

    quizforge(&dir)
        .args(["analyze-image", "--image", "cell.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}
