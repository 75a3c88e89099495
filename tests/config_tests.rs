//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

mod common;

use std::fs;
use std::path::PathBuf;

use predicates::prelude::*;
use tempfile::TempDir;

use common::{invalid_config_fixture, stellari_cmd, valid_config_fixture};

/// Test fixture for configuration testing
struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self { temp_dir, config_path }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    fn cmd(&self) -> assert_cmd::Command {
        stellari_cmd(self.temp_dir.path())
    }

    fn validate(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["config", "validate", "--config", self.path()])
            .assert()
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_empty_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");
    fixture.validate().success();
}

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]

[store]

[logging]
"#,
    );
    fixture
        .validate()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("No store URL set"));
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
api_key = "sk-test"
base_url = "http://localhost:8080"
model = "claude-sonnet-4-20250514"
api_version = "2023-06-01"
instructions_max_tokens = 4000
questions_max_tokens = 500
timeout_secs = 30

[store]
url = "https://project.supabase.co"
anon_key = "anon"
access_token = "user-token"
timeout_secs = 15

[logging]
level = "debug"
max_file_size_mb = 10
max_files = 2
json_format = true
"#,
    );
    fixture
        .validate()
        .success()
        .stdout(predicate::str::contains("offline template").not())
        .stdout(predicate::str::contains("No store URL").not());
}

#[test]
fn test_valid_fixture() {
    let home = TempDir::new().unwrap();
    stellari_cmd(home.path())
        .args(["config", "validate", "--config"])
        .arg(valid_config_fixture())
        .assert()
        .success();
}

#[test]
fn test_config_file_discovered_in_working_directory() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("stellari.toml"),
        "[llm]\nmodel = \"claude-from-cwd\"\n",
    )
    .unwrap();

    stellari_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("claude-from-cwd"));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_fixture() {
    let home = TempDir::new().unwrap();
    stellari_cmd(home.path())
        .args(["config", "validate", "--config"])
        .arg(invalid_config_fixture())
        .assert()
        .code(10)
        .stderr(predicate::str::contains("E102"));
}

#[test]
fn test_store_url_without_key() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[store]
url = "https://project.supabase.co"
"#,
    );
    fixture
        .validate()
        .failure()
        .stderr(predicate::str::contains("anon_key"));
}

#[test]
fn test_non_http_store_url() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[store]
url = "ftp://project.supabase.co"
anon_key = "anon"
"#,
    );
    fixture
        .validate()
        .failure()
        .stderr(predicate::str::contains("store.url"));
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[logging]
level = "loud"
"#,
    );
    fixture
        .validate()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

#[test]
fn test_zero_token_budget() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
questions_max_tokens = 0
"#,
    );
    fixture
        .validate()
        .failure()
        .stderr(predicate::str::contains("token budgets"));
}

#[test]
fn test_zero_llm_timeout() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
timeout_secs = 0
"#,
    );
    fixture
        .validate()
        .code(10)
        .stderr(predicate::str::contains("llm.timeout_secs"));
}

#[test]
fn test_zero_store_timeout() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[store]
url = "https://project.supabase.co"
anon_key = "anon"
timeout_secs = 0
"#,
    );
    fixture
        .validate()
        .code(10)
        .stderr(predicate::str::contains("store.timeout_secs"));

    // The persona commands must not start against a store that can never answer
    fixture
        .cmd()
        .args(["persona", "list", "--config", fixture.path()])
        .assert()
        .code(10)
        .stdout(predicate::str::contains("No personas found").not());
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[llm\napi_key = ");
    fixture
        .validate()
        .code(10)
        .stderr(predicate::str::contains("E101"));
}

#[test]
fn test_wrong_value_type() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
timeout_secs = "soon"
"#,
    );
    fixture.validate().failure();
}

// ─────────────────────────────────────────────────────────────────
// Environment Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
model = "from-file"
"#,
    );
    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .env("STELLARI_LLM_MODEL", "from-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env"))
        .stdout(predicate::str::contains("from-file").not());
}

#[test]
fn test_env_invalid_store_url_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");
    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .env("STELLARI_STORE_URL", "not-a-url")
        .env("STELLARI_STORE_ANON_KEY", "anon")
        .assert()
        .failure();
}

#[test]
fn test_config_env_var_selects_file() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
model = "chosen-by-env"
"#,
    );
    fixture
        .cmd()
        .args(["config", "show"])
        .env("STELLARI_CONFIG", fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("chosen-by-env"));
}

// ─────────────────────────────────────────────────────────────────
// Config Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_creates_loadable_file() {
    let fixture = ConfigFixture::new();
    let target = fixture.temp_dir.path().join("nested").join("stellari.toml");

    fixture
        .cmd()
        .args(["config", "init", "--path"])
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default configuration"));

    let content = fs::read_to_string(&target).unwrap();
    assert!(content.contains("[llm]"));
    assert!(content.contains("[store]"));

    fixture
        .cmd()
        .args(["config", "validate", "--config"])
        .arg(&target)
        .assert()
        .success();
}

#[test]
fn test_config_init_refuses_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("# existing\n");

    fixture
        .cmd()
        .args(["config", "init", "--path", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    fixture
        .cmd()
        .args(["config", "init", "--force", "--path", fixture.path()])
        .assert()
        .success();
    assert!(fs::read_to_string(&fixture.config_path)
        .unwrap()
        .contains("[llm]"));
}
