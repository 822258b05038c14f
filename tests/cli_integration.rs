//! Command-line behavior of the `pathways` binary.
//!
//! Each test runs the binary with a throwaway home directory so stored
//! sessions and config files never leak between tests or from the host.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use predicates::prelude::*;
use tempfile::TempDir;

use pathways::auth::{TokenBundle, TokenInfo};
use pathways::secrets::{FileSecretStore, SecretStore};

/// Nothing listens here; commands that need the network fail fast.
const KEYCLOAK_URL: &str = "http://127.0.0.1:9";

struct Sandbox {
    home: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().expect("temp home"),
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("pathways").expect("binary built");
        cmd.env("HOME", self.home.path())
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("PATHWAYS_CONFIG")
            .env_remove("PATHWAYS_API_URL")
            .env_remove("PATHWAYS_KEYCLOAK_REALM")
            .env_remove("PATHWAYS_KEYCLOAK_CLIENT_ID")
            .env_remove("RUST_LOG")
            .env("PATHWAYS_KEYCLOAK_URL", KEYCLOAK_URL);
        cmd
    }

    fn secrets_path(&self) -> PathBuf {
        self.home.path().join("secrets.toml")
    }

    fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.home.path().join("config.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    /// Point the binary at a secrets file holding a valid session.
    fn sign_in(&self, roles: &[&str]) -> PathBuf {
        let config = self.write_config(&format!(
            "[secrets]\npath = {:?}\n",
            self.secrets_path().display().to_string()
        ));
        seed_session(&self.secrets_path(), roles);
        config
    }
}

fn seed_session(path: &Path, roles: &[&str]) {
    let claims = serde_json::json!({
        "sub": "user-7",
        "preferred_username": "dr.ames",
        "realm_access": { "roles": roles },
    });
    let access_token = format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(b"{}"),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    );

    let issuer = format!("{}/realms/pathways", KEYCLOAK_URL);
    let now = Utc::now();
    let bundle = TokenBundle::new(
        &issuer,
        "pathways-frontend",
        TokenInfo {
            access_token,
            access_token_expires_at: now + chrono::Duration::hours(1),
            refresh_token: "refresh".into(),
            refresh_token_expires_at: Some(now + chrono::Duration::hours(8)),
            id_token: None,
        },
    );

    FileSecretStore::new(path.to_path_buf())
        .set(
            &TokenBundle::secret_key(&issuer, "pathways-frontend"),
            &bundle.to_json().expect("serialize bundle"),
        )
        .expect("seed secrets file");
}

mod basics {
    use super::*;

    #[test]
    fn help_lists_commands() {
        Sandbox::new()
            .cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("status"))
            .stdout(predicate::str::contains("open"))
            .stdout(predicate::str::contains("shell"));
    }

    #[test]
    fn version_is_printed() {
        Sandbox::new()
            .cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn unknown_command_fails() {
        Sandbox::new().cmd().arg("dance").assert().failure();
    }

    #[test]
    fn routes_lists_every_screen() {
        Sandbox::new()
            .cmd()
            .arg("routes")
            .assert()
            .success()
            .stdout(predicate::str::contains("/practitioner  practitioner"))
            .stdout(predicate::str::contains("/hr"))
            .stdout(predicate::str::contains("hr | admin"))
            .stdout(predicate::str::contains("/login"));
    }

    #[test]
    fn completion_generates_script() {
        Sandbox::new()
            .cmd()
            .args(["completion", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("pathways"));
    }
}

mod config {
    use super::*;

    #[test]
    fn defaults_without_config_file() {
        Sandbox::new()
            .cmd()
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("(defaults)"))
            .stdout(predicate::str::contains("http://localhost:8000"))
            .stdout(predicate::str::contains(KEYCLOAK_URL));
    }

    #[test]
    fn environment_overrides_file() {
        let sandbox = Sandbox::new();
        let path = sandbox.write_config("api_url = \"http://file.example\"\n");

        sandbox
            .cmd()
            .env("PATHWAYS_CONFIG", &path)
            .env("PATHWAYS_API_URL", "http://env.example")
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("http://env.example"))
            .stdout(predicate::str::contains("http://file.example").not());
    }

    #[test]
    fn invalid_config_file_is_reported() {
        let sandbox = Sandbox::new();
        let path = sandbox.write_config("colour = \"blue\"\n");

        sandbox
            .cmd()
            .env("PATHWAYS_CONFIG", &path)
            .arg("config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load configuration"));
    }
}

mod signed_out {
    use super::*;

    #[test]
    fn status_json_reports_ready_public_session() {
        Sandbox::new()
            .cmd()
            .args(["status", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"readiness\": \"ready\""))
            .stdout(predicate::str::contains("\"authenticated\": false"))
            .stdout(predicate::str::contains("\"role\": \"public\""));
    }

    #[test]
    fn landing_is_public() {
        Sandbox::new()
            .cmd()
            .args(["open", "/"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Pathways | [login]"))
            .stdout(predicate::str::contains("Pathways Clinical Chat"));
    }

    #[test]
    fn protected_screen_redirects_to_login() {
        Sandbox::new()
            .cmd()
            .args(["open", "/admin"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("redirected to /login"))
            .stdout(predicate::str::contains("Sign in"))
            .stdout(predicate::str::contains("Administration").not());
    }

    #[test]
    fn unknown_screen_is_an_error() {
        Sandbox::new()
            .cmd()
            .args(["open", "/billing"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no screen at '/billing'"));
    }

    #[test]
    fn logout_without_session_succeeds() {
        Sandbox::new()
            .cmd()
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not signed in."));
    }

    #[test]
    fn shell_runs_commands_from_stdin() {
        Sandbox::new()
            .cmd()
            .arg("shell")
            .write_stdin("routes\nopen /hr\nquit\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Pathways | [login]"))
            .stdout(predicate::str::contains("/admin"))
            .stderr(predicate::str::contains("redirected to /login"));
    }
}

mod signed_in {
    use super::*;

    #[test]
    fn status_shows_role_from_stored_session() {
        let sandbox = Sandbox::new();
        let config = sandbox.sign_in(&["practitioner"]);

        sandbox
            .cmd()
            .env("PATHWAYS_CONFIG", &config)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("dr.ames (practitioner) | [logout]"))
            .stdout(predicate::str::contains("attached"))
            .stdout(predicate::str::contains("refresh").not());
    }

    #[test]
    fn permitted_screen_opens() {
        let sandbox = Sandbox::new();
        let config = sandbox.sign_in(&["hr"]);

        sandbox
            .cmd()
            .env("PATHWAYS_CONFIG", &config)
            .args(["open", "hr/"])
            .assert()
            .success()
            .stdout(predicate::str::contains("HR Workspace"));
    }

    #[test]
    fn only_the_first_role_counts() {
        let sandbox = Sandbox::new();
        let config = sandbox.sign_in(&["hr", "admin"]);

        sandbox
            .cmd()
            .env("PATHWAYS_CONFIG", &config)
            .args(["open", "/admin"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("/admin requires admin; redirected to /login"));
    }
}
