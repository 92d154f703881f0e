//! CLI integration tests for oas-engine binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PETSTORE: &str = "tests/fixtures/petstore.yaml";

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("oas-engine"))
}

// Helper to create a temp payload or document file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod validate_command {
    use super::*;

    #[test]
    fn validate_valid_payload() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "pet.json", r#"{"id": 1, "name": "Rex"}"#);

        cmd()
            .args(["validate", PETSTORE, "--schema", "Pet", payload.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn validate_missing_required_field() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "pet.json", r#"{"id": 1}"#);

        cmd()
            .args(["validate", PETSTORE, "--schema", "Pet", payload.to_str().unwrap()])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("name: name is required"));
    }

    #[test]
    fn validate_wrong_type_nested() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(
            &dir,
            "pet.json",
            r#"{"id": 1, "name": "Rex", "owner": {"name": "Ann", "email": 5}}"#,
        );

        cmd()
            .args(["validate", PETSTORE, "--schema", "Pet", payload.to_str().unwrap()])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("owner.email: Expected string, got integer"));
    }

    #[test]
    fn validate_accepts_reference_syntax() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "owner.json", r#"{"name": "Ann", "email": "a@b.c"}"#);

        cmd()
            .args([
                "validate",
                PETSTORE,
                "--schema",
                "#/components/schemas/Owner",
                payload.to_str().unwrap(),
            ])
            .assert()
            .success();
    }

    #[test]
    fn validate_json_output_invalid() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "pet.json", r#"{"id": "one", "name": "Rex"}"#);

        cmd()
            .args([
                "validate",
                PETSTORE,
                "--schema",
                "Pet",
                payload.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""kind":"type""#))
            .stdout(predicate::str::contains(r#""path":"id""#));
    }

    #[test]
    fn validate_malformed_payload_is_invalid() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "pet.json", "{ not json");

        cmd()
            .args(["validate", PETSTORE, "--schema", "Pet", payload.to_str().unwrap()])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid JSON"));
    }
}

mod example_command {
    use super::*;

    #[test]
    fn example_for_pet() {
        cmd()
            .args(["example", PETSTORE, "--schema", "Pet"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"{"id":0,"name":"string","email":"user@example.com","status":"available"}"#,
            ));
    }

    #[test]
    fn example_pretty() {
        cmd()
            .args(["example", PETSTORE, "--schema", "Owner", "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn example_max_depth_truncates() {
        cmd()
            .args(["example", PETSTORE, "--schema", "Node", "--max-depth", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"value":"string","next":{}}"#));
    }

    #[test]
    fn example_unknown_schema() {
        cmd()
            .args(["example", PETSTORE, "--schema", "Missing"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("schema not found: Missing"));
    }
}

mod diff_command {
    use super::*;

    #[test]
    fn diff_extra_field_is_valid() {
        let dir = TempDir::new().unwrap();
        let response =
            write_temp_file(&dir, "resp.json", r#"{"id": 1, "name": "x", "extra": "y"}"#);

        cmd()
            .args(["diff", PETSTORE, "--schema", "Pet", response.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("+ extra"))
            .stdout(predicate::str::contains("2 matching, 1 extra, 0 missing, 0 errors"));
    }

    #[test]
    fn diff_missing_field_json() {
        let dir = TempDir::new().unwrap();
        let response = write_temp_file(&dir, "resp.json", r#"{"id": 1}"#);

        cmd()
            .args([
                "diff",
                PETSTORE,
                "--schema",
                "Pet",
                response.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""missingFields":[{"path":"name""#));
    }
}

mod request_command {
    use super::*;

    #[test]
    fn bearer_request() {
        cmd()
            .args([
                "request",
                PETSTORE,
                "--method",
                "get",
                "--path",
                "/pets/{id}",
                "--param",
                "id=42",
                "--param",
                "limit=10",
                "--bearer",
                "abc",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""url": "https://api.example.com/pets/42?limit=10""#,
            ))
            .stdout(predicate::str::contains(r#""Authorization": "Bearer abc""#));
    }

    #[test]
    fn missing_path_parameter_fails() {
        cmd()
            .args(["request", PETSTORE, "--method", "GET", "--path", "/pets/{id}"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("id is required"));
    }

    #[test]
    fn enum_parameter_fails() {
        cmd()
            .args([
                "request",
                PETSTORE,
                "--method",
                "GET",
                "--path",
                "/pets/{id}",
                "--param",
                "id=1",
                "--param",
                "mode=c",
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("mode must be one of: a, b"));
    }

    #[test]
    fn skip_validation_assembles_anyway() {
        cmd()
            .args([
                "request",
                PETSTORE,
                "--method",
                "GET",
                "--path",
                "/pets/{id}",
                "--param",
                "mode=c",
                "--skip-validation",
                "--base-url",
                "http://localhost:8080/",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""url": "http://localhost:8080/pets/{id}?mode=c""#,
            ));
    }

    #[test]
    fn body_is_validated() {
        let dir = TempDir::new().unwrap();
        let body = write_temp_file(&dir, "body.json", r#"{"tag": "dog"}"#);

        cmd()
            .args([
                "request",
                PETSTORE,
                "--method",
                "POST",
                "--path",
                "/pets",
                "--body",
                body.to_str().unwrap(),
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("body: name: name is required"));
    }

    #[test]
    fn required_body_missing() {
        cmd()
            .args(["request", PETSTORE, "--method", "POST", "--path", "/pets"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("request body is required"));
    }

    #[test]
    fn body_with_api_key_in_query() {
        let dir = TempDir::new().unwrap();
        let body = write_temp_file(&dir, "body.json", r#"{"name": "Rex"}"#);

        cmd()
            .args([
                "request",
                PETSTORE,
                "--method",
                "POST",
                "--path",
                "/pets",
                "--body",
                body.to_str().unwrap(),
                "--api-key",
                "api_key=secret",
                "--api-key-in",
                "query",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""url": "https://api.example.com/pets?api_key=secret""#,
            ))
            .stdout(predicate::str::contains(r#""Content-Type": "application/json""#))
            .stdout(predicate::str::contains(r#""method": "POST""#));
    }

    #[test]
    fn unknown_operation() {
        cmd()
            .args(["request", PETSTORE, "--method", "DELETE", "--path", "/pets"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("no operation DELETE /pets"));
    }

    #[test]
    fn conflicting_auth_flags() {
        cmd()
            .args([
                "request",
                PETSTORE,
                "--method",
                "GET",
                "--path",
                "/pets",
                "--bearer",
                "a",
                "--oauth2",
                "b",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot be used with"));
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn lint_petstore_warns_about_cycle() {
        cmd()
            .args(["lint", PETSTORE])
            .assert()
            .success()
            .stdout(predicate::str::contains("warning[W002]"));
    }

    #[test]
    fn lint_strict_fails_on_warnings() {
        cmd()
            .args(["lint", PETSTORE, "--strict"])
            .assert()
            .code(1);
    }

    #[test]
    fn lint_json_output() {
        let dir = TempDir::new().unwrap();
        write_temp_file(
            &dir,
            "broken.json",
            r##"{"openapi": "3.0.0",
                "components": {"schemas": {"A": {"$ref": "#/components/schemas/B"}}}}"##,
        );

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--format", "json"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""code": "E002""#))
            .stdout(predicate::str::contains(r#""files_checked": 1"#));
    }

    #[test]
    fn lint_path_not_found() {
        cmd()
            .args(["lint", "/nonexistent/specs"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn document_not_found() {
        cmd()
            .args(["example", "/nonexistent/openapi.yaml", "--schema", "Pet"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn payload_not_found() {
        cmd()
            .args(["validate", PETSTORE, "--schema", "Pet", "/nonexistent/pet.json"])
            .assert()
            .code(3);
    }

    #[test]
    fn not_an_openapi_document() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "schema.json", r#"{"type": "object"}"#);

        cmd()
            .args(["example", doc.to_str().unwrap(), "--schema", "Pet"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid document"));
    }

    #[test]
    fn json_error_output() {
        cmd()
            .args([
                "validate",
                PETSTORE,
                "--schema",
                "Missing",
                "/nonexistent/pet.json",
                "--json",
            ])
            .assert()
            .code(2)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains("schema not found"));
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("validate"))
            .stdout(predicate::str::contains("example"))
            .stdout(predicate::str::contains("lint"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("oas-engine"));
    }

    #[test]
    fn request_help() {
        cmd()
            .args(["request", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--skip-validation"))
            .stdout(predicate::str::contains("--api-key-in"));
    }
}

#[cfg(feature = "remote")]
mod remote {
    use super::*;

    #[test]
    fn example_from_url() {
        let mut server = mockito::Server::new();
        let body = fs::read_to_string(PETSTORE).unwrap();
        let mock = server
            .mock("GET", "/openapi.yaml")
            .with_status(200)
            .with_body(body)
            .create();

        cmd()
            .args([
                "example",
                &format!("{}/openapi.yaml", server.url()),
                "--schema",
                "Owner",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""email":"user@example.com""#));
        mock.assert();
    }

    #[test]
    fn url_404() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/missing.yaml").with_status(404).create();

        cmd()
            .args([
                "example",
                &format!("{}/missing.yaml", server.url()),
                "--schema",
                "Pet",
            ])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("failed to fetch"));
    }
}
