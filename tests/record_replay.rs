//! Cassette replay integration tests; zero network I/O.
//!
//! All tests set `BANANAGEN_REPLAY` to a cassette file path so that the
//! binary never contacts a live endpoint, and point `BANANAGEN_CONFIG` at a
//! fixture config that disables polling waits.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn cmd() -> Command {
    assert_cmd::cargo::cargo_bin_cmd!("bananagen")
}

/// Absolute path to the `test_fixtures` directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures")
}

/// A command replaying `cassette` with no credential in the environment.
fn replay(cassette: &str) -> Command {
    let mut cmd = cmd();
    cmd.env("BANANAGEN_REPLAY", fixtures_dir().join(cassette))
        .env("BANANAGEN_CONFIG", fixtures_dir().join("replay.toml"))
        .env_remove("BANANAGEN_REC")
        .env_remove("FAL_KEY");
    cmd
}

#[test]
fn text_to_image_prints_urls_and_progress() {
    replay("text_to_image.cassette.yaml")
        .arg("a cat on a windowsill")
        .assert()
        .success()
        .stdout(predicate::eq("https://cdn.test/files/cat.png\n"))
        .stderr(predicate::str::contains("Submitted: req-1"))
        .stderr(predicate::str::contains("Queued (position 2)"))
        .stderr(predicate::str::contains("Rendering"))
        .stderr(predicate::str::contains("A cat on a windowsill"));
}

#[test]
fn output_dir_downloads_with_server_file_name() {
    let out = std::env::temp_dir().join("bananagen_test_download");
    let _ = std::fs::remove_dir_all(&out);

    replay("text_to_image.cassette.yaml")
        .args(["--output-dir", out.to_str().unwrap(), "a cat"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Saved:"));

    let saved = out.join("cat.png");
    assert_eq!(std::fs::read_to_string(&saved).unwrap(), "fake-png-bytes");
    let _ = std::fs::remove_dir_all(&out);
}

#[test]
fn remote_failure_reports_server_message() {
    replay("failed.cassette.yaml")
        .arg("a cat")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Generation failed: Content policy violation",
        ));
}

#[test]
fn polling_ceiling_times_out() {
    replay("stuck.cassette.yaml")
        .arg("a cat")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Timed out"))
        .stderr(predicate::str::contains("3 status checks"));
}

#[test]
fn empty_result_is_not_an_error() {
    replay("empty_result.cassette.yaml")
        .arg("a cat")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No images were returned"));
}

#[test]
fn validation_errors_are_joined() {
    replay("rejected.cassette.yaml")
        .arg("a cat")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Submission failed: field required; too large",
        ));
}

#[test]
fn edit_uploads_reference_then_uses_edit_route() {
    replay("edit_upload.cassette.yaml")
        .args(["-i", "data:image/png;base64,aGVsbG8=", "make it blue"])
        .assert()
        .success()
        .stdout(predicate::eq("https://cdn.test/files/edited.png\n"))
        .stderr(predicate::str::contains("sending inline").not());
}

#[test]
fn edit_falls_back_to_inline_when_uploads_fail() {
    replay("edit_inline_fallback.cassette.yaml")
        .args(["-i", "data:image/png;base64,aGVsbG8=", "make it blue"])
        .assert()
        .success()
        .stdout(predicate::eq("https://cdn.test/files/inline.png\n"))
        .stderr(predicate::str::contains(
            "Upload failed for 1 reference image(s); sending inline",
        ));
}

#[test]
fn edit_without_inline_fallback_fails() {
    replay("edit_inline_fallback.cassette.yaml")
        .args([
            "--no-inline-fallback",
            "-i",
            "data:image/png;base64,aGVsbG8=",
            "make it blue",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("All upload endpoints failed"));
}

#[test]
fn remote_reference_urls_skip_upload() {
    // The cassette has no upload exchanges for this run; the URL must pass through.
    let cassette = std::env::temp_dir().join("bananagen_passthrough.yaml");
    std::fs::write(
        &cassette,
        r#"name: passthrough
recorded_at: "2026-10-01T00:00:00Z"
commit: test
interactions:
  - seq: 0
    method: POST
    url: https://queue.fal.run/fal-ai/nano-banana-pro/edit
    response:
      reply:
        status: 200
        body: '{"request_id":"req-7"}'
  - seq: 1
    method: GET
    url: https://queue.fal.run/fal-ai/nano-banana-pro/requests/req-7/status
    response:
      reply:
        status: 200
        body: '{"status":"COMPLETED","images":[{"url":"https://cdn.test/files/out.png"}]}'
"#,
    )
    .unwrap();

    cmd()
        .env("BANANAGEN_REPLAY", &cassette)
        .env("BANANAGEN_CONFIG", fixtures_dir().join("replay.toml"))
        .env_remove("FAL_KEY")
        .args(["-i", "https://example.com/ref.png", "make it blue"])
        .assert()
        .success()
        .stdout(predicate::eq("https://cdn.test/files/out.png\n"));

    let _ = std::fs::remove_file(&cassette);
}

#[test]
fn missing_cassette_fails_cleanly() {
    cmd()
        .env("BANANAGEN_REPLAY", "/nonexistent/http.cassette.yaml")
        .env("BANANAGEN_CONFIG", fixtures_dir().join("replay.toml"))
        .env_remove("FAL_KEY")
        .arg("a cat")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load cassette"));
}
