use assert_cmd::Command;
use assert_cmd::cargo;
use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::Server;
use predicates::prelude::*;
use sha2::{Digest, Sha256};
use std::io::prelude::*;
use tar::Builder;
use tempfile::tempdir;

const ASSET_PATH: &str = "/v0.1.0/scorex-0.1.0-linux-x86_64.tar.gz";
const ENTRY: &str = "scorex-linux-x86_64";

fn create_tar_gz_with_executable(files: &[(&str, &str, u32)]) -> Vec<u8> {
    let mut tar_builder = Builder::new(Vec::new());
    for (name, content, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_path(name).unwrap();
        header.set_mode(*mode);
        header.set_cksum();
        tar_builder.append(&header, content.as_bytes()).unwrap();
    }
    let tar = tar_builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn scorex() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("scorex-installer"));
    cmd.env_remove("SCOREX_BIN_DIR").env_remove("SCOREX_VERSION");
    cmd
}

fn install_cmd(base_url: &str, bin_dir: &std::path::Path) -> Command {
    let mut cmd = scorex();
    cmd.arg("install")
        .arg("--os")
        .arg("linux")
        .arg("--arch")
        .arg("x86_64")
        .arg("--base-url")
        .arg(base_url)
        .arg("--bin-dir")
        .arg(bin_dir);
    cmd
}

#[cfg(unix)]
#[test]
fn test_end_to_end_install() {
    let archive = create_tar_gz_with_executable(&[(
        ENTRY,
        "#!/bin/sh\n[ \"$1\" = version ] && echo 'scorex 0.1.0'\n",
        0o755,
    )]);

    let mut server = Server::new();
    let mock = server
        .mock("GET", ASSET_PATH)
        .with_status(200)
        .with_body(&archive)
        .expect(1)
        .create();

    let bin = tempdir().unwrap();
    install_cmd(&server.url(), bin.path())
        .arg("--sha256")
        .arg(sha256_hex(&archive))
        .assert()
        .success()
        .stdout(predicate::str::contains("scorex 0.1.0 installed to"));

    mock.assert();

    let installed = bin.path().join("scorex");
    assert!(installed.exists());
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&installed).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    // Installed binary passes the standalone smoke test too
    scorex()
        .arg("--bin-dir")
        .arg(bin.path())
        .arg("test")
        .assert()
        .success();
}

#[test]
fn test_install_with_checksum_file() {
    let archive = create_tar_gz_with_executable(&[(ENTRY, "binary", 0o755)]);

    let mut server = Server::new();
    let _mock = server
        .mock("GET", ASSET_PATH)
        .with_status(200)
        .with_body(&archive)
        .create();

    let dir = tempdir().unwrap();
    let sums = dir.path().join("SHA256SUMS");
    std::fs::write(
        &sums,
        format!(
            "# scorex 0.1.0\n{}  scorex-0.1.0-linux-x86_64.tar.gz\n",
            sha256_hex(&archive)
        ),
    )
    .unwrap();

    let bin = dir.path().join("bin");
    install_cmd(&server.url(), &bin)
        .arg("--checksums")
        .arg(&sums)
        .arg("--skip-test")
        .assert()
        .success();

    let installed = std::fs::read_to_string(bin.join("scorex")).unwrap();
    assert_eq!(installed, "binary");
}

#[test]
fn test_resolve_prints_release_url() {
    scorex()
        .args(["resolve", "--os", "macos", "--arch", "arm64"])
        .assert()
        .success()
        .stdout(
            "https://github.com/eclipse-score/score_scrample/releases/download/v0.1.0/scorex-0.1.0-macos-arm64.tar.gz\n",
        );
}

#[test]
fn test_resolve_json() {
    let output = scorex()
        .args([
            "resolve", "--os", "darwin", "--arch", "x86_64", "--version", "v0.3.1", "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let target: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(target["version"], "0.3.1");
    assert_eq!(target["asset_name"], "scorex-0.3.1-macos-x86_64.tar.gz");
    assert_eq!(target["archive_entry"], "scorex-macos-x86_64");
    assert_eq!(target["platform"]["os"], "macos");
}

#[test]
fn test_linux_arm64_is_unsupported() {
    let bin = tempdir().unwrap();
    scorex()
        .args(["install", "--os", "linux", "--arch", "arm64"])
        .arg("--bin-dir")
        .arg(bin.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no scorex release for linux/arm64"));

    assert!(!bin.path().join("scorex").exists());
}

#[test]
fn test_placeholder_checksum_is_configuration_error() {
    let mut server = Server::new();
    let mock = server.mock("GET", ASSET_PATH).expect(0).create();

    let bin = tempdir().unwrap();
    install_cmd(&server.url(), bin.path())
        .assert()
        .code(8)
        .stderr(predicate::str::contains("REPLACE_WITH_ACTUAL_SHA256_LINUX"));

    mock.assert();
}

#[test]
fn test_checksum_mismatch() {
    let archive = create_tar_gz_with_executable(&[(ENTRY, "tampered", 0o755)]);

    let mut server = Server::new();
    let _mock = server
        .mock("GET", ASSET_PATH)
        .with_status(200)
        .with_body(&archive)
        .create();

    let bin = tempdir().unwrap();
    std::fs::write(bin.path().join("scorex"), "previous").unwrap();

    install_cmd(&server.url(), bin.path())
        .arg("--sha256")
        .arg("0".repeat(64))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("checksum mismatch"));

    let kept = std::fs::read_to_string(bin.path().join("scorex")).unwrap();
    assert_eq!(kept, "previous");
}

#[test]
fn test_download_not_found() {
    let mut server = Server::new();
    let _mock = server.mock("GET", ASSET_PATH).with_status(404).create();

    let bin = tempdir().unwrap();
    install_cmd(&server.url(), bin.path())
        .arg("--sha256")
        .arg("a".repeat(64))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("404"));
}

#[test]
fn test_archive_without_expected_binary() {
    let archive = create_tar_gz_with_executable(&[("scorex-macos-arm64", "binary", 0o755)]);

    let mut server = Server::new();
    let _mock = server
        .mock("GET", ASSET_PATH)
        .with_status(200)
        .with_body(&archive)
        .create();

    let bin = tempdir().unwrap();
    install_cmd(&server.url(), bin.path())
        .arg("--sha256")
        .arg(sha256_hex(&archive))
        .assert()
        .code(5);

    assert!(!bin.path().join("scorex").exists());
}

#[cfg(unix)]
#[test]
fn test_failed_smoke_test() {
    let archive = create_tar_gz_with_executable(&[(ENTRY, "#!/bin/sh\nexit 1\n", 0o755)]);

    let mut server = Server::new();
    let _mock = server
        .mock("GET", ASSET_PATH)
        .with_status(200)
        .with_body(&archive)
        .create();

    let bin = tempdir().unwrap();
    install_cmd(&server.url(), bin.path())
        .arg("--sha256")
        .arg(sha256_hex(&archive))
        .assert()
        .code(7)
        .stderr(predicate::str::contains("exited with status 1"));

    assert!(bin.path().join("scorex").exists());
}

#[test]
fn test_smoke_test_without_installed_binary() {
    let bin = tempdir().unwrap();
    scorex()
        .arg("--bin-dir")
        .arg(bin.path())
        .arg("test")
        .assert()
        .code(7);
}

#[test]
fn test_smoke_test_rejects_empty_bin_dir() {
    scorex()
        .args(["--bin-dir", "", "test"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("version: ok").not());
}

#[test]
fn test_formula_output() {
    let dir = tempdir().unwrap();
    let sums = dir.path().join("SHA256SUMS");
    std::fs::write(
        &sums,
        format!(
            "{}  scorex-0.1.0-macos-arm64.tar.gz\n{} *scorex-0.1.0-macos-x86_64.tar.gz\n{}  dist/scorex-0.1.0-linux-x86_64.tar.gz\n",
            "a".repeat(64),
            "b".repeat(64),
            "c".repeat(64)
        ),
    )
    .unwrap();

    scorex()
        .arg("formula")
        .arg("--checksums")
        .arg(&sums)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("class Scorex < Formula"))
        .stdout(predicate::str::contains(format!("sha256 \"{}\"", "c".repeat(64))))
        .stdout(predicate::str::contains("bin.install \"scorex-macos-arm64\" => \"scorex\""))
        .stdout(predicate::str::contains("system \"#{bin}/scorex\", \"version\""));
}

#[test]
fn test_formula_missing_digest() {
    let dir = tempdir().unwrap();
    let sums = dir.path().join("SHA256SUMS");
    std::fs::write(
        &sums,
        format!("{}  scorex-0.1.0-macos-arm64.tar.gz\n", "a".repeat(64)),
    )
    .unwrap();

    scorex()
        .arg("formula")
        .arg("--checksums")
        .arg(&sums)
        .assert()
        .code(8)
        .stderr(predicate::str::contains("scorex-0.1.0-linux-x86_64.tar.gz"));
}

#[test]
fn test_invalid_arguments_exit_2() {
    scorex().arg("install").arg("--bogus").assert().code(2);
}
