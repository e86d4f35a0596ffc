use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn tempdir() -> tempfile::TempDir {
    tempfile::Builder::new().prefix("wren-cli").tempdir().unwrap()
}

fn wren<I: IntoIterator<Item = S>, S: AsRef<std::ffi::OsStr>>(args: I) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wren"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn write_notes(root: &Path) {
    fs::create_dir_all(root.join("notes")).unwrap();
    fs::write(root.join("index.md"), "---\ntitle: Home\ntags: [garden]\n---\n\n[[notes/a]]").unwrap();
    fs::write(root.join("notes/a.md"), "---\ndate: 2024-03-01\ntags: garden, ideas\n---\n\n# A\n").unwrap();
    fs::write(root.join("notes/b.md"), [0xff, 0xfe, 0xfd]).unwrap();
}

#[test]
fn processes_a_directory() {
    let dir = tempdir();
    write_notes(dir.path());

    let output = wren([dir.path().as_os_str(), "-v".as_ref()]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("processed 2 of 3 files"), "{stdout}");
    assert!(stdout.contains("2024-03-01"), "{stdout}");
    assert!(stdout.contains("  1 links  index"), "{stdout}");
    assert!(stdout.contains("#garden (2)"), "{stdout}");
}

#[test]
fn unknown_transformers_fail_the_run() {
    let dir = tempdir();
    write_notes(dir.path());
    fs::write(dir.path().join("wren.toml"), "[[plugins.transformers]]\nname = \"Nope\"\n").unwrap();

    for concurrency in ["1", "2"] {
        let output = wren([dir.path().as_os_str(), "-c".as_ref(), concurrency.as_ref()]);
        assert_eq!(output.status.code(), Some(1));

        let all = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );

        assert!(all.contains("unknown transformer"), "{all}");
    }
}

#[test]
fn missing_directory_fails() {
    let dir = tempdir();
    let output = wren([dir.path().join("nope")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("error:"));
}
