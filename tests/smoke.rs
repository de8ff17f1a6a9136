use assert_cmd::Command;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("bank-reviews").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn normalize_command_writes_processed_file() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    let out = dir.path().join("processed.csv");
    std::fs::write(
        &raw,
        "review,rating,date,bank,source\nGood app,4,2023-01-05,CBE,play-store\n",
    )
    .unwrap();

    Command::cargo_bin("bank-reviews")
        .unwrap()
        .env("DATA_DIR", dir.path())
        .env("OUTPUTS_DIR", dir.path().join("outputs"))
        .arg("normalize")
        .arg("--input")
        .arg(&raw)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("Good app,4,2023-01-05,CBE,play-store"));
}

#[test]
fn missing_input_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("bank-reviews")
        .unwrap()
        .env("DATA_DIR", dir.path())
        .env("OUTPUTS_DIR", dir.path().join("outputs"))
        .arg("normalize")
        .assert()
        .failure();
}
