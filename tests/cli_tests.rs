//! End-to-end tests for the CLI binary: a real file on disk, through the
//! reader, the per-column profilers, and the printed report.

use std::io::Write;
use std::process::Command;

use tempfile::NamedTempFile;

fn field_nose() -> Command {
    Command::new(env!("CARGO_BIN_EXE_field-nose"))
}

fn write_file(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

#[test]
fn profiles_every_column_of_a_csv_file() {
    let file = write_file(
        b"id,city,joined\n\
          1,Boston,22-01-2010\n\
          2,Austin,13-01-2019\n\
          3,Denver,25-01-1996\n\
          4,Boise,14-02-1916\n\
          5,Fresno,28-03-1993\n\
          6,Tampa,15-04-1998\n\
          7,Orlando,19-05-2001\n\
          8,Reno,14-06-2000\n",
    );

    let output = field_nose().arg(file.path()).output().expect("run binary");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("id: type=Long"), "stdout: {stdout}");
    assert!(stdout.contains("city: type=String"), "stdout: {stdout}");
    assert!(stdout.contains("joined: type=Date"), "stdout: {stdout}");
    assert!(stdout.contains("format=dd-MM-yyyy"), "stdout: {stdout}");
}

#[test]
fn profiles_a_single_column() {
    let file = write_file(
        b"id,amount\n\
          1,0.5\n\
          2,1.25\n\
          3,99.99\n\
          4,3.125\n",
    );

    let output = field_nose()
        .arg("--col")
        .arg("1")
        .arg(file.path())
        .output()
        .expect("run binary");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("amount: type=Double"), "stdout: {stdout}");
    assert!(!stdout.contains("id: type"), "stdout: {stdout}");
}

#[test]
fn rejects_non_utf8_input() {
    let file = write_file(&[0xFF, 0xFE, 0x41, 0x42, 0x0A]);

    let output = field_nose().arg(file.path()).output().expect("run binary");
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not valid UTF-8"), "stderr: {stderr}");
}
