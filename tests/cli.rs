#![cfg(unix)]

#[path = "../src/testing.rs"]
mod common;

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const BINARY: &str = "admixweb";
const SAMPLE_LOC: &str = "tests/data/sample.loc";
const SAMPLE_PED: &str = "tests/data/sample.ped";
const SAMPLE_TABLE: &str = "tests/data/sample.tsv";
const EMPTY_LOC: &str = "tests/data/empty.loc";
const EMPTY_PED: &str = "tests/data/empty.ped";
const MANIFEST: &str = "tests/data/manifest.tsv";

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn admixweb() -> Command {
    let mut cmd = Command::cargo_bin(BINARY).unwrap();
    cmd.env("ADMIX_BIN", common::fake_admix())
        .env_remove("ADMIX_TMPDIR")
        .env_remove("ADMIX_TIMEOUT");
    cmd
}

#[test]
fn sample_matches_recorded_output() -> TestResult {
    let expected = std::fs::read_to_string("tests/data/sample.out")?;

    admixweb()
        .args(["run", "--loc", SAMPLE_LOC, "--ped", SAMPLE_PED])
        .assert()
        .success()
        .stdout(predicate::str::diff(expected));

    Ok(())
}

#[test]
fn empty_locus_fails_with_the_tool_diagnostic() {
    admixweb()
        .args(["run", "--loc", EMPTY_LOC, "--ped", SAMPLE_PED])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("admix exited with an error"))
        .stderr(predicate::str::contains("not enough memory"));
}

#[test]
fn empty_pedigree_is_rejected_before_admix_runs() {
    admixweb()
        .env("ADMIX_BIN", "/nonexistent/admix")
        .args(["run", "--loc", SAMPLE_LOC, "--ped", EMPTY_PED])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pedigree file empty has no data"));
}

#[test]
fn missing_locus_file() {
    admixweb()
        .args(["run", "--loc", "file_which_does_not_exist.loc", "--ped", SAMPLE_PED])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file_which_does_not_exist.loc"));
}

#[test]
fn missing_admix_binary() {
    admixweb()
        .env("ADMIX_BIN", "/nonexistent/admix")
        .args(["run", "--loc", SAMPLE_LOC, "--ped", SAMPLE_PED])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not run /nonexistent/admix"));
}

#[test]
fn table_output() {
    admixweb()
        .args(["run", "--loc", SAMPLE_LOC, "--ped", SAMPLE_PED, "--format", "table"])
        .assert()
        .success()
        // the header ends in two spaces, which leave an empty last cell
        .stdout(predicate::str::starts_with(
            "<tr><td>FAMID<td>ID<td>MLE_1<td>SE_1<td>MLE_2<td>SE_2<td>\n\
             <tr><td>fam1<td>ind1<td>1.000<td>0.269<td>0.000<td>0.269\n",
        ))
        .stdout(predicate::str::contains(
            "<tr><td>fam2<td>ind3<td>0.000<td>0.319<td>1.000<td>0.319",
        ));
}

#[test]
fn html_page_to_file() -> TestResult {
    let temp = assert_fs::NamedTempFile::new("report.html")?;

    admixweb()
        .args(["run", "--loc", SAMPLE_LOC, "--ped", SAMPLE_PED, "--format", "html", "-o"])
        .arg(temp.path())
        .assert()
        .success();

    temp.assert(predicate::str::contains("<title>sample sample</title>"));
    temp.assert(predicate::str::contains(
        "<tr><td>FAMID</td><td>ID</td><td>MLE_1</td><td>SE_1</td><td>MLE_2</td><td>SE_2</td><td></td></tr>",
    ));
    temp.assert(predicate::str::contains(
        "<tr><td>fam1</td><td>ind2</td><td>0.684</td><td>0.405</td><td>0.316</td><td>0.405</td></tr>",
    ));

    temp.close()?;
    Ok(())
}

#[test]
fn run_from_allele_table() -> TestResult {
    let expected = std::fs::read_to_string("tests/data/sample.out")?;

    admixweb()
        .args(["run", "--table", SAMPLE_TABLE, "--ped", SAMPLE_PED])
        .assert()
        .success()
        .stdout(predicate::str::diff(expected));

    Ok(())
}

#[test]
fn locus_export_matches_locus_file() -> TestResult {
    let expected = std::fs::read_to_string(SAMPLE_LOC)?;

    Command::cargo_bin(BINARY)?
        .args(["locus", SAMPLE_TABLE])
        .assert()
        .success()
        .stdout(predicate::str::diff(expected));

    Ok(())
}

#[test]
fn locus_rejects_invalid_table() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let table = temp.child("bad.tsv");
    table.write_str("marker\tallele\tp1\tp2\nM1\t1\t2.0\t0\n")?;

    Command::cargo_bin(BINARY)?
        .arg("locus")
        .arg(table.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside [0, 1]"));

    temp.close()?;
    Ok(())
}

#[test]
fn locus_rejects_four_populations() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let table = temp.child("wide.tsv");
    table.write_str("marker\tallele\tp1\tp2\tp3\tp4\nM1\t1\t0.1\t0.2\t0.3\t0.4\n")?;

    Command::cargo_bin(BINARY)?
        .arg("locus")
        .arg(table.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("at most 3 populations, found 4"));

    temp.close()?;
    Ok(())
}

#[test]
fn batch_records_every_job() -> TestResult {
    let temp = assert_fs::NamedTempFile::new("jobs.json")?;

    admixweb()
        .args(["batch", MANIFEST, "-t", "2", "-o"])
        .arg(temp.path())
        .assert()
        .success();

    let records: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(temp.path())?)?;
    let records = records.as_array().ok_or("expected a JSON array")?;
    assert_eq!(records.len(), 2);

    assert_eq!(records[0]["name"], "sample sample");
    assert_eq!(records[0]["succeeded"], true);
    assert_eq!(
        records[0]["results"],
        std::fs::read_to_string("tests/data/sample.out")?
    );

    assert_eq!(records[1]["name"], "empty sample");
    assert_eq!(records[1]["succeeded"], false);
    assert_eq!(records[1]["results"], "not enough memory");

    temp.close()?;
    Ok(())
}

#[test]
fn prettify_from_stdin() {
    Command::cargo_bin(BINARY)
        .unwrap()
        .arg("prettify")
        .write_stdin("ind1  0.25 0.75\nind2 0.5 0.5\n")
        .assert()
        .success()
        .stdout("<tr><td>ind1<td>0.25<td>0.75\n<tr><td>ind2<td>0.5<td>0.5\n");
}

#[test]
fn temporary_files_are_removed() -> TestResult {
    let temp = assert_fs::TempDir::new()?;

    admixweb()
        .env("ADMIX_TMPDIR", temp.path())
        .args(["run", "--loc", SAMPLE_LOC, "--ped", SAMPLE_PED])
        .assert()
        .success();

    admixweb()
        .env("ADMIX_TMPDIR", temp.path())
        .args(["run", "--loc", EMPTY_LOC, "--ped", SAMPLE_PED])
        .assert()
        .failure();

    assert_eq!(std::fs::read_dir(temp.path())?.count(), 0);

    temp.close()?;
    Ok(())
}
