use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn write_cranfield(dir: &Path, id: u32, title: &str, text: &str) {
    let body = format!(
        "<DOC>\n<DOCNO>\n{}\n</DOCNO>\n<TITLE>\n{}\n</TITLE>\n<TEXT>\n{}\n</TEXT>\n</DOC>\n",
        id, title, text
    );
    fs::write(dir.join(format!("cranfield{:04}", id)), body).unwrap();
}

fn indexer() -> Command {
    Command::new(env!("CARGO_BIN_EXE_indexer"))
}

#[test]
fn build_writes_sorted_frequency_index() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    fs::create_dir(&corpus).unwrap();
    write_cranfield(&corpus, 2, "wing drag", "drag of a swept wing");
    write_cranfield(&corpus, 1, "shock waves", "shock waves past a wedge");
    let out = dir.path().join("index.txt");

    let status = indexer()
        .args(["build", "--scheme", "freq", "--tokenizer", "SimpleTokenizer", "--input"])
        .arg(&corpus)
        .arg("--output")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "SimpleTokenizer 2");
    assert!(lines.contains(&"drag 2:2"));
    assert!(lines.contains(&"shock 1:2"));
    let terms: Vec<&str> = lines[1..].iter().filter_map(|l| l.split(' ').next()).collect();
    let mut sorted = terms.clone();
    sorted.sort();
    assert_eq!(terms, sorted);
}

#[test]
fn stats_reports_index_size() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("index.txt");
    fs::write(&out, "ComplexTokenizer 3\nflow 1:1,2:3,3:1\nwedg 1:1\n").unwrap();

    let output = indexer().args(["stats", "--index"]).arg(&out).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Documents: 3"));
    assert!(stdout.contains("Terms: 2"));
    assert!(stdout.contains("single document: wedg"));
}

#[test]
fn stats_reads_weighted_index_built_by_the_cli() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    fs::create_dir(&corpus).unwrap();
    write_cranfield(&corpus, 1, "shock waves", "shock waves past a wedge");
    write_cranfield(&corpus, 2, "wing drag", "drag of a swept wing in shock");
    let out = dir.path().join("index.txt");

    let status = indexer()
        .args(["build", "--scheme", "weighted", "--tokenizer", "SimpleTokenizer", "--input"])
        .arg(&corpus)
        .arg("--output")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let output = indexer().args(["stats", "--index"]).arg(&out).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Documents: 2"));
    // drag past shock swept waves wedge wing
    assert!(stdout.contains("Terms: 7"));
    assert!(stdout.contains("single document: drag, past, swept, waves, wedge, wing"));
    assert!(stdout.lines().any(|l| l.trim_start().starts_with("shock") && l.trim_end().ends_with('2')));
}

#[test]
fn stats_with_the_wrong_scheme_fails() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("index.txt");
    fs::write(&out, "SimpleTokenizer 1\ncat 1:0.70711\ndog 1:0.70711\n").unwrap();

    let output = indexer().args(["stats", "--scheme", "freq", "--index"]).arg(&out).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("freq weights"));
}

#[test]
fn unknown_scheme_is_rejected() {
    let dir = tempdir().unwrap();
    let status = indexer()
        .args(["build", "--scheme", "bm25", "--input"])
        .arg(dir.path())
        .arg("--output")
        .arg(dir.path().join("index.txt"))
        .status()
        .unwrap();
    assert!(!status.success());
}
