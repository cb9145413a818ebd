use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn datatemplate(workspace: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("datatemplate").expect("binary exists");
    cmd.env("DATATEMPLATE_BASE_URL", "https://render.test/")
        .env_remove("DATATEMPLATE_CHARSET")
        .arg("--workspace")
        .arg(workspace);
    cmd
}

#[test]
fn help_displays_usage() {
    Command::cargo_bin("datatemplate")
        .expect("binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn import_writes_all_three_documents() {
    let temp = tempfile::tempdir().unwrap();
    let bundle = temp.path().join("site.dt");
    fs::write(
        &bundle,
        "notes\n<data.csv>\nhost\n\tr1\n</data.csv>\n<template.j2>{{ host }}</template.j2>\n",
    )
    .unwrap();
    fs::write(temp.path().join("vars.yml"), "stale: true").unwrap();

    datatemplate(temp.path())
        .arg("import")
        .arg(&bundle)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(temp.path().join("data.csv")).unwrap(), "host\n  r1");
    assert_eq!(
        fs::read_to_string(temp.path().join("template.j2")).unwrap(),
        "{{ host }}"
    );
    assert_eq!(fs::read_to_string(temp.path().join("vars.yml")).unwrap(), "");
}

#[test]
fn import_rejects_plain_text() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("notes.txt");
    fs::write(&file, "hello world").unwrap();

    datatemplate(temp.path())
        .arg("import")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: Invalid DataTemplate Format"));
    assert!(!temp.path().join("template.j2").exists());
}

#[test]
fn restore_writes_documents_from_link() {
    let temp = tempfile::tempdir().unwrap();
    datatemplate(temp.path())
        .arg("restore")
        .arg("https://render.test/?template=WA%3D%3D")
        .assert()
        .success();
    assert_eq!(fs::read_to_string(temp.path().join("template.j2")).unwrap(), "X");
    assert!(!temp.path().join("data.csv").exists());
}

#[test]
fn restore_reports_bad_encoding() {
    let temp = tempfile::tempdir().unwrap();
    datatemplate(temp.path())
        .arg("restore")
        .arg("/?data=%25%25%25")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: invalid base64 in 'data'"));
}

#[test]
fn generate_requires_template() {
    let temp = tempfile::tempdir().unwrap();
    datatemplate(temp.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: No Template"));
}

#[test]
fn generate_prints_output_link() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("data.csv"), "col1,col2\nval1,val2").unwrap();
    fs::write(temp.path().join("template.j2"), "{{ col1 }}").unwrap();

    datatemplate(temp.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "https://render.test/output.html?data=",
        ));
}

#[test]
fn share_then_restore_round_trips() {
    let source = tempfile::tempdir().unwrap();
    fs::write(source.path().join("data.csv"), "a,b\n1,2").unwrap();
    fs::write(source.path().join("template.j2"), "{{ a }}+{{ b }}").unwrap();
    fs::write(source.path().join("vars.yml"), "x: ü").unwrap();

    let output = datatemplate(source.path()).arg("share").output().unwrap();
    assert!(output.status.success());
    let link = String::from_utf8(output.stdout).unwrap();
    assert!(link.starts_with("https://render.test/?data="));

    let target = tempfile::tempdir().unwrap();
    datatemplate(target.path())
        .arg("restore")
        .arg(link.trim())
        .assert()
        .success();
    for name in ["data.csv", "template.j2", "vars.yml"] {
        assert_eq!(
            fs::read_to_string(target.path().join(name)).unwrap(),
            fs::read_to_string(source.path().join(name)).unwrap(),
        );
    }
}

#[test]
fn show_prints_tagged_bundle() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("template.j2"), "t").unwrap();
    datatemplate(temp.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("<template.j2>\nt\n</template.j2>"));
}

#[test]
fn export_after_import_reuses_the_imported_name() {
    let source = tempfile::tempdir().unwrap();
    let bundle = source.path().join("site.dt");
    fs::write(
        &bundle,
        "<data.csv>\nhost\nr1\n</data.csv>\n<template.j2>{{ host }}</template.j2>\n",
    )
    .unwrap();
    let workspace = tempfile::tempdir().unwrap();

    datatemplate(workspace.path())
        .arg("import")
        .arg(&bundle)
        .assert()
        .success();
    datatemplate(workspace.path())
        .arg("export")
        .assert()
        .success();

    let exported = fs::read_to_string(workspace.path().join("site.dt")).unwrap();
    assert!(exported.contains("<template.j2>\n{{ host }}\n</template.j2>"));
    assert!(!workspace.path().join("datatemplate.dt").exists());

    datatemplate(workspace.path())
        .args(["export", "--format", "html", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<title>site.dt</title>"));
}

#[test]
fn unknown_charset_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("template.j2"), "t").unwrap();
    datatemplate(temp.path())
        .env("DATATEMPLATE_CHARSET", "latin-2")
        .arg("share")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid transport charset"))
        .stderr(predicate::str::contains("unknown transport charset 'latin-2'"));
}

#[test]
fn repository_config_applies_from_a_subdirectory() {
    let temp = tempfile::tempdir().unwrap();
    let repo = temp.path().join("repo");
    fs::create_dir_all(repo.join(".git")).unwrap();
    fs::create_dir_all(repo.join(".datatemplate")).unwrap();
    fs::write(
        repo.join(".datatemplate/config.toml"),
        "[share]\nbase_url = \"https://repo.test/\"\n",
    )
    .unwrap();
    let nested = repo.join("sites/east");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("template.j2"), "t").unwrap();

    Command::cargo_bin("datatemplate")
        .expect("binary exists")
        .current_dir(&nested)
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join("config"))
        .env_remove("DATATEMPLATE_BASE_URL")
        .env_remove("DATATEMPLATE_CHARSET")
        .arg("share")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("https://repo.test/?"));
}
