use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_topicgen")))
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Run inside the `pkg` fixture so unit ids are `R/<file>` and its
/// `topicgen.toml` applies.
fn in_pkg() -> assert_cmd::Command {
    let mut c = cmd();
    c.current_dir(fixture_path("pkg"));
    c
}

fn build_pkg() -> TempDir {
    let dir = TempDir::new().unwrap();
    in_pkg()
        .args(["build", "-o", dir.path().to_str().unwrap()])
        .assert()
        .success();
    dir
}

fn write_sources(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, text) in files {
        fs::write(dir.path().join(name), text).unwrap();
    }
    dir
}

// -- build --

#[test]
fn build_writes_topics() {
    let dir = build_pkg();
    let man = dir.path().join("man");
    let mut names: Vec<String> = fs::read_dir(&man)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "Shape-class.Rd",
            "area-methods.Rd",
            "area.Rd",
            "arrange.Rd",
            "filter_rows.Rd",
            "flights.Rd",
            "print.Shape.Rd",
            "tidyverbs-package.Rd",
        ]
    );
}

#[test]
fn build_renders_arrange() {
    let dir = build_pkg();
    let rd = fs::read_to_string(dir.path().join("man/arrange.Rd")).unwrap();
    let expected = "\
% Generated by topicgen: do not edit by hand
% Please edit documentation in R/arrange.R
\\name{arrange}
\\title{Order a data frame by its columns.}
\\description{
Rows are sorted by the given columns, in order.
}
\\usage{
arrange(df, ...)
}
\\arguments{
\\item{df}{A data frame.}

\\item{...}{Columns to order by.}
}
\\value{
The reordered data frame.
}
\\examples{
arrange(mtcars, cyl, desc(disp))
}
\\seealso{
Other verbs: \\code{\\link{filter_rows}}
}
\\alias{arrange}
";
    assert_eq!(rd, expected);
}

#[test]
fn build_inherits_params() {
    let dir = build_pkg();
    let rd = fs::read_to_string(dir.path().join("man/filter_rows.Rd")).unwrap();
    assert!(rd.contains("\\item{cond}{A logical vector.}\n\n\\item{df}{A data frame.}"));
}

#[test]
fn build_merges_methods() {
    let dir = build_pkg();
    let rd = fs::read_to_string(dir.path().join("man/area-methods.Rd")).unwrap();
    assert!(rd.contains("\\docType{methods}\n"));
    assert!(rd.contains("\\title{Area methods}"));
    assert!(rd.contains(
        "\\usage{\n\\S4method{area}{numeric,character}(shape, unit)\n\\S4method{area}{numeric,logical}(shape, unit)\n}"
    ));
    assert!(rd.contains("\\alias{area,numeric,logical-method}"));
}

#[test]
fn build_writes_namespace() {
    let dir = build_pkg();
    let ns = fs::read_to_string(dir.path().join("NAMESPACE")).unwrap();
    assert_eq!(
        ns,
        "# Generated by topicgen: do not edit by hand\n\n\
         S3method(print,Shape)\n\
         export(area)\n\
         export(arrange)\n\
         export(filter_rows)\n\
         exportClasses(Shape)\n\
         exportMethods(area)\n"
    );
}

#[test]
fn build_writes_collation_order() {
    let dir = build_pkg();
    let collate = fs::read_to_string(dir.path().join("COLLATE")).unwrap();
    assert_eq!(collate, "R/arrange.R\nR/data.R\nR/pkg.R\nR/utils.R\nR/shapes.R\n");
}

#[test]
fn build_writes_alias_table() {
    let dir = build_pkg();
    let table = fs::read_to_string(dir.path().join("aliases.tsv")).unwrap();
    assert!(table.contains("combination\tarea(numeric,character)\tarea-methods\n"));
    assert!(table.contains("package\ttidyverbs\ttidyverbs-package\n"));
    assert!(table.contains("class\tShape\tShape-class\n"));
    assert!(table.contains("plain\tarrange\tarrange\n"));
}

#[test]
fn build_json_format() {
    let dir = TempDir::new().unwrap();
    in_pkg()
        .args(["build", "-f", "json", "-o", dir.path().to_str().unwrap()])
        .assert()
        .success();
    let text = fs::read_to_string(dir.path().join("man/arrange.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["id"], "arrange");
    assert_eq!(value["export"], true);
    assert_eq!(value["params"][1]["name"], "...");
}

#[test]
fn build_unknown_format_fails() {
    let dir = TempDir::new().unwrap();
    in_pkg()
        .args(["build", "-f", "pdf", "-o", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format: pdf"));
}

#[test]
fn cycle_is_fatal_and_writes_nothing() {
    let out = TempDir::new().unwrap();
    cmd()
        .args(["build", "-o", out.path().to_str().unwrap()])
        .arg(fixture_path("cycle"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("collation cycle"));
    assert!(!out.path().join("NAMESPACE").exists());
}

#[test]
fn collision_is_fatal() {
    let src = write_sources(&[
        ("a.R", "#' A\n#' @aliases shared\na <- function() 1\n"),
        ("b.R", "#' B\n#' @aliases shared\nb <- function() 2\n"),
    ]);
    let out = TempDir::new().unwrap();
    cmd()
        .args(["build", "-o", out.path().to_str().unwrap()])
        .arg(src.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("alias `shared`"));
}

#[test]
fn unknown_tag_fails_but_writes_other_topics() {
    let src = write_sources(&[("a.R", "#' Good\ngood <- function() 1\n\n#' Bad\n#' @frob\nbad <- function() 2\n")]);
    let out = TempDir::new().unwrap();
    cmd()
        .args(["build", "-o", out.path().to_str().unwrap()])
        .arg(src.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown tag `@frob`"));
    assert!(out.path().join("man/good.Rd").is_file());
}

#[test]
fn unbound_block_warns() {
    let src = write_sources(&[("a.R", "#' Orphan comment\nx()\n#' Real\nf <- function() 1\n")]);
    let out = TempDir::new().unwrap();
    cmd()
        .env("TOPICGEN_LOG", "warn")
        .args(["build", "-o", out.path().to_str().unwrap()])
        .arg(src.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("not followed by a declaration"));
}

#[test]
fn marker_flag_overrides_default() {
    let src = write_sources(&[("a.R", "##' Custom marker\nf <- function() 1\n")]);
    let out = TempDir::new().unwrap();
    cmd()
        .args(["build", "--marker", "##'", "-o", out.path().to_str().unwrap()])
        .arg(src.path())
        .assert()
        .success();
    assert!(out.path().join("man/f.Rd").is_file());
}

#[test]
fn strict_alias_policy_rejects_package_clash() {
    let src = write_sources(&[
        ("pkg.R", "#' The tidy package\n\"_PACKAGE\"\n"),
        ("tidy.R", "#' Tidy something\ntidy <- function(x) x\n"),
    ]);
    let out = TempDir::new().unwrap();
    cmd()
        .args(["build", "--package", "tidy", "-o", out.path().to_str().unwrap()])
        .arg(src.path())
        .assert()
        .success();
    let pkg = fs::read_to_string(out.path().join("man/tidy-package.Rd")).unwrap();
    assert!(pkg.contains("\\alias{package-tidy}\n"));
    assert!(!pkg.contains("\\alias{tidy}\n"));
    let func = fs::read_to_string(out.path().join("man/tidy.Rd")).unwrap();
    assert!(func.contains("\\alias{tidy}\n"));
    cmd()
        .args(["build", "--package", "tidy", "--alias-policy", "strict"])
        .args(["-o", out.path().to_str().unwrap()])
        .arg(src.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("alias `tidy`"));
}

// -- lookup --

#[test]
fn lookup_plain_name() {
    in_pkg()
        .args(["lookup", "arrange"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\\name{arrange}"))
        .stdout(predicate::str::contains("\\item{df}{A data frame.}"));
}

#[test]
fn lookup_qualified() {
    in_pkg()
        .args(["lookup", "package?tidyverbs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\\name{tidyverbs-package}"));
    in_pkg()
        .args(["lookup", "class?Shape"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\\name{Shape-class}"));
}

#[test]
fn lookup_combination_exact() {
    in_pkg()
        .args(["lookup", "area(numeric, character)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\\name{area-methods}"));
}

#[test]
fn lookup_combination_ambiguous() {
    in_pkg()
        .args(["lookup", "area(numeric)"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ambiguous"))
        .stderr(predicate::str::contains("area(numeric,character)"))
        .stderr(predicate::str::contains("area(numeric,logical)"));
}

#[test]
fn lookup_not_found() {
    in_pkg()
        .args(["lookup", "summarise"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no topic matches `summarise`"));
}

#[test]
fn lookup_compiled_scope() {
    let dir = build_pkg();
    cmd()
        .args(["lookup", "--scope", "compiled", "--dir", dir.path().to_str().unwrap()])
        .arg("print.Shape")
        .assert()
        .success()
        .stdout(predicate::str::contains("\\method{print}{Shape}(x, ...)"));
}

#[test]
fn lookup_compiled_scope_missing_dir() {
    let dir = TempDir::new().unwrap();
    cmd()
        .args(["lookup", "--scope", "compiled", "--dir", dir.path().to_str().unwrap()])
        .arg("arrange")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load compiled topics"));
}
