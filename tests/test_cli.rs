//! CLI end-to-end tests.
//!
//! These tests spawn the `phpimports` binary against throwaway projects.
//!
//! Exit code expectations:
//! - 0: Success, with or without changes
//! - 1: The file cannot be fixed (parse or structural error)
//! - 2: The project cannot be loaded (I/O, config, classmap, no root)

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run phpimports with given arguments and return (stdout, stderr, exit_code).
fn run_phpimports(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_phpimports"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute phpimports");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A composer project with one model class under `src/`.
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "composer.json", "{}\n");
    write(
        dir.path(),
        "src/Models/Foo.php",
        "<?php\n\nnamespace App\\Models;\n\nclass Foo\n{\n}\n",
    );
    dir
}

const CONTROLLER: &str = "<?php

namespace App\\Http;

class Controller
{
    public function show()
    {
        return new Foo();
    }
}
";

const FIXED_CONTROLLER: &str = "<?php

namespace App\\Http;

use App\\Models\\Foo;

class Controller
{
    public function show()
    {
        return new Foo();
    }
}
";

#[test]
fn test_prints_fixed_file_to_stdout() {
    let dir = project();
    write(dir.path(), "src/Http/Controller.php", CONTROLLER);
    let file = dir.path().join("src/Http/Controller.php");

    let (stdout, _stderr, exit_code) = run_phpimports(&[file.to_str().unwrap()]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, FIXED_CONTROLLER);
    assert_eq!(fs::read_to_string(&file).unwrap(), CONTROLLER);
}

#[test]
fn test_write_rewrites_file_in_place() {
    let dir = project();
    write(dir.path(), "src/Http/Controller.php", CONTROLLER);
    let file = dir.path().join("src/Http/Controller.php");

    let (stdout, _stderr, exit_code) = run_phpimports(&["--write", file.to_str().unwrap()]);
    assert_eq!(exit_code, 0);
    assert!(stdout.is_empty());
    assert_eq!(fs::read_to_string(&file).unwrap(), FIXED_CONTROLLER);
}

#[test]
fn test_classmap_is_used_when_present() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "composer.json", "{}\n");
    write(
        dir.path(),
        "vendor/composer/autoload_classmap.php",
        "<?php\nreturn array(\n    'App\\\\Models\\\\Foo' => $baseDir . '/app/Models/Foo.php',\n);\n",
    );
    write(dir.path(), "app/Http/Controller.php", CONTROLLER);
    let file = dir.path().join("app/Http/Controller.php");

    let (stdout, _stderr, exit_code) = run_phpimports(&[file.to_str().unwrap()]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, FIXED_CONTROLLER);
}

#[test]
fn test_two_namespaces_leave_file_untouched() {
    let dir = project();
    let source = "<?php\nnamespace First {\n    class A {}\n}\nnamespace Second {\n    class B extends A {}\n}\n";
    write(dir.path(), "src/Two.php", source);
    let file = dir.path().join("src/Two.php");

    let (stdout, stderr, exit_code) = run_phpimports(&["--write", file.to_str().unwrap()]);
    assert_eq!(exit_code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("line 5"), "stderr: {stderr}");
    assert_eq!(fs::read_to_string(&file).unwrap(), source);
}

#[test]
fn test_parse_error_reports_location() {
    let dir = project();
    write(dir.path(), "src/Broken.php", "<?php\nclass A {\n");
    let file = dir.path().join("src/Broken.php");

    let (_stdout, stderr, exit_code) = run_phpimports(&[file.to_str().unwrap()]);
    assert_eq!(exit_code, 1);
    assert!(stderr.contains("parse error"), "stderr: {stderr}");
    assert!(stderr.contains("-->"), "stderr: {stderr}");
}

#[test]
fn test_unresolved_reference_is_a_warning() {
    let dir = project();
    let source = "<?php\nnamespace App;\n\nnew Missing();\n";
    write(dir.path(), "src/Uses.php", source);
    let file = dir.path().join("src/Uses.php");

    let (stdout, stderr, exit_code) = run_phpimports(&[file.to_str().unwrap()]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, source);
    assert!(stderr.contains("warning[W0001]"), "stderr: {stderr}");
    assert!(stderr.contains("Missing"), "stderr: {stderr}");
}

#[test]
fn test_explicit_root_and_config() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".phpimports.toml", "source_dirs = [\"code\"]\nignore = [\"Foo\"]\n");
    write(
        dir.path(),
        "code/Foo.php",
        "<?php\nnamespace Lib;\nclass Foo {}\nclass Bar {}\n",
    );
    write(dir.path(), "code/Use.php", "<?php\nnamespace App;\n\nnew Foo(new Bar());\n");
    let file = dir.path().join("code/Use.php");

    let (stdout, _stderr, exit_code) = run_phpimports(&[
        "--root",
        dir.path().to_str().unwrap(),
        file.to_str().unwrap(),
    ]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "<?php\n\nnamespace App;\n\nuse Lib\\Bar;\n\nnew Foo(new Bar());\n");
}

#[test]
fn test_missing_file_exits_2() {
    let dir = project();
    let file = dir.path().join("src/Nope.php");

    let (stdout, stderr, exit_code) = run_phpimports(&[file.to_str().unwrap()]);
    assert_eq!(exit_code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("failed to read"), "stderr: {stderr}");
}

#[test]
fn test_invalid_config_exits_2() {
    let dir = project();
    write(dir.path(), ".phpimports.toml", "classmap = \"yes\"\n");
    write(dir.path(), "src/Http/Controller.php", CONTROLLER);
    let file = dir.path().join("src/Http/Controller.php");

    let (_stdout, _stderr, exit_code) = run_phpimports(&[file.to_str().unwrap()]);
    assert_eq!(exit_code, 2);
}
