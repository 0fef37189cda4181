//! `rk install` and `rk source` against a local HTTP server.

use std::fs;

use predicates::prelude::*;

use super::common::{TestEnv, zip_bytes};

fn recipe(url: &str, generators: &str) -> String {
  format!(
    r#"
[recipe]
name = "compressor"
version = "0.1.0"
settings = ["os", "compiler", "build_type", "arch"]
generators = [{generators}]
requires = ["exprtk/0.0.2"]

[[source]]
url = "{url}"
destination = "."

[layout]
cmake = {{ src_folder = "dependencies" }}
"#
  )
}

const INDEX: &str = r#"
[[package]]
name = "exprtk"
version = "0.0.2"
package_folder = "packages/exprtk"
"#;

fn serve_exprtk(server: &mut mockito::Server) -> mockito::Mock {
  server
    .mock("GET", "/exprtk.zip")
    .with_status(200)
    .with_body(zip_bytes(&[("exprtk/exprtk.hpp", "// exprtk")]))
    .create()
}

#[test]
fn install_produces_toolchain_files() {
  let mut server = mockito::Server::new();
  let _mock = serve_exprtk(&mut server);
  let env = TestEnv::new();
  let dir = env.recipe_dir();
  let url = format!("{}/exprtk.zip", server.url());
  fs::write(
    dir.join("recipe.toml"),
    recipe(&url, r#""CMakeToolchain", "CMakeDeps", "DepsJson""#),
  )
  .unwrap();
  let index = env.write_file("index.toml", INDEX);

  env
    .rk_cmd("install")
    .arg(dir.join("recipe.toml"))
    .args(["-s", "build_type=Debug", "--index"])
    .arg(&index)
    .assert()
    .success()
    .stdout(predicate::str::contains("exprtk/0.0.2 (direct)"))
    .stdout(predicate::str::contains("Installed compressor/0.1.0"));

  let generators = dir.join("build/Debug/generators");
  let toolchain = fs::read_to_string(generators.join("recipekit_toolchain.cmake")).unwrap();
  assert!(toolchain.contains("CMAKE_BUILD_TYPE"));
  assert!(toolchain.contains("Debug"));
  assert!(generators.join("exprtk-config.cmake").is_file());
  assert!(generators.join("recipekit_deps.json").is_file());
  assert!(dir.join("dependencies/exprtk/exprtk.hpp").is_file());
}

#[test]
fn install_json_report() {
  let mut server = mockito::Server::new();
  let _mock = serve_exprtk(&mut server);
  let env = TestEnv::new();
  let dir = env.recipe_dir();
  fs::write(
    dir.join("recipe.toml"),
    recipe(&format!("{}/exprtk.zip", server.url()), r#""DepsJson""#),
  )
  .unwrap();
  let index = env.write_file("index.toml", INDEX);

  let output = env
    .rk_cmd("install")
    .arg(dir.join("recipe.toml"))
    .args(["-s", "build_type=Release", "--format", "json", "--index"])
    .arg(&index)
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["state"], "Generated");
  assert_eq!(report["packages"][0]["name"], "exprtk");
  assert_eq!(report["sources"][0]["cached"], false);
}

#[test]
fn second_install_reuses_source() {
  let mut server = mockito::Server::new();
  let mock = server
    .mock("GET", "/exprtk.zip")
    .with_status(200)
    .with_body(zip_bytes(&[("exprtk/exprtk.hpp", "// exprtk")]))
    .expect(1)
    .create();
  let env = TestEnv::new();
  let dir = env.recipe_dir();
  fs::write(
    dir.join("recipe.toml"),
    recipe(&format!("{}/exprtk.zip", server.url()), r#""DepsJson""#),
  )
  .unwrap();
  let index = env.write_file("index.toml", INDEX);

  for _ in 0..2 {
    env
      .rk_cmd("install")
      .arg(dir.join("recipe.toml"))
      .args(["-s", "build_type=Release", "--index"])
      .arg(&index)
      .assert()
      .success();
  }
  mock.assert();
}

#[test]
fn network_failure_names_source_step() {
  let env = TestEnv::new();
  let dir = env.recipe_dir();
  fs::write(
    dir.join("recipe.toml"),
    recipe("http://127.0.0.1:1/exprtk.zip", r#""DepsJson""#),
  )
  .unwrap();
  let index = env.write_file("index.toml", INDEX);

  env
    .rk_cmd("install")
    .arg(dir.join("recipe.toml"))
    .args(["-s", "build_type=Release", "--index"])
    .arg(&index)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed step: source"))
    .stderr(predicate::str::contains("NetworkError"))
    .stderr(predicate::str::contains("Requirements: exprtk/0.0.2"));

  assert!(!dir.join("dependencies").exists());
}

#[test]
fn network_failure_json_keeps_requirements() {
  let env = TestEnv::new();
  let dir = env.recipe_dir();
  fs::write(
    dir.join("recipe.toml"),
    recipe("http://127.0.0.1:1/exprtk.zip", r#""DepsJson""#),
  )
  .unwrap();
  let index = env.write_file("index.toml", INDEX);

  let output = env
    .rk_cmd("install")
    .arg(dir.join("recipe.toml"))
    .args(["-s", "build_type=Release", "--format", "json", "--index"])
    .arg(&index)
    .output()
    .unwrap();
  assert!(!output.status.success());

  let failure: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(failure["state"], "RequirementsCollected");
  assert_eq!(failure["kind"], "NetworkError");
  assert_eq!(failure["requirements"][0], "exprtk/0.0.2");
}

#[test]
fn missing_package_names_resolve_step() {
  let mut server = mockito::Server::new();
  let _mock = serve_exprtk(&mut server);
  let env = TestEnv::new();
  let dir = env.recipe_dir();
  fs::write(
    dir.join("recipe.toml"),
    recipe(&format!("{}/exprtk.zip", server.url()), r#""DepsJson""#),
  )
  .unwrap();
  let index = env.write_file("index.toml", "");

  env
    .rk_cmd("install")
    .arg(dir.join("recipe.toml"))
    .args(["-s", "build_type=Release", "--index"])
    .arg(&index)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed step: resolve"))
    .stderr(predicate::str::contains("ResolveError"));
}

#[test]
fn source_command_stops_before_generators() {
  let mut server = mockito::Server::new();
  let _mock = serve_exprtk(&mut server);
  let env = TestEnv::new();
  let dir = env.recipe_dir();
  fs::write(
    dir.join("recipe.toml"),
    recipe(&format!("{}/exprtk.zip", server.url()), r#""CMakeToolchain""#),
  )
  .unwrap();

  env
    .rk_cmd("source")
    .arg(dir.join("recipe.toml"))
    .args(["-s", "build_type=Release"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Sources ready for compressor/0.1.0"));

  assert!(dir.join("dependencies/exprtk/exprtk.hpp").is_file());
  assert!(!dir.join("build").exists());
}
