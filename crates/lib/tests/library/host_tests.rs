//! Host runtime driving declarative recipes.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use recipekit_lib::host::{Host, HostError, InstallJob};
use recipekit_lib::index::FileIndex;
use recipekit_lib::lifecycle::{LifecycleState, Step};
use recipekit_lib::recipe::ManifestRecipe;
use recipekit_lib::settings::SettingsMatrix;
use tempfile::TempDir;

use super::common::zip_bytes;

fn write_recipe(root: &Path, url: &str) {
  fs::create_dir_all(root).unwrap();
  fs::write(
    root.join("recipe.toml"),
    format!(
      r#"
[recipe]
name = "compressor"
version = "0.1.0"
settings = ["os", "compiler", "build_type", "arch"]
generators = ["CMakeToolchain", "CMakeDeps", "DepsJson"]
requires = ["exprtk/0.0.2"]

[[source]]
url = "{url}"
destination = "."

[layout]
cmake = {{ src_folder = "dependencies" }}
"#
    ),
  )
  .unwrap();
}

fn write_index(dir: &Path) -> FileIndex {
  let path = dir.join("index.toml");
  fs::write(
    &path,
    r#"
[[package]]
name = "exprtk"
version = "0.0.2"
package_folder = "packages/exprtk"
"#,
  )
  .unwrap();
  FileIndex::load(&path).unwrap()
}

fn host(index: FileIndex) -> Host {
  Host::builder()
    .bindings(
      SettingsMatrix::new()
        .with("os", "Linux")
        .with("arch", "x86_64")
        .with("compiler", "gcc")
        .with("build_type", "Release"),
    )
    .index(Arc::new(index))
    .build()
}

#[tokio::test]
async fn manifest_recipe_installs_with_cmake_layout() {
  let mut server = mockito::Server::new_async().await;
  let _mock = server
    .mock("GET", "/exprtk.zip")
    .with_status(200)
    .with_body(zip_bytes(&[("exprtk/exprtk.hpp", "// exprtk")]))
    .create_async()
    .await;

  let temp = TempDir::new().unwrap();
  let root = temp.path().join("compressor");
  write_recipe(&root, &format!("{}/exprtk.zip", server.url()));
  let recipe = ManifestRecipe::load(&root.join("recipe.toml")).unwrap();

  let report = host(write_index(temp.path()))
    .install(Arc::new(recipe), &root)
    .await
    .unwrap();

  assert_eq!(report.state, LifecycleState::Generated);
  assert!(root.join("dependencies/exprtk/exprtk.hpp").is_file());

  let generators = root.join("build/Release/generators");
  assert!(generators.join("recipekit_toolchain.cmake").is_file());
  assert!(generators.join("exprtk-config.cmake").is_file());
  assert!(generators.join("exprtk-config-version.cmake").is_file());
  assert!(generators.join("recipekit_deps.json").is_file());

  let config = fs::read_to_string(generators.join("exprtk-config.cmake")).unwrap();
  let include = temp.path().join("packages/exprtk/include");
  assert!(config.contains(&include.to_string_lossy().replace('\\', "/")));
}

#[tokio::test]
async fn missing_package_fails_resolution() {
  let mut server = mockito::Server::new_async().await;
  let _mock = server
    .mock("GET", "/exprtk.zip")
    .with_status(200)
    .with_body(zip_bytes(&[("exprtk/exprtk.hpp", "")]))
    .create_async()
    .await;

  let temp = TempDir::new().unwrap();
  let root = temp.path().join("compressor");
  write_recipe(&root, &format!("{}/exprtk.zip", server.url()));
  let recipe = ManifestRecipe::load(&root.join("recipe.toml")).unwrap();
  let empty = FileIndex::parse("", &temp.path().join("index.toml")).unwrap();

  let err = host(empty).install(Arc::new(recipe), &root).await.unwrap_err();
  match err {
    HostError::Lifecycle { state, source, .. } => {
      assert_eq!(state, Some(LifecycleState::SourceMaterialized));
      assert_eq!(source.step(), Some(Step::Resolve));
    }
    other => panic!("unexpected {other}"),
  }
}

#[tokio::test]
async fn failed_fetch_keeps_invocation_for_retry() {
  let mut server = mockito::Server::new_async().await;
  let outage = server
    .mock("GET", "/exprtk.zip")
    .with_status(503)
    .expect(1)
    .create_async()
    .await;

  let temp = TempDir::new().unwrap();
  let root = temp.path().join("compressor");
  write_recipe(&root, &format!("{}/exprtk.zip", server.url()));
  let recipe = ManifestRecipe::load(&root.join("recipe.toml")).unwrap();
  let host = host(write_index(temp.path()));

  let err = host.install(Arc::new(recipe), &root).await.unwrap_err();
  outage.assert_async().await;
  let failure = err.lifecycle().unwrap();
  assert_eq!(failure.kind(), "NetworkError");
  assert!(failure.is_retryable());

  let inv = err.into_invocation().unwrap();
  assert_eq!(inv.state(), LifecycleState::RequirementsCollected);
  assert_eq!(inv.halted_at(), Some(Step::Source));
  let requirements: Vec<String> = inv.requirements().iter().map(ToString::to_string).collect();
  assert_eq!(requirements, ["exprtk/0.0.2"]);
  assert_eq!(inv.pending_sources().len(), 1);
  assert!(!root.join("dependencies").exists());

  outage.remove_async().await;
  let _recovered = server
    .mock("GET", "/exprtk.zip")
    .with_status(200)
    .with_body(zip_bytes(&[("exprtk/exprtk.hpp", "// exprtk")]))
    .create_async()
    .await;

  let report = host.resume(inv).await.unwrap();
  assert_eq!(report.state, LifecycleState::Generated);
  assert!(root.join("dependencies/exprtk/exprtk.hpp").is_file());
}

#[tokio::test]
async fn concurrent_installs_share_one_destination() {
  let mut server = mockito::Server::new_async().await;
  let _mock = server
    .mock("GET", "/exprtk.zip")
    .with_status(200)
    .with_body(zip_bytes(&[("exprtk/exprtk.hpp", "// exprtk")]))
    .create_async()
    .await;

  let temp = TempDir::new().unwrap();
  let root = temp.path().join("compressor");
  write_recipe(&root, &format!("{}/exprtk.zip", server.url()));
  let host = host(write_index(temp.path()));

  let jobs = (0..3)
    .map(|_| InstallJob {
      recipe: Arc::new(ManifestRecipe::load(&root.join("recipe.toml")).unwrap()),
      root: root.clone(),
    })
    .collect();

  for result in host.install_all(jobs).await {
    assert_eq!(result.unwrap().state, LifecycleState::Generated);
  }
  assert!(root.join("dependencies/exprtk/exprtk.hpp").is_file());
  let leftovers = fs::read_dir(&root)
    .unwrap()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_name().to_string_lossy().starts_with(".recipekit-"))
    .count();
  assert_eq!(leftovers, 0);
}
