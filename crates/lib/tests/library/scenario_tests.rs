//! End-to-end lifecycle runs against a local HTTP server.

use std::fs;
use std::sync::Arc;

use recipekit_lib::fetch::HttpArchiveFetcher;
use recipekit_lib::index::{MemoryIndex, PackageRecord};
use recipekit_lib::lifecycle::{LifecycleError, LifecycleState, Step};
use recipekit_lib::recipe::VersionConstraint;

use super::common::{FailingGenerator, FileGenerator, TestHost, TestRecipe, zip_bytes};

fn libfoo_index() -> MemoryIndex {
  MemoryIndex::new()
    .with(PackageRecord::new("libfoo", "1.1.0", "/pkgs/libfoo-1.1"))
    .with(PackageRecord::new("libfoo", "1.4.2", "/pkgs/libfoo-1.4"))
}

#[tokio::test]
async fn full_lifecycle_reaches_generated() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", "/a.zip")
    .with_status(200)
    .with_body(zip_bytes(&[("exprtk/exprtk.hpp", "// exprtk"), ("exprtk/license.txt", "MIT")]))
    .expect(1)
    .create_async()
    .await;

  let host = TestHost::new()
    .register(FileGenerator("ToolchainGen"))
    .register(FileGenerator("DepsGen"));
  let recipe = Arc::new(
    TestRecipe::new(&["ToolchainGen", "DepsGen"])
      .requirement("libfoo", Some(">=1.2"))
      .source(&format!("{}/a.zip", server.url()), "deps"),
  );

  let mut inv = host.load(recipe.clone()).unwrap();
  inv.collect_requirements().unwrap();
  inv.materialize_source(&HttpArchiveFetcher::new()).await.unwrap();
  let graph = inv.resolve(&libfoo_index()).unwrap();
  assert_eq!(graph.get("libfoo").unwrap().version, "1.4.2");
  inv.generate(&host.generators).unwrap();

  assert_eq!(inv.state(), LifecycleState::Generated);
  mock.assert_async().await;

  let deps = host.root().join("deps");
  assert_eq!(fs::read_to_string(deps.join("exprtk/exprtk.hpp")).unwrap(), "// exprtk");
  assert!(deps.join("exprtk/license.txt").is_file());
  assert!(host.output().join("ToolchainGen.out").is_file());
  assert!(host.output().join("DepsGen.out").is_file());
}

#[tokio::test]
async fn unreachable_host_halts_source_step() {
  let host = TestHost::new()
    .register(FileGenerator("ToolchainGen"))
    .register(FileGenerator("DepsGen"));
  // Port 1 is reserved and nothing listens on it.
  let recipe = Arc::new(
    TestRecipe::new(&["ToolchainGen", "DepsGen"])
      .requirement("libfoo", Some(">=1.2"))
      .source("http://127.0.0.1:1/a.zip", "deps"),
  );

  let mut inv = host.load(recipe).unwrap();
  inv.collect_requirements().unwrap();
  let err = inv.materialize_source(&HttpArchiveFetcher::new()).await.unwrap_err();

  assert_eq!(err.kind(), "NetworkError");
  assert_eq!(err.step(), Some(Step::Source));
  assert_eq!(inv.state(), LifecycleState::RequirementsCollected);
  assert_eq!(inv.halted_at(), Some(Step::Source));
  assert!(!host.root().join("deps").exists());

  let reqs = inv.requirements();
  assert_eq!(reqs.len(), 1);
  assert_eq!(reqs[0].name, "libfoo");
  assert!(matches!(reqs[0].constraint, VersionConstraint::Range { .. }));

  assert!(matches!(
    inv.resolve(&libfoo_index()),
    Err(LifecycleError::OutOfOrder { .. })
  ));
}

#[tokio::test]
async fn unreachable_host_leaves_existing_tree_unchanged() {
  let host = TestHost::new().register(FileGenerator("ToolchainGen"));
  let deps = host.root().join("deps");
  fs::create_dir_all(&deps).unwrap();
  fs::write(deps.join("vendored.h"), "// keep me").unwrap();

  let recipe = Arc::new(TestRecipe::new(&["ToolchainGen"]).source("http://127.0.0.1:1/a.zip", "deps"));
  let mut inv = host.load(recipe).unwrap();
  inv.collect_requirements().unwrap();
  inv.materialize_source(&HttpArchiveFetcher::new()).await.unwrap_err();

  assert_eq!(fs::read_to_string(deps.join("vendored.h")).unwrap(), "// keep me");
  assert_eq!(fs::read_dir(&deps).unwrap().count(), 1);
}

#[tokio::test]
async fn failing_generator_does_not_stop_others() {
  let host = TestHost::new()
    .register(FailingGenerator("Bad"))
    .register(FileGenerator("Good"));
  let recipe = Arc::new(TestRecipe::new(&["Bad", "Good"]));

  let mut inv = host.load(recipe).unwrap();
  inv.collect_requirements().unwrap();
  inv.materialize_source(&HttpArchiveFetcher::new()).await.unwrap();
  inv.resolve(&MemoryIndex::new()).unwrap();
  let err = inv.generate(&host.generators).unwrap_err();

  assert!(host.output().join("Good.out").is_file());
  match &err {
    LifecycleError::Generator(failures) => {
      assert_eq!(failures.failed_names(), ["Bad"]);
      assert_eq!(failures.succeeded.len(), 1);
    }
    other => panic!("expected a generator error, got {other}"),
  }
  assert_eq!(err.kind(), "GeneratorError");
  assert!(err.to_string().contains("Bad"));
  assert_eq!(inv.state(), LifecycleState::Resolved);
  assert_eq!(inv.halted_at(), Some(Step::Generate));
}

#[tokio::test]
async fn generator_step_can_be_retried() {
  let host = TestHost::new()
    .register(FailingGenerator("Flaky"))
    .register(FileGenerator("Good"));
  let recipe = Arc::new(TestRecipe::new(&["Flaky", "Good"]));

  let mut inv = host.load(recipe).unwrap();
  inv.collect_requirements().unwrap();
  inv.materialize_source(&HttpArchiveFetcher::new()).await.unwrap();
  inv.resolve(&MemoryIndex::new()).unwrap();
  inv.generate(&host.generators).unwrap_err();

  // The host swaps in a working implementation under the same name.
  let mut fixed = host.generators.clone();
  fixed.register(FileGenerator("Flaky"));
  inv.generate(&fixed).unwrap();
  assert_eq!(inv.state(), LifecycleState::Generated);
  assert!(host.output().join("Flaky.out").is_file());
}
