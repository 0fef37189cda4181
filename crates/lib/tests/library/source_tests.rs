//! Source acquisition behaviour seen through the lifecycle.

use std::sync::Arc;

use recipekit_lib::ConfigError;
use recipekit_lib::fetch::HttpArchiveFetcher;
use recipekit_lib::lifecycle::{LifecycleError, Step};
use recipekit_lib::util::hash::hash_tree;

use super::common::{TestHost, TestRecipe, zip_bytes};

const MARKER: &str = ".recipekit-source";

#[tokio::test]
async fn fetching_twice_yields_identical_tree() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", "/a.zip")
    .with_status(200)
    .with_body(zip_bytes(&[("src/a.c", "int a;"), ("include/a.h", "int a;")]))
    .expect(1)
    .create_async()
    .await;
  let url = format!("{}/a.zip", server.url());
  let host = TestHost::new();
  let fetcher = HttpArchiveFetcher::new();

  let mut first = host.load(Arc::new(TestRecipe::new(&[]).source(&url, "deps"))).unwrap();
  first.collect_requirements().unwrap();
  first.materialize_source(&fetcher).await.unwrap();
  let before = hash_tree(&host.root().join("deps"), &[MARKER]).unwrap();

  let mut second = host.load(Arc::new(TestRecipe::new(&[]).source(&url, "deps"))).unwrap();
  second.collect_requirements().unwrap();
  let materialized = second.materialize_source(&fetcher).await.unwrap();
  assert!(materialized[0].outcome.is_cached());
  let after = hash_tree(&host.root().join("deps"), &[MARKER]).unwrap();

  assert_eq!(before, after);
  mock.assert_async().await;
}

#[tokio::test]
async fn requirements_run_once_before_source() {
  let mut server = mockito::Server::new_async().await;
  let _mock = server
    .mock("GET", "/a.zip")
    .with_status(200)
    .with_body(zip_bytes(&[("a.h", "")]))
    .create_async()
    .await;

  let host = TestHost::new();
  let recipe = Arc::new(
    TestRecipe::new(&[])
      .requirement("exprtk/0.0.2", None)
      .source(&format!("{}/a.zip", server.url()), "deps"),
  );
  let mut inv = host.load(recipe.clone()).unwrap();

  assert!(recipe.calls().is_empty());
  inv.collect_requirements().unwrap();
  inv.materialize_source(&HttpArchiveFetcher::new()).await.unwrap();
  assert!(inv.collect_requirements().is_err());

  assert_eq!(recipe.calls(), ["requirements", "source"]);
}

#[tokio::test]
async fn unknown_axis_fails_before_network() {
  let mut server = mockito::Server::new_async().await;
  let mock = server.mock("GET", "/a.zip").expect(0).create_async().await;

  let host = TestHost::new();
  let mut recipe = TestRecipe::new(&[]).source(&format!("{}/a.zip", server.url()), "deps");
  recipe.config = recipe.config.clone().settings(["compiler.sanitizer"]);

  let err = host.load(Arc::new(recipe)).unwrap_err();
  match err {
    LifecycleError::Configuration {
      step: Step::Load,
      source: ConfigError::UnknownAxis { axis, .. },
    } => assert_eq!(axis, "compiler.sanitizer"),
    other => panic!("unexpected error: {other}"),
  }
  mock.assert_async().await;
}
