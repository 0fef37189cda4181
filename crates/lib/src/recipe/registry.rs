use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::Recipe;

/// Builds a fresh recipe instance for one invocation.
pub type RecipeFactory = Box<dyn Fn() -> Arc<dyn Recipe> + Send + Sync>;

/// Recipes known to a host, by name.
///
/// Each invocation gets its own instance from the factory.
#[derive(Default)]
pub struct RecipeRegistry {
  factories: BTreeMap<String, RecipeFactory>,
}

impl RecipeRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a factory; a second registration under the same name replaces
  /// the first.
  pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
  where
    F: Fn() -> Arc<dyn Recipe> + Send + Sync + 'static,
  {
    let name = name.into();
    if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
      debug!(recipe = %name, "replaced recipe factory");
    }
    self
  }

  pub fn instantiate(&self, name: &str) -> Option<Arc<dyn Recipe>> {
    self.factories.get(name).map(|factory| factory())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.factories.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.factories.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.factories.len()
  }

  pub fn is_empty(&self) -> bool {
    self.factories.is_empty()
  }
}

impl std::fmt::Debug for RecipeRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RecipeRegistry")
      .field("recipes", &self.factories.keys().collect::<Vec<_>>())
      .finish()
  }
}
