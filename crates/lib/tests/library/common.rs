//! Shared fixtures for library integration tests.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use recipekit_lib::generate::{Generator, GeneratorContext, GeneratorError, GeneratorRegistry};
use recipekit_lib::lifecycle::{Invocation, LifecycleError, LoadContext};
use recipekit_lib::recipe::{HasRequirements, HasSource, Recipe, RecipeConfig, Requirements, SourceCtx};
use recipekit_lib::settings::{AxisVocabulary, SettingsMatrix};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Build a zip archive in memory.
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
  let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
  for (path, contents) in files {
    writer.start_file(*path, SimpleFileOptions::default()).unwrap();
    writer.write_all(contents.as_bytes()).unwrap();
  }
  writer.finish().unwrap().into_inner()
}

/// A recipe assembled from plain data, recording the order its hooks ran in.
pub struct TestRecipe {
  pub config: RecipeConfig,
  pub requirements: Vec<(String, Option<String>)>,
  pub sources: Vec<(String, PathBuf)>,
  pub calls: Mutex<Vec<&'static str>>,
}

impl TestRecipe {
  pub fn new(generators: &[&str]) -> Self {
    Self {
      config: RecipeConfig::new("compressor", "0.1.0")
        .settings(["os", "compiler", "build_type", "arch"])
        .generators(generators.iter().copied()),
      requirements: Vec::new(),
      sources: Vec::new(),
      calls: Mutex::new(Vec::new()),
    }
  }

  pub fn requirement(mut self, reference: &str, constraint: Option<&str>) -> Self {
    self
      .requirements
      .push((reference.to_string(), constraint.map(str::to_string)));
    self
  }

  pub fn source(mut self, url: &str, destination: &str) -> Self {
    self.sources.push((url.to_string(), PathBuf::from(destination)));
    self
  }

  pub fn calls(&self) -> Vec<&'static str> {
    self.calls.lock().unwrap().clone()
  }
}

impl Recipe for TestRecipe {
  fn config(&self) -> &RecipeConfig {
    &self.config
  }

  fn as_requirements(&self) -> Option<&dyn HasRequirements> {
    Some(self)
  }

  fn as_source(&self) -> Option<&dyn HasSource> {
    (!self.sources.is_empty()).then_some(self as &dyn HasSource)
  }
}

impl HasRequirements for TestRecipe {
  fn requirements(&self, reqs: &mut Requirements) {
    self.calls.lock().unwrap().push("requirements");
    for (reference, constraint) in &self.requirements {
      reqs.add_requirement(reference, constraint.as_deref());
    }
  }
}

impl HasSource for TestRecipe {
  fn source(&self, ctx: &mut SourceCtx) {
    self.calls.lock().unwrap().push("source");
    for (url, destination) in &self.sources {
      ctx.get(url, destination);
    }
  }
}

/// Writes `<name>.out` into the output directory.
pub struct FileGenerator(pub &'static str);

impl Generator for FileGenerator {
  fn name(&self) -> &str {
    self.0
  }

  fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<PathBuf>, GeneratorError> {
    let content = format!("{} for {}\n", self.0, ctx.recipe.reference());
    Ok(vec![ctx.write(&format!("{}.out", self.0), &content)?])
  }
}

/// Always fails.
pub struct FailingGenerator(pub &'static str);

impl Generator for FailingGenerator {
  fn name(&self) -> &str {
    self.0
  }

  fn generate(&self, _ctx: &GeneratorContext<'_>) -> Result<Vec<PathBuf>, GeneratorError> {
    Err(GeneratorError::Failed(format!("{} cannot produce output", self.0)))
  }
}

/// Host-side inputs plus a scratch directory acting as the recipe root.
pub struct TestHost {
  pub vocabulary: AxisVocabulary,
  pub bindings: SettingsMatrix,
  pub generators: GeneratorRegistry,
  pub temp: TempDir,
}

impl TestHost {
  pub fn new() -> Self {
    Self {
      vocabulary: AxisVocabulary::default(),
      bindings: SettingsMatrix::new()
        .with("os", "Linux")
        .with("arch", "x86_64")
        .with("compiler", "gcc")
        .with("build_type", "Release"),
      generators: GeneratorRegistry::with_builtins(),
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn register(mut self, generator: impl Generator + 'static) -> Self {
    self.generators.register(generator);
    self
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn output(&self) -> PathBuf {
    self.temp.path().join("out")
  }

  pub fn load(&self, recipe: Arc<dyn Recipe>) -> Result<Invocation, LifecycleError> {
    let output = self.output();
    Invocation::load(
      recipe,
      LoadContext {
        vocabulary: &self.vocabulary,
        bindings: &self.bindings,
        generators: &self.generators,
        root: self.root(),
        output_folder: &output,
      },
    )
  }
}
