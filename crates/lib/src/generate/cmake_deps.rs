use std::fmt::Write as _;
use std::path::PathBuf;

use super::{Generator, GeneratorContext, GeneratorError, banner, portable};
use crate::graph::DependencyGraph;
use crate::index::PackageRecord;
use crate::recipe::RecipeConfig;

/// Writes a `find_package` config pair for every resolved package.
///
/// Each package becomes an `INTERFACE IMPORTED` target `<name>::<name>` that
/// links the targets of its own dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct CMakeDeps;

impl Generator for CMakeDeps {
  fn name(&self) -> &str {
    "CMakeDeps"
  }

  fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<PathBuf>, GeneratorError> {
    let mut files = Vec::new();
    for package in ctx.graph.packages() {
      let config = render_config(ctx.recipe, ctx.graph, package);
      files.push(ctx.write(&format!("{}-config.cmake", package.name), &config)?);
      let version = render_version(ctx.recipe, package);
      files.push(ctx.write(&format!("{}-config-version.cmake", package.name), &version)?);
    }
    Ok(files)
  }
}

fn cmake_list<I: IntoIterator<Item = String>>(items: I) -> String {
  items.into_iter().collect::<Vec<_>>().join(";")
}

fn render_config(recipe: &RecipeConfig, graph: &DependencyGraph, package: &PackageRecord) -> String {
  let name = &package.name;
  let target = format!("{0}::{0}", name);
  let deps = graph.dependencies_of(name);

  let mut out = banner("#", recipe);
  out.push_str("include_guard(GLOBAL)\n\n");

  if !deps.is_empty() {
    out.push_str("include(CMakeFindDependencyMacro)\n");
    for dep in &deps {
      let _ = writeln!(out, "find_dependency({} CONFIG)", dep);
    }
    out.push('\n');
  }

  let includes = cmake_list(package.include_paths().iter().map(|p| portable(p)));
  let lib_dirs = cmake_list(package.lib_paths().iter().map(|p| portable(p)));
  let links = cmake_list(
    package
      .libs
      .iter()
      .cloned()
      .chain(deps.iter().map(|dep| format!("{0}::{0}", dep))),
  );
  let defines = cmake_list(package.defines.iter().cloned());

  let _ = writeln!(out, "if(NOT TARGET {})", target);
  let _ = writeln!(out, "  add_library({} INTERFACE IMPORTED)", target);
  let _ = writeln!(out, "  set_target_properties({} PROPERTIES", target);
  let _ = writeln!(out, "    INTERFACE_INCLUDE_DIRECTORIES \"{}\"", includes);
  let _ = writeln!(out, "    INTERFACE_LINK_DIRECTORIES \"{}\"", lib_dirs);
  let _ = writeln!(out, "    INTERFACE_LINK_LIBRARIES \"{}\"", links);
  let _ = writeln!(out, "    INTERFACE_COMPILE_DEFINITIONS \"{}\")", defines);
  out.push_str("endif()\n\n");

  let _ = writeln!(out, "set({}_FOUND TRUE)", name);
  let _ = writeln!(out, "set({}_VERSION \"{}\")", name, package.version);
  let _ = writeln!(out, "set({}_INCLUDE_DIRS \"{}\")", name, includes);
  let _ = writeln!(out, "set({}_LIBRARIES {})", name, target);
  out
}

fn render_version(recipe: &RecipeConfig, package: &PackageRecord) -> String {
  let mut out = banner("#", recipe);
  let _ = writeln!(out, "set(PACKAGE_VERSION \"{}\")\n", package.version);
  out.push_str(
    "if(PACKAGE_FIND_VERSION AND PACKAGE_VERSION VERSION_LESS PACKAGE_FIND_VERSION)\n  \
     set(PACKAGE_VERSION_COMPATIBLE FALSE)\n\
     else()\n  \
     set(PACKAGE_VERSION_COMPATIBLE TRUE)\n  \
     if(PACKAGE_FIND_VERSION STREQUAL PACKAGE_VERSION)\n    \
     set(PACKAGE_VERSION_EXACT TRUE)\n  \
     endif()\n\
     endif()\n",
  );
  out
}
