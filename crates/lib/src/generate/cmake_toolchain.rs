use std::fmt::Write as _;
use std::path::PathBuf;

use super::{Generator, GeneratorContext, GeneratorError, banner, portable};
use crate::platform::{Arch, Os};

pub const TOOLCHAIN_FILE: &str = "recipekit_toolchain.cmake";

/// Writes a CMake toolchain file from the bound settings.
///
/// `CMAKE_SYSTEM_NAME` and `CMAKE_SYSTEM_PROCESSOR` are only set when the
/// bound `os` differs from the running host, since setting them puts CMake
/// into cross-compiling mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct CMakeToolchain;

impl Generator for CMakeToolchain {
  fn name(&self) -> &str {
    "CMakeToolchain"
  }

  fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<PathBuf>, GeneratorError> {
    let content = render(ctx);
    Ok(vec![ctx.write(TOOLCHAIN_FILE, &content)?])
  }
}

fn render(ctx: &GeneratorContext<'_>) -> String {
  let settings = ctx.settings;
  let mut out = banner("#", ctx.recipe);
  out.push_str("include_guard()\n\n");

  if let Some(build_type) = settings.get("build_type") {
    let _ = writeln!(out, "set(CMAKE_BUILD_TYPE \"{}\" CACHE STRING \"\" FORCE)", build_type);
  }

  let host_os = Os::current().map(|os| os.as_str());
  if let Some(os) = settings.get("os")
    && host_os != Some(os)
  {
    let system = Os::cmake_system_name(os).unwrap_or(os);
    let _ = writeln!(out, "set(CMAKE_SYSTEM_NAME {})", system);
    if let Some(arch) = settings.get("arch") {
      let processor = Arch::cmake_processor(arch).unwrap_or(arch);
      let _ = writeln!(out, "set(CMAKE_SYSTEM_PROCESSOR {})", processor);
    }
  }

  if let Some((cc, cxx)) = settings.get("compiler").and_then(compiler_executables) {
    let _ = writeln!(out, "set(CMAKE_C_COMPILER {})", cc);
    let _ = writeln!(out, "set(CMAKE_CXX_COMPILER {})", cxx);
  }

  if let Some(cppstd) = settings.get("compiler.cppstd") {
    let (standard, extensions) = match cppstd.strip_prefix("gnu") {
      Some(std) => (std, "ON"),
      None => (cppstd, "OFF"),
    };
    let _ = writeln!(out, "set(CMAKE_CXX_STANDARD {})", standard);
    let _ = writeln!(out, "set(CMAKE_CXX_EXTENSIONS {})", extensions);
    out.push_str("set(CMAKE_CXX_STANDARD_REQUIRED ON)\n");
  }

  match settings.get("compiler.libcxx") {
    Some("libstdc++11") => out.push_str("add_compile_definitions(_GLIBCXX_USE_CXX11_ABI=1)\n"),
    Some("libstdc++") => out.push_str("add_compile_definitions(_GLIBCXX_USE_CXX11_ABI=0)\n"),
    Some("libc++") => out.push_str("string(APPEND CMAKE_CXX_FLAGS_INIT \" -stdlib=libc++\")\n"),
    _ => {}
  }

  out.push('\n');
  out.push_str("list(PREPEND CMAKE_PREFIX_PATH \"${CMAKE_CURRENT_LIST_DIR}\")\n");
  out.push_str("list(PREPEND CMAKE_MODULE_PATH \"${CMAKE_CURRENT_LIST_DIR}\")\n");
  for package in ctx.graph.packages() {
    let _ = writeln!(
      out,
      "list(APPEND CMAKE_PREFIX_PATH \"{}\")",
      portable(&package.package_folder)
    );
  }
  out
}

fn compiler_executables(compiler: &str) -> Option<(&'static str, &'static str)> {
  match compiler {
    "gcc" => Some(("gcc", "g++")),
    "clang" | "apple-clang" => Some(("clang", "clang++")),
    _ => None,
  }
}
