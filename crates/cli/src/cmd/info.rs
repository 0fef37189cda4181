use recipekit_lib::generate::GeneratorRegistry;
use recipekit_lib::platform::{Platform, paths};
use recipekit_lib::settings::Profile;

pub fn cmd_info() {
  println!("recipekit {}", env!("CARGO_PKG_VERSION"));
  match Platform::current() {
    Some(platform) => println!("Platform: {}", platform.triple()),
    _ => println!("Could not detect platform."),
  }
  println!("Config dir: {}", paths::config_dir().display());

  let profile = Profile::default_path();
  let status = if profile.is_file() { "" } else { " (not created)" };
  println!("Default profile: {}{}", profile.display(), status);

  let registry = GeneratorRegistry::with_builtins();
  println!("Generators: {}", registry.names().collect::<Vec<_>>().join(", "));
}
