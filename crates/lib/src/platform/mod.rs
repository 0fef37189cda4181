//! Host platform detection.
//!
//! The engine never interprets settings values; this module only supplies
//! the values a host binds by default for `os`, `arch` and `compiler`.

pub mod arch;
pub mod os;
pub mod paths;

pub use arch::Arch;
pub use os::Os;

use crate::settings::SettingsMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// `None` when the running OS or architecture has no settings value.
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  /// `<arch>-<os>` in settings spelling, e.g. `armv8-Macos`.
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch.as_str(), self.os.as_str())
  }

  /// Bind `os`, `arch` and the platform's default `compiler`.
  pub fn bind_defaults(&self, settings: &mut SettingsMatrix) {
    settings.set("os", self.os.as_str());
    settings.set("arch", self.arch.as_str());
    settings.set("compiler", self.os.default_compiler());
  }
}
