use std::fmt;

/// CPU architectures the host can detect for the `arch` settings axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86,
  X86_64,
  Armv8,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86" => Some(Self::X86),
      "x86_64" => Some(Self::X86_64),
      "aarch64" => Some(Self::Armv8),
      _ => None,
    }
  }

  /// Returns the value bound to the `arch` settings axis
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::X86_64 => "x86_64",
      Self::Armv8 => "armv8",
    }
  }

  /// Returns the `CMAKE_SYSTEM_PROCESSOR` matching a bound `arch` value
  pub fn cmake_processor(value: &str) -> Option<&'static str> {
    match value {
      "x86" => Some("x86"),
      "x86_64" => Some("x86_64"),
      "armv8" => Some("aarch64"),
      _ => None,
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn aarch64_is_armv8() {
    assert_eq!(Arch::Armv8.as_str(), "armv8");
    assert_eq!(Arch::cmake_processor("armv8"), Some("aarch64"));
  }
}
