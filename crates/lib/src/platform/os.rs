use std::fmt;

/// Operating systems the host can detect for the `os` settings axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  Macos,
  Windows,
  FreeBsd,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::Macos),
      "windows" => Some(Self::Windows),
      "freebsd" => Some(Self::FreeBsd),
      _ => None,
    }
  }

  /// Returns the value bound to the `os` settings axis
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "Linux",
      Self::Macos => "Macos",
      Self::Windows => "Windows",
      Self::FreeBsd => "FreeBSD",
    }
  }

  /// Returns the compiler a fresh profile assumes on this OS
  pub fn default_compiler(&self) -> &'static str {
    match self {
      Self::Linux => "gcc",
      Self::Macos => "apple-clang",
      Self::Windows => "msvc",
      Self::FreeBsd => "clang",
    }
  }

  /// Returns the `CMAKE_SYSTEM_NAME` matching a bound `os` value
  pub fn cmake_system_name(value: &str) -> Option<&'static str> {
    match value {
      "Linux" => Some("Linux"),
      "Macos" => Some("Darwin"),
      "Windows" => Some("Windows"),
      "FreeBSD" => Some("FreeBSD"),
      _ => None,
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
