use std::path::PathBuf;

use serde::Serialize;

use crate::generate::GeneratorReport;
use crate::lifecycle::{Invocation, LifecycleState};
use crate::recipe::{Capabilities, Layout};
use crate::settings::SettingsMatrix;
use crate::util::hash::ContentHash;

/// Summary of one invocation, suitable for printing or JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
  pub recipe: String,
  pub state: LifecycleState,
  pub capabilities: Capabilities,
  pub settings: SettingsMatrix,
  pub layout: Layout,
  pub requirements: Vec<String>,
  pub sources: Vec<SourceReport>,
  pub packages: Vec<PackageSummary>,
  pub generated: Vec<GeneratorReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
  pub url: String,
  pub destination: PathBuf,
  pub cached: bool,
  pub tree_sha256: ContentHash,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageSummary {
  pub name: String,
  pub version: String,
  pub package_folder: PathBuf,
  pub direct: bool,
}

impl InstallReport {
  pub fn from_invocation(inv: &Invocation) -> Self {
    let sources = inv
      .materialized()
      .iter()
      .map(|m| SourceReport {
        url: m.spec.url.clone(),
        destination: m.destination.clone(),
        cached: m.outcome.is_cached(),
        tree_sha256: m.outcome.tree_sha256().clone(),
      })
      .collect();

    let packages = inv
      .graph()
      .map(|graph| {
        graph
          .packages()
          .map(|p| PackageSummary {
            name: p.name.clone(),
            version: p.version.clone(),
            package_folder: p.package_folder.clone(),
            direct: graph.is_direct(&p.name),
          })
          .collect()
      })
      .unwrap_or_default();

    Self {
      recipe: inv.config().reference(),
      state: inv.state(),
      capabilities: inv.capabilities(),
      settings: inv.settings().clone(),
      layout: inv.layout().clone(),
      requirements: inv.requirements().iter().map(ToString::to_string).collect(),
      sources,
      packages,
      generated: inv.generated().to_vec(),
    }
  }

  /// Every file the generators wrote.
  pub fn generated_files(&self) -> impl Iterator<Item = &PathBuf> {
    self.generated.iter().flat_map(|g| g.files.iter())
  }
}
