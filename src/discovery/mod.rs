//! Catalog discovery: bundled definitions plus project additions

use conduit_catalog::Catalog;
use tracing::info;

use crate::project::Project;
use crate::ConduitResult;

/// Loads the catalog a project resolves plugins against
pub struct DiscoveryService {
    project: Project,
}

impl DiscoveryService {
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    /// Bundled catalog with the project's `discovery.yml` merged on top
    pub fn load(&self) -> ConduitResult<Catalog> {
        let mut catalog = Catalog::bundled()?;

        let additions_path = self.project.catalog_path();
        if additions_path.is_file() {
            info!("Merging project catalog {:?}", additions_path);
            catalog.merge(Catalog::from_file(&additions_path)?);
        }

        info!(
            "Loaded catalog with {} plugin definitions ({})",
            catalog.len(),
            &catalog.fingerprint()[..12]
        );
        Ok(catalog)
    }

    /// Fetch a remote catalog and merge it over the local one
    #[cfg(feature = "http")]
    pub async fn load_with_remote(&self, url: &str) -> ConduitResult<Catalog> {
        let mut catalog = self.load()?;

        info!("Fetching remote catalog from {}", url);
        let content = reqwest::get(url).await?.error_for_status()?.text().await?;
        catalog.merge(Catalog::from_yaml_str(&content)?);

        Ok(catalog)
    }
}
