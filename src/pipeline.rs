use kbplacer_layout::{parse_layout, LayoutError, Value};
use kbplacer_place::{FootprintCatalog, PlacementEngine, PlacementError};
use kbplacer_route::MatrixRouter;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PlacerConfig;
use crate::report::Report;

/// Errors that stop a run before anything reaches the host.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
}

/// Parse, place and optionally route one layout.
///
/// Each run builds its own layout, placements and routing graph, so one
/// pipeline can serve any number of layouts.
pub struct Pipeline {
    config: PlacerConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: PlacerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PlacerConfig {
        &self.config
    }

    pub fn run(
        &self,
        document: &Value,
        catalog: &dyn FootprintCatalog,
    ) -> Result<Report, PipelineError> {
        let parsed = parse_layout(document, &self.config.parse)?;
        for warning in &parsed.warnings {
            warn!(?warning, "layout warning");
        }

        let placed =
            PlacementEngine::new(self.config.placement.clone()).place(&parsed.layout, catalog)?;
        let routed = self.config.route.as_ref().map(|config| {
            info!("routing switch matrix");
            MatrixRouter::new(config.clone()).route(&placed.placements)
        });

        let report = Report::new(parsed, placed, routed);
        info!(
            footprints = report.placements.len(),
            connections = report.connections.len(),
            unresolved = report.unresolved.len(),
            unrouted = report.unrouted.len(),
            "run finished"
        );
        Ok(report)
    }
}
