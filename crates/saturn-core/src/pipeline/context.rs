use std::path::Path;
use std::sync::Arc;

use crate::engine::ImageEngine;
use crate::error::{Result, SaturnError};
use crate::metadata::MetadataSource;
use crate::registry::Registry;
use crate::resolve::{MasterResolver, ReferenceResolver};

use super::config::RunConfig;
use super::types::{ProgressReporter, RunSummary};

/// Everything one run needs, passed explicitly to each stage.
pub struct RunContext<'a> {
    pub config: &'a RunConfig,
    pub engine: &'a dyn ImageEngine,
    pub metadata: &'a dyn MetadataSource,
    pub registry: Registry,
    pub summary: RunSummary,
    pub reporter: Arc<dyn ProgressReporter>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        config: &'a RunConfig,
        engine: &'a dyn ImageEngine,
        metadata: &'a dyn MetadataSource,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            config,
            engine,
            metadata,
            registry: Registry::new(),
            summary: RunSummary::default(),
            reporter,
        }
    }

    pub fn master_resolver(&self) -> Result<MasterResolver<'a>> {
        let config: &'a RunConfig = self.config;
        let library = config
            .master_library
            .as_deref()
            .ok_or_else(|| SaturnError::Config("master_library is not set".into()))?;
        Ok(MasterResolver {
            library,
            layout: &config.masters,
            tolerances: &config.tolerances,
            aliases: &config.filter_aliases,
            extensions: &config.scan.extensions,
        })
    }

    pub fn reference_resolver(&self) -> Result<ReferenceResolver<'a>> {
        let config: &'a RunConfig = self.config;
        let library: &'a Path = config
            .reference_library
            .as_deref()
            .ok_or_else(|| SaturnError::Config("reference_library is not set".into()))?;
        Ok(ReferenceResolver {
            library,
            layout: &config.references,
            aliases: &config.filter_aliases,
            extensions: &config.scan.extensions,
        })
    }
}
