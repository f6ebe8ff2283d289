//! Resolution pipeline
//!
//! One linear pass per build invocation:
//!
//! `UNLOADED → LOADED → RESOLVED → VARIANT_SELECTED → PUBLISHED`
//!
//! No loops, no re-entry, no cancellation. A stage either completes or the
//! pass fails with the stage's error and the build aborts before the
//! external pipeline is invoked. A pipeline runs at most once, whether or
//! not that run succeeded.
//!
//! Publishing order: external publishers (files) run first, in the order
//! added; the in-process [`SessionSnapshot`] is set only after all of them
//! succeed, since it cannot be taken back.

use std::fmt;
use std::path::PathBuf;

use buildcfg_properties::RawProperties;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigResolver, LayerStack};
use crate::error::{BuildConfigError, BuildConfigResult};
use crate::publish::{ConfigPublisher, PublishError, PublishedConfig, SessionSnapshot};
use crate::variant::{BuildType, VariantSelector};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Unloaded,
    Loaded,
    Resolved,
    VariantSelected,
    Published,
}

impl Stage {
    /// Only the next stage in the pass is reachable
    pub fn can_transition_to(&self, target: Stage) -> bool {
        matches!(
            (self, target),
            (Stage::Unloaded, Stage::Loaded)
                | (Stage::Loaded, Stage::Resolved)
                | (Stage::Resolved, Stage::VariantSelected)
                | (Stage::VariantSelected, Stage::Published)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Unloaded => write!(f, "UNLOADED"),
            Stage::Loaded => write!(f, "LOADED"),
            Stage::Resolved => write!(f, "RESOLVED"),
            Stage::VariantSelected => write!(f, "VARIANT_SELECTED"),
            Stage::Published => write!(f, "PUBLISHED"),
        }
    }
}

/// Inputs for one pass
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// Properties file; `None` skips the file layer entirely
    pub properties_path: Option<PathBuf>,

    /// `-P key=value` overrides
    pub overrides: RawProperties,

    /// Build type name as given by the caller
    pub build_type: String,
}

impl PipelineInputs {
    pub fn new(build_type: impl Into<String>) -> Self {
        Self {
            properties_path: None,
            overrides: RawProperties::new(),
            build_type: build_type.into(),
        }
    }

    pub fn with_properties_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.properties_path = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: RawProperties) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Drives load → resolve → select → publish
pub struct Pipeline<'p> {
    resolver: ConfigResolver,
    selector: VariantSelector,
    publishers: Vec<&'p dyn ConfigPublisher>,
    session: Option<&'p SessionSnapshot>,
    started: bool,
    stage: Stage,
}

impl<'p> Pipeline<'p> {
    pub fn new(resolver: ConfigResolver, selector: VariantSelector) -> Self {
        Self {
            resolver,
            selector,
            publishers: Vec::new(),
            session: None,
            started: false,
            stage: Stage::Unloaded,
        }
    }

    /// Add an external publisher; these run in the order added
    pub fn with_publisher(mut self, publisher: &'p dyn ConfigPublisher) -> Self {
        self.publishers.push(publisher);
        self
    }

    /// Session snapshot, set last once every external publisher succeeded
    pub fn with_session(mut self, session: &'p SessionSnapshot) -> Self {
        self.session = Some(session);
        self
    }

    /// Last stage completed
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run the pass once
    pub fn run(&mut self, inputs: &PipelineInputs) -> BuildConfigResult<PublishedConfig> {
        if self.started {
            return Err(BuildConfigError::Reentry { stage: self.stage });
        }
        self.started = true;

        let file = match inputs.properties_path {
            Some(ref path) => Some(buildcfg_properties::load(path)?),
            None => None,
        };
        self.advance(Stage::Loaded);

        let mut stack = LayerStack::new();
        if let Some(ref file) = file {
            stack = stack.with_properties(file);
        }
        if !inputs.overrides.is_empty() {
            stack = stack.with_overrides(&inputs.overrides);
        }
        let resolution = self.resolver.resolve_layers(&stack)?;
        self.advance(Stage::Resolved);

        let build_type: BuildType = inputs.build_type.parse()?;
        let config = self.selector.select_type(build_type, &resolution.config)?;
        self.advance(Stage::VariantSelected);

        let snapshot = PublishedConfig::new(build_type, config, resolution.origins, stack.sources());
        self.publish(&snapshot)?;
        self.advance(Stage::Published);

        Ok(snapshot)
    }

    fn publish(&self, snapshot: &PublishedConfig) -> Result<(), PublishError> {
        // Fail before any file is written if the session is already taken
        if self.session.is_some_and(SessionSnapshot::is_published) {
            return Err(PublishError::AlreadyPublished);
        }
        for publisher in &self.publishers {
            publisher.publish(snapshot)?;
        }
        match self.session {
            Some(session) => session.publish(snapshot),
            None => Ok(()),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(self.stage.can_transition_to(next), "{} -> {}", self.stage, next);
        tracing::debug!(from = %self.stage, to = %next, "pipeline stage");
        self.stage = next;
    }
}
