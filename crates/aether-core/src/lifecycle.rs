//! Render pipeline lifecycle.

use std::time::Duration;

use serde::Serialize;

/// Phases of rendering one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    /// Matching the URL and building the render plan.
    Resolving,
    /// Constructing modules and negotiating cache times.
    Preloading,
    /// Running modules in declaration order.
    Running,
    /// Feeding module outputs into the template.
    Assembling,
    /// Response ready.
    Done,
    /// Aborted by a fatal error.
    Failed,
}

impl PipelinePhase {
    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: PipelinePhase) -> bool {
        use PipelinePhase::*;
        matches!(
            (self, next),
            (Resolving, Preloading)
                | (Preloading, Running)
                | (Running, Assembling)
                | (Assembling, Done)
                | (Resolving, Failed)
                | (Preloading, Failed)
                | (Running, Failed)
                | (Assembling, Failed)
        )
    }

    /// Whether the pipeline has stopped.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Preloading => "preloading",
            Self::Running => "running",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer trait for lifecycle events.
pub trait LifecycleObserver: Send + Sync {
    /// Called when the pipeline enters a phase.
    fn on_phase(&self, phase: PipelinePhase, elapsed: Duration);
}
