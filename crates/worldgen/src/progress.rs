use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Pipeline stages, in execution order. The pipeline only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    GenerateFractals,
    MergeProjections,
    MapEcosystems,
    BuildPlaces,
    AssignExits,
    RepairConnectivity,
    EnhanceConnectivity,
    LayoutOptimize,
    Done,
}

impl Stage {
    pub const ORDER: [Stage; 9] = [
        Stage::GenerateFractals,
        Stage::MergeProjections,
        Stage::MapEcosystems,
        Stage::BuildPlaces,
        Stage::AssignExits,
        Stage::RepairConnectivity,
        Stage::EnhanceConnectivity,
        Stage::LayoutOptimize,
        Stage::Done,
    ];

    /// The stage after this one; `Done` is terminal.
    pub fn next(self) -> Stage {
        let i = Stage::ORDER.iter().position(|s| *s == self).unwrap_or(Stage::ORDER.len() - 1);
        Stage::ORDER[(i + 1).min(Stage::ORDER.len() - 1)]
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::GenerateFractals => "generate_fractals",
            Stage::MergeProjections => "merge_projections",
            Stage::MapEcosystems => "map_ecosystems",
            Stage::BuildPlaces => "build_places",
            Stage::AssignExits => "assign_exits",
            Stage::RepairConnectivity => "repair_connectivity",
            Stage::EnhanceConnectivity => "enhance_connectivity",
            Stage::LayoutOptimize => "layout_optimize",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stage-boundary callbacks from a running generation.
pub trait GenerationObserver {
    fn stage_started(&mut self, _stage: Stage) {}
    fn stage_finished(&mut self, _stage: Stage, _elapsed: Duration) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl GenerationObserver for NoopObserver {}

/// Cooperative cancellation flag, checked between stages.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_to_done() {
        let mut stage = Stage::GenerateFractals;
        let mut seen = vec![stage];
        while stage != Stage::Done {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(seen, Stage::ORDER.to_vec());
        assert_eq!(Stage::Done.next(), Stage::Done);
    }

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
