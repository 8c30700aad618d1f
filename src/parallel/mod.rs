//! Parallel visits: the previous and next containers stay in the document
//! together so their leave and enter animations overlap.

pub mod cleanup;
pub mod eligibility;
pub mod gate;
pub mod matcher;
pub mod options;
pub mod plugin;
pub mod router;
pub mod swap;

pub use cleanup::{remove_containers, CleanupRegistry, CleanupReport, RemoveContainers};
pub use gate::PhaseGate;
pub use matcher::{match_containers, ContainerSet, DropReason, MatchOutcome};
pub use options::{Keep, PluginOptions};
pub use plugin::{ParallelPlugin, PLUGIN_NAME};
pub use router::PipelineRouter;
pub use swap::{
    insert_containers, InsertContainers, CONTAINER_INDEX_PROPERTY, KEPT_CLASS, NEXT_CLASS, PREVIOUS_CLASS,
    REMOVING_CLASS,
};
