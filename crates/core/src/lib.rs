pub mod appliance;
pub mod artifact;
pub mod config;
pub mod directory;
pub mod orchestrator;
pub mod report;
pub mod store;
pub mod testing;
pub mod ticketing;

pub use appliance::{ApplianceError, FazClient, ReportAppliance, ReportSettings};
pub use artifact::{ArtifactError, ArtifactWriter};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use directory::{DirectoryError, DirectoryResolver, LdapDirectoryResolver};
pub use orchestrator::{
    OrchestratorConfig, OrchestratorError, ReportOrchestrator, RunInput, RunSummary,
};
pub use report::{
    parse_flat_list, AggregatePolicy, FlatListError, ReportArtifact, ReportUser, ReportWindow,
    TicketAggregate,
};
pub use store::{ProcessedStatus, SqliteWorkItemStore, StoreError, TableLayout, WorkItemStore};
pub use ticketing::{NaumenClient, TicketingError, TicketingSystem};
