pub mod auth;
pub mod book;
pub mod export;
pub mod import;
pub mod models;
pub mod mutate;
pub mod registry;
pub mod select;
pub mod stats;
pub mod storage;
pub mod sync;

// Re-export commonly used types
pub use auth::{AuthListener, AuthProvider, AuthenticatedUser, EnvAuthProvider, MemoryAuthProvider};
pub use book::{determine_book_path, list_available_books};
pub use import::{import_clients_csv, import_clients_csv_file, ImportReport};
pub use models::{
    stages_from_template,
    Client,
    ClientBook,
    ContactMethod,
    FollowUpRecord,
    FollowUpResult,
    LabTest,
    Project,
    ProjectStage,
    Requester,
    StageStatus,
    STAGE_TEMPLATE,
};
pub use mutate::{
    ClientEdit, FollowUpEdit, MutateError, NewProject, ProjectEdit, RequesterEdit, StageEdit,
    TestEdit,
};
pub use registry::{get_registry_path, BookEntry, Registry};
pub use select::{selected_client, selected_project, selected_requester, Selection};
pub use stats::{current_stage, pipeline_summary, PipelineSummary};
pub use storage::Storage;
pub use sync::{
    create_store, import_from_json, migrate_sqlite_to_yaml, migrate_yaml_to_sqlite, BackendType,
    DocumentStore, MemoryStore, SqliteStore, StoreConfig, StoreStats, Subscription, SyncSession,
    YamlStore,
};
