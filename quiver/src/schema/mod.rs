pub mod loader;
pub mod registry;
pub mod store;
pub mod types;

pub use loader::DocumentTypeLoader;
pub use registry::{common_nested_prefix, FieldRegistry, ResolvedField};
pub use store::{
    ConfigChange, ConfigPoller, ConfigSource, ConfigStore, DirectoryConfigSource,
    DocumentTypeKey,
};
pub use types::{DocumentTypeConfig, FieldSpec, FieldType, SortDirection, SortField};
