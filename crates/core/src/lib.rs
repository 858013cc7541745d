pub mod config;
pub mod domain;
pub mod errors;
pub mod import;
pub mod store;

pub use domain::customer::{ImportRow, NormalizedCustomer, StagedCustomer};
pub use domain::session::SessionUser;
pub use errors::{ImportError, InterfaceError};
pub use import::{
    filter_valid, normalize, parse, submit_batch, BulkUploadResponse, CustomerBatchGateway,
    CustomerImporter, GatewayError, ImportReport, ImportStatus, ImportWarning, PreparedImport,
    ValidatedBatch,
};
pub use store::{FileStore, InMemoryStore, KeyValueStore, PresetStore, SessionStore, StoreError};
