pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod mock;
pub mod model;
pub mod notice;
pub mod query;
pub mod remote;
pub mod sync;
pub mod telemetry;
pub mod view;

pub use config::AppConfig;
pub use error::{SyncError, TransportError};
pub use model::*;
pub use notice::{MutationKind, Notice, NoticeKind};
pub use query::{QueryKey, QueryPatch, TodoQuery};
pub use remote::{BackendMode, HttpTransport, RemoteClient, TodoTransport};
pub use sync::{FetchOutcome, TodoSync, ViewSnapshot};
pub use view::derive_items;
