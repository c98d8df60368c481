//! Oracle orchestrator domain core
//!
//! Pure types and algorithms shared by the ports and adapters: the shape of
//! a chain request event, the HTTP request/response the processor builds and
//! receives, the persisted event row and its idempotence key, the
//! integration-handler configuration record, and the JSON projection
//! (`pick`) engine.
//!
//! This crate MUST NOT depend on a database client, an HTTP client, or an
//! async runtime — everything here is synchronous and side-effect free.

pub mod errors;
pub mod event_row;
pub mod handler;
pub mod http;
pub mod keeper;
pub mod process_result;
pub mod projection;
pub mod request;

pub use errors::DomainError;
pub use event_row::{EventRowStatus, PersistedEventRow};
pub use handler::{AuthKind, HandlerSpec, ValidatorKind};
pub use http::{HttpMethod, HttpRequestSpec, HttpResponse};
pub use keeper::{AuthType, Keeper, SupportedUrl};
pub use process_result::ProcessOutcome;
pub use projection::{pick, PickError};
pub use request::{EventId, NotifyDescriptor, RequestEvent, RequestParams};
