//! Motor de cliente para editar pipelines de procesado de lampek sobre la
//! API REST de procesos: catálogo de operaciones, historial por polling,
//! formulario de edición y gráficos de resultados.

pub mod api;
pub mod catalog;
pub mod config;
pub mod defaults;
pub mod editor;
pub mod error;
pub mod history;
pub mod http;
pub mod operation;
pub mod plot;
pub mod range;
pub mod result;
pub mod session;
pub mod spec;

#[cfg(test)]
pub(crate) mod testing;

/* --------- re-exports used by the binaries --------- */

pub use api::{Bounds, ProcessApi};
pub use config::ClientConfig;
pub use error::{ApiError, Rejection};
pub use http::HttpProcessApi;
pub use operation::{Operation, OperationId, Parameters, SaveMode};
pub use result::{ResultDescriptor, ResultPayload};
pub use session::Session;
pub use spec::{OperationTypeSpec, ParamSpec, ResultType, SpecCategory};
