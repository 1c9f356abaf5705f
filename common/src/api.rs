use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::operation::{Operation, OperationId, Parameters, SaveMode};
use crate::result::ResultDescriptor;
use crate::spec::OperationTypeSpec;

/// Ventana `start`/`end` opcional de una consulta de resultado. Los extremos
/// abiertos no se mandan y el servidor usa el rango completo.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl Bounds {
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }

    pub fn full() -> Self {
        Self::default()
    }

    pub fn query(&self) -> Vec<(&'static str, f64)> {
        let mut query = Vec::new();
        if let Some(start) = self.start {
            query.push(("start", start));
        }
        if let Some(end) = self.end {
            query.push(("end", end));
        }
        query
    }
}

/// Todo lo que el motor necesita del servidor de procesado.
#[async_trait]
pub trait ProcessApi: Send + Sync {
    async fn specifications(&self, process: &str) -> Result<Vec<OperationTypeSpec>, ApiError>;

    async fn list_operations(&self, process: &str) -> Result<Vec<Operation>, ApiError>;

    /// Operación completa, con su petición y la especificación resuelta.
    async fn get_operation(&self, process: &str, id: OperationId) -> Result<Operation, ApiError>;

    async fn save_operation(
        &self,
        process: &str,
        mode: SaveMode,
        request: &Parameters,
    ) -> Result<Operation, ApiError>;

    async fn remove_operation(&self, process: &str, id: OperationId) -> Result<(), ApiError>;

    async fn results(
        &self,
        process: &str,
        id: OperationId,
    ) -> Result<Vec<ResultDescriptor>, ApiError>;

    /// Payload crudo de un único resultado, acotado a `bounds`.
    async fn result_value(
        &self,
        process: &str,
        id: OperationId,
        role: &str,
        bounds: Bounds,
    ) -> Result<Value, ApiError>;
}
