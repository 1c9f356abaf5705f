//! `ProcessApi` en memoria para los tests unitarios.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{Bounds, ProcessApi};
use crate::error::ApiError;
use crate::operation::{Operation, OperationId, Parameters, SaveMode, SaveResponse};
use crate::result::ResultDescriptor;
use crate::spec::OperationTypeSpec;

pub fn op(id: OperationId, done: bool, failed: bool) -> Operation {
    Operation {
        id,
        done,
        failed,
        kind: "NEGATE".to_string(),
        description: None,
        operation_request: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Specs { process: String },
    List { process: String },
    Get { process: String, id: OperationId },
    Save { process: String, mode: SaveMode, request: Parameters },
    Remove { process: String, id: OperationId },
    Results { process: String, id: OperationId },
    ResultValue { process: String, id: OperationId, role: String, bounds: Bounds },
}

#[derive(Default)]
struct State {
    specs: Vec<OperationTypeSpec>,
    operations: Vec<Operation>,
    stored: HashMap<OperationId, Operation>,
    results: Vec<ResultDescriptor>,
    result_value: Option<Value>,
    fail_next: Option<u16>,
    next_id: OperationId,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.state.lock().unwrap().next_id = 100;
        api
    }

    pub fn with_specs(self, specs: Vec<OperationTypeSpec>) -> Self {
        self.state.lock().unwrap().specs = specs;
        self
    }

    pub fn with_operations(self, operations: Vec<Operation>) -> Self {
        self.set_operations(operations);
        self
    }

    pub fn with_operation(self, operation: Operation) -> Self {
        self.state
            .lock()
            .unwrap()
            .stored
            .insert(operation.id, operation);
        self
    }

    pub fn with_results(self, results: Vec<ResultDescriptor>) -> Self {
        self.set_results(results);
        self
    }

    pub fn with_result_value(self, value: Value) -> Self {
        self.state.lock().unwrap().result_value = Some(value);
        self
    }

    pub fn set_operations(&self, operations: Vec<Operation>) {
        self.state.lock().unwrap().operations = operations;
    }

    pub fn set_results(&self, results: Vec<ResultDescriptor>) {
        self.state.lock().unwrap().results = results;
    }

    /// Hace que la siguiente llamada, sea cual sea, falle con `status`.
    pub fn fail_next(&self, status: u16) {
        self.state.lock().unwrap().fail_next = Some(status);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::List { .. }))
            .count()
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(status) => Err(ApiError::rejected(status, "fallo inyectado")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProcessApi for FakeApi {
    async fn specifications(&self, process: &str) -> Result<Vec<OperationTypeSpec>, ApiError> {
        self.record(Call::Specs {
            process: process.to_string(),
        })?;
        Ok(self.state.lock().unwrap().specs.clone())
    }

    async fn list_operations(&self, process: &str) -> Result<Vec<Operation>, ApiError> {
        self.record(Call::List {
            process: process.to_string(),
        })?;
        Ok(self.state.lock().unwrap().operations.clone())
    }

    async fn get_operation(&self, process: &str, id: OperationId) -> Result<Operation, ApiError> {
        self.record(Call::Get {
            process: process.to_string(),
            id,
        })?;
        self.state
            .lock()
            .unwrap()
            .stored
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::rejected(404, "no existe la operación"))
    }

    async fn save_operation(
        &self,
        process: &str,
        mode: SaveMode,
        request: &Parameters,
    ) -> Result<Operation, ApiError> {
        self.record(Call::Save {
            process: process.to_string(),
            mode,
            request: request.clone(),
        })?;
        let mut state = self.state.lock().unwrap();
        let id = match mode {
            SaveMode::Replace(id) => id,
            SaveMode::Append | SaveMode::At(_) => {
                state.next_id += 1;
                state.next_id
            }
        };
        Ok(SaveResponse::Id(id).into_operation(request))
    }

    async fn remove_operation(&self, process: &str, id: OperationId) -> Result<(), ApiError> {
        self.record(Call::Remove {
            process: process.to_string(),
            id,
        })
    }

    async fn results(
        &self,
        process: &str,
        id: OperationId,
    ) -> Result<Vec<ResultDescriptor>, ApiError> {
        self.record(Call::Results {
            process: process.to_string(),
            id,
        })?;
        Ok(self.state.lock().unwrap().results.clone())
    }

    async fn result_value(
        &self,
        process: &str,
        id: OperationId,
        role: &str,
        bounds: Bounds,
    ) -> Result<Value, ApiError> {
        self.record(Call::ResultValue {
            process: process.to_string(),
            id,
            role: role.to_string(),
            bounds,
        })?;
        self.state
            .lock()
            .unwrap()
            .result_value
            .clone()
            .ok_or_else(|| ApiError::rejected(404, "no existe el resultado"))
    }
}
