use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::OperationTypeSpec;

pub type OperationId = i64;

/// Cuerpo de petición de una operación: `type`, `lastResult` opcional y los
/// valores de parámetros propios de la operación, todo al primer nivel.
pub type Parameters = Map<String, Value>;

pub const TYPE_KEY: &str = "type";
pub const LAST_RESULT_KEY: &str = "lastResult";
pub const SPECIFICATION_KEY: &str = "specification";

/// Una etapa del pipeline de un proceso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OperationId,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub failed: bool,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Solo viene cuando la operación se pidió de forma individual.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_request: Option<Parameters>,
}

impl Operation {
    pub fn status(&self) -> (bool, bool) {
        (self.done, self.failed)
    }

    /// `lastResult` con el que se creó la operación.
    pub fn original_last_result(&self) -> Option<&Value> {
        self.operation_request
            .as_ref()
            .and_then(|req| req.get(LAST_RESULT_KEY))
    }

    /// Separa la petición guardada en la especificación resuelta y el resto de
    /// valores de parámetros.
    pub fn split_request(
        &self,
    ) -> Result<(Option<OperationTypeSpec>, Parameters), serde_json::Error> {
        let mut params = self.operation_request.clone().unwrap_or_default();
        let spec = match params.remove(SPECIFICATION_KEY) {
            Some(Value::Null) | None => None,
            Some(raw) => Some(serde_json::from_value(raw)?),
        };
        Ok((spec, params))
    }
}

/// `{ idList: [...] }` que devuelve el endpoint de lista de operaciones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationList {
    #[serde(default)]
    pub id_list: Vec<Operation>,
}

/// Dónde acaba una petición guardada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Al final del proceso; el id lo asigna el servidor.
    Append,
    /// Guardada en una operación existente.
    At(OperationId),
    /// Sobrescribe una operación existente en su sitio.
    Replace(OperationId),
}

/// El servidor contesta a un guardado con la operación guardada o solo con
/// el id que asignó.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SaveResponse {
    Operation(Operation),
    Id(OperationId),
}

impl SaveResponse {
    pub fn into_operation(self, submitted: &Parameters) -> Operation {
        match self {
            SaveResponse::Operation(op) => op,
            SaveResponse::Id(id) => Operation {
                id,
                done: false,
                failed: false,
                kind: submitted
                    .get(TYPE_KEY)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                description: None,
                operation_request: Some(submitted.clone()),
            },
        }
    }
}
