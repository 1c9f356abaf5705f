use serde_json::Value;
use tracing::info;

use crate::api::ProcessApi;
use crate::catalog::{prepare_spec, DEFAULT_CATEGORY};
use crate::defaults::defaults_for;
use crate::error::ApiError;
use crate::operation::{Operation, Parameters, SaveMode, LAST_RESULT_KEY, TYPE_KEY};
use crate::spec::OperationTypeSpec;

/// Vecina que hereda la selección tras un borrado.
#[derive(Debug, Clone, PartialEq)]
pub struct NextSelection {
    /// Índice crudo que da la regla. Puede quedar fuera de la lista.
    pub index: i64,
    pub operation: Option<Operation>,
}

/// La operación siguiente a la borrada, o la anterior si la borrada es la
/// última. Se calcula antes de borrar nada.
///
/// Con un solo elemento sale índice `-1` y ninguna operación.
pub fn next_after_removal(operations: &[Operation], selected_index: Option<usize>) -> NextSelection {
    let Some(selected_index) = selected_index else {
        return NextSelection {
            index: -1,
            operation: None,
        };
    };

    let mut next_index = selected_index as i64 + 1;
    if next_index >= operations.len() as i64 {
        next_index -= 2;
    }

    let operation = usize::try_from(next_index)
        .ok()
        .and_then(|i| operations.get(i))
        .cloned();

    NextSelection {
        index: next_index,
        operation,
    }
}

/// Edición en curso de una etapa del pipeline.
#[derive(Debug, Clone)]
pub struct PipelineEditor {
    process: String,
    selected_category: Option<String>,
    selected_spec: Option<OperationTypeSpec>,
    result_name: Option<String>,
    parameters: Parameters,
}

impl PipelineEditor {
    pub fn new(process: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            selected_category: None,
            selected_spec: None,
            result_name: None,
            parameters: Parameters::new(),
        }
    }

    pub fn process(&self) -> &str {
        &self.process
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.selected_category.as_deref()
    }

    pub fn selected_spec(&self) -> Option<&OperationTypeSpec> {
        self.selected_spec.as_ref()
    }

    pub fn result_name(&self) -> Option<&str> {
        self.result_name.as_deref()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Elige un tipo de operación y reinicia el formulario a sus valores por defecto.
    pub fn select_spec(&mut self, spec: OperationTypeSpec) {
        self.parameters = defaults_for(&spec);
        self.selected_category = Some(
            spec.category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        );
        self.selected_spec = Some(spec);
    }

    /// Elige el resultado del que encadena la siguiente operación.
    pub fn select_result(&mut self, role: Option<String>) {
        self.result_name = role;
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    /// Cuerpo de la petición para `spec`, sacado de una copia del formulario:
    /// los parámetros en vivo quedan como los dejó el usuario.
    fn snapshot(&self, spec: &OperationTypeSpec, last_result: Option<Value>) -> Parameters {
        let mut request = self.parameters.clone();
        request.insert(TYPE_KEY.to_string(), Value::String(spec.kind.clone()));
        match last_result.filter(|_| spec.chains_input()) {
            Some(last) => {
                request.insert(LAST_RESULT_KEY.to_string(), last);
            }
            None => {
                request.remove(LAST_RESULT_KEY);
            }
        }
        request
    }

    /// Guarda el formulario como operación nueva: en `selected` si la hay, o al
    /// final del proceso. `None` si no se eligió tipo.
    pub async fn insert_operation(
        &self,
        api: &dyn ProcessApi,
        selected: Option<&Operation>,
    ) -> Result<Option<Operation>, ApiError> {
        let Some(spec) = self.selected_spec.as_ref() else {
            return Ok(None);
        };

        let last_result = self.result_name.clone().map(Value::String);
        let request = self.snapshot(spec, last_result);
        let mode = match selected {
            Some(op) => SaveMode::At(op.id),
            None => SaveMode::Append,
        };

        let saved = api.save_operation(&self.process, mode, &request).await?;
        info!(
            "operación {} ({}) guardada en proceso {} vía {:?}",
            saved.id, spec.kind, self.process, mode
        );
        Ok(Some(saved))
    }

    /// Sobrescribe `selected` con el formulario. Una entrada encadenada sigue
    /// apuntando a lo que encadenaba la operación reemplazada.
    pub async fn replace_operation(
        &self,
        api: &dyn ProcessApi,
        selected: Option<&Operation>,
    ) -> Result<Option<Operation>, ApiError> {
        let (Some(spec), Some(selected)) = (self.selected_spec.as_ref(), selected) else {
            return Ok(None);
        };

        let existing = api.get_operation(&self.process, selected.id).await?;
        let request = self.snapshot(spec, existing.original_last_result().cloned());

        let saved = api
            .save_operation(&self.process, SaveMode::Replace(selected.id), &request)
            .await?;
        info!(
            "operación {} del proceso {} reemplazada por {}",
            selected.id, self.process, spec.kind
        );
        Ok(Some(saved))
    }

    /// Vuelca el tipo y los parámetros de `selected` en el formulario.
    pub async fn copy_selected(
        &mut self,
        api: &dyn ProcessApi,
        selected: Option<&Operation>,
    ) -> Result<bool, ApiError> {
        let Some(selected) = selected else {
            return Ok(false);
        };

        let operation = api.get_operation(&self.process, selected.id).await?;
        let (spec, parameters) = operation.split_request()?;
        let spec = prepare_spec(spec.ok_or(ApiError::MissingSpecification(operation.id))?);

        self.selected_category = spec.category.clone();
        self.selected_spec = Some(spec);
        self.parameters = parameters;
        Ok(true)
    }

    /// Borra `selected` y devuelve la vecina que debe quedar seleccionada.
    /// `None` si no había nada seleccionado.
    pub async fn remove_selected(
        &self,
        api: &dyn ProcessApi,
        operations: &[Operation],
        selected: Option<&Operation>,
    ) -> Result<Option<NextSelection>, ApiError> {
        let Some(selected) = selected else {
            return Ok(None);
        };

        let selected_index = operations.iter().position(|op| op.id == selected.id);
        let next = next_after_removal(operations, selected_index);

        api.remove_operation(&self.process, selected.id).await?;
        info!(
            "operación {} borrada del proceso {}, siguiente selección {:?}",
            selected.id,
            self.process,
            next.operation.as_ref().map(|op| op.id)
        );
        Ok(Some(next))
    }
}
