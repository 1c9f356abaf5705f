use serde_json::Value;

use crate::operation::Parameters;
use crate::spec::{OperationTypeSpec, ParamSpec};

const MATRIX_SIZE: usize = 3;

/// Redondea como el formulario del navegador: las mitades van hacia +infinito.
fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

fn midpoint(min: Option<f64>, max: Option<f64>) -> f64 {
    (min.unwrap_or(0.0) + max.unwrap_or(0.0)) / 2.0
}

pub fn fill_matrix(rows: usize, cols: usize, value: f64) -> Value {
    let row: Vec<Value> = vec![Value::from(value); cols];
    Value::Array(vec![Value::Array(row); rows])
}

/// Valor inicial de un parámetro, `None` cuando el formulario no tiene nada
/// que ofrecer para su tipo.
pub fn default_value(param: &ParamSpec) -> Option<Value> {
    match param {
        ParamSpec::Integer { min, max, def, .. } => Some(Value::from(
            def.unwrap_or_else(|| round_half_up(midpoint(*min, *max))),
        )),
        ParamSpec::Double { min, max, def, .. } => {
            Some(Value::from(def.unwrap_or_else(|| midpoint(*min, *max))))
        }
        ParamSpec::Enum { values, .. } => values.first().cloned().map(Value::String),
        ParamSpec::Matrix { .. } => Some(fill_matrix(MATRIX_SIZE, MATRIX_SIZE, 0.0)),
        ParamSpec::Image { .. } => Some(Value::String(String::new())),
        ParamSpec::Boolean { .. } | ParamSpec::Sound { .. } | ParamSpec::Unsupported => None,
    }
}

/// Valores de parámetros con los que arranca una edición nueva de `spec`.
pub fn defaults_for(spec: &OperationTypeSpec) -> Parameters {
    spec.parameters
        .iter()
        .filter_map(|(name, param)| default_value(param).map(|v| (name.clone(), v)))
        .collect()
}
