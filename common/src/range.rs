use serde_json::{Map, Value};
use tracing::debug;

use crate::api::{Bounds, ProcessApi};
use crate::error::ApiError;
use crate::plot::{prepare_data, prepare_layout, PlottedResult};
use crate::result::ResultPayload;

const RANGE_KEY: &str = "xaxis.range";
const RANGE_START_KEY: &str = "xaxis.range[0]";
const RANGE_END_KEY: &str = "xaxis.range[1]";
const AUTORANGE_KEY: &str = "xaxis.autorange";

/// Cambio de rango que trae un evento de relayout del gráfico.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeChange {
    /// Ambos extremos a la vez (doble click, selección por caja).
    Explicit(Option<f64>, Option<f64>),
    /// Extremos por separado (arrastre con el ratón).
    Partial(Option<f64>, Option<f64>),
    /// Vuelta al rango completo.
    AutoRange,
}

impl RangeChange {
    pub fn bounds(&self) -> Bounds {
        match *self {
            RangeChange::Explicit(start, end) | RangeChange::Partial(start, end) => {
                Bounds::new(start, end)
            }
            RangeChange::AutoRange => Bounds::full(),
        }
    }
}

/// Clasifica un evento de relayout en uno de los cambios de rango, o `None`
/// si no toca el rango del eje x.
pub fn classify(event: &Map<String, Value>) -> Option<RangeChange> {
    if let Some(range) = event.get(RANGE_KEY) {
        let bound = |i: usize| range.get(i).and_then(Value::as_f64);
        return Some(RangeChange::Explicit(bound(0), bound(1)));
    }

    if event.contains_key(RANGE_START_KEY) || event.contains_key(RANGE_END_KEY) {
        return Some(RangeChange::Partial(
            event.get(RANGE_START_KEY).and_then(Value::as_f64),
            event.get(RANGE_END_KEY).and_then(Value::as_f64),
        ));
    }

    if event.contains_key(AUTORANGE_KEY) {
        return Some(RangeChange::AutoRange);
    }

    None
}

/// Vuelve a pedir el resultado de `entry` para la ventana a la que hizo zoom
/// el usuario y cambia los datos del gráfico. Devuelve `false` si el evento
/// no trae rango o el resultado no se puede refinar. Ante un error la
/// entrada sigue mostrando lo que tenía.
pub async fn refine(
    api: &dyn ProcessApi,
    entry: &mut PlottedResult,
    event: &Map<String, Value>,
) -> Result<bool, ApiError> {
    let Some(binding) = entry.binding.as_ref() else {
        return Ok(false);
    };
    let Some(change) = classify(event) else {
        return Ok(false);
    };

    let bounds = change.bounds();
    debug!(
        "volviendo a pedir resultado {} de la operación {} con {:?}",
        binding.role, binding.operation_id, bounds
    );

    let value = api
        .result_value(&binding.process, binding.operation_id, &binding.role, bounds)
        .await?;
    let payload = ResultPayload::decode(binding.kind, Some(value))?;

    let data = prepare_data(&payload).unwrap_or_default();
    let layout = prepare_layout(&payload);

    let plot = entry.plot.get_or_insert_with(Default::default);
    plot.data = data;
    if let Some(layout) = layout {
        plot.layout = layout;
    }
    Ok(true)
}
