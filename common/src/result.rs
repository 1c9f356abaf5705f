use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::spec::ResultType;

pub const NUMERICAL_ROLE: &str = "Numerical";

/// Sonido muestreado (o filtro de sonido) tal como lo manda el servidor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundPack {
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub start_time: f64,
    /// Tiempo entre dos valores consecutivos.
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumPack {
    #[serde(default)]
    pub real: Vec<f64>,
    #[serde(default)]
    pub imaginary: Vec<f64>,
    #[serde(default)]
    pub start_frequency: f64,
    #[serde(default)]
    pub end_frequency: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPack {
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub frequency: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Valor tipado de un resultado.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPayload {
    None,
    Integer(i64),
    Double(f64),
    Image,
    ImageSpectrum,
    ImageMask,
    ImageHistogram(Vec<f64>),
    Histogram(Vec<f64>),
    Sound(SoundPack),
    SoundFilter(SoundPack),
    SoundSpectrum(SpectrumPack),
    Signal(SignalPack),
    NoteSequence(Value),
    /// Sintetizado: todos los resultados numéricos de una operación.
    Numerical(Vec<ResultDescriptor>),
    Unknown { tag: String, value: Option<Value> },
}

impl ResultPayload {
    /// Decodifica el payload de un resultado cuyo tipo ya se conoce, p.ej. al
    /// volver a pedir un único rol.
    pub fn decode(kind: ResultType, value: Option<Value>) -> Result<Self, serde_json::Error> {
        let raw = value.unwrap_or(Value::Null);
        let payload = match kind {
            ResultType::None => ResultPayload::None,
            ResultType::Integer => ResultPayload::Integer(serde_json::from_value(raw)?),
            ResultType::Double => ResultPayload::Double(serde_json::from_value(raw)?),
            ResultType::Image => ResultPayload::Image,
            ResultType::ImageSpectrum => ResultPayload::ImageSpectrum,
            ResultType::ImageMask => ResultPayload::ImageMask,
            ResultType::ImageHistogram => {
                ResultPayload::ImageHistogram(serde_json::from_value(raw)?)
            }
            ResultType::Histogram => ResultPayload::Histogram(serde_json::from_value(raw)?),
            ResultType::Sound => ResultPayload::Sound(serde_json::from_value(raw)?),
            ResultType::SoundFilter => ResultPayload::SoundFilter(serde_json::from_value(raw)?),
            ResultType::SoundSpectrum => {
                ResultPayload::SoundSpectrum(serde_json::from_value(raw)?)
            }
            ResultType::Signal => ResultPayload::Signal(serde_json::from_value(raw)?),
            ResultType::NoteSequence => ResultPayload::NoteSequence(raw),
            ResultType::Numerical => ResultPayload::Numerical(serde_json::from_value(raw)?),
            ResultType::Unknown => ResultPayload::Unknown {
                tag: ResultType::Unknown.as_tag().to_string(),
                value: Some(raw).filter(|v| !v.is_null()),
            },
        };
        Ok(payload)
    }

    pub fn result_type(&self) -> ResultType {
        match self {
            ResultPayload::None => ResultType::None,
            ResultPayload::Integer(_) => ResultType::Integer,
            ResultPayload::Double(_) => ResultType::Double,
            ResultPayload::Image => ResultType::Image,
            ResultPayload::ImageSpectrum => ResultType::ImageSpectrum,
            ResultPayload::ImageMask => ResultType::ImageMask,
            ResultPayload::ImageHistogram(_) => ResultType::ImageHistogram,
            ResultPayload::Histogram(_) => ResultType::Histogram,
            ResultPayload::Sound(_) => ResultType::Sound,
            ResultPayload::SoundFilter(_) => ResultType::SoundFilter,
            ResultPayload::SoundSpectrum(_) => ResultType::SoundSpectrum,
            ResultPayload::Signal(_) => ResultType::Signal,
            ResultPayload::NoteSequence(_) => ResultType::NoteSequence,
            ResultPayload::Numerical(_) => ResultType::Numerical,
            ResultPayload::Unknown { .. } => ResultType::Unknown,
        }
    }

    fn tag(&self) -> String {
        match self {
            ResultPayload::Unknown { tag, .. } => tag.clone(),
            other => other.result_type().as_tag().to_string(),
        }
    }

    fn encode_value(&self) -> Option<Value> {
        let value = match self {
            ResultPayload::None
            | ResultPayload::Image
            | ResultPayload::ImageSpectrum
            | ResultPayload::ImageMask
            | ResultPayload::Numerical(_) => return None,
            ResultPayload::Integer(v) => Value::from(*v),
            ResultPayload::Double(v) => Value::from(*v),
            ResultPayload::ImageHistogram(v) | ResultPayload::Histogram(v) => Value::from(v.clone()),
            ResultPayload::Sound(pack) | ResultPayload::SoundFilter(pack) => {
                serde_json::to_value(pack).unwrap_or_default()
            }
            ResultPayload::SoundSpectrum(pack) => serde_json::to_value(pack).unwrap_or_default(),
            ResultPayload::Signal(pack) => serde_json::to_value(pack).unwrap_or_default(),
            ResultPayload::NoteSequence(v) => v.clone(),
            ResultPayload::Unknown { value, .. } => return value.clone(),
        };
        Some(value)
    }
}

/// Salida con nombre de una operación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawResult", into = "RawResult")]
pub struct ResultDescriptor {
    pub role: String,
    pub payload: ResultPayload,
}

impl ResultDescriptor {
    pub fn new(role: impl Into<String>, payload: ResultPayload) -> Self {
        Self {
            role: role.into(),
            payload,
        }
    }

    pub fn result_type(&self) -> ResultType {
        self.payload.result_type()
    }
}

/// Forma en el cable: `{ role, type, value? }`, más `values` en la entrada
/// numérica sintetizada.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawResult {
    role: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<ResultDescriptor>>,
}

impl From<RawResult> for ResultDescriptor {
    fn from(raw: RawResult) -> Self {
        let payload = match ResultType::from_tag(&raw.kind) {
            ResultType::Numerical => ResultPayload::Numerical(raw.values.unwrap_or_default()),
            ResultType::Unknown => ResultPayload::Unknown {
                tag: raw.kind,
                value: raw.value,
            },
            // un payload que no encaja (p.ej. "NaN" en un DOUBLE) no tumba
            // la lista entera: se deja pasar opaco
            known => match ResultPayload::decode(known, raw.value.clone()) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("resultado {} ({}) no decodificable: {}", raw.role, raw.kind, e);
                    ResultPayload::Unknown {
                        tag: raw.kind,
                        value: raw.value,
                    }
                }
            },
        };
        ResultDescriptor {
            role: raw.role,
            payload,
        }
    }
}

impl From<ResultDescriptor> for RawResult {
    fn from(result: ResultDescriptor) -> Self {
        let values = match &result.payload {
            ResultPayload::Numerical(values) => Some(values.clone()),
            _ => None,
        };
        RawResult {
            kind: result.payload.tag(),
            value: result.payload.encode_value(),
            values,
            role: result.role,
        }
    }
}

/// `{ resultList: [...] }` que devuelve el endpoint de lista de resultados.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultList {
    #[serde(default)]
    pub result_list: Vec<ResultDescriptor>,
}

/// Mueve cada escalar numérico a una única entrada `$NUMERICAL` al final.
/// El resto de resultados mantiene su orden; si no hay numéricos no se
/// añade nada.
pub fn aggregate(results: Vec<ResultDescriptor>) -> Vec<ResultDescriptor> {
    let (numeric, mut other): (Vec<_>, Vec<_>) = results
        .into_iter()
        .partition(|r| r.result_type().is_numeric());

    if !numeric.is_empty() {
        other.push(ResultDescriptor::new(
            NUMERICAL_ROLE,
            ResultPayload::Numerical(numeric),
        ));
    }
    other
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Vec<ResultDescriptor> {
        serde_json::from_value::<ResultList>(json!({ "resultList": value }))
            .unwrap()
            .result_list
    }

    #[test]
    fn decodes_each_payload_kind() {
        let results = parse(json!([
            {"role": "image", "type": "IMAGE"},
            {"role": "mean", "type": "DOUBLE", "value": 1.5},
            {"role": "count", "type": "INTEGER", "value": 3},
            {"role": "hist", "type": "IMAGE_HISTOGRAM", "value": [1, 2, 3]},
            {"role": "sound", "type": "SOUND", "value": {"values": [0, 1], "startTime": 0.5, "duration": 0.25}},
            {"role": "spectrum", "type": "SOUND_SPECTRUM", "value": {"real": [1], "imaginary": [0], "startFrequency": 0, "endFrequency": 100}},
            {"role": "signal", "type": "SIGNAL", "value": {"values": [4, 5], "start": 0, "end": 2, "frequency": 44100, "duration": 0.1}},
            {"role": "notes", "type": "NOTE_SEQUENCE", "value": [{"note": "A4"}]},
            {"role": "holo", "type": "HOLOGRAM", "value": {"depth": 3}}
        ]));

        assert_eq!(results[0].payload, ResultPayload::Image);
        assert_eq!(results[1].payload, ResultPayload::Double(1.5));
        assert_eq!(results[2].payload, ResultPayload::Integer(3));
        assert_eq!(results[3].payload, ResultPayload::ImageHistogram(vec![1.0, 2.0, 3.0]));
        match &results[4].payload {
            ResultPayload::Sound(pack) => {
                assert_eq!(pack.start_time, 0.5);
                assert_eq!(pack.duration, 0.25);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert_eq!(results[5].result_type(), ResultType::SoundSpectrum);
        assert_eq!(results[6].result_type(), ResultType::Signal);
        assert_eq!(results[7].payload, ResultPayload::NoteSequence(json!([{"note": "A4"}])));
        assert_eq!(
            results[8].payload,
            ResultPayload::Unknown {
                tag: "HOLOGRAM".to_string(),
                value: Some(json!({"depth": 3}))
            }
        );
    }

    #[test]
    fn undecodable_payload_does_not_drop_the_rest() {
        let results = parse(json!([
            {"role": "img", "type": "IMAGE"},
            {"role": "corr", "type": "DOUBLE", "value": "NaN"},
            {"role": "snd", "type": "SOUND", "value": {"values": [], "startTime": 0, "duration": "NaN"}},
            {"role": "n", "type": "INTEGER", "value": 2}
        ]));

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].payload, ResultPayload::Image);
        assert_eq!(
            results[1].payload,
            ResultPayload::Unknown {
                tag: "DOUBLE".to_string(),
                value: Some(json!("NaN"))
            }
        );
        assert_eq!(results[2].result_type(), ResultType::Unknown);
        assert_eq!(results[3].payload, ResultPayload::Integer(2));

        // pasa opaco: ni numérico ni graficable
        let roles: Vec<_> = aggregate(results).into_iter().map(|r| r.role).collect();
        assert_eq!(roles, vec!["img", "corr", "snd", "Numerical"]);
    }

    #[test]
    fn unknown_results_serialize_back_unchanged() {
        let raw = json!({"role": "holo", "type": "HOLOGRAM", "value": {"depth": 3}});
        let result: ResultDescriptor = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), raw);
    }

    #[test]
    fn aggregate_moves_numeric_results_to_the_end() {
        let results = parse(json!([
            {"role": "a", "type": "IMAGE"},
            {"role": "b", "type": "DOUBLE", "value": 1},
            {"role": "c", "type": "INTEGER", "value": 2}
        ]));

        let aggregated = aggregate(results);

        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated[0].role, "a");
        assert_eq!(aggregated[1].role, NUMERICAL_ROLE);
        assert_eq!(
            serde_json::to_value(&aggregated[1]).unwrap(),
            json!({
                "role": "Numerical",
                "type": "$NUMERICAL",
                "values": [
                    {"role": "b", "type": "DOUBLE", "value": 1.0},
                    {"role": "c", "type": "INTEGER", "value": 2}
                ]
            })
        );
    }

    #[test]
    fn aggregate_keeps_order_of_structured_results() {
        let results = parse(json!([
            {"role": "x", "type": "INTEGER", "value": 1},
            {"role": "s", "type": "SOUND", "value": {"values": [], "startTime": 0, "duration": 1}},
            {"role": "i", "type": "IMAGE"},
            {"role": "y", "type": "DOUBLE", "value": 2.0},
            {"role": "h", "type": "HISTOGRAM", "value": [1]}
        ]));

        let roles: Vec<_> = aggregate(results).into_iter().map(|r| r.role).collect();
        assert_eq!(roles, vec!["s", "i", "h", "Numerical"]);
    }

    #[test]
    fn aggregate_without_numeric_results_appends_nothing() {
        let results = parse(json!([{"role": "i", "type": "IMAGE"}]));
        let aggregated = aggregate(results.clone());
        assert_eq!(aggregated, results);
        assert!(aggregate(Vec::new()).is_empty());
    }
}
