use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag de un resultado que una operación puede producir (y del que una spec puede encadenar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    None,
    Integer,
    Double,
    Image,
    ImageHistogram,
    Histogram,
    ImageSpectrum,
    ImageMask,
    Sound,
    SoundSpectrum,
    SoundFilter,
    Signal,
    NoteSequence,
    #[serde(rename = "$NUMERICAL")]
    Numerical,
    #[serde(other)]
    Unknown,
}

impl ResultType {
    /// Escalares que se pliegan en la entrada numérica sintetizada.
    pub fn is_numeric(self) -> bool {
        matches!(self, ResultType::Double | ResultType::Integer)
    }

    pub fn from_tag(tag: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(tag.to_string()))
            .unwrap_or(ResultType::Unknown)
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            ResultType::None => "NONE",
            ResultType::Integer => "INTEGER",
            ResultType::Double => "DOUBLE",
            ResultType::Image => "IMAGE",
            ResultType::ImageHistogram => "IMAGE_HISTOGRAM",
            ResultType::Histogram => "HISTOGRAM",
            ResultType::ImageSpectrum => "IMAGE_SPECTRUM",
            ResultType::ImageMask => "IMAGE_MASK",
            ResultType::Sound => "SOUND",
            ResultType::SoundSpectrum => "SOUND_SPECTRUM",
            ResultType::SoundFilter => "SOUND_FILTER",
            ResultType::Signal => "SIGNAL",
            ResultType::NoteSequence => "NOTE_SEQUENCE",
            ResultType::Numerical => "$NUMERICAL",
            ResultType::Unknown => "UNKNOWN",
        }
    }
}

/// Forma declarada de un parámetro de un tipo de operación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamSpec {
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        def: Option<i64>,
    },
    Double {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        def: Option<f64>,
    },
    Enum {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default)]
        values: Vec<String>,
    },
    Matrix {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Boolean {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Sound {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

impl ParamSpec {
    pub fn description(&self) -> Option<&str> {
        match self {
            ParamSpec::Integer { description, .. }
            | ParamSpec::Double { description, .. }
            | ParamSpec::Enum { description, .. }
            | ParamSpec::Matrix { description }
            | ParamSpec::Image { description }
            | ParamSpec::Boolean { description }
            | ParamSpec::Sound { description } => description.as_deref(),
            ParamSpec::Unsupported => None,
        }
    }

    /// Etiqueta del formulario: la descripción declarada, o el nombre del parámetro.
    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        self.description().unwrap_or(name)
    }
}

/// Un tipo de operación tal como lo declara el catálogo del servidor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationTypeSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tipos de resultado que esta operación acepta como entrada encadenada.
    #[serde(default)]
    pub last_result: Vec<ResultType>,

    #[serde(default)]
    pub parameters: BTreeMap<String, ParamSpec>,
}

impl OperationTypeSpec {
    pub fn chains_input(&self) -> bool {
        !self.last_result.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecCategory {
    pub name: String,
    pub spec_list: Vec<OperationTypeSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_catalog_entry_with_all_param_kinds() {
        let spec: OperationTypeSpec = serde_json::from_value(json!({
            "type": "MEDIAN_FILTER",
            "category": "Image",
            "lastResult": ["IMAGE"],
            "parameters": {
                "range": {"type": "INTEGER", "min": 0, "max": 30},
                "change": {"type": "DOUBLE", "min": 0.0, "max": 128.0, "def": 1.5},
                "mode": {"type": "ENUM", "values": ["SAME", "VALID"]},
                "kernel": {"type": "MATRIX", "description": "kernel"},
                "image": {"type": "IMAGE"},
                "runningWindow": {"type": "BOOLEAN", "description": "use sliding window algorithm"},
                "sound": {"type": "SOUND"},
                "weird": {"type": "TENSOR", "rank": 3}
            }
        }))
        .unwrap();

        assert_eq!(spec.kind, "MEDIAN_FILTER");
        assert_eq!(spec.last_result, vec![ResultType::Image]);
        assert!(spec.chains_input());
        assert_eq!(
            spec.parameters["range"],
            ParamSpec::Integer {
                description: None,
                min: Some(0.0),
                max: Some(30.0),
                def: None
            }
        );
        assert_eq!(spec.parameters["weird"], ParamSpec::Unsupported);
        assert_eq!(
            spec.parameters["runningWindow"].label("runningWindow"),
            "use sliding window algorithm"
        );
        assert_eq!(spec.parameters["image"].label("image"), "image");
    }

    #[test]
    fn missing_last_result_means_no_chaining() {
        let spec: OperationTypeSpec =
            serde_json::from_value(json!({"type": "LOAD_IMAGE"})).unwrap();
        assert!(!spec.chains_input());
        assert!(spec.parameters.is_empty());
        assert_eq!(spec.category, None);
    }

    #[test]
    fn unknown_result_tags_do_not_break_parsing() {
        let tags: Vec<ResultType> =
            serde_json::from_value(json!(["SOUND", "HOLOGRAM", "$NUMERICAL"])).unwrap();
        assert_eq!(
            tags,
            vec![ResultType::Sound, ResultType::Unknown, ResultType::Numerical]
        );
        assert_eq!(ResultType::from_tag("SOUND_FILTER"), ResultType::SoundFilter);
        assert_eq!(ResultType::from_tag("$NUMERICAL").as_tag(), "$NUMERICAL");
        assert_eq!(ResultType::from_tag("nope"), ResultType::Unknown);
        assert!(ResultType::Integer.is_numeric());
        assert!(!ResultType::Signal.is_numeric());
    }
}
