use serde::Serialize;

use crate::operation::OperationId;
use crate::result::{aggregate, ResultDescriptor, ResultPayload, SignalPack, SoundPack, SpectrumPack};
use crate::spec::ResultType;

const MAX_TICKS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Bar,
    Scatter,
}

/// Una traza para el widget de gráficos.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    #[serde(rename = "type")]
    pub kind: SeriesKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Vec<f64>>,
    pub y: Vec<f64>,
}

impl Series {
    fn scatter(x: Vec<f64>, y: Vec<f64>) -> Self {
        Series {
            kind: SeriesKind::Scatter,
            name: None,
            x: Some(x),
            y,
        }
    }

    fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickAxis {
    pub tickmode: &'static str,
    pub tickvals: Vec<f64>,
    pub ticktext: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<TickAxis>,
    /// Se incrementa para que el widget trate el layout como un render nuevo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotOptions {
    pub show_link: bool,
    pub display_logo: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            show_link: false,
            display_logo: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plot {
    pub data: Vec<Series>,
    pub layout: Layout,
    pub options: PlotOptions,
}

/// Lo que necesita un zoom/pan sobre un gráfico para volver a pedir su resultado.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBinding {
    pub process: String,
    pub operation_id: OperationId,
    pub role: String,
    pub kind: ResultType,
}

/// Un resultado junto a su gráfico, si su tipo lo tiene.
#[derive(Debug, Clone, PartialEq)]
pub struct PlottedResult {
    pub descriptor: ResultDescriptor,
    pub plot: Option<Plot>,
    pub binding: Option<RangeBinding>,
}

/// Resultados de una operación, listos para mostrar.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub process: String,
    pub operation_id: OperationId,
    pub results: Vec<PlottedResult>,
    next_revision: u64,
}

/* --------- per-type transforms --------- */

fn sound_data(pack: &SoundPack) -> Vec<Series> {
    let x = (0..pack.values.len())
        .map(|i| i as f64 * pack.duration + pack.start_time)
        .collect();
    vec![Series::scatter(x, pack.values.clone())]
}

fn spectrum_data(pack: &SpectrumPack) -> Vec<Series> {
    let len = pack.real.len();
    let span = pack.end_frequency - pack.start_frequency;
    let x: Vec<f64> = (0..len)
        .map(|i| i as f64 * span / len as f64 + pack.start_frequency)
        .collect();
    vec![
        Series::scatter(x.clone(), pack.real.clone()).named("Real"),
        Series::scatter(x, pack.imaginary.clone()).named("Imaginary"),
    ]
}

fn signal_step(pack: &SignalPack) -> f64 {
    (pack.end - pack.start) / pack.values.len() as f64
}

fn signal_data(pack: &SignalPack) -> Vec<Series> {
    let step = signal_step(pack);
    let x = (0..pack.values.len())
        .map(|i| i as f64 * step + pack.start)
        .collect();
    vec![Series::scatter(x, pack.values.clone())]
}

/// Como `Number.prototype.toFixed(2)`, incluidas las grafías de no finitos.
fn fixed2(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_string()
    } else if x.is_infinite() {
        let sign = if x > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else {
        format!("{:.2}", x)
    }
}

/// Ticks como mucho cada veinteavo de las muestras, rotulados con la
/// frecuencia inversa `frequency / x`.
fn signal_layout(pack: &SignalPack) -> Layout {
    let len = pack.values.len();
    let server_step = signal_step(pack);
    let step = (len / MAX_TICKS).max(1);
    let cut_len = len / step;

    let tickvals: Vec<f64> = (0..cut_len)
        .map(|i| (i * step) as f64 * server_step + pack.start)
        .collect();
    let ticktext = tickvals.iter().map(|x| fixed2(pack.frequency / x)).collect();

    Layout {
        xaxis: Some(TickAxis {
            tickmode: "array",
            tickvals,
            ticktext,
        }),
        revision: None,
    }
}

/// Series del gráfico de un payload, `None` si el tipo no tiene gráfico.
pub fn prepare_data(payload: &ResultPayload) -> Option<Vec<Series>> {
    match payload {
        ResultPayload::ImageHistogram(values) | ResultPayload::Histogram(values) => {
            Some(vec![Series {
                kind: SeriesKind::Bar,
                name: None,
                x: None,
                y: values.clone(),
            }])
        }
        ResultPayload::Sound(pack) | ResultPayload::SoundFilter(pack) => Some(sound_data(pack)),
        ResultPayload::SoundSpectrum(pack) => Some(spectrum_data(pack)),
        ResultPayload::Signal(pack) => Some(signal_data(pack)),
        ResultPayload::None
        | ResultPayload::Integer(_)
        | ResultPayload::Double(_)
        | ResultPayload::Image
        | ResultPayload::ImageSpectrum
        | ResultPayload::ImageMask
        | ResultPayload::NoteSequence(_)
        | ResultPayload::Numerical(_)
        | ResultPayload::Unknown { .. } => None,
    }
}

/// Layout calculado a partir del payload; solo las señales lo tienen.
pub fn prepare_layout(payload: &ResultPayload) -> Option<Layout> {
    match payload {
        ResultPayload::Signal(pack) => Some(signal_layout(pack)),
        _ => None,
    }
}

/// Tipos cuyos gráficos piden una ventana más estrecha al hacer zoom.
pub fn is_refinable(kind: ResultType) -> bool {
    matches!(
        kind,
        ResultType::Sound | ResultType::SoundFilter | ResultType::SoundSpectrum | ResultType::Signal
    )
}

pub fn prepare_plot(
    descriptor: ResultDescriptor,
    process: &str,
    operation_id: OperationId,
) -> PlottedResult {
    let plot = prepare_data(&descriptor.payload).map(|data| Plot {
        data,
        layout: prepare_layout(&descriptor.payload).unwrap_or_default(),
        options: PlotOptions::default(),
    });

    let kind = descriptor.result_type();
    let binding = is_refinable(kind).then(|| RangeBinding {
        process: process.to_string(),
        operation_id,
        role: descriptor.role.clone(),
        kind,
    });

    PlottedResult {
        descriptor,
        plot,
        binding,
    }
}

impl ResultView {
    /// Agrega la lista cruda de resultados de una operación y prepara el
    /// gráfico de cada resultado que lo tenga.
    pub fn prepare(process: &str, operation_id: OperationId, results: Vec<ResultDescriptor>) -> Self {
        let results = aggregate(results)
            .into_iter()
            .map(|r| prepare_plot(r, process, operation_id))
            .collect();
        ResultView {
            process: process.to_string(),
            operation_id,
            results,
            next_revision: 1,
        }
    }

    pub fn get(&self, role: &str) -> Option<&PlottedResult> {
        self.results.iter().find(|r| r.descriptor.role == role)
    }

    pub fn get_mut(&mut self, role: &str) -> Option<&mut PlottedResult> {
        self.results.iter_mut().find(|r| r.descriptor.role == role)
    }

    /// Marca un resultado como elegido por el usuario. Los histogramas reciben
    /// un layout nuevo para que el widget los redibuje.
    pub fn select(&mut self, role: &str) -> Option<&PlottedResult> {
        let revision = self.next_revision;
        let entry = self.results.iter_mut().find(|r| r.descriptor.role == role)?;

        if matches!(
            entry.descriptor.result_type(),
            ResultType::ImageHistogram | ResultType::Histogram
        ) {
            if let Some(plot) = entry.plot.as_mut() {
                plot.layout = Layout {
                    xaxis: None,
                    revision: Some(revision),
                };
                self.next_revision += 1;
            }
        }
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(value: serde_json::Value) -> ResultDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn histogram_is_a_single_bar_series() {
        let data = prepare_data(&ResultPayload::ImageHistogram(vec![3.0, 1.0, 2.0])).unwrap();
        assert_eq!(
            data,
            vec![Series {
                kind: SeriesKind::Bar,
                name: None,
                x: None,
                y: vec![3.0, 1.0, 2.0]
            }]
        );
    }

    #[test]
    fn sound_is_sampled_from_start_time() {
        let data = prepare_data(&ResultPayload::Sound(SoundPack {
            values: vec![1.0, 2.0, 3.0],
            start_time: 0.5,
            duration: 0.25,
        }))
        .unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].x, Some(vec![0.5, 0.75, 1.0]));
        assert_eq!(data[0].y, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn spectrum_has_real_and_imaginary_series() {
        let data = prepare_data(&ResultPayload::SoundSpectrum(SpectrumPack {
            real: vec![1.0, 2.0, 3.0, 4.0],
            imaginary: vec![0.0, -1.0, 0.0, 1.0],
            start_frequency: 100.0,
            end_frequency: 500.0,
        }))
        .unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data[0].name.as_deref(), Some("Real"));
        assert_eq!(data[1].name.as_deref(), Some("Imaginary"));
        assert_eq!(data[0].x, Some(vec![100.0, 200.0, 300.0, 400.0]));
        assert_eq!(data[1].y, vec![0.0, -1.0, 0.0, 1.0]);
    }

    #[test]
    fn signal_spreads_samples_over_its_range() {
        let pack = SignalPack {
            values: vec![5.0, 6.0, 7.0, 8.0],
            start: 2.0,
            end: 4.0,
            frequency: 10.0,
            duration: None,
        };
        let data = prepare_data(&ResultPayload::Signal(pack.clone())).unwrap();
        assert_eq!(data[0].x, Some(vec![2.0, 2.5, 3.0, 3.5]));

        let axis = signal_layout(&pack).xaxis.unwrap();
        // menos de 20 muestras: un tick por muestra
        assert_eq!(axis.tickvals, vec![2.0, 2.5, 3.0, 3.5]);
        assert_eq!(axis.ticktext, vec!["5.00", "4.00", "3.33", "2.86"]);
        assert_eq!(axis.tickmode, "array");
    }

    #[test]
    fn signal_ticks_are_subsampled() {
        let pack = SignalPack {
            values: vec![0.0; 100],
            start: 0.0,
            end: 100.0,
            frequency: 1000.0,
            duration: None,
        };
        let axis = signal_layout(&pack).xaxis.unwrap();

        assert_eq!(axis.tickvals.len(), 20);
        assert_eq!(axis.tickvals[1], 5.0);
        assert_eq!(axis.ticktext[0], "Infinity");
        assert_eq!(axis.ticktext[1], "200.00");
    }

    #[test]
    fn empty_signal_has_no_ticks() {
        let layout = signal_layout(&SignalPack::default());
        assert!(layout.xaxis.unwrap().tickvals.is_empty());
    }

    #[test]
    fn view_prepares_plots_and_bindings() {
        let view = ResultView::prepare(
            "proc",
            4,
            vec![
                descriptor(json!({"role": "img", "type": "IMAGE"})),
                descriptor(json!({"role": "n", "type": "INTEGER", "value": 2})),
                descriptor(json!({"role": "sig", "type": "SIGNAL", "value": {"values": [1, 2], "start": 0, "end": 2, "frequency": 1}})),
                descriptor(json!({"role": "hist", "type": "HISTOGRAM", "value": [1, 2]})),
            ],
        );

        let roles: Vec<_> = view.results.iter().map(|r| r.descriptor.role.as_str()).collect();
        assert_eq!(roles, vec!["img", "sig", "hist", "Numerical"]);

        let img = view.get("img").unwrap();
        assert!(img.plot.is_none());
        assert!(img.binding.is_none());

        let sig = view.get("sig").unwrap();
        assert!(sig.plot.as_ref().unwrap().layout.xaxis.is_some());
        assert_eq!(
            sig.binding,
            Some(RangeBinding {
                process: "proc".to_string(),
                operation_id: 4,
                role: "sig".to_string(),
                kind: ResultType::Signal
            })
        );

        let hist = view.get("hist").unwrap();
        assert_eq!(hist.plot.as_ref().unwrap().layout, Layout::default());
        assert!(hist.binding.is_none());
        assert!(view.get("Numerical").unwrap().plot.is_none());
    }

    #[test]
    fn reselecting_a_histogram_resets_its_layout() {
        let mut view = ResultView::prepare(
            "proc",
            1,
            vec![
                descriptor(json!({"role": "hist", "type": "IMAGE_HISTOGRAM", "value": [1, 2]})),
                descriptor(json!({"role": "img", "type": "IMAGE"})),
            ],
        );

        let first = view.select("hist").unwrap().plot.clone().unwrap().layout;
        let second = view.select("hist").unwrap().plot.clone().unwrap().layout;
        assert_ne!(first, second);
        assert_eq!(first.revision, Some(1));
        assert_eq!(second.revision, Some(2));

        assert!(view.select("img").is_some());
        assert!(view.select("missing").is_none());
    }

    #[test]
    fn plot_serializes_like_the_chart_widget_expects() {
        let entry = prepare_plot(
            descriptor(json!({"role": "h", "type": "HISTOGRAM", "value": [1]})),
            "proc",
            1,
        );
        assert_eq!(
            serde_json::to_value(entry.plot.unwrap()).unwrap(),
            json!({
                "data": [{"type": "bar", "y": [1.0]}],
                "layout": {},
                "options": {"showLink": false, "displayLogo": false}
            })
        );
    }
}
