use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::ProcessApi;
use crate::error::ApiError;
use crate::operation::Operation;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Número de secuencia de una petición de polling. Las posteriores llevan sellos mayores.
pub type PollStamp = u64;

/// Resultado de aplicar una respuesta del polling.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// Ya se aplicó una respuesta igual o más nueva.
    Stale,
    /// Se reemplazó la lista; `selection` viene cuando la operación
    /// seleccionada cambió y hay que volver a mostrarla.
    Applied { selection: Option<Operation> },
}

/// Lista ordenada de operaciones de un proceso, refrescada por polling, más
/// la operación que el usuario tiene seleccionada.
#[derive(Debug, Clone, Default)]
pub struct OperationHistory {
    operations: Vec<Operation>,
    selected: Option<Operation>,
    last_applied: Option<PollStamp>,
}

impl OperationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn selected(&self) -> Option<&Operation> {
        self.selected.as_ref()
    }

    pub fn select(&mut self, operation: Option<Operation>) {
        self.selected = operation;
    }

    /// Posición de la operación seleccionada en la lista actual.
    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        self.operations.iter().position(|op| op.id == selected.id)
    }

    /// Aplica una lista recién pedida.
    pub fn reconcile(&mut self, stamp: PollStamp, fetched: Vec<Operation>) -> Reconciled {
        if self.last_applied.is_some_and(|applied| stamp <= applied) {
            return Reconciled::Stale;
        }
        self.last_applied = Some(stamp);

        // 1) la lista se reemplaza siempre entera
        self.operations = fetched;

        // 2) ¿dónde quedó la selección?
        let selected_index = self.selected_index();

        // 3) sin selección todavía: gana la operación más reciente
        if self.selected.is_none() {
            if let Some(last) = self.operations.last() {
                self.selected = Some(last.clone());
                return Reconciled::Applied {
                    selection: self.selected.clone(),
                };
            }
            return Reconciled::Applied { selection: None };
        }

        // 4) misma operación, estado nuevo: se vuelve a mostrar
        if let (Some(index), Some(held)) = (selected_index, self.selected.as_ref()) {
            let fresh = &self.operations[index];
            if fresh.status() != held.status() {
                self.selected = Some(fresh.clone());
                return Reconciled::Applied {
                    selection: self.selected.clone(),
                };
            }
        }

        // 5) la selección ya no está en la lista: se deja como está
        Reconciled::Applied { selection: None }
    }
}

/// Una respuesta del polling entregada al suscriptor.
#[derive(Debug)]
pub struct PollResponse {
    pub stamp: PollStamp,
    pub result: Result<Vec<Operation>, ApiError>,
}

/// Handle de un poller de historial en marcha. Al soltarlo se paran el timer
/// y los polls que sigan en vuelo.
#[derive(Debug)]
pub struct HistorySubscription {
    rx: mpsc::Receiver<PollResponse>,
    task: JoinHandle<()>,
}

impl HistorySubscription {
    /// Siguiente respuesta, `None` cuando el poller ya no existe.
    pub async fn recv(&mut self) -> Option<PollResponse> {
        self.rx.recv().await
    }

    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for HistorySubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Arranca el polling de la lista de operaciones de `process` cada `period`.
/// Cada tick lanza su propia petición; las respuestas se entregan según
/// terminan, selladas con el tick que las pidió.
pub fn start(api: Arc<dyn ProcessApi>, process: String, period: Duration) -> HistorySubscription {
    let (tx, rx) = mpsc::channel(16);

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight: JoinSet<PollResponse> = JoinSet::new();
        let mut next_stamp: PollStamp = 0;

        info!("polling de operaciones del proceso {} cada {:?}", process, period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    next_stamp += 1;
                    let stamp = next_stamp;
                    let api = api.clone();
                    let process = process.clone();
                    in_flight.spawn(async move {
                        let result = api.list_operations(&process).await;
                        PollResponse { stamp, result }
                    });
                }
                Some(joined) = in_flight.join_next() => {
                    match joined {
                        Ok(response) => {
                            if let Err(e) = &response.result {
                                warn!("poll {} del proceso {} falló: {}", response.stamp, process, e);
                            }
                            if tx.send(response).await.is_err() {
                                debug!("el suscriptor del historial se fue, parando poller");
                                break;
                            }
                        }
                        Err(e) => warn!("la tarea de poll del proceso {} murió: {:?}", process, e),
                    }
                }
            }
        }
    });

    HistorySubscription { rx, task }
}
