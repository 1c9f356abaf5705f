use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::api::ProcessApi;
use crate::catalog::SpecStore;
use crate::editor::{NextSelection, PipelineEditor};
use crate::error::ApiError;
use crate::history::{self, HistorySubscription, OperationHistory, PollResponse, Reconciled};
use crate::operation::Operation;
use crate::plot::ResultView;
use crate::range;

/// Sesión de edición de un proceso: catálogo, historial por polling,
/// formulario de edición y resultados de la operación seleccionada.
pub struct Session {
    api: Arc<dyn ProcessApi>,
    process: String,
    specs: SpecStore,
    history: OperationHistory,
    editor: PipelineEditor,
    results: Option<ResultView>,
}

impl Session {
    pub fn new(api: Arc<dyn ProcessApi>, process: impl Into<String>) -> Self {
        let process = process.into();
        Self {
            api,
            editor: PipelineEditor::new(process.clone()),
            process,
            specs: SpecStore::new(),
            history: OperationHistory::new(),
            results: None,
        }
    }

    pub fn process(&self) -> &str {
        &self.process
    }

    pub fn specs(&self) -> &SpecStore {
        &self.specs
    }

    pub fn history(&self) -> &OperationHistory {
        &self.history
    }

    pub fn editor(&self) -> &PipelineEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut PipelineEditor {
        &mut self.editor
    }

    pub fn results(&self) -> Option<&ResultView> {
        self.results.as_ref()
    }

    pub async fn load_catalog(&mut self) -> Result<(), ApiError> {
        self.specs.load(self.api.as_ref(), &self.process).await
    }

    /// Arranca el poller del historial de este proceso.
    pub fn start_polling(&self, period: Duration) -> HistorySubscription {
        history::start(self.api.clone(), self.process.clone(), period)
    }

    /// Incorpora una respuesta del polling al historial. Si cambió la
    /// selección se cargan sus resultados y se devuelve la nueva selección.
    pub async fn apply_poll(&mut self, response: PollResponse) -> Result<Option<Operation>, ApiError> {
        let operations = response.result?;
        match self.history.reconcile(response.stamp, operations) {
            Reconciled::Stale => {
                debug!("descartando poll viejo {} del proceso {}", response.stamp, self.process);
                Ok(None)
            }
            Reconciled::Applied { selection: None } => Ok(None),
            Reconciled::Applied {
                selection: Some(selected),
            } => {
                self.select_operation(Some(selected.clone())).await?;
                Ok(Some(selected))
            }
        }
    }

    /// Selecciona una operación y carga sus resultados. Si la carga falla se
    /// quedan los resultados que ya se mostraban.
    pub async fn select_operation(&mut self, operation: Option<Operation>) -> Result<(), ApiError> {
        self.history.select(operation.clone());

        let Some(operation) = operation else {
            self.results = None;
            return Ok(());
        };

        let results = self.api.results(&self.process, operation.id).await?;
        info!(
            "operación {} del proceso {} seleccionada ({} resultados)",
            operation.id,
            self.process,
            results.len()
        );
        self.results = Some(ResultView::prepare(&self.process, operation.id, results));
        Ok(())
    }

    /// Elige del catálogo un tipo de operación para el formulario.
    pub fn select_spec(&mut self, kind: &str) -> bool {
        match self.specs.find(kind).cloned() {
            Some(spec) => {
                self.editor.select_spec(spec);
                true
            }
            None => false,
        }
    }

    /// Elige un resultado como entrada encadenada de la siguiente operación.
    pub fn select_result(&mut self, role: &str) {
        self.editor.select_result(Some(role.to_string()));
        if let Some(view) = self.results.as_mut() {
            view.select(role);
        }
    }

    fn adopt_saved(&mut self, saved: Option<Operation>) -> Option<Operation> {
        if let Some(op) = &saved {
            // los resultados llegan cuando un poll la da por terminada
            self.history.select(Some(op.clone()));
            self.results = None;
        }
        saved
    }

    pub async fn insert_operation(&mut self) -> Result<Option<Operation>, ApiError> {
        let saved = self
            .editor
            .insert_operation(self.api.as_ref(), self.history.selected())
            .await?;
        Ok(self.adopt_saved(saved))
    }

    pub async fn replace_operation(&mut self) -> Result<Option<Operation>, ApiError> {
        let saved = self
            .editor
            .replace_operation(self.api.as_ref(), self.history.selected())
            .await?;
        Ok(self.adopt_saved(saved))
    }

    pub async fn copy_selected(&mut self) -> Result<bool, ApiError> {
        let selected = self.history.selected().cloned();
        self.editor
            .copy_selected(self.api.as_ref(), selected.as_ref())
            .await
    }

    /// Borra la operación seleccionada y pasa la selección a su vecina.
    pub async fn remove_selected(&mut self) -> Result<Option<NextSelection>, ApiError> {
        let next = self
            .editor
            .remove_selected(
                self.api.as_ref(),
                self.history.operations(),
                self.history.selected(),
            )
            .await?;

        if let Some(next) = &next {
            if let Err(e) = self.select_operation(next.operation.clone()).await {
                warn!("no se pudieron cargar resultados tras el borrado: {}", e);
            }
        }
        Ok(next)
    }

    /// Atiende un evento de relayout sobre el gráfico de `role`.
    pub async fn refine(&mut self, role: &str, event: &Map<String, Value>) -> Result<bool, ApiError> {
        let Some(entry) = self.results.as_mut().and_then(|view| view.get_mut(role)) else {
            return Ok(false);
        };
        range::refine(self.api.as_ref(), entry, event).await
    }
}
