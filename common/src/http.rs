use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::{Bounds, ProcessApi};
use crate::catalog::SpecificationList;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::operation::{Operation, OperationId, OperationList, Parameters, SaveMode, SaveResponse};
use crate::result::{ResultDescriptor, ResultList};
use crate::spec::OperationTypeSpec;

/// `ProcessApi` sobre los endpoints REST de lampek.
#[derive(Debug, Clone)]
pub struct HttpProcessApi {
    client: Client,
    root: String,
}

impl HttpProcessApi {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_root(config.api_root())
    }

    /// `root` es la URL de la que cuelgan las rutas `process/...`.
    pub fn with_root(root: impl Into<String>) -> Self {
        let mut root = root.into();
        if !root.ends_with('/') {
            root.push('/');
        }
        Self {
            client: Client::new(),
            root,
        }
    }

    /// Arma `{root}process/{process}/{tail...}`. Cada segmento se codifica
    /// por separado: `#`, `?` o `/` dentro de un nombre no cambian la ruta.
    fn url(&self, process: &str, tail: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.root).map_err(|e| ApiError::BadUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::BadUrl(format!("{} no admite rutas", self.root)))?
            .pop_if_empty()
            .push("process")
            .push(process)
            .extend(tail);
        Ok(url)
    }

    async fn checked(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::rejected(status.as_u16(), body))
    }

    async fn read<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let resp = Self::checked(resp).await?;
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl ProcessApi for HttpProcessApi {
    async fn specifications(&self, process: &str) -> Result<Vec<OperationTypeSpec>, ApiError> {
        let url = self.url(process, &["specification"])?;
        let resp = self.client.get(url).send().await?;
        let list: SpecificationList = Self::read(resp).await?;
        Ok(list.specifications)
    }

    async fn list_operations(&self, process: &str) -> Result<Vec<Operation>, ApiError> {
        let url = self.url(process, &["operation"])?;
        let resp = self.client.get(url).send().await?;
        let list: OperationList = Self::read(resp).await?;
        Ok(list.id_list)
    }

    async fn get_operation(&self, process: &str, id: OperationId) -> Result<Operation, ApiError> {
        let url = self.url(process, &["operation", &id.to_string()])?;
        let resp = self.client.get(url).send().await?;
        Self::read(resp).await
    }

    async fn save_operation(
        &self,
        process: &str,
        mode: SaveMode,
        request: &Parameters,
    ) -> Result<Operation, ApiError> {
        let builder = match mode {
            SaveMode::Append => self.client.put(self.url(process, &["operation"])?),
            SaveMode::At(id) => self
                .client
                .post(self.url(process, &["operation", &id.to_string()])?),
            SaveMode::Replace(id) => self
                .client
                .put(self.url(process, &["operation", &id.to_string()])?)
                .query(&[("replace", "true")]),
        };

        debug!("guardando operación en proceso {} ({:?})", process, mode);
        let resp = builder.json(request).send().await?;
        let saved: SaveResponse = Self::read(resp).await?;
        Ok(saved.into_operation(request))
    }

    async fn remove_operation(&self, process: &str, id: OperationId) -> Result<(), ApiError> {
        let url = self.url(process, &["operation", &id.to_string()])?;
        let resp = self.client.delete(url).send().await?;
        Self::checked(resp).await?;
        Ok(())
    }

    async fn results(
        &self,
        process: &str,
        id: OperationId,
    ) -> Result<Vec<ResultDescriptor>, ApiError> {
        let url = self.url(process, &["operation", &id.to_string(), "result"])?;
        let resp = self.client.get(url).send().await?;
        let list: ResultList = Self::read(resp).await?;
        Ok(list.result_list)
    }

    async fn result_value(
        &self,
        process: &str,
        id: OperationId,
        role: &str,
        bounds: Bounds,
    ) -> Result<Value, ApiError> {
        let url = self.url(process, &["operation", &id.to_string(), "result", role])?;
        let resp = self
            .client
            .get(url)
            .query(&bounds.query())
            .send()
            .await?;
        Self::read(resp).await
    }
}
