use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ProcessApi;
use crate::error::ApiError;
use crate::spec::{OperationTypeSpec, SpecCategory};

pub const DEFAULT_CATEGORY: &str = "Default";

/// `{ specifications: [...] }` que devuelve el endpoint de especificaciones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecificationList {
    #[serde(default)]
    pub specifications: Vec<OperationTypeSpec>,
}

/// `CHANGE_BRIGHTNESS` -> `Change brightness`.
pub fn describe_type(kind: &str) -> String {
    let mut chars = kind.chars();
    let capitalized = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect::<String>(),
        None => String::new(),
    };
    capitalized.replace('_', " ")
}

/// Rellena la descripción y la categoría que el servidor puede omitir.
pub fn prepare_spec(mut spec: OperationTypeSpec) -> OperationTypeSpec {
    if spec.description.is_none() {
        spec.description = Some(describe_type(&spec.kind));
    }
    if spec.category.is_none() {
        spec.category = Some(DEFAULT_CATEGORY.to_string());
    }
    spec
}

/// Agrupa las specs por categoría, en orden de aparición tanto de las
/// categorías como de las specs dentro de cada una.
pub fn group_by_category(specs: Vec<OperationTypeSpec>) -> Vec<SpecCategory> {
    let mut categories: Vec<SpecCategory> = Vec::new();

    for spec in specs.into_iter().map(prepare_spec) {
        let name = spec
            .category
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        match categories.iter_mut().find(|c| c.name == name) {
            Some(category) => category.spec_list.push(spec),
            None => categories.push(SpecCategory {
                name,
                spec_list: vec![spec],
            }),
        }
    }

    categories
}

/// Pide y agrupa el catálogo de un proceso. Si la petición falla no se
/// produce nada.
pub async fn fetch_catalog(
    api: &dyn ProcessApi,
    process: &str,
) -> Result<Vec<SpecCategory>, ApiError> {
    let specs = api.specifications(process).await?;
    Ok(group_by_category(specs))
}

/// Catálogo del proceso en edición. Lo posee la sesión y se presta a quien
/// necesite buscar en él.
#[derive(Debug, Clone, Default)]
pub struct SpecStore {
    categories: Option<Vec<SpecCategory>>,
}

impl SpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.categories.is_some()
    }

    pub fn categories(&self) -> &[SpecCategory] {
        self.categories.as_deref().unwrap_or(&[])
    }

    /// Sustituye el catálogo solo cuando la petición salió bien.
    pub async fn load(&mut self, api: &dyn ProcessApi, process: &str) -> Result<(), ApiError> {
        let categories = fetch_catalog(api, process).await?;
        info!(
            "catálogo del proceso {} cargado: {} categorías, {} specs",
            process,
            categories.len(),
            categories.iter().map(|c| c.spec_list.len()).sum::<usize>()
        );
        self.categories = Some(categories);
        Ok(())
    }

    /// Posición de la categoría de la spec dentro del catálogo.
    pub fn category_index(&self, spec: &OperationTypeSpec) -> Option<usize> {
        let name = spec.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
        self.categories().iter().position(|c| c.name == name)
    }

    pub fn find(&self, kind: &str) -> Option<&OperationTypeSpec> {
        self.categories()
            .iter()
            .flat_map(|c| c.spec_list.iter())
            .find(|s| s.kind == kind)
    }
}
