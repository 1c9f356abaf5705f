use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::catalog::{fetch_catalog, SpecStore};
use common::defaults::defaults_for;
use common::editor::PipelineEditor;
use common::plot::PlottedResult;
use common::{
    ClientConfig, HttpProcessApi, Operation, OperationId, OperationTypeSpec, ProcessApi, Session,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Configuración por entorno:
/// - LAMPEK_URL (default http://localhost:8080)
/// - LAMPEK_USER para rutas /user/{name}/process/...
#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI para editar pipelines de un proceso lampek")]
struct Cli {
    /// Proceso sobre el que se trabaja
    #[arg(short, long, value_name = "PROCESO")]
    process: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lista el catálogo de operaciones agrupado por categoría
    Specs,

    /// Muestra los parámetros por defecto de un tipo de operación
    Defaults {
        #[arg(value_name = "TIPO")]
        kind: String,
    },

    /// Lista las operaciones del proceso con su estado
    History,

    /// Inserta una operación nueva (al final, o en --at)
    Insert {
        #[arg(value_name = "TIPO")]
        kind: String,

        /// Guardar en la posición de esta operación
        #[arg(long, value_name = "ID")]
        at: Option<OperationId>,

        /// Resultado de la operación anterior usado como entrada
        #[arg(long, value_name = "ROL")]
        result: Option<String>,

        /// Parámetro nombre=valor (valor en JSON o texto)
        #[arg(long = "param", value_name = "NOMBRE=VALOR", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// Reemplaza una operación conservando su entrada encadenada
    Replace {
        #[arg(value_name = "ID")]
        id: OperationId,

        #[arg(value_name = "TIPO")]
        kind: String,

        #[arg(long = "param", value_name = "NOMBRE=VALOR", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// Muestra tipo y parámetros de una operación existente
    Copy {
        #[arg(value_name = "ID")]
        id: OperationId,
    },

    /// Borra una operación y muestra cuál queda seleccionada
    Remove {
        #[arg(value_name = "ID")]
        id: OperationId,
    },

    /// Resultados de una operación
    Results {
        #[arg(value_name = "ID")]
        id: OperationId,

        /// Imprime los gráficos completos en JSON
        #[arg(long)]
        plots: bool,
    },

    /// Vuelve a pedir un resultado para un rango del eje x
    Refine {
        #[arg(value_name = "ID")]
        id: OperationId,

        #[arg(value_name = "ROL")]
        role: String,

        /// Evento de relayout, p.ej. '{"xaxis.range":[0,2]}'
        #[arg(long, value_name = "JSON")]
        event: String,
    },
}

/// `radius=3` -> ("radius", 3); valores que no son JSON quedan como texto.
fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("se esperaba NOMBRE=VALOR, llegó '{raw}'"))?;
    if name.is_empty() {
        return Err(format!("nombre vacío en '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn print_operation(op: &Operation) {
    let estado = match op.status() {
        (_, true) => "fallida",
        (true, false) => "terminada",
        (false, false) => "pendiente",
    };
    println!("  [{}] {} ({})", op.id, op.kind, estado);
}

fn print_result(entry: &PlottedResult, plots: bool) -> Result<()> {
    let descriptor = &entry.descriptor;
    println!("  {} : {}", descriptor.role, descriptor.result_type().as_tag());

    match &entry.plot {
        Some(plot) if plots => println!("{}", serde_json::to_string_pretty(plot)?),
        Some(plot) => println!("    series: {}", plot.data.len()),
        None => {}
    }
    if entry.binding.is_some() {
        println!("    (admite refinar rango)");
    }
    Ok(())
}

/// Cabecera con la categoría y una línea por parámetro, rotulada con su
/// descripción cuando el servidor la declara.
fn defaults_lines(spec: &OperationTypeSpec, category_index: Option<usize>) -> Vec<String> {
    let categoria = spec.category.as_deref().unwrap_or_default();
    let mut lines = vec![match category_index {
        Some(i) => format!("{} (categoría {} #{})", spec.kind, categoria, i + 1),
        None => format!("{} (categoría {})", spec.kind, categoria),
    }];

    let defaults = defaults_for(spec);
    for (name, param) in &spec.parameters {
        lines.push(match defaults.get(name) {
            Some(value) => format!("  {} = {}", param.label(name), value),
            None => format!("  {} (sin valor por defecto)", param.label(name)),
        });
    }
    lines
}

async fn editor_for(
    api: &dyn ProcessApi,
    process: &str,
    kind: &str,
    params: Vec<(String, Value)>,
) -> Result<PipelineEditor> {
    let catalog = fetch_catalog(api, process)
        .await
        .context("no se pudo leer el catálogo")?;
    let spec = catalog
        .into_iter()
        .flat_map(|c| c.spec_list)
        .find(|s| s.kind == kind)
        .with_context(|| format!("tipo de operación desconocido: {kind}"))?;

    let mut editor = PipelineEditor::new(process);
    editor.select_spec(spec);
    for (name, value) in params {
        editor.set_parameter(name, value);
    }
    Ok(editor)
}

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("client=info,common=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    let api = Arc::new(HttpProcessApi::new(&config));
    let process = cli.process;

    match cli.command {
        Commands::Specs => {
            let catalog = fetch_catalog(api.as_ref(), &process).await?;
            if catalog.is_empty() {
                println!("El proceso {process} no declara operaciones.");
            }
            for category in catalog {
                println!("{}", category.name);
                for spec in category.spec_list {
                    println!(
                        "  {} - {}",
                        spec.kind,
                        spec.description.as_deref().unwrap_or_default()
                    );
                }
            }
        }

        Commands::Defaults { kind } => {
            let mut store = SpecStore::new();
            store.load(api.as_ref(), &process).await?;
            let spec = store
                .find(&kind)
                .with_context(|| format!("tipo de operación desconocido: {kind}"))?;

            for line in defaults_lines(spec, store.category_index(spec)) {
                println!("{line}");
            }
        }

        Commands::History => {
            let ops = api.list_operations(&process).await?;
            println!("Proceso {} ({} operaciones):", process, ops.len());
            for op in &ops {
                print_operation(op);
            }
        }

        Commands::Insert {
            kind,
            at,
            result,
            params,
        } => {
            let mut editor = editor_for(api.as_ref(), &process, &kind, params).await?;
            editor.select_result(result);

            let selected = match at {
                Some(id) => Some(api.get_operation(&process, id).await?),
                None => None,
            };
            match editor.insert_operation(api.as_ref(), selected.as_ref()).await? {
                Some(saved) => {
                    println!("Operación guardada:");
                    print_operation(&saved);
                }
                None => bail!("no hay tipo de operación seleccionado"),
            }
        }

        Commands::Replace { id, kind, params } => {
            let editor = editor_for(api.as_ref(), &process, &kind, params).await?;
            let selected = api.get_operation(&process, id).await?;
            if let Some(saved) = editor.replace_operation(api.as_ref(), Some(&selected)).await? {
                println!("Operación {id} reemplazada:");
                print_operation(&saved);
            }
        }

        Commands::Copy { id } => {
            let selected = api.get_operation(&process, id).await?;
            let mut editor = PipelineEditor::new(process.as_str());
            editor.copy_selected(api.as_ref(), Some(&selected)).await?;

            let kind = editor.selected_spec().map(|s| s.kind.as_str()).unwrap_or_default();
            println!("Copiada operación {id}: {kind}");
            println!("  categoría: {}", editor.selected_category().unwrap_or_default());
            println!("{}", serde_json::to_string_pretty(editor.parameters())?);
        }

        Commands::Remove { id } => {
            let ops = api.list_operations(&process).await?;
            let selected = match ops.iter().find(|op| op.id == id) {
                Some(op) => op.clone(),
                None => api.get_operation(&process, id).await?,
            };

            let editor = PipelineEditor::new(process.as_str());
            if let Some(next) = editor.remove_selected(api.as_ref(), &ops, Some(&selected)).await? {
                println!("Operación {id} borrada.");
                match next.operation {
                    Some(op) => {
                        println!("Siguiente selección (índice {}):", next.index);
                        print_operation(&op);
                    }
                    None => println!("No queda nada seleccionado."),
                }
            }
        }

        Commands::Results { id, plots } => {
            let mut session = Session::new(api.clone(), process.as_str());
            let selected = api.get_operation(&process, id).await?;
            session.select_operation(Some(selected)).await?;

            if let Some(view) = session.results() {
                println!("Resultados de la operación {}:", view.operation_id);
                if view.results.is_empty() {
                    println!("  (sin resultados)");
                }
                for entry in &view.results {
                    print_result(entry, plots)?;
                }
            }
        }

        Commands::Refine { id, role, event } => {
            let event: Map<String, Value> =
                serde_json::from_str(&event).context("el evento debe ser un objeto JSON")?;

            let mut session = Session::new(api.clone(), process.as_str());
            let selected = api.get_operation(&process, id).await?;
            session.select_operation(Some(selected)).await?;

            if !session.refine(&role, &event).await? {
                println!("El evento no cambia el rango de '{role}' (o no es refinable).");
            }
            if let Some(entry) = session.results().and_then(|v| v.get(&role)) {
                print_result(entry, true)?;
            }
        }
    }

    Ok(())
}
