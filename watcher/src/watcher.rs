use anyhow::Result;
use clap::Parser;
use common::plot::ResultView;
use common::{ClientConfig, HttpProcessApi, Operation, ResultPayload, Session};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Sigue el historial de un proceso y muestra los resultados de la
/// operación seleccionada cada vez que cambia de estado.
#[derive(Parser)]
#[command(name = "watcher")]
struct Args {
    /// Proceso a seguir
    #[arg(value_name = "PROCESO")]
    process: String,
}

/// Una línea por resultado; los numéricos agregados se expanden.
fn summarize(view: &ResultView) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in &view.results {
        let role = &entry.descriptor.role;
        match &entry.descriptor.payload {
            ResultPayload::Numerical(values) => {
                for value in values {
                    match &value.payload {
                        ResultPayload::Integer(n) => lines.push(format!("{} = {}", value.role, n)),
                        ResultPayload::Double(x) => lines.push(format!("{} = {}", value.role, x)),
                        _ => {}
                    }
                }
            }
            _ => {
                let kind = entry.descriptor.result_type().as_tag();
                let series = entry.plot.as_ref().map_or(0, |p| p.data.len());
                lines.push(format!("{} : {} ({} series)", role, kind, series));
            }
        }
    }
    lines
}

fn report(session: &Session, selected: &Operation) {
    info!(
        "operación {} ({}) done={} failed={}",
        selected.id, selected.kind, selected.done, selected.failed
    );
    if let Some(view) = session.results() {
        for line in summarize(view) {
            info!("  {}", line);
        }
    }
}

/// Loop principal del watcher.
/// - Carga el catálogo (solo informativo).
/// - Lanza el poller del historial.
/// - Aplica cada respuesta hasta Ctrl-C.
pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("watcher=debug,common=info,reqwest=info")),
        )
        .init();

    let args = Args::parse();
    let config = ClientConfig::from_env();
    let api = Arc::new(HttpProcessApi::new(&config));
    let mut session = Session::new(api, args.process.as_str());

    info!("siguiendo proceso {} en {}", args.process, config.api_root());

    match session.load_catalog().await {
        Ok(()) => {
            let types: usize = session
                .specs()
                .categories()
                .iter()
                .map(|c| c.spec_list.len())
                .sum();
            info!("catálogo: {} tipos de operación", types);
        }
        Err(e) => warn!("no se pudo cargar el catálogo: {}", e),
    }

    let mut polls = session.start_polling(config.poll_interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C recibido, parando");
                break;
            }
            next = polls.recv() => {
                let Some(response) = next else {
                    warn!("el poller terminó");
                    break;
                };
                let failed_poll = response.result.is_err();
                match session.apply_poll(response).await {
                    Ok(Some(selected)) => report(&session, &selected),
                    Ok(None) => debug!("{} operaciones, sin cambios", session.history().operations().len()),
                    // el poller ya avisó
                    Err(_) if failed_poll => {}
                    Err(e) => warn!("no se pudieron leer los resultados: {}", e),
                }
            }
        }
    }

    polls.stop();
    Ok(())
}
