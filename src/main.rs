use anyhow::Result;
use eurostatscraper::{
    config::Config,
    datasets,
    fetch,
    flatten::Table,
    history::History,
    sink,
};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, Semaphore},
    time::Instant,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config + history ────────────────────────────────────
    let config = Config::load_or_default()?;
    let history = History::new(&config.history_dir)?;

    // ─── 3) resolve datasets to sync ─────────────────────────────────
    let mut targets = datasets::resolve(&config.dataset_codes());
    if config.resume {
        let synced = history.load_event_names("synced")?;
        info!("{} datasets already synced", synced.len());
        targets.retain(|t| !synced.contains(&t.code));
    }

    if targets.is_empty() {
        info!("no datasets to sync; exit");
        return Ok(());
    }
    info!("{} datasets to sync", targets.len());

    // ─── 4) spawn downloader tasks ──────────────────────────────────
    let client = fetch::build_client(config.user_agent.as_deref())?;
    let (tx, mut rx) = mpsc::channel::<Result<(String, Table), (String, String)>>(100);
    let dl_sem = Arc::new(Semaphore::new(3));
    let mut dl_handles = Vec::with_capacity(targets.len());

    for target in targets {
        let client = client.clone();
        let base_url = config.base_url.clone();
        let tx = tx.clone();
        let sem = dl_sem.clone();

        dl_handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore closed");
            if let Some(description) = target.description {
                info!(dataset = %target.code, %description, "downloading");
            } else {
                info!(dataset = %target.code, "downloading (not in catalog)");
            }
            let start = Instant::now();
            let result = async {
                let url = fetch::urls::dataset_url(&base_url, &target.code)?;
                fetch::tables::download_table(&client, &url).await
            }
            .await;
            match result {
                Ok(table) => {
                    info!(dataset = %target.code, elapsed = ?start.elapsed(), "downloaded");
                    let _ = tx.send(Ok((target.code, table))).await;
                }
                Err(err) => {
                    error!("{} failed: {}", target.code, err);
                    let _ = tx.send(Err((target.code, err.to_string()))).await;
                }
            }
        }));
    }
    // drop the original sender so `rx.recv()` ends once all downloads complete
    drop(tx);

    // ─── 5) flatten + write downloaded tables one at a time ─────────
    while let Some(msg) = rx.recv().await {
        match msg {
            Ok((dataset, table)) => {
                info!("processing {}", dataset);

                // offload flattening + Parquet writing to the blocking pool
                let limit = config.record_limit;
                let out_dir = config.out_dir.clone();
                let code = dataset.clone();
                let written = tokio::task::spawn_blocking(move || {
                    let records = table.records(limit)?;
                    sink::write_dataset(&code, records, &out_dir)
                })
                .await?;

                match written {
                    Ok(rows) => {
                        history.record_event(&dataset, "synced", rows)?;
                        info!(dataset = %dataset, rows, "synced");
                    }
                    Err(e) => {
                        error!("flatten {} failed: {}", dataset, e);
                    }
                }
            }

            Err((dataset, err)) => {
                error!("download error {}: {}", dataset, err);
            }
        }
    }

    // ─── 6) await all downloader tasks ──────────────────────────────
    for h in dl_handles {
        let _ = h.await;
    }

    info!("all done");
    Ok(())
}
