use anyhow::Result;
use rescraper::{
    config::Config,
    fetch,
    history::{load_processed, record_processed},
    process,
};
use reqwest::Client;
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    sync::{mpsc, Semaphore},
    time::Instant,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn workbook_name(path_or_url: &str) -> String {
    Path::new(path_or_url)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path_or_url.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rescraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config + scaffold dirs ──────────────────────────────
    let config_path = env::var("RESCRAPER_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let cfg = Arc::new(Config::load(&config_path)?);

    for d in [&cfg.raw_dir, &cfg.out_dir, &cfg.history_dir] {
        fs::create_dir_all(d)?;
    }

    // ─── 3) load history to skip processed workbooks ─────────────────
    let mut processed = load_processed(&cfg.history_dir)?;
    info!("{} workbooks already done", processed.len());

    // ─── 4) discover new spreadsheet URLs ────────────────────────────
    let client = Client::new();
    let mut workbooks: Vec<PathBuf> = Vec::new();

    if cfg.feeds.is_empty() {
        info!("no feeds configured; processing local workbooks only");
    } else {
        let feeds = fetch::urls::fetch_sheet_urls(&client, &cfg.feeds).await?;
        let to_fetch: Vec<String> = feeds
            .values()
            .flatten()
            .filter(|u| !processed.contains(&workbook_name(u.as_str())))
            .cloned()
            .collect();
        info!("{} spreadsheets to download", to_fetch.len());

        // ─── 5) spawn downloader tasks ───────────────────────────────
        let (tx, mut rx) = mpsc::channel::<Result<PathBuf, (String, String)>>(100);
        let dl_sem = Arc::new(Semaphore::new(3));
        let mut dl_handles = Vec::with_capacity(to_fetch.len());

        for url in to_fetch {
            let client = client.clone();
            let raw_dir = cfg.raw_dir.clone();
            let tx = tx.clone();
            let sem = dl_sem.clone();

            dl_handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.unwrap();
                let name = workbook_name(&url);
                info!(name = %name, "downloading");
                let start = Instant::now();
                match fetch::files::download_file(&client, &url, &raw_dir).await {
                    Ok(path) => {
                        info!(name = %name, elapsed = ?start.elapsed(), "downloaded");
                        let _ = tx.send(Ok(path)).await;
                    }
                    Err(err) => {
                        error!("{} failed: {}", url, err);
                        let _ = tx.send(Err((url.clone(), err.to_string()))).await;
                    }
                }
            }));
        }
        // drop the original sender so `rx.recv()` ends once all downloads complete
        drop(tx);

        while let Some(msg) = rx.recv().await {
            match msg {
                Ok(path) => workbooks.push(path),
                Err((url, err)) => error!("download error {}: {}", url, err),
            }
        }
        futures::future::join_all(dl_handles).await;
    }

    // ─── 6) pick up local workbooks that were never processed ────────
    for pattern in ["*.zip", "*.csv"] {
        let pattern = cfg.raw_dir.join(pattern);
        for entry in glob::glob(&pattern.to_string_lossy())? {
            let path = entry?;
            if !workbooks.contains(&path) {
                workbooks.push(path);
            }
        }
    }

    // ─── 7) process workbooks one at a time ──────────────────────────
    for workbook in workbooks {
        let name = workbook_name(&workbook.to_string_lossy());
        if processed.contains(&name) {
            continue;
        }
        info!("processing {}", name);

        // transform work is CPU bound, keep it off the runtime
        let result = tokio::task::spawn_blocking({
            let cfg = Arc::clone(&cfg);
            let workbook = workbook.clone();
            move || process::run_workbook(&workbook, &cfg)
        })
        .await?;

        match result {
            Ok(out_path) => {
                record_processed(&cfg.history_dir, &name)?;
                processed.insert(name.clone());
                info!(name = %name, out = %out_path.display(), "workbook done");
            }
            Err(e) => {
                error!("processing {} failed: {:#}", name, e);
            }
        }
    }

    info!("all done");
    Ok(())
}
