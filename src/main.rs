use anyhow::Result;
use pdvmerge::pipeline::{self, RunOptions};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) resolve paths from the command line ──────────────────────
    // pdvmerge [ROOT [PDV_OUT [CONSULTOR_OUT]]]
    let mut args = env::args().skip(1);
    let mut options = RunOptions::with_default_paths();
    if let Some(root) = args.next() {
        options.root = PathBuf::from(root);
    }
    if let Some(path) = args.next() {
        options.pdv_output = PathBuf::from(path);
    }
    if let Some(path) = args.next() {
        options.consultor_output = PathBuf::from(path);
    }
    info!(
        root = %options.root.display(),
        pdv_output = %options.pdv_output.display(),
        consultor_output = %options.consultor_output.display(),
        "consolidating report archive"
    );

    // ─── 3) run the pipeline, print the summary ──────────────────────
    let summary = pipeline::run(&options)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
