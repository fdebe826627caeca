use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::infrastructure::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber: a console layer and, when `config.dir` is
/// set, a plain-text layer appending to `{dir}/{service}.log`.
///
/// `RUST_LOG` replaces the default filter.
pub fn init(service: &str, config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{service}=debug,pdf_rag=debug,tower_http=debug").into()
    });

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console = tracing_subscriber::fmt::layer();
    if config.json {
        layers.push(console.json().boxed());
    } else {
        layers.push(console.boxed());
    }

    if let Some(dir) = &config.dir {
        fs::create_dir_all(dir)?;
        let path = Path::new(dir).join(format!("{service}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    Ok(())
}
