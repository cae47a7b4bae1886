use crate::loader::LoaderStats;

/// Human-readable status line, refreshed on every significant event.
#[derive(Debug, Clone, Default)]
pub struct StatusReporter {
    line: String,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn report(&mut self, message: &str, cache_len: usize, stats: &LoaderStats) -> &str {
        self.line = render(message, cache_len, stats);
        tracing::info!(
            target: "seatile::status",
            cache_tiles = cache_len,
            total_requested = stats.total_requested,
            fetch_failures = stats.fetch_failures,
            "{}",
            self.line
        );
        &self.line
    }
}

fn render(message: &str, cache_len: usize, stats: &LoaderStats) -> String {
    let last_batch = stats
        .last_batch
        .map(|elapsed| format!("{}ms", elapsed.as_millis()))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{message} | tiles loaded: {cache_len} | load time: {last_batch} | total loaded: {}",
        stats.total_requested
    )
}
