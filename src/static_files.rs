use std::path::Path;

use tower_http::services::ServeDir;

/// Serve the web UI from `dir`; `/` resolves to `index.html`
pub fn static_service(dir: impl AsRef<Path>) -> ServeDir {
    ServeDir::new(dir).append_index_html_on_directories(true)
}
