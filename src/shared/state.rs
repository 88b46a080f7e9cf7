use std::sync::Arc;

use crate::config::AppConfig;
use crate::email::Mailer;
use crate::nlp::Classifier;
use crate::shared::utils::DbPool;

/// Shared application state handed to every handler.
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub classifier: Arc<dyn Classifier>,
    pub mailer: Option<Arc<Mailer>>,
}
