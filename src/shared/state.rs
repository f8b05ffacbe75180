use crate::config::AppConfig;
use crate::pdf::PdfRenderer;
use crate::shared::utils::DbPool;

pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub renderer: PdfRenderer,
}
