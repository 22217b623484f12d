pub mod items;
pub mod reports;
pub mod withdrawals;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    import::ImportService, ledger::LedgerService, reports::ReportService,
    suggestions::SuggestionService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub ledger: Arc<LedgerService>,
    pub reports: Arc<ReportService>,
    pub suggestions: Arc<SuggestionService>,
    pub import: Arc<ImportService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        let ledger = Arc::new(LedgerService::new(db_pool.clone(), event_sender));
        let reports = Arc::new(ReportService::new(db_pool.clone()));
        let suggestions = Arc::new(SuggestionService::new(db_pool));
        let import = Arc::new(ImportService::new(ledger.clone()));

        Self {
            ledger,
            reports,
            suggestions,
            import,
        }
    }
}
