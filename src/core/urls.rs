#[derive(Debug)]
pub struct ApiUrls;

impl ApiUrls {
    // Planning resources - JSON APIs
    pub const PLANNING_CHANTIERS: &'static str = "/api/planning/chantiers";
    pub const PLANNING_OUVRIERS: &'static str = "/api/planning/ouvriers-internes";
    pub const PLANNING_SOUS_TRAITANTS: &'static str = "/api/planning/soustraitants";

    // Planning tasks - JSON APIs
    pub const PLANNING_TASKS: &'static str = "/api/planning/tasks";
    pub const PLANNING_TASKS_STATS: &'static str = "/api/planning/tasks/stats";
    pub const PLANNING_TASKS_BATCH: &'static str = "/api/planning/tasks/batch";
    pub const PLANNING_TASKS_DUPLICATE_WEEK: &'static str = "/api/planning/tasks/duplicate-week";
    pub const PLANNING_TASK_BY_ID: &'static str = "/api/planning/tasks/:id";
    pub const PLANNING_TASK_STATUS: &'static str = "/api/planning/tasks/:id/status";

    // Planning export
    pub const PLANNING_EXPORT_PDF: &'static str = "/api/planning/export-pdf";
}
