mod alert_repo;

pub use alert_repo::{AlertRepo, PgAlertStore};
