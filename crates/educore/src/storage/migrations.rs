use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use rusqlite::Connection;

mod embedded {
    use refinery::embed_migrations;

    embed_migrations!("./migrations");
}

static MIGRATION_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Applies every embedded migration that is not yet recorded in
/// `refinery_schema_history` and returns how many were applied.
///
/// Already-applied versions are skipped, so running this repeatedly
/// converges on the same schema.
pub fn run_migrations(conn: &mut Connection) -> Result<usize, refinery::Error> {
    // Serialize runners in this process; other processes wait on the
    // SQLite busy timeout instead.
    let mutex = MIGRATION_LOCK.get_or_init(|| Mutex::new(()));
    let _guard = match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Migration lock was poisoned, recovering...");
            poisoned.into_inner()
        }
    };

    if let Err(e) = conn.busy_timeout(Duration::from_secs(30)) {
        log::warn!("Failed to set SQLite busy timeout for migrations: {}", e);
    }

    let report = embedded::migrations::runner().run(conn)?;
    let applied = report.applied_migrations();
    for migration in applied {
        log::info!("Applied migration {}", migration);
    }

    Ok(applied.len())
}

/// Versions of every embedded migration, in order.
pub fn embedded_versions() -> Vec<u32> {
    embedded::migrations::runner()
        .get_migrations()
        .iter()
        .map(|m| m.version())
        .collect()
}
