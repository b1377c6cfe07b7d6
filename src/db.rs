use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use std::time::Duration;
use tracing::warn;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub fn init_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder().build(manager).expect("Failed to create pool.")
}

/// Maximum number of attempts for a write that hits a locked database
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Runs a write statement against the pool, retrying on SQLITE_BUSY
///
/// SQLite allows only one writer at a time; a second writer sees
/// "database is locked" rather than queueing. Retrying with a short
/// backoff is enough for the write rates this store sees.
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `op` - The statement to execute, given a pooled connection
///
/// ### Returns
///
/// The number of rows affected by the statement
///
/// ### Errors
///
/// Returns an error if a connection cannot be checked out, or if the
/// statement still fails after all retry attempts
pub async fn execute_with_retry<F>(pool: &DbPool, mut op: F) -> anyhow::Result<usize>
where
    F: FnMut(&mut SqliteConnection) -> diesel::QueryResult<usize>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let conn = &mut pool.get()?;
        match op(conn) {
            Ok(rows) => return Ok(rows),
            Err(e) if attempt < MAX_WRITE_ATTEMPTS && is_locked_error(&e) => {
                warn!("Write hit a locked database (attempt {}), retrying", attempt);
                tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Whether a Diesel error is SQLite's transient "database is locked"
fn is_locked_error(e: &diesel::result::Error) -> bool {
    match e {
        diesel::result::Error::DatabaseError(_, info) => {
            info.message().contains("database is locked")
        }
        _ => false,
    }
}
