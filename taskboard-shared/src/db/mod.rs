/// PostgreSQL plumbing for the document store
///
/// - `pool`: connection pool with health checks
/// - `migrations`: embedded migration runner for the `documents` table
///
/// The store itself (queries over `documents`) lives in
/// [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
