//! SQLite test infrastructure
//!
//! Provides a `TestDatabase` helper backed by a temporary SQLite file with the
//! workspace migrations applied.

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tempfile::TempDir;

/// Test database wrapper that ensures proper cleanup
///
/// The database file lives in a temporary directory that is removed when this
/// struct is dropped.
pub struct TestDatabase {
    #[allow(dead_code)]
    dir: TempDir,
    pub connection: DatabaseConnection,
    pub connection_string: String,
}

impl TestDatabase {
    /// Create a new test database with migrations applied
    ///
    /// # Example
    ///
    /// ```no_run
    /// use test_utils::TestDatabase;
    ///
    /// # async fn example() {
    /// let db = TestDatabase::new().await;
    /// // Hand db.connection() to the service under test
    /// # }
    /// ```
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        let connection_string = format!("sqlite://{}?mode=rwc", path.display());

        // A few connections so a transaction and a plain read can overlap
        let mut options = ConnectOptions::new(connection_string.clone());
        options.max_connections(4).sqlx_logging(false);

        let connection = Database::connect(options)
            .await
            .expect("Failed to connect to test database");

        Migrator::up(&connection, None)
            .await
            .expect("Failed to run migrations");

        tracing::info!(path = %path.display(), "Test database ready (SQLite)");

        Self {
            dir,
            connection,
            connection_string,
        }
    }

    /// Get a clone of the database connection
    pub fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }
}
