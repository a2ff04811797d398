//! Query helpers for the `repos` table.

use rusqlite::params;
use tracing::debug;

use super::Database;
use crate::errors::DatabaseError;

impl Database {
    /// Every repository name in the `repos` table, in insertion order.
    ///
    /// Runs `SELECT * FROM repos` and reads the `name` column by name, so
    /// externally managed tables with extra columns work as long as they
    /// carry one called `name`.
    pub fn list_repo_names(&self) -> Result<Vec<String>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT * FROM repos")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>("name"))?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = names.len(), "loaded repository names");
        Ok(names)
    }

    /// Insert repository names in one transaction, skipping names already
    /// stored. Returns how many were new.
    pub fn add_repos<S: AsRef<str>>(&self, names: &[S]) -> Result<usize, DatabaseError> {
        self.transaction(|conn| {
            let mut stmt = conn.prepare("INSERT OR IGNORE INTO repos (name) VALUES (?1)")?;
            let mut inserted = 0;
            for name in names {
                inserted += stmt.execute(params![name.as_ref()])?;
            }
            debug!(requested = names.len(), inserted, "add_repos");
            Ok(inserted)
        })
    }

    /// Delete a repository name. Returns `false` if it was not present.
    pub fn remove_repo(&self, name: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let deleted = conn.execute("DELETE FROM repos WHERE name = ?1", params![name])?;
        debug!(name, deleted, "remove_repo");
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_repo_list_round_trip() {
        let db = setup_db();
        assert!(db.list_repo_names().unwrap().is_empty());

        assert_eq!(db.add_repos(&["course-a", "other-org/course-b"]).unwrap(), 2);
        assert_eq!(db.add_repos(&["course-a", "course-c"]).unwrap(), 1);

        assert_eq!(
            db.list_repo_names().unwrap(),
            vec!["course-a", "other-org/course-b", "course-c"]
        );

        assert!(db.remove_repo("course-a").unwrap());
        assert!(!db.remove_repo("course-a").unwrap());
        assert_eq!(
            db.list_repo_names().unwrap(),
            vec!["other-org/course-b", "course-c"]
        );
    }

    #[test]
    fn test_add_repos_is_all_or_nothing() {
        let db = setup_db();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON repos
                 WHEN NEW.name = 'bad' BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        assert!(db.add_repos(&["good", "bad"]).is_err());
        assert!(db.list_repo_names().unwrap().is_empty());
    }

    #[test]
    fn test_externally_created_table() {
        // A table maintained by another tool, with its own column layout.
        let db = Database::in_memory().unwrap();
        db.conn()
            .execute_batch(
                "CREATE TABLE repos (owner TEXT, name TEXT NOT NULL, stars INTEGER);
                 INSERT INTO repos VALUES ('acme', 'widgets', 3);
                 INSERT INTO repos VALUES ('acme', 'gadgets', 0);",
            )
            .unwrap();

        assert_eq!(db.list_repo_names().unwrap(), vec!["widgets", "gadgets"]);
    }

    #[test]
    fn test_missing_table_is_error() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.list_repo_names(),
            Err(DatabaseError::SqliteError(_))
        ));
    }
}
