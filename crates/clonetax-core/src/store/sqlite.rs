//! SQLite-backed content store.
//!
//! Persists taxonomy data in the classic four-table shape: `terms` holds the
//! name/slug pair, `term_taxonomy` scopes a term to a taxonomy with its
//! description and parent, `termmeta` holds key/value meta rows, and
//! `term_relationships` links posts to taxonomy-scoped terms. Meta values
//! are stored as JSON text.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::debug;

use super::ContentStore;
use crate::error::{CloneError, Result};
use crate::types::{CreatedTerm, Term};

/// SQLite content store.
///
/// Thread-safe via an internal mutex on the connection; every trait call is
/// a single blocking statement or transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given database path.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).map_err(|e| CloneError::Database {
            message: format!("Failed to open database {}", db_path.as_ref().display()),
            source: Some(e),
        })?;
        Self::from_connection(conn)
    }

    /// Open a transient in-memory store. Used by tests and demos.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| CloneError::Database {
            message: "Failed to open in-memory database".to_string(),
            source: Some(e),
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| CloneError::Database {
                message: "Failed to set pragmas".to_string(),
                source: Some(e),
            })?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| CloneError::Database {
            message: format!("Failed to lock database: {}", e),
            source: None,
        })
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Registered classification schemes
            CREATE TABLE IF NOT EXISTS taxonomies (
                name TEXT PRIMARY KEY
            );

            -- Registered content kinds
            CREATE TABLE IF NOT EXISTS post_types (
                name TEXT PRIMARY KEY
            );

            -- Term name/slug pairs, shared across taxonomies
            CREATE TABLE IF NOT EXISTS terms (
                term_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                slug TEXT NOT NULL
            );

            -- Taxonomy-scoped view of a term: description, hierarchy
            CREATE TABLE IF NOT EXISTS term_taxonomy (
                term_taxonomy_id INTEGER PRIMARY KEY AUTOINCREMENT,
                term_id INTEGER NOT NULL REFERENCES terms(term_id),
                taxonomy TEXT NOT NULL REFERENCES taxonomies(name),
                description TEXT NOT NULL DEFAULT '',
                parent INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_term_taxonomy_tax
                ON term_taxonomy(taxonomy, term_id);

            -- Term meta; keys are non-unique, one row per value
            CREATE TABLE IF NOT EXISTS termmeta (
                meta_id INTEGER PRIMARY KEY AUTOINCREMENT,
                term_id INTEGER NOT NULL,
                meta_key TEXT NOT NULL,
                meta_value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_termmeta_term
                ON termmeta(term_id, meta_key);

            -- Content items
            CREATE TABLE IF NOT EXISTS posts (
                post_id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_type TEXT NOT NULL REFERENCES post_types(name),
                title TEXT NOT NULL DEFAULT ''
            );

            -- Many-to-many post/term links
            CREATE TABLE IF NOT EXISTS term_relationships (
                post_id INTEGER NOT NULL,
                term_taxonomy_id INTEGER NOT NULL,
                PRIMARY KEY (post_id, term_taxonomy_id)
            ) WITHOUT ROWID;
            "#,
        )
        .map_err(|e| CloneError::Database {
            message: "Failed to initialize schema".to_string(),
            source: Some(e),
        })?;

        Ok(())
    }

    /// Register a taxonomy name. Idempotent.
    pub fn register_taxonomy(&self, taxonomy: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO taxonomies (name) VALUES (?1)",
            params![taxonomy],
        )
        .map_err(|e| CloneError::Database {
            message: format!("Failed to register taxonomy {}", taxonomy),
            source: Some(e),
        })?;
        Ok(())
    }

    /// Register a post type name. Idempotent.
    pub fn register_post_type(&self, post_type: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO post_types (name) VALUES (?1)",
            params![post_type],
        )
        .map_err(|e| CloneError::Database {
            message: format!("Failed to register post type {}", post_type),
            source: Some(e),
        })?;
        Ok(())
    }

    /// Insert a post of the given type, returning its identifier.
    pub fn insert_post(&self, post_type: &str, title: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO posts (post_type, title) VALUES (?1, ?2)",
            params![post_type, title],
        )
        .map_err(|e| CloneError::Database {
            message: format!("Failed to insert post '{}'", title),
            source: Some(e),
        })?;
        Ok(conn.last_insert_rowid())
    }

    /// Rewrite a term's parent pointer. Seeding helper for building
    /// hierarchies whose child identifiers precede their parents'.
    pub fn set_term_parent(&self, taxonomy: &str, term_id: i64, parent: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE term_taxonomy SET parent = ?1 WHERE taxonomy = ?2 AND term_id = ?3",
                params![parent, taxonomy, term_id],
            )
            .map_err(|e| CloneError::Database {
                message: format!("Failed to reparent term {}", term_id),
                source: Some(e),
            })?;
        if updated == 0 {
            return Err(CloneError::TermNotFound {
                term_id,
                taxonomy: taxonomy.to_string(),
            });
        }
        Ok(())
    }

    fn term_taxonomy_id(
        conn: &Connection,
        taxonomy: &str,
        term_id: i64,
    ) -> Result<Option<i64>> {
        conn.query_row(
            "SELECT term_taxonomy_id FROM term_taxonomy WHERE taxonomy = ?1 AND term_id = ?2",
            params![taxonomy, term_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CloneError::Database {
            message: format!("Failed to resolve term {} in taxonomy {}", term_id, taxonomy),
            source: Some(e),
        })
    }
}

impl ContentStore for SqliteStore {
    fn taxonomy_exists(&self, taxonomy: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM taxonomies WHERE name = ?1",
                params![taxonomy],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CloneError::Database {
                message: format!("Failed to check taxonomy {}", taxonomy),
                source: Some(e),
            })?;
        Ok(found.is_some())
    }

    fn post_type_exists(&self, post_type: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM post_types WHERE name = ?1",
                params![post_type],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CloneError::Database {
                message: format!("Failed to check post type {}", post_type),
                source: Some(e),
            })?;
        Ok(found.is_some())
    }

    fn count_terms(&self, taxonomy: &str) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM term_taxonomy WHERE taxonomy = ?1",
                params![taxonomy],
                |row| row.get(0),
            )
            .map_err(|e| CloneError::Database {
                message: format!("Failed to count terms in {}", taxonomy),
                source: Some(e),
            })?;
        Ok(count as u64)
    }

    fn list_terms(&self, taxonomy: &str) -> Result<Vec<Term>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT t.term_id, t.name, t.slug, tt.description, tt.parent
                 FROM terms t
                 JOIN term_taxonomy tt ON tt.term_id = t.term_id
                 WHERE tt.taxonomy = ?1
                 ORDER BY t.term_id ASC",
            )
            .map_err(|e| CloneError::Database {
                message: format!("Failed to prepare term listing for {}", taxonomy),
                source: Some(e),
            })?;

        let rows = stmt
            .query_map(params![taxonomy], |row| {
                Ok(Term {
                    term_id: row.get(0)?,
                    name: row.get(1)?,
                    slug: row.get(2)?,
                    description: row.get(3)?,
                    parent: row.get(4)?,
                    taxonomy: taxonomy.to_string(),
                })
            })
            .map_err(|e| CloneError::Database {
                message: format!("Failed to list terms in {}", taxonomy),
                source: Some(e),
            })?;

        let mut terms = Vec::new();
        for row in rows {
            terms.push(row.map_err(|e| CloneError::Database {
                message: format!("Failed to read term row in {}", taxonomy),
                source: Some(e),
            })?);
        }
        Ok(terms)
    }

    fn create_term(
        &self,
        taxonomy: &str,
        name: &str,
        slug: &str,
        description: &str,
        parent: i64,
    ) -> Result<CreatedTerm> {
        let mut conn = self.conn()?;

        // Slug collisions include hidden terms; uniqueness is per taxonomy.
        let collision: Option<i64> = conn
            .query_row(
                "SELECT t.term_id FROM terms t
                 JOIN term_taxonomy tt ON tt.term_id = t.term_id
                 WHERE tt.taxonomy = ?1 AND t.slug = ?2",
                params![taxonomy, slug],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CloneError::Database {
                message: format!("Failed to check slug '{}' in {}", slug, taxonomy),
                source: Some(e),
            })?;
        if let Some(existing) = collision {
            return Err(CloneError::TermCreation {
                name: name.to_string(),
                taxonomy: taxonomy.to_string(),
                message: format!("slug '{}' already used by term {}", slug, existing),
            });
        }

        let tx = conn.transaction().map_err(|e| CloneError::Database {
            message: "Failed to begin transaction".to_string(),
            source: Some(e),
        })?;

        tx.execute(
            "INSERT INTO terms (name, slug) VALUES (?1, ?2)",
            params![name, slug],
        )
        .map_err(|e| CloneError::TermCreation {
            name: name.to_string(),
            taxonomy: taxonomy.to_string(),
            message: e.to_string(),
        })?;
        let term_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO term_taxonomy (term_id, taxonomy, description, parent)
             VALUES (?1, ?2, ?3, ?4)",
            params![term_id, taxonomy, description, parent],
        )
        .map_err(|e| CloneError::TermCreation {
            name: name.to_string(),
            taxonomy: taxonomy.to_string(),
            message: e.to_string(),
        })?;
        let term_taxonomy_id = tx.last_insert_rowid();

        tx.commit().map_err(|e| CloneError::Database {
            message: format!("Failed to commit term '{}'", name),
            source: Some(e),
        })?;

        debug!(term_id, term_taxonomy_id, taxonomy, "created term");
        Ok(CreatedTerm {
            term_id,
            term_taxonomy_id,
        })
    }

    fn term_meta(&self, term_id: i64) -> Result<BTreeMap<String, Vec<Value>>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT meta_key, meta_value FROM termmeta
                 WHERE term_id = ?1
                 ORDER BY meta_id ASC",
            )
            .map_err(|e| CloneError::Database {
                message: format!("Failed to prepare meta query for term {}", term_id),
                source: Some(e),
            })?;

        let rows = stmt
            .query_map(params![term_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| CloneError::Database {
                message: format!("Failed to read meta for term {}", term_id),
                source: Some(e),
            })?;

        let mut meta: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for row in rows {
            let (key, raw) = row.map_err(|e| CloneError::Database {
                message: format!("Failed to read meta row for term {}", term_id),
                source: Some(e),
            })?;
            let value = serde_json::from_str(&raw).map_err(|e| CloneError::Json {
                message: format!("Invalid stored meta value under key '{}'", key),
                source: Some(e),
            })?;
            meta.entry(key).or_default().push(value);
        }
        Ok(meta)
    }

    fn add_term_meta(&self, term_id: i64, key: &str, value: &Value) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(|e| CloneError::Json {
            message: format!("Failed to encode meta value under key '{}'", key),
            source: Some(e),
        })?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO termmeta (term_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
            params![term_id, key, raw],
        )
        .map_err(|e| CloneError::Database {
            message: format!("Failed to add meta '{}' to term {}", key, term_id),
            source: Some(e),
        })?;
        Ok(())
    }

    fn posts_for_term(&self, post_type: &str, taxonomy: &str, term_id: i64) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT p.post_id FROM posts p
                 JOIN term_relationships tr ON tr.post_id = p.post_id
                 JOIN term_taxonomy tt ON tt.term_taxonomy_id = tr.term_taxonomy_id
                 WHERE p.post_type = ?1 AND tt.taxonomy = ?2 AND tt.term_id = ?3
                 ORDER BY p.post_id ASC",
            )
            .map_err(|e| CloneError::Database {
                message: format!("Failed to prepare post query for term {}", term_id),
                source: Some(e),
            })?;

        let rows = stmt
            .query_map(params![post_type, taxonomy, term_id], |row| row.get(0))
            .map_err(|e| CloneError::Database {
                message: format!("Failed to query posts for term {}", term_id),
                source: Some(e),
            })?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row.map_err(|e| CloneError::Database {
                message: format!("Failed to read post row for term {}", term_id),
                source: Some(e),
            })?);
        }
        Ok(posts)
    }

    fn append_post_terms(&self, post_id: i64, term_ids: &[i64], taxonomy: &str) -> Result<()> {
        let conn = self.conn()?;
        for &term_id in term_ids {
            let ttid = Self::term_taxonomy_id(&conn, taxonomy, term_id)?.ok_or(
                CloneError::TermNotFound {
                    term_id,
                    taxonomy: taxonomy.to_string(),
                },
            )?;
            // INSERT OR IGNORE keeps re-adding an existing link a no-op.
            conn.execute(
                "INSERT OR IGNORE INTO term_relationships (post_id, term_taxonomy_id)
                 VALUES (?1, ?2)",
                params![post_id, ttid],
            )
            .map_err(|e| CloneError::Database {
                message: format!("Failed to link post {} to term {}", post_id, term_id),
                source: Some(e),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.register_taxonomy("category").unwrap();
        store.register_post_type("post").unwrap();
        store
    }

    #[test]
    fn test_taxonomy_and_post_type_registration() {
        let store = store();
        assert!(store.taxonomy_exists("category").unwrap());
        assert!(!store.taxonomy_exists("missing").unwrap());
        assert!(store.post_type_exists("post").unwrap());
        assert!(!store.post_type_exists("product").unwrap());
    }

    #[test]
    fn test_create_and_list_terms() {
        let store = store();
        let a = store
            .create_term("category", "Fruit", "fruit", "", 0)
            .unwrap();
        let b = store
            .create_term("category", "Apples", "apples", "Apple things", a.term_id)
            .unwrap();

        let terms = store.list_terms("category").unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].slug, "fruit");
        assert!(terms[0].is_root());
        assert_eq!(terms[1].parent, a.term_id);
        assert_eq!(terms[1].description, "Apple things");
        assert_eq!(terms[1].term_id, b.term_id);
        assert_eq!(store.count_terms("category").unwrap(), 2);
    }

    #[test]
    fn test_slug_collision_rejected() {
        let store = store();
        store
            .create_term("category", "Fruit", "fruit", "", 0)
            .unwrap();
        let err = store
            .create_term("category", "Fruit Again", "fruit", "", 0)
            .unwrap_err();
        assert!(matches!(err, CloneError::TermCreation { .. }));
    }

    #[test]
    fn test_same_slug_allowed_across_taxonomies() {
        let store = store();
        store.register_taxonomy("tag").unwrap();
        store
            .create_term("category", "Fruit", "fruit", "", 0)
            .unwrap();
        store.create_term("tag", "Fruit", "fruit", "", 0).unwrap();
        assert_eq!(store.count_terms("tag").unwrap(), 1);
    }

    #[test]
    fn test_meta_multiplicity_and_order() {
        let store = store();
        let t = store
            .create_term("category", "Fruit", "fruit", "", 0)
            .unwrap();
        store.add_term_meta(t.term_id, "colour", &json!("red")).unwrap();
        store
            .add_term_meta(t.term_id, "colour", &json!("green"))
            .unwrap();
        store
            .add_term_meta(t.term_id, "rank", &json!({"score": 7}))
            .unwrap();

        let meta = store.term_meta(t.term_id).unwrap();
        assert_eq!(meta["colour"], vec![json!("red"), json!("green")]);
        assert_eq!(meta["rank"], vec![json!({"score": 7})]);
    }

    #[test]
    fn test_relationship_append_is_idempotent() {
        let store = store();
        let t = store
            .create_term("category", "Fruit", "fruit", "", 0)
            .unwrap();
        let post = store.insert_post("post", "Hello").unwrap();

        store
            .append_post_terms(post, &[t.term_id], "category")
            .unwrap();
        store
            .append_post_terms(post, &[t.term_id], "category")
            .unwrap();

        let posts = store.posts_for_term("post", "category", t.term_id).unwrap();
        assert_eq!(posts, vec![post]);
    }

    #[test]
    fn test_posts_for_term_filters_post_type() {
        let store = store();
        store.register_post_type("product").unwrap();
        let t = store
            .create_term("category", "Fruit", "fruit", "", 0)
            .unwrap();
        let post = store.insert_post("post", "A post").unwrap();
        let product = store.insert_post("product", "A product").unwrap();
        store
            .append_post_terms(post, &[t.term_id], "category")
            .unwrap();
        store
            .append_post_terms(product, &[t.term_id], "category")
            .unwrap();

        let posts = store.posts_for_term("post", "category", t.term_id).unwrap();
        assert_eq!(posts, vec![post]);
        let products = store
            .posts_for_term("product", "category", t.term_id)
            .unwrap();
        assert_eq!(products, vec![product]);
    }

    #[test]
    fn test_append_to_unknown_term_fails() {
        let store = store();
        let post = store.insert_post("post", "Hello").unwrap();
        let err = store.append_post_terms(post, &[999], "category").unwrap_err();
        assert!(matches!(err, CloneError::TermNotFound { .. }));
    }
}
