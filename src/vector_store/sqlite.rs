//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Topic filtering happens in SQL before scoring.

use super::{cosine_similarity, distinct_sources, rank_hits, IndexedEntry, IndexedSource, SearchHit, VectorStore};
use crate::chunking::{Chunk, DocType};
use crate::error::{QuizRagError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        dimensions INTEGER NOT NULL,
        distance TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS entries (
        id TEXT PRIMARY KEY,
        collection TEXT NOT NULL REFERENCES collections(name),
        content TEXT NOT NULL,
        source TEXT NOT NULL,
        chunk_id INTEGER NOT NULL,
        doc_type TEXT NOT NULL,
        topic TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_topic ON entries(collection, topic);
    CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(collection, source);
"#;

/// SQLite-based vector store.
///
/// The connection sits behind a mutex, so writes are serialised.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| QuizRagError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn dimensions_of(conn: &Connection, collection: &str) -> Result<Option<usize>> {
        let dims: Option<i64> = conn
            .query_row(
                "SELECT dimensions FROM collections WHERE name = ?1",
                params![collection],
                |row| row.get(0),
            )
            .optional()?;
        Ok(dims.map(|d| d as usize))
    }

    /// Fail unless the collection exists and every embedding matches its dimensionality.
    fn check_entries(conn: &Connection, collection: &str, entries: &[IndexedEntry]) -> Result<()> {
        let dimensions = Self::dimensions_of(conn, collection)?.ok_or_else(|| {
            QuizRagError::VectorStore(format!("Collection '{}' does not exist", collection))
        })?;

        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(QuizRagError::VectorStore(format!(
                "Embedding for {} chunk {} has {} dimensions, collection '{}' expects {}",
                bad.chunk.source,
                bad.chunk.chunk_index,
                bad.embedding.len(),
                collection,
                dimensions
            )));
        }
        Ok(())
    }

    fn insert_entries(conn: &Connection, collection: &str, entries: &[IndexedEntry]) -> Result<()> {
        for entry in entries {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO entries
                (id, collection, content, source, chunk_id, doc_type, topic, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    entry.id.to_string(),
                    collection,
                    entry.chunk.content,
                    entry.chunk.source,
                    entry.chunk.chunk_index as i64,
                    entry.chunk.doc_type.as_str(),
                    entry.chunk.topic,
                    Self::embedding_to_bytes(&entry.embedding),
                    entry.indexed_at.to_rfc3339(),
                ],
            )?;
        }
        Ok(())
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self))]
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        let conn = self.lock()?;

        match Self::dimensions_of(&conn, collection)? {
            Some(existing) if existing == dimensions => {
                debug!("Collection {} already exists", collection);
                Ok(())
            }
            Some(existing) => Err(QuizRagError::VectorStore(format!(
                "Collection '{}' holds {}-dimensional vectors but the embedder produces {}",
                collection, existing, dimensions
            ))),
            None => {
                conn.execute(
                    "INSERT INTO collections (name, dimensions, distance, created_at) VALUES (?1, ?2, 'cosine', ?3)",
                    params![collection, dimensions as i64, Utc::now().to_rfc3339()],
                )?;
                info!("Created collection: {} ({} dimensions)", collection, dimensions);
                Ok(())
            }
        }
    }

    async fn collection_dimensions(&self, collection: &str) -> Result<Option<usize>> {
        let conn = self.lock()?;
        Self::dimensions_of(&conn, collection)
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn upsert_batch(&self, collection: &str, entries: &[IndexedEntry]) -> Result<usize> {
        let conn = self.lock()?;
        Self::check_entries(&conn, collection, entries)?;

        let tx = conn.unchecked_transaction()?;
        Self::insert_entries(&tx, collection, entries)?;
        tx.commit()?;

        info!("Batch upserted {} entries into {}", entries.len(), collection);
        Ok(entries.len())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn replace_sources(&self, collection: &str, entries: &[IndexedEntry]) -> Result<usize> {
        let conn = self.lock()?;
        Self::check_entries(&conn, collection, entries)?;

        // Dropping the transaction without commit rolls the deletes back.
        let tx = conn.unchecked_transaction()?;
        let mut deleted = 0;
        for source in distinct_sources(entries) {
            deleted += tx.execute(
                "DELETE FROM entries WHERE collection = ?1 AND source = ?2",
                params![collection, source],
            )?;
        }
        Self::insert_entries(&tx, collection, entries)?;
        tx.commit()?;

        info!(
            "Replaced {} entries with {} in {}",
            deleted,
            entries.len(),
            collection
        );
        Ok(entries.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
        topic: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let conn = self.lock()?;

        let Some(dimensions) = Self::dimensions_of(&conn, collection)? else {
            debug!("Collection {} does not exist yet", collection);
            return Ok(Vec::new());
        };
        if query_embedding.len() != dimensions {
            return Err(QuizRagError::VectorStore(format!(
                "Query embedding has {} dimensions, collection '{}' expects {}",
                query_embedding.len(),
                collection,
                dimensions
            )));
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT content, source, chunk_id, doc_type, topic, embedding
            FROM entries
            WHERE collection = ?1 AND (?2 IS NULL OR topic = ?2)
            "#,
        )?;

        let rows = stmt.query_map(params![collection, topic], |row| {
            let doc_type: String = row.get(3)?;
            let embedding_bytes: Vec<u8> = row.get(5)?;
            let chunk_id: i64 = row.get(2)?;
            Ok((
                Chunk {
                    content: row.get(0)?,
                    source: row.get(1)?,
                    chunk_index: chunk_id as usize,
                    doc_type: doc_type.parse().unwrap_or(DocType::Text),
                    topic: row.get(4)?,
                },
                Self::bytes_to_embedding(&embedding_bytes),
            ))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            match row {
                Ok((chunk, embedding)) => {
                    let score = cosine_similarity(query_embedding, &embedding);
                    hits.push(SearchHit { chunk, score });
                }
                Err(e) => warn!("Skipping unreadable entry: {}", e),
            }
        }

        let hits = rank_hits(hits, limit);
        debug!("Found {} matching entries", hits.len());
        Ok(hits)
    }

    #[instrument(skip(self))]
    async fn delete_by_source(&self, collection: &str, source: &str) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            "DELETE FROM entries WHERE collection = ?1 AND source = ?2",
            params![collection, source],
        )?;

        if deleted > 0 {
            info!("Deleted {} entries for {}", deleted, source);
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_sources(&self, collection: &str) -> Result<Vec<IndexedSource>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT source, MAX(topic), COUNT(*) as chunk_count, MAX(indexed_at) as indexed_at
            FROM entries
            WHERE collection = ?1
            GROUP BY source
            ORDER BY source
            "#,
        )?;

        let sources = stmt.query_map(params![collection], |row| {
            let chunk_count: i64 = row.get(2)?;
            let indexed_at: String = row.get(3)?;
            Ok(IndexedSource {
                source: row.get(0)?,
                topic: row.get(1)?,
                chunk_count: chunk_count as usize,
                indexed_at: parse_timestamp(&indexed_at),
            })
        })?;

        Ok(sources.filter_map(|s| s.ok()).collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn flush(&self) -> Result<()> {
        let conn = self.lock()?;
        // Returns a status row in WAL mode, so read it instead of using execute.
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .optional()?;
        debug!("Checkpointed vector store");
        Ok(())
    }
}
