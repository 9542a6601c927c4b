//! SQLite-backed document chunk store

use super::chunker::{chunk_text, score};
use super::schema::init_schema;
use crate::services::{RetrievalError, RetrievalService, RetrievedChunk};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// An ingested document
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub source: String,
    pub chunk_count: usize,
    pub created_at: String,
}

/// Chunked documents with lexical retrieval
pub struct ChunkStore {
    conn: Mutex<Connection>,
}

impl ChunkStore {
    /// Open or create the store, creating parent directories as needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open document store at {}", path.display()))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("document store lock poisoned"))
    }

    /// Chunk and store a document, replacing any earlier copy from `source`
    pub fn ingest(&self, name: &str, source: &str, text: &str) -> Result<Document> {
        let chunks = chunk_text(text);
        if chunks.is_empty() {
            bail!("document '{}' has no text", name);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row("SELECT id FROM documents WHERE source = ?1", [source], |row| {
                row.get(0)
            })
            .optional()?;
        if let Some(id) = existing {
            tx.execute("DELETE FROM chunks WHERE document_id = ?1", [id])?;
            tx.execute("DELETE FROM documents WHERE id = ?1", [id])?;
        }

        tx.execute(
            "INSERT INTO documents (name, source, created_at) VALUES (?1, ?2, ?3)",
            (name, source, &now),
        )?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (document_id, position, text) VALUES (?1, ?2, ?3)",
            )?;
            for (position, chunk) in chunks.iter().enumerate() {
                stmt.execute((id, position as i64, chunk))?;
            }
        }
        tx.commit()?;

        tracing::info!(document = name, chunks = chunks.len(), "Ingested document");

        Ok(Document {
            id,
            name: name.to_string(),
            source: source.to_string(),
            chunk_count: chunks.len(),
            created_at: now,
        })
    }

    /// All documents, newest first
    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT d.id, d.name, d.source, d.created_at, COUNT(c.id)
             FROM documents d
             LEFT JOIN chunks c ON c.document_id = d.id
             GROUP BY d.id
             ORDER BY d.created_at DESC, d.id DESC",
        )?;

        let docs = stmt
            .query_map([], |row| {
                Ok(Document {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    source: row.get(2)?,
                    created_at: row.get(3)?,
                    chunk_count: row.get::<_, i64>(4)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(docs)
    }

    /// Delete a document and its chunks; returns whether it existed
    pub fn delete_document(&self, id: i64) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks WHERE document_id = ?1", [id])?;
        let deleted = tx.execute("DELETE FROM documents WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Score every chunk against `query` and keep the best `top_k`
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.text, d.name
             FROM chunks c
             JOIN documents d ON d.id = c.document_id
             ORDER BY d.id, c.position",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut scored: Vec<RetrievedChunk> = rows
            .into_iter()
            .filter_map(|(text, source)| {
                let score = score(query, &text);
                (score > 0.0).then(|| RetrievedChunk {
                    text,
                    score,
                    source: Some(source),
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[async_trait]
impl RetrievalService for ChunkStore {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let chunks = self
            .search(query, top_k)
            .map_err(|e| RetrievalError::storage(e.to_string()))?;
        tracing::debug!(query, top_k, found = chunks.len(), "Retrieved chunks");
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ingest_and_list() {
        let store = ChunkStore::in_memory().unwrap();
        let doc = store.ingest("intro.txt", "/docs/intro.txt", "产品介绍：一个工作流引擎。").unwrap();
        assert_eq!(doc.chunk_count, 1);

        let docs = store.list_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "intro.txt");
        assert_eq!(docs[0].chunk_count, 1);
    }

    #[test]
    fn test_reingest_replaces() {
        let store = ChunkStore::in_memory().unwrap();
        store.ingest("a.txt", "/a.txt", "first version").unwrap();
        store.ingest("a.txt", "/a.txt", &"second ".repeat(200)).unwrap();

        let docs = store.list_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].chunk_count > 1);

        let hits = store.search("first", 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_empty_document_rejected() {
        let store = ChunkStore::in_memory().unwrap();
        assert!(store.ingest("empty.txt", "/empty.txt", "").is_err());
    }

    #[test]
    fn test_delete_document() {
        let store = ChunkStore::in_memory().unwrap();
        let doc = store.ingest("a.txt", "/a.txt", "rust workflow").unwrap();

        assert!(store.delete_document(doc.id).unwrap());
        assert!(!store.delete_document(doc.id).unwrap());
        assert!(store.list_documents().unwrap().is_empty());
        assert!(store.search("rust", 5).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_score() {
        let store = ChunkStore::in_memory().unwrap();
        store.ingest("a.txt", "/a.txt", "产品价格说明").unwrap();
        store.ingest("b.txt", "/b.txt", "产品介绍：卡片工作流").unwrap();
        store.ingest("c.txt", "/c.txt", "无关内容").unwrap();

        let chunks = store.retrieve("产品介绍", 5).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source.as_deref(), Some("b.txt"));
        assert!(chunks[0].score > chunks[1].score);

        let top1 = store.retrieve("产品介绍", 1).await.unwrap();
        assert_eq!(top1.len(), 1);
    }

    #[test]
    fn test_open_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("docs.db");

        {
            let store = ChunkStore::open(&path).unwrap();
            store.ingest("a.txt", "/a.txt", "persisted text").unwrap();
        }

        let store = ChunkStore::open(&path).unwrap();
        assert_eq!(store.list_documents().unwrap().len(), 1);
    }
}
