//! SQLite-backed metadata store for debates and images.

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use tracing::debug;

use crate::metadata::error::{MetadataError, MetadataResult};
use crate::metadata::records::{Debate, Image, ImageWithDebate};
use crate::{DebateId, ImageId};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS debate (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    tldr        TEXT NOT NULL CHECK (length(tldr) > 0),
    summary     TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS image (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    debate_id   INTEGER REFERENCES debate(id),
    image_path  TEXT NOT NULL CHECK (length(image_path) > 0),
    ocr         TEXT NOT NULL DEFAULT '',
    has_vector  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_image_debate ON image(debate_id);
";

const DEBATE_COLUMNS: &str = "id, tldr, summary, created_at, updated_at";
const IMAGE_COLUMNS: &str = "id, debate_id, image_path, ocr, has_vector, created_at, updated_at";

/// Number of columns produced by [`IMAGE_COLUMNS`].
const IMAGE_COLUMN_COUNT: usize = 7;

/// An uncommitted cascade delete. Rolls back when dropped.
pub struct PendingDeletion<'conn> {
    tx: Transaction<'conn>,
    images: usize,
}

impl PendingDeletion<'_> {
    /// Image rows the deletion removes.
    #[must_use]
    pub fn images(&self) -> usize {
        self.images
    }

    /// Make the deletion durable, returning the removed image count.
    pub fn commit(self) -> MetadataResult<usize> {
        self.tx.commit()?;
        Ok(self.images)
    }
}

/// Durable storage for debate and image rows.
///
/// Ids come from `AUTOINCREMENT` columns, so they grow monotonically and are
/// never reused after deletion. All timestamps are assigned here.
pub struct MetadataStore {
    conn: Connection,
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl MetadataStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        debug!(path = %path.display(), "Opened metadata store");

        Ok(Self { conn })
    }

    /// In-memory database, used by tests and benches.
    pub fn open_in_memory() -> MetadataResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self { conn })
    }

    fn configure(conn: &Connection) -> MetadataResult<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Debates
    // ---------------------------------------------------------------

    /// Insert a debate and return its id.
    pub fn create_debate(&self, tldr: &str, summary: &str) -> MetadataResult<DebateId> {
        let now = Utc::now();
        let rowid = self
            .conn
            .prepare_cached(
                "INSERT INTO debate (tldr, summary, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            )?
            .insert(params![tldr, summary, now])?;

        row_id(rowid, "debate").and_then(|id| {
            DebateId::from_i64(id).ok_or(MetadataError::InvalidRow {
                table: "debate",
                reason: format!("rowid {id} out of range"),
            })
        })
    }

    /// Replace title and summary, bumping `updated_at`.
    pub fn update_debate(&self, id: DebateId, tldr: &str, summary: &str) -> MetadataResult<()> {
        let changed = self
            .conn
            .prepare_cached(
                "UPDATE debate SET tldr = ?1, summary = ?2, updated_at = ?3 WHERE id = ?4",
            )?
            .execute(params![tldr, summary, Utc::now(), id.to_i64()])?;

        if changed == 0 {
            return Err(MetadataError::NotFound {
                entity: "Debate",
                id: id.value(),
            });
        }
        Ok(())
    }

    pub fn get_debate(&self, id: DebateId) -> MetadataResult<Debate> {
        self.find_debate(id)?.ok_or(MetadataError::NotFound {
            entity: "Debate",
            id: id.value(),
        })
    }

    pub fn find_debate(&self, id: DebateId) -> MetadataResult<Option<Debate>> {
        let sql = format!("SELECT {DEBATE_COLUMNS} FROM debate WHERE id = ?1");
        let debate = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![id.to_i64()], |row| debate_from_row(row, 0))
            .optional()?;
        Ok(debate)
    }

    pub fn debate_exists(&self, id: DebateId) -> MetadataResult<bool> {
        let found: Option<i64> = self
            .conn
            .prepare_cached("SELECT id FROM debate WHERE id = ?1")?
            .query_row(params![id.to_i64()], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Id of the most recently created debate.
    pub fn latest_debate_id(&self) -> MetadataResult<Option<DebateId>> {
        let raw: Option<i64> = self
            .conn
            .prepare_cached("SELECT id FROM debate ORDER BY id DESC LIMIT 1")?
            .query_row([], |row| row.get(0))
            .optional()?;
        Ok(raw.and_then(DebateId::from_i64))
    }

    /// All debates, most recently updated first.
    pub fn list_debates(&self) -> MetadataResult<Vec<Debate>> {
        let sql = format!("SELECT {DEBATE_COLUMNS} FROM debate ORDER BY updated_at DESC, id DESC");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let debates = stmt
            .query_map([], |row| debate_from_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(debates)
    }

    // ---------------------------------------------------------------
    // Images
    // ---------------------------------------------------------------

    /// Insert an image row and return its id.
    pub fn insert_image(
        &self,
        debate_id: Option<DebateId>,
        image_path: &str,
        ocr: &str,
        has_vector: bool,
    ) -> MetadataResult<ImageId> {
        let now = Utc::now();
        let rowid = self
            .conn
            .prepare_cached(
                "INSERT INTO image (debate_id, image_path, ocr, has_vector, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            )?
            .insert(params![
                debate_id.map(DebateId::to_i64),
                image_path,
                ocr,
                has_vector,
                now
            ])?;

        row_id(rowid, "image").and_then(|id| {
            ImageId::from_i64(id).ok_or(MetadataError::InvalidRow {
                table: "image",
                reason: format!("rowid {id} out of range"),
            })
        })
    }

    /// Flag an image as having no vector in the index.
    pub fn mark_vector_less(&self, id: ImageId) -> MetadataResult<()> {
        self.conn
            .prepare_cached("UPDATE image SET has_vector = 0, updated_at = ?1 WHERE id = ?2")?
            .execute(params![Utc::now(), id.to_i64()])?;
        Ok(())
    }

    pub fn get_image(&self, id: ImageId) -> MetadataResult<Option<Image>> {
        let sql = format!("SELECT {IMAGE_COLUMNS} FROM image WHERE id = ?1");
        let image = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![id.to_i64()], |row| image_from_row(row, 0))
            .optional()?;
        Ok(image)
    }

    /// Images of a debate in ascending id order.
    pub fn list_images_for_debate(&self, id: DebateId) -> MetadataResult<Vec<Image>> {
        let sql = format!("SELECT {IMAGE_COLUMNS} FROM image WHERE debate_id = ?1 ORDER BY id ASC");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let images = stmt
            .query_map(params![id.to_i64()], |row| image_from_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(images)
    }

    /// The image with the highest id in a debate.
    pub fn latest_image_for_debate(&self, id: DebateId) -> MetadataResult<Option<Image>> {
        let sql = format!(
            "SELECT {IMAGE_COLUMNS} FROM image WHERE debate_id = ?1 ORDER BY id DESC LIMIT 1"
        );
        let image = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![id.to_i64()], |row| image_from_row(row, 0))
            .optional()?;
        Ok(image)
    }

    /// Ids of images that own a vector, ascending.
    ///
    /// This is the order in which their vectors were inserted into the index.
    pub fn vector_image_ids(&self) -> MetadataResult<Vec<ImageId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM image WHERE has_vector = 1 ORDER BY id ASC")?;
        let ids = stmt
            .query_map([], |row| image_id_column(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// One image joined with its debate.
    pub fn image_with_debate(&self, id: ImageId) -> MetadataResult<Option<ImageWithDebate>> {
        let sql = format!("{JOINED_SELECT} WHERE i.id = ?1");
        let row = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![id.to_i64()], joined_from_row)
            .optional()?;
        Ok(row)
    }

    /// Every image joined with its debate, in ascending image id order.
    pub fn images_with_debates(&self) -> MetadataResult<Vec<ImageWithDebate>> {
        let sql = format!("{JOINED_SELECT} ORDER BY i.id ASC");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map([], joined_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ---------------------------------------------------------------
    // Deletion and counts
    // ---------------------------------------------------------------

    /// Delete a debate and all of its images in one transaction.
    ///
    /// Returns the number of image rows removed.
    pub fn delete_debate_cascade(&mut self, id: DebateId) -> MetadataResult<usize> {
        self.begin_debate_deletion(id)?.commit()
    }

    /// Delete a debate and its images without committing.
    ///
    /// The rows stay visible to other connections until
    /// [`PendingDeletion::commit`]; dropping the handle rolls back.
    pub fn begin_debate_deletion(&mut self, id: DebateId) -> MetadataResult<PendingDeletion<'_>> {
        let tx = self.conn.transaction()?;

        let images = tx.execute("DELETE FROM image WHERE debate_id = ?1", params![id.to_i64()])?;
        let debates = tx.execute("DELETE FROM debate WHERE id = ?1", params![id.to_i64()])?;

        if debates == 0 {
            // Dropping the transaction rolls back the image delete
            return Err(MetadataError::NotFound {
                entity: "Debate",
                id: id.value(),
            });
        }

        Ok(PendingDeletion { tx, images })
    }

    pub fn count_debates(&self) -> MetadataResult<usize> {
        self.count("SELECT COUNT(*) FROM debate")
    }

    pub fn count_images(&self) -> MetadataResult<usize> {
        self.count("SELECT COUNT(*) FROM image")
    }

    fn count(&self, sql: &str) -> MetadataResult<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Close the underlying connection, reporting any error.
    pub fn close(self) -> MetadataResult<()> {
        self.conn.close().map_err(|(_, e)| MetadataError::Database(e))
    }
}

const JOINED_SELECT: &str = "SELECT i.id, i.debate_id, i.image_path, i.ocr, i.has_vector, i.created_at, i.updated_at,
        d.id, d.tldr, d.summary, d.created_at, d.updated_at
 FROM image i LEFT JOIN debate d ON d.id = i.debate_id";

fn row_id(rowid: i64, table: &'static str) -> MetadataResult<i64> {
    if rowid <= 0 {
        return Err(MetadataError::InvalidRow {
            table,
            reason: format!("unexpected rowid {rowid}"),
        });
    }
    Ok(rowid)
}

fn debate_id_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DebateId> {
    let raw: i64 = row.get(idx)?;
    DebateId::from_i64(raw).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, raw))
}

fn image_id_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<ImageId> {
    let raw: i64 = row.get(idx)?;
    ImageId::from_i64(raw).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, raw))
}

fn debate_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Debate> {
    Ok(Debate {
        id: debate_id_column(row, offset)?,
        tldr: row.get(offset + 1)?,
        summary: row.get(offset + 2)?,
        created_at: row.get(offset + 3)?,
        updated_at: row.get(offset + 4)?,
    })
}

fn image_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Image> {
    let debate_id: Option<i64> = row.get(offset + 1)?;
    Ok(Image {
        id: image_id_column(row, offset)?,
        debate_id: debate_id.and_then(DebateId::from_i64),
        image_path: row.get(offset + 2)?,
        ocr: row.get(offset + 3)?,
        has_vector: row.get(offset + 4)?,
        created_at: row.get(offset + 5)?,
        updated_at: row.get(offset + 6)?,
    })
}

fn joined_from_row(row: &Row<'_>) -> rusqlite::Result<ImageWithDebate> {
    let image = image_from_row(row, 0)?;
    let joined_id: Option<i64> = row.get(IMAGE_COLUMN_COUNT)?;
    let debate = match joined_id {
        Some(_) => Some(debate_from_row(row, IMAGE_COLUMN_COUNT)?),
        None => None,
    };
    Ok(ImageWithDebate { image, debate })
}
