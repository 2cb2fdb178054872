//! Folder and file metadata repository.
//!
//! Folders emulate a tree over flat object keys: a folder row stores its
//! parent path, files store the path they were uploaded to.

use sqlx::{Pool, Postgres};
use tracing::{debug, info};

use crate::users::conflict_or_db;
use docket_core::{join_path, CreateFileRequest, DirectoryListing, Error, Folder, Result, StoredFile};

const FOLDER_COLUMNS: &str = "id, user_id, name, path, created_at";

const FILE_COLUMNS: &str = "id, user_id, filename, original_name, path, file_url, file_type, \
     file_size, folder_id, storage_key, created_at";

/// Escape LIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// PostgreSQL implementation of folder/file metadata storage.
pub struct PgFileRepository {
    pool: Pool<Postgres>,
}

impl PgFileRepository {
    /// Create a new PgFileRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Folders (by name) and files (newest first) directly at `path`.
    pub async fn list(&self, user_id: i64, path: &str) -> Result<DirectoryListing> {
        let path = path.trim_matches('/');
        let folders_sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = $1 AND path = $2 ORDER BY name ASC"
        );
        let files_sql = format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE user_id = $1 AND path = $2 \
             ORDER BY created_at DESC, id DESC"
        );

        let (folders, files) = tokio::try_join!(
            sqlx::query_as::<_, Folder>(&folders_sql)
                .bind(user_id)
                .bind(path)
                .fetch_all(&self.pool),
            sqlx::query_as::<_, StoredFile>(&files_sql)
                .bind(user_id)
                .bind(path)
                .fetch_all(&self.pool),
        )
        .map_err(Error::Database)?;

        Ok(DirectoryListing { folders, files })
    }

    pub async fn create_folder(&self, user_id: i64, name: &str, path: &str) -> Result<Folder> {
        let sql = format!(
            "INSERT INTO folders (user_id, name, path) VALUES ($1, $2, $3) RETURNING {FOLDER_COLUMNS}"
        );
        let folder = sqlx::query_as::<_, Folder>(&sql)
            .bind(user_id)
            .bind(name)
            .bind(path.trim_matches('/'))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_db(e, "folder"))?;

        debug!(
            subsystem = "db",
            component = "files",
            op = "create_folder",
            user_id,
            folder_id = folder.id,
            "Folder created"
        );
        Ok(folder)
    }

    pub async fn get_folder(&self, id: i64, user_id: i64) -> Result<Option<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Folder>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// The folder whose full path equals `full_path`, if any.
    pub async fn find_folder_by_path(&self, user_id: i64, full_path: &str) -> Result<Option<Folder>> {
        let full_path = full_path.trim_matches('/');
        let (parent, name) = match full_path.rsplit_once('/') {
            Some((parent, name)) => (parent, name),
            None => ("", full_path),
        };
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = $1 AND path = $2 AND name = $3"
        );
        sqlx::query_as::<_, Folder>(&sql)
            .bind(user_id)
            .bind(parent)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    pub async fn create_file(&self, req: &CreateFileRequest) -> Result<StoredFile> {
        let sql = format!(
            "INSERT INTO files (user_id, filename, original_name, path, file_url, file_type, \
                                file_size, folder_id, storage_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {FILE_COLUMNS}"
        );
        let file = sqlx::query_as::<_, StoredFile>(&sql)
            .bind(req.user_id)
            .bind(&req.filename)
            .bind(&req.original_name)
            .bind(req.path.trim_matches('/'))
            .bind(&req.file_url)
            .bind(&req.file_type)
            .bind(req.file_size)
            .bind(req.folder_id)
            .bind(&req.storage_key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_db(e, "file"))?;

        debug!(
            subsystem = "db",
            component = "files",
            op = "create_file",
            user_id = req.user_id,
            file_id = file.id,
            size = req.file_size,
            "File recorded"
        );
        Ok(file)
    }

    pub async fn get_file(&self, id: i64, user_id: i64) -> Result<Option<StoredFile>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, StoredFile>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Delete a file row, returning it so the caller can remove the object.
    pub async fn delete_file(&self, id: i64, user_id: i64) -> Result<Option<StoredFile>> {
        let sql = format!(
            "DELETE FROM files WHERE id = $1 AND user_id = $2 RETURNING {FILE_COLUMNS}"
        );
        sqlx::query_as::<_, StoredFile>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Files inside `folder`, at any depth.
    pub async fn files_in_folder(&self, folder: &Folder) -> Result<Vec<StoredFile>> {
        let full_path = folder.full_path();
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE user_id = $1 AND (folder_id = $2 OR path = $3 OR path LIKE $4 ESCAPE '\\')"
        );
        sqlx::query_as::<_, StoredFile>(&sql)
            .bind(folder.user_id)
            .bind(folder.id)
            .bind(&full_path)
            .bind(format!("{}/%", escape_like(&full_path)))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Delete a folder, its subfolders and all file rows below it in one
    /// transaction. Returns the number of file rows removed.
    pub async fn delete_folder(&self, folder: &Folder) -> Result<u64> {
        let full_path = folder.full_path();
        let nested = format!("{}/%", escape_like(&full_path));

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let files = sqlx::query(
            "DELETE FROM files \
             WHERE user_id = $1 AND (folder_id = $2 OR path = $3 OR path LIKE $4 ESCAPE '\\')",
        )
        .bind(folder.user_id)
        .bind(folder.id)
        .bind(&full_path)
        .bind(&nested)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?
        .rows_affected();

        sqlx::query(
            "DELETE FROM folders \
             WHERE user_id = $1 AND (path = $2 OR path LIKE $3 ESCAPE '\\')",
        )
        .bind(folder.user_id)
        .bind(&full_path)
        .bind(&nested)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let deleted = sqlx::query("DELETE FROM folders WHERE id = $1 AND user_id = $2")
            .bind(folder.id)
            .bind(folder.user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();
        if deleted == 0 {
            return Err(Error::NotFound(format!("folder {}", folder.id)));
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "files",
            op = "delete_folder",
            user_id = folder.user_id,
            folder_id = folder.id,
            files_removed = files,
            "Folder deleted"
        );
        Ok(files)
    }

    /// Change a file's display name. Returns false when not found.
    pub async fn rename_file(&self, id: i64, user_id: i64, new_name: &str) -> Result<bool> {
        let updated =
            sqlx::query("UPDATE files SET original_name = $3 WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .bind(new_name)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?
                .rows_affected();
        Ok(updated > 0)
    }

    /// Rename a folder and rewrite the paths of everything below it.
    ///
    /// Object keys do not change.
    pub async fn rename_folder(&self, id: i64, user_id: i64, new_name: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = $1 AND user_id = $2 FOR UPDATE"
        );
        let Some(folder) = sqlx::query_as::<_, Folder>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
        else {
            return Ok(false);
        };

        let old_path = folder.full_path();
        let new_path = join_path(&folder.path, new_name);
        let nested = format!("{}/%", escape_like(&old_path));

        sqlx::query("UPDATE folders SET name = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .bind(new_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_or_db(e, "folder"))?;

        for table in ["folders", "files"] {
            let sql = format!(
                "UPDATE {table} SET path = $3 || SUBSTRING(path FROM $4) \
                 WHERE user_id = $1 AND (path = $2 OR path LIKE $5 ESCAPE '\\')"
            );
            sqlx::query(&sql)
                .bind(user_id)
                .bind(&old_path)
                .bind(&new_path)
                .bind(old_path.chars().count() as i32 + 1)
                .bind(&nested)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(true)
    }
}
