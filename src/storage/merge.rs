use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::index::{IndexStore, INDEX_EXTENSION};
use super::types::{DatabaseError, MergedCandidate};

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("Failed to list index directory '{path}': {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read index store '{path}': {source}")]
    Store {
        path: String,
        #[source]
        source: DatabaseError,
    },
}

/// Index store files in `dir`, oldest run first, excluding `exclude`.
///
/// Stores named after their run date (`DDMMYYYY.db`, `situs-DDMMYYYY.db`)
/// sort chronologically, feed store before site store on the same day. Any
/// other store follows in file-name order.
pub fn list_index_stores(dir: &Path, exclude: &[PathBuf]) -> Result<Vec<PathBuf>, MergeError> {
    let read_dir_error = |source| MergeError::ReadDir {
        path: dir.display().to_string(),
        source,
    };

    let excluded: Vec<PathBuf> = exclude
        .iter()
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
        .collect();

    let mut stores = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_dir_error)? {
        let path = entry.map_err(read_dir_error)?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(INDEX_EXTENSION) {
            continue;
        }
        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if excluded.contains(&canonical) {
            tracing::debug!(path = %path.display(), "Skipping excluded database");
            continue;
        }
        stores.push(path);
    }

    stores.sort_by(|a, b| {
        let (da, db) = (store_run_date(a), store_run_date(b));
        (da.is_none(), da, a).cmp(&(db.is_none(), db, b))
    });
    Ok(stores)
}

/// Run date encoded in an index store's file name.
fn store_run_date(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix("situs-").unwrap_or(stem);
    if digits.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(digits, "%d%m%Y").ok()
}

/// Merge every index store in `dir` into one candidate list unique by link.
///
/// Stores are read one at a time, oldest run first (see
/// [`list_index_stores`]), and rows in insertion order. A row is kept only
/// if its link was not seen in an earlier store or an earlier row of the same
/// store, so the first occurrence wins.
///
/// # Errors
///
/// An unreadable directory or store aborts the merge.
pub async fn merge_directory(
    dir: &Path,
    exclude: &[PathBuf],
) -> Result<Vec<MergedCandidate>, MergeError> {
    let stores = list_index_stores(dir, exclude)?;

    let mut merged = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for path in &stores {
        let store_error = |source| MergeError::Store {
            path: path.display().to_string(),
            source,
        };
        let store = IndexStore::open_existing(path).await.map_err(store_error)?;
        let rows = store.links().await.map_err(store_error)?;
        store.close().await;

        let before = merged.len();
        let total = rows.len();
        merged.extend(rows.into_iter().filter(|row| seen.insert(row.link.clone())));

        tracing::info!(
            store = %path.display(),
            rows = total,
            new = merged.len() - before,
            "Read index store"
        );
    }

    tracing::info!(
        stores = stores.len(),
        candidates = merged.len(),
        "Merged index stores"
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CandidateItem;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("berita_merge_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn item(id: &str, link: &str) -> CandidateItem {
        CandidateItem {
            id: id.to_string(),
            link: link.to_string(),
            title: format!("title {id}"),
            published_raw: format!("raw {id}"),
        }
    }

    #[tokio::test]
    async fn test_list_skips_other_files_and_excluded() {
        let dir = temp_dir("list");
        std::fs::write(dir.join("notes.txt"), "x").unwrap();
        IndexStore::open(dir.join("b.db")).await.unwrap().close().await;
        IndexStore::open(dir.join("a.db")).await.unwrap().close().await;
        IndexStore::open(dir.join("central.db")).await.unwrap().close().await;

        let stores = list_index_stores(&dir, &[dir.join("central.db")]).unwrap();
        assert_eq!(stores, vec![dir.join("a.db"), dir.join("b.db")]);
    }

    #[tokio::test]
    async fn test_list_orders_by_run_date() {
        let dir = temp_dir("run_date_order");
        for name in ["01012023.db", "31122022.db", "situs-01012023.db", "catatan.db"] {
            IndexStore::open(dir.join(name)).await.unwrap().close().await;
        }

        let stores = list_index_stores(&dir, &[]).unwrap();
        assert_eq!(
            stores,
            vec![
                dir.join("31122022.db"),
                dir.join("01012023.db"),
                dir.join("situs-01012023.db"),
                dir.join("catatan.db"),
            ]
        );
    }

    #[tokio::test]
    async fn test_oldest_store_wins_across_year_end() {
        let dir = temp_dir("year_end");
        let newer = IndexStore::open(dir.join("01012023.db")).await.unwrap();
        let mut repeat = item("2", "https://x/1");
        repeat.published_raw = "newer".into();
        newer.insert_all(&[repeat]).await.unwrap();
        newer.close().await;

        let older = IndexStore::open(dir.join("31122022.db")).await.unwrap();
        older.insert_all(&[item("1", "https://x/1")]).await.unwrap();
        older.close().await;

        let merged = merge_directory(&dir, &[]).await.unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].published_raw, "raw 1");
    }

    #[tokio::test]
    async fn test_merge_dedups_within_same_store() {
        let dir = temp_dir("same_store");
        let store = IndexStore::open(dir.join("a.db")).await.unwrap();
        store
            .insert_all(&[item("1", "https://x/1"), item("2", "https://x/1")])
            .await
            .unwrap();
        store.close().await;

        let merged = merge_directory(&dir, &[]).await.unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].published_raw, "raw 1");
    }

    #[tokio::test]
    async fn test_merge_missing_directory_fails() {
        let dir = std::env::temp_dir().join("berita_merge_test_does_not_exist");
        let _ = std::fs::remove_dir_all(&dir);
        assert!(matches!(
            merge_directory(&dir, &[]).await,
            Err(MergeError::ReadDir { .. })
        ));
    }
}
