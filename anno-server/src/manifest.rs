//! Catalog builder
//!
//! Reads the path manifest CSV and produces the catalog of work items,
//! one per (CLAN file, block index) pair. Record format:
//!
//! ```text
//! clan_file,block_index,path_to_block
//! ```
//!
//! Re-running against an existing store preserves each item's active
//! flag while picking up renamed block paths from the manifest.

use crate::store::{Store, WORK_BUCKET};
use anno_common::model::WorkItem;
use anno_common::{Error, Result};
use std::path::Path;
use tracing::{info, warn};

/// Outcome of reconciling the manifest with the persisted catalog.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Read and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<WorkItem>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Could not read manifest {}: {}", path.display(), e))
    })?;
    parse_manifest(&text)
}

/// Parse manifest text into work items. A header line naming the columns
/// is tolerated; blank lines are skipped.
pub fn parse_manifest(text: &str) -> Result<Vec<WorkItem>> {
    let mut items = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line_no == 0 && line.starts_with("clan_file") {
            continue;
        }

        let mut fields = line.splitn(3, ',');
        let (file, index, path) = match (fields.next(), fields.next(), fields.next()) {
            (Some(f), Some(i), Some(p)) => (f.trim(), i.trim(), p.trim()),
            _ => {
                return Err(Error::Config(format!(
                    "Manifest line {}: expected clan_file,block_index,block_path",
                    line_no + 1
                )))
            }
        };
        let block_index: u32 = index.parse().map_err(|_| {
            Error::Config(format!("Manifest line {}: bad block index {:?}", line_no + 1, index))
        })?;
        items.push(WorkItem::new(file, block_index, path));
    }
    Ok(items)
}

/// Reconcile manifest-derived items with the persisted catalog.
///
/// New items are stored inactive. For known items, a changed file name,
/// block index, or block path is logged and re-persisted with the stored
/// active flag carried over; the active flag itself is never taken from
/// the manifest.
pub async fn sync_catalog(store: &Store, items: &[WorkItem]) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let mut tx = store.begin().await?;

    for item in items {
        let existing: Option<WorkItem> = tx.get_json(WORK_BUCKET, &item.id).await?;
        match existing {
            None => {
                tx.put_json(WORK_BUCKET, &item.id, item).await?;
                report.added += 1;
            }
            Some(prev) => {
                if prev.file_name != item.file_name
                    || prev.block_index != item.block_index
                    || prev.block_path != item.block_path
                {
                    warn!(
                        "Work item {} changed in manifest (block path {} -> {})",
                        item.id, prev.block_path, item.block_path
                    );
                    let mut refreshed = item.clone();
                    refreshed.active = prev.active;
                    tx.put_json(WORK_BUCKET, &item.id, &refreshed).await?;
                    report.updated += 1;
                } else {
                    report.unchanged += 1;
                }
            }
        }
    }

    tx.commit().await?;
    info!(
        "Catalog sync: {} added, {} updated, {} unchanged",
        report.added, report.updated, report.unchanged
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_and_skips_header() {
        let text = "clan_file,block_index,block_path\nfileA,3,blocks/fileA/3.zip\n\nfileB,1,blocks/fileB/1.zip\n";
        let items = parse_manifest(text).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "fileA:::3");
        assert_eq!(items[1].block_path, "blocks/fileB/1.zip");
        assert!(items.iter().all(|i| !i.active));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_manifest("fileA,3").is_err());
        assert!(parse_manifest("fileA,three,path").is_err());
    }

    #[tokio::test]
    async fn sync_preserves_active_flag_on_path_change() {
        let store = Store::open_in_memory().await.unwrap();
        let items = parse_manifest("fileA,3,old/path.zip").unwrap();
        let report = sync_catalog(&store, &items).await.unwrap();
        assert_eq!(report, SyncReport { added: 1, updated: 0, unchanged: 0 });

        // Check the item out by hand, then re-sync with a moved path.
        let mut tx = store.begin().await.unwrap();
        let mut item: WorkItem = tx.get_json(WORK_BUCKET, "fileA:::3").await.unwrap().unwrap();
        item.active = true;
        tx.put_json(WORK_BUCKET, &item.id, &item).await.unwrap();
        tx.commit().await.unwrap();

        let moved = parse_manifest("fileA,3,new/path.zip").unwrap();
        let report = sync_catalog(&store, &moved).await.unwrap();
        assert_eq!(report.updated, 1);

        let item: WorkItem = store.get_json(WORK_BUCKET, "fileA:::3").await.unwrap().unwrap();
        assert!(item.active);
        assert_eq!(item.block_path, "new/path.zip");
    }
}
