//! JSON export of stored ads

use crate::model::AdRecord;
use crate::storage::AdStore;
use crate::HarvestError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Serializes records as a pretty-printed JSON array
pub fn ads_to_json(ads: &[AdRecord]) -> Result<String, HarvestError> {
    Ok(serde_json::to_string_pretty(ads)?)
}

/// Writes every stored ad to `path` and returns how many were written
pub fn export_json(store: &dyn AdStore, path: &Path) -> Result<usize, HarvestError> {
    let ads = store.list_ads()?;

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &ads)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!("Exported {} ads to {}", ads.len(), path.display());
    Ok(ads.len())
}
