//! Per-index axes persistence: a small bincode-encoded sidecar file next to
//! each index file, read back when a higher-level `list`/`axes` call needs
//! to merge per-keyword value sets without scanning every datum entry.

use std::fs;
use std::path::Path;

use fdb_core::Axes;

use crate::error::CatalogueError;

pub fn write(path: &Path, axes: &Axes) -> Result<(), CatalogueError> {
    let bytes = bincode::serialize(axes)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read(path: &Path) -> Result<Axes, CatalogueError> {
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("axes.0");

        let mut axes = Axes::new();
        axes.insert("param", "130");
        axes.insert("levelist", "500");
        write(&path, &axes).unwrap();

        let read_back = read(&path).unwrap();
        assert_eq!(read_back.values_of("param").collect::<Vec<_>>(), vec!["130"]);
    }
}
