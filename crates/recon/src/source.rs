use std::path::{Path, PathBuf};

use fieldrev_core::{ServiceOrderId, ServiceOrderSnapshot, VisitReport};

use crate::error::ReconError;

/// Supplies the visit reports of a service order as a read-only snapshot.
pub trait VisitReportSource {
    fn visit_reports(&self, order_id: ServiceOrderId) -> Result<Vec<VisitReport>, ReconError>;
}

/// An already-loaded snapshot serves exactly its own order.
impl VisitReportSource for ServiceOrderSnapshot {
    fn visit_reports(&self, order_id: ServiceOrderId) -> Result<Vec<VisitReport>, ReconError> {
        if self.order_id != order_id {
            return Err(ReconError::Source(format!(
                "snapshot is for order {}, not {order_id}",
                self.order_id
            )));
        }
        Ok(self.visit_reports.clone())
    }
}

/// Snapshot JSON files on disk: either one file, or a directory holding
/// `<order_id>.json` per order.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    root: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn snapshot_path(&self, order_id: ServiceOrderId) -> PathBuf {
        if self.root.is_dir() {
            self.root.join(format!("{order_id}.json"))
        } else {
            self.root.clone()
        }
    }
}

impl VisitReportSource for JsonSnapshotSource {
    fn visit_reports(&self, order_id: ServiceOrderId) -> Result<Vec<VisitReport>, ReconError> {
        let snapshot = read_snapshot(&self.snapshot_path(order_id))?;
        snapshot.visit_reports(order_id)
    }
}

pub fn read_snapshot(path: &Path) -> Result<ServiceOrderSnapshot, ReconError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    parse_snapshot(&json)
}

pub fn parse_snapshot(json: &str) -> Result<ServiceOrderSnapshot, ReconError> {
    serde_json::from_str(json).map_err(|e| ReconError::Source(format!("invalid snapshot: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "order_id": 1042,
        "visit_reports": [
            { "id": 1, "parts": [ { "id": 77, "description": "Valve", "quantity": 1 } ] }
        ]
    }"#;

    #[test]
    fn directory_source_resolves_by_order_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1042.json"), SNAPSHOT).unwrap();

        let source = JsonSnapshotSource::new(dir.path());
        let reports = source.visit_reports(1042).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].parts()[0].id, Some(77));

        let err = source.visit_reports(7).unwrap_err();
        assert!(matches!(err, ReconError::Io(_)));
    }

    #[test]
    fn file_source_checks_order_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.json");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let source = JsonSnapshotSource::new(&path);
        assert!(source.visit_reports(1042).is_ok());
        let err = source.visit_reports(1043).unwrap_err();
        assert!(err.to_string().contains("not 1043"));
    }

    #[test]
    fn malformed_snapshot() {
        let err = parse_snapshot("{ \"visit_reports\": [] }").unwrap_err();
        assert!(matches!(err, ReconError::Source(_)));
    }
}
