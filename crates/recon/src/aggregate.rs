use fieldrev_core::{OriginalDisplacement, OriginalPart, VisitReport, VisitReportId};

use crate::identity::Identified;

/// All originals of an order, flattened across visit reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flattened {
    pub displacements: Vec<OriginalDisplacement>,
    pub parts: Vec<OriginalPart>,
}

/// Flatten every report's sub-collections, preserving report order and then
/// intra-report order. Each record is stamped with its owning report id.
pub fn flatten_visit_reports(reports: &[VisitReport]) -> Flattened {
    let mut out = Flattened::default();

    for report in reports {
        out.displacements.extend(report.displacements().iter().map(|d| OriginalDisplacement {
            visit_report_id: report.id,
            ..d.clone()
        }));
        out.parts.extend(report.parts().iter().map(|p| OriginalPart {
            visit_report_id: report.id,
            ..p.clone()
        }));
    }

    out
}

/// Indices of records owned by one visit report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitGroup {
    pub visit_report_id: VisitReportId,
    pub indices: Vec<usize>,
}

/// Group records for display, in order of first appearance.
pub fn group_by_visit_report<T: Identified>(records: &[T]) -> Vec<VisitGroup> {
    let mut groups: Vec<VisitGroup> = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let vr = record.identity_facts().visit_report_id;
        match groups.iter_mut().find(|g| g.visit_report_id == vr) {
            Some(group) => group.indices.push(i),
            None => groups.push(VisitGroup {
                visit_report_id: vr,
                indices: vec![i],
            }),
        }
    }

    groups
}
