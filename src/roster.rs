//! Parsing of the bulk "number name" student input.

use crate::model::Student;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Malformed,
    BadNumber,
    DuplicateNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedLine {
    /// 1-based line number in the submitted input.
    pub line: usize,
    pub text: String,
    pub reason: RejectReason,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddReport {
    pub added: Vec<Student>,
    pub rejected: Vec<RejectedLine>,
}

/// Parses one student per line as `<number> <name>`, split at the first
/// space. Blank lines are skipped. A number already on the roster, or earlier
/// in the same input, rejects the line.
pub fn parse_bulk_students(
    input: &str,
    existing: &[Student],
    mut new_id: impl FnMut() -> String,
) -> BulkAddReport {
    let mut taken: HashSet<i64> = existing.iter().map(|s| s.number).collect();
    let mut report = BulkAddReport::default();

    for (idx, raw) in input.split('\n').enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let reject = |reason: RejectReason, message: String| RejectedLine {
            line: idx + 1,
            text: raw.trim_end_matches('\r').to_string(),
            reason,
            message,
        };

        let Some((number_part, name_part)) = line.split_once(' ') else {
            report.rejected.push(reject(
                RejectReason::Malformed,
                format!("expected \"number name\": {:?}", line),
            ));
            continue;
        };
        let name = name_part.trim();
        if number_part.is_empty() || name.is_empty() {
            report.rejected.push(reject(
                RejectReason::Malformed,
                format!("expected \"number name\": {:?}", line),
            ));
            continue;
        }
        let Ok(number) = number_part.parse::<i64>() else {
            report.rejected.push(reject(
                RejectReason::BadNumber,
                format!("invalid student number: {:?}", number_part),
            ));
            continue;
        };
        if !taken.insert(number) {
            report.rejected.push(reject(
                RejectReason::DuplicateNumber,
                format!("student number {} already exists", number),
            ));
            continue;
        }

        report.added.push(Student {
            id: new_id(),
            number,
            name: name.to_string(),
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq_ids() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("s{}", n)
        }
    }

    #[test]
    fn duplicate_number_in_same_batch_is_rejected() {
        let report = parse_bulk_students("1 Kim\n2 Lee\n2 Park", &[], seq_ids());
        let added: Vec<(i64, &str)> = report
            .added
            .iter()
            .map(|s| (s.number, s.name.as_str()))
            .collect();
        assert_eq!(added, vec![(1, "Kim"), (2, "Lee")]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].line, 3);
        assert_eq!(report.rejected[0].text, "2 Park");
        assert_eq!(report.rejected[0].reason, RejectReason::DuplicateNumber);
    }

    #[test]
    fn numbers_on_roster_are_taken() {
        let existing = vec![Student {
            id: "a".into(),
            number: 7,
            name: "Choi".into(),
        }];
        let report = parse_bulk_students("7 Jung\n8 Kang", &existing, seq_ids());
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.added[0].number, 8);
        assert_eq!(report.rejected[0].reason, RejectReason::DuplicateNumber);
    }

    #[test]
    fn malformed_lines_are_reported_and_blank_lines_skipped() {
        let report = parse_bulk_students("\n  \nKim\nx Lee\n3   Han Ji-min  \r\n", &[], seq_ids());
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.added[0].name, "Han Ji-min");
        assert_eq!(report.added[0].number, 3);
        let reasons: Vec<RejectReason> = report.rejected.iter().map(|r| r.reason).collect();
        assert_eq!(reasons, vec![RejectReason::Malformed, RejectReason::BadNumber]);
        assert_eq!(report.rejected[0].line, 3);
    }
}
