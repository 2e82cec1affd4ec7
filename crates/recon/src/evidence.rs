use crate::engine::JoinOutput;
use crate::model::{ComparisonResult, ComparisonStats, RunSummary, ToleranceFlag};

/// Count joined rows per tolerance flag, plus the one-sided keys.
pub fn compute_stats(join: &JoinOutput) -> ComparisonStats {
    let mut stats = ComparisonStats {
        joined: join.rows.len(),
        fundline_only: join.fundline_only,
        partner_only: join.partner_only,
        ..Default::default()
    };

    for row in &join.rows {
        match row.flag {
            ToleranceFlag::WithinTolerance => stats.within += 1,
            ToleranceFlag::BelowThreshold => stats.below += 1,
            ToleranceFlag::AboveThreshold => stats.above += 1,
        }
    }

    stats
}

/// Roll comparison results up into run-level counts.
pub fn compute_run_summary(
    fundline_files: usize,
    partner_files: usize,
    pairs: usize,
    comparisons: &[ComparisonResult],
) -> RunSummary {
    RunSummary {
        fundline_files,
        partner_files,
        pairs,
        comparisons: comparisons.len(),
        empty_intersections: comparisons.iter().filter(|c| c.is_empty_intersection()).count(),
        flagged_detail_rows: comparisons.iter().map(|c| c.detail_stats.flagged()).sum(),
        flagged_summary_rows: comparisons.iter().map(|c| c.summary_stats.flagged()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComparisonRow;

    fn row(flag: ToleranceFlag) -> ComparisonRow {
        ComparisonRow {
            identifier: "k".into(),
            period: None,
            fundline_total: 0.0,
            partner_total: 0.0,
            difference: 0.0,
            flag,
        }
    }

    #[test]
    fn stats_counts() {
        let join = JoinOutput {
            rows: vec![
                row(ToleranceFlag::WithinTolerance),
                row(ToleranceFlag::WithinTolerance),
                row(ToleranceFlag::BelowThreshold),
                row(ToleranceFlag::AboveThreshold),
                row(ToleranceFlag::AboveThreshold),
            ],
            fundline_only: 3,
            partner_only: 1,
        };
        let stats = compute_stats(&join);
        assert_eq!(stats.joined, 5);
        assert_eq!(stats.within, 2);
        assert_eq!(stats.below, 1);
        assert_eq!(stats.above, 2);
        assert_eq!(stats.flagged(), 3);
        assert_eq!(stats.fundline_only, 3);
        assert_eq!(stats.partner_only, 1);
    }
}
