use std::collections::BTreeMap;

use crate::aggregate::aggregate_facts;
use crate::config::{ToleranceBand, ToleranceConfig};
use crate::evidence::compute_stats;
use crate::model::{
    AggregateKey, AggregateRow, CanonicalFact, ComparisonOutcome, ComparisonResult, ComparisonRow,
    FactTable, Granularity,
};

/// Output of joining two aggregate tables.
#[derive(Debug, Clone, Default)]
pub struct JoinOutput {
    pub rows: Vec<ComparisonRow>,
    pub fundline_only: usize,
    pub partner_only: usize,
}

/// Inner-join two aggregate tables on their key and classify each
/// `partner - fundline` difference against `band`. Rows present on only
/// one side are counted, not emitted.
pub fn reconcile(fundline: &[AggregateRow], partner: &[AggregateRow], band: &ToleranceBand) -> JoinOutput {
    let left: BTreeMap<AggregateKey, &AggregateRow> = fundline.iter().map(|a| (a.key(), a)).collect();
    let right: BTreeMap<AggregateKey, &AggregateRow> = partner.iter().map(|a| (a.key(), a)).collect();

    let mut out = JoinOutput::default();

    for (key, left_agg) in &left {
        if let Some(right_agg) = right.get(key) {
            let difference = right_agg.total - left_agg.total;
            out.rows.push(ComparisonRow {
                identifier: key.identifier.clone(),
                period: key.period,
                fundline_total: left_agg.total,
                partner_total: right_agg.total,
                difference,
                flag: band.classify(difference),
            });
        } else {
            out.fundline_only += 1;
        }
    }

    out.partner_only = right.keys().filter(|k| !left.contains_key(k)).count();
    out
}

/// Compare two fact tables at detail and summary granularity.
pub fn compare_facts(
    fundline: &FactTable,
    partner: &FactTable,
    tolerance: &ToleranceConfig,
) -> ComparisonResult {
    let join = |facts_l: &[CanonicalFact], facts_r: &[CanonicalFact], g: Granularity, band: &ToleranceBand| {
        reconcile(&aggregate_facts(facts_l, g), &aggregate_facts(facts_r, g), band)
    };

    let detail = join(&fundline.facts, &partner.facts, Granularity::Detail, &tolerance.detail);
    let summary = join(&fundline.facts, &partner.facts, Granularity::Summary, &tolerance.summary);

    let outcome = if detail.rows.is_empty() {
        ComparisonOutcome::EmptyIntersection
    } else {
        ComparisonOutcome::Overlap
    };

    ComparisonResult {
        fundline: fundline.source.clone(),
        partner: partner.source.clone(),
        outcome,
        detail_stats: compute_stats(&detail),
        summary_stats: compute_stats(&summary),
        detail: detail.rows,
        summary: summary.rows,
        fundline_quality: fundline.quality.clone(),
        partner_quality: partner.quality.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataQuality, ToleranceFlag};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn fact(id: &str, date: &str, measure: f64) -> CanonicalFact {
        CanonicalFact { identifier: id.into(), period: d(date), measure }
    }

    fn table(name: &str, facts: Vec<CanonicalFact>) -> FactTable {
        FactTable { source: name.into(), facts, quality: DataQuality::default() }
    }

    #[test]
    fn end_to_end_scenario() {
        let fundline = table(
            "fundline.xlsx",
            vec![fact("DE0001", "2024-01-01", 100.0), fact("DE0001", "2024-02-01", 50.0)],
        );
        let partner = table(
            "partner.xlsx",
            vec![fact("DE0001", "2024-01-01", 110.0), fact("DE0001", "2024-02-01", 20.0)],
        );
        let result = compare_facts(&fundline, &partner, &ToleranceConfig::default());

        assert_eq!(result.outcome, ComparisonOutcome::Overlap);
        assert_eq!(
            result.detail,
            vec![
                ComparisonRow {
                    identifier: "DE0001".into(),
                    period: Some(d("2024-01-01")),
                    fundline_total: 100.0,
                    partner_total: 110.0,
                    difference: 10.0,
                    flag: ToleranceFlag::WithinTolerance,
                },
                ComparisonRow {
                    identifier: "DE0001".into(),
                    period: Some(d("2024-02-01")),
                    fundline_total: 50.0,
                    partner_total: 20.0,
                    difference: -30.0,
                    flag: ToleranceFlag::BelowThreshold,
                },
            ]
        );
        assert_eq!(
            result.summary,
            vec![ComparisonRow {
                identifier: "DE0001".into(),
                period: None,
                fundline_total: 150.0,
                partner_total: 130.0,
                difference: -20.0,
                flag: ToleranceFlag::WithinTolerance,
            }]
        );
        assert_eq!(result.detail_stats.below, 1);
        assert_eq!(result.summary_stats.flagged(), 0);
        assert!(result.has_flagged());
    }

    #[test]
    fn disjoint_identifiers_are_an_empty_intersection() {
        let fundline = table("f.xlsx", vec![fact("DE0001", "2024-01-01", 1.0)]);
        let partner = table("p.xlsx", vec![fact("LU0001", "2024-01-01", 1.0)]);
        let result = compare_facts(&fundline, &partner, &ToleranceConfig::default());

        assert!(result.is_empty_intersection());
        assert!(result.detail.is_empty());
        assert!(result.summary.is_empty());
        assert_eq!(result.detail_stats.fundline_only, 1);
        assert_eq!(result.detail_stats.partner_only, 1);
        assert!(!result.has_flagged());
    }

    #[test]
    fn shared_identifier_on_different_periods() {
        let fundline = table("f.xlsx", vec![fact("DE0001", "2024-01-01", 100.0)]);
        let partner = table("p.xlsx", vec![fact("DE0001", "2024-03-01", 110.0)]);
        let result = compare_facts(&fundline, &partner, &ToleranceConfig::default());

        // Only the detail join decides the outcome.
        assert!(result.is_empty_intersection());
        assert!(result.detail.is_empty());
        assert_eq!(result.summary.len(), 1);
        assert_eq!(result.summary[0].difference, 10.0);
        assert_eq!(result.summary[0].flag, ToleranceFlag::WithinTolerance);
    }

    #[test]
    fn separate_bands_per_granularity() {
        let fundline = table("f.xlsx", vec![fact("DE0001", "2024-01-01", 0.0), fact("DE0001", "2024-02-01", 0.0)]);
        let partner = table("p.xlsx", vec![fact("DE0001", "2024-01-01", 4.0), fact("DE0001", "2024-02-01", 4.0)]);
        let tolerance = ToleranceConfig {
            detail: ToleranceBand::new(-5.0, 5.0),
            summary: ToleranceBand::new(-5.0, 5.0),
        };
        let result = compare_facts(&fundline, &partner, &tolerance);
        assert_eq!(result.detail_stats.within, 2);
        assert_eq!(result.summary[0].flag, ToleranceFlag::AboveThreshold);
    }

    #[test]
    fn partial_overlap_counts_one_sided_keys() {
        let left = vec![
            AggregateRow { identifier: "A".into(), period: None, total: 1.0, record_count: 1 },
            AggregateRow { identifier: "B".into(), period: None, total: 2.0, record_count: 1 },
        ];
        let right = vec![
            AggregateRow { identifier: "B".into(), period: None, total: 30.0, record_count: 1 },
            AggregateRow { identifier: "C".into(), period: None, total: 3.0, record_count: 1 },
            AggregateRow { identifier: "D".into(), period: None, total: 3.0, record_count: 1 },
        ];
        let out = reconcile(&left, &right, &ToleranceBand::default());
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].difference, 28.0);
        assert_eq!(out.rows[0].flag, ToleranceFlag::AboveThreshold);
        assert_eq!(out.fundline_only, 1);
        assert_eq!(out.partner_only, 2);
    }

    fn arb_rows() -> impl Strategy<Value = Vec<AggregateRow>> {
        proptest::collection::btree_set((0u8..6, 1u32..4), 0..12).prop_map(|keys| {
            keys.into_iter()
                .map(|(id, month)| AggregateRow {
                    identifier: format!("ID{id}"),
                    period: NaiveDate::from_ymd_opt(2024, month, 1),
                    total: month as f64,
                    record_count: 1,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn join_never_fabricates_rows(left in arb_rows(), right in arb_rows()) {
            let out = reconcile(&left, &right, &ToleranceBand::default());
            prop_assert!(out.rows.len() <= left.len().min(right.len()));
            prop_assert_eq!(out.rows.len() + out.fundline_only, left.len());
            prop_assert_eq!(out.rows.len() + out.partner_only, right.len());
        }
    }
}
