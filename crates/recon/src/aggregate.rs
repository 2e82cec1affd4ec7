use std::collections::BTreeMap;

use crate::model::{AggregateKey, AggregateRow, CanonicalFact, Granularity};

/// Group facts by identifier (and period at detail granularity), sum measures.
/// Output is ordered by key ascending.
pub fn aggregate_facts(facts: &[CanonicalFact], granularity: Granularity) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<AggregateKey, (f64, usize)> = BTreeMap::new();

    for fact in facts {
        let key = AggregateKey {
            identifier: fact.identifier.clone(),
            period: match granularity {
                Granularity::Detail => Some(fact.period),
                Granularity::Summary => None,
            },
        };
        let entry = groups.entry(key).or_insert((0.0, 0));
        entry.0 += fact.measure;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(key, (total, count))| AggregateRow {
            identifier: key.identifier,
            period: key.period,
            total,
            record_count: count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn fact(id: &str, date: &str, measure: f64) -> CanonicalFact {
        CanonicalFact {
            identifier: id.into(),
            period: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            measure,
        }
    }

    #[test]
    fn detail_aggregation() {
        let facts = vec![
            fact("DE0002", "2024-01-01", 5.0),
            fact("DE0001", "2024-02-01", 50.0),
            fact("DE0001", "2024-01-01", 60.0),
            fact("DE0001", "2024-01-01", 40.0),
        ];
        let rows = aggregate_facts(&facts, Granularity::Detail);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].identifier, "DE0001");
        assert_eq!(rows[0].period, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(rows[0].total, 100.0);
        assert_eq!(rows[0].record_count, 2);
        assert_eq!(rows[1].period, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(rows[2].identifier, "DE0002");
    }

    #[test]
    fn summary_drops_period() {
        let facts = vec![
            fact("DE0001", "2024-01-01", 100.0),
            fact("DE0001", "2024-02-01", 50.0),
            fact("DE0002", "2024-01-01", -5.0),
        ];
        let rows = aggregate_facts(&facts, Granularity::Summary);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].period, None);
        assert_eq!(rows[0].total, 150.0);
        assert_eq!(rows[1].total, -5.0);
    }

    #[test]
    fn empty_input() {
        assert!(aggregate_facts(&[], Granularity::Detail).is_empty());
    }

    proptest! {
        #[test]
        fn totals_are_conserved(
            items in proptest::collection::vec((0usize..4, 1u32..4, -1000i32..1000), 0..40)
        ) {
            let facts: Vec<CanonicalFact> = items
                .iter()
                .map(|(id, month, cents)| CanonicalFact {
                    identifier: format!("ID{id}"),
                    period: NaiveDate::from_ymd_opt(2024, *month, 1).unwrap(),
                    measure: *cents as f64 / 100.0,
                })
                .collect();
            let total: f64 = facts.iter().map(|f| f.measure).sum();

            for granularity in [Granularity::Detail, Granularity::Summary] {
                let rows = aggregate_facts(&facts, granularity);
                let grouped: f64 = rows.iter().map(|r| r.total).sum();
                prop_assert!((total - grouped).abs() < 1e-6);
                let counted: usize = rows.iter().map(|r| r.record_count).sum();
                prop_assert_eq!(counted, facts.len());
            }
        }
    }
}
