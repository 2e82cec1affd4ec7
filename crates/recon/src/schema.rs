use crate::config::{CanonicalField, SynonymTable};
use crate::model::SchemaTable;

/// Renames source-native columns to the canonical vocabulary.
pub struct SchemaMapper<'a> {
    synonyms: &'a SynonymTable,
}

impl<'a> SchemaMapper<'a> {
    pub fn new(synonyms: &'a SynonymTable) -> Self {
        Self { synonyms }
    }

    /// For each canonical field, the first alias (in declared order) present
    /// as a column is renamed. Fields whose canonical column already exists
    /// are left alone, which makes mapping idempotent.
    pub fn map(&self, mut table: SchemaTable) -> SchemaTable {
        for field in CanonicalField::ALL {
            let canonical = field.column_name();
            if table.has_column(canonical) {
                continue;
            }
            let hit = self
                .synonyms
                .aliases(field)
                .iter()
                .find_map(|alias| table.column_index(alias));
            if let Some(idx) = hit {
                log::debug!("mapping column '{}' -> {canonical}", table.columns[idx]);
                table.columns[idx] = canonical.to_string();
            }
        }
        table
    }

    /// Canonical key fields missing after mapping.
    pub fn missing_keys(table: &SchemaTable) -> Vec<String> {
        [CanonicalField::Identifier, CanonicalField::Period]
            .iter()
            .map(|f| f.column_name())
            .filter(|c| !table.has_column(c))
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HeaderOrigin, SchemaTable};
    use proptest::prelude::*;

    fn table(columns: &[&str]) -> SchemaTable {
        SchemaTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            origin: HeaderOrigin::Detected { source_row: 0 },
        }
    }

    #[test]
    fn renames_aliases_and_passes_others_through() {
        let synonyms = SynonymTable::default();
        let mapped = SchemaMapper::new(&synonyms).map(table(&["Share ISIN Reference", "Booking Date", "Fee", "Fund Name"]));
        assert_eq!(mapped.columns, vec!["identifier", "period", "measure", "Fund Name"]);
    }

    #[test]
    fn first_declared_alias_wins_on_collision() {
        let synonyms = SynonymTable::default();
        // "Provision" precedes "Fee" in the measure list.
        let mapped = SchemaMapper::new(&synonyms).map(table(&["ISIN", "Fee", "Provision"]));
        assert_eq!(mapped.columns, vec!["identifier", "Fee", "measure"]);
    }

    #[test]
    fn no_aliases_means_no_renames() {
        let synonyms = SynonymTable::default();
        let mapped = SchemaMapper::new(&synonyms).map(table(&["a", "b"]));
        assert_eq!(mapped.columns, vec!["a", "b"]);
        assert_eq!(SchemaMapper::missing_keys(&mapped), vec!["identifier", "period"]);
    }

    #[test]
    fn existing_canonical_column_is_kept() {
        let synonyms = SynonymTable::default();
        let mapped = SchemaMapper::new(&synonyms).map(table(&["identifier", "ISIN", "Datum"]));
        assert_eq!(mapped.columns, vec!["identifier", "ISIN", "period"]);
    }

    proptest! {
        #[test]
        fn mapping_is_idempotent(picks in proptest::collection::vec(0usize..12, 0..8)) {
            let pool = ["ISIN", "Isin", "Datum", "Date", "Fee", "Provision", "Bepro", "Text23", "x", "identifier", "measure", "Stichtag"];
            let mut columns: Vec<&str> = Vec::new();
            for p in picks {
                if !columns.contains(&pool[p]) {
                    columns.push(pool[p]);
                }
            }
            let synonyms = SynonymTable::default();
            let mapper = SchemaMapper::new(&synonyms);
            let once = mapper.map(table(&columns));
            let twice = mapper.map(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}
