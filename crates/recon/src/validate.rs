use crate::config::CanonicalField;
use crate::model::{CellValue, SchemaTable};

/// True when the identifier cell is non-empty text after trimming.
pub fn is_valid_identifier(cell: &CellValue) -> bool {
    cell.as_text().is_some_and(|s| !s.trim().is_empty())
}

/// Drop rows without a usable identifier or period.
///
/// Numeric identifiers are rejected: they are artifacts of totals rows and
/// footers rather than ISINs. Tables lacking either key column are returned
/// unchanged; the schema check reports them. Returns the filtered table and
/// the number of rows dropped.
pub fn filter_valid_rows(mut table: SchemaTable) -> (SchemaTable, usize) {
    let (Some(id_idx), Some(period_idx)) = (
        table.column_index(CanonicalField::Identifier.column_name()),
        table.column_index(CanonicalField::Period.column_name()),
    ) else {
        return (table, 0);
    };

    let before = table.rows.len();
    table.rows.retain(|row| {
        row.get(id_idx).is_some_and(is_valid_identifier)
            && row.get(period_idx).is_some_and(|c| !c.is_empty())
    });
    let dropped = before - table.rows.len();
    (table, dropped)
}
