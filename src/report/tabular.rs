use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Composite key for wide tables: (archetype, row name).
pub type RowKey = (String, String);

/// A single cell of a pivoted summary table. Raw report values arrive as
/// strings; "N/A" and blank cells are distinct from a true zero, so the
/// unparseable/absent state is kept explicit instead of leaning on NaN.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "N/A" {
            return Self::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(number) => Self::Number(number),
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// One row of the TabularDataWithStrings dump: a generic key-value record of a
/// simulation summary section, promoted with the archetype it came from.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TabularRow {
    #[serde(default)]
    pub archetype: String,
    pub report_name: String,
    pub table_name: String,
    pub row_name: String,
    pub column_name: String,
    pub value: String,
}

/// The flat tabular summary table concatenated across archetypes.
#[derive(Clone, Debug, Default)]
pub struct TabularData {
    rows: Vec<TabularRow>,
}

impl TabularData {
    /// Value and RowName strings are stripped of surrounding whitespace on the
    /// way in, matching what downstream keys expect.
    pub fn new(rows: impl IntoIterator<Item = TabularRow>) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.value = row.value.trim().to_string();
                row.row_name = row.row_name.trim().to_string();
                row
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[TabularRow] {
        &self.rows
    }

    /// Pivots the rows of one (ReportName, TableName) section into a wide
    /// table indexed by (Archetype, RowName) with one column per ColumnName.
    /// Duplicate cells are joined with a space before numeric coercion, and an
    /// empty selection yields an empty table rather than an error so callers
    /// can treat the whole category as absent.
    pub fn pivot(&self, report_name: &str, table_name: &str) -> WideTable {
        let mut cells: IndexMap<RowKey, IndexMap<String, String>> = IndexMap::new();
        for row in &self.rows {
            if row.report_name != report_name || row.table_name != table_name {
                continue;
            }
            let key = (row.archetype.clone(), row.row_name.clone());
            let columns = cells.entry(key).or_default();
            match columns.get_mut(&row.column_name) {
                Some(existing) => {
                    existing.push(' ');
                    existing.push_str(&row.value);
                }
                None => {
                    columns.insert(row.column_name.clone(), row.value.clone());
                }
            }
        }
        if cells.is_empty() {
            warn!(
                "table \"{table_name}\" of report \"{report_name}\" returned no rows, \
                 returning an empty table"
            );
        }
        let rows = cells
            .into_iter()
            .map(|(key, columns)| {
                let columns = columns
                    .into_iter()
                    .map(|(name, raw)| (name, CellValue::parse(&raw)))
                    .collect();
                (key, columns)
            })
            .collect();
        WideTable { rows }
    }
}

/// A pivoted table: one row per (archetype, row name), one [`CellValue`] per
/// named column. Key order is insertion order, which keeps grouped output
/// stable across runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WideTable {
    rows: IndexMap<RowKey, IndexMap<String, CellValue>>,
}

impl WideTable {
    /// Builds a table keeping the first row on duplicate keys.
    pub fn from_rows(
        rows: impl IntoIterator<Item = (RowKey, IndexMap<String, CellValue>)>,
    ) -> Self {
        let mut table = Self::default();
        for (key, columns) in rows {
            table.rows.entry(key).or_insert(columns);
        }
        table
    }

    pub fn insert(&mut self, key: RowKey, columns: IndexMap<String, CellValue>) {
        self.rows.insert(key, columns);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &IndexMap<RowKey, IndexMap<String, CellValue>> {
        &self.rows
    }

    pub fn get(&self, archetype: &str, row_name: &str) -> Option<&IndexMap<String, CellValue>> {
        self.rows
            .get(&(archetype.to_string(), row_name.to_string()))
    }

    pub fn cell(&self, archetype: &str, row_name: &str, column: &str) -> CellValue {
        self.get(archetype, row_name)
            .and_then(|columns| columns.get(column))
            .cloned()
            .unwrap_or(CellValue::Missing)
    }

    /// Drops rows for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&RowKey, &IndexMap<String, CellValue>) -> bool) {
        self.rows.retain(|key, columns| keep(key, columns));
    }

    /// Groups rows by (archetype, value of `column`), falling back to the row
    /// name when the column is absent. Used to fold several component
    /// instances of one zone into a single record.
    pub fn group_by_column(
        &self,
        column: &str,
    ) -> IndexMap<RowKey, Vec<&IndexMap<String, CellValue>>> {
        let mut groups: IndexMap<RowKey, Vec<&IndexMap<String, CellValue>>> = IndexMap::new();
        for ((archetype, row_name), columns) in &self.rows {
            let group_name = columns
                .get(column)
                .and_then(CellValue::as_str)
                .unwrap_or(row_name.as_str());
            groups
                .entry((archetype.clone(), group_name.to_string()))
                .or_default()
                .push(columns);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn row(
        archetype: &str,
        table: &str,
        row_name: &str,
        column: &str,
        value: &str,
    ) -> TabularRow {
        TabularRow {
            archetype: archetype.to_string(),
            report_name: "Initialization Summary".to_string(),
            table_name: table.to_string(),
            row_name: row_name.to_string(),
            column_name: column.to_string(),
            value: value.to_string(),
        }
    }

    #[fixture]
    fn tabular() -> TabularData {
        TabularData::new([
            row("A1", "Zone Information", "1", "Zone Name", " CORE_ZN "),
            row("A1", "Zone Information", "1", "Floor Area {m2}", "100.5"),
            row("A1", "Zone Information", "2", "Zone Name", "PERIMETER_ZN"),
            row("A1", "Zone Information", "2", "Floor Area {m2}", "N/A"),
            row("A1", "Other Table", "1", "Zone Name", "IGNORED"),
        ])
    }

    #[rstest]
    fn cell_values_coerce_numbers_and_missing_markers() {
        assert_eq!(CellValue::parse("12.5"), CellValue::Number(12.5));
        assert_eq!(CellValue::parse(" N/A "), CellValue::Missing);
        assert_eq!(CellValue::parse(""), CellValue::Missing);
        assert_eq!(
            CellValue::parse("OCCUPY-1"),
            CellValue::Text("OCCUPY-1".to_string())
        );
    }

    #[rstest]
    fn pivot_selects_one_table_and_coerces(tabular: TabularData) {
        let pivoted = tabular.pivot("Initialization Summary", "Zone Information");
        assert_eq!(pivoted.len(), 2);
        assert_eq!(
            pivoted.cell("A1", "1", "Zone Name"),
            CellValue::Text("CORE_ZN".to_string())
        );
        assert_eq!(
            pivoted.cell("A1", "1", "Floor Area {m2}"),
            CellValue::Number(100.5)
        );
        assert_eq!(pivoted.cell("A1", "2", "Floor Area {m2}"), CellValue::Missing);
    }

    #[rstest]
    fn pivot_of_unknown_table_is_empty(tabular: TabularData) {
        let pivoted = tabular.pivot("Initialization Summary", "No Such Table");
        assert!(pivoted.is_empty());
    }

    #[rstest]
    fn group_by_column_falls_back_to_row_name(tabular: TabularData) {
        let pivoted = tabular.pivot("Initialization Summary", "Zone Information");
        let groups = pivoted.group_by_column("Zone Name");
        assert_eq!(
            groups.keys().cloned().collect::<Vec<_>>(),
            vec![
                ("A1".to_string(), "CORE_ZN".to_string()),
                ("A1".to_string(), "PERIMETER_ZN".to_string())
            ]
        );
    }

    #[rstest]
    fn from_rows_keeps_first_duplicate() {
        let mut first = IndexMap::new();
        first.insert("Peak Flow Rate {m3/s}".to_string(), CellValue::Number(1.0));
        let mut second = IndexMap::new();
        second.insert("Peak Flow Rate {m3/s}".to_string(), CellValue::Number(2.0));
        let table = WideTable::from_rows([
            (("A1".to_string(), "Z1".to_string()), first),
            (("A1".to_string(), "Z1".to_string()), second),
        ]);
        assert_eq!(
            table.cell("A1", "Z1", "Peak Flow Rate {m3/s}"),
            CellValue::Number(1.0)
        );
    }
}
