use std::io::Write;

use crate::trackpoint_enricher::EnrichedTable;

/// Raw-table dump: every column of every retained row, headers taken from
/// the row struct. The first row's missing climb rate becomes an empty cell.
pub fn write_csv<W: Write>(table: &EnrichedTable, writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in &table.rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}
