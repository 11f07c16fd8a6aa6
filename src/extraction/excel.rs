use super::FormatOutput;
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;

/// Render every worksheet as a `Sheet: <name>` block of tab-separated rows.
pub(super) fn extract(bytes: &[u8]) -> Result<FormatOutput, String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|err| err.to_string())?;
    let sheet_names = workbook.sheet_names();

    let mut blocks = Vec::with_capacity(sheet_names.len());
    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|err| format!("worksheet '{name}': {err}"))?;
        let rows: Vec<String> = range.rows().filter_map(render_row).collect();
        blocks.push(sheet_block(name, &rows));
    }

    Ok(FormatOutput {
        text: blocks.join("\n\n"),
        sheet_count: Some(sheet_names.len()),
        ..FormatOutput::default()
    })
}

/// Tab-join the non-empty cells of a row; `None` when nothing but whitespace remains.
fn render_row(row: &[Data]) -> Option<String> {
    let line = row
        .iter()
        .filter(|cell| !matches!(cell, Data::Empty))
        .map(ToString::to_string)
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join("\t");
    (!line.trim().is_empty()).then_some(line)
}

fn sheet_block(name: &str, rows: &[String]) -> String {
    format!("Sheet: {name}\n{}", rows.join("\n"))
}
