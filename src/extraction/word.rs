use super::FormatOutput;
use docx_rs::{
    DocumentChild, InsertChild, Paragraph, ParagraphChild, Run, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};

/// Raw text of a `.docx` body: one line per paragraph, one line per table row with
/// tab-separated cells. Content controls and generated tables of contents are not walked;
/// each one skipped is reported as a warning.
pub(super) fn extract(bytes: &[u8]) -> Result<FormatOutput, String> {
    let docx = docx_rs::read_docx(bytes).map_err(|err| err.to_string())?;

    let mut lines = Vec::new();
    let mut warnings = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
            DocumentChild::Table(table) => push_table_lines(table, &mut lines),
            DocumentChild::StructuredDataTag(_) => {
                warnings.push("Content control was skipped during raw text extraction".to_string())
            }
            DocumentChild::TableOfContents(_) => {
                warnings.push("Table of contents was skipped during raw text extraction".to_string())
            }
            _ => {}
        }
    }

    Ok(FormatOutput {
        text: lines.join("\n"),
        warnings: Some(warnings),
        ..FormatOutput::default()
    })
}

fn push_table_lines(table: &Table, lines: &mut Vec<String>) {
    for TableChild::TableRow(row) in &table.rows {
        let mut cells = Vec::with_capacity(row.cells.len());
        for TableRowChild::TableCell(cell) in &row.cells {
            let mut cell_lines = Vec::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => {
                        cell_lines.push(paragraph_text(paragraph))
                    }
                    TableCellContent::Table(nested) => push_table_lines(nested, &mut cell_lines),
                    _ => {}
                }
            }
            let text = cell_lines
                .iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                cells.push(text);
            }
        }
        if !cells.is_empty() {
            lines.push(cells.join("\t"));
        }
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    push_children_text(&paragraph.children, &mut text);
    text
}

fn push_children_text(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run_text(run, text),
            ParagraphChild::Hyperlink(link) => push_children_text(&link.children, text),
            ParagraphChild::Insert(insert) => {
                for insert_child in &insert.children {
                    if let InsertChild::Run(run) = insert_child {
                        push_run_text(run, text);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run_text(run: &Run, text: &mut String) {
    for run_child in &run.children {
        match run_child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Hyperlink, HyperlinkType, TableCell, TableRow};

    fn cell(text: &str) -> TableCell {
        TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
    }

    #[test]
    fn hyperlink_runs_are_kept_inline() {
        let paragraph = Paragraph::new()
            .add_run(Run::new().add_text("See "))
            .add_hyperlink(
                Hyperlink::new("https://example.com/pricing", HyperlinkType::External)
                    .add_run(Run::new().add_text("our pricing page")),
            )
            .add_run(Run::new().add_text(" for details."));
        assert_eq!(
            paragraph_text(&paragraph),
            "See our pricing page for details."
        );
    }

    #[test]
    fn table_rows_become_tab_separated_lines() {
        let table = Table::new(vec![
            TableRow::new(vec![cell("Metric"), cell("Value")]),
            TableRow::new(vec![cell("Revenue"), cell("42M")]),
            TableRow::new(vec![cell(""), cell("  ")]),
        ]);
        let mut lines = Vec::new();
        push_table_lines(&table, &mut lines);
        assert_eq!(lines, vec!["Metric\tValue", "Revenue\t42M"]);
    }
}
