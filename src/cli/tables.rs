use super::ui;
use crate::core::{Finance, Frame, PriceRequest};
use anyhow::Result;
use comfy_table::{Cell, Table};
use tracing::info;

/// Which table a command renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Prices,
    Returns,
}

impl TableKind {
    fn title(&self) -> &'static str {
        match self {
            TableKind::Prices => "Prices",
            TableKind::Returns => "Returns",
        }
    }
}

pub async fn run(finance: &Finance, request: &PriceRequest, kind: TableKind) -> Result<()> {
    info!(?kind, tickers = ?request.tickers, "Loading table");

    let pb = ui::new_progress_bar(request.tickers.len() as u64);
    let result = finance
        .prices_with_progress(request, &|| pb.inc(1))
        .await;
    pb.finish_and_clear();

    let prices = result?;
    let frame = match kind {
        TableKind::Prices => prices,
        TableKind::Returns => prices.returns(),
    };

    println!(
        "\n{} {}",
        ui::style_text(kind.title(), ui::StyleType::Title),
        ui::style_text(&format!("({})", request.freq), ui::StyleType::Subtle)
    );
    if frame.is_empty() {
        println!("No rows available for the requested range.");
        return Ok(());
    }
    println!("{}", render_table(&frame, kind));
    Ok(())
}

pub fn render_table(frame: &Frame, kind: TableKind) -> Table {
    let mut table = ui::new_styled_table();

    let mut header = vec![ui::header_cell("Date")];
    header.extend(frame.columns().iter().map(|c| ui::header_cell(c)));
    table.set_header(header);

    for (date, row) in frame.index().iter().zip(frame.rows()) {
        let mut cells = vec![Cell::new(date.format("%Y-%m-%d"))];
        cells.extend(row.iter().map(|value| match kind {
            TableKind::Prices => ui::format_optional_cell(*value, |v| format!("{v:.2}")),
            TableKind::Returns => ui::change_cell(*value),
        }));
        table.add_row(cells);
    }

    table
}
