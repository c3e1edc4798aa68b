//! Console reporting of counts, samples and rankings.
//!
//! Purely observational: nothing written here is read back by any stage.

use std::sync::{Arc, Mutex};

use crate::table::Table;

/// Sink for the human-facing progress output of a pipeline run
pub trait Reporter: Send + Sync {
    fn row_count(&self, label: &str, count: usize);
    fn sample(&self, label: &str, table: &Table);
    fn ranking(&self, title: &str, table: &Table);
    /// Final message naming each stage's snapshot location.
    fn completed(&self, locations: &[(String, String)]);
}

/// Prints to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn row_count(&self, label: &str, count: usize) {
        println!("{} data count: {}", label, count);
    }

    fn sample(&self, _label: &str, table: &Table) {
        print!("{}", render_table(table));
    }

    fn ranking(&self, title: &str, table: &Table) {
        println!("{}", title);
        print!("{}", render_table(table));
    }

    fn completed(&self, locations: &[(String, String)]) {
        println!("Lakehouse pipeline complete:");
        for (label, location) in locations {
            println!("{} snapshot at: {}", label, location);
        }
    }
}

/// One captured reporter call
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    RowCount { label: String, count: usize },
    Sample { label: String, rows: usize },
    Ranking { title: String, table: Table },
    Completed { locations: Vec<(String, String)> },
}

/// Records every call, for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    events: Arc<Mutex<Vec<ReportEvent>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, event: ReportEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl Reporter for CollectingReporter {
    fn row_count(&self, label: &str, count: usize) {
        self.push(ReportEvent::RowCount {
            label: label.to_string(),
            count,
        });
    }

    fn sample(&self, label: &str, table: &Table) {
        self.push(ReportEvent::Sample {
            label: label.to_string(),
            rows: table.len(),
        });
    }

    fn ranking(&self, title: &str, table: &Table) {
        self.push(ReportEvent::Ranking {
            title: title.to_string(),
            table: table.clone(),
        });
    }

    fn completed(&self, locations: &[(String, String)]) {
        self.push(ReportEvent::Completed {
            locations: locations.to_vec(),
        });
    }
}

/// Render a table as a bordered text grid, cells untruncated and left-aligned.
pub fn render_table(table: &Table) -> String {
    let header: Vec<String> = table.schema.columns.iter().map(|c| c.name.clone()).collect();
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let border = {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&"-".repeat(*w));
            line.push('+');
        }
        line.push('\n');
        line
    };
    let format_row = |row: &[String]| {
        let mut line = String::from("|");
        for (cell, w) in row.iter().zip(&widths) {
            line.push_str(&format!("{:<width$}|", cell, width = *w));
        }
        line.push('\n');
        line
    };

    let mut out = String::new();
    out.push_str(&border);
    out.push_str(&format_row(&header));
    out.push_str(&border);
    for row in &cells {
        out.push_str(&format_row(row));
    }
    out.push_str(&border);
    out
}
