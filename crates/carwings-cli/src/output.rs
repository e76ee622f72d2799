//! Output formatting for leaf-info (table, json)

use std::cell::RefCell;
use std::fmt::Display;
use std::time::Duration;

use clap::ValueEnum;
use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Key/value tables (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// One titled group of fields
pub struct Section {
    pub title: &'static str,
    pub fields: Vec<(&'static str, String)>,
}

impl Section {
    pub fn new(title: &'static str, fields: Vec<(&'static str, String)>) -> Self {
        Self { title, fields }
    }
}

/// Context for output rendering
///
/// In JSON mode sections are collected and written as one document by
/// [`flush`](Self::flush).
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
    document: RefCell<Map<String, Value>>,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self {
            format,
            quiet,
            document: RefCell::new(Map::new()),
        }
    }

    /// Whether progress indicators should be drawn
    pub fn interactive(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Table
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        self.message(&msg.green().to_string());
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        self.message(msg);
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    // Keep stdout machine-readable in JSON mode
    fn message(&self, msg: &str) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Table => println!("{}", msg),
            OutputFormat::Json => eprintln!("{}", msg),
        }
    }

    /// Print titled key/value groups in the configured format
    pub fn print_sections(&self, sections: &[Section]) {
        match self.format {
            OutputFormat::Table => {
                for section in sections {
                    println!("{}", section.title.bold());
                    println!("{}", kv_table(&section.fields));
                }
            }
            OutputFormat::Json => {
                if let Value::Object(fields) = sections_json(sections) {
                    self.document.borrow_mut().extend(fields);
                }
            }
        }
    }

    /// Take the JSON document collected so far
    pub fn take_json(&self) -> Option<Value> {
        let document = std::mem::take(&mut *self.document.borrow_mut());
        (!document.is_empty()).then_some(Value::Object(document))
    }

    /// Write the collected JSON document to stdout
    pub fn flush(&self) {
        if let Some(document) = self.take_json() {
            println!(
                "{}",
                serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }
}

/// Field row of a key/value table
#[derive(Debug, Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn kv_table(pairs: &[(&str, String)]) -> String {
    let rows: Vec<FieldRow> = pairs
        .iter()
        .map(|(k, v)| FieldRow {
            field: k.to_string(),
            value: v.clone(),
        })
        .collect();
    Table::new(rows).to_string()
}

fn sections_json(sections: &[Section]) -> Value {
    let mut root = Map::new();
    for section in sections {
        let fields: Map<String, Value> = section
            .fields
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();
        root.insert(section.title.to_string(), Value::Object(fields));
    }
    Value::Object(root)
}

// =============================================================================
// Field formatting
// =============================================================================

/// Display a value or "-" when absent
pub fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

pub fn percent(value: Option<f64>) -> String {
    or_dash(value.map(|v| format!("{:.0}%", v)))
}

pub fn km(value: Option<f64>) -> String {
    or_dash(value.map(|v| format!("{:.0} km", v)))
}

pub fn hours_minutes(value: Option<Duration>) -> String {
    or_dash(value.map(|d| {
        let minutes = d.as_secs() / 60;
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_formatting() {
        assert_eq!(or_dash(None::<u32>), "-");
        assert_eq!(or_dash(Some("START")), "START");
        assert_eq!(percent(Some(74.6)), "75%");
        assert_eq!(km(Some(39.192)), "39 km");
        assert_eq!(hours_minutes(Some(Duration::from_secs(18 * 3600 + 30 * 60))), "18h 30m");
        assert_eq!(hours_minutes(None), "-");
        assert_eq!(yes_no(true), "yes");
    }

    #[test]
    fn test_sections_json_shape() {
        let sections = [
            Section::new("battery", vec![("Charge", "75%".to_string())]),
            Section::new("climate", vec![("Running", "no".to_string())]),
        ];
        let json = sections_json(&sections);
        assert_eq!(json["battery"]["Charge"], "75%");
        assert_eq!(json["climate"]["Running"], "no");
    }

    #[test]
    fn test_json_sections_form_one_document() {
        let ctx = OutputContext::new(OutputFormat::Json, true, false);
        ctx.print_sections(&[Section::new("vehicle", vec![("VIN", "VIN1".to_string())])]);
        ctx.print_sections(&[Section::new("refresh", vec![("Charging", "yes".to_string())])]);
        ctx.print_sections(&[Section::new("updated battery", vec![("Charge", "80%".to_string())])]);

        let document = ctx.take_json().expect("document");
        let keys: Vec<&String> = document.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(document["vehicle"]["VIN"], "VIN1");
        assert_eq!(document["refresh"]["Charging"], "yes");
        assert_eq!(document["updated battery"]["Charge"], "80%");

        // Flushed output is not repeated
        assert!(ctx.take_json().is_none());
    }

    #[test]
    fn test_table_mode_collects_nothing() {
        let ctx = OutputContext::new(OutputFormat::Table, true, true);
        ctx.print_sections(&[Section::new("battery", vec![("Charge", "75%".to_string())])]);
        assert!(ctx.take_json().is_none());
    }

    #[test]
    fn test_kv_table_lists_every_field() {
        let table = kv_table(&[("Charge", "75%".to_string()), ("Plugged in", "no".to_string())]);
        assert!(table.contains("Field"));
        assert!(table.contains("Charge"));
        assert!(table.contains("Plugged in"));
    }
}
