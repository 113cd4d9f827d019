// Output formatting for CLI

use anyhow::Result;
use ballotflow_core::WorkflowState;
use serde::Serialize;

#[derive(Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s {
            "json" => OutputFormat::Json,
            "yaml" => OutputFormat::Yaml,
            _ => OutputFormat::Text,
        }
    }

    pub fn print_value<T: Serialize>(&self, value: &T) -> Result<()> {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(value)?);
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(value)?);
            }
            OutputFormat::Text => {
                // Text format is handled by each command
            }
        }
        Ok(())
    }

    /// Print one value per line; used for streaming output
    pub fn print_line<T: Serialize>(&self, value: &T) -> Result<()> {
        match self {
            OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
            OutputFormat::Yaml => print!("---\n{}", serde_yaml::to_string(value)?),
            OutputFormat::Text => {}
        }
        Ok(())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, OutputFormat::Text)
    }
}

/// Print a simple key-value pair for text output
pub fn print_field(label: &str, value: &str) {
    println!("{:<14} {}", format!("{}:", label), value);
}

/// Print a table header
pub fn print_table_header(columns: &[(&str, usize)]) {
    let header: String = columns
        .iter()
        .map(|(name, width)| format!("{:<width$}", name, width = width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", header);
}

/// Print a table row
pub fn print_table_row(values: &[(&str, usize)]) {
    let row: String = values
        .iter()
        .map(|(val, width)| format!("{:<width$}", truncate(val, *width), width = width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", row);
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width || width < 4 {
        return value.to_string();
    }
    let kept: String = value.chars().take(width - 3).collect();
    format!("{}...", kept)
}

/// Context id column value
pub fn context_label(state: &WorkflowState) -> &str {
    state.context_id.as_deref().unwrap_or("-")
}

/// Human-readable timestamp column value
pub fn format_timestamp(state: &WorkflowState) -> String {
    state
        .end_timestamp
        .or(state.start_timestamp)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_values() {
        assert_eq!(truncate("GENERATE_PRINT_FILE", 10), "GENERAT...");
        assert_eq!(truncate("COMPUTE", 10), "COMPUTE");
        assert_eq!(truncate("Ünïcödé-step", 8), "Ünïcö...");
    }

    #[test]
    fn test_output_format_parsing() {
        assert!(OutputFormat::from_str("text").is_text());
        assert!(!OutputFormat::from_str("json").is_text());
        assert!(OutputFormat::from_str("unknown").is_text());
    }
}
