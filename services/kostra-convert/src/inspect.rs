//! Human-readable dataset overview for the `inspect` command.

use std::fmt::Write;

use kostra_grid::{AttrValue, DatasetSummary, FillValue};

/// Render a summary as plain text, one line per dimension and variable.
pub fn render_text(summary: &DatasetSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "dimensions:");
    for dim in &summary.dimensions {
        let _ = writeln!(out, "  {} = {}", dim.name, dim.len);
    }

    let _ = writeln!(out, "variables:");
    for var in &summary.variables {
        let _ = write!(
            out,
            "  {}({}) shape={:?}",
            var.name,
            var.dims.join(", "),
            var.shape
        );
        if let Some(units) = &var.units {
            let _ = write!(out, " units={}", units);
        }
        if let FillValue::Value(fill) = var.fill_value {
            let _ = write!(out, " fill={:e}", fill);
        }
        let _ = writeln!(out, " nulls={}", var.null_count);
    }

    if !summary.attrs.is_empty() {
        let _ = writeln!(out, "attributes:");
        for (key, value) in &summary.attrs {
            match value {
                AttrValue::Text(s) => {
                    let _ = writeln!(out, "  {} = {:?}", key, s);
                }
                AttrValue::Number(v) => {
                    let _ = writeln!(out, "  {} = {}", key, v);
                }
            }
        }
    }

    out
}
