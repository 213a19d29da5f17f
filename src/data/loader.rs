use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::Spectrum;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a single spectrum from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.txt` / `.tsv` – the tab-separated export format (`#` lines skipped)
/// * `.json`         – `{ "x": [...], "y": [...] }`, or an array of such records
/// * `.parquet`      – `x` and `y` list columns; the first row is used
pub fn load_spectrum(path: &Path) -> Result<Spectrum> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (x, y) = match ext.as_str() {
        "txt" | "tsv" => load_tsv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    if x.len() != y.len() {
        bail!("x has {} values but y has {}", x.len(), y.len());
    }
    if x.is_empty() {
        bail!("{} contains no data points", path.display());
    }
    let axis: Arc<[f64]> = x.into();
    Ok(Spectrum::new(axis, y)?)
}

// ---------------------------------------------------------------------------
// Tab-separated text (our own export format)
// ---------------------------------------------------------------------------

/// ```text
/// # Absorption Spectrum
/// # Wavelength\tAbsorbance
/// 500.00\t0.301
/// ```
fn load_tsv(path: &Path) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening spectrum file")?;

    let mut x = Vec::new();
    let mut y = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;
        if record.len() < 2 {
            bail!("row {row_no}: expected 2 columns, found {}", record.len());
        }
        x.push(parse_float(&record[0], row_no, "wavelength")?);
        y.push(parse_float(&record[1], row_no, "value")?);
    }
    Ok((x, y))
}

fn parse_float(tok: &str, row: usize, col: &str) -> Result<f64> {
    tok.parse::<f64>()
        .with_context(|| format!("row {row}, {col}: '{tok}' is not a number"))
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<(Vec<f64>, Vec<f64>)> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let record = match &root {
        JsonValue::Array(records) => records.first().context("JSON array is empty")?,
        obj @ JsonValue::Object(_) => obj,
        _ => bail!("Expected a JSON object or array of objects"),
    };
    let obj = record
        .as_object()
        .context("spectrum record is not a JSON object")?;

    let x = json_array_to_f64(obj.get("x"), "x")?;
    let y = json_array_to_f64(obj.get("y"), "y")?;
    Ok((x, y))
}

fn json_array_to_f64(val: Option<&JsonValue>, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("{col}[{j}]: not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Expected schema: `x` and `y` as List<Float64|Float32> (or LargeList).
/// Other columns are ignored. Files written by Pandas or Polars both work.
fn load_parquet(path: &Path) -> Result<(Vec<f64>, Vec<f64>)> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        if batch.num_rows() == 0 {
            continue;
        }
        let schema = batch.schema();
        let x_idx = schema
            .index_of("x")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'x' column"))?;
        let y_idx = schema
            .index_of("y")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'y' column"))?;

        let x = extract_f64_list(batch.column(x_idx), 0).context("failed to read 'x'")?;
        let y = extract_f64_list(batch.column(y_idx), 0).context("failed to read 'y'")?;
        return Ok((x, y));
    }
    bail!("Parquet file contains no rows")
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .context("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .context("expected LargeListArray")?
            .value(row),
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}
