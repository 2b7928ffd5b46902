//! Column access helpers shared by the pipeline stages

use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Check whether a column with this exact name exists
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Column names in table order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Fail with a validation error listing every required column that is absent
pub fn validate_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !has_column(df, c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Validation(format!(
            "Missing required columns: {:?} (available: {:?})",
            missing,
            column_names(df)
        )))
    }
}

/// Integer and floating point dtypes
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric()
}

/// Dtypes encoded as categories rather than scaled
pub fn is_categorical_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::String | DataType::Boolean | DataType::Categorical(_, _)
    )
}

/// Read a numeric column as `f64`, mapping nulls and NaN to `None`.
///
/// Errors with a schema error when the column is absent and a validation
/// error when it holds non-numeric data.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::Schema(format!("Column '{}' not found in data", name)))?;

    if !is_numeric_dtype(column.dtype()) {
        return Err(PipelineError::Validation(format!(
            "Column '{}' must be numeric, found {}",
            name,
            column.dtype()
        )));
    }

    let float_col = column.cast(&DataType::Float64)?;
    let values = float_col
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

/// Convert a column to a Vec of Option<String> for comparison
pub fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            // Categoricals and anything else go through a string cast
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

/// Sorted distinct non-null values of a column rendered as strings
pub fn unique_values_as_strings(col: &Column) -> Result<Vec<String>> {
    let mut values: Vec<String> = column_to_string_vec(col)?.into_iter().flatten().collect();
    values.sort();
    values.dedup();
    Ok(values)
}
