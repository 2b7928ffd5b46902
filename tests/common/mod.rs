//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SERVICE_COLUMNS: [&str; 3] = ["OnlineSecurity", "OnlineBackup", "TechSupport"];

const PAYMENT_METHODS: [&str; 4] = [
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];

/// Create a small churn table with known characteristics
///
/// This DataFrame includes:
/// - 40 rows, 12 with `Churn == "Yes"` and 28 with `"No"`
/// - `customerID`: unique identifier (usually dropped)
/// - `tenure`: months, 0..=71
/// - `TotalCharges`: numbers stored as text with 3 blank entries
/// - three Yes/No service columns, `Contract`, `PaymentMethod`
pub fn create_churn_dataframe() -> DataFrame {
    let n = 40usize;
    let tenure: Vec<i64> = (0..n).map(|i| ((i * 7) % 72) as i64).collect();
    let monthly: Vec<f64> = (0..n).map(|i| 20.5 + ((i * 3) % 80) as f64).collect();
    let total: Vec<String> = (0..n)
        .map(|i| {
            if i % 13 == 5 {
                " ".to_string()
            } else {
                format!("{:.2}", tenure[i] as f64 * monthly[i])
            }
        })
        .collect();
    let yes_no = |k: usize| -> Vec<&'static str> {
        (0..n)
            .map(|i| if (i + k) % 3 == 0 { "Yes" } else { "No" })
            .collect()
    };

    df! {
        "customerID" => (0..n).map(|i| format!("{:04}-TEST", i)).collect::<Vec<_>>(),
        "gender" => (0..n).map(|i| if i % 2 == 0 { "Female" } else { "Male" }).collect::<Vec<_>>(),
        "tenure" => tenure,
        "OnlineSecurity" => yes_no(0),
        "OnlineBackup" => yes_no(1),
        "TechSupport" => yes_no(2),
        "Contract" => (0..n).map(|i| CONTRACTS[i % 3]).collect::<Vec<_>>(),
        "PaymentMethod" => (0..n).map(|i| PAYMENT_METHODS[i % 4]).collect::<Vec<_>>(),
        "MonthlyCharges" => monthly,
        "TotalCharges" => total,
        "Churn" => (0..n).map(|i| if i % 10 < 3 { "Yes" } else { "No" }).collect::<Vec<_>>(),
    }
    .unwrap()
}

/// Write a DataFrame as CSV into `dir`
pub fn write_csv(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let csv_path = dir.join(name);
    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    csv_path
}

/// Create a temporary directory with the churn fixture as CSV
pub fn create_temp_churn_csv() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let mut df = create_churn_dataframe();
    let csv_path = write_csv(temp_dir.path(), "churn.csv", &mut df);
    (temp_dir, csv_path)
}

/// Options varied across pipeline tests
pub struct ConfigOptions<'a> {
    pub target_column: &'a str,
    pub encoding: &'a str,
    pub scaling: &'a str,
    pub smote: bool,
    pub test_size: f64,
}

impl Default for ConfigOptions<'_> {
    fn default() -> Self {
        Self {
            target_column: "Churn",
            encoding: "onehot",
            scaling: "standard",
            smote: false,
            test_size: 0.25,
        }
    }
}

/// YAML configuration reading `csv` and writing everything under `out`
pub fn config_yaml(csv: &Path, out: &Path, opts: &ConfigOptions) -> String {
    let p = |name: &str| out.join(name).display().to_string();
    format!(
        r#"
data:
  file_path: '{csv}'
  target_column: {target}
  drop_columns: [customerID]
  target_mapping: {{"Yes": 1, "No": 0}}
preprocessing:
  missing_value_strategy: median
  numeric_to_coerce: [TotalCharges]
  binning:
    tenure_bins: [0, 12, 24, 36, 48, 60, .inf]
    tenure_labels: ["0-12", "13-24", "25-36", "37-48", "49-60", "60+"]
  service_columns: [OnlineSecurity, OnlineBackup, TechSupport, StreamingTV]
  autopay_keywords: [automatic, bank transfer]
  test_size: {test_size}
  random_state: 42
  encoding: {encoding}
  scaling: {scaling}
  smote: {smote}
artifacts:
  x_train: '{x_train}'
  y_train: '{y_train}'
  x_test: '{x_test}'
  y_test: '{y_test}'
  feature_names: '{names}'
  preprocessor: '{pre}'
  metadata: '{meta}'
logging:
  file: '{log}'
  level: info
"#,
        csv = csv.display(),
        target = opts.target_column,
        test_size = opts.test_size,
        encoding = opts.encoding,
        scaling = opts.scaling,
        smote = opts.smote,
        x_train = p("artifacts/X_train.npz"),
        y_train = p("artifacts/y_train.npz"),
        x_test = p("artifacts/X_test.npz"),
        y_test = p("artifacts/y_test.npz"),
        names = p("artifacts/feature_names.npy"),
        pre = p("artifacts/preprocessor.json"),
        meta = p("artifacts/run_metadata.json"),
        log = p("logs/pipeline.log"),
    )
}

/// Write the YAML from [`config_yaml`] next to the data and return its path
pub fn write_config(dir: &Path, csv: &Path, opts: &ConfigOptions) -> PathBuf {
    let path = dir.join("config.yaml");
    std::fs::write(&path, config_yaml(csv, dir, opts)).unwrap();
    path
}

/// Labels with `n_major` zeros followed by `n_minor` ones
pub fn imbalanced_labels(n_major: usize, n_minor: usize) -> Vec<i64> {
    let mut labels = vec![0i64; n_major];
    labels.extend(std::iter::repeat(1i64).take(n_minor));
    labels
}
