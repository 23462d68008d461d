// Ingest planning across a set of CSV files.
//
// The normalized schema depends on every discovered file: required columns
// must be present in each header, and the passthrough set is the union of
// whatever else the headers carry.

use anyhow::{Context, Result};
use std::collections::BTreeSet;

/// Column layout for one kind of CSV input, derived from file headers.
#[derive(Debug, Clone)]
pub struct CsvPlan {
    required: &'static [&'static str],
    passthrough: Vec<String>,
}

impl CsvPlan {
    /// Build a plan from the header rows of every file of one input kind.
    ///
    /// Fails if any file's header lacks a required column, naming the
    /// column and the file. Files may order columns differently and may
    /// carry different passthrough columns; the plan's passthrough set is
    /// the sorted union.
    pub fn from_files(
        required: &'static [&'static str],
        files: &[(String, Vec<u8>)],
    ) -> Result<Self> {
        let mut passthrough = BTreeSet::new();

        for (name, bytes) in files {
            let mut reader = csv::Reader::from_reader(bytes.as_slice());
            let header = reader
                .headers()
                .with_context(|| format!("reading CSV header of {}", name))?;

            for column in required {
                if !header.iter().any(|h| h == *column) {
                    anyhow::bail!("column '{}' missing from header of {}", column, name);
                }
            }

            for field in header.iter() {
                if !required.contains(&field) {
                    passthrough.insert(field.to_string());
                }
            }
        }

        Ok(Self {
            required,
            passthrough: passthrough.into_iter().collect(),
        })
    }

    pub fn required(&self) -> &'static [&'static str] {
        self.required
    }

    /// Passthrough column names, sorted.
    pub fn passthrough(&self) -> &[String] {
        &self.passthrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: &[&str] = &["restaurant_id", "status"];

    fn file(name: &str, content: &str) -> (String, Vec<u8>) {
        (name.to_string(), content.as_bytes().to_vec())
    }

    #[test]
    fn passthrough_is_sorted_union_across_files() {
        let files = vec![
            file("a.csv", "restaurant_id,status,zeta\nr1,DELIVERED,z\n"),
            file("b.csv", "alpha,status,restaurant_id\na,NEW,r2\n"),
        ];
        let plan = CsvPlan::from_files(REQUIRED, &files).unwrap();
        assert_eq!(plan.passthrough(), &["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn missing_required_column_names_file_and_column() {
        let files = vec![file("orders/2024/bad.csv", "restaurant_id,city\nr1,x\n")];
        let err = CsvPlan::from_files(REQUIRED, &files).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'status'"), "{}", message);
        assert!(message.contains("orders/2024/bad.csv"), "{}", message);
    }

    #[test]
    fn no_files_yields_empty_passthrough() {
        let plan = CsvPlan::from_files(REQUIRED, &[]).unwrap();
        assert!(plan.passthrough().is_empty());
    }
}
