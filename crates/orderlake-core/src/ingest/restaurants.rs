// Convert raw restaurant CSV records to a normalized Arrow RecordBatch.
//
// Restaurants carry no typed columns and no derived columns; everything is
// text passed through untouched.

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, RecordBatch, StringBuilder};
use arrow::datatypes::Schema;
use csv::StringRecord;
use std::sync::Arc;

use super::CsvPlan;
use crate::schema::{col, restaurants_schema};

/// Columns every restaurant file must carry.
pub const RESTAURANTS_REQUIRED_COLUMNS: &[&str] = &[col::RESTAURANT_ID, col::NAME, col::CUISINE];

pub struct RestaurantsNormalizer {
    schema: Arc<Schema>,
    passthrough: Vec<String>,
    restaurant_id: StringBuilder,
    name: StringBuilder,
    cuisine: StringBuilder,
    extras: Vec<StringBuilder>,
    rows: usize,
}

impl RestaurantsNormalizer {
    pub fn new(plan: &CsvPlan) -> Self {
        let passthrough = plan.passthrough().to_vec();

        Self {
            schema: restaurants_schema(&passthrough),
            extras: passthrough.iter().map(|_| StringBuilder::new()).collect(),
            passthrough,
            restaurant_id: StringBuilder::new(),
            name: StringBuilder::new(),
            cuisine: StringBuilder::new(),
            rows: 0,
        }
    }

    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Append every record of one CSV file. Returns the row count added.
    pub fn append_csv(&mut self, name: &str, bytes: &[u8]) -> Result<usize> {
        let before = self.rows;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);
        let header = reader
            .headers()
            .with_context(|| format!("reading CSV header of {}", name))?
            .clone();

        let find = |column: &str| -> Result<usize> {
            header
                .iter()
                .position(|h| h == column)
                .with_context(|| format!("column '{}' missing from header of {}", column, name))
        };
        let id_idx = find(col::RESTAURANT_ID)?;
        let name_idx = find(col::NAME)?;
        let cuisine_idx = find(col::CUISINE)?;
        let extra_idx: Vec<Option<usize>> = self
            .passthrough
            .iter()
            .map(|column| header.iter().position(|h| h == column))
            .collect();

        for record in reader.records() {
            let record = record.with_context(|| format!("reading CSV records of {}", name))?;
            self.append_record(&record, id_idx, name_idx, cuisine_idx, &extra_idx);
        }

        Ok(self.rows - before)
    }

    pub fn finish(mut self) -> Result<RecordBatch> {
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(self.restaurant_id.finish()),
            Arc::new(self.name.finish()),
            Arc::new(self.cuisine.finish()),
        ];
        for mut extra in self.extras {
            columns.push(Arc::new(extra.finish()));
        }

        RecordBatch::try_new(Arc::clone(&self.schema), columns)
            .context("assembling normalized restaurants batch")
    }

    fn append_record(
        &mut self,
        record: &StringRecord,
        id_idx: usize,
        name_idx: usize,
        cuisine_idx: usize,
        extra_idx: &[Option<usize>],
    ) {
        let text = |idx: usize| record.get(idx).map(str::trim).filter(|s| !s.is_empty());

        self.restaurant_id.append_option(text(id_idx));
        self.name.append_option(text(name_idx));
        self.cuisine.append_option(text(cuisine_idx));
        for (builder, idx) in self.extras.iter_mut().zip(extra_idx) {
            builder.append_option(idx.and_then(|i| record.get(i)));
        }
        self.rows += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, StringArray};

    #[test]
    fn normalizes_restaurants_with_passthrough() {
        let content = "restaurant_id,name,cuisine,rating\nr1,Casa Alta,portuguese,4.7\nr2,Noodle Bar,,\n";
        let files = vec![("r.csv".to_string(), content.as_bytes().to_vec())];
        let plan = CsvPlan::from_files(RESTAURANTS_REQUIRED_COLUMNS, &files).unwrap();

        let mut normalizer = RestaurantsNormalizer::new(&plan);
        let added = normalizer.append_csv("r.csv", content.as_bytes()).unwrap();
        assert_eq!(added, 2);

        let batch = normalizer.finish().unwrap();
        assert_eq!(batch.num_rows(), 2);

        let cuisine = batch
            .column_by_name("cuisine")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(cuisine.value(0), "portuguese");
        assert!(cuisine.is_null(1));

        let rating = batch
            .column_by_name("rating")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(rating.value(0), "4.7");
    }
}
