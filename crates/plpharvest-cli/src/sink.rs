//! JSON-lines output store: one canonical record per line, appended batch
//! by batch.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use plpharvest_core::CanonicalProduct;
use plpharvest_scraper::{RecordSink, ScraperError};

pub(crate) struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Creates (or truncates) the output file, creating parent directories
    /// as needed.
    pub(crate) fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_batch(&self, records: &[CanonicalProduct]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        for record in records {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }
}

impl RecordSink for JsonLinesSink {
    fn persist_batch(&self, records: &[CanonicalProduct]) -> Result<(), ScraperError> {
        self.write_batch(records)
            .map_err(|e| ScraperError::Persist {
                count: records.len(),
                reason: format!("{}: {e}", self.path.display()),
            })?;
        tracing::debug!(count = records.len(), path = %self.path.display(), "batch written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use plpharvest_core::ExtractionMethod;

    use super::*;

    fn record(id: &str) -> CanonicalProduct {
        CanonicalProduct {
            id: id.to_owned(),
            title: Some(format!("Product {id}")),
            brand: None,
            currency: Some("GBP".to_owned()),
            price_value: Some(12.5),
            price_text: Some("£12.50".to_owned()),
            original_price_value: None,
            is_marked_down: false,
            is_in_stock: true,
            url: format!("https://www.example.com/prd/{id}"),
            image_url: None,
            color: None,
            badge: None,
            description: None,
            source_url: "https://www.example.com/search/?q=men".to_owned(),
            extraction_method: ExtractionMethod::Api,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn batches_append_one_line_per_record() {
        let dir = std::env::temp_dir().join(format!("plpharvest-sink-{}", std::process::id()));
        let path = dir.join("nested").join("out.jsonl");
        let sink = JsonLinesSink::create(&path).expect("sink should be created");

        sink.persist_batch(&[record("1"), record("2")]).unwrap();
        sink.persist_batch(&[record("3")]).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let ids: Vec<String> = written
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["id"].as_str().unwrap().to_owned()
            })
            .collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert!(written.contains("\"extraction_method\":\"api\""));

        fs::remove_dir_all(&dir).ok();
    }
}
