use anyhow::{Context, Result};
use fishbone::FishboneDocument;
use std::path::PathBuf;

pub fn run(input: PathBuf) -> Result<()> {
    let content =
        std::fs::read_to_string(&input).with_context(|| format!("Failed to read {:?}", input))?;
    validate_content(&content)
}

fn validate_content(content: &str) -> Result<()> {
    match FishboneDocument::from_text(content, None) {
        Ok(doc) => {
            println!(
                "Valid: {} ({} effects, {} categories, {} root causes)",
                doc.title,
                doc.fishbone.len(),
                doc.category_count(),
                doc.root_cause_count()
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("Invalid: {}", e)),
    }
}
