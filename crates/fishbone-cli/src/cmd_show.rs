use anyhow::{Context, Result};
use fishbone::{Effect, FishboneDocument, RootCause};
use std::path::PathBuf;

pub fn run(input: PathBuf, json: bool) -> Result<()> {
    let content =
        std::fs::read_to_string(&input).with_context(|| format!("Failed to read {:?}", input))?;
    let doc = FishboneDocument::from_text(&content, None)
        .with_context(|| format!("Failed to decode {:?}", input))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("{} (version {})", doc.title, doc.version);
    for effect in &doc.fishbone {
        print_effect(effect, 1);
    }
    if !doc.attributes.is_empty() {
        println!("attributes:");
        for attr in &doc.attributes {
            println!("  {}", attr.name().unwrap_or("(unnamed)"));
        }
    }
    Ok(())
}

fn print_effect(effect: &Effect, depth: usize) {
    let pad = "  ".repeat(depth);
    println!("{}{}", pad, effect.name);
    for category in &effect.categories {
        println!("{}  [{}]", pad, category.name);
        for cause in &category.root_causes {
            println!("{}    - {}", pad, cause.summary());
            if let RootCause::Nested(nested) = cause {
                for inner in &nested.data {
                    print_effect(inner, depth + 3);
                }
            }
        }
    }
}
