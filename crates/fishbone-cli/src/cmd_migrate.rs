use anyhow::{Context, Result};
use fishbone::FishboneDocument;
use std::path::PathBuf;
use tracing::info;

pub fn run(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let content =
        std::fs::read_to_string(&input).with_context(|| format!("Failed to read {:?}", input))?;

    let mut steps = 0u32;
    let mut on_upgrade = |doc: &FishboneDocument| {
        steps += 1;
        info!("Migration step reached version {}", doc.version);
    };
    let doc = FishboneDocument::from_text(&content, Some(&mut on_upgrade))
        .with_context(|| format!("Failed to decode {:?}", input))?;

    let text = doc.to_text()?;
    let target = output.unwrap_or(input);
    std::fs::write(&target, &text).with_context(|| format!("Failed to write {:?}", target))?;

    if steps == 0 {
        println!("Already at version {}", doc.version);
    } else {
        println!("Migrated to version {} ({} steps)", doc.version, steps);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fishbone::SchemaVersion;
    use std::fs;

    #[test]
    fn test_migrate_legacy_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.fba");
        fs::write(
            &path,
            "version: '0.1'\ntitle: legacy\nfishbone: [[effect one, [[cat a, [rc one]]]]]\n",
        )
        .unwrap();

        run(path.clone(), None).unwrap();

        let migrated = FishboneDocument::from_text(&fs::read_to_string(&path).unwrap(), None).unwrap();
        assert_eq!(migrated.version, SchemaVersion::CURRENT);
        assert_eq!(migrated.fishbone[0].name, "effect one");
        assert_eq!(migrated.fishbone[0].categories[0].name, "cat a");
    }

    #[test]
    fn test_migrate_to_separate_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fba");
        let output = dir.path().join("out.fba");
        let original = "version: '0.2'\ntitle: t\nfishbone: []\n";
        fs::write(&input, original).unwrap();

        run(input.clone(), Some(output.clone())).unwrap();

        // The input is left alone and the output carries the new version.
        assert_eq!(fs::read_to_string(&input).unwrap(), original);
        assert!(fs::read_to_string(&output).unwrap().contains("version: '0.3'"));
    }

    #[test]
    fn test_migrate_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.fba");
        fs::write(&path, "version: '9.9'\nfishbone: []\n").unwrap();
        assert!(run(path, None).is_err());
    }
}
