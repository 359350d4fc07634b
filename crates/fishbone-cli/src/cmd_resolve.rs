use crate::host::FsHost;
use anyhow::{Context, Result};
use fishbone::{apply_update, DocumentUpdate, Effect, FishboneDocument, RootCause};
use std::path::PathBuf;

pub async fn run(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let content =
        std::fs::read_to_string(&input).with_context(|| format!("Failed to read {:?}", input))?;
    let doc = FishboneDocument::from_text(&content, None)
        .with_context(|| format!("Failed to decode {:?}", input))?;

    let pending = count_imports(&doc.fishbone);
    if pending == 0 {
        println!("No import placeholders in {:?}", input);
        return Ok(());
    }

    let host = FsHost::for_document(&input);
    let text = apply_update(&content, DocumentUpdate::from(doc), Some(&input), &host).await?;

    let target = output.unwrap_or(input);
    std::fs::write(&target, &text).with_context(|| format!("Failed to write {:?}", target))?;
    println!("Resolved {} imports into {:?}", pending, target);
    Ok(())
}

fn count_imports(effects: &[Effect]) -> usize {
    effects
        .iter()
        .flat_map(|effect| effect.categories.iter())
        .flat_map(|category| category.root_causes.iter())
        .map(|cause| match cause {
            RootCause::Import(_) => 1,
            RootCause::Nested(nested) => count_imports(&nested.data),
            _ => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fishbone::Attribute;
    use std::fs;

    const MAIN_DOC: &str = "\
version: '0.3'
title: main
fishbone:
  - name: e
    categories:
      - name: c
        rootCauses:
          - type: import
            request: other.fba
attributes:
  - date: 2024-01-01
";

    const OTHER_DOC: &str = "\
version: '0.3'
title: other
fishbone:
  - name: other effect
    categories:
      - name: other cat
        rootCauses:
          - other cause
attributes:
  - vehicle: v9
";

    #[tokio::test]
    async fn test_resolve_embeds_the_named_document() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.fba");
        fs::write(&main, MAIN_DOC).unwrap();
        fs::write(dir.path().join("other.fba"), OTHER_DOC).unwrap();

        run(main.clone(), None).await.unwrap();

        let doc = FishboneDocument::from_text(&fs::read_to_string(&main).unwrap(), None).unwrap();
        let RootCause::Nested(nested) = &doc.fishbone[0].categories[0].root_causes[0] else {
            panic!("Expected nested cause");
        };
        assert_eq!(nested.rel_path, "other.fba");
        assert_eq!(nested.title, "other");
        assert_eq!(nested.data[0].name, "other effect");
        assert_eq!(
            doc.attributes,
            vec![
                Attribute::new("date", "2024-01-01"),
                Attribute::new("vehicle", "v9"),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_missing_source_removes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.fba");
        fs::write(&main, MAIN_DOC).unwrap();

        run(main.clone(), None).await.unwrap();

        let doc = FishboneDocument::from_text(&fs::read_to_string(&main).unwrap(), None).unwrap();
        assert!(doc.fishbone[0].categories[0].root_causes.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_without_imports_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.fba");
        let original = "version: '0.3'\ntitle: plain\nfishbone: []\n";
        fs::write(&main, original).unwrap();

        run(main.clone(), None).await.unwrap();

        assert_eq!(fs::read_to_string(&main).unwrap(), original);
    }
}
