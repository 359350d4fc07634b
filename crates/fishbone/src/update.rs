use crate::attrs::Attribute;
use crate::error::{Error, Result};
use crate::import::{resolve_imports, ImportHost};
use crate::types::{Effect, FishboneDocument, SchemaVersion, DOC_KIND};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::debug;

/// The edited state an authoring surface hands back to be persisted.
/// Fields left as `None` keep whatever the stored document already has.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fishbone: Option<Vec<Effect>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
}

impl DocumentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_fishbone(mut self, fishbone: Vec<Effect>) -> Self {
        self.fishbone = Some(fishbone);
        self
    }

    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

impl From<FishboneDocument> for DocumentUpdate {
    fn from(doc: FishboneDocument) -> Self {
        DocumentUpdate {
            title: Some(doc.title),
            fishbone: Some(doc.fishbone),
            attributes: Some(doc.attributes),
        }
    }
}

/// Fold `update` into the stored text and return the new text to persist.
///
/// The stored text is read at the key level, so top-level keys the model
/// does not know about survive the rewrite; unreadable stored text is
/// treated as an empty document rather than blocking the save. The result
/// always carries the current schema version and document kind.
///
/// An updated fishbone has its import placeholders resolved through `host`
/// before it is written, and attributes carried by imported documents are
/// merged in behind the existing ones. Import failures remove the
/// placeholder and are reported through the host; only a serialization
/// failure makes the whole update fail, in which case nothing should be
/// written.
pub async fn apply_update(
    stored_text: &str,
    update: DocumentUpdate,
    doc_path: Option<&Path>,
    host: &dyn ImportHost,
) -> Result<String> {
    let mut root = match serde_yaml::from_str::<Value>(stored_text) {
        Ok(Value::Mapping(map)) => map,
        _ => {
            debug!("Stored text is not a mapping, starting from an empty document");
            Mapping::new()
        }
    };
    root.insert(Value::from("type"), Value::from(DOC_KIND));
    root.insert(
        Value::from("version"),
        Value::from(SchemaVersion::CURRENT.as_str()),
    );
    if let Some(title) = update.title {
        root.insert(Value::from("title"), Value::from(title));
    }

    let had_attribute_update = update.attributes.is_some();
    let mut attributes = match update.attributes {
        Some(attributes) => attributes,
        None => stored_attributes(&root),
    };

    if let Some(mut fishbone) = update.fishbone {
        resolve_imports(&mut fishbone, &mut attributes, doc_path, host).await;
        let value = serde_yaml::to_value(&fishbone).map_err(Error::Encode)?;
        root.insert(Value::from("fishbone"), value);
    }

    if had_attribute_update || !attributes.is_empty() || root.contains_key("attributes") {
        let value = serde_yaml::to_value(&attributes).map_err(Error::Encode)?;
        root.insert(Value::from("attributes"), value);
    }

    serde_yaml::to_string(&Value::Mapping(root)).map_err(Error::Encode)
}

/// The attribute list already in the stored document, or empty when the
/// key is missing or does not have the expected shape.
fn stored_attributes(root: &Mapping) -> Vec<Attribute> {
    root.get("attributes")
        .and_then(|value| serde_yaml::from_value(value.clone()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, RootCause};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct StaticHost {
        files: HashMap<PathBuf, String>,
        warnings: Mutex<Vec<String>>,
    }

    impl StaticHost {
        fn new(files: &[(&str, &str)]) -> Self {
            StaticHost {
                files: files
                    .iter()
                    .map(|(path, text)| (PathBuf::from(path), text.to_string()))
                    .collect(),
                warnings: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImportHost for StaticHost {
        async fn pick_import_source(&self, request: Option<&Value>) -> Option<PathBuf> {
            request.and_then(Value::as_str).map(PathBuf::from)
        }

        async fn read_document(&self, path: &Path) -> io::Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }

        fn warn(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }
    }

    fn import_fishbone(request: &str) -> Vec<Effect> {
        vec![Effect::new("effect").with_category(
            Category::new("cat").with_root_cause(RootCause::import_from(request)),
        )]
    }

    #[tokio::test]
    async fn test_update_preserves_foreign_keys_and_stamps_version() {
        let stored = "\
type: fba
version: '0.2'
title: old title
reviewTicket: JIRA-123
fishbone: []
";
        let update = DocumentUpdate::new().with_title("new title");
        let text = apply_update(stored, update, None, &StaticHost::new(&[]))
            .await
            .unwrap();
        assert!(text.contains("version: '0.3'"));
        assert!(text.contains("title: new title"));
        assert!(text.contains("reviewTicket: JIRA-123"));
        // Untouched keys keep their content.
        assert!(text.contains("fishbone: []"));
    }

    #[tokio::test]
    async fn test_update_over_unreadable_text_starts_fresh() {
        let update = DocumentUpdate::new()
            .with_title("recovered")
            .with_fishbone(Vec::new());
        let text = apply_update("not: [valid", update, None, &StaticHost::new(&[]))
            .await
            .unwrap();
        let doc = FishboneDocument::from_text(&text, None).unwrap();
        assert_eq!(doc.title, "recovered");
        assert_eq!(doc.version, SchemaVersion::CURRENT);
        assert!(doc.fishbone.is_empty());
    }

    #[tokio::test]
    async fn test_update_resolves_imports_and_merges_attributes() {
        let other = "\
version: '0.3'
title: other
fishbone:
  - name: other effect
    categories:
      - name: other cat
        rootCauses: []
attributes:
  - date: from import
  - vehicle: v9
";
        let host = StaticHost::new(&[("/work/other.fba", other)]);
        let update = DocumentUpdate::new()
            .with_title("main")
            .with_fishbone(import_fishbone("/work/other.fba"))
            .with_attributes(vec![Attribute::new("date", "2024-01-01")]);

        let text = apply_update("", update, Some(Path::new("/work/main.fba")), &host)
            .await
            .unwrap();
        let doc = FishboneDocument::from_text(&text, None).unwrap();

        let RootCause::Nested(nested) = &doc.fishbone[0].categories[0].root_causes[0] else {
            panic!("Expected nested cause");
        };
        assert_eq!(nested.rel_path, "other.fba");
        assert_eq!(nested.title, "other");
        assert_eq!(
            doc.attributes,
            vec![
                Attribute::new("date", "2024-01-01"),
                Attribute::new("vehicle", "v9"),
            ]
        );
        assert!(host.warnings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_still_writes_when_an_import_fails() {
        let host = StaticHost::new(&[]);
        let update = DocumentUpdate::new()
            .with_title("survives")
            .with_fishbone(import_fishbone("/missing.fba"));

        let text = apply_update("", update, None, &host).await.unwrap();
        let doc = FishboneDocument::from_text(&text, None).unwrap();

        assert_eq!(doc.title, "survives");
        assert!(doc.fishbone[0].categories[0].root_causes.is_empty());
        assert_eq!(host.warnings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_update_normalizes_in_place() {
        let stored = "\
version: '0.3'
title: stays
fishbone: []
attributes:
  - date: kept
";
        let text = apply_update(stored, DocumentUpdate::new(), None, &StaticHost::new(&[]))
            .await
            .unwrap();
        let doc = FishboneDocument::from_text(&text, None).unwrap();
        assert_eq!(doc.title, "stays");
        assert_eq!(doc.attributes, vec![Attribute::new("date", "kept")]);
    }

    #[tokio::test]
    async fn test_no_attribute_key_is_invented() {
        let update = DocumentUpdate::new().with_title("t").with_fishbone(Vec::new());
        let text = apply_update("", update, None, &StaticHost::new(&[]))
            .await
            .unwrap();
        assert!(!text.contains("attributes"));
    }
}
