use crate::attrs::Attribute;
use crate::error::{Error, Result};
use crate::types::{
    missing_title, Category, Effect, FishboneDocument, NestedCause, NestedTag, RootCause,
    SchemaVersion, DOC_KIND,
};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

/// Props whose plain-text values were wrapped into `{textValue: ...}`
/// mappings by the 0.2 to 0.3 schema change.
const WRAPPED_PROP_KEYS: [&str; 3] = ["instructions", "backgroundDescription", "comments"];

/// Decode persisted text into a document at [`SchemaVersion::CURRENT`].
///
/// The version key is inspected before anything else, so an unsupported
/// version is reported as such even when the rest of the payload would not
/// parse. Older documents are upgraded one schema step at a time, and
/// `on_upgrade` sees the intermediate document after each step.
pub(crate) fn decode_document(
    text: &str,
    mut on_upgrade: Option<&mut dyn FnMut(&FishboneDocument)>,
) -> Result<FishboneDocument> {
    if text.trim().is_empty() {
        return Ok(FishboneDocument::skeleton());
    }
    let value: Value = serde_yaml::from_str(text).map_err(Error::Decode)?;
    if !value.is_mapping() {
        return Err(Error::NotAMapping);
    }
    let raw: RawDocument = serde_yaml::from_value(value).map_err(Error::Decode)?;

    let version = raw.schema_version()?;
    let mut doc = match version {
        SchemaVersion::V0_1 => {
            let doc = raw.upgrade_from_pairs()?;
            debug!("Upgraded pair-shaped document from 0.1 to 0.2");
            if let Some(hook) = &mut on_upgrade {
                hook(&doc);
            }
            doc
        }
        other => raw.into_document(other)?,
    };
    if doc.version == SchemaVersion::V0_2 {
        wrap_text_props(&mut doc.fishbone);
        doc.version = SchemaVersion::V0_3;
        debug!("Wrapped plain-text root cause props for 0.3");
        if let Some(hook) = &mut on_upgrade {
            hook(&doc);
        }
    }
    // The chain is not forwards compatible: only the terminal version may
    // leave decoding.
    if doc.version != SchemaVersion::CURRENT {
        return Err(Error::UnsupportedVersion(doc.version.to_string()));
    }
    Ok(doc)
}

// ============================================================================
// Staged top level
// ============================================================================

/// The top level of a document before its version is known. `fishbone`
/// stays opaque here because its shape differs across schema versions.
#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(rename = "type", default)]
    doc_type: Option<String>,
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    fishbone: Value,
    #[serde(default)]
    attributes: Option<Vec<Attribute>>,
    #[serde(flatten)]
    extra: Mapping,
}

impl RawDocument {
    fn schema_version(&self) -> Result<SchemaVersion> {
        let label = match &self.version {
            Some(Value::String(text)) => text.clone(),
            // Unquoted versions arrive as numbers ("version: 0.1").
            Some(Value::Number(number)) => number.to_string(),
            Some(_) => return Err(Error::UnsupportedVersion("(not text)".to_string())),
            None => return Err(Error::UnsupportedVersion("(missing)".to_string())),
        };
        label.parse()
    }

    fn into_document(self, version: SchemaVersion) -> Result<FishboneDocument> {
        let RawDocument {
            doc_type,
            title,
            fishbone,
            attributes,
            extra,
            ..
        } = self;
        let fishbone = match fishbone {
            Value::Null => Vec::new(),
            value => serde_yaml::from_value(value).map_err(Error::Decode)?,
        };
        Ok(FishboneDocument {
            doc_type: doc_type.unwrap_or_else(|| DOC_KIND.to_string()),
            version,
            title: title.unwrap_or_else(missing_title),
            fishbone,
            attributes: attributes.unwrap_or_default(),
            extra,
        })
    }

    fn upgrade_from_pairs(self) -> Result<FishboneDocument> {
        let RawDocument {
            doc_type,
            title,
            fishbone,
            attributes,
            extra,
            ..
        } = self;
        let pairs: Vec<LegacyEffect> = match fishbone {
            Value::Null => Vec::new(),
            value => serde_yaml::from_value(value).map_err(Error::Decode)?,
        };
        Ok(FishboneDocument {
            doc_type: doc_type.unwrap_or_else(|| DOC_KIND.to_string()),
            version: SchemaVersion::V0_2,
            title: title.unwrap_or_else(missing_title),
            fishbone: upgrade_effects(pairs)?,
            attributes: attributes.unwrap_or_default(),
            extra,
        })
    }
}

// ============================================================================
// 0.1 -> 0.2: name/value pairs become named mappings
// ============================================================================

/// Version 0.1 stored each effect as a `[name, categories]` pair and each
/// category as a `[name, rootCauses]` pair.
#[derive(Debug, Deserialize)]
struct LegacyEffect(String, Vec<LegacyCategory>);

#[derive(Debug, Deserialize)]
struct LegacyCategory(String, Vec<LegacyRootCause>);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyRootCause {
    Nested(LegacyNested),
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyNested {
    #[serde(rename = "type")]
    _tag: NestedTag,
    #[serde(default)]
    rel_path: String,
    #[serde(default)]
    title: String,
    data: Vec<LegacyEffect>,
    #[serde(flatten)]
    extra: Mapping,
}

fn upgrade_effects(pairs: Vec<LegacyEffect>) -> Result<Vec<Effect>> {
    pairs
        .into_iter()
        .map(|LegacyEffect(name, categories)| {
            let categories = categories
                .into_iter()
                .map(|LegacyCategory(name, causes)| {
                    let root_causes = causes
                        .into_iter()
                        .map(upgrade_root_cause)
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Category {
                        name,
                        root_causes,
                        extra: Mapping::new(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Effect {
                name,
                categories,
                extra: Mapping::new(),
            })
        })
        .collect()
}

fn upgrade_root_cause(cause: LegacyRootCause) -> Result<RootCause> {
    match cause {
        LegacyRootCause::Nested(nested) => {
            // Sub-diagram data is pair-shaped too and upgrades recursively.
            let mut upgraded =
                NestedCause::new(nested.rel_path, nested.title, upgrade_effects(nested.data)?);
            upgraded.extra = nested.extra;
            Ok(RootCause::Nested(upgraded))
        }
        LegacyRootCause::Other(value) => serde_yaml::from_value(value).map_err(Error::Decode),
    }
}

// ============================================================================
// 0.2 -> 0.3: plain-text props gain a textValue envelope
// ============================================================================

fn wrap_text_props(effects: &mut [Effect]) {
    for effect in effects {
        for category in &mut effect.categories {
            for cause in &mut category.root_causes {
                match cause {
                    RootCause::Simple(simple) => {
                        for key in WRAPPED_PROP_KEYS {
                            let Some(Value::String(text)) = simple.props.get(key) else {
                                continue;
                            };
                            let mut envelope = Mapping::new();
                            envelope.insert(Value::from("textValue"), Value::from(text.clone()));
                            simple.props.insert(Value::from(key), Value::from(envelope));
                        }
                    }
                    RootCause::Nested(nested) => wrap_text_props(&mut nested.data),
                    _ => {}
                }
            }
        }
    }
}
