use crate::attrs::Attribute;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::str::FromStr;

/// The `type` key every fishbone document carries at its top level.
pub const DOC_KIND: &str = "fba";

/// A complete fishbone analysis document.
///
/// The persisted form is a single YAML mapping. Keys the model does not know
/// about are kept in `extra` and written back verbatim, so other tools can
/// stash their own state in a document without this crate destroying it.
///
/// # YAML shape
///
/// ```yaml
/// type: fba
/// version: '0.3'
/// title: brake noise on cold mornings
/// fishbone:
///   - name: brake noise on cold mornings
///     categories:
///       - name: material
///         rootCauses:
///           - type: react
///             props:
///               label: worn pads
/// attributes:
///   - vehicle:
///       label: test vehicle id
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FishboneDocument {
    #[serde(rename = "type", default = "default_doc_type")]
    pub doc_type: String,
    pub version: SchemaVersion,
    #[serde(default = "missing_title")]
    pub title: String,
    #[serde(default)]
    pub fishbone: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    /// Top-level keys that belong to other tools.
    #[serde(flatten)]
    pub extra: Mapping,
}

fn default_doc_type() -> String {
    DOC_KIND.to_string()
}

pub(crate) fn missing_title() -> String {
    String::from("<please add title to .fba>")
}

// ============================================================================
// Schema versions
// ============================================================================

/// The known document schema versions, in chain order.
///
/// Decoding upgrades older documents one step at a time until
/// [`SchemaVersion::CURRENT`] is reached; anything outside this set is
/// rejected with [`Error::UnsupportedVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    #[serde(rename = "0.1")]
    V0_1,
    #[serde(rename = "0.2")]
    V0_2,
    #[serde(rename = "0.3")]
    V0_3,
}

impl SchemaVersion {
    /// The version freshly created and fully migrated documents carry.
    pub const CURRENT: SchemaVersion = SchemaVersion::V0_3;

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V0_1 => "0.1",
            SchemaVersion::V0_2 => "0.2",
            SchemaVersion::V0_3 => "0.3",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVersion {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s {
            "0.1" => Ok(SchemaVersion::V0_1),
            "0.2" => Ok(SchemaVersion::V0_2),
            "0.3" => Ok(SchemaVersion::V0_3),
            other => Err(Error::UnsupportedVersion(other.to_string())),
        }
    }
}

// ============================================================================
// Effects and categories
// ============================================================================

/// One top-level problem statement, a "bone" of the fishbone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// A grouping of root causes under an effect (wire key `rootCauses`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub root_causes: Vec<RootCause>,
    #[serde(flatten)]
    pub extra: Mapping,
}

// ============================================================================
// Root causes
// ============================================================================

/// A single root cause inside a category.
///
/// Mapping-shaped root causes self-discriminate on their `type` key:
/// `nested` and `import` are recognized, any other mapping is carried as
/// [`SimpleCause`] with its fields intact. Old documents also store
/// plain-text root causes as bare strings; those decode as `Label` and pass
/// through every migration untouched.
///
/// # YAML shape
///
/// ```yaml
/// rootCauses:
///   - type: react
///     props:
///       label: worn pads
///       comments:
///         textValue: replaced last spring
///   - type: nested
///     relPath: humidity.fba
///     title: humidity issues
///     data: []
///   - type: import
///     request: humidity.fba
///   - corroded caliper
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RootCause {
    Nested(NestedCause),
    Import(ImportCause),
    Simple(SimpleCause),
    Label(String),
}

/// An embedded sub-diagram: a full effect list sourced from another document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedCause {
    #[serde(rename = "type")]
    tag: NestedTag,
    /// Where the sub-diagram was imported from, relative to its host.
    #[serde(default)]
    pub rel_path: String,
    #[serde(default)]
    pub title: String,
    pub data: Vec<Effect>,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// A placeholder asking the next update pass to import another document.
/// Never survives resolution: it becomes a [`NestedCause`] or is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportCause {
    #[serde(rename = "type")]
    tag: ImportTag,
    /// Hint naming the document to load: a path or any other descriptor
    /// the host's file chooser understands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// A regular root cause: free-form `props` (label, processing state,
/// comments, instructions, background description) plus whatever other
/// fields the rendering surface stores alongside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleCause {
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub props: Mapping,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum NestedTag {
    #[default]
    #[serde(rename = "nested")]
    Nested,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum ImportTag {
    #[default]
    #[serde(rename = "import")]
    Import,
}

// ============================================================================
// Convenience methods
// ============================================================================

impl FishboneDocument {
    /// Decode a document from its persisted text, migrating it to
    /// [`SchemaVersion::CURRENT`] on the way in.
    ///
    /// `on_upgrade` is called with the intermediate document after each
    /// applied migration step, so callers can persist those states. An empty
    /// payload yields [`FishboneDocument::skeleton`] without any upgrade.
    pub fn from_text(
        text: &str,
        on_upgrade: Option<&mut dyn FnMut(&FishboneDocument)>,
    ) -> Result<Self> {
        crate::migrate::decode_document(text, on_upgrade)
    }

    /// Serialize back to persisted text.
    pub fn to_text(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::Encode)
    }

    /// The starter document an empty payload decodes to.
    pub fn skeleton() -> Self {
        FishboneDocument {
            doc_type: DOC_KIND.to_string(),
            version: SchemaVersion::CURRENT,
            title: String::from("<no title>"),
            fishbone: vec![
                Effect::new("<enter effect to analyse>").with_category(Category::new("category 1")),
            ],
            attributes: Vec::new(),
            extra: Mapping::new(),
        }
    }

    /// Number of categories, including those inside nested sub-diagrams.
    pub fn category_count(&self) -> usize {
        count_categories(&self.fishbone)
    }

    /// Number of root causes, including those inside nested sub-diagrams.
    pub fn root_cause_count(&self) -> usize {
        count_root_causes(&self.fishbone)
    }
}

fn count_categories(effects: &[Effect]) -> usize {
    effects
        .iter()
        .map(|effect| {
            effect.categories.len()
                + effect
                    .categories
                    .iter()
                    .flat_map(|category| category.root_causes.iter())
                    .map(|cause| match cause {
                        RootCause::Nested(nested) => count_categories(&nested.data),
                        _ => 0,
                    })
                    .sum::<usize>()
        })
        .sum()
}

fn count_root_causes(effects: &[Effect]) -> usize {
    effects
        .iter()
        .flat_map(|effect| effect.categories.iter())
        .flat_map(|category| category.root_causes.iter())
        .map(|cause| {
            1 + match cause {
                RootCause::Nested(nested) => count_root_causes(&nested.data),
                _ => 0,
            }
        })
        .sum()
}

impl Effect {
    pub fn new(name: impl Into<String>) -> Self {
        Effect {
            name: name.into(),
            categories: Vec::new(),
            extra: Mapping::new(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Category {
            name: name.into(),
            root_causes: Vec::new(),
            extra: Mapping::new(),
        }
    }

    pub fn with_root_cause(mut self, cause: RootCause) -> Self {
        self.root_causes.push(cause);
        self
    }
}

impl RootCause {
    /// A simple root cause with the given `props`.
    pub fn simple(props: Mapping) -> Self {
        RootCause::Simple(SimpleCause {
            props,
            extra: Mapping::new(),
        })
    }

    /// A plain-text root cause.
    pub fn label(text: impl Into<String>) -> Self {
        RootCause::Label(text.into())
    }

    /// An import placeholder with no source hint.
    pub fn import() -> Self {
        RootCause::Import(ImportCause::new())
    }

    /// An import placeholder hinting at the document to load.
    pub fn import_from(request: impl Into<Value>) -> Self {
        RootCause::Import(ImportCause::new().with_request(request))
    }

    pub fn is_import(&self) -> bool {
        matches!(self, RootCause::Import(_))
    }

    /// A short human-readable name for listings.
    pub fn summary(&self) -> &str {
        match self {
            RootCause::Label(text) => text,
            RootCause::Simple(simple) => simple
                .props
                .get("label")
                .or_else(|| simple.props.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("(root cause)"),
            RootCause::Nested(nested) => {
                if nested.title.is_empty() {
                    "(nested diagram)"
                } else {
                    &nested.title
                }
            }
            RootCause::Import(_) => "(pending import)",
        }
    }
}

impl NestedCause {
    pub fn new(rel_path: impl Into<String>, title: impl Into<String>, data: Vec<Effect>) -> Self {
        NestedCause {
            tag: NestedTag::Nested,
            rel_path: rel_path.into(),
            title: title.into(),
            data,
            extra: Mapping::new(),
        }
    }
}

impl ImportCause {
    pub fn new() -> Self {
        ImportCause {
            tag: ImportTag::Import,
            request: None,
            extra: Mapping::new(),
        }
    }

    pub fn with_request(mut self, request: impl Into<Value>) -> Self {
        self.request = Some(request.into());
        self
    }
}

impl Default for ImportCause {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleCause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prop(mut self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }
}
