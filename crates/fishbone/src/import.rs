use crate::attrs::{merge_attributes, Attribute};
use crate::error::{Error, Result};
use crate::types::{Effect, FishboneDocument, NestedCause, RootCause};
use crate::visit::{for_each_root_cause, CauseVisitor, VisitOutcome};
use async_trait::async_trait;
use serde_yaml::Value;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// The embedder-side collaborators import resolution needs.
///
/// The library never talks to the user or the filesystem itself; whatever
/// surface hosts a document (an editor, a command line, a test) supplies
/// both through this trait.
#[async_trait]
pub trait ImportHost: Send + Sync {
    /// Choose the document an import placeholder should load.
    ///
    /// `request` is the placeholder's own source hint, if it carried one.
    /// Returning `None` means no document was chosen and the placeholder
    /// should be quietly removed.
    async fn pick_import_source(&self, request: Option<&Value>) -> Option<PathBuf>;

    /// Read the raw text of a chosen document.
    async fn read_document(&self, path: &Path) -> std::io::Result<String>;

    /// Surface a non-fatal diagnostic to the user.
    fn warn(&self, message: &str);
}

/// Resolve every import placeholder in `effects`, in document order.
///
/// Each placeholder is either replaced by a nested sub-diagram loaded
/// through `host`, or removed: cancellation removes it silently, a read or
/// decode failure removes it after `host.warn`. Loaded documents are
/// migrated on the way in, their attributes are merged into `attributes`
/// (existing names win), and imports inside the loaded data are resolved
/// transitively. `doc_path` is the importing document's own path; when
/// given, the nested record labels its source relative to that document's
/// directory.
pub async fn resolve_imports(
    effects: &mut Vec<Effect>,
    attributes: &mut Vec<Attribute>,
    doc_path: Option<&Path>,
    host: &dyn ImportHost,
) {
    let mut resolver = ImportResolver {
        host,
        doc_dir: doc_path.and_then(Path::parent).map(Path::to_path_buf),
        attributes,
    };
    for_each_root_cause(effects, &mut resolver).await;
}

impl FishboneDocument {
    /// [`resolve_imports`] over this document's own effect list and
    /// attributes.
    pub async fn resolve_imports(&mut self, doc_path: Option<&Path>, host: &dyn ImportHost) {
        resolve_imports(&mut self.fishbone, &mut self.attributes, doc_path, host).await;
    }
}

struct ImportResolver<'a> {
    host: &'a dyn ImportHost,
    doc_dir: Option<PathBuf>,
    attributes: &'a mut Vec<Attribute>,
}

#[async_trait]
impl CauseVisitor for ImportResolver<'_> {
    async fn visit(&mut self, cause: &RootCause) -> VisitOutcome {
        let RootCause::Import(import) = cause else {
            return VisitOutcome::Keep;
        };
        let Some(source) = self.host.pick_import_source(import.request.as_ref()).await else {
            debug!("No import source chosen, removing placeholder");
            return VisitOutcome::Delete;
        };
        match self.load(&source).await {
            Ok(imported) => {
                merge_attributes(self.attributes, &imported.attributes);
                let label = relative_path_label(self.doc_dir.as_deref(), &source);
                debug!("Imported {} as {}", source.display(), label);
                VisitOutcome::replace(RootCause::Nested(NestedCause::new(
                    label,
                    imported.title,
                    imported.fishbone,
                )))
            }
            Err(error) => {
                self.host.warn(&error.to_string());
                VisitOutcome::Delete
            }
        }
    }
}

impl ImportResolver<'_> {
    async fn load(&self, path: &Path) -> Result<FishboneDocument> {
        let text = self
            .host
            .read_document(path)
            .await
            .map_err(|source| Error::ImportRead {
                path: path.to_path_buf(),
                source,
            })?;
        FishboneDocument::from_text(&text, None).map_err(|source| Error::ImportDecode {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }
}

// ============================================================================
// Path labelling
// ============================================================================

/// The label recorded on a resolved import: the source relative to the
/// importing document's directory, or the source as given when no relative
/// form exists.
fn relative_path_label(doc_dir: Option<&Path>, source: &Path) -> String {
    doc_dir
        .and_then(|base| relative_to(base, source))
        .unwrap_or_else(|| source.to_path_buf())
        .display()
        .to_string()
}

fn relative_to(base: &Path, target: &Path) -> Option<PathBuf> {
    if base.is_absolute() != target.is_absolute() {
        return None;
    }
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = target.components().collect();
    // A ".." in the base leaves the number of steps up unknowable.
    if base.iter().any(|part| matches!(part, Component::ParentDir)) {
        return None;
    }
    let shared = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    // Walking up across a root or drive boundary is not expressible.
    if base[shared..]
        .iter()
        .any(|part| matches!(part, Component::RootDir | Component::Prefix(_)))
    {
        return None;
    }
    let mut rel = PathBuf::new();
    for _ in &base[shared..] {
        rel.push("..");
    }
    for part in &target[shared..] {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Some(rel)
}
