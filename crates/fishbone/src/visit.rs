use crate::types::{Effect, RootCause};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};

/// What [`for_each_root_cause`] should do with the root cause it just
/// showed to the visitor.
#[derive(Debug, PartialEq)]
pub enum VisitOutcome {
    /// Leave the root cause as it is.
    Keep,
    /// Remove the root cause from its category.
    Delete,
    /// Swap the root cause for a new value.
    Replace(Box<RootCause>),
}

impl VisitOutcome {
    pub fn replace(cause: RootCause) -> Self {
        VisitOutcome::Replace(Box::new(cause))
    }
}

/// A callback invoked once per root cause during traversal.
///
/// Visits are strictly sequential: each `visit` future is awaited to
/// completion before the walk moves on, so implementations may hold state
/// across calls without synchronization.
#[async_trait]
pub trait CauseVisitor: Send {
    async fn visit(&mut self, cause: &RootCause) -> VisitOutcome;
}

/// Walk every root cause in `effects`, depth first, applying the visitor's
/// outcome to each.
///
/// Categories are scanned in document order. After a visit the slot is
/// updated per the [`VisitOutcome`]; if the value now in the slot is a
/// nested sub-diagram (whether it was already or just became one through
/// `Replace`), its `data` is walked before the cursor advances. `Delete`
/// removes the slot and re-runs the same index, so the element that slid
/// into it is not skipped.
pub async fn for_each_root_cause(effects: &mut Vec<Effect>, visitor: &mut dyn CauseVisitor) {
    walk_effects(effects, visitor).await;
}

fn walk_effects<'a>(
    effects: &'a mut Vec<Effect>,
    visitor: &'a mut dyn CauseVisitor,
) -> BoxFuture<'a, ()> {
    async move {
        for effect in effects.iter_mut() {
            for category in effect.categories.iter_mut() {
                let mut index = 0;
                while index < category.root_causes.len() {
                    match visitor.visit(&category.root_causes[index]).await {
                        VisitOutcome::Keep => {}
                        VisitOutcome::Delete => {
                            category.root_causes.remove(index);
                            continue;
                        }
                        VisitOutcome::Replace(replacement) => {
                            category.root_causes[index] = *replacement;
                        }
                    }
                    if let RootCause::Nested(nested) = &mut category.root_causes[index] {
                        walk_effects(&mut nested.data, &mut *visitor).await;
                    }
                    index += 1;
                }
            }
        }
    }
    .boxed()
}
