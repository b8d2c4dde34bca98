//! # Post-Effect System
//!
//! Mutations trigger cascading effects to keep the page consistent.
//!
//! ## Design
//!
//! A primary mutation may leave the page in a state that breaks an
//! invariant. Removing a data source, for example, leaves every widget
//! bound to it pointing at nothing. Post-effects inspect the primary
//! mutation against the page *before* it is applied and return the
//! secondary mutations that repair the page afterwards.
//!
//! Post-effects are:
//! - **Deterministic**: Same mutation and page always produce same effects
//! - **Minimal**: Only generate necessary secondary mutations

use pagewright_common::PageConfig;
use tracing::debug;

use crate::mutations::{Mutation, MutationError, WidgetPatch};

/// Post-effect that can be triggered by a mutation
pub trait PostEffect: std::fmt::Debug + Send + Sync {
    /// Analyze the mutation against the page it is about to change
    fn analyze(&self, mutation: &Mutation, page: &PageConfig) -> Vec<Mutation>;
}

/// Clear the binding of every widget that used a removed data source
#[derive(Debug)]
pub struct UnbindRemovedDataSource;

impl PostEffect for UnbindRemovedDataSource {
    fn analyze(&self, mutation: &Mutation, page: &PageConfig) -> Vec<Mutation> {
        let Mutation::RemoveDataSource { key } = mutation else {
            return vec![];
        };

        page.widgets()
            .filter(|(_, widget)| widget.data_source_key.as_deref() == Some(key.as_str()))
            .map(|(section_id, widget)| Mutation::UpdateWidget {
                section_id: section_id.to_string(),
                widget_id: widget.id.clone(),
                patch: WidgetPatch::unbind(),
            })
            .collect()
    }
}

/// Post-effect engine that applies all registered effects
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self {
            effects: vec![Box::new(UnbindRemovedDataSource)],
        }
    }

    /// Engine that applies primary mutations only
    pub fn empty() -> Self {
        Self { effects: vec![] }
    }

    pub fn with_effect(mut self, effect: Box<dyn PostEffect>) -> Self {
        self.effects.push(effect);
        self
    }

    /// Analyze a mutation and generate all secondary mutations
    pub fn analyze(&self, mutation: &Mutation, page: &PageConfig) -> Vec<Mutation> {
        self.effects
            .iter()
            .flat_map(|effect| effect.analyze(mutation, page))
            .collect()
    }

    /// Apply a mutation with all its post-effects
    ///
    /// Returns every mutation applied, primary first. On error `page` may
    /// hold a partial result; callers apply to a working copy.
    pub fn apply_with_effects(
        &self,
        mutation: &Mutation,
        page: &mut PageConfig,
    ) -> Result<Vec<Mutation>, MutationError> {
        mutation.validate(page)?;
        let secondary = self.analyze(mutation, page);

        mutation.apply(page)?;

        let mut applied = Vec::with_capacity(secondary.len() + 1);
        applied.push(mutation.clone());
        for effect in secondary {
            effect.apply(page)?;
            applied.push(effect);
        }

        if applied.len() > 1 {
            debug!(
                mutation = mutation.name(),
                secondary = applied.len() - 1,
                "applied post-effects"
            );
        }

        Ok(applied)
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_common::{DataSource, Section, Widget};

    fn page() -> PageConfig {
        let mut page = PageConfig::new();
        page.data_sources.insert("products_1".into(), DataSource::new("products"));
        page.data_sources.insert("blog_1".into(), DataSource::new("articles"));
        page.sections.push(
            Section::new("grid", "product-grid")
                .with_widget(Widget::new("list", "product-list").bound_to("products_1"))
                .with_widget(Widget::new("posts", "article-list").bound_to("blog_1")),
        );
        page.sections.push(
            Section::new("carousel", "carousel")
                .with_widget(Widget::new("slides", "product-list").bound_to("products_1")),
        );
        page
    }

    #[test]
    fn test_remove_data_source_unbinds_widgets() {
        let engine = PostEffectEngine::new();
        let mut page = page();

        let applied = engine
            .apply_with_effects(
                &Mutation::RemoveDataSource {
                    key: "products_1".into(),
                },
                &mut page,
            )
            .unwrap();

        assert_eq!(applied.len(), 3);
        assert!(page.dangling_bindings().is_empty());
        assert!(page.find_widget("grid", "list").unwrap().data_source_key.is_none());
        assert!(page.find_widget("carousel", "slides").unwrap().data_source_key.is_none());
        assert_eq!(
            page.find_widget("grid", "posts").unwrap().data_source_key.as_deref(),
            Some("blog_1")
        );
    }

    #[test]
    fn test_empty_engine_leaves_dangling_bindings() {
        let engine = PostEffectEngine::empty();
        let mut page = page();

        engine
            .apply_with_effects(
                &Mutation::RemoveDataSource {
                    key: "products_1".into(),
                },
                &mut page,
            )
            .unwrap();

        assert_eq!(page.dangling_bindings().len(), 2);
    }

    #[test]
    fn test_unrelated_mutations_have_no_effects() {
        let engine = PostEffectEngine::new();
        let page = page();
        let mutation = Mutation::RemoveSection {
            section_id: "grid".into(),
        };
        assert!(engine.analyze(&mutation, &page).is_empty());
    }

    #[test]
    fn test_invalid_primary_is_rejected_before_effects() {
        let engine = PostEffectEngine::new();
        let mut page = page();
        let before = page.clone();

        let result = engine.apply_with_effects(
            &Mutation::RemoveDataSource { key: "nope".into() },
            &mut page,
        );

        assert_eq!(result, Err(MutationError::DataSourceNotFound("nope".into())));
        assert_eq!(page, before);
    }
}
