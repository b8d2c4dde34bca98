//! # Section Instantiation
//!
//! Stamps a page section out of a library block.
//!
//! One suffix is drawn per instance and applied everywhere:
//!
//! ```text
//! block "hero"                   section "hero-k3x9qa"
//!   widget "featured-products" →   widget "featured-products-k3x9qa"
//!     dataSourceTemplate             dataSourceKey "featured_products_k3x9qa"
//! ```
//!
//! The generated section id and data-source keys are checked against the
//! target page; on collision a fresh suffix is drawn.

use std::collections::BTreeMap;

use pagewright_common::{walk_value_mut, DataSource, DataSourceKey, PageConfig, Section, VisitorMut, Widget};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::library::LibraryBlock;
use crate::mutations::{Mutation, MutationError};
use crate::reference::{path_of, to_reference, TranslationPath};
use crate::translations::COMMON_TEMPLATE_ID;

pub const DEFAULT_SUFFIX_LEN: usize = 6;

const MAX_ATTEMPTS: usize = 8;

/// Source of instance suffixes
pub trait SuffixGenerator: Send + std::fmt::Debug {
    fn next_suffix(&mut self) -> String;
}

/// Lowercase alphanumeric suffixes
#[derive(Debug, Clone)]
pub struct RandomSuffix {
    len: usize,
}

impl RandomSuffix {
    pub fn new(len: usize) -> Self {
        Self { len: len.max(1) }
    }
}

impl Default for RandomSuffix {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIX_LEN)
    }
}

impl SuffixGenerator for RandomSuffix {
    fn next_suffix(&mut self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.len)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect()
    }
}

/// Counter-based suffixes, `{seed}1`, `{seed}2`, ...
#[derive(Debug, Clone, Default)]
pub struct SequentialSuffix {
    seed: String,
    count: u32,
}

impl SequentialSuffix {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }
}

impl SuffixGenerator for SequentialSuffix {
    fn next_suffix(&mut self) -> String {
        self.count += 1;
        format!("{}{}", self.seed, self.count)
    }
}

/// A collision-free section ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub section: Section,
    pub extra_data_sources: BTreeMap<DataSourceKey, DataSource>,
    pub suffix: String,
}

impl Instance {
    pub fn into_mutation(self, index: Option<usize>) -> Mutation {
        Mutation::AddSection {
            section: self.section,
            index,
            extra_data_sources: self.extra_data_sources,
        }
    }
}

#[derive(Debug)]
pub struct SectionInstantiator {
    suffixes: Box<dyn SuffixGenerator>,
}

impl SectionInstantiator {
    pub fn new(suffixes: Box<dyn SuffixGenerator>) -> Self {
        Self { suffixes }
    }

    pub fn random(len: usize) -> Self {
        Self::new(Box::new(RandomSuffix::new(len)))
    }

    pub fn sequential(seed: impl Into<String>) -> Self {
        Self::new(Box::new(SequentialSuffix::new(seed)))
    }

    /// Build an instance of `block` that does not collide with `page`
    pub fn instantiate(
        &mut self,
        block: &LibraryBlock,
        page: &PageConfig,
    ) -> Result<Instance, MutationError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let suffix = self.suffixes.next_suffix();
            let instance = build_instance(block, suffix);

            let collides = page.contains_section(&instance.section.id)
                || instance
                    .extra_data_sources
                    .keys()
                    .any(|key| page.contains_data_source(key));
            if !collides {
                return Ok(instance);
            }

            debug!(block = %block.id, suffix = %instance.suffix, attempt, "instance suffix collides");
        }

        Err(MutationError::SuffixExhausted(block.id.clone()))
    }
}

impl Default for SectionInstantiator {
    fn default() -> Self {
        Self::random(DEFAULT_SUFFIX_LEN)
    }
}

fn build_instance(block: &LibraryBlock, suffix: String) -> Instance {
    let mut extra_data_sources = BTreeMap::new();

    let widgets = block
        .widgets
        .iter()
        .map(|template| {
            let data_source_key = template.data_source_template.as_ref().map(|source| {
                let key = unique_key(&sanitize_key(&template.id), &suffix, &extra_data_sources);
                extra_data_sources.insert(key.clone(), source.materialize());
                key
            });

            Widget {
                id: format!("{}-{}", template.id, suffix),
                kind: template.kind.clone(),
                name: template.name.clone(),
                settings: template.settings.clone(),
                data_source_key,
            }
        })
        .collect();

    let section = Section {
        id: format!("{}-{}", block.id, suffix),
        kind: block.section_kind().to_string(),
        settings: block.settings.clone(),
        widgets,
    };

    Instance {
        section,
        extra_data_sources,
        suffix,
    }
}

/// Lowercase, non-alphanumerics folded to `_`
fn sanitize_key(id: &str) -> String {
    let key: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if key.is_empty() {
        "source".to_string()
    } else {
        key
    }
}

fn unique_key(base: &str, suffix: &str, taken: &BTreeMap<DataSourceKey, DataSource>) -> String {
    let mut key = format!("{}_{}", base, suffix);
    let mut n = 1;
    while taken.contains_key(&key) {
        n += 1;
        key = format!("{}_{}_{}", base, n, suffix);
    }
    key
}

/// One rewritten reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remap {
    pub from: TranslationPath,
    pub to: TranslationPath,
}

struct KeyRemapper<'a> {
    old_key: &'a str,
    new_key: &'a str,
    template_id: &'a str,
    remaps: Vec<Remap>,
}

impl KeyRemapper<'_> {
    fn remap(&self, path: &TranslationPath) -> Option<TranslationPath> {
        match path.segments() {
            [namespace, sections, key, rest @ ..]
                if namespace != COMMON_TEMPLATE_ID && sections == "sections" && key == self.old_key =>
            {
                let head = [self.template_id, "sections", self.new_key].map(str::to_string);
                Some(TranslationPath::new(head.into_iter().chain(rest.iter().cloned())))
            }
            _ => None,
        }
    }
}

impl VisitorMut for KeyRemapper<'_> {
    fn visit_string_mut(&mut self, value: &mut String) {
        let Some(from) = path_of(value) else {
            return;
        };
        let Some(to) = self.remap(&from) else {
            return;
        };

        *value = to_reference(&to);
        if !self.remaps.iter().any(|r| r.from == from) {
            self.remaps.push(Remap { from, to });
        }
    }
}

/// Point references at `<ns>.sections.<old_key>.*` to
/// `<template_id>.sections.<new_key>.*`, leaving `common` alone
pub fn remap_translation_keys(
    value: &mut Value,
    old_key: &str,
    new_key: &str,
    template_id: &str,
) -> Vec<Remap> {
    let mut remapper = KeyRemapper {
        old_key,
        new_key,
        template_id,
        remaps: Vec::new(),
    };
    walk_value_mut(&mut remapper, value);
    remapper.remaps
}

/// Same as [`remap_translation_keys`] over a section's and its widgets' settings
pub fn remap_section_translation_keys(
    section: &mut Section,
    old_key: &str,
    new_key: &str,
    template_id: &str,
) -> Vec<Remap> {
    let mut remapper = KeyRemapper {
        old_key,
        new_key,
        template_id,
        remaps: Vec::new(),
    };
    remapper.visit_section_mut(section);
    remapper.remaps
}
