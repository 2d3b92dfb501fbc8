//! Multi-view augmentation pipeline composition
//!
//! This module only composes transforms and guarantees per-view independence;
//! the transform math itself lives behind [`TransformRegistry`], supplied by
//! the data-loading collaborator. Every call to
//! [`FullTransformPipeline::generate`] uses a generator seeded for that call,
//! so repeated or concurrent builds are reproducible and independent.

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use crate::config::AugmentationSpec;
use crate::error::{Error, Result};

/// One stochastic transform operation over images of type `I`
pub trait TransformOp<I>: Send + Sync {
    /// Apply the operation to one image, drawing randomness from `rng`
    fn apply(&self, image: &I, rng: &mut StdRng) -> I;
}

/// Collaborator that resolves op names into transform operations
pub trait TransformRegistry<I> {
    /// Build the operation registered under `name`, or `None` if unregistered
    fn build_op(
        &self,
        name: &str,
        params: &BTreeMap<String, Value>,
    ) -> Option<Box<dyn TransformOp<I>>>;
}

/// Ordered composition of the ops of one recipe
struct ComposedTransform<I> {
    ops: Vec<Box<dyn TransformOp<I>>>,
}

impl<I: Clone> ComposedTransform<I> {
    fn apply(&self, image: &I, rng: &mut StdRng) -> I {
        let mut out = image.clone();
        for op in &self.ops {
            out = op.apply(&out, rng);
        }
        out
    }
}

/// One view group: a composed recipe invoked `num_crops` times per image
pub struct NCropAugmentation<I> {
    transform: ComposedTransform<I>,
    crop_size: u32,
    num_crops: usize,
    op_names: Vec<String>,
}

impl<I: Clone> NCropAugmentation<I> {
    fn views(&self, image: &I, rng: &mut StdRng) -> Vec<I> {
        // One independent stochastic draw per view, never a reused draw
        (0..self.num_crops)
            .map(|_| self.transform.apply(image, rng))
            .collect()
    }
}

/// Composed multi-view augmentation pipeline
///
/// Given one source image, produces the views of every declared group in
/// declaration order, each group's sub-order stable.
pub struct FullTransformPipeline<I> {
    pipelines: Vec<NCropAugmentation<I>>,
}

impl<I: Clone> FullTransformPipeline<I> {
    /// Build the pipeline for a declared augmentation plan
    pub fn build(
        plan: &[AugmentationSpec],
        registry: &dyn TransformRegistry<I>,
    ) -> Result<Self> {
        let mut pipelines = Vec::with_capacity(plan.len());
        for spec in plan {
            let mut ops = Vec::with_capacity(spec.recipe.len());
            let mut op_names = Vec::with_capacity(spec.recipe.len());
            for recipe_op in &spec.recipe {
                let op = registry
                    .build_op(&recipe_op.name, &recipe_op.params)
                    .ok_or_else(|| Error::unknown_transform_op(&recipe_op.name))?;
                ops.push(op);
                op_names.push(recipe_op.name.clone());
            }
            pipelines.push(NCropAugmentation {
                transform: ComposedTransform { ops },
                crop_size: spec.crop_size,
                num_crops: spec.num_crops,
                op_names,
            });
        }
        Ok(Self { pipelines })
    }

    /// Total number of views produced per source image
    pub fn num_views(&self) -> usize {
        self.pipelines.iter().map(|p| p.num_crops).sum()
    }

    /// Produce all views of one source image
    ///
    /// The generator is scoped to this call and seeded explicitly, so the
    /// same `(image, seed)` pair always yields the same views.
    pub fn generate(&self, image: &I, seed: u64) -> Vec<I> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut views = Vec::with_capacity(self.num_views());
        for pipeline in &self.pipelines {
            views.extend(pipeline.views(image, &mut rng));
        }
        views
    }
}

impl<I> fmt::Display for FullTransformPipeline<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pipeline in &self.pipelines {
            writeln!(
                f,
                "{} x {}px: {}",
                pipeline.num_crops,
                pipeline.crop_size,
                pipeline.op_names.join(" -> ")
            )?;
        }
        Ok(())
    }
}
