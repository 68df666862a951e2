//! In-place structural transforms.
//!
//! Every transform that adds or removes arcs collects its edits in an
//! [`ArcBatch`](crate::ArcBatch) and applies them after iteration, then refreshes
//! the properties it may have invalidated.

mod binarize;
mod characters;
mod combine;
mod options;
mod prune;
mod push;
mod reweight;
mod split;

pub use binarize::{binarize, BinarizeOptions, BinarizeWhen};
pub use characters::words_to_characters;
pub use combine::{concat, union};
pub use options::{apply_transforms, TransformOptions, TransformReport};
pub use prune::{clamp_nbest, prune_to_nbest, MAX_NBEST};
pub use push::{push_weights, PushReport, PushTo};
pub use reweight::{normalize, reweight, Normalize, ReweightOptions};
pub use split::split_states_by_label;
