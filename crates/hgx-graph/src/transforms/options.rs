use hgx_core::{CostWeight, HgError, RngHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug_span, info};

use super::binarize::{binarize, BinarizeOptions, BinarizeWhen};
use super::prune::{clamp_nbest, prune_to_nbest};
use super::push::{push_weights, PushReport, PushTo};
use super::reweight::{normalize, reweight, Normalize, ReweightOptions};
use crate::hypergraph::Hypergraph;

/// Transform settings as delivered by a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TransformOptions {
    /// Binarization policy.
    pub binarize_when: BinarizeWhen,
    /// Copy annotations onto every arc a binarization synthesizes.
    pub clone_annotations: bool,
    /// Push weights after binarizing.
    pub push_weights: bool,
    /// Push towards the final state instead of the start state.
    pub push_to_final: bool,
    /// Keep only the best `n` derivations. `0` disables pruning; only `1` is supported.
    pub prune_to_nbest: usize,
    /// Skip pruning when the hypergraph already has one derivation.
    pub skip_already_single: bool,
    /// Normalize arcs sharing a head.
    pub head_normalize: bool,
    /// Normalize arcs sharing a first tail.
    pub fsm_normalize: bool,
    /// Scalar cost edits.
    pub reweight: ReweightOptions,
    /// Seed for `reweight.random-add`.
    pub seed: u64,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            binarize_when: BinarizeWhen::Never,
            clone_annotations: false,
            push_weights: false,
            push_to_final: false,
            prune_to_nbest: 0,
            skip_already_single: true,
            head_normalize: false,
            fsm_normalize: false,
            reweight: ReweightOptions::default(),
            seed: 0,
        }
    }
}

impl TransformOptions {
    /// Rejects contradictory settings.
    pub fn validate(&self) -> Result<(), HgError> {
        if self.head_normalize && self.fsm_normalize {
            return Err(HgError::config(
                "conflicting-normalization",
                "head-normalize and fsm-normalize are mutually exclusive",
            )
            .with_hint("enable at most one of them"));
        }
        for (name, value) in [
            ("reweight.set", self.reweight.set),
            ("reweight.random-add", self.reweight.random_add),
            ("reweight.plus", self.reweight.plus),
            ("reweight.times", self.reweight.times),
        ] {
            if value.is_some_and(f64::is_nan) {
                return Err(HgError::config("nan-option", "reweighting options must not be NaN")
                    .with_context("option", name));
            }
        }
        Ok(())
    }

    /// Returns the n-best size pruning will actually use.
    pub fn effective_nbest(&self) -> usize {
        clamp_nbest(self.prune_to_nbest)
    }

    /// Returns the normalization to run, if any.
    pub fn normalization(&self) -> Option<Normalize> {
        if self.head_normalize {
            Some(Normalize::Head)
        } else if self.fsm_normalize {
            Some(Normalize::Fsm)
        } else {
            None
        }
    }
}

/// What [`apply_transforms`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformReport {
    /// Arcs whose cost was edited by reweighting.
    pub reweighted: usize,
    /// Arcs renormalized.
    pub normalized: usize,
    /// Arcs split by binarization.
    pub binarized: usize,
    /// Weight pushing summary, when pushing ran.
    pub pushed: Option<PushReport>,
    /// Whether pruning changed the hypergraph.
    pub pruned: bool,
}

/// Runs reweighting, normalization, binarization, pushing and pruning, in that order.
pub fn apply_transforms<W: CostWeight>(
    hg: &mut Hypergraph<W>,
    options: &TransformOptions,
) -> Result<TransformReport, HgError> {
    options.validate()?;
    let _span = debug_span!("apply_transforms").entered();
    let mut report = TransformReport::default();

    let mut rng = RngHandle::from_seed(options.seed);
    report.reweighted = reweight(hg, &options.reweight, &mut rng)?;
    if let Some(by) = options.normalization() {
        report.normalized = normalize(hg, by)?;
    }
    let binarize_options = BinarizeOptions {
        when: options.binarize_when,
        clone_annotations: options.clone_annotations,
    };
    report.binarized = binarize(hg, &binarize_options)?;
    if options.push_weights {
        let to = if options.push_to_final {
            PushTo::Final
        } else {
            PushTo::Start
        };
        report.pushed = Some(push_weights(hg, to)?);
    }
    report.pruned = prune_to_nbest(hg, options.prune_to_nbest, options.skip_already_single)?;
    info!(
        reweighted = report.reweighted,
        normalized = report.normalized,
        binarized = report.binarized,
        pruned = report.pruned,
        "transforms applied"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use hgx_core::{SymbolTable, ViterbiWeight};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;
    use crate::hypergraph::Hyperarc;

    #[test]
    fn yaml_fields_are_kebab_case() {
        let yaml = "binarize-when: one-lexical\nprune-to-nbest: 3\nreweight:\n  random-add: 0.5\n";
        let options: TransformOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(options.binarize_when, BinarizeWhen::OneLexical);
        assert_eq!(options.reweight.random_add, Some(0.5));
        assert!(options.skip_already_single);
        assert_eq!(options.effective_nbest(), 1);
    }

    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn oversized_nbest_warns_once() {
        let mut hg: Hypergraph<ViterbiWeight> = Hypergraph::new(SymbolTable::shared());
        let s0 = hg.add_state();
        let s1 = hg.add_state();
        hg.add_arc(Hyperarc::new(s1, vec![s0], ViterbiWeight::new(1.0))).unwrap();
        hg.add_arc(Hyperarc::new(s1, vec![s0], ViterbiWeight::new(2.0))).unwrap();
        hg.set_start(s0).unwrap();
        hg.set_final(s1).unwrap();
        let options = TransformOptions {
            prune_to_nbest: 4,
            ..TransformOptions::default()
        };

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let report = tracing::subscriber::with_default(subscriber, || {
            assert_eq!(options.effective_nbest(), 1);
            apply_transforms(&mut hg, &options).unwrap()
        });
        assert!(report.pruned);
        assert_eq!(hg.num_arcs(), 1);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn both_normalizations_conflict() {
        let options = TransformOptions {
            head_normalize: true,
            fsm_normalize: true,
            ..TransformOptions::default()
        };
        assert!(matches!(options.validate(), Err(HgError::Config(_))));
    }
}
