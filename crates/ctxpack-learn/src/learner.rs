//! Bounded online updates of scorer weights and co-access affinities

use crate::log::SessionLog;
use chrono::Utc;
use ctxpack_core::{Feature, FeatureVector, FeatureWeights, LearningConfig, LearningModel};

const FLAT_DELTA: f64 = 1e-12;

/// Turns session logs into new learning models.
///
/// The learner is pure: `learn` never touches the model it is given and
/// returns the successor, which callers commit through a
/// [`ModelHandle`](crate::ModelHandle).
#[derive(Debug, Clone, Default)]
pub struct FeedbackLearner {
    config: LearningConfig,
}

impl FeedbackLearner {
    pub fn new(config: LearningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Successor of `model` after observing one session
    pub fn learn(&self, model: &LearningModel, log: &SessionLog) -> LearningModel {
        let (mut next, _) = model.repaired();

        if let Some(raw) = effectiveness_delta(log) {
            let strength = log.signal_strength();
            let smoothing = self.config.smoothing.clamp(0.0, 1.0);
            let mut smoothed = FeatureVector::default();
            for f in Feature::ALL {
                let value =
                    smoothing * next.smoothed_delta.get(f) + (1.0 - smoothing) * raw.get(f) * strength;
                smoothed.set(f, value);
            }
            let before = next.weights;
            next.weights = bounded_step(&next.weights, &smoothed, self.config.learning_rate);
            next.smoothed_delta = smoothed;
            tracing::debug!(
                keyword = next.weights.keyword_match - before.keyword_match,
                name = next.weights.name_match - before.name_match,
                proximity = next.weights.dependency_proximity - before.dependency_proximity,
                type_match = next.weights.type_match - before.type_match,
                recency = next.weights.recency - before.recency,
                "weights moved"
            );
        } else {
            tracing::debug!(profile = %log.profile.id, "no contrast between accessed and unused entries");
        }

        self.record_co_access(&mut next, log);
        for path in &log.accessed {
            *next.access_counts.entry(path.clone()).or_insert(0) += 1;
        }

        next.sessions_observed += 1;
        next.version += 1;
        next.updated_at = Some(Utc::now());
        tracing::info!(
            version = next.version,
            accessed = log.accessed.len(),
            outcome = log.outcome.as_str(),
            affine_pairs = next.affinity.len(),
            "learning model updated"
        );
        next
    }

    fn record_co_access(&self, model: &mut LearningModel, log: &SessionLog) {
        let accessed: Vec<&String> = log.accessed.iter().collect();
        for (i, a) in accessed.iter().enumerate() {
            for b in &accessed[i + 1..] {
                let count = model.co_access.increment(a, b, 1);
                if count > self.config.affinity_threshold {
                    model.affinity.set(a, b, count);
                }
            }
        }
    }
}

/// Mean feature values over accessed profile entries minus the mean over the
/// entries the session never touched. `None` when either side is empty.
pub fn effectiveness_delta(log: &SessionLog) -> Option<FeatureVector> {
    let (used, unused): (Vec<_>, Vec<_>) = log
        .profile
        .entries
        .iter()
        .partition(|e| log.accessed.contains(&e.path));
    if used.is_empty() || unused.is_empty() {
        return None;
    }

    let mean = |entries: &[&ctxpack_core::ProfileEntry], f: Feature| {
        entries.iter().map(|e| e.features.get(f)).sum::<f64>() / entries.len() as f64
    };
    let mut delta = FeatureVector::default();
    for f in Feature::ALL {
        delta.set(f, mean(&used, f) - mean(&unused, f));
    }
    Some(delta)
}

/// Move `weights` along `delta` by at most `rate` per weight.
///
/// Features already pinned at a bound the delta pushes them past sit the step
/// out. The delta is centred over the remaining features and scaled down until
/// no component exceeds 1 in magnitude. Each weight then moves by
/// `rate * delta_i`, clipped to [0, 1] on its own. When clipping leaves one
/// side short, the other side is shortened to match so the weights still sum
/// to 1.
pub fn bounded_step(weights: &FeatureWeights, delta: &FeatureVector, rate: f64) -> FeatureWeights {
    let rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
    let weights = weights.normalized();
    let centred = centre_free(&weights, delta);

    let peak = Feature::ALL
        .iter()
        .map(|f| centred.get(*f).abs())
        .fold(0.0, f64::max);
    if peak < FLAT_DELTA {
        return weights;
    }
    let scale = peak.max(1.0);

    let mut moves = FeatureVector::default();
    let (mut rise, mut fall) = (0.0, 0.0);
    for f in Feature::ALL {
        let w = weights.get(f);
        let moved = (w + rate * centred.get(f) / scale).clamp(0.0, 1.0) - w;
        moves.set(f, moved);
        if moved > 0.0 {
            rise += moved;
        } else {
            fall -= moved;
        }
    }
    let matched = f64::min(rise, fall);
    if matched < FLAT_DELTA {
        return weights;
    }

    let mut next = weights;
    for f in Feature::ALL {
        let moved = moves.get(f);
        let side = if moved > 0.0 { rise } else { fall };
        next.set(f, (weights.get(f) + moved * (matched / side)).clamp(0.0, 1.0));
    }
    next.normalized()
}

/// `delta` centred over the features free to move in its direction; pinned
/// features get 0.
fn centre_free(weights: &FeatureWeights, delta: &FeatureVector) -> FeatureVector {
    let mut free = [true; Feature::ALL.len()];
    let mut centred = FeatureVector::default();
    loop {
        let values: Vec<f64> = Feature::ALL
            .iter()
            .zip(free)
            .filter(|(_, free)| *free)
            .map(|(f, _)| delta.get(*f))
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            return FeatureVector::default();
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        let mut pinned = false;
        for (i, f) in Feature::ALL.into_iter().enumerate() {
            let value = delta.get(f) - mean;
            let value = if free[i] && value.is_finite() { value } else { 0.0 };
            let w = weights.get(f);
            if free[i] && ((w <= 0.0 && value < 0.0) || (w >= 1.0 && value > 0.0)) {
                free[i] = false;
                pinned = true;
            }
            centred.set(f, value);
        }
        if !pinned {
            return centred;
        }
    }
}
