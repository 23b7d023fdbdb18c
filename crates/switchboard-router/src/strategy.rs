//! Selection strategies.
//!
//! Every strategy sees the same input: the current candidate set (already
//! filtered for availability by the router) in registration order. Ties are
//! broken in favour of the earlier candidate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use switchboard_core::config::StrategyKind;
use switchboard_core::types::{GenerationRequest, ProviderId};
use switchboard_providers::Provider;
use tracing::{debug, trace};

use crate::metrics::ProviderMetrics;

// Quality-optimized score weights
const Q_QUALITY: f64 = 0.7;
const Q_SUCCESS: f64 = 0.3;

// Balanced score weights
const W_SUCCESS: f64 = 0.3;
const W_QUALITY: f64 = 0.25;
const W_COST: f64 = 0.25;
const W_TIME: f64 = 0.2;

// Used when a non-finite split is supplied
const FALLBACK_AB_SPLIT: f64 = 0.5;

/// One selectable provider as seen by a strategy.
#[derive(Clone, Copy)]
pub struct Candidate<'a> {
    pub id: ProviderId,
    pub provider: &'a dyn Provider,
    pub metrics: &'a ProviderMetrics,
}

/// The active strategy plus the state the stateful ones carry.
///
/// Round-robin position and A/B groups survive a strategy switch, so going
/// back to a strategy resumes where it left off.
pub struct Strategy {
    kind: StrategyKind,
    round_robin: usize,
    group_a: Vec<ProviderId>,
    group_b: Vec<ProviderId>,
    ab_split: f64,
    rng: StdRng,
}

impl Strategy {
    pub fn new(kind: StrategyKind, ab_split: f64) -> Self {
        Self::with_rng(kind, ab_split, StdRng::from_entropy())
    }

    /// Deterministic randomness for A/B and weighted selection.
    pub fn with_seed(kind: StrategyKind, ab_split: f64, seed: u64) -> Self {
        Self::with_rng(kind, ab_split, StdRng::seed_from_u64(seed))
    }

    fn with_rng(kind: StrategyKind, ab_split: f64, rng: StdRng) -> Self {
        Self {
            kind,
            round_robin: 0,
            group_a: Vec::new(),
            group_b: Vec::new(),
            ab_split: if ab_split.is_finite() {
                ab_split.clamp(0.0, 1.0)
            } else {
                FALLBACK_AB_SPLIT
            },
            rng,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: StrategyKind) {
        self.kind = kind;
    }

    /// Replace the A/B groups.
    pub fn set_groups(&mut self, group_a: Vec<ProviderId>, group_b: Vec<ProviderId>) {
        self.group_a = group_a;
        self.group_b = group_b;
    }

    pub fn groups(&self) -> (&[ProviderId], &[ProviderId]) {
        (&self.group_a, &self.group_b)
    }

    /// Pick one candidate. `None` only when `candidates` is empty.
    pub fn select(
        &mut self,
        candidates: &[Candidate<'_>],
        request: &GenerationRequest,
    ) -> Option<ProviderId> {
        let first = candidates.first()?;
        if candidates.len() == 1 {
            return Some(first.id);
        }

        let picked = match self.kind {
            StrategyKind::Priority => select_priority(candidates),
            StrategyKind::CostOptimized => select_cost_optimized(candidates, request),
            StrategyKind::QualityOptimized => select_quality(candidates),
            StrategyKind::Balanced => select_balanced(candidates),
            StrategyKind::RoundRobin => self.select_round_robin(candidates),
            StrategyKind::AbTest => self.select_ab_test(candidates),
            StrategyKind::Weighted => self.select_weighted(candidates),
        };

        trace!(strategy = %self.kind, provider = %picked, candidates = candidates.len(), "selected");
        Some(picked)
    }

    fn select_round_robin(&mut self, candidates: &[Candidate<'_>]) -> ProviderId {
        let idx = self.round_robin % candidates.len();
        self.round_robin = self.round_robin.wrapping_add(1);
        candidates[idx].id
    }

    fn select_ab_test(&mut self, candidates: &[Candidate<'_>]) -> ProviderId {
        if self.group_a.is_empty() && self.group_b.is_empty() {
            self.group_a = vec![candidates[0].id];
            self.group_b = vec![candidates[1].id];
            debug!(a = %candidates[0].id, b = %candidates[1].id, "A/B groups initialized");
        }

        let use_a = self.rng.gen::<f64>() < self.ab_split;
        let group = if use_a { &self.group_a } else { &self.group_b };

        let eligible: Vec<ProviderId> = candidates
            .iter()
            .map(|c| c.id)
            .filter(|id| group.contains(id))
            .collect();

        if eligible.is_empty() {
            return candidates[0].id;
        }
        eligible[self.rng.gen_range(0..eligible.len())]
    }

    fn select_weighted(&mut self, candidates: &[Candidate<'_>]) -> ProviderId {
        let total: f64 = candidates.iter().map(|c| c.metrics.weight.max(0.0)).sum();
        if total <= 0.0 {
            return candidates[0].id;
        }

        let mut point = self.rng.gen::<f64>() * total;
        for c in candidates {
            let w = c.metrics.weight.max(0.0);
            if point < w {
                return c.id;
            }
            point -= w;
        }
        // Float rounding can leave `point` a hair above the last bucket.
        candidates
            .iter()
            .rev()
            .find(|c| c.metrics.weight > 0.0)
            .map_or(candidates[0].id, |c| c.id)
    }
}

// ─────────────────────────────────────────────
// Stateless strategies
// ─────────────────────────────────────────────

/// Lowest `priority` wins.
fn select_priority(candidates: &[Candidate<'_>]) -> ProviderId {
    argmin(candidates, |c| c.metrics.priority as f64)
}

/// Cheapest estimate wins; history stands in when a provider can't estimate.
fn select_cost_optimized(candidates: &[Candidate<'_>], request: &GenerationRequest) -> ProviderId {
    argmin(candidates, |c| match c.provider.estimate_cost(request) {
        Ok(cost) => cost,
        Err(e) => {
            debug!(provider = %c.id, error = %e, "cost estimate failed, using history");
            c.metrics.avg_cost_per_token()
        }
    })
}

/// Highest blend of configured quality and observed success rate wins.
fn select_quality(candidates: &[Candidate<'_>]) -> ProviderId {
    argmax(candidates, |c| {
        Q_QUALITY * c.metrics.quality_score + Q_SUCCESS * c.metrics.success_rate()
    })
}

/// Weighted blend of success rate, quality, cost and latency.
fn select_balanced(candidates: &[Candidate<'_>]) -> ProviderId {
    let max_cost = candidates
        .iter()
        .map(|c| c.metrics.avg_cost_per_token())
        .fold(0.0_f64, f64::max);
    let max_time = candidates
        .iter()
        .map(|c| c.metrics.avg_response_time)
        .filter(|t| *t > 0.0)
        .fold(0.0_f64, f64::max);

    argmax(candidates, |c| balanced_score(c.metrics, max_cost, max_time))
}

fn balanced_score(m: &ProviderMetrics, max_cost: f64, max_time: f64) -> f64 {
    let cost_score = if max_cost > 0.0 {
        1.0 - m.avg_cost_per_token() / max_cost
    } else {
        1.0
    };
    let time_score = if max_time > 0.0 && m.avg_response_time > 0.0 {
        1.0 - m.avg_response_time / max_time
    } else {
        1.0
    };

    W_SUCCESS * m.success_rate()
        + W_QUALITY * m.quality_score
        + W_COST * cost_score
        + W_TIME * time_score
}

fn argmin(candidates: &[Candidate<'_>], key: impl Fn(&Candidate<'_>) -> f64) -> ProviderId {
    let mut best = &candidates[0];
    let mut best_key = key(best);
    for c in &candidates[1..] {
        let k = key(c);
        if k < best_key {
            best = c;
            best_key = k;
        }
    }
    best.id
}

fn argmax(candidates: &[Candidate<'_>], key: impl Fn(&Candidate<'_>) -> f64) -> ProviderId {
    argmin(candidates, |c| -key(c))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use switchboard_providers::MockProvider;

    struct Fixture {
        providers: Vec<MockProvider>,
        metrics: Vec<ProviderMetrics>,
    }

    impl Fixture {
        fn new(ids: &[ProviderId]) -> Self {
            Self {
                providers: ids.iter().map(|id| MockProvider::new(*id)).collect(),
                metrics: ids.iter().map(|id| ProviderMetrics::new(*id)).collect(),
            }
        }

        fn with_providers(providers: Vec<MockProvider>) -> Self {
            let metrics = providers.iter().map(|p| ProviderMetrics::new(p.id())).collect();
            Self { providers, metrics }
        }

        fn candidates(&self) -> Vec<Candidate<'_>> {
            self.providers
                .iter()
                .zip(&self.metrics)
                .map(|(p, m)| Candidate {
                    id: p.id(),
                    provider: p,
                    metrics: m,
                })
                .collect()
        }
    }

    fn req() -> GenerationRequest {
        GenerationRequest::new("hello")
    }

    fn pick(kind: StrategyKind, fx: &Fixture) -> ProviderId {
        Strategy::with_seed(kind, 0.5, 7)
            .select(&fx.candidates(), &req())
            .unwrap()
    }

    #[test]
    fn test_empty_candidates() {
        let fx = Fixture::new(&[]);
        for kind in StrategyKind::ALL {
            assert!(Strategy::new(kind, 0.5).select(&fx.candidates(), &req()).is_none());
        }
    }

    #[test]
    fn test_single_candidate_always_chosen() {
        let fx = Fixture::new(&[ProviderId::Groq]);
        for kind in StrategyKind::ALL {
            assert_eq!(pick(kind, &fx), ProviderId::Groq);
        }
    }

    #[test]
    fn test_priority_lowest_wins() {
        let mut fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Anthropic, ProviderId::Groq]);
        fx.metrics[0].priority = 3;
        fx.metrics[1].priority = 1;
        fx.metrics[2].priority = 2;
        assert_eq!(pick(StrategyKind::Priority, &fx), ProviderId::Anthropic);
    }

    #[test]
    fn test_priority_tie_goes_to_first_registered() {
        let fx = Fixture::new(&[ProviderId::Mistral, ProviderId::OpenAi]);
        assert_eq!(pick(StrategyKind::Priority, &fx), ProviderId::Mistral);
    }

    #[test]
    fn test_cost_optimized_uses_estimates() {
        let fx = Fixture::with_providers(vec![
            MockProvider::new(ProviderId::OpenAi).with_cost(0.01),
            MockProvider::new(ProviderId::Anthropic).with_cost(0.001),
        ]);
        assert_eq!(pick(StrategyKind::CostOptimized, &fx), ProviderId::Anthropic);
    }

    #[test]
    fn test_cost_optimized_tie_goes_to_first_registered() {
        let fx = Fixture::with_providers(vec![
            MockProvider::new(ProviderId::DeepSeek).with_cost(0.002),
            MockProvider::new(ProviderId::Anthropic).with_cost(0.002),
        ]);
        assert_eq!(pick(StrategyKind::CostOptimized, &fx), ProviderId::DeepSeek);
    }

    #[test]
    fn test_cost_optimized_falls_back_to_history() {
        let mut fx = Fixture::with_providers(vec![
            MockProvider::new(ProviderId::OpenAi).with_cost(0.01),
            MockProvider::new(ProviderId::OpenRouter).without_pricing(),
        ]);
        // No history: the unpriced provider scores 0.0 and wins
        assert_eq!(pick(StrategyKind::CostOptimized, &fx), ProviderId::OpenRouter);

        fx.metrics[1].total_cost = 1.0;
        fx.metrics[1].total_tokens = 10;
        assert_eq!(pick(StrategyKind::CostOptimized, &fx), ProviderId::OpenAi);
    }

    #[test]
    fn test_quality_combines_score_and_success_rate() {
        let mut fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Anthropic]);
        fx.metrics[0].quality_score = 0.9;
        fx.metrics[0].total_requests = 10;
        fx.metrics[0].successful_requests = 2;
        fx.metrics[0].failed_requests = 8;
        fx.metrics[1].quality_score = 0.7;
        // 0.7 * 0.9 + 0.3 * 0.2 = 0.69 < 0.7 * 0.7 + 0.3 * 1.0 = 0.79
        assert_eq!(pick(StrategyKind::QualityOptimized, &fx), ProviderId::Anthropic);
    }

    #[test]
    fn test_quality_tie_goes_to_first_registered() {
        let mut fx = Fixture::new(&[ProviderId::Groq, ProviderId::Mistral]);
        fx.metrics[0].quality_score = 0.6;
        fx.metrics[1].quality_score = 0.6;
        assert_eq!(pick(StrategyKind::QualityOptimized, &fx), ProviderId::Groq);
    }

    #[test]
    fn test_balanced_dominant_provider_wins() {
        let mut fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Ollama]);
        // Worse on every axis
        fx.metrics[0].quality_score = 0.5;
        fx.metrics[0].total_requests = 4;
        fx.metrics[0].successful_requests = 2;
        fx.metrics[0].failed_requests = 2;
        fx.metrics[0].total_cost = 0.5;
        fx.metrics[0].total_tokens = 100;
        fx.metrics[0].avg_response_time = 2.0;
        // Perfect: success 1, quality 1, free, no recorded latency
        fx.metrics[1].quality_score = 1.0;
        assert_eq!(fx.metrics[1].success_rate(), 1.0);
        assert_eq!(fx.metrics[1].avg_cost_per_token(), 0.0);
        assert_eq!(fx.metrics[1].avg_response_time, 0.0);

        assert_eq!(pick(StrategyKind::Balanced, &fx), ProviderId::Ollama);
        let score = balanced_score(&fx.metrics[1], 0.005, 2.0);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_balanced_prefers_free_fast_reliable() {
        let mut fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Ollama]);
        fx.metrics[0].total_cost = 0.5;
        fx.metrics[0].total_tokens = 100;
        fx.metrics[0].avg_response_time = 2.0;
        fx.metrics[1].avg_response_time = 1.0;
        assert_eq!(pick(StrategyKind::Balanced, &fx), ProviderId::Ollama);
    }

    #[test]
    fn test_balanced_without_history_is_a_tie() {
        let fx = Fixture::new(&[ProviderId::Gemini, ProviderId::Groq]);
        assert_eq!(pick(StrategyKind::Balanced, &fx), ProviderId::Gemini);
    }

    #[test]
    fn test_balanced_score_guards() {
        let m = ProviderMetrics::new(ProviderId::Groq);
        // All guards kick in: 0.3 + 0.25 * 0.8 + 0.25 + 0.2
        let score = balanced_score(&m, 0.0, 0.0);
        assert!((score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_round_robin_cycles_in_order() {
        let fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Anthropic, ProviderId::Groq]);
        let mut strategy = Strategy::new(StrategyKind::RoundRobin, 0.5);
        let picks: Vec<ProviderId> = (0..6)
            .map(|_| strategy.select(&fx.candidates(), &req()).unwrap())
            .collect();
        assert_eq!(
            picks,
            vec![
                ProviderId::OpenAi,
                ProviderId::Anthropic,
                ProviderId::Groq,
                ProviderId::OpenAi,
                ProviderId::Anthropic,
                ProviderId::Groq,
            ]
        );
    }

    #[test]
    fn test_ab_test_lazy_groups() {
        let fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Anthropic, ProviderId::Groq]);
        let mut strategy = Strategy::with_seed(StrategyKind::AbTest, 0.5, 1);
        let picked = strategy.select(&fx.candidates(), &req()).unwrap();

        let (a, b) = strategy.groups();
        assert_eq!(a, &[ProviderId::OpenAi]);
        assert_eq!(b, &[ProviderId::Anthropic]);
        assert_ne!(picked, ProviderId::Groq);
    }

    #[test]
    fn test_ab_test_split_extremes() {
        let fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Anthropic]);

        let mut all_a = Strategy::with_seed(StrategyKind::AbTest, 1.0, 3);
        let mut all_b = Strategy::with_seed(StrategyKind::AbTest, 0.0, 3);
        for _ in 0..20 {
            assert_eq!(all_a.select(&fx.candidates(), &req()), Some(ProviderId::OpenAi));
            assert_eq!(all_b.select(&fx.candidates(), &req()), Some(ProviderId::Anthropic));
        }
    }

    #[test]
    fn test_ab_test_non_finite_split_falls_back() {
        let fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Anthropic]);
        let mut strategy = Strategy::with_seed(StrategyKind::AbTest, f64::NAN, 11);
        let picks: Vec<_> = (0..200)
            .filter_map(|_| strategy.select(&fx.candidates(), &req()))
            .collect();
        assert!(picks.contains(&ProviderId::OpenAi));
        assert!(picks.contains(&ProviderId::Anthropic));
    }

    #[test]
    fn test_ab_test_split_is_roughly_honoured() {
        let fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Anthropic]);
        let mut strategy = Strategy::with_seed(StrategyKind::AbTest, 0.5, 42);
        let a_hits = (0..1000)
            .filter(|_| strategy.select(&fx.candidates(), &req()) == Some(ProviderId::OpenAi))
            .count();
        assert!((400..=600).contains(&a_hits), "a_hits = {a_hits}");
    }

    #[test]
    fn test_ab_test_falls_back_when_group_unavailable() {
        let fx = Fixture::new(&[ProviderId::Gemini, ProviderId::Groq]);
        let mut strategy = Strategy::with_seed(StrategyKind::AbTest, 1.0, 9);
        strategy.set_groups(vec![ProviderId::OpenAi], vec![ProviderId::Anthropic]);
        assert_eq!(strategy.select(&fx.candidates(), &req()), Some(ProviderId::Gemini));
    }

    #[test]
    fn test_weighted_respects_weights() {
        let mut fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Anthropic, ProviderId::Groq]);
        fx.metrics[0].weight = 0.0;
        fx.metrics[1].weight = 3.0;
        fx.metrics[2].weight = 1.0;

        let mut strategy = Strategy::with_seed(StrategyKind::Weighted, 0.5, 11);
        let mut hits: HashMap<ProviderId, usize> = HashMap::new();
        for _ in 0..1000 {
            let id = strategy.select(&fx.candidates(), &req()).unwrap();
            *hits.entry(id).or_default() += 1;
        }

        assert_eq!(hits.get(&ProviderId::OpenAi), None);
        let anthropic = hits[&ProviderId::Anthropic];
        assert!((650..=850).contains(&anthropic), "anthropic = {anthropic}");
    }

    #[test]
    fn test_weighted_all_zero_falls_back_to_first() {
        let mut fx = Fixture::new(&[ProviderId::Mistral, ProviderId::Groq]);
        fx.metrics[0].weight = 0.0;
        fx.metrics[1].weight = 0.0;
        assert_eq!(pick(StrategyKind::Weighted, &fx), ProviderId::Mistral);
    }

    #[test]
    fn test_set_kind_keeps_round_robin_position() {
        let fx = Fixture::new(&[ProviderId::OpenAi, ProviderId::Anthropic]);
        let mut strategy = Strategy::new(StrategyKind::RoundRobin, 0.5);
        strategy.select(&fx.candidates(), &req());

        strategy.set_kind(StrategyKind::Priority);
        assert_eq!(strategy.kind(), StrategyKind::Priority);
        strategy.set_kind(StrategyKind::RoundRobin);
        assert_eq!(strategy.select(&fx.candidates(), &req()), Some(ProviderId::Anthropic));
    }
}
