use std::sync::Arc;

use crate::error::EngineError;
use crate::ranking::{RankingAggregator, TieBreak};
use crate::scoring::{aggregate, participation_reward, reward, CompetitionScore, Rank, RewardPolicy};
use crate::store::{CompetitionId, DancerId, RankingStore};

pub const DEFAULT_RANK_PASS_ATTEMPTS: u32 = 3;

/// Engine knobs resolved from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub reward_policy: RewardPolicy,
    pub tie_break: TieBreak,
    pub rank_pass_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reward_policy: RewardPolicy::default(),
            tie_break: TieBreak::default(),
            rank_pass_attempts: DEFAULT_RANK_PASS_ATTEMPTS,
        }
    }
}

/// Reward a dancer should hold for one competition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardLine {
    pub dancer_id: DancerId,
    pub rank: Option<Rank>, // None = competed without placing
    pub points: u32,
}

/// Audit record of one reward write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardRevision {
    pub dancer_id: DancerId,
    pub rank: Option<Rank>,
    pub previous: Option<u32>,
    pub awarded: u32,
}

impl RewardRevision {
    pub fn changed(&self) -> bool {
        self.previous != Some(self.awarded)
    }
}

/// Outcome of finalizing a competition.
#[derive(Debug, Clone)]
pub struct FinalizeReport {
    pub competition_id: CompetitionId,
    pub score: CompetitionScore,
    pub revisions: Vec<RewardRevision>,
    pub totals: Vec<(DancerId, u64)>,
    pub ranks: Vec<(DancerId, u32)>,
}

/// Runs the scoring pipeline against a store: score a competition, pay out
/// placements, then refresh dancer totals and the global ranking.
pub struct RankingEngine<S> {
    store: Arc<S>,
    settings: EngineSettings,
    aggregator: RankingAggregator<S>,
}

impl<S> RankingEngine<S>
where
    S: RankingStore + 'static,
{
    pub fn new(store: Arc<S>, settings: EngineSettings) -> Self {
        let aggregator =
            RankingAggregator::new(store.clone(), settings.tie_break, settings.rank_pass_attempts);
        Self {
            store,
            settings,
            aggregator,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Score a stored competition from its current metrics.
    pub fn score_competition(&self, competition_id: &CompetitionId) -> Result<CompetitionScore, EngineError> {
        let metrics = self.store.competition_metrics(competition_id)?;
        aggregate(&metrics).map_err(|source| EngineError::InvalidCompetition {
            competition_id: competition_id.clone(),
            source,
        })
    }

    /// Rewards every counted entrant should hold under the active policy.
    /// Nothing is written.
    pub fn compute_rewards(
        &self,
        competition_id: &CompetitionId,
    ) -> Result<(CompetitionScore, Vec<RewardLine>), EngineError> {
        let score = self.score_competition(competition_id)?;
        let policy = self.settings.reward_policy;

        let mut lines: Vec<RewardLine> = self
            .store
            .placements(competition_id)?
            .into_iter()
            .map(|placement| RewardLine {
                points: reward(policy, score.total_steps, placement.rank),
                dancer_id: placement.dancer_id,
                rank: Some(placement.rank),
            })
            .collect();

        let participation = participation_reward(policy, score.total_steps);
        lines.extend(
            self.store
                .unranked_entrants(competition_id)?
                .into_iter()
                .map(|dancer_id| RewardLine {
                    dancer_id,
                    rank: None,
                    points: participation,
                }),
        );

        Ok((score, lines))
    }

    /// Write rewards for entrants that have none yet.
    ///
    /// Rewards already issued are left alone even if the competition's score
    /// has changed since; use [`reissue_rewards`](Self::reissue_rewards) for that.
    pub fn issue_rewards(&self, competition_id: &CompetitionId) -> Result<Vec<RewardRevision>, EngineError> {
        Ok(self.issue(competition_id, false)?.revisions)
    }

    /// Recompute and overwrite every reward of a competition.
    ///
    /// Each returned revision carries the value it replaced.
    pub fn reissue_rewards(&self, competition_id: &CompetitionId) -> Result<Vec<RewardRevision>, EngineError> {
        Ok(self.issue(competition_id, true)?.revisions)
    }

    fn issue(&self, competition_id: &CompetitionId, overwrite: bool) -> Result<Issued, EngineError> {
        let (score, lines) = self.compute_rewards(competition_id)?;
        let mut dancers = Vec::with_capacity(lines.len());
        let mut revisions = Vec::new();

        for line in lines {
            dancers.push(line.dancer_id.clone());
            if !overwrite {
                if let Some(existing) = self.store.issued_reward(competition_id, &line.dancer_id)? {
                    tracing::debug!(
                        competition = %competition_id,
                        dancer = %line.dancer_id,
                        existing,
                        "reward already issued, skipping"
                    );
                    continue;
                }
            }
            revisions.push(self.write_reward(competition_id, line)?);
        }

        tracing::info!(
            competition = %competition_id,
            total_steps = score.total_steps,
            grade = %score.grade,
            policy = self.settings.reward_policy.name(),
            written = revisions.len(),
            changed = revisions.iter().filter(|r| r.changed()).count(),
            reissue = overwrite,
            "rewards written"
        );

        Ok(Issued {
            score,
            dancers,
            revisions,
        })
    }

    fn write_reward(
        &self,
        competition_id: &CompetitionId,
        line: RewardLine,
    ) -> Result<RewardRevision, EngineError> {
        let previous = self
            .store
            .save_reward(competition_id, &line.dancer_id, line.points)?;

        if let Some(old) = previous.filter(|old| *old != line.points) {
            tracing::info!(
                competition = %competition_id,
                dancer = %line.dancer_id,
                previous = old,
                awarded = line.points,
                "reward replaced"
            );
        }

        Ok(RewardRevision {
            dancer_id: line.dancer_id,
            rank: line.rank,
            previous,
            awarded: line.points,
        })
    }

    pub fn recompute_dancer(&self, dancer_id: &DancerId) -> Result<u64, EngineError> {
        self.aggregator.recompute_dancer(dancer_id)
    }

    pub fn recompute_all_ranks(&self) -> Result<Vec<(DancerId, u32)>, EngineError> {
        self.aggregator.recompute_all_ranks()
    }

    /// Issue pending rewards, refresh the affected dancers' totals and re-rank.
    pub fn finalize_competition(&self, competition_id: &CompetitionId) -> Result<FinalizeReport, EngineError> {
        let issued = self.issue(competition_id, false)?;
        self.refresh(competition_id, issued)
    }

    /// Like [`finalize_competition`](Self::finalize_competition), but every
    /// reward is recomputed from the current score first.
    pub fn refinalize_competition(&self, competition_id: &CompetitionId) -> Result<FinalizeReport, EngineError> {
        let issued = self.issue(competition_id, true)?;
        self.refresh(competition_id, issued)
    }

    fn refresh(&self, competition_id: &CompetitionId, issued: Issued) -> Result<FinalizeReport, EngineError> {
        let totals = issued
            .dancers
            .iter()
            .map(|dancer_id| {
                self.recompute_dancer(dancer_id)
                    .map(|total| (dancer_id.clone(), total))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ranks = self.recompute_all_ranks()?;

        Ok(FinalizeReport {
            competition_id: competition_id.clone(),
            score: issued.score,
            revisions: issued.revisions,
            totals,
            ranks,
        })
    }
}

struct Issued {
    score: CompetitionScore,
    dancers: Vec<DancerId>,
    revisions: Vec<RewardRevision>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{CompetitionMetrics, Grade};
    use crate::store::{EntryStatus, MemoryStore, StoreError};
    use chrono::{Duration, Utc};

    fn metrics(participants: i64) -> CompetitionMetrics {
        CompetitionMetrics {
            prize_amount: 1_000_000.0,
            judge_count: 3,
            participant_count: participants,
            edition_number: 2,
        }
    }

    fn rank(n: i64) -> Option<Rank> {
        Some(Rank::new(n).unwrap())
    }

    /// One 45-step competition with four placed dancers, one unranked
    /// entrant and one dancer who only registered.
    fn engine_with(policy: RewardPolicy) -> RankingEngine<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store
            .update(|doc| {
                for (i, id) in ["ana", "ben", "cai", "dee", "eli", "fay"].iter().enumerate() {
                    doc.register_dancer((*id).into(), None, now - Duration::days(10 - i as i64));
                }
                doc.set_competition("spring-open".into(), Some("Spring Open".to_string()), metrics(120));
                doc.record_entry("spring-open".into(), "ana".into(), rank(1), EntryStatus::Competed)?;
                doc.record_entry("spring-open".into(), "ben".into(), rank(2), EntryStatus::Competed)?;
                doc.record_entry("spring-open".into(), "cai".into(), rank(3), EntryStatus::Competed)?;
                doc.record_entry("spring-open".into(), "dee".into(), rank(4), EntryStatus::Competed)?;
                doc.record_entry("spring-open".into(), "eli".into(), None, EntryStatus::Competed)?;
                doc.record_entry("spring-open".into(), "fay".into(), None, EntryStatus::Registered)
            })
            .unwrap();

        RankingEngine::new(
            store,
            EngineSettings {
                reward_policy: policy,
                ..EngineSettings::default()
            },
        )
    }

    fn points_for(revisions: &[RewardRevision], id: &str) -> Option<u32> {
        revisions
            .iter()
            .find(|r| r.dancer_id.0 == id)
            .map(|r| r.awarded)
    }

    #[test]
    fn test_score_competition() {
        let engine = engine_with(RewardPolicy::TopThree);
        let score = engine.score_competition(&"spring-open".into()).unwrap();
        assert_eq!(score.total_steps, 45);
        assert_eq!(score.grade, Grade::C);
    }

    #[test]
    fn test_issue_rewards_top_three() {
        let engine = engine_with(RewardPolicy::TopThree);
        let revisions = engine.issue_rewards(&"spring-open".into()).unwrap();

        assert_eq!(points_for(&revisions, "ana"), Some(45));
        assert_eq!(points_for(&revisions, "ben"), Some(32));
        assert_eq!(points_for(&revisions, "cai"), Some(23));
        assert_eq!(points_for(&revisions, "dee"), Some(0));
        assert_eq!(points_for(&revisions, "eli"), Some(0));
        // Registered-only dancers earn nothing and get no reward row
        assert_eq!(points_for(&revisions, "fay"), None);
        assert!(revisions.iter().all(|r| r.previous.is_none()));
    }

    #[test]
    fn test_issue_rewards_extended() {
        let engine = engine_with(RewardPolicy::Extended);
        let revisions = engine.issue_rewards(&"spring-open".into()).unwrap();

        assert_eq!(points_for(&revisions, "dee"), Some(14));
        assert_eq!(points_for(&revisions, "eli"), Some(5));
    }

    #[test]
    fn test_issue_rewards_is_idempotent() {
        let engine = engine_with(RewardPolicy::TopThree);
        engine.issue_rewards(&"spring-open".into()).unwrap();
        let second = engine.issue_rewards(&"spring-open".into()).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_metric_change_does_not_touch_issued_rewards() {
        let engine = engine_with(RewardPolicy::TopThree);
        engine.issue_rewards(&"spring-open".into()).unwrap();

        // Final participant count came in higher: 45 -> 50 steps
        engine
            .store()
            .update(|doc| {
                doc.set_competition("spring-open".into(), None, metrics(400));
                Ok(())
            })
            .unwrap();
        assert_eq!(engine.score_competition(&"spring-open".into()).unwrap().total_steps, 50);

        engine.issue_rewards(&"spring-open".into()).unwrap();
        assert_eq!(
            engine.store().issued_reward(&"spring-open".into(), &"ana".into()).unwrap(),
            Some(45)
        );

        let revisions = engine.reissue_rewards(&"spring-open".into()).unwrap();
        let ana = revisions.iter().find(|r| r.dancer_id.0 == "ana").unwrap();
        assert_eq!(ana.previous, Some(45));
        assert_eq!(ana.awarded, 50);
        assert!(ana.changed());

        let ben = revisions.iter().find(|r| r.dancer_id.0 == "ben").unwrap();
        assert_eq!((ben.previous, ben.awarded), (Some(32), 35));
        let dee = revisions.iter().find(|r| r.dancer_id.0 == "dee").unwrap();
        assert!(!dee.changed());
    }

    #[test]
    fn test_finalize_ranks_population() {
        let engine = engine_with(RewardPolicy::TopThree);
        let report = engine.finalize_competition(&"spring-open".into()).unwrap();

        assert_eq!(report.score.total_steps, 45);
        assert_eq!(report.revisions.len(), 5);
        assert_eq!(report.ranks.len(), 6);

        let doc = engine.store().snapshot().unwrap();
        let rank_of = |id: &str| doc.dancers[&DancerId::from(id)].rank.unwrap();
        assert_eq!(rank_of("ana"), 1);
        assert_eq!(rank_of("ben"), 2);
        assert_eq!(rank_of("cai"), 3);
        // dee, eli and fay all hold 0; earlier registration ranks better
        assert_eq!(rank_of("dee"), 4);
        assert_eq!(rank_of("eli"), 5);
        assert_eq!(rank_of("fay"), 6);
    }

    #[test]
    fn test_totals_accumulate_across_competitions() {
        let engine = engine_with(RewardPolicy::TopThree);
        engine.finalize_competition(&"spring-open".into()).unwrap();

        engine
            .store()
            .update(|doc| {
                doc.set_competition("summer-jam".into(), None, metrics(120));
                doc.record_entry("summer-jam".into(), "ana".into(), rank(3), EntryStatus::Competed)?;
                doc.set_competition("autumn-cup".into(), None, metrics(120));
                doc.record_entry("autumn-cup".into(), "ana".into(), rank(4), EntryStatus::Competed)
            })
            .unwrap();
        engine.finalize_competition(&"summer-jam".into()).unwrap();
        let report = engine.finalize_competition(&"autumn-cup".into()).unwrap();

        // 45 + 23 + 0
        assert_eq!(report.totals, vec![(DancerId::from("ana"), 68)]);
    }

    #[test]
    fn test_invalid_competition_metrics() {
        let engine = engine_with(RewardPolicy::TopThree);
        engine
            .store()
            .update(|doc| {
                doc.set_competition(
                    "broken".into(),
                    None,
                    CompetitionMetrics {
                        edition_number: 0,
                        ..metrics(10)
                    },
                );
                Ok(())
            })
            .unwrap();

        let err = engine.issue_rewards(&"broken".into()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCompetition { .. }));
    }

    #[test]
    fn test_unknown_competition() {
        let engine = engine_with(RewardPolicy::TopThree);
        let err = engine.finalize_competition(&"nope".into()).unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::CompetitionNotFound(_))));
    }
}
