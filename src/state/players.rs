use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::debug;

use crate::state::{
    game::{Choice, Player, PlayerId, QuestionId},
    quiz::QuizError,
};

/// Bounds applied to the player registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Hard cap on registered players.
    pub max_players: usize,
    /// Players unseen for longer than this, and holding no answer in the
    /// current game, may be purged.
    pub idle_ttl: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_players: 10_000,
            idle_ttl: Duration::from_secs(2 * 60 * 60),
        }
    }
}

/// Players keyed by id, kept in join order for leaderboard tie-breaks.
#[derive(Debug)]
pub struct PlayerRegistry {
    players: IndexMap<PlayerId, Player>,
    policy: RetentionPolicy,
}

impl PlayerRegistry {
    /// Empty registry bounded by `policy`.
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            players: IndexMap::new(),
            policy,
        }
    }

    /// Look a player up.
    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    /// Number of registered players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether nobody registered yet.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Iterate players in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Whether `register(id)` would succeed.
    pub fn has_room_for(&self, id: &PlayerId) -> bool {
        self.contains(id) || self.players.len() < self.policy.max_players
    }

    /// Fetch or create the player, refreshing its last-seen instant.
    ///
    /// Fails with [`QuizError::Unavailable`] without touching the registry
    /// when a new player would exceed the capacity.
    pub fn register(&mut self, id: PlayerId, now: Instant) -> Result<&mut Player, QuizError> {
        if !self.has_room_for(&id) {
            return Err(QuizError::Unavailable(format!(
                "player registry is full ({} players)",
                self.policy.max_players
            )));
        }

        let player = self
            .players
            .entry(id)
            .or_insert_with_key(|id| Player::new(id.clone(), now));
        player.last_seen = now;
        Ok(player)
    }

    /// Reset score and history of every known player.
    pub fn reset_all(&mut self) {
        self.players.values_mut().for_each(Player::reset);
    }

    /// Give one point to every player whose recorded answer for
    /// `question_id` is `correct`. Returns how many players scored.
    pub fn award_correct(&mut self, question_id: QuestionId, correct: Choice) -> usize {
        let mut awarded = 0;
        for player in self.players.values_mut() {
            if player.answer_for(question_id) == Some(correct) {
                player.score += 1;
                awarded += 1;
            }
        }
        awarded
    }

    /// Number of players holding an answer for `question_id`.
    pub fn answered_count(&self, question_id: QuestionId) -> usize {
        self.players
            .values()
            .filter(|player| player.answered.contains_key(&question_id))
            .count()
    }

    /// Number of players [`purge_idle`](Self::purge_idle) would drop at `now`.
    pub fn idle_count(&self, now: Instant) -> usize {
        let ttl = self.policy.idle_ttl;
        self.players
            .values()
            .filter(|player| is_purgeable(player, now, ttl))
            .count()
    }

    /// Drop idle players that hold no answer in the current game.
    pub fn purge_idle(&mut self, now: Instant) -> usize {
        let ttl = self.policy.idle_ttl;
        let before = self.players.len();
        self.players
            .retain(|_, player| !is_purgeable(player, now, ttl));
        let purged = before - self.players.len();
        if purged > 0 {
            debug!(purged, remaining = self.players.len(), "purged idle players");
        }
        purged
    }

    /// Players ranked by score, highest first; ties keep join order.
    pub fn ranked(&self) -> Vec<&Player> {
        let mut ranked: Vec<&Player> = self.players.values().collect();
        ranked.sort_by(|left, right| right.score.cmp(&left.score));
        ranked
    }
}

fn is_purgeable(player: &Player, now: Instant, ttl: Duration) -> bool {
    player.answered.is_empty() && now.saturating_duration_since(player.last_seen) > ttl
}
