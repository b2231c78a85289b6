use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::{DashMap, Entry};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    data::{Board, Pos},
    error::SessionError,
    model::{GameInfo, GameParams},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub idle_timeout: Duration,
    // Replaces `idle_timeout` once the game is won or lost.
    pub finished_timeout: Duration,
}

pub struct Session {
    board: Board,
    last_activity: Instant,
}

impl Session {
    fn new(board: Board) -> Self {
        Self {
            board,
            last_activity: Instant::now(),
        }
    }

    pub fn is_expired(&self, policy: &RetentionPolicy, now: Instant) -> bool {
        let timeout = if self.board.status().is_terminal() {
            policy.finished_timeout
        } else {
            policy.idle_timeout
        };
        now.saturating_duration_since(self.last_activity) > timeout
    }
}

/// All live sessions, one lock per session. Cloning shares the same map.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn create_session(&self, params: GameParams) -> Result<GameInfo, SessionError> {
        self.create_session_with_rng(params, &mut rand::rng())
    }

    #[instrument(level = "trace", skip(self, rng))]
    pub fn create_session_with_rng<R: Rng + ?Sized>(
        &self,
        params: GameParams,
        rng: &mut R,
    ) -> Result<GameInfo, SessionError> {
        let board = Board::new(params, rng)?;
        let info = self.insert(board);
        info!(
            "Created game {}: {}x{} with {} mines",
            info.game_id, params.width, params.height, params.mine_count
        );
        Ok(info)
    }

    fn insert(&self, board: Board) -> GameInfo {
        loop {
            let id = Uuid::new_v4();
            match self.sessions.entry(id) {
                Entry::Occupied(_) => {
                    debug!("Game ID collision, trying another: {}", id);
                }
                Entry::Vacant(entry) => {
                    let info = GameInfo::from_board(id, &board);
                    entry.insert(Arc::new(Mutex::new(Session::new(board))));
                    return info;
                }
            }
        }
    }

    fn get(&self, id: &Uuid) -> Result<Arc<Mutex<Session>>, SessionError> {
        // Clone the handle so the map shard is released before awaiting the lock.
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::NotFound(*id))
    }

    /// A finished game is returned as is.
    #[instrument(level = "trace", skip(self))]
    pub async fn apply_turn(
        &self,
        id: Uuid,
        row: usize,
        col: usize,
    ) -> Result<GameInfo, SessionError> {
        let session = self.get(&id).inspect_err(|_| {
            warn!("Turn requested for non-existent game: {}", id);
        })?;
        let mut session = session.lock().await;

        if !session.board.status().is_terminal() {
            let outcome = session.board.reveal(Pos::new(row, col))?;
            session.last_activity = Instant::now();
            debug!("Turn ({}, {}) in game {}: {:?}", row, col, id, outcome);
        }

        Ok(GameInfo::from_board(id, &session.board))
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn view(&self, id: Uuid) -> Result<GameInfo, SessionError> {
        let session = self.get(&id)?;
        let session = session.lock().await;
        Ok(GameInfo::from_board(id, &session.board))
    }

    #[instrument(level = "trace", skip(self))]
    pub fn close_session(&self, id: Uuid) -> Result<(), SessionError> {
        match self.sessions.remove(&id) {
            Some(_) => {
                info!("Closed game {}", id);
                Ok(())
            }
            None => Err(SessionError::NotFound(id)),
        }
    }

    /// Drops every session whose retention window has passed at `now`.
    ///
    /// Sessions locked by an in-flight turn are skipped until the next pass.
    pub fn evict_expired(&self, policy: &RetentionPolicy, now: Instant) -> usize {
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_lock()
                    .is_ok_and(|session| session.is_expired(policy, now))
            })
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for id in expired {
            let gone = self.sessions.remove_if(&id, |_, session| {
                session
                    .try_lock()
                    .is_ok_and(|session| session.is_expired(policy, now))
            });
            if gone.is_some() {
                debug!("Cleaned up game: {}", id);
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Cleaned up {} expired games", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{data::GameStatus, logic::testing::ZeroRng};

    const POLICY: RetentionPolicy = RetentionPolicy {
        idle_timeout: Duration::from_secs(600),
        finished_timeout: Duration::from_secs(60),
    };

    fn forced_game(registry: &SessionRegistry) -> Uuid {
        // Mine at (0, 0).
        registry
            .create_session_with_rng(GameParams::new(2, 2, 1), &mut ZeroRng)
            .unwrap()
            .game_id
    }

    #[test]
    fn create_stores_session_and_renders_blank_field() {
        let registry = SessionRegistry::new();
        let mut rng = StdRng::seed_from_u64(3);

        let info = registry
            .create_session_with_rng(GameParams::new(4, 3, 5), &mut rng)
            .unwrap();

        assert!(registry.contains(&info.game_id));
        assert_eq!(info.status, GameStatus::InProgress);
        assert!(!info.completed);
        assert_eq!(info.field, vec![vec![" ".to_string(); 4]; 3]);
    }

    #[test]
    fn invalid_params_create_nothing() {
        let registry = SessionRegistry::new();

        let result = registry.create_session(GameParams::new(2, 2, 4));

        assert!(matches!(result, Err(SessionError::Validation(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let registry = SessionRegistry::new();
        let a = registry.create_session(GameParams::new(5, 5, 3)).unwrap();
        let b = registry.create_session(GameParams::new(5, 5, 3)).unwrap();

        assert_ne!(a.game_id, b.game_id);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn turn_on_unknown_game_is_not_found() {
        let registry = SessionRegistry::new();
        forced_game(&registry);
        let unknown = Uuid::new_v4();

        let result = registry.apply_turn(unknown, 0, 0).await;

        assert_eq!(result, Err(SessionError::NotFound(unknown)));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(&unknown));
    }

    #[tokio::test]
    async fn revealing_mine_loses_and_marks_it() {
        let registry = SessionRegistry::new();
        let id = forced_game(&registry);

        let info = registry.apply_turn(id, 0, 0).await.unwrap();

        assert_eq!(info.status, GameStatus::Lost);
        assert!(!info.completed);
        assert_eq!(info.field[0][0], "X");
    }

    #[tokio::test]
    async fn finished_game_ignores_further_turns() {
        let registry = SessionRegistry::new();
        let id = forced_game(&registry);
        let lost = registry.apply_turn(id, 0, 0).await.unwrap();

        let again = registry.apply_turn(id, 0, 1).await.unwrap();
        let out_of_bounds = registry.apply_turn(id, 29, 29).await.unwrap();

        assert_eq!(again, lost);
        assert_eq!(out_of_bounds, lost);
    }

    #[tokio::test]
    async fn invalid_coordinate_leaves_game_untouched() {
        let registry = SessionRegistry::new();
        let id = forced_game(&registry);
        let before = registry.view(id).await.unwrap();

        let result = registry.apply_turn(id, 2, 0).await;

        assert!(matches!(
            result,
            Err(SessionError::InvalidCoordinate { row: 2, col: 0, .. })
        ));
        assert_eq!(registry.view(id).await.unwrap(), before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_turns_on_one_game_are_serialized() {
        let registry = SessionRegistry::new();
        let info = registry
            .create_session_with_rng(GameParams::new(30, 30, 0), &mut ZeroRng)
            .unwrap();
        let id = info.game_id;

        let turns: Vec<_> = (0..30)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.apply_turn(id, i, 29 - i).await })
            })
            .collect();
        for turn in turns {
            turn.await.unwrap().unwrap();
        }

        let info = registry.view(id).await.unwrap();
        assert_eq!(info.status, GameStatus::Won);
        assert!(info.field.iter().flatten().all(|token| token == "0"));
    }

    #[tokio::test]
    async fn locked_game_does_not_block_other_games() {
        let registry = SessionRegistry::new();
        let busy = forced_game(&registry);
        let other = forced_game(&registry);
        let session = registry.get(&busy).unwrap();
        let _guard = session.lock().await;

        let turn = tokio::time::timeout(
            Duration::from_secs(1),
            registry.apply_turn(other, 0, 1),
        )
        .await
        .expect("turn on another game waited for a held lock");

        assert_eq!(turn.unwrap().field[0][1], "1");
        assert!(
            tokio::time::timeout(Duration::from_millis(50), registry.apply_turn(busy, 0, 1))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn close_removes_session() {
        let registry = SessionRegistry::new();
        let id = forced_game(&registry);

        registry.close_session(id).unwrap();

        assert!(registry.is_empty());
        assert_eq!(registry.close_session(id), Err(SessionError::NotFound(id)));
        assert!(registry.apply_turn(id, 0, 1).await.is_err());
    }

    #[tokio::test]
    async fn eviction_uses_shorter_window_for_finished_games() {
        let registry = SessionRegistry::new();
        let finished = forced_game(&registry);
        let active = forced_game(&registry);
        registry.apply_turn(finished, 0, 0).await.unwrap();

        let soon = Instant::now() + Duration::from_secs(120);
        assert_eq!(registry.evict_expired(&POLICY, soon), 1);
        assert!(!registry.contains(&finished));
        assert!(registry.contains(&active));

        let later = Instant::now() + Duration::from_secs(1200);
        assert_eq!(registry.evict_expired(&POLICY, later), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn eviction_skips_locked_sessions() {
        let registry = SessionRegistry::new();
        let id = forced_game(&registry);
        let session = registry.get(&id).unwrap();
        let _guard = session.lock().await;

        let later = Instant::now() + Duration::from_secs(1200);

        assert_eq!(registry.evict_expired(&POLICY, later), 0);
        assert!(registry.contains(&id));
    }
}
