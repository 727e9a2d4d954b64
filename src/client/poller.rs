//! Polling loop of the player client.
//!
//! Every tick fires a request without waiting for earlier ones. Each request
//! carries a sequence stamp and a response is applied only when its stamp is
//! newer than the last applied one, so a slow response can never roll the
//! screen back.

use std::{future::Future, path::PathBuf, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{MissedTickBehavior, interval, timeout},
};
use tracing::{debug, info, warn};

use crate::{
    client::{
        api::{ClientError, QuizApi},
        reconciler::{PlayerView, Screen, reconcile},
        store::LocalStore,
    },
    dto::snapshot::PlayerSnapshot,
    state::game::{Choice, QuestionId},
};

/// Default delay between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Default deadline for one request before it counts as a transport failure.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Connectivity indicator shown next to the game screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Last poll succeeded.
    #[default]
    Connected,
    /// Last poll failed; still retrying.
    ConnectionLost,
    /// The platform reported the network as down.
    Offline,
}

/// State published to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientState {
    /// Last rendered view, `None` until the first successful poll.
    pub view: Option<PlayerView>,
    /// Connectivity indicator.
    pub connection: ConnectionStatus,
}

/// Outcome of a submission through the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The server recorded the choice.
    Accepted(Choice),
    /// A choice was already cached for this question; nothing was sent.
    AlreadyChosen(Choice),
}

/// Why a submission could not be sent or was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// No question is open on the current screen.
    #[error("no question is open")]
    NoOpenQuestion,
    /// The client has no player id yet.
    #[error("not joined yet")]
    NotJoined,
    /// Transport failure or server rejection.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// External events fed into the loop.
#[derive(Debug)]
pub enum Command {
    /// Network came back; poll immediately.
    NetworkRestored,
    /// Network went away.
    NetworkLost,
    /// App came back to the foreground; poll immediately.
    Foreground,
    /// Submit `choice` for the open question.
    Submit {
        /// Chosen key.
        choice: Choice,
        /// Receives the outcome.
        reply: oneshot::Sender<Result<SubmitOutcome, SubmitError>>,
    },
}

enum Completion {
    Poll {
        seq: u64,
        result: Result<PlayerSnapshot, ClientError>,
    },
    Submit {
        question_id: QuestionId,
        choice: Choice,
        result: Result<(), ClientError>,
        reply: oneshot::Sender<Result<SubmitOutcome, SubmitError>>,
    },
}

/// Player client: local cache, reducer and polling loop.
pub struct PlayerClient<A: QuizApi> {
    api: Arc<A>,
    store: LocalStore,
    store_path: Option<PathBuf>,
    request_timeout: Duration,
    next_seq: u64,
    last_applied: u64,
    state: ClientState,
    updates: watch::Sender<ClientState>,
}

impl<A: QuizApi> PlayerClient<A> {
    /// Client over `api` starting from `store`, persisted to `store_path` when set.
    pub fn new(api: Arc<A>, store: LocalStore, store_path: Option<PathBuf>) -> Self {
        let (updates, _rx) = watch::channel(ClientState::default());
        Self {
            api,
            store,
            store_path,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            next_seq: 0,
            last_applied: 0,
            state: ClientState::default(),
            updates,
        }
    }

    /// Give up on any request after `request_timeout`.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Subscribe to rendered state changes.
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.updates.subscribe()
    }

    /// Current local cache.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Last published state.
    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Reuse the cached player id or join to obtain one, retrying every `period`.
    pub async fn ensure_player(&mut self, period: Duration) -> String {
        loop {
            if let Some(id) = &self.store.player_id {
                return id.clone();
            }
            match with_deadline(self.request_timeout, self.api.join()).await {
                Ok(id) => {
                    info!(player = %id, "joined quiz");
                    self.store.player_id = Some(id.clone());
                    self.persist();
                    return id;
                }
                Err(err) => {
                    warn!(error = %err, "join failed; retrying");
                    self.set_connection(ConnectionStatus::ConnectionLost);
                    tokio::time::sleep(period).await;
                }
            }
        }
    }

    /// Poll every `period` until `commands` closes.
    pub async fn run(mut self, period: Duration, mut commands: mpsc::Receiver<Command>) {
        let player_id = self.ensure_player(period).await;
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.fire_poll(&player_id, &done_tx),
                command = commands.recv() => match command {
                    Some(Command::NetworkRestored) | Some(Command::Foreground) => {
                        self.fire_poll(&player_id, &done_tx);
                    }
                    Some(Command::NetworkLost) => self.set_connection(ConnectionStatus::Offline),
                    Some(Command::Submit { choice, reply }) => {
                        self.fire_submit(&player_id, choice, reply, &done_tx);
                    }
                    None => {
                        debug!("command channel closed; stopping poller");
                        return;
                    }
                },
                Some(done) = done_rx.recv() => match done {
                    Completion::Poll { seq, result } => {
                        self.apply_poll(seq, result);
                    }
                    Completion::Submit { question_id, choice, result, reply } => {
                        let outcome = self.finish_submit(question_id, choice, result);
                        let _ = reply.send(outcome);
                    }
                },
            }
        }
    }

    /// Submit `choice` and wait for the answer, outside the polling loop.
    pub async fn submit(&mut self, choice: Choice) -> Result<SubmitOutcome, SubmitError> {
        let (question_id, player_id) = match self.begin_submit(choice)? {
            Pending::Cached(outcome) => return Ok(outcome),
            Pending::Send {
                question_id,
                player_id,
            } => (question_id, player_id),
        };
        let result = with_deadline(self.request_timeout, self.api.submit(player_id, choice))
            .await
            .map(|_| ());
        self.finish_submit(question_id, choice, result)
    }

    fn fire_poll(&mut self, player_id: &str, done: &mpsc::UnboundedSender<Completion>) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let request = with_deadline(
            self.request_timeout,
            self.api.game_state(player_id.to_owned()),
        );
        let done = done.clone();
        tokio::spawn(async move {
            let result = request.await;
            let _ = done.send(Completion::Poll { seq, result });
        });
    }

    fn fire_submit(
        &mut self,
        player_id: &str,
        choice: Choice,
        reply: oneshot::Sender<Result<SubmitOutcome, SubmitError>>,
        done: &mpsc::UnboundedSender<Completion>,
    ) {
        let question_id = match self.begin_submit(choice) {
            Ok(Pending::Send { question_id, .. }) => question_id,
            Ok(Pending::Cached(outcome)) => {
                let _ = reply.send(Ok(outcome));
                return;
            }
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };

        let request = with_deadline(
            self.request_timeout,
            self.api.submit(player_id.to_owned(), choice),
        );
        let done = done.clone();
        tokio::spawn(async move {
            let result = request.await.map(|_| ());
            let _ = done.send(Completion::Submit {
                question_id,
                choice,
                result,
                reply,
            });
        });
    }

    fn begin_submit(&self, choice: Choice) -> Result<Pending, SubmitError> {
        let question_id = match self.state.view.as_ref().map(|view| &view.screen) {
            Some(Screen::Question { question, .. }) => question.id,
            _ => return Err(SubmitError::NoOpenQuestion),
        };
        if let Some(existing) = self.store.answer_for(question_id) {
            debug!(%question_id, %existing, "choice already cached; not resending");
            return Ok(Pending::Cached(SubmitOutcome::AlreadyChosen(existing)));
        }
        let player_id = self.store.player_id.clone().ok_or(SubmitError::NotJoined)?;
        debug!(%question_id, %choice, "submitting answer");
        Ok(Pending::Send {
            question_id,
            player_id,
        })
    }

    fn finish_submit(
        &mut self,
        question_id: QuestionId,
        choice: Choice,
        result: Result<(), ClientError>,
    ) -> Result<SubmitOutcome, SubmitError> {
        match result {
            Ok(()) => {
                self.store.record_answer(question_id, choice);
                self.persist();
                Ok(SubmitOutcome::Accepted(choice))
            }
            Err(err) => {
                warn!(%question_id, error = %err, "answer not recorded");
                Err(err.into())
            }
        }
    }

    /// Apply a poll response stamped `seq`. Returns whether it was applied.
    fn apply_poll(&mut self, seq: u64, result: Result<PlayerSnapshot, ClientError>) -> bool {
        if seq <= self.last_applied {
            debug!(seq, last_applied = self.last_applied, "discarding stale poll response");
            return false;
        }

        match result {
            Ok(snapshot) => {
                self.last_applied = seq;
                let view = reconcile(&mut self.store, &snapshot);
                self.persist();
                self.state = ClientState {
                    view: Some(view),
                    connection: ConnectionStatus::Connected,
                };
                self.publish();
                true
            }
            Err(err) => {
                warn!(seq, error = %err, "poll failed; will retry");
                if self.state.connection != ConnectionStatus::Offline {
                    self.set_connection(ConnectionStatus::ConnectionLost);
                }
                false
            }
        }
    }

    fn set_connection(&mut self, connection: ConnectionStatus) {
        if self.state.connection != connection {
            self.state.connection = connection;
            self.publish();
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.state.clone());
    }

    fn persist(&self) {
        if let Some(path) = &self.store_path {
            if let Err(err) = self.store.save(path) {
                warn!(path = %path.display(), error = %err, "failed to persist local cache");
            }
        }
    }
}

/// Resolve `request`, or fail with a transport error once `limit` elapses.
async fn with_deadline<T>(
    limit: Duration,
    request: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    match timeout(limit, request).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Transport(format!(
            "request timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

enum Pending {
    Cached(SubmitOutcome),
    Send {
        question_id: QuestionId,
        player_id: String,
    },
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
    };

    use futures::future::{self, BoxFuture};
    use uuid::Uuid;

    use super::*;
    use crate::{
        dto::{player::SubmitAnswerResponse, snapshot::QuestionView},
        state::game::QuestionOptions,
    };

    #[derive(Default)]
    struct FakeApi {
        snapshots: Mutex<VecDeque<Result<PlayerSnapshot, ClientError>>>,
        submit_result: Mutex<Option<ClientError>>,
        submits: AtomicUsize,
        joins: AtomicUsize,
        unresponsive: AtomicBool,
    }

    impl QuizApi for FakeApi {
        fn join(&self) -> BoxFuture<'static, Result<String, ClientError>> {
            let n = self.joins.fetch_add(1, Ordering::SeqCst);
            Box::pin(future::ready(Ok(format!("player-{n}"))))
        }

        fn game_state(
            &self,
            _player_id: String,
        ) -> BoxFuture<'static, Result<PlayerSnapshot, ClientError>> {
            if self.unresponsive.load(Ordering::SeqCst) {
                return Box::pin(future::pending::<Result<PlayerSnapshot, ClientError>>());
            }
            let next = self
                .snapshots
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::Transport("no scripted response".into())));
            Box::pin(future::ready(next))
        }

        fn submit(
            &self,
            _player_id: String,
            choice: Choice,
        ) -> BoxFuture<'static, Result<SubmitAnswerResponse, ClientError>> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if self.unresponsive.load(Ordering::SeqCst) {
                return Box::pin(future::pending::<Result<SubmitAnswerResponse, ClientError>>());
            }
            let result = match self.submit_result.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(SubmitAnswerResponse {
                    message: "answer submitted".into(),
                    question_id: Uuid::nil(),
                    choice,
                }),
            };
            Box::pin(future::ready(result))
        }
    }

    fn open_question(id: Uuid, number: usize) -> PlayerSnapshot {
        PlayerSnapshot {
            is_active: true,
            current_question: Some(QuestionView {
                id,
                text: format!("Question {number}"),
                options: QuestionOptions {
                    a: "a".into(),
                    b: "b".into(),
                    c: "c".into(),
                    d: "d".into(),
                },
                correct_answer: None,
            }),
            revealed: false,
            tally: None,
            score: 0,
            player_answered: false,
            player_choice: None,
            total_questions: 2,
            current_question_number: number,
            game_complete: false,
            game_ended: false,
            game_number: 1,
        }
    }

    fn client(api: Arc<FakeApi>) -> PlayerClient<FakeApi> {
        let store = LocalStore {
            player_id: Some("player-0".into()),
            ..LocalStore::default()
        };
        PlayerClient::new(api, store, None)
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut client = client(Arc::new(FakeApi::default()));
        let newer = open_question(Uuid::new_v4(), 2);
        let older = open_question(Uuid::new_v4(), 1);

        assert!(client.apply_poll(2, Ok(newer)));
        assert!(!client.apply_poll(1, Ok(older)));
        assert_eq!(client.state().view.as_ref().unwrap().question_number, 2);
    }

    #[test]
    fn transport_error_raises_and_success_clears_indicator() {
        let mut client = client(Arc::new(FakeApi::default()));
        let mut updates = client.subscribe();

        client.apply_poll(1, Err(ClientError::Transport("timeout".into())));
        assert_eq!(client.state().connection, ConnectionStatus::ConnectionLost);
        assert!(updates.has_changed().unwrap());
        assert_eq!(
            updates.borrow_and_update().connection,
            ConnectionStatus::ConnectionLost
        );

        client.apply_poll(2, Ok(open_question(Uuid::new_v4(), 1)));
        assert_eq!(client.state().connection, ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn submit_goes_through_cache() {
        let api = Arc::new(FakeApi::default());
        let mut client = client(api.clone());
        let id = Uuid::new_v4();

        assert_eq!(
            client.submit(Choice::A).await,
            Err(SubmitError::NoOpenQuestion)
        );

        client.apply_poll(1, Ok(open_question(id, 1)));
        assert_eq!(
            client.submit(Choice::C).await,
            Ok(SubmitOutcome::Accepted(Choice::C))
        );
        assert_eq!(
            client.submit(Choice::D).await,
            Ok(SubmitOutcome::AlreadyChosen(Choice::C))
        );
        assert_eq!(api.submits.load(Ordering::SeqCst), 1);
        assert_eq!(client.store().answer_for(id), Some(Choice::C));
    }

    #[tokio::test]
    async fn rejected_submit_leaves_cache_untouched() {
        let api = Arc::new(FakeApi::default());
        *api.submit_result.lock().unwrap() = Some(ClientError::Rejected {
            status: 409,
            message: "conflict: answer already revealed for this question".into(),
        });
        let mut client = client(api.clone());
        let id = Uuid::new_v4();
        client.apply_poll(1, Ok(open_question(id, 1)));

        assert!(matches!(
            client.submit(Choice::B).await,
            Err(SubmitError::Client(ClientError::Rejected { status: 409, .. }))
        ));
        assert_eq!(client.store().answer_for(id), None);
    }

    #[tokio::test]
    async fn ensure_player_reuses_cached_id_or_joins() {
        let api = Arc::new(FakeApi::default());
        let mut cached = client(api.clone());
        assert_eq!(cached.ensure_player(Duration::from_millis(1)).await, "player-0");
        assert_eq!(api.joins.load(Ordering::SeqCst), 0);

        let mut fresh = PlayerClient::new(api.clone(), LocalStore::default(), None);
        let id = fresh.ensure_player(Duration::from_millis(1)).await;
        assert_eq!(id, "player-0");
        assert_eq!(fresh.store().player_id.as_deref(), Some("player-0"));
        assert_eq!(api.joins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_loop_polls_and_submits() {
        let api = Arc::new(FakeApi::default());
        let id = Uuid::new_v4();
        {
            let mut scripted = api.snapshots.lock().unwrap();
            for _ in 0..50 {
                scripted.push_back(Ok(open_question(id, 1)));
            }
        }
        let client = client(api.clone());
        let mut updates = client.subscribe();
        let (commands, rx) = mpsc::channel(8);
        let handle = tokio::spawn(client.run(Duration::from_millis(10), rx));

        tokio::time::timeout(
            Duration::from_secs(2),
            updates.wait_for(|state| state.view.is_some()),
        )
        .await
        .unwrap()
        .unwrap();

        let (reply, outcome) = oneshot::channel();
        commands
            .send(Command::Submit {
                choice: Choice::A,
                reply,
            })
            .await
            .unwrap();
        assert_eq!(
            outcome.await.unwrap(),
            Ok(SubmitOutcome::Accepted(Choice::A))
        );

        drop(commands);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn unresponsive_server_raises_connection_lost() {
        let api = Arc::new(FakeApi::default());
        api.unresponsive.store(true, Ordering::SeqCst);
        let client = client(api.clone()).with_request_timeout(Duration::from_millis(30));
        let mut updates = client.subscribe();
        let (commands, rx) = mpsc::channel(8);
        let handle = tokio::spawn(client.run(Duration::from_millis(10), rx));

        tokio::time::timeout(
            Duration::from_secs(2),
            updates.wait_for(|state| state.connection == ConnectionStatus::ConnectionLost),
        )
        .await
        .unwrap()
        .unwrap();

        drop(commands);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn hanging_submit_times_out_without_caching() {
        let api = Arc::new(FakeApi::default());
        let mut client = client(api.clone()).with_request_timeout(Duration::from_millis(20));
        let id = Uuid::new_v4();
        client.apply_poll(1, Ok(open_question(id, 1)));
        api.unresponsive.store(true, Ordering::SeqCst);

        assert!(matches!(
            client.submit(Choice::A).await,
            Err(SubmitError::Client(ClientError::Transport(_)))
        ));
        assert_eq!(client.store().answer_for(id), None);
    }
}
