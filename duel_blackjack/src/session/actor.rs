//! Match actor: owns one [`Match`], applies inputs in arrival order and
//! fires its deadlines.

use chrono::Utc;
use log::{debug, error, info, warn};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot};

use super::errors::{SessionError, SessionResult};
use super::messages::{MatchMessage, MatchNotification, MatchSummary};
use crate::game::{
    Match, MatchCommand, MatchError, MatchEvent, MatchId, MatchInput, MatchView,
    entities::PlayerId,
};
use crate::series::{RatingError, RatingStore};

/// Inbox capacity of a match actor.
pub const MAILBOX_SIZE: usize = 100;

/// Match actor handle for sending messages
#[derive(Clone, Debug)]
pub struct MatchHandle {
    sender: mpsc::Sender<MatchMessage>,
    match_id: MatchId,
}

impl MatchHandle {
    pub fn new(sender: mpsc::Sender<MatchMessage>, match_id: MatchId) -> Self {
        Self { sender, match_id }
    }

    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the match
    pub async fn send(&self, message: MatchMessage) -> SessionResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| SessionError::MatchClosed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> MatchMessage,
    ) -> SessionResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| SessionError::MatchClosed)
    }

    async fn submit_input(&self, input: MatchInput) -> SessionResult<Vec<MatchEvent>> {
        let result = self
            .request(|response| MatchMessage::Submit { input, response })
            .await?;
        Ok(result?)
    }

    pub async fn submit(
        &self,
        player: impl Into<PlayerId>,
        command: MatchCommand,
    ) -> SessionResult<Vec<MatchEvent>> {
        self.submit_input(MatchInput::command(player, command)).await
    }

    /// Marks `player` as connected again.
    pub async fn connect(&self, player: impl Into<PlayerId>) -> SessionResult<Vec<MatchEvent>> {
        self.submit_input(MatchInput::Reconnected {
            player: player.into(),
        })
        .await
    }

    /// Starts the reconnect grace period of `player`.
    pub async fn disconnect(&self, player: impl Into<PlayerId>) -> SessionResult<Vec<MatchEvent>> {
        self.submit_input(MatchInput::Disconnected {
            player: player.into(),
        })
        .await
    }

    pub async fn view(&self, player: impl Into<PlayerId>) -> SessionResult<Option<MatchView>> {
        let player = player.into();
        self.request(|response| MatchMessage::GetView { player, response })
            .await
    }

    pub async fn summary(&self) -> SessionResult<MatchSummary> {
        self.request(|response| MatchMessage::GetSummary { response })
            .await
    }

    /// Subscribes `player` to updates. A previous subscription of the same
    /// player is replaced.
    pub async fn subscribe(
        &self,
        player: impl Into<PlayerId>,
        buffer: usize,
    ) -> SessionResult<mpsc::Receiver<MatchNotification>> {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        self.send(MatchMessage::Subscribe {
            player: player.into(),
            sender,
        })
        .await?;
        Ok(receiver)
    }

    pub async fn unsubscribe(&self, player: impl Into<PlayerId>) -> SessionResult<()> {
        self.send(MatchMessage::Unsubscribe {
            player: player.into(),
        })
        .await
    }

    pub async fn close(&self) -> SessionResult<()> {
        self.request(|response| MatchMessage::Close { response })
            .await
    }
}

/// Actor owning a single match
pub struct MatchActor {
    game: Match,

    inbox: mpsc::Receiver<MatchMessage>,

    /// Applies the rating adjustment of a finished ranked series
    ratings: Option<Arc<dyn RatingStore>>,

    rating_settled: bool,

    is_closed: bool,

    subscribers: HashMap<PlayerId, mpsc::Sender<MatchNotification>>,
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending::<()>().await,
    }
}

impl MatchActor {
    pub fn new(game: Match, ratings: Option<Arc<dyn RatingStore>>) -> (Self, MatchHandle) {
        let (sender, inbox) = mpsc::channel(MAILBOX_SIZE);
        let handle = MatchHandle::new(sender, game.id());
        let actor = Self {
            game,
            inbox,
            ratings,
            rating_settled: false,
            is_closed: false,
            subscribers: HashMap::new(),
        };
        (actor, handle)
    }

    /// Run the match actor event loop
    pub async fn run(mut self) {
        let id = self.game.id();
        info!("Match {id} starting");

        loop {
            let timer = self.game.next_timer();
            let wait = timer
                .as_ref()
                .map(|t| (t.at - Utc::now()).to_std().unwrap_or(Duration::ZERO));

            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                }

                _ = sleep_for(wait) => {
                    if let Some(timer) = timer {
                        if let Err(e) = self.apply(timer.input).await {
                            warn!("Match {id}: timer input rejected: {e}");
                        }
                    }
                }
            }

            if self.is_closed {
                break;
            }
        }

        info!("Match {id} closed");
    }

    async fn handle_message(&mut self, message: MatchMessage) {
        match message {
            MatchMessage::Submit { input, response } => {
                let result = self.apply(input).await;
                let _ = response.send(result);
            }

            MatchMessage::GetView { player, response } => {
                let _ = response.send(self.game.view_for(&player));
            }

            MatchMessage::GetSummary { response } => {
                let _ = response.send(MatchSummary::of(&self.game));
            }

            MatchMessage::Subscribe { player, sender } => {
                debug!("{player} subscribed to match {}", self.game.id());
                let snapshot = MatchNotification {
                    events: Vec::new(),
                    view: self.game.view_for(&player),
                };
                if sender.try_send(snapshot).is_ok() {
                    self.subscribers.insert(player, sender);
                }
            }

            MatchMessage::Unsubscribe { player } => {
                self.subscribers.remove(&player);
                debug!("{player} unsubscribed from match {}", self.game.id());
            }

            MatchMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }
        }
    }

    async fn apply(&mut self, input: MatchInput) -> Result<Vec<MatchEvent>, MatchError> {
        let events = self.game.apply(input, Utc::now())?;
        for event in &events {
            debug!("Match {}: {}", self.game.id(), event);
        }
        if !events.is_empty() {
            self.notify(&events);
        }
        if self.game.is_finished() {
            self.settle_rating().await;
        }
        Ok(events)
    }

    /// Pushes events plus a fresh per-player view to every subscriber.
    fn notify(&mut self, events: &[MatchEvent]) {
        let game = &self.game;
        self.subscribers.retain(|player, sender| {
            let notification = MatchNotification {
                events: events.to_vec(),
                view: game.view_for(player),
            };
            match sender.try_send(notification) {
                Ok(_) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Subscriber {player} channel full, dropping notification");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Subscriber {player} disconnected, removing");
                    false
                }
            }
        });
    }

    /// Applies the rating change of a finished series exactly once.
    async fn settle_rating(&mut self) {
        if self.rating_settled {
            return;
        }
        let Some(store) = self.ratings.clone() else {
            return;
        };
        let Some(series) = self.game.series() else {
            return;
        };
        if !series.is_finished() {
            return;
        }

        // Players the store has never rated start from their profile.
        let mut ratings = series.profiles.map(|p| p.rating);
        for (seat, player) in series.players.iter().enumerate() {
            match store.rating(player).await {
                Ok(Some(rating)) => ratings[seat] = rating,
                Ok(None) => {}
                Err(e) => {
                    error!("Series {}: could not read rating of {player}: {e}", series.series_id);
                    return;
                }
            }
        }
        let series_id = series.series_id;
        let Some(changes) = series.rating_changes(ratings) else {
            return;
        };

        match store.apply_series_delta(&changes).await {
            Ok(()) => info!("Series {series_id}: ratings applied"),
            Err(RatingError::DuplicateApplication(_)) => {
                debug!("Series {series_id}: ratings were already applied");
            }
            Err(e) => {
                error!("Series {series_id}: rating update failed: {e}");
                return;
            }
        }
        self.rating_settled = true;
    }
}
