//! Scripted seats that play hosted matches through the same handle a
//! transport would use.
//!
//! Each client subscribes to its own notifications and answers whatever
//! its view asks of it: a bet, a hand action, a pressure answer or the
//! next-round choice. Decisions come from the library's bot policies.

use std::time::Duration;

use duel_blackjack::{
    BetCommand, MatchCommand, MatchHandle, MatchManager, MatchOutcome, MatchSetup, MatchView,
    Phase, PlayerAction, PlayerId, SessionError,
    bot::{BotDecisionContext, BotPolicy, BotStrategy},
    entities::{Card, Hand},
    game::{CardView, HandView, NegotiationStatus},
    series::{DEFAULT_RATING, RankTier, RankedProfile},
    session::{MatchType, SeatSetup, SessionResult},
};
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::{config::ServerConfig, logging, metrics};

const NOTIFICATION_BUFFER: usize = 64;
const OBSERVER: &str = "observer";

/// One autoplayed seat
pub struct AutoplayClient {
    handle: MatchHandle,
    player: PlayerId,
    policy: BotPolicy,
    delay: Duration,
    /// Forfeits once this round is reached, if set.
    round_cap: Option<u32>,
}

impl AutoplayClient {
    pub fn new(handle: MatchHandle, player: PlayerId, policy: BotPolicy, delay: Duration) -> Self {
        Self {
            handle,
            player,
            policy,
            delay,
            round_cap: None,
        }
    }

    pub fn with_round_cap(mut self, cap: u32) -> Self {
        self.round_cap = Some(cap);
        self
    }

    /// Next command `view` asks of this seat, if any.
    pub fn next_command(&self, view: &MatchView) -> Option<MatchCommand> {
        match view.phase {
            Phase::RoundInit => self.bet_command(view).map(MatchCommand::Bet),
            Phase::ActionTurn if view.your_turn => {
                let hand = view.you.hands.get(view.you.active_hand_index)?;
                let hand = hand_from_view(hand);
                let visible = shown_cards(view.opponent.hands.first()?);
                let ctx = BotDecisionContext {
                    hand: &hand,
                    opponent_visible: &visible,
                    bankroll: view.you.bankroll,
                    max_doubles_per_hand: view.max_doubles_per_hand,
                };
                Some(MatchCommand::Play(self.policy.decide(&ctx).into()))
            }
            Phase::PressureResponse => {
                let pressure = view.pressure.as_ref().filter(|p| p.awaiting_you)?;
                Some(MatchCommand::RespondToPressure(
                    self.policy.answer_pressure(pressure.delta, view.you.bankroll),
                ))
            }
            Phase::Result if view.your_choice.is_none() => {
                if self.round_cap.is_some_and(|cap| view.round_number >= cap) {
                    return Some(MatchCommand::Forfeit);
                }
                let preferred = self.policy.choose_next();
                let choice = if view.available_choices.contains(&preferred) {
                    preferred
                } else {
                    *view.available_choices.first()?
                };
                Some(MatchCommand::ChooseNext(choice))
            }
            _ => None,
        }
    }

    fn bet_command(&self, view: &MatchView) -> Option<BetCommand> {
        let negotiation = &view.negotiation;
        if !negotiation.enabled {
            return (!view.you.bet_confirmed).then_some(BetCommand::Confirm);
        }
        if negotiation.status != NegotiationStatus::Open {
            return None;
        }
        match (negotiation.your_proposal, negotiation.opponent_proposal) {
            (Some(mine), Some(theirs)) if mine > theirs => Some(BetCommand::Lower(theirs)),
            (_, Some(_)) => Some(BetCommand::Agree),
            (None, None) => Some(BetCommand::Raise(
                self.policy
                    .opening_bet(&negotiation.range, negotiation.target_bet),
            )),
            (Some(_), None) => None,
        }
    }

    /// Plays until the match finishes or the actor goes away.
    pub async fn run(self) -> SessionResult<()> {
        let match_id = self.handle.match_id();
        let mut updates = self
            .handle
            .subscribe(self.player.clone(), NOTIFICATION_BUFFER)
            .await?;

        while let Some(notification) = updates.recv().await {
            let Some(view) = notification.view else {
                continue;
            };
            if view.phase == Phase::Finished {
                break;
            }
            let Some(command) = self.next_command(&view) else {
                continue;
            };
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.submit(command).await?;
        }

        debug!("Autoplay {} left match {match_id}", self.player);
        Ok(())
    }

    /// A rejected hand action falls back to standing so the turn never
    /// stalls until its deadline.
    async fn submit(&self, command: MatchCommand) -> SessionResult<()> {
        let fallback = matches!(command, MatchCommand::Play(action) if action != PlayerAction::Stand);
        match self.handle.submit(self.player.clone(), command).await {
            Ok(_) => Ok(()),
            Err(SessionError::Rejected(e)) => {
                logging::log_rejected_command(
                    &self.handle.match_id().to_string(),
                    self.player.as_str(),
                    &format!("{command:?}"),
                    &e.to_string(),
                );
                if fallback {
                    let stand = MatchCommand::Play(PlayerAction::Stand);
                    if let Err(SessionError::Rejected(e)) =
                        self.handle.submit(self.player.clone(), stand).await
                    {
                        debug!("{}: stand fallback rejected: {e}", self.player);
                    }
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Rebuilds a hand from its owner's view, where every card is face up.
fn hand_from_view(view: &HandView) -> Hand {
    let mut hand = Hand::new(view.bet);
    for card in shown_cards(view) {
        hand.push_card(card);
    }
    hand.stood = view.stood;
    hand.locked = view.locked;
    hand.doubled = view.doubled;
    hand.double_count = u8::from(view.doubled);
    hand.action_count = (hand.cards.len().saturating_sub(2)) as u32 + u32::from(view.doubled);
    hand
}

fn shown_cards(view: &HandView) -> Vec<Card> {
    view.cards
        .iter()
        .filter_map(|card| match card {
            CardView::Shown { value, suit } => Some(Card(*value, *suit)),
            CardView::Concealed => None,
        })
        .collect()
}

/// Seats for the `index`-th hosted match.
pub fn setup_for(config: &ServerConfig, index: usize) -> MatchSetup {
    let defaults = &config.match_defaults;
    let match_config = config.match_config();
    let name = |seat: &str| format!("auto_{index}_{seat}");
    match defaults.match_type {
        MatchType::Bot => MatchSetup::versus_bot(
            name("a"),
            defaults.bankroll,
            defaults.bot_difficulty,
            match_config,
        ),
        MatchType::Ranked => {
            let profile = RankedProfile::new(RankTier::Bronze, DEFAULT_RATING);
            MatchSetup::ranked(
                (name("a"), profile),
                (name("b"), profile),
                defaults.bankroll,
                match_config,
            )
        }
        MatchType::Casual => {
            MatchSetup::casual(name("a"), name("b"), defaults.bankroll, match_config)
        }
        MatchType::Practice => MatchSetup {
            seats: [
                SeatSetup::human(name("a"), defaults.bankroll),
                SeatSetup::human(name("b"), defaults.bankroll),
            ],
            config: match_config,
        },
    }
}

/// Follows a match as a non-seated subscriber, feeding the metrics.
pub async fn observe(handle: MatchHandle, match_type: MatchType) -> Option<MatchOutcome> {
    let match_id = handle.match_id().to_string();
    let mut updates = match handle.subscribe(OBSERVER, NOTIFICATION_BUFFER).await {
        Ok(updates) => updates,
        Err(e) => {
            warn!("Could not observe match {match_id}: {e}");
            return None;
        }
    };

    while let Some(notification) = updates.recv().await {
        if !metrics::record_events(match_type, &notification.events) {
            continue;
        }
        let outcome = notification.events.into_iter().find_map(|event| match event {
            duel_blackjack::MatchEvent::MatchEnded(outcome) => Some(outcome),
            _ => None,
        })?;
        logging::log_match_ended(
            &match_id,
            metrics::reason_label(&outcome.reason),
            outcome.winner.as_ref().map(PlayerId::as_str),
            outcome.rounds_played,
        );
        return Some(outcome);
    }
    None
}

/// Creates the `index`-th match and spawns its autoplay clients and observer.
pub async fn start_match(
    manager: &MatchManager,
    config: &ServerConfig,
    index: usize,
) -> SessionResult<(MatchHandle, Vec<JoinHandle<()>>)> {
    let setup = setup_for(config, index);
    let match_type = setup.config.match_type;
    let humans: Vec<PlayerId> = setup
        .seats
        .iter()
        .filter(|seat| !seat.is_bot)
        .map(|seat| seat.player.clone())
        .collect();

    let handle = manager.create_match(setup).await?;
    let observer = handle.clone();
    let mut tasks = vec![tokio::spawn(async move {
        observe(observer, match_type).await;
    })];

    let delay = Duration::from_millis(config.autoplay.delay_ms);
    for (seat, player) in humans.into_iter().enumerate() {
        let mut client = AutoplayClient::new(
            handle.clone(),
            player.clone(),
            BotPolicy::for_difficulty(config.autoplay.difficulty),
            delay,
        );
        if seat == 0 {
            client = client.with_round_cap(config.autoplay.max_rounds);
        }
        tasks.push(tokio::spawn(async move {
            if let Err(e) = client.run().await {
                warn!("Autoplay {player} stopped: {e}");
            }
        }));
    }

    info!(
        "Hosting {match_type} match {} with {} autoplay seat(s)",
        handle.match_id(),
        tasks.len() - 1
    );
    Ok((handle, tasks))
}
