//! The per-feed session task.
//!
//! The session owns every cache and every subscription of one feed and is the
//! only code that calls the sink. Watchers and repair reads run on their own
//! tasks and report back through the session's event queue, so all state
//! changes happen here, one event at a time.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::events::SessionEvent;
use super::proposals::ProposalCache;
use super::repair::LegacyRepair;
use super::resolver::{resolve_trip, stream_failure};
use super::slot_aggregator::{SlotAggregator, SlotFingerprint};
use super::subscription::Subscription;
use super::{FeedState, StateCell};
use crate::domain::ports::{TripStore, TripStoreError, TripViewSink};
use crate::domain::{
    Day, DayId, DayWithSlots, Error, Proposal, ProposalId, Slot, Trip, TripId, UserId,
    rebuild_view,
};

/// Everything a session task needs to start.
pub(crate) struct SessionLaunch {
    pub(crate) store: Arc<dyn TripStore>,
    pub(crate) slug: String,
    pub(crate) caller: Option<UserId>,
    pub(crate) sink: Arc<dyn TripViewSink>,
    pub(crate) cancelled: Arc<AtomicBool>,
    pub(crate) events: UnboundedSender<SessionEvent>,
    pub(crate) inbox: UnboundedReceiver<SessionEvent>,
    pub(crate) state: StateCell,
}

/// Sink wrapper that drops every call once the feed is cancelled.
///
/// The flag is read before each call; a call that passed the check runs to
/// completion even if the feed is stopped meanwhile.
pub(crate) struct SinkGate {
    sink: Arc<dyn TripViewSink>,
    cancelled: Arc<AtomicBool>,
}

impl SinkGate {
    fn open(&self) -> bool {
        !self.cancelled.load(Ordering::Acquire)
    }

    fn set_trip(&self, trip: Option<Trip>) {
        if self.open() {
            self.sink.set_trip(trip);
        }
    }

    fn set_days(&self, days: Vec<DayWithSlots>) {
        if self.open() {
            self.sink.set_days(days);
        }
    }

    fn set_error(&self, error: &Error) {
        if self.open() {
            self.sink.set_error(error);
        }
    }

    fn set_loading(&self, loading: bool) {
        if self.open() {
            self.sink.set_loading(loading);
        }
    }

    /// Report `error` and clear the loading flag.
    fn fail(&self, error: &Error) {
        self.set_error(error);
        self.set_loading(false);
    }
}

/// Drive one feed from resolution to disposal.
pub(crate) async fn run(launch: SessionLaunch) {
    let SessionLaunch {
        store,
        slug,
        caller,
        sink,
        cancelled,
        events,
        mut inbox,
        state,
    } = launch;
    let sink = SinkGate {
        sink,
        cancelled: Arc::clone(&cancelled),
    };

    if cancelled.load(Ordering::Acquire) {
        state.advance(FeedState::Cancelled);
        return;
    }
    sink.set_loading(true);
    state.advance(FeedState::Resolving);

    let resolved = tokio::select! {
        biased;
        _ = inbox.recv() => {
            debug!(slug, "trip feed stopped during resolution");
            state.advance(FeedState::Cancelled);
            return;
        }
        result = resolve_trip(store.as_ref(), &slug, caller.as_ref()) => result,
    };
    if cancelled.load(Ordering::Acquire) {
        state.advance(FeedState::Cancelled);
        return;
    }

    let record = match resolved {
        Ok(record) => record,
        Err(error) => {
            sink.fail(&error);
            state.advance(FeedState::Failed(error.code()));
            return;
        }
    };

    state.advance(FeedState::Active);
    sink.set_trip(Some(record.trip));
    let mut session = FeedSession::new(record.id, store, sink, events, cancelled);
    session.open_watchers();

    while let Some(event) = inbox.recv().await {
        if session.is_cancelled() {
            break;
        }
        session.handle(event);
    }

    session.dispose();
    state.advance(FeedState::Cancelled);
}

/// Caches and subscriptions of one active feed.
struct FeedSession {
    trip_id: TripId,
    store: Arc<dyn TripStore>,
    sink: SinkGate,
    events: UnboundedSender<SessionEvent>,
    cancelled: Arc<AtomicBool>,
    trip_watch: Option<Subscription>,
    day_watch: Option<Subscription>,
    days: Vec<Day>,
    aggregator: Option<SlotAggregator>,
    next_slot_generation: u64,
    slot_fingerprint: Option<SlotFingerprint>,
    proposal_watch: Option<(u64, Subscription)>,
    next_proposal_generation: u64,
    proposals: ProposalCache,
    repair: LegacyRepair,
}

impl FeedSession {
    fn new(
        trip_id: TripId,
        store: Arc<dyn TripStore>,
        sink: SinkGate,
        events: UnboundedSender<SessionEvent>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            trip_id,
            store,
            sink,
            events,
            cancelled,
            trip_watch: None,
            day_watch: None,
            days: Vec::new(),
            aggregator: None,
            next_slot_generation: 0,
            slot_fingerprint: None,
            proposal_watch: None,
            next_proposal_generation: 0,
            proposals: ProposalCache::default(),
            repair: LegacyRepair::default(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn open_watchers(&mut self) {
        self.trip_watch = Some(Subscription::forward(
            "trip",
            self.store.watch_trip(&self.trip_id),
            self.events.clone(),
            SessionEvent::Trip,
        ));
        self.day_watch = Some(Subscription::forward(
            "days",
            self.store.watch_days(&self.trip_id),
            self.events.clone(),
            SessionEvent::Days,
        ));
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Trip(result) => self.on_trip(result),
            SessionEvent::Days(result) => self.on_days(result),
            SessionEvent::Slots {
                generation,
                chunk,
                result,
            } => self.on_slots(generation, chunk, result),
            SessionEvent::Proposals { generation, result } => {
                self.on_proposals(generation, result);
            }
            SessionEvent::Repaired { found, failed } => self.on_repaired(found, &failed),
            SessionEvent::Stop => {}
        }
    }

    fn on_trip(&mut self, result: Result<Option<Trip>, TripStoreError>) {
        match result {
            Ok(trip) => self.sink.set_trip(trip),
            Err(err) => {
                warn!(trip_id = %self.trip_id, error = %err, "trip live query failed");
                self.sink.fail(&stream_failure());
            }
        }
    }

    fn on_days(&mut self, result: Result<Vec<Day>, TripStoreError>) {
        let days = match result {
            Ok(days) => days,
            Err(err) => {
                warn!(trip_id = %self.trip_id, error = %err, "day live query failed");
                self.sink.fail(&stream_failure());
                return;
            }
        };

        let mut seen = HashSet::new();
        self.days = days;
        self.days.retain(|day| seen.insert(day.id.clone()));
        self.days.sort_by(Day::itinerary_order);
        let day_ids: Vec<DayId> = self.days.iter().map(|day| day.id.clone()).collect();

        if let Some(previous) = self.aggregator.take() {
            previous.teardown();
        }
        self.next_slot_generation += 1;
        let aggregator = SlotAggregator::open(
            self.next_slot_generation,
            &day_ids,
            &self.store,
            &self.events,
        );
        let settled = aggregator.is_settled();
        self.aggregator = Some(aggregator);

        if settled {
            self.after_slot_merge();
        } else {
            self.publish_and_repair();
        }
    }

    fn on_slots(
        &mut self,
        generation: u64,
        chunk: usize,
        result: Result<Vec<Slot>, TripStoreError>,
    ) {
        let Some(aggregator) = self.aggregator.as_mut() else {
            return;
        };
        if aggregator.generation() != generation {
            debug!(generation, chunk, "dropping slots from a torn-down aggregator");
            return;
        }
        match result {
            Ok(slots) => {
                aggregator.apply(chunk, slots);
            }
            Err(err) => {
                warn!(trip_id = %self.trip_id, chunk, error = %err, "slot live query failed");
                if !aggregator.mark_failed(chunk) {
                    return;
                }
            }
        }

        if aggregator.is_settled() {
            self.after_slot_merge();
        } else {
            self.publish_and_repair();
        }
    }

    /// Compare the merged slot-id set with the last one and reopen the
    /// proposal query when it moved.
    fn after_slot_merge(&mut self) {
        let Some(fingerprint) = self.aggregator.as_ref().map(SlotAggregator::fingerprint) else {
            return;
        };
        if self.slot_fingerprint.as_ref() != Some(&fingerprint) {
            self.slot_fingerprint = Some(fingerprint);
            self.resubscribe_proposals();
        }
        self.publish_and_repair();
    }

    fn resubscribe_proposals(&mut self) {
        self.proposal_watch = None;
        self.next_proposal_generation += 1;
        let generation = self.next_proposal_generation;
        debug!(trip_id = %self.trip_id, generation, "subscribing to proposals");
        let subscription = Subscription::forward(
            "proposals",
            self.store.watch_proposals(&self.trip_id),
            self.events.clone(),
            move |result| SessionEvent::Proposals { generation, result },
        );
        self.proposal_watch = Some((generation, subscription));
    }

    fn on_proposals(&mut self, generation: u64, result: Result<Vec<Proposal>, TripStoreError>) {
        if self.proposal_watch.as_ref().map(|(current, _)| *current) != Some(generation) {
            debug!(generation, "dropping proposals from a closed watcher");
            return;
        }
        match result {
            Ok(proposals) => {
                self.proposals.replace_live(proposals);
                self.publish_and_repair();
            }
            Err(err) => {
                warn!(trip_id = %self.trip_id, error = %err, "proposal live query failed");
            }
        }
    }

    fn on_repaired(&mut self, found: Vec<Proposal>, failed: &[ProposalId]) {
        self.repair.forget(failed);
        let absorbed = self.proposals.absorb_repaired(found);
        debug!(
            trip_id = %self.trip_id,
            absorbed,
            failed = failed.len(),
            "orphaned locks repaired"
        );
        if absorbed > 0 {
            self.publish();
        }
    }

    /// Drop repaired proposals no slot is locked to any more.
    ///
    /// Only a settled aggregator holds every slot, so partial merges keep the
    /// overlay as it is.
    fn prune_repaired(&mut self) {
        let Some(aggregator) = self.aggregator.as_ref().filter(|a| a.is_settled()) else {
            return;
        };
        let locked: BTreeSet<ProposalId> = aggregator
            .merged()
            .into_values()
            .filter_map(Slot::locked_proposal_id)
            .cloned()
            .collect();
        let dropped = self.proposals.retain_repaired(&locked);
        if !dropped.is_empty() {
            debug!(trip_id = %self.trip_id, dropped = dropped.len(), "released repaired proposals");
            self.repair.forget(&dropped);
        }
    }

    fn publish(&mut self) {
        self.prune_repaired();
        let merged = self.aggregator.as_ref().map(SlotAggregator::merged);
        let slots = merged.iter().flat_map(|map| map.values().copied());
        let view = rebuild_view(&self.days, slots, self.proposals.iter());
        self.sink.set_days(view);
        self.sink.set_loading(false);
    }

    fn publish_and_repair(&mut self) {
        self.publish();
        let Some(aggregator) = self.aggregator.as_ref() else {
            return;
        };
        self.repair.schedule(
            aggregator.merged().into_values(),
            &self.proposals,
            &self.store,
            &self.events,
        );
    }

    /// Release every subscription and abort reads still in flight.
    fn dispose(&mut self) {
        debug!(trip_id = %self.trip_id, "disposing trip feed session");
        self.repair.cancel();
        self.proposal_watch = None;
        if let Some(aggregator) = self.aggregator.take() {
            aggregator.teardown();
        }
        self.day_watch = None;
        self.trip_watch = None;
        info!(trip_id = %self.trip_id, "trip feed stopped");
    }
}
