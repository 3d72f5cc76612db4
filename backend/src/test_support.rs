//! Test utilities for the tripboard crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or with the
//! `test-support` feature.

use std::time::{Duration, Instant};

/// Poll `condition` until it holds, failing the test after two seconds.
///
/// Live feeds react on spawned tasks, so tests wait for the effect instead of
/// assuming a fixed number of scheduler turns.
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

pub mod cap_fs {
    //! Capability-safe filesystem helpers for tests.
    //!
    //! The crate reads datasets and keys through `cap_std::fs::Dir`; tests
    //! write their fixtures the same way.

    use std::ffi::OsString;
    use std::io;
    use std::path::Path;

    use cap_std::{ambient_authority, fs::Dir};

    /// Write bytes to a file through `cap_std`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tripboard::test_support::cap_fs::write_file;
    ///
    /// let path = std::env::temp_dir().join("tripboard-cap-fs-example.json");
    /// write_file(&path, b"{}\n")?;
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
        let (parent, file_name) = parent_and_file_name(path)?;
        let directory = Dir::open_ambient_dir(parent, ambient_authority())?;
        directory.write(Path::new(&file_name), contents)
    }

    fn parent_and_file_name(path: &Path) -> io::Result<(&Path, OsString)> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "path must include a file name")
        })?;
        Ok((parent, file_name.to_os_string()))
    }
}

pub mod fixtures {
    //! Document builders with valid identifiers.

    use crate::domain::{
        Day, DayId, Proposal, ProposalId, Slot, SlotId, SlotStatus, Trip, TripId, TripRecord,
        TripSlug, UserId,
    };

    /// Parse a user id, panicking on invalid input.
    pub fn user(id: &str) -> UserId {
        UserId::new(id).expect("valid user id")
    }

    /// An open trip named after its slug.
    pub fn trip_record(id: &str, slug: &str) -> TripRecord {
        TripRecord {
            id: TripId::new(id).expect("valid trip id"),
            trip: Trip {
                slug: TripSlug::new(slug).expect("valid slug"),
                name: format!("Trip {slug}"),
                destinations: vec!["Lisbon".to_owned()],
                date_range: None,
                cover_image_url: None,
                tagline: None,
                vibe_tags: Vec::new(),
                owner_id: None,
                member_ids: Vec::new(),
            },
        }
    }

    /// Day `number` of trip `trip`.
    pub fn day(id: &str, trip: &str, number: u32) -> Day {
        Day {
            id: DayId::new(id).expect("valid day id"),
            trip_id: TripId::new(trip).expect("valid trip id"),
            day_number: number,
            city: "Lisbon".to_owned(),
            date: None,
            title: None,
            image_url: None,
        }
    }

    /// Days `prefix-01 ..= prefix-count` numbered in order.
    pub fn days(trip: &str, prefix: &str, count: u32) -> Vec<Day> {
        (1..=count)
            .map(|n| day(&format!("{prefix}-{n:02}"), trip, n))
            .collect()
    }

    /// A slot of `day` with the given status and no lock.
    pub fn slot(id: &str, day: &str, sort_order: i64, status: SlotStatus) -> Slot {
        Slot {
            id: SlotId::new(id).expect("valid slot id"),
            day_id: DayId::new(day).expect("valid day id"),
            time_label: "Morning".to_owned(),
            category: "activity".to_owned(),
            sort_order,
            status,
            locked_proposal_id: None,
        }
    }

    /// A slot of `day` locked to `proposal`.
    pub fn locked_slot(id: &str, day: &str, sort_order: i64, proposal: &str) -> Slot {
        Slot {
            locked_proposal_id: Some(ProposalId::new(proposal).expect("valid proposal id")),
            ..slot(id, day, sort_order, SlotStatus::Locked)
        }
    }

    /// A proposal for `slot`; `trip` is `None` for legacy documents.
    pub fn proposal(id: &str, slot: &str, trip: Option<&str>) -> Proposal {
        Proposal {
            id: ProposalId::new(id).expect("valid proposal id"),
            slot_id: SlotId::new(slot).expect("valid slot id"),
            trip_id: trip.map(|t| TripId::new(t).expect("valid trip id")),
            title: format!("Idea {id}"),
            note: None,
            link: None,
            proposer_id: user("organiser"),
            proposer_name: Some("Organiser".to_owned()),
            votes: Default::default(),
            schedule: None,
            booking: None,
            created_at: None,
        }
    }
}

pub mod scripted {
    //! A [`TripStore`] whose live queries are pushed by hand.
    //!
    //! Every `watch_*` call opens a channel-backed stream and records it.
    //! Tests push result sets with the `emit_*` methods and inspect which
    //! queries are open. A query counts as closed once its stream is dropped.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    use async_trait::async_trait;
    use futures_util::{StreamExt, stream};
    use tokio::sync::{mpsc, watch};

    use crate::domain::membership::DayIdChunk;
    use crate::domain::ports::{LiveQuery, TripStore, TripStoreError};
    use crate::domain::{
        Day, DayId, Proposal, ProposalId, Slot, Trip, TripId, TripRecord, TripSlug, UserId,
    };

    type Item<T> = Result<T, TripStoreError>;

    struct Feed<K, T> {
        key: K,
        tx: mpsc::UnboundedSender<Item<T>>,
    }

    impl<K, T> Feed<K, T> {
        fn is_open(&self) -> bool {
            !self.tx.is_closed()
        }
    }

    struct Script {
        resolution: Item<Option<TripRecord>>,
        resolutions: Vec<(TripSlug, UserId)>,
        proposals_by_id: HashMap<ProposalId, Item<Option<Proposal>>>,
        point_reads: Vec<ProposalId>,
        trips: Vec<Feed<TripId, Option<Trip>>>,
        days: Vec<Feed<TripId, Vec<Day>>>,
        slots: Vec<Feed<DayIdChunk, Vec<Slot>>>,
        proposals: Vec<Feed<TripId, Vec<Proposal>>>,
    }

    impl Default for Script {
        fn default() -> Self {
            Self {
                resolution: Ok(None),
                resolutions: Vec::new(),
                proposals_by_id: HashMap::new(),
                point_reads: Vec::new(),
                trips: Vec::new(),
                days: Vec::new(),
                slots: Vec::new(),
                proposals: Vec::new(),
            }
        }
    }

    fn open_feed<K, T: Send + 'static>(feeds: &mut Vec<Feed<K, T>>, key: K) -> LiveQuery<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        feeds.push(Feed { key, tx });
        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed()
    }

    fn broadcast<K, T>(feeds: &[Feed<K, T>], mut item: impl FnMut(&K) -> Item<T>) -> usize {
        feeds
            .iter()
            .filter(|feed| feed.is_open())
            .filter(|feed| feed.tx.send(item(&feed.key)).is_ok())
            .count()
    }

    /// Hand-driven store double.
    #[derive(Clone)]
    pub struct ScriptedTripStore {
        script: Arc<Mutex<Script>>,
        resolution_gate: Arc<watch::Sender<bool>>,
        point_read_gate: Arc<watch::Sender<bool>>,
    }

    impl Default for ScriptedTripStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ScriptedTripStore {
        /// Store that finds no trip until told otherwise.
        pub fn new() -> Self {
            Self {
                script: Arc::new(Mutex::new(Script::default())),
                resolution_gate: Arc::new(watch::channel(true).0),
                point_read_gate: Arc::new(watch::channel(true).0),
            }
        }

        fn script(&self) -> MutexGuard<'_, Script> {
            self.script.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Resolve every slug to `record`.
        pub fn resolve_to(&self, record: TripRecord) {
            self.script().resolution = Ok(Some(record));
        }

        /// Fail every resolution with `err`.
        pub fn fail_resolution(&self, err: TripStoreError) {
            self.script().resolution = Err(err);
        }

        /// Block resolutions until [`release_resolution`](Self::release_resolution).
        pub fn hold_resolution(&self) {
            self.resolution_gate.send_replace(false);
        }

        /// Let held resolutions complete.
        pub fn release_resolution(&self) {
            self.resolution_gate.send_replace(true);
        }

        /// Slug and caller of every resolution attempt.
        pub fn resolutions(&self) -> Vec<(TripSlug, UserId)> {
            self.script().resolutions.clone()
        }

        /// Answer point reads of `proposal.id` with `proposal`.
        pub fn insert_point_read(&self, proposal: Proposal) {
            self.script()
                .proposals_by_id
                .insert(proposal.id.clone(), Ok(Some(proposal)));
        }

        /// Fail point reads of `id` with `err`.
        pub fn fail_point_read(&self, id: ProposalId, err: TripStoreError) {
            self.script().proposals_by_id.insert(id, Err(err));
        }

        /// Block point reads until [`release_point_reads`](Self::release_point_reads).
        pub fn hold_point_reads(&self) {
            self.point_read_gate.send_replace(false);
        }

        /// Let held point reads complete.
        pub fn release_point_reads(&self) {
            self.point_read_gate.send_replace(true);
        }

        /// Identifiers of every point read issued, in call order.
        pub fn point_reads(&self) -> Vec<ProposalId> {
            self.script().point_reads.clone()
        }

        /// Push a trip snapshot to open trip queries.
        pub fn emit_trip(&self, trip: Option<Trip>) -> usize {
            broadcast(&self.script().trips, |_| Ok(trip.clone()))
        }

        /// Fail open trip queries.
        pub fn fail_trip(&self, err: TripStoreError) -> usize {
            broadcast(&self.script().trips, |_| Err(err.clone()))
        }

        /// Push `days`, filtered per query by trip.
        pub fn emit_days(&self, days: &[Day]) -> usize {
            broadcast(&self.script().days, |trip_id| {
                Ok(days.iter().filter(|d| &d.trip_id == trip_id).cloned().collect())
            })
        }

        /// Fail open day queries.
        pub fn fail_days(&self, err: TripStoreError) -> usize {
            broadcast(&self.script().days, |_| Err(err.clone()))
        }

        /// Push `slots` to every open slot query, filtered by its chunk.
        pub fn emit_slots(&self, slots: &[Slot]) -> usize {
            broadcast(&self.script().slots, |chunk| Ok(filter_slots(chunk, slots)))
        }

        /// Push `slots` to the open slot query at `position` only.
        pub fn emit_slots_to(&self, position: usize, slots: &[Slot]) -> bool {
            let script = self.script();
            let Some(feed) = script.slots.iter().filter(|f| f.is_open()).nth(position) else {
                return false;
            };
            feed.tx.send(Ok(filter_slots(&feed.key, slots))).is_ok()
        }

        /// Fail the open slot query at `position` only.
        pub fn fail_slots_to(&self, position: usize, err: TripStoreError) -> bool {
            let script = self.script();
            let Some(feed) = script.slots.iter().filter(|f| f.is_open()).nth(position) else {
                return false;
            };
            feed.tx.send(Err(err)).is_ok()
        }

        /// Fail every open slot query.
        pub fn fail_slots(&self, err: TripStoreError) -> usize {
            broadcast(&self.script().slots, |_| Err(err.clone()))
        }

        /// Push `proposals`, filtered per query by trip. Legacy proposals
        /// without a trip are never included.
        pub fn emit_proposals(&self, proposals: &[Proposal]) -> usize {
            broadcast(&self.script().proposals, |trip_id| {
                Ok(proposals
                    .iter()
                    .filter(|p| p.trip_id.as_ref() == Some(trip_id))
                    .cloned()
                    .collect())
            })
        }

        /// Fail open proposal queries.
        pub fn fail_proposals(&self, err: TripStoreError) -> usize {
            broadcast(&self.script().proposals, |_| Err(err.clone()))
        }

        /// Slot queries opened so far, open or not.
        pub fn slot_queries_opened(&self) -> usize {
            self.script().slots.len()
        }

        /// Day-id chunks of the slot queries still open, in opening order.
        pub fn open_slot_chunks(&self) -> Vec<Vec<DayId>> {
            self.script()
                .slots
                .iter()
                .filter(|f| f.is_open())
                .map(|f| f.key.ids().to_vec())
                .collect()
        }

        /// Proposal queries opened so far, open or not.
        pub fn proposal_queries_opened(&self) -> usize {
            self.script().proposals.len()
        }

        /// Proposal queries still open.
        pub fn open_proposal_queries(&self) -> usize {
            self.script().proposals.iter().filter(|f| f.is_open()).count()
        }

        /// Day queries opened so far.
        pub fn day_queries_opened(&self) -> usize {
            self.script().days.len()
        }

        /// Every live query still open.
        pub fn open_query_count(&self) -> usize {
            let script = self.script();
            script.trips.iter().filter(|f| f.is_open()).count()
                + script.days.iter().filter(|f| f.is_open()).count()
                + script.slots.iter().filter(|f| f.is_open()).count()
                + script.proposals.iter().filter(|f| f.is_open()).count()
        }
    }

    fn filter_slots(chunk: &DayIdChunk, slots: &[Slot]) -> Vec<Slot> {
        slots
            .iter()
            .filter(|slot| chunk.contains(&slot.day_id))
            .cloned()
            .collect()
    }

    async fn pass(gate: &watch::Sender<bool>) {
        let mut rx = gate.subscribe();
        if rx.wait_for(|open| *open).await.is_err() {
            tracing::debug!("scripted gate dropped while closed");
        }
    }

    #[async_trait]
    impl TripStore for ScriptedTripStore {
        async fn find_trip_by_slug(
            &self,
            slug: &TripSlug,
            caller: &UserId,
        ) -> Result<Option<TripRecord>, TripStoreError> {
            self.script()
                .resolutions
                .push((slug.clone(), caller.clone()));
            pass(&self.resolution_gate).await;
            self.script().resolution.clone()
        }

        async fn get_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>, TripStoreError> {
            self.script().point_reads.push(id.clone());
            pass(&self.point_read_gate).await;
            self.script()
                .proposals_by_id
                .get(id)
                .cloned()
                .unwrap_or(Ok(None))
        }

        fn watch_trip(&self, trip_id: &TripId) -> LiveQuery<Option<Trip>> {
            open_feed(&mut self.script().trips, trip_id.clone())
        }

        fn watch_days(&self, trip_id: &TripId) -> LiveQuery<Vec<Day>> {
            open_feed(&mut self.script().days, trip_id.clone())
        }

        fn watch_slots(&self, chunk: &DayIdChunk) -> LiveQuery<Vec<Slot>> {
            open_feed(&mut self.script().slots, chunk.clone())
        }

        fn watch_proposals(&self, trip_id: &TripId) -> LiveQuery<Vec<Proposal>> {
            open_feed(&mut self.script().proposals, trip_id.clone())
        }
    }
}

pub mod recording {
    //! A [`TripViewSink`] that records every call.

    use std::sync::{Mutex, MutexGuard, PoisonError};

    use crate::domain::ports::TripViewSink;
    use crate::domain::{DayWithSlots, Error, Trip};

    /// One recorded sink call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SinkCall {
        Trip(Option<Trip>),
        Days(Vec<DayWithSlots>),
        Error(Error),
        Loading(bool),
    }

    /// Sink double for feed tests.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        calls: Mutex<Vec<SinkCall>>,
    }

    impl RecordingSink {
        fn calls_mut(&self) -> MutexGuard<'_, Vec<SinkCall>> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Every call so far, in order.
        pub fn calls(&self) -> Vec<SinkCall> {
            self.calls_mut().clone()
        }

        /// Number of calls so far.
        pub fn len(&self) -> usize {
            self.calls_mut().len()
        }

        /// Return `true` when nothing has been recorded.
        pub fn is_empty(&self) -> bool {
            self.calls_mut().is_empty()
        }

        /// Every `set_days` payload, in order.
        pub fn views(&self) -> Vec<Vec<DayWithSlots>> {
            self.calls_mut()
                .iter()
                .filter_map(|call| match call {
                    SinkCall::Days(days) => Some(days.clone()),
                    _ => None,
                })
                .collect()
        }

        /// The most recent `set_days` payload.
        pub fn last_view(&self) -> Option<Vec<DayWithSlots>> {
            self.views().pop()
        }

        /// Every reported error.
        pub fn errors(&self) -> Vec<Error> {
            self.calls_mut()
                .iter()
                .filter_map(|call| match call {
                    SinkCall::Error(err) => Some(err.clone()),
                    _ => None,
                })
                .collect()
        }

        /// The most recent loading flag.
        pub fn loading(&self) -> Option<bool> {
            self.calls_mut().iter().rev().find_map(|call| match call {
                SinkCall::Loading(flag) => Some(*flag),
                _ => None,
            })
        }

        /// The most recent trip snapshot.
        pub fn last_trip(&self) -> Option<Option<Trip>> {
            self.calls_mut().iter().rev().find_map(|call| match call {
                SinkCall::Trip(trip) => Some(trip.clone()),
                _ => None,
            })
        }
    }

    impl TripViewSink for RecordingSink {
        fn set_trip(&self, trip: Option<Trip>) {
            self.calls_mut().push(SinkCall::Trip(trip));
        }

        fn set_days(&self, days: Vec<DayWithSlots>) {
            self.calls_mut().push(SinkCall::Days(days));
        }

        fn set_error(&self, error: &Error) {
            self.calls_mut().push(SinkCall::Error(error.clone()));
        }

        fn set_loading(&self, loading: bool) {
            self.calls_mut().push(SinkCall::Loading(loading));
        }
    }
}
