//! Hit sources consumed by the run state machine.
//!
//! Transports (serial ports, MIDI devices, keyboards) live outside the
//! engine. They either bump a shared [`HitCounter`] or push
//! [`InputMessage`]s into a channel; the engine drains whatever is pending
//! once per tick on its own thread.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// Byte markers that hardware drum triggers emit on a hit.
const SERIAL_HIT_MARKERS: &[u8] = b"JH1";
/// Words some trigger firmwares print instead of a marker byte.
const SERIAL_HIT_WORDS: &[&str] = &["hit", "bang", "pad"];

/// Anything that can report "a hit happened" to the engine.
pub trait HitSource {
    /// Called once at the start of every tick with the run clock.
    fn begin_tick(&mut self, _now: f64) {}

    /// Removes one pending hit and returns `true`, or returns `false` when
    /// nothing is pending.
    fn consume_hit(&mut self) -> bool;
}

impl<S: HitSource + ?Sized> HitSource for Box<S> {
    fn begin_tick(&mut self, now: f64) {
        (**self).begin_tick(now);
    }

    fn consume_hit(&mut self) -> bool {
        (**self).consume_hit()
    }
}

/// Keys a keyboard transport may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Up,
    Enter,
    Escape,
    Char(char),
}

impl Key {
    /// The keyboard fallback maps Space, Up and W to hits.
    pub fn is_hit_key(self) -> bool {
        matches!(self, Key::Space | Key::Up | Key::Char('w' | 'W'))
    }
}

/// Raw messages produced by the supported transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    ControlChange { controller: u8, value: u8 },
    KeyDown(Key),
    SerialBytes(Vec<u8>),
}

impl InputMessage {
    /// Projects the message down to the only fact the engine cares about.
    pub fn is_hit(&self) -> bool {
        match self {
            // Note-on with zero velocity is a note-off by MIDI convention.
            InputMessage::NoteOn { velocity, .. } => *velocity > 0,
            InputMessage::NoteOff { .. } | InputMessage::ControlChange { .. } => false,
            InputMessage::KeyDown(key) => key.is_hit_key(),
            InputMessage::SerialBytes(bytes) => is_serial_hit(bytes),
        }
    }
}

/// Sniffs a chunk of serial data for a hit marker.
pub fn is_serial_hit(data: &[u8]) -> bool {
    if data.iter().any(|byte| SERIAL_HIT_MARKERS.contains(byte)) {
        return true;
    }
    let text = String::from_utf8_lossy(data).to_lowercase();
    SERIAL_HIT_WORDS.iter().any(|word| text.contains(word))
}

/// Pending-hit counter shared with producer threads.
///
/// Producers only increment through a [`HitProducer`]; the engine is the
/// single consumer and only decrements.
#[derive(Debug, Default)]
pub struct HitCounter {
    pending: Arc<AtomicUsize>,
}

/// Cloneable producer half of a [`HitCounter`].
#[derive(Debug, Clone)]
pub struct HitProducer {
    pending: Arc<AtomicUsize>,
}

impl HitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn producer(&self) -> HitProducer {
        HitProducer {
            pending: Arc::clone(&self.pending),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl HitProducer {
    pub fn record_hit(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    /// Forwards the message as a hit if it projects to one.
    pub fn record_message(&self, message: &InputMessage) -> bool {
        let hit = message.is_hit();
        if hit {
            self.record_hit();
        }
        hit
    }
}

impl HitSource for HitCounter {
    fn consume_hit(&mut self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Channel-backed source fed with raw [`InputMessage`]s.
#[derive(Debug)]
pub struct ChannelHitSource {
    receiver: Receiver<InputMessage>,
}

impl ChannelHitSource {
    /// Creates an unbounded channel and returns the sender for the transport.
    pub fn unbounded() -> (Sender<InputMessage>, Self) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (sender, Self { receiver })
    }

    pub fn from_receiver(receiver: Receiver<InputMessage>) -> Self {
        Self { receiver }
    }
}

impl HitSource for ChannelHitSource {
    /// Skips non-hit messages until a hit is found or the channel is drained.
    fn consume_hit(&mut self) -> bool {
        loop {
            match self.receiver.try_recv() {
                Ok(message) if message.is_hit() => return true,
                Ok(message) => tracing::trace!(?message, "ignoring non-hit input"),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return false,
            }
        }
    }
}

/// Replays a recorded trace of hit times.
///
/// Hits become pending once the run clock reaches them, which makes a whole
/// run reproducible from a list of timestamps.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHits {
    times: Vec<f64>,
    next: usize,
    pending: usize,
}

impl ScriptedHits {
    pub fn new(mut times: Vec<f64>) -> Self {
        times.sort_by(f64::total_cmp);
        Self {
            times,
            next: 0,
            pending: 0,
        }
    }

    /// Number of scripted hits not yet consumed.
    pub fn remaining(&self) -> usize {
        self.times.len() - self.next + self.pending
    }

    /// Starts the trace over, for a retried run.
    pub fn rewind(&mut self) {
        self.next = 0;
        self.pending = 0;
    }
}

impl HitSource for ScriptedHits {
    fn begin_tick(&mut self, now: f64) {
        while self.times.get(self.next).is_some_and(|time| *time <= now) {
            self.next += 1;
            self.pending += 1;
        }
    }

    fn consume_hit(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }
}

/// Polls several sources in order, like a drum wired to serial with a MIDI
/// pad and a keyboard as fallbacks.
#[derive(Default)]
pub struct HitAggregator {
    sources: Vec<Box<dyn HitSource + Send>>,
}

impl HitAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl HitSource + Send + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl HitSource for HitAggregator {
    fn begin_tick(&mut self, now: f64) {
        for source in &mut self.sources {
            source.begin_tick(now);
        }
    }

    fn consume_hit(&mut self) -> bool {
        self.sources.iter_mut().any(|source| source.consume_hit())
    }
}

impl std::fmt::Debug for HitAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HitAggregator")
            .field("sources", &self.sources.len())
            .finish()
    }
}

/// Source for runs without any transport. Never yields a hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHitSource;

impl HitSource for NullHitSource {
    fn consume_hit(&mut self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_messages_to_hits() {
        assert!(InputMessage::NoteOn { note: 36, velocity: 90 }.is_hit());
        assert!(!InputMessage::NoteOn { note: 36, velocity: 0 }.is_hit());
        assert!(!InputMessage::NoteOff { note: 36 }.is_hit());
        assert!(!InputMessage::ControlChange { controller: 4, value: 127 }.is_hit());
        assert!(InputMessage::KeyDown(Key::Space).is_hit());
        assert!(InputMessage::KeyDown(Key::Char('W')).is_hit());
        assert!(!InputMessage::KeyDown(Key::Enter).is_hit());
    }

    #[test]
    fn sniffs_serial_payloads() {
        assert!(is_serial_hit(b"J"));
        assert!(is_serial_hit(b"\x00\x01 1\r\n"));
        assert!(is_serial_hit(b"PAD 3\r\n"));
        assert!(is_serial_hit(b"Bang!"));
        assert!(!is_serial_hit(b"idle\r\n"));
        assert!(!is_serial_hit(b""));
    }

    #[test]
    fn counter_drains_one_hit_per_call() {
        let mut counter = HitCounter::new();
        let producer = counter.producer();
        producer.record_hit();
        producer.record_hit();
        assert!(!producer.record_message(&InputMessage::NoteOff { note: 1 }));

        assert_eq!(counter.pending(), 2);
        assert!(counter.consume_hit());
        assert!(counter.consume_hit());
        assert!(!counter.consume_hit());
        assert_eq!(counter.pending(), 0);
    }

    #[test]
    fn counter_accepts_hits_from_other_threads() {
        let mut counter = HitCounter::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let producer = counter.producer();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        producer.record_hit();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut drained = 0;
        while counter.consume_hit() {
            drained += 1;
        }
        assert_eq!(drained, 100);
    }

    #[test]
    fn channel_skips_non_hit_messages() {
        let (sender, mut source) = ChannelHitSource::unbounded();
        sender.send(InputMessage::NoteOff { note: 38 }).unwrap();
        sender.send(InputMessage::NoteOn { note: 38, velocity: 70 }).unwrap();
        sender.send(InputMessage::KeyDown(Key::Escape)).unwrap();

        assert!(source.consume_hit());
        assert!(!source.consume_hit());

        drop(sender);
        assert!(!source.consume_hit());
    }

    #[test]
    fn scripted_hits_release_on_schedule() {
        let mut hits = ScriptedHits::new(vec![1.0, 0.5, 1.0]);
        hits.begin_tick(0.4);
        assert!(!hits.consume_hit());

        hits.begin_tick(0.5);
        assert!(hits.consume_hit());
        assert!(!hits.consume_hit());

        hits.begin_tick(1.2);
        assert!(hits.consume_hit());
        assert!(hits.consume_hit());
        assert!(!hits.consume_hit());
        assert_eq!(hits.remaining(), 0);

        hits.rewind();
        assert_eq!(hits.remaining(), 3);
    }

    #[test]
    fn aggregator_polls_sources_in_order() {
        let counter = HitCounter::new();
        let producer = counter.producer();
        let mut aggregator = HitAggregator::new()
            .with_source(NullHitSource)
            .with_source(ScriptedHits::new(vec![0.0]))
            .with_source(counter);
        producer.record_hit();

        aggregator.begin_tick(0.0);
        assert_eq!(aggregator.len(), 3);
        assert!(aggregator.consume_hit());
        assert!(aggregator.consume_hit());
        assert!(!aggregator.consume_hit());
    }
}
