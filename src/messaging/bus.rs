use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, warn};

use super::SynthMessage;
use crate::core::instrument::InstrumentId;
use crate::core::oscillator::clamp_scale_position;
use crate::core::sequencer::Sequencer;
use crate::core::synth::AudioEngine;

/// What one call to [`MessageBus::process_messages`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessOutcome {
    pub handled: usize,
    pub quit: bool,
}

/// MessageBus carries commands from input threads to the control loop,
/// which applies them to the sequencer and the shared engine
pub struct MessageBus {
    sender: Sender<SynthMessage>,
    receiver: Receiver<SynthMessage>,
    engine: Arc<AudioEngine>,
}

impl MessageBus {
    pub fn new(engine: Arc<AudioEngine>) -> Self {
        let (sender, receiver) = unbounded();

        MessageBus {
            sender,
            receiver,
            engine,
        }
    }

    /// Get a sender that can be cloned and handed to input threads
    pub fn sender(&self) -> Sender<SynthMessage> {
        self.sender.clone()
    }

    pub fn send(&self, msg: SynthMessage) -> Result<(), crossbeam_channel::SendError<SynthMessage>> {
        self.sender.send(msg)
    }

    /// Apply up to `max_messages` pending messages. `now` stamps key
    /// presses. Stops early after a quit request.
    pub fn process_messages(
        &self,
        sequencer: &mut Sequencer,
        now: f64,
        max_messages: usize,
    ) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();

        // Limit messages per frame
        while outcome.handled < max_messages {
            let Ok(msg) = self.receiver.try_recv() else {
                break;
            };
            outcome.handled += 1;

            if !self.handle_message(msg, sequencer, now) {
                outcome.quit = true;
                break;
            }
        }

        outcome
    }

    /// Returns false on quit.
    fn handle_message(&self, msg: SynthMessage, sequencer: &mut Sequencer, now: f64) -> bool {
        let instruments = self.engine.instruments();

        match msg {
            SynthMessage::SetMood(mood) => {
                debug!("mood -> {mood}");
                self.engine.set_mood(mood);
            }
            SynthMessage::KeyDown {
                instrument,
                scale_position,
            } => self.key(instrument, scale_position, true, now),
            SynthMessage::KeyUp {
                instrument,
                scale_position,
            } => self.key(instrument, scale_position, false, now),
            SynthMessage::PlayBar(instrument, pattern) => {
                let result = instruments
                    .check(instrument)
                    .and_then(|id| sequencer.play_bar(id, &pattern));
                if let Err(e) = result {
                    warn!("play bar rejected: {e}");
                }
            }
            SynthMessage::SetGroove(groove) => {
                if let Err(e) = groove.apply(sequencer, instruments) {
                    warn!("groove {} not applied: {e}", groove.name());
                }
            }
            SynthMessage::Quit => return false,
        }

        true
    }

    fn key(&self, instrument: InstrumentId, scale_position: i32, held: bool, now: f64) {
        if clamp_scale_position(scale_position) != scale_position {
            warn!("key {scale_position} out of range, ignored");
            return;
        }
        match self.engine.instruments().check(instrument) {
            Ok(id) => self.engine.update_key(id, scale_position, held, now),
            Err(e) => warn!("key ignored: {e}"),
        }
    }

    /// Public method to try to receive a message
    pub fn try_receive(&self) -> Result<SynthMessage, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instrument::{InstrumentBank, InstrumentKind};

    fn setup() -> (MessageBus, Sequencer, Arc<AudioEngine>) {
        let engine = Arc::new(AudioEngine::new(InstrumentBank::standard(), 10));
        let bus = MessageBus::new(Arc::clone(&engine));
        (bus, Sequencer::with_tempo(120.0).unwrap(), engine)
    }

    #[test]
    fn applies_mood_keys_and_bars() {
        let (bus, mut seq, engine) = setup();
        let keys = engine.instruments().find(InstrumentKind::Keys).unwrap();
        let kick = engine.instruments().find(InstrumentKind::Kick).unwrap();

        let tx = bus.sender();
        tx.send(SynthMessage::SetMood(72)).unwrap();
        tx.send(SynthMessage::KeyDown { instrument: keys, scale_position: 3 }).unwrap();
        tx.send(SynthMessage::PlayBar(kick, "A...A...A...A...".into())).unwrap();

        let outcome = bus.process_messages(&mut seq, 2.0, 16);
        assert_eq!(outcome, ProcessOutcome { handled: 3, quit: false });
        assert_eq!(engine.mood(), 72);
        assert_eq!(engine.note_count(), 1);
        assert_eq!(engine.notes()[0].on_time, 2.0);
        assert!(seq.channel(kick).is_some());

        tx.send(SynthMessage::KeyUp { instrument: keys, scale_position: 3 }).unwrap();
        bus.process_messages(&mut seq, 2.5, 16);
        assert_eq!(engine.notes()[0].off_time, 2.5);
    }

    #[test]
    fn bad_commands_are_dropped() {
        let (bus, mut seq, engine) = setup();
        let kick = engine.instruments().find(InstrumentKind::Kick).unwrap();

        bus.send(SynthMessage::PlayBar(kick, "A...".into())).unwrap();
        bus.send(SynthMessage::PlayBar(InstrumentId(99), "A...A...A...A...".into())).unwrap();
        bus.send(SynthMessage::KeyDown { instrument: InstrumentId(99), scale_position: 0 }).unwrap();

        let outcome = bus.process_messages(&mut seq, 1.0, 16);
        assert_eq!(outcome.handled, 3);
        assert!(seq.channels().is_empty());
        assert_eq!(engine.note_count(), 0);
    }

    #[test]
    fn cap_leaves_the_rest_queued() {
        let (bus, mut seq, engine) = setup();
        for mood in 0..5 {
            bus.send(SynthMessage::SetMood(mood)).unwrap();
        }

        assert_eq!(bus.process_messages(&mut seq, 0.0, 2).handled, 2);
        assert_eq!(engine.mood(), 1);
        assert_eq!(bus.process_messages(&mut seq, 0.0, 10).handled, 3);
        assert_eq!(engine.mood(), 4);
    }

    #[test]
    fn quit_stops_processing() {
        let (bus, mut seq, engine) = setup();
        bus.send(SynthMessage::Quit).unwrap();
        bus.send(SynthMessage::SetMood(50)).unwrap();

        let outcome = bus.process_messages(&mut seq, 0.0, 10);
        assert!(outcome.quit);
        assert_eq!(outcome.handled, 1);
        assert_eq!(engine.mood(), 10);
        assert_eq!(bus.try_receive().unwrap(), SynthMessage::SetMood(50));
    }

    #[test]
    fn keys_out_of_range_are_dropped() {
        let (bus, mut seq, engine) = setup();
        let keys = engine.instruments().find(InstrumentKind::Keys).unwrap();

        bus.send(SynthMessage::KeyDown { instrument: keys, scale_position: i32::MAX }).unwrap();
        bus.send(SynthMessage::KeyDown { instrument: keys, scale_position: i32::MIN }).unwrap();
        bus.send(SynthMessage::KeyUp { instrument: keys, scale_position: i32::MAX }).unwrap();
        bus.send(SynthMessage::KeyDown { instrument: keys, scale_position: -24 }).unwrap();

        assert_eq!(bus.process_messages(&mut seq, 1.0, 16).handled, 4);
        assert_eq!(engine.note_count(), 1);
        assert_eq!(engine.notes()[0].scale_position, -24);
    }
}
