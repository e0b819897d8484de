//! The protocol engine for one connection.
//!
//! A [`Session`] is driven by the host calling [`Session::tick`] with the
//! current time and whatever bytes have arrived. Everything that should happen
//! in response (bytes to write, attribute updates, failure) is handed back
//! through the `emit` callback as an [`Effect`].

mod queue;
mod state;
mod supervisor;

pub use queue::{SetQueue, SetQueueEntry, SET_QUEUE_CAPACITY};
pub use state::{Action, Event, ProtocolState};
pub use supervisor::{PendingCommand, Supervisor};

use core::mem;

use heapless::Vec;
use log::{debug, error, warn};

use crate::climate::{ClimateAttributes, ClimateCall};
use crate::config::{elapsed, Config};
use crate::error::{CommandQueueFull, FrameError, InitializationError};
use crate::protocol::{
    parse_or_warn, resync, Command, Frame, FrameData, HorizontalSwing, Properties,
    VerticalSwing, MAX_FRAME_LEN,
};

/// Room for two full frames, so a frame is never split by a full buffer.
const RX_BUFFER_LEN: usize = 2 * MAX_FRAME_LEN;

/// Something the host has to act on.
#[derive(Debug, PartialEq)]
pub enum Effect<'a> {
    /// Write these bytes to the unit.
    Transmit(&'a [u8]),
    /// A report or poll response was decoded.
    AttributesChanged(&'a ClimateAttributes),
    /// The session gave up. Reconnect or reboot to try again.
    Failed(InitializationError),
}

pub struct Session {
    config: Config,
    boot: u32,
    state: ProtocolState,
    /// Counter for commands we originate.
    transmit_count: u8,
    /// Counter of the last frame the unit sent, echoed in our replies.
    receive_count: u8,
    supervisor: Supervisor,
    queue: SetQueue,
    attributes: ClimateAttributes,
    rx: Vec<u8, RX_BUFFER_LEN>,
    last_poll: u32,
    fault: Option<InitializationError>,
}

impl Session {
    /// Start a session at boot time `now`.
    pub fn new(config: Config, now: u32) -> Self {
        Self {
            config,
            boot: now,
            state: ProtocolState::Initializing { since: now },
            transmit_count: 0,
            receive_count: 0,
            supervisor: Supervisor::new(config.response_timeout),
            queue: SetQueue::new(),
            attributes: ClimateAttributes::default(),
            rx: Vec::new(),
            last_poll: now,
            fault: None,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn attributes(&self) -> &ClimateAttributes {
        &self.attributes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set once the session has failed; stays set.
    pub fn fault(&self) -> Option<InitializationError> {
        self.fault
    }

    pub fn pending(&self) -> Option<&PendingCommand> {
        self.supervisor.pending()
    }

    pub fn queued(&self) -> &[SetQueueEntry] {
        self.queue.entries()
    }

    /// Queue the writes for `call`. They go out together with the next set
    /// command. Nothing is queued if they don't all fit.
    pub fn control(&mut self, call: &ClimateCall) -> Result<(), CommandQueueFull> {
        let writes = call.writes();
        self.queue.set_all(&writes)
    }

    pub fn set_vertical_swing(&mut self, swing: VerticalSwing) -> Result<(), CommandQueueFull> {
        self.control(&ClimateCall::new().swing_vertical(swing))
    }

    pub fn set_horizontal_swing(&mut self, swing: HorizontalSwing) -> Result<(), CommandQueueFull> {
        self.control(&ClimateCall::new().swing_horizontal(swing))
    }

    pub fn set_nanoex(&mut self, on: bool) -> Result<(), CommandQueueFull> {
        self.control(&ClimateCall::new().nanoex(on))
    }

    /// Run the engine once: take in `incoming`, check timers, send what's due.
    pub fn tick<F>(&mut self, now: u32, incoming: &[u8], mut emit: F)
    where
        F: FnMut(Effect<'_>),
    {
        if self.state.is_failed() {
            return;
        }

        // Past the deadline nothing received may be acted on.
        if self.state.is_initializing()
            && elapsed(now, self.boot) >= self.config.init_fail_timeout
        {
            self.advance(Event::Deadline, now, &mut emit);
            return;
        }

        self.receive(now, incoming, &mut emit);

        self.advance(Event::Tick(now), now, &mut emit);

        if self.state.is_ready() && self.supervisor.is_idle() {
            self.run_cycle(now, &mut emit);
        }

        if let Some(packet) = self.supervisor.resend_due(now) {
            emit(Effect::Transmit(&packet));
        }
    }

    fn receive<F: FnMut(Effect<'_>)>(&mut self, now: u32, mut incoming: &[u8], emit: &mut F) {
        while !incoming.is_empty() {
            let room = RX_BUFFER_LEN - self.rx.len();
            if room == 0 {
                warn!("Receive buffer full, discarding {} bytes", self.rx.len());
                self.rx.clear();
                continue;
            }
            let (chunk, rest) = incoming.split_at(room.min(incoming.len()));
            let extended = self.rx.extend_from_slice(chunk);
            debug_assert!(extended.is_ok(), "chunk larger than the room left");
            incoming = rest;
            self.process_frames(now, emit);
        }
    }

    fn process_frames<F: FnMut(Effect<'_>)>(&mut self, now: u32, emit: &mut F) {
        let mut buffer = mem::take(&mut self.rx);
        let mut start = 0;

        loop {
            let skip = resync(&buffer[start..]);
            if skip > 0 {
                debug!("Skipping {} bytes of line noise", skip);
                start += skip;
            }
            match Frame::parse(&buffer[start..]) {
                Ok((frame, used)) => {
                    start += used;
                    self.handle_frame(&frame, now, emit);
                    if self.state.is_failed() {
                        break;
                    }
                }
                Err(FrameError::Incomplete) => break,
                Err(FrameError::Corrupt) => {
                    warn!("Dropping corrupt frame");
                    start += 1;
                }
            }
        }

        let remaining = buffer.len() - start;
        buffer.copy_within(start.., 0);
        buffer.truncate(remaining);
        self.rx = buffer;
    }

    fn handle_frame<F: FnMut(Effect<'_>)>(&mut self, frame: &Frame<'_>, now: u32, emit: &mut F) {
        self.receive_count = frame.counter;
        let data = match parse_or_warn(frame) {
            Some(data) => data,
            None => return,
        };

        match data {
            FrameData::Ping => {
                debug!("Answering ping");
                self.send(Command::PingReply, now, emit);
                return;
            }
            FrameData::Report(properties) => {
                if self.state.is_ready() {
                    debug!("Received report");
                    self.send(Command::ReportAck, now, emit);
                    self.update_attributes(&properties, emit);
                } else {
                    debug!("Ignoring report in state {:?}", self.state);
                }
                return;
            }
            _ => {}
        }

        match self.supervisor.answer(frame.command()) {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!("Received {} with nothing outstanding", frame.command());
                return;
            }
            Err(e) => {
                warn!("{}", e);
                return;
            }
        }

        if let FrameData::PollResponse(properties) = data {
            debug!("Received poll response");
            self.update_attributes(&properties, emit);
        }
        self.advance(Event::Answered(now), now, emit);
    }

    fn update_attributes<F: FnMut(Effect<'_>)>(&mut self, properties: &Properties<'_>, emit: &mut F) {
        if properties.is_empty() {
            debug!("No properties to apply");
            return;
        }
        self.attributes = self.attributes.merged(properties);
        emit(Effect::AttributesChanged(&self.attributes));
    }

    fn advance<F: FnMut(Effect<'_>)>(&mut self, event: Event, now: u32, emit: &mut F) {
        let (next, action) = self.state.next(event, &self.config);
        if next != self.state {
            debug!("{:?} -> {:?}", self.state, next);
            if next.is_ready() {
                self.last_poll = now;
            }
        }
        self.state = next;

        match action {
            Some(Action::Send(command)) => self.send(command, now, emit),
            Some(Action::Fail) => {
                error!(
                    "Handshake did not complete within {}ms, giving up",
                    self.config.init_fail_timeout
                );
                self.supervisor.clear();
                self.fault = Some(InitializationError::Timeout);
                emit(Effect::Failed(InitializationError::Timeout));
            }
            None => {}
        }
    }

    /// Poll when due, or flush queued writes first.
    fn run_cycle<F: FnMut(Effect<'_>)>(&mut self, now: u32, emit: &mut F) {
        if !self.queue.is_empty() {
            debug!("Sending {} queued writes", self.queue.len());
            match self.queue.take_command() {
                Ok(payload) => self.send_tracked(&payload, now, emit),
                Err(e) => error!("Couldn't build set command: {}", e),
            }
        } else if elapsed(now, self.last_poll) >= self.config.poll_interval {
            debug!("Polling");
            self.last_poll = now;
            self.send(Command::Poll, now, emit);
        }
    }

    fn send<F: FnMut(Effect<'_>)>(&mut self, command: Command, now: u32, emit: &mut F) {
        let payload = match command.payload() {
            Some(payload) => payload,
            None => {
                error!("{:?} is not in the command catalog", command);
                return;
            }
        };
        if let Command::Handshake(step) = command {
            debug!("Sending handshake [{}/{}]", step + 1, crate::protocol::HANDSHAKE_STEPS);
        }

        if command.is_reply() {
            match Frame::encode(payload, self.receive_count) {
                Ok(packet) => emit(Effect::Transmit(&packet)),
                Err(e) => error!("Couldn't encode {:?}: {}", command, e),
            }
        } else {
            self.send_tracked(payload, now, emit);
        }
    }

    fn send_tracked<F: FnMut(Effect<'_>)>(&mut self, payload: &[u8], now: u32, emit: &mut F) {
        match self.supervisor.track(payload, self.transmit_count, now) {
            Ok(packet) => {
                self.transmit_count = self.transmit_count.wrapping_add(1);
                emit(Effect::Transmit(&packet));
            }
            Err(e) => error!("Couldn't encode command: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CommandId, Mode, Packet};
    use std::vec::Vec;

    #[derive(Debug, PartialEq)]
    enum Seen {
        Transmit(Packet),
        Changed(ClimateAttributes),
        Failed(InitializationError),
    }

    fn tick(session: &mut Session, now: u32, incoming: &[u8]) -> Vec<Seen> {
        let mut seen = Vec::new();
        session.tick(now, incoming, |effect| {
            seen.push(match effect {
                Effect::Transmit(bytes) => Seen::Transmit(Packet::from_slice(bytes).unwrap()),
                Effect::AttributesChanged(a) => Seen::Changed(*a),
                Effect::Failed(e) => Seen::Failed(e),
            })
        });
        seen
    }

    fn sent(seen: &[Seen]) -> Vec<&Packet> {
        seen.iter()
            .filter_map(|s| match s {
                Seen::Transmit(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn reply_to(packet: &Packet, data: &[u8], counter: u8) -> Packet {
        let request = CommandId(u16::from_be_bytes([packet[2], packet[3]]));
        let id = request.response().0.to_be_bytes();
        let len = (data.len() as u16).to_be_bytes();
        let mut payload: heapless::Vec<u8, 128> = heapless::Vec::new();
        payload.extend_from_slice(&[id[0], id[1], len[0], len[1]]).unwrap();
        payload.extend_from_slice(data).unwrap();
        Frame::encode(&payload, counter).unwrap()
    }

    /// Walk a session all the way to `Ready`, returning the time.
    fn ready(session: &mut Session) -> u32 {
        let mut now = session.config().init_timeout;
        let mut last = sent(&tick(session, now, &[]))[0].clone();
        loop {
            let response = reply_to(&last, &[0x01, 0x01, 0x30, 0x01, 0x00], 0x40);
            now += 10;
            let seen = tick(session, now, &response);
            if session.state().is_ready() {
                return now;
            }
            if let Some(p) = sent(&seen).first() {
                last = (*p).clone();
                continue;
            }
            // Waiting on a timer.
            loop {
                now += 100;
                let seen = tick(session, now, &[]);
                if let Some(p) = sent(&seen).first() {
                    last = (*p).clone();
                    break;
                }
            }
        }
    }

    #[test]
    fn stays_quiet_until_init_timeout() {
        let mut session = Session::new(Config::default(), 0);
        assert!(tick(&mut session, 9_999, &[]).is_empty());

        let seen = tick(&mut session, 10_000, &[]);
        assert_eq!(sent(&seen).len(), 1);
        assert_eq!(&sent(&seen)[0][..], &Frame::encode(&[0x00, 0x06, 0x00, 0x00], 0).unwrap()[..]);
        assert_eq!(session.state(), ProtocolState::Handshake { step: 0 });
    }

    #[test]
    fn handshake_reaches_ready() {
        let mut session = Session::new(Config::default(), 0);
        let now = ready(&mut session);

        assert_eq!(session.state(), ProtocolState::Ready);
        assert!(session.pending().is_none());
        assert!(now < Config::default().init_fail_timeout);
    }

    #[test]
    fn unanswered_command_is_resent_with_same_counter() {
        let mut session = Session::new(Config::default(), 0);
        let first = tick(&mut session, 10_000, &[]);
        assert!(tick(&mut session, 10_599, &[]).is_empty());

        let again = tick(&mut session, 10_600, &[]);
        assert_eq!(sent(&again), sent(&first));
    }

    #[test]
    fn wrong_response_does_not_advance() {
        let mut session = Session::new(Config::default(), 0);
        tick(&mut session, 10_000, &[]);

        let wrong = Frame::encode(&[0x00, 0x0a, 0x00, 0x00], 0).unwrap();
        assert!(tick(&mut session, 10_100, &wrong).is_empty());
        assert_eq!(session.state(), ProtocolState::Handshake { step: 0 });
        assert!(session.pending().is_some());
    }

    #[test]
    fn fails_after_deadline_and_goes_silent() {
        let mut session = Session::new(Config::default(), 0);
        tick(&mut session, 10_000, &[]);

        let seen = tick(&mut session, 60_000, &[]);
        assert_eq!(seen, [Seen::Failed(InitializationError::Timeout)]);
        assert_eq!(session.state(), ProtocolState::Failed);
        assert_eq!(session.fault(), Some(InitializationError::Timeout));

        let ping = Frame::encode(&[0x01, 0x80, 0x00, 0x00], 3).unwrap();
        assert!(tick(&mut session, 60_600, &ping).is_empty());
        assert!(tick(&mut session, 120_000, &[]).is_empty());
    }

    #[test]
    fn traffic_at_the_deadline_is_not_answered() {
        let mut session = Session::new(Config::default(), 0);
        tick(&mut session, 10_000, &[]);

        let ping = Frame::encode(&[0x01, 0x80, 0x00, 0x00], 3).unwrap();
        let response = Frame::encode(&[0x00, 0x07, 0x00, 0x00], 4).unwrap();
        let mut incoming = std::vec::Vec::from(&ping[..]);
        incoming.extend_from_slice(&response);

        let seen = tick(&mut session, 60_000, &incoming);
        assert_eq!(seen, [Seen::Failed(InitializationError::Timeout)]);
        assert_eq!(session.state(), ProtocolState::Failed);
    }

    #[test]
    fn pings_do_not_restart_the_quiet_period() {
        let mut session = Session::new(Config::default(), 0);
        let ping = Frame::encode(&[0x01, 0x80, 0x00, 0x00], 0x01).unwrap();
        assert_eq!(sent(&tick(&mut session, 9_000, &ping)).len(), 1);

        let seen = tick(&mut session, 10_000, &[]);
        assert_eq!(session.state(), ProtocolState::Handshake { step: 0 });
        assert_eq!(&sent(&seen)[0][2..4], &[0x00, 0x06]);
    }

    #[test]
    fn pings_are_answered_with_their_counter() {
        let mut session = Session::new(Config::default(), 0);
        let ping = Frame::encode(&[0x01, 0x80, 0x00, 0x00], 0x33).unwrap();

        let seen = tick(&mut session, 5, &ping);
        let expected = Frame::encode(&[0x01, 0x81, 0x00, 0x03, 0x00, 0x11, 0x12], 0x33).unwrap();
        assert_eq!(seen, [Seen::Transmit(expected)]);
        assert!(session.pending().is_none());
    }

    #[test]
    fn report_updates_mode_and_is_acknowledged_once() {
        let mut session = Session::new(Config::default(), 0);
        let now = ready(&mut session);

        let report = Frame::encode(
            &[0x10, 0x0a, 0x00, 0x09, 0x01, 0x01, 0x30, 0x01, 0x01, 0x00, 0xb0, 0x01, 0x44],
            0x51,
        )
        .unwrap();
        let seen = tick(&mut session, now + 10, &report);

        let ack = Frame::encode(&[0x10, 0x8a, 0x00, 0x04, 0x00, 0x01, 0x30, 0x01], 0x51).unwrap();
        assert_eq!(sent(&seen), [&ack]);
        assert_eq!(session.attributes().mode, Mode::Dry);
        assert!(seen.iter().any(|s| matches!(s, Seen::Changed(a) if a.mode == Mode::Dry)));
    }

    #[test]
    fn queued_writes_go_out_as_one_set_command() {
        let mut session = Session::new(Config::default(), 0);
        let now = ready(&mut session);

        session.control(&ClimateCall::new().mode(Mode::Cool)).unwrap();
        session.set_nanoex(true).unwrap();
        session.control(&ClimateCall::new().mode(Mode::Heat)).unwrap();
        assert_eq!(session.queued().len(), 3);

        let seen = tick(&mut session, now + 10, &[]);
        let packets = sent(&seen);
        assert_eq!(packets.len(), 1);
        assert_eq!(
            &packets[0][2..packets[0].len() - 1],
            &[
                0x10, 0x08, 0x00, 0x11,
                0x01, 0x01, 0x30, 0x01, 0x03,
                0x00, 0xb0, 0x01, 0x43,
                0x00, 0x80, 0x01, 0x30,
                0x02, 0x33, 0x01, 0x41,
            ]
        );
        assert!(session.queued().is_empty());

        // Nothing else goes out until the set is acknowledged.
        session.control(&ClimateCall::new().nanoex(false)).unwrap();
        assert!(tick(&mut session, now + 20, &[]).is_empty());

        let ack = reply_to(packets[0], &[], 0x60);
        let seen = tick(&mut session, now + 30, &ack);
        assert_eq!(sent(&seen).len(), 1);
    }

    #[test]
    fn polls_on_interval() {
        let mut session = Session::new(Config::default(), 0);
        let now = ready(&mut session);

        assert!(tick(&mut session, now + 29_999, &[]).is_empty());
        let seen = tick(&mut session, now + 30_000, &[]);
        let packets = sent(&seen);
        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0][2..4], &[0x10, 0x09]);
    }

    #[test]
    fn fragmented_and_noisy_input() {
        let mut session = Session::new(Config::default(), 0);
        let ping = Frame::encode(&[0x01, 0x80, 0x00, 0x00], 0x10).unwrap();

        assert!(tick(&mut session, 1, &[0xff, 0x00, ping[0], ping[1]]).is_empty());
        assert!(tick(&mut session, 2, &ping[2..5]).is_empty());
        let seen = tick(&mut session, 3, &ping[5..]);
        assert_eq!(sent(&seen).len(), 1);

        // A corrupt frame is skipped and the next one still lands.
        let mut noisy = std::vec::Vec::from(&ping[..]);
        noisy[3] ^= 0x40;
        noisy.extend_from_slice(&ping);
        let seen = tick(&mut session, 4, &noisy);
        assert_eq!(sent(&seen).len(), 1);
    }

    #[test]
    fn full_queue_rejects_new_keys() {
        let mut session = Session::new(Config::default(), 0);
        for key in 0..SET_QUEUE_CAPACITY as u8 {
            session.queue.set(0x80 + key, 0x00).unwrap();
        }
        assert_eq!(
            session.control(&ClimateCall::new().target_temperature(21.0)),
            Err(CommandQueueFull)
        );
        assert_eq!(session.queued().len(), SET_QUEUE_CAPACITY);
    }
}
