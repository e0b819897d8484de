use crate::config::{elapsed, Config};
use crate::protocol::catalog::HANDSHAKE_DELAY_BEFORE;
use crate::protocol::{Command, HANDSHAKE_STEPS};

/// Where the session is in bringing up the link.
///
/// `step` is the zero based handshake step: the one awaiting its response in
/// `Handshake`, the one about to be sent in `HandshakeDelay`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProtocolState {
    /// Quiet period after boot.
    Initializing { since: u32 },
    /// Settling pause before `step` goes out.
    HandshakeDelay { step: usize, since: u32 },
    Handshake { step: usize },
    /// Handshake done, waiting to poll for the first time.
    FirstPoll { since: u32 },
    /// First poll sent, waiting for the unit to answer it. Gives up waiting
    /// after `handshake_end_timeout` and carries on regardless.
    HandshakeEnding { since: u32 },
    Ready,
    /// The handshake never completed. Nothing more is sent.
    Failed,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// Time passes.
    Tick(u32),
    /// The outstanding command got its response.
    Answered(u32),
    /// The deadline for reaching `Ready` has passed.
    Deadline,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Send(Command),
    Fail,
}

impl ProtocolState {
    pub fn is_ready(&self) -> bool {
        *self == ProtocolState::Ready
    }

    pub fn is_failed(&self) -> bool {
        *self == ProtocolState::Failed
    }

    /// Still bringing the link up.
    pub fn is_initializing(&self) -> bool {
        !self.is_ready() && !self.is_failed()
    }

    pub fn next(self, event: Event, config: &Config) -> (ProtocolState, Option<Action>) {
        use ProtocolState::*;

        match (self, event) {
            (Ready, _) | (Failed, _) => (self, None),

            (_, Event::Deadline) => (Failed, Some(Action::Fail)),

            (Initializing { since }, Event::Tick(now))
                if elapsed(now, since) >= config.init_timeout =>
            {
                (Handshake { step: 0 }, Some(Action::Send(Command::Handshake(0))))
            }

            (Handshake { step }, Event::Answered(now)) => {
                let step = step + 1;
                if step >= HANDSHAKE_STEPS {
                    (FirstPoll { since: now }, None)
                } else if HANDSHAKE_DELAY_BEFORE.contains(&step) {
                    (HandshakeDelay { step, since: now }, None)
                } else {
                    (Handshake { step }, Some(Action::Send(Command::Handshake(step))))
                }
            }

            (HandshakeDelay { step, since }, Event::Tick(now))
                if elapsed(now, since) >= config.handshake_delay =>
            {
                (Handshake { step }, Some(Action::Send(Command::Handshake(step))))
            }

            (FirstPoll { since }, Event::Tick(now))
                if elapsed(now, since) >= config.first_poll_timeout =>
            {
                (HandshakeEnding { since: now }, Some(Action::Send(Command::Poll)))
            }

            (HandshakeEnding { .. }, Event::Answered(_)) => (Ready, None),

            (HandshakeEnding { since }, Event::Tick(now))
                if elapsed(now, since) >= config.handshake_end_timeout =>
            {
                (Ready, None)
            }

            _ => (self, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProtocolState::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn waits_out_the_quiet_period() {
        let state = Initializing { since: 100 };
        assert_eq!(state.next(Event::Tick(10_099), &config()), (state, None));
        assert_eq!(
            state.next(Event::Tick(10_100), &config()),
            (Handshake { step: 0 }, Some(Action::Send(Command::Handshake(0))))
        );
    }

    #[test]
    fn answers_advance_one_step() {
        assert_eq!(
            Handshake { step: 3 }.next(Event::Answered(0), &config()),
            (Handshake { step: 4 }, Some(Action::Send(Command::Handshake(4))))
        );
        // Time alone never advances the handshake.
        assert_eq!(
            Handshake { step: 3 }.next(Event::Tick(1_000_000), &config()),
            (Handshake { step: 3 }, None)
        );
    }

    #[test]
    fn pauses_before_appliance_commands() {
        let (state, action) = Handshake { step: 7 }.next(Event::Answered(500), &config());
        assert_eq!(state, HandshakeDelay { step: 8, since: 500 });
        assert_eq!(action, None);

        assert_eq!(state.next(Event::Tick(3_499), &config()), (state, None));
        assert_eq!(
            state.next(Event::Tick(3_500), &config()),
            (Handshake { step: 8 }, Some(Action::Send(Command::Handshake(8))))
        );
    }

    #[test]
    fn full_sequence_reaches_ready() {
        let config = config();
        let mut state = Initializing { since: 0 };
        let mut now = config.init_timeout;
        let mut sent = 0;
        let mut visited_first_poll = 0;
        let mut visited_ending = 0;

        for _ in 0..64 {
            let event = match state {
                Handshake { .. } | HandshakeEnding { .. } => Event::Answered(now),
                _ => Event::Tick(now),
            };
            let (next, action) = state.next(event, &config);
            if let Some(Action::Send(Command::Handshake(step))) = action {
                assert_eq!(step, sent);
                sent += 1;
            }
            if next != state {
                match next {
                    FirstPoll { .. } => visited_first_poll += 1,
                    HandshakeEnding { .. } => visited_ending += 1,
                    _ => {}
                }
            }
            state = next;
            if state.is_ready() {
                break;
            }
            now += 1_000;
        }

        assert_eq!(state, Ready);
        assert_eq!(sent, HANDSHAKE_STEPS);
        assert_eq!(visited_first_poll, 1);
        assert_eq!(visited_ending, 1);
    }

    #[test]
    fn deadline_fails_any_initializing_state() {
        for state in [
            Initializing { since: 0 },
            HandshakeDelay { step: 8, since: 0 },
            Handshake { step: 2 },
            FirstPoll { since: 0 },
            HandshakeEnding { since: 0 },
        ] {
            assert_eq!(state.next(Event::Deadline, &config()), (Failed, Some(Action::Fail)));
        }
        assert_eq!(Ready.next(Event::Deadline, &config()), (Ready, None));
    }

    #[test]
    fn closing_answer_or_timeout_ends_the_handshake() {
        let (state, action) = FirstPoll { since: 0 }.next(Event::Tick(650), &config());
        assert_eq!(state, HandshakeEnding { since: 650 });
        assert_eq!(action, Some(Action::Send(Command::Poll)));

        assert_eq!(state.next(Event::Answered(700), &config()), (Ready, None));

        assert_eq!(state.next(Event::Tick(20_649), &config()), (state, None));
        assert_eq!(state.next(Event::Tick(20_650), &config()), (Ready, None));
    }

    #[test]
    fn failed_is_terminal() {
        for event in [Event::Tick(u32::MAX), Event::Answered(0), Event::Deadline] {
            assert_eq!(Failed.next(event, &config()), (Failed, None));
        }
    }
}
