//! DShot session with periodic retransmission
//!
//! The application stages frames with [`DshotSession::update`]; the resend
//! task pushes the most recent staged frame through the encoder every
//! interval. The two sides share only the staged frame, which sits behind a
//! critical-section mutex held just long enough to copy it. The encoder has
//! its own lock that only the resend path takes, so `update` never waits on
//! a transmission in progress.
//!
//! ```text
//! update() ──► [staged frame + generation] ──► resend() ──► encoder
//!                    (critical section)         (encoder lock)
//! ```

use core::cell::Cell;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use embedded_hal::delay::DelayNs;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};
use pulsewidth_core::{
    BufferedWaveform, ClockedShift, Encoder, EncoderError, TimingSpec, WaveformConfig,
};
use pulsewidth_hal::{PulseTrain, ShiftClock};

use crate::command::Command;
use crate::frame::{Packet, FRAME_BITS};

/// Pulse-train clock divider used for DShot
pub const DSHOT_CLOCK_DIVIDER: u8 = 4;

/// Shift storage for one frame (up to 16 slots per bit)
pub const SHIFT_FRAME_BYTES: usize = FRAME_BITS * 16 / 8;

/// Staged frame tagged with an update counter
#[derive(Debug, Clone, Copy)]
struct Staged {
    packet: Packet,
    generation: u32,
}

/// Encoder plus the conversion cache only the resend path touches
struct Transmitter<E> {
    encoder: E,
    converted: Option<u32>,
    units: usize,
}

/// One ESC channel
pub struct DshotSession<E> {
    transmitter: Mutex<CriticalSectionRawMutex, Transmitter<E>>,
    staged: BlockingMutex<CriticalSectionRawMutex, Cell<Staged>>,
    armed: AtomicBool,
    interval_us: AtomicU32,
    restart: Signal<CriticalSectionRawMutex, ()>,
}

impl<E: Encoder> DshotSession<E> {
    /// Take ownership of `encoder` and initialize it
    ///
    /// The encoder must either buffer at least one frame or stream.
    pub fn new(mut encoder: E) -> Result<Self, EncoderError> {
        let capacity = encoder.max_payload_bits();
        if capacity == 0 && !encoder.supports_streaming() {
            return Err(EncoderError::UnsupportedOperation);
        }
        if capacity != 0 && capacity < FRAME_BITS {
            return Err(EncoderError::InvalidArgument);
        }
        encoder.init()?;

        Ok(Self {
            transmitter: Mutex::new(Transmitter {
                encoder,
                converted: None,
                units: 0,
            }),
            staged: BlockingMutex::new(Cell::new(Staged {
                packet: Packet::default(),
                generation: 0,
            })),
            armed: AtomicBool::new(false),
            interval_us: AtomicU32::new(0),
            restart: Signal::new(),
        })
    }

    /// Stage a throttle frame (0 = disarmed, 1-2000)
    ///
    /// Fails with [`EncoderError::InvalidArgument`] above 2000, leaving the
    /// previously staged frame in place.
    pub fn update(&self, thrust: u16, telemetry: bool) -> Result<(), EncoderError> {
        let packet = Packet::throttle(thrust, telemetry)?;
        self.stage(packet);
        Ok(())
    }

    /// Stage a special command frame
    pub fn update_command(&self, command: Command, telemetry: bool) {
        self.stage(Packet::command(command, telemetry));
    }

    /// Frame the next resend will transmit
    pub fn staged_packet(&self) -> Packet {
        self.staged.lock(|cell| cell.get().packet)
    }

    fn stage(&self, packet: Packet) {
        self.staged.lock(|cell| {
            let generation = cell.get().generation.wrapping_add(1);
            cell.set(Staged { packet, generation });
        });
    }

    /// Stage a disarmed frame and arm retransmission every `interval_us`
    ///
    /// Calling it again while armed restarts the cadence with the new
    /// interval.
    pub fn start(&self, interval_us: u32) -> Result<(), EncoderError> {
        if interval_us == 0 {
            return Err(EncoderError::InvalidArgument);
        }
        self.update(0, false)?;
        self.interval_us.store(interval_us, Ordering::Release);
        self.armed.store(true, Ordering::Release);
        self.restart.signal(());

        #[cfg(feature = "defmt")]
        defmt::info!("dshot: retransmit every {} us", interval_us);
        Ok(())
    }

    /// Stop scheduling retransmissions
    ///
    /// A frame already being written completes. The session can be started
    /// again later.
    pub fn stop(&self) {
        self.armed.store(false, Ordering::Release);

        #[cfg(feature = "defmt")]
        defmt::info!("dshot: retransmit stopped");
    }

    /// Check if periodic retransmission is armed
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Retransmit interval set by the last [`start`](Self::start)
    pub fn interval_us(&self) -> u32 {
        self.interval_us.load(Ordering::Acquire)
    }

    /// Transmit the staged frame once
    ///
    /// Buffered encoders re-convert only when the staged frame changed since
    /// the last call.
    pub async fn resend(&self) -> Result<(), EncoderError> {
        let staged = self.staged.lock(Cell::get);
        let bytes = staged.packet.to_wire_bytes();

        let mut guard = self.transmitter.lock().await;
        let tx = &mut *guard;

        if tx.encoder.max_payload_bits() == 0 {
            return tx.encoder.send(&bytes, FRAME_BITS);
        }
        if tx.converted != Some(staged.generation) {
            tx.converted = None;
            tx.units = tx.encoder.convert_buffer(&bytes, FRAME_BITS)?;
            tx.converted = Some(staged.generation);
        }
        tx.encoder.write(tx.units)
    }

    /// Periodic retransmit task
    ///
    /// Parks until [`start`](Self::start), then resends on every tick while
    /// armed. Transmit failures are logged and retried on the next tick.
    pub async fn run(&self) -> ! {
        loop {
            self.restart.wait().await;

            let mut ticker = Ticker::every(self.interval());
            while self.is_armed() {
                match select(self.restart.wait(), ticker.next()).await {
                    Either::First(()) => {
                        ticker = Ticker::every(self.interval());
                    }
                    Either::Second(()) => {
                        if !self.is_armed() {
                            break;
                        }
                        if let Err(_e) = self.resend().await {
                            #[cfg(feature = "defmt")]
                            defmt::warn!("dshot: resend failed: {}", _e);
                        }
                    }
                }
            }
        }
    }

    fn interval(&self) -> Duration {
        Duration::from_micros(self.interval_us() as u64)
    }

    /// Disarm, deinitialize the encoder and hand it back
    pub fn release(self) -> Result<E, EncoderError> {
        self.armed.store(false, Ordering::Release);
        let mut encoder = self.transmitter.into_inner().encoder;
        encoder.deinit()?;
        Ok(encoder)
    }
}

impl<P: PulseTrain, D: DelayNs> DshotSession<BufferedWaveform<P, D, FRAME_BITS>> {
    /// Session over a pulse-train peripheral
    ///
    /// The clock divider in `config` is replaced by [`DSHOT_CLOCK_DIVIDER`].
    pub fn with_pulse_train(
        pulse: P,
        delay: D,
        timing: &TimingSpec,
        config: WaveformConfig,
    ) -> Result<Self, EncoderError> {
        let config = WaveformConfig {
            clock_divider: DSHOT_CLOCK_DIVIDER,
            ..config
        };
        let encoder = BufferedWaveform::new(pulse, delay, timing, config, FRAME_BITS)?;
        Self::new(encoder)
    }
}

impl<S: ShiftClock, D: DelayNs> DshotSession<ClockedShift<S, D, SHIFT_FRAME_BYTES>> {
    /// Session over a clocked shifter
    pub fn with_shift_clock(shift: S, delay: D, timing: &TimingSpec) -> Result<Self, EncoderError> {
        let encoder = ClockedShift::new(shift, delay, timing, FRAME_BITS)?;
        Self::new(encoder)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::speed::DshotSpeed;
    use embassy_futures::block_on;
    use heapless::Vec;
    use portable_atomic::AtomicUsize;
    use pulsewidth_hal::{PulseCode, PulseTranslator, ShiftClockConfig};

    /// Encoder that records calls instead of driving hardware
    #[derive(Default)]
    struct FakeEncoder {
        capacity: usize,
        initialized: bool,
        deinitialized: bool,
        converts: usize,
        writes: usize,
        sends: usize,
        last_bytes: [u8; 2],
        fail_write: bool,
    }

    impl FakeEncoder {
        fn buffered() -> Self {
            Self {
                capacity: FRAME_BITS,
                ..Default::default()
            }
        }
    }

    impl Encoder for FakeEncoder {
        fn init(&mut self) -> Result<(), EncoderError> {
            self.initialized = true;
            Ok(())
        }

        fn deinit(&mut self) -> Result<(), EncoderError> {
            self.deinitialized = true;
            Ok(())
        }

        fn max_payload_bits(&self) -> usize {
            self.capacity
        }

        fn supports_streaming(&self) -> bool {
            true
        }

        fn convert_buffer(&mut self, data: &[u8], len_bits: usize) -> Result<usize, EncoderError> {
            self.converts += 1;
            self.last_bytes.copy_from_slice(&data[..2]);
            Ok(len_bits)
        }

        fn write(&mut self, _len: usize) -> Result<(), EncoderError> {
            if self.fail_write {
                return Err(EncoderError::HardwareFailure);
            }
            self.writes += 1;
            Ok(())
        }

        fn on_the_fly_send(&mut self, data: &[u8], _len_bits: usize) -> Result<(), EncoderError> {
            self.sends += 1;
            self.last_bytes.copy_from_slice(&data[..2]);
            Ok(())
        }

        fn ensure_reset(&mut self) -> Result<(), EncoderError> {
            Ok(())
        }
    }

    /// Buffered encoder counting writes into a counter shared with the test
    struct CountingEncoder {
        writes: &'static AtomicUsize,
    }

    impl Encoder for CountingEncoder {
        fn init(&mut self) -> Result<(), EncoderError> {
            Ok(())
        }

        fn deinit(&mut self) -> Result<(), EncoderError> {
            Ok(())
        }

        fn max_payload_bits(&self) -> usize {
            FRAME_BITS
        }

        fn convert_buffer(&mut self, _data: &[u8], len_bits: usize) -> Result<usize, EncoderError> {
            Ok(len_bits)
        }

        fn write(&mut self, _len: usize) -> Result<(), EncoderError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn ensure_reset(&mut self) -> Result<(), EncoderError> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct MockError;

    #[derive(Default)]
    struct MockPulseTrain {
        enabled: bool,
        sent: Vec<PulseCode, 32>,
    }

    impl PulseTrain for MockPulseTrain {
        type Error = MockError;

        fn enable(&mut self) -> Result<(), MockError> {
            self.enabled = true;
            Ok(())
        }

        fn disable(&mut self) -> Result<(), MockError> {
            self.enabled = false;
            Ok(())
        }

        fn transmit(&mut self, codes: &[PulseCode]) -> Result<(), MockError> {
            self.sent.clear();
            self.sent.extend_from_slice(codes).map_err(|_| MockError)
        }

        fn transmit_translated<T: PulseTranslator>(
            &mut self,
            _src: &[u8],
            _translator: &mut T,
        ) -> Result<(), MockError> {
            Err(MockError)
        }
    }

    #[derive(Default)]
    struct MockShift {
        config: Option<ShiftClockConfig>,
        sent_bits: usize,
    }

    impl ShiftClock for MockShift {
        type Error = MockError;

        fn enable(&mut self, config: &ShiftClockConfig) -> Result<(), MockError> {
            self.config = Some(*config);
            Ok(())
        }

        fn disable(&mut self) -> Result<(), MockError> {
            Ok(())
        }

        fn transmit(&mut self, _data: &[u8], len_bits: usize) -> Result<(), MockError> {
            self.sent_bits = len_bits;
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn test_new_initializes_encoder() {
        let session = DshotSession::new(FakeEncoder::buffered()).unwrap();
        let encoder = session.release().unwrap();
        assert!(encoder.initialized);
        assert!(encoder.deinitialized);
    }

    #[test]
    fn test_new_rejects_small_buffer() {
        let encoder = FakeEncoder {
            capacity: 8,
            ..Default::default()
        };
        assert!(matches!(
            DshotSession::new(encoder),
            Err(EncoderError::InvalidArgument)
        ));
    }

    #[test]
    fn test_update_rejects_out_of_range() {
        let session = DshotSession::new(FakeEncoder::buffered()).unwrap();
        session.update(1000, true).unwrap();
        let before = session.staged_packet();

        assert_eq!(session.update(2001, false), Err(EncoderError::InvalidArgument));
        assert_eq!(session.staged_packet(), before);
    }

    #[test]
    fn test_resend_sends_wire_bytes() {
        let session = DshotSession::new(FakeEncoder::buffered()).unwrap();
        // value 999 + 47 = 1046
        session.update(999, false).unwrap();
        block_on(session.resend()).unwrap();

        let encoder = session.release().unwrap();
        assert_eq!(encoder.last_bytes, [0x82, 0xC6]);
        assert_eq!(encoder.writes, 1);
    }

    #[test]
    fn test_resend_converts_only_after_update() {
        let session = DshotSession::new(FakeEncoder::buffered()).unwrap();
        session.update(100, false).unwrap();
        block_on(session.resend()).unwrap();
        block_on(session.resend()).unwrap();
        block_on(session.resend()).unwrap();
        session.update(200, false).unwrap();
        block_on(session.resend()).unwrap();

        let encoder = session.release().unwrap();
        assert_eq!(encoder.converts, 2);
        assert_eq!(encoder.writes, 4);
    }

    #[test]
    fn test_resend_streams_without_buffer() {
        let session = DshotSession::new(FakeEncoder::default()).unwrap();
        session.update_command(Command::Beacon3, false);
        block_on(session.resend()).unwrap();
        block_on(session.resend()).unwrap();

        let encoder = session.release().unwrap();
        assert_eq!(encoder.sends, 2);
        assert_eq!(encoder.converts, 0);
        assert_eq!(
            encoder.last_bytes,
            Packet::command(Command::Beacon3, false).to_wire_bytes()
        );
    }

    #[test]
    fn test_resend_propagates_write_failure() {
        let encoder = FakeEncoder {
            fail_write: true,
            ..FakeEncoder::buffered()
        };
        let session = DshotSession::new(encoder).unwrap();
        assert_eq!(
            block_on(session.resend()),
            Err(EncoderError::HardwareFailure)
        );
    }

    #[test]
    fn test_start_stages_disarmed_frame() {
        let session = DshotSession::new(FakeEncoder::buffered()).unwrap();
        session.update(1500, false).unwrap();
        session.start(1000).unwrap();

        assert!(session.is_armed());
        assert_eq!(session.interval_us(), 1000);
        assert_eq!(session.staged_packet(), Packet::throttle(0, false).unwrap());
    }

    #[test]
    fn test_start_rejects_zero_interval() {
        let session = DshotSession::new(FakeEncoder::buffered()).unwrap();
        assert_eq!(session.start(0), Err(EncoderError::InvalidArgument));
        assert!(!session.is_armed());
    }

    #[test]
    fn test_stop_then_restart() {
        let session = DshotSession::new(FakeEncoder::buffered()).unwrap();
        session.start(500).unwrap();
        session.stop();
        assert!(!session.is_armed());

        session.update(42, false).unwrap();
        block_on(session.resend()).unwrap();
        session.start(2000).unwrap();
        assert!(session.is_armed());
        assert_eq!(session.interval_us(), 2000);
    }

    #[test]
    fn test_run_resends_only_while_armed() {
        use std::boxed::Box;
        use std::thread;
        use std::time::Duration as StdDuration;

        let writes: &'static AtomicUsize = Box::leak(Box::new(AtomicUsize::new(0)));
        let session: &'static DshotSession<CountingEncoder> = Box::leak(Box::new(
            DshotSession::new(CountingEncoder { writes }).unwrap(),
        ));
        thread::spawn(move || {
            block_on(session.run());
        });

        thread::sleep(StdDuration::from_millis(20));
        assert_eq!(writes.load(Ordering::SeqCst), 0);

        session.start(1000).unwrap();
        thread::sleep(StdDuration::from_millis(50));
        let running = writes.load(Ordering::SeqCst);
        assert!(running > 0);

        session.stop();
        // let a tick already in flight finish
        thread::sleep(StdDuration::from_millis(10));
        let stopped = writes.load(Ordering::SeqCst);
        thread::sleep(StdDuration::from_millis(30));
        assert_eq!(writes.load(Ordering::SeqCst), stopped);

        session.start(1000).unwrap();
        thread::sleep(StdDuration::from_millis(50));
        assert!(writes.load(Ordering::SeqCst) > stopped);
        session.stop();
    }

    #[test]
    fn test_pulse_train_session() {
        let timing = DshotSpeed::DShot600.timing();
        let session = DshotSession::with_pulse_train(
            MockPulseTrain::default(),
            NoDelay,
            &timing,
            WaveformConfig::default(),
        )
        .unwrap();
        session.update(999, false).unwrap();
        block_on(session.resend()).unwrap();

        let encoder = session.release().unwrap();
        let one = encoder.one_code();
        let (pulse, _) = encoder.release();
        assert!(!pulse.enabled);
        assert_eq!(pulse.sent.len(), FRAME_BITS);

        let word = pulse
            .sent
            .iter()
            .fold(0u16, |acc, &code| (acc << 1) | u16::from(code == one));
        assert_eq!(word, 0x82C6);
    }

    #[test]
    fn test_pulse_train_session_forces_divider() {
        let timing = DshotSpeed::DShot600.timing();
        let config = WaveformConfig {
            clock_divider: 200,
            ..WaveformConfig::default()
        };
        let session =
            DshotSession::with_pulse_train(MockPulseTrain::default(), NoDelay, &timing, config)
                .unwrap();
        let encoder = session.release().unwrap();
        assert_eq!(encoder.min_step_ns(), 50);
    }

    #[test]
    fn test_shift_clock_session() {
        let timing = DshotSpeed::DShot600.timing();
        let session =
            DshotSession::with_shift_clock(MockShift::default(), NoDelay, &timing).unwrap();
        session.update(1, true).unwrap();
        block_on(session.resend()).unwrap();

        let encoder = session.release().unwrap();
        let (shift, _) = encoder.release();
        // 2+1 slots for a one, 1+2 for a zero
        assert_eq!(shift.sent_bits, FRAME_BITS * 3);
        assert_eq!(shift.config.unwrap().frequency_hz, 1_798_561);
    }
}
