//! Player session: classify, sync, then pull-decode-emit until the stream
//! runs dry.
//!
//! The player owns the [`StreamBuffer`] and drives the whole pipeline from
//! [`StreamPlayer::run`]. Producers feed bytes either by calling
//! [`StreamPlayer::push_data`] ahead of time or on demand through the input
//! callback, which the buffer consults whenever a read underflows.

use tracing::{info, warn};

use crate::buffer::{InputFn, StreamBuffer};
use crate::decode::{make_decoder, DecoderConfig, FrameDecoder};
use crate::detect::detect_audio_type;
use crate::extract::FrameReader;
use chime_core::{AudioType, Error, PcmBlock, PlayerState, Result};

/// Invoked once after classification, before the decoder is built, to let
/// the host adjust [`DecoderConfig`] hints.
pub type ConfigureFn = Box<dyn FnMut(AudioType, &mut DecoderConfig) + Send>;

/// Receives each decoded PCM block in stream order.
pub type OutputFn = Box<dyn FnMut(&PcmBlock) + Send>;

/// Host integration points for a player session.
pub struct PlayerCallbacks {
    pub configure: ConfigureFn,
    pub input: InputFn,
    pub output: OutputFn,
}

/// A single-stream player session.
pub struct StreamPlayer {
    stream: StreamBuffer,
    state: PlayerState,
    audio_type: AudioType,
    configure: ConfigureFn,
    output: OutputFn,
    decoder: Option<Box<dyn FrameDecoder>>,
    reader: Option<FrameReader>,
}

impl StreamPlayer {
    /// Create a session with the given buffer capacity and host callbacks.
    pub fn new(buffer_capacity: usize, callbacks: PlayerCallbacks) -> Self {
        let stream = StreamBuffer::new(buffer_capacity);
        stream.set_input(callbacks.input);
        Self {
            stream,
            state: PlayerState::Idle,
            audio_type: AudioType::Unknown,
            configure: callbacks.configure,
            output: callbacks.output,
            decoder: None,
            reader: None,
        }
    }

    /// Append producer bytes ahead of the read cursor; returns the count
    /// accepted.
    pub fn push_data(&self, data: &[u8]) -> usize {
        self.stream.write(data)
    }

    /// Bytes a producer can push before the buffer fills.
    pub fn available_space(&self) -> usize {
        self.stream.available_space()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.available_data() == 0
    }

    pub const fn state(&self) -> PlayerState {
        self.state
    }

    pub const fn audio_type(&self) -> AudioType {
        self.audio_type
    }

    pub const fn stream(&self) -> &StreamBuffer {
        &self.stream
    }

    /// Classify the stream from its head bytes. The result is cached; a
    /// session's type never changes once known.
    pub fn detect_type(&mut self) -> AudioType {
        if self.audio_type.is_known() {
            return self.audio_type;
        }
        let detected = detect_audio_type(&self.stream);
        if detected.is_known() {
            self.audio_type = detected;
            if self.state == PlayerState::Idle {
                self.state = PlayerState::TypeDetected;
            }
        }
        detected
    }

    /// Build and install the decoder, then sync the frame reader.
    ///
    /// An [`AudioType::Unknown`] hint triggers content detection first. The
    /// configure callback runs after classification so the host can supply
    /// channel and sample-rate hints for the chosen format.
    pub fn init_decoder(&mut self, hint: AudioType) -> Result<()> {
        let audio_type = if hint.is_known() {
            hint
        } else {
            self.detect_type()
        };
        if !audio_type.is_known() {
            return Err(Error::UnsupportedFormat(
                "stream did not classify as mp3 or adts aac".into(),
            ));
        }

        let mut config = DecoderConfig::default();
        (self.configure)(audio_type, &mut config);
        let decoder = make_decoder(audio_type, &config)?;
        self.install(audio_type, decoder)
    }

    /// Install a caller-supplied decoder backend instead of the default.
    pub fn init_decoder_with(
        &mut self,
        audio_type: AudioType,
        decoder: Box<dyn FrameDecoder>,
    ) -> Result<()> {
        if !audio_type.is_known() {
            return Err(Error::UnsupportedFormat(
                "decoder requires a classified stream type".into(),
            ));
        }
        self.install(audio_type, decoder)
    }

    fn install(&mut self, audio_type: AudioType, mut decoder: Box<dyn FrameDecoder>) -> Result<()> {
        decoder.reset();
        let reader = FrameReader::init(audio_type, &self.stream)?;
        info!(?audio_type, offset = reader.position(), "decoder ready");
        self.audio_type = audio_type;
        self.decoder = Some(decoder);
        self.reader = Some(reader);
        self.state = PlayerState::DecoderReady;
        Ok(())
    }

    /// Pull-decode-emit until the stream runs dry.
    ///
    /// Initializes the decoder on first use. Frames the decoder rejects are
    /// skipped with a warning and the decoder reset; the loop only fails on
    /// terminal errors. Returns once no further frame can be extracted.
    pub fn run(&mut self) -> Result<()> {
        if self.decoder.is_none() {
            self.init_decoder(AudioType::Unknown)?;
        }
        let (Some(reader), Some(decoder)) = (self.reader.as_mut(), self.decoder.as_mut()) else {
            return Err(Error::Init("decoder not installed".into()));
        };

        self.state = PlayerState::Running;
        let mut decoded = 0u64;
        let mut skipped = 0u64;

        while let Some(frame) = reader.next_frame(&self.stream) {
            match decoder.decode(&frame.data) {
                Ok(block) => {
                    decoded += 1;
                    if block.sample_count() > 0 {
                        (self.output)(&block);
                    }
                }
                Err(err) if err.is_recoverable() => {
                    skipped += 1;
                    warn!(offset = frame.offset, %err, "skipping undecodable frame");
                    decoder.reset();
                }
                Err(err) => return Err(err),
            }
        }

        info!(decoded, skipped, "stream finished");
        self.state = PlayerState::Finished;
        Ok(())
    }

    /// Tear the session down: the stream refuses further writes, the decoder
    /// and reader are dropped.
    pub fn finish(&mut self) {
        self.stream.close();
        self.decoder = None;
        self.reader = None;
        self.state = PlayerState::Finished;
        info!("player session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::tests::{mp3_frame, H128};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Decoder double: emits a fixed-size block per frame, optionally
    /// failing on one call.
    struct StubDecoder {
        calls: usize,
        fail_on: Option<usize>,
        resets: Arc<AtomicUsize>,
    }

    impl StubDecoder {
        fn new(fail_on: Option<usize>) -> (Self, Arc<AtomicUsize>) {
            let resets = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: 0,
                    fail_on,
                    resets: Arc::clone(&resets),
                },
                resets,
            )
        }
    }

    impl FrameDecoder for StubDecoder {
        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::Relaxed);
        }

        fn decode(&mut self, _frame: &[u8]) -> chime_core::Result<PcmBlock> {
            self.calls += 1;
            if Some(self.calls) == self.fail_on {
                return Err(Error::Decode("stub failure".into()));
            }
            Ok(PcmBlock::new(vec![0.0; 2304], 2, 44_100))
        }
    }

    fn callbacks_collecting(blocks: Arc<Mutex<Vec<PcmBlock>>>) -> PlayerCallbacks {
        PlayerCallbacks {
            configure: Box::new(|_, _| {}),
            input: Box::new(|_| 0),
            output: Box::new(move |block| blocks.lock().push(block.clone())),
        }
    }

    fn mp3_stream(frames: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for _ in 0..frames {
            data.extend_from_slice(&mp3_frame(H128));
        }
        data
    }

    #[test]
    fn test_player_lifecycle() {
        let blocks = Arc::new(Mutex::new(Vec::new()));
        let mut player = StreamPlayer::new(64 * 1024, callbacks_collecting(Arc::clone(&blocks)));
        assert_eq!(player.state(), PlayerState::Idle);

        let data = mp3_stream(5);
        assert_eq!(player.push_data(&data), data.len());

        assert_eq!(player.detect_type(), AudioType::Mp3);
        assert_eq!(player.state(), PlayerState::TypeDetected);

        let (stub, _) = StubDecoder::new(None);
        player
            .init_decoder_with(AudioType::Mp3, Box::new(stub))
            .unwrap();
        assert_eq!(player.state(), PlayerState::DecoderReady);

        player.run().unwrap();
        assert_eq!(player.state(), PlayerState::Finished);
        assert_eq!(blocks.lock().len(), 5);
    }

    #[test]
    fn test_run_skips_undecodable_frames() {
        let blocks = Arc::new(Mutex::new(Vec::new()));
        let mut player = StreamPlayer::new(64 * 1024, callbacks_collecting(Arc::clone(&blocks)));
        player.push_data(&mp3_stream(5));

        let (stub, resets) = StubDecoder::new(Some(2));
        player
            .init_decoder_with(AudioType::Mp3, Box::new(stub))
            .unwrap();
        let installed_resets = resets.load(Ordering::Relaxed);

        player.run().unwrap();
        assert_eq!(player.state(), PlayerState::Finished);
        assert_eq!(blocks.lock().len(), 4);
        // The failed frame forced one extra decoder reset.
        assert_eq!(resets.load(Ordering::Relaxed), installed_resets + 1);
    }

    #[test]
    fn test_init_decoder_rejects_unclassifiable_stream() {
        let blocks = Arc::new(Mutex::new(Vec::new()));
        let mut player = StreamPlayer::new(64 * 1024, callbacks_collecting(blocks));
        player.push_data(&[0x42u8; 2048]);

        assert!(matches!(
            player.init_decoder(AudioType::Unknown),
            Err(Error::UnsupportedFormat(_))
        ));
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_configure_callback_sees_detected_type() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_cb = Arc::clone(&seen);
        let player_cbs = PlayerCallbacks {
            configure: Box::new(move |ty, config| {
                *seen_in_cb.lock() = Some(ty);
                config.channels = Some(2);
                config.sample_rate = Some(44_100);
            }),
            input: Box::new(|_| 0),
            output: Box::new(|_| {}),
        };
        let mut player = StreamPlayer::new(64 * 1024, player_cbs);
        player.push_data(&mp3_stream(3));

        player.init_decoder(AudioType::Unknown).unwrap();
        assert_eq!(*seen.lock(), Some(AudioType::Mp3));
        assert_eq!(player.audio_type(), AudioType::Mp3);
    }

    #[test]
    fn test_input_callback_feeds_run() {
        // Frames arrive only on demand, one per underflow.
        let chunks = Arc::new(Mutex::new(
            (0..4).map(|_| mp3_frame(H128)).collect::<Vec<_>>(),
        ));
        let blocks = Arc::new(Mutex::new(Vec::new()));
        let blocks_out = Arc::clone(&blocks);
        let player_cbs = PlayerCallbacks {
            configure: Box::new(|_, _| {}),
            input: Box::new(move |stream| {
                chunks.lock().pop().map_or(0, |chunk| stream.write(&chunk))
            }),
            output: Box::new(move |block| blocks_out.lock().push(block.clone())),
        };
        let mut player = StreamPlayer::new(64 * 1024, player_cbs);

        let (stub, _) = StubDecoder::new(None);
        player
            .init_decoder_with(AudioType::Mp3, Box::new(stub))
            .unwrap();
        player.run().unwrap();
        assert_eq!(blocks.lock().len(), 4);
    }

    #[test]
    fn test_finish_closes_stream() {
        let blocks = Arc::new(Mutex::new(Vec::new()));
        let mut player = StreamPlayer::new(4096, callbacks_collecting(blocks));
        player.push_data(&[0u8; 16]);

        player.finish();
        assert_eq!(player.state(), PlayerState::Finished);
        assert_eq!(player.push_data(&[1, 2, 3]), 0);
    }
}
