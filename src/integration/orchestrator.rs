//! Orchestrator for one end-to-end interaction
//!
//! Runs the stages in order: model startup, greeting, calibration,
//! listening, analysis, query, response. Optional stages absorb their
//! failures; required ones end the session in `Error`. Cleanup runs exactly
//! once either way.

use crate::audio::{AudioCapture, WavFileCapture};
use crate::emotion::{CommandClassifier, EmotionClassifier, EmotionLabel};
use crate::hardware::{HardwareChannel, SerialLink};
use crate::integration::config::SessionConfig;
use crate::integration::session::{Session, SessionReport, SessionState};
use crate::llm::client::LlmClient;
use crate::llm::exchange::ExchangeOutcome;
use crate::llm::prompts::compose_prompt;
use crate::speech::renderer::{FestivalRenderer, SpeechRenderer};
use crate::speech::scheduler::SpeechScheduler;
use crate::speech::stt::{CommandTranscriber, Transcriber};
use crate::{Result, SentioError};
use std::thread;
use tracing::{debug, info, warn};

/// Drives a single session over the collaborators it was built with
pub struct Orchestrator {
    config: SessionConfig,
    llm: LlmClient,
    capture: Box<dyn AudioCapture>,
    classifier: Box<dyn EmotionClassifier>,
    transcriber: Box<dyn Transcriber>,
    speech: SpeechScheduler,
    hardware: HardwareChannel,
    session: Session,
}

impl Orchestrator {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the whole interaction and clean up
    pub fn run(mut self) -> SessionReport {
        info!("Session {} starting", self.session.id());

        match self.run_stages() {
            Ok(()) => {
                self.session.advance(SessionState::Done);
            }
            Err(e) => self.session.fail(e),
        }

        self.cleanup();

        let report = self.session.report();
        info!(
            "Session {} finished: {:?} (degraded: {})",
            report.id, report.outcome, report.degraded
        );
        report
    }

    fn run_stages(&mut self) -> Result<()> {
        self.init()?;

        if self.config.flow.greets() {
            self.session.advance(SessionState::Greeting);
            self.greet();
        }

        if self.config.flow.calibrate {
            self.session.advance(SessionState::Calibration);
            self.calibrate();
        }

        self.session.advance(SessionState::Listening);
        let samples = self.listen()?;

        self.session.advance(SessionState::Analyzing);
        self.analyze(&samples)?;

        self.session.advance(SessionState::Querying);
        self.query();

        self.session.advance(SessionState::Responding);
        self.respond();

        Ok(())
    }

    fn init(&mut self) -> Result<()> {
        self.llm.open()?;

        for command in self.config.flow.startup_commands.clone() {
            self.hardware.send(&command);
        }
        Ok(())
    }

    fn greet(&mut self) {
        if let Some(greeting) = self.config.flow.greeting.clone() {
            self.say("Greeting", &greeting);
            thread::sleep(self.config.flow.greeting_pause());
        }
        if let Some(cue) = self.config.flow.calibration_cue.clone() {
            self.say("Greeting", &cue);
        }
    }

    /// Record a short clip and echo its transcript to the peripheral
    fn calibrate(&mut self) {
        let samples = match self
            .capture
            .capture(self.config.audio.calibration_duration(), self.config.audio.sample_rate)
        {
            Ok(samples) => samples,
            Err(e) => return self.session.absorb("Calibration", e),
        };

        match self.transcriber.transcribe(&samples) {
            Ok(text) if !text.is_empty() => {
                info!("Calibration transcript: {}", text);
                self.hardware.send(&text);
            }
            Ok(_) => debug!("Calibration clip was silent"),
            Err(e) => self.session.absorb("Calibration", e),
        }
    }

    fn listen(&mut self) -> Result<Vec<f32>> {
        if let Some(cue) = self.config.flow.listening_cue.clone() {
            self.say("Listening", &cue);
        }

        let duration = self.config.audio.record_duration();
        info!("Recording for {:?}", duration);
        let samples = self.capture.capture(duration, self.config.audio.sample_rate)?;
        if samples.is_empty() {
            return Err(SentioError::Capture("Capture returned no samples".into()));
        }
        Ok(samples)
    }

    /// Classify and transcribe the same recording
    fn analyze(&mut self, samples: &[f32]) -> Result<()> {
        let emotion = self.classifier.classify(samples);
        let transcript = self.transcriber.transcribe(samples);

        let (emotion, transcript) = match (emotion, transcript) {
            (Err(classify_err), Err(transcribe_err)) => {
                return Err(SentioError::Analysis(format!(
                    "{}; {}",
                    classify_err, transcribe_err
                )));
            }
            (emotion, transcript) => {
                let emotion = emotion.unwrap_or_else(|e| {
                    self.session.absorb("Analyzing", e);
                    EmotionLabel::Unknown
                });
                let transcript = transcript.unwrap_or_else(|e| {
                    self.session.absorb("Analyzing", e);
                    String::new()
                });
                (emotion, transcript)
            }
        };

        info!("Detected emotion: {}", emotion);
        info!("Transcription: {:?}", transcript);
        self.session.set_emotion(emotion);
        self.session.set_transcript(transcript);

        if let Some(template) = self.config.flow.emotion_announcement.clone() {
            let announcement = template.replace("{emotion}", emotion.as_str());
            self.say("Analyzing", &announcement);
        }
        Ok(())
    }

    /// Ask the model; any failure becomes the fallback reply
    fn query(&mut self) {
        let prompt = compose_prompt(
            &self.config.flow.prompt_template,
            self.session.transcript().unwrap_or_default(),
            self.session.emotion().unwrap_or(EmotionLabel::Unknown),
        );

        let exchange = self.llm.exchange(&prompt);
        let response = match (exchange.outcome(), exchange.response()) {
            (ExchangeOutcome::Success, Some(text)) if !text.is_empty() => text.to_string(),
            (ExchangeOutcome::Success, _) => {
                self.session
                    .absorb("Querying", SentioError::ProcessError("Empty response".into()));
                self.config.flow.fallback_response.clone()
            }
            (ExchangeOutcome::Timeout, _) => {
                self.session.absorb(
                    "Querying",
                    SentioError::ResponseTimeout(self.llm.config().response_timeout()),
                );
                self.config.flow.fallback_response.clone()
            }
            (ExchangeOutcome::ProcessError(e), _) => {
                self.session
                    .absorb("Querying", SentioError::ProcessError(e.clone()));
                self.config.flow.fallback_response.clone()
            }
        };

        info!("Response: {}", response);
        self.session.set_exchange(exchange);
        self.session.set_response(response);
    }

    fn respond(&mut self) {
        let response = self.session.response().unwrap_or_default().to_string();
        self.say("Responding", &response);
    }

    /// Speak `text`, absorbing renderer failures
    fn say(&mut self, stage: &str, text: &str) {
        let report = self.speech.speak(text, &mut self.hardware);
        if !report.is_clean() {
            self.session.absorb(
                stage,
                SentioError::Render(format!(
                    "{} of {} chunks failed",
                    report.failed_chunks, report.chunks
                )),
            );
        }
    }

    fn cleanup(&mut self) {
        info!("Cleaning up session {}", self.session.id());

        if let Some(command) = self.config.flow.shutdown_command.clone() {
            self.hardware.send(&command);
        }
        self.hardware.close();
        self.llm.close();
        self.session.record_cleanup();
    }
}

/// Builder for creating an orchestrator
///
/// Collaborators not supplied are built from the configuration.
pub struct OrchestratorBuilder {
    config: SessionConfig,
    capture: Option<Box<dyn AudioCapture>>,
    classifier: Option<Box<dyn EmotionClassifier>>,
    transcriber: Option<Box<dyn Transcriber>>,
    renderer: Option<Box<dyn SpeechRenderer>>,
    hardware: Option<HardwareChannel>,
}

impl OrchestratorBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::with_config(SessionConfig::new())
    }

    /// Create a builder from a complete configuration
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            capture: None,
            classifier: None,
            transcriber: None,
            renderer: None,
            hardware: None,
        }
    }

    /// Set the audio source
    pub fn with_capture(mut self, capture: impl AudioCapture + 'static) -> Self {
        self.capture = Some(Box::new(capture));
        self
    }

    /// Set the emotion classifier
    pub fn with_classifier(mut self, classifier: impl EmotionClassifier + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    /// Set the speech-to-text engine
    pub fn with_transcriber(mut self, transcriber: impl Transcriber + 'static) -> Self {
        self.transcriber = Some(Box::new(transcriber));
        self
    }

    /// Set the text-to-speech renderer
    pub fn with_renderer(mut self, renderer: impl SpeechRenderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    /// Use an already-open link to the peripheral
    pub fn with_serial_link(mut self, link: impl SerialLink + 'static) -> Self {
        self.hardware = Some(HardwareChannel::new(Box::new(link), &self.config.hardware));
        self
    }

    /// Validate the configuration and assemble the orchestrator
    ///
    /// The model process is not started until `run`.
    pub fn build(self) -> Result<Orchestrator> {
        self.config.validate().map_err(SentioError::ConfigError)?;

        let config = self.config;
        let sample_rate = config.audio.sample_rate;

        let capture = match self.capture {
            Some(capture) => capture,
            None => default_capture(&config)?,
        };
        let classifier: Box<dyn EmotionClassifier> = match self.classifier {
            Some(classifier) => classifier,
            None => Box::new(CommandClassifier::new(&config.classifier, sample_rate)),
        };
        let transcriber: Box<dyn Transcriber> = match self.transcriber {
            Some(transcriber) => transcriber,
            None => Box::new(CommandTranscriber::new(config.transcriber.clone(), sample_rate)),
        };
        let renderer: Box<dyn SpeechRenderer> = match self.renderer {
            Some(renderer) => renderer,
            None => Box::new(FestivalRenderer::new(config.festival.clone())),
        };
        let hardware = self
            .hardware
            .unwrap_or_else(|| HardwareChannel::open(&config.hardware));

        if !hardware.is_connected() && config.speech.sync_hardware {
            warn!("Speaking without peripheral sync");
        }

        Ok(Orchestrator {
            llm: LlmClient::new(config.llm.clone()),
            speech: SpeechScheduler::new(renderer, config.speech.clone()),
            capture,
            classifier,
            transcriber,
            hardware,
            session: Session::new(),
            config,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_capture(config: &SessionConfig) -> Result<Box<dyn AudioCapture>> {
    match &config.audio.source {
        Some(source) => {
            info!("Replaying audio from {}", source.display());
            Ok(Box::new(WavFileCapture::new(source.clone())))
        }
        None => microphone(),
    }
}

#[cfg(feature = "audio-io")]
fn microphone() -> Result<Box<dyn AudioCapture>> {
    Ok(Box::new(crate::audio::MicrophoneCapture::new()?))
}

#[cfg(not(feature = "audio-io"))]
fn microphone() -> Result<Box<dyn AudioCapture>> {
    Err(SentioError::ConfigError(
        "No audio source configured and microphone support is disabled".into(),
    ))
}
