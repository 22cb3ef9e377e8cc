//! Spoken posture alerts.
//!
//! [`Speaker`] is the speech capability the capture loop calls when the
//! debouncer fires. [`CommandSpeaker`] runs a text-to-speech program and
//! blocks until it finishes; [`AlertWorker`] moves that work to a
//! dedicated thread fed through a bounded channel so a slow backend cannot
//! stall posture sampling.

use crate::{
    config::{AlertConfig, AlertMode},
    error::{Error, Result},
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, info, warn};
use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

/// Speech capability
pub trait Speaker {
    /// Say `text`
    ///
    /// # Errors
    ///
    /// Returns `Speech` if the utterance could not be produced or queued
    fn speak(&self, text: &str) -> Result<()>;
}

/// Speaker that stays silent, used when alerts are disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&self, text: &str) -> Result<()> {
        debug!("Alert muted: {}", text);
        Ok(())
    }
}

/// How the text reaches the speech program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDelivery {
    /// Appended as the last argument
    #[default]
    Argument,
    /// Written to standard input
    Stdin,
}

/// Program and arguments speaking standard input through Windows SAPI
///
/// `-Command` joins every later argument into the script, so the text
/// cannot be passed as an argument.
#[must_use]
pub fn sapi_invocation(rate: u32) -> (String, Vec<String>) {
    // SAPI rate runs from -10 to 10 with 0 close to 180 wpm
    let sapi_rate = ((i64::from(rate) - 180) / 20).clamp(-10, 10);
    let script = format!(
        "Add-Type -AssemblyName System.Speech; \
         $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
         $s.Rate = {sapi_rate}; $s.Speak([Console]::In.ReadToEnd())"
    );
    (
        "powershell".to_string(),
        vec!["-NoProfile".to_string(), "-NonInteractive".to_string(), "-Command".to_string(), script],
    )
}

/// Speaks by running an external text-to-speech program
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    delivery: TextDelivery,
}

impl CommandSpeaker {
    /// Speaker running `program` with `args` followed by the text
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            delivery: TextDelivery::Argument,
        }
    }

    /// Choose how the text reaches the program
    #[must_use]
    pub fn with_delivery(mut self, delivery: TextDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Platform default program at `rate` words per minute
    #[must_use]
    pub fn platform_default(rate: u32) -> Self {
        if cfg!(target_os = "macos") {
            Self::new("say", vec!["-r".to_string(), rate.to_string()])
        } else if cfg!(target_os = "windows") {
            let (program, args) = sapi_invocation(rate);
            Self::new(program, args).with_delivery(TextDelivery::Stdin)
        } else {
            Self::new("espeak-ng", vec!["-s".to_string(), rate.to_string()])
        }
    }

    /// Build from the alert configuration
    #[must_use]
    pub fn from_config(config: &AlertConfig) -> Self {
        match &config.speech_program {
            Some(program) => Self::new(program.clone(), config.speech_args.clone()),
            None => Self::platform_default(config.rate),
        }
    }

    /// Program that will be run
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed before the text
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// How the text is handed to the program
    #[must_use]
    pub fn delivery(&self) -> TextDelivery {
        self.delivery
    }

    fn run_with_stdin(mut command: Command, text: &str) -> std::io::Result<ExitStatus> {
        let mut child = command.stdin(Stdio::piped()).spawn()?;
        // Dropping stdin closes the pipe so the program sees end of input
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        written.map(|()| status)
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);

        let status = match self.delivery {
            TextDelivery::Argument => command.arg(text).status(),
            TextDelivery::Stdin => Self::run_with_stdin(command, text),
        }
        .map_err(|e| Error::Speech(format!("Failed to run {}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Speech(format!("{} exited with {status}", self.program)))
        }
    }
}

/// Counters kept by the alert worker
#[derive(Debug, Default)]
pub struct AlertMetrics {
    pub spoken: AtomicU64,
    pub failed: AtomicU64,
    pub dropped: AtomicU64,
}

/// Point-in-time copy of [`AlertMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertMetricsSnapshot {
    pub spoken: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl AlertMetrics {
    /// Read all counters
    pub fn snapshot(&self) -> AlertMetricsSnapshot {
        AlertMetricsSnapshot {
            spoken: self.spoken.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

enum WorkerCmd {
    Speak(String),
    Flush { response_tx: Sender<()> },
    Shutdown,
}

/// Speaks on a background thread
///
/// `speak` only queues the text. When the queue is full the utterance is
/// dropped and counted.
pub struct AlertWorker {
    tx: Sender<WorkerCmd>,
    metrics: Arc<AlertMetrics>,
    worker_thread: Option<thread::JoinHandle<()>>,
}

impl AlertWorker {
    /// Start a worker owning `speaker`
    ///
    /// # Errors
    ///
    /// Returns `Speech` if the worker thread cannot be spawned
    pub fn start<S>(speaker: S, capacity: usize) -> Result<Self>
    where
        S: Speaker + Send + 'static,
    {
        let (tx, rx) = bounded(capacity.max(1));
        let metrics = Arc::new(AlertMetrics::default());
        let metrics_clone = Arc::clone(&metrics);

        let worker_thread = thread::Builder::new()
            .name("posture-alerts".to_string())
            .spawn(move || Self::run_loop(&speaker, &rx, &metrics_clone))
            .map_err(|e| Error::Speech(format!("Failed to spawn alert worker: {e}")))?;

        info!("Alert worker started");
        Ok(Self {
            tx,
            metrics,
            worker_thread: Some(worker_thread),
        })
    }

    /// Block until every utterance queued so far has been handled
    ///
    /// # Errors
    ///
    /// Returns `Speech` if the worker has stopped
    pub fn flush(&self) -> Result<()> {
        let (response_tx, response_rx) = bounded(1);
        self.tx
            .send(WorkerCmd::Flush { response_tx })
            .map_err(|_| Error::Speech("alert worker channel closed".to_string()))?;
        response_rx
            .recv()
            .map_err(|_| Error::Speech("alert worker stopped before flushing".to_string()))
    }

    /// Current counters
    #[must_use]
    pub fn metrics(&self) -> AlertMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop the worker after it drains the queue
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.worker_thread.take() {
            let _ = self.tx.send(WorkerCmd::Shutdown);
            if handle.join().is_err() {
                warn!("Alert worker panicked");
            }
        }
    }

    fn run_loop<S: Speaker>(speaker: &S, rx: &Receiver<WorkerCmd>, metrics: &AlertMetrics) {
        while let Ok(cmd) = rx.recv() {
            match cmd {
                WorkerCmd::Speak(text) => match speaker.speak(&text) {
                    Ok(()) => {
                        metrics.spoken.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        metrics.failed.fetch_add(1, Ordering::Relaxed);
                        warn!("Alert speech failed: {}", e);
                    }
                },
                WorkerCmd::Flush { response_tx } => {
                    let _ = response_tx.send(());
                }
                WorkerCmd::Shutdown => break,
            }
        }
        debug!("Alert worker exiting");
    }
}

impl Speaker for AlertWorker {
    fn speak(&self, text: &str) -> Result<()> {
        match self.tx.try_send(WorkerCmd::Speak(text.to_string())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                Err(Error::Speech("alert queue full, utterance dropped".to_string()))
            }
            Err(TrySendError::Disconnected(_)) => Err(Error::Speech("alert worker channel closed".to_string())),
        }
    }
}

impl Drop for AlertWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build the speaker described by the alert configuration
///
/// # Errors
///
/// Returns `Speech` if the asynchronous worker cannot be started
pub fn speaker_from_config(config: &AlertConfig) -> Result<Box<dyn Speaker>> {
    if !config.enabled {
        info!("Spoken alerts disabled");
        return Ok(Box::new(SilentSpeaker));
    }

    let speaker = CommandSpeaker::from_config(config);
    info!("Spoken alerts via {} ({:?})", speaker.program(), config.mode);
    match config.mode {
        AlertMode::Blocking => Ok(Box::new(speaker)),
        AlertMode::Async => Ok(Box::new(AlertWorker::start(speaker, config.queue_capacity)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct RecordingSpeaker {
        spoken: Arc<Mutex<Vec<String>>>,
    }

    impl Speaker for RecordingSpeaker {
        fn speak(&self, text: &str) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct FailingSpeaker;

    impl Speaker for FailingSpeaker {
        fn speak(&self, _text: &str) -> Result<()> {
            Err(Error::Speech("no audio device".to_string()))
        }
    }

    struct SlowSpeaker;

    impl Speaker for SlowSpeaker {
        fn speak(&self, _text: &str) -> Result<()> {
            thread::sleep(Duration::from_millis(200));
            Ok(())
        }
    }

    #[test]
    fn test_worker_speaks_in_order() {
        let recorder = RecordingSpeaker::default();
        let worker = AlertWorker::start(recorder.clone(), 4).unwrap();

        worker.speak("first").unwrap();
        worker.speak("second").unwrap();
        worker.flush().unwrap();

        assert_eq!(*recorder.spoken.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(worker.metrics().spoken, 2);
        worker.shutdown();
    }

    #[test]
    fn test_worker_counts_failures() {
        let worker = AlertWorker::start(FailingSpeaker, 2).unwrap();
        worker.speak("hello").unwrap();
        worker.flush().unwrap();

        let metrics = worker.metrics();
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.spoken, 0);
    }

    #[test]
    fn test_worker_drops_when_full() {
        let worker = AlertWorker::start(SlowSpeaker, 1).unwrap();

        // One utterance in flight, one queued, the rest dropped
        let results: Vec<bool> = (0..5).map(|_| worker.speak("slow").is_ok()).collect();
        assert!(results.iter().any(|ok| !ok));
        assert!(worker.metrics().dropped >= 1);
    }

    #[test]
    fn test_speak_does_not_block_on_slow_backend() {
        let worker = AlertWorker::start(SlowSpeaker, 4).unwrap();
        let start = std::time::Instant::now();
        worker.speak("slow").unwrap();
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_command_speaker_reports_missing_program() {
        let speaker = CommandSpeaker::new("definitely-not-a-speech-program", Vec::new());
        assert!(matches!(speaker.speak("hello"), Err(Error::Speech(_))));
    }

    #[test]
    fn test_command_speaker_from_config_override() {
        let config = AlertConfig {
            speech_program: Some("espeak".to_string()),
            speech_args: vec!["-v".to_string(), "en".to_string()],
            ..AlertConfig::default()
        };
        let speaker = CommandSpeaker::from_config(&config);
        assert_eq!(speaker.program(), "espeak");
        assert_eq!(speaker.args(), ["-v".to_string(), "en".to_string()]);
    }

    #[test]
    fn test_sapi_script_reads_text_from_stdin() {
        let (program, args) = sapi_invocation(150);
        assert_eq!(program, "powershell");

        // The script must be the last argument so nothing is appended to it
        let (script, leading) = args.split_last().unwrap();
        assert_eq!(leading.last().map(String::as_str), Some("-Command"));
        assert!(script.contains("$s.Speak([Console]::In.ReadToEnd())"));
        assert!(!script.contains("$args"));
        assert!(script.contains("$s.Rate = -1;"));
    }

    #[test]
    fn test_sapi_rate_is_clamped() {
        let (_, fast) = sapi_invocation(1000);
        let (_, slow) = sapi_invocation(0);
        assert!(fast[3].contains("$s.Rate = 10;"));
        assert!(slow[3].contains("$s.Rate = -9;"));
    }

    #[test]
    fn test_platform_default_delivery() {
        let speaker = CommandSpeaker::platform_default(150);
        if cfg!(target_os = "windows") {
            assert_eq!(speaker.delivery(), TextDelivery::Stdin);
        } else {
            assert_eq!(speaker.delivery(), TextDelivery::Argument);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_delivery_passes_text_verbatim() {
        let check = "test \"$(cat)\" = \"Don't slouch; sit up\"";
        let speaker = CommandSpeaker::new("sh", vec!["-c".to_string(), check.to_string()])
            .with_delivery(TextDelivery::Stdin);
        speaker.speak("Don't slouch; sit up").unwrap();
        assert_eq!(speaker.args().len(), 2);

        // Any other text fails the comparison
        assert!(speaker.speak("something else").is_err());
    }

    #[test]
    fn test_disabled_alerts_are_silent() {
        let config = AlertConfig {
            enabled: false,
            ..AlertConfig::default()
        };
        let speaker = speaker_from_config(&config).unwrap();
        assert!(speaker.speak("ignored").is_ok());
    }
}
