use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_ask::answer::{AnswerClient, HttpAnswerClient, Outcome};
use voice_ask::api::ApiServer;
use voice_ask::voice::{
    AudioCapture, EndpointState, MicrophoneRecognizer, SpokenAnswers, UtteranceDetector, rms,
};
use voice_ask::{Config, SessionController};

/// Voice Ask - push-to-talk voice assistant
#[derive(Parser)]
#[command(name = "voice-ask", version, about)]
struct Cli {
    /// Port for the web surface
    #[arg(long)]
    port: Option<u16>,

    /// Question-answering endpoint (e.g. http://localhost:5000/ask)
    #[arg(long)]
    endpoint: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable microphone and spoken answers
    #[arg(long, env = "VOICE_ASK_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a typed question and print the answer
    Ask {
        /// Question text
        question: String,
    },
    /// Test microphone input and utterance detection
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Speak text through the configured voice
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,voice_ask=info",
        1 => "info,voice_ask=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_with_options(cli.disable_voice)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(endpoint) = cli.endpoint {
        config.set_endpoint(endpoint)?;
    }
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Ask { question } => ask(&config, &question).await,
            Command::TestMic { duration } => test_mic(duration).await,
            Command::Say { text } => say(&config, &text).await,
        };
    }

    serve(config).await
}

/// Run the controller and the web surface until Ctrl-C
async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        language = %config.voice.language,
        voice = config.voice.enabled,
        "starting voice assistant"
    );

    let answers = Arc::new(HttpAnswerClient::new(&config.answer)?);
    tracing::info!(endpoint = answers.endpoint(), "answer service configured");
    let mut controller = SessionController::new(answers);

    if config.voice.enabled {
        match MicrophoneRecognizer::from_config(&config) {
            Ok(recognizer) => controller = controller.with_capture(Arc::new(recognizer)),
            Err(e) => tracing::error!(error = %e, "speech recognition unavailable"),
        }

        match SpokenAnswers::from_config(&config) {
            Ok(speaker) => controller = controller.with_output(Arc::new(speaker)),
            Err(e) => tracing::warn!(error = %e, "spoken answers disabled"),
        }
    } else {
        tracing::info!("voice disabled; the assistant cannot listen");
    }

    let (session, controller_task) = controller.spawn();
    let server = ApiServer::new(session, config.server.assistant_name.clone(), config.server.port);

    server.run(shutdown_signal()).await?;

    // The server owned the last session handle
    if let Err(e) = controller_task.await {
        tracing::warn!(error = %e, "session controller ended abnormally");
    }

    tracing::info!("voice assistant stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// Ask a typed question
async fn ask(config: &Config, question: &str) -> anyhow::Result<()> {
    let client = HttpAnswerClient::new(&config.answer)?;

    match client.ask(question).await {
        Outcome::Answer(text) => {
            println!("{text}");
            Ok(())
        }
        Outcome::Failure(text) => anyhow::bail!("{text}"),
    }
}

/// Speak text through the output adapter
async fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    let speaker = SpokenAnswers::from_config(config)?;
    println!("Speaking: {text}");
    speaker.say(text).await?;
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let mut detector = UtteranceDetector::new();

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        let state = detector.process(&samples);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}] {:?}",
            i + 1,
            energy,
            peak,
            meter,
            state
        );

        if matches!(state, EndpointState::Complete | EndpointState::NoSpeech) {
            detector.reset();
        }
    }

    capture.stop();
    println!("---\nDone.");
    Ok(())
}
