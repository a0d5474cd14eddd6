use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parley::voice::{AudioPlayback, Interrupt, NullSpeech, SpeechEngine, TextToSpeech, VoiceOutput};
use parley::{Config, ConsoleOutput, FileTranscript, OpenAiChatClient, SessionLoop, StdinPrompt};

/// Parley - Voice-interactive chat assistant
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Path to a config file (defaults to ./parley.toml, then XDG config)
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice output (for headless machines without audio hardware)
    #[arg(long, env = "PARLEY_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley=info",
        1 => "info,parley=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, &text).await,
        };
    }

    // One listener owns Ctrl-C for the whole process: it stops an active
    // clip, or exits the way the default handler would outside playback
    let interrupt = Interrupt::default();
    interrupt.listen();

    tracing::info!(
        model = config.chat.model,
        base_url = config.chat.base_url,
        disable_voice = cli.disable_voice,
        "starting parley"
    );

    config.ensure_dirs()?;

    let completion = Box::new(OpenAiChatClient::new(
        &config.chat.base_url,
        config.api_key(),
        config.chat.model.clone(),
    ));

    let speech: Box<dyn SpeechEngine> = if config.voice.enabled && !cli.disable_voice {
        Box::new(VoiceOutput::new(&config, interrupt)?)
    } else {
        tracing::info!("voice output disabled");
        Box::new(NullSpeech)
    };

    let transcript = Box::new(FileTranscript::new(config.artifacts.transcript_dir.clone()));

    let mut session = SessionLoop::new(
        config,
        completion,
        speech,
        transcript,
        Box::new(ConsoleOutput),
        Box::new(StdinPrompt),
    );
    session.run().await?;

    Ok(())
}

/// Play a short sine tone to verify the default output device
async fn test_speaker() -> anyhow::Result<()> {
    println!("Speaker check: playing a 440 Hz tone for 2 seconds.\n");

    let interrupt = Interrupt::default();
    interrupt.listen();
    let playback = AudioPlayback::new(interrupt)?;

    let sample_rate = 24_000_i32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    // Sine at moderate volume so a misconfigured mixer is still safe
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    playback.play(samples).await?;

    println!("Done. Silence usually means the wrong default sink;");
    println!("`pactl list sinks short` shows what is available.");

    Ok(())
}

/// Test TTS synthesis and playback
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = TextToSpeech::new(
        &config.voice.tts_base_url,
        config.api_key(),
        config.voice.tts_model.clone(),
        config.voice.tts_voice.clone(),
        config.voice.tts_speed,
    )?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    // Check MP3 header
    if mp3_data.len() > 3 {
        println!(
            "First 4 bytes: {:02x} {:02x} {:02x} {:02x}",
            mp3_data[0], mp3_data[1], mp3_data[2], mp3_data[3]
        );
    }

    println!("Playing audio...");
    let interrupt = Interrupt::default();
    interrupt.listen();
    let playback = AudioPlayback::new(interrupt)?;
    playback.play_mp3(&mp3_data).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
