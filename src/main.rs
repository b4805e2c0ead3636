use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use orik_cohost::audio::cache::AudioCache;
use orik_cohost::{
    Cohost, CohostBuilder, Config, DeckFileSource, DigLibrary, HttpSpeechSource, SpeakerSink,
    SpeechSource, StatusObserver, SystemStatus,
};

/// Orik - sarcastic AI co-host for live presentations
#[derive(Parser)]
#[command(name = "orik", version, about)]
struct Cli {
    /// Deck description file to watch
    #[arg(short, long, env = "ORIK_DECK_PATH")]
    deck: Option<std::path::PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test speaker output
    TestSpeaker,
    /// Test TTS synthesis and playback
    TestTts {
        /// Text to speak
        #[arg(default_value = "Oh good, the audio pipeline works. How surprising.")]
        text: String,
    },
    /// Make Orik respond to a prompt right now
    Say {
        /// Prompt text
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,orik_cohost=info",
        1 => "info,orik_cohost=debug",
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
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&text).await,
            Command::Say { text } => say(cli.deck, &text).await,
        };
    }

    let config = Config::load()?;
    let cohost = build_cohost(cli.deck, &config)?;

    cohost.start().await?;
    tracing::info!("orik is watching the presentation - ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    cohost.stop().await;

    Ok(())
}

/// Console status reporter for the foreground run
struct ConsoleObserver;

impl StatusObserver for ConsoleObserver {
    fn on_status_changed(&self, status: &SystemStatus) {
        if !status.fully_operational() {
            tracing::warn!(failed = ?status.failed_components(), "degraded");
        }
    }

    fn on_speaking_changed(&self, speaking: bool) {
        if speaking {
            tracing::info!("orik is speaking");
        }
    }

    fn on_error(&self, message: &str) {
        tracing::error!(error = %message, "pipeline error");
    }
}

fn build_cohost(deck: Option<std::path::PathBuf>, config: &Config) -> anyhow::Result<Cohost> {
    let deck_path = deck
        .or_else(|| config.deck_path.clone())
        .ok_or_else(|| anyhow::anyhow!("no deck file: pass --deck or set ORIK_DECK_PATH"))?;

    let speech = speech_source(config)?;
    let sink = Arc::new(SpeakerSink::new()?);
    let cache = AudioCache::open_bounded(&config.cache_dir, config.cache_max_bytes)?;

    let cohost = CohostBuilder::new(
        Arc::new(DeckFileSource::new(deck_path)),
        speech,
        sink,
        cache,
        Arc::new(DigLibrary::new()),
    )
    .personality(config.personality.clone())
    .voice(config.voice.clone())
    .poll_interval(config.poll_interval)
    .observer(Arc::new(ConsoleObserver))
    .build()?;

    Ok(cohost)
}

fn speech_source(config: &Config) -> anyhow::Result<Arc<dyn SpeechSource>> {
    if let Some(key) = &config.api_keys.openai {
        return Ok(Arc::new(HttpSpeechSource::new_openai(key.clone())?));
    }
    if let Some(key) = &config.api_keys.elevenlabs {
        return Ok(Arc::new(HttpSpeechSource::new_elevenlabs(key.clone())?));
    }
    Err(anyhow::anyhow!(
        "no TTS provider: set OPENAI_API_KEY or ELEVENLABS_API_KEY"
    ))
}

fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sink = SpeakerSink::new()?;

    // 2 seconds of 440Hz sine at 24kHz
    let sample_rate = 24000_f32;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate * 2.0) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    sink.play_samples(samples)?;

    println!("If you heard the tone, your speakers are working.");
    Ok(())
}

async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    let speech = speech_source(&config)?;

    println!("Synthesizing speech...");
    let mp3_data = speech.synthesize(text, &config.voice).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    let sink = SpeakerSink::new()?;
    orik_cohost::audio::AudioSink::play(&sink, &mp3_data).await?;

    println!("Done.");
    Ok(())
}

async fn say(deck: Option<std::path::PathBuf>, text: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    // The deck is optional here; fall back to a throwaway path since only
    // the audio pipeline runs
    let deck = deck
        .or_else(|| config.deck_path.clone())
        .unwrap_or_else(|| std::path::PathBuf::from("deck.json"));

    let speech = speech_source(&config)?;
    let sink = Arc::new(SpeakerSink::new()?);
    let cache = AudioCache::open_bounded(&config.cache_dir, config.cache_max_bytes)?;

    let cohost = CohostBuilder::new(
        Arc::new(DeckFileSource::new(deck)),
        speech,
        sink,
        cache,
        Arc::new(DigLibrary::new()),
    )
    .personality(config.personality.clone())
    .voice(config.voice.clone())
    .build()?;

    cohost.start_audio();
    let record = cohost.force_response(text).await;
    println!("Orik: {}", record.speech);

    cohost.drain_audio().await;
    Ok(())
}
