//! Saw Demo - headless editor run
//!
//! Opens the editor the way a plugin host would, drags the cutoff slider
//! while a simulated audio thread services the bus, then closes it.
//!
//! Usage:
//!   saw-demo                      - 120 ticks with default settings
//!   saw-demo --ticks 600 --paced  - tick at the configured timer period
//!   saw-demo --config editor.toml - load editor settings from TOML

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;

use sd_bridge::{AudioBus, MessageBus};
use sd_core::saw::{CUTOFF, RESONANCE};
use sd_core::{EditorConfig, MessageKind, ParamBank};
use sd_editor::{HeadlessWindows, ManualTimer, PluginGui, PointerState, WindowApi};
use sd_gpu::headless::HeadlessBackend;
use sd_gpu::{DeviceRegistry, WindowHandle};

/// Ticks per simulated slider drag (press, moves, release)
const DRAG_TICKS: u64 = 20;

/// Audio block period of the simulated audio thread
const BLOCK_PERIOD: Duration = Duration::from_millis(2);

#[derive(Parser)]
#[command(name = "saw-demo", about = "Headless saw demo editor run")]
struct Cli {
    /// Editor config (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Timer ticks to deliver
    #[arg(short, long, default_value_t = 120)]
    ticks: u64,

    /// Queue capacity override
    #[arg(long)]
    capacity: Option<usize>,

    /// Sleep for the timer period between ticks
    #[arg(long)]
    paced: bool,
}

/// What the simulated audio thread saw
#[derive(Debug, Default)]
struct AudioReport {
    blocks: u64,
    refreshes: u64,
    begins: u64,
    adjusts: u64,
    ends: u64,
}

impl AudioReport {
    fn count(&mut self, kind: MessageKind) {
        match kind {
            MessageKind::BeginEdit => self.begins += 1,
            MessageKind::AdjustValue => self.adjusts += 1,
            MessageKind::EndEdit => self.ends += 1,
            MessageKind::ValueSnapshot => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    if let Some(capacity) = cli.capacity {
        config.queue_capacity = capacity;
    }
    config.validate().context("Invalid editor config")?;

    let api = WindowApi::native().ok_or_else(|| anyhow!("No native window API on this platform"))?;
    log::info!("Starting saw demo ({} ticks, {} API)", cli.ticks, api.name());

    let bus = MessageBus::new(Arc::new(ParamBank::saw_demo()), config.queue_capacity);
    let status = Arc::clone(bus.status());
    let (ui, audio) = bus.split();

    let running = Arc::new(AtomicBool::new(true));
    let audio_thread = {
        let running = Arc::clone(&running);
        thread::Builder::new()
            .name("saw-audio".into())
            .spawn(move || run_audio(audio, &running))
            .context("Failed to spawn audio thread")?
    };

    let backend = HeadlessBackend::new();
    let gpu_stats = backend.stats();
    let registry = DeviceRegistry::new(backend);
    let mut gui = PluginGui::new(
        registry,
        config.clone(),
        ManualTimer::new(),
        HeadlessWindows::new(),
        ui,
    )?;

    if !gui.is_api_supported(api.name(), false) {
        bail!("Editor does not support the {} API", api.name());
    }
    gui.create(api.name(), false)?;
    let mode = gui.set_parent(WindowHandle::Headless { id: 1 })?;
    log::info!("Editor open, initial snapshot {:?}", mode);

    let started = Instant::now();
    let rendered = drive_editor(&mut gui, &cli, config.timer_interval())?;
    let elapsed = started.elapsed();

    let (cutoff, resonance) = gui
        .session()
        .and_then(|s| s.bus())
        .map(|bus| (bus.value(CUTOFF), bus.value(RESONANCE)))
        .unwrap_or_default();
    gui.destroy()?;

    running.store(false, Ordering::Release);
    let report = audio_thread
        .join()
        .map_err(|_| anyhow!("Audio thread panicked"))?;

    log::info!(
        "Rendered {} frame(s) in {:.1?} ({} presents)",
        rendered,
        elapsed,
        gpu_stats.presents()
    );
    log::info!(
        "Audio thread: {} block(s), {} refresh(es), gestures {}/{}/{} (begin/adjust/end)",
        report.blocks,
        report.refreshes,
        report.begins,
        report.adjusts,
        report.ends
    );
    log::info!(
        "UI mirror at close: cutoff {:?}, resonance {:?}; final polyphony {}",
        cutoff,
        resonance,
        status.polyphony()
    );

    if gpu_stats.live_total() != 0 {
        bail!("{} GPU resource(s) leaked", gpu_stats.live_total());
    }
    if report.begins != report.ends {
        bail!(
            "Unbalanced edit gestures: {} begin, {} end",
            report.begins,
            report.ends
        );
    }
    Ok(())
}

/// Deliver timer ticks while sweeping the cutoff slider back and forth
fn drive_editor(
    gui: &mut PluginGui<HeadlessBackend, ManualTimer, HeadlessWindows>,
    cli: &Cli,
    period: Duration,
) -> Result<u64> {
    let session = gui.session().context("Editor not open")?;
    let timer = session
        .timer_id()
        .context("Host timer was not registered")?;
    let rect = session
        .view()
        .slot(CUTOFF)
        .context("No cutoff control")?
        .rect;
    let y = rect.y + rect.h / 2.0;

    let mut rendered = 0;
    for tick in 0..cli.ticks {
        let step = tick % DRAG_TICKS;
        let t = step as f32 / (DRAG_TICKS - 1) as f32;
        let sweep = if (tick / DRAG_TICKS) % 2 == 0 { t } else { 1.0 - t };
        let down = step + 1 < DRAG_TICKS;
        // Stay inside the track so every press lands on the slider
        let x = rect.x + rect.w * (0.02 + 0.96 * sweep);
        gui.set_pointer(PointerState::at(x, y, down));

        if gui.on_timer(timer)?.is_some() {
            rendered += 1;
        }
        if cli.paced {
            thread::sleep(period);
        }
    }

    // Let go before closing
    gui.set_pointer(PointerState::default());
    if gui.on_timer(timer)?.is_some() {
        rendered += 1;
    }
    Ok(rendered)
}

/// Simulated audio thread: one bus service per block
fn run_audio(mut audio: AudioBus, running: &AtomicBool) -> AudioReport {
    let mut report = AudioReport::default();
    audio.start_processing();

    while running.load(Ordering::Acquire) {
        if audio.service_refresh() > 0 {
            report.refreshes += 1;
        }

        audio.apply_ui_events(|msg| report.count(msg.kind));

        // Voices follow the cutoff so the meter moves
        let voices = audio.params().get(CUTOFF).unwrap_or(0.0) / 2.0;
        audio.status().set_polyphony(voices as i32);

        // Host automation on resonance every 64 blocks
        if report.blocks % 64 == 0 {
            let value = ((report.blocks / 64) % 10) as f64 / 10.0;
            audio.params().set(RESONANCE, value);
            audio.publish_value(RESONANCE, value);
        }

        report.blocks += 1;
        thread::sleep(BLOCK_PERIOD);
    }

    // Drain anything sent during close
    audio.apply_ui_events(|msg| report.count(msg.kind));
    audio.stop_processing();
    report
}
