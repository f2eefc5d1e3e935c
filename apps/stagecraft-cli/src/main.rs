use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use glam::Vec2;
use stagecraft_assets::{LoadMode, LoadedAsset, loaded_event_code};
use stagecraft_common::NodeId;
use stagecraft_events::{Event, EventSource};
use stagecraft_render::{FixedSurface, RecordingRenderer};
use stagecraft_scene::{Material, MaterialDesc, Node, Stage, StageConfig};
use stagecraft_tools::StageInspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stagecraft", about = "CLI tool for stagecraft scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct StageArgs {
    /// Stage config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory asset paths resolve against
    #[arg(long)]
    base_dir: Option<PathBuf>,
    /// Decode assets on the calling thread (deterministic frame output)
    #[arg(long)]
    inline: bool,
    /// Deferred events dispatched per tick
    #[arg(long)]
    drain_budget: Option<usize>,
    /// Viewport width
    #[arg(long, default_value = "640")]
    width: u32,
    /// Viewport height
    #[arg(long, default_value = "480")]
    height: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run the demo stage headless and print each frame's draw list
    Demo {
        /// Number of frames to run
        #[arg(short, long, default_value = "5")]
        frames: u64,
        #[command(flatten)]
        stage: StageArgs,
    },
    /// Build the demo stage, run one frame, and print its scene and resources
    Inspect {
        #[command(flatten)]
        stage: StageArgs,
    },
    /// Print the effective stage config as JSON
    Config {
        #[command(flatten)]
        stage: StageArgs,
    },
}

impl StageArgs {
    fn load_config(&self) -> anyhow::Result<StageConfig> {
        let mut config = match &self.config {
            Some(path) => StageConfig::load(path)?,
            None => StageConfig::default(),
        };
        if let Some(dir) = &self.base_dir {
            config.resources.base_dir = dir.clone();
        }
        if self.inline {
            config.resources.load_mode = LoadMode::Inline;
        }
        if let Some(budget) = self.drain_budget {
            config.drain_budget = budget;
        }
        config.validate()?;
        Ok(config)
    }

    fn surface(&self) -> FixedSurface {
        FixedSurface::new(self.width, self.height)
    }
}

/// A backdrop, a ship with an attached thruster, and a flat-color overlay.
fn build_demo(stage: &mut Stage) -> anyhow::Result<()> {
    let backdrop = Node::create(
        NodeId(1),
        "backdrop",
        Vec2::ZERO,
        -10.0,
        Vec2::new(640.0, 480.0),
        0.0,
    );
    stage.spawn_with(backdrop, &MaterialDesc {
        texture: Some("textures/backdrop.png".into()),
        ..MaterialDesc::new("sprite")
    })?;

    let ship = Node::create(
        NodeId(2),
        "ship",
        Vec2::new(300.0, 220.0),
        0.0,
        Vec2::new(32.0, 32.0),
        0.0,
    )
    .with_material(Material::sprite("textures/ship.png"));
    stage.spawn(ship)?;

    let thruster = Node::create(
        NodeId(3),
        "thruster",
        Vec2::new(0.25, 1.0),
        0.0,
        Vec2::new(0.5, 0.5),
        0.0,
    )
    .with_material(Material::color([1.0, 0.5, 0.1, 1.0]));
    stage.spawn_under(NodeId(2), thruster)?;

    let overlay = stage
        .materials()
        .create_from_json(r#"{"type": "color", "tint": [0.0, 0.0, 0.0, 0.25]}"#)?;
    stage.spawn(
        Node::create(NodeId(4), "overlay", Vec2::ZERO, 5.0, Vec2::new(640.0, 48.0), 0.0)
            .with_material(overlay),
    )?;

    let key = stage
        .resources()
        .assets()?
        .canonicalize("textures/ship.png");
    stage.bus_mut().subscribe(
        loaded_event_code(&key),
        Rc::new(|event: &Event| {
            if let Some(asset) = event.context_as::<LoadedAsset>() {
                tracing::info!(path = %asset.path, digest = asset.digest.0, "ship texture ready");
            }
        }),
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("stagecraft v{}", env!("CARGO_PKG_VERSION"));
            println!("events: drain budget={}", stagecraft_events::DEFAULT_DRAIN_BUDGET);
            println!("assets: {}", stagecraft_assets::crate_info());
            println!("render: {}", stagecraft_render::crate_info());
            println!("scene: {}", stagecraft_scene::crate_info());
            println!("tools: {}", stagecraft_tools::crate_info());
        }
        Commands::Demo { frames, stage: args } => {
            let config = args.load_config()?;
            let dt = config.tick_rate as f32;
            let surface = args.surface();
            let mut stage = Stage::new(config)?;
            build_demo(&mut stage)?;
            let mut renderer = RecordingRenderer::new();

            for frame in 0..frames {
                if let Some(ship) = stage.graph_mut().get_node_mut(NodeId(2)) {
                    ship.set_rotation(frame as f32 * 0.1);
                }
                stage.post(Event::new("frame", EventSource::Other("cli".into())));
                let report = stage.tick(dt, &surface, &mut renderer)?;
                print!("{}", renderer.render_text());
                println!(
                    "loads={} dispatched={} pending={}",
                    report.loads_completed, report.events_dispatched, report.events_pending
                );
            }
            println!("{}", StageInspector::summary(&stage));
            stage.shutdown()?;
        }
        Commands::Inspect { stage: args } => {
            let config = args.load_config()?;
            let surface = args.surface();
            let dt = config.tick_rate as f32;
            let mut stage = Stage::new(config)?;
            build_demo(&mut stage)?;
            let mut renderer = RecordingRenderer::new();
            stage.tick(dt, &surface, &mut renderer)?;

            println!("{}", StageInspector::summary(&stage));
            print!("{}", StageInspector::tree(stage.graph()));
            for id in StageInspector::list_nodes(stage.graph()) {
                if let Some(info) = StageInspector::inspect_node(stage.graph(), id) {
                    println!("{info}");
                }
            }
            for entry in StageInspector::resources(&stage) {
                println!("{entry}");
            }
        }
        Commands::Config { stage: args } => {
            let config = args.load_config()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
