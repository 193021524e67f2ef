mod ui;

use std::{path::PathBuf, thread::JoinHandle};

use clap::{Parser, Subcommand};
use egui::Vec2;
use log::{error, info, warn};

use robot_console::{
    Cell, ConsoleConfig, ConsoleError, NavigationClient, SessionController, TelemetryLink,
    navigation::HttpNavigationBackend, telemetry::recorder,
};
use ui::console::{ConsoleApp, VIDEO_SIZE};

const MAP_MARGIN_PX: f32 = 40.;
const CONTROLS_HEIGHT_PX: f32 = 160.;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Config file to use instead of the one in the user's config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the operator console
    Run {
        #[arg(short, long)]
        backend_url: Option<String>,

        #[arg(short, long)]
        telemetry_url: Option<String>,

        /// Append every received telemetry message to this JSON lines file
        #[arg(short, long)]
        record: Option<PathBuf>,

        /// Preselect the start cell, as ROW,COL
        #[arg(long)]
        start: Option<Cell>,

        /// Preselect the end cell, as ROW,COL
        #[arg(long)]
        end: Option<Cell>,
    },
    /// Write the effective configuration to the config file
    InitConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<ConsoleConfig, ConsoleError> {
    let loaded = match path {
        Some(path) => ConsoleConfig::from_path(path)?,
        None => ConsoleConfig::from_local_file()?,
    };
    Ok(loaded.unwrap_or_default())
}

fn run(
    mut config: ConsoleConfig,
    backend_url: Option<String>,
    telemetry_url: Option<String>,
    record: Option<PathBuf>,
    preselect: [Option<Cell>; 2],
) -> Result<(), ConsoleError> {
    if let Some(backend_url) = backend_url {
        config.backend_url = backend_url;
    }
    if let Some(telemetry_url) = telemetry_url {
        config.telemetry_url = telemetry_url;
    }

    let grid = config.grid.build();
    let backend = HttpNavigationBackend::new(&config)?;

    let (recorder_sender, recorder_handle): (_, Option<JoinHandle<()>>) = match record {
        Some(path) => {
            let (sender, handle) = recorder::spawn_recorder(path)?;
            (Some(sender), Some(handle))
        }
        None => (None, None),
    };

    let (map_width, map_height) = grid.pixel_size();
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options.viewport.with_inner_size(Vec2::new(
        map_width + VIDEO_SIZE[0] + MAP_MARGIN_PX,
        map_height.max(VIDEO_SIZE[1]) + CONTROLS_HEIGHT_PX,
    ));

    info!(
        "Opening console, backend {}, telemetry {}",
        config.backend_url, config.telemetry_url
    );
    eframe::run_native(
        "Robot Console",
        native_options,
        Box::new(move |cc| {
            // workers wake the window whenever they deliver something
            let repaint = Some(cc.egui_ctx.clone());
            let navigation = NavigationClient::spawn(backend, repaint.clone())?;
            let mut controller = SessionController::new(grid, navigation);
            // preselected endpoints go through the same guards as map clicks
            for cell in preselect.into_iter().flatten() {
                controller.click(cell);
            }

            match TelemetryLink::open(&config.telemetry_url, recorder_sender.clone(), repaint) {
                Ok(link) => controller.attach_telemetry(link),
                Err(e) => error!("Telemetry unavailable: {}", e),
            }

            Ok(Box::new(ConsoleApp::new(
                controller,
                config,
                recorder_sender,
                cc,
            )))
        }),
    )
    .map_err(|e| ConsoleError::Gui {
        reason: e.to_string(),
    })?;

    // the recorder finishes once every sender is gone with the app
    if let Some(handle) = recorder_handle
        && handle.join().is_err()
    {
        warn!("Telemetry recorder thread panicked");
    }
    Ok(())
}

fn init_config(config: &ConsoleConfig, path: Option<&PathBuf>) -> Result<(), ConsoleError> {
    let written = match path {
        Some(path) => {
            config.save_to(path)?;
            path.clone()
        }
        None => config.save()?,
    };
    println!("Wrote config to {}", written.display());
    Ok(())
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .unwrap_or_else(|e| eprintln!("Could not set Ctrl-C handler: {e}"));

    let result = load_config(cli.config.as_ref()).and_then(|config| match cli.command {
        Commands::Run {
            backend_url,
            telemetry_url,
            record,
            start,
            end,
        } => run(config, backend_url, telemetry_url, record, [start, end]),
        Commands::InitConfig => init_config(&config, cli.config.as_ref()),
    });

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
