use anyhow::{anyhow, Context};
use clap::Parser;
use riau_map::{
    interaction::{InteractionHandler, LayerControl},
    ui::{LayerPanel, MapView},
    Map, MapBuilder, MapConfig, Scenario,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "riau-map", about = "Riau green-space and flood map viewer")]
struct Cli {
    /// Prepared map to show
    #[arg(long, env = "RIAU_MAP_SCENARIO", default_value = "green-space")]
    scenario: Scenario,

    /// JSON map configuration; overrides --scenario
    #[arg(long, env = "RIAU_MAP_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding data/ and icon/
    #[arg(long, env = "RIAU_MAP_DATA_ROOT")]
    data_root: Option<PathBuf>,
}

impl Cli {
    fn map_config(&self) -> anyhow::Result<MapConfig> {
        let mut config = match &self.config {
            Some(path) => MapConfig::load(path)
                .map_err(|e| anyhow!("{}", e))
                .with_context(|| format!("loading {}", path.display()))?,
            None => self.scenario.preset(),
        };
        if let Some(root) = &self.data_root {
            config.data_root = Some(root.clone());
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.map_config()?;
    let app = RiauMapApp::new(config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(app.title.clone()),
        ..Default::default()
    };

    eframe::run_native("riau-map", options, Box::new(|_cc| Box::new(app)))
        .map_err(|e| anyhow!("viewer failed: {}", e))
}

struct RiauMapApp {
    title: String,
    attribution: String,
    map: Map,
    interaction: InteractionHandler,
    control: LayerControl,
    panel: LayerPanel,
    view: MapView,
}

impl RiauMapApp {
    fn new(config: MapConfig) -> anyhow::Result<Self> {
        let mut map = MapBuilder::from_config(&config).map_err(|e| anyhow!("{}", e))?;
        // missing checkbox bindings are a startup error
        let control = LayerControl::bind(&map, &config.toggles).map_err(|e| anyhow!("{}", e))?;
        map.load_sources();

        let data_root = config.data_root.clone().unwrap_or_else(|| PathBuf::from("."));
        log::info!("data root {}", data_root.display());

        Ok(Self {
            title: config.title.clone(),
            attribution: config.base_layer.attribution.clone(),
            interaction: InteractionHandler::from_config(&config),
            panel: LayerPanel::new("Layer"),
            view: MapView::new(data_root),
            control,
            map,
        })
    }
}

impl eframe::App for RiauMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(&self.title);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let viewport = self.map.viewport();
                    ui.label(format!(
                        "{:.4}, {:.4} | zoom {:.0}",
                        viewport.center.lat, viewport.center.lng, viewport.zoom
                    ));
                });
            });
        });

        egui::TopBottomPanel::bottom("attribution").show(ctx, |ui| {
            ui.small(&self.attribution);
        });

        egui::SidePanel::left("layer_panel")
            .resizable(true)
            .show(ctx, |ui| {
                self.panel
                    .show(ui, &mut self.map, &mut self.control, &mut self.interaction);
                let (layers, tiles) = (self.map.sources_pending(), self.map.pending_tiles());
                if layers > 0 || tiles > 0 {
                    ui.separator();
                    ui.label(format!("loading {} layers, {} tiles…", layers, tiles));
                }
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.view.show(ui, &mut self.map, &mut self.interaction);
            });

        for event in self.map.process_events() {
            log::trace!("{:?}", event);
        }
    }
}
