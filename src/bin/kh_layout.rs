//! Headless layout and selection driver
//!
//! Loads a hyperstructure and/or a spatial dataset, runs the force layout
//! inside a fitted viewport, optionally replays a drawn selection polygon,
//! and prints the result as JSON.
//!
//! Usage:
//!   cargo run --features cli --bin kh-layout -- \
//!     --graph hyperstructure.json \
//!     --spatial spatial_hyperedges.json \
//!     --polygon "-71.2,42.2;-70.9,42.2;-70.9,42.5;-71.2,42.5" \
//!     --mode contained
//!
//! Set `RUST_LOG=kh_canvas=debug` for decision-level logging.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kh_canvas::geometry::SpatialHyperedgePayload;
use kh_canvas::graph::{LinkSegment, PositionUpdate};
use kh_canvas::{
    decode_features, features_from_spatial_hyperedges, global_config, BoundingBox,
    ContainmentMode, DrawEvent, DrawingStateMachine, GraphEngine, Hyperstructure, KhConfig,
    LayoutEngine, Point, ScreenProjection, SpatialFeature, Viewport, ViewportTransform,
};

/// Knowledge-hypergraph layout and spatial selection driver
#[derive(Parser, Debug)]
#[command(name = "kh-layout")]
#[command(about = "Run the hypergraph force layout and polygon selection headlessly")]
struct Args {
    /// Hyperstructure JSON (entities, hyperedges, state_events)
    #[arg(long, short = 'g')]
    graph: Option<PathBuf>,

    /// Spatial dataset: a feature array or a spatial-hyperedge payload
    #[arg(long, short = 's')]
    spatial: Option<PathBuf>,

    /// Settings file (default: $KH_CONFIG_DIR/kh_settings.yaml)
    #[arg(long, short = 'c', env = "KH_SETTINGS")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 800.0)]
    width: f64,

    #[arg(long, default_value_t = 600.0)]
    height: f64,

    /// Maximum simulation ticks; stops early once settled
    #[arg(long, short = 't', default_value_t = 300)]
    ticks: usize,

    /// Selection polygon in world coordinates: "x,y;x,y;x,y"
    #[arg(long, short = 'p', allow_hyphen_values = true)]
    polygon: Option<String>,

    /// Containment mode: overlap | contained (default from settings)
    #[arg(long, short = 'm')]
    mode: Option<ContainmentMode>,
}

#[derive(Serialize)]
struct LayoutOutput {
    viewport: Viewport,
    ticks: usize,
    settled: bool,
    positions: Vec<PositionUpdate>,
    links: Vec<LinkSegment>,
}

#[derive(Serialize)]
struct SelectionOutput {
    mode: ContainmentMode,
    polygon: Vec<Point>,
    baseline: usize,
    features: Vec<SpatialFeature>,
}

#[derive(Serialize)]
struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    layout: Option<LayoutOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selection: Option<SelectionOutput>,
}

fn parse_polygon(s: &str) -> Result<Vec<Point>> {
    s.split(';')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| -> Result<Point> {
            let (x, y) = pair
                .split_once(',')
                .with_context(|| format!("expected x,y but got {pair:?}"))?;
            Ok(Point::new(x.trim().parse()?, y.trim().parse()?))
        })
        .collect()
}

fn read_json(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_features(path: &Path) -> Result<Vec<SpatialFeature>> {
    let value: Value = serde_json::from_str(&read_json(path)?)?;
    match value {
        Value::Array(items) => Ok(decode_features(&items)),
        Value::Object(_) => {
            let payload: SpatialHyperedgePayload = serde_json::from_value(value)?;
            Ok(features_from_spatial_hyperedges(&payload))
        }
        _ => bail!("{} is neither a feature list nor a payload object", path.display()),
    }
}

fn run_layout(config: &KhConfig, args: &Args, path: &Path) -> Result<LayoutOutput> {
    let structure = Hyperstructure::from_json_str(&read_json(path)?)?;

    let mut engine = GraphEngine::new(config.graph.clone());
    let data = engine
        .rebuild_if_changed(&structure)?
        .cloned()
        .unwrap_or_default();

    let mut viewport =
        ViewportTransform::with_config(args.width, args.height, config.viewport.clone());
    viewport.auto_fit(&data.nodes);

    let mut layout = LayoutEngine::new(config.layout.clone());
    layout.sync(data);

    let mut ticks = 0;
    while ticks < args.ticks && !layout.is_settled() {
        layout.tick(&viewport);
        ticks += 1;
    }
    info!(ticks, settled = layout.is_settled(), "layout finished");

    Ok(LayoutOutput {
        viewport: viewport.transform(),
        ticks,
        settled: layout.is_settled(),
        positions: layout.positions(),
        links: layout.link_segments(),
    })
}

/// Stands in for the map: frames the polygon's box in the screen so that
/// close detection sees pixel distances like a user would
struct MapProjection {
    origin: Point,
    scale: f64,
}

impl MapProjection {
    fn framing(points: &[Point], width: f64, height: f64) -> Self {
        match BoundingBox::from_points(points) {
            Some(b) if b.width() > 0.0 && b.height() > 0.0 => Self {
                origin: b.min,
                scale: (width / b.width()).min(height / b.height()) * 0.95,
            },
            _ => Self {
                origin: Point::ZERO,
                scale: 1.0,
            },
        }
    }
}

impl ScreenProjection for MapProjection {
    fn to_screen(&self, world: Point) -> Point {
        (world - self.origin) * self.scale
    }
}

/// Replay the polygon as clicks followed by a double-click
fn run_selection(
    config: &KhConfig,
    args: &Args,
    features: Vec<SpatialFeature>,
) -> Result<SelectionOutput> {
    let mode = args.mode.unwrap_or(config.selection.default_mode);
    let polygon = match &args.polygon {
        Some(p) => parse_polygon(p)?,
        None => Vec::new(),
    };

    let mut machine = DrawingStateMachine::new(config.drawing.clone(), mode);
    let baseline = features.len();
    machine.set_baseline(features);

    if !polygon.is_empty() {
        let projection = MapProjection::framing(&polygon, args.width, args.height);
        machine.start();
        for &vertex in &polygon {
            if let DrawEvent::Closed { .. } = machine.click(vertex, &projection) {
                break;
            }
        }
        if machine.closed_ring().is_none() && machine.double_click() == DrawEvent::Ignored {
            bail!("selection polygon needs at least 3 distinct finite vertices");
        }
    }

    Ok(SelectionOutput {
        mode: machine.selection().mode(),
        polygon: machine.vertices().to_vec(),
        baseline,
        features: machine.visible_features().to_vec(),
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kh_canvas=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => KhConfig::load_from_file(path)?,
        None => global_config().clone(),
    };

    if args.graph.is_none() && args.spatial.is_none() {
        bail!("nothing to do: pass --graph and/or --spatial");
    }

    let layout = args
        .graph
        .as_deref()
        .map(|path| run_layout(&config, &args, path))
        .transpose()?;

    let selection = match &args.spatial {
        Some(path) => Some(run_selection(&config, &args, load_features(path)?)?),
        None => None,
    };

    let output = Output { layout, selection };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
