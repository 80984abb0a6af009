//! synmesh CLI - synapse geometry from connectivity graphs.
//!
//! Usage: synmesh [--config <FILE>] [--graph <CSV>] [--registry <CSV>] <COMMAND>
//!
//! Run `synmesh --help` for available commands.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::Point3;

use synmesh::config::SynMeshConfig;
use synmesh::geometry::{self, BoxMeshOptions};
use synmesh::graph::{
    CellId, Direction, GraphIndex, NeighborDirection, TypeFilter, UnregisteredPolicy,
};
use synmesh::query::{GeometryKind, GeometryRequest, QueryFacade, SynapseGeometry};
use synmesh::soma::{SomaSurvey, View};

#[derive(Parser)]
#[command(name = "synmesh")]
#[command(author, version, about = "Synapse geometry CLI", long_about = None)]
struct Cli {
    /// Config file (default: $SYNMESH_CONFIG or ./synmesh.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Graph edge list, overrides the config
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    /// Cell registry, overrides the config
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Keep edges to unregistered cells, treating them as unknown type
    #[arg(long, global = true)]
    allow_unregistered: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display graph and registry information
    Info,

    /// Display a cell's type and synapse counts
    Cell {
        /// Cell id
        cell: u64,
    },

    /// Build synapse points and boxes for a cell
    Synapses {
        /// Cell id
        cell: u64,

        /// Synapse direction
        #[arg(short, long, value_enum, default_value = "both")]
        direction: DirectionArg,

        /// Build location point sets
        #[arg(long)]
        points: bool,

        /// Skip bounding-box meshes
        #[arg(long)]
        no_boxes: bool,

        /// Fail if the cell has no synapses in a queried direction
        #[arg(long)]
        strict: bool,

        /// Build boxes in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// List the partner cells of a cell
    Neighbors {
        /// Cell id
        cell: u64,

        /// Synapse direction
        #[arg(short, long, value_enum, default_value = "both")]
        direction: DirectionArg,

        /// Partner type
        #[arg(short = 't', long, value_enum, default_value = "all")]
        filter: FilterArg,
    },

    /// Estimate soma centres from cursor readings on stdin
    ///
    /// Each line is `xz|yz|xy <x> <y> <z>` or `skip`. Views are taken in the
    /// order xz, yz, xy per cell. Estimates are printed as CSV.
    Soma {
        /// Cells to survey (default: every registered cell)
        cells: Vec<u64>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    /// Synapses onto the cell
    In,
    /// Synapses from the cell
    Out,
    /// Both directions
    Both,
}

impl From<DirectionArg> for NeighborDirection {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::In => NeighborDirection::Incoming,
            DirectionArg::Out => NeighborDirection::Outgoing,
            DirectionArg::Both => NeighborDirection::Both,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FilterArg {
    /// Smooth and spiny partners
    All,
    /// Smooth (inhibitory) partners
    Smooth,
    /// Spiny (excitatory) partners
    Spiny,
}

impl From<FilterArg> for TypeFilter {
    fn from(f: FilterArg) -> Self {
        match f {
            FilterArg::All => TypeFilter::All,
            FilterArg::Smooth => TypeFilter::SmoothOnly,
            FilterArg::Spiny => TypeFilter::SpinyOnly,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<SynMeshConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SynMeshConfig::from_file(path)?,
        None => SynMeshConfig::discover()?,
    };
    if let Some(graph) = &cli.graph {
        config.tables.graph = Some(graph.clone());
    }
    if let Some(registry) = &cli.registry {
        config.tables.registry = Some(registry.clone());
    }
    if cli.allow_unregistered {
        config.load.unregistered = UnregisteredPolicy::TreatAsUnknown;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;

    let start = Instant::now();
    let index = config.open_index()?;
    log::debug!("Index ready in {:.2?}", start.elapsed());

    match cli.command {
        Commands::Info => cmd_info(&index, &config),
        Commands::Cell { cell } => cmd_cell(&index, CellId(cell)),
        Commands::Synapses {
            cell,
            direction,
            points,
            no_boxes,
            strict,
            parallel,
        } => {
            let mut request = GeometryRequest::default()
                .with_points(points)
                .with_boxes(!no_boxes);
            request.require_non_empty = strict;
            let facade = QueryFacade::new(&index, config.mapper())
                .with_box_options(BoxMeshOptions::default().with_parallel(parallel));
            cmd_synapses(&facade, CellId(cell), direction, &request)
        }
        Commands::Neighbors {
            cell,
            direction,
            filter,
        } => cmd_neighbors(&index, &config, CellId(cell), direction, filter),
        Commands::Soma { cells } => cmd_soma(&index, cells),
    }
}

fn cmd_info(index: &GraphIndex, config: &SynMeshConfig) -> Result<(), Box<dyn std::error::Error>> {
    let counts = index.type_counts();
    println!("Synapses: {}", index.len());
    println!(
        "Cells: {} ({} excitatory, {} inhibitory, {} unknown)",
        index.registry().len(),
        counts.excitatory,
        counts.inhibitory,
        counts.unknown
    );

    let mapper = config.mapper();
    let locations: Vec<Point3<f64>> = index.edges().iter().map(|e| mapper.map(&e.location)).collect();
    if let Some((min, max)) = geometry::bounding_box(&locations) {
        println!(
            "Synapse bounds (mesh space): ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    let c = mapper.calibration();
    println!(
        "Calibration: shift=({}, {}, {}), scale_xy={}, scale_z={}, base_scale={}",
        c.shift[0], c.shift[1], c.shift[2], c.scale_xy, c.scale_z, c.base_scale
    );
    Ok(())
}

fn cmd_cell(index: &GraphIndex, cell: CellId) -> Result<(), Box<dyn std::error::Error>> {
    let cell_type = index.cell_type(cell)?;
    println!("Cell {}: {}", cell, cell_type);

    for direction in Direction::ALL {
        let (total, smooth, spiny) = index.subgraph(cell, direction).counts();
        let partners = index.neighbors(cell, direction.into(), TypeFilter::All);
        println!(
            "  {:>3}: {} synapses ({} smooth, {} spiny), {} partner cells",
            direction,
            total,
            smooth,
            spiny,
            partners.len()
        );
    }
    Ok(())
}

fn cmd_synapses(
    facade: &QueryFacade<'_>,
    cell: CellId,
    direction: DirectionArg,
    request: &GeometryRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let directions: &[Direction] = match direction {
        DirectionArg::In => &[Direction::Incoming],
        DirectionArg::Out => &[Direction::Outgoing],
        DirectionArg::Both => &Direction::ALL,
    };

    for &d in directions {
        let start = Instant::now();
        let geometry = facade.synapse_geometry(cell, d, request)?;
        print_geometry(&geometry);
        log::debug!("Built {} geometry in {:.2?}", d, start.elapsed());
    }
    Ok(())
}

fn print_geometry(geometry: &SynapseGeometry) {
    let (total, smooth, spiny) = geometry.counts.as_tuple();
    println!(
        "Cell {} {}: {} synapses ({} smooth, {} spiny)",
        geometry.cell, geometry.direction, total, smooth, spiny
    );

    for stratum in &geometry.strata {
        print!("  {}: {} synapses", stratum.key, stratum.edge_count);
        if let Some(points) = &stratum.points {
            print!(
                ", {} = {} points",
                stratum.key.object_name(GeometryKind::Points),
                points.len()
            );
        }
        if let Some(boxes) = &stratum.boxes {
            print!(
                ", {} = {} vertices, {} faces",
                stratum.key.object_name(GeometryKind::Boxes),
                boxes.num_vertices(),
                boxes.num_faces()
            );
            if let Some((min, max)) = boxes.bounding_box() {
                print!(
                    ", bounds ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
                    min.x, min.y, min.z, max.x, max.y, max.z
                );
            }
        }
        println!();
    }
}

fn cmd_neighbors(
    index: &GraphIndex,
    config: &SynMeshConfig,
    cell: CellId,
    direction: DirectionArg,
    filter: FilterArg,
) -> Result<(), Box<dyn std::error::Error>> {
    let facade = QueryFacade::new(index, config.mapper());
    let neighbors = facade.neighbor_cells(cell, direction.into(), filter.into())?;

    println!("cell_id,cell_type");
    for record in &neighbors {
        println!("{},{}", record.cell_id, record.cell_type.code());
    }
    log::info!("{} neighbors of cell {}", neighbors.len(), cell);
    Ok(())
}

fn parse_reading(line: &str) -> Result<Option<(View, Point3<f64>)>, Box<dyn std::error::Error>> {
    let mut parts = line.split_whitespace();
    let view = match parts.next() {
        Some("skip") => return Ok(None),
        Some("xz") => View::Xz,
        Some("yz") => View::Yz,
        Some("xy") => View::Xy,
        other => return Err(format!("unknown view {:?}", other).into()),
    };
    let coords = parts
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()?;
    if coords.len() != 3 {
        return Err(format!("expected 3 coordinates, got {}", coords.len()).into());
    }
    Ok(Some((view, Point3::new(coords[0], coords[1], coords[2]))))
}

fn cmd_soma(index: &GraphIndex, cells: Vec<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let cells: Vec<CellId> = if cells.is_empty() {
        index.cells()
    } else {
        cells.into_iter().map(CellId).collect()
    };
    for &cell in &cells {
        index.cell_type(cell)?;
    }

    let mut survey = SomaSurvey::new(cells);
    println!("cell_id,x,y,z");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Some(cell) = survey.current() else {
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_reading(&line)? {
            None => {
                log::info!("Skipped cell {}", cell);
                survey.skip();
            }
            Some((view, cursor)) => match survey.record(view, cursor) {
                Ok(Some((cell, c))) => println!("{},{},{},{}", cell, c.x, c.y, c.z),
                Ok(None) => {}
                Err(e) => log::warn!(
                    "Ignored reading for cell {}: {} (expecting {:?})",
                    cell,
                    e,
                    survey.estimator().state().awaited_view()
                ),
            },
        }
    }

    if !survey.is_finished() {
        log::warn!("Input ended before every cell was estimated");
    }
    Ok(())
}
