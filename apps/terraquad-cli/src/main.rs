mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use serde::Serialize;
use terraquad_common::{EntityKind, EntityRef, KindFilter, NodeId, SplitMix};
use terraquad_lod::{LodIndex, VertexWindow};
use terraquad_occupancy::OccupancyIndex;
use terraquad_tools::IndexInspector;
use tracing_subscriber::EnvFilter;

use crate::config::TerraquadConfig;

#[derive(Parser)]
#[command(name = "terraquad-cli", about = "CLI tool for terrain and occupancy quadtrees")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML or JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Build the LOD index and run one visibility pass
    Lod {
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        viewer_x: f32,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        viewer_z: f32,
        /// View radius; defaults to the configured one
        #[arg(short, long)]
        radius: Option<f32>,
        /// Print the visible patches as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scatter entities into the occupancy index and query around one
    Occupancy {
        #[arg(short, long, default_value = "100")]
        agents: usize,
        #[arg(short, long, default_value = "20")]
        emitters: usize,
        /// RNG seed for entity placement
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Neighbor query radius
        #[arg(short, long, default_value = "500")]
        radius: f32,
    },
}

/// One visible patch, as handed to a renderer.
#[derive(Serialize)]
struct PatchExport {
    id: NodeId,
    depth: u32,
    vertex_window: VertexWindow,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => TerraquadConfig::load(path)?,
        None => TerraquadConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("terraquad-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", terraquad_common::crate_info());
            println!("lod: {}", terraquad_lod::crate_info());
            println!("occupancy: {}", terraquad_occupancy::crate_info());
            println!("tools: {}", terraquad_tools::crate_info());
        }
        Commands::Lod {
            viewer_x,
            viewer_z,
            radius,
            json,
        } => {
            let mut index = LodIndex::from_config(config.world, &config.lod)
                .context("building LOD index")?;
            let viewer = Vec3::new(viewer_x, 0.0, viewer_z);
            let stats = match radius {
                Some(r) => index.update_visibility(viewer, r),
                None => index.refresh(viewer),
            };
            tracing::info!(
                visible = stats.visible_nodes,
                leaves = stats.visible_leaves,
                frame_time = ?stats.frame_time,
                "visibility pass"
            );

            if json {
                let patches: Vec<PatchExport> = index
                    .visible_nodes()
                    .map(|n| PatchExport {
                        id: n.id,
                        depth: n.depth,
                        vertex_window: n.vertex_window,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&patches)?);
            } else {
                println!("{}", IndexInspector::lod_summary(&index));
                for node in index.visible_nodes() {
                    let tl = node.vertex_window.top_left();
                    let br = node.vertex_window.bottom_right();
                    println!(
                        "  [{}] depth={} grid=({}, {})..({}, {})",
                        node.id, node.depth, tl.x, tl.z, br.x, br.z
                    );
                }
            }
        }
        Commands::Occupancy {
            agents,
            emitters,
            seed,
            radius,
        } => {
            let mut index = OccupancyIndex::from_config(config.world, &config.occupancy)
                .context("building occupancy index")?;
            let world = index.bounds();
            let mut rng = SplitMix::new(seed);

            let kinds = std::iter::repeat_n(EntityKind::Agent, agents)
                .chain(std::iter::repeat_n(EntityKind::Emitter, emitters));
            let mut first_agent = None;
            for kind in kinds {
                let pos = Vec3::new(
                    rng.range_f32(world.left, world.right),
                    0.0,
                    rng.range_f32(world.top, world.bottom),
                );
                let mut entity = EntityRef::new(kind, pos);
                index
                    .insert(&mut entity)
                    .with_context(|| format!("inserting entity at ({}, {})", pos.x, pos.z))?;
                if kind == EntityKind::Agent && first_agent.is_none() {
                    first_agent = Some(entity);
                }
            }

            println!("{}", IndexInspector::occupancy_summary(&index));
            print!("{}", IndexInspector::tree_report(&index));

            if let Some(origin) = first_agent {
                let neighbors = index
                    .range_query(&origin, KindFilter::All, radius)
                    .context("querying neighbors")?;
                println!(
                    "Agent [{}] has {} entities within r={radius} (including itself)",
                    origin.id.short(),
                    neighbors.len()
                );
            }
        }
    }

    Ok(())
}
