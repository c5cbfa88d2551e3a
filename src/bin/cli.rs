//! scaled-colliders CLI - run a headless scaling scenario

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::info;
use nalgebra::Vector3;

use scaled_colliders::config::ScaledColliderConfig;
use scaled_colliders::constants::sim::TIMESTEP;
use scaled_colliders::scene::{
    ColliderShape, ColliderState, Component, MeshRenderer, NodeId, SceneGraph,
};
use scaled_colliders::sim::{SimAvatar, SimWorld};
use scaled_colliders::ScaledColliderSystem;

#[derive(Parser)]
#[command(name = "scaled-colliders")]
#[command(about = "Scaled collider system demo host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless demo world for a number of ticks
    Run {
        /// Path to a scaling.toml (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Local avatar eye height in meters
        #[arg(short, long, default_value = "0.8")]
        eye_height: f32,
        /// Number of 60 Hz ticks to simulate
        #[arg(short, long, default_value = "120")]
        ticks: u64,
    },
    /// Parse a configuration file and print the effective settings
    Config {
        /// Path to a scaling.toml
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    match Cli::parse().command {
        Commands::Run {
            config,
            eye_height,
            ticks,
        } => run(config, eye_height, ticks),
        Commands::Config { path } => match ScaledColliderConfig::from_file(&path) {
            Ok(config) => {
                println!("{config:#?}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(config_path: Option<PathBuf>, eye_height: f32, ticks: u64) -> ExitCode {
    let config = match config_path {
        Some(path) => match ScaledColliderConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => ScaledColliderConfig {
            ghost_material: Some("Ghost".to_string()),
            ..Default::default()
        },
    };

    let mut scene = SceneGraph::new();
    let root = build_demo_world(&mut scene);
    let mut system = ScaledColliderSystem::new(config);
    let mut world = SimWorld::new(scene, SimAvatar::local(eye_height));
    world.local.position = Vector3::new(0.0, 0.0, 4.0);
    world.local.velocity = Vector3::new(0.0, 0.0, -1.0);

    world.start(&mut system, Some(root));
    info!(
        "started: player_scale={:.3} world_scale={:.3} walk_speed={:.3}",
        system.player_scale(),
        system.world_scale(),
        world.local.walk_speed
    );

    let mut contacts = 0usize;
    for _ in 0..ticks {
        let events = world.run_tick(&mut system, TIMESTEP);
        contacts += events.iter().filter(|e| e.started).count();
    }

    println!(
        "ran {} ticks: player_scale={:.3} world_scale={:.3} position=({:.2}, {:.2}, {:.2}) contacts={}",
        ticks,
        system.player_scale(),
        system.world_scale(),
        world.local.position.x,
        world.local.position.y,
        world.local.position.z,
        contacts
    );
    ExitCode::SUCCESS
}

/// A small collidable world: floor, two walls, a decorated pillar, a UI
/// sign, and a terrain patch, all under one root.
fn build_demo_world(scene: &mut SceneGraph) -> NodeId {
    let root = scene.add_node("World", None);

    let floor = scene.add_node("Floor", Some(root));
    scene.node_mut(floor).unwrap().local_position = Vector3::new(0.0, -0.5, 0.0);
    scene.add_component(
        floor,
        Component::Collider(ColliderState::solid(ColliderShape::Cuboid {
            half_extents: [20.0, 0.5, 20.0],
        })),
    );

    for (name, x) in [("WallWest", -6.0_f32), ("WallEast", 6.0_f32)] {
        let wall = scene.add_node(name, Some(root));
        scene.node_mut(wall).unwrap().local_position = Vector3::new(x, 1.5, 0.0);
        scene.add_component(
            wall,
            Component::Collider(ColliderState::solid(ColliderShape::Cuboid {
                half_extents: [0.25, 1.5, 6.0],
            })),
        );
    }

    let pillar = scene.add_node("Pillar", Some(root));
    scene.node_mut(pillar).unwrap().local_position = Vector3::new(0.0, 1.0, 0.0);
    scene.add_component(
        pillar,
        Component::Collider(ColliderState::solid(ColliderShape::Cylinder {
            half_height: 1.0,
            radius: 0.4,
        })),
    );
    scene.add_component(pillar, Component::MeshFilter("pillar".to_string()));
    scene.add_component(
        pillar,
        Component::MeshRenderer(MeshRenderer::new(vec!["Marble".to_string()])),
    );

    let sign = scene.add_node("WelcomeSign", Some(root));
    scene.add_component(sign, Component::UiRect);

    let terrain = scene.add_node("Terrain", Some(root));
    scene.add_component(terrain, Component::TerrainCollider);

    root
}
