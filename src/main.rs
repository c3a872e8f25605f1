//! Tiled Level headless driver
//!
//! Loads a map (JSON) or the built-in demo map, walks a player across it
//! for a fixed number of ticks and logs what happened.
//!
//! Usage: `tiled-level [map.json] [ticks]`

use std::rc::Rc;

use glam::{UVec2, Vec2};

use tiled_level::consts::{DEFAULT_TICKS, TICK_DT};
use tiled_level::geometry::Aabb;
use tiled_level::level::{CameraId, LevelEvent, PlayerId};
use tiled_level::map::{
    GeometricObject, LayerContent, LayerData, ObjectShape, Properties, PropertyValue, TiledMap,
    Tileset,
};
use tiled_level::persistence::CheckpointEnvelope;
use tiled_level::renderer::{HeadlessDevice, UniformProvider};
use tiled_level::settings::VertexSync;
use tiled_level::{RuntimeSettings, TiledMapLevelInstance};

const SETTINGS_PATH: &str = "tiled-level.json";
/// Overrides `vertex_sync` from the settings file
const VERTEX_SYNC_ENV: &str = "TILED_LEVEL_VERTEX_SYNC";
/// Pawn walking speed in world units per second
const WALK_SPEED: f32 = 64.0;

fn main() {
    env_logger::init();
    log::info!("Tiled Level (headless) starting...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let map = match args.first() {
        Some(path) => match load_map(path) {
            Ok(map) => map,
            Err(err) => {
                log::error!("Cannot load map {}: {}", path, err);
                std::process::exit(1);
            }
        },
        None => demo_map(),
    };
    let ticks = args
        .get(1)
        .and_then(|t| t.parse().ok())
        .unwrap_or(DEFAULT_TICKS);

    if let Err(err) = run(map, load_settings(), ticks) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn load_settings() -> RuntimeSettings {
    let mut settings = RuntimeSettings::load(SETTINGS_PATH);
    if let Ok(value) = std::env::var(VERTEX_SYNC_ENV) {
        match VertexSync::from_str(&value) {
            Some(sync) => settings.vertex_sync = sync,
            None => log::warn!("Ignoring {}={}", VERTEX_SYNC_ENV, value),
        }
    }
    log::info!("Vertex sync: {}", settings.vertex_sync.as_str());
    settings
}

fn load_map(path: &str) -> Result<TiledMap, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn run(
    map: TiledMap,
    settings: RuntimeSettings,
    ticks: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let level_name = map.name.clone();
    let mut level = TiledMapLevelInstance::new(Rc::new(map), settings)?;
    let mut device = HeadlessDevice::new();
    let uniforms = UniformProvider::new();

    let player = PlayerId(1);
    let camera = CameraId(1);
    let mut pawn_box = level.spawn_player(player, None)?;
    let camera_size = level.settings().camera_size;
    level.add_camera(camera, Some(Aabb::new(pawn_box.position, camera_size * 0.5)));

    let mut saved = None;
    let mut draws = 0;
    for frame in 0..ticks {
        pawn_box = pawn_box.translated(Vec2::new(WALK_SPEED * TICK_DT, 0.0));
        level.set_pawn_box(player, Some(pawn_box))?;
        level.set_camera_box(camera, Aabb::new(pawn_box.position, camera_size * 0.5));

        level.tick(TICK_DT);
        for event in level.drain_events() {
            log::info!("frame {}: {:?}", frame, event);
            match event {
                LevelEvent::CheckpointReached { .. } => saved = Some(level.save_checkpoint()),
                LevelEvent::LevelCompleted { .. } => log::info!("Level completed"),
                _ => {}
            }
        }

        if let Some(params) = level.camera(camera).map(|c| c.render_params()) {
            draws += level.display(&mut device, &uniforms, &params);
        }
        device.take_draws();
    }
    log::info!("{} ticks, {} draw calls", ticks, draws);

    let hits = level.tile_collisions(player).len();
    log::info!("Player touches {} tiles", hits);

    let checkpoint = saved.unwrap_or_else(|| level.save_checkpoint());
    let envelope = CheckpointEnvelope::new(level_name.as_str(), checkpoint);
    println!("{}", envelope.to_json_pretty()?);

    let restored = CheckpointEnvelope::from_json(&envelope.to_json()?)?
        .into_checkpoint_for(&level_name)?;
    level.load_checkpoint(&restored);
    level.end(&mut device);
    Ok(())
}

/// A scrolling sky, a wrapping hill layer, the ground and a few triggers
fn demo_map() -> TiledMap {
    let layer = |id: u32, name: &str, properties: Properties, content: LayerContent| LayerData {
        id,
        name: name.to_string(),
        visible: true,
        opacity: 1.0,
        offset: Vec2::ZERO,
        properties,
        content,
    };

    let width = 64;
    let ground: Vec<u32> = (0..width * 2)
        .map(|i| if i < width { 0 } else if i % 7 == 0 { 2 } else { 1 })
        .collect();

    let mut start = GeometricObject::new(1, "player_start", Vec2::new(24.0, 40.0), Vec2::ZERO)
        .with_name("start");
    start.shape = ObjectShape::Point;

    let objects = vec![
        start,
        GeometricObject::new(2, "notification", Vec2::new(96.0, 16.0), Vec2::new(32.0, 64.0))
            .with_properties(
                Properties::new()
                    .with("message", PropertyValue::String("Keep walking".into()))
                    .with("lifetime", PropertyValue::Float(2.0))
                    .with("stop_when_collision_over", PropertyValue::Bool(true)),
            ),
        GeometricObject::new(3, "checkpoint", Vec2::new(400.0, 0.0), Vec2::new(16.0, 128.0)),
        GeometricObject::new(4, "sound", Vec2::new(300.0, 0.0), Vec2::new(200.0, 128.0))
            .with_properties(
                Properties::new()
                    .with("sound_name", PropertyValue::String("birds".into()))
                    .with("loop", PropertyValue::Bool(true))
                    .with("stop_when_collision_over", PropertyValue::Bool(true)),
            ),
        GeometricObject::new(5, "finish", Vec2::new(600.0, 16.0), Vec2::new(32.0, 64.0))
            .with_properties(Properties::new().with("trigger_once", PropertyValue::Bool(true))),
    ];

    TiledMap {
        name: "demo".into(),
        tile_size: UVec2::splat(16),
        tilesets: vec![Tileset {
            name: "terrain".into(),
            first_gid: 1,
            tile_count: 16,
            columns: 4,
            tile_size: UVec2::splat(16),
            image_size: UVec2::splat(64),
            tiles: Vec::new(),
        }],
        layers: vec![
            layer(
                1,
                "sky",
                Properties::new()
                    .with("displacement_ratio", PropertyValue::Float(0.0))
                    .with("wrap_x", PropertyValue::Bool(true))
                    .with("scroll_speed_x", PropertyValue::Float(-4.0)),
                LayerContent::Image {
                    image: "sky.png".into(),
                    size: Vec2::new(256.0, 256.0),
                },
            ),
            layer(
                2,
                "hills",
                Properties::new()
                    .with("displacement_ratio", PropertyValue::Float(0.5))
                    .with("wrap_x", PropertyValue::Bool(true))
                    .with("collision", PropertyValue::Bool(false)),
                LayerContent::Tiles {
                    width: 8,
                    height: 1,
                    data: vec![3, 4, 3, 0, 0, 4, 3, 0],
                },
            ),
            layer(
                3,
                "ground",
                Properties::new(),
                LayerContent::Tiles {
                    width,
                    height: 2,
                    data: ground,
                },
            ),
            layer(4, "objects", Properties::new(), LayerContent::Objects { objects }),
        ],
        properties: Properties::new(),
    }
}
