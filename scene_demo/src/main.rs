//! Headless scene runtime demo
//!
//! Builds a small orbit system, runs it for a few seconds of simulated time,
//! saves and reloads the scene, then stamps out copies of a template.
//!
//! Usage: `scene_demo [config.toml|config.ron]`

mod behaviors;

use std::path::PathBuf;

use scene_runtime::config::ConfigError;
use scene_runtime::foundation::math::utils::deg_to_rad;
use scene_runtime::prelude::*;
use scene_runtime::scene::RenderRequest;

use behaviors::{Lifetime, Model, Spinner, Tracker};

const FRAME_TIME: f32 = 1.0 / 60.0;
const SIMULATED_FRAMES: u32 = 180;
const MOON_COUNT: usize = 3;

/// Demo failures
#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

struct SceneDemoApp {
    scene: SceneIndex,
    sun: EntityId,
    planet: EntityId,
    output_dir: PathBuf,
}

impl SceneDemoApp {
    fn new(config: SceneConfig) -> Self {
        let registry = TypeRegistry::new();
        behaviors::register_all(&registry);

        let resources = ResourceCatalog::new();
        resources.register("sphere", ResourceKind::Mesh);
        resources.register("ring", ResourceKind::Mesh);
        resources.register("default", ResourceKind::Material);

        let mut scene = SceneIndex::with_config(registry, resources, config);
        let sun = scene.create_entity("Sun");
        let planet = scene.create_entity("Planet");

        Self {
            scene,
            sun,
            planet,
            output_dir: std::env::temp_dir().join("scene_demo"),
        }
    }

    fn build(&mut self) -> Result<(), DemoError> {
        let scene = &mut self.scene;
        scene.add_behavior::<Spinner>(self.sun)?.speed = deg_to_rad(30.0);
        scene.add_behavior::<Model>(self.sun)?;

        scene.set_parent(self.planet, Some(self.sun), false)?;
        scene.set_local_position(self.planet, Vec3::new(10.0, 0.0, 0.0))?;
        scene.set_local_scale(self.planet, Vec3::new(0.5, 0.5, 0.5))?;
        scene.add_behavior::<Spinner>(self.planet)?.speed = deg_to_rad(120.0);
        scene.add_behavior::<Model>(self.planet)?;

        let ring = scene.create_entity("Ring");
        scene.set_parent(ring, Some(self.planet), false)?;
        scene.add_behavior::<Model>(ring)?.mesh = "ring".into();

        let camera = scene.create_entity("Camera");
        let tracker = scene.add_behavior::<Tracker>(camera)?;
        tracker.target = Some(self.planet);
        tracker.offset = Vec3::new(0.0, 5.0, 15.0);

        let comet = scene.create_entity("Comet");
        scene.set_local_position(comet, Vec3::new(-30.0, 2.0, 0.0))?;
        scene.add_behavior::<Lifetime>(comet)?.remaining = 1.5;
        scene.add_behavior::<Model>(comet)?;

        log::info!("Built scene with {} entities", scene.len());
        Ok(())
    }

    /// Run `frames` fixed-length frames, timing the wall clock per frame
    fn simulate(&mut self, frames: u32) {
        let mut clock = FrameClock::new();
        self.scene.start();
        for _ in 0..frames {
            self.scene.tick(FRAME_TIME);
            clock.tick();
        }

        let time = self.scene.time();
        log::info!(
            "Simulated {} frames ({:.2}s, {} entities left) in {:.2} ms",
            time.frame,
            time.elapsed,
            self.scene.len(),
            clock.total_time() * 1000.0
        );
        if clock.frame_count() > 0 {
            log::debug!("Last frame took {:.3} ms", clock.delta_time() * 1000.0);
        }
    }

    fn draw(&self) -> Vec<RenderRequest> {
        let mut requests = Vec::new();
        self.scene.render(&UniformData::default(), &mut requests);
        for request in &requests {
            let position = Pose::from_matrix(&request.transform).position;
            log::debug!(
                "draw {} mesh='{}' at ({:.2}, {:.2}, {:.2})",
                request.entity,
                request.mesh,
                position.x,
                position.y,
                position.z
            );
        }
        requests
    }

    fn save_and_reload(&self) -> Result<SceneIndex, DemoError> {
        std::fs::create_dir_all(&self.output_dir).map_err(SceneError::Io)?;
        let path = self.output_dir.join("orbit.json");
        self.scene.save_to_file(&path)?;

        let mut restored = SceneIndex::with_config(
            self.scene.registry().clone(),
            self.scene.resources().clone(),
            self.scene.config().clone(),
        );
        let loaded = restored.load_from_file(&path)?;
        log::info!("Reloaded {} entities from {}", loaded.len(), path.display());

        if let Some(camera) = restored.find_by_name("Camera") {
            let target = restored.get_behavior::<Tracker>(camera).and_then(|t| t.target);
            log::info!("Reloaded camera tracks {:?}", target.map(|id| id.to_string()));
        }
        Ok(restored)
    }

    fn stamp_moons(&mut self) -> Result<Vec<EntityId>, DemoError> {
        let moon = self.scene.create_entity("Moon");
        self.scene.add_behavior::<Model>(moon)?;
        self.scene.add_behavior::<Spinner>(moon)?.speed = 4.0;
        self.scene.set_local_scale(moon, Vec3::new(0.2, 0.2, 0.2))?;

        let template = Template::from_entity("Moon", &self.scene, moon)?;
        template.save_to_file(self.output_dir.join("Moon.json"))?;
        self.scene.remove_entity(moon);
        self.scene.resources().add_template(template);

        let mut moons = Vec::with_capacity(MOON_COUNT);
        for i in 0..MOON_COUNT {
            let id = self.scene.instantiate_by_id("Moon", Some(self.planet), true)?;
            let angle = i as f32 * std::f32::consts::TAU / MOON_COUNT as f32;
            self.scene
                .set_local_position(id, Vec3::new(3.0 * angle.cos(), 0.0, 3.0 * angle.sin()))?;
            moons.push(id);
        }
        self.scene.tick(FRAME_TIME);

        let names: Vec<&str> = moons
            .iter()
            .filter_map(|id| self.scene.entity(*id).map(Entity::name))
            .collect();
        log::info!("Instantiated moons {:?}", names);
        Ok(moons)
    }

    fn run(&mut self) -> Result<(), DemoError> {
        self.build()?;
        self.simulate(SIMULATED_FRAMES);

        let requests = self.draw();
        log::info!("Render pass produced {} requests", requests.len());

        let restored = self.save_and_reload()?;
        log::info!("Restored scene holds {} entities", restored.len());

        self.stamp_moons()?;
        log::info!("Planet now has {} children", self.scene.children_of(self.planet).len());
        Ok(())
    }
}

fn load_config() -> Result<SceneConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => {
            let config = SceneConfig::load_from_file(&path)?;
            log::info!("Loaded config from {}", path);
            Ok(config)
        }
        None => Ok(SceneConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting scene runtime demo");

    let config = load_config()?;
    let mut app = SceneDemoApp::new(config);

    match app.run() {
        Ok(()) => {
            log::info!("Scene demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Scene demo failed: {}", e);
            Err(e.into())
        }
    }
}
