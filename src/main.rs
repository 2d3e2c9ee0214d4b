//! PBR demo: a rifle over sandy ground lit by a desert panorama, with smoke
//! and muzzle fire

use std::path::PathBuf;

use anyhow::Context;
use pbr_demo::prelude::*;
use pbr_demo::renderer::{
    EmitterUniform, GUNFIRE_LIFETIME, ParticleMode, SMOKE_LIFETIME, SkyboxSource,
};
use pbr_demo::scene::ObjectKind;
use winit::event::MouseButton;

const DEFAULT_SCENE: &str = "assets/scene.ron";

struct DemoGame {
    config: SceneConfig,
    camera: Camera,
    environment: Option<EnvironmentMap>,
    skybox: Option<Skybox>,
    cursor_captured: bool,
    orbit: bool,
    /// Seconds spent orbiting, so toggling resumes where it stopped
    orbit_time: f32,
}

impl DemoGame {
    fn new(config: SceneConfig) -> Self {
        let mut camera = Camera::new();
        camera.position = config.camera.position;
        let orbit = config.camera.orbit;

        Self {
            config,
            camera,
            environment: None,
            skybox: None,
            cursor_captured: false,
            orbit,
            orbit_time: 0.0,
        }
    }

    fn fire_direction(&self) -> Vec3 {
        self.config
            .gunfire
            .as_ref()
            .map_or(Vec3::NEG_X, |gunfire| gunfire.fire_direction)
    }

    fn load_environment(&mut self, renderer: &mut Renderer) -> anyhow::Result<()> {
        let settings = &self.config.environment;
        let environment = EnvironmentMap::from_equirect_path(
            renderer.device(),
            renderer.queue(),
            &settings.path,
            settings.bake,
        )
        .with_context(|| format!("loading environment {}", settings.path.display()))?;
        renderer.set_environment(&environment);
        log::info!(
            "Environment baked with {} specular mip levels",
            environment.prefilter_mip_levels()
        );
        let environment = self.environment.insert(environment);

        let skybox = match &self.config.skybox {
            Some(path) => {
                let texture = Texture::from_path(
                    renderer.device(),
                    renderer.queue(),
                    path,
                    TextureOptions::clamped(true),
                )
                .with_context(|| format!("loading skybox {}", path.display()))?;
                renderer.create_skybox(SkyboxSource::Equirect {
                    view: &texture.view,
                    hdr: texture.is_hdr(),
                })
            }
            None => renderer.create_skybox(SkyboxSource::Cubemap {
                view: &environment.environment.view,
                hdr: true,
            }),
        };

        self.skybox = Some(skybox);
        Ok(())
    }

    fn spawn_objects(
        &self,
        ctx: &mut EngineContext,
        cache: &mut TextureCache,
    ) -> anyhow::Result<()> {
        let mut objects = Vec::with_capacity(self.config.objects.len());
        for object in &self.config.objects {
            let renderer = ctx.renderer();
            let built = match &object.kind {
                ObjectKind::Model(path) => {
                    PbrObject::load_model(renderer, cache, path, object.smoothness_factor)
                }
                ObjectKind::Quad(path) => {
                    PbrObject::load_quad(renderer, cache, path, object.smoothness_factor)
                }
            }
            .with_context(|| format!("loading object {}", object.name))?;

            let material = built.material();
            log::info!(
                "Object {} ready ({} meshes, {} draws, smoothness {:.2}, ao {})",
                object.name,
                built.model().meshes.len(),
                built.draw_count(),
                material.uniform().smoothness_factor,
                material.textures().ao.is_some()
            );
            objects.push((
                Name::new(object.name.clone()),
                Transform::from(object.transform),
                built,
            ));
        }

        ctx.world.spawn_batch(objects);
        Ok(())
    }

    fn spawn_emitters(
        &self,
        ctx: &mut EngineContext,
        cache: &mut TextureCache,
    ) -> anyhow::Result<()> {
        if let Some(smoke) = &self.config.smoke {
            let renderer = ctx.renderer();
            let texture = cache
                .load(
                    renderer.device(),
                    renderer.queue(),
                    &smoke.texture,
                    TextureOptions::clamped(true),
                )
                .with_context(|| format!("loading smoke sprite {}", smoke.texture.display()))?;
            let batch = renderer.create_particle_batch(
                texture,
                EmitterUniform::new(smoke.size, SMOKE_LIFETIME, ParticleMode::Sprite),
            );

            log::info!(
                "Smoke sprite {}x{}",
                batch.texture().width(),
                batch.texture().height()
            );

            let mut emitter = SmokeEmitter::new(smoke.position, smoke.wind);
            emitter.enabled = smoke.enabled;
            ctx.world.spawn((Name::new("smoke"), emitter, batch));
        }

        if let Some(gunfire) = &self.config.gunfire {
            let renderer = ctx.renderer();
            let texture = cache
                .load(
                    renderer.device(),
                    renderer.queue(),
                    &gunfire.texture,
                    TextureOptions::clamped(true),
                )
                .with_context(|| format!("loading gunfire atlas {}", gunfire.texture.display()))?;

            let mut emitter = GunFireEmitter::new(gunfire.position, gunfire.rows, gunfire.columns);
            emitter.enabled = gunfire.enabled;
            if let Some(interval) = gunfire.auto_fire_interval {
                emitter = emitter.with_auto_fire(interval, gunfire.fire_direction);
            }

            let batch = renderer.create_particle_batch(
                texture,
                EmitterUniform::new(
                    gunfire.size,
                    GUNFIRE_LIFETIME,
                    ParticleMode::Atlas {
                        rows: emitter.rows,
                        columns: emitter.columns,
                    },
                ),
            );
            log::info!(
                "Gunfire atlas {}x{} with {} frames",
                batch.texture().width(),
                batch.texture().height(),
                emitter.frame_count()
            );
            ctx.world.spawn((Name::new("gunfire"), emitter, batch));
        }

        Ok(())
    }

    fn update_camera(&mut self, ctx: &EngineContext, dt: f32) {
        let scroll = ctx.input.scroll_delta();
        if scroll.y != 0.0 {
            self.camera.process_mouse_scroll(scroll.y);
        }

        if self.orbit {
            self.orbit_time += dt;
            let orbit = &self.config.camera;
            self.camera
                .orbit(orbit.orbit_center, orbit.orbit_offset, self.orbit_time);
            return;
        }

        let movement = [
            (KeyCode::KeyW, CameraMovement::Forward),
            (KeyCode::KeyS, CameraMovement::Backward),
            (KeyCode::KeyA, CameraMovement::Left),
            (KeyCode::KeyD, CameraMovement::Right),
        ];
        for (key, direction) in movement {
            if ctx.input.is_key_pressed(key) {
                self.camera.process_keyboard(direction, dt);
            }
        }

        if self.cursor_captured {
            let delta = ctx.input.mouse_delta();
            if delta != Vec2::ZERO {
                self.camera.process_mouse_movement(delta.x, delta.y);
            }
        }
    }
}

/// Upload the sorted instances of every emitter of type `E`
fn upload_particles<E: ParticleEmitter + hecs::Component>(
    renderer: &Renderer,
    world: &hecs::World,
    eye: Vec3,
) {
    for (_, (emitter, batch)) in world.query::<(&E, &mut ParticleBatch)>().iter() {
        renderer.upload_particles(batch, &emitter.instances(eye));
    }
}

impl Game for DemoGame {
    fn init(&mut self, ctx: &mut EngineContext) -> anyhow::Result<()> {
        log::info!("Initializing PBR demo");

        self.load_environment(ctx.renderer_mut())?;
        ctx.renderer().update_lights(&self.config.lights);

        let mut cache = TextureCache::new();
        self.spawn_objects(ctx, &mut cache)?;
        self.spawn_emitters(ctx, &mut cache)?;
        log::info!("{} textures loaded", cache.len());

        self.camera.set_aspect(ctx.width(), ctx.height());
        self.cursor_captured = true;
        ctx.set_cursor_captured(true);

        log::info!(
            "Controls: WASD move, mouse look, scroll zoom, left click fire, R orbit, Esc cursor, Q quit"
        );
        Ok(())
    }

    fn update(&mut self, ctx: &mut EngineContext) {
        let dt = ctx.time.delta_seconds();

        if ctx.input.is_key_just_pressed(KeyCode::Escape) {
            self.cursor_captured = !self.cursor_captured;
            ctx.set_cursor_captured(self.cursor_captured);
        }

        if ctx.input.is_key_just_pressed(KeyCode::KeyQ) {
            ctx.quit();
            return;
        }

        if ctx.input.is_key_just_pressed(KeyCode::KeyR) {
            self.orbit = !self.orbit;
            log::info!("Camera orbit {}", if self.orbit { "on" } else { "off" });
        }

        self.update_camera(ctx, dt);

        let fire = self.cursor_captured && ctx.input.is_mouse_button_just_pressed(MouseButton::Left);
        let direction = self.fire_direction();

        for (_, emitter) in ctx.world.query_mut::<&mut GunFireEmitter>() {
            if fire && emitter.enabled {
                emitter.shoot(direction);
            }
            emitter.update(dt);
        }

        for (_, emitter) in ctx.world.query_mut::<&mut SmokeEmitter>() {
            emitter.update(dt);
        }
    }

    fn render(&mut self, ctx: &mut EngineContext) {
        ctx.renderer_mut().update_camera(&self.camera);

        let renderer = ctx.renderer();
        let world = &ctx.world;

        if let Some(skybox) = &self.skybox {
            renderer.update_skybox(skybox, &self.camera);
        }

        for (_, (transform, object)) in world.query::<(&Transform, &PbrObject)>().iter() {
            object.prepare(renderer, transform.matrix());
        }

        let eye = self.camera.position;
        upload_particles::<SmokeEmitter>(renderer, world, eye);
        upload_particles::<GunFireEmitter>(renderer, world, eye);

        let Some(mut frame) = renderer.begin_frame() else {
            return;
        };

        {
            let mut render_pass = renderer.begin_render_pass(&mut frame);

            if let Some(skybox) = &self.skybox {
                renderer.draw_skybox(&mut render_pass, skybox);
            }

            for (_, object) in world.query::<&PbrObject>().iter() {
                object.draw(renderer, &mut render_pass);
            }

            for (_, batch) in world.query::<&ParticleBatch>().iter() {
                renderer.draw_particles(&mut render_pass, batch);
            }
        }

        renderer.end_frame(frame);
    }

    fn on_resize(&mut self, _ctx: &mut EngineContext, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    fn shutdown(&mut self, ctx: &mut EngineContext) {
        log::info!(
            "Shutting down after {} frames",
            ctx.debug.frame_stats.total_frames()
        );
    }
}

fn main() -> anyhow::Result<()> {
    let scene_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_SCENE), PathBuf::from);

    let config = SceneConfig::load(&scene_path)
        .with_context(|| format!("loading scene {}", scene_path.display()))?;

    let window = &config.window;
    let engine_config = EngineConfig::default()
        .with_title(window.title.clone())
        .with_size(window.width, window.height)
        .with_vsync(window.vsync);

    let engine = Engine::new(engine_config, DemoGame::new(config));
    engine.run()?;
    Ok(())
}
