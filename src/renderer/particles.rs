//! Particle effects
//!
//! Two CPU-simulated emitters (rising smoke and a gun muzzle burst) drawn as
//! camera-facing billboards with additive blending.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use wgpu::util::DeviceExt;

use super::texture::Texture;

/// Smoke pool size
pub const SMOKE_MAX_PARTICLES: usize = 1000;
/// Smoke particles spawned on every update
pub const SMOKE_SPAWN_PER_UPDATE: usize = 3;
/// Smoke particle lifetime in seconds
pub const SMOKE_LIFETIME: f32 = 1.0;
/// Upward speed added to every smoke particle
pub const SMOKE_RISE: Vec3 = Vec3::new(0.0, 5.0, 0.0);
/// Random smoke velocity per axis is drawn from `[0, SMOKE_SPREAD)`
pub const SMOKE_SPREAD: f32 = 4.0;

/// Particles per gunfire burst
pub const GUNFIRE_MAX_PARTICLES: usize = 20;
/// Gunfire particle lifetime in seconds
pub const GUNFIRE_LIFETIME: f32 = 0.5;

/// A single simulated particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Remaining lifetime in seconds
    pub lifetime: f32,
    /// Lifetime at spawn
    pub initial_lifetime: f32,
    pub alive: bool,
}

impl Particle {
    /// A new living particle
    pub fn spawn(position: Vec3, velocity: Vec3, lifetime: f32) -> Self {
        Self {
            position,
            velocity,
            lifetime,
            initial_lifetime: lifetime,
            alive: true,
        }
    }

    /// Advance by `dt` seconds: age, then move
    pub fn integrate(&mut self, dt: f32) {
        if !self.alive {
            return;
        }
        self.lifetime -= dt;
        if self.lifetime <= 0.0 {
            self.alive = false;
        }
        self.position += self.velocity * dt;
    }

    /// Opacity, fading linearly from 1 to 0 over the lifetime
    pub fn alpha(&self) -> f32 {
        if self.initial_lifetime <= 0.0 {
            return 0.0;
        }
        (self.lifetime / self.initial_lifetime).clamp(0.0, 1.0)
    }

    /// Seconds since spawn
    pub fn elapsed(&self) -> f32 {
        self.initial_lifetime - self.lifetime
    }
}

/// Common read access for drawing emitters
pub trait ParticleEmitter {
    /// Whether the emitter updates and draws
    fn enabled(&self) -> bool;

    /// The whole pool, dead particles included
    fn particles(&self) -> &[Particle];

    /// Number of living particles
    fn alive_count(&self) -> usize {
        self.particles().iter().filter(|p| p.alive).count()
    }

    /// Living particles as GPU instances, sorted back to front from `eye`
    fn instances(&self, eye: Vec3) -> Vec<ParticleInstance> {
        if !self.enabled() {
            return Vec::new();
        }
        sorted_instances(self.particles(), eye)
    }
}

/// Rising smoke column pushed by a constant wind
#[derive(Debug)]
pub struct SmokeEmitter {
    pub enabled: bool,
    /// Spawn point
    pub position: Vec3,
    pub wind: Vec3,
    particles: Vec<Particle>,
    max_particles: usize,
    /// Where the next search for a dead slot starts
    last_used: usize,
    rng: SmallRng,
}

impl SmokeEmitter {
    /// Create an enabled emitter
    pub fn new(position: Vec3, wind: Vec3) -> Self {
        Self::with_rng(position, wind, SmallRng::from_entropy())
    }

    /// Create an emitter with a reproducible random sequence
    pub fn with_seed(position: Vec3, wind: Vec3, seed: u64) -> Self {
        Self::with_rng(position, wind, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(position: Vec3, wind: Vec3, rng: SmallRng) -> Self {
        Self {
            enabled: true,
            position,
            wind,
            particles: Vec::with_capacity(SMOKE_MAX_PARTICLES),
            max_particles: SMOKE_MAX_PARTICLES,
            last_used: 0,
            rng,
        }
    }

    /// Spawn this frame's particles, then integrate the pool
    pub fn update(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }

        for _ in 0..SMOKE_SPAWN_PER_UPDATE {
            let offset = Vec3::new(
                self.rng.gen_range(0.0..SMOKE_SPREAD),
                self.rng.gen_range(0.0..SMOKE_SPREAD),
                self.rng.gen_range(0.0..SMOKE_SPREAD),
            );
            let particle = Particle::spawn(
                self.position,
                self.wind + offset + SMOKE_RISE,
                SMOKE_LIFETIME,
            );

            if self.particles.len() < self.max_particles {
                self.particles.push(particle);
            } else {
                let slot = self.find_unused_particle();
                self.particles[slot] = particle;
            }
        }

        for particle in &mut self.particles {
            particle.integrate(dt);
        }
    }

    /// Round-robin search for a dead slot starting at the last one used.
    /// Falls back to slot 0 when every particle is alive.
    fn find_unused_particle(&mut self) -> usize {
        let len = self.particles.len();
        let start = self.last_used.min(len);

        let found = (start..len)
            .chain(0..start)
            .find(|&i| !self.particles[i].alive);

        match found {
            Some(i) => {
                self.last_used = i;
                i
            }
            None => 0,
        }
    }
}

impl ParticleEmitter for SmokeEmitter {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn particles(&self) -> &[Particle] {
        &self.particles
    }
}

/// Periodic firing for the demo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoFire {
    /// Seconds between bursts
    pub interval: f32,
    pub direction: Vec3,
    since_last: f32,
}

impl AutoFire {
    pub fn new(interval: f32, direction: Vec3) -> Self {
        Self {
            interval,
            direction,
            since_last: 0.0,
        }
    }

    /// Advance the timer, returning true when a burst is due
    fn tick(&mut self, dt: f32) -> bool {
        self.since_last += dt;
        if self.since_last > self.interval {
            self.since_last = 0.0;
            return true;
        }
        false
    }
}

/// Muzzle burst animated through a sprite atlas
#[derive(Debug)]
pub struct GunFireEmitter {
    pub enabled: bool,
    /// Muzzle position
    pub position: Vec3,
    /// Atlas rows
    pub rows: u32,
    /// Atlas columns
    pub columns: u32,
    pub auto_fire: Option<AutoFire>,
    particles: Vec<Particle>,
    rng: SmallRng,
}

impl GunFireEmitter {
    /// Create an enabled emitter using a `rows` x `columns` atlas
    pub fn new(position: Vec3, rows: u32, columns: u32) -> Self {
        Self::with_rng(position, rows, columns, SmallRng::from_entropy())
    }

    /// Create an emitter with a reproducible random sequence
    pub fn with_seed(position: Vec3, rows: u32, columns: u32, seed: u64) -> Self {
        Self::with_rng(position, rows, columns, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(position: Vec3, rows: u32, columns: u32, rng: SmallRng) -> Self {
        Self {
            enabled: true,
            position,
            rows: rows.max(1),
            columns: columns.max(1),
            auto_fire: None,
            particles: Vec::with_capacity(GUNFIRE_MAX_PARTICLES),
            rng,
        }
    }

    /// Fire automatically every `interval` seconds
    #[must_use]
    pub fn with_auto_fire(mut self, interval: f32, direction: Vec3) -> Self {
        self.auto_fire = Some(AutoFire::new(interval, direction));
        self
    }

    /// Replace all particles with a fresh burst towards `direction`
    pub fn shoot(&mut self, direction: Vec3) {
        let direction = direction.normalize_or_zero();
        self.particles.clear();
        for _ in 0..GUNFIRE_MAX_PARTICLES {
            let offset = Vec3::new(
                self.rng.gen_range(0.0..1.0),
                self.rng.gen_range(0.0..1.0),
                self.rng.gen_range(0.0..1.0),
            );
            self.particles.push(Particle::spawn(
                self.position,
                direction + offset,
                GUNFIRE_LIFETIME,
            ));
        }
    }

    /// Fire if the auto-fire timer elapsed, then integrate
    pub fn update(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }

        if let Some(direction) = self
            .auto_fire
            .as_mut()
            .and_then(|auto| auto.tick(dt).then_some(auto.direction))
        {
            self.shoot(direction);
        }

        for particle in &mut self.particles {
            particle.integrate(dt);
        }
    }

    /// Number of frames in the atlas
    pub fn frame_count(&self) -> u32 {
        self.rows * self.columns
    }
}

impl ParticleEmitter for GunFireEmitter {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn particles(&self) -> &[Particle] {
        &self.particles
    }
}

/// Per-instance data for the billboard shader
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    /// Seconds since spawn, selects the atlas frame
    pub elapsed: f32,
    pub alpha: f32,
    _padding: [f32; 3],
}

impl ParticleInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32,   // elapsed
        2 => Float32,   // alpha
    ];

    pub fn new(particle: &Particle) -> Self {
        Self {
            position: particle.position.into(),
            elapsed: particle.elapsed(),
            alpha: particle.alpha(),
            _padding: [0.0; 3],
        }
    }

    /// Instance-rate vertex buffer layout
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Living particles, farthest from `eye` first. Equal distances keep pool
/// order.
pub fn sorted_instances(particles: &[Particle], eye: Vec3) -> Vec<ParticleInstance> {
    let mut living: Vec<(f32, &Particle)> = particles
        .iter()
        .filter(|p| p.alive)
        .map(|p| (p.position.distance_squared(eye), p))
        .collect();

    living.sort_by(|a, b| b.0.total_cmp(&a.0));

    living
        .into_iter()
        .map(|(_, p)| ParticleInstance::new(p))
        .collect()
}

/// How the particle shader picks texels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleMode {
    /// Whole sprite, faded by alpha
    Sprite,
    /// Animated frame from a rows x columns atlas
    Atlas { rows: u32, columns: u32 },
}

/// Emitter-wide shader parameters
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct EmitterUniform {
    /// Billboard edge length in world units
    pub size: f32,
    /// Lifetime used to map elapsed time onto atlas frames
    pub lifetime: f32,
    pub rows: u32,
    pub columns: u32,
    /// 0 = sprite, 1 = atlas
    pub mode: u32,
    _padding: [u32; 3],
}

impl EmitterUniform {
    pub fn new(size: f32, lifetime: f32, mode: ParticleMode) -> Self {
        let (mode, rows, columns) = match mode {
            ParticleMode::Sprite => (0, 1, 1),
            ParticleMode::Atlas { rows, columns } => (1, rows.max(1), columns.max(1)),
        };
        Self {
            size,
            lifetime,
            rows,
            columns,
            mode,
            _padding: [0; 3],
        }
    }
}

/// GPU side of one emitter: sprite, parameters and the instance buffer
#[derive(Debug)]
pub struct ParticleBatch {
    texture: Arc<Texture>,
    bind_group: wgpu::BindGroup,
    instance_buffer: Option<wgpu::Buffer>,
    instance_count: u32,
}

impl ParticleBatch {
    pub(crate) fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: Arc<Texture>,
        uniform: EmitterUniform,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle_emitter_uniform"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("particle_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });

        Self {
            texture,
            bind_group,
            instance_buffer: None,
            instance_count: 0,
        }
    }

    /// Sprite texture
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Upload this frame's instances, growing the buffer when needed
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        instances: &[ParticleInstance],
    ) {
        self.instance_count = instances.len() as u32;
        if instances.is_empty() {
            return;
        }

        let data: &[u8] = bytemuck::cast_slice(instances);

        if let Some(buffer) = &self.instance_buffer
            && buffer.size() >= data.len() as u64
        {
            queue.write_buffer(buffer, 0, data);
            return;
        }

        self.instance_buffer = Some(device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("particle_instances"),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            },
        ));
    }

    /// Number of instances uploaded by the last [`ParticleBatch::upload`]
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub(crate) fn instance_buffer(&self) -> Option<&wgpu::Buffer> {
        self.instance_buffer.as_ref()
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_integration_and_fade() {
        let mut particle = Particle::spawn(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), 1.0);
        assert_eq!(particle.alpha(), 1.0);

        particle.integrate(0.25);
        assert!(particle.alive);
        assert!((particle.position.y - 0.5).abs() < 1e-6);
        assert!((particle.alpha() - 0.75).abs() < 1e-6);
        assert!((particle.elapsed() - 0.25).abs() < 1e-6);

        particle.integrate(0.75);
        assert!(!particle.alive);
        assert_eq!(particle.alpha(), 0.0);

        // Dead particles no longer move
        let before = particle.position;
        particle.integrate(1.0);
        assert_eq!(particle.position, before);
    }

    #[test]
    fn test_smoke_spawns_three_per_update() {
        let mut smoke = SmokeEmitter::with_seed(Vec3::new(0.0, -5.0, 0.0), Vec3::new(0.0, 0.0, 5.0), 7);
        smoke.update(0.01);
        assert_eq!(smoke.particles().len(), 3);
        smoke.update(0.01);
        assert_eq!(smoke.particles().len(), 6);
        assert_eq!(smoke.alive_count(), 6);
    }

    #[test]
    fn test_smoke_velocity_range() {
        let wind = Vec3::new(0.0, 0.0, 5.0);
        let mut smoke = SmokeEmitter::with_seed(Vec3::ZERO, wind, 42);
        for _ in 0..50 {
            smoke.update(0.0);
        }

        for particle in smoke.particles() {
            let offset = particle.velocity - wind - SMOKE_RISE;
            for c in offset.to_array() {
                assert!((0.0..SMOKE_SPREAD).contains(&c));
            }
            assert_eq!(particle.lifetime, SMOKE_LIFETIME);
        }
    }

    #[test]
    fn test_smoke_pool_is_bounded_and_reuses_dead_slots() {
        let mut smoke = SmokeEmitter::with_seed(Vec3::ZERO, Vec3::ZERO, 1);
        // Nothing dies with dt = 0, so the pool fills up
        for _ in 0..(SMOKE_MAX_PARTICLES / SMOKE_SPAWN_PER_UPDATE + 10) {
            smoke.update(0.0);
        }
        assert_eq!(smoke.particles().len(), SMOKE_MAX_PARTICLES);
        assert_eq!(smoke.alive_count(), SMOKE_MAX_PARTICLES);

        // Everything dies, then the next update reuses three slots
        smoke.update(2.0);
        assert_eq!(smoke.particles().len(), SMOKE_MAX_PARTICLES);
        smoke.update(0.0);
        assert_eq!(smoke.alive_count(), SMOKE_SPAWN_PER_UPDATE);
        assert_eq!(smoke.particles().len(), SMOKE_MAX_PARTICLES);
    }

    #[test]
    fn test_find_unused_particle_round_robin() {
        let mut smoke = SmokeEmitter::with_seed(Vec3::ZERO, Vec3::ZERO, 3);
        smoke.particles = vec![Particle::spawn(Vec3::ZERO, Vec3::ZERO, 1.0); 5];
        smoke.particles[1].alive = false;
        smoke.particles[3].alive = false;

        smoke.last_used = 2;
        assert_eq!(smoke.find_unused_particle(), 3);
        smoke.particles[3].alive = true;

        // Wraps around to the start
        assert_eq!(smoke.find_unused_particle(), 1);
        smoke.particles[1].alive = true;

        // All alive: overwrite slot 0
        assert_eq!(smoke.find_unused_particle(), 0);
    }

    #[test]
    fn test_disabled_smoke_does_nothing() {
        let mut smoke = SmokeEmitter::with_seed(Vec3::ZERO, Vec3::ZERO, 9);
        smoke.enabled = false;
        smoke.update(0.1);
        assert!(smoke.particles().is_empty());
        assert!(smoke.instances(Vec3::ONE).is_empty());
    }

    #[test]
    fn test_gunfire_burst() {
        let mut gun = GunFireEmitter::with_seed(Vec3::new(-6.5, 0.4, 0.0), 8, 8, 11);
        gun.shoot(Vec3::new(-3.0, 0.0, 0.0));
        assert_eq!(gun.particles().len(), GUNFIRE_MAX_PARTICLES);

        for particle in gun.particles() {
            let offset = particle.velocity - Vec3::NEG_X;
            for c in offset.to_array() {
                assert!((0.0..1.0).contains(&c));
            }
            assert_eq!(particle.lifetime, GUNFIRE_LIFETIME);
        }

        // A second shot replaces the first burst
        gun.update(0.3);
        gun.shoot(Vec3::NEG_X);
        assert_eq!(gun.particles().len(), GUNFIRE_MAX_PARTICLES);
        assert!(gun.particles().iter().all(|p| p.elapsed() == 0.0));

        gun.update(0.6);
        assert_eq!(gun.alive_count(), 0);
        assert_eq!(gun.frame_count(), 64);
    }

    #[test]
    fn test_gunfire_auto_fire() {
        let mut gun = GunFireEmitter::with_seed(Vec3::ZERO, 8, 8, 5).with_auto_fire(2.0, Vec3::NEG_X);
        gun.update(1.0);
        assert!(gun.particles().is_empty());
        gun.update(1.5);
        assert_eq!(gun.alive_count(), GUNFIRE_MAX_PARTICLES);
        gun.update(0.6);
        assert_eq!(gun.alive_count(), 0);
        gun.update(1.5);
        assert_eq!(gun.alive_count(), GUNFIRE_MAX_PARTICLES);
    }

    #[test]
    fn test_instances_sorted_back_to_front() {
        let particles = vec![
            Particle::spawn(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, 1.0),
            Particle::spawn(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, 1.0),
            Particle {
                alive: false,
                ..Particle::spawn(Vec3::new(50.0, 0.0, 0.0), Vec3::ZERO, 1.0)
            },
            Particle::spawn(Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO, 0.5),
            Particle::spawn(Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO, 0.25),
        ];

        let instances = sorted_instances(&particles, Vec3::ZERO);
        let xs: Vec<[f32; 3]> = instances.iter().map(|i| i.position).collect();
        assert_eq!(
            xs,
            vec![[5.0, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [1.0, 0.0, 0.0]]
        );
    }

    #[test]
    fn test_gpu_layouts() {
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 32);
        assert_eq!(std::mem::size_of::<EmitterUniform>(), 32);

        let atlas = EmitterUniform::new(0.5, GUNFIRE_LIFETIME, ParticleMode::Atlas { rows: 8, columns: 4 });
        assert_eq!((atlas.mode, atlas.rows, atlas.columns), (1, 8, 4));
        let sprite = EmitterUniform::new(1.0, SMOKE_LIFETIME, ParticleMode::Sprite);
        assert_eq!((sprite.mode, sprite.rows, sprite.columns), (0, 1, 1));
    }
}
