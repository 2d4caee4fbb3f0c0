use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use netmesh::{ConnectionAdapter, ConnectionState, Identity, RegistryEvent, Transport};

use crate::movement::CircleWalk;
use crate::scene::{NodeHandle, Scene};
use crate::stats::TickStats;

const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub tick_rate: f32,
    pub max_ticks: Option<u64>,
    pub walk_radius: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            tick_rate: 30.0,
            max_ticks: None,
            walk_radius: 3.0,
        }
    }
}

impl AppSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.tick_rate.max(1.0))
    }
}

/// Drives one headless client: polls the connection, materializes queued entities into the
/// scene and streams the scripted local movement back to the server.
pub struct App<T> {
    adapter: ConnectionAdapter<T, NodeHandle>,
    scene: Scene,
    settings: AppSettings,
    walk: Option<CircleWalk>,
    pending_identity: Rc<RefCell<Option<Identity>>>,
    stats: TickStats,
    was_connected: bool,
}

impl<T: Transport> App<T> {
    pub fn new(mut adapter: ConnectionAdapter<T, NodeHandle>, settings: AppSettings) -> Self {
        let pending_identity = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&pending_identity);
        adapter.identity_store_mut().subscribe(move |identity: &Identity| {
            log::info!(
                "Local entity is {} at {:?}",
                identity.id,
                identity.state.position()
            );
            *slot.borrow_mut() = Some(identity.clone());
        });

        adapter.registry_mut().subscribe(|event| match event {
            RegistryEvent::Joined { id, replaced: true } => {
                log::info!("Entity {} rejoined, replacing its record", id)
            }
            RegistryEvent::Joined { id, .. } => log::info!("Entity {} joined", id),
            RegistryEvent::Evicted { id } => log::info!("Entity {} turned out to be us", id),
            _ => {}
        });

        Self {
            adapter,
            scene: Scene::new(),
            settings,
            walk: None,
            pending_identity,
            stats: TickStats::new(),
            was_connected: false,
        }
    }

    /// One frame. Returns false once the session is over.
    pub fn tick(&mut self, dt: f32) -> bool {
        if let Err(e) = self.adapter.poll() {
            log::warn!("Network poll failed: {}", e);
        }

        if let Some(identity) = self.pending_identity.borrow_mut().take() {
            self.walk = Some(CircleWalk::new(
                identity.state.position(),
                self.settings.walk_radius,
            ));
        }

        self.materialize_spawns();

        if let Some(walk) = &mut self.walk {
            let transform = walk.step(dt);
            self.adapter
                .send_transform(transform.position, transform.rotation);
        }

        self.stats.record_tick();

        match self.adapter.state() {
            ConnectionState::Connected => {
                self.was_connected = true;
                true
            }
            ConnectionState::Disconnected => {
                if self.was_connected {
                    log::info!("Connection to server closed");
                } else {
                    log::error!("Could not connect to server");
                }
                false
            }
            _ => true,
        }
    }

    fn materialize_spawns(&mut self) {
        for id in self.adapter.drain_spawn_queue() {
            let Some(state) = self.adapter.registry().get(id).map(|e| e.state.clone()) else {
                continue;
            };
            let handle = self.scene.materialize(id, &state);
            if !self.adapter.attach_handle(id, handle) {
                log::warn!("Entity {} vanished before its node was attached", id);
            }
        }
    }

    pub fn run(&mut self) {
        let interval = self.settings.tick_interval();
        let dt = interval.as_secs_f32();
        let mut last_summary = Instant::now();

        loop {
            let frame_start = Instant::now();

            if !self.tick(dt) {
                break;
            }

            if self
                .settings
                .max_ticks
                .is_some_and(|max| self.stats.ticks() >= max)
            {
                log::info!("Reached {} ticks, leaving", self.stats.ticks());
                break;
            }

            if last_summary.elapsed() >= SUMMARY_INTERVAL {
                self.log_summary();
                last_summary = Instant::now();
            }

            let elapsed = frame_start.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }

        self.adapter.disconnect();
        self.log_summary();
    }

    fn log_summary(&self) {
        let sync = self.adapter.stats();
        log::info!(
            "{:.1} ticks/s | {} remote, {} nodes moved {} times | sent {} transforms, applied {}, ignored {}, dropped {} own | rejected {} | rtt {:?}ms",
            self.stats.tick_rate(),
            self.adapter.registry().len(),
            self.scene.len(),
            self.scene.total_updates(),
            sync.transforms_sent,
            sync.transforms_applied,
            sync.transforms_ignored,
            sync.self_transforms_dropped,
            sync.events_rejected,
            sync.last_rtt_ms,
        );
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn adapter(&self) -> &ConnectionAdapter<T, NodeHandle> {
        &self.adapter
    }
}
