//! Scene loading with fades and a minimum loading-screen time
//!
//! A load runs through `Idle → FadingOut → Loading → Activating → FadingIn →
//! Idle`. The loader never touches scenes itself; it drives a [`SceneHost`]
//! and reports what it wants from the screen (fades) through its outbox.
//! Load progress is published to a [`DataCell`] for a progress bar, and the
//! fader reports completion through another cell.

use parts_event::DataCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw progress at which a scene is loaded but not yet activated
pub const READY_PROGRESS: f32 = 0.9;

/// Scene load errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Another load is still running
    #[error("Scene load already in progress, ignoring request for {0}")]
    AlreadyLoading(String),
    /// Host does not know the scene
    #[error("Scene {0} does not exist")]
    UnknownScene(String),
}

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Loads scene content on the loader's behalf
pub trait SceneHost {
    /// Whether `scene` can be loaded
    fn contains(&self, scene: &str) -> bool;

    /// Start loading `scene` in the background
    fn begin_load(&mut self, scene: &str);

    /// Advance the background load and report raw progress. Progress stops at
    /// [`READY_PROGRESS`] until the scene is activated.
    fn progress(&mut self, dt: f32) -> f32;

    /// Swap the loaded scene in. Returns true once it is active.
    fn activate(&mut self) -> bool;
}

/// Loader phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoaderState {
    Idle,
    FadingOut,
    Loading,
    Activating,
    FadingIn,
}

impl Default for LoaderState {
    fn default() -> Self {
        Self::Idle
    }
}

/// What the loader asks of the rest of the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    LoadStarted(String),
    /// Fade the screen out and set the fade-done cell when finished
    FadeOut,
    /// The new scene is active
    LoadDone(String),
    FadeIn,
}

/// Scene load state machine
#[derive(Debug)]
pub struct SceneLoader {
    state: LoaderState,
    /// Shortest time the loading screen stays up
    pub min_load_time: f32,
    scene: Option<String>,
    active_scene: Option<String>,
    elapsed: f32,
    progress: DataCell<f32>,
    fade_done: Option<DataCell<bool>>,
    events: Vec<LoaderEvent>,
}

impl Default for SceneLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneLoader {
    pub fn new() -> Self {
        Self {
            state: LoaderState::Idle,
            min_load_time: 1.0,
            scene: None,
            active_scene: None,
            elapsed: 0.0,
            progress: DataCell::new(0.0),
            fade_done: None,
            events: Vec::new(),
        }
    }

    pub fn with_min_load_time(mut self, seconds: f32) -> Self {
        self.min_load_time = seconds.max(0.0);
        self
    }

    /// Wait on this cell after each fade request. Without one fades count as
    /// instant.
    pub fn with_fade(mut self, fade_done: DataCell<bool>) -> Self {
        self.fade_done = Some(fade_done);
        self
    }

    /// Cell holding load progress in `0..=1`
    pub fn progress(&self) -> DataCell<f32> {
        self.progress.clone()
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    /// True from `load` until the new scene is active
    pub fn is_loading(&self) -> bool {
        matches!(
            self.state,
            LoaderState::FadingOut | LoaderState::Loading | LoaderState::Activating
        )
    }

    /// Last scene that finished loading
    pub fn active_scene(&self) -> Option<&str> {
        self.active_scene.as_deref()
    }

    /// Start loading `scene`
    pub fn load<H: SceneHost + ?Sized>(&mut self, scene: &str, host: &H) -> Result<()> {
        if self.is_loading() {
            log::warn!("scene load already in progress, ignoring {}", scene);
            return Err(LoadError::AlreadyLoading(scene.to_string()));
        }
        if !host.contains(scene) {
            log::error!("scene {} does not exist", scene);
            return Err(LoadError::UnknownScene(scene.to_string()));
        }

        log::info!("loading scene {}", scene);
        self.scene = Some(scene.to_string());
        self.elapsed = 0.0;
        self.state = LoaderState::FadingOut;
        self.events.push(LoaderEvent::LoadStarted(scene.to_string()));
        self.request_fade(LoaderEvent::FadeOut);
        Ok(())
    }

    fn request_fade(&mut self, fade: LoaderEvent) {
        if let Some(done) = &self.fade_done {
            done.set(false);
        }
        self.events.push(fade);
    }

    fn fade_finished(&self) -> bool {
        self.fade_done.as_ref().map_or(true, |done| done.get())
    }

    /// Advance the load. Phases that have nothing to wait for complete within
    /// the same tick.
    pub fn tick<H: SceneHost + ?Sized>(&mut self, dt: f32, host: &mut H) {
        if self.state == LoaderState::Idle {
            return;
        }
        self.elapsed += dt;

        loop {
            let next = match self.state {
                LoaderState::Idle => None,
                LoaderState::FadingOut => {
                    if self.fade_finished() {
                        if let Some(scene) = &self.scene {
                            host.begin_load(scene);
                        }
                        self.progress.set(0.0);
                        Some(LoaderState::Loading)
                    } else {
                        None
                    }
                }
                LoaderState::Loading => {
                    let raw = host.progress(dt);
                    self.progress.set((raw / READY_PROGRESS).min(1.0));
                    if raw >= READY_PROGRESS && self.elapsed >= self.min_load_time {
                        Some(LoaderState::Activating)
                    } else {
                        None
                    }
                }
                LoaderState::Activating => {
                    if host.activate() {
                        let scene = self.scene.take().unwrap_or_default();
                        log::info!("scene {} loaded in {:.2}s", scene, self.elapsed);
                        self.active_scene = Some(scene.clone());
                        self.events.push(LoaderEvent::LoadDone(scene));
                        self.request_fade(LoaderEvent::FadeIn);
                        Some(LoaderState::FadingIn)
                    } else {
                        None
                    }
                }
                LoaderState::FadingIn => {
                    if self.fade_finished() {
                        Some(LoaderState::Idle)
                    } else {
                        None
                    }
                }
            };

            match next {
                Some(state) => self.state = state,
                None => break,
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<LoaderEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Scene host that "loads" a fixed list of scene names over a set time
#[derive(Debug, Clone)]
pub struct HeadlessSceneHost {
    scenes: Vec<String>,
    /// Seconds a load takes to reach [`READY_PROGRESS`]
    pub load_time: f32,
    pending: Option<String>,
    timer: f32,
    active: Option<String>,
}

impl HeadlessSceneHost {
    pub fn new<I, S>(scenes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scenes: scenes.into_iter().map(Into::into).collect(),
            load_time: 0.5,
            pending: None,
            timer: 0.0,
            active: None,
        }
    }

    pub fn with_load_time(mut self, seconds: f32) -> Self {
        self.load_time = seconds.max(0.0);
        self
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }
}

impl SceneHost for HeadlessSceneHost {
    fn contains(&self, scene: &str) -> bool {
        self.scenes.iter().any(|s| s == scene)
    }

    fn begin_load(&mut self, scene: &str) {
        self.pending = Some(scene.to_string());
        self.timer = 0.0;
    }

    fn progress(&mut self, dt: f32) -> f32 {
        if self.pending.is_none() {
            return 0.0;
        }
        self.timer += dt;
        if self.load_time <= 0.0 {
            return READY_PROGRESS;
        }
        (self.timer / self.load_time).min(1.0) * READY_PROGRESS
    }

    fn activate(&mut self) -> bool {
        match self.pending.take() {
            Some(scene) => {
                self.active = Some(scene);
                true
            }
            None => false,
        }
    }
}
