//! Parts GameState - Game Flow and Persistence
//!
//! Everything that sits above a single scene: saved preferences, the level
//! sequence, the scene loader, the game manager and the timed components
//! (spawners, lifetimes) that appear and disappear with scenes.
//!
//! # Features
//!
//! - Key/value prefs saved as JSON or binary
//! - Level progression with lookup by scene name
//! - Scene loader state machine with fades and a minimum loading time
//! - Game manager: score and high score, pause, level flow, respawns
//! - Spawners over points, boxes and spheres with overlap avoidance
//! - Lifetimes that restart on activation
//!
//! # Example
//!
//! ```ignore
//! use parts_gamestate::prelude::*;
//!
//! let prefs = Prefs::open("prefs.json", PrefsFormat::Json)?.shared();
//! let progression = SceneProgression::new(vec![SceneDescriptor::level("Level1")]);
//! let mut game = GameManager::new(ids.next(), prefs, progression, EventChannel::new());
//!
//! game.commands().send(GameCommand::StartGame);
//! game.process(&mut scheduler);
//! for event in game.drain_events() {
//!     if let GameEvent::LoadScene(name) = event {
//!         loader.load(&name, &host)?;
//!     }
//! }
//! ```

pub mod activation;
pub mod lifetime;
pub mod loader;
pub mod manager;
pub mod prefs;
pub mod progression;
pub mod spawner;

pub mod prelude {
    pub use crate::activation::{Activatable, Activation};
    pub use crate::lifetime::{Lifetime, LifetimeAction, LIFETIME};
    pub use crate::loader::{
        HeadlessSceneHost, LoadError, LoaderEvent, LoaderState, SceneHost, SceneLoader, READY_PROGRESS,
    };
    pub use crate::manager::{GameCommand, GameEvent, GameManager, RESPAWN};
    pub use crate::prefs::{PrefValue, Prefs, PrefsError, PrefsFormat, SharedPrefs, HIGH_SCORE_KEY};
    pub use crate::progression::{SceneDescriptor, SceneKind, SceneProgression};
    pub use crate::spawner::{SpawnArea, SpawnRequest, Spawner, SpawnerConfig, MAX_SPAWN_ATTEMPTS, SPAWN};
}

pub use prelude::*;
