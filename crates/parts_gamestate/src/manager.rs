//! Game flow: score, pause, level sequencing and respawns

use crate::prefs::{SharedPrefs, HIGH_SCORE_KEY};
use crate::progression::{SceneKind, SceneProgression};
use parts_core::{EntityId, Scheduler, TimerKey};
use parts_event::{DataCell, EventChannel};

/// Timer purpose for player respawns
pub const RESPAWN: &str = "respawn";

/// Requests the rest of the game sends to the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCommand {
    AddScore(i32),
    StartGame,
    NextLevel,
    /// Back to the main menu
    Quit,
    TogglePause,
    /// The player entity died
    PlayerDied(EntityId),
    /// A scene finished loading and describes itself
    SceneReady(SceneKind),
}

/// What the manager asks the rest of the game to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Hand this scene name to the scene loader
    LoadScene(String),
    /// Stop or resume simulation time
    PauseChanged(bool),
    /// Put a fresh player at the level's spawn point
    SpawnPlayer,
    /// Remove a dead player before respawning
    DespawnPlayer(EntityId),
    /// A new best score was recorded
    HighScore(i32),
}

/// Owns the score and the level flow. Other systems talk to it through its
/// command channel and read score, high score and pause through data cells.
#[derive(Debug)]
pub struct GameManager {
    id: EntityId,
    prefs: SharedPrefs,
    progression: SceneProgression,
    commands: EventChannel<GameCommand>,
    main_menu: String,
    /// Seconds between a player death and the respawn
    pub respawn_delay: f32,
    score: DataCell<i32>,
    high_score: DataCell<i32>,
    paused: DataCell<bool>,
    events: Vec<GameEvent>,
}

impl GameManager {
    pub fn new(
        id: EntityId,
        prefs: SharedPrefs,
        progression: SceneProgression,
        commands: EventChannel<GameCommand>,
    ) -> Self {
        let high = prefs.lock().get_int(HIGH_SCORE_KEY, 0);
        Self {
            id,
            prefs,
            progression,
            commands,
            main_menu: "MainMenu".to_string(),
            respawn_delay: 2.0,
            score: DataCell::new(0),
            high_score: DataCell::new(high),
            paused: DataCell::new(false),
            events: Vec::new(),
        }
    }

    pub fn with_main_menu(mut self, scene: impl Into<String>) -> Self {
        self.main_menu = scene.into();
        self
    }

    pub fn with_respawn_delay(mut self, seconds: f32) -> Self {
        self.respawn_delay = seconds.max(0.0);
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Sender half for other systems
    pub fn commands(&self) -> EventChannel<GameCommand> {
        self.commands.clone()
    }

    pub fn score(&self) -> DataCell<i32> {
        self.score.clone()
    }

    pub fn high_score(&self) -> DataCell<i32> {
        self.high_score.clone()
    }

    pub fn paused(&self) -> DataCell<bool> {
        self.paused.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub fn progression(&self) -> &SceneProgression {
        &self.progression
    }

    pub fn progression_mut(&mut self) -> &mut SceneProgression {
        &mut self.progression
    }

    pub fn main_menu(&self) -> &str {
        &self.main_menu
    }

    /// Sync the level index with the scene that is already running
    pub fn resolve_scene(&mut self, active_scene: &str) {
        self.progression.resolve_current_scene(active_scene);
    }

    /// Handle every queued command. Returns how many were handled.
    pub fn process(&mut self, scheduler: &mut Scheduler) -> usize {
        let mut handled = 0;
        while let Some(command) = self.commands.receive() {
            self.handle(command, scheduler);
            handled += 1;
        }
        handled
    }

    pub fn handle(&mut self, command: GameCommand, scheduler: &mut Scheduler) {
        log::debug!("game command {:?}", command);
        match command {
            GameCommand::AddScore(points) => self.add_score(points),
            GameCommand::StartGame => self.start_game(),
            GameCommand::NextLevel => self.next_level(),
            GameCommand::Quit => self.load(self.main_menu.clone()),
            GameCommand::TogglePause => self.toggle_pause(),
            GameCommand::PlayerDied(player) => {
                let key = TimerKey::new(self.id, RESPAWN).with_target(player);
                scheduler.start_once(key, self.respawn_delay);
            }
            GameCommand::SceneReady(kind) => match kind {
                SceneKind::Level => self.events.push(GameEvent::SpawnPlayer),
                SceneKind::Menu | SceneKind::Cinematic => {}
            },
        }
    }

    /// Respawn the player when the respawn timer is due. Returns true if
    /// `key` belonged to the manager.
    pub fn handle_timer(&mut self, key: &TimerKey) -> bool {
        if !key.is(self.id, RESPAWN) {
            return false;
        }
        if let Some(player) = key.target {
            self.events.push(GameEvent::DespawnPlayer(player));
        }
        self.events.push(GameEvent::SpawnPlayer);
        true
    }

    fn add_score(&mut self, points: i32) {
        let score = self.score.update(|s| {
            *s += points;
            *s
        });

        if score >= self.high_score.get() {
            self.high_score.set(score);
            let mut prefs = self.prefs.lock();
            prefs.set_int(HIGH_SCORE_KEY, score);
            if let Err(e) = prefs.save() {
                log::warn!("failed to save high score: {}", e);
            }
            self.events.push(GameEvent::HighScore(score));
        }
    }

    fn start_game(&mut self) {
        self.score.set(0);
        if self.paused.get() {
            self.toggle_pause();
        }
        self.progression.reset();
        match self.progression.current_level() {
            Some(level) => {
                let name = level.name.clone();
                self.load(name);
            }
            None => log::warn!("cannot start game, progression has no levels"),
        }
    }

    fn next_level(&mut self) {
        match self.progression.move_to_next_level() {
            Some(level) => {
                let name = level.name.clone();
                self.load(name);
            }
            None => self.load(self.main_menu.clone()),
        }
    }

    fn toggle_pause(&mut self) {
        let paused = self.paused.update(|p| {
            *p = !*p;
            *p
        });
        log::info!("game {}", if paused { "paused" } else { "resumed" });
        self.events.push(GameEvent::PauseChanged(paused));
    }

    fn load(&mut self, scene: String) {
        self.events.push(GameEvent::LoadScene(scene));
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
