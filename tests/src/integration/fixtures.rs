//! Shared test fixtures.

use fanout_core::{InMemoryScene, Messenger, NodeId, ReceiverKey};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Damage notification, delivered along the entity tree.
pub trait OnDamage {
    fn on_damage(&self, amount: u32) -> anyhow::Result<()>;
}

/// Save notification, usually delivered through the global registry.
pub trait OnSave {
    fn on_save(&self) -> anyhow::Result<()>;
}

/// Append-only record of deliveries, shared by every actor of a world.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    /// Drain and return every entry recorded so far.
    pub fn take(&self) -> Vec<String> {
        self.0.borrow_mut().drain(..).collect()
    }
}

/// A component implementing both capabilities.
pub struct Actor {
    pub name: String,
    journal: Journal,
    failing: Cell<bool>,
}

impl Actor {
    pub fn new(name: impl Into<String>, journal: &Journal) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            journal: journal.clone(),
            failing: Cell::new(false),
        })
    }

    /// Make every subsequent handler call fail.
    pub fn fail(&self) {
        self.failing.set(true);
    }

    fn record(&self, entry: String) -> anyhow::Result<()> {
        if self.failing.get() {
            anyhow::bail!("{} refused {entry}", self.name);
        }
        self.journal.push(format!("{}:{entry}", self.name));
        Ok(())
    }
}

impl OnDamage for Actor {
    fn on_damage(&self, amount: u32) -> anyhow::Result<()> {
        self.record(format!("damage={amount}"))
    }
}

impl OnSave for Actor {
    fn on_save(&self) -> anyhow::Result<()> {
        self.record("save".to_string())
    }
}

/// A scene, a messenger over it and a journal.
pub struct World {
    pub scene: Rc<InMemoryScene>,
    pub messenger: Messenger<InMemoryScene>,
    pub journal: Journal,
}

impl World {
    pub fn new() -> Self {
        fanout_telemetry::init_test_logging();
        let scene = Rc::new(InMemoryScene::new());
        Self {
            messenger: Messenger::new(scene.clone()),
            scene,
            journal: Journal::default(),
        }
    }

    pub fn node(&self, name: &str, parent: Option<NodeId>) -> NodeId {
        self.scene.spawn(name, parent).expect("parent exists")
    }

    /// Attach a new actor to `node`, exposed under both capabilities.
    pub fn actor(&self, node: NodeId, name: impl Into<String>) -> (Rc<Actor>, ReceiverKey) {
        let actor = Actor::new(name, &self.journal);
        let key = self.scene.attach(node, actor.clone()).expect("node exists");
        self.expose(key, &actor);
        (actor, key)
    }

    /// A free-standing actor known to the scene but attached to no node.
    pub fn loose_actor(&self, name: impl Into<String>) -> (Rc<Actor>, ReceiverKey) {
        let actor = Actor::new(name, &self.journal);
        let key = self.scene.track(actor.clone());
        self.expose(key, &actor);
        (actor, key)
    }

    fn expose(&self, key: ReceiverKey, actor: &Rc<Actor>) {
        self.scene
            .expose::<dyn OnDamage>(key, actor.clone())
            .expect("same allocation");
        self.scene
            .expose::<dyn OnSave>(key, actor.clone())
            .expect("same allocation");
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
