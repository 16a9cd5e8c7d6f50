pub mod avatar;
mod content;
mod decision;
mod memory;
mod population;
pub mod username;

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::llm::TextGenerator;
use crate::memory::MemoryStore;
use crate::social::SocialGraphClient;

pub use content::{render_comments, render_post_info, ContentGenerator, NO_COMMENTS};
pub use decision::{DecisionEngine, Gate, GateResult, TickOutcome, TickReport, GATE_ORDER};
pub use memory::MemoryBridge;
pub use population::{PopulationManager, RunSummary, SyncSummary};

/// Random source shared by the services. Seed it to make draws reproducible.
#[derive(Clone)]
pub struct SharedRng(Arc<Mutex<StdRng>>);

impl SharedRng {
    pub fn from_entropy() -> Self {
        Self(Arc::new(Mutex::new(StdRng::from_entropy())))
    }

    pub fn seeded(seed: u64) -> Self {
        Self(Arc::new(Mutex::new(StdRng::seed_from_u64(seed))))
    }

    /// Run `f` with exclusive access to the generator. Never hold this across an await.
    pub fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// `true` with probability `p`.
    pub fn chance(&self, p: f64) -> bool {
        self.with(|rng| rand::Rng::gen::<f64>(rng)) < p
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Fully wired service graph over the external collaborators.
#[derive(Clone)]
pub struct Services {
    pub content: ContentGenerator,
    pub memory: MemoryBridge,
    pub decisions: Arc<DecisionEngine>,
    pub population: Arc<PopulationManager>,
}

impl Services {
    pub fn new(
        config: &Config,
        db: Arc<dyn DatabaseBackend>,
        social: Arc<dyn SocialGraphClient>,
        llm: Arc<dyn TextGenerator>,
        memory_store: Arc<dyn MemoryStore>,
        rng: SharedRng,
    ) -> Self {
        let temperature = config
            .llm
            .as_ref()
            .map(|llm| llm.temperature)
            .unwrap_or(crate::config::DEFAULT_LLM_TEMPERATURE);

        let content = ContentGenerator::new(llm, config.content.clone(), temperature);
        let memory = MemoryBridge::new(memory_store, content.clone());
        let decisions = Arc::new(DecisionEngine::new(
            db.clone(),
            social.clone(),
            memory.clone(),
            content.clone(),
            rng.clone(),
            &config.bots,
        ));
        let population = Arc::new(PopulationManager::new(
            db,
            social,
            memory.clone(),
            content.clone(),
            decisions.clone(),
            rng,
            config.bots.clone(),
        ));

        Self {
            content,
            memory,
            decisions,
            population,
        }
    }
}
