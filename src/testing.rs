//! In-memory adapters so tests run without Postgres or Redis.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::cache::{CodeStore, MemoryStore};
use crate::care::{Care, CareStore};
use crate::config::Configuration;
use crate::crypto::PasswordManager;
use crate::error::{Result, ServerError};
use crate::mail::{MailDispatcher, Mailer, Message};
use crate::plant::{Plant, PlantStore};
use crate::store::one_row;
use crate::token::TokenManager;
use crate::user::{AccountService, User, UserStore};
use crate::AppState;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_API_KEY: &str = "test-api-key";

/// Mailer capturing every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Message>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct UserRow {
    user: User,
    deleted: bool,
}

/// [`UserStore`] over a plain vector.
#[derive(Default)]
pub struct MemUserStore {
    rows: Mutex<Vec<UserRow>>,
    next_id: AtomicI64,
}

impl MemUserStore {
    fn find(&self, pred: impl Fn(&User) -> bool) -> Result<User> {
        let rows = self.rows.lock().unwrap();
        let matches: Vec<User> = rows
            .iter()
            .filter(|row| !row.deleted && pred(&row.user))
            .map(|row| row.user.clone())
            .collect();
        one_row(matches)
    }

    fn mutate(
        &self,
        id: &str,
        apply: impl FnOnce(&mut UserRow),
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|row| !row.deleted && row.user.external_id == id)
        {
            Some(row) => {
                apply(row);
                Ok(())
            }
            None => Err(ServerError::NotFound),
        }
    }
}

#[async_trait]
impl UserStore for MemUserStore {
    async fn create(&self, user: &User) -> Result<String> {
        if self.find(|u| u.username == user.username).is_ok() {
            return Err(ServerError::UsernameAlreadyExists);
        }
        if self.find(|u| u.email == user.email).is_ok() {
            return Err(ServerError::EmailAlreadyExists);
        }

        let mut user = user.clone();
        user.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        user.external_id = Uuid::new_v4().to_string();
        let external_id = user.external_id.clone();

        self.rows.lock().unwrap().push(UserRow {
            user,
            deleted: false,
        });
        Ok(external_id)
    }

    async fn get_by_username(&self, username: &str) -> Result<User> {
        self.find(|user| user.username == username)
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        self.find(|user| user.email == email)
    }

    async fn get_by_external_id(&self, id: &str) -> Result<User> {
        self.find(|user| user.external_id == id)
    }

    async fn add_roles(&self, id: &str, roles: &[String]) -> Result<()> {
        self.mutate(id, |row| {
            let held = row.user.roles.clone();
            row.user.roles.extend(
                roles
                    .iter()
                    .filter(|role| !held.contains(role))
                    .cloned(),
            );
        })
    }

    async fn remove_roles(&self, id: &str, roles: &[String]) -> Result<()> {
        self.mutate(id, |row| {
            row.user.roles.retain(|role| !roles.contains(role));
        })
    }

    async fn verify(&self, id: &str) -> Result<()> {
        self.mutate(id, |row| row.user.verified = true)
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<()> {
        self.mutate(id, |row| row.user.active = active)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.mutate(id, |row| {
            row.deleted = true;
            row.user.active = false;
        })
    }

    async fn update_password(&self, id: &str, password: &str) -> Result<()> {
        self.mutate(id, |row| row.user.password = password.to_owned())
    }
}

struct PlantRow {
    plant: Plant,
    deleted: bool,
}

/// [`PlantStore`] over a plain vector.
#[derive(Default)]
pub struct MemPlantStore {
    rows: Mutex<Vec<PlantRow>>,
    next_id: AtomicI64,
}

#[async_trait]
impl PlantStore for MemPlantStore {
    async fn create(&self, plant: &Plant) -> Result<i64> {
        let mut plant = plant.clone();
        plant.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = plant.id;

        self.rows.lock().unwrap().push(PlantRow {
            plant,
            deleted: false,
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Plant> {
        let rows = self.rows.lock().unwrap();
        let matches: Vec<Plant> = rows
            .iter()
            .filter(|row| !row.deleted && row.plant.id == id)
            .map(|row| row.plant.clone())
            .collect();
        one_row(matches)
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Vec<Plant>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|row| !row.deleted && row.plant.user_id == user_id)
            .map(|row| row.plant.clone())
            .collect())
    }

    async fn update(&self, plant: &Plant) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|row| !row.deleted && row.plant.id == plant.id)
        {
            Some(row) => {
                row.plant = plant.clone();
                Ok(())
            }
            None => Err(ServerError::NotFound),
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|row| !row.deleted && row.plant.id == id)
        {
            Some(row) => {
                row.deleted = true;
                Ok(())
            }
            None => Err(ServerError::NotFound),
        }
    }
}

/// [`CareStore`] over a plain vector.
#[derive(Default)]
pub struct MemCareStore {
    rows: Mutex<Vec<Care>>,
    next_id: AtomicI64,
}

#[async_trait]
impl CareStore for MemCareStore {
    async fn create(&self, care: &Care) -> Result<i64> {
        let mut care = care.clone();
        care.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = care.id;

        self.rows.lock().unwrap().push(care);
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Care> {
        let rows = self.rows.lock().unwrap();
        let matches: Vec<Care> = rows
            .iter()
            .filter(|care| care.id == id)
            .cloned()
            .collect();
        one_row(matches)
    }

    async fn get_by_plant(&self, plant_id: i64) -> Result<Vec<Care>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|care| care.plant_id == plant_id)
            .cloned()
            .collect())
    }

    async fn update(&self, care: &Care) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|row| row.id == care.id) {
            Some(row) => {
                *row = care.clone();
                Ok(())
            }
            None => Err(ServerError::NotFound),
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|care| care.id != id);

        if rows.len() == before {
            return Err(ServerError::NotFound);
        }
        Ok(())
    }
}

/// Everything a router test needs, with handles on the concrete stores.
pub struct TestHarness {
    pub state: AppState,
    pub users: Arc<MemUserStore>,
    pub plants: Arc<MemPlantStore>,
    pub cares: Arc<MemCareStore>,
    pub codes: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

/// Build an [`AppState`] over in-memory adapters.
pub fn harness() -> TestHarness {
    let users = Arc::new(MemUserStore::default());
    let plants = Arc::new(MemPlantStore::default());
    let cares = Arc::new(MemCareStore::default());
    let codes = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());

    let (dispatcher, _worker) =
        MailDispatcher::start(Arc::clone(&mailer) as Arc<dyn Mailer>, None);

    let token = TokenManager::new("verdant", TEST_SECRET);
    let password = PasswordManager::new(Some(crate::config::Argon2 {
        memory_cost: 1024,
        iterations: 1,
        parallelism: 1,
    }))
    .unwrap();

    let accounts = AccountService::new(
        Arc::clone(&users) as Arc<dyn UserStore>,
        Arc::clone(&codes) as Arc<dyn CodeStore>,
        dispatcher,
        token.clone(),
        password,
    );

    let mut config = Configuration::default();
    config.name = "verdant".to_owned();
    config.api_keys = vec![TEST_API_KEY.to_owned()];

    TestHarness {
        state: AppState {
            config: Arc::new(config),
            token,
            accounts,
            users: Arc::clone(&users) as Arc<dyn UserStore>,
            plants: Arc::clone(&plants) as Arc<dyn PlantStore>,
            cares: Arc::clone(&cares) as Arc<dyn CareStore>,
        },
        users,
        plants,
        cares,
        codes,
        mailer,
    }
}
