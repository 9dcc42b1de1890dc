#![allow(dead_code)]

use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use funil_crm::{
    common::clock::{FixedClock, SharedClock},
    config::{AppConfig, AppState, RulesConfig},
    db::{MemoryStore, Repository, SharedStore},
    models::{
        auth::{Credential, User, UserRole},
        crm::{CreateLeadPayload, NoteKind, NotePayload, PipelineStage},
    },
};
use uuid::Uuid;

pub const PASSWORD: &str = "senha-integracao";

pub fn config() -> AppConfig {
    AppConfig {
        database_url: None,
        jwt_secret: "segredo-integracao".into(),
        bind_addr: "127.0.0.1:0".into(),
        utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
        default_password: "Portal2025*".into(),
        admin_email: "admin@portal.com".into(),
        admin_password: "Portal2025*".into(),
        rules: RulesConfig::default(),
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: SharedStore,
    pub clock: FixedClock,
}

/// Estado completo sobre MemoryStore, sem seed.
pub fn app_at(year: i32, month: u32, day: u32, hour: u32) -> TestApp {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let clock = FixedClock::at(year, month, day, hour);
    let shared: SharedClock = Arc::new(clock.clone());
    let state = AppState::with_parts(config(), store.clone(), shared);
    TestApp { state, store, clock }
}

impl TestApp {
    pub async fn add_user(&self, name: &str, role: UserRole, squad_id: Option<Uuid>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@portal.com", name.to_lowercase()),
            role,
            squad_id,
            is_active: true,
            created_at: Utc::now(),
        };
        Repository::<Credential>::new(self.store.clone())
            .create(Credential {
                id: user.id,
                password_hash: bcrypt::hash(PASSWORD, 4).unwrap(),
            })
            .await
            .unwrap();
        Repository::<User>::new(self.store.clone()).create(user).await.unwrap()
    }
}

pub fn lead_payload(name: &str, value: f64, stage: PipelineStage) -> CreateLeadPayload {
    CreateLeadPayload {
        name: Some(name.into()),
        company: Some(format!("{name} Ltda")),
        email: None,
        phone: Some("81988887777".into()),
        value: Some(value),
        stage: Some(stage),
        next_follow_up: None,
        notes: vec![NotePayload {
            content: "Lead criado via formulário.".into(),
            kind: NoteKind::Note,
        }],
        tags: vec![],
        source: None,
        interest_level: None,
        product_of_interest: None,
    }
}
