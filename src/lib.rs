//src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};

pub mod common;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, middleware::auth::auth_guard};

/// Todas as rotas da API. Só `/api/auth/login` e `/api/health` são públicas.
pub fn router(app_state: AppState) -> Router {
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route(
            "/",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/{id}", axum::routing::patch(handlers::users::update_user))
        .route("/{id}/toggle-status", post(handlers::users::toggle_status))
        .route("/{id}/reset-password", post(handlers::users::reset_password));

    let crm_routes = Router::new()
        .route("/workspace", get(handlers::crm::load_workspace))
        .route(
            "/leads",
            get(handlers::crm::list_leads).post(handlers::crm::create_lead),
        )
        .route(
            "/leads/{id}",
            get(handlers::crm::get_lead)
                .patch(handlers::crm::update_lead)
                .delete(handlers::crm::delete_lead),
        )
        .route("/leads/{id}/stage", put(handlers::crm::change_stage))
        .route("/leads/{id}/notes", post(handlers::crm::append_note))
        .route("/leads/{id}/message", get(handlers::crm::render_message))
        .route("/board", get(handlers::crm::pipeline_board))
        .route("/queue", get(handlers::crm::follow_up_queue))
        .route(
            "/tasks",
            get(handlers::crm::list_tasks).post(handlers::crm::create_task),
        )
        .route("/tasks/{id}", axum::routing::delete(handlers::crm::delete_task))
        .route("/tasks/{id}/toggle", post(handlers::crm::toggle_task));

    let habit_routes = Router::new()
        .route("/today", get(handlers::habits::today))
        .route("/{id}/toggle", post(handlers::habits::toggle_habit))
        .route(
            "/templates",
            get(handlers::habits::list_templates).post(handlers::habits::add_template),
        )
        .route(
            "/templates/{id}",
            axum::routing::patch(handlers::habits::update_template).delete(handlers::habits::delete_template),
        );

    let goal_routes = Router::new().route(
        "/",
        get(handlers::goals::current_progress).put(handlers::goals::set_goal),
    );

    let dashboard_routes = Router::new()
        .route("/stats", get(handlers::dashboard::get_stats))
        .route("/squads/{id}/performance", get(handlers::dashboard::squad_performance));

    let settings_routes = Router::new()
        .route(
            "/message-templates",
            get(handlers::settings::list_message_templates),
        )
        .route(
            "/message-templates/{stage}",
            put(handlers::settings::upsert_message_template),
        );

    let notification_routes = Router::new()
        .route(
            "/",
            get(handlers::notifications::list).delete(handlers::notifications::clear_all),
        )
        .route("/evaluate", post(handlers::notifications::evaluate))
        .route("/read-all", post(handlers::notifications::mark_all_as_read))
        .route("/{id}/read", post(handlers::notifications::mark_as_read));

    // Tudo abaixo exige token válido de usuário ativo
    let protected = Router::new()
        .nest("/users", user_routes)
        .route("/squads", get(handlers::users::list_squads))
        .nest("/crm", crm_routes)
        .nest("/habits", habit_routes)
        .nest("/goals", goal_routes)
        .nest("/dashboard", dashboard_routes)
        .nest("/settings", settings_routes)
        .nest("/notifications", notification_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected)
        .with_state(app_state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::{FixedOffset, Utc};
    use uuid::Uuid;

    use crate::{
        common::clock::{Clock, FixedClock, SharedClock},
        config::{AppConfig, AppState, RulesConfig},
        common::error::{AppError, AppResult},
        db::{Collection, MemoryStore, NewRow, RecordStore, Repository, SharedStore},
        models::{
            auth::{Credential, Squad, User, UserRole},
            crm::{CreateLeadPayload, Lead, NoteKind, NotePayload, PipelineStage},
        },
        services::{
            auth::AuthService, crm_service::CrmService, dashboard_service::DashboardService,
            goal_service::GoalService, habit_service::HabitService, workspace::WorkspaceService,
        },
    };

    pub const TEST_PASSWORD: &str = "senha-de-teste";

    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: None,
            jwt_secret: "segredo-de-teste".into(),
            bind_addr: "127.0.0.1:0".into(),
            utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
            default_password: "Portal2025*".into(),
            admin_email: "admin@portal.com".into(),
            admin_password: "Portal2025*".into(),
            rules: RulesConfig::default(),
        }
    }

    /// Usuário solto, fora do store.
    pub fn user(role: UserRole, squad_id: Option<Uuid>) -> User {
        let id = Uuid::new_v4();
        User {
            id,
            name: format!("Usuário {}", &id.to_string()[..8]),
            email: format!("{id}@portal.com"),
            role,
            squad_id,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Lead aberto (QUALIFIED) do usuário, com follow-up longe no futuro.
    pub fn lead_for(owner: &User) -> Lead {
        let now = Utc::now();
        Lead {
            id: Uuid::new_v4(),
            name: "Lead de teste".into(),
            company: Some("Recife".into()),
            email: None,
            phone: "81900000000".into(),
            value: 1000.0,
            stage: PipelineStage::Qualified,
            next_follow_up: now.date_naive() + chrono::Duration::days(30),
            notes: vec![],
            tags: vec![],
            owner_id: owner.id,
            squad_id: owner.squad_id,
            created_at: now,
            updated_at: now,
            source: None,
            interest_level: None,
            product_of_interest: None,
        }
    }

    /// MemoryStore que recusa gravações numa coleção depois das `allowed` primeiras.
    /// Um lote que passaria do limite falha inteiro, como num banco transacional.
    pub struct FailingStore {
        inner: MemoryStore,
        collection: Collection,
        allowed: usize,
        written: std::sync::atomic::AtomicUsize,
    }

    impl FailingStore {
        pub fn new(collection: Collection, allowed: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                collection,
                allowed,
                written: Default::default(),
            }
        }

        fn reserve(&self, count: usize) -> AppResult<()> {
            use std::sync::atomic::Ordering;
            let before = self.written.load(Ordering::SeqCst);
            if before + count > self.allowed {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "gravação recusada em '{}'",
                    self.collection.as_str()
                )));
            }
            self.written.store(before + count, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl RecordStore for FailingStore {
        async fn list(&self, collection: Collection) -> AppResult<Vec<serde_json::Value>> {
            self.inner.list(collection).await
        }

        async fn get(&self, collection: Collection, id: Uuid) -> AppResult<Option<serde_json::Value>> {
            self.inner.get(collection, id).await
        }

        async fn create(&self, collection: Collection, id: Uuid, data: serde_json::Value) -> AppResult<()> {
            if collection == self.collection {
                self.reserve(1)?;
            }
            self.inner.create(collection, id, data).await
        }

        async fn create_many(&self, rows: Vec<NewRow>) -> AppResult<()> {
            self.reserve(rows.iter().filter(|r| r.collection == self.collection).count())?;
            self.inner.create_many(rows).await
        }

        async fn update(&self, collection: Collection, id: Uuid, data: serde_json::Value) -> AppResult<bool> {
            self.inner.update(collection, id, data).await
        }

        async fn delete(&self, collection: Collection, id: Uuid) -> AppResult<bool> {
            self.inner.delete(collection, id).await
        }
    }

    /// Serviços reais sobre MemoryStore e um relógio fixo (15/05/2024 10h, UTC-3).
    pub struct Harness {
        pub store: SharedStore,
        pub clock: FixedClock,
        pub config: AppConfig,
        pub auth: AuthService,
        pub crm: CrmService,
        pub habits: HabitService,
        pub goals: GoalService,
        pub dashboard: DashboardService,
        pub workspace: WorkspaceService,
    }

    impl Harness {
        pub async fn new() -> Self {
            let store: SharedStore = Arc::new(MemoryStore::new());
            let clock = FixedClock::at(2024, 5, 15, 10);
            let shared: SharedClock = Arc::new(clock.clone());
            let config = test_config();
            let state = AppState::with_parts(config.clone(), store.clone(), shared);

            Self {
                store,
                clock,
                config,
                auth: state.auth_service.with_hash_cost(4),
                crm: state.crm_service,
                habits: state.habit_service,
                goals: state.goal_service,
                dashboard: state.dashboard_service,
                workspace: state.workspace_service,
            }
        }

        /// Grava um usuário ativo com senha `TEST_PASSWORD`.
        pub async fn add_user(&self, role: UserRole, squad_id: Option<Uuid>) -> User {
            let user = user(role, squad_id);
            let users: Repository<User> = Repository::new(self.store.clone());
            let credentials: Repository<Credential> = Repository::new(self.store.clone());
            let password_hash = bcrypt::hash(TEST_PASSWORD, 4).unwrap();
            credentials
                .create(Credential {
                    id: user.id,
                    password_hash,
                })
                .await
                .unwrap();
            users.create(user).await.unwrap()
        }

        pub async fn add_squad(&self, name: &str) -> Uuid {
            let squads: Repository<Squad> = Repository::new(self.store.clone());
            squads
                .create(Squad {
                    id: Uuid::new_v4(),
                    name: name.into(),
                    supervisor_id: None,
                })
                .await
                .unwrap()
                .id
        }

        /// Cria pelo serviço (com uma nota) já no estágio pedido.
        pub async fn seed_lead(&self, owner: &User, value: f64, stage: PipelineStage) -> Lead {
            self.crm
                .create_lead(
                    owner,
                    CreateLeadPayload {
                        name: Some("Lead semeado".into()),
                        company: Some("Caruaru".into()),
                        email: None,
                        phone: Some("81911112222".into()),
                        value: Some(value),
                        stage: Some(stage),
                        next_follow_up: Some(self.clock.today()),
                        notes: vec![NotePayload {
                            content: "Primeiro contato".into(),
                            kind: NoteKind::Note,
                        }],
                        tags: vec![],
                        source: None,
                        interest_level: None,
                        product_of_interest: None,
                    },
                )
                .await
                .unwrap()
        }
    }
}
