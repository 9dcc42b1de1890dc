// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use chrono::FixedOffset;
use sqlx::postgres::PgPoolOptions;

use crate::{
    common::clock::{SharedClock, SystemClock},
    db::{seed, MemoryStore, PgStore, SharedLedger, SharedStore, StoreLedger},
    services::{
        auth::AuthService, crm_service::CrmService, dashboard_service::DashboardService, goal_service::GoalService,
        habit_service::HabitService, notification_service::NotificationService, template_service::TemplateService,
        workspace::WorkspaceService,
    },
};

/// Limiares das regras de negócio.
#[derive(Debug, Clone, PartialEq)]
pub struct RulesConfig {
    pub stale_after_days: i64,
    pub high_value_threshold: f64,
    pub morning_hour: u32,
    pub afternoon_hour: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            stale_after_days: 7,
            high_value_threshold: 10_000.0,
            morning_hour: 9,
            afternoon_hour: 16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Ausente = store em memória
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub utc_offset: FixedOffset,
    pub default_password: String,
    pub admin_email: String,
    pub admin_password: String,
    pub rules: RulesConfig,
}

fn parse_var<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} tem um valor inválido: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET deve ser definido"))?;
        let offset_minutes: i32 = parse_var("CRM_UTC_OFFSET_MINUTES", -180)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow::anyhow!("CRM_UTC_OFFSET_MINUTES fora do intervalo"))?;
        let defaults = RulesConfig::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            utc_offset,
            default_password: env::var("CRM_DEFAULT_PASSWORD").unwrap_or_else(|_| "Portal2025*".to_string()),
            admin_email: env::var("CRM_ADMIN_EMAIL").unwrap_or_else(|_| "admin@portal.com".to_string()),
            admin_password: env::var("CRM_ADMIN_PASSWORD").unwrap_or_else(|_| "Portal2025*".to_string()),
            rules: RulesConfig {
                stale_after_days: parse_var("CRM_STALE_AFTER_DAYS", defaults.stale_after_days)?,
                high_value_threshold: parse_var("CRM_HIGH_VALUE_THRESHOLD", defaults.high_value_threshold)?,
                morning_hour: parse_var("CRM_MORNING_HOUR", defaults.morning_hour)?,
                afternoon_hour: parse_var("CRM_AFTERNOON_HOUR", defaults.afternoon_hour)?,
            },
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: SharedStore,
    pub ledger: SharedLedger,
    pub clock: SharedClock,
    pub auth_service: AuthService,
    pub crm_service: CrmService,
    pub habit_service: HabitService,
    pub goal_service: GoalService,
    pub dashboard_service: DashboardService,
    pub template_service: TemplateService,
    pub notification_service: NotificationService,
    pub workspace_service: WorkspaceService,
}

impl AppState {
    /// Conecta (ou não) ao banco, roda migrações e seed, e monta os serviços.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store: SharedStore = match &config.database_url {
            Some(database_url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!().run(&pool).await?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
                Arc::new(PgStore::new(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL ausente: usando store em memória");
                Arc::new(MemoryStore::new())
            }
        };

        let clock: SharedClock = Arc::new(SystemClock::new(config.utc_offset));
        seed::seed_defaults(&store, &config, &clock).await?;
        Ok(Self::with_parts(config, store, clock))
    }

    /// Monta o gráfico de dependências sobre handles já prontos.
    pub fn with_parts(config: AppConfig, store: SharedStore, clock: SharedClock) -> Self {
        let ledger: SharedLedger = Arc::new(StoreLedger::new(store.clone()));

        let auth_service = AuthService::new(
            store.clone(),
            config.jwt_secret.clone(),
            config.default_password.clone(),
            clock.clone(),
        );
        let crm_service = CrmService::new(store.clone(), clock.clone(), config.rules.clone());
        let habit_service = HabitService::new(store.clone(), clock.clone());
        let goal_service = GoalService::new(store.clone(), clock.clone());
        let dashboard_service = DashboardService::new(
            store.clone(),
            habit_service.clone(),
            clock.clone(),
            config.rules.clone(),
        );
        let template_service = TemplateService::new(store.clone());
        let notification_service = NotificationService::new(ledger.clone(), clock.clone(), config.rules.clone());
        let workspace_service = WorkspaceService::new(
            crm_service.clone(),
            habit_service.clone(),
            goal_service.clone(),
            dashboard_service.clone(),
            template_service.clone(),
            notification_service.clone(),
            clock.clone(),
        );

        Self {
            config: Arc::new(config),
            store,
            ledger,
            clock,
            auth_service,
            crm_service,
            habit_service,
            goal_service,
            dashboard_service,
            template_service,
            notification_service,
            workspace_service,
        }
    }
}
