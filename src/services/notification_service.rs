// src/services/notification_service.rs

use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::{
        clock::SharedClock,
        error::AppResult,
    },
    config::RulesConfig,
    db::SharedLedger,
    models::{
        auth::User,
        crm::{Lead, PipelineStage},
        habits::DailyHabit,
        notifications::{AppNotification, NotificationFeed, Severity},
    },
    services::habit_service::completion_percent,
};

// =========================================================================
//  1. REGRAS (avaliação pura)
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    OverdueFollowUps,
    MorningNudge,
    AfternoonPush,
    StalledBigDeal,
}

impl Rule {
    /// Chave de deduplicação (sem o usuário).
    pub fn key(self) -> &'static str {
        match self {
            Rule::OverdueFollowUps => "overdue_alert",
            Rule::MorningNudge => "morning_nudge",
            Rule::AfternoonPush => "afternoon_push",
            Rule::StalledBigDeal => "big_deal_check",
        }
    }
}

/// O que a avaliação enxerga: leads visíveis e hábitos de hoje do usuário.
#[derive(Debug, Clone, Copy)]
pub struct RuleSnapshot<'a> {
    pub leads: &'a [Lead],
    pub habits: &'a [DailyHabit],
    pub today: NaiveDate,
    pub hour: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub rule: Rule,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub action_link: Option<String>,
}

/// Todas as regras que se qualificam, na ordem fixa. Não são exclusivas.
pub fn evaluate_rules(snapshot: &RuleSnapshot<'_>, rules: &RulesConfig) -> Vec<Firing> {
    let mut fired = Vec::new();
    let progress = completion_percent(snapshot.habits);

    let overdue = snapshot
        .leads
        .iter()
        .filter(|l| l.is_open() && l.next_follow_up < snapshot.today)
        .count();
    if overdue > 0 {
        fired.push(Firing {
            rule: Rule::OverdueFollowUps,
            severity: Severity::Alert,
            title: "Atenção Necessária".into(),
            message: format!("Você tem {overdue} follow-ups atrasados. Não deixe o lead esfriar!"),
            action_link: Some("/?tab=calls".into()),
        });
    }

    if snapshot.hour >= rules.morning_hour && !snapshot.habits.is_empty() && progress == 0 {
        fired.push(Firing {
            rule: Rule::MorningNudge,
            severity: Severity::Info,
            title: "Bom dia! ☀️".into(),
            message: "Sua rotina diária ainda não foi iniciada. Vamos bater a meta hoje?".into(),
            action_link: Some("/".into()),
        });
    }

    if snapshot.hour >= rules.afternoon_hour && progress > 50 && progress < 100 {
        fired.push(Firing {
            rule: Rule::AfternoonPush,
            severity: Severity::Info,
            title: "Quase lá! 🚀".into(),
            message: "Falta pouco para fechar 100% da sua rotina. Finalize suas tarefas.".into(),
            action_link: Some("/".into()),
        });
    }

    // Primeiro na ordem do snapshot; não há critério secundário.
    let big_deal = snapshot.leads.iter().find(|l| {
        l.is_open() && l.stage == PipelineStage::ProposalSent && l.value > rules.high_value_threshold
    });
    if let Some(lead) = big_deal {
        let who = lead.company.as_deref().unwrap_or(&lead.name);
        fired.push(Firing {
            rule: Rule::StalledBigDeal,
            severity: Severity::Warning,
            title: "Oportunidade de Ouro 💰".into(),
            message: format!("O deal da {who} está em Proposta. Que tal enviar um material de apoio?"),
            action_link: Some(format!("/leads/{}", lead.id)),
        });
    }

    tracing::debug!(count = fired.len(), progress, overdue, "regras avaliadas");
    fired
}

// =========================================================================
//  2. CAIXA DE ENTRADA (memória da sessão)
// =========================================================================

/// Lista ordenada, mais recente primeiro.
#[derive(Debug, Clone, Default)]
pub struct NotificationInbox {
    items: Vec<AppNotification>,
}

impl NotificationInbox {
    pub fn push(&mut self, notification: AppNotification) {
        self.items.insert(0, notification);
    }

    pub fn list(&self) -> &[AppNotification] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.is_read).count()
    }

    /// `false` se o id não está na caixa.
    pub fn mark_as_read(&mut self, id: Uuid) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.is_read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_as_read(&mut self) {
        self.items.iter_mut().for_each(|n| n.is_read = true);
    }

    pub fn clear_all(&mut self) {
        self.items.clear();
    }

    pub fn feed(&self) -> NotificationFeed {
        NotificationFeed {
            notifications: self.items.clone(),
            unread_count: self.unread_count(),
        }
    }
}

// =========================================================================
//  3. SERVIÇO
// =========================================================================

#[derive(Clone)]
pub struct NotificationService {
    ledger: SharedLedger,
    clock: SharedClock,
    rules: RulesConfig,
    inboxes: Arc<RwLock<HashMap<Uuid, NotificationInbox>>>,
}

impl NotificationService {
    pub fn new(ledger: SharedLedger, clock: SharedClock, rules: RulesConfig) -> Self {
        Self {
            ledger,
            clock,
            rules,
            inboxes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Roda as regras sobre o snapshot e entrega só o que ainda não disparou hoje.
    pub async fn evaluate(&self, user: &User, leads: &[Lead], habits: &[DailyHabit]) -> AppResult<Vec<AppNotification>> {
        let today = self.clock.today();
        let snapshot = RuleSnapshot {
            leads,
            habits,
            today,
            hour: self.clock.hour(),
        };

        // Cada disparo marcado no ledger entra na caixa no mesmo passo.
        let mut inboxes = self.inboxes.write().await;
        let inbox = inboxes.entry(user.id).or_default();
        let mut delivered = Vec::new();
        for firing in evaluate_rules(&snapshot, &self.rules) {
            if !self.fire_once(user.id, firing.rule, today).await? {
                continue;
            }
            let notification = AppNotification {
                id: Uuid::new_v4(),
                severity: firing.severity,
                title: firing.title,
                message: firing.message,
                is_read: false,
                timestamp: self.clock.now_utc(),
                action_link: firing.action_link,
            };
            inbox.push(notification.clone());
            delivered.push(notification);
        }

        if !delivered.is_empty() {
            tracing::info!(user = %user.id, count = delivered.len(), "notificações disparadas");
        }
        Ok(delivered)
    }

    /// Lê a data, compara e grava: no máximo um disparo por dia por chave.
    async fn fire_once(&self, user_id: Uuid, rule: Rule, today: NaiveDate) -> AppResult<bool> {
        let key = format!("{user_id}:{}", rule.key());
        if self.ledger.last_fired(&key).await? == Some(today) {
            return Ok(false);
        }
        self.ledger.mark_fired(&key, today).await?;
        Ok(true)
    }

    pub async fn feed(&self, user_id: Uuid) -> NotificationFeed {
        let inboxes = self.inboxes.read().await;
        inboxes.get(&user_id).map(|i| i.feed()).unwrap_or_else(|| NotificationInbox::default().feed())
    }

    pub async fn unread_count(&self, user_id: Uuid) -> usize {
        let inboxes = self.inboxes.read().await;
        inboxes.get(&user_id).map_or(0, |i| i.unread_count())
    }

    /// Id desconhecido não é erro: a caixa volta como está.
    pub async fn mark_as_read(&self, user_id: Uuid, notification_id: Uuid) -> NotificationFeed {
        let mut inboxes = self.inboxes.write().await;
        let inbox = inboxes.entry(user_id).or_default();
        if !inbox.mark_as_read(notification_id) {
            tracing::debug!(user = %user_id, notification = %notification_id, "notificação fora da caixa");
        }
        inbox.feed()
    }

    pub async fn mark_all_as_read(&self, user_id: Uuid) -> NotificationFeed {
        let mut inboxes = self.inboxes.write().await;
        let inbox = inboxes.entry(user_id).or_default();
        inbox.mark_all_as_read();
        inbox.feed()
    }

    /// Só esvazia a caixa; o ledger continua valendo.
    pub async fn clear_all(&self, user_id: Uuid) -> NotificationFeed {
        let mut inboxes = self.inboxes.write().await;
        let inbox = inboxes.entry(user_id).or_default();
        inbox.clear_all();
        inbox.feed()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        common::{clock::FixedClock, error::AppError},
        db::{MemoryStore, NotificationLedger, StoreLedger},
        models::auth::UserRole,
        test_support::{lead_for, user},
    };

    fn habit(owner: &User, completed: bool) -> DailyHabit {
        DailyHabit {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            user_id: owner.id,
            date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            title: "Login no Sistema".into(),
            completed,
        }
    }

    fn snapshot<'a>(leads: &'a [Lead], habits: &'a [DailyHabit], hour: u32) -> RuleSnapshot<'a> {
        RuleSnapshot {
            leads,
            habits,
            today: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            hour,
        }
    }

    fn rules_of(fired: &[Firing]) -> Vec<Rule> {
        fired.iter().map(|f| f.rule).collect()
    }

    #[test]
    fn overdue_counts_only_open_leads_before_today() {
        let seller = user(UserRole::Salesperson, None);
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut late = lead_for(&seller);
        late.next_follow_up = today - Duration::days(3);
        let mut late_won = late.clone();
        late_won.stage = PipelineStage::Won;
        let mut due_today = lead_for(&seller);
        due_today.next_follow_up = today;
        let leads = vec![late, late_won, due_today];

        let fired = evaluate_rules(&snapshot(&leads, &[], 8), &RulesConfig::default());
        assert_eq!(rules_of(&fired), vec![Rule::OverdueFollowUps]);
        assert_eq!(fired[0].severity, Severity::Alert);
        assert!(fired[0].message.contains("Você tem 1 follow-ups atrasados"));
        assert_eq!(fired[0].action_link.as_deref(), Some("/?tab=calls"));
    }

    #[test]
    fn morning_nudge_needs_habits_and_zero_progress() {
        let seller = user(UserRole::Salesperson, None);
        let cfg = RulesConfig::default();

        assert!(evaluate_rules(&snapshot(&[], &[], 10), &cfg).is_empty());
        let untouched = vec![habit(&seller, false)];
        assert!(evaluate_rules(&snapshot(&[], &untouched, 8), &cfg).is_empty());
        assert_eq!(rules_of(&evaluate_rules(&snapshot(&[], &untouched, 9), &cfg)), vec![Rule::MorningNudge]);
    }

    #[test]
    fn afternoon_push_is_exclusive_on_both_ends() {
        let seller = user(UserRole::Salesperson, None);
        let cfg = RulesConfig::default();
        let half = vec![habit(&seller, true), habit(&seller, false)];
        let most = vec![habit(&seller, true), habit(&seller, true), habit(&seller, false)];
        let all = vec![habit(&seller, true)];

        assert!(evaluate_rules(&snapshot(&[], &half, 17), &cfg).is_empty());
        assert!(evaluate_rules(&snapshot(&[], &all, 17), &cfg).is_empty());
        assert!(evaluate_rules(&snapshot(&[], &most, 15), &cfg).is_empty());
        assert_eq!(rules_of(&evaluate_rules(&snapshot(&[], &most, 16), &cfg)), vec![Rule::AfternoonPush]);
    }

    #[test]
    fn big_deal_references_the_first_match_and_respects_threshold() {
        let seller = user(UserRole::Salesperson, None);
        let deal = |value: f64, company: &str| {
            let mut l = lead_for(&seller);
            l.stage = PipelineStage::ProposalSent;
            l.value = value;
            l.company = Some(company.into());
            l
        };
        let leads = vec![deal(10_000.0, "Limite"), deal(12_000.0, "Primeira"), deal(50_000.0, "Segunda")];

        let fired = evaluate_rules(&snapshot(&leads, &[], 8), &RulesConfig::default());
        assert_eq!(rules_of(&fired), vec![Rule::StalledBigDeal]);
        assert!(fired[0].message.contains("O deal da Primeira"));
        assert_eq!(fired[0].action_link, Some(format!("/leads/{}", leads[1].id)));

        let strict = RulesConfig { high_value_threshold: 60_000.0, ..Default::default() };
        assert!(evaluate_rules(&snapshot(&leads, &[], 8), &strict).is_empty());
    }

    #[tokio::test]
    async fn fires_once_per_day_and_again_tomorrow() {
        let clock = FixedClock::at(2024, 5, 10, 8);
        let ledger = Arc::new(StoreLedger::new(Arc::new(MemoryStore::new())));
        let svc = NotificationService::new(ledger, Arc::new(clock.clone()), RulesConfig::default());
        let seller = user(UserRole::Salesperson, None);
        let mut late = lead_for(&seller);
        late.next_follow_up = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let leads = vec![late];

        assert_eq!(svc.evaluate(&seller, &leads, &[]).await.unwrap().len(), 1);
        assert!(svc.evaluate(&seller, &leads, &[]).await.unwrap().is_empty());
        assert_eq!(svc.unread_count(seller.id).await, 1);

        // Outro usuário tem a própria chave.
        let colleague = user(UserRole::Salesperson, None);
        assert_eq!(svc.evaluate(&colleague, &leads, &[]).await.unwrap().len(), 1);

        clock.advance(Duration::days(1));
        assert_eq!(svc.evaluate(&seller, &leads, &[]).await.unwrap().len(), 1);
        assert_eq!(svc.unread_count(seller.id).await, 2);
    }

    #[tokio::test]
    async fn inbox_mutations_are_idempotent_and_leave_ledger_alone() {
        let clock = FixedClock::at(2024, 5, 10, 8);
        let ledger = Arc::new(StoreLedger::new(Arc::new(MemoryStore::new())));
        let svc = NotificationService::new(ledger, Arc::new(clock), RulesConfig::default());
        let seller = user(UserRole::Salesperson, None);
        let mut late = lead_for(&seller);
        late.next_follow_up = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        late.stage = PipelineStage::ProposalSent;
        late.value = 20_000.0;
        let leads = vec![late];

        let fired = svc.evaluate(&seller, &leads, &[]).await.unwrap();
        assert_eq!(fired.len(), 2);
        let feed = svc.feed(seller.id).await;
        // Mais recente primeiro.
        assert_eq!(feed.notifications[0].severity, Severity::Warning);
        assert_eq!(feed.unread_count, 2);

        let once = svc.mark_as_read(seller.id, fired[0].id).await;
        let twice = svc.mark_as_read(seller.id, fired[0].id).await;
        assert_eq!(once.unread_count, 1);
        assert_eq!(twice.unread_count, 1);
        let unknown = svc.mark_as_read(seller.id, Uuid::new_v4()).await;
        assert_eq!(unknown.notifications, twice.notifications);

        assert_eq!(svc.mark_all_as_read(seller.id).await.unread_count, 0);
        assert!(svc.clear_all(seller.id).await.notifications.is_empty());
        assert!(svc.clear_all(seller.id).await.notifications.is_empty());
        assert!(svc.evaluate(&seller, &leads, &[]).await.unwrap().is_empty());
    }

    // Ledger que falha a partir da segunda gravação.
    struct FailingLedger {
        inner: StoreLedger,
        writes: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl NotificationLedger for FailingLedger {
        async fn last_fired(&self, key: &str) -> AppResult<Option<NaiveDate>> {
            self.inner.last_fired(key).await
        }

        async fn mark_fired(&self, key: &str, day: NaiveDate) -> AppResult<()> {
            if self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst) >= 1 {
                return Err(AppError::InternalServerError(anyhow::anyhow!("ledger indisponível")));
            }
            self.inner.mark_fired(key, day).await
        }
    }

    #[tokio::test]
    async fn ledger_failure_keeps_inbox_and_ledger_in_step() {
        let clock = FixedClock::at(2024, 5, 10, 8);
        let inner = StoreLedger::new(Arc::new(MemoryStore::new()));
        let ledger = Arc::new(FailingLedger {
            inner: inner.clone(),
            writes: Default::default(),
        });
        let svc = NotificationService::new(ledger, Arc::new(clock), RulesConfig::default());
        let seller = user(UserRole::Salesperson, None);
        let mut late = lead_for(&seller);
        late.next_follow_up = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        late.stage = PipelineStage::ProposalSent;
        late.value = 20_000.0;

        assert!(svc.evaluate(&seller, &[late], &[]).await.is_err());

        // O alerta de atraso foi gravado e está na caixa; o big deal não foi nenhum dos dois.
        let feed = svc.feed(seller.id).await;
        assert_eq!(feed.notifications.len(), 1);
        assert_eq!(feed.notifications[0].severity, Severity::Alert);
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let overdue_key = format!("{}:{}", seller.id, Rule::OverdueFollowUps.key());
        let big_deal_key = format!("{}:{}", seller.id, Rule::StalledBigDeal.key());
        assert_eq!(inner.last_fired(&overdue_key).await.unwrap(), Some(today));
        assert_eq!(inner.last_fired(&big_deal_key).await.unwrap(), None);
    }
}
