// src/services/policy.rs

use uuid::Uuid;

use crate::{
    common::error::{AppError, AppResult},
    models::auth::{User, UserRole},
};

// Ações de gestão sujeitas à tabela de autorização.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageUsers,
    ManageHabitTemplates,
    ManageMessageTemplates,
    SetGoals,
    ViewSquadPerformance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Anyone,
    OwnSquad,
    Denied,
}

struct PolicyRule {
    role: UserRole,
    action: Action,
    grant: Grant,
    // Papéis que o ator pode criar/atribuir (só relevante para usuários)
    target_roles: &'static [UserRole],
}

const ALL_ROLES: &[UserRole] = &UserRole::ALL;
const SALESPERSON_ONLY: &[UserRole] = &[UserRole::Salesperson];

const fn rule(role: UserRole, action: Action, grant: Grant, target_roles: &'static [UserRole]) -> PolicyRule {
    PolicyRule { role, action, grant, target_roles }
}

// A tabela inteira. Combinações ausentes são negadas.
const POLICY: &[PolicyRule] = &[
    rule(UserRole::Admin, Action::ManageUsers, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Admin, Action::ManageHabitTemplates, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Admin, Action::ManageMessageTemplates, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Admin, Action::SetGoals, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Admin, Action::ViewSquadPerformance, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Coordinator, Action::ManageUsers, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Coordinator, Action::ManageHabitTemplates, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Coordinator, Action::ManageMessageTemplates, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Coordinator, Action::SetGoals, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Coordinator, Action::ViewSquadPerformance, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Supervisor, Action::ManageUsers, Grant::OwnSquad, SALESPERSON_ONLY),
    rule(UserRole::Supervisor, Action::ManageHabitTemplates, Grant::OwnSquad, ALL_ROLES),
    rule(UserRole::Supervisor, Action::ManageMessageTemplates, Grant::Anyone, ALL_ROLES),
    rule(UserRole::Supervisor, Action::SetGoals, Grant::OwnSquad, ALL_ROLES),
    rule(UserRole::Supervisor, Action::ViewSquadPerformance, Grant::OwnSquad, ALL_ROLES),
];

pub fn grant_for(role: UserRole, action: Action) -> Grant {
    lookup(role, action).map_or(Grant::Denied, |r| r.grant)
}

fn lookup(role: UserRole, action: Action) -> Option<&'static PolicyRule> {
    POLICY.iter().find(|r| r.role == role && r.action == action)
}

/// Alvo de uma ação de gestão: o squad afetado e, para usuários, o papel resultante.
#[derive(Debug, Clone, Copy, Default)]
pub struct Target {
    pub squad_id: Option<Uuid>,
    pub role: Option<UserRole>,
}

impl Target {
    pub fn squad(squad_id: Option<Uuid>) -> Self {
        Self { squad_id, role: None }
    }

    pub fn user(squad_id: Option<Uuid>, role: UserRole) -> Self {
        Self { squad_id, role: Some(role) }
    }
}

/// Tudo ou nada: chamado antes de qualquer escrita.
pub fn authorize(actor: &User, action: Action, target: Target) -> AppResult<()> {
    let Some(rule) = lookup(actor.role, action) else {
        return Err(deny(actor, action, "Seu papel não permite esta ação."));
    };

    match rule.grant {
        Grant::Denied => return Err(deny(actor, action, "Seu papel não permite esta ação.")),
        Grant::OwnSquad => {
            if actor.squad_id.is_none() || target.squad_id != actor.squad_id {
                return Err(deny(actor, action, "Ação permitida apenas dentro do seu squad."));
            }
        }
        Grant::Anyone => {}
    }

    if let Some(role) = target.role {
        if !rule.target_roles.contains(&role) {
            return Err(deny(actor, action, "Você não pode atribuir esta função."));
        }
    }

    Ok(())
}

fn deny(actor: &User, action: Action, message: &str) -> AppError {
    tracing::warn!(actor = %actor.id, role = ?actor.role, ?action, "autorização negada");
    AppError::forbidden(message)
}
