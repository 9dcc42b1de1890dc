// src/services/visibility.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    common::error::{AppError, AppResult},
    models::{
        auth::{User, UserRole},
        crm::{Lead, Task},
    },
};

// Registro com dono e squad: a forma comum das regras de visibilidade.
pub trait Scoped {
    fn owner_id(&self) -> Uuid;
    fn squad_id(&self) -> Option<Uuid>;
}

impl Scoped for Lead {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn squad_id(&self) -> Option<Uuid> {
        self.squad_id
    }
}

impl Scoped for User {
    fn owner_id(&self) -> Uuid {
        self.id
    }

    fn squad_id(&self) -> Option<Uuid> {
        self.squad_id
    }
}

/// A regra única: ADMIN/COORDINATOR tudo, SUPERVISOR o próprio squad,
/// SALESPERSON só o que é dele. Um supervisor sem squad não enxerga squad nenhum.
pub fn can_see(viewer: &User, owner_id: Uuid, squad_id: Option<Uuid>) -> bool {
    match viewer.role {
        UserRole::Admin | UserRole::Coordinator => true,
        UserRole::Supervisor => viewer.squad_id.is_some() && squad_id == viewer.squad_id,
        UserRole::Salesperson => owner_id == viewer.id,
    }
}

/// Filtra a coleção para o subconjunto visível. Reaplicado a cada leitura.
pub fn visible<T>(items: &[T], viewer: &User) -> Vec<T>
where
    T: Scoped + Clone,
{
    items
        .iter()
        .filter(|item| can_see(viewer, item.owner_id(), item.squad_id()))
        .cloned()
        .collect()
}

pub fn visible_leads(all_leads: &[Lead], viewer: &User) -> Vec<Lead> {
    visible(all_leads, viewer)
}

/// Tarefas não guardam squad: o squad vem do responsável.
pub fn visible_tasks(tasks: &[Task], users: &[User], viewer: &User) -> Vec<Task> {
    let squads: HashMap<Uuid, Option<Uuid>> = users.iter().map(|u| (u.id, u.squad_id)).collect();
    tasks
        .iter()
        .filter(|t| {
            let squad = squads.get(&t.assigned_to).copied().flatten();
            can_see(viewer, t.assigned_to, squad)
        })
        .cloned()
        .collect()
}

pub fn ensure_visible<T: Scoped>(viewer: &User, item: &T) -> AppResult<()> {
    if can_see(viewer, item.owner_id(), item.squad_id()) {
        Ok(())
    } else {
        tracing::warn!(viewer = %viewer.id, owner = %item.owner_id(), "acesso fora do escopo negado");
        Err(AppError::forbidden("Registro fora do seu escopo de visibilidade."))
    }
}
