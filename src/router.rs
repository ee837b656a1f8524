// 9.3 router.rs: plugin approvals. a plugin may act for an account only when
// governance registered it and the account approved it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::AccountId;

pub trait RouterApprovals {
    fn is_approved_plugin(&self, account: AccountId, plugin: AccountId) -> bool;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Router {
    plugins: HashSet<AccountId>,
    approvals: HashSet<(AccountId, AccountId)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    // governance checks happen in the vault, which owns the router
    pub fn add_plugin(&mut self, plugin: AccountId) {
        self.plugins.insert(plugin);
    }

    pub fn remove_plugin(&mut self, plugin: AccountId) {
        self.plugins.remove(&plugin);
    }

    pub fn approve_plugin(&mut self, account: AccountId, plugin: AccountId) {
        self.approvals.insert((account, plugin));
    }

    pub fn deny_plugin(&mut self, account: AccountId, plugin: AccountId) {
        self.approvals.remove(&(account, plugin));
    }

    pub fn is_plugin(&self, plugin: AccountId) -> bool {
        self.plugins.contains(&plugin)
    }
}

impl RouterApprovals for Router {
    fn is_approved_plugin(&self, account: AccountId, plugin: AccountId) -> bool {
        self.plugins.contains(&plugin) && self.approvals.contains(&(account, plugin))
    }
}
