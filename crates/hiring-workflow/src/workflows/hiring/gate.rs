//! Role-based authorization for workflow edges.
//!
//! Each state machine publishes a whitelist of `(from, to) -> roles` edges through
//! [`GatedState`]. [`RoleGate`] is the only place those whitelists are consulted, so an
//! edge missing from a table is denied no matter which roles the actor holds.

use std::collections::BTreeSet;

use super::domain::Role;

/// A status enum whose edges are guarded by roles.
pub trait GatedState: Copy + Eq + 'static {
    /// Every variant, used to derive the owners of a target state.
    fn all() -> &'static [Self];

    /// Roles allowed to take the edge `from -> to`; empty when the edge does not exist.
    fn edge_roles(from: Self, to: Self) -> &'static [Role];

    fn as_str(self) -> &'static str;
}

/// Pure allow/deny predicate over role sets and workflow edges.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleGate;

impl RoleGate {
    /// Deny by default: an unknown edge or an empty role set never passes.
    pub fn can_transition<S: GatedState>(roles: &BTreeSet<Role>, from: S, to: S) -> bool {
        S::edge_roles(from, to)
            .iter()
            .any(|allowed| roles.contains(allowed))
    }

    /// Whether any edge in the machine leads from `from` to `to`.
    pub fn edge_exists<S: GatedState>(from: S, to: S) -> bool {
        !S::edge_roles(from, to).is_empty()
    }

    /// Union of the roles owning any edge into `to`.
    pub fn owners_of<S: GatedState>(to: S) -> BTreeSet<Role> {
        S::all()
            .iter()
            .flat_map(|from| S::edge_roles(*from, to).iter().copied())
            .collect()
    }

    /// Whether the actor holds a role that could ever move a record into `to`.
    pub fn may_target<S: GatedState>(roles: &BTreeSet<Role>, to: S) -> bool {
        Self::owners_of(to).iter().any(|role| roles.contains(role))
    }
}
